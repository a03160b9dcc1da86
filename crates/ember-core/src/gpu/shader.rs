// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Compiled shader modules and their reflected resource bindings.

use crate::gpu::backend::{GpuObjectId, ShaderHandle};
use crate::gpu::caps::{ShaderBlobKind, ShaderStage};
use crate::gpu::device::DeviceShared;
use std::sync::Arc;

/// The kind of resource a shader binding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderResourceKind {
    /// A constant (uniform) buffer.
    ConstantBuffer,
    /// A read-only storage buffer.
    StorageBufferRead,
    /// A read/write storage buffer.
    StorageBufferReadWrite,
    /// A sampled texture.
    Texture,
    /// A storage texture.
    StorageTexture,
    /// A sampler.
    Sampler,
}

/// One resource binding declared by a shader, discovered by reflection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderResource {
    /// The binding's name in the source, when available.
    pub name: String,
    /// The descriptor set (bind group) index.
    pub set: u32,
    /// The binding index within the set.
    pub binding: u32,
    /// What the binding refers to.
    pub kind: ShaderResourceKind,
}

/// The output of the shader front-end: target bytecode plus reflection.
///
/// This is a plain value; turning it into a GPU resource goes through the
/// device (`create_shader`), which uploads the blob to the backend.
#[derive(Debug, Clone)]
pub struct ShaderArtifact {
    /// The stage the shader was compiled for.
    pub stage: ShaderStage,
    /// The entry point name.
    pub entry_point: String,
    /// The container the bytecode conforms to.
    pub blob_kind: ShaderBlobKind,
    /// The compiled bytecode (SPIR-V words as bytes, or HLSL text bytes).
    pub bytecode: Vec<u8>,
    /// The resource bindings the shader declares.
    pub resources: Vec<ShaderResource>,
    /// A hash of the bytecode, usable as a pipeline-cache key.
    pub content_hash: u64,
}

/// A shader module resource created through the device.
///
/// The bytecode and reflection data are immutable after construction.
#[derive(Debug)]
pub struct Shader {
    shared: Arc<DeviceShared>,
    object_id: GpuObjectId,
    handle: ShaderHandle,
    artifact: ShaderArtifact,
    label: Option<String>,
}

impl Shader {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        object_id: GpuObjectId,
        handle: ShaderHandle,
        artifact: ShaderArtifact,
        label: Option<String>,
    ) -> Self {
        Self {
            shared,
            object_id,
            handle,
            artifact,
            label,
        }
    }

    /// The stage the shader was compiled for.
    pub fn stage(&self) -> ShaderStage {
        self.artifact.stage
    }

    /// The entry point name.
    pub fn entry_point(&self) -> &str {
        &self.artifact.entry_point
    }

    /// The compiled bytecode.
    pub fn bytecode(&self) -> &[u8] {
        &self.artifact.bytecode
    }

    /// The container the bytecode conforms to.
    pub fn blob_kind(&self) -> ShaderBlobKind {
        self.artifact.blob_kind
    }

    /// The resource bindings the shader declares.
    pub fn resources(&self) -> &[ShaderResource] {
        &self.artifact.resources
    }

    /// A hash of the bytecode, stable for identical compilations.
    pub fn content_hash(&self) -> u64 {
        self.artifact.content_hash
    }

    /// The debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The opaque backend handle.
    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if self.shared.unregister(self.object_id) {
            self.shared.backend().destroy_shader(self.handle);
        }
    }
}
