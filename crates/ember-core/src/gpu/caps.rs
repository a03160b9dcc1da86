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

//! Backend identity, device capabilities, and selection configuration.

use crate::ember_bitflags;

/// A backend-agnostic representation of a graphics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Vulkan API.
    Vulkan,
    /// Apple's Metal API.
    Metal,
    /// Microsoft's DirectX 12 API.
    Dx12,
    /// OpenGL API.
    OpenGL,
    /// WebGPU API (for web builds).
    WebGpu,
    /// An unknown or unsupported backend.
    #[default]
    Unknown,
}

/// The physical type of a graphics device (GPU).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceKind {
    /// A GPU integrated into the CPU.
    IntegratedGpu,
    /// A discrete, dedicated GPU.
    DiscreteGpu,
    /// A virtualized or software-based GPU.
    VirtualGpu,
    /// A software renderer running on the CPU.
    Cpu,
    /// An unknown or unsupported device type.
    #[default]
    Unknown,
}

/// Controls how much API validation the backend performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationMode {
    /// No validation layers.
    Disabled,
    /// Standard validation layers.
    #[default]
    Enabled,
    /// Validation plus verbose debug output (slow; development only).
    Verbose,
}

/// Identifies one of the device's command queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// The graphics queue; accepts render, compute, and copy work.
    Graphics,
    /// The asynchronous compute queue. Backends with a single hardware
    /// queue may alias it onto the graphics queue.
    Compute,
    /// The transfer queue, reserved for copy-heavy backends.
    Copy,
}

/// Defines the programmable stage a shader module is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex shader stage.
    Vertex,
    /// The hull (tessellation control) stage.
    Hull,
    /// The domain (tessellation evaluation) stage.
    Domain,
    /// The geometry shader stage.
    Geometry,
    /// The fragment (or pixel) shader stage.
    Fragment,
    /// The compute shader stage.
    Compute,
}

/// The target bytecode container a compiled shader is emitted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderBlobKind {
    /// HLSL text destined for the platform D3D compiler (DXIL toolchain).
    Dxil,
    /// SPIR-V words for Vulkan-class consumers.
    Spirv,
}

ember_bitflags! {
    /// Optional device features a backend may advertise.
    pub struct DeviceFeatures: u32 {
        /// Unbounded descriptor arrays indexed by an opaque integer.
        const BINDLESS_DESCRIPTORS = 1 << 0;
        /// Push constants in the command stream.
        const PUSH_CONSTANTS = 1 << 1;
        /// GPU timestamp queries.
        const TIMESTAMP_QUERIES = 1 << 2;
        /// Indirect draw/dispatch arguments read from a buffer.
        const INDIRECT_DRAW = 1 << 3;
        /// Ray-tracing acceleration structures.
        const ACCELERATION_STRUCTURES = 1 << 4;
    }
}

/// Per-stage and global resource limits reported by the backend.
#[derive(Debug, Clone)]
pub struct DeviceLimits {
    /// Largest 2D texture dimension, in texels.
    pub max_texture_dimension_2d: u32,
    /// Largest 3D texture dimension, in texels.
    pub max_texture_dimension_3d: u32,
    /// Maximum bound uniform-buffer range, in bytes.
    pub max_uniform_buffer_range: u64,
    /// Maximum bound storage-buffer range, in bytes.
    pub max_storage_buffer_range: u64,
    /// Maximum push-constant payload, in bytes.
    pub max_push_constant_size: u32,
    /// Maximum sampled textures visible to a single shader stage.
    pub max_sampled_textures_per_stage: u32,
    /// Maximum samplers visible to a single shader stage.
    pub max_samplers_per_stage: u32,
    /// Maximum uniform buffers visible to a single shader stage.
    pub max_uniform_buffers_per_stage: u32,
    /// Maximum storage buffers visible to a single shader stage.
    pub max_storage_buffers_per_stage: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_dimension_2d: 8192,
            max_texture_dimension_3d: 2048,
            max_uniform_buffer_range: 64 * 1024,
            max_storage_buffer_range: 128 * 1024 * 1024,
            max_push_constant_size: 128,
            max_sampled_textures_per_stage: 16,
            max_samplers_per_stage: 16,
            max_uniform_buffers_per_stage: 12,
            max_storage_buffers_per_stage: 8,
        }
    }
}

/// Provides standardized, backend-agnostic information about the adapter.
#[derive(Debug, Clone, Default)]
pub struct AdapterInfo {
    /// The name of the adapter (e.g., "NVIDIA GeForce RTX 4090").
    pub name: String,
    /// The graphics API backend this adapter is associated with.
    pub backend_type: BackendType,
    /// The physical type of the adapter.
    pub device_kind: DeviceKind,
    /// The PCI vendor ID, when known.
    pub vendor_id: u32,
    /// The PCI device ID, when known.
    pub device_id: u32,
}

/// The full capability record the device exposes after initialization.
#[derive(Debug, Clone, Default)]
pub struct DeviceCaps {
    /// Adapter identity.
    pub adapter: AdapterInfo,
    /// Optional feature bits the backend advertises.
    pub features: DeviceFeatures,
    /// Resource limits.
    pub limits: DeviceLimits,
    /// The bytecode container this backend consumes.
    pub shader_blob_kind: ShaderBlobKind,
}

impl Default for ShaderBlobKind {
    fn default() -> Self {
        ShaderBlobKind::Spirv
    }
}

impl DeviceCaps {
    /// Returns `true` if the device supports bindless descriptor indexing.
    pub fn supports_bindless(&self) -> bool {
        self.features.contains(DeviceFeatures::BINDLESS_DESCRIPTORS)
    }
}

/// Configuration for backend selection.
#[derive(Debug, Clone)]
pub struct BackendSelectionConfig {
    /// Preferred backends in order of preference.
    pub preferred_backends: Vec<BackendType>,
    /// Whether to prefer discrete GPUs over integrated ones.
    pub prefer_discrete_gpu: bool,
    /// How much validation the selected backend should run with.
    pub validation: ValidationMode,
}

impl BackendSelectionConfig {
    /// Builds a config that forces a single backend, keeping the other
    /// defaults.
    pub fn with_backend(backend: BackendType) -> Self {
        Self {
            preferred_backends: vec![backend],
            ..Default::default()
        }
    }
}

impl Default for BackendSelectionConfig {
    fn default() -> Self {
        Self {
            preferred_backends: {
                #[cfg(target_os = "windows")]
                {
                    vec![BackendType::Dx12, BackendType::Vulkan, BackendType::OpenGL]
                }
                #[cfg(target_os = "macos")]
                {
                    vec![BackendType::Metal]
                }
                #[cfg(not(any(target_os = "windows", target_os = "macos")))]
                {
                    vec![BackendType::Vulkan, BackendType::OpenGL]
                }
            },
            prefer_discrete_gpu: true,
            validation: ValidationMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindless_feature_is_reported_through_caps() {
        let mut caps = DeviceCaps::default();
        assert!(!caps.supports_bindless());
        caps.features.insert(DeviceFeatures::BINDLESS_DESCRIPTORS);
        assert!(caps.supports_bindless());
    }

    #[test]
    fn forced_backend_config_has_single_entry() {
        let config = BackendSelectionConfig::with_backend(BackendType::Vulkan);
        assert_eq!(config.preferred_backends, vec![BackendType::Vulkan]);
    }
}
