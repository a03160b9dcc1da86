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

//! GPU buffer resources and their descriptors.

use crate::ember_bitflags;
use crate::gpu::backend::{BufferHandle, GpuObjectId};
use crate::gpu::device::DeviceShared;
use crate::gpu::error::ResourceError;
use std::sync::Arc;

/// Which heap a buffer lives in, and therefore which side may touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryUsage {
    /// Device-local memory; the host never accesses it directly.
    #[default]
    GpuOnly,
    /// Host-visible upload memory, written by the CPU and read by the GPU.
    CpuToGpu,
    /// Host-visible readback memory, written by the GPU and read by the CPU.
    GpuToCpu,
}

ember_bitflags! {
    /// A set of flags describing the allowed usages of a buffer.
    ///
    /// The backend uses these to pick memory placement and to validate that
    /// the buffer is bound correctly at runtime.
    pub struct BufferUsage: u32 {
        /// The buffer can feed the input assembler (vertex or index data).
        const INPUT_ASSEMBLY = 1 << 0;
        /// The buffer can be bound as a constant (uniform) buffer.
        const CONSTANT = 1 << 1;
        /// The buffer can be read from shaders as a storage resource.
        const SHADER_READ = 1 << 2;
        /// The buffer can be written from shaders as a storage resource.
        const SHADER_WRITE = 1 << 3;
        /// The buffer can supply indirect draw/dispatch arguments.
        const INDIRECT = 1 << 4;
        /// The buffer can back a ray-tracing acceleration structure.
        const ACCELERATION_STRUCTURE = 1 << 5;
    }
}

/// A descriptor used to create a [`Buffer`].
#[derive(Debug, Clone, Default)]
pub struct BufferDescriptor {
    /// An optional debug label for the buffer.
    pub label: Option<String>,
    /// The total size of the buffer in bytes. Must be non-zero and at most
    /// [`MAX_BUFFER_SIZE`](crate::gpu::MAX_BUFFER_SIZE).
    pub size: u64,
    /// A bitmask of [`BufferUsage`] flags describing how the buffer will be
    /// used.
    pub usage: BufferUsage,
    /// The heap the buffer is allocated from.
    pub memory_usage: MemoryUsage,
}

/// A GPU buffer resource created through the device.
///
/// Size, usage, and memory usage are immutable after creation. The object
/// registers itself with the device's live-object registry on construction
/// and deregisters (releasing the backend handle) when dropped.
#[derive(Debug)]
pub struct Buffer {
    shared: Arc<DeviceShared>,
    object_id: GpuObjectId,
    handle: BufferHandle,
    size: u64,
    usage: BufferUsage,
    memory_usage: MemoryUsage,
    label: Option<String>,
}

impl Buffer {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        object_id: GpuObjectId,
        handle: BufferHandle,
        descriptor: &BufferDescriptor,
    ) -> Self {
        Self {
            shared,
            object_id,
            handle,
            size: descriptor.size,
            usage: descriptor.usage,
            memory_usage: descriptor.memory_usage,
            label: descriptor.label.clone(),
        }
    }

    /// The size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The usage flags the buffer was created with.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// The heap the buffer was allocated from.
    pub fn memory_usage(&self) -> MemoryUsage {
        self.memory_usage
    }

    /// The debug label, if one was provided.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The opaque backend handle.
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Writes `data` into the buffer at `offset`.
    ///
    /// This is the host-access path for upload buffers; it requires
    /// [`MemoryUsage::CpuToGpu`] and the range to lie within the buffer.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        if self.memory_usage != MemoryUsage::CpuToGpu {
            debug_assert!(
                false,
                "Buffer::write on a buffer without host write access ({:?})",
                self.memory_usage
            );
            return Err(ResourceError::InvalidAccess(format!(
                "write requires CpuToGpu memory, buffer is {:?}",
                self.memory_usage
            )));
        }
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(ResourceError::OutOfBounds)?;
        if end > self.size {
            return Err(ResourceError::OutOfBounds);
        }
        self.shared.backend().write_buffer(self.handle, offset, data)
    }

    /// Reads `len` bytes from the buffer at `offset`.
    ///
    /// This is the host-access path for readback buffers; it requires
    /// [`MemoryUsage::GpuToCpu`] and the range to lie within the buffer.
    pub fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>, ResourceError> {
        if self.memory_usage != MemoryUsage::GpuToCpu {
            debug_assert!(
                false,
                "Buffer::read on a buffer without host read access ({:?})",
                self.memory_usage
            );
            return Err(ResourceError::InvalidAccess(format!(
                "read requires GpuToCpu memory, buffer is {:?}",
                self.memory_usage
            )));
        }
        let end = offset.checked_add(len).ok_or(ResourceError::OutOfBounds)?;
        if end > self.size {
            return Err(ResourceError::OutOfBounds);
        }
        self.shared.backend().read_buffer(self.handle, offset, len)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // The registry returns false when the device already destroyed the
        // handle at teardown; the backend call must then be skipped so every
        // object is destroyed exactly once.
        if self.shared.unregister(self.object_id) {
            self.shared.backend().destroy_buffer(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_usage_flags_combine() {
        let usage = BufferUsage::INPUT_ASSEMBLY | BufferUsage::CONSTANT;
        assert!(usage.contains(BufferUsage::INPUT_ASSEMBLY));
        assert!(usage.contains(BufferUsage::CONSTANT));
        assert!(!usage.contains(BufferUsage::INDIRECT));
    }

    #[test]
    fn default_descriptor_is_gpu_only() {
        let descriptor = BufferDescriptor::default();
        assert_eq!(descriptor.memory_usage, MemoryUsage::GpuOnly);
        assert_eq!(descriptor.size, 0);
        assert!(descriptor.usage.is_empty());
    }
}
