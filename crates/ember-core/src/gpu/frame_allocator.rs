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

//! Per-frame linear scratch allocation for transient GPU data.
//!
//! Each command buffer owns one [`FrameAllocator`] per frame in flight.
//! Allocations are bump-pointer suballocations out of a growable upload
//! buffer; `reset` rewinds the pointer once the frame's submissions are
//! reclaimed, keeping any grown capacity.

use crate::gpu::buffer::{Buffer, BufferDescriptor, BufferUsage, MemoryUsage};
use crate::gpu::device::DeviceShared;
use crate::gpu::error::ResourceError;
use crate::gpu::FRAME_ALLOCATOR_INITIAL_CAPACITY;
use crate::utils::align_up;
use std::sync::Arc;

/// One suballocation handed out by a [`FrameAllocator`].
///
/// The region `[offset, offset + size)` of `buffer` belongs to the caller
/// until the allocator is reset.
#[derive(Debug, Clone)]
pub struct FrameAllocation {
    /// The upload buffer the region lives in.
    pub buffer: Arc<Buffer>,
    /// Byte offset of the region; a multiple of the requested alignment.
    pub offset: u64,
    /// Size of the region: the requested size rounded up to the alignment.
    pub size: u64,
}

/// A growable upload buffer with a bump pointer.
#[derive(Debug)]
pub struct FrameAllocator {
    shared: Arc<DeviceShared>,
    buffer: Arc<Buffer>,
    capacity: u64,
    current_offset: u64,
    label: String,
}

impl FrameAllocator {
    fn buffer_descriptor(label: &str, capacity: u64) -> BufferDescriptor {
        BufferDescriptor {
            label: Some(label.to_string()),
            size: capacity,
            usage: BufferUsage::INPUT_ASSEMBLY | BufferUsage::CONSTANT,
            memory_usage: MemoryUsage::CpuToGpu,
        }
    }

    pub(crate) fn new(shared: Arc<DeviceShared>, label: String) -> Result<Self, ResourceError> {
        let capacity = FRAME_ALLOCATOR_INITIAL_CAPACITY;
        let buffer = shared.create_buffer(&Self::buffer_descriptor(&label, capacity), None)?;
        Ok(Self {
            shared,
            buffer,
            capacity,
            current_offset: 0,
            label,
        })
    }

    /// The current bump offset. Monotonically non-decreasing between
    /// [`reset`](Self::reset)s and never beyond the capacity.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// The capacity of the underlying upload buffer.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Reserves `size` bytes at the given power-of-two `alignment`.
    ///
    /// On overflow the capacity is doubled until the request fits and the
    /// upload buffer is re-created once; earlier allocations keep their
    /// (old) buffer alive through their own `Arc`.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Result<FrameAllocation, ResourceError> {
        debug_assert!(alignment.is_power_of_two());
        debug_assert!(size > 0, "zero-size frame allocation");

        let offset = align_up(self.current_offset, alignment);
        let aligned_size = align_up(size, alignment);

        if offset + aligned_size > self.capacity {
            let mut new_capacity = self.capacity;
            while offset + aligned_size > new_capacity {
                new_capacity *= 2;
            }
            log::debug!(
                "FrameAllocator({}): growing {} -> {} bytes",
                self.label,
                self.capacity,
                new_capacity
            );
            self.buffer = self
                .shared
                .create_buffer(&Self::buffer_descriptor(&self.label, new_capacity), None)?;
            self.capacity = new_capacity;
        }

        self.current_offset = offset + aligned_size;
        Ok(FrameAllocation {
            buffer: self.buffer.clone(),
            offset,
            size: aligned_size,
        })
    }

    /// Reserves space for `data` and copies it into the upload buffer.
    pub fn allocate_with_data(
        &mut self,
        data: &[u8],
        alignment: u64,
    ) -> Result<FrameAllocation, ResourceError> {
        let allocation = self.allocate(data.len() as u64, alignment)?;
        allocation.buffer.write(allocation.offset, data)?;
        Ok(allocation)
    }

    /// Rewinds the bump pointer. The underlying buffer (and any grown
    /// capacity) is retained for reuse.
    pub fn reset(&mut self) {
        self.current_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::backend::mock::MockBackend;
    use crate::gpu::device::GraphicsDevice;
    use crate::utils::is_aligned;

    fn test_allocator() -> (MockBackend, GraphicsDevice, FrameAllocator) {
        let backend = MockBackend::new();
        let device = GraphicsDevice::new(Box::new(backend.clone()));
        let allocator =
            FrameAllocator::new(device.shared_for_tests(), "test".to_string()).unwrap();
        (backend, device, allocator)
    }

    #[test]
    fn allocations_are_aligned_and_monotonic() {
        let (_backend, _device, mut allocator) = test_allocator();

        let a = allocator.allocate(10, 4).unwrap();
        assert_eq!(a.offset, 0);
        assert_eq!(a.size, 12);

        let b = allocator.allocate(3, 256).unwrap();
        assert!(is_aligned(b.offset, 256));
        assert_eq!(b.size, 256);
        assert!(b.offset >= a.offset + a.size);

        assert!(allocator.current_offset() <= allocator.capacity());
        assert_eq!(allocator.current_offset(), b.offset + b.size);
    }

    #[test]
    fn oversized_allocation_grows_once() {
        let (_backend, _device, mut allocator) = test_allocator();
        assert_eq!(allocator.capacity(), FRAME_ALLOCATOR_INITIAL_CAPACITY);

        let old_buffer = allocator.buffer.clone();
        let three_mib = 3 * 1024 * 1024;
        let allocation = allocator.allocate(three_mib, 4).unwrap();

        // 1 MiB doubled until 3 MiB fits: exactly one re-creation, 4 MiB.
        assert_eq!(allocator.capacity(), 4 * 1024 * 1024);
        assert_eq!(allocation.size, three_mib);
        assert_eq!(allocation.offset, 0);
        assert!(!Arc::ptr_eq(&allocation.buffer, &old_buffer));
        assert!(allocation.offset + allocation.size <= allocation.buffer.size());
    }

    #[test]
    fn reset_rewinds_but_keeps_capacity() {
        let (_backend, _device, mut allocator) = test_allocator();
        allocator.allocate(3 * 1024 * 1024, 4).unwrap();
        let grown = allocator.capacity();

        allocator.reset();
        assert_eq!(allocator.current_offset(), 0);
        assert_eq!(allocator.capacity(), grown);

        // The buffer is reused, no re-creation on the next allocation.
        let buffer = allocator.buffer.clone();
        let allocation = allocator.allocate(64, 4).unwrap();
        assert!(Arc::ptr_eq(&allocation.buffer, &buffer));
    }

    #[test]
    fn allocate_with_data_copies_into_the_buffer() {
        let (backend, _device, mut allocator) = test_allocator();
        let payload = [7u8; 32];
        let allocation = allocator.allocate_with_data(&payload, 4).unwrap();

        let contents = backend.buffer_contents(allocation.buffer.handle());
        assert_eq!(
            &contents[allocation.offset as usize..allocation.offset as usize + 32],
            &payload
        );
    }
}
