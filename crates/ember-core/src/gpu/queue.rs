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

//! Command queues: recorder vending, submission, and fencing.

use crate::gpu::backend::CommandRecorder;
use crate::gpu::caps::QueueType;
use crate::gpu::command::CommandBuffer;
use crate::gpu::device::DeviceShared;
use crate::gpu::error::ResourceError;
use std::sync::{Arc, Mutex};

/// One of the device's command queues.
///
/// Exactly one queue front exists per [`QueueType`] per device. Command
/// buffers within one `submit` call commit in array order; across calls the
/// order is the caller's invocation order.
#[derive(Debug)]
pub struct CommandQueue {
    shared: Arc<DeviceShared>,
    queue_type: QueueType,
    pool: Mutex<Vec<CommandBuffer>>,
}

impl CommandQueue {
    pub(crate) fn new(shared: Arc<DeviceShared>, queue_type: QueueType) -> Self {
        Self {
            shared,
            queue_type,
            pool: Mutex::new(Vec::new()),
        }
    }

    /// The queue family this queue fronts.
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Vends a recycled or freshly allocated command buffer, opened for the
    /// current frame.
    pub fn get_command_buffer(&self) -> Result<CommandBuffer, ResourceError> {
        let recycled = self.pool.lock().unwrap().pop();
        let mut buffer = match recycled {
            Some(buffer) => buffer,
            None => CommandBuffer::new(&self.shared, self.queue_type)?,
        };
        buffer.begin(self.shared.frame_index(), None);
        Ok(buffer)
    }

    /// Submits the given command buffers in array order and reclaims their
    /// recorders into the pool (resetting the current frame's allocator).
    ///
    /// With `wait_for_completion` the call returns only after the GPU has
    /// observed the fence advance.
    pub fn submit(&self, buffers: Vec<CommandBuffer>, wait_for_completion: bool) {
        if buffers.is_empty() {
            return;
        }
        let mut buffers = buffers;
        for buffer in &mut buffers {
            debug_assert_eq!(buffer.queue_type(), self.queue_type);
            buffer.finish_recording();
        }

        {
            let mut recorders: Vec<&mut dyn CommandRecorder> = buffers
                .iter_mut()
                .map(|buffer| buffer.recorder_mut())
                .collect();
            self.shared
                .backend()
                .submit(self.queue_type, &mut recorders, wait_for_completion);
        }

        let frame_index = self.shared.frame_index();
        let mut pool = self.pool.lock().unwrap();
        for mut buffer in buffers {
            buffer.reset(frame_index);
            pool.push(buffer);
        }
    }

    /// Blocks until the queue has drained.
    pub fn wait_idle(&self) {
        self.shared.backend().wait_idle(Some(self.queue_type));
    }

    /// The number of recorders currently parked in the pool.
    pub fn pooled_recorder_count(&self) -> usize {
        self.pool.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::backend::mock::MockBackend;
    use crate::gpu::device::GraphicsDevice;

    fn test_queue() -> (MockBackend, GraphicsDevice) {
        let backend = MockBackend::new();
        let device = GraphicsDevice::new(Box::new(backend.clone()));
        (backend, device)
    }

    #[test]
    fn submit_recycles_recorders() {
        let (_backend, device) = test_queue();
        let queue = device.graphics_queue();

        let cb = queue.get_command_buffer().unwrap();
        assert_eq!(queue.pooled_recorder_count(), 0);
        queue.submit(vec![cb], false);
        assert_eq!(queue.pooled_recorder_count(), 1);

        // The recycled recorder is handed out again.
        let _cb = queue.get_command_buffer().unwrap();
        assert_eq!(queue.pooled_recorder_count(), 0);
    }

    #[test]
    fn buffers_in_one_submit_commit_in_array_order() {
        let (backend, device) = test_queue();
        let queue = device.graphics_queue();

        let a = queue.get_command_buffer().unwrap();
        let b = queue.get_command_buffer().unwrap();
        queue.submit(vec![a, b], true);

        let submits = backend.state.submits.lock().unwrap().clone();
        assert_eq!(submits, vec![(QueueType::Graphics, 2, true)]);
    }

    #[test]
    fn submit_resets_the_reclaimed_frame_allocator() {
        let (_backend, device) = test_queue();
        let queue = device.graphics_queue();

        let mut cb = queue.get_command_buffer().unwrap();
        cb.bind_uniform_buffer_data(0, 0, &[0u8; 128]).unwrap();
        assert!(cb.frame_allocator().current_offset() > 0);
        queue.submit(vec![cb], false);

        let cb = queue.get_command_buffer().unwrap();
        assert_eq!(cb.frame_allocator().current_offset(), 0);
    }

    #[test]
    fn empty_submit_is_a_no_op() {
        let (backend, device) = test_queue();
        device.graphics_queue().submit(Vec::new(), true);
        assert!(backend.state.submits.lock().unwrap().is_empty());
    }
}
