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

//! Validated command recording.
//!
//! [`CommandBuffer`] is a thin layer over a backend
//! [`CommandRecorder`](crate::gpu::backend::CommandRecorder): it enforces
//! the render-pass state machine, clamps and asserts argument ranges, and
//! vends transient scratch memory from its per-frame allocators. Every
//! method records; nothing here blocks.

use crate::gpu::backend::CommandRecorder;
use crate::gpu::buffer::{Buffer, BufferUsage};
use crate::gpu::caps::QueueType;
use crate::gpu::device::DeviceShared;
use crate::gpu::error::ResourceError;
use crate::gpu::format::{Color, IndexFormat};
use crate::gpu::frame_allocator::FrameAllocator;
use crate::gpu::pipeline::Pipeline;
use crate::gpu::texture::TextureView;
use crate::gpu::{
    MAX_DESCRIPTOR_BINDINGS, MAX_DESCRIPTOR_SETS, MAX_FRAMES_IN_FLIGHT,
    MAX_VERTEX_BUFFER_BINDINGS, MIN_UNIFORM_BUFFER_ALIGNMENT,
};

/// Describes the operation on an attachment at the start of a render pass.
#[derive(Debug, Clone, Copy)]
pub enum LoadOp<V> {
    /// The existing contents of the attachment are loaded into the pass.
    Load,
    /// The attachment is cleared to the given value before the pass begins.
    Clear(V),
}

/// Describes the operation on an attachment at the end of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// The results of the pass are stored to the attachment's memory.
    Store,
    /// The results are discarded, leaving the attachment undefined.
    Discard,
}

/// The load and store operations of a single attachment.
#[derive(Debug, Clone, Copy)]
pub struct Operations<V> {
    /// The operation at the beginning of the pass.
    pub load: LoadOp<V>,
    /// The operation at the end of the pass.
    pub store: StoreOp,
}

/// One color attachment of a render pass.
#[derive(Debug)]
pub struct RenderPassColorAttachment<'a> {
    /// The view rendered to.
    pub view: &'a TextureView,
    /// The resolve target for multisampled views, if any.
    pub resolve_target: Option<&'a TextureView>,
    /// Load/store operations, with the clear color.
    pub ops: Operations<Color>,
}

/// The depth/stencil attachment of a render pass.
#[derive(Debug)]
pub struct RenderPassDepthStencilAttachment<'a> {
    /// The depth/stencil view.
    pub view: &'a TextureView,
    /// Depth load/store operations, if the format has depth.
    pub depth_ops: Option<Operations<f32>>,
    /// Stencil load/store operations, if the format has stencil.
    pub stencil_ops: Option<Operations<u32>>,
}

/// A descriptor for one render pass.
#[derive(Debug, Default)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label for the pass.
    pub label: Option<&'a str>,
    /// The color attachments.
    pub color_attachments: &'a [RenderPassColorAttachment<'a>],
    /// An optional depth/stencil attachment.
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment<'a>>,
}

/// The viewport transform of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Minimum depth of the viewport range.
    pub min_depth: f32,
    /// Maximum depth of the viewport range.
    pub max_depth: f32,
}

/// The scissor rectangle of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordState {
    Closed,
    InsideRenderPass,
}

/// A transient per-submission recorder of GPU work.
///
/// Obtained from a [`CommandQueue`](crate::gpu::queue::CommandQueue) and
/// returned to it by `submit`, which recycles the recorder and resets the
/// submitted frame's allocator. Recording is single-threaded per buffer.
#[derive(Debug)]
pub struct CommandBuffer {
    recorder: Box<dyn CommandRecorder>,
    allocators: Vec<FrameAllocator>,
    frame_index: usize,
    state: RecordState,
    queue_type: QueueType,
}

impl CommandBuffer {
    pub(crate) fn new(
        shared: &std::sync::Arc<DeviceShared>,
        queue_type: QueueType,
    ) -> Result<Self, ResourceError> {
        let recorder = shared.backend().create_command_recorder(queue_type);
        let mut allocators = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for frame in 0..MAX_FRAMES_IN_FLIGHT {
            allocators.push(FrameAllocator::new(
                shared.clone(),
                format!("{queue_type:?} scratch [frame {frame}]"),
            )?);
        }
        Ok(Self {
            recorder,
            allocators,
            frame_index: 0,
            state: RecordState::Closed,
            queue_type,
        })
    }

    /// The queue family this recorder records for.
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// The frame slot whose allocator currently serves transient data.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// The frame allocator serving the current frame slot.
    pub fn frame_allocator(&self) -> &FrameAllocator {
        &self.allocators[self.frame_index]
    }

    pub(crate) fn begin(&mut self, frame_index: usize, label: Option<&str>) {
        debug_assert_eq!(
            self.state,
            RecordState::Closed,
            "begin on a command buffer that is still recording a render pass"
        );
        self.frame_index = frame_index;
        self.recorder.begin(label);
    }

    /// Invoked by the queue when the recorder is reclaimed after a submit;
    /// resets only the submitted frame's allocator. Allocators never shrink.
    pub(crate) fn reset(&mut self, frame_index: usize) {
        debug_assert_eq!(self.state, RecordState::Closed);
        self.allocators[frame_index].reset();
        self.frame_index = frame_index;
    }

    pub(crate) fn finish_recording(&mut self) {
        debug_assert_eq!(
            self.state,
            RecordState::Closed,
            "command buffer submitted with an open render pass"
        );
        self.recorder.finish();
    }

    pub(crate) fn recorder_mut(&mut self) -> &mut dyn CommandRecorder {
        self.recorder.as_mut()
    }

    // --- Render-pass state machine ---

    /// Opens a render pass. Only valid while no pass is open.
    pub fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor<'_>) {
        debug_assert_eq!(
            self.state,
            RecordState::Closed,
            "begin_render_pass inside an open render pass"
        );
        self.recorder.begin_render_pass(descriptor);
        self.state = RecordState::InsideRenderPass;
    }

    /// Closes the open render pass. Unbalanced calls trap.
    pub fn end_render_pass(&mut self) {
        debug_assert_eq!(
            self.state,
            RecordState::InsideRenderPass,
            "end_render_pass without a matching begin_render_pass"
        );
        self.recorder.end_render_pass();
        self.state = RecordState::Closed;
    }

    // --- State setters (valid in any recording state) ---

    /// Binds a pipeline.
    pub fn set_pipeline(&mut self, pipeline: &Pipeline) {
        self.recorder.set_pipeline(pipeline.handle(), pipeline.kind());
    }

    /// Sets the viewport transform.
    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.recorder.set_viewport(viewport);
    }

    /// Sets the scissor rectangle.
    pub fn set_scissor(&mut self, scissor: &ScissorRect) {
        self.recorder.set_scissor(scissor);
    }

    /// Binds a vertex buffer at `slot`.
    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: &Buffer, offset: u64) {
        debug_assert!(
            (slot as usize) < MAX_VERTEX_BUFFER_BINDINGS,
            "vertex buffer slot {slot} out of range (max {})",
            MAX_VERTEX_BUFFER_BINDINGS - 1
        );
        self.recorder.set_vertex_buffer(slot, buffer.handle(), offset);
    }

    /// Binds the index buffer. The buffer must carry input-assembly usage.
    pub fn set_index_buffer(&mut self, buffer: &Buffer, offset: u64, format: IndexFormat) {
        debug_assert!(
            buffer.usage().contains(BufferUsage::INPUT_ASSEMBLY),
            "index buffer lacks INPUT_ASSEMBLY usage"
        );
        self.recorder.set_index_buffer(buffer.handle(), offset, format);
    }

    /// Binds a texture view at `(set, binding)`.
    pub fn set_texture(&mut self, set: u32, binding: u32, view: &TextureView) {
        debug_assert!((set as usize) < MAX_DESCRIPTOR_SETS);
        debug_assert!((binding as usize) < MAX_DESCRIPTOR_BINDINGS);
        self.recorder.bind_texture(set, binding, view.handle());
    }

    /// Binds a sampler at `(set, binding)`.
    pub fn set_sampler(&mut self, set: u32, binding: u32, sampler: &crate::gpu::texture::Sampler) {
        debug_assert!((set as usize) < MAX_DESCRIPTOR_SETS);
        debug_assert!((binding as usize) < MAX_DESCRIPTOR_BINDINGS);
        self.recorder.bind_sampler(set, binding, sampler.handle());
    }

    /// Binds a uniform-buffer sub-range at `(set, binding)`.
    pub fn bind_uniform_buffer(
        &mut self,
        set: u32,
        binding: u32,
        buffer: &Buffer,
        offset: u64,
        size: u64,
    ) {
        debug_assert!((set as usize) < MAX_DESCRIPTOR_SETS);
        debug_assert!((binding as usize) < MAX_DESCRIPTOR_BINDINGS);
        debug_assert!(offset + size <= buffer.size());
        self.recorder
            .bind_uniform_buffer(set, binding, buffer.handle(), offset, size);
    }

    /// Copies `data` into frame-local scratch at uniform alignment and
    /// binds the resulting sub-range at `(set, binding)`.
    pub fn bind_uniform_buffer_data(
        &mut self,
        set: u32,
        binding: u32,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        debug_assert!((set as usize) < MAX_DESCRIPTOR_SETS, "descriptor set {set} out of range");
        debug_assert!(
            (binding as usize) < MAX_DESCRIPTOR_BINDINGS,
            "descriptor binding {binding} out of range"
        );
        let allocation = self.allocators[self.frame_index]
            .allocate_with_data(data, MIN_UNIFORM_BUFFER_ALIGNMENT)?;
        self.recorder.bind_uniform_buffer(
            set,
            binding,
            allocation.buffer.handle(),
            allocation.offset,
            data.len() as u64,
        );
        Ok(())
    }

    /// Copies `vertex_count * stride` bytes of vertex data into frame-local
    /// scratch (4-byte aligned) and binds it at `slot`.
    pub fn set_dynamic_vertex_buffer(
        &mut self,
        slot: u32,
        vertex_count: u32,
        stride: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        debug_assert!(
            (slot as usize) < MAX_VERTEX_BUFFER_BINDINGS,
            "vertex buffer slot {slot} out of range (max {})",
            MAX_VERTEX_BUFFER_BINDINGS - 1
        );
        debug_assert_eq!(data.len() as u64, vertex_count as u64 * stride);
        let allocation = self.allocators[self.frame_index].allocate_with_data(data, 4)?;
        self.recorder
            .set_vertex_buffer(slot, allocation.buffer.handle(), allocation.offset);
        Ok(())
    }

    /// Copies `index_count` indices into frame-local scratch (4-byte
    /// aligned) and binds them as the index buffer.
    pub fn set_dynamic_index_buffer(
        &mut self,
        index_count: u32,
        format: IndexFormat,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        debug_assert_eq!(data.len() as u64, index_count as u64 * format.size_in_bytes());
        let allocation = self.allocators[self.frame_index].allocate_with_data(data, 4)?;
        self.recorder
            .set_index_buffer(allocation.buffer.handle(), allocation.offset, format);
        Ok(())
    }

    /// Pushes constants into the command stream.
    pub fn push_constants(&mut self, data: &[u8]) {
        self.recorder.set_push_constants(data);
    }

    // --- Draw / dispatch (render-pass state enforced) ---

    /// Records a non-indexed draw. Only valid inside a render pass.
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        debug_assert_eq!(
            self.state,
            RecordState::InsideRenderPass,
            "draw outside of a render pass"
        );
        self.recorder
            .draw(vertex_count, instance_count, first_vertex, first_instance);
    }

    /// Records an indexed draw. Only valid inside a render pass.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) {
        debug_assert_eq!(
            self.state,
            RecordState::InsideRenderPass,
            "draw_indexed outside of a render pass"
        );
        self.recorder.draw_indexed(
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        );
    }

    /// Records a compute dispatch. Only valid outside a render pass.
    pub fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        debug_assert_eq!(
            self.state,
            RecordState::Closed,
            "dispatch inside a render pass"
        );
        self.recorder.dispatch(group_count_x, group_count_y, group_count_z);
    }

    // --- Transfers (outside-pass only) ---

    /// Schedules an upload of `data` into `buffer`.
    ///
    /// A `size` of zero selects the remainder of the buffer from `offset`;
    /// a range reaching past the end of the buffer or the provided data is
    /// clamped with a warning. Only valid outside a render pass.
    pub fn update_buffer(&mut self, buffer: &Buffer, data: &[u8], offset: u64, size: u64) {
        debug_assert_eq!(
            self.state,
            RecordState::Closed,
            "update_buffer inside a render pass"
        );
        debug_assert!(offset <= buffer.size(), "update_buffer offset past the end");

        let mut size = if size == 0 {
            buffer.size() - offset
        } else {
            size
        };
        if offset + size > buffer.size() {
            log::warn!(
                "update_buffer range clamped: offset {} + size {} exceeds buffer size {}",
                offset,
                size,
                buffer.size()
            );
            size = buffer.size() - offset;
        }
        if size > data.len() as u64 {
            log::warn!(
                "update_buffer size clamped to the {} bytes of data provided",
                data.len()
            );
            size = data.len() as u64;
        }
        if size == 0 {
            return;
        }
        self.recorder
            .update_buffer(buffer.handle(), offset, &data[..size as usize]);
    }

    /// Records a buffer-to-buffer copy. Both regions must lie within their
    /// buffers. Only valid outside a render pass.
    pub fn copy_buffer(
        &mut self,
        src: &Buffer,
        src_offset: u64,
        dst: &Buffer,
        dst_offset: u64,
        size: u64,
    ) {
        debug_assert_eq!(
            self.state,
            RecordState::Closed,
            "copy_buffer inside a render pass"
        );
        debug_assert!(src_offset + size <= src.size(), "copy_buffer source out of range");
        debug_assert!(
            dst_offset + size <= dst.size(),
            "copy_buffer destination out of range"
        );
        self.recorder
            .copy_buffer(src.handle(), src_offset, dst.handle(), dst_offset, size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::backend::mock::MockBackend;
    use crate::gpu::buffer::{BufferDescriptor, MemoryUsage};
    use crate::gpu::device::GraphicsDevice;
    use std::sync::Arc;

    fn test_command_buffer() -> (MockBackend, GraphicsDevice, CommandBuffer) {
        let backend = MockBackend::new();
        let device = GraphicsDevice::new(Box::new(backend.clone()));
        let mut cb = CommandBuffer::new(&device.shared_for_tests(), QueueType::Graphics).unwrap();
        cb.begin(0, None);
        (backend, device, cb)
    }

    fn pass_descriptor<'a>() -> RenderPassDescriptor<'a> {
        RenderPassDescriptor::default()
    }

    fn upload_buffer(device: &GraphicsDevice, size: u64) -> Arc<Buffer> {
        device
            .create_buffer(
                &BufferDescriptor {
                    label: None,
                    size,
                    usage: BufferUsage::INPUT_ASSEMBLY | BufferUsage::CONSTANT,
                    memory_usage: MemoryUsage::CpuToGpu,
                },
                None,
            )
            .unwrap()
    }

    #[test]
    fn render_pass_brackets_draws() {
        let (backend, _device, mut cb) = test_command_buffer();
        cb.begin_render_pass(&pass_descriptor());
        cb.draw(3, 1, 0, 0);
        cb.end_render_pass();

        let ops = backend.recorded_ops();
        assert!(ops.contains(&"begin_render_pass".to_string()));
        assert!(ops.contains(&"draw:3:1".to_string()));
        assert!(ops.contains(&"end_render_pass".to_string()));
    }

    #[test]
    #[should_panic(expected = "draw outside of a render pass")]
    fn draw_outside_pass_traps() {
        let (_backend, _device, mut cb) = test_command_buffer();
        cb.draw(3, 1, 0, 0);
    }

    #[test]
    #[should_panic(expected = "end_render_pass without a matching begin_render_pass")]
    fn unbalanced_end_render_pass_traps() {
        let (_backend, _device, mut cb) = test_command_buffer();
        cb.end_render_pass();
    }

    #[test]
    #[should_panic(expected = "begin_render_pass inside an open render pass")]
    fn nested_render_pass_traps() {
        let (_backend, _device, mut cb) = test_command_buffer();
        cb.begin_render_pass(&pass_descriptor());
        cb.begin_render_pass(&pass_descriptor());
    }

    #[test]
    #[should_panic(expected = "update_buffer inside a render pass")]
    fn update_buffer_inside_pass_traps() {
        let (_backend, device, mut cb) = test_command_buffer();
        let buffer = upload_buffer(&device, 64);
        cb.begin_render_pass(&pass_descriptor());
        cb.update_buffer(&buffer, &[0u8; 64], 0, 0);
    }

    #[test]
    fn a_failed_draw_then_valid_sequence_succeeds() {
        // After the trap case above, a properly bracketed sequence records.
        let (backend, _device, mut cb) = test_command_buffer();
        cb.begin_render_pass(&pass_descriptor());
        cb.draw(6, 1, 0, 0);
        cb.end_render_pass();
        assert!(backend.recorded_ops().contains(&"draw:6:1".to_string()));
    }

    #[test]
    fn update_buffer_clamps_and_selects_remainder() {
        let (backend, device, mut cb) = test_command_buffer();
        let buffer = upload_buffer(&device, 16);

        // size == 0 selects buffer.size - offset.
        cb.update_buffer(&buffer, &[1u8; 16], 4, 0);
        let contents = backend.buffer_contents(buffer.handle());
        assert_eq!(&contents[4..16], &[1u8; 12]);

        // Overflowing range is clamped.
        cb.update_buffer(&buffer, &[2u8; 32], 8, 32);
        let contents = backend.buffer_contents(buffer.handle());
        assert_eq!(&contents[8..16], &[2u8; 8]);
    }

    #[test]
    fn dynamic_vertex_data_advances_the_frame_allocator() {
        let (_backend, _device, mut cb) = test_command_buffer();
        let data = vec![0u8; 1024 * 32];
        let before = cb.frame_allocator().current_offset();
        cb.set_dynamic_vertex_buffer(0, 1024, 32, &data).unwrap();
        let after = cb.frame_allocator().current_offset();
        assert_eq!(after - before, 1024 * 32);
    }

    #[test]
    fn dynamic_index_data_is_four_byte_aligned() {
        let (backend, _device, mut cb) = test_command_buffer();
        // Odd-size uniform push first, to leave the bump pointer unaligned.
        cb.bind_uniform_buffer_data(0, 0, &[0u8; 13]).unwrap();
        cb.set_dynamic_index_buffer(3, IndexFormat::Uint16, &[0u8; 6]).unwrap();

        let ops = backend.recorded_ops();
        let bind = ops.iter().find(|op| op.starts_with("set_index_buffer")).unwrap();
        let offset: u64 = bind.split(':').nth(2).unwrap().parse().unwrap();
        assert_eq!(offset % 4, 0);
    }

    #[test]
    fn uniform_data_is_256_byte_aligned() {
        let (backend, _device, mut cb) = test_command_buffer();
        cb.bind_uniform_buffer_data(0, 0, &[0u8; 13]).unwrap();
        cb.bind_uniform_buffer_data(1, 2, &[0u8; 64]).unwrap();

        let ops = backend.recorded_ops();
        let binds: Vec<&String> = ops
            .iter()
            .filter(|op| op.starts_with("bind_uniform_buffer"))
            .collect();
        assert_eq!(binds.len(), 2);
        for bind in binds {
            let offset: u64 = bind.split(':').nth(4).unwrap().parse().unwrap();
            assert_eq!(offset % 256, 0);
        }
        // The bound size is the requested size, not the aligned size.
        assert!(ops.iter().any(|op| op.starts_with("bind_uniform_buffer:1:2:") && op.ends_with(":64")));
    }

    #[test]
    fn reset_rewinds_only_the_given_frame() {
        let (_backend, _device, mut cb) = test_command_buffer();
        cb.bind_uniform_buffer_data(0, 0, &[0u8; 64]).unwrap();
        assert!(cb.frame_allocator().current_offset() > 0);

        cb.reset(1); // other frame slot: untouched allocator
        assert_eq!(cb.frame_allocator().current_offset(), 0);
        assert_eq!(cb.allocators[0].current_offset(), 256);

        cb.reset(0);
        assert_eq!(cb.frame_allocator().current_offset(), 0);
    }

    #[test]
    fn copy_buffer_records_outside_pass() {
        let (backend, device, mut cb) = test_command_buffer();
        let a = upload_buffer(&device, 64);
        let b = upload_buffer(&device, 64);
        cb.copy_buffer(&a, 0, &b, 16, 32);
        assert!(backend
            .recorded_ops()
            .iter()
            .any(|op| op.starts_with("copy_buffer")));
    }
}
