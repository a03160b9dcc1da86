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

//! The contracts a concrete graphics backend implements.
//!
//! The core layer validates and tracks; everything that actually touches a
//! graphics API goes through [`GpuBackend`] and [`CommandRecorder`]. One
//! concrete implementation per backend lives in `ember-infra`.

use crate::gpu::buffer::BufferDescriptor;
use crate::gpu::caps::{AdapterInfo, BackendSelectionConfig, BackendType, DeviceCaps, QueueType};
use crate::gpu::command::{RenderPassDescriptor, ScissorRect, Viewport};
use crate::gpu::error::{DeviceError, ResourceError};
use crate::gpu::format::{IndexFormat, PixelFormat};
use crate::gpu::pipeline::{
    ComputePipelineDescriptor, PipelineKind, RenderPipelineDescriptor, VertexLayout,
};
use crate::gpu::shader::ShaderArtifact;
use crate::gpu::swap_chain::SwapChainDescriptor;
use crate::gpu::texture::{SamplerDescriptor, TextureDescriptor, TextureViewDescriptor};
use crate::platform::window::EngineWindowHandle;
use async_trait::async_trait;
use std::any::Any;
use std::fmt;

macro_rules! backend_handle {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u64);
    };
}

backend_handle!(
    /// An opaque backend handle to a GPU buffer.
    BufferHandle
);
backend_handle!(
    /// An opaque backend handle to a GPU texture.
    TextureHandle
);
backend_handle!(
    /// An opaque backend handle to a texture view.
    TextureViewHandle
);
backend_handle!(
    /// An opaque backend handle to a sampler.
    SamplerHandle
);
backend_handle!(
    /// An opaque backend handle to a shader module.
    ShaderHandle
);
backend_handle!(
    /// An opaque backend handle to a pipeline state object.
    PipelineHandle
);
backend_handle!(
    /// An opaque backend handle to a swap chain.
    SwapChainHandle
);

/// Identifies an entry in the device's live-object registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuObjectId(pub u64);

/// The family a registered GPU object belongs to, used to route teardown
/// destruction to the right backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuObjectKind {
    /// A [`Buffer`](crate::gpu::buffer::Buffer).
    Buffer,
    /// A [`Texture`](crate::gpu::texture::Texture).
    Texture,
    /// A [`TextureView`](crate::gpu::texture::TextureView).
    TextureView,
    /// A [`Sampler`](crate::gpu::texture::Sampler).
    Sampler,
    /// A [`Shader`](crate::gpu::shader::Shader).
    Shader,
    /// A [`Pipeline`](crate::gpu::pipeline::Pipeline).
    Pipeline,
    /// A [`SwapChain`](crate::gpu::swap_chain::SwapChain).
    SwapChain,
}

/// The device-level contract a concrete backend satisfies.
///
/// All methods take `&self`; implementations guard their internal tables.
/// Handles returned here are meaningless outside the backend that issued
/// them.
pub trait GpuBackend: Send + Sync + fmt::Debug + 'static {
    /// The capability record of the selected adapter.
    fn caps(&self) -> &DeviceCaps;

    /// Creates a buffer, optionally filled with `initial_data`.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<BufferHandle, ResourceError>;

    /// Destroys a buffer. Unknown handles are tolerated.
    fn destroy_buffer(&self, handle: BufferHandle);

    /// Writes `data` into a host-visible buffer at `offset`.
    fn write_buffer(
        &self,
        handle: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError>;

    /// Reads `len` bytes from a readback buffer at `offset`.
    fn read_buffer(
        &self,
        handle: BufferHandle,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>, ResourceError>;

    /// Creates a texture. `mip_level_count` is the already-resolved level
    /// count (the core computes full chains before delegating).
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        mip_level_count: u32,
        initial_data: Option<&[u8]>,
    ) -> Result<TextureHandle, ResourceError>;

    /// Destroys a texture. Unknown handles are tolerated.
    fn destroy_texture(&self, handle: TextureHandle);

    /// Creates a view over `texture`. The descriptor is already normalized.
    fn create_texture_view(
        &self,
        texture: TextureHandle,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewHandle, ResourceError>;

    /// Destroys a texture view. Unknown handles are tolerated.
    fn destroy_texture_view(&self, handle: TextureViewHandle);

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor)
        -> Result<SamplerHandle, ResourceError>;

    /// Destroys a sampler. Unknown handles are tolerated.
    fn destroy_sampler(&self, handle: SamplerHandle);

    /// Uploads a compiled shader blob.
    fn create_shader(
        &self,
        artifact: &ShaderArtifact,
        label: Option<&str>,
    ) -> Result<ShaderHandle, ResourceError>;

    /// Destroys a shader module. Unknown handles are tolerated.
    fn destroy_shader(&self, handle: ShaderHandle);

    /// Creates a render pipeline. `vertex_layout` is the normalized layout
    /// after auto-layout ran.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
        vertex_layout: &VertexLayout,
    ) -> Result<PipelineHandle, ResourceError>;

    /// Creates a compute pipeline.
    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineHandle, ResourceError>;

    /// Destroys a pipeline. Unknown handles are tolerated.
    fn destroy_pipeline(&self, handle: PipelineHandle);

    /// Creates a swap chain bound to `window`. Returns the handle and the
    /// color format actually negotiated with the surface.
    fn create_swap_chain(
        &self,
        window: &EngineWindowHandle,
        descriptor: &SwapChainDescriptor,
    ) -> Result<(SwapChainHandle, PixelFormat), ResourceError>;

    /// Recreates the back-buffer chain at the new dimensions.
    fn resize_swap_chain(
        &self,
        handle: SwapChainHandle,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError>;

    /// Acquires the texture bound to the next present.
    fn acquire_swap_chain_texture(
        &self,
        handle: SwapChainHandle,
    ) -> Result<TextureHandle, DeviceError>;

    /// Presents the currently acquired back buffer, if any.
    fn present_swap_chain(&self, handle: SwapChainHandle);

    /// Destroys a swap chain. Unknown handles are tolerated.
    fn destroy_swap_chain(&self, handle: SwapChainHandle);

    /// Creates a raw command recorder for `queue`.
    fn create_command_recorder(&self, queue: QueueType) -> Box<dyn CommandRecorder>;

    /// Submits finished recorders in array order. With
    /// `wait_for_completion` the call returns only after the GPU observed
    /// the fence advance.
    fn submit(
        &self,
        queue: QueueType,
        recorders: &mut [&mut dyn CommandRecorder],
        wait_for_completion: bool,
    );

    /// Blocks until the given queue (or all queues) drained.
    fn wait_idle(&self, queue: Option<QueueType>);

    /// Polls whether the backend reported a device-removed condition.
    fn is_device_lost(&self) -> bool;

    /// Routes a teardown destruction to the right `destroy_*` call.
    fn destroy_object(&self, kind: GpuObjectKind, raw: u64) {
        match kind {
            GpuObjectKind::Buffer => self.destroy_buffer(BufferHandle(raw)),
            GpuObjectKind::Texture => self.destroy_texture(TextureHandle(raw)),
            GpuObjectKind::TextureView => self.destroy_texture_view(TextureViewHandle(raw)),
            GpuObjectKind::Sampler => self.destroy_sampler(SamplerHandle(raw)),
            GpuObjectKind::Shader => self.destroy_shader(ShaderHandle(raw)),
            GpuObjectKind::Pipeline => self.destroy_pipeline(PipelineHandle(raw)),
            GpuObjectKind::SwapChain => self.destroy_swap_chain(SwapChainHandle(raw)),
        }
    }
}

/// The raw, unvalidated recording surface of one backend command buffer.
///
/// The validated [`CommandBuffer`](crate::gpu::command::CommandBuffer)
/// wraps this; recording methods are never blocking.
pub trait CommandRecorder: Send + fmt::Debug {
    /// Starts a fresh recording. Called by the queue when the recorder is
    /// vended or recycled.
    fn begin(&mut self, label: Option<&str>);

    /// Opens a render pass with the given attachment set.
    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor<'_>);

    /// Closes the open render pass.
    fn end_render_pass(&mut self);

    /// Binds a pipeline of the given family.
    fn set_pipeline(&mut self, pipeline: PipelineHandle, kind: PipelineKind);

    /// Sets the viewport transform.
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Sets the scissor rectangle.
    fn set_scissor(&mut self, scissor: &ScissorRect);

    /// Binds a vertex buffer at `slot`.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64);

    /// Binds the index buffer.
    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat);

    /// Binds a uniform-buffer sub-range at `(set, binding)`.
    fn bind_uniform_buffer(
        &mut self,
        set: u32,
        binding: u32,
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    );

    /// Binds a texture view at `(set, binding)`.
    fn bind_texture(&mut self, set: u32, binding: u32, view: TextureViewHandle);

    /// Binds a sampler at `(set, binding)`.
    fn bind_sampler(&mut self, set: u32, binding: u32, sampler: SamplerHandle);

    /// Pushes constants into the command stream.
    fn set_push_constants(&mut self, data: &[u8]);

    /// Records a non-indexed draw.
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    /// Records an indexed draw.
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    );

    /// Records a compute dispatch.
    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32);

    /// Schedules a host-to-buffer upload ordered before this recording's
    /// submission.
    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// Records a buffer-to-buffer copy.
    fn copy_buffer(
        &mut self,
        src: BufferHandle,
        src_offset: u64,
        dst: BufferHandle,
        dst_offset: u64,
        size: u64,
    );

    /// Finalizes the recording so it can be submitted.
    fn finish(&mut self);

    /// Backend escape hatch used at submit time.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The result of a successful backend selection.
#[derive(Debug)]
pub struct BackendSelection<TAdapter> {
    /// The selected adapter, in the backend's own terms.
    pub adapter: TAdapter,
    /// Information about the selected adapter.
    pub adapter_info: AdapterInfo,
    /// All backends that were attempted during selection, in order.
    pub attempted_backends: Vec<BackendType>,
}

/// A system that discovers and selects a suitable graphics adapter.
///
/// Adapter enumeration can be a slow I/O operation, so selection is
/// asynchronous; callers without a runtime block on it (`pollster`).
#[async_trait]
pub trait BackendSelector<TAdapter> {
    /// The error type returned if backend selection fails.
    type Error: fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Selects the best available adapter, honoring the preference order in
    /// `config` and falling back along it.
    async fn select_backend(
        &self,
        config: &BackendSelectionConfig,
    ) -> Result<BackendSelection<TAdapter>, Self::Error>;

    /// Synchronously checks whether a backend API can work on this
    /// platform at all.
    fn is_backend_supported(&self, backend_type: BackendType) -> bool;
}

#[cfg(test)]
pub(crate) mod mock {
    //! An in-memory backend used by the core's unit tests.

    use super::*;
    use crate::gpu::caps::DeviceFeatures;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    pub(crate) struct MockState {
        pub buffers: Mutex<HashMap<u64, Vec<u8>>>,
        pub textures: Mutex<HashMap<u64, TextureDescriptor>>,
        pub live_views: Mutex<Vec<u64>>,
        pub swap_chains: Mutex<HashMap<u64, SwapChainDescriptor>>,
        pub submits: Mutex<Vec<(QueueType, usize, bool)>>,
        pub ops: Mutex<Vec<String>>,
        next_handle: AtomicU64,
        pub device_lost: AtomicBool,
    }

    /// A mock [`GpuBackend`] whose state stays shared with the test through
    /// `Clone` (the inner state is one `Arc`).
    #[derive(Debug, Clone, Default)]
    pub(crate) struct MockBackend {
        pub state: Arc<MockState>,
        caps: DeviceCaps,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_bindless() -> Self {
            let mut backend = Self::default();
            backend.caps.features.insert(DeviceFeatures::BINDLESS_DESCRIPTORS);
            backend
        }

        fn next(&self) -> u64 {
            self.state.next_handle.fetch_add(1, Ordering::Relaxed) + 1
        }

        pub fn buffer_contents(&self, handle: BufferHandle) -> Vec<u8> {
            self.state.buffers.lock().unwrap()[&handle.0].clone()
        }

        pub fn buffer_count(&self) -> usize {
            self.state.buffers.lock().unwrap().len()
        }

        pub fn recorded_ops(&self) -> Vec<String> {
            self.state.ops.lock().unwrap().clone()
        }
    }

    impl GpuBackend for MockBackend {
        fn caps(&self) -> &DeviceCaps {
            &self.caps
        }

        fn create_buffer(
            &self,
            descriptor: &BufferDescriptor,
            initial_data: Option<&[u8]>,
        ) -> Result<BufferHandle, ResourceError> {
            let handle = self.next();
            let mut storage = vec![0u8; descriptor.size as usize];
            if let Some(data) = initial_data {
                storage[..data.len()].copy_from_slice(data);
            }
            self.state.buffers.lock().unwrap().insert(handle, storage);
            Ok(BufferHandle(handle))
        }

        fn destroy_buffer(&self, handle: BufferHandle) {
            self.state.buffers.lock().unwrap().remove(&handle.0);
        }

        fn write_buffer(
            &self,
            handle: BufferHandle,
            offset: u64,
            data: &[u8],
        ) -> Result<(), ResourceError> {
            let mut buffers = self.state.buffers.lock().unwrap();
            let storage = buffers.get_mut(&handle.0).ok_or(ResourceError::InvalidHandle)?;
            let offset = offset as usize;
            if offset + data.len() > storage.len() {
                return Err(ResourceError::OutOfBounds);
            }
            storage[offset..offset + data.len()].copy_from_slice(data);
            Ok(())
        }

        fn read_buffer(
            &self,
            handle: BufferHandle,
            offset: u64,
            len: u64,
        ) -> Result<Vec<u8>, ResourceError> {
            let buffers = self.state.buffers.lock().unwrap();
            let storage = buffers.get(&handle.0).ok_or(ResourceError::InvalidHandle)?;
            let offset = offset as usize;
            let len = len as usize;
            if offset + len > storage.len() {
                return Err(ResourceError::OutOfBounds);
            }
            Ok(storage[offset..offset + len].to_vec())
        }

        fn create_texture(
            &self,
            descriptor: &TextureDescriptor,
            _mip_level_count: u32,
            _initial_data: Option<&[u8]>,
        ) -> Result<TextureHandle, ResourceError> {
            let handle = self.next();
            self.state
                .textures
                .lock()
                .unwrap()
                .insert(handle, descriptor.clone());
            Ok(TextureHandle(handle))
        }

        fn destroy_texture(&self, handle: TextureHandle) {
            self.state.textures.lock().unwrap().remove(&handle.0);
        }

        fn create_texture_view(
            &self,
            _texture: TextureHandle,
            _descriptor: &TextureViewDescriptor,
        ) -> Result<TextureViewHandle, ResourceError> {
            let handle = self.next();
            self.state.live_views.lock().unwrap().push(handle);
            Ok(TextureViewHandle(handle))
        }

        fn destroy_texture_view(&self, handle: TextureViewHandle) {
            self.state.live_views.lock().unwrap().retain(|h| *h != handle.0);
        }

        fn create_sampler(
            &self,
            _descriptor: &SamplerDescriptor,
        ) -> Result<SamplerHandle, ResourceError> {
            Ok(SamplerHandle(self.next()))
        }

        fn destroy_sampler(&self, _handle: SamplerHandle) {}

        fn create_shader(
            &self,
            _artifact: &ShaderArtifact,
            _label: Option<&str>,
        ) -> Result<ShaderHandle, ResourceError> {
            Ok(ShaderHandle(self.next()))
        }

        fn destroy_shader(&self, _handle: ShaderHandle) {}

        fn create_render_pipeline(
            &self,
            _descriptor: &RenderPipelineDescriptor,
            _vertex_layout: &VertexLayout,
        ) -> Result<PipelineHandle, ResourceError> {
            Ok(PipelineHandle(self.next()))
        }

        fn create_compute_pipeline(
            &self,
            _descriptor: &ComputePipelineDescriptor,
        ) -> Result<PipelineHandle, ResourceError> {
            Ok(PipelineHandle(self.next()))
        }

        fn destroy_pipeline(&self, _handle: PipelineHandle) {}

        fn create_swap_chain(
            &self,
            _window: &EngineWindowHandle,
            descriptor: &SwapChainDescriptor,
        ) -> Result<(SwapChainHandle, PixelFormat), ResourceError> {
            let handle = self.next();
            self.state
                .swap_chains
                .lock()
                .unwrap()
                .insert(handle, descriptor.clone());
            Ok((SwapChainHandle(handle), descriptor.color_format))
        }

        fn resize_swap_chain(
            &self,
            handle: SwapChainHandle,
            width: u32,
            height: u32,
        ) -> Result<(), ResourceError> {
            let mut chains = self.state.swap_chains.lock().unwrap();
            let descriptor = chains.get_mut(&handle.0).ok_or(ResourceError::InvalidHandle)?;
            descriptor.width = width;
            descriptor.height = height;
            Ok(())
        }

        fn acquire_swap_chain_texture(
            &self,
            handle: SwapChainHandle,
        ) -> Result<TextureHandle, DeviceError> {
            if !self.state.swap_chains.lock().unwrap().contains_key(&handle.0) {
                return Err(DeviceError::SurfaceAcquisitionFailed(
                    "unknown swap chain".to_string(),
                ));
            }
            let texture = self.next();
            self.state
                .textures
                .lock()
                .unwrap()
                .insert(texture, TextureDescriptor::default());
            Ok(TextureHandle(texture))
        }

        fn present_swap_chain(&self, _handle: SwapChainHandle) {
            self.state.ops.lock().unwrap().push("present".to_string());
        }

        fn destroy_swap_chain(&self, handle: SwapChainHandle) {
            self.state.swap_chains.lock().unwrap().remove(&handle.0);
        }

        fn create_command_recorder(&self, _queue: QueueType) -> Box<dyn CommandRecorder> {
            Box::new(MockRecorder {
                ops: self.state.clone(),
            })
        }

        fn submit(
            &self,
            queue: QueueType,
            recorders: &mut [&mut dyn CommandRecorder],
            wait_for_completion: bool,
        ) {
            self.state
                .submits
                .lock()
                .unwrap()
                .push((queue, recorders.len(), wait_for_completion));
        }

        fn wait_idle(&self, _queue: Option<QueueType>) {}

        fn is_device_lost(&self) -> bool {
            self.state.device_lost.load(Ordering::Relaxed)
        }
    }

    #[derive(Debug)]
    pub(crate) struct MockRecorder {
        ops: Arc<MockState>,
    }

    impl MockRecorder {
        fn log(&self, op: impl Into<String>) {
            self.ops.ops.lock().unwrap().push(op.into());
        }
    }

    impl CommandRecorder for MockRecorder {
        fn begin(&mut self, _label: Option<&str>) {
            self.log("begin");
        }
        fn begin_render_pass(&mut self, _descriptor: &RenderPassDescriptor<'_>) {
            self.log("begin_render_pass");
        }
        fn end_render_pass(&mut self) {
            self.log("end_render_pass");
        }
        fn set_pipeline(&mut self, _pipeline: PipelineHandle, kind: PipelineKind) {
            self.log(format!("set_pipeline:{kind:?}"));
        }
        fn set_viewport(&mut self, _viewport: &Viewport) {
            self.log("set_viewport");
        }
        fn set_scissor(&mut self, _scissor: &ScissorRect) {
            self.log("set_scissor");
        }
        fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
            self.log(format!("set_vertex_buffer:{slot}:{}:{offset}", buffer.0));
        }
        fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat) {
            self.log(format!("set_index_buffer:{}:{offset}:{format:?}", buffer.0));
        }
        fn bind_uniform_buffer(
            &mut self,
            set: u32,
            binding: u32,
            buffer: BufferHandle,
            offset: u64,
            size: u64,
        ) {
            self.log(format!(
                "bind_uniform_buffer:{set}:{binding}:{}:{offset}:{size}",
                buffer.0
            ));
        }
        fn bind_texture(&mut self, set: u32, binding: u32, _view: TextureViewHandle) {
            self.log(format!("bind_texture:{set}:{binding}"));
        }
        fn bind_sampler(&mut self, set: u32, binding: u32, _sampler: SamplerHandle) {
            self.log(format!("bind_sampler:{set}:{binding}"));
        }
        fn set_push_constants(&mut self, data: &[u8]) {
            self.log(format!("push_constants:{}", data.len()));
        }
        fn draw(&mut self, vertex_count: u32, instance_count: u32, _fv: u32, _fi: u32) {
            self.log(format!("draw:{vertex_count}:{instance_count}"));
        }
        fn draw_indexed(&mut self, index_count: u32, instance_count: u32, _f: u32, _b: i32, _i: u32) {
            self.log(format!("draw_indexed:{index_count}:{instance_count}"));
        }
        fn dispatch(&mut self, x: u32, y: u32, z: u32) {
            self.log(format!("dispatch:{x}:{y}:{z}"));
        }
        fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
            // The mock applies the write immediately so tests can observe it.
            let mut buffers = self.ops.buffers.lock().unwrap();
            if let Some(storage) = buffers.get_mut(&buffer.0) {
                let offset = offset as usize;
                let end = (offset + data.len()).min(storage.len());
                let len = end.saturating_sub(offset);
                storage[offset..offset + len].copy_from_slice(&data[..len]);
            }
            drop(buffers);
            self.log(format!("update_buffer:{}:{offset}:{}", buffer.0, data.len()));
        }
        fn copy_buffer(&mut self, src: BufferHandle, so: u64, dst: BufferHandle, do_: u64, size: u64) {
            self.log(format!("copy_buffer:{}:{so}:{}:{do_}:{size}", src.0, dst.0));
        }
        fn finish(&mut self) {
            self.log("finish");
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }
}
