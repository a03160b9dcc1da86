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

//! The graphics device: the single factory for GPU objects, the
//! live-object registry, and the frame protocol.

use crate::gpu::backend::{GpuBackend, GpuObjectId, GpuObjectKind};
use crate::gpu::buffer::{Buffer, BufferDescriptor};
use crate::gpu::caps::{DeviceCaps, DeviceFeatures, QueueType};
use crate::gpu::error::{PipelineError, ResourceError};
use crate::gpu::format::PixelFormat;
use crate::gpu::pipeline::{
    ComputePipelineDescriptor, Pipeline, PipelineKind, RenderPipelineDescriptor,
};
use crate::gpu::queue::CommandQueue;
use crate::gpu::shader::{Shader, ShaderArtifact};
use crate::gpu::shader_compiler::{self, ShaderCompileOptions};
use crate::gpu::swap_chain::{SwapChain, SwapChainDescriptor};
use crate::gpu::texture::{
    compute_mip_level_count, Sampler, SamplerDescriptor, Texture, TextureDescriptor,
};
use crate::gpu::{caps::ShaderStage, MAX_BUFFER_SIZE, MAX_FRAMES_IN_FLIGHT};
use crate::platform::window::EngineWindowHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    kind: GpuObjectKind,
    raw: u64,
}

/// State shared between the device, its queues, and every resource object.
#[derive(Debug)]
pub(crate) struct DeviceShared {
    backend: Box<dyn GpuBackend>,
    caps: DeviceCaps,
    registry: Mutex<HashMap<u64, RegistryEntry>>,
    next_object_id: AtomicU64,
    next_bindless_index: AtomicU32,
    frame_count: AtomicU64,
    frame_index: AtomicUsize,
    frame_active: AtomicBool,
    device_lost: AtomicBool,
}

impl DeviceShared {
    pub(crate) fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    pub(crate) fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    pub(crate) fn frame_index(&self) -> usize {
        self.frame_index.load(Ordering::Relaxed)
    }

    /// Adds an object to the live-object registry. Re-adding an existing
    /// entry is a no-op with a debug warning.
    pub(crate) fn register(&self, kind: GpuObjectKind, raw: u64) -> GpuObjectId {
        let id = self.next_object_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut registry = self.registry.lock().unwrap();
        if registry.contains_key(&id) {
            log::warn!("GPU object {id} ({kind:?}) is already registered; ignoring");
        } else {
            registry.insert(id, RegistryEntry { kind, raw });
        }
        GpuObjectId(id)
    }

    /// Removes an object from the registry. Returns `false` (silently)
    /// when the object is absent — e.g. already destroyed at teardown.
    pub(crate) fn unregister(&self, id: GpuObjectId) -> bool {
        self.registry.lock().unwrap().remove(&id.0).is_some()
    }

    pub(crate) fn live_object_count(&self) -> usize {
        self.registry.lock().unwrap().len()
    }

    pub(crate) fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<Buffer>, ResourceError> {
        if descriptor.size == 0 {
            log::error!(
                "Buffer creation failed: size must be non-zero (label {:?})",
                descriptor.label
            );
            return Err(ResourceError::InvalidDescriptor(
                "buffer size must be non-zero".to_string(),
            ));
        }
        if descriptor.size > MAX_BUFFER_SIZE {
            log::error!(
                "Buffer size too large: {} bytes (max {MAX_BUFFER_SIZE}, label {:?})",
                descriptor.size,
                descriptor.label
            );
            return Err(ResourceError::InvalidDescriptor(format!(
                "buffer size {} exceeds the {MAX_BUFFER_SIZE}-byte cap",
                descriptor.size
            )));
        }
        if let Some(data) = initial_data {
            debug_assert!(data.len() as u64 <= descriptor.size);
        }

        let handle = self.backend.create_buffer(descriptor, initial_data)?;
        let object_id = self.register(GpuObjectKind::Buffer, handle.0);
        Ok(Arc::new(Buffer::new(
            self.clone(),
            object_id,
            handle,
            descriptor,
        )))
    }
}

/// The GPU device: owns the selected backend, builds the queues, populates
/// the capability record, and serves as the single factory for GPU
/// objects.
///
/// Constructed explicitly from a backend (no hidden global); `ember-infra`
/// provides the initialization that performs backend auto-selection and
/// returns an `Arc<GraphicsDevice>`.
#[derive(Debug)]
pub struct GraphicsDevice {
    shared: Arc<DeviceShared>,
    graphics_queue: CommandQueue,
    compute_queue: CommandQueue,
    swap_chains: Mutex<Vec<Weak<SwapChain>>>,
}

impl GraphicsDevice {
    /// Wraps a concrete backend into a device, building the graphics and
    /// compute queue fronts and copying the capability record.
    pub fn new(backend: Box<dyn GpuBackend>) -> Self {
        let caps = backend.caps().clone();
        log::info!(
            "GraphicsDevice: \"{}\" ({:?}, {:?})",
            caps.adapter.name,
            caps.adapter.backend_type,
            caps.adapter.device_kind
        );
        let shared = Arc::new(DeviceShared {
            backend,
            caps,
            registry: Mutex::new(HashMap::new()),
            next_object_id: AtomicU64::new(0),
            next_bindless_index: AtomicU32::new(0),
            frame_count: AtomicU64::new(0),
            frame_index: AtomicUsize::new(0),
            frame_active: AtomicBool::new(false),
            device_lost: AtomicBool::new(false),
        });
        Self {
            graphics_queue: CommandQueue::new(shared.clone(), QueueType::Graphics),
            compute_queue: CommandQueue::new(shared.clone(), QueueType::Compute),
            swap_chains: Mutex::new(Vec::new()),
            shared,
        }
    }

    /// The capability record of the selected adapter.
    pub fn caps(&self) -> &DeviceCaps {
        self.shared.caps()
    }

    /// Whether the device advertises the given feature bits.
    pub fn supports_features(&self, features: DeviceFeatures) -> bool {
        self.shared.caps().features.contains(features)
    }

    /// The graphics queue.
    pub fn graphics_queue(&self) -> &CommandQueue {
        &self.graphics_queue
    }

    /// The compute queue. May alias the graphics queue on single-queue
    /// backends; the distinction is the submission routing.
    pub fn compute_queue(&self) -> &CommandQueue {
        &self.compute_queue
    }

    /// Returns the queue front for `queue_type` (copy work routes to the
    /// graphics queue until a backend exposes a transfer queue).
    pub fn queue(&self, queue_type: QueueType) -> &CommandQueue {
        match queue_type {
            QueueType::Graphics | QueueType::Copy => &self.graphics_queue,
            QueueType::Compute => &self.compute_queue,
        }
    }

    /// The number of live GPU objects in the registry.
    pub fn live_object_count(&self) -> usize {
        self.shared.live_object_count()
    }

    #[cfg(test)]
    pub(crate) fn shared_for_tests(&self) -> Arc<DeviceShared> {
        self.shared.clone()
    }

    // --- Factories ---

    /// Creates a buffer, optionally filled with `initial_data`.
    ///
    /// Fails (with an error log) when the size is zero or exceeds the
    /// 128-MiB cap.
    pub fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<Buffer>, ResourceError> {
        self.shared.create_buffer(descriptor, initial_data)
    }

    /// Creates a texture, optionally with initial level-zero data.
    ///
    /// A `mip_level_count` of zero selects the full mip chain.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<Texture>, ResourceError> {
        if descriptor.extent.width == 0 {
            log::error!("Texture creation failed: width must be at least 1");
            return Err(ResourceError::InvalidDescriptor(
                "texture width must be at least 1".to_string(),
            ));
        }
        if descriptor.format == PixelFormat::Undefined {
            log::error!("Texture creation failed: format is Undefined");
            return Err(ResourceError::InvalidDescriptor(
                "texture format must not be Undefined".to_string(),
            ));
        }
        if descriptor.extent.depth_or_array_layers == 0 {
            log::error!("Texture creation failed: array size must be at least 1");
            return Err(ResourceError::InvalidDescriptor(
                "texture array size must be at least 1".to_string(),
            ));
        }

        let mip_level_count = if descriptor.mip_level_count == 0 {
            compute_mip_level_count(
                descriptor.extent.width,
                descriptor.extent.height,
                descriptor.extent.depth_or_array_layers,
            )
        } else {
            descriptor.mip_level_count
        };

        let handle = self
            .shared
            .backend()
            .create_texture(descriptor, mip_level_count, initial_data)?;
        let object_id = self.shared.register(GpuObjectKind::Texture, handle.0);
        Ok(Arc::new(Texture::new(
            self.shared.clone(),
            object_id,
            handle,
            descriptor,
            mip_level_count,
        )))
    }

    /// Creates a sampler. On bindless-capable devices a bindless index is
    /// assigned immediately.
    pub fn create_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<Arc<Sampler>, ResourceError> {
        let handle = self.shared.backend().create_sampler(descriptor)?;
        let object_id = self.shared.register(GpuObjectKind::Sampler, handle.0);
        let sampler = Sampler::new(
            self.shared.clone(),
            object_id,
            handle,
            descriptor.clone(),
        );
        if self.shared.caps().supports_bindless() {
            sampler.set_bindless_index(
                self.shared.next_bindless_index.fetch_add(1, Ordering::Relaxed),
            );
        }
        Ok(Arc::new(sampler))
    }

    /// Compiles shader source through the front-end and uploads the blob.
    ///
    /// The blob kind is taken from the backend's capability record, and a
    /// `BINDLESS` macro is predefined when the device advertises bindless
    /// descriptors.
    pub fn create_shader(
        &self,
        options: &ShaderCompileOptions,
    ) -> Result<Arc<Shader>, ResourceError> {
        let mut options = options.clone();
        options.blob_kind = self.shared.caps().shader_blob_kind;
        if self.shared.caps().supports_bindless() {
            options.defines.push(("BINDLESS".to_string(), String::new()));
        }
        let artifact = shader_compiler::compile(&options)?;
        self.create_shader_from_artifact(artifact, Some(&options.file_name))
    }

    /// Uploads an already-compiled shader artifact.
    pub fn create_shader_from_artifact(
        &self,
        artifact: ShaderArtifact,
        label: Option<&str>,
    ) -> Result<Arc<Shader>, ResourceError> {
        let handle = self.shared.backend().create_shader(&artifact, label)?;
        let object_id = self.shared.register(GpuObjectKind::Shader, handle.0);
        Ok(Arc::new(Shader::new(
            self.shared.clone(),
            object_id,
            handle,
            artifact,
            label.map(str::to_string),
        )))
    }

    /// Creates a render pipeline, applying vertex auto-layout.
    pub fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<Arc<Pipeline>, ResourceError> {
        descriptor.validate()?;
        if descriptor.vertex_shader.stage() != ShaderStage::Vertex {
            return Err(PipelineError::InvalidShaderStage {
                expected: ShaderStage::Vertex,
                provided: descriptor.vertex_shader.stage(),
            }
            .into());
        }
        if let Some(fragment) = &descriptor.fragment_shader {
            if fragment.stage() != ShaderStage::Fragment {
                return Err(PipelineError::InvalidShaderStage {
                    expected: ShaderStage::Fragment,
                    provided: fragment.stage(),
                }
                .into());
            }
        }

        let vertex_layout = descriptor.vertex_layout.normalized()?;
        let handle = self
            .shared
            .backend()
            .create_render_pipeline(descriptor, &vertex_layout)?;
        let object_id = self.shared.register(GpuObjectKind::Pipeline, handle.0);
        Ok(Arc::new(Pipeline::new(
            self.shared.clone(),
            object_id,
            handle,
            PipelineKind::Render,
            descriptor.label.clone(),
            Some(vertex_layout),
        )))
    }

    /// Creates a compute pipeline.
    pub fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<Arc<Pipeline>, ResourceError> {
        if descriptor.shader.stage() != ShaderStage::Compute {
            return Err(PipelineError::InvalidShaderStage {
                expected: ShaderStage::Compute,
                provided: descriptor.shader.stage(),
            }
            .into());
        }
        let handle = self.shared.backend().create_compute_pipeline(descriptor)?;
        let object_id = self.shared.register(GpuObjectKind::Pipeline, handle.0);
        Ok(Arc::new(Pipeline::new(
            self.shared.clone(),
            object_id,
            handle,
            PipelineKind::Compute,
            descriptor.label.clone(),
            None,
        )))
    }

    /// Creates a swap chain bound to the given window handle. The first
    /// swap chain created becomes the main one driving the frame protocol.
    pub fn create_swap_chain(
        &self,
        window: &EngineWindowHandle,
        descriptor: &SwapChainDescriptor,
    ) -> Result<Arc<SwapChain>, ResourceError> {
        let (handle, color_format) = self
            .shared
            .backend()
            .create_swap_chain(window, descriptor)?;
        let object_id = self.shared.register(GpuObjectKind::SwapChain, handle.0);
        let swap_chain = Arc::new(SwapChain::new(
            self.shared.clone(),
            object_id,
            handle,
            color_format,
            descriptor,
        ));
        self.swap_chains
            .lock()
            .unwrap()
            .push(Arc::downgrade(&swap_chain));
        Ok(swap_chain)
    }

    // --- Frame protocol ---

    /// Opens a frame. Returns `false` when the device is lost, the main
    /// swap chain is minimized, or the current back buffer cannot be
    /// acquired; on success establishes
    /// `frame_index = frame_count % MAX_FRAMES_IN_FLIGHT`.
    pub fn begin_frame(&self) -> bool {
        if self.is_device_lost() {
            return false;
        }
        debug_assert!(
            !self.shared.frame_active.load(Ordering::Relaxed),
            "begin_frame called while a frame is already open"
        );

        let main_swap_chain = self
            .swap_chains
            .lock()
            .unwrap()
            .iter()
            .find_map(Weak::upgrade);
        if let Some(swap_chain) = main_swap_chain {
            if swap_chain.is_minimized() {
                return false;
            }
            if swap_chain.acquire().is_none() {
                return false;
            }
        }

        let frame_index =
            (self.shared.frame_count.load(Ordering::Relaxed) as usize) % MAX_FRAMES_IN_FLIGHT;
        self.shared.frame_index.store(frame_index, Ordering::Relaxed);
        self.shared.frame_active.store(true, Ordering::Relaxed);
        true
    }

    /// Closes the frame opened by the last successful
    /// [`begin_frame`](Self::begin_frame): advances the frame counter and
    /// presents all live swap chains. Must be called exactly once per
    /// successful `begin_frame`.
    pub fn end_frame(&self) {
        debug_assert!(
            self.shared.frame_active.load(Ordering::Relaxed),
            "end_frame without a successful begin_frame"
        );
        self.shared.frame_active.store(false, Ordering::Relaxed);
        self.shared.frame_count.fetch_add(1, Ordering::Relaxed);

        let mut swap_chains = self.swap_chains.lock().unwrap();
        swap_chains.retain(|weak| match weak.upgrade() {
            Some(swap_chain) => {
                swap_chain.present();
                true
            }
            None => false,
        });
    }

    /// Blocks until all queues drain. Used for shutdown and
    /// non-concurrent resource updates.
    pub fn wait_idle(&self) {
        self.shared.backend().wait_idle(None);
    }

    /// Whether the backend reported a device-removed condition. The only
    /// recovery path is tear-down and re-initialization.
    pub fn is_device_lost(&self) -> bool {
        if self.shared.device_lost.load(Ordering::Relaxed) {
            return true;
        }
        if self.shared.backend().is_device_lost() {
            self.shared.device_lost.store(true, Ordering::Relaxed);
            log::error!("Graphics device lost; further frames will be rejected");
            return true;
        }
        false
    }

    /// The monotonically increasing frame counter.
    pub fn frame_count(&self) -> u64 {
        self.shared.frame_count.load(Ordering::Relaxed)
    }

    /// The current frame slot in `[0, MAX_FRAMES_IN_FLIGHT)`.
    pub fn frame_index(&self) -> usize {
        self.shared.frame_index()
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        self.shared.backend().wait_idle(None);
        // Destroy everything still registered exactly once; objects dropped
        // later observe their registry entry gone and skip the backend call.
        let entries: Vec<RegistryEntry> = {
            let mut registry = self.shared.registry.lock().unwrap();
            registry.drain().map(|(_, entry)| entry).collect()
        };
        if !entries.is_empty() {
            log::debug!(
                "GraphicsDevice teardown: destroying {} still-registered GPU objects",
                entries.len()
            );
        }
        for entry in entries {
            self.shared.backend().destroy_object(entry.kind, entry.raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::backend::mock::MockBackend;
    use crate::gpu::buffer::{BufferUsage, MemoryUsage};
    use crate::gpu::texture::TextureViewDescriptor;

    fn device_with_backend() -> (MockBackend, GraphicsDevice) {
        let backend = MockBackend::new();
        let device = GraphicsDevice::new(Box::new(backend.clone()));
        (backend, device)
    }

    fn small_buffer_descriptor(size: u64) -> BufferDescriptor {
        BufferDescriptor {
            label: Some("test".to_string()),
            size,
            usage: BufferUsage::CONSTANT,
            memory_usage: MemoryUsage::GpuOnly,
        }
    }

    #[test]
    fn registry_tracks_objects_for_their_lifetime() {
        let (_backend, device) = device_with_backend();
        assert_eq!(device.live_object_count(), 0);

        let buffer = device.create_buffer(&small_buffer_descriptor(64), None).unwrap();
        assert_eq!(device.live_object_count(), 1);

        drop(buffer);
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn buffer_size_cap_is_enforced() {
        let (_backend, device) = device_with_backend();

        let too_large = device.create_buffer(&small_buffer_descriptor(MAX_BUFFER_SIZE + 1), None);
        assert!(too_large.is_err());

        let at_cap = device.create_buffer(&small_buffer_descriptor(MAX_BUFFER_SIZE), None);
        assert!(at_cap.is_ok());

        let zero = device.create_buffer(&small_buffer_descriptor(0), None);
        assert!(zero.is_err());
    }

    #[test]
    fn texture_mip_count_defaults_to_full_chain() {
        let (_backend, device) = device_with_backend();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(PixelFormat::Rgba8Unorm, 1024, 512, 0),
                None,
            )
            .unwrap();
        assert_eq!(texture.mip_level_count(), 11);

        let explicit = device
            .create_texture(
                &TextureDescriptor::new_2d(PixelFormat::Rgba8Unorm, 1024, 512, 4),
                None,
            )
            .unwrap();
        assert_eq!(explicit.mip_level_count(), 4);
    }

    #[test]
    fn texture_creation_preconditions() {
        let (_backend, device) = device_with_backend();

        let zero_width = TextureDescriptor::new_2d(PixelFormat::Rgba8Unorm, 0, 32, 1);
        assert!(device.create_texture(&zero_width, None).is_err());

        let undefined = TextureDescriptor::new_2d(PixelFormat::Undefined, 32, 32, 1);
        assert!(device.create_texture(&undefined, None).is_err());
    }

    #[test]
    fn view_cache_returns_the_same_view_for_equal_descriptors() {
        let (_backend, device) = device_with_backend();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(PixelFormat::Rgba8Unorm, 256, 256, 0),
                None,
            )
            .unwrap();

        let a = texture.get_subresource_view(0, 0, 0, 0).unwrap();
        let b = texture.get_subresource_view(0, 0, 0, 0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        // A zero count normalizes to the remaining range, so asking for it
        // explicitly also hits the cache.
        let c = texture.get_subresource_view(0, 9, 0, 1).unwrap();
        assert!(Arc::ptr_eq(&a, &c));

        let d = texture.get_subresource_view(1, 0, 0, 0).unwrap();
        assert!(!Arc::ptr_eq(&a, &d));
        assert_eq!(d.descriptor().mip_level_count, 8);
    }

    #[test]
    fn views_are_destroyed_with_their_texture() {
        let (backend, device) = device_with_backend();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(PixelFormat::Rgba8Unorm, 64, 64, 1),
                None,
            )
            .unwrap();
        texture
            .get_view(&TextureViewDescriptor::default())
            .unwrap();
        assert_eq!(backend.state.live_views.lock().unwrap().len(), 1);

        drop(texture);
        assert!(backend.state.live_views.lock().unwrap().is_empty());
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn sampler_bindless_index_assignment() {
        let backend = MockBackend::with_bindless();
        let device = GraphicsDevice::new(Box::new(backend));
        let first = device.create_sampler(&SamplerDescriptor::default()).unwrap();
        let second = device.create_sampler(&SamplerDescriptor::default()).unwrap();
        assert_eq!(first.bindless_index(), 0);
        assert_eq!(second.bindless_index(), 1);

        let (_backend, plain_device) = device_with_backend();
        let plain = plain_device
            .create_sampler(&SamplerDescriptor::default())
            .unwrap();
        assert_eq!(plain.bindless_index(), crate::gpu::INVALID_BINDLESS_INDEX);
    }

    #[test]
    fn frame_protocol_advances_the_frame_index() {
        let (_backend, device) = device_with_backend();

        assert!(device.begin_frame());
        assert_eq!(device.frame_index(), 0);
        device.end_frame();
        assert_eq!(device.frame_count(), 1);

        assert!(device.begin_frame());
        assert_eq!(device.frame_index(), 1);
        device.end_frame();

        assert!(device.begin_frame());
        assert_eq!(device.frame_index(), 0); // wrapped at MAX_FRAMES_IN_FLIGHT
        device.end_frame();
    }

    #[test]
    #[should_panic(expected = "begin_frame called while a frame is already open")]
    fn unbalanced_begin_frame_traps() {
        let (_backend, device) = device_with_backend();
        assert!(device.begin_frame());
        device.begin_frame();
    }

    #[test]
    #[should_panic(expected = "end_frame without a successful begin_frame")]
    fn end_frame_without_begin_traps() {
        let (_backend, device) = device_with_backend();
        device.end_frame();
    }

    #[test]
    fn lost_device_rejects_frames() {
        let (backend, device) = device_with_backend();
        backend
            .state
            .device_lost
            .store(true, std::sync::atomic::Ordering::Relaxed);
        assert!(!device.begin_frame());
        assert!(device.is_device_lost());
    }

    #[test]
    fn teardown_destroys_surviving_objects_exactly_once() {
        let (backend, device) = device_with_backend();
        let buffer = device.create_buffer(&small_buffer_descriptor(32), None).unwrap();
        assert_eq!(backend.buffer_count(), 1);

        drop(device);
        // Teardown released the backend handle even though the Arc lives on.
        assert_eq!(backend.buffer_count(), 0);

        // Dropping the object afterwards must not touch the backend again.
        drop(buffer);
        assert_eq!(backend.buffer_count(), 0);
    }

    #[test]
    fn compute_pipeline_rejects_non_compute_shaders() {
        let (_backend, device) = device_with_backend();
        let vs = device
            .create_shader(&ShaderCompileOptions::with_inferred_entry_point(
                ShaderStage::Vertex,
                "@vertex fn VSMain() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }",
            ))
            .unwrap();
        let result = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: None,
            shader: vs,
        });
        assert!(result.is_err());
    }
}
