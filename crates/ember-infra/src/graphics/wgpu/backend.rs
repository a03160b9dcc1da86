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

//! The WGPU implementation of the core's [`GpuBackend`] contract.

use super::context::WgpuContext;
use super::conversions::{blend_state, buffer_usages, from_wgpu_texture_format, IntoWgpu};
use super::encoder::WgpuCommandRecorder;
use ember_core::gpu::backend::{
    BufferHandle, CommandRecorder, GpuBackend, PipelineHandle, SamplerHandle, ShaderHandle,
    SwapChainHandle, TextureHandle, TextureViewHandle,
};
use ember_core::gpu::buffer::BufferDescriptor;
use ember_core::gpu::caps::{DeviceCaps, QueueType, ShaderBlobKind};
use ember_core::gpu::error::{DeviceError, ResourceError};
use ember_core::gpu::format::PixelFormat;
use ember_core::gpu::pipeline::{
    ComputePipelineDescriptor, RenderPipelineDescriptor, VertexLayout,
};
use ember_core::gpu::shader::ShaderArtifact;
use ember_core::gpu::swap_chain::SwapChainDescriptor;
use ember_core::gpu::texture::{
    SamplerDescriptor, TextureDescriptor, TextureKind, TextureViewDescriptor,
};
use ember_core::platform::window::EngineWindowHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use wgpu::SurfaceTargetUnsafe;

#[derive(Debug)]
pub(crate) enum WgpuPipeline {
    Render(Arc<wgpu::RenderPipeline>),
    Compute(Arc<wgpu::ComputePipeline>),
}

struct WgpuSwapChainEntry {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    current: Option<(wgpu::SurfaceTexture, u64)>,
    // Keeps the host window alive for as long as the surface exists.
    _window: EngineWindowHandle,
}

impl std::fmt::Debug for WgpuSwapChainEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuSwapChainEntry")
            .field("config", &self.config)
            .field("acquired", &self.current.is_some())
            .finish()
    }
}

/// Resource tables and WGPU state shared between the backend facade and
/// its command recorders.
#[derive(Debug)]
pub(crate) struct WgpuBackendInner {
    pub(crate) context: WgpuContext,
    buffers: Mutex<HashMap<u64, Arc<wgpu::Buffer>>>,
    textures: Mutex<HashMap<u64, Arc<wgpu::Texture>>>,
    views: Mutex<HashMap<u64, Arc<wgpu::TextureView>>>,
    samplers: Mutex<HashMap<u64, Arc<wgpu::Sampler>>>,
    shaders: Mutex<HashMap<u64, Arc<wgpu::ShaderModule>>>,
    pipelines: Mutex<HashMap<u64, WgpuPipeline>>,
    swap_chains: Mutex<HashMap<u64, WgpuSwapChainEntry>>,
    next_handle: AtomicU64,
}

impl WgpuBackendInner {
    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub(crate) fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    pub(crate) fn get_buffer(&self, handle: u64) -> Option<Arc<wgpu::Buffer>> {
        self.buffers.lock().unwrap().get(&handle).cloned()
    }

    pub(crate) fn get_view(&self, handle: u64) -> Option<Arc<wgpu::TextureView>> {
        self.views.lock().unwrap().get(&handle).cloned()
    }

    pub(crate) fn get_sampler(&self, handle: u64) -> Option<Arc<wgpu::Sampler>> {
        self.samplers.lock().unwrap().get(&handle).cloned()
    }

    pub(crate) fn get_render_pipeline(&self, handle: u64) -> Option<Arc<wgpu::RenderPipeline>> {
        match self.pipelines.lock().unwrap().get(&handle) {
            Some(WgpuPipeline::Render(pipeline)) => Some(pipeline.clone()),
            _ => None,
        }
    }

    pub(crate) fn get_compute_pipeline(&self, handle: u64) -> Option<Arc<wgpu::ComputePipeline>> {
        match self.pipelines.lock().unwrap().get(&handle) {
            Some(WgpuPipeline::Compute(pipeline)) => Some(pipeline.clone()),
            _ => None,
        }
    }
}

/// The WGPU-backed [`GpuBackend`].
#[derive(Debug)]
pub struct WgpuBackend {
    inner: Arc<WgpuBackendInner>,
}

impl WgpuBackend {
    /// Wraps an initialized [`WgpuContext`] into the backend facade.
    pub fn new(context: WgpuContext) -> Self {
        Self {
            inner: Arc::new(WgpuBackendInner {
                context,
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                views: Mutex::new(HashMap::new()),
                samplers: Mutex::new(HashMap::new()),
                shaders: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
                swap_chains: Mutex::new(HashMap::new()),
                next_handle: AtomicU64::new(0),
            }),
        }
    }

    fn poll_wait(&self) {
        if let Err(e) = self.inner.context.device.poll(wgpu::PollType::Wait) {
            log::warn!("Device poll failed: {e:?}");
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn caps(&self) -> &DeviceCaps {
        &self.inner.context.caps
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<BufferHandle, ResourceError> {
        let usage = buffer_usages(descriptor.usage, descriptor.memory_usage);
        let buffer = match initial_data {
            Some(data) => {
                use wgpu::util::DeviceExt;
                let mut contents = data.to_vec();
                // wgpu requires init contents to match the buffer size.
                contents.resize(descriptor.size as usize, 0);
                self.inner
                    .device()
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: descriptor.label.as_deref(),
                        contents: &contents,
                        usage,
                    })
            }
            None => self.inner.device().create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size,
                usage,
                mapped_at_creation: false,
            }),
        };

        let handle = self.inner.next();
        self.inner
            .buffers
            .lock()
            .unwrap()
            .insert(handle, Arc::new(buffer));
        Ok(BufferHandle(handle))
    }

    fn destroy_buffer(&self, handle: BufferHandle) {
        self.inner.buffers.lock().unwrap().remove(&handle.0);
    }

    fn write_buffer(
        &self,
        handle: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let buffer = self
            .inner
            .get_buffer(handle.0)
            .ok_or(ResourceError::InvalidHandle)?;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(ResourceError::BackendError(format!(
                "write offset {offset} is not {}-byte aligned",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }
        // wgpu requires copy sizes in COPY_BUFFER_ALIGNMENT units; pad short
        // writes up to the alignment, bounded by the buffer itself.
        let remainder = data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT;
        if remainder != 0 {
            let padded_len = (data.len() as u64 + wgpu::COPY_BUFFER_ALIGNMENT - remainder)
                .min(buffer.size() - offset) as usize;
            let mut padded = data.to_vec();
            padded.resize(padded_len, 0);
            self.inner.queue().write_buffer(&buffer, offset, &padded);
        } else {
            self.inner.queue().write_buffer(&buffer, offset, data);
        }
        Ok(())
    }

    fn read_buffer(
        &self,
        handle: BufferHandle,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>, ResourceError> {
        let buffer = self
            .inner
            .get_buffer(handle.0)
            .ok_or(ResourceError::InvalidHandle)?;

        // Map a MAP_ALIGNMENT-aligned window around the requested range and
        // trim afterwards.
        let start = offset - offset % wgpu::MAP_ALIGNMENT;
        let mut end = offset + len;
        let end_remainder = end % wgpu::MAP_ALIGNMENT;
        if end_remainder != 0 {
            end = (end + wgpu::MAP_ALIGNMENT - end_remainder).min(buffer.size());
        }

        let slice = buffer.slice(start..end);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.poll_wait();
        receiver
            .recv()
            .map_err(|_| ResourceError::BackendError("map_async callback lost".to_string()))?
            .map_err(|e| ResourceError::BackendError(format!("buffer map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range().to_vec();
        buffer.unmap();
        let skip = (offset - start) as usize;
        Ok(mapped[skip..skip + len as usize].to_vec())
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        mip_level_count: u32,
        initial_data: Option<&[u8]>,
    ) -> Result<TextureHandle, ResourceError> {
        let depth_or_array_layers = match descriptor.kind {
            TextureKind::Cube => descriptor.extent.depth_or_array_layers.max(6),
            _ => descriptor.extent.depth_or_array_layers,
        };
        let size = wgpu::Extent3d {
            width: descriptor.extent.width,
            height: descriptor.extent.height,
            depth_or_array_layers,
        };
        let format = descriptor.format.into_wgpu();
        let texture = self.inner.device().create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size,
            mip_level_count,
            sample_count: descriptor.sample_count.into_wgpu(),
            dimension: descriptor.kind.into_wgpu(),
            format,
            usage: descriptor.usage.into_wgpu() | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        if let Some(data) = initial_data {
            let bytes_per_row = descriptor.extent.width * descriptor.format.bytes_per_pixel();
            self.inner.queue().write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(descriptor.extent.height),
                },
                size,
            );
        }

        let handle = self.inner.next();
        self.inner
            .textures
            .lock()
            .unwrap()
            .insert(handle, Arc::new(texture));
        Ok(TextureHandle(handle))
    }

    fn destroy_texture(&self, handle: TextureHandle) {
        self.inner.textures.lock().unwrap().remove(&handle.0);
    }

    fn create_texture_view(
        &self,
        texture: TextureHandle,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewHandle, ResourceError> {
        let texture = self
            .inner
            .textures
            .lock()
            .unwrap()
            .get(&texture.0)
            .cloned()
            .ok_or(ResourceError::InvalidHandle)?;

        let format = if descriptor.format == PixelFormat::Undefined {
            None
        } else {
            Some(descriptor.format.into_wgpu())
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: None,
            format,
            base_mip_level: descriptor.base_mip_level,
            mip_level_count: Some(descriptor.mip_level_count),
            base_array_layer: descriptor.base_array_layer,
            array_layer_count: Some(descriptor.array_layer_count),
            ..Default::default()
        });

        let handle = self.inner.next();
        self.inner
            .views
            .lock()
            .unwrap()
            .insert(handle, Arc::new(view));
        Ok(TextureViewHandle(handle))
    }

    fn destroy_texture_view(&self, handle: TextureViewHandle) {
        self.inner.views.lock().unwrap().remove(&handle.0);
    }

    fn create_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, ResourceError> {
        let sampler = self.inner.device().create_sampler(&wgpu::SamplerDescriptor {
            label: descriptor.label.as_deref(),
            address_mode_u: descriptor.address_mode_u.into_wgpu(),
            address_mode_v: descriptor.address_mode_v.into_wgpu(),
            address_mode_w: descriptor.address_mode_w.into_wgpu(),
            mag_filter: descriptor.mag_filter.into_wgpu(),
            min_filter: descriptor.min_filter.into_wgpu(),
            mipmap_filter: descriptor.mip_filter.into_wgpu(),
            lod_min_clamp: descriptor.lod_min_clamp,
            lod_max_clamp: descriptor.lod_max_clamp,
            compare: descriptor.compare.map(IntoWgpu::into_wgpu),
            anisotropy_clamp: descriptor.max_anisotropy,
            border_color: descriptor.border_color.map(IntoWgpu::into_wgpu),
        });

        let handle = self.inner.next();
        self.inner
            .samplers
            .lock()
            .unwrap()
            .insert(handle, Arc::new(sampler));
        Ok(SamplerHandle(handle))
    }

    fn destroy_sampler(&self, handle: SamplerHandle) {
        self.inner.samplers.lock().unwrap().remove(&handle.0);
    }

    fn create_shader(
        &self,
        artifact: &ShaderArtifact,
        label: Option<&str>,
    ) -> Result<ShaderHandle, ResourceError> {
        let source = match artifact.blob_kind {
            ShaderBlobKind::Spirv => wgpu::util::make_spirv(&artifact.bytecode),
            ShaderBlobKind::Dxil => {
                return Err(ResourceError::BackendError(
                    "the wgpu backend consumes SPIR-V blobs, not DXIL".to_string(),
                ))
            }
        };
        let module = self
            .inner
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor { label, source });

        let handle = self.inner.next();
        self.inner
            .shaders
            .lock()
            .unwrap()
            .insert(handle, Arc::new(module));
        Ok(ShaderHandle(handle))
    }

    fn destroy_shader(&self, handle: ShaderHandle) {
        self.inner.shaders.lock().unwrap().remove(&handle.0);
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
        vertex_layout: &VertexLayout,
    ) -> Result<PipelineHandle, ResourceError> {
        let shaders = self.inner.shaders.lock().unwrap();
        let vertex_module = shaders
            .get(&descriptor.vertex_shader.handle().0)
            .cloned()
            .ok_or(ResourceError::InvalidHandle)?;
        let fragment_module = match &descriptor.fragment_shader {
            Some(shader) => Some(
                shaders
                    .get(&shader.handle().0)
                    .cloned()
                    .ok_or(ResourceError::InvalidHandle)?,
            ),
            None => None,
        };
        drop(shaders);

        let mut per_binding_attributes: Vec<Vec<wgpu::VertexAttribute>> =
            vec![Vec::new(); vertex_layout.buffers.len()];
        for attribute in &vertex_layout.attributes {
            per_binding_attributes[attribute.buffer_index as usize].push(wgpu::VertexAttribute {
                format: attribute.format.into_wgpu(),
                offset: attribute.offset,
                shader_location: attribute.shader_location,
            });
        }
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = vertex_layout
            .buffers
            .iter()
            .enumerate()
            .filter(|(index, _)| !per_binding_attributes[*index].is_empty())
            .map(|(index, binding)| wgpu::VertexBufferLayout {
                array_stride: binding.stride,
                step_mode: binding.step_mode.into_wgpu(),
                attributes: &per_binding_attributes[index],
            })
            .collect();

        let targets: Vec<Option<wgpu::ColorTargetState>> = descriptor
            .color_targets
            .iter()
            .map(|target| {
                Some(wgpu::ColorTargetState {
                    format: target.format.into_wgpu(),
                    blend: blend_state(&target.blend),
                    write_mask: target.blend.write_mask.into_wgpu(),
                })
            })
            .collect();

        let depth_stencil = descriptor.depth_stencil.as_ref().map(|state| {
            wgpu::DepthStencilState {
                format: state.format.into_wgpu(),
                depth_write_enabled: state.depth_write_enabled,
                depth_compare: state.depth_compare.into_wgpu(),
                stencil: wgpu::StencilState {
                    front: state.stencil_front.into_wgpu(),
                    back: state.stencil_back.into_wgpu(),
                    read_mask: state.stencil_read_mask,
                    write_mask: state.stencil_write_mask,
                },
                bias: wgpu::DepthBiasState {
                    constant: descriptor.rasterizer.depth_bias,
                    slope_scale: descriptor.rasterizer.depth_bias_slope_scale,
                    clamp: descriptor.rasterizer.depth_bias_clamp,
                },
            }
        });

        let pipeline = self
            .inner
            .device()
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: descriptor.label.as_deref(),
                layout: None,
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(descriptor.vertex_shader.entry_point()),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &vertex_buffers,
                },
                primitive: wgpu::PrimitiveState {
                    topology: descriptor.topology.into_wgpu(),
                    strip_index_format: None,
                    front_face: descriptor.rasterizer.front_face.into_wgpu(),
                    cull_mode: descriptor.rasterizer.cull_mode.into_wgpu(),
                    unclipped_depth: false,
                    polygon_mode: descriptor.rasterizer.fill_mode.into_wgpu(),
                    conservative: false,
                },
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: descriptor.sample_count.into_wgpu(),
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: fragment_module.as_ref().map(|module| wgpu::FragmentState {
                    module,
                    entry_point: descriptor
                        .fragment_shader
                        .as_ref()
                        .map(|shader| shader.entry_point()),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &targets,
                }),
                multiview: None,
                cache: None,
            });

        let handle = self.inner.next();
        self.inner
            .pipelines
            .lock()
            .unwrap()
            .insert(handle, WgpuPipeline::Render(Arc::new(pipeline)));
        Ok(PipelineHandle(handle))
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineHandle, ResourceError> {
        let module = self
            .inner
            .shaders
            .lock()
            .unwrap()
            .get(&descriptor.shader.handle().0)
            .cloned()
            .ok_or(ResourceError::InvalidHandle)?;

        let pipeline = self
            .inner
            .device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: descriptor.label.as_deref(),
                layout: None,
                module: &module,
                entry_point: Some(descriptor.shader.entry_point()),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

        let handle = self.inner.next();
        self.inner
            .pipelines
            .lock()
            .unwrap()
            .insert(handle, WgpuPipeline::Compute(Arc::new(pipeline)));
        Ok(PipelineHandle(handle))
    }

    fn destroy_pipeline(&self, handle: PipelineHandle) {
        self.inner.pipelines.lock().unwrap().remove(&handle.0);
    }

    fn create_swap_chain(
        &self,
        window: &EngineWindowHandle,
        descriptor: &SwapChainDescriptor,
    ) -> Result<(SwapChainHandle, PixelFormat), ResourceError> {
        let surface_target = unsafe {
            SurfaceTargetUnsafe::from_window(window).map_err(|e| {
                ResourceError::BackendError(format!("failed to create surface target: {e}"))
            })?
        };
        let surface = unsafe {
            self.inner
                .context
                .instance
                .create_surface_unsafe(surface_target)
                .map_err(|e| ResourceError::BackendError(format!("failed to create surface: {e}")))?
        };

        let surface_caps = surface.get_capabilities(&self.inner.context.adapter);
        let requested = if descriptor.color_format == PixelFormat::Undefined {
            None
        } else {
            Some(descriptor.color_format.into_wgpu())
        };
        let format = requested
            .filter(|format| surface_caps.formats.contains(format))
            .or_else(|| surface_caps.formats.iter().copied().find(|f| f.is_srgb()))
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if descriptor.vertical_sync {
            wgpu::PresentMode::Fifo
        } else {
            [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
                .into_iter()
                .find(|mode| surface_caps.present_modes.contains(mode))
                .unwrap_or(wgpu::PresentMode::Fifo)
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: descriptor.width.max(1),
            height: descriptor.height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(self.inner.device(), &config);
        log::info!(
            "Swap chain created: {}x{} {:?} ({:?})",
            config.width,
            config.height,
            format,
            present_mode
        );

        let handle = self.inner.next();
        self.inner.swap_chains.lock().unwrap().insert(
            handle,
            WgpuSwapChainEntry {
                surface,
                config,
                current: None,
                _window: window.clone(),
            },
        );
        Ok((SwapChainHandle(handle), from_wgpu_texture_format(format)))
    }

    fn resize_swap_chain(
        &self,
        handle: SwapChainHandle,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError> {
        let mut swap_chains = self.inner.swap_chains.lock().unwrap();
        let entry = swap_chains
            .get_mut(&handle.0)
            .ok_or(ResourceError::InvalidHandle)?;
        entry.current = None;
        entry.config.width = width;
        entry.config.height = height;
        entry.surface.configure(self.inner.device(), &entry.config);
        Ok(())
    }

    fn acquire_swap_chain_texture(
        &self,
        handle: SwapChainHandle,
    ) -> Result<TextureHandle, DeviceError> {
        let mut swap_chains = self.inner.swap_chains.lock().unwrap();
        let entry = swap_chains
            .get_mut(&handle.0)
            .ok_or_else(|| DeviceError::SurfaceAcquisitionFailed("unknown swap chain".into()))?;

        if let Some((_, texture_handle)) = &entry.current {
            return Ok(TextureHandle(*texture_handle));
        }

        let mut reconfigured = false;
        let surface_texture = loop {
            match entry.surface.get_current_texture() {
                Ok(texture) => break texture,
                Err(e @ wgpu::SurfaceError::Lost) | Err(e @ wgpu::SurfaceError::Outdated)
                    if !reconfigured =>
                {
                    log::warn!("Swap chain surface lost/outdated ({e:?}); reconfiguring");
                    entry.surface.configure(self.inner.device(), &entry.config);
                    reconfigured = true;
                }
                Err(e) => {
                    return Err(DeviceError::SurfaceAcquisitionFailed(format!("{e:?}")));
                }
            }
        };

        let texture_handle = self.inner.next();
        self.inner
            .textures
            .lock()
            .unwrap()
            .insert(texture_handle, Arc::new(surface_texture.texture.clone()));
        entry.current = Some((surface_texture, texture_handle));
        Ok(TextureHandle(texture_handle))
    }

    fn present_swap_chain(&self, handle: SwapChainHandle) {
        let current = {
            let mut swap_chains = self.inner.swap_chains.lock().unwrap();
            swap_chains
                .get_mut(&handle.0)
                .and_then(|entry| entry.current.take())
        };
        if let Some((surface_texture, _)) = current {
            surface_texture.present();
        }
    }

    fn destroy_swap_chain(&self, handle: SwapChainHandle) {
        self.inner.swap_chains.lock().unwrap().remove(&handle.0);
    }

    fn create_command_recorder(&self, queue: QueueType) -> Box<dyn CommandRecorder> {
        Box::new(WgpuCommandRecorder::new(self.inner.clone(), queue))
    }

    fn submit(
        &self,
        queue: QueueType,
        recorders: &mut [&mut dyn CommandRecorder],
        wait_for_completion: bool,
    ) {
        let mut command_buffers = Vec::with_capacity(recorders.len());
        for recorder in recorders.iter_mut() {
            let Some(concrete) = recorder.as_any_mut().downcast_mut::<WgpuCommandRecorder>()
            else {
                log::error!("WgpuBackend::submit received a foreign recorder; skipping");
                continue;
            };
            if let Some(command_buffer) = concrete.take_finished() {
                command_buffers.push(command_buffer);
            }
        }
        log::trace!(
            "Submitting {} command buffers to the {queue:?} queue",
            command_buffers.len()
        );
        self.inner.queue().submit(command_buffers);
        if wait_for_completion {
            self.poll_wait();
        }
    }

    fn wait_idle(&self, _queue: Option<QueueType>) {
        self.poll_wait();
    }

    fn is_device_lost(&self) -> bool {
        self.inner.context.device_lost.load(Ordering::Relaxed)
    }
}
