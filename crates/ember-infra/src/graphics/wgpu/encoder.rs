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

//! The WGPU command recorder.
//!
//! Individual `(set, binding)` binds are collected into per-set maps and
//! materialized as transient bind groups (against the pipeline's auto
//! layout) right before a draw or dispatch. Render passes use
//! `forget_lifetime` so the pass can live next to its encoder; the core
//! layer guarantees passes are balanced before `finish`.

use super::backend::WgpuBackendInner;
use super::conversions::IntoWgpu;
use ember_core::gpu::backend::{
    BufferHandle, CommandRecorder, PipelineHandle, SamplerHandle, TextureViewHandle,
};
use ember_core::gpu::caps::QueueType;
use ember_core::gpu::command::{LoadOp, RenderPassDescriptor, ScissorRect, StoreOp, Viewport};
use ember_core::gpu::format::IndexFormat;
use ember_core::gpu::pipeline::PipelineKind;
use ember_core::gpu::MAX_DESCRIPTOR_SETS;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum WgpuBinding {
    UniformBuffer {
        buffer: Arc<wgpu::Buffer>,
        offset: u64,
        size: u64,
    },
    Texture(Arc<wgpu::TextureView>),
    Sampler(Arc<wgpu::Sampler>),
}

/// WGPU implementation of the core's raw recording surface.
pub struct WgpuCommandRecorder {
    inner: Arc<WgpuBackendInner>,
    queue_type: QueueType,
    encoder: Option<wgpu::CommandEncoder>,
    render_pass: Option<wgpu::RenderPass<'static>>,
    finished: Option<wgpu::CommandBuffer>,

    render_pipeline: Option<Arc<wgpu::RenderPipeline>>,
    compute_pipeline: Option<Arc<wgpu::ComputePipeline>>,
    vertex_buffers: BTreeMap<u32, (Arc<wgpu::Buffer>, u64)>,
    index_buffer: Option<(Arc<wgpu::Buffer>, u64, wgpu::IndexFormat)>,
    bindings: Vec<BTreeMap<u32, WgpuBinding>>,
    dirty_sets: Vec<bool>,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
    push_constants: Option<Vec<u8>>,
}

impl fmt::Debug for WgpuCommandRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuCommandRecorder")
            .field("queue_type", &self.queue_type)
            .field("recording", &self.encoder.is_some())
            .field("inside_render_pass", &self.render_pass.is_some())
            .finish()
    }
}

impl WgpuCommandRecorder {
    pub(crate) fn new(inner: Arc<WgpuBackendInner>, queue_type: QueueType) -> Self {
        Self {
            inner,
            queue_type,
            encoder: None,
            render_pass: None,
            finished: None,
            render_pipeline: None,
            compute_pipeline: None,
            vertex_buffers: BTreeMap::new(),
            index_buffer: None,
            bindings: vec![BTreeMap::new(); MAX_DESCRIPTOR_SETS],
            dirty_sets: vec![false; MAX_DESCRIPTOR_SETS],
            viewport: None,
            scissor: None,
            push_constants: None,
        }
    }

    /// Takes the finished command buffer after `finish` ran. Used by the
    /// backend at submit time.
    pub(crate) fn take_finished(&mut self) -> Option<wgpu::CommandBuffer> {
        self.finished.take()
    }

    fn build_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        bindings: &BTreeMap<u32, WgpuBinding>,
    ) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry> = bindings
            .iter()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: match resource {
                    WgpuBinding::UniformBuffer {
                        buffer,
                        offset,
                        size,
                    } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset: *offset,
                        size: NonZeroU64::new(*size),
                    }),
                    WgpuBinding::Texture(view) => wgpu::BindingResource::TextureView(view),
                    WgpuBinding::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                },
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &entries,
        })
    }

    fn flush_render_state(&mut self) {
        let Some(pass) = self.render_pass.as_mut() else {
            return;
        };
        let device = &self.inner.context.device;
        let Some(pipeline) = self.render_pipeline.as_ref() else {
            return;
        };
        for set in 0..MAX_DESCRIPTOR_SETS {
            if !self.dirty_sets[set] || self.bindings[set].is_empty() {
                continue;
            }
            let layout = pipeline.get_bind_group_layout(set as u32);
            let bind_group = Self::build_bind_group(device, &layout, &self.bindings[set]);
            pass.set_bind_group(set as u32, &bind_group, &[]);
            self.dirty_sets[set] = false;
        }
        if let Some(data) = &self.push_constants {
            pass.set_push_constants(wgpu::ShaderStages::VERTEX_FRAGMENT, 0, data);
        }
    }
}

impl CommandRecorder for WgpuCommandRecorder {
    fn begin(&mut self, label: Option<&str>) {
        debug_assert!(self.render_pass.is_none());
        self.encoder = Some(
            self.inner
                .context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label }),
        );
        self.finished = None;
        self.render_pipeline = None;
        self.compute_pipeline = None;
        self.vertex_buffers.clear();
        self.index_buffer = None;
        for bindings in &mut self.bindings {
            bindings.clear();
        }
        self.dirty_sets.fill(false);
        self.viewport = None;
        self.scissor = None;
        self.push_constants = None;
    }

    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor<'_>) {
        // Clone the (internally reference-counted) views into locals so the
        // attachment structs can borrow them; `forget_lifetime` keeps the
        // underlying resources alive for the duration of the pass.
        let mut resolved_views: Vec<Option<(wgpu::TextureView, Option<wgpu::TextureView>)>> =
            Vec::with_capacity(descriptor.color_attachments.len());
        for attachment in descriptor.color_attachments {
            match self.inner.get_view(attachment.view.handle().0) {
                Some(view) => {
                    let resolve_target = attachment
                        .resolve_target
                        .and_then(|target| self.inner.get_view(target.handle().0))
                        .map(|target| (*target).clone());
                    resolved_views.push(Some(((*view).clone(), resolve_target)));
                }
                None => {
                    log::error!("Render pass color attachment view not found; skipping");
                    resolved_views.push(None);
                }
            }
        }

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = resolved_views
            .iter()
            .zip(descriptor.color_attachments)
            .map(|(entry, attachment)| {
                entry.as_ref().map(|(view, resolve_target)| {
                    wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: resolve_target.as_ref(),
                        ops: wgpu::Operations {
                            load: match attachment.ops.load {
                                LoadOp::Load => wgpu::LoadOp::Load,
                                LoadOp::Clear(color) => wgpu::LoadOp::Clear(color.into_wgpu()),
                            },
                            store: match attachment.ops.store {
                                StoreOp::Store => wgpu::StoreOp::Store,
                                StoreOp::Discard => wgpu::StoreOp::Discard,
                            },
                        },
                        depth_slice: None,
                    }
                })
            })
            .collect();

        let depth_view: Option<wgpu::TextureView> = descriptor
            .depth_stencil_attachment
            .as_ref()
            .and_then(|attachment| self.inner.get_view(attachment.view.handle().0))
            .map(|view| (*view).clone());
        let depth_stencil_attachment = descriptor
            .depth_stencil_attachment
            .as_ref()
            .zip(depth_view.as_ref())
            .map(|(attachment, view)| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: attachment.depth_ops.as_ref().map(|ops| wgpu::Operations {
                    load: match ops.load {
                        LoadOp::Load => wgpu::LoadOp::Load,
                        LoadOp::Clear(depth) => wgpu::LoadOp::Clear(depth),
                    },
                    store: match ops.store {
                        StoreOp::Store => wgpu::StoreOp::Store,
                        StoreOp::Discard => wgpu::StoreOp::Discard,
                    },
                }),
                stencil_ops: attachment.stencil_ops.as_ref().map(|ops| wgpu::Operations {
                    load: match ops.load {
                        LoadOp::Load => wgpu::LoadOp::Load,
                        LoadOp::Clear(stencil) => wgpu::LoadOp::Clear(stencil),
                    },
                    store: match ops.store {
                        StoreOp::Store => wgpu::StoreOp::Store,
                        StoreOp::Discard => wgpu::StoreOp::Discard,
                    },
                }),
            });

        let pass = self
            .encoder
            .as_mut()
            .expect("begin_render_pass before begin")
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: descriptor.label,
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        self.render_pass = Some(pass);

        // Re-apply stashed state so binds recorded before the pass opened
        // land on it.
        if let Some(pipeline) = self.render_pipeline.clone() {
            if let Some(pass) = self.render_pass.as_mut() {
                pass.set_pipeline(&pipeline);
            }
        }
        let vertex_buffers: Vec<(u32, Arc<wgpu::Buffer>, u64)> = self
            .vertex_buffers
            .iter()
            .map(|(slot, (buffer, offset))| (*slot, buffer.clone(), *offset))
            .collect();
        if let Some(pass) = self.render_pass.as_mut() {
            for (slot, buffer, offset) in vertex_buffers {
                pass.set_vertex_buffer(slot, buffer.slice(offset..));
            }
            if let Some((buffer, offset, format)) = &self.index_buffer {
                pass.set_index_buffer(buffer.slice(*offset..), *format);
            }
            if let Some(viewport) = &self.viewport {
                pass.set_viewport(
                    viewport.x,
                    viewport.y,
                    viewport.width,
                    viewport.height,
                    viewport.min_depth,
                    viewport.max_depth,
                );
            }
            if let Some(scissor) = &self.scissor {
                pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
            }
        }
        self.dirty_sets.fill(true);
    }

    fn end_render_pass(&mut self) {
        self.render_pass = None;
    }

    fn set_pipeline(&mut self, pipeline: PipelineHandle, kind: PipelineKind) {
        match kind {
            PipelineKind::Render => {
                let Some(resolved) = self.inner.get_render_pipeline(pipeline.0) else {
                    log::error!("Render pipeline {pipeline:?} not found");
                    return;
                };
                if let Some(pass) = self.render_pass.as_mut() {
                    pass.set_pipeline(&resolved);
                }
                self.render_pipeline = Some(resolved);
                self.dirty_sets.fill(true);
            }
            PipelineKind::Compute => {
                let Some(resolved) = self.inner.get_compute_pipeline(pipeline.0) else {
                    log::error!("Compute pipeline {pipeline:?} not found");
                    return;
                };
                self.compute_pipeline = Some(resolved);
                self.dirty_sets.fill(true);
            }
            PipelineKind::RayTracing => {
                log::error!("Ray-tracing pipelines are not supported by the wgpu backend");
            }
        }
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        if let Some(pass) = self.render_pass.as_mut() {
            pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                viewport.min_depth,
                viewport.max_depth,
            );
        }
        self.viewport = Some(*viewport);
    }

    fn set_scissor(&mut self, scissor: &ScissorRect) {
        if let Some(pass) = self.render_pass.as_mut() {
            pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
        }
        self.scissor = Some(*scissor);
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        let Some(resolved) = self.inner.get_buffer(buffer.0) else {
            log::error!("Vertex buffer {buffer:?} not found");
            return;
        };
        if let Some(pass) = self.render_pass.as_mut() {
            pass.set_vertex_buffer(slot, resolved.slice(offset..));
        }
        self.vertex_buffers.insert(slot, (resolved, offset));
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat) {
        let Some(resolved) = self.inner.get_buffer(buffer.0) else {
            log::error!("Index buffer {buffer:?} not found");
            return;
        };
        let format = format.into_wgpu();
        if let Some(pass) = self.render_pass.as_mut() {
            pass.set_index_buffer(resolved.slice(offset..), format);
        }
        self.index_buffer = Some((resolved, offset, format));
    }

    fn bind_uniform_buffer(
        &mut self,
        set: u32,
        binding: u32,
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    ) {
        let Some(resolved) = self.inner.get_buffer(buffer.0) else {
            log::error!("Uniform buffer {buffer:?} not found");
            return;
        };
        self.bindings[set as usize].insert(
            binding,
            WgpuBinding::UniformBuffer {
                buffer: resolved,
                offset,
                size,
            },
        );
        self.dirty_sets[set as usize] = true;
    }

    fn bind_texture(&mut self, set: u32, binding: u32, view: TextureViewHandle) {
        let Some(resolved) = self.inner.get_view(view.0) else {
            log::error!("Texture view {view:?} not found");
            return;
        };
        self.bindings[set as usize].insert(binding, WgpuBinding::Texture(resolved));
        self.dirty_sets[set as usize] = true;
    }

    fn bind_sampler(&mut self, set: u32, binding: u32, sampler: SamplerHandle) {
        let Some(resolved) = self.inner.get_sampler(sampler.0) else {
            log::error!("Sampler {sampler:?} not found");
            return;
        };
        self.bindings[set as usize].insert(binding, WgpuBinding::Sampler(resolved));
        self.dirty_sets[set as usize] = true;
    }

    fn set_push_constants(&mut self, data: &[u8]) {
        if let Some(pass) = self.render_pass.as_mut() {
            pass.set_push_constants(wgpu::ShaderStages::VERTEX_FRAGMENT, 0, data);
        }
        self.push_constants = Some(data.to_vec());
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.flush_render_state();
        if let Some(pass) = self.render_pass.as_mut() {
            pass.draw(
                first_vertex..first_vertex + vertex_count,
                first_instance..first_instance + instance_count,
            );
        }
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) {
        self.flush_render_state();
        if let Some(pass) = self.render_pass.as_mut() {
            pass.draw_indexed(
                first_index..first_index + index_count,
                base_vertex,
                first_instance..first_instance + instance_count,
            );
        }
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        let Some(encoder) = self.encoder.as_mut() else {
            return;
        };
        let Some(pipeline) = self.compute_pipeline.as_ref() else {
            log::error!("dispatch recorded without a compute pipeline bound");
            return;
        };

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        for set in 0..MAX_DESCRIPTOR_SETS {
            if self.bindings[set].is_empty() {
                continue;
            }
            let layout = pipeline.get_bind_group_layout(set as u32);
            let bind_group =
                Self::build_bind_group(&self.inner.context.device, &layout, &self.bindings[set]);
            pass.set_bind_group(set as u32, &bind_group, &[]);
        }
        if let Some(data) = &self.push_constants {
            pass.set_push_constants(0, data);
        }
        pass.dispatch_workgroups(group_count_x, group_count_y, group_count_z);
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(resolved) = self.inner.get_buffer(buffer.0) else {
            log::error!("update_buffer target {buffer:?} not found");
            return;
        };
        // Pad to wgpu's copy alignment, bounded by the buffer itself.
        let remainder = data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT;
        if remainder != 0 {
            let padded_len = (data.len() as u64 + wgpu::COPY_BUFFER_ALIGNMENT - remainder)
                .min(resolved.size() - offset) as usize;
            let mut padded = data.to_vec();
            padded.resize(padded_len, 0);
            self.inner.context.queue.write_buffer(&resolved, offset, &padded);
        } else {
            self.inner.context.queue.write_buffer(&resolved, offset, data);
        }
    }

    fn copy_buffer(
        &mut self,
        src: BufferHandle,
        src_offset: u64,
        dst: BufferHandle,
        dst_offset: u64,
        size: u64,
    ) {
        let (Some(src), Some(dst)) = (self.inner.get_buffer(src.0), self.inner.get_buffer(dst.0))
        else {
            log::error!("copy_buffer with an unknown source or destination");
            return;
        };
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.copy_buffer_to_buffer(&src, src_offset, &dst, dst_offset, size);
        }
    }

    fn finish(&mut self) {
        debug_assert!(self.render_pass.is_none(), "finish with an open render pass");
        self.render_pass = None;
        if let Some(encoder) = self.encoder.take() {
            self.finished = Some(encoder.finish());
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
