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

//! Core WGPU state: instance, adapter, logical device, and queue.

use super::selector::{WgpuAdapter, WgpuBackendSelector};
use anyhow::{anyhow, Result};
use ember_core::gpu::caps::{DeviceCaps, DeviceFeatures, DeviceLimits, ShaderBlobKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Holds the WGPU objects shared by every backend operation, along with
/// the capability record derived from the adapter.
#[derive(Debug)]
pub struct WgpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub caps: DeviceCaps,
    pub device_lost: Arc<AtomicBool>,
}

impl WgpuContext {
    /// Creates the logical device and queue from a selected adapter and
    /// derives the engine capability record.
    pub async fn new(selected: WgpuAdapter) -> Result<Self> {
        let WgpuAdapter { instance, adapter } = selected;

        let desired_features = wgpu::Features::PUSH_CONSTANTS
            | wgpu::Features::TIMESTAMP_QUERY
            | wgpu::Features::TEXTURE_BINDING_ARRAY
            | wgpu::Features::PARTIALLY_BOUND_BINDING_ARRAY
            | wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER
            | wgpu::Features::POLYGON_MODE_LINE
            | wgpu::Features::SPIRV_SHADER_PASSTHROUGH;
        let features_to_enable = adapter.features() & desired_features;

        let mut required_limits = wgpu::Limits::default();
        if features_to_enable.contains(wgpu::Features::PUSH_CONSTANTS) {
            required_limits.max_push_constant_size = adapter.limits().max_push_constant_size;
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Ember Logical Device"),
                required_features: features_to_enable,
                required_limits,
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {e}"))?;
        log::info!("Logical device and command queue created.");

        let device_lost = Arc::new(AtomicBool::new(false));
        let lost_flag = device_lost.clone();
        device.on_uncaptured_error(Box::new(move |error| {
            log::error!("WGPU uncaptured error: {error}");
            if matches!(
                error,
                wgpu::Error::OutOfMemory { .. } | wgpu::Error::Internal { .. }
            ) {
                lost_flag.store(true, Ordering::Relaxed);
            }
        }));

        let caps = Self::build_caps(&adapter, device.features(), device.limits());
        log::info!("Active device features: {:?}", device.features());

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            caps,
            device_lost,
        })
    }

    fn build_caps(
        adapter: &wgpu::Adapter,
        features: wgpu::Features,
        limits: wgpu::Limits,
    ) -> DeviceCaps {
        let mut device_features = DeviceFeatures::EMPTY;
        if features.contains(
            wgpu::Features::TEXTURE_BINDING_ARRAY
                | wgpu::Features::PARTIALLY_BOUND_BINDING_ARRAY,
        ) {
            device_features.insert(DeviceFeatures::BINDLESS_DESCRIPTORS);
        }
        if features.contains(wgpu::Features::PUSH_CONSTANTS) {
            device_features.insert(DeviceFeatures::PUSH_CONSTANTS);
        }
        if features.contains(wgpu::Features::TIMESTAMP_QUERY) {
            device_features.insert(DeviceFeatures::TIMESTAMP_QUERIES);
        }
        // Indirect arguments are part of the wgpu core feature set.
        device_features.insert(DeviceFeatures::INDIRECT_DRAW);

        DeviceCaps {
            adapter: WgpuBackendSelector::adapter_info(adapter),
            features: device_features,
            limits: DeviceLimits {
                max_texture_dimension_2d: limits.max_texture_dimension_2d,
                max_texture_dimension_3d: limits.max_texture_dimension_3d,
                max_uniform_buffer_range: limits.max_uniform_buffer_binding_size as u64,
                max_storage_buffer_range: limits.max_storage_buffer_binding_size as u64,
                max_push_constant_size: limits.max_push_constant_size,
                max_sampled_textures_per_stage: limits.max_sampled_textures_per_shader_stage,
                max_samplers_per_stage: limits.max_samplers_per_shader_stage,
                max_uniform_buffers_per_stage: limits.max_uniform_buffers_per_shader_stage,
                max_storage_buffers_per_stage: limits.max_storage_buffers_per_shader_stage,
            },
            shader_blob_kind: ShaderBlobKind::Spirv,
        }
    }
}
