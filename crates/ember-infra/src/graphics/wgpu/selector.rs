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

//! Graphics backend selection with fallback support.
//!
//! Attempts to initialize backends in the configured order of preference
//! (e.g. Dx12 then Vulkan on Windows, Metal on macOS) and falls back to
//! more compatible options when preferred backends fail.

use async_trait::async_trait;
use ember_core::gpu::backend::{BackendSelection, BackendSelector};
use ember_core::gpu::caps::{
    AdapterInfo, BackendSelectionConfig, BackendType, DeviceKind, ValidationMode,
};

/// The selector's output: the instance that found the adapter plus the
/// adapter itself, which together seed device creation.
#[derive(Debug)]
pub struct WgpuAdapter {
    /// The instance the adapter was requested from.
    pub instance: wgpu::Instance,
    /// The selected adapter.
    pub adapter: wgpu::Adapter,
}

/// WGPU-specific implementation of the [`BackendSelector`] trait.
#[derive(Debug, Default)]
pub struct WgpuBackendSelector {
    validation: ValidationMode,
}

impl WgpuBackendSelector {
    /// Creates a selector whose instances run at the given validation mode.
    pub fn new(validation: ValidationMode) -> Self {
        Self { validation }
    }

    fn instance_flags(&self) -> wgpu::InstanceFlags {
        match self.validation {
            ValidationMode::Disabled => wgpu::InstanceFlags::empty(),
            ValidationMode::Enabled => wgpu::InstanceFlags::VALIDATION,
            ValidationMode::Verbose => {
                wgpu::InstanceFlags::VALIDATION | wgpu::InstanceFlags::DEBUG
            }
        }
    }

    fn backend_to_type(backend: wgpu::Backend) -> BackendType {
        match backend {
            wgpu::Backend::Vulkan => BackendType::Vulkan,
            wgpu::Backend::Dx12 => BackendType::Dx12,
            wgpu::Backend::Gl => BackendType::OpenGL,
            wgpu::Backend::Metal => BackendType::Metal,
            wgpu::Backend::BrowserWebGpu => BackendType::WebGpu,
            _ => BackendType::Unknown,
        }
    }

    fn type_to_backends(backend_type: BackendType) -> wgpu::Backends {
        match backend_type {
            BackendType::Vulkan => wgpu::Backends::VULKAN,
            BackendType::Dx12 => wgpu::Backends::DX12,
            BackendType::OpenGL => wgpu::Backends::GL,
            BackendType::Metal => wgpu::Backends::METAL,
            BackendType::WebGpu => wgpu::Backends::BROWSER_WEBGPU,
            BackendType::Unknown => wgpu::Backends::all(),
        }
    }

    fn device_kind(device_type: wgpu::DeviceType) -> DeviceKind {
        match device_type {
            wgpu::DeviceType::IntegratedGpu => DeviceKind::IntegratedGpu,
            wgpu::DeviceType::DiscreteGpu => DeviceKind::DiscreteGpu,
            wgpu::DeviceType::VirtualGpu => DeviceKind::VirtualGpu,
            wgpu::DeviceType::Cpu => DeviceKind::Cpu,
            _ => DeviceKind::Unknown,
        }
    }

    /// Builds the engine-side adapter record from a wgpu adapter.
    pub fn adapter_info(adapter: &wgpu::Adapter) -> AdapterInfo {
        let info = adapter.get_info();
        AdapterInfo {
            name: info.name.clone(),
            backend_type: Self::backend_to_type(info.backend),
            device_kind: Self::device_kind(info.device_type),
            vendor_id: info.vendor,
            device_id: info.device,
        }
    }

    async fn try_backend(
        &self,
        backend_type: BackendType,
        prefer_discrete_gpu: bool,
    ) -> Result<WgpuAdapter, String> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: Self::type_to_backends(backend_type),
            flags: self.instance_flags(),
            ..Default::default()
        });

        let power_preference = if prefer_discrete_gpu {
            wgpu::PowerPreference::HighPerformance
        } else {
            wgpu::PowerPreference::LowPower
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| format!("no suitable adapter for {backend_type:?}: {e}"))?;

        let info = adapter.get_info();
        log::info!(
            "{:?} backend succeeded with adapter \"{}\"",
            backend_type,
            info.name
        );
        Ok(WgpuAdapter { instance, adapter })
    }
}

#[async_trait]
impl BackendSelector<WgpuAdapter> for WgpuBackendSelector {
    type Error = String;

    async fn select_backend(
        &self,
        config: &BackendSelectionConfig,
    ) -> Result<BackendSelection<WgpuAdapter>, Self::Error> {
        let mut attempted_backends = Vec::new();

        for &backend_type in &config.preferred_backends {
            attempted_backends.push(backend_type);
            if !self.is_backend_supported(backend_type) {
                log::debug!("{backend_type:?} backend is not supported on this platform");
                continue;
            }
            log::info!("Attempting to initialize {backend_type:?} backend...");

            match self.try_backend(backend_type, config.prefer_discrete_gpu).await {
                Ok(selected) => {
                    let adapter_info = Self::adapter_info(&selected.adapter);
                    return Ok(BackendSelection {
                        adapter: selected,
                        adapter_info,
                        attempted_backends,
                    });
                }
                Err(err) => {
                    log::warn!("Failed to initialize {backend_type:?} backend: {err}");
                    continue;
                }
            }
        }

        Err(format!(
            "All backend attempts failed. Attempted: {attempted_backends:?}"
        ))
    }

    fn is_backend_supported(&self, backend_type: BackendType) -> bool {
        match backend_type {
            BackendType::Vulkan => cfg!(any(target_os = "windows", target_os = "linux")),
            BackendType::Dx12 => cfg!(target_os = "windows"),
            BackendType::Metal => cfg!(target_os = "macos"),
            BackendType::OpenGL => true,
            BackendType::WebGpu => cfg!(target_arch = "wasm32"),
            BackendType::Unknown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_round_trip() {
        assert_eq!(
            WgpuBackendSelector::backend_to_type(wgpu::Backend::Vulkan),
            BackendType::Vulkan
        );
        assert_eq!(
            WgpuBackendSelector::type_to_backends(BackendType::Vulkan),
            wgpu::Backends::VULKAN
        );
        assert_eq!(
            WgpuBackendSelector::type_to_backends(BackendType::Metal),
            wgpu::Backends::METAL
        );
    }

    #[test]
    fn platform_support_matrix_is_consistent() {
        let selector = WgpuBackendSelector::default();
        assert!(!selector.is_backend_supported(BackendType::Unknown));
        assert!(selector.is_backend_supported(BackendType::OpenGL));
    }
}
