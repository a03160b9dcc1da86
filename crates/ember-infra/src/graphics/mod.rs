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

//! Concrete graphics backends and device bring-up.

pub mod wgpu;

use crate::graphics::wgpu::{WgpuBackend, WgpuBackendSelector, WgpuContext};
use anyhow::{anyhow, Result};
use ember_core::gpu::backend::BackendSelector;
use ember_core::gpu::caps::{BackendSelectionConfig, BackendType, ValidationMode};
use ember_core::gpu::device::GraphicsDevice;
use std::sync::Arc;

/// Initializes the graphics device: selects a backend (the explicit one, or
/// auto-selection in platform capability order), creates the logical device
/// and queues, and returns the device facade.
///
/// On failure the device stays uninitialized and the error describes every
/// backend that was attempted.
pub fn initialize(
    validation: ValidationMode,
    backend_type: Option<BackendType>,
) -> Result<Arc<GraphicsDevice>> {
    let mut config = match backend_type {
        Some(backend) => BackendSelectionConfig::with_backend(backend),
        None => BackendSelectionConfig::default(),
    };
    config.validation = validation;

    let selector = WgpuBackendSelector::new(validation);
    let selection = pollster::block_on(selector.select_backend(&config))
        .map_err(|e| anyhow!("backend selection failed: {e}"))?;
    log::info!(
        "Selected adapter \"{}\" ({:?}) after attempting {:?}",
        selection.adapter_info.name,
        selection.adapter_info.backend_type,
        selection.attempted_backends
    );

    let context = pollster::block_on(WgpuContext::new(selection.adapter))?;
    let backend = WgpuBackend::new(context);
    Ok(Arc::new(GraphicsDevice::new(Box::new(backend))))
}
