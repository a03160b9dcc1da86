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

//! Sandbox: boots the engine, opens a window, and clears the screen every
//! frame through the public graphics API.

use anyhow::Result;
use ember_core::gpu::{
    BackendType, Color, GraphicsDevice, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDescriptor, StoreOp, SwapChain, SwapChainDescriptor, ValidationMode,
};
use ember_core::platform::{AppHandler, EngineWindow};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Engine configuration, loadable from `sandbox.json` next to the binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct EngineConfig {
    title: String,
    width: u32,
    height: u32,
    vsync: bool,
    validation: bool,
    backend: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Ember Sandbox".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            validation: cfg!(debug_assertions),
            backend: None,
        }
    }
}

impl EngineConfig {
    fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(err) => {
                    log::warn!("Ignoring malformed {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn validation_mode(&self) -> ValidationMode {
        if self.validation {
            ValidationMode::Enabled
        } else {
            ValidationMode::Disabled
        }
    }

    fn backend_type(&self) -> Option<BackendType> {
        match self.backend.as_deref() {
            Some("vulkan") => Some(BackendType::Vulkan),
            Some("dx12") => Some(BackendType::Dx12),
            Some("metal") => Some(BackendType::Metal),
            Some("opengl") => Some(BackendType::OpenGL),
            Some(other) => {
                log::warn!("Unknown backend '{other}' in config; auto-selecting");
                None
            }
            None => None,
        }
    }
}

struct SandboxApp {
    config: EngineConfig,
    device: Option<Arc<GraphicsDevice>>,
    swap_chain: Option<Arc<SwapChain>>,
}

impl SandboxApp {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            device: None,
            swap_chain: None,
        }
    }

    fn render_frame(&self) -> Result<()> {
        let (Some(device), Some(swap_chain)) = (&self.device, &self.swap_chain) else {
            return Ok(());
        };
        if !device.begin_frame() {
            // Minimized or device lost; skip this frame.
            return Ok(());
        }

        if let Some(back_buffer) = swap_chain.current_texture() {
            let view = back_buffer.whole_view()?;
            let queue = device.graphics_queue();
            let mut commands = queue.get_command_buffer()?;
            commands.begin_render_pass(&RenderPassDescriptor {
                label: Some("clear"),
                color_attachments: &[RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::new(0.01, 0.02, 0.03, 1.0)),
                        store: StoreOp::Store,
                    },
                }],
                depth_stencil_attachment: None,
            });
            commands.end_render_pass();
            queue.submit(vec![commands], false);
        }

        device.end_frame();
        Ok(())
    }
}

impl AppHandler for SandboxApp {
    fn on_ready(&mut self, window: &dyn EngineWindow) {
        match ember_infra::initialize(self.config.validation_mode(), self.config.backend_type()) {
            Ok(device) => {
                let (width, height) = window.inner_size();
                let descriptor = SwapChainDescriptor {
                    width,
                    height,
                    vertical_sync: self.config.vsync,
                    ..Default::default()
                };
                match device.create_swap_chain(&window.clone_handle(), &descriptor) {
                    Ok(swap_chain) => {
                        log::info!(
                            "Swap chain ready: {}x{} ({:?})",
                            swap_chain.width(),
                            swap_chain.height(),
                            swap_chain.color_format()
                        );
                        self.swap_chain = Some(swap_chain);
                    }
                    Err(err) => log::error!("Swap chain creation failed: {err}"),
                }
                self.device = Some(device);
            }
            Err(err) => log::error!("Graphics initialization failed: {err:#}"),
        }
    }

    fn on_tick(&mut self, _window: &dyn EngineWindow) -> bool {
        if self.device.is_none() || self.swap_chain.is_none() {
            return false;
        }
        if let Err(err) = self.render_frame() {
            log::error!("Frame failed: {err:#}");
            return false;
        }
        true
    }

    fn on_resized(&mut self, width: u32, height: u32) {
        if let Some(swap_chain) = &self.swap_chain {
            if let Err(err) = swap_chain.resize(width, height) {
                log::warn!("Swap chain resize failed: {err}");
            }
        }
    }

    fn on_exit(&mut self) {
        if let Some(device) = &self.device {
            device.wait_idle();
        }
        self.swap_chain = None;
        self.device = None;
        log::info!("Sandbox shut down.");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::load(Path::new("sandbox.json"));
    log::info!("Starting sandbox: {config:?}");

    let title = config.title.clone();
    let (width, height) = (config.width, config.height);
    ember_infra::run_app(&title, width, height, SandboxApp::new(config))
}
