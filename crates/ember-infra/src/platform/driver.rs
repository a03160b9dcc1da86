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

//! The winit main-loop driver.
//!
//! Hides the OS message pump behind the core's [`AppHandler`] lifecycle:
//! one `on_tick` per redraw, resize forwarding, and a clean exit signal.

use crate::platform::window::winit::{WinitWindow, WinitWindowBuilder};
use anyhow::Result;
use ember_core::platform::host::AppHandler;
use ember_core::platform::EngineWindow;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

struct WinitDriver<H: AppHandler> {
    handler: H,
    window: Option<WinitWindow>,
    title: String,
    width: u32,
    height: u32,
}

impl<H: AppHandler> ApplicationHandler for WinitDriver<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let built = WinitWindowBuilder::new()
            .with_title(self.title.clone())
            .with_dimensions(self.width, self.height)
            .build(event_loop);
        match built {
            Ok(window) => {
                self.handler.on_ready(&window);
                self.window = Some(window);
            }
            Err(err) => {
                log::error!("Window creation failed: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested; exiting main loop");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.handler.on_resized(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if !self.handler.on_tick(&window) {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.handler.on_exit();
    }
}

/// Runs the host event loop until the handler requests exit or the window
/// closes, delivering the [`AppHandler`] lifecycle along the way.
pub fn run_app<H: AppHandler>(title: &str, width: u32, height: u32, handler: H) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut driver = WinitDriver {
        handler,
        window: None,
        title: title.to_string(),
        width,
        height,
    };
    event_loop.run_app(&mut driver)?;
    Ok(())
}
