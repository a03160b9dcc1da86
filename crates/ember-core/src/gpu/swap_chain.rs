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

//! The swap chain: the rotating back-buffer chain bound to a host window.

use crate::gpu::backend::{GpuObjectId, GpuObjectKind, SwapChainHandle};
use crate::gpu::device::DeviceShared;
use crate::gpu::error::ResourceError;
use crate::gpu::format::{PixelFormat, SampleCount};
use crate::gpu::texture::{Extent3D, Texture, TextureDescriptor, TextureKind, TextureUsage};
use std::sync::{Arc, Mutex};

/// A descriptor used to create a [`SwapChain`].
#[derive(Debug, Clone)]
pub struct SwapChainDescriptor {
    /// The preferred color format; the backend may negotiate another
    /// compatible one with the surface.
    pub color_format: PixelFormat,
    /// Initial width in pixels.
    pub width: u32,
    /// Initial height in pixels.
    pub height: u32,
    /// Whether presentation waits for vertical sync (honored best-effort).
    pub vertical_sync: bool,
    /// Whether the swap chain targets exclusive fullscreen.
    pub fullscreen: bool,
}

impl Default for SwapChainDescriptor {
    fn default() -> Self {
        Self {
            color_format: PixelFormat::Bgra8UnormSrgb,
            width: 1280,
            height: 720,
            vertical_sync: true,
            fullscreen: false,
        }
    }
}

/// A chain of back-buffer textures cycled between the engine and the
/// display, bound to one host window.
#[derive(Debug)]
pub struct SwapChain {
    shared: Arc<DeviceShared>,
    object_id: GpuObjectId,
    handle: SwapChainHandle,
    color_format: PixelFormat,
    extent: Mutex<(u32, u32)>,
    vertical_sync: bool,
    fullscreen: bool,
    current: Mutex<Option<Arc<Texture>>>,
}

impl SwapChain {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        object_id: GpuObjectId,
        handle: SwapChainHandle,
        color_format: PixelFormat,
        descriptor: &SwapChainDescriptor,
    ) -> Self {
        Self {
            shared,
            object_id,
            handle,
            color_format,
            extent: Mutex::new((descriptor.width, descriptor.height)),
            vertical_sync: descriptor.vertical_sync,
            fullscreen: descriptor.fullscreen,
            current: Mutex::new(None),
        }
    }

    /// The color format negotiated with the surface.
    pub fn color_format(&self) -> PixelFormat {
        self.color_format
    }

    /// Current width in pixels.
    pub fn width(&self) -> u32 {
        self.extent.lock().unwrap().0
    }

    /// Current height in pixels.
    pub fn height(&self) -> u32 {
        self.extent.lock().unwrap().1
    }

    /// Whether presentation waits for vertical sync.
    pub fn vertical_sync(&self) -> bool {
        self.vertical_sync
    }

    /// Whether the swap chain targets exclusive fullscreen.
    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// `true` while the bound window has no presentable area.
    pub fn is_minimized(&self) -> bool {
        let (width, height) = *self.extent.lock().unwrap();
        width == 0 || height == 0
    }

    /// Stores the new dimensions and recreates the back-buffer chain.
    ///
    /// Outstanding back-buffer references must be released by the caller
    /// first; the swap chain drops its own acquired texture here.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), ResourceError> {
        self.current.lock().unwrap().take();
        *self.extent.lock().unwrap() = (width, height);
        if width == 0 || height == 0 {
            log::debug!("SwapChain minimized ({width}x{height}); back buffers not recreated");
            return Ok(());
        }
        self.resize_backbuffers(width, height)
    }

    fn resize_backbuffers(&self, width: u32, height: u32) -> Result<(), ResourceError> {
        log::debug!("SwapChain: recreating back buffers at {width}x{height}");
        self.shared
            .backend()
            .resize_swap_chain(self.handle, width, height)
    }

    /// Acquires the texture bound to the next present, if the surface is
    /// available. Idempotent within a frame.
    pub(crate) fn acquire(&self) -> Option<Arc<Texture>> {
        if self.is_minimized() {
            return None;
        }
        let mut current = self.current.lock().unwrap();
        if let Some(texture) = current.as_ref() {
            return Some(texture.clone());
        }
        match self.shared.backend().acquire_swap_chain_texture(self.handle) {
            Ok(texture_handle) => {
                let (width, height) = *self.extent.lock().unwrap();
                let descriptor = TextureDescriptor {
                    label: Some("swap chain back buffer".to_string()),
                    kind: TextureKind::D2,
                    format: self.color_format,
                    extent: Extent3D {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: SampleCount::X1,
                    usage: TextureUsage::RENDER_TARGET,
                };
                let object_id = self
                    .shared
                    .register(GpuObjectKind::Texture, texture_handle.0);
                let texture = Arc::new(Texture::new(
                    self.shared.clone(),
                    object_id,
                    texture_handle,
                    &descriptor,
                    1,
                ));
                *current = Some(texture.clone());
                Some(texture)
            }
            Err(err) => {
                log::warn!("SwapChain: failed to acquire back buffer: {err}");
                None
            }
        }
    }

    /// The texture bound to the next present, or `None` when the surface is
    /// unavailable (minimized or not yet acquired this frame).
    pub fn current_texture(&self) -> Option<Arc<Texture>> {
        self.current.lock().unwrap().clone()
    }

    /// Presents the acquired back buffer, if any, and releases it.
    pub(crate) fn present(&self) {
        if self.current.lock().unwrap().take().is_some() {
            self.shared.backend().present_swap_chain(self.handle);
        }
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        self.current.lock().unwrap().take();
        if self.shared.unregister(self.object_id) {
            self.shared.backend().destroy_swap_chain(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::backend::mock::MockBackend;
    use crate::gpu::device::GraphicsDevice;
    use crate::platform::window::EngineWindowHandle;
    use raw_window_handle::{
        DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
        RawWindowHandle, WebDisplayHandle, WebWindowHandle, WindowHandle,
    };

    #[derive(Debug)]
    struct FakeWindow;

    impl HasWindowHandle for FakeWindow {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            Ok(unsafe { WindowHandle::borrow_raw(RawWindowHandle::Web(WebWindowHandle::new(1))) })
        }
    }

    impl HasDisplayHandle for FakeWindow {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            Ok(unsafe { DisplayHandle::borrow_raw(RawDisplayHandle::Web(WebDisplayHandle::new())) })
        }
    }

    fn fake_window() -> EngineWindowHandle {
        Arc::new(FakeWindow)
    }

    fn test_swap_chain(width: u32, height: u32) -> (MockBackend, GraphicsDevice, Arc<SwapChain>) {
        let backend = MockBackend::new();
        let device = GraphicsDevice::new(Box::new(backend.clone()));
        let swap_chain = device
            .create_swap_chain(
                &fake_window(),
                &SwapChainDescriptor {
                    width,
                    height,
                    ..Default::default()
                },
            )
            .unwrap();
        (backend, device, swap_chain)
    }

    #[test]
    fn minimized_swap_chain_blocks_the_frame() {
        let (_backend, device, swap_chain) = test_swap_chain(0, 0);
        assert!(swap_chain.is_minimized());
        assert!(!device.begin_frame());

        swap_chain.resize(800, 600).unwrap();
        assert!(!swap_chain.is_minimized());
        assert!(device.begin_frame());
        device.end_frame();
    }

    #[test]
    fn current_texture_is_none_until_acquired() {
        let (backend, device, swap_chain) = test_swap_chain(1280, 720);
        assert!(swap_chain.current_texture().is_none());

        assert!(device.begin_frame());
        let back_buffer = swap_chain.current_texture().expect("acquired back buffer");
        assert_eq!(back_buffer.format(), swap_chain.color_format());

        drop(back_buffer);
        device.end_frame();
        // Presented and released.
        assert!(swap_chain.current_texture().is_none());
        assert!(backend.recorded_ops().contains(&"present".to_string()));
    }

    #[test]
    fn resize_stores_dimensions_and_recreates_backbuffers() {
        let (backend, _device, swap_chain) = test_swap_chain(1280, 720);
        swap_chain.resize(640, 480).unwrap();
        assert_eq!((swap_chain.width(), swap_chain.height()), (640, 480));

        let chains = backend.state.swap_chains.lock().unwrap();
        let descriptor = chains.values().next().unwrap();
        assert_eq!((descriptor.width, descriptor.height), (640, 480));
    }
}

