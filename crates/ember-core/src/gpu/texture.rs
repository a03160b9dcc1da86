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

//! GPU texture, texture-view, and sampler resources.

use crate::ember_bitflags;
use crate::gpu::backend::{GpuObjectId, SamplerHandle, TextureHandle, TextureViewHandle};
use crate::gpu::device::DeviceShared;
use crate::gpu::error::ResourceError;
use crate::gpu::format::{PixelFormat, SampleCount};
use crate::gpu::pipeline::CompareFunction;
use crate::gpu::INVALID_BINDLESS_INDEX;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureKind {
    /// A one-dimensional texture.
    D1,
    /// A two-dimensional texture.
    #[default]
    D2,
    /// A three-dimensional (volumetric) texture.
    D3,
    /// A cubemap (6 faces of a 2D texture).
    Cube,
}

/// The extent of a texture: width, height, and depth or array layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3D {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth for 3D textures, array layer count otherwise.
    pub depth_or_array_layers: u32,
}

impl Default for Extent3D {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        }
    }
}

ember_bitflags! {
    /// A set of flags describing the allowed usages of a texture.
    pub struct TextureUsage: u32 {
        /// The texture can be the source of a copy operation.
        const COPY_SRC = 1 << 0;
        /// The texture can be the destination of a copy operation.
        const COPY_DST = 1 << 1;
        /// The texture can be sampled from shaders.
        const SAMPLED = 1 << 2;
        /// The texture can be read/written from shaders as storage.
        const STORAGE = 1 << 3;
        /// The texture can be a color attachment in a render pass.
        const RENDER_TARGET = 1 << 4;
        /// The texture can be a depth/stencil attachment.
        const DEPTH_STENCIL = 1 << 5;
    }
}

/// Computes the length of the full mip chain for the given extent.
pub fn compute_mip_level_count(width: u32, height: u32, depth_or_array_layers: u32) -> u32 {
    let largest = width.max(height).max(depth_or_array_layers).max(1);
    32 - largest.leading_zeros()
}

/// A descriptor used to create a [`Texture`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// An optional debug label.
    pub label: Option<String>,
    /// The dimensionality of the texture.
    pub kind: TextureKind,
    /// The format of the texels. Must not be [`PixelFormat::Undefined`].
    pub format: PixelFormat,
    /// The dimensions of the texture. `width` must be at least 1 and
    /// `depth_or_array_layers` at least 1.
    pub extent: Extent3D,
    /// The number of mipmap levels. Zero requests the full mip chain,
    /// `⌊log2(max(w, h, d))⌋ + 1`.
    pub mip_level_count: u32,
    /// The number of samples per pixel.
    pub sample_count: SampleCount,
    /// A bitmask of [`TextureUsage`] flags.
    pub usage: TextureUsage,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            kind: TextureKind::D2,
            format: PixelFormat::Undefined,
            extent: Extent3D::default(),
            mip_level_count: 1,
            sample_count: SampleCount::X1,
            usage: TextureUsage::SAMPLED,
        }
    }
}

impl TextureDescriptor {
    /// Builds a 2D texture descriptor. `mip_level_count == 0` requests the
    /// full mip chain.
    pub fn new_2d(format: PixelFormat, width: u32, height: u32, mip_level_count: u32) -> Self {
        Self {
            kind: TextureKind::D2,
            format,
            extent: Extent3D {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            ..Default::default()
        }
    }
}

/// A view descriptor: a reinterpretation of a texture's subresource range.
///
/// A count of zero expands to "the rest of the resource" from the base, and
/// an [`PixelFormat::Undefined`] format inherits the texture's own format.
/// Two descriptors that normalize to the same values name the same view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureViewDescriptor {
    /// The view's format; `Undefined` inherits the texture format.
    pub format: PixelFormat,
    /// First mip level visible through the view.
    pub base_mip_level: u32,
    /// Number of mip levels; zero means "through the last level".
    pub mip_level_count: u32,
    /// First array layer visible through the view.
    pub base_array_layer: u32,
    /// Number of array layers; zero means "through the last layer".
    pub array_layer_count: u32,
}

/// A view over a subresource range of a [`Texture`].
///
/// Views are created and cached by their texture and dropped with it.
#[derive(Debug)]
pub struct TextureView {
    shared: Arc<DeviceShared>,
    object_id: GpuObjectId,
    handle: TextureViewHandle,
    descriptor: TextureViewDescriptor,
}

impl TextureView {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        object_id: GpuObjectId,
        handle: TextureViewHandle,
        descriptor: TextureViewDescriptor,
    ) -> Self {
        Self {
            shared,
            object_id,
            handle,
            descriptor,
        }
    }

    /// The normalized descriptor this view was created from.
    pub fn descriptor(&self) -> &TextureViewDescriptor {
        &self.descriptor
    }

    /// The view's format.
    pub fn format(&self) -> PixelFormat {
        self.descriptor.format
    }

    /// The opaque backend handle.
    pub fn handle(&self) -> TextureViewHandle {
        self.handle
    }
}

impl Drop for TextureView {
    fn drop(&mut self) {
        if self.shared.unregister(self.object_id) {
            self.shared.backend().destroy_texture_view(self.handle);
        }
    }
}

/// A GPU texture resource created through the device.
///
/// Owns a lazy cache of [`TextureView`]s keyed by the normalized view
/// descriptor: repeated lookups with equal normalized descriptors return
/// the same view object.
#[derive(Debug)]
pub struct Texture {
    shared: Arc<DeviceShared>,
    object_id: GpuObjectId,
    handle: TextureHandle,
    kind: TextureKind,
    format: PixelFormat,
    extent: Extent3D,
    mip_level_count: u32,
    sample_count: SampleCount,
    usage: TextureUsage,
    label: Option<String>,
    views: Mutex<HashMap<TextureViewDescriptor, Arc<TextureView>>>,
}

impl Texture {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        object_id: GpuObjectId,
        handle: TextureHandle,
        descriptor: &TextureDescriptor,
        mip_level_count: u32,
    ) -> Self {
        Self {
            shared,
            object_id,
            handle,
            kind: descriptor.kind,
            format: descriptor.format,
            extent: descriptor.extent,
            mip_level_count,
            sample_count: descriptor.sample_count,
            usage: descriptor.usage,
            label: descriptor.label.clone(),
            views: Mutex::new(HashMap::new()),
        }
    }

    /// The dimensionality of the texture.
    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// The texel format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The texture extent.
    pub fn extent(&self) -> Extent3D {
        self.extent
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.extent.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.extent.height
    }

    /// Depth (3D) or array layer count (1D/2D/cube).
    pub fn depth_or_array_layers(&self) -> u32 {
        self.extent.depth_or_array_layers
    }

    /// The number of mip levels.
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    /// The sample count.
    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    /// The usage flags.
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    /// The debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The opaque backend handle.
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Normalizes a view descriptor against this texture (expanding zero
    /// counts and inheriting the texture format).
    fn normalize_view_descriptor(&self, descriptor: &TextureViewDescriptor) -> TextureViewDescriptor {
        let format = if descriptor.format == PixelFormat::Undefined {
            self.format
        } else {
            descriptor.format
        };
        let mip_level_count = if descriptor.mip_level_count == 0 {
            self.mip_level_count.saturating_sub(descriptor.base_mip_level)
        } else {
            descriptor.mip_level_count
        };
        let array_layer_count = if descriptor.array_layer_count == 0 {
            self.extent
                .depth_or_array_layers
                .saturating_sub(descriptor.base_array_layer)
        } else {
            descriptor.array_layer_count
        };
        TextureViewDescriptor {
            format,
            base_mip_level: descriptor.base_mip_level,
            mip_level_count,
            base_array_layer: descriptor.base_array_layer,
            array_layer_count,
        }
    }

    /// Returns the cached view for the normalized descriptor, creating it on
    /// first use. Views never outlive the texture that owns them.
    pub fn get_view(
        self: &Arc<Self>,
        descriptor: &TextureViewDescriptor,
    ) -> Result<Arc<TextureView>, ResourceError> {
        debug_assert!(
            descriptor.base_mip_level < self.mip_level_count,
            "view base mip {} out of range (texture has {})",
            descriptor.base_mip_level,
            self.mip_level_count
        );
        debug_assert!(
            descriptor.base_array_layer < self.extent.depth_or_array_layers,
            "view base layer {} out of range (texture has {})",
            descriptor.base_array_layer,
            self.extent.depth_or_array_layers
        );

        let normalized = self.normalize_view_descriptor(descriptor);
        let mut views = self.views.lock().unwrap();
        if let Some(view) = views.get(&normalized) {
            return Ok(view.clone());
        }

        let handle = self
            .shared
            .backend()
            .create_texture_view(self.handle, &normalized)?;
        let object_id = self.shared.register(super::backend::GpuObjectKind::TextureView, handle.0);
        let view = Arc::new(TextureView::new(
            self.shared.clone(),
            object_id,
            handle,
            normalized,
        ));
        views.insert(normalized, view.clone());
        Ok(view)
    }

    /// Shorthand for a view covering a subresource window of the texture.
    pub fn get_subresource_view(
        self: &Arc<Self>,
        base_mip_level: u32,
        mip_level_count: u32,
        base_array_layer: u32,
        array_layer_count: u32,
    ) -> Result<Arc<TextureView>, ResourceError> {
        self.get_view(&TextureViewDescriptor {
            format: PixelFormat::Undefined,
            base_mip_level,
            mip_level_count,
            base_array_layer,
            array_layer_count,
        })
    }

    /// Shorthand for the view covering the whole resource.
    pub fn whole_view(self: &Arc<Self>) -> Result<Arc<TextureView>, ResourceError> {
        self.get_subresource_view(0, 0, 0, 0)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        // Release cached views before the texture itself.
        self.views.lock().unwrap().clear();
        if self.shared.unregister(self.object_id) {
            self.shared.backend().destroy_texture(self.handle);
        }
    }
}

// --- Samplers ---

/// Defines how texture coordinates are handled outside the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Coordinates wrap around. `1.1` becomes `0.1`.
    #[default]
    Repeat,
    /// Coordinates are clamped to the edge. `1.1` becomes `1.0`.
    ClampToEdge,
    /// Coordinates wrap around, mirroring at each integer boundary.
    MirrorRepeat,
    /// Coordinates outside the range are given a fixed border color.
    ClampToBorder,
}

/// Defines the filtering mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Point sampling. Returns the value of the nearest texel.
    #[default]
    Nearest,
    /// Linear interpolation over the four nearest texels.
    Linear,
}

/// The border color used when an address mode is `ClampToBorder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerBorderColor {
    /// A transparent black color `[0.0, 0.0, 0.0, 0.0]`.
    #[default]
    TransparentBlack,
    /// An opaque black color `[0.0, 0.0, 0.0, 1.0]`.
    OpaqueBlack,
    /// An opaque white color `[1.0, 1.0, 1.0, 1.0]`.
    OpaqueWhite,
}

/// A descriptor used to create a [`Sampler`].
#[derive(Debug, Clone)]
pub struct SamplerDescriptor {
    /// An optional debug label.
    pub label: Option<String>,
    /// The address mode for the U texture coordinate.
    pub address_mode_u: AddressMode,
    /// The address mode for the V texture coordinate.
    pub address_mode_v: AddressMode,
    /// The address mode for the W texture coordinate.
    pub address_mode_w: AddressMode,
    /// The filter mode for magnification.
    pub mag_filter: FilterMode,
    /// The filter mode for minification.
    pub min_filter: FilterMode,
    /// The filter mode between mipmap levels.
    pub mip_filter: FilterMode,
    /// The minimum level of detail to use for mipmapping.
    pub lod_min_clamp: f32,
    /// The maximum level of detail to use for mipmapping.
    pub lod_max_clamp: f32,
    /// If `Some`, creates a comparison sampler (e.g., for shadow maps).
    pub compare: Option<CompareFunction>,
    /// The maximum anisotropy level.
    pub max_anisotropy: u16,
    /// The border color used with `ClampToBorder`.
    pub border_color: Option<SamplerBorderColor>,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mip_filter: FilterMode::Linear,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            max_anisotropy: 1,
            border_color: None,
        }
    }
}

/// An immutable sampler resource, optionally carrying a bindless index.
#[derive(Debug)]
pub struct Sampler {
    shared: Arc<DeviceShared>,
    object_id: GpuObjectId,
    handle: SamplerHandle,
    descriptor: SamplerDescriptor,
    bindless_index: AtomicU32,
}

impl Sampler {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        object_id: GpuObjectId,
        handle: SamplerHandle,
        descriptor: SamplerDescriptor,
    ) -> Self {
        Self {
            shared,
            object_id,
            handle,
            descriptor,
            bindless_index: AtomicU32::new(INVALID_BINDLESS_INDEX),
        }
    }

    /// The descriptor the sampler was created from.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    /// The opaque backend handle.
    pub fn handle(&self) -> SamplerHandle {
        self.handle
    }

    /// The bindless descriptor index, or
    /// [`INVALID_BINDLESS_INDEX`](crate::gpu::INVALID_BINDLESS_INDEX) when
    /// the device has not assigned one.
    pub fn bindless_index(&self) -> u32 {
        self.bindless_index.load(Ordering::Relaxed)
    }

    pub(crate) fn set_bindless_index(&self, index: u32) {
        self.bindless_index.store(index, Ordering::Relaxed);
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if self.shared.unregister(self.object_id) {
            self.shared.backend().destroy_sampler(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mip_chain_counts() {
        // ⌊log2(1024)⌋ + 1
        assert_eq!(compute_mip_level_count(1024, 512, 1), 11);
        assert_eq!(compute_mip_level_count(1, 1, 1), 1);
        assert_eq!(compute_mip_level_count(256, 256, 1), 9);
        assert_eq!(compute_mip_level_count(16, 16, 64), 7);
    }

    #[test]
    fn default_sampler_descriptor() {
        let descriptor = SamplerDescriptor::default();
        assert_eq!(descriptor.mag_filter, FilterMode::Linear);
        assert_eq!(descriptor.max_anisotropy, 1);
        assert!(descriptor.compare.is_none());
    }
}
