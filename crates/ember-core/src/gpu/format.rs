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

//! Pixel, vertex, and index formats shared by every backend.

/// Defines the memory format of pixels in a texture or swap-chain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// No format. Only valid as a "not yet chosen" placeholder; resource
    /// creation rejects it.
    #[default]
    Undefined,
    // 8-bit formats
    /// One 8-bit unsigned normalized component.
    R8Unorm,
    /// Two 8-bit unsigned normalized components.
    Rg8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA).
    Rgba8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA) in the sRGB color space.
    Rgba8UnormSrgb,
    /// Four 8-bit unsigned normalized components (BGRA).
    Bgra8Unorm,
    /// Four 8-bit unsigned normalized components (BGRA) in the sRGB color
    /// space. This is a common swap-chain format.
    Bgra8UnormSrgb,
    // 16-bit float formats
    /// One 16-bit float component.
    R16Float,
    /// Two 16-bit float components.
    Rg16Float,
    /// Four 16-bit float components.
    Rgba16Float,
    // 32-bit float formats
    /// One 32-bit float component.
    R32Float,
    /// Two 32-bit float components.
    Rg32Float,
    /// Four 32-bit float components.
    Rgba32Float,
    // 32-bit integer formats
    /// One 32-bit unsigned integer component.
    R32Uint,
    // Depth/stencil formats
    /// A 16-bit unsigned normalized depth format.
    Depth16Unorm,
    /// A 24-bit unsigned normalized depth format with an 8-bit stencil component.
    Depth24PlusStencil8,
    /// A 32-bit float depth format.
    Depth32Float,
    /// A 32-bit float depth format with an 8-bit stencil component.
    Depth32FloatStencil8,
}

impl PixelFormat {
    /// Returns the size in bytes of a single pixel for this format.
    /// Note: this can be an approximation for packed or complex formats.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Undefined => 0,
            PixelFormat::R8Unorm => 1,
            PixelFormat::Rg8Unorm => 2,
            PixelFormat::Rgba8Unorm
            | PixelFormat::Rgba8UnormSrgb
            | PixelFormat::Bgra8Unorm
            | PixelFormat::Bgra8UnormSrgb => 4,
            PixelFormat::R16Float => 2,
            PixelFormat::Rg16Float => 4,
            PixelFormat::Rgba16Float => 8,
            PixelFormat::R32Float | PixelFormat::R32Uint => 4,
            PixelFormat::Rg32Float => 8,
            PixelFormat::Rgba32Float => 16,
            PixelFormat::Depth16Unorm => 2,
            PixelFormat::Depth24PlusStencil8 => 4,
            PixelFormat::Depth32Float => 4,
            PixelFormat::Depth32FloatStencil8 => 5,
        }
    }

    /// Returns `true` if the format has a depth aspect.
    pub fn has_depth(&self) -> bool {
        matches!(
            self,
            PixelFormat::Depth16Unorm
                | PixelFormat::Depth24PlusStencil8
                | PixelFormat::Depth32Float
                | PixelFormat::Depth32FloatStencil8
        )
    }

    /// Returns `true` if the format has a stencil aspect.
    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            PixelFormat::Depth24PlusStencil8 | PixelFormat::Depth32FloatStencil8
        )
    }
}

/// The memory format of a single vertex attribute's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 8-bit unsigned integer components.
    Uint8x2,
    /// Four 8-bit unsigned integer components.
    Uint8x4,
    /// Two 8-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm8x2,
    /// Four 8-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm8x4,
    /// Two 16-bit unsigned integer components.
    Uint16x2,
    /// Four 16-bit unsigned integer components.
    Uint16x4,
    /// Two 16-bit float components.
    Float16x2,
    /// Four 16-bit float components.
    Float16x4,
    /// One 32-bit float component.
    Float32,
    /// Two 32-bit float components.
    Float32x2,
    /// Three 32-bit float components.
    Float32x3,
    /// Four 32-bit float components.
    Float32x4,
    /// One 32-bit unsigned integer component.
    Uint32,
    /// Two 32-bit unsigned integer components.
    Uint32x2,
    /// Three 32-bit unsigned integer components.
    Uint32x3,
    /// Four 32-bit unsigned integer components.
    Uint32x4,
    /// One 32-bit signed integer component.
    Sint32,
    /// Two 32-bit signed integer components.
    Sint32x2,
    /// Three 32-bit signed integer components.
    Sint32x3,
    /// Four 32-bit signed integer components.
    Sint32x4,
}

impl VertexFormat {
    /// Returns the size in bytes of one attribute of this format. Pipeline
    /// auto-layout accumulates these to assign offsets and strides.
    pub const fn size_in_bytes(&self) -> u64 {
        match self {
            VertexFormat::Uint8x2 | VertexFormat::Unorm8x2 => 2,
            VertexFormat::Uint8x4 | VertexFormat::Unorm8x4 => 4,
            VertexFormat::Uint16x2 | VertexFormat::Float16x2 => 4,
            VertexFormat::Uint16x4 | VertexFormat::Float16x4 => 8,
            VertexFormat::Float32 | VertexFormat::Uint32 | VertexFormat::Sint32 => 4,
            VertexFormat::Float32x2 | VertexFormat::Uint32x2 | VertexFormat::Sint32x2 => 8,
            VertexFormat::Float32x3 | VertexFormat::Uint32x3 | VertexFormat::Sint32x3 => 12,
            VertexFormat::Float32x4 | VertexFormat::Uint32x4 | VertexFormat::Sint32x4 => 16,
        }
    }
}

/// Specifies the data type of indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// Indices are 16-bit unsigned integers.
    #[default]
    Uint16,
    /// Indices are 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Returns the size in bytes of one index.
    pub const fn size_in_bytes(&self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// The number of samples per pixel for Multisample Anti-Aliasing (MSAA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleCount {
    /// 1 sample per pixel (MSAA disabled).
    #[default]
    X1,
    /// 2 samples per pixel.
    X2,
    /// 4 samples per pixel.
    X4,
    /// 8 samples per pixel.
    X8,
    /// 16 samples per pixel.
    X16,
}

impl SampleCount {
    /// Returns the sample count as a plain integer.
    pub const fn as_u32(&self) -> u32 {
        match self {
            SampleCount::X1 => 1,
            SampleCount::X2 => 2,
            SampleCount::X4 => 4,
            SampleCount::X8 => 8,
            SampleCount::X16 => 16,
        }
    }
}

/// A linear RGBA color used for render-pass clears.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    /// Red channel, linear `[0.0, 1.0]`.
    pub r: f32,
    /// Green channel, linear `[0.0, 1.0]`.
    pub g: f32,
    /// Blue channel, linear `[0.0, 1.0]`.
    pub b: f32,
    /// Alpha channel, linear `[0.0, 1.0]`.
    pub a: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Creates a color from its four channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_sizes() {
        assert_eq!(PixelFormat::Rgba8Unorm.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rgba32Float.bytes_per_pixel(), 16);
        assert_eq!(PixelFormat::Undefined.bytes_per_pixel(), 0);
    }

    #[test]
    fn pixel_format_aspects() {
        assert!(PixelFormat::Depth32Float.has_depth());
        assert!(!PixelFormat::Depth32Float.has_stencil());
        assert!(PixelFormat::Depth24PlusStencil8.has_stencil());
        assert!(!PixelFormat::Rgba8Unorm.has_depth());
    }

    #[test]
    fn vertex_format_sizes() {
        assert_eq!(VertexFormat::Float32x3.size_in_bytes(), 12);
        assert_eq!(VertexFormat::Unorm8x4.size_in_bytes(), 4);
        assert_eq!(VertexFormat::Uint16x4.size_in_bytes(), 8);
    }

    #[test]
    fn index_format_sizes() {
        assert_eq!(IndexFormat::Uint16.size_in_bytes(), 2);
        assert_eq!(IndexFormat::Uint32.size_in_bytes(), 4);
    }
}
