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

//! Conversions between the engine's backend-agnostic enums and wgpu types.

use ember_core::gpu::buffer::{BufferUsage, MemoryUsage};
use ember_core::gpu::format::{Color, IndexFormat, PixelFormat, SampleCount, VertexFormat};
use ember_core::gpu::pipeline::{
    BlendFactor, BlendOperation, ColorWriteMask, CompareFunction, CullMode, FaceWinding, FillMode,
    PrimitiveTopology, RenderTargetBlend, StencilFaceState, StencilOperation, VertexStepMode,
};
use ember_core::gpu::texture::{
    AddressMode, FilterMode, SamplerBorderColor, TextureKind, TextureUsage,
};

/// Converts an engine-side value into its wgpu counterpart.
pub trait IntoWgpu<T> {
    /// Performs the conversion.
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::TextureFormat> for PixelFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            // Creation paths validate the format before delegating here.
            PixelFormat::Undefined => unreachable!("Undefined pixel format reached the backend"),
            PixelFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
            PixelFormat::Rg8Unorm => wgpu::TextureFormat::Rg8Unorm,
            PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            PixelFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            PixelFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            PixelFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            PixelFormat::R16Float => wgpu::TextureFormat::R16Float,
            PixelFormat::Rg16Float => wgpu::TextureFormat::Rg16Float,
            PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            PixelFormat::R32Float => wgpu::TextureFormat::R32Float,
            PixelFormat::Rg32Float => wgpu::TextureFormat::Rg32Float,
            PixelFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            PixelFormat::R32Uint => wgpu::TextureFormat::R32Uint,
            PixelFormat::Depth16Unorm => wgpu::TextureFormat::Depth16Unorm,
            PixelFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
            PixelFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
            PixelFormat::Depth32FloatStencil8 => wgpu::TextureFormat::Depth32FloatStencil8,
        }
    }
}

/// Maps a wgpu surface format back to the engine's format set, for
/// reporting the negotiated swap-chain format.
pub fn from_wgpu_texture_format(format: wgpu::TextureFormat) -> PixelFormat {
    match format {
        wgpu::TextureFormat::R8Unorm => PixelFormat::R8Unorm,
        wgpu::TextureFormat::Rg8Unorm => PixelFormat::Rg8Unorm,
        wgpu::TextureFormat::Rgba8Unorm => PixelFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => PixelFormat::Rgba8UnormSrgb,
        wgpu::TextureFormat::Bgra8Unorm => PixelFormat::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => PixelFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::R16Float => PixelFormat::R16Float,
        wgpu::TextureFormat::Rg16Float => PixelFormat::Rg16Float,
        wgpu::TextureFormat::Rgba16Float => PixelFormat::Rgba16Float,
        wgpu::TextureFormat::R32Float => PixelFormat::R32Float,
        wgpu::TextureFormat::Rg32Float => PixelFormat::Rg32Float,
        wgpu::TextureFormat::Rgba32Float => PixelFormat::Rgba32Float,
        wgpu::TextureFormat::R32Uint => PixelFormat::R32Uint,
        wgpu::TextureFormat::Depth16Unorm => PixelFormat::Depth16Unorm,
        wgpu::TextureFormat::Depth24PlusStencil8 => PixelFormat::Depth24PlusStencil8,
        wgpu::TextureFormat::Depth32Float => PixelFormat::Depth32Float,
        wgpu::TextureFormat::Depth32FloatStencil8 => PixelFormat::Depth32FloatStencil8,
        _ => PixelFormat::Undefined,
    }
}

impl IntoWgpu<wgpu::VertexFormat> for VertexFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Uint8x2 => wgpu::VertexFormat::Uint8x2,
            VertexFormat::Uint8x4 => wgpu::VertexFormat::Uint8x4,
            VertexFormat::Unorm8x2 => wgpu::VertexFormat::Unorm8x2,
            VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
            VertexFormat::Uint16x2 => wgpu::VertexFormat::Uint16x2,
            VertexFormat::Uint16x4 => wgpu::VertexFormat::Uint16x4,
            VertexFormat::Float16x2 => wgpu::VertexFormat::Float16x2,
            VertexFormat::Float16x4 => wgpu::VertexFormat::Float16x4,
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexFormat::Uint32 => wgpu::VertexFormat::Uint32,
            VertexFormat::Uint32x2 => wgpu::VertexFormat::Uint32x2,
            VertexFormat::Uint32x3 => wgpu::VertexFormat::Uint32x3,
            VertexFormat::Uint32x4 => wgpu::VertexFormat::Uint32x4,
            VertexFormat::Sint32 => wgpu::VertexFormat::Sint32,
            VertexFormat::Sint32x2 => wgpu::VertexFormat::Sint32x2,
            VertexFormat::Sint32x3 => wgpu::VertexFormat::Sint32x3,
            VertexFormat::Sint32x4 => wgpu::VertexFormat::Sint32x4,
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveTopology {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

impl IntoWgpu<wgpu::FrontFace> for FaceWinding {
    fn into_wgpu(self) -> wgpu::FrontFace {
        match self {
            FaceWinding::CounterClockwise => wgpu::FrontFace::Ccw,
            FaceWinding::Clockwise => wgpu::FrontFace::Cw,
        }
    }
}

impl IntoWgpu<wgpu::PolygonMode> for FillMode {
    fn into_wgpu(self) -> wgpu::PolygonMode {
        match self {
            FillMode::Solid => wgpu::PolygonMode::Fill,
            FillMode::Wireframe => wgpu::PolygonMode::Line,
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

impl IntoWgpu<wgpu::StencilOperation> for StencilOperation {
    fn into_wgpu(self) -> wgpu::StencilOperation {
        match self {
            StencilOperation::Keep => wgpu::StencilOperation::Keep,
            StencilOperation::Zero => wgpu::StencilOperation::Zero,
            StencilOperation::Replace => wgpu::StencilOperation::Replace,
            StencilOperation::Invert => wgpu::StencilOperation::Invert,
            StencilOperation::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
            StencilOperation::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
            StencilOperation::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
            StencilOperation::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
        }
    }
}

impl IntoWgpu<wgpu::StencilFaceState> for StencilFaceState {
    fn into_wgpu(self) -> wgpu::StencilFaceState {
        wgpu::StencilFaceState {
            compare: self.compare.into_wgpu(),
            fail_op: self.fail_op.into_wgpu(),
            depth_fail_op: self.depth_fail_op.into_wgpu(),
            pass_op: self.pass_op.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SrcColor => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DstColor => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        }
    }
}

impl IntoWgpu<wgpu::BlendOperation> for BlendOperation {
    fn into_wgpu(self) -> wgpu::BlendOperation {
        match self {
            BlendOperation::Add => wgpu::BlendOperation::Add,
            BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
            BlendOperation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOperation::Min => wgpu::BlendOperation::Min,
            BlendOperation::Max => wgpu::BlendOperation::Max,
        }
    }
}

impl IntoWgpu<wgpu::ColorWrites> for ColorWriteMask {
    fn into_wgpu(self) -> wgpu::ColorWrites {
        let mut writes = wgpu::ColorWrites::empty();
        if self.contains(ColorWriteMask::R) {
            writes |= wgpu::ColorWrites::RED;
        }
        if self.contains(ColorWriteMask::G) {
            writes |= wgpu::ColorWrites::GREEN;
        }
        if self.contains(ColorWriteMask::B) {
            writes |= wgpu::ColorWrites::BLUE;
        }
        if self.contains(ColorWriteMask::A) {
            writes |= wgpu::ColorWrites::ALPHA;
        }
        writes
    }
}

/// The engine keeps blending disabled when the state matches the
/// pass-through default; wgpu models that as `blend: None`.
pub fn blend_state(blend: &RenderTargetBlend) -> Option<wgpu::BlendState> {
    if !blend.blend_enabled() {
        return None;
    }
    Some(wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: blend.src_factor.into_wgpu(),
            dst_factor: blend.dst_factor.into_wgpu(),
            operation: blend.operation.into_wgpu(),
        },
        alpha: wgpu::BlendComponent {
            src_factor: blend.src_alpha_factor.into_wgpu(),
            dst_factor: blend.dst_alpha_factor.into_wgpu(),
            operation: blend.alpha_operation.into_wgpu(),
        },
    })
}

impl IntoWgpu<u32> for SampleCount {
    fn into_wgpu(self) -> u32 {
        self.as_u32()
    }
}

impl IntoWgpu<wgpu::VertexStepMode> for VertexStepMode {
    fn into_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            VertexStepMode::Vertex => wgpu::VertexStepMode::Vertex,
            VertexStepMode::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

impl IntoWgpu<wgpu::TextureDimension> for TextureKind {
    fn into_wgpu(self) -> wgpu::TextureDimension {
        match self {
            TextureKind::D1 => wgpu::TextureDimension::D1,
            // Cubemaps are 2D textures with six layers, viewed as a cube.
            TextureKind::D2 | TextureKind::Cube => wgpu::TextureDimension::D2,
            TextureKind::D3 => wgpu::TextureDimension::D3,
        }
    }
}

impl IntoWgpu<wgpu::TextureUsages> for TextureUsage {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        let mut usages = wgpu::TextureUsages::empty();
        if self.contains(TextureUsage::COPY_SRC) {
            usages |= wgpu::TextureUsages::COPY_SRC;
        }
        if self.contains(TextureUsage::COPY_DST) {
            usages |= wgpu::TextureUsages::COPY_DST;
        }
        if self.contains(TextureUsage::SAMPLED) {
            usages |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if self.contains(TextureUsage::STORAGE) {
            usages |= wgpu::TextureUsages::STORAGE_BINDING;
        }
        if self.contains(TextureUsage::RENDER_TARGET) | self.contains(TextureUsage::DEPTH_STENCIL) {
            usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        usages
    }
}

/// Maps the engine's usage/heap pair onto wgpu buffer usages. Copy usages
/// are always added so transfer and upload paths stay available; readback
/// buffers additionally get `MAP_READ`.
pub fn buffer_usages(usage: BufferUsage, memory_usage: MemoryUsage) -> wgpu::BufferUsages {
    let mut usages = wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
    if usage.contains(BufferUsage::INPUT_ASSEMBLY) {
        usages |= wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::CONSTANT) {
        usages |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsage::SHADER_READ) || usage.contains(BufferUsage::SHADER_WRITE) {
        usages |= wgpu::BufferUsages::STORAGE;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        usages |= wgpu::BufferUsages::INDIRECT;
    }
    if usage.contains(BufferUsage::ACCELERATION_STRUCTURE) {
        usages |= wgpu::BufferUsages::STORAGE;
    }
    if memory_usage == MemoryUsage::GpuToCpu {
        usages |= wgpu::BufferUsages::MAP_READ;
    }
    usages
}

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
            AddressMode::ClampToBorder => wgpu::AddressMode::ClampToBorder,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::SamplerBorderColor> for SamplerBorderColor {
    fn into_wgpu(self) -> wgpu::SamplerBorderColor {
        match self {
            SamplerBorderColor::TransparentBlack => wgpu::SamplerBorderColor::TransparentBlack,
            SamplerBorderColor::OpaqueBlack => wgpu::SamplerBorderColor::OpaqueBlack,
            SamplerBorderColor::OpaqueWhite => wgpu::SamplerBorderColor::OpaqueWhite,
        }
    }
}

impl IntoWgpu<wgpu::Color> for Color {
    fn into_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blend_maps_to_none() {
        assert!(blend_state(&RenderTargetBlend::default()).is_none());

        let mut blend = RenderTargetBlend::default();
        blend.src_factor = BlendFactor::SrcAlpha;
        blend.dst_factor = BlendFactor::OneMinusSrcAlpha;
        let state = blend_state(&blend).unwrap();
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::SrcAlpha);
    }

    #[test]
    fn input_assembly_buffers_get_vertex_and_index_usage() {
        let usages = buffer_usages(BufferUsage::INPUT_ASSEMBLY, MemoryUsage::CpuToGpu);
        assert!(usages.contains(wgpu::BufferUsages::VERTEX));
        assert!(usages.contains(wgpu::BufferUsages::INDEX));
        assert!(usages.contains(wgpu::BufferUsages::COPY_DST));
        assert!(!usages.contains(wgpu::BufferUsages::MAP_READ));
    }

    #[test]
    fn readback_buffers_are_mappable() {
        let usages = buffer_usages(BufferUsage::EMPTY, MemoryUsage::GpuToCpu);
        assert!(usages.contains(wgpu::BufferUsages::MAP_READ));
    }

    #[test]
    fn color_write_mask_round_trip() {
        let mask = ColorWriteMask::R | ColorWriteMask::A;
        let writes: wgpu::ColorWrites = mask.into_wgpu();
        assert!(writes.contains(wgpu::ColorWrites::RED));
        assert!(writes.contains(wgpu::ColorWrites::ALPHA));
        assert!(!writes.contains(wgpu::ColorWrites::GREEN));
    }
}
