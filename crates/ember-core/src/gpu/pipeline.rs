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

//! Defines all data structures used to configure render and compute
//! pipelines, including vertex auto-layout.

use crate::ember_bitflags;
use crate::gpu::backend::{GpuObjectId, PipelineHandle};
use crate::gpu::device::DeviceShared;
use crate::gpu::error::PipelineError;
use crate::gpu::format::{PixelFormat, SampleCount, VertexFormat};
use crate::gpu::shader::Shader;
use crate::gpu::{MAX_SIMULTANEOUS_RENDER_TARGETS, MAX_VERTEX_ATTRIBUTES, MAX_VERTEX_BUFFER_BINDINGS};
use std::sync::Arc;

/// Defines how vertices are connected to form a geometric primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Isolated points.
    PointList,
    /// Isolated lines (every two vertices form a line).
    LineList,
    /// A connected line strip.
    LineStrip,
    /// Isolated triangles (every three vertices form a triangle).
    #[default]
    TriangleList,
    /// A connected triangle strip.
    TriangleStrip,
}

/// Defines which face of a triangle to cull (not render).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling is performed.
    #[default]
    None,
    /// Cull front-facing triangles.
    Front,
    /// Cull back-facing triangles.
    Back,
}

/// Defines which vertex winding order counts as "front-facing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FaceWinding {
    /// Counter-clockwise winding is the front face.
    #[default]
    CounterClockwise,
    /// Clockwise winding is the front face.
    Clockwise,
}

/// Defines how polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
    /// Polygons are filled. This is the normal rendering mode.
    #[default]
    Solid,
    /// Polygons are rendered as outlines.
    Wireframe,
}

/// The comparison function used for depth, stencil, and sampler compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// Passes if the new value is less than the existing value.
    Less,
    /// Passes if the new value is equal to the existing value.
    Equal,
    /// Passes if the new value is less than or equal to the existing value.
    LessEqual,
    /// Passes if the new value is greater than the existing value.
    Greater,
    /// Passes if the new value is not equal to the existing value.
    NotEqual,
    /// Passes if the new value is greater than or equal to the existing value.
    GreaterEqual,
    /// The test always passes.
    #[default]
    Always,
}

/// An operation to perform on a stencil buffer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    /// Keep the existing stencil value.
    #[default]
    Keep,
    /// Set the stencil value to 0.
    Zero,
    /// Replace the stencil value with the reference value.
    Replace,
    /// Bitwise invert the stencil value.
    Invert,
    /// Increment the stencil value, clamping at the maximum value.
    IncrementClamp,
    /// Decrement the stencil value, clamping at 0.
    DecrementClamp,
    /// Increment the stencil value, wrapping to 0 on overflow.
    IncrementWrap,
    /// Decrement the stencil value, wrapping to the maximum on underflow.
    DecrementWrap,
}

/// A factor in a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// The factor is `0.0`.
    Zero,
    /// The factor is `1.0`.
    One,
    /// The factor is the source color.
    SrcColor,
    /// The factor is `1.0 - src`.
    OneMinusSrcColor,
    /// The factor is the source alpha component.
    SrcAlpha,
    /// The factor is `1.0 - src.a`.
    OneMinusSrcAlpha,
    /// The factor is the destination color.
    DstColor,
    /// The factor is `1.0 - dst`.
    OneMinusDstColor,
    /// The factor is the destination alpha component.
    DstAlpha,
    /// The factor is `1.0 - dst.a`.
    OneMinusDstAlpha,
}

/// The operation combining source and destination in a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOperation {
    /// `source + destination`.
    #[default]
    Add,
    /// `source - destination`.
    Subtract,
    /// `destination - source`.
    ReverseSubtract,
    /// `min(source, destination)`.
    Min,
    /// `max(source, destination)`.
    Max,
}

ember_bitflags! {
    /// A bitmask enabling writes to individual color channels.
    pub struct ColorWriteMask: u8 {
        /// Enable writes to the Red channel.
        const R = 0b0001;
        /// Enable writes to the Green channel.
        const G = 0b0010;
        /// Enable writes to the Blue channel.
        const B = 0b0100;
        /// Enable writes to the Alpha channel.
        const A = 0b1000;
        /// Enable writes to all channels.
        const ALL = Self::R.bits() | Self::G.bits() | Self::B.bits() | Self::A.bits();
    }
}

/// The blend state of a single color target.
///
/// The default is the pass-through equation `Add(One, Zero)` on both the
/// color and alpha channels with all channels writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetBlend {
    /// The blend factor for the source color.
    pub src_factor: BlendFactor,
    /// The blend factor for the destination color.
    pub dst_factor: BlendFactor,
    /// The operation combining the color factors.
    pub operation: BlendOperation,
    /// The blend factor for the source alpha.
    pub src_alpha_factor: BlendFactor,
    /// The blend factor for the destination alpha.
    pub dst_alpha_factor: BlendFactor,
    /// The operation combining the alpha factors.
    pub alpha_operation: BlendOperation,
    /// Which channels are written.
    pub write_mask: ColorWriteMask,
}

impl Default for RenderTargetBlend {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_operation: BlendOperation::Add,
            write_mask: ColorWriteMask::ALL,
        }
    }
}

impl RenderTargetBlend {
    /// Reports whether any blend field deviates from the pass-through
    /// `Add(One, Zero)` default. The write mask does not participate, so
    /// backends can keep blending disabled for write-mask-only changes.
    pub fn blend_enabled(&self) -> bool {
        let default = Self::default();
        self.src_factor != default.src_factor
            || self.dst_factor != default.dst_factor
            || self.operation != default.operation
            || self.src_alpha_factor != default.src_alpha_factor
            || self.dst_alpha_factor != default.dst_alpha_factor
            || self.alpha_operation != default.alpha_operation
    }
}

/// The stencil test and operations for a single primitive face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    /// The comparison function used for the stencil test.
    pub compare: CompareFunction,
    /// The operation to perform if the stencil test fails.
    pub fail_op: StencilOperation,
    /// The operation if the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOperation,
    /// The operation if both the stencil and depth tests pass.
    pub pass_op: StencilOperation,
}

/// The state for depth and stencil testing.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilState {
    /// The format of the depth/stencil attachment.
    pub format: PixelFormat,
    /// If `true`, depth values are written to the depth buffer.
    pub depth_write_enabled: bool,
    /// The comparison function used for the depth test.
    pub depth_compare: CompareFunction,
    /// The stencil state for front-facing primitives.
    pub stencil_front: StencilFaceState,
    /// The stencil state for back-facing primitives.
    pub stencil_back: StencilFaceState,
    /// A bitmask for reading from the stencil buffer.
    pub stencil_read_mask: u32,
    /// A bitmask for writing to the stencil buffer.
    pub stencil_write_mask: u32,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            format: PixelFormat::Depth32Float,
            depth_write_enabled: true,
            depth_compare: CompareFunction::LessEqual,
            stencil_front: StencilFaceState::default(),
            stencil_back: StencilFaceState::default(),
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
        }
    }
}

impl DepthStencilState {
    /// Reports whether any stencil op or compare deviates from the inert
    /// `(Keep, Always)` state, letting backends skip stencil entirely.
    pub fn stencil_test_enabled(&self) -> bool {
        self.stencil_front != StencilFaceState::default()
            || self.stencil_back != StencilFaceState::default()
    }
}

/// The rasterizer state of a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RasterizerState {
    /// How polygons are filled.
    pub fill_mode: FillMode,
    /// Which triangle face is culled.
    pub cull_mode: CullMode,
    /// Which winding order is front-facing.
    pub front_face: FaceWinding,
    /// A constant depth bias added to each fragment.
    pub depth_bias: i32,
    /// A bias factor scaling with the fragment's depth slope.
    pub depth_bias_slope_scale: f32,
    /// The maximum depth bias that can be applied.
    pub depth_bias_clamp: f32,
}

/// Defines how often the GPU advances to the next element in a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    /// Advance per vertex.
    #[default]
    Vertex,
    /// Advance per rendered instance.
    Instance,
}

/// Describes a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// The input location of this attribute in the vertex shader.
    pub shader_location: u32,
    /// The format of the attribute's data.
    pub format: VertexFormat,
    /// The vertex buffer binding the attribute reads from.
    pub buffer_index: u32,
    /// The byte offset from the start of the vertex. Leave every offset at
    /// zero to request auto-layout.
    pub offset: u64,
}

/// Describes the per-binding stride and step mode of a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexBufferBinding {
    /// The byte distance between consecutive elements. Zero is replaced by
    /// the accumulated attribute size of the binding during auto-layout.
    pub stride: u64,
    /// How often the binding advances.
    pub step_mode: VertexStepMode,
}

/// The full vertex-fetch layout of a render pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexLayout {
    /// The attributes, in declaration order.
    pub attributes: Vec<VertexAttribute>,
    /// Per-binding stride/step records, indexed by `buffer_index`.
    pub buffers: Vec<VertexBufferBinding>,
}

impl VertexLayout {
    /// Applies auto-layout: when every attribute offset is zero, offsets
    /// are assigned by scanning the attributes in declaration order and
    /// accumulating per-binding running offsets from each attribute's
    /// format size; otherwise the explicit offsets are honored. In both
    /// cases a zero stride is replaced by the final accumulated offset of
    /// that binding.
    pub fn normalized(&self) -> Result<VertexLayout, PipelineError> {
        if self.attributes.len() > MAX_VERTEX_ATTRIBUTES {
            return Err(PipelineError::InvalidVertexLayout(format!(
                "{} attributes exceeds the maximum of {}",
                self.attributes.len(),
                MAX_VERTEX_ATTRIBUTES
            )));
        }
        if self.buffers.len() > MAX_VERTEX_BUFFER_BINDINGS {
            return Err(PipelineError::InvalidVertexLayout(format!(
                "{} vertex buffer bindings exceeds the maximum of {}",
                self.buffers.len(),
                MAX_VERTEX_BUFFER_BINDINGS
            )));
        }
        for attribute in &self.attributes {
            if attribute.buffer_index as usize >= MAX_VERTEX_BUFFER_BINDINGS {
                return Err(PipelineError::InvalidVertexLayout(format!(
                    "attribute at location {} references binding {} (max {})",
                    attribute.shader_location,
                    attribute.buffer_index,
                    MAX_VERTEX_BUFFER_BINDINGS - 1
                )));
            }
        }

        let mut layout = self.clone();
        let binding_count = layout
            .attributes
            .iter()
            .map(|a| a.buffer_index as usize + 1)
            .max()
            .unwrap_or(0)
            .max(layout.buffers.len());
        layout.buffers.resize(binding_count, VertexBufferBinding::default());

        let auto_offsets = layout.attributes.iter().all(|a| a.offset == 0);
        let mut accumulated = [0u64; MAX_VERTEX_BUFFER_BINDINGS];

        for attribute in &mut layout.attributes {
            let binding = attribute.buffer_index as usize;
            if auto_offsets {
                attribute.offset = accumulated[binding];
            }
            accumulated[binding] = accumulated[binding]
                .max(attribute.offset)
                .max(attribute.offset + attribute.format.size_in_bytes());
        }

        for (index, buffer) in layout.buffers.iter_mut().enumerate() {
            if buffer.stride == 0 {
                buffer.stride = accumulated[index];
            }
        }

        Ok(layout)
    }
}

/// The state of a single color target in a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTargetState {
    /// The texture format of this color target.
    pub format: PixelFormat,
    /// The blend state of this target.
    pub blend: RenderTargetBlend,
}

/// A complete descriptor for a render pipeline.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    /// An optional debug label.
    pub label: Option<String>,
    /// The vertex shader stage.
    pub vertex_shader: Arc<Shader>,
    /// The fragment shader stage, if any (depth-only passes omit it).
    pub fragment_shader: Option<Arc<Shader>>,
    /// The vertex-fetch layout. Subject to auto-layout (see
    /// [`VertexLayout::normalized`]).
    pub vertex_layout: VertexLayout,
    /// How vertices assemble into primitives.
    pub topology: PrimitiveTopology,
    /// The rasterizer state.
    pub rasterizer: RasterizerState,
    /// The depth/stencil state; `None` disables both tests.
    pub depth_stencil: Option<DepthStencilState>,
    /// The color targets, at most
    /// [`MAX_SIMULTANEOUS_RENDER_TARGETS`](crate::gpu::MAX_SIMULTANEOUS_RENDER_TARGETS).
    pub color_targets: Vec<ColorTargetState>,
    /// The number of samples per pixel.
    pub sample_count: SampleCount,
}

impl RenderPipelineDescriptor {
    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        if self.color_targets.len() > MAX_SIMULTANEOUS_RENDER_TARGETS {
            return Err(PipelineError::TooManyColorTargets {
                requested: self.color_targets.len(),
                max: MAX_SIMULTANEOUS_RENDER_TARGETS,
            });
        }
        Ok(())
    }
}

/// A complete descriptor for a compute pipeline.
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor {
    /// An optional debug label.
    pub label: Option<String>,
    /// The compute shader.
    pub shader: Arc<Shader>,
}

/// Distinguishes pipeline families at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// A rasterization pipeline.
    Render,
    /// A compute pipeline.
    Compute,
    /// A ray-tracing pipeline (reserved; no backend implements it yet).
    RayTracing,
}

/// A compiled pipeline state object created through the device.
#[derive(Debug)]
pub struct Pipeline {
    shared: Arc<DeviceShared>,
    object_id: GpuObjectId,
    handle: PipelineHandle,
    kind: PipelineKind,
    label: Option<String>,
    vertex_layout: Option<VertexLayout>,
}

impl Pipeline {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        object_id: GpuObjectId,
        handle: PipelineHandle,
        kind: PipelineKind,
        label: Option<String>,
        vertex_layout: Option<VertexLayout>,
    ) -> Self {
        Self {
            shared,
            object_id,
            handle,
            kind,
            label,
            vertex_layout,
        }
    }

    /// The pipeline family.
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    /// The debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The normalized vertex layout of a render pipeline (after
    /// auto-layout); `None` for compute pipelines.
    pub fn vertex_layout(&self) -> Option<&VertexLayout> {
        self.vertex_layout.as_ref()
    }

    /// The opaque backend handle.
    pub fn handle(&self) -> PipelineHandle {
        self.handle
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.shared.unregister(self.object_id) {
            self.shared.backend().destroy_pipeline(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(location: u32, format: VertexFormat, buffer_index: u32) -> VertexAttribute {
        VertexAttribute {
            shader_location: location,
            format,
            buffer_index,
            offset: 0,
        }
    }

    #[test]
    fn auto_layout_accumulates_offsets_in_declaration_order() {
        let layout = VertexLayout {
            attributes: vec![
                attribute(0, VertexFormat::Float32x3, 0), // position
                attribute(1, VertexFormat::Float32x3, 0), // normal
                attribute(2, VertexFormat::Float32x2, 0), // uv
            ],
            buffers: vec![],
        };
        let normalized = layout.normalized().unwrap();
        assert_eq!(normalized.attributes[0].offset, 0);
        assert_eq!(normalized.attributes[1].offset, 12);
        assert_eq!(normalized.attributes[2].offset, 24);
        assert_eq!(normalized.buffers[0].stride, 32);
    }

    #[test]
    fn auto_layout_tracks_bindings_independently() {
        let layout = VertexLayout {
            attributes: vec![
                attribute(0, VertexFormat::Float32x3, 0),
                attribute(1, VertexFormat::Float32x4, 1),
                attribute(2, VertexFormat::Float32x2, 0),
            ],
            buffers: vec![],
        };
        let normalized = layout.normalized().unwrap();
        assert_eq!(normalized.attributes[0].offset, 0);
        assert_eq!(normalized.attributes[1].offset, 0);
        assert_eq!(normalized.attributes[2].offset, 12);
        assert_eq!(normalized.buffers[0].stride, 20);
        assert_eq!(normalized.buffers[1].stride, 16);
    }

    #[test]
    fn explicit_offsets_are_honored() {
        let layout = VertexLayout {
            attributes: vec![
                VertexAttribute {
                    shader_location: 0,
                    format: VertexFormat::Float32x3,
                    buffer_index: 0,
                    offset: 0,
                },
                VertexAttribute {
                    shader_location: 1,
                    format: VertexFormat::Float32x2,
                    buffer_index: 0,
                    offset: 16, // deliberately padded
                },
            ],
            buffers: vec![],
        };
        let normalized = layout.normalized().unwrap();
        assert_eq!(normalized.attributes[1].offset, 16);
        assert_eq!(normalized.buffers[0].stride, 24);
    }

    #[test]
    fn explicit_strides_are_kept() {
        let layout = VertexLayout {
            attributes: vec![attribute(0, VertexFormat::Float32x2, 0)],
            buffers: vec![VertexBufferBinding {
                stride: 64,
                step_mode: VertexStepMode::Vertex,
            }],
        };
        let normalized = layout.normalized().unwrap();
        assert_eq!(normalized.buffers[0].stride, 64);
    }

    #[test]
    fn out_of_range_binding_is_rejected() {
        let layout = VertexLayout {
            attributes: vec![attribute(0, VertexFormat::Float32, 99)],
            buffers: vec![],
        };
        assert!(layout.normalized().is_err());
    }

    #[test]
    fn default_blend_is_disabled() {
        assert!(!RenderTargetBlend::default().blend_enabled());
    }

    #[test]
    fn any_blend_field_enables_blending_except_write_mask() {
        let mut blend = RenderTargetBlend::default();
        blend.write_mask = ColorWriteMask::R;
        assert!(!blend.blend_enabled());

        let mut blend = RenderTargetBlend::default();
        blend.src_factor = BlendFactor::SrcAlpha;
        assert!(blend.blend_enabled());

        let mut blend = RenderTargetBlend::default();
        blend.alpha_operation = BlendOperation::Max;
        assert!(blend.blend_enabled());
    }

    #[test]
    fn default_stencil_is_disabled() {
        assert!(!DepthStencilState::default().stencil_test_enabled());
        let mut state = DepthStencilState::default();
        state.stencil_front.compare = CompareFunction::Equal;
        assert!(state.stencil_test_enabled());
        let mut state = DepthStencilState::default();
        state.stencil_back.pass_op = StencilOperation::Replace;
        assert!(state.stencil_test_enabled());
    }
}
