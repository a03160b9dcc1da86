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

//! The backend-agnostic GPU abstraction layer.
//!
//! - [`device`]: the [`GraphicsDevice`](device::GraphicsDevice) factory,
//!   live-object registry, and frame protocol.
//! - [`buffer`], [`texture`], [`shader`], [`pipeline`]: typed resource
//!   objects over opaque backend handles.
//! - [`command`] and [`frame_allocator`]: validated recording with
//!   per-frame scratch allocation.
//! - [`queue`]: command-buffer vending and submission.
//! - [`swap_chain`]: the back-buffer chain bound to a host window.
//! - [`shader_compiler`]: the source-to-bytecode front-end.
//! - [`backend`]: the traits a concrete backend implements.

pub mod backend;
pub mod buffer;
pub mod caps;
pub mod command;
pub mod device;
pub mod error;
pub mod format;
pub mod frame_allocator;
pub mod pipeline;
pub mod queue;
pub mod shader;
pub mod shader_compiler;
pub mod swap_chain;
pub mod texture;

/// The number of frames the CPU may record ahead of the GPU. Sizes every
/// per-frame resource set (frame allocators, recycled recorders).
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// The number of vertex buffer binding slots.
pub const MAX_VERTEX_BUFFER_BINDINGS: usize = 8;

/// The number of vertex attributes a pipeline may declare.
pub const MAX_VERTEX_ATTRIBUTES: usize = 16;

/// The number of descriptor sets addressable by the binding surface.
pub const MAX_DESCRIPTOR_SETS: usize = 4;

/// The number of bindings addressable within one descriptor set.
pub const MAX_DESCRIPTOR_BINDINGS: usize = 16;

/// The number of color targets a render pipeline may write simultaneously.
pub const MAX_SIMULTANEOUS_RENDER_TARGETS: usize = 8;

/// The hard cap on buffer size at creation: 128 MiB.
pub const MAX_BUFFER_SIZE: u64 = 128 * 1024 * 1024;

/// The alignment uniform-buffer sub-ranges are bound at.
pub const MIN_UNIFORM_BUFFER_ALIGNMENT: u64 = 256;

/// The initial capacity of each per-frame scratch allocator.
pub const FRAME_ALLOCATOR_INITIAL_CAPACITY: u64 = 1024 * 1024;

/// The bindless index value meaning "not assigned".
pub const INVALID_BINDLESS_INDEX: u32 = u32::MAX;

pub use backend::{CommandRecorder, GpuBackend};
pub use buffer::{Buffer, BufferDescriptor, BufferUsage, MemoryUsage};
pub use caps::{
    AdapterInfo, BackendSelectionConfig, BackendType, DeviceCaps, DeviceFeatures, DeviceKind,
    DeviceLimits, QueueType, ShaderBlobKind, ShaderStage, ValidationMode,
};
pub use command::{
    CommandBuffer, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, ScissorRect, StoreOp, Viewport,
};
pub use device::GraphicsDevice;
pub use error::{DeviceError, PipelineError, ResourceError, ShaderError};
pub use format::{Color, IndexFormat, PixelFormat, SampleCount, VertexFormat};
pub use frame_allocator::{FrameAllocation, FrameAllocator};
pub use pipeline::{
    BlendFactor, BlendOperation, ColorTargetState, ColorWriteMask, CompareFunction,
    ComputePipelineDescriptor, CullMode, DepthStencilState, FaceWinding, FillMode, Pipeline,
    PipelineKind, PrimitiveTopology, RasterizerState, RenderPipelineDescriptor, RenderTargetBlend,
    StencilFaceState, StencilOperation, VertexAttribute, VertexBufferBinding, VertexLayout,
    VertexStepMode,
};
pub use queue::CommandQueue;
pub use shader::{Shader, ShaderArtifact, ShaderResource, ShaderResourceKind};
pub use shader_compiler::{ShaderCompileOptions, ShaderModel};
pub use swap_chain::{SwapChain, SwapChainDescriptor};
pub use texture::{
    AddressMode, Extent3D, FilterMode, Sampler, SamplerBorderColor, SamplerDescriptor, Texture,
    TextureDescriptor, TextureKind, TextureUsage, TextureView, TextureViewDescriptor,
};
