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

//! # Ember Core
//!
//! Foundational crate of the Ember engine scaffold. It defines the
//! backend-agnostic GPU abstraction layer — the device, its resource
//! objects, command recording with per-frame scratch allocation, the swap
//! chain, and the shader compilation front-end — together with the platform
//! contracts a host window/main-loop driver must satisfy.
//!
//! Concrete backends live in `ember-infra` and plug in behind the traits in
//! [`gpu::backend`].

#![warn(missing_docs)]

pub mod gpu;
pub mod platform;
pub mod utils;

pub use gpu::device::GraphicsDevice;
