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

//! The window contract the core consumes from the host platform.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Combines the windowing handle traits graphics backends require, so the
/// pair can be used as a single trait object.
pub trait WindowHandleBundle: HasWindowHandle + HasDisplayHandle {}

// Blanket implementation: anything that provides both handles qualifies.
impl<T: HasWindowHandle + HasDisplayHandle> WindowHandleBundle for T {}

/// A thread-safe, shared handle to a host window; the opaque value swap
/// chains are created against.
pub type EngineWindowHandle = Arc<dyn WindowHandleBundle + Send + Sync>;

/// A host window, whatever windowing backend produced it.
///
/// The core consumes nothing else from the host: a handle for surface
/// creation, the inner size, and a redraw request.
pub trait EngineWindow: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// The physical dimensions (width, height) of the window's inner area.
    fn inner_size(&self) -> (u32, u32);

    /// The display's scale factor, for HiDPI rendering.
    fn scale_factor(&self) -> f64;

    /// Requests that the window be redrawn.
    fn request_redraw(&self);

    /// Clones a thread-safe, reference-counted handle to the window, as
    /// needed for swap-chain creation.
    fn clone_handle(&self) -> EngineWindowHandle;
}
