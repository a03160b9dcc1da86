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

//! The application lifecycle the host's event loop drives.

use crate::platform::window::EngineWindow;

/// Callbacks the host main-loop driver invokes.
///
/// Message-pump semantics differ per OS; the driver (in the infrastructure
/// crate) hides them and delivers exactly this surface: a ready signal with
/// the created window, one tick per loop iteration, resize notifications,
/// and an exit signal.
pub trait AppHandler {
    /// The window exists and the graphics device may be initialized.
    fn on_ready(&mut self, window: &dyn EngineWindow);

    /// One main-loop iteration. Return `false` to request exit.
    fn on_tick(&mut self, window: &dyn EngineWindow) -> bool;

    /// The window's inner size changed.
    fn on_resized(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// The loop is about to shut down.
    fn on_exit(&mut self) {}
}
