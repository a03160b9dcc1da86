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

//! Defines the hierarchy of error types for the GPU subsystem.

use crate::gpu::caps::ShaderStage;
use std::fmt;

/// An error related to preprocessing, parsing, or compiling a shader.
#[derive(Debug)]
pub enum ShaderError {
    /// An `#include` directive referenced a file that could not be read.
    IncludeNotFound {
        /// The path as written in the directive.
        path: String,
        /// The file the directive appeared in.
        from: String,
    },
    /// A preprocessor directive was malformed or unbalanced.
    PreprocessError {
        /// The file being preprocessed.
        file: String,
        /// Description of the problem.
        details: String,
    },
    /// The shader source failed to parse.
    ParseError {
        /// The file the source came from.
        file: String,
        /// Diagnostic text from the parser.
        details: String,
    },
    /// The parsed module failed validation.
    ValidationError {
        /// The file the source came from.
        file: String,
        /// Diagnostic text from the validator.
        details: String,
    },
    /// Emission of the target bytecode failed.
    EmitError {
        /// The file the source came from.
        file: String,
        /// Diagnostic text from the backend writer.
        details: String,
    },
    /// The requested entry point does not exist in the module.
    InvalidEntryPoint {
        /// The entry point name that was not found.
        entry_point: String,
        /// The file the source came from.
        file: String,
    },
    /// The requested stage is not supported by this front-end.
    UnsupportedStage {
        /// The stage that was requested.
        stage: ShaderStage,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::IncludeNotFound { path, from } => {
                write!(f, "Include '{path}' not found (included from '{from}')")
            }
            ShaderError::PreprocessError { file, details } => {
                write!(f, "Preprocessing failed for '{file}': {details}")
            }
            ShaderError::ParseError { file, details } => {
                write!(f, "Shader parse failed for '{file}': {details}")
            }
            ShaderError::ValidationError { file, details } => {
                write!(f, "Shader validation failed for '{file}': {details}")
            }
            ShaderError::EmitError { file, details } => {
                write!(f, "Shader code emission failed for '{file}': {details}")
            }
            ShaderError::InvalidEntryPoint { entry_point, file } => {
                write!(f, "Entry point '{entry_point}' not found in '{file}'")
            }
            ShaderError::UnsupportedStage { stage } => {
                write!(f, "Shader stage {stage:?} is not supported by this front-end")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation of a graphics or compute pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// The vertex layout was inconsistent (bad binding index, too many
    /// attributes, overlapping explicit offsets).
    InvalidVertexLayout(String),
    /// The descriptor referenced more color targets than the device supports.
    TooManyColorTargets {
        /// The number of targets requested.
        requested: usize,
        /// The supported maximum.
        max: usize,
    },
    /// A shader stage required by the pipeline type was missing or wrong.
    InvalidShaderStage {
        /// The stage that was expected.
        expected: ShaderStage,
        /// The stage that was provided.
        provided: ShaderStage,
    },
    /// The graphics backend failed to compile the pipeline state object.
    CompilationFailed {
        /// A descriptive label for the pipeline, if available.
        label: Option<String>,
        /// Detailed error messages from the backend.
        details: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidVertexLayout(msg) => {
                write!(f, "Invalid vertex layout: {msg}")
            }
            PipelineError::TooManyColorTargets { requested, max } => {
                write!(f, "Pipeline requests {requested} color targets (max {max})")
            }
            PipelineError::InvalidShaderStage { expected, provided } => {
                write!(
                    f,
                    "Pipeline stage mismatch: expected {expected:?}, got {provided:?}"
                )
            }
            PipelineError::CompilationFailed { label, details } => {
                write!(
                    f,
                    "Pipeline compilation failed for '{}': {}",
                    label.as_deref().unwrap_or("Unknown"),
                    details
                )
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// A descriptor failed validation before reaching the backend.
    InvalidDescriptor(String),
    /// The handle used to reference a resource is not (or no longer) valid.
    InvalidHandle,
    /// Host access was attempted on a resource whose memory usage forbids it.
    InvalidAccess(String),
    /// An access fell outside the bounds of the resource.
    OutOfBounds,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::InvalidDescriptor(msg) => {
                write!(f, "Invalid resource descriptor: {msg}")
            }
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle."),
            ResourceError::InvalidAccess(msg) => {
                write!(f, "Invalid host access: {msg}")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// A high-level error that can occur within the graphics device itself.
#[derive(Debug)]
pub enum DeviceError {
    /// A failure occurred during backend or device initialization.
    InitializationFailed(String),
    /// Failed to acquire the next swap-chain image for rendering.
    SurfaceAcquisitionFailed(String),
    /// An error occurred while managing a GPU resource.
    Resource(ResourceError),
    /// The graphics device was lost (e.g., GPU driver crashed or was
    /// updated). The only recovery path is tear-down and re-initialization.
    DeviceLost,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics device: {msg}")
            }
            DeviceError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface for rendering: {msg}")
            }
            DeviceError::Resource(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            DeviceError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for DeviceError {
    fn from(err: ResourceError) -> Self {
        DeviceError::Resource(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::IncludeNotFound {
            path: "common.wgsl".to_string(),
            from: "lit.wgsl".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Include 'common.wgsl' not found (included from 'lit.wgsl')"
        );
    }

    #[test]
    fn resource_error_display_wrapping_shader_error() {
        let shader_err = ShaderError::ParseError {
            file: "quad.wgsl".to_string(),
            details: "unexpected token".to_string(),
        };
        let res_err: ResourceError = shader_err.into();
        assert_eq!(
            format!("{res_err}"),
            "Shader resource error: Shader parse failed for 'quad.wgsl': unexpected token"
        );
        assert!(res_err.source().is_some());
    }

    #[test]
    fn device_error_display_wrapping_resource_error() {
        let res_err = ResourceError::InvalidDescriptor("size is zero".to_string());
        let device_err: DeviceError = res_err.into();
        assert_eq!(
            format!("{device_err}"),
            "Graphics resource operation failed: Invalid resource descriptor: size is zero"
        );
        assert!(device_err.source().is_some());
    }

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::TooManyColorTargets {
            requested: 9,
            max: 8,
        };
        assert_eq!(format!("{err}"), "Pipeline requests 9 color targets (max 8)");
    }
}
