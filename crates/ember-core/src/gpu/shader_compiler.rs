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

//! The shader compilation front-end.
//!
//! Source text goes through a small preprocessor (defines, conditionals,
//! includes resolved against the source file's directory), is parsed and
//! validated as WGSL, and is then emitted as the backend's bytecode
//! container: SPIR-V words for Vulkan-class consumers, or HLSL text at the
//! requested shader-model profile for the D3D toolchain. Reflection over
//! the validated module yields the resource bindings the shader declares.

use crate::gpu::caps::{ShaderBlobKind, ShaderStage};
use crate::gpu::error::ShaderError;
use crate::gpu::shader::{ShaderArtifact, ShaderResource, ShaderResourceKind};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Maximum `#include` nesting before the preprocessor gives up.
const MAX_INCLUDE_DEPTH: usize = 16;

/// A D3D-style shader model, selecting the target profile for HLSL output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModel {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl Default for ShaderModel {
    fn default() -> Self {
        Self { major: 6, minor: 0 }
    }
}

/// Options controlling one shader compilation.
#[derive(Debug, Clone)]
pub struct ShaderCompileOptions {
    /// The source text.
    pub source: String,
    /// The entry point function name.
    pub entry_point: String,
    /// The file the source came from; used for diagnostics and as the
    /// include root.
    pub file_name: String,
    /// Preprocessor defines, as `(name, value)` pairs. An empty value
    /// defines the macro without a replacement.
    pub defines: Vec<(String, String)>,
    /// The stage to compile for.
    pub stage: ShaderStage,
    /// The shader model selecting the target profile.
    pub shader_model: ShaderModel,
    /// The bytecode container to emit.
    pub blob_kind: ShaderBlobKind,
}

impl ShaderCompileOptions {
    /// Creates options with the conventional defaults: entry point `main`,
    /// shader model 6.0, SPIR-V output.
    pub fn new(stage: ShaderStage, source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entry_point: "main".to_string(),
            file_name: "<embedded>".to_string(),
            defines: Vec::new(),
            stage,
            shader_model: ShaderModel::default(),
            blob_kind: ShaderBlobKind::Spirv,
        }
    }

    /// Like [`new`](Self::new), but infers the entry point from the stage:
    /// `Vertex → VSMain`, `Fragment → PSMain`, `Compute → CSMain`.
    pub fn with_inferred_entry_point(stage: ShaderStage, source: impl Into<String>) -> Self {
        let mut options = Self::new(stage, source);
        options.entry_point = match stage {
            ShaderStage::Vertex => "VSMain",
            ShaderStage::Fragment => "PSMain",
            ShaderStage::Compute => "CSMain",
            ShaderStage::Hull => "HSMain",
            ShaderStage::Domain => "DSMain",
            ShaderStage::Geometry => "GSMain",
        }
        .to_string();
        options
    }

    /// Sets the entry point name.
    pub fn entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Sets the source file name (diagnostics and include root).
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Adds one preprocessor define.
    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }

    /// Selects the bytecode container.
    pub fn blob_kind(mut self, blob_kind: ShaderBlobKind) -> Self {
        self.blob_kind = blob_kind;
        self
    }

    /// Selects the shader model.
    pub fn shader_model(mut self, major: u32, minor: u32) -> Self {
        self.shader_model = ShaderModel { major, minor };
        self
    }
}

/// Returns the D3D-style target profile for a stage and model, e.g.
/// `vs_6_0`.
pub fn target_profile(stage: ShaderStage, model: ShaderModel) -> String {
    let prefix = match stage {
        ShaderStage::Vertex => "vs",
        ShaderStage::Hull => "hs",
        ShaderStage::Domain => "ds",
        ShaderStage::Geometry => "gs",
        ShaderStage::Fragment => "ps",
        ShaderStage::Compute => "cs",
    };
    format!("{prefix}_{}_{}", model.major, model.minor)
}

// --- Preprocessor ---

struct Branch {
    parent_active: bool,
    taken: bool,
    active: bool,
}

struct Preprocessor {
    defines: HashMap<String, String>,
}

impl Preprocessor {
    fn new(defines: &[(String, String)]) -> Self {
        Self {
            defines: defines.iter().cloned().collect(),
        }
    }

    fn run(&mut self, source: &str, file_name: &str) -> Result<String, ShaderError> {
        let mut output = String::with_capacity(source.len());
        self.process(source, file_name, 0, &mut output)?;
        Ok(output)
    }

    fn process(
        &mut self,
        source: &str,
        file_name: &str,
        depth: usize,
        output: &mut String,
    ) -> Result<(), ShaderError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(ShaderError::PreprocessError {
                file: file_name.to_string(),
                details: format!("include depth exceeds {MAX_INCLUDE_DEPTH}"),
            });
        }

        let mut branches: Vec<Branch> = Vec::new();
        let active = |branches: &[Branch]| branches.last().map(|b| b.active).unwrap_or(true);

        for line in source.lines() {
            let trimmed = line.trim_start();
            if let Some(directive) = trimmed.strip_prefix('#') {
                let mut parts = directive.split_whitespace();
                let keyword = parts.next().unwrap_or("");
                match keyword {
                    "ifdef" | "ifndef" => {
                        let name = parts.next().ok_or_else(|| ShaderError::PreprocessError {
                            file: file_name.to_string(),
                            details: format!("#{keyword} without a macro name"),
                        })?;
                        let defined = self.defines.contains_key(name);
                        let condition = if keyword == "ifdef" { defined } else { !defined };
                        let parent_active = active(&branches);
                        branches.push(Branch {
                            parent_active,
                            taken: condition,
                            active: parent_active && condition,
                        });
                    }
                    "else" => {
                        let branch =
                            branches
                                .last_mut()
                                .ok_or_else(|| ShaderError::PreprocessError {
                                    file: file_name.to_string(),
                                    details: "#else without a matching #ifdef".to_string(),
                                })?;
                        branch.active = branch.parent_active && !branch.taken;
                        branch.taken = true;
                    }
                    "endif" => {
                        branches.pop().ok_or_else(|| ShaderError::PreprocessError {
                            file: file_name.to_string(),
                            details: "#endif without a matching #ifdef".to_string(),
                        })?;
                    }
                    "define" if active(&branches) => {
                        let name = parts.next().ok_or_else(|| ShaderError::PreprocessError {
                            file: file_name.to_string(),
                            details: "#define without a macro name".to_string(),
                        })?;
                        let value = parts.collect::<Vec<_>>().join(" ");
                        self.defines.insert(name.to_string(), value);
                    }
                    "undef" if active(&branches) => {
                        if let Some(name) = parts.next() {
                            self.defines.remove(name);
                        }
                    }
                    "include" if active(&branches) => {
                        let path = directive
                            .trim_start_matches("include")
                            .trim()
                            .trim_matches('"');
                        let resolved = resolve_include(file_name, path);
                        let included = std::fs::read_to_string(&resolved).map_err(|_| {
                            ShaderError::IncludeNotFound {
                                path: path.to_string(),
                                from: file_name.to_string(),
                            }
                        })?;
                        let resolved_name = resolved.to_string_lossy().into_owned();
                        self.process(&included, &resolved_name, depth + 1, output)?;
                    }
                    // Directives inside inactive branches are skipped without
                    // being interpreted (a missing include there is not an
                    // error).
                    "define" | "undef" | "include" => {}
                    other => {
                        if active(&branches) {
                            return Err(ShaderError::PreprocessError {
                                file: file_name.to_string(),
                                details: format!("unknown directive #{other}"),
                            });
                        }
                    }
                }
                continue;
            }

            if active(&branches) {
                self.expand_into(line, output);
                output.push('\n');
            }
        }

        if !branches.is_empty() {
            return Err(ShaderError::PreprocessError {
                file: file_name.to_string(),
                details: "unterminated #ifdef".to_string(),
            });
        }
        Ok(())
    }

    /// Substitutes defined macros (whole identifiers only) with their
    /// values. Macros defined without a value are left in place.
    fn expand_into(&self, line: &str, output: &mut String) {
        let mut word = String::new();
        let flush = |word: &mut String, output: &mut String, defines: &HashMap<String, String>| {
            if word.is_empty() {
                return;
            }
            match defines.get(word.as_str()) {
                Some(value) if !value.is_empty() => output.push_str(value),
                _ => output.push_str(word),
            }
            word.clear();
        };
        for ch in line.chars() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                word.push(ch);
            } else {
                flush(&mut word, output, &self.defines);
                output.push(ch);
            }
        }
        flush(&mut word, output, &self.defines);
    }
}

fn resolve_include(from_file: &str, requested: &str) -> PathBuf {
    let root = Path::new(from_file).parent().unwrap_or_else(|| Path::new(""));
    root.join(requested)
}

/// Runs only the preprocessor stage over `source`. Exposed for tooling and
/// tests; [`compile`] calls it internally.
pub fn preprocess(
    source: &str,
    file_name: &str,
    defines: &[(String, String)],
) -> Result<String, ShaderError> {
    Preprocessor::new(defines).run(source, file_name)
}

// --- Compilation ---

fn naga_stage(stage: ShaderStage) -> Result<naga::ShaderStage, ShaderError> {
    match stage {
        ShaderStage::Vertex => Ok(naga::ShaderStage::Vertex),
        ShaderStage::Fragment => Ok(naga::ShaderStage::Fragment),
        ShaderStage::Compute => Ok(naga::ShaderStage::Compute),
        other => Err(ShaderError::UnsupportedStage { stage: other }),
    }
}

fn hlsl_shader_model(model: ShaderModel) -> naga::back::hlsl::ShaderModel {
    match (model.major, model.minor) {
        (5, 0) => naga::back::hlsl::ShaderModel::V5_0,
        (5, _) => naga::back::hlsl::ShaderModel::V5_1,
        _ => naga::back::hlsl::ShaderModel::V6_0,
    }
}

fn reflect_resources(module: &naga::Module) -> Vec<ShaderResource> {
    let mut resources = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(ref binding) = var.binding else {
            continue;
        };
        let kind = match var.space {
            naga::AddressSpace::Uniform => ShaderResourceKind::ConstantBuffer,
            naga::AddressSpace::Storage { access } => {
                if access.contains(naga::StorageAccess::STORE) {
                    ShaderResourceKind::StorageBufferReadWrite
                } else {
                    ShaderResourceKind::StorageBufferRead
                }
            }
            naga::AddressSpace::Handle => match module.types[var.ty].inner {
                naga::TypeInner::Image {
                    class: naga::ImageClass::Storage { .. },
                    ..
                } => ShaderResourceKind::StorageTexture,
                naga::TypeInner::Image { .. } => ShaderResourceKind::Texture,
                naga::TypeInner::Sampler { .. } => ShaderResourceKind::Sampler,
                _ => continue,
            },
            _ => continue,
        };
        resources.push(ShaderResource {
            name: var.name.clone().unwrap_or_default(),
            set: binding.group,
            binding: binding.binding,
            kind,
        });
    }
    resources.sort_by_key(|r| (r.set, r.binding));
    resources
}

fn hash_bytecode(bytecode: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytecode.hash(&mut hasher);
    hasher.finish()
}

/// Compiles shader source into a [`ShaderArtifact`].
///
/// This is a pure function of its options: the caller (normally the device,
/// which also injects the `BINDLESS` macro when the backend supports it)
/// decides the blob kind and defines. Matrix packing follows WGSL's
/// column-major semantics throughout.
pub fn compile(options: &ShaderCompileOptions) -> Result<ShaderArtifact, ShaderError> {
    let stage = naga_stage(options.stage)?;

    // The blob-kind macro is always visible to the source.
    let mut defines = options.defines.clone();
    defines.push(match options.blob_kind {
        ShaderBlobKind::Dxil => ("DXIL".to_string(), String::new()),
        ShaderBlobKind::Spirv => ("SPIRV".to_string(), String::new()),
    });

    let preprocessed = preprocess(&options.source, &options.file_name, &defines)?;

    let module = naga::front::wgsl::parse_str(&preprocessed).map_err(|e| {
        let details = e.emit_to_string(&preprocessed);
        log::error!("Shader parse failed for '{}':\n{}", options.file_name, details);
        ShaderError::ParseError {
            file: options.file_name.clone(),
            details,
        }
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    let info = validator.validate(&module).map_err(|e| {
        let details = e.to_string();
        log::error!(
            "Shader validation failed for '{}': {}",
            options.file_name,
            details
        );
        ShaderError::ValidationError {
            file: options.file_name.clone(),
            details,
        }
    })?;

    if !module
        .entry_points
        .iter()
        .any(|ep| ep.name == options.entry_point && ep.stage == stage)
    {
        return Err(ShaderError::InvalidEntryPoint {
            entry_point: options.entry_point.clone(),
            file: options.file_name.clone(),
        });
    }

    let bytecode = match options.blob_kind {
        ShaderBlobKind::Spirv => {
            let mut spv_options = naga::back::spv::Options::default();
            // Vulkan-1.2-class target.
            spv_options.lang_version = (1, 5);
            if cfg!(debug_assertions) {
                spv_options.flags.insert(naga::back::spv::WriterFlags::DEBUG);
            } else {
                spv_options.flags.remove(naga::back::spv::WriterFlags::DEBUG);
            }
            let pipeline_options = naga::back::spv::PipelineOptions {
                shader_stage: stage,
                entry_point: options.entry_point.clone(),
            };
            let words =
                naga::back::spv::write_vec(&module, &info, &spv_options, Some(&pipeline_options))
                    .map_err(|e| {
                        let details = e.to_string();
                        log::error!(
                            "SPIR-V emission failed for '{}': {}",
                            options.file_name,
                            details
                        );
                        ShaderError::EmitError {
                            file: options.file_name.clone(),
                            details,
                        }
                    })?;
            bytemuck::cast_slice::<u32, u8>(&words).to_vec()
        }
        ShaderBlobKind::Dxil => {
            let mut hlsl_options = naga::back::hlsl::Options::default();
            hlsl_options.shader_model = hlsl_shader_model(options.shader_model);
            let hlsl_pipeline_options = naga::back::hlsl::PipelineOptions::default();
            let mut text = String::new();
            let mut writer =
                naga::back::hlsl::Writer::new(&mut text, &hlsl_options, &hlsl_pipeline_options);
            writer.write(&module, &info, None).map_err(|e| {
                let details = e.to_string();
                log::error!(
                    "HLSL emission failed for '{}' (profile {}): {}",
                    options.file_name,
                    target_profile(options.stage, options.shader_model),
                    details
                );
                ShaderError::EmitError {
                    file: options.file_name.clone(),
                    details,
                }
            })?;
            text.into_bytes()
        }
    };

    log::debug!(
        "Compiled shader '{}' ({}, {} bytes)",
        options.file_name,
        target_profile(options.stage, options.shader_model),
        bytecode.len()
    );

    let content_hash = hash_bytecode(&bytecode);
    Ok(ShaderArtifact {
        stage: options.stage,
        entry_point: options.entry_point.clone(),
        blob_kind: options.blob_kind,
        bytecode,
        resources: reflect_resources(&module),
        content_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_VS: &str = r#"
@vertex
fn VSMain(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index) - 1);
    let y = f32(i32(index & 1u) * 2 - 1);
    return vec4<f32>(x, y, 0.0, 1.0);
}
"#;

    fn defines(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn preprocessor_substitutes_defined_values() {
        let out = preprocess(
            "const n = COUNT;",
            "test.wgsl",
            &defines(&[("COUNT", "4")]),
        )
        .unwrap();
        assert_eq!(out.trim(), "const n = 4;");
    }

    #[test]
    fn preprocessor_does_not_touch_partial_identifiers() {
        let out = preprocess(
            "const DISCOUNT = 1;",
            "test.wgsl",
            &defines(&[("COUNT", "4")]),
        )
        .unwrap();
        assert_eq!(out.trim(), "const DISCOUNT = 1;");
    }

    #[test]
    fn preprocessor_handles_ifdef_else() {
        let source = "#ifdef FAST\nfast\n#else\nslow\n#endif\n";
        let fast = preprocess(source, "t.wgsl", &defines(&[("FAST", "")])).unwrap();
        assert_eq!(fast.trim(), "fast");
        let slow = preprocess(source, "t.wgsl", &[]).unwrap();
        assert_eq!(slow.trim(), "slow");
    }

    #[test]
    fn preprocessor_rejects_unbalanced_blocks() {
        assert!(matches!(
            preprocess("#endif\n", "t.wgsl", &[]),
            Err(ShaderError::PreprocessError { .. })
        ));
        assert!(matches!(
            preprocess("#ifdef A\n", "t.wgsl", &[]),
            Err(ShaderError::PreprocessError { .. })
        ));
    }

    #[test]
    fn missing_include_is_an_error_only_when_reached() {
        let err = preprocess("#include \"nope.wgsl\"\n", "t.wgsl", &[]);
        assert!(matches!(err, Err(ShaderError::IncludeNotFound { .. })));

        // The same include inside an inactive branch is skipped.
        let ok = preprocess(
            "#ifdef NEVER\n#include \"nope.wgsl\"\n#endif\nbody\n",
            "t.wgsl",
            &[],
        )
        .unwrap();
        assert_eq!(ok.trim(), "body");
    }

    #[test]
    fn include_resolves_against_source_directory() {
        let dir = std::env::temp_dir().join(format!("ember-shader-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let header = dir.join("common.wgsl");
        std::fs::write(&header, "const from_include = 7;\n").unwrap();
        let main_file = dir.join("main.wgsl");

        let out = preprocess(
            "#include \"common.wgsl\"\nbody\n",
            main_file.to_str().unwrap(),
            &[],
        )
        .unwrap();
        assert!(out.contains("from_include"));
        assert!(out.contains("body"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn compiles_vertex_shader_to_spirv() {
        let options = ShaderCompileOptions::with_inferred_entry_point(
            ShaderStage::Vertex,
            TRIANGLE_VS,
        );
        let artifact = compile(&options).unwrap();
        assert_eq!(artifact.stage, ShaderStage::Vertex);
        assert_eq!(artifact.entry_point, "VSMain");
        assert!(artifact.bytecode.len() % 4 == 0);
        // SPIR-V magic number.
        let magic = u32::from_le_bytes(artifact.bytecode[0..4].try_into().unwrap());
        assert_eq!(magic, 0x0723_0203);
        assert_ne!(artifact.content_hash, 0);
    }

    #[test]
    fn compiles_fragment_shader_to_hlsl_text() {
        let source = r#"
@fragment
fn PSMain() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 1.0, 1.0);
}
"#;
        let options =
            ShaderCompileOptions::with_inferred_entry_point(ShaderStage::Fragment, source)
                .blob_kind(ShaderBlobKind::Dxil);
        let artifact = compile(&options).unwrap();
        let text = String::from_utf8(artifact.bytecode.clone()).unwrap();
        assert!(text.contains("PSMain"));
    }

    #[test]
    fn blob_kind_macro_selects_code_paths() {
        let source = r#"
#ifdef SPIRV
@vertex
fn main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }
#endif
"#;
        let options = ShaderCompileOptions::new(ShaderStage::Vertex, source);
        assert!(compile(&options).is_ok());
    }

    #[test]
    fn reflection_reports_declared_bindings() {
        let source = r#"
struct Globals {
    tint: vec4<f32>,
}
@group(1) @binding(2) var<uniform> globals: Globals;
@group(0) @binding(0) var color_map: texture_2d<f32>;
@group(0) @binding(1) var color_sampler: sampler;

@fragment
fn PSMain(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = pos.xy / 512.0;
    return textureSample(color_map, color_sampler, uv) * globals.tint;
}
"#;
        let options =
            ShaderCompileOptions::with_inferred_entry_point(ShaderStage::Fragment, source);
        let artifact = compile(&options).unwrap();
        assert_eq!(artifact.resources.len(), 3);
        assert_eq!(artifact.resources[0].kind, ShaderResourceKind::Texture);
        assert_eq!(artifact.resources[1].kind, ShaderResourceKind::Sampler);
        assert_eq!(
            artifact.resources[2],
            ShaderResource {
                name: "globals".to_string(),
                set: 1,
                binding: 2,
                kind: ShaderResourceKind::ConstantBuffer,
            }
        );
    }

    #[test]
    fn wrong_entry_point_is_rejected() {
        let options =
            ShaderCompileOptions::new(ShaderStage::Vertex, TRIANGLE_VS).entry_point("main");
        assert!(matches!(
            compile(&options),
            Err(ShaderError::InvalidEntryPoint { .. })
        ));
    }

    #[test]
    fn tessellation_stages_are_unsupported() {
        let options = ShaderCompileOptions::new(ShaderStage::Hull, TRIANGLE_VS);
        assert!(matches!(
            compile(&options),
            Err(ShaderError::UnsupportedStage { .. })
        ));
    }

    #[test]
    fn target_profiles() {
        assert_eq!(
            target_profile(ShaderStage::Vertex, ShaderModel::default()),
            "vs_6_0"
        );
        assert_eq!(
            target_profile(ShaderStage::Compute, ShaderModel { major: 5, minor: 1 }),
            "cs_5_1"
        );
    }
}
