//! Shader compiler collaborator.
//!
//! The stash only needs `source + kind -> IR`. [`NagaCompiler`] implements that
//! by parsing GLSL with naga, validating the module, and emitting WGSL, which
//! is what the wgpu device consumes.

use crate::error::CompileError;
use shader_stash_config::ShaderKind;
use std::sync::Arc;

/// Compiled intermediate representation handed to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderIr {
    /// Shader name (the cache identifier), used for labels and diagnostics.
    pub name: String,
    /// Resolved stage. Never `InferFromSource`.
    pub kind: ShaderKind,
    /// Entry point function name, if the module has one.
    pub entry_point: Option<String>,
    /// Generated WGSL source.
    pub wgsl: String,
}

/// Turns shader source text into [`ShaderIr`].
///
/// Implementations must accept [`ShaderKind::InferFromSource`] and resolve the
/// stage from the source itself.
pub trait ShaderCompiler: Send + Sync {
    fn compile(
        &self,
        source: &str,
        kind: ShaderKind,
        name: &str,
    ) -> Result<ShaderIr, CompileError>;
}

impl<T: ShaderCompiler + ?Sized> ShaderCompiler for Arc<T> {
    fn compile(
        &self,
        source: &str,
        kind: ShaderKind,
        name: &str,
    ) -> Result<ShaderIr, CompileError> {
        (**self).compile(source, kind, name)
    }
}

/// GLSL compiler backed by naga (GLSL front end, WGSL back end).
#[derive(Debug, Default, Clone, Copy)]
pub struct NagaCompiler;

impl NagaCompiler {
    pub fn new() -> Self {
        Self
    }
}

/// Find a `#pragma shader_stage(<stage>)` line.
///
/// Returns the stage (if the name is recognised) and the source with that
/// line blanked out so line numbers in diagnostics stay correct.
pub fn extract_stage_pragma(source: &str) -> (Option<ShaderKind>, String) {
    let mut stage = None;
    let mut cleaned = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        if stage.is_none()
            && let Some(name) = parse_stage_pragma(line)
        {
            stage = ShaderKind::from_pragma_name(name);
            if stage.is_some() {
                if line.ends_with('\n') {
                    cleaned.push('\n');
                }
                continue;
            }
        }
        cleaned.push_str(line);
    }

    (stage, cleaned)
}

fn parse_stage_pragma(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("pragma")?.trim_start();
    let rest = rest.strip_prefix("shader_stage")?.trim_start();
    let rest = rest.strip_prefix('(')?;
    let end = rest.find(')')?;
    Some(&rest[..end])
}

fn naga_stage(kind: ShaderKind) -> Option<naga::ShaderStage> {
    match kind {
        ShaderKind::Vertex => Some(naga::ShaderStage::Vertex),
        ShaderKind::Fragment => Some(naga::ShaderStage::Fragment),
        ShaderKind::Compute => Some(naga::ShaderStage::Compute),
        _ => None,
    }
}

impl ShaderCompiler for NagaCompiler {
    fn compile(
        &self,
        source: &str,
        kind: ShaderKind,
        name: &str,
    ) -> Result<ShaderIr, CompileError> {
        let (pragma_stage, cleaned) = extract_stage_pragma(source);

        let kind = match kind {
            ShaderKind::InferFromSource => {
                pragma_stage.ok_or_else(|| CompileError::StageNotInferred {
                    name: name.to_string(),
                })?
            }
            explicit => explicit,
        };

        let stage = naga_stage(kind).ok_or_else(|| CompileError::UnsupportedStage {
            name: name.to_string(),
            kind,
        })?;

        // Parse GLSL using naga
        let mut parser = naga::front::glsl::Frontend::default();
        let options = naga::front::glsl::Options::from(stage);

        let module = parser.parse(&options, &cleaned).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .errors
                .iter()
                .map(|e| format!("  {:?}", e.kind))
                .collect();
            CompileError::GlslParse {
                name: name.to_string(),
                details: error_messages.join("\n"),
            }
        })?;

        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| CompileError::Validation {
            name: name.to_string(),
            details: format!("{:?}", e),
        })?;

        let mut wgsl = String::new();
        let mut writer =
            naga::back::wgsl::Writer::new(&mut wgsl, naga::back::wgsl::WriterFlags::empty());
        writer
            .write(&module, &info)
            .map_err(|e| CompileError::Generation {
                name: name.to_string(),
                details: format!("{:?}", e),
            })?;

        let entry_point = module.entry_points.first().map(|ep| ep.name.clone());

        log::debug!(
            "Compiled {} shader '{}' ({} bytes GLSL -> {} bytes WGSL)",
            kind,
            name,
            source.len(),
            wgsl.len()
        );

        Ok(ShaderIr {
            name: name.to_string(),
            kind,
            entry_point,
            wgsl,
        })
    }
}
