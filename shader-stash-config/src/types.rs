//! Shared configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a shader source is compiled for.
///
/// `InferFromSource` asks the compiler to detect the stage from a
/// `#pragma shader_stage(...)` annotation inside the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderKind {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEvaluation,
    Compute,
    InferFromSource,
}

impl ShaderKind {
    /// Parse the stage name used by `#pragma shader_stage(<name>)`.
    pub fn from_pragma_name(name: &str) -> Option<Self> {
        match name.trim() {
            "vertex" => Some(ShaderKind::Vertex),
            "fragment" => Some(ShaderKind::Fragment),
            "geometry" => Some(ShaderKind::Geometry),
            "tesscontrol" => Some(ShaderKind::TessControl),
            "tesseval" => Some(ShaderKind::TessEvaluation),
            "compute" => Some(ShaderKind::Compute),
            _ => None,
        }
    }

    /// Human-readable stage name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Fragment => "fragment",
            ShaderKind::Geometry => "geometry",
            ShaderKind::TessControl => "tessellation control",
            ShaderKind::TessEvaluation => "tessellation evaluation",
            ShaderKind::Compute => "compute",
            ShaderKind::InferFromSource => "inferred",
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
