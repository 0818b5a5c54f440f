//! File extension to shader kind mapping.

use shader_stash_config::ShaderKind;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Built-in extension table, initialised once per process.
static BUILTIN_EXTENSIONS: LazyLock<HashMap<String, ShaderKind>> = LazyLock::new(|| {
    [
        ("vert", ShaderKind::Vertex),
        ("frag", ShaderKind::Fragment),
        ("geom", ShaderKind::Geometry),
        ("tesc", ShaderKind::TessControl),
        ("tese", ShaderKind::TessEvaluation),
        ("comp", ShaderKind::Compute),
    ]
    .into_iter()
    .map(|(ext, kind)| (ext.to_string(), kind))
    .collect()
});

/// Extension (without the dot, case-sensitive) to shader kind lookup.
///
/// Starts from the built-in table; extra mappings added with
/// [`ExtensionTable::with_extension`] take precedence. Unknown extensions
/// resolve to [`ShaderKind::InferFromSource`].
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    kinds: HashMap<String, ShaderKind>,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self {
            kinds: BUILTIN_EXTENSIONS.clone(),
        }
    }
}

impl ExtensionTable {
    /// Add or override a mapping.
    pub fn with_extension(mut self, extension: impl Into<String>, kind: ShaderKind) -> Self {
        self.insert(extension, kind);
        self
    }

    /// Add or override a mapping in place.
    pub fn insert(&mut self, extension: impl Into<String>, kind: ShaderKind) {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.').to_string();
        self.kinds.insert(extension, kind);
    }

    /// Kind for a bare extension.
    pub fn kind_for_extension(&self, extension: &str) -> ShaderKind {
        self.kinds
            .get(extension)
            .copied()
            .unwrap_or(ShaderKind::InferFromSource)
    }

    /// Kind for a file path, based on its extension.
    pub fn kind_for_path(&self, path: &Path) -> ShaderKind {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.kind_for_extension(ext))
            .unwrap_or(ShaderKind::InferFromSource)
    }
}
