//! Typed error types for shader-stash.
//!
//! Compiler and device collaborators report `CompileError` / `DeviceError`;
//! the scanner wraps them in `StashError` together with the offending file so
//! callers can tell which shader failed without parsing strings.

use shader_stash_config::ShaderKind;
use std::any::Any;
use thiserror::Error;

/// Failure turning shader source text into IR.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The source file is not valid UTF-8.
    #[error("Shader source for '{name}' is not valid UTF-8")]
    InvalidUtf8 {
        /// Shader name.
        name: String,
    },

    /// The kind was `InferFromSource` but the source has no usable
    /// `#pragma shader_stage(...)` annotation.
    #[error("Unable to infer shader stage for '{name}': no #pragma shader_stage(...) found")]
    StageNotInferred {
        /// Shader name.
        name: String,
    },

    /// The compiler has no support for this pipeline stage.
    #[error("Shader '{name}' targets the {kind} stage, which the compiler does not support")]
    UnsupportedStage {
        /// Shader name.
        name: String,
        /// Resolved stage.
        kind: ShaderKind,
    },

    /// The GLSL source could not be parsed.
    #[error("GLSL parse error in '{name}':\n{details}")]
    GlslParse {
        /// Shader name.
        name: String,
        /// Human-readable parse error messages.
        details: String,
    },

    /// The parsed module failed validation.
    #[error("Shader validation failed for '{name}': {details}")]
    Validation {
        /// Shader name.
        name: String,
        /// Human-readable validation error details.
        details: String,
    },

    /// The compiler panicked while handling this shader.
    #[error("Compiler panicked on '{name}': {message}")]
    Panicked {
        /// Shader name.
        name: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// IR generation from the validated module failed.
    #[error("IR generation failed for '{name}': {details}")]
    Generation {
        /// Shader name.
        name: String,
        /// Human-readable generation error details.
        details: String,
    },
}

/// Failure creating a module handle from IR.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device rejected the IR.
    #[error("Shader module creation failed for '{name}': {details}")]
    ModuleCreation {
        /// Shader name.
        name: String,
        /// Driver / validation message.
        details: String,
    },

    /// The device panicked while creating the module.
    #[error("Device panicked creating module for '{name}': {message}")]
    Panicked {
        /// Shader name.
        name: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The IR carries nothing the device can build a module from.
    #[error("Shader IR for '{name}' has no entry point")]
    MissingEntryPoint {
        /// Shader name.
        name: String,
    },
}

/// Errors surfaced by the stash.
///
/// Per-file failures never abort a scan; they are collected into the scan
/// report and the cached entry for that file stays as it was.
#[derive(Debug, Error)]
pub enum StashError {
    /// The compiler rejected a shader.
    #[error("Failed to compile '{file}': {source}")]
    Compile {
        /// Shader identifier (file name).
        file: String,
        /// Compiler diagnostic.
        #[source]
        source: CompileError,
    },

    /// The device failed to create a module for a compiled shader.
    #[error("Failed to create shader module for '{file}': {source}")]
    Device {
        /// Shader identifier (file name).
        file: String,
        /// Device diagnostic.
        #[source]
        source: DeviceError,
    },

    /// The background watcher thread could not be started.
    #[error("Failed to spawn shader watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl StashError {
    /// Identifier of the shader this error belongs to, if any.
    pub fn file(&self) -> Option<&str> {
        match self {
            StashError::Compile { file, .. } | StashError::Device { file, .. } => Some(file),
            StashError::Spawn(_) => None,
        }
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of(f: impl FnOnce() + std::panic::UnwindSafe) -> Box<dyn Any + Send> {
        match std::panic::catch_unwind(f) {
            Ok(()) => panic!("closure did not panic"),
            Err(payload) => payload,
        }
    }

    #[test]
    fn test_panic_message_payloads() {
        let payload = payload_of(|| panic!("static message"));
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload = payload_of(|| panic!("formatted {}", 42));
        assert_eq!(panic_message(payload.as_ref()), "formatted 42");

        let payload = payload_of(|| std::panic::panic_any(7u8));
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
