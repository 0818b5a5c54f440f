//! Graphics device collaborator.
//!
//! A device turns [`ShaderIr`] into an opaque module handle. The stash wraps
//! every handle in an `Arc`, so the module type only has to be shareable
//! across threads.

use crate::compiler::ShaderIr;
use crate::error::DeviceError;
use shader_stash_config::ShaderKind;
use std::sync::Arc;

/// Creates shader modules from compiled IR.
pub trait ShaderDevice: Send + Sync {
    /// Opaque compiled module owned by the device.
    type Module: Send + Sync + 'static;

    fn create_shader_module(&self, ir: &ShaderIr) -> Result<Self::Module, DeviceError>;
}

impl<T: ShaderDevice + ?Sized> ShaderDevice for Arc<T> {
    type Module = T::Module;

    fn create_shader_module(&self, ir: &ShaderIr) -> Result<Self::Module, DeviceError> {
        (**self).create_shader_module(ir)
    }
}

impl ShaderDevice for wgpu::Device {
    type Module = wgpu::ShaderModule;

    /// Create a module from WGSL inside a validation error scope so a rejected
    /// shader is reported instead of reaching the uncaptured error handler.
    fn create_shader_module(&self, ir: &ShaderIr) -> Result<Self::Module, DeviceError> {
        self.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = wgpu::Device::create_shader_module(
            self,
            wgpu::ShaderModuleDescriptor {
                label: Some(&ir.name),
                source: wgpu::ShaderSource::Wgsl(ir.wgsl.as_str().into()),
            },
        );

        if let Some(error) = pollster::block_on(self.pop_error_scope()) {
            return Err(DeviceError::ModuleCreation {
                name: ir.name.clone(),
                details: error.to_string(),
            });
        }

        Ok(module)
    }
}

/// Module descriptor produced by [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessModule {
    pub label: String,
    pub kind: ShaderKind,
    pub entry_point: String,
    pub wgsl_len: usize,
}

/// Device used when no GPU is available (e.g. `shader-stash check`).
///
/// It accepts any IR with an entry point and records what a real device
/// would have been given.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessDevice;

impl ShaderDevice for HeadlessDevice {
    type Module = HeadlessModule;

    fn create_shader_module(&self, ir: &ShaderIr) -> Result<Self::Module, DeviceError> {
        let entry_point = ir
            .entry_point
            .clone()
            .ok_or_else(|| DeviceError::MissingEntryPoint {
                name: ir.name.clone(),
            })?;

        Ok(HeadlessModule {
            label: ir.name.clone(),
            kind: ir.kind,
            entry_point,
            wgsl_len: ir.wgsl.len(),
        })
    }
}
