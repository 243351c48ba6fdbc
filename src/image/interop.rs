// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! External memory and semaphore interop.
//!
//! These operations are part of the public surface but are not implemented
//! by this backend; every call reports
//! [`RuntimeError::UnsupportedFeature`].

use super::{Image, ImageDescriptor};
use crate::{
    context::Context, device::Device, format::ImageFormat, queue::Queue, sync::Event,
    RuntimeError,
};
use std::sync::Arc;

/// Describes memory to import from another API.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct ExternalMemoryDescriptor {}

/// Imported external memory.
#[derive(Debug)]
pub struct ExternalMemoryHandle {
    _priv: (),
}

/// Describes a semaphore to import from another API.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct ExternalSemaphoreDescriptor {}

/// An imported external semaphore.
#[derive(Debug)]
pub struct ExternalSemaphoreHandle {
    _priv: (),
}

/// Imports memory exported by another API.
pub fn import_external_memory(
    _context: &Arc<Context>,
    _device: &Arc<Device>,
    _size: u64,
    _descriptor: &ExternalMemoryDescriptor,
) -> Result<ExternalMemoryHandle, RuntimeError> {
    log::warn!("external memory import is not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

/// Maps imported external memory as an image.
pub fn map_external_array(
    _context: &Arc<Context>,
    _device: &Arc<Device>,
    _format: &ImageFormat,
    _descriptor: &ImageDescriptor,
    _memory: &ExternalMemoryHandle,
) -> Result<Arc<Image>, RuntimeError> {
    log::warn!("external array mapping is not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

/// Releases imported external memory.
pub fn release_external_memory(
    _context: &Arc<Context>,
    _device: &Arc<Device>,
    _memory: ExternalMemoryHandle,
) -> Result<(), RuntimeError> {
    log::warn!("external memory release is not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

/// Imports a semaphore exported by another API.
pub fn import_external_semaphore(
    _context: &Arc<Context>,
    _device: &Arc<Device>,
    _descriptor: &ExternalSemaphoreDescriptor,
) -> Result<ExternalSemaphoreHandle, RuntimeError> {
    log::warn!("external semaphore import is not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

/// Destroys an imported external semaphore.
pub fn destroy_external_semaphore(
    _context: &Arc<Context>,
    _device: &Arc<Device>,
    _semaphore: ExternalSemaphoreHandle,
) -> Result<(), RuntimeError> {
    log::warn!("external semaphore destruction is not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

/// Enqueues a wait on an imported external semaphore.
pub fn wait_external_semaphore(
    _queue: &Arc<Queue>,
    _semaphore: &ExternalSemaphoreHandle,
    _wait_events: &[Arc<Event>],
) -> Result<Arc<Event>, RuntimeError> {
    log::warn!("external semaphore waits are not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

/// Enqueues a signal of an imported external semaphore.
pub fn signal_external_semaphore(
    _queue: &Arc<Queue>,
    _semaphore: &ExternalSemaphoreHandle,
    _wait_events: &[Arc<Event>],
) -> Result<Arc<Event>, RuntimeError> {
    log::warn!("external semaphore signals are not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

#[cfg(test)]
mod tests {
    use super::{import_external_memory, import_external_semaphore, ExternalMemoryDescriptor,
        ExternalSemaphoreDescriptor};
    use crate::RuntimeError;

    #[test]
    fn interop_surface_is_unsupported() {
        let (context, device) = mock_context_and_device!();

        match import_external_memory(&context, &device, 4096, &ExternalMemoryDescriptor::default())
        {
            Err(RuntimeError::UnsupportedFeature) => (),
            _ => panic!(),
        }

        match import_external_semaphore(&context, &device, &ExternalSemaphoreDescriptor::default())
        {
            Err(RuntimeError::UnsupportedFeature) => (),
            _ => panic!(),
        }
    }
}
