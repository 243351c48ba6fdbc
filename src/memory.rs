// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Linear device memory.
//!
//! Images normally live in opaque, vendor-tiled allocations, but they can
//! also be backed by flat device memory with an explicit row stride
//! ("pitched" memory). [`pitched_alloc_2d`] asks the driver for the pitch a
//! 2D image of the requested size needs and allocates the backing store
//! through a [`UsmAllocator`].

use crate::{
    check_errors, context::Context, device::Device, zero, RuntimeError, ZeroObject,
};
use std::{os::raw::c_void, ptr, sync::Arc};

/// A raw pointer into linear device memory.
///
/// The pointer is not dereferenceable on the host; it only identifies the
/// allocation for the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DevicePointer(*mut c_void);

unsafe impl Send for DevicePointer {}
unsafe impl Sync for DevicePointer {}

impl DevicePointer {
    /// Wraps a raw device allocation pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must point to a live device allocation of the context it is
    ///   subsequently used with.
    #[inline]
    pub unsafe fn new(ptr: *mut c_void) -> DevicePointer {
        DevicePointer(ptr)
    }

    /// Returns the raw pointer value.
    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

/// Properties of a device memory allocation request.
#[derive(Clone, Copy, Debug, Default)]
pub struct UsmDescriptor {
    /// Raw allocation flags passed through to the allocator.
    pub flags: u32,
    /// Minimum alignment in bytes; zero lets the allocator choose.
    pub alignment: usize,
}

/// Types that can provide linear device memory.
///
/// An implementation may pool allocations; the pool, if any, lives behind
/// the allocator object.
pub trait UsmAllocator: Send + Sync {
    /// Allocates `size` bytes of device memory on `device`.
    fn device_alloc(
        &self,
        context: &Arc<Context>,
        device: &Arc<Device>,
        desc: &UsmDescriptor,
        size: usize,
    ) -> Result<DevicePointer, RuntimeError>;

    /// Releases an allocation previously returned by `device_alloc`.
    fn device_free(
        &self,
        context: &Arc<Context>,
        ptr: DevicePointer,
    ) -> Result<(), RuntimeError>;
}

/// Allocator that forwards every request to the driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceUsmAllocator;

impl UsmAllocator for DeviceUsmAllocator {
    fn device_alloc(
        &self,
        context: &Arc<Context>,
        device: &Arc<Device>,
        desc: &UsmDescriptor,
        size: usize,
    ) -> Result<DevicePointer, RuntimeError> {
        let fns = context.fns();

        let native_desc = zero::DeviceMemAllocDesc {
            stype: zero::StructureType::DEVICE_MEM_ALLOC_DESC,
            pnext: ptr::null(),
            flags: desc.flags,
            ordinal: 0,
        };

        let mut raw = ptr::null_mut();
        check_errors(unsafe {
            (fns.mem_alloc_device)(
                context.internal_object(),
                &native_desc,
                size,
                desc.alignment,
                device.internal_object(),
                &mut raw,
            )
        })?;

        Ok(DevicePointer(raw))
    }

    fn device_free(
        &self,
        context: &Arc<Context>,
        ptr: DevicePointer,
    ) -> Result<(), RuntimeError> {
        let fns = context.fns();
        check_errors(unsafe { (fns.mem_free)(context.internal_object(), ptr.as_ptr()) })
    }
}

/// Allocates pitched linear device memory suitable to back a 2D image.
///
/// The row pitch is chosen by the driver through the
/// `zeMemGetPitchFor2dImage` extension; if the driver does not provide it,
/// the call fails with [`RuntimeError::InvalidOperation`]. Returns the
/// allocation together with the resulting row pitch in bytes.
pub fn pitched_alloc_2d(
    allocator: &dyn UsmAllocator,
    context: &Arc<Context>,
    device: &Arc<Device>,
    desc: &UsmDescriptor,
    width_in_bytes: usize,
    height: usize,
    element_size_bytes: u32,
) -> Result<(DevicePointer, usize), RuntimeError> {
    let _lock = context.mutex.read();

    let pitch_fn = context
        .platform()
        .mem_pitch_fn()
        .ok_or(RuntimeError::InvalidOperation)?;

    let width = width_in_bytes / element_size_bytes as usize;
    let mut row_pitch = 0;
    check_errors(unsafe {
        pitch_fn(
            context.internal_object(),
            device.internal_object(),
            width,
            height,
            element_size_bytes,
            &mut row_pitch,
        )
    })?;

    let size = height * row_pitch;
    let ptr = allocator.device_alloc(context, device, desc, size)?;

    Ok((ptr, row_pitch))
}

#[cfg(test)]
mod tests {
    use super::{pitched_alloc_2d, DeviceUsmAllocator, UsmAllocator, UsmDescriptor};
    use crate::RuntimeError;

    #[test]
    fn pitched_alloc_pitch_and_size() {
        let (context, device) = mock_context_and_device!();

        let (ptr, pitch) = pitched_alloc_2d(
            &DeviceUsmAllocator,
            &context,
            &device,
            &UsmDescriptor::default(),
            100 * 4,
            20,
            4,
        )
        .unwrap();

        // The mock driver aligns rows to 64 bytes.
        assert_eq!(pitch, 448);
        assert_eq!(crate::tests::device_alloc_size(ptr), Some(20 * 448));

        DeviceUsmAllocator
            .device_free(&context, ptr)
            .unwrap();
        assert_eq!(crate::tests::device_alloc_size(ptr), None);
    }

    #[test]
    fn pitched_alloc_without_extension() {
        let (context, device) = mock_context_and_device_without_extensions!();

        let result = pitched_alloc_2d(
            &DeviceUsmAllocator,
            &context,
            &device,
            &UsmDescriptor::default(),
            64,
            16,
            4,
        );

        match result {
            Err(RuntimeError::InvalidOperation) => (),
            _ => panic!(),
        }
    }
}
