// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Device-resident images.
//!
//! An [`Image`] owns an opaque native image allocation. It is created
//! through [`Image::allocate`] (or as a view by
//! [`create_unsampled_image`]), stays resident on its device for its whole
//! lifetime, and is released through explicit, reference-counted
//! [`Image::free`] calls.
//!
//! The stored native descriptor makes the image introspectable
//! ([`Image::info`]) and lets view creation detect when a requested
//! reinterpretation is identical to the existing image.

pub use self::bindless::{
    create_sampled_image, create_unsampled_image, destroy_sampled_image_handle,
    destroy_unsampled_image_handle, free_mipmap, mipmap_level, ImageMemory, SampledImageHandle,
    UnsampledImageHandle,
};
pub use self::copy::{copy_image, CopyMemory, ImageCopyFlags};
pub use self::interop::{
    destroy_external_semaphore, import_external_memory, import_external_semaphore,
    map_external_array, release_external_memory, signal_external_semaphore,
    wait_external_semaphore, ExternalMemoryDescriptor, ExternalMemoryHandle,
    ExternalSemaphoreDescriptor, ExternalSemaphoreHandle,
};
use crate::{
    check_errors, context::Context, device::Device, format::ImageFormat, zero, RuntimeError,
    ZeroObject,
};
use std::{
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
    sync::Arc,
};

mod bindless;
mod copy;
mod interop;
pub(crate) mod sys;

/// The dimensionality of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// One-dimensional.
    Dim1d,
    /// An array of one-dimensional images.
    Dim1dArray,
    /// Two-dimensional.
    Dim2d,
    /// An array of two-dimensional images.
    Dim2dArray,
    /// Three-dimensional.
    Dim3d,
    /// One-dimensional, backed by a buffer. Recognized but not supported by
    /// this backend.
    Dim1dBuffer,
}

/// A generic image description, as supplied by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// The dimensionality of the image.
    ///
    /// The default value is [`ImageKind::Dim2d`].
    pub kind: ImageKind,

    /// The width in pixels.
    ///
    /// The default value is `0`, which must be overridden.
    pub width: u64,

    /// The height in pixels. Ignored (and allowed to be zero) for image
    /// kinds without a vertical axis.
    ///
    /// The default value is `0`.
    pub height: u64,

    /// The depth in pixels. Ignored for image kinds without a depth axis.
    ///
    /// The default value is `0`.
    pub depth: u64,

    /// The number of array slices, for the array kinds. Zero is legal.
    ///
    /// The default value is `0`.
    pub array_size: u64,

    /// The number of mipmap levels. Zero is legal.
    ///
    /// The default value is `0`.
    pub mip_levels: u32,

    /// The row stride in bytes of the backing memory. Zero means the image
    /// is an opaque, vendor-tiled allocation; a nonzero value means the
    /// image lives in pitched linear memory with this stride.
    ///
    /// The default value is `0`.
    pub row_pitch: u64,
}

impl Default for ImageDescriptor {
    #[inline]
    fn default() -> Self {
        ImageDescriptor {
            kind: ImageKind::Dim2d,
            width: 0,
            height: 0,
            depth: 0,
            array_size: 0,
            mip_levels: 0,
            row_pitch: 0,
        }
    }
}

/// An offset into an image or a host region, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RectOffset {
    pub x: u64,
    pub y: u64,
    pub z: u64,
}

/// The extent of a rectangular region, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RectRegion {
    pub width: u64,
    pub height: u64,
    pub depth: u64,
}

/// The queryable properties of an [`Image`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageInfo {
    Width,
    Height,
    Depth,
    Format,
}

/// The value of one [`ImageInfo`] property.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageInfoValue {
    Width(u64),
    Height(u32),
    Depth(u32),
    Format(ImageFormat),
}

/// A device-resident image allocation.
///
/// The native handle is released when the reference count, manipulated
/// through [`Image::retain`] and [`Image::free`], reaches zero.
pub struct Image {
    context: Arc<Context>,
    handle: zero::ImageHandle,

    // Kept for introspection and descriptor-identity checks. Its extension
    // chain is always empty.
    desc: zero::ImageDesc,

    owned: bool,
    refcount: AtomicU32,
    destroyed: AtomicBool,
}

// The stored descriptor's `pnext` is always null.
unsafe impl Send for Image {}
unsafe impl Sync for Image {}

impl Image {
    /// Allocates a fresh opaque image on `device` and makes it resident.
    ///
    /// The image is created with bindless addressing enabled, so a
    /// device-address handle can later be derived from it with
    /// [`create_unsampled_image`].
    pub fn allocate(
        context: &Arc<Context>,
        device: &Arc<Device>,
        format: &ImageFormat,
        descriptor: &ImageDescriptor,
    ) -> Result<Arc<Image>, RuntimeError> {
        use crate::zero::Handle as _;

        let _lock = context.mutex.read();
        let fns = context.fns();

        let native_desc = sys::to_native_desc(format, descriptor)?;

        let bindless_desc = zero::BindlessImageExpDesc {
            stype: zero::StructureType::BINDLESS_IMAGE_EXP_DESC,
            pnext: std::ptr::null(),
            flags: zero::BindlessImageExpFlags::BINDLESS,
        };
        let mut create_desc = native_desc;
        create_desc.pnext = <*const zero::BindlessImageExpDesc>::cast(&bindless_desc);

        let mut handle = zero::ImageHandle::null();
        check_errors(unsafe {
            (fns.image_create)(
                context.internal_object(),
                device.internal_object(),
                &create_desc,
                &mut handle,
            )
        })?;

        // Wrap the native handle before doing anything else with it, so
        // that every failure from here on releases it instead of leaking.
        let image = Arc::new(unsafe { Image::from_raw(context, handle, native_desc, true) });

        check_errors(unsafe {
            (fns.context_make_image_resident)(
                context.internal_object(),
                device.internal_object(),
                handle,
            )
        })?;

        Ok(image)
    }

    /// Wraps an already created native image.
    ///
    /// # Safety
    ///
    /// - `handle` must be a valid image of `context`.
    /// - `desc` must be the descriptor the image was created from, with an
    ///   empty extension chain.
    /// - If `owned` is true, ownership of the handle is transferred.
    pub(crate) unsafe fn from_raw(
        context: &Arc<Context>,
        handle: zero::ImageHandle,
        desc: zero::ImageDesc,
        owned: bool,
    ) -> Image {
        debug_assert!(desc.pnext.is_null());

        Image {
            context: context.clone(),
            handle,
            desc,
            owned,
            refcount: AtomicU32::new(1),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Returns the context the image belongs to.
    #[inline]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Increments the reference count of the image.
    pub fn retain(&self) {
        let _lock = self.context.mutex.read();
        self.refcount.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the reference count, releasing the native image when it
    /// reaches zero.
    ///
    /// Freeing while references remain is a successful no-op. The driver
    /// having already been unloaded during process teardown also counts as
    /// success.
    pub fn free(&self) -> Result<(), RuntimeError> {
        let _lock = self.context.mutex.read();

        if self.destroyed.load(Ordering::Acquire) {
            return Ok(());
        }

        if self.refcount.fetch_sub(1, Ordering::AcqRel) != 1 {
            return Ok(());
        }

        self.destroy_handle()
    }

    fn destroy_handle(&self) -> Result<(), RuntimeError> {
        if self.destroyed.swap(true, Ordering::AcqRel) || !self.owned {
            return Ok(());
        }

        let fns = self.context.fns();
        let result = unsafe { (fns.image_destroy)(self.handle) };

        if result == zero::Result::SUCCESS || result == zero::Result::ERROR_UNINITIALIZED {
            Ok(())
        } else {
            Err(RuntimeError::from(result))
        }
    }

    /// Returns the width of the image in pixels.
    #[inline]
    pub fn width(&self) -> u64 {
        self.desc.width
    }

    /// Returns the height of the image in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// Returns the depth of the image in pixels.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.desc.depth
    }

    /// Recovers the generic format of the image from its stored native
    /// descriptor.
    pub fn format(&self) -> Result<ImageFormat, RuntimeError> {
        ImageFormat::from_native(&self.desc.format)
    }

    /// Queries one property of the image.
    pub fn info(&self, info: ImageInfo) -> Result<ImageInfoValue, RuntimeError> {
        match info {
            ImageInfo::Width => Ok(ImageInfoValue::Width(self.width())),
            ImageInfo::Height => Ok(ImageInfoValue::Height(self.height())),
            ImageInfo::Depth => Ok(ImageInfoValue::Depth(self.depth())),
            ImageInfo::Format => Ok(ImageInfoValue::Format(self.format()?)),
        }
    }

    #[inline]
    pub(crate) fn descriptor(&self) -> &zero::ImageDesc {
        &self.desc
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        // Backstop for images that were never explicitly freed; errors
        // cannot be reported from here.
        let _ = self.destroy_handle();
    }
}

unsafe impl ZeroObject for Image {
    type Handle = zero::ImageHandle;

    #[inline]
    fn internal_object(&self) -> zero::ImageHandle {
        self.handle
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("handle", &self.handle)
            .field("desc", &self.desc)
            .field("owned", &self.owned)
            .finish_non_exhaustive()
    }
}
