// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Bindless image handles.
//!
//! A bindless handle is not a reference to an [`Image`] object: it is the
//! raw 64-bit device address of the image's storage, obtained from the
//! driver with a one-way query. Kernels use it to address the image
//! directly, without going through a bound resource slot. The [`Image`]
//! that backs the address stays reachable only through whatever owns its
//! backing memory; the handle never keeps it alive.
//!
//! A sampled-image handle is the same address paired with the raw handle of
//! a sampler, as two explicit fields.

use super::{sys, Image, ImageDescriptor};
use crate::{
    check_errors, context::Context, device::Device, format::ImageFormat, memory::DevicePointer,
    sampler::Sampler, zero, zero::Handle as _, RuntimeError, ZeroObject,
};
use std::{ptr, sync::Arc};

/// The device address of an image with bindless addressing enabled.
///
/// Plain data; forgetting it leaks nothing and destroying it releases
/// nothing.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UnsampledImageHandle(pub u64);

unsafe impl bytemuck::Zeroable for UnsampledImageHandle {}
unsafe impl bytemuck::Pod for UnsampledImageHandle {}

/// A bindless image address paired with the native handle of the sampler
/// to read it through.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SampledImageHandle {
    /// The device address of the image.
    pub image: u64,
    /// The raw native sampler handle.
    pub sampler: u64,
}

unsafe impl bytemuck::Zeroable for SampledImageHandle {}
unsafe impl bytemuck::Pod for SampledImageHandle {}

/// Memory an addressable image can be created over.
#[derive(Clone, Debug)]
pub enum ImageMemory {
    /// An opaque image allocation made by [`Image::allocate`].
    Opaque(Arc<Image>),
    /// A pitched linear device allocation, for example from
    /// [`pitched_alloc_2d`](crate::memory::pitched_alloc_2d).
    Pitched(DevicePointer),
}

/// Creates an addressable (unsampled) image over existing memory and
/// returns its device-address handle.
///
/// When the backing memory is an opaque image whose descriptor is identical
/// to the requested one, no new image is needed and the first element of
/// the result is `None`: the returned address belongs to the existing
/// image. A differing descriptor produces a view over the existing native
/// image; pitched backing memory produces a fresh image bound to the
/// pointer. In both of those cases the new [`Image`] is returned and must
/// eventually be freed by the caller.
pub fn create_unsampled_image(
    context: &Arc<Context>,
    device: &Arc<Device>,
    memory: &ImageMemory,
    format: &ImageFormat,
    descriptor: &ImageDescriptor,
) -> Result<(Option<Arc<Image>>, UnsampledImageHandle), RuntimeError> {
    let _lock = context.mutex.read();
    let fns = context.fns();

    let native_desc = sys::to_native_desc(format, descriptor)?;

    let (new_image, target) = match memory {
        ImageMemory::Opaque(existing) => {
            if sys::is_same_native_desc(existing.descriptor(), &native_desc) {
                (None, existing.internal_object())
            } else {
                let bindless_desc = zero::BindlessImageExpDesc {
                    stype: zero::StructureType::BINDLESS_IMAGE_EXP_DESC,
                    pnext: ptr::null(),
                    flags: zero::BindlessImageExpFlags::BINDLESS,
                };
                let mut create_desc = native_desc;
                create_desc.pnext = <*const zero::BindlessImageExpDesc>::cast(&bindless_desc);

                let mut handle = zero::ImageHandle::null();
                check_errors(unsafe {
                    (fns.image_view_create_ext)(
                        context.internal_object(),
                        device.internal_object(),
                        &create_desc,
                        existing.internal_object(),
                        &mut handle,
                    )
                })?;

                let view =
                    Arc::new(unsafe { Image::from_raw(context, handle, native_desc, true) });

                check_errors(unsafe {
                    (fns.context_make_image_resident)(
                        context.internal_object(),
                        device.internal_object(),
                        handle,
                    )
                })?;

                (Some(view), handle)
            }
        }
        ImageMemory::Pitched(pointer) => {
            // The pointer is expected to be a linear device allocation; an
            // opaque image cannot arrive through this variant.
            #[cfg(debug_assertions)]
            {
                let mut props = zero::MemoryAllocationProperties {
                    stype: zero::StructureType::MEMORY_ALLOCATION_PROPERTIES,
                    pnext: ptr::null_mut(),
                    ty: zero::MemoryType::UNKNOWN,
                    id: 0,
                    page_size: 0,
                };
                check_errors(unsafe {
                    (fns.mem_get_alloc_properties)(
                        context.internal_object(),
                        pointer.as_ptr(),
                        &mut props,
                        ptr::null_mut(),
                    )
                })?;
                if props.ty != zero::MemoryType::DEVICE {
                    return Err(RuntimeError::InvalidValue);
                }
            }

            let pitched_desc = zero::PitchedImageExpDesc {
                stype: zero::StructureType::PITCHED_IMAGE_EXP_DESC,
                pnext: ptr::null(),
                ptr: pointer.as_ptr(),
            };
            let bindless_desc = zero::BindlessImageExpDesc {
                stype: zero::StructureType::BINDLESS_IMAGE_EXP_DESC,
                pnext: <*const zero::PitchedImageExpDesc>::cast(&pitched_desc),
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

            let image = Arc::new(unsafe { Image::from_raw(context, handle, native_desc, true) });

            check_errors(unsafe {
                (fns.context_make_image_resident)(
                    context.internal_object(),
                    device.internal_object(),
                    handle,
                )
            })?;

            (Some(image), handle)
        }
    };

    let offset_fn = context
        .platform()
        .image_device_offset_fn()
        .ok_or(RuntimeError::InvalidOperation)?;

    let mut device_offset = 0;
    check_errors(unsafe { offset_fn(target, &mut device_offset) })?;

    Ok((new_image, UnsampledImageHandle(device_offset)))
}

/// Creates an addressable sampled image over existing memory.
///
/// Performs the unsampled flow, then pairs the resulting device address
/// with the sampler's native handle.
pub fn create_sampled_image(
    context: &Arc<Context>,
    device: &Arc<Device>,
    memory: &ImageMemory,
    format: &ImageFormat,
    descriptor: &ImageDescriptor,
    sampler: &Sampler,
) -> Result<(Option<Arc<Image>>, SampledImageHandle), RuntimeError> {
    let (new_image, unsampled) =
        create_unsampled_image(context, device, memory, format, descriptor)?;

    Ok((
        new_image,
        SampledImageHandle {
            image: unsampled.0,
            sampler: sampler.internal_object().as_raw(),
        },
    ))
}

/// Destroys an unsampled-image handle.
///
/// The handle is a raw device address with no driver-side state of its own,
/// so there is nothing to release.
pub fn destroy_unsampled_image_handle(
    _context: &Arc<Context>,
    _device: &Arc<Device>,
    _handle: UnsampledImageHandle,
) -> Result<(), RuntimeError> {
    Ok(())
}

/// Destroys a sampled-image handle.
pub fn destroy_sampled_image_handle(
    context: &Arc<Context>,
    device: &Arc<Device>,
    handle: SampledImageHandle,
) -> Result<(), RuntimeError> {
    // A sampled image is a combination of an unsampled image and a sampler.
    destroy_unsampled_image_handle(context, device, UnsampledImageHandle(handle.image))
}

/// Extracts one mipmap level of an image as an image of its own.
pub fn mipmap_level(
    _context: &Arc<Context>,
    _device: &Arc<Device>,
    _image: &Arc<Image>,
    _level: u32,
) -> Result<Arc<Image>, RuntimeError> {
    log::warn!("mipmap level extraction is not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

/// Frees an image obtained from [`mipmap_level`].
pub fn free_mipmap(
    _context: &Arc<Context>,
    _device: &Arc<Device>,
    _image: &Arc<Image>,
) -> Result<(), RuntimeError> {
    log::warn!("mipmap freeing is not implemented by this backend");
    Err(RuntimeError::UnsupportedFeature)
}

#[cfg(test)]
mod tests {
    use super::{create_sampled_image, create_unsampled_image, ImageMemory};
    use crate::format::{ChannelOrder, ChannelType, ImageFormat};
    use crate::image::{Image, ImageDescriptor, ImageKind};
    use crate::memory::{pitched_alloc_2d, DeviceUsmAllocator, UsmDescriptor};
    use crate::sampler::Sampler;
    use crate::{zero, zero::Handle as _, RuntimeError, ZeroObject};

    fn rgba8() -> ImageFormat {
        ImageFormat {
            channel_order: ChannelOrder::Rgba,
            channel_type: ChannelType::UnsignedInt8,
        }
    }

    fn desc_16x16() -> ImageDescriptor {
        ImageDescriptor {
            kind: ImageKind::Dim2d,
            width: 16,
            height: 16,
            ..Default::default()
        }
    }

    #[test]
    fn identical_descriptor_reuses_image() {
        let (context, device) = mock_context_and_device!();

        let image = Image::allocate(&context, &device, &rgba8(), &desc_16x16()).unwrap();

        let (new_image, handle) = create_unsampled_image(
            &context,
            &device,
            &ImageMemory::Opaque(image.clone()),
            &rgba8(),
            &desc_16x16(),
        )
        .unwrap();

        assert!(new_image.is_none());
        assert_eq!(
            handle.0,
            crate::tests::device_offset_of(image.internal_object()),
        );

        image.free().unwrap();
    }

    #[test]
    fn differing_descriptor_creates_view() {
        let (context, device) = mock_context_and_device!();

        let image = Image::allocate(&context, &device, &rgba8(), &desc_16x16()).unwrap();

        // Same size, reinterpreted as 32-bit single-channel pixels.
        let reinterpreted = ImageFormat {
            channel_order: ChannelOrder::R,
            channel_type: ChannelType::UnsignedInt32,
        };
        let (new_image, handle) = create_unsampled_image(
            &context,
            &device,
            &ImageMemory::Opaque(image.clone()),
            &reinterpreted,
            &desc_16x16(),
        )
        .unwrap();

        let view = new_image.expect("a view should have been created");
        assert_ne!(view.internal_object(), image.internal_object());
        assert_eq!(handle.0, crate::tests::device_offset_of(view.internal_object()));

        let record = crate::tests::image_record(view.internal_object()).unwrap();
        assert_eq!(record.view_of, Some(image.internal_object().as_raw()));
        assert!(record.bindless);
        assert!(record.resident);

        view.free().unwrap();
        image.free().unwrap();
    }

    #[test]
    fn pitched_memory_creates_bound_image() {
        let (context, device) = mock_context_and_device!();

        let (pointer, row_pitch) = pitched_alloc_2d(
            &DeviceUsmAllocator,
            &context,
            &device,
            &UsmDescriptor::default(),
            16 * 4,
            16,
            4,
        )
        .unwrap();

        let descriptor = ImageDescriptor {
            row_pitch: row_pitch as u64,
            ..desc_16x16()
        };
        let (new_image, handle) = create_unsampled_image(
            &context,
            &device,
            &ImageMemory::Pitched(pointer),
            &rgba8(),
            &descriptor,
        )
        .unwrap();

        let image = new_image.expect("an image should have been created");
        assert_ne!(handle.0, 0);

        let record = crate::tests::image_record(image.internal_object()).unwrap();
        assert_eq!(record.pitched_ptr, Some(pointer.as_ptr() as usize));
        assert!(record.bindless);

        image.free().unwrap();
    }

    #[test]
    fn sampled_handle_packs_both_values() {
        let (context, device) = mock_context_and_device!();

        let image = Image::allocate(&context, &device, &rgba8(), &desc_16x16()).unwrap();
        let sampler = unsafe {
            Sampler::from_handle(&context, zero::SamplerHandle::from_raw(0x5a5a))
        };

        let (new_image, handle) = create_sampled_image(
            &context,
            &device,
            &ImageMemory::Opaque(image.clone()),
            &rgba8(),
            &desc_16x16(),
            &sampler,
        )
        .unwrap();

        assert!(new_image.is_none());
        assert_eq!(
            handle.image,
            crate::tests::device_offset_of(image.internal_object()),
        );
        assert_eq!(handle.sampler, 0x5a5a);

        image.free().unwrap();
    }

    #[test]
    fn device_offset_needs_the_extension() {
        let (context, device) = mock_context_and_device_without_extensions!();

        let image = Image::allocate(&context, &device, &rgba8(), &desc_16x16()).unwrap();

        let result = create_unsampled_image(
            &context,
            &device,
            &ImageMemory::Opaque(image.clone()),
            &rgba8(),
            &desc_16x16(),
        );

        match result {
            Err(RuntimeError::InvalidOperation) => (),
            _ => panic!(),
        }

        image.free().unwrap();
    }

    #[test]
    fn mipmap_surface_is_unsupported() {
        let (context, device) = mock_context_and_device!();

        let image = Image::allocate(&context, &device, &rgba8(), &desc_16x16()).unwrap();

        match super::mipmap_level(&context, &device, &image, 1) {
            Err(RuntimeError::UnsupportedFeature) => (),
            _ => panic!(),
        }
        match super::free_mipmap(&context, &device, &image) {
            Err(RuntimeError::UnsupportedFeature) => (),
            _ => panic!(),
        }

        image.free().unwrap();
    }
}
