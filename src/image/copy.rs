// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Host/device image region copies.
//!
//! A copy has two independent axes: the direction (host to device or device
//! to host) and the shape of the device-side memory. Opaque images take an
//! image-region copy against their native handle; pitched linear images
//! take a flat region copy with explicit row pitches. The shape is selected
//! by the descriptor's `row_pitch` field, exactly as at image creation
//! time.
//!
//! [`copy_image`] only records and submits; completion is observed through
//! the returned [`Event`].

use super::{sys, Image, ImageDescriptor, RectOffset, RectRegion};
use crate::{
    check_errors, format::ImageFormat, queue::Queue, sync::{CommandKind, Event, WaitList},
    zero, RuntimeError, ZeroObject,
};
use std::{os::raw::c_void, ptr, sync::Arc};

/// Direction flags for an image copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageCopyFlags(pub u32);

impl ImageCopyFlags {
    /// Copy from host memory to device memory.
    pub const HOST_TO_DEVICE: Self = Self(1 << 0);
    /// Copy from device memory to host memory.
    pub const DEVICE_TO_HOST: Self = Self(1 << 1);
    /// Copy between two device allocations. Not supported by this backend.
    pub const DEVICE_TO_DEVICE: Self = Self(1 << 2);
}

/// One side of a copy operation.
#[derive(Clone, Debug)]
pub enum CopyMemory<'a> {
    /// An opaque image allocation.
    Image(&'a Arc<Image>),
    /// Pitched linear device memory.
    Device(crate::memory::DevicePointer),
    /// Host memory.
    Host(*mut c_void),
}

impl CopyMemory<'_> {
    fn image(&self) -> Result<&Arc<Image>, RuntimeError> {
        match self {
            CopyMemory::Image(image) => Ok(image),
            _ => Err(RuntimeError::InvalidValue),
        }
    }

    // The pitched shapes address both sides as flat pointers.
    fn raw_ptr(&self) -> Result<*mut c_void, RuntimeError> {
        match self {
            CopyMemory::Device(pointer) => Ok(pointer.as_ptr()),
            CopyMemory::Host(pointer) => Ok(*pointer),
            CopyMemory::Image(_) => Err(RuntimeError::InvalidValue),
        }
    }

    fn host_ptr(&self) -> Result<*mut c_void, RuntimeError> {
        match self {
            CopyMemory::Host(pointer) => Ok(*pointer),
            _ => Err(RuntimeError::InvalidValue),
        }
    }
}

/// The native command a copy request resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CopyPlan {
    /// Host to device, into an opaque image.
    ImageFromMemory { dst_region: zero::ImageRegion },
    /// Device to host, out of an opaque image.
    ImageToMemory { src_region: zero::ImageRegion },
    /// Either direction, between linear buffers with explicit pitches.
    MemoryRegion {
        dst_region: zero::CopyRegion,
        dst_pitch: u32,
        dst_slice_pitch: u32,
        src_region: zero::CopyRegion,
        src_pitch: u32,
        src_slice_pitch: u32,
    },
}

/// Computes the regions and pitches for one copy request.
///
/// Only 2D pitches are modeled; slice pitches are always zero.
pub(crate) fn copy_plan(
    flags: ImageCopyFlags,
    native_desc: &zero::ImageDesc,
    format: &ImageFormat,
    row_pitch: u64,
    src_offset: &RectOffset,
    dst_offset: &RectOffset,
    copy_extent: &RectRegion,
    host_extent: &RectRegion,
) -> Result<CopyPlan, RuntimeError> {
    if flags == ImageCopyFlags::HOST_TO_DEVICE {
        if row_pitch == 0 {
            let dst_region = sys::image_region(native_desc, dst_offset, copy_extent)?;
            Ok(CopyPlan::ImageFromMemory { dst_region })
        } else {
            let dst_pitch = row_pitch as u32;
            let src_pitch = host_extent.width as u32 * format.pixel_size();

            Ok(CopyPlan::MemoryRegion {
                dst_region: zero::CopyRegion {
                    origin_x: dst_offset.x as u32,
                    origin_y: dst_offset.y as u32,
                    origin_z: dst_offset.z as u32,
                    width: dst_pitch,
                    height: copy_extent.height as u32,
                    depth: copy_extent.depth as u32,
                },
                dst_pitch,
                dst_slice_pitch: 0,
                src_region: zero::CopyRegion {
                    origin_x: src_offset.x as u32,
                    origin_y: src_offset.y as u32,
                    origin_z: src_offset.z as u32,
                    width: src_pitch,
                    height: copy_extent.height as u32,
                    depth: copy_extent.depth as u32,
                },
                src_pitch,
                src_slice_pitch: 0,
            })
        }
    } else if flags == ImageCopyFlags::DEVICE_TO_HOST {
        if row_pitch == 0 {
            let src_region = sys::image_region(native_desc, src_offset, copy_extent)?;
            Ok(CopyPlan::ImageToMemory { src_region })
        } else {
            let dst_pitch = copy_extent.width as u32 * format.pixel_size();
            let src_pitch = row_pitch as u32;

            Ok(CopyPlan::MemoryRegion {
                dst_region: zero::CopyRegion {
                    origin_x: dst_offset.x as u32,
                    origin_y: dst_offset.y as u32,
                    origin_z: dst_offset.z as u32,
                    width: dst_pitch,
                    height: copy_extent.height as u32,
                    depth: copy_extent.depth as u32,
                },
                dst_pitch,
                dst_slice_pitch: 0,
                src_region: zero::CopyRegion {
                    origin_x: src_offset.x as u32,
                    origin_y: src_offset.y as u32,
                    origin_z: src_offset.z as u32,
                    width: src_pitch,
                    height: copy_extent.height as u32,
                    depth: copy_extent.depth as u32,
                },
                src_pitch,
                src_slice_pitch: 0,
            })
        }
    } else {
        log::debug!("unexpected image copy flags {:?}", flags);
        Err(RuntimeError::UnsupportedFeature)
    }
}

/// Enqueues an image region copy on the queue.
///
/// The copy is appended to a command list together with the given wait
/// events and submitted without blocking; the returned [`Event`] signals
/// its completion.
///
/// # Safety
///
/// - Host pointers in `dst`/`src` must stay valid, and host destination
///   memory must not be read, until the returned event has signaled.
/// - Device pointers must belong to live allocations of the queue's
///   context.
pub unsafe fn copy_image(
    queue: &Arc<Queue>,
    dst: CopyMemory<'_>,
    src: CopyMemory<'_>,
    format: &ImageFormat,
    descriptor: &ImageDescriptor,
    flags: ImageCopyFlags,
    src_offset: RectOffset,
    dst_offset: RectOffset,
    copy_extent: RectRegion,
    host_extent: RectRegion,
    wait_events: &[Arc<Event>],
) -> Result<Arc<Event>, RuntimeError> {
    let _lock = queue.mutex.lock();

    let native_desc = sys::to_native_desc(format, descriptor)?;

    let use_copy_engine = queue.use_copy_engine(true);
    let blocking = false;
    // Batching avoids extra submissions, which are costly.
    let ok_to_batch = true;

    let command_list = queue.acquire_command_list(use_copy_engine, ok_to_batch)?;

    let event = Event::new(queue, CommandKind::MemImageCopy, &command_list, false, false)?;
    event.set_wait_list(WaitList::new(wait_events));

    let wait_list = event.wait_list();
    let wait_handles = wait_list.raw_handles();
    let wait_ptr = if wait_handles.is_empty() {
        ptr::null()
    } else {
        wait_handles.as_ptr()
    };

    let fns = queue.context().fns();

    match copy_plan(
        flags,
        &native_desc,
        format,
        descriptor.row_pitch,
        &src_offset,
        &dst_offset,
        &copy_extent,
        &host_extent,
    )? {
        CopyPlan::ImageFromMemory { dst_region } => {
            let image = dst.image()?;
            check_errors(unsafe {
                (fns.command_list_append_image_copy_from_memory)(
                    command_list.internal_object(),
                    image.internal_object(),
                    src.host_ptr()?.cast_const(),
                    &dst_region,
                    event.internal_object(),
                    wait_handles.len() as u32,
                    wait_ptr,
                )
            })?;
        }
        CopyPlan::ImageToMemory { src_region } => {
            let image = src.image()?;
            check_errors(unsafe {
                (fns.command_list_append_image_copy_to_memory)(
                    command_list.internal_object(),
                    dst.host_ptr()?,
                    image.internal_object(),
                    &src_region,
                    event.internal_object(),
                    wait_handles.len() as u32,
                    wait_ptr,
                )
            })?;
        }
        CopyPlan::MemoryRegion {
            dst_region,
            dst_pitch,
            dst_slice_pitch,
            src_region,
            src_pitch,
            src_slice_pitch,
        } => {
            check_errors(unsafe {
                (fns.command_list_append_memory_copy_region)(
                    command_list.internal_object(),
                    dst.raw_ptr()?,
                    &dst_region,
                    dst_pitch,
                    dst_slice_pitch,
                    src.raw_ptr()?.cast_const(),
                    &src_region,
                    src_pitch,
                    src_slice_pitch,
                    event.internal_object(),
                    wait_handles.len() as u32,
                    wait_ptr,
                )
            })?;
        }
    }

    queue.execute_command_list(command_list, blocking, ok_to_batch)?;

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::{copy_image, copy_plan, CopyMemory, CopyPlan, ImageCopyFlags};
    use crate::format::{ChannelOrder, ChannelType, ImageFormat};
    use crate::image::{sys, Image, ImageDescriptor, ImageKind, RectOffset, RectRegion};
    use crate::memory::{pitched_alloc_2d, DeviceUsmAllocator, UsmAllocator, UsmDescriptor};
    use crate::queue::Queue;
    use crate::tests::MockCommand;
    use crate::{zero, zero::Handle as _, RuntimeError, ZeroObject};
    use std::os::raw::c_void;

    fn rgba8() -> ImageFormat {
        ImageFormat {
            channel_order: ChannelOrder::Rgba,
            channel_type: ChannelType::UnsignedInt8,
        }
    }

    fn desc_2d(width: u64, height: u64, row_pitch: u64) -> ImageDescriptor {
        ImageDescriptor {
            kind: ImageKind::Dim2d,
            width,
            height,
            row_pitch,
            ..Default::default()
        }
    }

    #[test]
    fn zero_row_pitch_selects_the_image_copy() {
        let descriptor = desc_2d(16, 16, 0);
        let native = sys::to_native_desc(&rgba8(), &descriptor).unwrap();

        let plan = copy_plan(
            ImageCopyFlags::HOST_TO_DEVICE,
            &native,
            &rgba8(),
            descriptor.row_pitch,
            &RectOffset::default(),
            &RectOffset::default(),
            &RectRegion {
                width: 16,
                height: 16,
                depth: 1,
            },
            &RectRegion {
                width: 16,
                height: 16,
                depth: 1,
            },
        )
        .unwrap();

        match plan {
            CopyPlan::ImageFromMemory { dst_region } => {
                assert_eq!(dst_region.width, 16);
                assert_eq!(dst_region.height, 16);
                assert_eq!(dst_region.depth, 1);
            }
            _ => panic!("expected an image copy, got {:?}", plan),
        }
    }

    #[test]
    fn nonzero_row_pitch_selects_the_pitched_copy() {
        let descriptor = desc_2d(16, 16, 64);
        let native = sys::to_native_desc(&rgba8(), &descriptor).unwrap();

        let plan = copy_plan(
            ImageCopyFlags::HOST_TO_DEVICE,
            &native,
            &rgba8(),
            descriptor.row_pitch,
            &RectOffset::default(),
            &RectOffset::default(),
            &RectRegion {
                width: 16,
                height: 16,
                depth: 1,
            },
            &RectRegion {
                width: 16,
                height: 16,
                depth: 1,
            },
        )
        .unwrap();

        match plan {
            CopyPlan::MemoryRegion {
                dst_pitch,
                dst_slice_pitch,
                src_pitch,
                src_slice_pitch,
                ..
            } => {
                // The destination pitch is exactly the descriptor's row
                // pitch; the source pitch covers one host row.
                assert_eq!(dst_pitch, 64);
                assert_eq!(src_pitch, 16 * 4);
                assert_eq!(dst_slice_pitch, 0);
                assert_eq!(src_slice_pitch, 0);
            }
            _ => panic!("expected a pitched copy, got {:?}", plan),
        }
    }

    #[test]
    fn download_swaps_the_pitch_roles() {
        let descriptor = desc_2d(16, 16, 128);
        let native = sys::to_native_desc(&rgba8(), &descriptor).unwrap();

        let plan = copy_plan(
            ImageCopyFlags::DEVICE_TO_HOST,
            &native,
            &rgba8(),
            descriptor.row_pitch,
            &RectOffset::default(),
            &RectOffset::default(),
            &RectRegion {
                width: 8,
                height: 16,
                depth: 1,
            },
            &RectRegion {
                width: 8,
                height: 16,
                depth: 1,
            },
        )
        .unwrap();

        match plan {
            CopyPlan::MemoryRegion {
                dst_pitch,
                src_pitch,
                ..
            } => {
                assert_eq!(dst_pitch, 8 * 4);
                assert_eq!(src_pitch, 128);
            }
            _ => panic!("expected a pitched copy, got {:?}", plan),
        }
    }

    #[test]
    fn unknown_direction_is_unsupported() {
        let descriptor = desc_2d(16, 16, 0);
        let native = sys::to_native_desc(&rgba8(), &descriptor).unwrap();

        let result = copy_plan(
            ImageCopyFlags::DEVICE_TO_DEVICE,
            &native,
            &rgba8(),
            descriptor.row_pitch,
            &RectOffset::default(),
            &RectOffset::default(),
            &RectRegion {
                width: 16,
                height: 16,
                depth: 1,
            },
            &RectRegion {
                width: 16,
                height: 16,
                depth: 1,
            },
        );

        assert_eq!(result, Err(RuntimeError::UnsupportedFeature));
    }

    #[test]
    fn upload_to_opaque_image_is_recorded_and_submitted() {
        let (context, device) = mock_context_and_device!();
        let queue = Queue::new(&context, &device, 0, Some(1)).unwrap();

        let descriptor = desc_2d(16, 16, 0);
        let image = Image::allocate(&context, &device, &rgba8(), &descriptor).unwrap();

        let mut pixels = vec![0u8; 16 * 16 * 4];
        let event = unsafe {
            copy_image(
                &queue,
                CopyMemory::Image(&image),
                CopyMemory::Host(pixels.as_mut_ptr().cast::<c_void>()),
                &rgba8(),
                &descriptor,
                ImageCopyFlags::HOST_TO_DEVICE,
                RectOffset::default(),
                RectOffset::default(),
                RectRegion {
                    width: 16,
                    height: 16,
                    depth: 1,
                },
                RectRegion {
                    width: 16,
                    height: 16,
                    depth: 1,
                },
                &[],
            )
        }
        .unwrap();

        let commands = crate::tests::recorded_commands();
        let appended = commands
            .iter()
            .find_map(|command| match command {
                MockCommand::ImageCopyFromMemory {
                    list,
                    image: target,
                    region,
                    ..
                } => Some((*list, *target, *region)),
                _ => None,
            })
            .expect("no image upload recorded");

        assert_eq!(appended.1, image.internal_object().as_raw());
        assert_eq!(
            appended.2,
            zero::ImageRegion {
                origin_x: 0,
                origin_y: 0,
                origin_z: 0,
                width: 16,
                height: 16,
                depth: 1,
            },
        );
        assert!(commands
            .iter()
            .any(|command| matches!(command, MockCommand::Executed { list } if *list == appended.0)));

        drop(event);
        image.free().unwrap();
    }

    #[test]
    fn upload_to_pitched_memory_uses_the_region_copy() {
        let (context, device) = mock_context_and_device!();
        let queue = Queue::new(&context, &device, 0, None).unwrap();

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

        let descriptor = desc_2d(16, 16, row_pitch as u64);
        let mut pixels = vec![0u8; 16 * 16 * 4];

        let _event = unsafe {
            copy_image(
                &queue,
                CopyMemory::Device(pointer),
                CopyMemory::Host(pixels.as_mut_ptr().cast::<c_void>()),
                &rgba8(),
                &descriptor,
                ImageCopyFlags::HOST_TO_DEVICE,
                RectOffset::default(),
                RectOffset::default(),
                RectRegion {
                    width: 16,
                    height: 16,
                    depth: 1,
                },
                RectRegion {
                    width: 16,
                    height: 16,
                    depth: 1,
                },
                &[],
            )
        }
        .unwrap();

        let commands = crate::tests::recorded_commands();
        let (dst_pitch, src_pitch) = commands
            .iter()
            .find_map(|command| match command {
                MockCommand::MemoryCopyRegion {
                    dst_pitch,
                    src_pitch,
                    ..
                } => Some((*dst_pitch, *src_pitch)),
                _ => None,
            })
            .expect("no pitched copy recorded");

        assert_eq!(dst_pitch, row_pitch as u32);
        assert_eq!(src_pitch, 16 * 4);

        DeviceUsmAllocator.device_free(&context, pointer).unwrap();
    }

    #[test]
    fn mismatched_memory_kind_is_rejected() {
        let (context, device) = mock_context_and_device!();
        let queue = Queue::new(&context, &device, 0, None).unwrap();

        let descriptor = desc_2d(16, 16, 0);
        let image = Image::allocate(&context, &device, &rgba8(), &descriptor).unwrap();

        // Opaque shape selected, but the destination is not an image.
        let mut pixels = vec![0u8; 16 * 16 * 4];
        let result = unsafe {
            copy_image(
                &queue,
                CopyMemory::Host(pixels.as_mut_ptr().cast::<c_void>()),
                CopyMemory::Host(pixels.as_mut_ptr().cast::<c_void>()),
                &rgba8(),
                &descriptor,
                ImageCopyFlags::HOST_TO_DEVICE,
                RectOffset::default(),
                RectOffset::default(),
                RectRegion {
                    width: 16,
                    height: 16,
                    depth: 1,
                },
                RectRegion {
                    width: 16,
                    height: 16,
                    depth: 1,
                },
                &[],
            )
        };

        assert_eq!(result.err(), Some(RuntimeError::InvalidValue));
        image.free().unwrap();
    }
}
