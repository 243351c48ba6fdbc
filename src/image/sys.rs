// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Low-level descriptor translation.
//!
//! This module turns the generic image description into the driver's
//! descriptor and region structures. The callers (allocation, view
//! creation, the copy engine) chain their own extension structures onto the
//! translated descriptor afterwards; nothing here appends extensions.

use super::{ImageDescriptor, ImageKind, RectOffset, RectRegion};
use crate::{format::ImageFormat, zero, RuntimeError};
use std::{cmp, ptr};

/// Builds the native image descriptor for a generic format + descriptor
/// pair.
///
/// The height and depth of the native descriptor are never zero, whatever
/// the input says: the driver requires nonzero extents for the
/// lower-dimensional image types. The returned descriptor has an empty
/// extension chain.
pub(crate) fn to_native_desc(
    format: &ImageFormat,
    desc: &ImageDescriptor,
) -> Result<zero::ImageDesc, RuntimeError> {
    let native_format = format.to_native()?;

    let ty = match desc.kind {
        ImageKind::Dim1d => zero::ImageType::TYPE_1D,
        ImageKind::Dim1dArray => zero::ImageType::TYPE_1DARRAY,
        ImageKind::Dim2d => zero::ImageType::TYPE_2D,
        ImageKind::Dim2dArray => zero::ImageType::TYPE_2DARRAY,
        ImageKind::Dim3d => zero::ImageType::TYPE_3D,
        ImageKind::Dim1dBuffer => {
            log::debug!("image kind {:?} has no native image type", desc.kind);
            return Err(RuntimeError::InvalidValue);
        }
    };

    Ok(zero::ImageDesc {
        stype: zero::StructureType::IMAGE_DESC,
        pnext: ptr::null(),
        flags: zero::ImageFlags::empty(),
        ty,
        format: native_format,
        width: desc.width,
        height: cmp::max(desc.height, 1) as u32,
        depth: cmp::max(desc.depth, 1) as u32,
        array_levels: desc.array_size as u32,
        mip_levels: desc.mip_levels,
    })
}

/// Returns whether two native image descriptors describe the same image.
///
/// Every structural field takes part, including the identity of the
/// extension chain pointer; the chain's contents are not followed.
pub(crate) fn is_same_native_desc(a: &zero::ImageDesc, b: &zero::ImageDesc) -> bool {
    a.stype == b.stype
        && a.flags == b.flags
        && a.pnext == b.pnext
        && a.ty == b.ty
        && a.format == b.format
        && a.width == b.width
        && a.height == b.height
        && a.depth == b.depth
        && a.array_levels == b.array_levels
        && a.mip_levels == b.mip_levels
}

/// Builds the native region for a copy against an opaque image.
///
/// Axes that the image type does not use are forced to their defaults
/// (height and depth 1). In debug builds the origin and region are
/// additionally validated against the image type; a region that uses an
/// axis the image does not have fails with
/// [`RuntimeError::InvalidValue`].
pub(crate) fn image_region(
    desc: &zero::ImageDesc,
    origin: &RectOffset,
    region: &RectRegion,
) -> Result<zero::ImageRegion, RuntimeError> {
    let mut region = *region;

    if desc.ty == zero::ImageType::TYPE_1D {
        region.height = 1;
        region.depth = 1;
    } else if desc.ty == zero::ImageType::TYPE_2D || desc.ty == zero::ImageType::TYPE_1DARRAY {
        region.depth = 1;
    }

    #[cfg(debug_assertions)]
    {
        let origin_ok = match desc.ty {
            zero::ImageType::TYPE_1D => origin.y == 0 && origin.z == 0,
            zero::ImageType::TYPE_1DARRAY | zero::ImageType::TYPE_2D => origin.z == 0,
            _ => true,
        };
        if !origin_ok {
            return Err(RuntimeError::InvalidValue);
        }

        if region.width == 0 || region.height == 0 || region.depth == 0 {
            return Err(RuntimeError::InvalidValue);
        }

        let region_ok = match desc.ty {
            zero::ImageType::TYPE_1D => region.height == 1 && region.depth == 1,
            zero::ImageType::TYPE_1DARRAY | zero::ImageType::TYPE_2D => region.depth == 1,
            _ => true,
        };
        if !region_ok {
            return Err(RuntimeError::InvalidValue);
        }
    }

    Ok(zero::ImageRegion {
        origin_x: origin.x as u32,
        origin_y: origin.y as u32,
        origin_z: origin.z as u32,
        width: region.width as u32,
        height: region.height as u32,
        depth: region.depth as u32,
    })
}
