// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Safe Rust wrapper around the Level Zero bindless-image and copy API.
//!
//! # Brief summary
//!
//! - The [`ZeroLibrary`](crate::ZeroLibrary) represents a Level Zero loader
//!   library on the system. It must be loaded before anything else can
//!   happen.
//!
//! - A [`Platform`](crate::platform::Platform) is a driver reported by the
//!   library. Optional driver extension entry points (the bindless
//!   device-offset query and the 2D pitch query) are resolved lazily, once
//!   per platform.
//!
//! - A [`Device`](crate::device::Device) is an accelerator exposed by a
//!   platform, and a [`Context`](crate::context::Context) is the container
//!   that allocations and images are created in.
//!
//! - [`Image`](crate::image::Image) is an opaque, device-resident image
//!   allocation described by an [`ImageFormat`](crate::format::ImageFormat)
//!   and an [`ImageDescriptor`](crate::image::ImageDescriptor). Images can
//!   additionally be exposed through *bindless* handles — raw 64-bit device
//!   addresses — via [`create_unsampled_image`](crate::image::create_unsampled_image)
//!   and [`create_sampled_image`](crate::image::create_sampled_image).
//!
//! - Host/device transfers are scheduled with
//!   [`copy_image`](crate::image::copy_image) against a
//!   [`Queue`](crate::queue::Queue). The copy engine only enqueues; it never
//!   blocks on completion.

pub use half;
pub use library::ZeroLibrary;
use std::{error::Error, fmt};

pub mod command_buffer;
pub mod context;
pub mod device;
pub mod format;
pub mod image;
pub mod library;
pub mod memory;
pub mod platform;
pub mod queue;
pub mod sampler;
pub mod sync;
pub mod zero;

/// Gives access to the raw handle of a wrapped driver object.
pub unsafe trait ZeroObject {
    /// The raw handle type of the object.
    type Handle: zero::Handle;

    /// Returns the raw handle of the object.
    fn internal_object(&self) -> Self::Handle;
}

/// Error type returned by the operations of this crate.
///
/// Driver failures are forwarded verbatim; the remaining variants are
/// produced by the crate's own validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    /// A supplied value (format, descriptor, region or flag combination) is
    /// malformed or has no native representation.
    InvalidValue,
    /// The operation is recognized but not implemented by this backend.
    UnsupportedFeature,
    /// A required optional driver capability is absent.
    InvalidOperation,
    /// A host memory allocation has failed.
    OutOfHostMemory,
    /// A device memory allocation has failed.
    OutOfDeviceMemory,
    /// The device has been lost.
    DeviceLost,
    /// The driver is not initialized, or has already been torn down.
    Uninitialized,
    /// The driver reported an unknown failure.
    Unknown,
    /// A driver result code without a dedicated variant.
    Unnamed(i32),
}

impl Error for RuntimeError {}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::InvalidValue => {
                write!(f, "a supplied value has no native representation")
            }
            RuntimeError::UnsupportedFeature => {
                write!(f, "the operation is not implemented by this backend")
            }
            RuntimeError::InvalidOperation => {
                write!(f, "a required driver capability is absent")
            }
            RuntimeError::OutOfHostMemory => {
                write!(f, "a host memory allocation has failed")
            }
            RuntimeError::OutOfDeviceMemory => {
                write!(f, "a device memory allocation has failed")
            }
            RuntimeError::DeviceLost => {
                write!(f, "the device has been lost")
            }
            RuntimeError::Uninitialized => {
                write!(f, "the driver is not initialized")
            }
            RuntimeError::Unknown => {
                write!(f, "the driver reported an unknown failure")
            }
            RuntimeError::Unnamed(result) => {
                write!(f, "unnamed driver error, ze_result_t value {}", result)
            }
        }
    }
}

impl From<zero::Result> for RuntimeError {
    fn from(result: zero::Result) -> RuntimeError {
        match result {
            zero::Result::ERROR_OUT_OF_HOST_MEMORY => RuntimeError::OutOfHostMemory,
            zero::Result::ERROR_OUT_OF_DEVICE_MEMORY => RuntimeError::OutOfDeviceMemory,
            zero::Result::ERROR_DEVICE_LOST => RuntimeError::DeviceLost,
            zero::Result::ERROR_UNINITIALIZED => RuntimeError::Uninitialized,
            zero::Result::ERROR_UNSUPPORTED_FEATURE
            | zero::Result::ERROR_UNSUPPORTED_VERSION
            | zero::Result::ERROR_UNSUPPORTED_IMAGE_FORMAT => RuntimeError::UnsupportedFeature,
            zero::Result::ERROR_INVALID_ARGUMENT
            | zero::Result::ERROR_INVALID_NULL_HANDLE
            | zero::Result::ERROR_INVALID_NULL_POINTER
            | zero::Result::ERROR_INVALID_SIZE
            | zero::Result::ERROR_INVALID_ENUMERATION => RuntimeError::InvalidValue,
            zero::Result::ERROR_UNKNOWN => RuntimeError::Unknown,
            other => RuntimeError::Unnamed(other.as_raw()),
        }
    }
}

/// Converts a raw driver result code into a `Result`.
#[inline]
pub(crate) fn check_errors(result: zero::Result) -> Result<(), RuntimeError> {
    if result == zero::Result::SUCCESS {
        Ok(())
    } else {
        Err(RuntimeError::from(result))
    }
}
