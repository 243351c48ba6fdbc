// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Drivers reported by the loader library.
//!
//! A [`Platform`] wraps one driver handle. Besides being the parent of
//! devices and contexts, it owns the lazily-resolved optional extension
//! entry points: the bindless device-offset query and the 2D pitch query.
//! Each of those is looked up at most once per platform; all callers after
//! the first observe the cached pointer, or its absence.

use crate::{check_errors, zero, zero::Handle as _, RuntimeError, ZeroLibrary, ZeroObject};
use std::{
    ffi::CStr,
    mem,
    os::raw::c_void,
    ptr,
    sync::{Arc, OnceLock},
};

/// A Level Zero driver.
#[derive(Debug)]
pub struct Platform {
    library: Arc<ZeroLibrary>,
    handle: zero::DriverHandle,

    image_device_offset_fn: OnceLock<Option<zero::PFN_zeImageGetDeviceOffsetExp>>,
    mem_pitch_fn: OnceLock<Option<zero::PFN_zeMemGetPitchFor2dImage>>,
}

impl Platform {
    /// Enumerates the drivers reported by the library.
    pub fn enumerate(library: &Arc<ZeroLibrary>) -> Result<Vec<Arc<Platform>>, RuntimeError> {
        let fns = library.fns();

        let mut count = 0;
        check_errors(unsafe { (fns.driver_get)(&mut count, ptr::null_mut()) })?;

        let mut handles = vec![zero::DriverHandle::null(); count as usize];
        check_errors(unsafe { (fns.driver_get)(&mut count, handles.as_mut_ptr()) })?;
        handles.truncate(count as usize);

        Ok(handles
            .into_iter()
            .map(|handle| {
                Arc::new(Platform {
                    library: library.clone(),
                    handle,
                    image_device_offset_fn: OnceLock::new(),
                    mem_pitch_fn: OnceLock::new(),
                })
            })
            .collect())
    }

    /// Returns the library the platform belongs to.
    #[inline]
    pub fn library(&self) -> &Arc<ZeroLibrary> {
        &self.library
    }

    #[inline]
    pub(crate) fn fns(&self) -> &zero::ZeroFunctions {
        self.library.fns()
    }

    /// Resolves an optional extension entry point by name through the
    /// driver, returning null if the driver does not provide it.
    fn resolve_extension(&self, name: &CStr) -> *const c_void {
        let fns = self.fns();
        let mut func = ptr::null();
        let result = unsafe {
            (fns.driver_get_extension_function_address)(self.handle, name.as_ptr(), &mut func)
        };

        if result != zero::Result::SUCCESS {
            log::debug!(
                "resolving extension function {:?} failed, err = {:?}",
                name,
                result,
            );
            return ptr::null();
        }

        func
    }

    /// Returns the `zeImageGetDeviceOffsetExp` entry point, resolving it on
    /// the first call.
    pub(crate) fn image_device_offset_fn(&self) -> Option<zero::PFN_zeImageGetDeviceOffsetExp> {
        *self.image_device_offset_fn.get_or_init(|| {
            let name =
                unsafe { CStr::from_bytes_with_nul_unchecked(b"zeImageGetDeviceOffsetExp\0") };
            let func = self.resolve_extension(name);

            if func.is_null() {
                None
            } else {
                Some(unsafe {
                    mem::transmute::<*const c_void, zero::PFN_zeImageGetDeviceOffsetExp>(func)
                })
            }
        })
    }

    /// Returns the `zeMemGetPitchFor2dImage` entry point, resolving it on
    /// the first call.
    pub(crate) fn mem_pitch_fn(&self) -> Option<zero::PFN_zeMemGetPitchFor2dImage> {
        *self.mem_pitch_fn.get_or_init(|| {
            let name = unsafe { CStr::from_bytes_with_nul_unchecked(b"zeMemGetPitchFor2dImage\0") };
            let func = self.resolve_extension(name);

            if func.is_null() {
                None
            } else {
                Some(unsafe {
                    mem::transmute::<*const c_void, zero::PFN_zeMemGetPitchFor2dImage>(func)
                })
            }
        })
    }
}

unsafe impl ZeroObject for Platform {
    type Handle = zero::DriverHandle;

    #[inline]
    fn internal_object(&self) -> zero::DriverHandle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::Platform;
    use crate::tests::MockLoader;
    use crate::ZeroLibrary;

    #[test]
    fn enumerate() {
        let library = ZeroLibrary::with_loader(MockLoader::new()).unwrap();
        let platforms = Platform::enumerate(&library).unwrap();
        assert_eq!(platforms.len(), 1);
    }

    #[test]
    fn extension_lookup_is_cached() {
        let library = ZeroLibrary::with_loader(MockLoader::new()).unwrap();
        let platform = Platform::enumerate(&library).unwrap().remove(0);

        let first = platform.image_device_offset_fn();
        let second = platform.image_device_offset_fn();
        assert!(first.is_some());
        assert_eq!(first.map(|f| f as usize), second.map(|f| f as usize));
    }

    #[test]
    fn missing_extension_is_cached_as_absent() {
        let library = ZeroLibrary::with_loader(MockLoader::without_extensions()).unwrap();
        let platform = Platform::enumerate(&library).unwrap().remove(0);

        assert!(platform.image_device_offset_fn().is_none());
        assert!(platform.mem_pitch_fn().is_none());
    }
}
