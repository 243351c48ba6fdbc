// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Level Zero library loading system.
//!
//! Before anything else can happen, the crate needs an implementation of the
//! driver entry points. An implementation is defined as a source of named
//! symbols, which can be accessed through the [`Loader`] trait.
//!
//! Once you have a type that implements `Loader`, you can create a
//! [`ZeroLibrary`] from it. The library resolves the whole entry-point table
//! up front and initializes the driver stack.

use crate::{check_errors, zero::ZeroFunctions, RuntimeError};
use libloading::{Error as LibloadingError, Library};
use std::{
    error::Error,
    ffi::CStr,
    fmt::{Debug, Display, Error as FmtError, Formatter},
    os::raw::c_void,
    path::Path,
    ptr,
    sync::Arc,
};

/// A loaded library containing a valid Level Zero implementation.
pub struct ZeroLibrary {
    loader: Box<dyn Loader>,
    fns: ZeroFunctions,
}

impl ZeroLibrary {
    /// Loads the default Level Zero loader library for this system.
    pub fn new() -> Result<Arc<Self>, LoadingError> {
        #[cfg(windows)]
        const PATHS: [&str; 1] = ["ze_loader.dll"];
        #[cfg(not(windows))]
        const PATHS: [&str; 2] = ["libze_loader.so.1", "libze_loader.so"];

        let mut err: Option<LoadingError> = None;

        for path in PATHS {
            match unsafe { DynamicLibraryLoader::new(path) } {
                Ok(library) => return Self::with_loader(library),
                Err(e) => err = Some(e),
            }
        }

        Err(err.unwrap())
    }

    /// Loads a custom Level Zero implementation.
    pub fn with_loader(loader: impl Loader + 'static) -> Result<Arc<Self>, LoadingError> {
        let fns = ZeroFunctions::load(|name| unsafe { loader.get_proc_addr(name) })
            .map_err(LoadingError::MissingEntryPoint)?;

        // The driver stack must be initialized exactly once before any other
        // entry point is called.
        check_errors(unsafe { (fns.init)(0) })?;

        Ok(Arc::new(ZeroLibrary {
            loader: Box::new(loader),
            fns,
        }))
    }

    /// Returns pointers to the raw functions of the library.
    #[inline]
    pub fn fns(&self) -> &ZeroFunctions {
        &self.fns
    }

    /// Calls `get_proc_addr` on the underlying loader.
    #[inline]
    pub unsafe fn get_proc_addr(&self, name: &CStr) -> *const c_void {
        unsafe { self.loader.get_proc_addr(name) }
    }
}

impl Debug for ZeroLibrary {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("ZeroLibrary").finish_non_exhaustive()
    }
}

/// Implemented on objects that grant access to a Level Zero implementation.
pub unsafe trait Loader: Send + Sync {
    /// Resolves a driver entry point by name.
    ///
    /// The returned pointer must stay valid for as long as `self` is alive,
    /// and must be null if the symbol does not exist.
    unsafe fn get_proc_addr(&self, name: &CStr) -> *const c_void;
}

/// Implementation of `Loader` that loads the driver from a dynamic library.
pub struct DynamicLibraryLoader {
    library: Library,
}

impl DynamicLibraryLoader {
    /// Tries to load the dynamic library at the given path.
    ///
    /// # Safety
    ///
    /// - The dynamic library must be a valid Level Zero implementation.
    pub unsafe fn new(path: impl AsRef<Path>) -> Result<DynamicLibraryLoader, LoadingError> {
        let library =
            unsafe { Library::new(path.as_ref()) }.map_err(LoadingError::LibraryLoadFailure)?;

        Ok(DynamicLibraryLoader { library })
    }
}

unsafe impl Loader for DynamicLibraryLoader {
    unsafe fn get_proc_addr(&self, name: &CStr) -> *const c_void {
        type RawFn = unsafe extern "system" fn();

        match unsafe { self.library.get::<RawFn>(name.to_bytes_with_nul()) } {
            Ok(symbol) => *symbol as *const c_void,
            Err(_) => ptr::null(),
        }
    }
}

/// Error that can happen when loading the driver library.
#[derive(Debug)]
pub enum LoadingError {
    /// Failed to load the shared library.
    LibraryLoadFailure(LibloadingError),

    /// The library does not export one of the required entry points.
    MissingEntryPoint(&'static str),

    /// The driver returned an error while initializing.
    RuntimeError(RuntimeError),
}

impl Error for LoadingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RuntimeError(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for LoadingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::LibraryLoadFailure(_) => write!(f, "failed to load the driver shared library"),
            Self::MissingEntryPoint(name) => {
                write!(f, "the library does not export `{}`", name)
            }
            Self::RuntimeError(err) => write!(f, "a runtime error occurred: {}", err),
        }
    }
}

impl From<RuntimeError> for LoadingError {
    fn from(err: RuntimeError) -> Self {
        Self::RuntimeError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{DynamicLibraryLoader, LoadingError};

    #[test]
    fn dl_open_error() {
        match unsafe { DynamicLibraryLoader::new("_non_existing_library.void") } {
            Err(LoadingError::LibraryLoadFailure(_)) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn mock_loader() {
        let library = crate::ZeroLibrary::with_loader(crate::tests::MockLoader::new()).unwrap();
        let _ = library.fns();
    }
}
