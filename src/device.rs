// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Accelerator devices exposed by a platform.

use crate::{check_errors, platform::Platform, zero, RuntimeError, ZeroObject};
use std::{ptr, sync::Arc};

/// An accelerator exposed by a [`Platform`].
#[derive(Debug)]
pub struct Device {
    platform: Arc<Platform>,
    handle: zero::DeviceHandle,
}

impl Device {
    /// Enumerates the devices of a platform.
    pub fn enumerate(platform: &Arc<Platform>) -> Result<Vec<Arc<Device>>, RuntimeError> {
        use crate::zero::Handle as _;

        let fns = platform.fns();

        let mut count = 0;
        check_errors(unsafe {
            (fns.device_get)(platform.internal_object(), &mut count, ptr::null_mut())
        })?;

        let mut handles = vec![zero::DeviceHandle::null(); count as usize];
        check_errors(unsafe {
            (fns.device_get)(platform.internal_object(), &mut count, handles.as_mut_ptr())
        })?;
        handles.truncate(count as usize);

        Ok(handles
            .into_iter()
            .map(|handle| {
                Arc::new(Device {
                    platform: platform.clone(),
                    handle,
                })
            })
            .collect())
    }

    /// Returns the platform the device belongs to.
    #[inline]
    pub fn platform(&self) -> &Arc<Platform> {
        &self.platform
    }
}

unsafe impl ZeroObject for Device {
    type Handle = zero::DeviceHandle;

    #[inline]
    fn internal_object(&self) -> zero::DeviceHandle {
        self.handle
    }
}
