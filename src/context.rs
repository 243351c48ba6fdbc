// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Contexts, the containers that allocations and images live in.

use crate::{check_errors, platform::Platform, zero, zero::Handle as _, RuntimeError, ZeroObject};
use parking_lot::{Mutex, RwLock};
use std::{ptr, sync::Arc};

// Capacity of the per-context event pool. Completion events are recycled, so
// this bounds the number of simultaneously live events, not the number of
// operations.
const EVENT_POOL_CAPACITY: u32 = 256;

/// A Level Zero context.
///
/// The context carries the reader/writer lock that every public entry point
/// touching context-wide driver state acquires: shared for paths that only
/// read driver handles (allocation, descriptor translation), exclusive where
/// queue state is mutated.
pub struct Context {
    platform: Arc<Platform>,
    handle: zero::ContextHandle,

    pub(crate) mutex: RwLock<()>,

    event_pool: zero::EventPoolHandle,
    free_event_indices: Mutex<Vec<u32>>,
}

impl Context {
    /// Creates a new context on the given platform.
    pub fn new(platform: &Arc<Platform>) -> Result<Arc<Context>, RuntimeError> {
        let fns = platform.fns();

        let desc = zero::ContextDesc {
            stype: zero::StructureType::CONTEXT_DESC,
            pnext: ptr::null(),
            flags: 0,
        };

        let mut handle = zero::ContextHandle::null();
        check_errors(unsafe {
            (fns.context_create)(platform.internal_object(), &desc, &mut handle)
        })?;

        let pool_desc = zero::EventPoolDesc {
            stype: zero::StructureType::EVENT_POOL_DESC,
            pnext: ptr::null(),
            flags: zero::EVENT_POOL_FLAG_HOST_VISIBLE,
            count: EVENT_POOL_CAPACITY,
        };

        let mut event_pool = zero::EventPoolHandle::null();
        let result =
            unsafe { (fns.event_pool_create)(handle, &pool_desc, 0, ptr::null(), &mut event_pool) };
        if let Err(err) = check_errors(result) {
            unsafe {
                let _ = (fns.context_destroy)(handle);
            }
            return Err(err);
        }

        Ok(Arc::new(Context {
            platform: platform.clone(),
            handle,
            mutex: RwLock::new(()),
            event_pool,
            free_event_indices: Mutex::new((0..EVENT_POOL_CAPACITY).rev().collect()),
        }))
    }

    /// Returns the platform the context belongs to.
    #[inline]
    pub fn platform(&self) -> &Arc<Platform> {
        &self.platform
    }

    #[inline]
    pub(crate) fn fns(&self) -> &zero::ZeroFunctions {
        self.platform.fns()
    }

    #[inline]
    pub(crate) fn event_pool(&self) -> zero::EventPoolHandle {
        self.event_pool
    }

    pub(crate) fn allocate_event_index(&self) -> Option<u32> {
        self.free_event_indices.lock().pop()
    }

    pub(crate) fn release_event_index(&self, index: u32) {
        self.free_event_indices.lock().push(index);
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let fns = self.platform.fns();

        // Best effort; the driver may already have been torn down.
        unsafe {
            let _ = (fns.event_pool_destroy)(self.event_pool);
            let _ = (fns.context_destroy)(self.handle);
        }
    }
}

unsafe impl ZeroObject for Context {
    type Handle = zero::ContextHandle;

    #[inline]
    fn internal_object(&self) -> zero::ContextHandle {
        self.handle
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
