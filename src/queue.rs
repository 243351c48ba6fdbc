// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Command queues and command-list scheduling.
//!
//! A [`Queue`] wraps a native command queue together with the machinery
//! that copy enqueues rely on: acquisition of an open
//! [`CommandList`](crate::command_buffer::CommandList), preference between
//! the main and the copy engine, and batched submission. Executed lists are
//! reset and kept in lock-free recycle pools.

use crate::{
    check_errors, command_buffer::CommandList, context::Context, device::Device, zero,
    zero::Handle as _, RuntimeError, ZeroObject,
};
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use std::{ptr, sync::Arc};

/// A native command queue of one device.
pub struct Queue {
    context: Arc<Context>,
    device: Arc<Device>,
    handle: zero::CommandQueueHandle,

    compute_ordinal: u32,
    copy_ordinal: Option<u32>,

    // Exclusive lock held for the duration of a copy enqueue.
    pub(crate) mutex: Mutex<()>,

    recycled_compute: SegQueue<zero::CommandListHandle>,
    recycled_copy: SegQueue<zero::CommandListHandle>,
}

impl Queue {
    /// Creates a queue on the device's main engine.
    ///
    /// `copy_ordinal` names the command-queue group of a secondary copy
    /// engine, if the device has one; transfers prefer it when present.
    pub fn new(
        context: &Arc<Context>,
        device: &Arc<Device>,
        compute_ordinal: u32,
        copy_ordinal: Option<u32>,
    ) -> Result<Arc<Queue>, RuntimeError> {
        let fns = context.fns();

        let desc = zero::CommandQueueDesc {
            stype: zero::StructureType::COMMAND_QUEUE_DESC,
            pnext: ptr::null(),
            ordinal: compute_ordinal,
            index: 0,
            flags: 0,
            mode: 0,
            priority: 0,
        };

        let mut handle = zero::CommandQueueHandle::null();
        check_errors(unsafe {
            (fns.command_queue_create)(
                context.internal_object(),
                device.internal_object(),
                &desc,
                &mut handle,
            )
        })?;

        Ok(Arc::new(Queue {
            context: context.clone(),
            device: device.clone(),
            handle,
            compute_ordinal,
            copy_ordinal,
            mutex: Mutex::new(()),
            recycled_compute: SegQueue::new(),
            recycled_copy: SegQueue::new(),
        }))
    }

    /// Returns the context the queue belongs to.
    #[inline]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Returns the device the queue belongs to.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns whether a transfer should run on the copy engine.
    #[inline]
    pub fn use_copy_engine(&self, prefer_copy_engine: bool) -> bool {
        prefer_copy_engine && self.copy_ordinal.is_some()
    }

    /// Returns an open command list to record into, reusing a recycled one
    /// when available.
    pub fn acquire_command_list(
        &self,
        use_copy_engine: bool,
        _ok_to_batch: bool,
    ) -> Result<CommandList, RuntimeError> {
        let pool = if use_copy_engine {
            &self.recycled_copy
        } else {
            &self.recycled_compute
        };

        if let Some(handle) = pool.pop() {
            return Ok(CommandList::from_recycled(
                &self.context,
                handle,
                use_copy_engine,
            ));
        }

        let ordinal = if use_copy_engine {
            self.copy_ordinal.unwrap_or(self.compute_ordinal)
        } else {
            self.compute_ordinal
        };

        CommandList::new(&self.context, &self.device, ordinal, use_copy_engine)
    }

    /// Closes and submits a command list, then resets it and returns it to
    /// the recycle pool.
    pub fn execute_command_list(
        &self,
        command_list: CommandList,
        blocking: bool,
        _ok_to_batch: bool,
    ) -> Result<(), RuntimeError> {
        let fns = self.context.fns();
        let handle = command_list.internal_object();

        unsafe {
            check_errors((fns.command_list_close)(handle))?;
            check_errors((fns.command_queue_execute_command_lists)(
                self.handle,
                1,
                &handle,
                zero::FenceHandle::null(),
            ))?;

            if blocking {
                check_errors((fns.command_queue_synchronize)(self.handle, u64::MAX))?;
            }

            check_errors((fns.command_list_reset)(handle))?;
        }

        let pool = if command_list.on_copy_engine() {
            &self.recycled_copy
        } else {
            &self.recycled_compute
        };
        pool.push(command_list.defuse());

        Ok(())
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        let fns = self.context.fns();

        unsafe {
            while let Some(handle) = self.recycled_compute.pop() {
                let _ = (fns.command_list_destroy)(handle);
            }
            while let Some(handle) = self.recycled_copy.pop() {
                let _ = (fns.command_list_destroy)(handle);
            }
            let _ = (fns.command_queue_destroy)(self.handle);
        }
    }
}

unsafe impl ZeroObject for Queue {
    type Handle = zero::CommandQueueHandle;

    #[inline]
    fn internal_object(&self) -> zero::CommandQueueHandle {
        self.handle
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("handle", &self.handle)
            .field("compute_ordinal", &self.compute_ordinal)
            .field("copy_ordinal", &self.copy_ordinal)
            .finish_non_exhaustive()
    }
}
