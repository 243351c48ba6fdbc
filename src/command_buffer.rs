// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Native command lists.
//!
//! Command lists are acquired from a [`Queue`](crate::queue::Queue) and
//! handed back to it for execution; they are not built directly. A list
//! that is executed gets reset and recycled by its queue, a list that is
//! dropped without being executed is destroyed.

use crate::{check_errors, context::Context, device::Device, zero, RuntimeError, ZeroObject};
use std::{ptr, sync::Arc};

/// An open native command list.
#[derive(Debug)]
pub struct CommandList {
    context: Arc<Context>,
    handle: zero::CommandListHandle,
    on_copy_engine: bool,

    // Cleared when the queue takes the handle back for recycling.
    needs_destruction: bool,
}

impl CommandList {
    pub(crate) fn new(
        context: &Arc<Context>,
        device: &Arc<Device>,
        ordinal: u32,
        on_copy_engine: bool,
    ) -> Result<CommandList, RuntimeError> {
        use crate::zero::Handle as _;

        let fns = context.fns();

        let desc = zero::CommandListDesc {
            stype: zero::StructureType::COMMAND_LIST_DESC,
            pnext: ptr::null(),
            command_queue_group_ordinal: ordinal,
            flags: 0,
        };

        let mut handle = zero::CommandListHandle::null();
        check_errors(unsafe {
            (fns.command_list_create)(
                context.internal_object(),
                device.internal_object(),
                &desc,
                &mut handle,
            )
        })?;

        Ok(CommandList {
            context: context.clone(),
            handle,
            on_copy_engine,
            needs_destruction: true,
        })
    }

    pub(crate) fn from_recycled(
        context: &Arc<Context>,
        handle: zero::CommandListHandle,
        on_copy_engine: bool,
    ) -> CommandList {
        CommandList {
            context: context.clone(),
            handle,
            on_copy_engine,
            needs_destruction: true,
        }
    }

    /// Returns whether the list targets the secondary (copy) engine.
    #[inline]
    pub fn on_copy_engine(&self) -> bool {
        self.on_copy_engine
    }

    /// Takes the native handle out for recycling, disarming the destructor.
    pub(crate) fn defuse(mut self) -> zero::CommandListHandle {
        self.needs_destruction = false;
        self.handle
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        if !self.needs_destruction {
            return;
        }

        let fns = self.context.fns();
        unsafe {
            let _ = (fns.command_list_destroy)(self.handle);
        }
    }
}

unsafe impl ZeroObject for CommandList {
    type Handle = zero::CommandListHandle;

    #[inline]
    fn internal_object(&self) -> zero::CommandListHandle {
        self.handle
    }
}
