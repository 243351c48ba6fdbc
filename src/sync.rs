// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Completion events and wait lists.
//!
//! Every enqueued operation signals an [`Event`] and may depend on a
//! [`WaitList`] of earlier events. A wait list retains the events it was
//! built from, so their native handles stay valid until the dependent
//! operation has been recorded and submitted.

use crate::{
    check_errors, command_buffer::CommandList, queue::Queue, zero, zero::Handle as _,
    RuntimeError, ZeroObject,
};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::{ptr, sync::Arc};

/// The kind of operation an event is signaled by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// A host/device image region copy.
    MemImageCopy,
}

/// A list of events an operation waits on before executing.
///
/// The list keeps its events alive; dropping it releases them.
#[derive(Clone, Debug, Default)]
pub struct WaitList {
    events: SmallVec<[Arc<Event>; 8]>,
}

impl WaitList {
    /// Builds a wait list from the given events, retaining each of them.
    pub fn new(wait_events: &[Arc<Event>]) -> WaitList {
        WaitList {
            events: wait_events.iter().cloned().collect(),
        }
    }

    /// Returns the number of events in the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns whether the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the native handles of the events in the list.
    pub(crate) fn raw_handles(&self) -> SmallVec<[zero::EventHandle; 8]> {
        self.events
            .iter()
            .map(|event| event.internal_object())
            .collect()
    }
}

/// A completion event tied to a queue.
pub struct Event {
    queue: Arc<Queue>,
    handle: zero::EventHandle,
    index: u32,
    kind: CommandKind,
    internal: bool,
    wait_list: Mutex<WaitList>,
}

impl Event {
    /// Creates an event from the context's event pool and associates it
    /// with the queue and the command list it will be signaled from.
    ///
    /// `internal` marks events that no caller observes; `multi_device`
    /// events would be visible to other devices, which this backend does
    /// not need.
    pub fn new(
        queue: &Arc<Queue>,
        kind: CommandKind,
        _command_list: &CommandList,
        internal: bool,
        _multi_device: bool,
    ) -> Result<Arc<Event>, RuntimeError> {
        let context = queue.context();
        let fns = context.fns();

        let index = context
            .allocate_event_index()
            .ok_or(RuntimeError::OutOfHostMemory)?;

        let desc = zero::EventDesc {
            stype: zero::StructureType::EVENT_DESC,
            pnext: ptr::null(),
            index,
            signal: 0,
            wait: 0,
        };

        let mut handle = zero::EventHandle::null();
        let result = unsafe { (fns.event_create)(context.event_pool(), &desc, &mut handle) };
        if let Err(err) = check_errors(result) {
            context.release_event_index(index);
            return Err(err);
        }

        Ok(Arc::new(Event {
            queue: queue.clone(),
            handle,
            index,
            kind,
            internal,
            wait_list: Mutex::new(WaitList::default()),
        }))
    }

    /// Returns the queue the event is associated with.
    #[inline]
    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    /// Returns the kind of operation that signals the event.
    #[inline]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Returns whether the event is internal to the crate.
    #[inline]
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Stores the wait list of the operation that signals this event,
    /// retaining the listed events.
    pub fn set_wait_list(&self, wait_list: WaitList) {
        *self.wait_list.lock() = wait_list;
    }

    /// Returns a copy of the stored wait list.
    pub fn wait_list(&self) -> WaitList {
        self.wait_list.lock().clone()
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        let context = self.queue.context();
        let fns = context.fns();

        unsafe {
            let _ = (fns.event_destroy)(self.handle);
        }
        context.release_event_index(self.index);
    }
}

unsafe impl ZeroObject for Event {
    type Handle = zero::EventHandle;

    #[inline]
    fn internal_object(&self) -> zero::EventHandle {
        self.handle
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
