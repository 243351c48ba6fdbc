// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Samplers.
//!
//! Sampler creation belongs to a different part of the runtime; this module
//! only wraps an existing native handle so that
//! [`create_sampled_image`](crate::image::create_sampled_image) can pack it
//! into a sampled-image handle.

use crate::{context::Context, zero, ZeroObject};
use std::sync::Arc;

/// A non-owning wrapper around a native sampler.
#[derive(Debug)]
pub struct Sampler {
    context: Arc<Context>,
    handle: zero::SamplerHandle,
}

impl Sampler {
    /// Wraps a native sampler handle.
    ///
    /// # Safety
    ///
    /// - `handle` must be a valid sampler of `context`, and must outlive the
    ///   returned object and every handle packed from it.
    pub unsafe fn from_handle(context: &Arc<Context>, handle: zero::SamplerHandle) -> Arc<Sampler> {
        Arc::new(Sampler {
            context: context.clone(),
            handle,
        })
    }

    /// Returns the context the sampler belongs to.
    #[inline]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }
}

unsafe impl ZeroObject for Sampler {
    type Handle = zero::SamplerHandle;

    #[inline]
    fn internal_object(&self) -> zero::SamplerHandle {
        self.handle
    }
}
