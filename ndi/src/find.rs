// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Source discovery.

use crate::{Error, NdiApiHandle, Result, Source};

/// RAII wrapper around an `NDIlib_find_instance_t`.
pub struct FindInstance {
    api: NdiApiHandle,
    instance: ndi_sys::NDIlib_find_instance_t,
}

// Safety: the SDK allows a finder to be used from any thread, one at a time.
unsafe impl Send for FindInstance {}

impl FindInstance {
    /// Creates a finder in all groups.
    ///
    /// # Arguments
    /// * `api` - Loaded runtime
    /// * `show_local_sources` - Also report sources running on this machine
    pub fn new(api: NdiApiHandle, show_local_sources: bool) -> Result<Self> {
        let settings = ndi_sys::NDIlib_find_create_t {
            show_local_sources,
            p_groups: std::ptr::null(),
            p_extra_ips: std::ptr::null(),
        };
        let instance = unsafe { api.lib().find_create_v2(&settings) };
        if instance.is_null() {
            return Err(Error::CreateFailed("finder"));
        }
        Ok(Self { api, instance })
    }

    /// Blocks until the source list changes or `timeout_ms` elapses.
    ///
    /// # Returns
    /// `true` if the list changed.
    pub fn wait_for_sources(&self, timeout_ms: u32) -> bool {
        unsafe { self.api.lib().find_wait_for_sources(self.instance, timeout_ms) }
    }

    /// Returns a snapshot of the sources currently visible.
    pub fn current_sources(&self) -> Vec<Source> {
        let mut count = 0u32;
        let sources = unsafe {
            self.api
                .lib()
                .find_get_current_sources(self.instance, &mut count)
        };
        if sources.is_null() || count == 0 {
            return Vec::new();
        }

        // The array stays valid until the next call on this finder.
        let raw = unsafe { std::slice::from_raw_parts(sources, count as usize) };
        raw.iter()
            .map(|source| unsafe { Source::from_raw(source) })
            .collect()
    }
}

impl Drop for FindInstance {
    fn drop(&mut self) {
        unsafe { self.api.lib().find_destroy(self.instance) };
    }
}
