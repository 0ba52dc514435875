// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Loading and lifetime of the NDI runtime.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use ndi_sys::NdiLib;
use tracing::{debug, trace};

use crate::{Error, Result, config};

/// A loaded and initialized NDI runtime.
///
/// `NDIlib_destroy` is called when the last [`NdiApiHandle`] is dropped.
pub struct NdiApi {
    lib: NdiLib,
}

/// Shared handle to the NDI runtime.
pub type NdiApiHandle = Arc<NdiApi>;

// Safety: the SDK's global entry points are thread-safe. Per-object
// thread affinity is handled by the finder/receiver/sender wrappers.
unsafe impl Send for NdiApi {}
unsafe impl Sync for NdiApi {}

impl NdiApi {
    pub(crate) fn lib(&self) -> &NdiLib {
        &self.lib
    }
}

impl Drop for NdiApi {
    fn drop(&mut self) {
        unsafe { self.lib.destroy() };
    }
}

/// Loads the NDI runtime from `path` and initializes it.
///
/// # Arguments
/// * `path` - Path or bare file name of the NDI shared library
///
/// # Errors
/// * [`Error::LibLoading`] if the library or one of its symbols is missing
/// * [`Error::InitializeFailed`] if `NDIlib_initialize` refuses to start
pub fn load_api(path: impl AsRef<Path>) -> Result<NdiApiHandle> {
    let path = path.as_ref();
    let lib = unsafe { NdiLib::new(path)? };
    if !unsafe { lib.initialize() } {
        return Err(Error::InitializeFailed);
    }
    debug!("Loaded NDI runtime from {}", path.display());
    Ok(Arc::new(NdiApi { lib }))
}

/// Returns the process-wide runtime, loading it on first use.
///
/// Every path from [`config::library_candidates`] is tried once; the
/// outcome (success or failure) is cached for the lifetime of the process.
pub fn default_api() -> Result<NdiApiHandle> {
    static API: OnceLock<std::result::Result<NdiApiHandle, String>> = OnceLock::new();

    API.get_or_init(|| {
        let mut tried = Vec::new();
        for candidate in config::library_candidates() {
            match load_api(&candidate) {
                Ok(api) => return Ok(api),
                Err(err) => {
                    trace!("Failed loading NDI runtime from {}: {}", candidate.display(), err);
                    tried.push(candidate.display().to_string());
                }
            }
        }
        Err(tried.join(", "))
    })
    .clone()
    .map_err(Error::NotFound)
}
