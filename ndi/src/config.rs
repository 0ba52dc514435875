// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Runtime path resolution for the NDI shared library.
//!
//! The vendor installers export `NDI_RUNTIME_DIR_V6` (or `_V5` for older
//! runtimes) pointing at the directory holding the library. When neither is
//! set the bare library names are returned so the platform loader can search
//! its default paths.

use std::ffi::OsString;
use std::path::PathBuf;

use ndi_sys::{LIBRARY_NAMES, RUNTIME_DIR_ENV_VARS};

/// Returns every path worth trying to load the NDI runtime from, in order.
pub fn library_candidates() -> Vec<PathBuf> {
    library_candidates_with(|var| std::env::var_os(var))
}

/// Same as [`library_candidates`] with an injectable environment lookup.
///
/// # Arguments
/// * `lookup` - Returns the value of an environment variable, if set
pub fn library_candidates_with<F>(lookup: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    let mut candidates = Vec::new();

    for var in RUNTIME_DIR_ENV_VARS {
        let Some(dir) = lookup(var) else {
            continue;
        };
        if dir.is_empty() {
            continue;
        }
        for name in LIBRARY_NAMES {
            candidates.push(PathBuf::from(&dir).join(name));
        }
    }

    candidates.extend(LIBRARY_NAMES.iter().map(PathBuf::from));
    candidates
}
