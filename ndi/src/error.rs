// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for NDI operations.

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur when using the NDI SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `NDIlib_initialize` returned false (unsupported CPU or broken runtime).
    #[error("NDI runtime failed to initialize")]
    InitializeFailed,

    /// The SDK returned a null handle when creating a finder, receiver or sender.
    #[error("Failed to create NDI {0}")]
    CreateFailed(&'static str),

    /// The receiver reported an error frame (typically a lost connection).
    #[error("NDI capture failed")]
    Capture,

    /// No candidate path yielded a usable runtime.
    #[error("NDI runtime not found, tried: {0}")]
    NotFound(String),

    /// A generic error for failures not covered by the other variants.
    #[error("Other error: {0}")]
    Other(String),

    /// Failed to convert a Rust string to a C-compatible null-terminated string.
    #[error("Null string: {0}")]
    NulString(#[from] std::ffi::NulError),

    /// Failed to load the NDI dynamic library or one of its symbols.
    #[error("Loading library: {0}")]
    LibLoading(#[from] libloading::Error),
}
