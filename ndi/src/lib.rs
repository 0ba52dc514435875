// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! # ndi - safe access to the NDI SDK
//!
//! RAII wrappers over the raw declarations in [`ndi_sys`]. The runtime is
//! loaded at run time, never linked, so a missing SDK is an ordinary error.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ NdiApiHandle│  (Arc, NDIlib_destroy on last drop)
//! └──────┬──────┘
//!        ├─► FindInstance ──► Vec<Source>
//!        ├─► RecvInstance ──► Frame::Video(VideoFrame) / Frame::Audio(AudioFrame)
//!        └─► SendInstance ◄── VideoFrameDesc + &[u8] / AudioFrameDesc + &[f32]
//! ```
//!
//! ## Examples
//!
//! ```no_run
//! use ndi::{Frame, RecvInstance, default_api};
//!
//! # fn main() -> Result<(), ndi::Error> {
//! let api = default_api()?;
//! let recv = RecvInstance::connect(api, "192.168.1.20:5961")?;
//! if let Some(Frame::Video(frame)) = recv.capture(500)? {
//!     println!("{}x{} {:?}", frame.width(), frame.height(), frame.fourcc());
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod error;
mod find;
mod frame;
mod recv;
mod send;
mod source;

pub mod config;

pub use api::{NdiApi, NdiApiHandle, default_api, load_api};
pub use error::{Error, Result};
pub use find::FindInstance;
pub use frame::{AudioFrameDesc, FourCC, FrameFormat, VideoFrameDesc, interleave_planar};
pub use recv::{AudioFrame, Frame, RecvInstance, VideoFrame};
pub use send::{SendInstance, TIMECODE_SYNTHESIZE};
pub use source::Source;
