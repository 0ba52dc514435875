// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! GStreamer Plugin for NDI
//!
//! This crate implements a GStreamer plugin bridging pipelines with NDI
//! sources on the local network:
//!
//! - **ndivideosrc** / **ndiaudiosrc**: live sources that output the video or
//!   the audio of an NDI source. Both elements pointed at the same source
//!   share a single network receiver.
//! - **ndivideosink** / **ndiaudiosink**: sinks that publish video or audio as
//!   an NDI source. Sinks with the same `device-name` share one sender.
//! - **ndideviceprovider**: lists NDI sources as GStreamer devices and keeps
//!   the list current while monitoring.
//!
//! ## Supported Media Formats
//! - **Video**: UYVY, BGRA, RGBA, I420, NV12
//! - **Audio**: F32LE, interleaved, up to 16 channels
//!
//! The NDI runtime library is loaded on first use, so the plugin registers
//! even on hosts without it; elements then fail when they start.

#![allow(clippy::non_send_fields_in_send_ty, unused_doc_comments)]

use gst::glib;
use gstreamer as gst;

/// Caps shared by the elements and the device provider
mod caps;

/// NDI source discovery and device listing
pub mod deviceprovider;

/// Audio sink element (publishes audio to NDI)
pub mod ndiaudiosink;

/// Audio source element (reads audio from NDI)
pub mod ndiaudiosrc;

/// Receivers shared between source elements
pub mod ndiinput;

/// Senders shared between sink elements
pub mod ndioutput;

/// Video sink element (publishes video to NDI)
pub mod ndivideosink;

/// Video source element (reads video from NDI)
pub mod ndivideosrc;

/// Registers the four elements and the device provider.
fn plugin_init(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    ndivideosrc::register(plugin)?;
    ndiaudiosrc::register(plugin)?;
    ndivideosink::register(plugin)?;
    ndiaudiosink::register(plugin)?;
    deviceprovider::register(plugin)?;

    Ok(())
}

gst::plugin_define!(
    ndi,
    env!("CARGO_PKG_DESCRIPTION"),
    plugin_init,
    concat!(env!("CARGO_PKG_VERSION"), "-", env!("COMMIT_ID")),
    "Apache-2.0",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_REPOSITORY"),
    env!("BUILD_REL_DATE")
);
