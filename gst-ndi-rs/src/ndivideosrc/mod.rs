// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! NDI Video Source Element
//!
//! This module implements `ndivideosrc`, a live GStreamer source that
//! outputs the video of an NDI source on the network.
//!
//! ## Responsibilities
//! - Claims the video slot of the shared receiver for `device-path`
//! - Derives caps from the first received frame
//! - Timestamps buffers from the running time and repeats the last frame
//!   when the sender stalls
//! - Ends the stream with EOS when the sender changes format
//!
//! ## Properties (set before PAUSED state)
//! - `device-path`: URL address of the NDI source (e.g. "192.168.1.20:5961")
//! - `device-name`: Human readable NDI source name, informational
//!
//! ## Example Pipeline
//! ```bash
//! gst-launch-1.0 ndivideosrc device-path=192.168.1.20:5961 ! \
//!     videoconvert ! autovideosink
//! ```

use gst::glib;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;

/// Buffer production from the shared input queue
mod create_video;

/// Core implementation (properties, negotiation, GStreamer trait impls)
mod imp;

/// Unit tests for ndivideosrc
mod src_tests;

/// State structures (settings, claimed input, negotiated format)
mod state;

glib::wrapper! {
    pub struct NdiVideoSrc(ObjectSubclass<imp::NdiVideoSrc>) @extends gst_base::PushSrc, gst_base::BaseSrc, gst::Element, gst::Object;
}

/// Registers the ndivideosrc element with GStreamer.
///
/// # Arguments
/// * `plugin` - The parent plugin instance
pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        "ndivideosrc",
        gst::Rank::NONE,
        NdiVideoSrc::static_type(),
    )
}
