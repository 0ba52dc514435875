// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! NDI Video Sink Element
//!
//! `ndivideosink` publishes the video it renders as an NDI source. A
//! `ndiaudiosink` with the same `device-name` shares the sender.
//!
//! ## Properties (set before PAUSED state)
//! - `device-name`: Name announced on the network; the SDK picks one if unset
//!
//! ## Example Pipeline
//! ```bash
//! gst-launch-1.0 videotestsrc is-live=true ! video/x-raw,format=UYVY ! \
//!     ndivideosink device-name="Test Pattern"
//! ```

use gst::glib;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;
use gstreamer_video as gst_video;

/// Core implementation (properties, caps, frame sending)
mod imp;


/// State structures (settings, claimed output)
mod state;

glib::wrapper! {
    pub struct NdiVideoSink(ObjectSubclass<imp::NdiVideoSink>) @extends gst_video::VideoSink, gst_base::BaseSink, gst::Element, gst::Object;
}

/// Registers the ndivideosink element with GStreamer.
pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        "ndivideosink",
        gst::Rank::NONE,
        NdiVideoSink::static_type(),
    )
}
