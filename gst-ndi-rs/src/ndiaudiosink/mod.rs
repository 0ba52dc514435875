// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! NDI Audio Sink Element
//!
//! `ndiaudiosink` publishes interleaved F32LE audio as an NDI source,
//! sharing the sender with an `ndivideosink` of the same `device-name`.
//!
//! ## Example Pipeline
//! ```bash
//! gst-launch-1.0 audiotestsrc is-live=true ! audio/x-raw,format=F32LE,rate=48000 ! \
//!     ndiaudiosink device-name="Test Pattern"
//! ```

use gst::glib;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;

/// Core implementation (properties, caps, rendering)
mod imp;


/// State structures (settings, claimed output)
mod state;

glib::wrapper! {
    pub struct NdiAudioSink(ObjectSubclass<imp::NdiAudioSink>) @extends gst_base::BaseSink, gst::Element, gst::Object;
}

pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        "ndiaudiosink",
        gst::Rank::NONE,
        NdiAudioSink::static_type(),
    )
}
