// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! NDI Audio Source Element
//!
//! `ndiaudiosrc` outputs the audio of an NDI source as interleaved F32LE.
//! It shares the network connection with an `ndivideosrc` reading the same
//! `device-path`.
//!
//! ## Properties (set before PAUSED state)
//! - `device-path`: URL address of the NDI source
//! - `device-name`: Human readable NDI source name, informational
//!
//! ## Example Pipeline
//! ```bash
//! gst-launch-1.0 ndiaudiosrc device-path=192.168.1.20:5961 ! \
//!     audioconvert ! autoaudiosink
//! ```

use gst::glib;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;

/// Buffer production from the shared input queue
mod create_audio;

/// Core implementation (properties, negotiation, GStreamer trait impls)
mod imp;

/// Unit tests for ndiaudiosrc
mod src_tests;

/// State structures (settings, claimed input, negotiated format)
mod state;

glib::wrapper! {
    pub struct NdiAudioSrc(ObjectSubclass<imp::NdiAudioSrc>) @extends gst_base::PushSrc, gst_base::BaseSrc, gst::Element, gst::Object;
}

pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        "ndiaudiosrc",
        gst::Rank::NONE,
        NdiAudioSrc::static_type(),
    )
}
