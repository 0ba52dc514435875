// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! NDI Device Provider
//!
//! Lists the NDI sources on the network as GStreamer devices so that
//! `gst-device-monitor-1.0` and applications can discover them. Every
//! source is offered twice: once as a `Video/Source` creating an
//! `ndivideosrc`, once as an `Audio/Source` creating an `ndiaudiosrc`.
//!
//! ## Device properties
//! - `device.api`: always `NDI`
//! - `device.strid`: url address of the source
//! - `device.friendlyName`: NDI name of the source

use gst::glib;
use gst::prelude::*;
use gstreamer as gst;

/// Source discovery thread and change diffing
pub(crate) mod finder;

/// Provider and device implementations
mod imp;


glib::wrapper! {
    pub struct NdiDeviceProvider(ObjectSubclass<imp::NdiDeviceProvider>) @extends gst::DeviceProvider, gst::Object;
}

glib::wrapper! {
    pub struct NdiDevice(ObjectSubclass<imp::NdiDevice>) @extends gst::Device, gst::Object;
}

/// Registers the provider, ranked so device monitors pick it up.
pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::DeviceProvider::register(
        Some(plugin),
        "ndideviceprovider",
        gst::Rank::SECONDARY,
        NdiDeviceProvider::static_type(),
    )
}
