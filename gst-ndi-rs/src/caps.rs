// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Caps helpers shared by the NDI elements.

use std::sync::LazyLock;

use gstreamer as gst;
use gstreamer_video as gst_video;

use ndi::FrameFormat;

/// Raw video formats the elements negotiate on their pads.
pub(crate) const VIDEO_FORMATS: [gst_video::VideoFormat; 5] = [
    gst_video::VideoFormat::Uyvy,
    gst_video::VideoFormat::Bgra,
    gst_video::VideoFormat::Rgba,
    gst_video::VideoFormat::I420,
    gst_video::VideoFormat::Nv12,
];

/// Sample rates the audio elements accept.
pub(crate) const AUDIO_RATES: [i32; 3] = [44100, 48000, 96000];

/// Largest channel count the audio elements accept.
pub(crate) const MAX_AUDIO_CHANNELS: i32 = 16;

/// Reference timestamp caps of the sender timecode attached to buffers.
pub(crate) static TIMECODE_CAPS: LazyLock<gst::Caps> =
    LazyLock::new(|| gst::Caps::builder("timestamp/x-ndi-timecode").build());

/// `video/x-raw` in any of [`VIDEO_FORMATS`], any size and rate.
pub(crate) fn video_template_caps() -> gst::Caps {
    gst_video::VideoCapsBuilder::new()
        .format_list(VIDEO_FORMATS)
        .build()
}

/// Interleaved F32LE audio in the supported rates and channel counts.
pub(crate) fn audio_template_caps() -> gst::Caps {
    gst::Caps::builder("audio/x-raw")
        .field("format", "F32LE")
        .field("channels", gst::IntRange::new(1, MAX_AUDIO_CHANNELS))
        .field("rate", gst::List::new(AUDIO_RATES))
        .field("layout", "interleaved")
        .build()
}

/// GStreamer `interlace-mode` for a frame layout.
///
/// Single fields are delivered one per buffer, which GStreamer calls
/// "alternate".
pub(crate) fn interlace_mode(frame_format: FrameFormat) -> &'static str {
    match frame_format {
        FrameFormat::Progressive => "progressive",
        FrameFormat::Interleaved => "interleaved",
        FrameFormat::Field0 | FrameFormat::Field1 => "alternate",
    }
}

/// Pixel aspect ratio of a frame from its display aspect ratio.
///
/// # Arguments
/// * `width` - Frame width in pixels
/// * `height` - Frame height in lines
/// * `picture_aspect_ratio` - Display aspect ratio, 0 meaning square pixels
pub(crate) fn pixel_aspect_ratio(width: i32, height: i32, picture_aspect_ratio: f32) -> gst::Fraction {
    if picture_aspect_ratio == 0.0 || width <= 0 || height <= 0 {
        return gst::Fraction::new(1, 1);
    }
    let par = f64::from(height) * f64::from(picture_aspect_ratio) / f64::from(width);
    let (numer, denom) = double_to_fraction(par);
    gst::Fraction::new(numer, denom)
}

/// Approximates `value` with a small fraction using continued fractions.
///
/// Stops once the approximation is within 1e-5 or the terms get large,
/// so float noise such as `1.00000001` collapses to `1/1`.
/// `gst::Fraction::approximate_f64` keeps that noise and yields fractions
/// like `134217729/134217728` for the f32 ratios NDI senders announce.
pub(crate) fn double_to_fraction(value: f64) -> (i32, i32) {
    const MAX_TERMS: usize = 10;
    const MAX_DENOM: i64 = 100_000;
    const EPSILON: f64 = 1e-5;

    if !value.is_finite() || value <= 0.0 {
        return (1, 1);
    }

    // Convergents h/k of the continued fraction.
    let (mut h_prev, mut h) = (1i64, value.floor() as i64);
    let (mut k_prev, mut k) = (0i64, 1i64);
    let mut rest = value - value.floor();

    for _ in 0..MAX_TERMS {
        if (h as f64 / k as f64 - value).abs() < EPSILON * value || rest < 1e-12 {
            break;
        }
        let inverse = 1.0 / rest;
        let term = inverse.floor() as i64;
        let (h_next, k_next) = (term * h + h_prev, term * k + k_prev);
        if k_next > MAX_DENOM || h_next > i64::from(i32::MAX) {
            break;
        }
        (h_prev, h) = (h, h_next);
        (k_prev, k) = (k, k_next);
        rest = inverse - inverse.floor();
    }

    if h == 0 {
        return (1, 1);
    }
    (h as i32, k as i32)
}

/// Bitmask with the lowest `channels` bits set.
pub(crate) fn channel_mask(channels: i32) -> gst::Bitmask {
    let channels = channels.clamp(0, 63) as u32;
    gst::Bitmask::from((1u64 << channels) - 1)
}
