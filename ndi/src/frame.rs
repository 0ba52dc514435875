// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Frame descriptions shared by the receive and send paths.

use ndi_sys::*;

/// Pixel layout of a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FourCC {
    Uyvy,
    Uyva,
    P216,
    Pa16,
    Yv12,
    I420,
    Nv12,
    Bgra,
    Bgrx,
    Rgba,
    Rgbx,
    /// A code this crate does not know how to lay out.
    Unknown(u32),
}

impl FourCC {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            NDIlib_FourCC_video_type_UYVY => FourCC::Uyvy,
            NDIlib_FourCC_video_type_UYVA => FourCC::Uyva,
            NDIlib_FourCC_video_type_P216 => FourCC::P216,
            NDIlib_FourCC_video_type_PA16 => FourCC::Pa16,
            NDIlib_FourCC_video_type_YV12 => FourCC::Yv12,
            NDIlib_FourCC_video_type_I420 => FourCC::I420,
            NDIlib_FourCC_video_type_NV12 => FourCC::Nv12,
            NDIlib_FourCC_video_type_BGRA => FourCC::Bgra,
            NDIlib_FourCC_video_type_BGRX => FourCC::Bgrx,
            NDIlib_FourCC_video_type_RGBA => FourCC::Rgba,
            NDIlib_FourCC_video_type_RGBX => FourCC::Rgbx,
            other => FourCC::Unknown(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            FourCC::Uyvy => NDIlib_FourCC_video_type_UYVY,
            FourCC::Uyva => NDIlib_FourCC_video_type_UYVA,
            FourCC::P216 => NDIlib_FourCC_video_type_P216,
            FourCC::Pa16 => NDIlib_FourCC_video_type_PA16,
            FourCC::Yv12 => NDIlib_FourCC_video_type_YV12,
            FourCC::I420 => NDIlib_FourCC_video_type_I420,
            FourCC::Nv12 => NDIlib_FourCC_video_type_NV12,
            FourCC::Bgra => NDIlib_FourCC_video_type_BGRA,
            FourCC::Bgrx => NDIlib_FourCC_video_type_BGRX,
            FourCC::Rgba => NDIlib_FourCC_video_type_RGBA,
            FourCC::Rgbx => NDIlib_FourCC_video_type_RGBX,
            FourCC::Unknown(raw) => raw,
        }
    }

    /// The GStreamer raw video format name of this layout, if it has one.
    pub fn name(self) -> Option<&'static str> {
        match self {
            FourCC::Uyvy => Some("UYVY"),
            FourCC::Uyva => Some("UYVA"),
            FourCC::P216 => Some("P216"),
            FourCC::Pa16 => Some("PA16"),
            FourCC::Yv12 => Some("YV12"),
            FourCC::I420 => Some("I420"),
            FourCC::Nv12 => Some("NV12"),
            FourCC::Bgra => Some("BGRA"),
            FourCC::Bgrx => Some("BGRx"),
            FourCC::Rgba => Some("RGBA"),
            FourCC::Rgbx => Some("RGBx"),
            FourCC::Unknown(_) => None,
        }
    }

    /// Total payload size in bytes of one frame.
    ///
    /// Planar layouts carry their chroma (and alpha) planes after the luma
    /// plane, so the size is more than `stride * height` for them.
    ///
    /// # Arguments
    /// * `stride` - Line stride of the first plane in bytes
    /// * `width` - Frame width in pixels
    /// * `height` - Frame height in lines
    pub fn payload_size(self, stride: usize, width: usize, height: usize) -> usize {
        let luma = stride * height;
        let half_height = height.div_ceil(2);
        match self {
            FourCC::Uyvy | FourCC::Bgra | FourCC::Bgrx | FourCC::Rgba | FourCC::Rgbx => luma,
            FourCC::Uyva => luma + width * height,
            FourCC::I420 | FourCC::Yv12 => luma + 2 * (stride / 2) * half_height,
            FourCC::Nv12 => luma + stride * half_height,
            FourCC::P216 => luma * 2,
            FourCC::Pa16 => luma * 3,
            FourCC::Unknown(_) => luma,
        }
    }
}

/// Field layout of a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameFormat {
    Progressive,
    Interleaved,
    Field0,
    Field1,
}

impl FrameFormat {
    pub fn from_raw(raw: NDIlib_frame_format_type_e) -> Self {
        match raw {
            NDIlib_frame_format_type_interleaved => FrameFormat::Interleaved,
            NDIlib_frame_format_type_field_0 => FrameFormat::Field0,
            NDIlib_frame_format_type_field_1 => FrameFormat::Field1,
            _ => FrameFormat::Progressive,
        }
    }

    pub fn to_raw(self) -> NDIlib_frame_format_type_e {
        match self {
            FrameFormat::Progressive => NDIlib_frame_format_type_progressive,
            FrameFormat::Interleaved => NDIlib_frame_format_type_interleaved,
            FrameFormat::Field0 => NDIlib_frame_format_type_field_0,
            FrameFormat::Field1 => NDIlib_frame_format_type_field_1,
        }
    }
}

/// Interleaves planar float audio.
///
/// # Arguments
/// * `planar` - All planes, each starting `stride` floats after the previous
/// * `channels` - Number of planes
/// * `samples` - Samples per plane
/// * `stride` - Distance between planes in floats (ignored for mono)
///
/// # Returns
/// `samples * channels` floats ordered sample by sample.
pub fn interleave_planar(planar: &[f32], channels: usize, samples: usize, stride: usize) -> Vec<f32> {
    let mut interleaved = vec![0.0f32; samples * channels];
    for channel in 0..channels {
        let offset = if channels == 1 { 0 } else { channel * stride };
        let Some(plane) = planar.get(offset..offset + samples) else {
            continue;
        };
        for (sample, value) in plane.iter().enumerate() {
            interleaved[sample * channels + channel] = *value;
        }
    }
    interleaved
}

/// Parameters of a video frame to send.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrameDesc {
    pub width: i32,
    pub height: i32,
    pub fourcc: FourCC,
    pub frame_rate_n: i32,
    pub frame_rate_d: i32,
    pub picture_aspect_ratio: f32,
    pub frame_format: FrameFormat,
    pub line_stride: i32,
}

/// Parameters of an interleaved float audio frame to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFrameDesc {
    pub sample_rate: i32,
    pub channels: i32,
}
