// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Receiving frames from a remote source.
//!
//! [`RecvInstance::capture`] hands out frames that borrow the receiver and
//! return their memory to the SDK when dropped, so a frame can never outlive
//! the connection it came from.

use std::ffi::CString;

use tracing::trace;

use crate::frame::interleave_planar;
use crate::{Error, FourCC, FrameFormat, NdiApiHandle, Result};

/// RAII wrapper around an `NDIlib_recv_instance_t`.
pub struct RecvInstance {
    api: NdiApiHandle,
    instance: ndi_sys::NDIlib_recv_instance_t,
}

// Safety: a receiver may be captured from any single thread; frames borrow
// it so they cannot be freed concurrently with its destruction.
unsafe impl Send for RecvInstance {}

impl RecvInstance {
    /// Creates a receiver and connects it to the source at `url_address`.
    ///
    /// The receiver asks for UYVY (or BGRA when the source has alpha) at the
    /// highest bandwidth, with fields merged into full frames.
    pub fn connect(api: NdiApiHandle, url_address: &str) -> Result<Self> {
        let url = CString::new(url_address)?;
        let source = ndi_sys::NDIlib_source_t {
            p_ndi_name: std::ptr::null(),
            p_url_address: url.as_ptr(),
        };
        let settings = ndi_sys::NDIlib_recv_create_v3_t {
            source_to_connect_to: ndi_sys::NDIlib_source_t::default(),
            color_format: ndi_sys::NDIlib_recv_color_format_UYVY_BGRA,
            bandwidth: ndi_sys::NDIlib_recv_bandwidth_highest,
            allow_video_fields: false,
            p_ndi_recv_name: std::ptr::null(),
        };

        let instance = unsafe { api.lib().recv_create_v3(&settings) };
        if instance.is_null() {
            return Err(Error::CreateFailed("receiver"));
        }
        unsafe { api.lib().recv_connect(instance, &source) };
        trace!("Connected receiver to {}", url_address);

        Ok(Self { api, instance })
    }

    /// Waits up to `timeout_ms` for the next video or audio frame.
    ///
    /// # Returns
    /// * `Ok(Some(frame))` when a frame arrived
    /// * `Ok(None)` on timeout, metadata or a status change
    /// * `Err(Error::Capture)` when the SDK reports an error frame
    pub fn capture(&self, timeout_ms: u32) -> Result<Option<Frame<'_>>> {
        let mut video = ndi_sys::NDIlib_video_frame_v2_t::default();
        let mut audio = ndi_sys::NDIlib_audio_frame_v2_t::default();
        let mut metadata = ndi_sys::NDIlib_metadata_frame_t::default();

        let frame_type = unsafe {
            self.api.lib().recv_capture_v2(
                self.instance,
                &mut video,
                &mut audio,
                &mut metadata,
                timeout_ms,
            )
        };

        match frame_type {
            ndi_sys::NDIlib_frame_type_video => Ok(Some(Frame::Video(VideoFrame {
                recv: self,
                frame: video,
            }))),
            ndi_sys::NDIlib_frame_type_audio => Ok(Some(Frame::Audio(AudioFrame {
                recv: self,
                frame: audio,
            }))),
            ndi_sys::NDIlib_frame_type_metadata => {
                unsafe { self.api.lib().recv_free_metadata(self.instance, &metadata) };
                Ok(None)
            }
            ndi_sys::NDIlib_frame_type_error => Err(Error::Capture),
            _ => Ok(None),
        }
    }
}

impl Drop for RecvInstance {
    fn drop(&mut self) {
        unsafe { self.api.lib().recv_destroy(self.instance) };
    }
}

/// A captured frame.
pub enum Frame<'a> {
    Video(VideoFrame<'a>),
    Audio(AudioFrame<'a>),
}

/// A captured video frame, released back to the receiver on drop.
pub struct VideoFrame<'a> {
    recv: &'a RecvInstance,
    frame: ndi_sys::NDIlib_video_frame_v2_t,
}

impl VideoFrame<'_> {
    pub fn width(&self) -> i32 {
        self.frame.xres
    }

    pub fn height(&self) -> i32 {
        self.frame.yres
    }

    pub fn fourcc(&self) -> FourCC {
        FourCC::from_raw(self.frame.FourCC)
    }

    /// Frame rate as numerator and denominator.
    pub fn frame_rate(&self) -> (i32, i32) {
        (self.frame.frame_rate_N, self.frame.frame_rate_D)
    }

    /// Display aspect ratio, 0 meaning square pixels.
    pub fn picture_aspect_ratio(&self) -> f32 {
        self.frame.picture_aspect_ratio
    }

    pub fn frame_format(&self) -> FrameFormat {
        FrameFormat::from_raw(self.frame.frame_format_type)
    }

    pub fn line_stride(&self) -> i32 {
        self.frame.line_stride_or_data_size_in_bytes
    }

    /// Sender timecode in 100 ns units.
    pub fn timecode(&self) -> i64 {
        self.frame.timecode
    }

    /// The whole payload including any chroma and alpha planes.
    pub fn data(&self) -> &[u8] {
        if self.frame.p_data.is_null() {
            return &[];
        }
        let size = self.fourcc().payload_size(
            self.line_stride().max(0) as usize,
            self.width().max(0) as usize,
            self.height().max(0) as usize,
        );
        unsafe { std::slice::from_raw_parts(self.frame.p_data, size) }
    }
}

impl Drop for VideoFrame<'_> {
    fn drop(&mut self) {
        unsafe {
            self.recv
                .api
                .lib()
                .recv_free_video_v2(self.recv.instance, &self.frame)
        };
    }
}

/// A captured planar float audio frame, released back to the receiver on drop.
pub struct AudioFrame<'a> {
    recv: &'a RecvInstance,
    frame: ndi_sys::NDIlib_audio_frame_v2_t,
}

impl AudioFrame<'_> {
    pub fn sample_rate(&self) -> i32 {
        self.frame.sample_rate
    }

    pub fn channels(&self) -> i32 {
        self.frame.no_channels
    }

    /// Samples per channel.
    pub fn samples(&self) -> i32 {
        self.frame.no_samples
    }

    /// Distance between channel planes in bytes, 0 for mono.
    pub fn channel_stride(&self) -> i32 {
        if self.frame.no_channels == 1 {
            0
        } else {
            self.frame.channel_stride_in_bytes
        }
    }

    /// Sender timecode in 100 ns units.
    pub fn timecode(&self) -> i64 {
        self.frame.timecode
    }

    /// Returns the samples interleaved channel by channel.
    pub fn interleaved(&self) -> Vec<f32> {
        let channels = self.channels().max(0) as usize;
        let samples = self.samples().max(0) as usize;
        if self.frame.p_data.is_null() || channels == 0 || samples == 0 {
            return Vec::new();
        }

        let stride = self.channel_stride().max(0) as usize / std::mem::size_of::<f32>();
        let len = if channels == 1 {
            samples
        } else {
            stride * (channels - 1) + samples
        };
        let planar = unsafe { std::slice::from_raw_parts(self.frame.p_data, len) };
        interleave_planar(planar, channels, samples, stride)
    }
}

impl Drop for AudioFrame<'_> {
    fn drop(&mut self) {
        unsafe {
            self.recv
                .api
                .lib()
                .recv_free_audio_v2(self.recv.instance, &self.frame)
        };
    }
}
