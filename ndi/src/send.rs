// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Publishing frames as an NDI source.

use std::ffi::CString;

use tracing::trace;

use crate::{AudioFrameDesc, Error, NdiApiHandle, Result, VideoFrameDesc};

/// Timecode value asking the SDK to fill in the current time.
pub const TIMECODE_SYNTHESIZE: i64 = ndi_sys::NDIlib_send_timecode_synthesize;

/// RAII wrapper around an `NDIlib_send_instance_t`.
pub struct SendInstance {
    api: NdiApiHandle,
    instance: ndi_sys::NDIlib_send_instance_t,
    // The SDK keeps pointing at the name for the sender's lifetime.
    _name: Option<CString>,
}

// Safety: the SDK allows sending video and audio from different threads.
unsafe impl Send for SendInstance {}
unsafe impl Sync for SendInstance {}

impl SendInstance {
    /// Creates a sender announced under `name`.
    ///
    /// Clocking is disabled: frames are sent as soon as GStreamer renders
    /// them, the pipeline clock already paces the stream.
    ///
    /// # Arguments
    /// * `api` - Loaded runtime
    /// * `name` - Source name on the network; the SDK picks one when `None`
    pub fn new(api: NdiApiHandle, name: Option<&str>) -> Result<Self> {
        let name = name.map(CString::new).transpose()?;
        let settings = ndi_sys::NDIlib_send_create_t {
            p_ndi_name: name.as_ref().map_or(std::ptr::null(), |n| n.as_ptr()),
            p_groups: std::ptr::null(),
            clock_video: false,
            clock_audio: false,
        };

        let instance = unsafe { api.lib().send_create(&settings) };
        if instance.is_null() {
            return Err(Error::CreateFailed("sender"));
        }

        Ok(Self {
            api,
            instance,
            _name: name,
        })
    }

    /// Sends one video frame synchronously.
    ///
    /// # Arguments
    /// * `desc` - Frame geometry and format
    /// * `timecode` - Timecode in 100 ns units
    /// * `data` - Frame payload laid out as `desc` describes
    pub fn send_video(&self, desc: &VideoFrameDesc, timecode: i64, data: &[u8]) -> Result<()> {
        let expected = desc.fourcc.payload_size(
            desc.line_stride.max(0) as usize,
            desc.width.max(0) as usize,
            desc.height.max(0) as usize,
        );
        if data.len() < expected {
            return Err(Error::Other(format!(
                "video payload too small: {} < {}",
                data.len(),
                expected
            )));
        }

        let frame = ndi_sys::NDIlib_video_frame_v2_t {
            xres: desc.width,
            yres: desc.height,
            FourCC: desc.fourcc.to_raw(),
            frame_rate_N: desc.frame_rate_n,
            frame_rate_D: desc.frame_rate_d,
            picture_aspect_ratio: desc.picture_aspect_ratio,
            frame_format_type: desc.frame_format.to_raw(),
            timecode,
            // The SDK only reads from the payload when sending.
            p_data: data.as_ptr() as *mut u8,
            line_stride_or_data_size_in_bytes: desc.line_stride,
            p_metadata: std::ptr::null(),
            timestamp: 0,
        };
        unsafe { self.api.lib().send_send_video_v2(self.instance, &frame) };
        trace!("Sent video frame, timecode {}", timecode);
        Ok(())
    }

    /// Sends one interleaved float audio frame.
    ///
    /// The number of samples per channel is derived from `samples.len()`.
    pub fn send_audio_interleaved(
        &self,
        desc: &AudioFrameDesc,
        timecode: i64,
        samples: &[f32],
    ) -> Result<()> {
        if desc.channels <= 0 {
            return Err(Error::Other("audio frame without channels".to_string()));
        }
        let no_samples = samples.len() / desc.channels as usize;

        let frame = ndi_sys::NDIlib_audio_frame_interleaved_32f_t {
            sample_rate: desc.sample_rate,
            no_channels: desc.channels,
            no_samples: no_samples as i32,
            timecode,
            p_data: samples.as_ptr() as *mut f32,
        };
        unsafe {
            self.api
                .lib()
                .util_send_send_audio_interleaved_32f(self.instance, &frame)
        };
        trace!("Sent {} audio samples, timecode {}", no_samples, timecode);
        Ok(())
    }
}

impl Drop for SendInstance {
    fn drop(&mut self) {
        unsafe { self.api.lib().send_destroy(self.instance) };
    }
}
