// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! [`FrameSource`] over a real NDI receiver.

use std::time::Duration;

use gstreamer as gst;
use ndi::{Frame, RecvInstance};

use crate::caps::TIMECODE_CAPS;
use crate::ndiinput::{
    AudioFormat, AudioItem, CapturedFrame, Connector, FrameSource, VideoFormat, VideoItem,
};

/// Connects receivers through the process-wide NDI runtime.
pub struct NdiConnector;

impl Connector for NdiConnector {
    fn connect(&self, id: &str) -> Result<Box<dyn FrameSource>, ndi::Error> {
        let api = ndi::default_api()?;
        let recv = RecvInstance::connect(api, id)?;
        Ok(Box::new(recv))
    }
}

/// Attaches the sender timecode (100 ns units) as a reference timestamp.
///
/// Negative timecodes and the synthesize marker carry no time and are skipped.
pub(crate) fn add_timecode_meta(buffer: &mut gst::BufferRef, timecode: i64) {
    if !(0..ndi::TIMECODE_SYNTHESIZE).contains(&timecode) {
        return;
    }
    let Some(nseconds) = (timecode as u64).checked_mul(100) else {
        return;
    };
    gst::ReferenceTimestampMeta::add(
        buffer,
        &TIMECODE_CAPS,
        gst::ClockTime::from_nseconds(nseconds),
        gst::ClockTime::NONE,
    );
}

impl FrameSource for RecvInstance {
    fn capture(&mut self, timeout: Duration) -> Result<Option<CapturedFrame>, ndi::Error> {
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let frame = match RecvInstance::capture(self, timeout_ms)? {
            Some(frame) => frame,
            None => return Ok(None),
        };

        let captured = match frame {
            Frame::Video(video) => {
                let (fps_n, fps_d) = video.frame_rate();
                let format = VideoFormat {
                    width: video.width(),
                    height: video.height(),
                    fps_n,
                    fps_d,
                    picture_aspect_ratio: video.picture_aspect_ratio(),
                    fourcc: video.fourcc(),
                    frame_format: video.frame_format(),
                    stride: video.line_stride(),
                };
                let mut buffer = gst::Buffer::from_slice(video.data().to_vec());
                add_timecode_meta(buffer.make_mut(), video.timecode());
                CapturedFrame::Video(VideoItem { format, buffer })
            }
            Frame::Audio(audio) => {
                let format = AudioFormat {
                    channels: audio.channels(),
                    rate: audio.sample_rate(),
                    samples: audio.samples(),
                };
                let bytes = audio
                    .interleaved()
                    .into_iter()
                    .flat_map(f32::to_le_bytes)
                    .collect::<Vec<u8>>();
                let mut buffer = gst::Buffer::from_slice(bytes);
                add_timecode_meta(buffer.make_mut(), audio.timecode());
                CapturedFrame::Audio(AudioItem { format, buffer })
            }
        };

        Ok(Some(captured))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timecode_becomes_reference_timestamp() {
        gst::init().unwrap();
        let mut buffer = gst::Buffer::with_size(4).unwrap();
        add_timecode_meta(buffer.make_mut(), 12_345);

        let meta = buffer.meta::<gst::ReferenceTimestampMeta>().unwrap();
        assert_eq!(meta.timestamp(), gst::ClockTime::from_nseconds(1_234_500));
        assert_eq!(meta.reference().to_string(), "timestamp/x-ndi-timecode");
    }

    #[test]
    fn unset_timecodes_add_no_meta() {
        gst::init().unwrap();
        let mut buffer = gst::Buffer::with_size(4).unwrap();
        add_timecode_meta(buffer.make_mut(), ndi::TIMECODE_SYNTHESIZE);
        add_timecode_meta(buffer.make_mut(), -1);

        assert!(buffer.meta::<gst::ReferenceTimestampMeta>().is_none());
    }
}
