// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

use ndi::{AudioFrameDesc, SendInstance, VideoFrameDesc};

use crate::ndioutput::{FrameSender, SenderFactory};

/// Creates senders through the process-wide NDI runtime.
pub struct NdiSenderFactory;

impl SenderFactory for NdiSenderFactory {
    fn create(&self, name: Option<&str>) -> Result<Box<dyn FrameSender>, ndi::Error> {
        let api = ndi::default_api()?;
        Ok(Box::new(SendInstance::new(api, name)?))
    }
}

impl FrameSender for SendInstance {
    fn send_video(&self, desc: &VideoFrameDesc, timecode: i64, data: &[u8]) -> Result<(), ndi::Error> {
        SendInstance::send_video(self, desc, timecode, data)
    }

    fn send_audio(&self, desc: &AudioFrameDesc, timecode: i64, samples: &[f32]) -> Result<(), ndi::Error> {
        self.send_audio_interleaved(desc, timecode, samples)
    }
}
