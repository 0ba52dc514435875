// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Audio Buffer Creation for the NDI Source
//!
//! Waits up to 100 ms for the next audio frame and emits silence of the
//! last frame's size when none arrives, so downstream keeps running while
//! the sender is quiet. If the first frame does not match what was
//! negotiated, caps are renegotiated once; a later format change ends the
//! stream.

use glib::subclass::types::ObjectSubclassExt;
use gst::prelude::*;
use gst_base::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;
use tracing::trace;

use crate::ndiaudiosrc::imp::{CAT, NdiAudioSrc};
use crate::ndiaudiosrc::state::FRAME_TIMEOUT;

pub(crate) fn create_audio(src: &NdiAudioSrc) -> Result<gst::Buffer, gst::FlowError> {
    let (input, format, received) = {
        let context = src.context.lock().map_err(|_| gst::FlowError::Error)?;
        let state = context.state.as_ref().ok_or(gst::FlowError::Flushing)?;
        if state.eos {
            return Err(gst::FlowError::Eos);
        }
        (state.handle.input().clone(), state.format, state.received)
    };

    let item = input.audio_queue().pop_timeout(FRAME_TIMEOUT);
    if item.is_none() && input.audio_queue().is_flushing() {
        return Err(gst::FlowError::Flushing);
    }

    // Not under the context lock: set_caps() takes it.
    if let Some(item) = &item {
        let matches = format.is_some_and(|f| f.same_caps(&item.format));
        if !matches && !received {
            let caps = item.format.caps();
            gst::info!(CAT, imp = src, "Renegotiating to {}", caps);
            src.obj()
                .set_caps(&caps)
                .map_err(|_| gst::FlowError::NotNegotiated)?;
        }
    }

    let mut context = src.context.lock().map_err(|_| gst::FlowError::Error)?;
    let state = context.state.as_mut().ok_or(gst::FlowError::Flushing)?;
    let format = state.format.ok_or(gst::FlowError::NotNegotiated)?;

    let mut buffer = match item {
        Some(item) if !format.same_caps(&item.format) => {
            gst::info!(
                CAT,
                imp = src,
                "Audio format changed from {:?} to {:?}, sending EOS",
                format,
                item.format
            );
            state.eos = true;
            return Err(gst::FlowError::Eos);
        }
        Some(item) => {
            state.last_size = item.buffer.size();
            state.received = true;
            item.buffer
        }
        None => {
            trace!("No audio within {:?}, sending {} bytes of silence", FRAME_TIMEOUT, state.last_size);
            gst::Buffer::from_mut_slice(vec![0u8; state.last_size])
        }
    };

    let bytes_per_sample = format.channels.max(1) as u64 * std::mem::size_of::<f32>() as u64;
    let samples = buffer.size() as u64 / bytes_per_sample;
    let duration = format.duration_of(buffer.size());
    let pts = src.obj().current_running_time().map(|time| time + duration);

    {
        let buffer = buffer.make_mut();
        buffer.set_pts(pts);
        buffer.set_dts(gst::ClockTime::NONE);
        buffer.set_duration(duration);
        buffer.set_offset(state.n_samples);
        buffer.set_offset_end(state.n_samples + samples);
        if state.n_samples == 0 {
            buffer.set_flags(gst::BufferFlags::DISCONT);
        }
    }
    state.n_samples += samples;

    trace!(pts = ?buffer.pts(), samples, "Produced buffer");

    Ok(buffer)
}
