// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Video Buffer Creation for the NDI Source
//!
//! ## Strategy
//! 1. Wait up to one frame duration for the next frame of the input
//! 2. On timeout, repeat the last frame so downstream keeps its rate
//! 3. Timestamp with the running time plus one frame duration
//!
//! The context lock is not held while waiting, so `unlock()` can flush the
//! queue and wake this thread up.

use std::time::Duration;

use glib::subclass::types::ObjectSubclassExt;
use gst::prelude::*;
use gstreamer as gst;
use tracing::trace;

use crate::ndivideosrc::imp::{CAT, NdiVideoSrc};

/// Produces the next video buffer.
///
/// # Returns
/// * `Ok(buffer)` with a new or repeated frame
/// * `Err(FlowError::Eos)` once the sender changed its format
/// * `Err(FlowError::Flushing)` when unlocked or stopped while waiting
pub(crate) fn create_video(src: &NdiVideoSrc) -> Result<gst::Buffer, gst::FlowError> {
    let (input, duration) = {
        let context = src.context.lock().map_err(|_| gst::FlowError::Error)?;
        let state = context.state.as_ref().ok_or(gst::FlowError::Flushing)?;
        if state.eos {
            return Err(gst::FlowError::Eos);
        }
        (state.handle.input().clone(), state.format.buffer_duration())
    };

    let item = input
        .video_queue()
        .pop_timeout(Duration::from_nanos(duration.nseconds()));
    if item.is_none() && input.video_queue().is_flushing() {
        return Err(gst::FlowError::Flushing);
    }

    let mut context = src.context.lock().map_err(|_| gst::FlowError::Error)?;
    let state = context.state.as_mut().ok_or(gst::FlowError::Flushing)?;

    match item {
        Some(item) if item.format != state.format => {
            gst::info!(
                CAT,
                imp = src,
                "Video format changed from {:?} to {:?}, sending EOS",
                state.format,
                item.format
            );
            state.eos = true;
            return Err(gst::FlowError::Eos);
        }
        Some(item) => state.last_buffer = item.buffer,
        None => trace!("No frame within {}, repeating the last one", duration),
    }

    let pts = src.obj().current_running_time().map(|time| time + duration);

    let mut buffer = state.last_buffer.copy();
    {
        let buffer = buffer.make_mut();
        buffer.set_pts(pts);
        buffer.set_dts(gst::ClockTime::NONE);
        buffer.set_duration(duration);
        buffer.set_offset(state.n_frames);
        buffer.set_offset_end(state.n_frames + 1);
        if state.n_frames == 0 {
            buffer.set_flags(gst::BufferFlags::DISCONT);
        }
    }
    state.n_frames += 1;

    trace!(pts = ?buffer.pts(), frame = state.n_frames, "Produced buffer");

    Ok(buffer)
}
