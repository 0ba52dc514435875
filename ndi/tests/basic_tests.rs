// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Tests for the parts of the wrapper that do not need a live runtime:
//! payload layout, audio interleaving and library discovery.

use std::ffi::OsString;
use std::path::PathBuf;

use ndi::config::library_candidates_with;
use ndi::{FourCC, FrameFormat, interleave_planar};
use tracing::info;

/// Ensures logging is initialized only once across all tests.
static LOG_ONCE: std::sync::Once = std::sync::Once::new();

fn setup_test() {
    LOG_ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    });
}

#[test]
fn fourcc_round_trips_known_codes() {
    setup_test();
    for fourcc in [
        FourCC::Uyvy,
        FourCC::Uyva,
        FourCC::P216,
        FourCC::Pa16,
        FourCC::Yv12,
        FourCC::I420,
        FourCC::Nv12,
        FourCC::Bgra,
        FourCC::Bgrx,
        FourCC::Rgba,
        FourCC::Rgbx,
    ] {
        assert_eq!(FourCC::from_raw(fourcc.to_raw()), fourcc);
    }
    assert_eq!(FourCC::from_raw(0x1234_5678), FourCC::Unknown(0x1234_5678));
}

#[test]
fn payload_size_accounts_for_planes() {
    setup_test();
    assert_eq!(FourCC::Uyvy.payload_size(3840, 1920, 1080), 3840 * 1080);
    assert_eq!(FourCC::Bgra.payload_size(7680, 1920, 1080), 7680 * 1080);
    assert_eq!(FourCC::I420.payload_size(1920, 1920, 1080), 1920 * 1080 * 3 / 2);
    assert_eq!(FourCC::Nv12.payload_size(1920, 1920, 1080), 1920 * 1080 * 3 / 2);
    assert_eq!(
        FourCC::Uyva.payload_size(3840, 1920, 1080),
        3840 * 1080 + 1920 * 1080
    );
    assert_eq!(FourCC::P216.payload_size(3840, 1920, 1080), 3840 * 1080 * 2);
    // Odd heights round the chroma plane up.
    assert_eq!(FourCC::Nv12.payload_size(4, 4, 3), 4 * 3 + 4 * 2);
}

#[test]
fn frame_format_maps_sdk_values() {
    setup_test();
    assert_eq!(FrameFormat::from_raw(0), FrameFormat::Interleaved);
    assert_eq!(FrameFormat::from_raw(1), FrameFormat::Progressive);
    assert_eq!(FrameFormat::from_raw(2), FrameFormat::Field0);
    assert_eq!(FrameFormat::from_raw(3), FrameFormat::Field1);
    assert_eq!(FrameFormat::Field1.to_raw(), 3);
}

#[test]
fn interleave_uses_channel_stride() {
    setup_test();
    // Two channels of three samples, planes padded to a stride of four.
    let planar = [1.0, 2.0, 3.0, -1.0, 10.0, 20.0, 30.0];
    let interleaved = interleave_planar(&planar, 2, 3, 4);
    info!("interleaved: {:?}", interleaved);
    assert_eq!(interleaved, vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
}

#[test]
fn interleave_mono_ignores_stride() {
    setup_test();
    let planar = [0.5, 0.25];
    assert_eq!(interleave_planar(&planar, 1, 2, 99), vec![0.5, 0.25]);
}

#[test]
fn candidates_prefer_runtime_dirs() {
    setup_test();
    let candidates = library_candidates_with(|var| match var {
        "NDI_RUNTIME_DIR_V6" => Some(OsString::from("/opt/ndi6")),
        _ => None,
    });
    let first = candidates.first().cloned().unwrap_or_default();
    assert!(first.starts_with("/opt/ndi6"));
    let bare = ndi_sys::LIBRARY_NAMES
        .iter()
        .map(PathBuf::from)
        .collect::<Vec<_>>();
    assert!(candidates.ends_with(&bare));
}

#[test]
fn candidates_fall_back_to_bare_names() {
    setup_test();
    let candidates = library_candidates_with(|_| None);
    assert_eq!(candidates.len(), ndi_sys::LIBRARY_NAMES.len());
}

#[test]
fn loading_from_bogus_path_fails() {
    setup_test();
    assert!(ndi::load_api("/nonexistent/libndi.so.6").is_err());
}
