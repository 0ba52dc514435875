// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! # ndi-sys: Raw FFI declarations for the NDI SDK
//!
//! This crate declares the C types, constants and functions of the NDI SDK
//! that the GStreamer elements use. The SDK is never linked at build time:
//! [`NdiLib::new`] opens the vendor shared library with `libloading` and
//! resolves every symbol up front.
//!
//! ## Usage
//!
//! **Most users should NOT use this crate directly.** Use the safe `ndi`
//! wrapper crate instead, which provides RAII handles for finders,
//! receivers and senders.
//!
//! ## Safety
//!
//! All functions in this crate are `unsafe` and require the caller to uphold
//! the SDK's invariants:
//! - `initialize` must succeed before any other call
//! - Frames returned by `recv_capture_v2` must be released with the
//!   matching `recv_free_*` call on the same receiver
//! - Pointers must remain valid for the duration of the call

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::upper_case_acronyms)]

use std::ffi::OsStr;
use std::os::raw::{c_char, c_float, c_int, c_void};

use libloading::Library;

/// Shared library names searched for the NDI runtime.
#[cfg(all(target_arch = "x86_64", target_os = "windows"))]
pub const LIBRARY_NAMES: &[&str] = &["Processing.NDI.Lib.x64.dll"];
#[cfg(all(target_arch = "x86", target_os = "windows"))]
pub const LIBRARY_NAMES: &[&str] = &["Processing.NDI.Lib.x86.dll"];
#[cfg(target_os = "linux")]
pub const LIBRARY_NAMES: &[&str] = &["libndi.so.6", "libndi.so.5"];
#[cfg(target_os = "macos")]
pub const LIBRARY_NAMES: &[&str] = &["libndi.dylib"];
#[cfg(all(unix, not(any(target_os = "linux", target_os = "macos"))))]
pub const LIBRARY_NAMES: &[&str] = &["libndi.so"];

/// Environment variables naming the directory of an installed runtime,
/// newest SDK first.
pub const RUNTIME_DIR_ENV_VARS: &[&str] = &["NDI_RUNTIME_DIR_V6", "NDI_RUNTIME_DIR_V5"];

pub type NDIlib_find_instance_t = *mut c_void;
pub type NDIlib_recv_instance_t = *mut c_void;
pub type NDIlib_send_instance_t = *mut c_void;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_source_t {
    pub p_ndi_name: *const c_char,
    pub p_url_address: *const c_char,
}

impl Default for NDIlib_source_t {
    fn default() -> Self {
        Self {
            p_ndi_name: std::ptr::null(),
            p_url_address: std::ptr::null(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_find_create_t {
    pub show_local_sources: bool,
    pub p_groups: *const c_char,
    pub p_extra_ips: *const c_char,
}

pub type NDIlib_frame_type_e = c_int;
pub const NDIlib_frame_type_none: NDIlib_frame_type_e = 0;
pub const NDIlib_frame_type_video: NDIlib_frame_type_e = 1;
pub const NDIlib_frame_type_audio: NDIlib_frame_type_e = 2;
pub const NDIlib_frame_type_metadata: NDIlib_frame_type_e = 3;
pub const NDIlib_frame_type_error: NDIlib_frame_type_e = 4;
pub const NDIlib_frame_type_status_change: NDIlib_frame_type_e = 100;

pub type NDIlib_recv_bandwidth_e = c_int;
pub const NDIlib_recv_bandwidth_metadata_only: NDIlib_recv_bandwidth_e = -10;
pub const NDIlib_recv_bandwidth_audio_only: NDIlib_recv_bandwidth_e = 10;
pub const NDIlib_recv_bandwidth_lowest: NDIlib_recv_bandwidth_e = 0;
pub const NDIlib_recv_bandwidth_highest: NDIlib_recv_bandwidth_e = 100;

pub type NDIlib_recv_color_format_e = u32;
pub const NDIlib_recv_color_format_BGRX_BGRA: NDIlib_recv_color_format_e = 0;
pub const NDIlib_recv_color_format_UYVY_BGRA: NDIlib_recv_color_format_e = 1;
pub const NDIlib_recv_color_format_RGBX_RGBA: NDIlib_recv_color_format_e = 2;
pub const NDIlib_recv_color_format_UYVY_RGBA: NDIlib_recv_color_format_e = 3;
pub const NDIlib_recv_color_format_fastest: NDIlib_recv_color_format_e = 100;
pub const NDIlib_recv_color_format_best: NDIlib_recv_color_format_e = 101;

/// Packs four ASCII bytes into the little-endian FourCC code the SDK uses.
pub const fn make_fourcc(fourcc: &[u8; 4]) -> u32 {
    (fourcc[0] as u32)
        | ((fourcc[1] as u32) << 8)
        | ((fourcc[2] as u32) << 16)
        | ((fourcc[3] as u32) << 24)
}

pub type NDIlib_FourCC_video_type_e = u32;
pub const NDIlib_FourCC_video_type_UYVY: NDIlib_FourCC_video_type_e = make_fourcc(b"UYVY");
pub const NDIlib_FourCC_video_type_UYVA: NDIlib_FourCC_video_type_e = make_fourcc(b"UYVA");
pub const NDIlib_FourCC_video_type_P216: NDIlib_FourCC_video_type_e = make_fourcc(b"P216");
pub const NDIlib_FourCC_video_type_PA16: NDIlib_FourCC_video_type_e = make_fourcc(b"PA16");
pub const NDIlib_FourCC_video_type_YV12: NDIlib_FourCC_video_type_e = make_fourcc(b"YV12");
pub const NDIlib_FourCC_video_type_I420: NDIlib_FourCC_video_type_e = make_fourcc(b"I420");
pub const NDIlib_FourCC_video_type_NV12: NDIlib_FourCC_video_type_e = make_fourcc(b"NV12");
pub const NDIlib_FourCC_video_type_BGRA: NDIlib_FourCC_video_type_e = make_fourcc(b"BGRA");
pub const NDIlib_FourCC_video_type_BGRX: NDIlib_FourCC_video_type_e = make_fourcc(b"BGRX");
pub const NDIlib_FourCC_video_type_RGBA: NDIlib_FourCC_video_type_e = make_fourcc(b"RGBA");
pub const NDIlib_FourCC_video_type_RGBX: NDIlib_FourCC_video_type_e = make_fourcc(b"RGBX");

pub type NDIlib_frame_format_type_e = c_int;
pub const NDIlib_frame_format_type_interleaved: NDIlib_frame_format_type_e = 0;
pub const NDIlib_frame_format_type_progressive: NDIlib_frame_format_type_e = 1;
pub const NDIlib_frame_format_type_field_0: NDIlib_frame_format_type_e = 2;
pub const NDIlib_frame_format_type_field_1: NDIlib_frame_format_type_e = 3;

pub const NDIlib_send_timecode_synthesize: i64 = i64::MAX;
pub const NDIlib_recv_timestamp_undefined: i64 = i64::MAX;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_recv_create_v3_t {
    pub source_to_connect_to: NDIlib_source_t,
    pub color_format: NDIlib_recv_color_format_e,
    pub bandwidth: NDIlib_recv_bandwidth_e,
    pub allow_video_fields: bool,
    pub p_ndi_recv_name: *const c_char,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_send_create_t {
    pub p_ndi_name: *const c_char,
    pub p_groups: *const c_char,
    pub clock_video: bool,
    pub clock_audio: bool,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_metadata_frame_t {
    pub length: c_int,
    pub timecode: i64,
    pub p_data: *mut c_char,
}

impl Default for NDIlib_metadata_frame_t {
    fn default() -> Self {
        Self {
            length: 0,
            timecode: 0,
            p_data: std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_video_frame_v2_t {
    pub xres: c_int,
    pub yres: c_int,
    pub FourCC: NDIlib_FourCC_video_type_e,
    pub frame_rate_N: c_int,
    pub frame_rate_D: c_int,
    pub picture_aspect_ratio: c_float,
    pub frame_format_type: NDIlib_frame_format_type_e,
    pub timecode: i64,
    pub p_data: *mut u8,
    pub line_stride_or_data_size_in_bytes: c_int,
    pub p_metadata: *const c_char,
    pub timestamp: i64,
}

impl Default for NDIlib_video_frame_v2_t {
    fn default() -> Self {
        Self {
            xres: 0,
            yres: 0,
            FourCC: NDIlib_FourCC_video_type_UYVY,
            frame_rate_N: 30000,
            frame_rate_D: 1001,
            picture_aspect_ratio: 0.0,
            frame_format_type: NDIlib_frame_format_type_progressive,
            timecode: NDIlib_send_timecode_synthesize,
            p_data: std::ptr::null_mut(),
            line_stride_or_data_size_in_bytes: 0,
            p_metadata: std::ptr::null(),
            timestamp: 0,
        }
    }
}

/// Planar float audio as returned by `recv_capture_v2`.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_audio_frame_v2_t {
    pub sample_rate: c_int,
    pub no_channels: c_int,
    pub no_samples: c_int,
    pub timecode: i64,
    pub p_data: *mut c_float,
    pub channel_stride_in_bytes: c_int,
    pub p_metadata: *const c_char,
    pub timestamp: i64,
}

impl Default for NDIlib_audio_frame_v2_t {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            no_channels: 2,
            no_samples: 0,
            timecode: NDIlib_send_timecode_synthesize,
            p_data: std::ptr::null_mut(),
            channel_stride_in_bytes: 0,
            p_metadata: std::ptr::null(),
            timestamp: 0,
        }
    }
}

/// Interleaved float audio accepted by the sending utility function.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_audio_frame_interleaved_32f_t {
    pub sample_rate: c_int,
    pub no_channels: c_int,
    pub no_samples: c_int,
    pub timecode: i64,
    pub p_data: *mut c_float,
}

/// Declares the function table: one field per SDK symbol, the loader that
/// resolves them all, and an `unsafe` forwarding method per symbol.
macro_rules! ndi_functions {
    ($(
        $method:ident => $symbol:literal : fn($($arg:ident : $ty:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// Function table of a loaded NDI runtime.
        ///
        /// Every symbol is resolved when the table is created, so a missing
        /// function surfaces as a loading error instead of a failure at the
        /// first call.
        pub struct NdiLib {
            _library: Library,
            $($method: unsafe extern "C" fn($($ty),*) $(-> $ret)?,)*
        }

        impl NdiLib {
            /// Opens the shared library at `path` and resolves every symbol.
            ///
            /// # Safety
            /// Loading a library runs its initialisers; `path` must point to
            /// a genuine NDI runtime.
            pub unsafe fn new<P: AsRef<OsStr>>(path: P) -> Result<Self, libloading::Error> {
                let library = unsafe { Library::new(path)? };
                unsafe { Self::from_library(library) }
            }

            /// Resolves every symbol from an already opened library.
            ///
            /// # Safety
            /// The library must export the NDI SDK ABI declared in this crate.
            pub unsafe fn from_library(library: Library) -> Result<Self, libloading::Error> {
                $(
                    let $method = unsafe {
                        *library.get::<unsafe extern "C" fn($($ty),*) $(-> $ret)?>(
                            concat!($symbol, "\0").as_bytes(),
                        )?
                    };
                )*
                Ok(Self {
                    _library: library,
                    $($method,)*
                })
            }

            $(
                #[doc = concat!("Calls `", $symbol, "`.")]
                #[inline]
                pub unsafe fn $method(&self, $($arg: $ty),*) $(-> $ret)? {
                    unsafe { (self.$method)($($arg),*) }
                }
            )*
        }
    };
}

ndi_functions! {
    initialize => "NDIlib_initialize": fn() -> bool;
    destroy => "NDIlib_destroy": fn();

    find_create_v2 => "NDIlib_find_create_v2":
        fn(p_create_settings: *const NDIlib_find_create_t) -> NDIlib_find_instance_t;
    find_destroy => "NDIlib_find_destroy": fn(p_instance: NDIlib_find_instance_t);
    find_wait_for_sources => "NDIlib_find_wait_for_sources":
        fn(p_instance: NDIlib_find_instance_t, timeout_in_ms: u32) -> bool;
    find_get_current_sources => "NDIlib_find_get_current_sources":
        fn(p_instance: NDIlib_find_instance_t, p_no_sources: *mut u32) -> *const NDIlib_source_t;

    recv_create_v3 => "NDIlib_recv_create_v3":
        fn(p_create_settings: *const NDIlib_recv_create_v3_t) -> NDIlib_recv_instance_t;
    recv_destroy => "NDIlib_recv_destroy": fn(p_instance: NDIlib_recv_instance_t);
    recv_connect => "NDIlib_recv_connect":
        fn(p_instance: NDIlib_recv_instance_t, p_src: *const NDIlib_source_t);
    recv_capture_v2 => "NDIlib_recv_capture_v2":
        fn(
            p_instance: NDIlib_recv_instance_t,
            p_video_data: *mut NDIlib_video_frame_v2_t,
            p_audio_data: *mut NDIlib_audio_frame_v2_t,
            p_metadata: *mut NDIlib_metadata_frame_t,
            timeout_in_ms: u32,
        ) -> NDIlib_frame_type_e;
    recv_free_video_v2 => "NDIlib_recv_free_video_v2":
        fn(p_instance: NDIlib_recv_instance_t, p_video_data: *const NDIlib_video_frame_v2_t);
    recv_free_audio_v2 => "NDIlib_recv_free_audio_v2":
        fn(p_instance: NDIlib_recv_instance_t, p_audio_data: *const NDIlib_audio_frame_v2_t);
    recv_free_metadata => "NDIlib_recv_free_metadata":
        fn(p_instance: NDIlib_recv_instance_t, p_metadata: *const NDIlib_metadata_frame_t);

    send_create => "NDIlib_send_create":
        fn(p_create_settings: *const NDIlib_send_create_t) -> NDIlib_send_instance_t;
    send_destroy => "NDIlib_send_destroy": fn(p_instance: NDIlib_send_instance_t);
    send_send_video_v2 => "NDIlib_send_send_video_v2":
        fn(p_instance: NDIlib_send_instance_t, p_video_data: *const NDIlib_video_frame_v2_t);
    util_send_send_audio_interleaved_32f => "NDIlib_util_send_send_audio_interleaved_32f":
        fn(
            p_instance: NDIlib_send_instance_t,
            p_audio_data: *const NDIlib_audio_frame_interleaved_32f_t,
        );
}
