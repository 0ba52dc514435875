// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! NDI Video Source Implementation
//!
//! ## Implementation Structure
//! - `NdiVideoSrc`: settings plus the started state (claimed input, caps)
//! - `ObjectImpl`: `device-path` / `device-name` properties
//! - `ElementImpl`: metadata and the video src pad template
//! - `BaseSrcImpl`: start/stop, caps, fixate, latency, unlock
//! - `PushSrcImpl`: buffer production via `create_video`

use gst::glib;
use gst::prelude::*;
use gst::subclass::prelude::*;
use gst_base::prelude::*;
use gst_base::subclass::base_src::CreateSuccess;
use gst_base::subclass::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;
use tracing::trace;

use std::sync::Mutex;
use std::sync::LazyLock;

use crate::caps;
use crate::ndiinput::{InputRegistry, MediaKind};
use crate::ndivideosrc;
use crate::ndivideosrc::create_video::create_video;
use crate::ndivideosrc::state::{
    Context, DEFAULT_DEVICE_NAME, DEFAULT_DEVICE_PATH, FIRST_FRAME_TIMEOUT, Settings, State,
};

pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "ndivideosrc",
        gst::DebugColorFlags::empty(),
        Some("NDI Video Source"),
    )
});

#[derive(Default)]
pub struct NdiVideoSrc {
    pub settings: Mutex<Settings>,
    pub context: Mutex<Context>,
}

#[glib::object_subclass]
impl ObjectSubclass for NdiVideoSrc {
    const NAME: &'static str = "GstRsNdiVideoSrc";
    type Type = ndivideosrc::NdiVideoSrc;
    type ParentType = gst_base::PushSrc;
}

impl ObjectImpl for NdiVideoSrc {
    fn properties() -> &'static [glib::ParamSpec] {
        static PROPERTIES: LazyLock<Vec<glib::ParamSpec>> = LazyLock::new(|| {
            vec![
                glib::ParamSpecString::builder("device-path")
                    .nick("DevicePath")
                    .blurb("URL address of the NDI source")
                    .default_value(DEFAULT_DEVICE_PATH)
                    .mutable_ready()
                    .build(),
                glib::ParamSpecString::builder("device-name")
                    .nick("DeviceName")
                    .blurb("Name of the NDI source")
                    .default_value(DEFAULT_DEVICE_NAME)
                    .mutable_ready()
                    .build(),
            ]
        });

        PROPERTIES.as_ref()
    }

    fn constructed(&self) {
        self.parent_constructed();

        #[cfg(feature = "tracing")]
        {
            use tracing_subscriber::filter::LevelFilter;
            use tracing_subscriber::util::SubscriberInitExt;
            let _ = tracing_subscriber::fmt()
                .compact()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(false)
                .with_max_level(LevelFilter::TRACE)
                .with_ansi(true)
                .finish()
                .try_init();
        }

        let obj = self.obj();
        obj.set_live(true);
        obj.set_format(gst::Format::Time);
        obj.set_do_timestamp(true);
    }

    fn set_property(&self, _id: usize, value: &glib::Value, pspec: &glib::ParamSpec) {
        if let Ok(mut settings) = self.settings.lock() {
            match pspec.name() {
                "device-path" => match value.get::<Option<String>>() {
                    Ok(path) => {
                        gst::info!(
                            CAT,
                            imp = self,
                            "Changing device-path from {:?} to {:?}",
                            settings.device_path,
                            path
                        );
                        settings.device_path = path;
                    }
                    Err(_) => gst::error!(CAT, imp = self, "Invalid type for device-path property"),
                },
                "device-name" => match value.get::<Option<String>>() {
                    Ok(name) => settings.device_name = name,
                    Err(_) => gst::error!(CAT, imp = self, "Invalid type for device-name property"),
                },
                other => {
                    gst::error!(CAT, imp = self, "Unknown property '{}'", other);
                }
            }
        } else {
            gst::error!(CAT, imp = self, "Settings mutex poisoned, property change ignored");
        }
    }

    fn property(&self, _id: usize, pspec: &glib::ParamSpec) -> glib::Value {
        if let Ok(settings) = self.settings.lock() {
            match pspec.name() {
                "device-path" => settings.device_path.to_value(),
                "device-name" => settings.device_name.to_value(),
                _ => {
                    gst::error!(CAT, imp = self, "Unknown property {}", pspec.name());
                    glib::Value::from(&"")
                }
            }
        } else {
            gst::error!(CAT, imp = self, "Settings mutex poisoned");
            glib::Value::from(&"")
        }
    }
}

impl GstObjectImpl for NdiVideoSrc {}

impl ElementImpl for NdiVideoSrc {
    fn metadata() -> Option<&'static gst::subclass::ElementMetadata> {
        static ELEMENT_METADATA: LazyLock<gst::subclass::ElementMetadata> = LazyLock::new(|| {
            gst::subclass::ElementMetadata::new(
                "NDI Video Source",
                "Source/Video",
                "Receives video from an NDI source",
                "Contributors to the gst-ndi project",
            )
        });

        Some(&*ELEMENT_METADATA)
    }

    fn pad_templates() -> &'static [gst::PadTemplate] {
        static PAD_TEMPLATES: LazyLock<Result<Vec<gst::PadTemplate>, glib::BoolError>> =
            LazyLock::new(|| {
                let src_pad_template = gst::PadTemplate::new(
                    "src",
                    gst::PadDirection::Src,
                    gst::PadPresence::Always,
                    &caps::video_template_caps(),
                )?;

                Ok(vec![src_pad_template])
            });

        match PAD_TEMPLATES.as_ref() {
            Ok(templates) => templates,
            Err(err) => {
                trace!("Failed to create src pad template: {:?}", err);
                &[]
            }
        }
    }
}

impl BaseSrcImpl for NdiVideoSrc {
    /// Claims the input and waits for its first frame.
    ///
    /// # Returns
    /// * `Ok(())` once the first frame arrived; it sets the caps and is the
    ///   buffer repeated until the next one
    /// * `Err(ErrorMessage)` if `device-path` is unset, the input is busy or
    ///   cannot be connected, or no frame arrived within three seconds
    fn start(&self) -> Result<(), gst::ErrorMessage> {
        let device_path = self
            .settings
            .lock()
            .map_err(|e| {
                gst::error_msg!(gst::CoreError::Failed, ["Failed to lock settings mutex: {}", e])
            })?
            .device_path
            .clone()
            .filter(|path| !path.is_empty())
            .ok_or_else(|| gst::error_msg!(gst::ResourceError::Settings, ["device-path not set"]))?;

        let registry = self
            .context
            .lock()
            .map_err(|e| {
                gst::error_msg!(gst::CoreError::Failed, ["Failed to lock context mutex: {}", e])
            })?
            .registry
            .clone()
            .unwrap_or_else(InputRegistry::global);
        let handle = registry
            .acquire(&device_path, MediaKind::Video)
            .map_err(|e| gst::error_msg!(gst::ResourceError::OpenRead, ["{}", e]))?;

        // Dropping the handle on the error paths below releases the input.
        let input = handle.input().clone();
        let Some(first) = input.video_queue().pop_timeout(FIRST_FRAME_TIMEOUT) else {
            return Err(gst::error_msg!(
                gst::ResourceError::Read,
                ["No video from {} within {:?}", device_path, FIRST_FRAME_TIMEOUT]
            ));
        };
        let (format, last_buffer) = (first.format, first.buffer);

        let caps = format.caps().ok_or_else(|| {
            gst::error_msg!(
                gst::StreamError::Format,
                ["Unsupported video format {:?}", format.fourcc]
            )
        })?;
        gst::info!(CAT, imp = self, "Started with caps {} from {}", caps, input.id());

        let mut context = self.context.lock().map_err(|e| {
            gst::error_msg!(gst::CoreError::Failed, ["Failed to lock context mutex: {}", e])
        })?;
        context.state = Some(State {
            handle,
            format,
            caps,
            last_buffer,
            n_frames: 0,
            eos: false,
        });

        Ok(())
    }

    /// Releases the input; the last consumer disconnects the receiver.
    fn stop(&self) -> Result<(), gst::ErrorMessage> {
        let state = self
            .context
            .lock()
            .map_err(|e| {
                gst::error_msg!(gst::CoreError::Failed, ["Failed to lock context mutex: {}", e])
            })?
            .state
            .take();
        drop(state);

        gst::info!(CAT, imp = self, "Stopped");

        Ok(())
    }

    fn caps(&self, filter: Option<&gst::Caps>) -> Option<gst::Caps> {
        let caps = self
            .context
            .lock()
            .ok()
            .and_then(|context| context.state.as_ref().map(|state| state.caps.clone()))
            .unwrap_or_else(|| self.obj().src_pad().pad_template_caps());

        gst::debug!(CAT, imp = self, "Offering caps {}", caps);

        match filter {
            Some(filter) => Some(filter.intersect_with_mode(&caps, gst::CapsIntersectMode::First)),
            None => Some(caps),
        }
    }

    /// Picks the largest size and the rate closest to the sender's.
    fn fixate(&self, mut caps: gst::Caps) -> gst::Caps {
        let framerate = self
            .context
            .lock()
            .ok()
            .and_then(|context| {
                context
                    .state
                    .as_ref()
                    .map(|state| gst::Fraction::new(state.format.fps_n, state.format.fps_d.max(1)))
            })
            .unwrap_or_else(|| gst::Fraction::new(30, 1));

        caps.truncate();
        {
            let caps = caps.make_mut();
            if let Some(s) = caps.structure_mut(0) {
                s.fixate_field_nearest_int("width", i32::MAX);
                s.fixate_field_nearest_int("height", i32::MAX);
                if s.has_field("framerate") {
                    s.fixate_field_nearest_fraction("framerate", framerate);
                }
            }
        }

        self.parent_fixate(caps)
    }

    fn query(&self, query: &mut gst::QueryRef) -> bool {
        match query.view_mut() {
            gst::QueryViewMut::Latency(q) => {
                let Ok(context) = self.context.lock() else {
                    return false;
                };
                let Some(state) = context.state.as_ref() else {
                    gst::debug!(CAT, imp = self, "No input, can't answer latency query");
                    return false;
                };
                let min = state.format.latency();
                gst::debug!(CAT, imp = self, "Returning latency {} - {}", min, min * 5);
                q.set(true, min, min * 5);
                true
            }
            _ => BaseSrcImplExt::parent_query(self, query),
        }
    }

    fn unlock(&self) -> Result<(), gst::ErrorMessage> {
        gst::debug!(CAT, imp = self, "Unlocking");
        if let Ok(context) = self.context.lock() {
            if let Some(state) = context.state.as_ref() {
                state.handle.input().video_queue().set_flushing(true);
            }
        }

        Ok(())
    }

    fn unlock_stop(&self) -> Result<(), gst::ErrorMessage> {
        gst::debug!(CAT, imp = self, "Unlock stop");
        if let Ok(context) = self.context.lock() {
            if let Some(state) = context.state.as_ref() {
                state.handle.input().video_queue().set_flushing(false);
            }
        }

        Ok(())
    }
}

impl NdiVideoSrc {
    /// Makes start() claim inputs from `registry` instead of the global one.
    #[cfg(test)]
    pub(crate) fn set_registry(&self, registry: std::sync::Arc<InputRegistry>) {
        if let Ok(mut context) = self.context.lock() {
            context.registry = Some(registry);
        }
    }
}

impl PushSrcImpl for NdiVideoSrc {
    fn create(
        &self,
        _buffer: Option<&mut gst::BufferRef>,
    ) -> Result<CreateSuccess, gst::FlowError> {
        create_video(self).map(CreateSuccess::NewBuffer)
    }
}
