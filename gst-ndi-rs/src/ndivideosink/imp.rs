// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! NDI Video Sink Implementation
//!
//! `VideoSink` subclass: the base class handles synchronisation against the
//! pipeline clock and calls `show_frame()` when a buffer is due, which is
//! when it is handed to the NDI sender.

use gst::glib;
use gst::prelude::*;
use gst::subclass::prelude::*;
use gst_base::subclass::prelude::*;
use gst_video::subclass::prelude::*;
use gstreamer as gst;
use gstreamer_video as gst_video;
use tracing::trace;

use std::sync::LazyLock;
use std::sync::Mutex;

use crate::caps;
use crate::ndiinput::MediaKind;
use crate::ndioutput::OutputRegistry;
use crate::ndivideosink;
use crate::ndivideosink::state::{Context, DEFAULT_DEVICE_NAME, Settings};

pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "ndivideosink",
        gst::DebugColorFlags::empty(),
        Some("NDI Video Sink"),
    )
});

#[derive(Default)]
pub struct NdiVideoSink {
    pub settings: Mutex<Settings>,
    pub context: Mutex<Context>,
}

#[glib::object_subclass]
impl ObjectSubclass for NdiVideoSink {
    const NAME: &'static str = "GstRsNdiVideoSink";
    type Type = ndivideosink::NdiVideoSink;
    type ParentType = gst_video::VideoSink;
}

impl ObjectImpl for NdiVideoSink {
    fn properties() -> &'static [glib::ParamSpec] {
        static PROPERTIES: LazyLock<Vec<glib::ParamSpec>> = LazyLock::new(|| {
            vec![
                glib::ParamSpecString::builder("device-name")
                    .nick("DeviceName")
                    .blurb("Name of the NDI source to announce")
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
    }

    fn set_property(&self, _id: usize, value: &glib::Value, pspec: &glib::ParamSpec) {
        if let Ok(mut settings) = self.settings.lock() {
            match pspec.name() {
                "device-name" => {
                    if let Ok(name) = value.get::<Option<String>>() {
                        gst::info!(
                            CAT,
                            imp = self,
                            "Changing device-name from {:?} to {:?}",
                            settings.device_name,
                            name
                        );
                        settings.device_name = name;
                    } else {
                        gst::error!(CAT, imp = self, "Invalid type for device-name property");
                    }
                }
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

impl GstObjectImpl for NdiVideoSink {}

impl ElementImpl for NdiVideoSink {
    fn metadata() -> Option<&'static gst::subclass::ElementMetadata> {
        static ELEMENT_METADATA: LazyLock<gst::subclass::ElementMetadata> = LazyLock::new(|| {
            gst::subclass::ElementMetadata::new(
                "NDI Video Sink",
                "Sink/Video",
                "Publishes video as an NDI source",
                "Contributors to the gst-ndi project",
            )
        });

        Some(&*ELEMENT_METADATA)
    }

    fn pad_templates() -> &'static [gst::PadTemplate] {
        static PAD_TEMPLATES: LazyLock<Result<Vec<gst::PadTemplate>, glib::BoolError>> =
            LazyLock::new(|| {
                let sink_pad_template = gst::PadTemplate::new(
                    "sink",
                    gst::PadDirection::Sink,
                    gst::PadPresence::Always,
                    &caps::video_template_caps(),
                )?;

                Ok(vec![sink_pad_template])
            });

        match PAD_TEMPLATES.as_ref() {
            Ok(templates) => templates,
            Err(err) => {
                trace!("Failed to create sink pad template: {:?}", err);
                &[]
            }
        }
    }
}

impl BaseSinkImpl for NdiVideoSink {
    /// Claims the video slot of the sender named `device-name`.
    fn start(&self) -> Result<(), gst::ErrorMessage> {
        let name = self
            .settings
            .lock()
            .map_err(|e| {
                gst::error_msg!(gst::CoreError::Failed, ["Failed to lock settings mutex: {}", e])
            })?
            .device_name
            .clone();

        let handle = OutputRegistry::global()
            .acquire(name.as_deref(), MediaKind::Video)
            .map_err(|e| gst::error_msg!(gst::ResourceError::OpenWrite, ["{}", e]))?;

        let mut context = self.context.lock().map_err(|e| {
            gst::error_msg!(gst::CoreError::Failed, ["Failed to lock context mutex: {}", e])
        })?;
        gst::info!(CAT, imp = self, "Started sender {}", handle.output().key());
        context.handle = Some(handle);

        Ok(())
    }

    fn stop(&self) -> Result<(), gst::ErrorMessage> {
        let handle = self
            .context
            .lock()
            .map_err(|e| {
                gst::error_msg!(gst::CoreError::Failed, ["Failed to lock context mutex: {}", e])
            })?
            .handle
            .take();
        drop(handle);

        gst::info!(CAT, imp = self, "Stopped");

        Ok(())
    }

    fn set_caps(&self, caps: &gst::Caps) -> Result<(), gst::LoggableError> {
        gst::debug!(CAT, imp = self, "Setting caps {}", caps);

        let context = self
            .context
            .lock()
            .map_err(|e| gst::loggable_error!(CAT, "Failed to lock context mutex: {}", e))?;
        let handle = context
            .handle
            .as_ref()
            .ok_or(gst::loggable_error!(CAT, "Not started"))?;

        handle
            .output()
            .configure_video(caps)
            .map_err(|e| gst::loggable_error!(CAT, "{}", e))
    }
}

impl VideoSinkImpl for NdiVideoSink {
    fn show_frame(&self, buffer: &gst::Buffer) -> Result<gst::FlowSuccess, gst::FlowError> {
        let output = {
            let context = self.context.lock().map_err(|_| gst::FlowError::Error)?;
            context
                .handle
                .as_ref()
                .map(|handle| handle.output().clone())
                .ok_or(gst::FlowError::Flushing)?
        };

        output.send_video(buffer).map_err(|err| {
            gst::element_imp_error!(self, gst::StreamError::Failed, ["{}", err]);
            gst::FlowError::Error
        })?;

        trace!(pts = ?buffer.pts(), "Sent video frame");
        Ok(gst::FlowSuccess::Ok)
    }
}
