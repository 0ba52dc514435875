// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

use gst::glib;
use gst::prelude::*;
use gst::subclass::prelude::*;
use gst_base::prelude::*;
use gst_base::subclass::base_src::CreateSuccess;
use gst_base::subclass::prelude::*;
use gstreamer as gst;
use gstreamer_audio as gst_audio;
use gstreamer_base as gst_base;
use tracing::trace;

use std::sync::LazyLock;
use std::sync::Mutex;

use crate::caps;
use crate::ndiaudiosrc;
use crate::ndiaudiosrc::create_audio::create_audio;
use crate::ndiaudiosrc::state::{
    Context, DEFAULT_DEVICE_NAME, DEFAULT_DEVICE_PATH, FIRST_FRAME_TIMEOUT, Settings, State,
};
use crate::ndiinput::{AudioFormat, InputRegistry, MediaKind};

pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "ndiaudiosrc",
        gst::DebugColorFlags::empty(),
        Some("NDI Audio Source"),
    )
});

#[derive(Default)]
pub struct NdiAudioSrc {
    pub settings: Mutex<Settings>,
    pub context: Mutex<Context>,
}

#[glib::object_subclass]
impl ObjectSubclass for NdiAudioSrc {
    const NAME: &'static str = "GstRsNdiAudioSrc";
    type Type = ndiaudiosrc::NdiAudioSrc;
    type ParentType = gst_base::PushSrc;
}

impl ObjectImpl for NdiAudioSrc {
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
        let Ok(mut settings) = self.settings.lock() else {
            gst::error!(CAT, imp = self, "Settings mutex poisoned, property change ignored");
            return;
        };
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
            other => gst::error!(CAT, imp = self, "Unknown property '{}'", other),
        }
    }

    fn property(&self, _id: usize, pspec: &glib::ParamSpec) -> glib::Value {
        let Ok(settings) = self.settings.lock() else {
            gst::error!(CAT, imp = self, "Settings mutex poisoned");
            return glib::Value::from(&"");
        };
        match pspec.name() {
            "device-path" => settings.device_path.to_value(),
            "device-name" => settings.device_name.to_value(),
            _ => {
                gst::error!(CAT, imp = self, "Unknown property {}", pspec.name());
                glib::Value::from(&"")
            }
        }
    }
}

impl GstObjectImpl for NdiAudioSrc {}

impl ElementImpl for NdiAudioSrc {
    fn metadata() -> Option<&'static gst::subclass::ElementMetadata> {
        static ELEMENT_METADATA: LazyLock<gst::subclass::ElementMetadata> = LazyLock::new(|| {
            gst::subclass::ElementMetadata::new(
                "NDI Audio Source",
                "Source/Audio",
                "Receives audio from an NDI source",
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
                    &caps::audio_template_caps(),
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

    /// Drops audio queued while paused so playback starts from live audio.
    fn change_state(
        &self,
        transition: gst::StateChange,
    ) -> Result<gst::StateChangeSuccess, gst::StateChangeError> {
        if transition == gst::StateChange::PausedToPlaying {
            if let Ok(context) = self.context.lock() {
                if let Some(state) = context.state.as_ref() {
                    let queue = state.handle.input().audio_queue();
                    gst::debug!(CAT, imp = self, "Dropping {} queued frames", queue.len());
                    queue.clear();
                }
            }
        }

        self.parent_change_state(transition)
    }
}

impl BaseSrcImpl for NdiAudioSrc {
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
            .acquire(&device_path, MediaKind::Audio)
            .map_err(|e| gst::error_msg!(gst::ResourceError::OpenRead, ["{}", e]))?;
        gst::info!(CAT, imp = self, "Started on {}", handle.input().id());

        let mut context = self.context.lock().map_err(|e| {
            gst::error_msg!(gst::CoreError::Failed, ["Failed to lock context mutex: {}", e])
        })?;
        context.state = Some(State {
            handle,
            format: None,
            last_size: 0,
            n_samples: 0,
            received: false,
            eos: false,
        });

        Ok(())
    }

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

    /// Caps of the audio currently received.
    ///
    /// Waits up to one second for the first frame; until then the template
    /// caps are offered.
    fn caps(&self, filter: Option<&gst::Caps>) -> Option<gst::Caps> {
        let input = self
            .context
            .lock()
            .ok()
            .and_then(|context| context.state.as_ref().map(|s| s.handle.input().clone()));

        let format = input.and_then(|input| {
            input
                .audio_format()
                .or_else(|| input.wait_audio_format(FIRST_FRAME_TIMEOUT))
        });
        let caps = match format {
            Some(format) => format.caps(),
            None => self.obj().src_pad().pad_template_caps(),
        };

        gst::debug!(CAT, imp = self, "Offering caps {}", caps);

        match filter {
            Some(filter) => Some(filter.intersect_with_mode(&caps, gst::CapsIntersectMode::First)),
            None => Some(caps),
        }
    }

    fn set_caps(&self, caps: &gst::Caps) -> Result<(), gst::LoggableError> {
        let info = gst_audio::AudioInfo::from_caps(caps)
            .map_err(|e| gst::loggable_error!(CAT, "Invalid audio caps {}: {}", caps, e))?;
        let rate = info.rate() as i32;
        let format = AudioFormat {
            channels: info.channels() as i32,
            rate,
            // 10 ms until the first real frame tells the sender's frame size
            samples: rate / 100,
        };

        let mut context = self
            .context
            .lock()
            .map_err(|e| gst::loggable_error!(CAT, "Failed to lock context mutex {}", e))?;
        let state = context
            .state
            .as_mut()
            .ok_or(gst::loggable_error!(CAT, "Failed to get state"))?;
        if !state.received {
            state.last_size = format.buffer_size();
        }
        state.format = Some(format);

        gst::info!(CAT, imp = self, "Negotiated {}", caps);
        Ok(())
    }

    fn fixate(&self, mut caps: gst::Caps) -> gst::Caps {
        caps.truncate();
        {
            let caps = caps.make_mut();
            if let Some(s) = caps.structure_mut(0) {
                s.fixate_field_nearest_int("rate", 48_000);
                s.fixate_field_nearest_int("channels", 2);
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
                let Some(min) = context
                    .state
                    .as_ref()
                    .and_then(|state| state.format.map(|f| f.duration_of(state.last_size)))
                else {
                    gst::debug!(CAT, imp = self, "Not negotiated, can't answer latency query");
                    return false;
                };
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
                state.handle.input().audio_queue().set_flushing(true);
            }
        }

        Ok(())
    }

    fn unlock_stop(&self) -> Result<(), gst::ErrorMessage> {
        gst::debug!(CAT, imp = self, "Unlock stop");
        if let Ok(context) = self.context.lock() {
            if let Some(state) = context.state.as_ref() {
                state.handle.input().audio_queue().set_flushing(false);
            }
        }

        Ok(())
    }
}

impl NdiAudioSrc {
    /// Makes start() claim inputs from `registry` instead of the global one.
    #[cfg(test)]
    pub(crate) fn set_registry(&self, registry: std::sync::Arc<InputRegistry>) {
        if let Ok(mut context) = self.context.lock() {
            context.registry = Some(registry);
        }
    }
}

impl PushSrcImpl for NdiAudioSrc {
    fn create(
        &self,
        _buffer: Option<&mut gst::BufferRef>,
    ) -> Result<CreateSuccess, gst::FlowError> {
        create_audio(self).map(CreateSuccess::NewBuffer)
    }
}
