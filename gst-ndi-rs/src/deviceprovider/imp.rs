// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

use gst::glib;
use gst::prelude::*;
use gst::subclass::prelude::*;
use gstreamer as gst;

use std::sync::{LazyLock, Mutex, MutexGuard, OnceLock};

use ndi::Source;

use crate::caps;
use crate::deviceprovider::finder::{DeviceChange, Finder, SourceDiscovery};
use crate::ndiaudiosrc::NdiAudioSrc;
use crate::ndiinput::MediaKind;
use crate::ndivideosrc::NdiVideoSrc;

static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "ndideviceprovider",
        gst::DebugColorFlags::empty(),
        Some("NDI Device Provider"),
    )
});

#[derive(Default)]
pub struct NdiDeviceProvider {
    finder: Finder,
    subscription: Mutex<Option<u64>>,
    devices: Mutex<Vec<super::NdiDevice>>,
}

#[glib::object_subclass]
impl ObjectSubclass for NdiDeviceProvider {
    const NAME: &'static str = "GstRsNdiDeviceProvider";
    type Type = super::NdiDeviceProvider;
    type ParentType = gst::DeviceProvider;
}

impl ObjectImpl for NdiDeviceProvider {}

impl GstObjectImpl for NdiDeviceProvider {}

impl DeviceProviderImpl for NdiDeviceProvider {
    fn metadata() -> Option<&'static gst::subclass::DeviceProviderMetadata> {
        static METADATA: LazyLock<gst::subclass::DeviceProviderMetadata> = LazyLock::new(|| {
            gst::subclass::DeviceProviderMetadata::new(
                "NDI Device Provider",
                "Source/Audio/Video/Network",
                "Lists NDI sources on the network",
                "Contributors to the gst-ndi project",
            )
        });

        Some(&*METADATA)
    }

    fn probe(&self) -> Vec<gst::Device> {
        if let Err(err) = self.ensure_finder() {
            gst::warning!(CAT, imp = self, "Can't probe: {}", err);
            return vec![];
        }

        self.finder
            .sources()
            .iter()
            .flat_map(devices_for)
            .map(|device| device.upcast())
            .collect()
    }

    fn start(&self) -> Result<(), gst::LoggableError> {
        self.ensure_finder()
            .map_err(|err| gst::loggable_error!(CAT, "Failed to start finder: {}", err))?;
        self.subscribe();
        Ok(())
    }

    fn stop(&self) {
        if let Some(id) = self.subscription().take() {
            self.finder.unsubscribe(id);
        }

        let devices = std::mem::take(&mut *self.devices());
        for device in &devices {
            self.obj().device_remove(device);
        }

        self.finder.stop();
        gst::info!(CAT, imp = self, "Stopped");
    }
}

impl NdiDeviceProvider {
    fn subscription(&self) -> MutexGuard<'_, Option<u64>> {
        self.subscription.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn devices(&self) -> MutexGuard<'_, Vec<super::NdiDevice>> {
        self.devices.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_finder(&self) -> Result<(), ndi::Error> {
        if self.finder.is_running() {
            return Ok(());
        }
        let api = ndi::default_api()?;
        let find = ndi::FindInstance::new(api, true)?;
        self.start_finder(Box::new(find))
    }

    /// Starts discovery on `discovery` instead of the NDI finder.
    pub(crate) fn start_finder(&self, discovery: Box<dyn SourceDiscovery>) -> Result<(), ndi::Error> {
        self.finder
            .start(discovery)
            .map_err(|err| ndi::Error::Other(format!("finder thread: {err}")))
    }

    /// Announces the current sources and follows future changes.
    pub(crate) fn subscribe(&self) {
        let mut subscription = self.subscription();
        if subscription.is_some() {
            return;
        }

        let imp_weak = self.downgrade();
        *subscription = Some(self.finder.subscribe(move |change| {
            if let Some(imp) = imp_weak.upgrade() {
                imp.handle_change(change);
            }
        }));
        drop(subscription);

        for source in self.finder.sources() {
            self.handle_change(&DeviceChange::Added(source));
        }
    }

    pub(crate) fn handle_change(&self, change: &DeviceChange) {
        let mut devices = self.devices();
        match change {
            DeviceChange::Added(source) => {
                if devices.iter().any(|d| d.source() == Some(source)) {
                    return;
                }
                gst::log!(CAT, imp = self, "Source {:?} appeared", source);
                for device in devices_for(source) {
                    self.obj().device_add(&device);
                    devices.push(device);
                }
            }
            DeviceChange::Removed(source) => {
                gst::log!(CAT, imp = self, "Source {:?} disappeared", source);
                let (gone, kept) = std::mem::take(&mut *devices)
                    .into_iter()
                    .partition::<Vec<_>, _>(|d| d.source() == Some(source));
                *devices = kept;
                for device in gone {
                    self.obj().device_remove(&device);
                }
            }
        }
    }
}

/// The video and the audio device of `source`.
fn devices_for(source: &Source) -> Vec<super::NdiDevice> {
    [MediaKind::Video, MediaKind::Audio]
        .into_iter()
        .filter_map(|kind| match super::NdiDevice::new(source, kind) {
            Ok(device) => Some(device),
            Err(err) => {
                gst::error!(CAT, "Failed to create {} device for {:?}: {}", kind, source, err);
                None
            }
        })
        .collect()
}

#[derive(Default)]
pub struct NdiDevice {
    info: OnceLock<(MediaKind, Source)>,
}

#[glib::object_subclass]
impl ObjectSubclass for NdiDevice {
    const NAME: &'static str = "GstRsNdiDevice";
    type Type = super::NdiDevice;
    type ParentType = gst::Device;
}

impl ObjectImpl for NdiDevice {}

impl GstObjectImpl for NdiDevice {}

impl DeviceImpl for NdiDevice {
    /// Creates the source element matching the device's media kind.
    fn create_element(&self, name: Option<&str>) -> Result<gst::Element, gst::LoggableError> {
        let (kind, source) = self
            .info
            .get()
            .ok_or_else(|| gst::loggable_error!(CAT, "Device without source"))?;

        let element = match kind {
            MediaKind::Video => gst::Object::builder::<NdiVideoSrc>()
                .name_if_some(name)
                .property("device-path", source.url_address.as_str())
                .property("device-name", source.name.as_str())
                .build()
                .map(|src| src.upcast::<gst::Element>()),
            MediaKind::Audio => gst::Object::builder::<NdiAudioSrc>()
                .name_if_some(name)
                .property("device-path", source.url_address.as_str())
                .property("device-name", source.name.as_str())
                .build()
                .map(|src| src.upcast::<gst::Element>()),
        }
        .map_err(|err| gst::loggable_error!(CAT, "Failed to create element: {}", err))?;

        Ok(element)
    }
}

impl super::NdiDevice {
    pub(crate) fn new(source: &Source, kind: MediaKind) -> Result<Self, glib::BoolError> {
        let (device_class, caps) = match kind {
            MediaKind::Video => ("Video/Source", gst::Caps::new_any()),
            MediaKind::Audio => ("Audio/Source", caps::audio_template_caps()),
        };

        let properties = gst::Structure::builder("properties")
            .field("device.api", "NDI")
            .field("device.strid", source.url_address.as_str())
            .field("device.friendlyName", source.name.as_str())
            .build();

        let device = gst::Object::builder::<super::NdiDevice>()
            .property("caps", caps)
            .property("display-name", source.name.as_str())
            .property("device-class", device_class)
            .property("properties", properties)
            .build()?;

        let _ = device.imp().info.set((kind, source.clone()));

        Ok(device)
    }

    /// The NDI source this device stands for.
    pub fn source(&self) -> Option<&Source> {
        self.imp().info.get().map(|(_, source)| source)
    }

    pub fn kind(&self) -> Option<MediaKind> {
        self.imp().info.get().map(|(kind, _)| *kind)
    }
}
