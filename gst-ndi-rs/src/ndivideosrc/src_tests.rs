// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use gst::prelude::*;
    use gst::subclass::prelude::*;
    use gst_base::prelude::*;
    use gst_base::subclass::prelude::*;
    use gstreamer as gst;
    use gstreamer_base as gst_base;

    use crate::ndiinput::scripted::{
        SinkPipeline, filled_video_frame, scripted_registry, video_format, wait_until,
    };
    use crate::ndiinput::{InputRegistry, MediaKind};
    use crate::ndivideosrc::NdiVideoSrc;
    use crate::ndivideosrc::create_video::create_video;

    const DEVICE: &str = "192.168.1.20:5961";

    fn scripted_source(registry: &Arc<InputRegistry>) -> NdiVideoSrc {
        let src = glib::Object::builder::<NdiVideoSrc>()
            .property("device-path", DEVICE)
            .build();
        src.imp().set_registry(registry.clone());
        src
    }

    fn make_element() -> Result<gst::Element, glib::Error> {
        gst::init()?;
        gst::Element::register(
            None,
            "ndivideosrc",
            gst::Rank::NONE,
            NdiVideoSrc::static_type(),
        )
        .map_err(|e| glib::Error::new(gst::CoreError::Failed, &e.message))?;
        gst::ElementFactory::make("ndivideosrc")
            .build()
            .map_err(|e| glib::Error::new(gst::CoreError::Failed, &e.message))
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn properties_round_trip() -> Result<(), glib::Error> {
        let element = make_element()?;

        assert_eq!(element.property::<Option<String>>("device-path"), None);

        element.set_property("device-path", "192.168.1.20:5961");
        element.set_property("device-name", "STUDIO (Camera 1)");

        assert_eq!(
            element.property::<Option<String>>("device-path").as_deref(),
            Some("192.168.1.20:5961")
        );
        assert_eq!(
            element.property::<Option<String>>("device-name").as_deref(),
            Some("STUDIO (Camera 1)")
        );
        Ok(())
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn is_a_live_source() -> Result<(), glib::Error> {
        let element = make_element()?;
        let src = element
            .downcast::<gst_base::BaseSrc>()
            .map_err(|_| glib::Error::new(gst::CoreError::Failed, "not a BaseSrc"))?;
        assert!(src.is_live());
        Ok(())
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn template_lists_supported_formats() -> Result<(), glib::Error> {
        let element = make_element()?;
        let pad = element
            .static_pad("src")
            .ok_or_else(|| glib::Error::new(gst::CoreError::Failed, "no src pad"))?;
        let caps = pad.pad_template_caps();
        let s = caps
            .structure(0)
            .ok_or_else(|| glib::Error::new(gst::CoreError::Failed, "empty caps"))?;
        assert_eq!(s.name(), "video/x-raw");

        let formats = s
            .get::<gst::List>("format")
            .map_err(|e| glib::Error::new(gst::CoreError::Failed, &e.to_string()))?;
        let formats = formats
            .iter()
            .filter_map(|v| v.get::<String>().ok())
            .collect::<Vec<_>>();
        assert_eq!(formats, ["UYVY", "BGRA", "RGBA", "I420", "NV12"]);
        Ok(())
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn start_without_device_path_fails() -> Result<(), glib::Error> {
        let element = make_element()?;
        assert!(element.set_state(gst::State::Paused).is_err());
        let _ = element.set_state(gst::State::Null);
        Ok(())
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn first_frame_sets_caps_and_is_repeated() {
        let (connector, registry) = scripted_registry();
        connector.feed(DEVICE, filled_video_frame(4, 9));
        let src = scripted_source(&registry);
        let pipeline = SinkPipeline::new(src.upcast_ref());

        pipeline.set_state(gst::State::Playing);
        assert!(wait_until(|| pipeline.buffers().len() >= 3));

        let caps = pipeline.caps().unwrap();
        let s = caps.structure(0).unwrap();
        assert_eq!(s.get::<&str>("format").unwrap(), "UYVY");
        assert_eq!(s.get::<i32>("width").unwrap(), 4);
        assert_eq!(
            s.get::<gst::Fraction>("framerate").unwrap(),
            gst::Fraction::new(30000, 1001)
        );

        let duration = video_format(4).buffer_duration();
        for (i, buffer) in pipeline.buffers().iter().take(3).enumerate() {
            let i = i as u64;
            assert_eq!((buffer.offset(), buffer.offset_end()), (i, i + 1));
            assert_eq!(buffer.flags().contains(gst::BufferFlags::DISCONT), i == 0);
            assert_eq!(buffer.duration(), Some(duration));
            assert!(buffer.pts().is_some_and(|pts| pts >= duration));
            let map = buffer.map_readable().unwrap();
            assert_eq!(map.len(), video_format(4).frame_size());
            assert!(map.iter().all(|b| *b == 9));
        }
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn start_takes_its_first_frame_from_the_queue() {
        let (connector, registry) = scripted_registry();
        // The input already knows the video format before the video slot is claimed.
        let audio = registry.acquire(DEVICE, MediaKind::Audio).unwrap();
        connector.feed(DEVICE, filled_video_frame(4, 1));
        assert!(wait_until(|| audio.input().video_format().is_some()));

        let started = Arc::new(AtomicBool::new(false));
        let feeder = {
            let connector = connector.clone();
            let started = started.clone();
            std::thread::spawn(move || {
                while !started.load(Ordering::SeqCst) {
                    connector.feed(DEVICE, filled_video_frame(4, 7));
                    std::thread::sleep(Duration::from_millis(10));
                }
            })
        };

        let src = scripted_source(&registry);
        let result = BaseSrcImpl::start(src.imp());
        started.store(true, Ordering::SeqCst);
        feeder.join().unwrap();
        result.unwrap();

        {
            let context = src.imp().context.lock().unwrap();
            let state = context.state.as_ref().unwrap();
            let map = state.last_buffer.map_readable().unwrap();
            assert!(map.iter().all(|b| *b == 7));
        }
        BaseSrcImpl::stop(src.imp()).unwrap();
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn format_change_ends_the_stream() {
        let (connector, registry) = scripted_registry();
        connector.feed(DEVICE, filled_video_frame(4, 9));
        let src = scripted_source(&registry);
        let pipeline = SinkPipeline::new(src.upcast_ref());

        pipeline.set_state(gst::State::Playing);
        assert!(wait_until(|| !pipeline.buffers().is_empty()));

        connector.feed(DEVICE, filled_video_frame(8, 9));
        assert!(pipeline.wait_eos());
        assert!(
            pipeline
                .buffers()
                .iter()
                .all(|buffer| buffer.size() == video_format(4).frame_size())
        );

        // Every later call ends the stream too.
        assert_eq!(create_video(src.imp()).unwrap_err(), gst::FlowError::Eos);
        assert_eq!(create_video(src.imp()).unwrap_err(), gst::FlowError::Eos);
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn latency_spans_one_to_five_frames() {
        let (connector, registry) = scripted_registry();
        let src = scripted_source(&registry);
        let pad = src.static_pad("src").unwrap();

        let mut query = gst::query::Latency::new();
        assert!(!pad.query(&mut query));

        connector.feed(DEVICE, filled_video_frame(4, 9));
        let pipeline = SinkPipeline::new(src.upcast_ref());
        pipeline.set_state(gst::State::Playing);
        assert!(wait_until(|| !pipeline.buffers().is_empty()));

        let mut query = gst::query::Latency::new();
        assert!(pad.query(&mut query));
        let (live, min, max) = query.result();
        assert!(live);
        assert_eq!(min, gst::ClockTime::from_nseconds(33_366_667));
        assert_eq!(max, Some(gst::ClockTime::from_nseconds(166_833_335)));
    }
}
