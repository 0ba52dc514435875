// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gst::prelude::*;
    use gst::subclass::prelude::*;
    use gstreamer as gst;

    use crate::ndiaudiosrc::NdiAudioSrc;
    use crate::ndiaudiosrc::create_audio::create_audio;
    use crate::ndiinput::InputRegistry;
    use crate::ndiinput::scripted::{
        SinkPipeline, audio_frame, audio_frame_at, scripted_registry, wait_until,
    };

    const DEVICE: &str = "10.0.0.5:5962";

    fn scripted_source(registry: &Arc<InputRegistry>) -> NdiAudioSrc {
        let src = glib::Object::builder::<NdiAudioSrc>()
            .property("device-path", DEVICE)
            .build();
        src.imp().set_registry(registry.clone());
        src
    }

    fn queued(src: &NdiAudioSrc) -> usize {
        let context = src.imp().context.lock().unwrap();
        context
            .state
            .as_ref()
            .map_or(0, |state| state.handle.input().audio_queue().len())
    }

    fn is_silent(buffer: &gst::Buffer) -> bool {
        buffer.map_readable().unwrap().iter().all(|b| *b == 0)
    }

    fn caps_field(caps: Option<gst::Caps>, field: &str) -> Option<i32> {
        caps?.structure(0)?.get::<i32>(field).ok()
    }

    /// Pauses with one frame queued, then plays.
    fn play_after_queueing(src: &NdiAudioSrc, pipeline: &SinkPipeline) {
        pipeline.set_state(gst::State::Paused);
        assert!(wait_until(|| queued(src) == 1));
        pipeline.set_state(gst::State::Playing);
    }

    fn make_element() -> Result<gst::Element, glib::Error> {
        gst::init()?;
        gst::Element::register(
            None,
            "ndiaudiosrc",
            gst::Rank::NONE,
            NdiAudioSrc::static_type(),
        )
        .map_err(|e| glib::Error::new(gst::CoreError::Failed, &e.message))?;
        gst::ElementFactory::make("ndiaudiosrc")
            .build()
            .map_err(|e| glib::Error::new(gst::CoreError::Failed, &e.message))
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn properties_round_trip() -> Result<(), glib::Error> {
        let element = make_element()?;

        element.set_property("device-path", "10.0.0.5:5962");
        element.set_property("device-name", "MIXER (Program)");

        assert_eq!(
            element.property::<Option<String>>("device-path").as_deref(),
            Some("10.0.0.5:5962")
        );
        assert_eq!(
            element.property::<Option<String>>("device-name").as_deref(),
            Some("MIXER (Program)")
        );

        element.set_property("device-path", None::<String>);
        assert_eq!(element.property::<Option<String>>("device-path"), None);
        Ok(())
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn template_is_interleaved_f32() -> Result<(), glib::Error> {
        let element = make_element()?;
        let pad = element
            .static_pad("src")
            .ok_or_else(|| glib::Error::new(gst::CoreError::Failed, "no src pad"))?;
        let caps = pad.pad_template_caps();
        let s = caps
            .structure(0)
            .ok_or_else(|| glib::Error::new(gst::CoreError::Failed, "empty caps"))?;

        assert_eq!(s.name(), "audio/x-raw");
        assert_eq!(s.get::<&str>("format").ok(), Some("F32LE"));
        assert_eq!(s.get::<&str>("layout").ok(), Some("interleaved"));
        let channels = s
            .get::<gst::IntRange<i32>>("channels")
            .map_err(|e| glib::Error::new(gst::CoreError::Failed, &e.to_string()))?;
        assert_eq!((channels.min(), channels.max()), (1, 16));

        let stereo = gst::Caps::builder("audio/x-raw")
            .field("format", "F32LE")
            .field("rate", 48000i32)
            .field("channels", 2i32)
            .field("layout", "interleaved")
            .build();
        assert!(stereo.can_intersect(&caps));
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
    fn playing_drops_frames_queued_while_paused() {
        let (connector, registry) = scripted_registry();
        connector.feed(DEVICE, audio_frame(2, 480));
        let src = scripted_source(&registry);
        let pipeline = SinkPipeline::new(src.upcast_ref());

        play_after_queueing(&src, &pipeline);
        assert!(wait_until(|| !pipeline.buffers().is_empty()));

        // The queued frame carries samples; silence means it was dropped.
        assert!(is_silent(&pipeline.buffers()[0]));
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn silence_matches_the_last_frame() {
        let (connector, registry) = scripted_registry();
        connector.feed(DEVICE, audio_frame(2, 480));
        let src = scripted_source(&registry);
        let pad = src.static_pad("src").unwrap();

        let mut query = gst::query::Latency::new();
        assert!(!pad.query(&mut query));

        let pipeline = SinkPipeline::new(src.upcast_ref());
        play_after_queueing(&src, &pipeline);
        assert!(wait_until(|| !pipeline.buffers().is_empty()));

        // Before any frame, silence lasts 10 ms.
        let first = pipeline.buffers()[0].clone();
        assert_eq!(first.size(), 480 * 2 * 4);
        assert_eq!((first.offset(), first.offset_end()), (0, 480));
        assert_eq!(first.duration(), Some(gst::ClockTime::from_mseconds(10)));

        connector.feed(DEVICE, audio_frame(2, 240));
        let after_frame = |buffers: &[gst::Buffer]| {
            buffers
                .iter()
                .position(|buffer| !is_silent(buffer))
                .filter(|&i| i + 1 < buffers.len())
        };
        assert!(wait_until(|| after_frame(&pipeline.buffers()).is_some()));

        let buffers = pipeline.buffers();
        let i = after_frame(&buffers).unwrap();
        assert_eq!(buffers[i].size(), 240 * 2 * 4);
        assert!(is_silent(&buffers[i + 1]));
        assert_eq!(buffers[i + 1].size(), 240 * 2 * 4);
        assert_eq!(
            buffers[i + 1].duration(),
            Some(gst::ClockTime::from_mseconds(5))
        );

        for (n, pair) in buffers.windows(2).enumerate() {
            assert_eq!(pair[1].offset(), pair[0].offset_end());
            assert!(!pair[1].flags().contains(gst::BufferFlags::DISCONT), "buffer {}", n + 1);
        }
        assert!(first.flags().contains(gst::BufferFlags::DISCONT));

        let mut query = gst::query::Latency::new();
        assert!(pad.query(&mut query));
        let (live, min, max) = query.result();
        assert!(live);
        assert_eq!(min, gst::ClockTime::from_mseconds(5));
        assert_eq!(max, Some(gst::ClockTime::from_mseconds(25)));
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn first_frame_renegotiates_once() {
        let (connector, registry) = scripted_registry();
        connector.feed(DEVICE, audio_frame(2, 480));
        let src = scripted_source(&registry);
        let pipeline = SinkPipeline::new(src.upcast_ref());

        play_after_queueing(&src, &pipeline);
        assert!(wait_until(|| caps_field(pipeline.caps(), "channels") == Some(2)));
        assert_eq!(caps_field(pipeline.caps(), "rate"), Some(48000));

        connector.feed(DEVICE, audio_frame_at(44100, 1, 441));
        assert!(wait_until(|| caps_field(pipeline.caps(), "channels") == Some(1)));
        assert_eq!(caps_field(pipeline.caps(), "rate"), Some(44100));
        assert!(wait_until(|| pipeline.buffers().iter().any(|b| !is_silent(b))));

        connector.feed(DEVICE, audio_frame_at(44100, 2, 441));
        assert!(pipeline.wait_eos());
        assert_eq!(create_audio(src.imp()).unwrap_err(), gst::FlowError::Eos);
    }
}
