// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use gstreamer as gst;
    use gstreamer_video as gst_video;
    use ndi::{AudioFrameDesc, FourCC, FrameFormat, VideoFrameDesc};

    use crate::ndiinput::MediaKind;
    use crate::ndioutput::{
        FrameSender, OutputError, OutputRegistry, SenderFactory, audio_desc, timecode, video_desc,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Video { timecode: i64, bytes: usize },
        Audio { timecode: i64, samples: Vec<f32> },
    }

    struct RecordingSender {
        log: Arc<Mutex<Vec<Sent>>>,
        destroyed: Arc<AtomicUsize>,
    }

    impl FrameSender for RecordingSender {
        fn send_video(
            &self,
            _desc: &VideoFrameDesc,
            timecode: i64,
            data: &[u8],
        ) -> Result<(), ndi::Error> {
            self.log.lock().unwrap().push(Sent::Video {
                timecode,
                bytes: data.len(),
            });
            Ok(())
        }

        fn send_audio(
            &self,
            _desc: &AudioFrameDesc,
            timecode: i64,
            samples: &[f32],
        ) -> Result<(), ndi::Error> {
            self.log.lock().unwrap().push(Sent::Audio {
                timecode,
                samples: samples.to_vec(),
            });
            Ok(())
        }
    }

    impl Drop for RecordingSender {
        fn drop(&mut self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingFactory {
        names: Mutex<Vec<Option<String>>>,
        log: Arc<Mutex<Vec<Sent>>>,
        destroyed: Arc<AtomicUsize>,
    }

    impl SenderFactory for Arc<RecordingFactory> {
        fn create(&self, name: Option<&str>) -> Result<Box<dyn FrameSender>, ndi::Error> {
            self.names.lock().unwrap().push(name.map(str::to_owned));
            Ok(Box::new(RecordingSender {
                log: self.log.clone(),
                destroyed: self.destroyed.clone(),
            }))
        }
    }

    fn setup() -> (Arc<RecordingFactory>, Arc<OutputRegistry>) {
        gst::init().unwrap();
        let factory = Arc::new(RecordingFactory::default());
        let registry = Arc::new(OutputRegistry::new(Box::new(factory.clone())));
        (factory, registry)
    }

    fn uyvy_caps(width: i32, height: i32) -> gst::Caps {
        gst_video::VideoCapsBuilder::new()
            .format(gst_video::VideoFormat::Uyvy)
            .width(width)
            .height(height)
            .framerate(gst::Fraction::new(25, 1))
            .build()
    }

    fn f32_caps(channels: i32) -> gst::Caps {
        gst::Caps::builder("audio/x-raw")
            .field("format", "F32LE")
            .field("rate", 48000i32)
            .field("channels", channels)
            .field("layout", "interleaved")
            .build()
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn unnamed_sinks_share_one_sender() {
        let (factory, registry) = setup();

        let video = registry.acquire(None, MediaKind::Video).unwrap();
        let audio = registry.acquire(Some(""), MediaKind::Audio).unwrap();

        assert_eq!(video.output().key(), "_");
        assert!(Arc::ptr_eq(video.output(), audio.output()));
        assert_eq!(*factory.names.lock().unwrap(), vec![None]);
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn second_producer_of_same_kind_is_busy() {
        let (_factory, registry) = setup();

        let _first = registry.acquire(Some("Camera 1"), MediaKind::Audio).unwrap();
        let second = registry.acquire(Some("Camera 1"), MediaKind::Audio);
        assert!(matches!(second, Err(OutputError::Busy { .. })));

        let _other = registry.acquire(Some("Camera 2"), MediaKind::Audio).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn last_release_destroys_sender() {
        let (factory, registry) = setup();

        let video = registry.acquire(Some("Camera"), MediaKind::Video).unwrap();
        let audio = registry.acquire(Some("Camera"), MediaKind::Audio).unwrap();

        drop(video);
        assert!(registry.contains("Camera"));
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 0);

        drop(audio);
        assert!(registry.is_empty());
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn video_caps_become_frame_description() {
        gst::init().unwrap();

        let desc = video_desc(&uyvy_caps(1920, 1080)).unwrap();
        assert_eq!(desc.fourcc, FourCC::Uyvy);
        assert_eq!(desc.line_stride, 3840);
        assert_eq!((desc.frame_rate_n, desc.frame_rate_d), (25, 1));
        assert_eq!(desc.frame_format, FrameFormat::Progressive);
        assert!((desc.picture_aspect_ratio - 16.0 / 9.0).abs() < 1e-6);

        let nv12 = gst_video::VideoCapsBuilder::new()
            .format(gst_video::VideoFormat::Nv12)
            .width(640)
            .height(480)
            .framerate(gst::Fraction::new(30, 1))
            .pixel_aspect_ratio(gst::Fraction::new(4, 3))
            .build();
        let desc = video_desc(&nv12).unwrap();
        assert_eq!(desc.line_stride, 640);
        assert!((desc.picture_aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn unsupported_video_caps_are_rejected() {
        gst::init().unwrap();

        let rgb = gst_video::VideoCapsBuilder::new()
            .format(gst_video::VideoFormat::Rgb)
            .width(320)
            .height(240)
            .framerate(gst::Fraction::new(30, 1))
            .build();
        assert!(matches!(video_desc(&rgb), Err(OutputError::UnsupportedCaps(_))));

        let alternate = gst::Caps::builder("video/x-raw")
            .field("format", "UYVY")
            .field("width", 720i32)
            .field("height", 480i32)
            .field("framerate", gst::Fraction::new(30, 1))
            .field("interlace-mode", "mixed")
            .build();
        assert!(matches!(
            video_desc(&alternate),
            Err(OutputError::UnsupportedCaps(_))
        ));
    }

    #[test]
    fn only_interleaved_f32_audio_is_accepted() {
        gst::init().unwrap();

        let desc = audio_desc(&f32_caps(2)).unwrap();
        assert_eq!(
            desc,
            AudioFrameDesc {
                sample_rate: 48000,
                channels: 2
            }
        );

        let s16 = gst::Caps::builder("audio/x-raw")
            .field("format", "S16LE")
            .field("rate", 48000i32)
            .field("channels", 2i32)
            .field("layout", "interleaved")
            .build();
        assert!(audio_desc(&s16).is_err());
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn sending_requires_configuration() {
        let (factory, registry) = setup();
        let handle = registry.acquire(None, MediaKind::Video).unwrap();
        let output = handle.output();

        let buffer = gst::Buffer::from_slice(vec![0u8; 4 * 2 * 2]);
        assert!(matches!(
            output.send_video(&buffer),
            Err(OutputError::NotConfigured(MediaKind::Video))
        ));

        output.configure_video(&uyvy_caps(4, 2)).unwrap();
        let mut buffer = buffer;
        buffer
            .get_mut()
            .unwrap()
            .set_pts(gst::ClockTime::from_mseconds(40));
        output.send_video(&buffer).unwrap();

        assert_eq!(
            *factory.log.lock().unwrap(),
            vec![Sent::Video {
                timecode: 400_000,
                bytes: 16
            }]
        );
    }

    #[test]
    #[cfg_attr(feature = "tracing", tracing_test::traced_test)]
    fn audio_buffers_are_sent_as_floats() {
        let (factory, registry) = setup();
        let handle = registry.acquire(Some("Mic"), MediaKind::Audio).unwrap();
        let output = handle.output();
        output.configure_audio(&f32_caps(2)).unwrap();

        let bytes = [0.5f32, -0.5, 0.25, -0.25]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<u8>>();
        output.send_audio(&gst::Buffer::from_slice(bytes)).unwrap();

        assert_eq!(
            *factory.log.lock().unwrap(),
            vec![Sent::Audio {
                timecode: ndi::TIMECODE_SYNTHESIZE,
                samples: vec![0.5, -0.5, 0.25, -0.25]
            }]
        );
    }

    #[test]
    fn timecode_is_in_hundreds_of_nanoseconds() {
        assert_eq!(timecode(Some(gst::ClockTime::SECOND)), 10_000_000);
        assert_eq!(timecode(None), ndi::TIMECODE_SYNTHESIZE);
    }
}
