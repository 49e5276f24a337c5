use std::sync::Arc;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::{AppSink, AppSinkCallbacks};
use gstreamer_video as gst_video;
use streamview_core::{redact_credentials, EngineError, EngineOptions, FrameSink, VideoFormat};
use tracing::{debug, error, info, warn};

use crate::{copy_rows, MediaEngine, MediaPlayer};

/// Elements every pipeline needs.
static REQUIRED_ELEMENTS: &[&str] = &["uridecodebin", "videoconvert", "videoscale", "appsink"];

fn is_valid_location(location: &str) -> bool {
    let Some((scheme, rest)) = location.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().map_or(false, |c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}

fn pipeline_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Pipeline(e.to_string())
}

// ── GstEngine ─────────────────────────────────────────────────────────────────

/// GStreamer-backed engine. Creating it initialises GStreamer.
pub struct GstEngine {
    options: EngineOptions,
}

impl GstEngine {
    pub fn new(options: &EngineOptions) -> Result<Self, EngineError> {
        gst::init().map_err(|e| EngineError::Init(e.to_string()))?;
        for element in REQUIRED_ELEMENTS {
            if gst::ElementFactory::find(element).is_none() {
                return Err(EngineError::MissingElement(*element));
            }
        }
        if options.no_xlib {
            // Frames only ever leave the pipeline through appsink.
            debug!("No video sink in pipeline, X11 output stays unused");
        }
        info!(
            "GStreamer {} ready (caching={}ms, transport buffer={}B, tcp={})",
            gst::version_string(),
            options.network_caching_ms,
            options.transport_buffer_bytes,
            options.force_tcp
        );
        Ok(Self { options: options.clone() })
    }
}

impl MediaEngine for GstEngine {
    type Media = GstMedia;
    type Player = GstPlayer;

    fn new_media(&self, location: &str) -> Result<GstMedia, EngineError> {
        if !is_valid_location(location) {
            return Err(EngineError::InvalidLocation(redact_credentials(location)));
        }
        Ok(GstMedia { location: location.to_string() })
    }

    fn new_player(&self, media: &GstMedia) -> Result<GstPlayer, EngineError> {
        GstPlayer::new(media, &self.options)
    }
}

impl Drop for GstEngine {
    fn drop(&mut self) {
        debug!("GstEngine released");
    }
}

// ── GstMedia ──────────────────────────────────────────────────────────────────

pub struct GstMedia {
    location: String,
}

impl GstMedia {
    pub fn location(&self) -> &str {
        &self.location
    }
}

// ── GstPlayer ─────────────────────────────────────────────────────────────────

/// One pipeline per media. Frames reach the registered [`FrameSink`] from
/// appsink's streaming thread.
pub struct GstPlayer {
    pipeline: gst::Pipeline,
    appsink:  AppSink,
    has_callbacks: bool,
}

impl GstPlayer {
    fn new(media: &GstMedia, options: &EngineOptions) -> Result<Self, EngineError> {
        let pipeline = gst::Pipeline::with_name("streamview");

        let source = gst::ElementFactory::make("uridecodebin")
            .name("source")
            .property("uri", media.location())
            .build()
            .map_err(pipeline_err)?;
        let convert = gst::ElementFactory::make("videoconvert").build().map_err(pipeline_err)?;
        let scale = gst::ElementFactory::make("videoscale").build().map_err(pipeline_err)?;
        // One frame in flight; a late frame is replaced, not queued.
        let appsink = AppSink::builder().max_buffers(1).drop(true).sync(true).build();

        pipeline
            .add_many([&source, &convert, &scale, appsink.upcast_ref()])
            .map_err(pipeline_err)?;
        gst::Element::link_many([&convert, &scale, appsink.upcast_ref()]).map_err(pipeline_err)?;

        // Network source tuning, applied when uridecodebin instantiates the source.
        let opts = options.clone();
        source.connect("source-setup", false, move |values| {
            if let Some(Ok(src)) = values.get(1).map(|v| v.get::<gst::Element>()) {
                configure_source(&src, &opts);
            }
            None
        });

        // uridecodebin exposes pads once the stream is typed; link the first video one.
        let convert_weak = convert.downgrade();
        source.connect_pad_added(move |_, pad| {
            let Some(convert) = convert_weak.upgrade() else { return };
            let Some(sink_pad) = convert.static_pad("sink") else { return };
            if sink_pad.is_linked() {
                return;
            }
            let is_video = pad
                .current_caps()
                .and_then(|caps| caps.structure(0).map(|s| s.name().starts_with("video/")))
                .unwrap_or(false);
            if !is_video {
                debug!("Ignoring non-video pad {}", pad.name());
                return;
            }
            match pad.link(&sink_pad) {
                Ok(_) => info!("Linked decoded video pad {}", pad.name()),
                Err(e) => error!("Failed to link video pad {}: {:?}", pad.name(), e),
            }
        });

        if let Some(bus) = pipeline.bus() {
            bus.set_sync_handler(|_, msg| {
                log_bus_message(msg);
                gst::BusSyncReply::Drop
            });
        }

        debug!("Pipeline built");
        Ok(Self { pipeline, appsink, has_callbacks: false })
    }
}

fn configure_source(src: &gst::Element, options: &EngineOptions) {
    let factory = src.factory().map(|f| f.name().to_string()).unwrap_or_default();
    if src.find_property("latency").is_some() {
        src.set_property("latency", options.network_caching_ms);
    }
    if src.find_property("udp-buffer-size").is_some() {
        src.set_property("udp-buffer-size", options.transport_buffer_bytes.min(i32::MAX as u32) as i32);
    }
    if options.force_tcp && src.find_property("protocols").is_some() {
        src.set_property_from_str("protocols", "tcp");
    }
    debug!("Configured source element '{}'", factory);
}

fn log_bus_message(msg: &gst::Message) {
    let origin = || msg.src().map(|s| s.path_string().to_string()).unwrap_or_default();
    match msg.view() {
        gst::MessageView::Error(err) => {
            error!("Engine error from {}: {} ({:?})", origin(), err.error(), err.debug());
        }
        gst::MessageView::Warning(w) => {
            warn!("Engine warning from {}: {} ({:?})", origin(), w.error(), w.debug());
        }
        gst::MessageView::Eos(_) => info!("End of stream"),
        _ => {}
    }
}

impl MediaPlayer for GstPlayer {
    fn set_callbacks(&mut self, sink: Arc<dyn FrameSink>) {
        self.appsink.set_callbacks(
            AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    let src_stride = sample
                        .caps()
                        .and_then(|caps| gst_video::VideoInfo::from_caps(caps).ok())
                        .and_then(|info| info.stride().first().copied())
                        .map(|stride| stride as usize);

                    let mut frame = sink.begin_frame_write();
                    let pitch = frame.pitch();
                    copy_rows(frame.pixels_mut(), pitch, map.as_slice(), src_stride.unwrap_or(pitch));
                    sink.end_frame_write(frame);
                    sink.present_frame();
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );
        self.has_callbacks = true;
    }

    fn set_format(&mut self, format: VideoFormat) {
        let caps = gst_video::VideoCapsBuilder::new()
            .format(gst_video::VideoFormat::Bgrx)
            .width(format.width as i32)
            .height(format.height as i32)
            .build();
        self.appsink.set_caps(Some(&caps));
        info!(
            "Output format {} {}x{} pitch={}",
            format.pixel_format.fourcc(),
            format.width,
            format.height,
            format.pitch
        );
    }

    fn play(&mut self) -> Result<(), EngineError> {
        if !self.has_callbacks {
            return Err(EngineError::NoCallbacks);
        }
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|_| EngineError::Pipeline("Failed to start pipeline".into()))?;
        Ok(())
    }

    fn stop(&mut self) {
        // Null joins the streaming threads, so no callback outlives this call.
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!("Failed to stop pipeline: {}", e);
        }
    }
}

impl Drop for GstPlayer {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
        debug!("GstPlayer released");
    }
}
