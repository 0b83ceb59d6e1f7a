// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer capture session
//!
//! Builds a pipeline that:
//! 1. Pulls camera frames from PipeWire (with a V4L2 fallback)
//! 2. Applies the interface orientation (via videoflip)
//! 3. Converts to GRAY8 and hands sampled frames to the QR detector
//!
//! Decoded batches are forwarded through the session's [`DetectionHandler`];
//! the pipeline itself renders nothing.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use gstreamer::prelude::*;
use gstreamer_app::{AppSink, AppSinkCallbacks};
use image::GrayImage;
use tracing::{debug, info, trace, warn};

use crate::constants::DETECTION_INTERVAL;
use crate::errors::{CaptureError, CaptureResult};

use super::detector;
use super::session::{CaptureBackend, CaptureSession, DetectionHandler, Orientation};
use std::sync::Arc;

/// Source element factories tried in order
const SOURCE_FACTORIES: [&str; 2] = ["pipewiresrc", "v4l2src"];

/// Backend opening GStreamer-based capture sessions
#[derive(Debug, Clone)]
pub struct GstCaptureBackend {
    detection_interval: Duration,
}

impl Default for GstCaptureBackend {
    fn default() -> Self {
        Self {
            detection_interval: DETECTION_INTERVAL,
        }
    }
}

impl GstCaptureBackend {
    pub fn new(detection_interval: Duration) -> Self {
        Self { detection_interval }
    }
}

impl CaptureBackend for GstCaptureBackend {
    fn open(&self, on_detections: DetectionHandler) -> CaptureResult<Arc<dyn CaptureSession>> {
        Ok(Arc::new(GstCaptureSession::open(
            self.detection_interval,
            on_detections,
        )?))
    }
}

/// A camera capture session backed by a GStreamer pipeline
pub struct GstCaptureSession {
    pipeline: gstreamer::Pipeline,
    flip: gstreamer::Element,
    running: Mutex<bool>,
}

impl GstCaptureSession {
    fn open(detection_interval: Duration, on_detections: DetectionHandler) -> CaptureResult<Self> {
        gstreamer::init().map_err(|e| {
            CaptureError::InitializationFailed(format!("GStreamer init failed: {}", e))
        })?;

        let source = make_source()?;

        let flip = gstreamer::ElementFactory::make("videoflip")
            .name("qr_capture_flip")
            .build()
            .map_err(|e| {
                CaptureError::InitializationFailed(format!("Failed to create videoflip: {}", e))
            })?;

        let convert = gstreamer::ElementFactory::make("videoconvert")
            .name("qr_capture_convert")
            .build()
            .map_err(|e| {
                CaptureError::InitializationFailed(format!("Failed to create videoconvert: {}", e))
            })?;

        let appsink = gstreamer::ElementFactory::make("appsink")
            .name("qr_capture_sink")
            .build()
            .map_err(|e| {
                CaptureError::InitializationFailed(format!("Failed to create appsink: {}", e))
            })?;

        let appsink = appsink.downcast::<AppSink>().map_err(|_| {
            CaptureError::InitializationFailed("Failed to downcast to AppSink".into())
        })?;

        // The detector wants grayscale; let videoconvert do the work
        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "GRAY8")
            .build();
        appsink.set_caps(Some(&caps));
        appsink.set_max_buffers(1);
        appsink.set_drop(true);
        appsink.set_property("sync", false);

        let last_decode: Mutex<Option<Instant>> = Mutex::new(None);
        appsink.set_callbacks(
            AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;

                    // Sample frames instead of decoding at full frame rate
                    {
                        let mut last = last_decode.lock().unwrap();
                        if let Some(at) = *last {
                            if at.elapsed() < detection_interval {
                                return Ok(gstreamer::FlowSuccess::Ok);
                            }
                        }
                        *last = Some(Instant::now());
                    }

                    let Some(frame) = gray_frame(&sample) else {
                        trace!("Skipping unmappable sample");
                        return Ok(gstreamer::FlowSuccess::Ok);
                    };

                    on_detections(detector::decode_frame(&frame));
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        let pipeline = gstreamer::Pipeline::new();
        pipeline
            .add_many([&source, &flip, &convert, appsink.upcast_ref()])
            .map_err(|e| {
                CaptureError::InitializationFailed(format!("Failed to assemble pipeline: {}", e))
            })?;
        gstreamer::Element::link_many([&source, &flip, &convert, appsink.upcast_ref()]).map_err(
            |e| CaptureError::InitializationFailed(format!("Failed to link pipeline: {}", e)),
        )?;

        info!(interval_ms = detection_interval.as_millis(), "Capture pipeline configured");

        Ok(Self {
            pipeline,
            flip,
            running: Mutex::new(false),
        })
    }
}

impl CaptureSession for GstCaptureSession {
    fn start(&self) -> CaptureResult<()> {
        let mut running = self.running.lock().unwrap();
        if *running {
            return Ok(());
        }
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CaptureError::StateChange(format!("Failed to start pipeline: {}", e)))?;
        *running = true;
        debug!("Capture pipeline started");
        Ok(())
    }

    fn stop(&self) -> CaptureResult<()> {
        let mut running = self.running.lock().unwrap();
        if !*running {
            return Ok(());
        }
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| CaptureError::StateChange(format!("Failed to stop pipeline: {}", e)))?;
        *running = false;
        debug!("Capture pipeline stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    fn set_orientation(&self, orientation: Orientation) {
        self.flip
            .set_property_from_str("method", flip_method(orientation));
        debug!(orientation = %orientation, "Applied orientation to pipeline");
    }
}

impl Drop for GstCaptureSession {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}

/// Create the first camera source element available on this system
fn make_source() -> CaptureResult<gstreamer::Element> {
    for factory in SOURCE_FACTORIES {
        match gstreamer::ElementFactory::make(factory)
            .name("qr_capture_source")
            .build()
        {
            Ok(element) => {
                debug!(factory, "Using camera source");
                return Ok(element);
            }
            Err(e) => {
                warn!(factory, error = %e, "Camera source factory unavailable");
            }
        }
    }
    Err(CaptureError::NoDevice)
}

/// Map an interface orientation onto a videoflip method
fn flip_method(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Portrait => "none",
        Orientation::PortraitUpsideDown => "rotate-180",
        Orientation::LandscapeLeft => "counterclockwise",
        Orientation::LandscapeRight => "clockwise",
    }
}

/// Copy a GRAY8 sample into an owned image, honoring the row stride
fn gray_frame(sample: &gstreamer::Sample) -> Option<GrayImage> {
    let caps = sample.caps()?;
    let info = gstreamer_video::VideoInfo::from_caps(caps).ok()?;
    let buffer = sample.buffer()?;
    let map = buffer.map_readable().ok()?;

    let width = info.width() as usize;
    let height = info.height() as usize;
    let stride = info.stride().first().copied()? as usize;

    let data = map.as_slice();
    let mut pixels = Vec::with_capacity(width * height);
    for row in 0..height {
        let start = row * stride;
        pixels.extend_from_slice(data.get(start..start + width)?);
    }

    GrayImage::from_raw(width as u32, height as u32, pixels)
}
