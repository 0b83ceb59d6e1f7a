// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection on grayscale camera frames
//!
//! Frames are decoded with the rqrr crate. Each detected symbol yields a
//! [`Detection`] carrying its symbology, decoded payload, and a bounding
//! region in normalized frame coordinates.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::types::Rect;

/// The code format a detection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbology {
    /// A QR symbol
    Qr,
    /// A machine-readable code of another format
    Other,
}

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame
/// dimensions, so they transform to view coordinates regardless of the
/// actual frame size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }

    /// Transform into view coordinates within `view` bounds
    pub fn to_view(&self, view: Rect) -> Rect {
        Rect::new(
            view.x + self.x * view.width,
            view.y + self.y * view.height,
            self.width * view.width,
            self.height * view.height,
        )
    }

    /// True when the region covers no area
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// One machine-readable code recognized in a camera frame
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The code format of this detection
    pub symbology: Symbology,
    /// The decoded string, if decoding succeeded
    pub payload: Option<String>,
    /// Bounding region in normalized frame coordinates
    pub bounds: FrameRegion,
}

/// Decode all QR symbols in a grayscale frame
pub fn decode_frame(frame: &GrayImage) -> Vec<Detection> {
    let start = std::time::Instant::now();
    let (width, height) = frame.dimensions();

    let mut prepared = rqrr::PreparedImage::prepare(frame.clone());
    let grids = prepared.detect_grids();

    let mut detections = Vec::with_capacity(grids.len());
    for grid in grids {
        let bounds = region_from_corners(&grid.bounds, width, height);
        match grid.decode() {
            Ok((_meta, content)) => {
                debug!(
                    length = content.len(),
                    x = bounds.x,
                    y = bounds.y,
                    "Decoded QR code"
                );
                detections.push(Detection {
                    symbology: Symbology::Qr,
                    payload: Some(content),
                    bounds,
                });
            }
            Err(e) => {
                // A grid was located but its content did not decode;
                // report the sighting without a payload.
                debug!(error = %e, "Located QR grid failed to decode");
                detections.push(Detection {
                    symbology: Symbology::Qr,
                    payload: None,
                    bounds,
                });
            }
        }
    }

    trace!(
        count = detections.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Frame decode complete"
    );

    detections
}

/// Axis-aligned bounding box of the grid corner points, normalized.
///
/// Located corners can land slightly outside the frame; clamping keeps the
/// region within 0.0..=1.0.
fn region_from_corners(corners: &[rqrr::Point; 4], frame_width: u32, frame_height: u32) -> FrameRegion {
    let min_x = corners.iter().map(|p| p.x).min().unwrap_or(0).clamp(0, frame_width as i32);
    let max_x = corners.iter().map(|p| p.x).max().unwrap_or(0).clamp(0, frame_width as i32);
    let min_y = corners.iter().map(|p| p.y).min().unwrap_or(0).clamp(0, frame_height as i32);
    let max_y = corners.iter().map(|p| p.y).max().unwrap_or(0).clamp(0, frame_height as i32);

    FrameRegion::from_pixels(
        min_x as u32,
        min_y as u32,
        (max_x - min_x) as u32,
        (max_y - min_y) as u32,
        frame_width,
        frame_height,
    )
}
