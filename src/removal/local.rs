//! In-process background removal.
//!
//! Works well for the common product-shot case: a subject on a roughly
//! uniform backdrop that touches the image edges.
//!
//! # Algorithm
//!
//! 1. Decode the upload (JPEG, PNG, WebP, GIF, BMP) and convert to RGBA.
//! 2. Estimate the backdrop colour as the per-channel median of the border.
//! 3. Flood-fill from every border pixel through 4-connected pixels whose
//!    colour lies within `tolerance` of the backdrop.
//! 4. Make filled pixels fully transparent; soften the alpha of foreground
//!    pixels touching the fill so edges are not jagged.
//! 5. Encode the result as RGBA PNG.
//!
//! Regions of backdrop colour enclosed by the subject are not reachable from
//! the border and stay opaque.

use std::collections::VecDeque;
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use crate::error::RemovalError;

use super::BackgroundRemover;

/// Default colour distance (Euclidean, RGB) treated as backdrop.
pub const DEFAULT_TOLERANCE: u8 = 48;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Check whether bytes start with the PNG signature.
pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}

/// Border-keyed flood-fill remover.
#[derive(Debug, Clone)]
pub struct LocalRemover {
    tolerance: u8,
}

impl Default for LocalRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRemover {
    /// Create a remover with the default tolerance.
    pub fn new() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Create a remover with a custom tolerance.
    ///
    /// Higher values eat further into colours close to the backdrop.
    pub fn with_tolerance(tolerance: u8) -> Self {
        Self { tolerance }
    }

    /// Run the removal synchronously.
    ///
    /// This is CPU-bound; the async entry point moves it off the runtime.
    pub fn remove_blocking(&self, image: &[u8]) -> Result<Bytes, RemovalError> {
        if image.is_empty() {
            return Err(RemovalError::EmptyInput);
        }

        let decoded = image::load_from_memory(image).map_err(|e| RemovalError::Decode {
            message: e.to_string(),
        })?;

        let mut rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let removed = key_out_border(&mut rgba, self.tolerance);

        debug!(
            width = width,
            height = height,
            removed_pixels = removed,
            "Background keyed out"
        );

        encode_png(rgba)
    }
}

#[async_trait]
impl BackgroundRemover for LocalRemover {
    async fn remove(&self, image: Bytes) -> Result<Bytes, RemovalError> {
        let remover = self.clone();
        tokio::task::spawn_blocking(move || remover.remove_blocking(&image))
            .await
            .map_err(|e| RemovalError::Encode {
                message: format!("removal task failed: {}", e),
            })?
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

// =============================================================================
// Keying
// =============================================================================

/// Make the border-connected backdrop transparent.
///
/// Returns the number of pixels cleared.
fn key_out_border(img: &mut RgbaImage, tolerance: u8) -> usize {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return 0;
    }

    let backdrop = border_median(img);
    let limit = f32::from(tolerance);
    let w = width as usize;
    let h = height as usize;

    let mut background = vec![false; w * h];
    let mut queue = VecDeque::new();

    let seed = |x: u32, y: u32, background: &mut Vec<bool>, queue: &mut VecDeque<(u32, u32)>| {
        let idx = y as usize * w + x as usize;
        if !background[idx] && is_backdrop(img.get_pixel(x, y), backdrop, limit) {
            background[idx] = true;
            queue.push_back((x, y));
        }
    };

    for x in 0..width {
        seed(x, 0, &mut background, &mut queue);
        seed(x, height - 1, &mut background, &mut queue);
    }
    for y in 0..height {
        seed(0, y, &mut background, &mut queue);
        seed(width - 1, y, &mut background, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        for (nx, ny) in neighbours(x, y, width, height) {
            let idx = ny as usize * w + nx as usize;
            if !background[idx] && is_backdrop(img.get_pixel(nx, ny), backdrop, limit) {
                background[idx] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    let mut removed = 0;
    for y in 0..height {
        for x in 0..width {
            let idx = y as usize * w + x as usize;
            if background[idx] {
                img.get_pixel_mut(x, y)[3] = 0;
                removed += 1;
                continue;
            }

            let touches_background = neighbours(x, y, width, height)
                .any(|(nx, ny)| background[ny as usize * w + nx as usize]);
            if touches_background {
                let pixel = img.get_pixel_mut(x, y);
                let weight = (distance(pixel, backdrop) / (2.0 * limit.max(1.0))).min(1.0);
                pixel[3] = (f32::from(pixel[3]) * weight).round() as u8;
            }
        }
    }

    removed
}

/// Per-channel median of the outermost ring of pixels.
fn border_median(img: &RgbaImage) -> [u8; 3] {
    let (width, height) = img.dimensions();
    let mut channels: [Vec<u8>; 3] = Default::default();

    let mut push = |p: &Rgba<u8>| {
        for (c, values) in channels.iter_mut().enumerate() {
            values.push(p[c]);
        }
    };

    for x in 0..width {
        push(img.get_pixel(x, 0));
        if height > 1 {
            push(img.get_pixel(x, height - 1));
        }
    }
    for y in 1..height.saturating_sub(1) {
        push(img.get_pixel(0, y));
        if width > 1 {
            push(img.get_pixel(width - 1, y));
        }
    }

    let mut median = [0u8; 3];
    for (c, values) in channels.iter_mut().enumerate() {
        values.sort_unstable();
        median[c] = values[values.len() / 2];
    }
    median
}

fn is_backdrop(pixel: &Rgba<u8>, backdrop: [u8; 3], limit: f32) -> bool {
    // already transparent pixels join the backdrop
    pixel[3] == 0 || distance(pixel, backdrop) <= limit
}

fn distance(pixel: &Rgba<u8>, backdrop: [u8; 3]) -> f32 {
    let sum: f32 = (0..3)
        .map(|c| {
            let d = f32::from(pixel[c]) - f32::from(backdrop[c]);
            d * d
        })
        .sum();
    sum.sqrt()
}

fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let left = x.checked_sub(1).map(|nx| (nx, y));
    let right = (x + 1 < width).then_some((x + 1, y));
    let up = y.checked_sub(1).map(|ny| (x, ny));
    let down = (y + 1 < height).then_some((x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

fn encode_png(rgba: RgbaImage) -> Result<Bytes, RemovalError> {
    let mut output = Vec::new();
    DynamicImage::ImageRgba8(rgba)
        .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| RemovalError::Encode {
            message: e.to_string(),
        })?;

    Ok(Bytes::from(output))
}

// =============================================================================
// Tests
// =============================================================================
