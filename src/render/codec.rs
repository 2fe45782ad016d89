use super::params::ImageParams;
use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use image::{GenericImageView, RgbImage};

/// Turns an encoded image into a panel buffer
pub trait ImageCodec: Send + Sync {
    /// Decode `data`, fit it to the panel described by `params` and reduce it
    /// to the panel's colors. Sets `params.has_red` when red ink is used.
    fn decode_and_dither(&self, data: &[u8], params: &mut ImageParams) -> Result<Vec<u8>>;
}

/// Codec for JPEG/PNG sources using error-diffusion dithering.
///
/// Output is one bit plane per ink (black, then red on 2 bpp panels), rows
/// packed MSB first and padded to whole bytes; a set bit means ink.
pub struct DitherCodec;

const WHITE: [f32; 3] = [255.0, 255.0, 255.0];
const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
const RED: [f32; 3] = [255.0, 0.0, 0.0];

#[derive(Clone, Copy, PartialEq)]
enum Ink {
    White,
    Black,
    Red,
}

impl ImageCodec for DitherCodec {
    fn decode_and_dither(&self, data: &[u8], params: &mut ImageParams) -> Result<Vec<u8>> {
        if params.width == 0 || params.height == 0 {
            bail!("Panel has no raster area");
        }

        let decoded = image::load_from_memory(data).context("Failed to decode image")?;
        let rotated = match params.rotate % 4 {
            1 => decoded.rotate90(),
            2 => decoded.rotate180(),
            3 => decoded.rotate270(),
            _ => decoded,
        };

        let (width, height) = (params.width as u32, params.height as u32);
        let fitted = if rotated.dimensions() != (width, height) {
            rotated.resize_exact(width, height, FilterType::Triangle)
        } else {
            rotated
        };
        let fitted = if params.rotate_buffer % 2 == 1 {
            fitted.rotate90()
        } else {
            fitted
        };

        let inks = quantize(&fitted.to_rgb8(), params.bpp >= 2, params.dither);
        let (w, h) = fitted.dimensions();

        let mut buffer = pack_plane(&inks, w, h, Ink::Black, params.invert);
        if params.bpp >= 2 {
            params.has_red = inks.contains(&Ink::Red);
            buffer.extend(pack_plane(&inks, w, h, Ink::Red, false));
        }
        Ok(buffer)
    }
}

/// Map every pixel to an ink, optionally with Floyd-Steinberg error diffusion
fn quantize(img: &RgbImage, allow_red: bool, dither: bool) -> Vec<Ink> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut work: Vec<[f32; 3]> = img
        .pixels()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();
    let mut inks = Vec::with_capacity(w * h);

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let old = work[i];
            let (ink, target) = nearest(old, allow_red);
            inks.push(ink);

            if !dither {
                continue;
            }
            let err = [old[0] - target[0], old[1] - target[1], old[2] - target[2]];
            let mut spread = |dx: isize, dy: usize, factor: f32| {
                let nx = x as isize + dx;
                let ny = y + dy;
                if nx < 0 || nx as usize >= w || ny >= h {
                    return;
                }
                let px = &mut work[ny * w + nx as usize];
                for (channel, e) in px.iter_mut().zip(err) {
                    *channel += e * factor;
                }
            };
            spread(1, 0, 7.0 / 16.0);
            spread(-1, 1, 3.0 / 16.0);
            spread(0, 1, 5.0 / 16.0);
            spread(1, 1, 1.0 / 16.0);
        }
    }
    inks
}

fn nearest(px: [f32; 3], allow_red: bool) -> (Ink, [f32; 3]) {
    let dist = |c: [f32; 3]| {
        (px[0] - c[0]).powi(2) + (px[1] - c[1]).powi(2) + (px[2] - c[2]).powi(2)
    };
    let mut best = (Ink::White, WHITE, dist(WHITE));
    if dist(BLACK) < best.2 {
        best = (Ink::Black, BLACK, dist(BLACK));
    }
    if allow_red && dist(RED) < best.2 {
        best = (Ink::Red, RED, dist(RED));
    }
    (best.0, best.1)
}

fn pack_plane(inks: &[Ink], width: u32, height: u32, ink: Ink, invert: bool) -> Vec<u8> {
    let stride = (width as usize).div_ceil(8);
    let mut plane = vec![0u8; stride * height as usize];
    for y in 0..height as usize {
        for x in 0..width as usize {
            let set = (inks[y * width as usize + x] == ink) != invert;
            if set {
                plane[y * stride + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    plane
}
