//! RGBA drawing surface with PNG data-URI encoding.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::stroke::Point;
use crate::Error;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidInput(format!("invalid colour: {input}"));
        let hex = input.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17).map_err(|_| invalid());
                Ok(Color { r: nibble(0)?, g: nibble(1)?, b: nibble(2)?, a: 255 })
            }
            6 => Ok(Color { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: 255 }),
            8 => Ok(Color { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? }),
            _ => Err(invalid()),
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// Source-over compositing of one straight-alpha pixel onto another.
fn composite(dst: &mut [u8], src: [u8; 4]) {
    let sa = src[3] as u32;
    if sa == 255 {
        dst.copy_from_slice(&src);
        return;
    }
    if sa == 0 {
        return;
    }

    let da = dst[3] as u32;
    let dst_weight = da * (255 - sa) / 255;
    let out_a = sa + dst_weight;
    for (d, s) in dst.iter_mut().zip(src).take(3) {
        *d = ((s as u32 * sa + *d as u32 * dst_weight) / out_a) as u8;
    }
    dst[3] = out_a as u8;
}

fn raster_err(e: impl fmt::Display) -> Error {
    Error::Raster(e.to_string())
}

/// Fixed-size RGBA8 pixel buffer, initially fully transparent.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster").field("width", &self.width).field("height", &self.height).finish()
    }
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0; width as usize * height as usize * 4] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|p| p[3] == 0)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    fn composite_at(&mut self, x: u32, y: u32, src: [u8; 4]) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        composite(&mut self.pixels[i..i + 4], src);
    }

    /// Stroke a straight segment with round caps.
    ///
    /// A pixel is painted when its centre lies within `line_width / 2` of the
    /// segment, so consecutive segments sharing an end point join seamlessly.
    pub fn stroke_segment(&mut self, from: Point, to: Point, color: Color, line_width: f32) {
        let half = line_width / 2.0;
        if half.is_nan() || half <= 0.0 {
            return;
        }

        let clamp_lo = |v: f32| v.floor().max(0.0) as u32;
        let min_x = clamp_lo(from.x.min(to.x) - half);
        let min_y = clamp_lo(from.y.min(to.y) - half);
        let max_x = ((from.x.max(to.x) + half).ceil().max(0.0) as u32).min(self.width);
        let max_y = ((from.y.max(to.y) + half).ceil().max(0.0) as u32).min(self.height);

        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let len_sq = dx * dx + dy * dy;
        let src = color.to_array();

        for y in min_y..max_y {
            for x in min_x..max_x {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let t = if len_sq == 0.0 { 0.0 } else { (((px - from.x) * dx + (py - from.y) * dy) / len_sq).clamp(0.0, 1.0) };
                let (cx, cy) = (from.x + t * dx, from.y + t * dy);
                if (px - cx).powi(2) + (py - cy).powi(2) <= half * half {
                    self.composite_at(x, y, src);
                }
            }
        }
    }

    /// Composite `image` onto this surface with its top-left corner at the
    /// origin, clipping whatever falls outside.
    pub fn draw_image(&mut self, image: &Raster) {
        let w = self.width.min(image.width);
        let h = self.height.min(image.height);
        for y in 0..h {
            for x in 0..w {
                if let Some(src) = image.pixel(x, y) {
                    self.composite_at(x, y, src);
                }
            }
        }
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().map_err(raster_err)?;
            writer.write_image_data(&self.pixels).map_err(raster_err)?;
            writer.finish().map_err(raster_err)?;
        }
        Ok(out)
    }

    /// Decode a PNG of any colour type into RGBA8.
    pub fn decode_png(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = png::Decoder::new(bytes);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info().map_err(raster_err)?;

        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).map_err(raster_err)?;
        buf.truncate(info.buffer_size());

        let pixels = match info.color_type {
            png::ColorType::Rgba => buf,
            png::ColorType::Rgb => buf.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect(),
            png::ColorType::GrayscaleAlpha => buf.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect(),
            png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            png::ColorType::Indexed => return Err(Error::Raster("unexpanded palette image".into())),
        };

        if pixels.len() != info.width as usize * info.height as usize * 4 {
            return Err(Error::Raster("decoded pixel buffer has unexpected size".into()));
        }

        Ok(Self { width: info.width, height: info.height, pixels })
    }

    /// Encode as a `data:image/png;base64,` URI.
    pub fn to_data_url(&self) -> Result<String, Error> {
        Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(self.encode_png()?)))
    }

    /// Decode a PNG data URI.
    pub fn from_data_url(data_url: &str) -> Result<Self, Error> {
        let payload = data_url
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or_else(|| Error::Raster("not a base64 PNG data URI".into()))?;
        let bytes = STANDARD.decode(payload.trim()).map_err(raster_err)?;
        Self::decode_png(&bytes)
    }
}
