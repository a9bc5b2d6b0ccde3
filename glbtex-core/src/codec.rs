//! Image decode and PNG encode collaborators.
//!
//! The transcoder only talks to [`ImageDecoder`] (encoded bytes in, RGBA8
//! pixels out) and [`PngEncoder`] (RGBA8 pixels and palette size in, PNG bytes
//! out). The default implementations use the `image` crate for decoding and the
//! `png` crate, with `color_quant` palette reduction, for encoding.

use crate::transcode::TextureError;
use image::{GenericImageView, ImageFormat};

/// Palette size meaning "no quantization"
pub const LOSSLESS: u16 = 0;

/// Decoded RGBA8 pixel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaPixels {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel, row-major)
    pub data: Vec<u8>,
}

impl RgbaPixels {
    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Get pixel at (x, y) as [R, G, B, A]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        if i + 4 > self.data.len() {
            return None;
        }
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn is_opaque(&self) -> bool {
        self.data.chunks_exact(4).all(|p| p[3] == 255)
    }

    fn check_len(&self) -> Result<(), TextureError> {
        if self.width == 0 || self.height == 0 {
            return Err(TextureError::MissingDimensions(format!(
                "{}x{} image",
                self.width, self.height
            )));
        }
        if self.data.len() != self.pixel_count() * 4 {
            return Err(TextureError::MissingDimensions(format!(
                "{} bytes of pixel data for a {}x{} image",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// Turns encoded image bytes into RGBA8 pixels
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaPixels, TextureError>;
}

/// Encodes RGBA8 pixels as PNG. `palette_size` is [`LOSSLESS`] for a
/// truecolor image, otherwise the maximum number of palette entries.
pub trait PngEncoder: Send + Sync {
    fn encode(&self, pixels: &RgbaPixels, palette_size: u16) -> Result<Vec<u8>, TextureError>;
}

/// Guesses the MIME type of encoded image bytes from their signature
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Decoder backed by the `image` crate (PNG, JPEG, ...)
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaPixels, TextureError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| TextureError::DecodeFailure(e.to_string()))?;
        let (width, height) = image.dimensions();
        let pixels = RgbaPixels {
            width,
            height,
            data: image.to_rgba8().into_raw(),
        };
        pixels.check_len()?;
        Ok(pixels)
    }
}

/// PNG encoder backed by the `png` crate. Opaque truecolor images drop the
/// alpha channel; quantized images are written as indexed color with a tRNS
/// chunk when any palette entry is translucent.
#[derive(Debug, Clone, Copy)]
pub struct QuantizingPngEncoder {
    pub compression: png::Compression,
    /// NeuQuant sampling factor: 1 is slowest and best, 30 is fastest
    pub sample_factor: i32,
}

impl Default for QuantizingPngEncoder {
    fn default() -> Self {
        Self {
            compression: png::Compression::Best,
            sample_factor: 10,
        }
    }
}

/// Smallest and largest palette sizes the quantizer accepts
const MIN_PALETTE: usize = 4;
const MAX_PALETTE: usize = 256;

impl QuantizingPngEncoder {
    fn write(
        &self,
        width: u32,
        height: u32,
        color: png::ColorType,
        palette: Option<(Vec<u8>, Option<Vec<u8>>)>,
        data: &[u8],
    ) -> Result<Vec<u8>, TextureError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(self.compression);
            encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);
            if let Some((rgb, trns)) = palette {
                encoder.set_palette(rgb);
                if let Some(alpha) = trns {
                    encoder.set_trns(alpha);
                }
            }

            let mut writer = encoder
                .write_header()
                .map_err(|e| TextureError::EncodeFailure(e.to_string()))?;
            writer
                .write_image_data(data)
                .map_err(|e| TextureError::EncodeFailure(e.to_string()))?;
            writer
                .finish()
                .map_err(|e| TextureError::EncodeFailure(e.to_string()))?;
        }
        Ok(out)
    }

    fn encode_truecolor(&self, pixels: &RgbaPixels) -> Result<Vec<u8>, TextureError> {
        if pixels.is_opaque() {
            let rgb: Vec<u8> = pixels
                .data
                .chunks_exact(4)
                .flat_map(|p| [p[0], p[1], p[2]])
                .collect();
            self.write(pixels.width, pixels.height, png::ColorType::Rgb, None, &rgb)
        } else {
            self.write(pixels.width, pixels.height, png::ColorType::Rgba, None, &pixels.data)
        }
    }

    fn encode_indexed(&self, pixels: &RgbaPixels, colors: usize) -> Result<Vec<u8>, TextureError> {
        let colors = colors.clamp(MIN_PALETTE, MAX_PALETTE);
        if pixels.pixel_count() <= colors {
            return self.encode_truecolor(pixels);
        }
        let quant = color_quant::NeuQuant::new(self.sample_factor, colors, &pixels.data);

        let indices: Vec<u8> = pixels
            .data
            .chunks_exact(4)
            .map(|p| quant.index_of(p) as u8)
            .collect();

        let map = quant.color_map_rgba();
        let rgb: Vec<u8> = map.chunks_exact(4).flat_map(|c| [c[0], c[1], c[2]]).collect();
        let alpha: Vec<u8> = map.chunks_exact(4).map(|c| c[3]).collect();
        let trns = if alpha.iter().all(|&a| a == 255) {
            None
        } else {
            Some(alpha)
        };

        self.write(
            pixels.width,
            pixels.height,
            png::ColorType::Indexed,
            Some((rgb, trns)),
            &indices,
        )
    }
}

impl PngEncoder for QuantizingPngEncoder {
    fn encode(&self, pixels: &RgbaPixels, palette_size: u16) -> Result<Vec<u8>, TextureError> {
        pixels.check_len()?;
        if palette_size == LOSSLESS {
            self.encode_truecolor(pixels)
        } else {
            self.encode_indexed(pixels, palette_size as usize)
        }
    }
}

/// True when the bytes or the declared MIME type identify a PNG
pub fn is_png(bytes: &[u8], declared_mime: Option<&str>) -> bool {
    match declared_mime {
        Some(mime) => mime.eq_ignore_ascii_case("image/png"),
        None => image::guess_format(bytes).ok() == Some(ImageFormat::Png),
    }
}
