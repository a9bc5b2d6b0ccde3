//! Per-texture transcoding.
//!
//! Each texture entry gets a [`TextureRecord`]. The actual work runs once per
//! distinct embedded image (several textures may sample the same image):
//! decode, gamma-correct when the image is only used as color data, resize to
//! the configured cap, re-encode as PNG, and keep the original bytes when the
//! new encoding would only make the file bigger.
//!
//! Jobs run on the rayon pool and share nothing but read-only inputs; a failed
//! job falls back to the original bytes without affecting the others.

use crate::codec::{is_png, sniff_mime, ImageDecoder, PngEncoder, RgbaPixels};
use crate::config::ConvertConfig;
use crate::diffuse::DiffuseSet;
use crate::gamma::GammaTable;
use crate::manifest::Manifest;
use image::imageops::FilterType;
use image::{ImageBuffer, RgbaImage};
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;

pub const PNG_MIME: &str = "image/png";

/// Recoverable failure while transcoding one texture
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextureError {
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    #[error("encode failure: {0}")]
    EncodeFailure(String),

    #[error("missing dimensions: {0}")]
    MissingDimensions(String),
}

/// Where a texture ended up after transcoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TextureStatus {
    Pending,
    /// Replaced by a new PNG encoding
    Recompressed {
        width: u32,
        height: u32,
        resized: bool,
        gamma_corrected: bool,
    },
    /// Original bytes kept (size regression or failure)
    Unmodified { reason: String },
    /// Never processed (image not embedded in the BIN chunk)
    Skipped { reason: String },
}

/// Working state for one manifest texture entry
#[derive(Debug, Clone)]
pub struct TextureRecord {
    pub index: usize,
    pub name: Option<String>,
    pub image: Option<usize>,
    /// Buffer view holding the image bytes in the BIN payload
    pub view: Option<usize>,
    pub original_range: Option<Range<usize>>,
    pub mime_guess: Option<String>,
    pub is_diffuse: bool,
    /// Replacement bytes, shared by every texture sampling the same image
    pub new_bytes: Option<Arc<[u8]>>,
    pub status: TextureStatus,
}

impl TextureRecord {
    pub fn original_len(&self) -> usize {
        self.original_range.as_ref().map_or(0, |r| r.len())
    }

    /// Length the texture's bytes will have in the output
    pub fn final_len(&self) -> usize {
        self.new_bytes
            .as_ref()
            .map_or_else(|| self.original_len(), |b| b.len())
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("texture {} ({})", self.index, name),
            None => format!("texture {}", self.index),
        }
    }
}

/// Creates one record per manifest texture. Textures that cannot be
/// transcoded get their final status straight away.
pub fn build_records(manifest: &Manifest, bin: &[u8], diffuse: &DiffuseSet) -> Vec<TextureRecord> {
    let glb_buffer = manifest.glb_buffer();

    manifest
        .textures
        .iter()
        .enumerate()
        .map(|(index, texture)| {
            let image = manifest.texture_image(index);
            let image_def = image.and_then(|i| manifest.images.get(i));
            let name = texture
                .name
                .clone()
                .or_else(|| image_def.and_then(|i| i.name.clone()));

            let mut record = TextureRecord {
                index,
                name,
                image,
                view: None,
                original_range: None,
                mime_guess: image_def.and_then(|i| i.mime_type.clone()),
                is_diffuse: diffuse.is_diffuse(index),
                new_bytes: None,
                status: TextureStatus::Pending,
            };

            let skip = |reason: &str| TextureStatus::Skipped {
                reason: reason.to_string(),
            };

            let Some(image_def) = image_def else {
                record.status = TextureStatus::Unmodified {
                    reason: "texture has no source image".to_string(),
                };
                return record;
            };
            let Some(view) = image.and_then(|i| manifest.image_view(i)) else {
                record.status = skip(if image_def.uri.is_some() {
                    "image is stored outside the container"
                } else {
                    "image has no buffer view"
                });
                return record;
            };
            if Some(manifest.buffer_views[view].buffer) != glb_buffer {
                record.status = skip("image lives in an external buffer");
                return record;
            }
            let Some(range) = manifest.view_range(view).filter(|r| r.end <= bin.len()) else {
                record.status = skip("image bytes lie outside the binary payload");
                return record;
            };

            if record.mime_guess.is_none() {
                record.mime_guess = sniff_mime(&bin[range.clone()]).map(str::to_string);
            }
            record.view = Some(view);
            record.original_range = Some(range);
            record
        })
        .collect()
}

/// Transcoding work for one embedded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub image: usize,
    pub view: usize,
    pub range: Range<usize>,
    pub mime: Option<String>,
    /// Texture entries sampling this image
    pub textures: Vec<usize>,
    pub apply_gamma: bool,
    /// Used as a diffuse map and as something else at the same time
    pub mixed_use: bool,
}

/// Groups pending records by image. An image is gamma-corrected only when
/// every texture sampling it is diffuse and none is also bound to a data slot.
pub fn plan_jobs(records: &[TextureRecord], diffuse: &DiffuseSet) -> Vec<ImageJob> {
    let mut jobs: Vec<ImageJob> = Vec::new();

    for record in records {
        let (Some(image), Some(view), Some(range), TextureStatus::Pending) =
            (record.image, record.view, record.original_range.clone(), &record.status)
        else {
            continue;
        };
        match jobs.iter_mut().find(|j| j.image == image) {
            Some(job) => job.textures.push(record.index),
            None => jobs.push(ImageJob {
                image,
                view,
                range,
                mime: record.mime_guess.clone(),
                textures: vec![record.index],
                apply_gamma: false,
                mixed_use: false,
            }),
        }
    }

    for job in &mut jobs {
        let any_diffuse = job.textures.iter().any(|&t| diffuse.is_diffuse(t));
        let all_color = job
            .textures
            .iter()
            .all(|&t| diffuse.is_diffuse(t) && !diffuse.has_data_use(t));
        job.apply_gamma = all_color;
        job.mixed_use = any_diffuse && !all_color;
    }

    jobs
}

/// Result of one image job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replaced {
        bytes: Vec<u8>,
        width: u32,
        height: u32,
        resized: bool,
        gamma_corrected: bool,
    },
    /// New encoding rejected; original bytes stay
    Kept { reason: String },
    Failed(TextureError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub image: usize,
    pub source_len: usize,
    pub outcome: Outcome,
}

/// Dimensions after scaling the longest edge down to `max_dim`, flooring each
/// edge and keeping at least one pixel.
pub fn target_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dim {
        return (width, height);
    }
    let scale = |edge: u32| ((edge as u64 * max_dim as u64) / longest as u64).max(1) as u32;
    (scale(width), scale(height))
}

/// Resizes RGBA pixels so the longest edge is at most `max_dim`, using Lanczos3.
pub fn resize_pixels(pixels: RgbaPixels, max_dim: u32) -> Result<RgbaPixels, TextureError> {
    let (new_width, new_height) = target_dimensions(pixels.width, pixels.height, max_dim);
    if new_width == pixels.width && new_height == pixels.height {
        return Ok(pixels);
    }

    let (width, height) = (pixels.width, pixels.height);
    let img: RgbaImage = ImageBuffer::from_raw(width, height, pixels.data).ok_or_else(|| {
        TextureError::MissingDimensions(format!("pixel buffer does not match {}x{}", width, height))
    })?;
    let resized = image::imageops::resize(&img, new_width, new_height, FilterType::Lanczos3);

    Ok(RgbaPixels {
        width: new_width,
        height: new_height,
        data: resized.into_raw(),
    })
}

/// Runs image jobs against a shared gamma table and codec pair
pub struct Transcoder<'a> {
    table: GammaTable,
    palette_size: u16,
    max_dimension: Option<u32>,
    decoder: &'a dyn ImageDecoder,
    encoder: &'a dyn PngEncoder,
}

impl<'a> Transcoder<'a> {
    pub fn new(config: &ConvertConfig, decoder: &'a dyn ImageDecoder, encoder: &'a dyn PngEncoder) -> Self {
        Self {
            table: GammaTable::new(config.gamma),
            palette_size: config.quality.palette_size(),
            max_dimension: config.effective_max_dimension(),
            decoder,
            encoder,
        }
    }

    pub fn gamma_table(&self) -> &GammaTable {
        &self.table
    }

    /// Transcodes one image. Never panics on bad input; failures become
    /// [`Outcome::Failed`].
    pub fn transcode(&self, job: &ImageJob, source: &[u8]) -> Outcome {
        match self.try_transcode(job, source) {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(e),
        }
    }

    fn try_transcode(&self, job: &ImageJob, source: &[u8]) -> Result<Outcome, TextureError> {
        let mut pixels = self.decoder.decode(source)?;
        if pixels.width == 0 || pixels.height == 0 {
            return Err(TextureError::MissingDimensions(format!(
                "decoded image is {}x{}",
                pixels.width, pixels.height
            )));
        }

        if job.apply_gamma {
            self.table.apply_rgba(&mut pixels.data);
        }

        let mut resized = false;
        if let Some(max) = self.max_dimension {
            if pixels.width.max(pixels.height) > max {
                pixels = resize_pixels(pixels, max)?;
                resized = true;
            }
        }

        let encoded = self.encoder.encode(&pixels, self.palette_size)?;

        let pixels_changed = job.apply_gamma || resized;
        let source_is_png = is_png(source, job.mime.as_deref());
        if encoded.len() > source.len() && (source_is_png || !pixels_changed) {
            return Ok(Outcome::Kept {
                reason: format!(
                    "re-encoded size {} bytes exceeds original {} bytes",
                    encoded.len(),
                    source.len()
                ),
            });
        }

        Ok(Outcome::Replaced {
            bytes: encoded,
            width: pixels.width,
            height: pixels.height,
            resized,
            gamma_corrected: job.apply_gamma,
        })
    }

    /// Runs every job in parallel and returns once all of them have settled.
    /// Results come back in job order.
    pub fn run(&self, jobs: &[ImageJob], bin: &[u8]) -> Vec<JobResult> {
        jobs.par_iter()
            .map(|job| {
                let source = &bin[job.range.clone()];
                let _span = tracing::debug_span!("transcode", image = job.image, bytes = source.len()).entered();
                let outcome = self.transcode(job, source);
                tracing::debug!(image = job.image, outcome = outcome_kind(&outcome), "transcode settled");
                JobResult {
                    image: job.image,
                    source_len: source.len(),
                    outcome,
                }
            })
            .collect()
    }
}

fn outcome_kind(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Replaced { .. } => "replaced",
        Outcome::Kept { .. } => "kept",
        Outcome::Failed(_) => "failed",
    }
}

/// Copies job outcomes into the records of every texture sampling each image
pub fn apply_results(records: &mut [TextureRecord], jobs: &[ImageJob], results: &[JobResult]) {
    for (job, result) in jobs.iter().zip(results) {
        let (bytes, status) = match &result.outcome {
            Outcome::Replaced {
                bytes,
                width,
                height,
                resized,
                gamma_corrected,
            } => (
                Some(Arc::<[u8]>::from(bytes.as_slice())),
                TextureStatus::Recompressed {
                    width: *width,
                    height: *height,
                    resized: *resized,
                    gamma_corrected: *gamma_corrected,
                },
            ),
            Outcome::Kept { reason } => (None, TextureStatus::Unmodified { reason: reason.clone() }),
            Outcome::Failed(e) => (None, TextureStatus::Unmodified { reason: e.to_string() }),
        };

        for &texture in &job.textures {
            if let Some(record) = records.get_mut(texture) {
                record.new_bytes = bytes.clone();
                record.status = status.clone();
            }
        }
    }
}

/// Marks replaced images as PNG in the manifest
pub fn update_mime_types(manifest: &mut Manifest, results: &[JobResult]) {
    for result in results {
        if let Outcome::Replaced { .. } = result.outcome {
            if let Some(image) = manifest.images.get_mut(result.image) {
                image.mime_type = Some(PNG_MIME.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ImageCrateDecoder, QuantizingPngEncoder, LOSSLESS};
    use crate::gamma::GammaDirection;
    use crate::config::{Quality, QualityLevel};

    fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let pixels = RgbaPixels {
            width,
            height,
            data: rgba.repeat((width * height) as usize),
        };
        QuantizingPngEncoder::default().encode(&pixels, LOSSLESS).unwrap()
    }

    /// Solid PNG with an uncompressed text chunk, larger than any re-encode
    fn padded_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let data = rgba.repeat((width * height) as usize);
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder
                .add_itxt_chunk("Comment".to_string(), "x".repeat(4096))
                .unwrap();
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&data).unwrap();
            writer.finish().unwrap();
        }
        out
    }

    fn job(len: usize, apply_gamma: bool, mime: Option<&str>) -> ImageJob {
        ImageJob {
            image: 0,
            view: 0,
            range: 0..len,
            mime: mime.map(str::to_string),
            textures: vec![0],
            apply_gamma,
            mixed_use: false,
        }
    }

    /// Encoder that always produces more bytes than any test source
    struct BloatedEncoder;

    impl PngEncoder for BloatedEncoder {
        fn encode(&self, _pixels: &RgbaPixels, _palette_size: u16) -> Result<Vec<u8>, TextureError> {
            Ok(vec![0u8; 1 << 20])
        }
    }

    struct FailingEncoder;

    impl PngEncoder for FailingEncoder {
        fn encode(&self, _pixels: &RgbaPixels, _palette_size: u16) -> Result<Vec<u8>, TextureError> {
            Err(TextureError::EncodeFailure("out of colors".to_string()))
        }
    }

    fn decode_outcome(outcome: &Outcome) -> RgbaPixels {
        match outcome {
            Outcome::Replaced { bytes, .. } => ImageCrateDecoder.decode(bytes).unwrap(),
            other => panic!("expected a replacement, got {:?}", other),
        }
    }

    #[test]
    fn target_dimensions_floor_and_clamp() {
        assert_eq!(target_dimensions(2048, 2048, 1024), (1024, 1024));
        assert_eq!(target_dimensions(3000, 1000, 1024), (1024, 341));
        assert_eq!(target_dimensions(4096, 2, 1024), (1024, 1));
        assert_eq!(target_dimensions(512, 256, 1024), (512, 256));
    }

    #[test]
    fn diffuse_image_is_gamma_corrected() {
        let source = padded_png(8, 8, [128, 128, 128, 255]);
        let config = ConvertConfig::default().with_gamma(GammaDirection::Delinearize);
        let encoder = QuantizingPngEncoder::default();
        let transcoder = Transcoder::new(&config, &ImageCrateDecoder, &encoder);

        let outcome = transcoder.transcode(&job(source.len(), true, Some(PNG_MIME)), &source);
        let pixels = decode_outcome(&outcome);
        let expected = transcoder.gamma_table().lookup(128);
        assert_eq!(pixels.pixel(0, 0), Some([expected, expected, expected, 255]));
    }

    #[test]
    fn non_diffuse_pixels_are_unchanged() {
        let source = solid_png(8, 8, [90, 160, 250, 255]);
        let config = ConvertConfig::default().with_gamma(GammaDirection::Linearize);
        let encoder = QuantizingPngEncoder::default();
        let transcoder = Transcoder::new(&config, &ImageCrateDecoder, &encoder);

        match transcoder.transcode(&job(source.len(), false, Some(PNG_MIME)), &source) {
            Outcome::Replaced { bytes, .. } => {
                let pixels = ImageCrateDecoder.decode(&bytes).unwrap();
                assert_eq!(pixels.pixel(4, 4), Some([90, 160, 250, 255]));
            }
            Outcome::Kept { .. } => {}
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn larger_png_keeps_original() {
        let source = solid_png(8, 8, [1, 2, 3, 255]);
        let config = ConvertConfig::default();
        let transcoder = Transcoder::new(&config, &ImageCrateDecoder, &BloatedEncoder);

        let outcome = transcoder.transcode(&job(source.len(), false, Some(PNG_MIME)), &source);
        assert!(matches!(outcome, Outcome::Kept { .. }));
    }

    #[test]
    fn gamma_corrected_png_that_grows_keeps_original() {
        let source = solid_png(8, 8, [128, 128, 128, 255]);
        let config = ConvertConfig::default().with_gamma(GammaDirection::Delinearize);
        let transcoder = Transcoder::new(&config, &ImageCrateDecoder, &BloatedEncoder);

        match transcoder.transcode(&job(source.len(), true, Some(PNG_MIME)), &source) {
            Outcome::Kept { reason } => assert!(reason.contains("exceeds original"), "{}", reason),
            other => panic!("expected the original to be kept, got {:?}", other),
        }
    }

    #[test]
    fn larger_png_accepted_for_changed_non_png_source() {
        let source = solid_png(8, 8, [1, 2, 3, 255]);
        let config = ConvertConfig::default();
        let transcoder = Transcoder::new(&config, &ImageCrateDecoder, &BloatedEncoder);

        // Declared as JPEG: there is no original PNG to fall back to once pixels change
        let changed = transcoder.transcode(&job(source.len(), true, Some("image/jpeg")), &source);
        assert!(matches!(changed, Outcome::Replaced { .. }));

        let unchanged = transcoder.transcode(&job(source.len(), false, Some("image/jpeg")), &source);
        assert!(matches!(unchanged, Outcome::Kept { .. }));
    }

    #[test]
    fn failures_are_reported_not_raised() {
        let config = ConvertConfig::default();
        let encoder = QuantizingPngEncoder::default();
        let transcoder = Transcoder::new(&config, &ImageCrateDecoder, &encoder);
        let garbage = b"definitely not pixels";
        assert!(matches!(
            transcoder.transcode(&job(garbage.len(), true, None), garbage),
            Outcome::Failed(TextureError::DecodeFailure(_))
        ));

        let source = solid_png(4, 4, [0, 0, 0, 255]);
        let failing = Transcoder::new(&config, &ImageCrateDecoder, &FailingEncoder);
        assert!(matches!(
            failing.transcode(&job(source.len(), false, Some(PNG_MIME)), &source),
            Outcome::Failed(TextureError::EncodeFailure(_))
        ));
    }

    #[test]
    fn max_dimension_caps_longest_edge() {
        let source = solid_png(40, 20, [200, 100, 50, 255]);
        let config = ConvertConfig::default()
            .with_quality(Quality::Level(QualityLevel::Aggressive))
            .with_max_dimension(16);
        let encoder = QuantizingPngEncoder::default();
        let transcoder = Transcoder::new(&config, &ImageCrateDecoder, &encoder);

        match transcoder.transcode(&job(source.len(), false, None), &source) {
            Outcome::Replaced { width, height, resized, .. } => {
                assert_eq!((width, height), (16, 8));
                assert!(resized);
            }
            Outcome::Kept { .. } => {}
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }

        let pixels = resize_pixels(ImageCrateDecoder.decode(&source).unwrap(), 16).unwrap();
        assert_eq!((pixels.width, pixels.height), (16, 8));
        assert_eq!(pixels.data.len(), 16 * 8 * 4);
    }

    fn records_for(json: &str, bin: &[u8]) -> (Manifest, DiffuseSet, Vec<TextureRecord>) {
        let manifest = Manifest::from_json(json).unwrap();
        let graph = crate::scene::SceneGraph::build(&manifest);
        let diffuse = DiffuseSet::resolve(&graph, manifest.textures.len());
        let records = build_records(&manifest, bin, &diffuse);
        (manifest, diffuse, records)
    }

    #[test]
    fn records_skip_external_and_sourceless_textures() {
        let (_, _, records) = records_for(
            r#"{
                "buffers": [{"byteLength": 8}],
                "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 8}],
                "images": [{"bufferView": 0, "mimeType": "image/png", "name": "albedo"}, {"uri": "tex.png"}],
                "textures": [{"source": 0}, {"source": 1}, {}]
            }"#,
            &[0u8; 8],
        );
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].status, TextureStatus::Pending);
        assert_eq!(records[0].name.as_deref(), Some("albedo"));
        assert_eq!(records[0].original_range, Some(0..8));
        assert!(matches!(records[1].status, TextureStatus::Skipped { .. }));
        assert!(matches!(records[2].status, TextureStatus::Unmodified { .. }));
    }

    #[test]
    fn shared_image_with_data_use_is_not_gamma_corrected() {
        let (_, diffuse, records) = records_for(
            r#"{
                "buffers": [{"byteLength": 8}],
                "bufferViews": [{"buffer": 0, "byteLength": 8}],
                "images": [{"bufferView": 0, "mimeType": "image/png"}],
                "textures": [{"source": 0}, {"source": 0}],
                "materials": [{
                    "pbrMetallicRoughness": {"baseColorTexture": {"index": 0}},
                    "normalTexture": {"index": 1}
                }],
                "meshes": [{"primitives": [{"material": 0}]}],
                "nodes": [{"mesh": 0}]
            }"#,
            &[0u8; 8],
        );
        let jobs = plan_jobs(&records, &diffuse);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].textures, vec![0, 1]);
        assert!(!jobs[0].apply_gamma);
        assert!(jobs[0].mixed_use);
    }

    #[test]
    fn results_fan_out_to_all_textures_of_an_image() {
        let source = solid_png(4, 4, [10, 10, 10, 255]);
        let json = format!(
            r#"{{
                "buffers": [{{"byteLength": {len}}}],
                "bufferViews": [{{"buffer": 0, "byteLength": {len}}}],
                "images": [{{"bufferView": 0}}],
                "textures": [{{"source": 0}}, {{"source": 0}}]
            }}"#,
            len = source.len()
        );
        let (mut manifest, diffuse, mut records) = records_for(&json, &source);
        assert_eq!(records[0].mime_guess.as_deref(), Some(PNG_MIME));

        let jobs = plan_jobs(&records, &diffuse);
        let results = vec![JobResult {
            image: 0,
            source_len: source.len(),
            outcome: Outcome::Replaced {
                bytes: vec![1, 2, 3],
                width: 4,
                height: 4,
                resized: false,
                gamma_corrected: false,
            },
        }];
        apply_results(&mut records, &jobs, &results);
        update_mime_types(&mut manifest, &results);

        assert_eq!(records[0].final_len(), 3);
        assert_eq!(records[1].final_len(), 3);
        assert!(matches!(records[1].status, TextureStatus::Recompressed { .. }));
        assert_eq!(manifest.images[0].mime_type.as_deref(), Some(PNG_MIME));
    }

    #[test]
    fn run_returns_results_in_job_order() {
        let first = solid_png(4, 4, [255, 0, 0, 255]);
        let second = b"broken".to_vec();
        let mut bin = first.clone();
        bin.extend_from_slice(&second);

        let jobs = vec![
            ImageJob { image: 0, range: 0..first.len(), ..job(0, false, None) },
            ImageJob { image: 1, range: first.len()..bin.len(), ..job(0, false, None) },
        ];
        let config = ConvertConfig::default();
        let encoder = QuantizingPngEncoder::default();
        let transcoder = Transcoder::new(&config, &ImageCrateDecoder, &encoder);
        let results = transcoder.run(&jobs, &bin);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].image, 0);
        assert_eq!(results[1].image, 1);
        assert!(matches!(results[1].outcome, Outcome::Failed(_)));
    }
}
