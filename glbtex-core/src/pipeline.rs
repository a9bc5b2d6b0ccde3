//! End-to-end conversion.
//!
//! parse -> resolve diffuse set -> transcode (parallel) -> plan layout ->
//! materialize payload -> assemble -> reconcile report.
//!
//! Layout only starts after every transcoding job has settled. Events about
//! individual images are emitted after that barrier, in texture order, so the
//! event stream is the same from run to run.

use crate::codec::{ImageCrateDecoder, ImageDecoder, PngEncoder, QuantizingPngEncoder};
use crate::config::ConvertConfig;
use crate::container::{assemble_glb, parse_glb, ContainerSummary, GlbContainer};
use crate::diffuse::DiffuseSet;
use crate::events::EventSink;
use crate::layout::plan_layout;
use crate::scene::SceneGraph;
use crate::size_report::SizeReport;
use crate::transcode::{
    apply_results, build_records, plan_jobs, update_mime_types, ImageJob, JobResult, Outcome,
    TextureRecord, TextureStatus, Transcoder,
};
use crate::Result;
use serde::Serialize;

/// Output of a successful conversion
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The rebuilt GLB file
    pub bytes: Vec<u8>,
    pub report: SizeReport,
    pub records: Vec<TextureRecord>,
}

/// Runs conversions with a fixed configuration and codec pair
pub struct Converter {
    config: ConvertConfig,
    decoder: Box<dyn ImageDecoder>,
    encoder: Box<dyn PngEncoder>,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            decoder: Box::new(ImageCrateDecoder),
            encoder: Box::new(QuantizingPngEncoder::default()),
        }
    }

    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn with_encoder(mut self, encoder: impl PngEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Converts one GLB file. Fatal errors are reported to `sink` with
    /// severity error and then returned.
    pub fn convert(&self, bytes: &[u8], sink: &mut dyn EventSink) -> Result<Conversion> {
        let _span = tracing::info_span!("convert", bytes = bytes.len()).entered();
        self.run(bytes, sink).map_err(|e| {
            sink.error(&e.to_string());
            e
        })
    }

    fn run(&self, bytes: &[u8], sink: &mut dyn EventSink) -> Result<Conversion> {
        let GlbContainer {
            mut manifest, bin, ..
        } = parse_glb(bytes)?;

        sink.info(&format!(
            "Parsed container: {} bytes, {} textures, {} materials",
            bytes.len(),
            manifest.textures.len(),
            manifest.materials.len()
        ));
        for issue in manifest.check_layout(bin.len()) {
            sink.warning(&format!("Buffer view {} {}", issue.view, issue.message));
        }

        let graph = SceneGraph::build(&manifest);
        let diffuse = DiffuseSet::resolve(&graph, manifest.textures.len());
        sink.info(&format!(
            "{} of {} textures are diffuse ({}, {})",
            diffuse.len(),
            manifest.textures.len(),
            self.config.gamma.label(),
            self.config.quality.label()
        ));

        let mut records = build_records(&manifest, &bin, &diffuse);
        for record in &records {
            match &record.status {
                TextureStatus::Skipped { reason } => {
                    sink.info(&format!("{} skipped: {}", record.label(), reason))
                }
                TextureStatus::Unmodified { reason } => {
                    sink.info(&format!("{} unmodified: {}", record.label(), reason))
                }
                _ => {}
            }
        }

        let jobs = plan_jobs(&records, &diffuse);
        for job in jobs.iter().filter(|j| j.mixed_use) {
            sink.warning(&format!(
                "Image {} is used as both color and data; gamma correction skipped",
                job.image
            ));
        }

        let transcoder = Transcoder::new(&self.config, self.decoder.as_ref(), self.encoder.as_ref());
        let results = transcoder.run(&jobs, &bin);
        report_outcomes(&jobs, &results, &records, sink);

        apply_results(&mut records, &jobs, &results);
        update_mime_types(&mut manifest, &results);

        let plan = plan_layout(&manifest, &bin, &records)?;
        let payload = plan.materialize()?;
        plan.apply_to(&mut manifest);
        tracing::debug!(
            original = bin.len(),
            rebuilt = payload.len(),
            delta = plan.delta(bin.len()),
            "payload rebuilt"
        );

        let output = assemble_glb(&manifest, &payload)?;
        let report = SizeReport::reconcile(&records, &output, bytes.len())?;
        for entry in report.entries.iter().filter(|e| e.mismatch) {
            sink.warning(&format!(
                "Texture {} reads back as {} bytes, which differs from the transcoded size",
                entry.texture, entry.final_bytes
            ));
        }

        sink.success(&format!(
            "Converted: {} -> {} bytes ({:+.1}% saved)",
            report.original_file_bytes,
            report.final_file_bytes,
            report.savings_percent()
        ));

        Ok(Conversion {
            bytes: output,
            report,
            records,
        })
    }
}

fn job_label(job: &ImageJob, records: &[TextureRecord]) -> String {
    match job.textures.as_slice() {
        [only] => records
            .get(*only)
            .map_or_else(|| format!("texture {}", only), |r| r.label()),
        many => format!("image {} ({} textures)", job.image, many.len()),
    }
}

fn report_outcomes(
    jobs: &[ImageJob],
    results: &[JobResult],
    records: &[TextureRecord],
    sink: &mut dyn EventSink,
) {
    for (job, result) in jobs.iter().zip(results) {
        let label = job_label(job, records);
        match &result.outcome {
            Outcome::Replaced {
                bytes,
                width,
                height,
                resized,
                gamma_corrected,
            } => {
                let mut notes = Vec::new();
                if *gamma_corrected {
                    notes.push("gamma corrected");
                }
                if *resized {
                    notes.push("resized");
                }
                let notes = if notes.is_empty() {
                    String::new()
                } else {
                    format!(", {}", notes.join(", "))
                };
                sink.success(&format!(
                    "{}: {} -> {} bytes ({}x{}{})",
                    label,
                    result.source_len,
                    bytes.len(),
                    width,
                    height,
                    notes
                ));
            }
            Outcome::Kept { reason } => {
                sink.info(&format!("{}: original kept, {}", label, reason));
            }
            Outcome::Failed(e) => {
                sink.error(&format!("{}: {}; original bytes kept", label, e));
            }
        }
    }
}

/// Converts with the default codecs
pub fn convert(bytes: &[u8], config: &ConvertConfig, sink: &mut dyn EventSink) -> Result<Conversion> {
    Converter::new(*config).convert(bytes, sink)
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewInfo {
    pub index: usize,
    pub buffer: usize,
    pub byte_offset: u64,
    pub byte_length: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextureInfo {
    pub index: usize,
    pub name: Option<String>,
    pub image: Option<usize>,
    pub mime_type: Option<String>,
    pub bytes: usize,
    pub diffuse: bool,
    /// Slots the texture is bound to by renderable materials
    pub slots: Vec<&'static str>,
}

/// Read-only summary of a container
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub summary: ContainerSummary,
    pub bin_bytes: usize,
    pub buffer_views: Vec<ViewInfo>,
    pub textures: Vec<TextureInfo>,
    pub materials: usize,
    pub layout_issues: Vec<String>,
}

/// Parses a container and describes it without converting anything
pub fn inspect(bytes: &[u8]) -> Result<Inspection> {
    let container = parse_glb(bytes)?;
    let manifest = &container.manifest;
    let graph = SceneGraph::build(manifest);
    let diffuse = DiffuseSet::resolve(&graph, manifest.textures.len());
    let records = build_records(manifest, &container.bin, &diffuse);

    let textures = records
        .iter()
        .map(|record| {
            let mut slots: Vec<&'static str> = graph
                .renderable_materials()
                .flat_map(|m| m.bindings.iter())
                .filter(|b| b.texture == record.index)
                .map(|b| b.slot.label())
                .collect();
            slots.sort_unstable();
            slots.dedup();
            TextureInfo {
                index: record.index,
                name: record.name.clone(),
                image: record.image,
                mime_type: record.mime_guess.clone(),
                bytes: record.original_len(),
                diffuse: record.is_diffuse,
                slots,
            }
        })
        .collect();

    let buffer_views = manifest
        .buffer_views
        .iter()
        .enumerate()
        .map(|(index, view)| ViewInfo {
            index,
            buffer: view.buffer,
            byte_offset: view.byte_offset,
            byte_length: view.byte_length,
        })
        .collect();

    let layout_issues = manifest
        .check_layout(container.bin.len())
        .into_iter()
        .map(|issue| format!("buffer view {} {}", issue.view, issue.message))
        .collect();

    Ok(Inspection {
        bin_bytes: container.bin.len(),
        buffer_views,
        textures,
        materials: manifest.materials.len(),
        layout_issues,
        summary: container.summary,
    })
}

impl Inspection {
    /// Format as human-readable text
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "GLB v{}, {} bytes",
            self.summary.version, self.summary.total_length
        ));
        for chunk in &self.summary.chunks {
            lines.push(format!("  chunk {}: {} bytes", chunk.tag(), chunk.length));
        }
        lines.push(String::new());

        lines.push(format!("Buffer views ({})", self.buffer_views.len()));
        for view in &self.buffer_views {
            lines.push(format!(
                "  [{}] buffer {} @ {} +{}",
                view.index, view.buffer, view.byte_offset, view.byte_length
            ));
        }
        lines.push(String::new());

        lines.push(format!(
            "Textures ({}, {} materials)",
            self.textures.len(),
            self.materials
        ));
        for texture in &self.textures {
            let name = texture.name.as_deref().unwrap_or("-");
            let mime = texture.mime_type.as_deref().unwrap_or("unknown");
            let slots = if texture.slots.is_empty() {
                "unused".to_string()
            } else {
                texture.slots.join(", ")
            };
            lines.push(format!(
                "  [{}] {} {} {} bytes{} ({})",
                texture.index,
                name,
                mime,
                texture.bytes,
                if texture.diffuse { " diffuse" } else { "" },
                slots
            ));
        }

        if !self.layout_issues.is_empty() {
            lines.push(String::new());
            lines.push("Layout issues".to_string());
            for issue in &self.layout_issues {
                lines.push(format!("  ⚠ {}", issue));
            }
        }

        lines.join("\n")
    }
}
