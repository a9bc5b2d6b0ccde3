//! Before/after size report.
//!
//! Final sizes are read back from the assembled container rather than taken
//! from the transcoder, so the report reflects what was actually written.

use crate::container::parse_glb;
use crate::transcode::{TextureRecord, TextureStatus};
use crate::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Recompressed,
    Unmodified,
    Skipped,
}

impl EntryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            EntryStatus::Recompressed => "recompressed",
            EntryStatus::Unmodified => "unmodified",
            EntryStatus::Skipped => "skipped",
        }
    }
}

impl From<&TextureStatus> for EntryStatus {
    fn from(status: &TextureStatus) -> Self {
        match status {
            TextureStatus::Recompressed { .. } => EntryStatus::Recompressed,
            TextureStatus::Skipped { .. } => EntryStatus::Skipped,
            TextureStatus::Pending | TextureStatus::Unmodified { .. } => EntryStatus::Unmodified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureSizeEntry {
    pub texture: usize,
    pub name: Option<String>,
    pub diffuse: bool,
    pub status: EntryStatus,
    pub original_bytes: usize,
    pub final_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Bytes read back differ from what the transcoder produced
    pub mismatch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub name: Option<String>,
    pub entries: Vec<TextureSizeEntry>,
    pub original_file_bytes: usize,
    pub final_file_bytes: usize,
}

impl SizeReport {
    /// Builds the report by re-parsing the assembled `output`
    pub fn reconcile(records: &[TextureRecord], output: &[u8], input_len: usize) -> Result<Self> {
        let written = parse_glb(output)?;

        let entries = records
            .iter()
            .map(|record| {
                let final_bytes = record
                    .view
                    .and_then(|view| written.manifest.view_range(view))
                    .map_or(0, |r| r.len());
                let note = match &record.status {
                    TextureStatus::Unmodified { reason } | TextureStatus::Skipped { reason } => {
                        Some(reason.clone())
                    }
                    _ => None,
                };
                TextureSizeEntry {
                    texture: record.index,
                    name: record.name.clone(),
                    diffuse: record.is_diffuse,
                    status: EntryStatus::from(&record.status),
                    original_bytes: record.original_len(),
                    final_bytes,
                    note,
                    mismatch: record.view.is_some() && final_bytes != record.final_len(),
                }
            })
            .collect();

        Ok(Self {
            name: None,
            entries,
            original_file_bytes: input_len,
            final_file_bytes: output.len(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn has_mismatches(&self) -> bool {
        self.entries.iter().any(|e| e.mismatch)
    }

    /// Bytes saved on the whole file (negative when it grew)
    pub fn saved_bytes(&self) -> i64 {
        self.original_file_bytes as i64 - self.final_file_bytes as i64
    }

    pub fn savings_percent(&self) -> f64 {
        if self.original_file_bytes == 0 {
            return 0.0;
        }
        self.saved_bytes() as f64 / self.original_file_bytes as f64 * 100.0
    }

    /// Format as human-readable text
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();

        if let Some(name) = &self.name {
            lines.push(format!("Size report: {}", name));
            lines.push(String::new());
        }

        lines.push("Textures".to_string());
        if self.entries.is_empty() {
            lines.push("  (none)".to_string());
        }
        for entry in &self.entries {
            let label = match &entry.name {
                Some(name) => format!("#{} {}", entry.texture, name),
                None => format!("#{}", entry.texture),
            };
            let diffuse = if entry.diffuse { " [diffuse]" } else { "" };
            let mut line = format!(
                "  {}{}: {} -> {} ({})",
                label,
                diffuse,
                format_bytes(entry.original_bytes),
                format_bytes(entry.final_bytes),
                entry.status.label()
            );
            if let Some(note) = &entry.note {
                line.push_str(&format!(" - {}", note));
            }
            if entry.mismatch {
                line.push_str(" [size mismatch]");
            }
            lines.push(line);
        }
        lines.push(String::new());

        lines.push(format!(
            "File: {} -> {} ({:+.1}% saved)",
            format_bytes(self.original_file_bytes),
            format_bytes(self.final_file_bytes),
            self.savings_percent()
        ));
        lines.push(format!(
            "Result: {} recompressed, {} unmodified, {} skipped",
            self.count(EntryStatus::Recompressed),
            self.count(EntryStatus::Unmodified),
            self.count(EntryStatus::Skipped)
        ));

        lines.join("\n")
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.2} MiB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
