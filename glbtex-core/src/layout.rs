//! Binary payload re-layout.
//!
//! Replacing image bytes changes view lengths, so the BIN payload is rebuilt in
//! two passes: [`plan_layout`] assigns every buffer view of the GLB buffer a new
//! 4-byte aligned offset, then [`LayoutPlan::materialize`] copies the bytes into
//! a single zero-initialized buffer and checks the result adds up.

use crate::container::padding_for;
use crate::manifest::Manifest;
use crate::transcode::TextureRecord;
use crate::{Error, Result};
use std::collections::HashMap;

/// New placement of one buffer view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferViewLayoutPlan<'a> {
    pub view_index: usize,
    /// Bytes to write: the original view bytes or a texture's replacement
    pub source: &'a [u8],
    pub original_offset: usize,
    pub new_offset: usize,
    pub new_length: usize,
}

/// Placement of every view in the rebuilt payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutPlan<'a> {
    /// Views in payload order
    pub views: Vec<BufferViewLayoutPlan<'a>>,
    pub buffer_len: usize,
    /// Total alignment padding inserted between views
    pub padding: usize,
}

/// Plans the new payload. Views are placed in order of their original offset
/// (ties by index); views of buffers other than the GLB buffer are not part of
/// the plan and keep their values.
pub fn plan_layout<'a>(
    manifest: &Manifest,
    bin: &'a [u8],
    records: &'a [TextureRecord],
) -> Result<LayoutPlan<'a>> {
    let Some(glb_buffer) = manifest.glb_buffer() else {
        return Ok(LayoutPlan::default());
    };

    let mut replacements: HashMap<usize, &'a [u8]> = HashMap::new();
    for record in records {
        if let (Some(view), Some(bytes)) = (record.view, record.new_bytes.as_deref()) {
            replacements.entry(view).or_insert(bytes);
        }
    }

    let mut order: Vec<usize> = manifest
        .buffer_views
        .iter()
        .enumerate()
        .filter(|(_, view)| view.buffer == glb_buffer)
        .map(|(index, _)| index)
        .collect();
    order.sort_by_key(|&index| manifest.buffer_views[index].byte_offset);

    let mut plan = LayoutPlan::default();
    let mut cursor = 0usize;

    for index in order {
        let range = manifest
            .view_range(index)
            .filter(|r| r.end <= bin.len())
            .ok_or_else(|| {
                Error::MalformedContainer(format!(
                    "buffer view {} extends past the {}-byte binary payload",
                    index,
                    bin.len()
                ))
            })?;

        let source = match replacements.get(&index) {
            Some(bytes) => *bytes,
            None => &bin[range.clone()],
        };

        let pad = padding_for(cursor);
        cursor += pad;
        plan.padding += pad;

        plan.views.push(BufferViewLayoutPlan {
            view_index: index,
            source,
            original_offset: range.start,
            new_offset: cursor,
            new_length: source.len(),
        });
        cursor += source.len();
    }

    plan.buffer_len = cursor;
    tracing::debug!(
        views = plan.views.len(),
        moved = plan.moved_views().len(),
        buffer_len = plan.buffer_len,
        padding = plan.padding,
        "layout planned"
    );
    Ok(plan)
}

impl LayoutPlan<'_> {
    /// Copies every view to its planned offset. Fails with
    /// [`Error::LayoutAssemblyMismatch`] if a range falls outside the buffer,
    /// two ranges overlap, or written bytes plus padding do not fill the
    /// buffer exactly.
    pub fn materialize(&self) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.buffer_len];
        let mut written = 0usize;
        let mut previous_end = 0usize;

        for view in &self.views {
            if view.source.len() != view.new_length {
                return Err(Error::LayoutAssemblyMismatch(format!(
                    "buffer view {} planned for {} bytes but has {}",
                    view.view_index,
                    view.new_length,
                    view.source.len()
                )));
            }
            let end = view
                .new_offset
                .checked_add(view.new_length)
                .filter(|&end| end <= out.len())
                .ok_or_else(|| {
                    Error::LayoutAssemblyMismatch(format!(
                        "buffer view {} at {}+{} exceeds the {}-byte buffer",
                        view.view_index, view.new_offset, view.new_length, self.buffer_len
                    ))
                })?;
            if view.new_offset < previous_end {
                return Err(Error::LayoutAssemblyMismatch(format!(
                    "buffer view {} at {} overlaps the previous view ending at {}",
                    view.view_index, view.new_offset, previous_end
                )));
            }

            out[view.new_offset..end].copy_from_slice(view.source);
            written += view.new_length;
            previous_end = end;
        }

        if written + self.padding != self.buffer_len {
            return Err(Error::LayoutAssemblyMismatch(format!(
                "{} bytes written plus {} padding != buffer length {}",
                written, self.padding, self.buffer_len
            )));
        }
        Ok(out)
    }

    /// Writes the planned offsets and lengths into the manifest, along with
    /// the new length of the GLB buffer.
    pub fn apply_to(&self, manifest: &mut Manifest) {
        for view in &self.views {
            if let Some(target) = manifest.buffer_views.get_mut(view.view_index) {
                target.byte_offset = view.new_offset as u64;
                target.byte_length = view.new_length as u64;
            }
        }
        if let Some(buffer) = manifest.glb_buffer().and_then(|i| manifest.buffers.get_mut(i)) {
            buffer.byte_length = self.buffer_len as u64;
        }
    }

    /// Indices of views whose offset differs from where they sat in the
    /// source payload
    pub fn moved_views(&self) -> Vec<usize> {
        self.views
            .iter()
            .filter(|v| v.new_offset != v.original_offset)
            .map(|v| v.view_index)
            .collect()
    }

    /// Payload bytes saved (negative when it grew)
    pub fn delta(&self, original_len: usize) -> i64 {
        original_len as i64 - self.buffer_len as i64
    }
}
