//! Typed view of the glTF JSON manifest.
//!
//! Only the parts the pipeline reads or rewrites are typed: buffers, buffer
//! views, images, textures, materials and the mesh/node/scene graph used to
//! find renderable materials. Every record keeps the fields it does not model
//! in a flattened `extra` map, so accessors, samplers, animations, extensions
//! and anything else survive a parse/serialize round trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Range;

/// Fields not modelled by a typed record
pub type Extra = Map<String, Value>;

/// Root of a glTF manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<Texture>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: u64,
    /// External or data URI. The GLB-stored buffer has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: u64,
    pub byte_length: u64,
    #[serde(flatten)]
    pub extra: Extra,
}

impl BufferView {
    /// Byte range of this view inside its buffer
    pub fn range(&self) -> Range<u64> {
        self.byte_offset..self.byte_offset.saturating_add(self.byte_length)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Texture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Reference from a material slot to a texture (`textureInfo` in glTF)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureRef {
    pub index: usize,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<TextureRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<TextureRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<TextureRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<MaterialExtensions>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<TextureRef>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialExtensions {
    #[serde(
        rename = "KHR_materials_pbrSpecularGlossiness",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pbr_specular_glossiness: Option<PbrSpecularGlossiness>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrSpecularGlossiness {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse_texture: Option<TextureRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_glossiness_texture: Option<TextureRef>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    #[serde(default)]
    pub primitives: Vec<Primitive>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<usize>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A buffer view that breaks the layout invariants of the source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutIssue {
    pub view: usize,
    pub message: String,
}

impl Manifest {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Index of the buffer stored in the GLB BIN chunk, if the manifest has one.
    /// Only buffer 0 without a URI refers to the BIN chunk.
    pub fn glb_buffer(&self) -> Option<usize> {
        self.buffers
            .first()
            .filter(|b| b.uri.is_none())
            .map(|_| 0)
    }

    /// Image index a texture samples from
    pub fn texture_image(&self, texture: usize) -> Option<usize> {
        self.textures
            .get(texture)
            .and_then(|t| t.source)
            .filter(|&i| i < self.images.len())
    }

    /// Buffer view holding an image's encoded bytes
    pub fn image_view(&self, image: usize) -> Option<usize> {
        self.images
            .get(image)
            .and_then(|i| i.buffer_view)
            .filter(|&v| v < self.buffer_views.len())
    }

    /// Byte range of a buffer view as `usize`, if it fits in memory
    pub fn view_range(&self, view: usize) -> Option<Range<usize>> {
        let range = self.buffer_views.get(view)?.range();
        let start = usize::try_from(range.start).ok()?;
        let end = usize::try_from(range.end).ok()?;
        Some(start..end)
    }

    /// Checks buffer views against their buffers: every view must reference an
    /// existing buffer, end within its declared length (and within the BIN
    /// payload for the GLB buffer), and not overlap another view of the same
    /// buffer.
    pub fn check_layout(&self, bin_len: usize) -> Vec<LayoutIssue> {
        let mut issues = Vec::new();
        let glb_buffer = self.glb_buffer();

        for (index, view) in self.buffer_views.iter().enumerate() {
            let Some(buffer) = self.buffers.get(view.buffer) else {
                issues.push(LayoutIssue {
                    view: index,
                    message: format!("references missing buffer {}", view.buffer),
                });
                continue;
            };
            let end = view.range().end;
            if end > buffer.byte_length {
                issues.push(LayoutIssue {
                    view: index,
                    message: format!(
                        "ends at byte {} but buffer {} is {} bytes long",
                        end, view.buffer, buffer.byte_length
                    ),
                });
            } else if Some(view.buffer) == glb_buffer && end > bin_len as u64 {
                issues.push(LayoutIssue {
                    view: index,
                    message: format!(
                        "ends at byte {} but the binary payload is {} bytes long",
                        end, bin_len
                    ),
                });
            }
        }

        let mut sorted: Vec<(usize, &BufferView)> = self.buffer_views.iter().enumerate().collect();
        sorted.sort_by_key(|(index, view)| (view.buffer, view.byte_offset, *index));
        for pair in sorted.windows(2) {
            let (_, prev) = pair[0];
            let (index, next) = pair[1];
            if prev.buffer == next.buffer && next.byte_offset < prev.range().end {
                issues.push(LayoutIssue {
                    view: index,
                    message: format!(
                        "overlaps the preceding view of buffer {} (starts at {}, previous ends at {})",
                        next.buffer,
                        next.byte_offset,
                        prev.range().end
                    ),
                });
            }
        }

        issues
    }
}
