//! Materialized scene graph.
//!
//! Read-only view over the manifest: which nodes are renderable, which
//! materials their meshes draw with, and which texture sits in which material
//! slot. Slots are an explicit list per material kind.

use crate::manifest::{Manifest, Material};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shading model of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Core glTF metallic-roughness model
    MetallicRoughness,
    /// `KHR_materials_pbrSpecularGlossiness`
    SpecularGlossiness,
}

/// Texture slot a material binds a texture to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    /// `pbrMetallicRoughness.baseColorTexture`
    BaseColor,
    /// `pbrMetallicRoughness.metallicRoughnessTexture` (roughness in G, metalness in B)
    MetallicRoughness,
    Normal,
    Occlusion,
    Emissive,
    /// Specular-glossiness `diffuseTexture`
    Diffuse,
    /// Specular-glossiness `specularGlossinessTexture`
    SpecularGlossiness,
}

impl TextureSlot {
    /// Slots available for a material kind. Normal, occlusion and emissive
    /// are shared by both models. Specular-glossiness materials keep their
    /// `pbrMetallicRoughness` fallback slots, which exporters write alongside
    /// the extension.
    pub fn for_kind(kind: MaterialKind) -> &'static [TextureSlot] {
        match kind {
            MaterialKind::MetallicRoughness => &[
                TextureSlot::BaseColor,
                TextureSlot::MetallicRoughness,
                TextureSlot::Normal,
                TextureSlot::Occlusion,
                TextureSlot::Emissive,
            ],
            MaterialKind::SpecularGlossiness => &[
                TextureSlot::Diffuse,
                TextureSlot::SpecularGlossiness,
                TextureSlot::BaseColor,
                TextureSlot::MetallicRoughness,
                TextureSlot::Normal,
                TextureSlot::Occlusion,
                TextureSlot::Emissive,
            ],
        }
    }

    /// True for the base-color/diffuse (albedo) slots
    pub fn is_albedo(&self) -> bool {
        matches!(self, TextureSlot::BaseColor | TextureSlot::Diffuse)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TextureSlot::BaseColor => "base color",
            TextureSlot::MetallicRoughness => "metallic-roughness",
            TextureSlot::Normal => "normal",
            TextureSlot::Occlusion => "occlusion",
            TextureSlot::Emissive => "emissive",
            TextureSlot::Diffuse => "diffuse",
            TextureSlot::SpecularGlossiness => "specular-glossiness",
        }
    }

    /// Texture index bound to this slot of `material`, if any
    pub fn texture_of(&self, material: &Material) -> Option<usize> {
        let pbr = material.pbr_metallic_roughness.as_ref();
        let spec_gloss = material
            .extensions
            .as_ref()
            .and_then(|e| e.pbr_specular_glossiness.as_ref());
        let reference = match self {
            TextureSlot::BaseColor => pbr.and_then(|p| p.base_color_texture.as_ref()),
            TextureSlot::MetallicRoughness => pbr.and_then(|p| p.metallic_roughness_texture.as_ref()),
            TextureSlot::Normal => material.normal_texture.as_ref(),
            TextureSlot::Occlusion => material.occlusion_texture.as_ref(),
            TextureSlot::Emissive => material.emissive_texture.as_ref(),
            TextureSlot::Diffuse => spec_gloss.and_then(|s| s.diffuse_texture.as_ref()),
            TextureSlot::SpecularGlossiness => {
                spec_gloss.and_then(|s| s.specular_glossiness_texture.as_ref())
            }
        };
        reference.map(|r| r.index)
    }
}

/// A texture bound to a material slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotBinding {
    pub slot: TextureSlot,
    pub texture: usize,
}

/// A material with its slot bindings resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialView {
    pub index: usize,
    pub name: Option<String>,
    pub kind: MaterialKind,
    pub bindings: Vec<SlotBinding>,
}

impl MaterialView {
    pub fn from_material(index: usize, material: &Material) -> Self {
        let kind = if material
            .extensions
            .as_ref()
            .is_some_and(|e| e.pbr_specular_glossiness.is_some())
        {
            MaterialKind::SpecularGlossiness
        } else {
            MaterialKind::MetallicRoughness
        };

        let bindings = TextureSlot::for_kind(kind)
            .iter()
            .filter_map(|slot| {
                slot.texture_of(material).map(|texture| SlotBinding {
                    slot: *slot,
                    texture,
                })
            })
            .collect();

        Self {
            index,
            name: material.name.clone(),
            kind,
            bindings,
        }
    }
}

/// A node that draws a mesh, with the materials its primitives use
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderableNode {
    pub node: usize,
    pub mesh: usize,
    pub materials: Vec<usize>,
}

/// Renderable nodes and resolved materials of a manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneGraph {
    pub materials: Vec<MaterialView>,
    pub renderable: Vec<RenderableNode>,
}

impl SceneGraph {
    /// Walks every scene from its root nodes (or every node when the manifest
    /// declares no scenes) and records nodes that reference a mesh.
    pub fn build(manifest: &Manifest) -> Self {
        let materials = manifest
            .materials
            .iter()
            .enumerate()
            .map(|(i, m)| MaterialView::from_material(i, m))
            .collect();

        let roots: Vec<usize> = if manifest.scenes.is_empty() {
            (0..manifest.nodes.len()).collect()
        } else {
            manifest.scenes.iter().flat_map(|s| s.nodes.iter().copied()).collect()
        };

        let mut visited = BTreeSet::new();
        let mut stack: Vec<usize> = roots.into_iter().rev().collect();
        let mut renderable = Vec::new();

        while let Some(node_index) = stack.pop() {
            if !visited.insert(node_index) {
                continue;
            }
            let Some(node) = manifest.nodes.get(node_index) else {
                tracing::warn!(node = node_index, "scene references a missing node");
                continue;
            };
            stack.extend(node.children.iter().rev().copied());

            let Some(mesh_index) = node.mesh else {
                continue;
            };
            let Some(mesh) = manifest.meshes.get(mesh_index) else {
                tracing::warn!(node = node_index, mesh = mesh_index, "node references a missing mesh");
                continue;
            };

            let mut used = Vec::new();
            for material in mesh.primitives.iter().filter_map(|p| p.material) {
                if material >= manifest.materials.len() {
                    tracing::warn!(mesh = mesh_index, material, "primitive references a missing material");
                } else if !used.contains(&material) {
                    used.push(material);
                }
            }

            renderable.push(RenderableNode {
                node: node_index,
                mesh: mesh_index,
                materials: used,
            });
        }

        Self {
            materials,
            renderable,
        }
    }

    /// Materials drawn by at least one renderable node, each listed once
    pub fn renderable_materials(&self) -> impl Iterator<Item = &MaterialView> {
        let used: BTreeSet<usize> = self
            .renderable
            .iter()
            .flat_map(|n| n.materials.iter().copied())
            .collect();
        self.materials.iter().filter(move |m| used.contains(&m.index))
    }
}
