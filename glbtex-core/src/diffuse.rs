//! Diffuse/albedo texture set resolution.
//!
//! Gamma correction is only meaningful for color data, so the transcoder needs
//! to know which textures are sampled as a base-color or diffuse map. Textures
//! are identified by their manifest index, which is stable for the whole run.

use crate::scene::SceneGraph;
use std::collections::BTreeSet;

/// Textures used in albedo slots by renderable materials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffuseSet {
    diffuse: BTreeSet<usize>,
    /// Textures also bound to a data slot (normal, roughness, ...) somewhere
    data: BTreeSet<usize>,
}

impl DiffuseSet {
    /// Collects albedo-slot textures of every material a renderable node draws
    /// with. References past `texture_count` are ignored.
    pub fn resolve(graph: &SceneGraph, texture_count: usize) -> Self {
        let mut set = DiffuseSet::default();
        for material in graph.renderable_materials() {
            for binding in &material.bindings {
                if binding.texture >= texture_count {
                    tracing::warn!(
                        material = material.index,
                        texture = binding.texture,
                        slot = binding.slot.label(),
                        "material references a missing texture"
                    );
                    continue;
                }
                if binding.slot.is_albedo() {
                    set.diffuse.insert(binding.texture);
                } else {
                    set.data.insert(binding.texture);
                }
            }
        }
        set
    }

    pub fn is_diffuse(&self, texture: usize) -> bool {
        self.diffuse.contains(&texture)
    }

    /// True when the texture is also bound to a non-color slot
    pub fn has_data_use(&self, texture: usize) -> bool {
        self.data.contains(&texture)
    }

    pub fn len(&self) -> usize {
        self.diffuse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diffuse.is_empty()
    }

    /// Diffuse texture indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.diffuse.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    fn resolve(json: &str) -> DiffuseSet {
        let manifest = Manifest::from_json(json).unwrap();
        let graph = SceneGraph::build(&manifest);
        DiffuseSet::resolve(&graph, manifest.textures.len())
    }

    #[test]
    fn only_base_color_slots_are_diffuse() {
        let set = resolve(
            r#"{
                "textures": [{}, {}, {}, {}, {}],
                "materials": [{
                    "pbrMetallicRoughness": {
                        "baseColorTexture": {"index": 0},
                        "metallicRoughnessTexture": {"index": 1}
                    },
                    "normalTexture": {"index": 2},
                    "occlusionTexture": {"index": 3},
                    "emissiveTexture": {"index": 4}
                }],
                "meshes": [{"primitives": [{"material": 0}]}],
                "nodes": [{"mesh": 0}],
                "scenes": [{"nodes": [0]}]
            }"#,
        );
        assert!(set.is_diffuse(0));
        for texture in 1..5 {
            assert!(!set.is_diffuse(texture), "texture {} marked diffuse", texture);
            assert!(set.has_data_use(texture));
        }
    }

    #[test]
    fn shared_texture_counts_once() {
        let set = resolve(
            r#"{
                "textures": [{}],
                "materials": [
                    {"pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}},
                    {"pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}}
                ],
                "meshes": [{"primitives": [{"material": 0}, {"material": 1}]}],
                "nodes": [{"mesh": 0}]
            }"#,
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn unreferenced_materials_do_not_contribute() {
        let set = resolve(
            r#"{
                "textures": [{}],
                "materials": [{"pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}}],
                "nodes": [{}]
            }"#,
        );
        assert!(set.is_empty());
        assert!(!set.is_diffuse(0));
    }

    #[test]
    fn specular_glossiness_diffuse_is_included() {
        let set = resolve(
            r#"{
                "textures": [{}, {}],
                "materials": [{
                    "extensions": {"KHR_materials_pbrSpecularGlossiness": {
                        "diffuseTexture": {"index": 1},
                        "specularGlossinessTexture": {"index": 0}
                    }}
                }],
                "meshes": [{"primitives": [{"material": 0}]}],
                "nodes": [{"mesh": 0}]
            }"#,
        );
        assert!(set.is_diffuse(1));
        assert!(!set.is_diffuse(0));
    }

    #[test]
    fn specular_glossiness_keeps_metallic_roughness_fallback() {
        let set = resolve(
            r#"{
                "textures": [{}, {}],
                "materials": [{
                    "pbrMetallicRoughness": {
                        "baseColorTexture": {"index": 0},
                        "metallicRoughnessTexture": {"index": 1}
                    },
                    "extensions": {"KHR_materials_pbrSpecularGlossiness": {
                        "diffuseFactor": [1, 1, 1, 1]
                    }}
                }],
                "meshes": [{"primitives": [{"material": 0}]}],
                "nodes": [{"mesh": 0}]
            }"#,
        );
        assert!(set.is_diffuse(0));
        assert!(!set.has_data_use(0));
        assert!(!set.is_diffuse(1));
        assert!(set.has_data_use(1));
    }

    #[test]
    fn out_of_range_texture_is_ignored() {
        let set = resolve(
            r#"{
                "textures": [{}],
                "materials": [{"pbrMetallicRoughness": {"baseColorTexture": {"index": 4}}}],
                "meshes": [{"primitives": [{"material": 0}]}],
                "nodes": [{"mesh": 0}]
            }"#,
        );
        assert!(set.is_empty());
    }
}
