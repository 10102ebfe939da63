use serde::Serialize;
use serde_json::Value;

use super::{Element, ElementInfo, record_to_json};
use crate::error::{GltfError, Result};
use crate::index::TextureIndex;
use crate::types::AlphaMode;

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Reference to a texture and the UV set it samples with
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    pub index: TextureIndex,
    #[serde(skip_serializing_if = "is_zero")]
    pub tex_coord: u32,
}

impl TextureInfo {
    pub fn new(index: TextureIndex) -> Self {
        Self {
            index,
            tex_coord: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalTextureInfo {
    pub index: TextureIndex,
    #[serde(skip_serializing_if = "is_zero")]
    pub tex_coord: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcclusionTextureInfo {
    pub index: TextureIndex,
    #[serde(skip_serializing_if = "is_zero")]
    pub tex_coord: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

/// Metallic-roughness parameters; unset factors take the glTF defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color_factor: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metallic_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<TextureInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<NormalTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<TextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_factor: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_mode: Option<AlphaMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_cutoff: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub double_sided: bool,
    #[serde(flatten)]
    pub info: ElementInfo,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ElementInfo::named(name),
            ..Self::default()
        }
    }

    /// Untextured material with a base color
    pub fn with_base_color(mut self, rgba: [f32; 4]) -> Self {
        self.pbr_metallic_roughness
            .get_or_insert_with(PbrMetallicRoughness::default)
            .base_color_factor = Some(rgba);
        self
    }

    pub fn with_metallic_roughness(mut self, metallic: f32, roughness: f32) -> Self {
        let pbr = self
            .pbr_metallic_roughness
            .get_or_insert_with(PbrMetallicRoughness::default);
        pbr.metallic_factor = Some(metallic);
        pbr.roughness_factor = Some(roughness);
        self
    }

    /// Every texture this material samples
    pub(crate) fn textures(&self) -> Vec<TextureIndex> {
        let pbr = self.pbr_metallic_roughness.as_ref();
        [
            pbr.and_then(|p| p.base_color_texture).map(|t| t.index),
            pbr.and_then(|p| p.metallic_roughness_texture).map(|t| t.index),
            self.normal_texture.map(|t| t.index),
            self.occlusion_texture.map(|t| t.index),
            self.emissive_texture.map(|t| t.index),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl Element for Material {
    fn to_json(&self) -> Result<Value> {
        if self.alpha_cutoff.is_some() && self.alpha_mode != Some(AlphaMode::Mask) {
            return Err(GltfError::validation(
                "alphaCutoff is only valid with alpha mode MASK",
            ));
        }
        if let Some(pbr) = &self.pbr_metallic_roughness {
            for (factor, label) in [
                (pbr.metallic_factor, "metallicFactor"),
                (pbr.roughness_factor, "roughnessFactor"),
            ] {
                match factor {
                    Some(f) if !(0.0..=1.0).contains(&f) => {
                        return Err(GltfError::Validation(format!("{label} {f} outside 0-1")));
                    }
                    _ => {}
                }
            }
        }
        record_to_json(self, "material")
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}
