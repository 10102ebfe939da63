use serde::Serialize;
use serde_json::Value;

use super::{Element, ElementInfo, record_to_json};
use crate::error::{GltfError, Result};
use crate::index::{CameraIndex, MeshIndex, NodeIndex};

/// Set of root nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeIndex>,
    #[serde(flatten)]
    pub info: ElementInfo,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            info: ElementInfo::named(name),
        }
    }

    pub fn add_node(&mut self, node: NodeIndex) {
        self.nodes.push(node);
    }
}

impl Element for Scene {
    fn to_json(&self) -> Result<Value> {
        record_to_json(self, "scene")
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}

/// Transform hierarchy node
///
/// Either `matrix` or any of `translation` / `rotation` / `scale` may be set,
/// never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Node {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraIndex>,
    /// Column-major 4x4 transform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f32; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    /// Unit quaternion, xyzw
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    #[serde(flatten)]
    pub info: ElementInfo,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ElementInfo::named(name),
            ..Self::default()
        }
    }

    pub fn with_mesh(mut self, mesh: MeshIndex) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_camera(mut self, camera: CameraIndex) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = Some(translation);
        self
    }

    pub fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_matrix(mut self, matrix: [f32; 16]) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn add_child(&mut self, child: NodeIndex) {
        self.children.push(child);
    }
}

impl Element for Node {
    fn to_json(&self) -> Result<Value> {
        let has_trs = self.translation.is_some() || self.rotation.is_some() || self.scale.is_some();
        if self.matrix.is_some() && has_trs {
            return Err(GltfError::validation(
                "node sets both matrix and translation/rotation/scale",
            ));
        }
        record_to_json(self, "node")
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}
