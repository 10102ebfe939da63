//! Seam between the bridge and a mesh compression library
//!
//! Backends report failures as plain diagnostic text; the bridge wraps it in
//! [`GltfError::Encoding`](crate::GltfError::Encoding).

use super::CompressionOptions;
use crate::types::{ComponentType, Semantic};

/// Quantization / strip class of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeClass {
    Position,
    Normal,
    TexCoord,
    Color,
    Generic,
}

impl AttributeClass {
    pub fn of(semantic: &Semantic) -> Self {
        match semantic {
            Semantic::Position => AttributeClass::Position,
            Semantic::Normal => AttributeClass::Normal,
            Semantic::TexCoord(_) => AttributeClass::TexCoord,
            Semantic::Color(_) => AttributeClass::Color,
            Semantic::Tangent | Semantic::Joints(_) | Semantic::Weights(_) | Semantic::Custom(_) => {
                AttributeClass::Generic
            }
        }
    }
}

/// Layout of one attribute handed to [`BackendMesh::add_attribute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub semantic: Semantic,
    pub class: AttributeClass,
    pub components: u8,
    pub component_type: ComponentType,
    pub normalized: bool,
    /// Distance between values in the backing bytes
    pub byte_stride: usize,
}

/// Backend side mesh under construction
pub trait BackendMesh {
    /// Register an attribute backed by `data` and return its backend id
    fn add_attribute(
        &mut self,
        descriptor: &AttributeDescriptor,
        data: &[u8],
    ) -> Result<u32, String>;

    fn set_num_points(&mut self, num_points: u32);

    fn add_face(&mut self, face: [u32; 3]);

    /// Map `point` to entry `value` of attribute `attribute`
    fn set_point_map_entry(&mut self, attribute: u32, point: u32, value: u32)
    -> Result<(), String>;

    /// Merge identical points, returning how many were removed
    fn deduplicate_points(&mut self) -> u32;
}

/// Mesh compression library
pub trait CompressionBackend {
    type Mesh: BackendMesh;

    /// glTF extension the encoded stream belongs to
    fn extension_name(&self) -> &str;

    /// Whether attributes of this component type can be encoded
    fn supports(&self, component: ComponentType) -> bool;

    fn new_mesh(&self) -> Self::Mesh;

    fn encode(&mut self, mesh: &Self::Mesh, options: &CompressionOptions)
    -> Result<Vec<u8>, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_classes() {
        assert_eq!(AttributeClass::of(&Semantic::Position), AttributeClass::Position);
        assert_eq!(AttributeClass::of(&Semantic::TexCoord(1)), AttributeClass::TexCoord);
        assert_eq!(AttributeClass::of(&Semantic::Color(0)), AttributeClass::Color);
        assert_eq!(AttributeClass::of(&Semantic::Weights(0)), AttributeClass::Generic);
        assert_eq!(
            AttributeClass::of(&Semantic::Custom("_ID".to_string())),
            AttributeClass::Generic
        );
    }
}
