//! [`CompressionBackend`] producing `KHR_draco_mesh_compression` streams with
//! the `draco-oxide` encoder

use std::collections::HashMap;

use draco_oxide::core::attribute::{AttributeDomain, AttributeId};
use draco_oxide::prelude::{AttributeType, ConfigType, MeshBuilder, NdVector};

use super::backend::{AttributeClass, AttributeDescriptor, BackendMesh, CompressionBackend};
use super::{CompressionOptions, KHR_DRACO_MESH_COMPRESSION};
use crate::types::ComponentType;

/// Backend encoding with `draco_oxide::encode`
#[derive(Debug, Clone, Copy, Default)]
pub struct DracoBackend;

impl DracoBackend {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone)]
struct DracoAttribute {
    class: AttributeClass,
    component_type: ComponentType,
    components: u8,
    /// Tightly packed little endian values
    values: Vec<u8>,
    point_map: Vec<Option<u32>>,
}

impl DracoAttribute {
    fn element_size(&self) -> usize {
        self.components as usize * self.component_type.byte_size()
    }

    fn value_count(&self) -> u32 {
        (self.values.len() / self.element_size().max(1)) as u32
    }

    fn value(&self, index: u32) -> &[u8] {
        let size = self.element_size();
        let start = index as usize * size;
        &self.values[start..start + size]
    }
}

/// Triangle mesh with an explicit point mapping, converted to a Draco mesh on
/// encode
///
/// Attribute ids are assigned in registration order and match the order the
/// attributes are handed to the Draco mesh builder.
#[derive(Debug, Clone, Default)]
pub struct DracoMesh {
    attributes: Vec<DracoAttribute>,
    faces: Vec<[u32; 3]>,
    num_points: u32,
}

impl DracoMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_points(&self) -> u32 {
        self.num_points
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Value index of `attribute` mapped to `point`
    pub fn mapped_value(&self, attribute: u32, point: u32) -> Option<u32> {
        self.attributes
            .get(attribute as usize)
            .and_then(|a| a.point_map.get(point as usize).copied().flatten())
    }

    /// Per point values of one attribute, in point order
    fn point_values<const N: usize, T: Copy + Default>(
        &self,
        id: usize,
        read: fn(&[u8]) -> T,
    ) -> Result<Vec<[T; N]>, String> {
        let attribute = &self.attributes[id];
        let width = attribute.component_type.byte_size();
        (0..self.num_points)
            .map(|point| {
                let value = attribute.point_map[point as usize].ok_or_else(|| {
                    format!("point {point} has no value for attribute {id}")
                })?;
                let bytes = attribute.value(value);
                let mut out = [T::default(); N];
                for (c, slot) in out.iter_mut().enumerate() {
                    *slot = read(&bytes[c * width..(c + 1) * width]);
                }
                Ok(out)
            })
            .collect()
    }
}

fn read_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}
fn read_u8(b: &[u8]) -> u8 {
    b[0]
}
fn read_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}
fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn attribute_type(class: AttributeClass) -> AttributeType {
    match class {
        AttributeClass::Position => AttributeType::Position,
        AttributeClass::Normal => AttributeType::Normal,
        AttributeClass::TexCoord => AttributeType::TextureCoordinate,
        AttributeClass::Color => AttributeType::Color,
        AttributeClass::Generic => AttributeType::Custom,
    }
}

/// Add attribute `$id` of `$mesh` to `$builder` as `$ty` vectors
macro_rules! add_vectors {
    ($builder:expr, $mesh:expr, $id:expr, $kind:expr, $parents:expr, $ty:ty, $read:expr) => {{
        let components = $mesh.attributes[$id].components;
        match components {
            1 => Ok($builder.add_attribute(
                vectors::<1, $ty>($mesh.point_values::<1, $ty>($id, $read)?),
                $kind,
                AttributeDomain::Position,
                $parents,
            )),
            2 => Ok($builder.add_attribute(
                vectors::<2, $ty>($mesh.point_values::<2, $ty>($id, $read)?),
                $kind,
                AttributeDomain::Position,
                $parents,
            )),
            3 => Ok($builder.add_attribute(
                vectors::<3, $ty>($mesh.point_values::<3, $ty>($id, $read)?),
                $kind,
                AttributeDomain::Position,
                $parents,
            )),
            4 => Ok($builder.add_attribute(
                vectors::<4, $ty>($mesh.point_values::<4, $ty>($id, $read)?),
                $kind,
                AttributeDomain::Position,
                $parents,
            )),
            other => Err(format!(
                "attribute {} has {other} components, draco accepts 1 to 4",
                $id
            )),
        }
    }};
}

fn vectors<const N: usize, T>(values: Vec<[T; N]>) -> Vec<NdVector<N, T>>
where
    NdVector<N, T>: From<[T; N]>,
{
    values.into_iter().map(NdVector::from).collect()
}

impl DracoMesh {
    fn build(&self) -> Result<draco_oxide::prelude::Mesh, String> {
        if self.num_points == 0 || self.faces.is_empty() {
            return Err("mesh has no points or no faces".to_string());
        }

        let mut builder = MeshBuilder::new();
        let mut position: Option<usize> = None;
        for (id, attribute) in self.attributes.iter().enumerate() {
            let kind = attribute_type(attribute.class);
            let parents = match (attribute.class, position) {
                (AttributeClass::Normal | AttributeClass::TexCoord, Some(parent)) => {
                    vec![AttributeId::new(parent)]
                }
                _ => Vec::new(),
            };
            let added: AttributeId = match attribute.component_type {
                ComponentType::Float32 => {
                    add_vectors!(builder, self, id, kind, parents, f32, read_f32)
                }
                ComponentType::Uint8 => add_vectors!(builder, self, id, kind, parents, u8, read_u8),
                ComponentType::Uint16 => {
                    add_vectors!(builder, self, id, kind, parents, u16, read_u16)
                }
                ComponentType::Uint32 => {
                    add_vectors!(builder, self, id, kind, parents, u32, read_u32)
                }
                other => Err(format!("component type {other} has no draco mapping")),
            }?;
            if added.as_usize() != id {
                return Err(format!(
                    "draco assigned id {} to attribute {id}",
                    added.as_usize()
                ));
            }
            if attribute.class == AttributeClass::Position && position.is_none() {
                position = Some(id);
            }
        }

        let faces = self
            .faces
            .iter()
            .map(|f| [f[0] as usize, f[1] as usize, f[2] as usize])
            .collect();
        builder.set_connectivity_attribute(faces);
        builder.build().map_err(|err| format!("{err:?}"))
    }
}

impl BackendMesh for DracoMesh {
    fn add_attribute(
        &mut self,
        descriptor: &AttributeDescriptor,
        data: &[u8],
    ) -> Result<u32, String> {
        let components = descriptor.components;
        if components == 0 || components > 4 {
            return Err(format!("{components} components per value, expected 1 to 4"));
        }

        let element = components as usize * descriptor.component_type.byte_size();
        let stride = if descriptor.byte_stride == 0 {
            element
        } else {
            descriptor.byte_stride
        };
        if stride < element {
            return Err(format!("stride {stride} is smaller than value size {element}"));
        }

        let count = if data.len() < element {
            0
        } else {
            (data.len() - element) / stride + 1
        };
        let mut values = Vec::with_capacity(count * element);
        for i in 0..count {
            let start = i * stride;
            values.extend_from_slice(&data[start..start + element]);
        }

        self.attributes.push(DracoAttribute {
            class: descriptor.class,
            component_type: descriptor.component_type,
            components,
            values,
            point_map: vec![None; self.num_points as usize],
        });
        Ok(self.attributes.len() as u32 - 1)
    }

    fn set_num_points(&mut self, num_points: u32) {
        self.num_points = num_points;
        for attribute in &mut self.attributes {
            attribute.point_map.resize(num_points as usize, None);
        }
    }

    fn add_face(&mut self, face: [u32; 3]) {
        self.faces.push(face);
    }

    fn set_point_map_entry(
        &mut self,
        attribute: u32,
        point: u32,
        value: u32,
    ) -> Result<(), String> {
        let num_points = self.num_points;
        let attr = self
            .attributes
            .get_mut(attribute as usize)
            .ok_or_else(|| format!("unknown attribute {attribute}"))?;
        if point >= num_points {
            return Err(format!("point {point} outside 0..{num_points}"));
        }
        let count = attr.value_count();
        if value >= count {
            return Err(format!(
                "value {value} outside attribute {attribute} ({count} values)"
            ));
        }
        attr.point_map[point as usize] = Some(value);
        Ok(())
    }

    /// Surviving points are renumbered in first-use order
    fn deduplicate_points(&mut self) -> u32 {
        let mut remap: Vec<u32> = Vec::with_capacity(self.num_points as usize);
        let mut seen: HashMap<Vec<Option<u32>>, u32> = HashMap::new();
        let mut survivors: Vec<u32> = Vec::new();

        for point in 0..self.num_points {
            let key: Vec<Option<u32>> = self
                .attributes
                .iter()
                .map(|a| a.point_map[point as usize])
                .collect();
            let next = survivors.len() as u32;
            let id = *seen.entry(key).or_insert_with(|| {
                survivors.push(point);
                next
            });
            remap.push(id);
        }

        for face in &mut self.faces {
            for corner in face.iter_mut() {
                if let Some(&id) = remap.get(*corner as usize) {
                    *corner = id;
                }
            }
        }
        for attribute in &mut self.attributes {
            attribute.point_map = survivors
                .iter()
                .map(|&old| attribute.point_map[old as usize])
                .collect();
        }

        let removed = self.num_points - survivors.len() as u32;
        self.num_points = survivors.len() as u32;
        removed
    }
}

impl CompressionBackend for DracoBackend {
    type Mesh = DracoMesh;

    fn extension_name(&self) -> &str {
        KHR_DRACO_MESH_COMPRESSION
    }

    fn supports(&self, component: ComponentType) -> bool {
        matches!(
            component,
            ComponentType::Float32
                | ComponentType::Uint8
                | ComponentType::Uint16
                | ComponentType::Uint32
        )
    }

    fn new_mesh(&self) -> DracoMesh {
        DracoMesh::new()
    }

    fn encode(
        &mut self,
        mesh: &DracoMesh,
        _options: &CompressionOptions,
    ) -> Result<Vec<u8>, String> {
        let draco_mesh = mesh.build()?;
        let mut stream = Vec::new();
        draco_oxide::encode::encode(
            draco_mesh,
            &mut stream,
            draco_oxide::encode::Config::default(),
        )
        .map_err(|err| format!("{err:?}"))?;
        Ok(stream)
    }
}
