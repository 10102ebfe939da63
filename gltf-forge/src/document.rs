//! Document arena
//!
//! The [`Document`] owns every buffer, view, accessor and scene-graph element.
//! Elements refer to each other by the stable indices handed out here, so
//! there is no destruction order to get wrong. Nothing is validated while
//! building; [`Document::to_json`] checks the whole graph at once.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::accessor::{Accessor, Bounds, Component, TypedRangeMut};
use crate::buffer::Buffer;
use crate::element::{
    AssetInfo, Camera, Element, Image, Material, Mesh, Node, Sampler, Scene, Texture,
};
use crate::error::{GltfError, Result};
use crate::glb;
use crate::index::{
    AccessorIndex, BufferIndex, CameraIndex, ImageIndex, MaterialIndex, MeshIndex, NodeIndex,
    SamplerIndex, SceneIndex, TextureIndex, ViewIndex,
};
use crate::types::{BufferTarget, ComponentType, ElementShape, MimeType};
use crate::view::View;

/// Alignment of accessor storage inside a buffer
const ACCESSOR_ALIGNMENT: usize = 4;

/// Top-level owner of all buffers, views, accessors and elements
#[derive(Debug, Clone, Default)]
pub struct Document {
    asset: AssetInfo,
    scene: Option<SceneIndex>,
    buffers: Vec<Buffer>,
    views: Vec<View>,
    accessors: Vec<Accessor>,
    scenes: Vec<Scene>,
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    cameras: Vec<Camera>,
    materials: Vec<Material>,
    textures: Vec<Texture>,
    images: Vec<Image>,
    samplers: Vec<Sampler>,
    extensions_used: Vec<String>,
    extensions_required: Vec<String>,
}

/// Prefix validation messages with the element that raised them
fn located(location: impl FnOnce() -> String) -> impl FnOnce(GltfError) -> GltfError {
    move |err| match err {
        GltfError::Validation(msg) => GltfError::Validation(format!("{}: {msg}", location())),
        other => other,
    }
}

fn element_array<T: Element>(items: &[T], kind: &str) -> Result<Value> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| item.to_json().map_err(located(|| format!("{kind} {i}"))))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Asset & Extensions
    // =========================================================================

    pub fn asset(&self) -> &AssetInfo {
        &self.asset
    }

    pub fn asset_mut(&mut self) -> &mut AssetInfo {
        &mut self.asset
    }

    /// Record an extension in `extensionsUsed`, and in `extensionsRequired`
    /// when `required` is set. Repeated names are ignored.
    pub fn add_extension(&mut self, name: &str, required: bool) {
        if !self.extensions_used.iter().any(|e| e == name) {
            self.extensions_used.push(name.to_string());
        }
        if required && !self.extensions_required.iter().any(|e| e == name) {
            self.extensions_required.push(name.to_string());
        }
    }

    pub fn extensions_used(&self) -> &[String] {
        &self.extensions_used
    }

    pub fn extensions_required(&self) -> &[String] {
        &self.extensions_required
    }

    // =========================================================================
    // Buffers
    // =========================================================================

    pub fn create_buffer(&mut self) -> BufferIndex {
        self.buffers.push(Buffer::new());
        BufferIndex::from_position(self.buffers.len() - 1)
    }

    pub fn buffer(&self, buffer: BufferIndex) -> Option<&Buffer> {
        self.buffers.get(buffer.index())
    }

    pub fn buffer_mut(&mut self, buffer: BufferIndex) -> Option<&mut Buffer> {
        self.buffers.get_mut(buffer.index())
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    fn push_view(&mut self, view: View) -> ViewIndex {
        self.views.push(view);
        ViewIndex::from_position(self.views.len() - 1)
    }

    /// Grow `buffer` by `byte_length` zero bytes and return a view over them
    ///
    /// # Panics
    /// Panics if `buffer` does not belong to this document.
    pub fn allocate(&mut self, buffer: BufferIndex, byte_length: usize) -> ViewIndex {
        let offset = self.buffers[buffer.index()].grow(byte_length);
        debug!("Allocated {} bytes at offset {} in {}", byte_length, offset, buffer);
        self.push_view(View::new(buffer, offset, byte_length))
    }

    /// Copy `bytes` into a new range of `buffer`
    ///
    /// # Panics
    /// Panics if `buffer` does not belong to this document.
    pub fn add_data(&mut self, buffer: BufferIndex, bytes: &[u8]) -> ViewIndex {
        let offset = self.buffers[buffer.index()].append(bytes);
        debug!("Added {} bytes at offset {} in {}", bytes.len(), offset, buffer);
        self.push_view(View::new(buffer, offset, bytes.len()))
    }

    fn check_buffer(&self, buffer: BufferIndex) -> Result<()> {
        if buffer.index() >= self.buffers.len() {
            return Err(GltfError::Validation(format!(
                "{buffer} does not exist ({} buffers)",
                self.buffers.len()
            )));
        }
        Ok(())
    }

    /// Read a whole file into a new range of `buffer`
    ///
    /// The content is not inspected.
    pub fn add_image_file(&mut self, buffer: BufferIndex, path: impl AsRef<Path>) -> Result<ViewIndex> {
        self.check_buffer(buffer)?;
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| GltfError::io(path, e))?;
        Ok(self.add_data(buffer, &bytes))
    }

    /// Embed an image file and add an [`Image`] referencing it
    ///
    /// The MIME type comes from the file extension.
    pub fn add_image_from_file(
        &mut self,
        buffer: BufferIndex,
        path: impl AsRef<Path>,
    ) -> Result<ImageIndex> {
        let path = path.as_ref();
        let mime_type = MimeType::from_path(path).ok_or_else(|| {
            GltfError::UnsupportedType(format!(
                "cannot derive an image MIME type from {}",
                path.display()
            ))
        })?;
        let view = self.add_image_file(buffer, path)?;
        let mut image = Image::from_view(view, mime_type);
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            image.info.name = Some(stem.to_string());
        }
        Ok(self.add_image(image))
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Add a view built by hand, e.g. over an externally stored buffer
    pub fn add_view(&mut self, view: View) -> ViewIndex {
        self.push_view(view)
    }

    pub fn view(&self, view: ViewIndex) -> Option<&View> {
        self.views.get(view.index())
    }

    pub fn view_mut(&mut self, view: ViewIndex) -> Option<&mut View> {
        self.views.get_mut(view.index())
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Bytes covered by a view, checked against its buffer
    pub fn view_bytes(&self, view: ViewIndex) -> Result<&[u8]> {
        self.views
            .get(view.index())
            .ok_or_else(|| GltfError::Validation(format!("{view} does not exist")))?
            .resolve(view.index(), &self.buffers)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    fn push_accessor(&mut self, accessor: Accessor) -> AccessorIndex {
        self.accessors.push(accessor);
        AccessorIndex::from_position(self.accessors.len() - 1)
    }

    /// Accessor over an existing view
    ///
    /// The first accessor created over a view fills in the view's target when
    /// it is still unset; later accessors leave the view untouched.
    pub fn create_accessor(
        &mut self,
        view: ViewIndex,
        shape: ElementShape,
        component: ComponentType,
        count: usize,
        target: Option<BufferTarget>,
    ) -> AccessorIndex {
        let first = !self.accessors.iter().any(|a| a.view() == Some(view));
        if first {
            if let Some(v) = self.views.get_mut(view.index()) {
                v.refine(target, None);
            }
        }

        let mut accessor = Accessor::new(shape, component);
        accessor.set_view(view);
        accessor.set_count(count);
        self.push_accessor(accessor)
    }

    /// Allocate zeroed storage for `count` elements in a new view
    ///
    /// Fill it through [`Document::accessor_data_mut`].
    ///
    /// # Panics
    /// Panics if `buffer` does not belong to this document.
    pub fn allocate_accessor(
        &mut self,
        buffer: BufferIndex,
        shape: ElementShape,
        component: ComponentType,
        count: usize,
        target: Option<BufferTarget>,
    ) -> AccessorIndex {
        self.buffers[buffer.index()].align(ACCESSOR_ALIGNMENT);
        let byte_length = count * shape.component_count() * component.byte_size();
        let view = self.allocate(buffer, byte_length);
        self.create_accessor(view, shape, component, count, target)
    }

    /// Copy `count` elements of `data` into a new view
    ///
    /// `data` is flat and element-major; only its first
    /// `count * components(shape)` values are used.
    pub fn add_accessor_data<T: Component>(
        &mut self,
        buffer: BufferIndex,
        shape: ElementShape,
        data: &[T],
        count: usize,
        target: Option<BufferTarget>,
    ) -> Result<AccessorIndex> {
        self.check_buffer(buffer)?;
        let values = count * shape.component_count();
        if data.len() < values {
            return Err(GltfError::Validation(format!(
                "{count} {} elements need {values} values, got {}",
                shape.name(),
                data.len()
            )));
        }

        self.buffers[buffer.index()].align(ACCESSOR_ALIGNMENT);
        let view = self.add_data(buffer, bytemuck::cast_slice(&data[..values]));
        Ok(self.create_accessor(view, shape, T::TYPE, count, target))
    }

    /// Vertex attribute data; every value of `data` is used
    pub fn add_vertex_data<T: Component>(
        &mut self,
        buffer: BufferIndex,
        shape: ElementShape,
        data: &[T],
    ) -> Result<AccessorIndex> {
        let components = shape.component_count();
        if data.len() % components != 0 {
            return Err(GltfError::Validation(format!(
                "{} values do not form whole {} elements",
                data.len(),
                shape.name()
            )));
        }
        self.add_accessor_data(
            buffer,
            shape,
            data,
            data.len() / components,
            Some(BufferTarget::ArrayBuffer),
        )
    }

    /// Scalar index data in an element array view
    pub fn add_index_data<T: Component>(
        &mut self,
        buffer: BufferIndex,
        data: &[T],
    ) -> Result<AccessorIndex> {
        if !matches!(
            T::TYPE,
            ComponentType::Uint8 | ComponentType::Uint16 | ComponentType::Uint32
        ) {
            return Err(GltfError::UnsupportedType(format!(
                "{} cannot be used for indices",
                T::TYPE
            )));
        }
        self.add_accessor_data(
            buffer,
            ElementShape::Scalar,
            data,
            data.len(),
            Some(BufferTarget::ElementArrayBuffer),
        )
    }

    pub fn accessor(&self, accessor: AccessorIndex) -> Option<&Accessor> {
        self.accessors.get(accessor.index())
    }

    pub fn accessor_mut(&mut self, accessor: AccessorIndex) -> Option<&mut Accessor> {
        self.accessors.get_mut(accessor.index())
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub(crate) fn get_accessor(&self, accessor: AccessorIndex) -> Result<&Accessor> {
        self.accessor(accessor)
            .ok_or_else(|| GltfError::Validation(format!("{accessor} does not exist")))
    }

    /// Place an accessor inside an interleaved view
    ///
    /// An unset view stride is filled in from `byte_stride`.
    pub fn set_accessor_interleaved(
        &mut self,
        accessor: AccessorIndex,
        byte_offset: usize,
        byte_stride: usize,
    ) -> Result<()> {
        let target = self
            .accessors
            .get_mut(accessor.index())
            .ok_or_else(|| GltfError::Validation(format!("{accessor} does not exist")))?;
        target.set_interleaved(byte_offset, byte_stride)?;

        if let Some(view) = target.view().and_then(|v| self.views.get_mut(v.index())) {
            view.refine(None, (byte_stride != 0).then_some(byte_stride));
        }
        Ok(())
    }

    /// First element of an accessor onward, plus the effective stride
    ///
    /// The slice ends right after the last element.
    pub fn accessor_bytes(&self, accessor: AccessorIndex) -> Result<(&[u8], usize)> {
        let target = self.get_accessor(accessor)?;
        let view_index = target
            .view()
            .ok_or_else(|| GltfError::Validation(format!("{accessor} has no buffer view")))?;
        let bytes = self.view_bytes(view_index)?;
        let view_stride = self.views[view_index.index()].byte_stride();
        let stride = target.stride_in(view_stride);

        target.check_fits(accessor.index(), bytes.len(), stride)?;
        let start = target.byte_offset();
        let end = target.span(stride);
        Ok((&bytes[start..end], stride))
    }

    /// Typed mutable access to an accessor's elements
    pub fn accessor_data_mut<T: Component>(
        &mut self,
        accessor: AccessorIndex,
    ) -> Result<TypedRangeMut<'_, T>> {
        let target = self.get_accessor(accessor)?;
        if target.component() != T::TYPE {
            return Err(GltfError::UnsupportedType(format!(
                "{accessor} stores {}, requested {}",
                target.component(),
                T::TYPE
            )));
        }

        let view_index = target
            .view()
            .ok_or_else(|| GltfError::Validation(format!("{accessor} has no buffer view")))?;
        let view = self
            .views
            .get(view_index.index())
            .ok_or_else(|| GltfError::Validation(format!("{view_index} does not exist")))?;
        let buffer = view
            .buffer()
            .ok_or_else(|| GltfError::Validation(format!("{view_index} has no buffer")))?;

        let stride = target.stride_in(view.byte_stride());
        target.check_fits(accessor.index(), view.byte_length(), stride)?;
        let start = view.byte_offset() + target.byte_offset();
        let len = target.span(stride) - target.byte_offset();
        let components = target.shape().component_count();
        let count = target.count();

        let bytes = self
            .buffers
            .get_mut(buffer.index())
            .and_then(|b| b.range_mut(start, len))
            .ok_or_else(|| {
                GltfError::Validation(format!("{view_index} exceeds {buffer}"))
            })?;
        Ok(TypedRangeMut::new(bytes, stride, components, count))
    }

    fn compute_accessor_bounds(&self, accessor: AccessorIndex) -> Result<Bounds> {
        let target = self.get_accessor(accessor)?;
        let view_index = target
            .view()
            .ok_or_else(|| GltfError::Validation(format!("{accessor} has no buffer view")))?;
        let bytes = self.view_bytes(view_index)?;
        let stride = target.stride_in(self.views[view_index.index()].byte_stride());
        target.compute_bounds(accessor.index(), bytes, stride)
    }

    /// Recompute min/max of an accessor from its stored elements
    ///
    /// On failure the accessor is left without bounds.
    pub fn update_bounds(&mut self, accessor: AccessorIndex) -> Result<()> {
        let computed = self.compute_accessor_bounds(accessor);
        if let Some(target) = self.accessors.get_mut(accessor.index()) {
            target.clear_bounds();
            if let Ok(bounds) = &computed {
                target.set_bounds(bounds.clone());
            }
        }
        computed.map(|_| ())
    }

    // =========================================================================
    // Scene Graph
    // =========================================================================

    pub fn add_scene(&mut self, scene: Scene) -> SceneIndex {
        self.scenes.push(scene);
        SceneIndex::from_position(self.scenes.len() - 1)
    }

    /// Scene shown when the asset is loaded
    pub fn set_main_scene(&mut self, scene: SceneIndex) {
        self.scene = Some(scene);
    }

    pub fn main_scene(&self) -> Option<SceneIndex> {
        self.scene
    }

    pub fn scene_mut(&mut self, scene: SceneIndex) -> Option<&mut Scene> {
        self.scenes.get_mut(scene.index())
    }

    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        self.nodes.push(node);
        NodeIndex::from_position(self.nodes.len() - 1)
    }

    pub fn node_mut(&mut self, node: NodeIndex) -> Option<&mut Node> {
        self.nodes.get_mut(node.index())
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshIndex {
        self.meshes.push(mesh);
        MeshIndex::from_position(self.meshes.len() - 1)
    }

    pub fn mesh(&self, mesh: MeshIndex) -> Option<&Mesh> {
        self.meshes.get(mesh.index())
    }

    pub fn mesh_mut(&mut self, mesh: MeshIndex) -> Option<&mut Mesh> {
        self.meshes.get_mut(mesh.index())
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn add_camera(&mut self, camera: Camera) -> CameraIndex {
        self.cameras.push(camera);
        CameraIndex::from_position(self.cameras.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialIndex {
        self.materials.push(material);
        MaterialIndex::from_position(self.materials.len() - 1)
    }

    pub fn material_mut(&mut self, material: MaterialIndex) -> Option<&mut Material> {
        self.materials.get_mut(material.index())
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureIndex {
        self.textures.push(texture);
        TextureIndex::from_position(self.textures.len() - 1)
    }

    pub fn add_image(&mut self, image: Image) -> ImageIndex {
        self.images.push(image);
        ImageIndex::from_position(self.images.len() - 1)
    }

    pub fn add_sampler(&mut self, sampler: Sampler) -> SamplerIndex {
        self.samplers.push(sampler);
        SamplerIndex::from_position(self.samplers.len() - 1)
    }

    pub fn create_skin(&mut self) -> Result<()> {
        Err(GltfError::NotImplemented("skins"))
    }

    pub fn create_animation(&mut self) -> Result<()> {
        Err(GltfError::NotImplemented("animations"))
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Check that every cross reference points at an existing element
    pub fn check_references(&self) -> Result<()> {
        fn check<I: Copy + std::fmt::Display>(
            owner: impl FnOnce() -> String,
            index: I,
            position: usize,
            len: usize,
        ) -> Result<()> {
            if position >= len {
                return Err(GltfError::Validation(format!(
                    "{} references missing {index}",
                    owner()
                )));
            }
            Ok(())
        }

        if let Some(scene) = self.scene {
            check(|| "document".to_string(), scene, scene.index(), self.scenes.len())?;
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            for &node in &scene.nodes {
                check(|| format!("scene {i}"), node, node.index(), self.nodes.len())?;
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                check(|| format!("node {i}"), child, child.index(), self.nodes.len())?;
            }
            if let Some(mesh) = node.mesh {
                check(|| format!("node {i}"), mesh, mesh.index(), self.meshes.len())?;
            }
            if let Some(camera) = node.camera {
                check(|| format!("node {i}"), camera, camera.index(), self.cameras.len())?;
            }
        }
        for (i, mesh) in self.meshes.iter().enumerate() {
            for (p, primitive) in mesh.primitives.iter().enumerate() {
                let owner = || format!("mesh {i} primitive {p}");
                for accessor in primitive.accessors() {
                    check(owner, accessor, accessor.index(), self.accessors.len())?;
                }
                if let Some(material) = primitive.material {
                    check(owner, material, material.index(), self.materials.len())?;
                }
                if let Some(record) = primitive.compression() {
                    let view = record.buffer_view();
                    check(owner, view, view.index(), self.views.len())?;
                }
            }
        }
        for (i, material) in self.materials.iter().enumerate() {
            for texture in material.textures() {
                check(|| format!("material {i}"), texture, texture.index(), self.textures.len())?;
            }
        }
        for (i, texture) in self.textures.iter().enumerate() {
            if let Some(image) = texture.source {
                check(|| format!("texture {i}"), image, image.index(), self.images.len())?;
            }
            if let Some(sampler) = texture.sampler {
                check(|| format!("texture {i}"), sampler, sampler.index(), self.samplers.len())?;
            }
        }
        for (i, image) in self.images.iter().enumerate() {
            if let Some(view) = image.buffer_view {
                check(|| format!("image {i}"), view, view.index(), self.views.len())?;
            }
        }
        Ok(())
    }

    /// Build the JSON document with one `uri` entry per buffer
    pub(crate) fn json_with_uris(&self, uris: &[Option<String>]) -> Result<Value> {
        self.check_references()?;

        let mut root = Map::new();
        root.insert("asset".to_string(), self.asset.to_json()?);
        if let Some(scene) = self.scene {
            root.insert("scene".to_string(), Value::from(scene.0));
        }

        insert_elements(&mut root, "scenes", &self.scenes, "scene")?;
        insert_elements(&mut root, "nodes", &self.nodes, "node")?;
        insert_elements(&mut root, "meshes", &self.meshes, "mesh")?;
        insert_elements(&mut root, "cameras", &self.cameras, "camera")?;
        insert_elements(&mut root, "materials", &self.materials, "material")?;
        insert_elements(&mut root, "textures", &self.textures, "texture")?;
        insert_elements(&mut root, "images", &self.images, "image")?;
        insert_elements(&mut root, "samplers", &self.samplers, "sampler")?;

        if !self.accessors.is_empty() {
            let accessors = self
                .accessors
                .iter()
                .enumerate()
                .map(|(i, a)| a.to_json(i, &self.views))
                .collect::<Result<Vec<_>>>()?;
            root.insert("accessors".to_string(), Value::Array(accessors));
        }
        if !self.buffers.is_empty() {
            let buffers = self
                .buffers
                .iter()
                .enumerate()
                .map(|(i, b)| b.to_json(i, uris.get(i).and_then(|u| u.as_deref())))
                .collect::<Result<Vec<_>>>()?;
            root.insert("buffers".to_string(), Value::Array(buffers));
        }
        if !self.views.is_empty() {
            let views = self
                .views
                .iter()
                .enumerate()
                .map(|(i, v)| v.to_json(i, &self.buffers))
                .collect::<Result<Vec<_>>>()?;
            root.insert("bufferViews".to_string(), Value::Array(views));
        }

        if !self.extensions_used.is_empty() {
            root.insert(
                "extensionsUsed".to_string(),
                serde_json::to_value(&self.extensions_used)?,
            );
        }
        if !self.extensions_required.is_empty() {
            root.insert(
                "extensionsRequired".to_string(),
                serde_json::to_value(&self.extensions_required)?,
            );
        }

        Ok(Value::Object(root))
    }

    /// JSON document; buffers carry their stored uri, if any
    pub fn to_json(&self) -> Result<Value> {
        let uris: Vec<Option<String>> = self
            .buffers
            .iter()
            .map(|b| b.uri().map(str::to_string))
            .collect();
        self.json_with_uris(&uris)
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let value = self.to_json()?;
        let text = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    fn glb_parts(&self) -> Result<(String, Vec<&[u8]>)> {
        let json = self.json_with_uris(&[])?;
        let text = serde_json::to_string(&json)?;
        let buffers = self.buffers.iter().map(Buffer::data).collect();
        Ok((text, buffers))
    }

    /// Binary glTF image of the whole document
    pub fn to_glb(&self) -> Result<Vec<u8>> {
        let (json, buffers) = self.glb_parts()?;
        glb::encode(&json, &buffers)
    }

    pub fn save_glb(&self, path: impl AsRef<Path>) -> Result<()> {
        let (json, buffers) = self.glb_parts()?;
        glb::save(path, &json, &buffers)
    }
}

fn insert_elements<T: Element>(
    root: &mut Map<String, Value>,
    key: &str,
    items: &[T],
    kind: &str,
) -> Result<()> {
    if !items.is_empty() {
        root.insert(key.to_string(), element_array(items, kind)?);
    }
    Ok(())
}
