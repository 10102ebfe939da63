//! Typed interpretation of a buffer view
//!
//! An [`Accessor`] is one concrete type parameterized by a closed
//! ([`ElementShape`], [`ComponentType`]) pair. Native Rust numbers map onto
//! component types through the sealed [`Component`] trait, and mutable
//! access to accessor storage goes through [`TypedRangeMut`], which reads and
//! writes little endian bytes in place so unaligned ranges are fine.

use std::marker::PhantomData;
use std::mem::size_of;

use serde::Serialize;
use serde_json::Value;

use crate::error::{GltfError, Result};
use crate::index::ViewIndex;
use crate::types::{ComponentType, ElementShape};
use crate::view::View;

// =============================================================================
// Component Trait
// =============================================================================

mod sealed {
    pub trait Sealed {}
}

/// Native numeric type that can back an accessor component
pub trait Component: bytemuck::Pod + PartialOrd + sealed::Sealed {
    const TYPE: ComponentType;

    fn write_le(self, out: &mut [u8]);

    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_component {
    ($($ty:ty => $component:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Component for $ty {
                const TYPE: ComponentType = ComponentType::$component;

                fn write_le(self, out: &mut [u8]) {
                    out[..size_of::<$ty>()].copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..size_of::<$ty>()]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_component! {
    i8 => Int8,
    u8 => Uint8,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    f32 => Float32,
}

// =============================================================================
// Typed Mutable Range
// =============================================================================

/// Mutable typed window over accessor storage
pub struct TypedRangeMut<'a, T: Component> {
    bytes: &'a mut [u8],
    stride: usize,
    components: usize,
    count: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Component> TypedRangeMut<'a, T> {
    pub(crate) fn new(bytes: &'a mut [u8], stride: usize, components: usize, count: usize) -> Self {
        Self {
            bytes,
            stride,
            components,
            count,
            _marker: PhantomData,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Components per element
    pub fn components(&self) -> usize {
        self.components
    }

    fn position(&self, element: usize, component: usize) -> usize {
        assert!(
            element < self.count && component < self.components,
            "element {element} component {component} out of range ({} x {})",
            self.count,
            self.components
        );
        element * self.stride + component * size_of::<T>()
    }

    /// # Panics
    /// Panics if `element` or `component` is out of range.
    pub fn get(&self, element: usize, component: usize) -> T {
        let at = self.position(element, component);
        T::read_le(&self.bytes[at..])
    }

    /// # Panics
    /// Panics if `element` or `component` is out of range.
    pub fn set(&mut self, element: usize, component: usize, value: T) {
        let at = self.position(element, component);
        value.write_le(&mut self.bytes[at..]);
    }

    /// Write all components of one element
    ///
    /// # Panics
    /// Panics if `values` does not hold exactly one element.
    pub fn set_element(&mut self, element: usize, values: &[T]) {
        assert_eq!(values.len(), self.components, "element size mismatch");
        for (component, &value) in values.iter().enumerate() {
            self.set(element, component, value);
        }
    }

    /// Copy a flat, element-major slice over the whole range
    ///
    /// # Panics
    /// Panics if `values.len()` differs from `len() * components()`.
    pub fn copy_from_slice(&mut self, values: &[T]) {
        assert_eq!(
            values.len(),
            self.count * self.components,
            "source length mismatch"
        );
        if self.stride == self.components * size_of::<T>() {
            self.bytes[..values.len() * size_of::<T>()]
                .copy_from_slice(bytemuck::cast_slice(values));
            return;
        }
        for (element, chunk) in values.chunks_exact(self.components).enumerate() {
            self.set_element(element, chunk);
        }
    }
}

// =============================================================================
// Accessor
// =============================================================================

/// Component-wise bounds, one entry per shape component
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl Bounds {
    /// True if every component of `element` lies within the bounds
    pub fn contains(&self, element: &[f64]) -> bool {
        element
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .all(|(v, (lo, hi))| lo <= v && v <= hi)
    }
}

/// Typed array over a view
#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    view: Option<ViewIndex>,
    shape: ElementShape,
    component: ComponentType,
    count: usize,
    byte_offset: usize,
    /// 0 = tightly packed
    byte_stride: usize,
    normalized: bool,
    bounds: Option<Bounds>,
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessorRecord<'a> {
    buffer_view: ViewIndex,
    #[serde(skip_serializing_if = "is_zero")]
    byte_offset: usize,
    component_type: ComponentType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    normalized: bool,
    count: usize,
    #[serde(rename = "type")]
    shape: ElementShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl Accessor {
    pub fn new(shape: ElementShape, component: ComponentType) -> Self {
        Self {
            view: None,
            shape,
            component,
            count: 0,
            byte_offset: 0,
            byte_stride: 0,
            normalized: false,
            bounds: None,
            name: None,
        }
    }

    pub fn view(&self) -> Option<ViewIndex> {
        self.view
    }

    pub(crate) fn set_view(&mut self, view: ViewIndex) {
        self.view = Some(view);
    }

    pub fn shape(&self) -> ElementShape {
        self.shape
    }

    pub fn component(&self) -> ComponentType {
        self.component
    }

    /// Number of elements
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn byte_stride(&self) -> usize {
        self.byte_stride
    }

    /// Place this accessor inside an interleaved view
    ///
    /// # Arguments
    /// * `byte_offset` - Offset of the first element inside the view
    /// * `byte_stride` - Distance between elements; 0 clears interleaving and
    ///   then requires `byte_offset` to be 0
    pub fn set_interleaved(&mut self, byte_offset: usize, byte_stride: usize) -> Result<()> {
        if byte_stride == 0 && byte_offset != 0 {
            return Err(GltfError::validation(
                "interleaved byte offset requires a byte stride",
            ));
        }
        if byte_stride != 0 && byte_stride < self.element_size() {
            return Err(GltfError::Validation(format!(
                "byte stride {byte_stride} is smaller than one {} {} element ({} bytes)",
                self.shape.name(),
                self.component,
                self.element_size()
            )));
        }
        self.byte_offset = byte_offset;
        self.byte_stride = byte_stride;
        Ok(())
    }

    pub fn normalized(&self) -> bool {
        self.normalized
    }

    pub fn set_normalized(&mut self, normalized: bool) {
        self.normalized = normalized;
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    /// Replace computed bounds with explicit ones
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = Some(bounds);
    }

    pub fn clear_bounds(&mut self) {
        self.bounds = None;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Size of one element in bytes
    pub fn element_size(&self) -> usize {
        self.shape.component_count() * self.component.byte_size()
    }

    /// Bytes needed to store `count` tightly packed elements
    pub fn packed_byte_length(&self) -> usize {
        self.count * self.element_size()
    }

    /// Element stride given the stride of the view it reads through
    pub fn stride_in(&self, view_stride: Option<usize>) -> usize {
        if self.byte_stride != 0 {
            self.byte_stride
        } else {
            view_stride.unwrap_or_else(|| self.element_size())
        }
    }

    /// View bytes covered by this accessor at `stride`, offset included
    pub fn span(&self, stride: usize) -> usize {
        if self.count == 0 {
            self.byte_offset
        } else {
            self.byte_offset + stride * (self.count - 1) + self.element_size()
        }
    }

    pub(crate) fn check_fits(&self, index: usize, view_len: usize, stride: usize) -> Result<()> {
        let needed = self.span(stride);
        if needed > view_len {
            return Err(GltfError::Validation(format!(
                "accessor {index} needs {needed} bytes but its buffer view holds {view_len}"
            )));
        }
        Ok(())
    }

    /// Component-wise min/max over every element
    ///
    /// # Arguments
    /// * `view_bytes` - Bytes of the associated view
    /// * `stride` - Effective element stride, see [`Accessor::stride_in`]
    pub(crate) fn compute_bounds(
        &self,
        index: usize,
        view_bytes: &[u8],
        stride: usize,
    ) -> Result<Bounds> {
        if self.count == 0 {
            return Err(GltfError::Validation(format!(
                "accessor {index} has no elements"
            )));
        }
        self.check_fits(index, view_bytes.len(), stride)?;

        let components = self.shape.component_count();
        let size = self.component.byte_size();
        let mut min = vec![self.component.highest(); components];
        let mut max = vec![self.component.lowest(); components];

        for element in 0..self.count {
            let base = self.byte_offset + element * stride;
            for c in 0..components {
                let value = self.component.read_f64(&view_bytes[base + c * size..]);
                if value.is_nan() {
                    return Err(GltfError::Validation(format!(
                        "accessor {index} element {element} component {c} is NaN"
                    )));
                }
                min[c] = min[c].min(value);
                max[c] = max[c].max(value);
            }
        }

        Ok(Bounds { min, max })
    }

    fn bound_values(&self, index: usize, values: &[f64]) -> Result<Vec<Value>> {
        if values.len() != self.shape.component_count() {
            return Err(GltfError::Validation(format!(
                "accessor {index} bounds have {} entries, {} expects {}",
                values.len(),
                self.shape.name(),
                self.shape.component_count()
            )));
        }
        values
            .iter()
            .map(|&v| {
                if self.component.is_integer() {
                    if v.fract() != 0.0 || !v.is_finite() {
                        return Err(GltfError::Validation(format!(
                            "accessor {index} has non-integral bound {v} for {} components",
                            self.component
                        )));
                    }
                    Ok(Value::from(v as i64))
                } else {
                    serde_json::Number::from_f64(v)
                        .map(Value::Number)
                        .ok_or_else(|| {
                            GltfError::Validation(format!(
                                "accessor {index} has non-finite bound {v}"
                            ))
                        })
                }
            })
            .collect()
    }

    pub(crate) fn to_json(&self, index: usize, views: &[View]) -> Result<Value> {
        let view_index = self.view.ok_or_else(|| {
            GltfError::Validation(format!("accessor {index} has no buffer view"))
        })?;
        let view = views.get(view_index.index()).ok_or_else(|| {
            GltfError::Validation(format!(
                "accessor {index} references missing {view_index}"
            ))
        })?;
        if self.count == 0 {
            return Err(GltfError::Validation(format!(
                "accessor {index} has no elements"
            )));
        }

        if self.byte_stride != 0 && view.byte_stride() != Some(self.byte_stride) {
            return Err(GltfError::Validation(format!(
                "accessor {index} stride {} conflicts with {view_index} stride {:?}",
                self.byte_stride,
                view.byte_stride()
            )));
        }
        match view.byte_stride() {
            Some(stride) if stride < self.element_size() => {
                return Err(GltfError::Validation(format!(
                    "{view_index} stride {stride} cannot hold accessor {index} ({} bytes per element)",
                    self.element_size()
                )));
            }
            _ => {}
        }
        self.check_fits(index, view.byte_length(), self.stride_in(view.byte_stride()))?;

        let (min, max) = match &self.bounds {
            Some(bounds) => (
                Some(self.bound_values(index, &bounds.min)?),
                Some(self.bound_values(index, &bounds.max)?),
            ),
            None => (None, None),
        };

        let record = AccessorRecord {
            buffer_view: view_index,
            byte_offset: self.byte_offset,
            component_type: self.component,
            normalized: self.normalized,
            count: self.count,
            shape: self.shape,
            max,
            min,
            name: self.name.as_deref(),
        };
        Ok(serde_json::to_value(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BufferIndex;
    use serde_json::json;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_typed_range_unaligned() {
        let mut backing = vec![0u8; 13];
        {
            let mut range = TypedRangeMut::<f32>::new(&mut backing[1..], 4, 1, 3);
            range.copy_from_slice(&[1.5, -2.0, 3.25]);
            assert_eq!(range.get(1, 0), -2.0);
            range.set(2, 0, 8.0);
        }
        assert_eq!(backing[0], 0);
        assert_eq!(&backing[1..5], &1.5f32.to_le_bytes());
        assert_eq!(&backing[9..13], &8.0f32.to_le_bytes());
    }

    #[test]
    fn test_typed_range_strided() {
        let mut backing = vec![0xFFu8; 8];
        let mut range = TypedRangeMut::<u16>::new(&mut backing, 4, 1, 2);
        range.copy_from_slice(&[1, 2]);
        assert_eq!(backing, vec![1, 0, 0xFF, 0xFF, 2, 0, 0xFF, 0xFF]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_typed_range_bounds_checked() {
        let mut backing = vec![0u8; 4];
        let range = TypedRangeMut::<u16>::new(&mut backing, 2, 1, 2);
        range.get(2, 0);
    }

    #[test]
    fn test_set_interleaved_rules() {
        let mut accessor = Accessor::new(ElementShape::Vec3, ComponentType::Float32);
        assert!(accessor.set_interleaved(12, 0).is_err());
        assert!(accessor.set_interleaved(0, 8).is_err());
        accessor.set_interleaved(12, 24).unwrap();
        assert_eq!(accessor.byte_offset(), 12);
        assert_eq!(accessor.stride_in(None), 24);
    }

    #[test]
    fn test_bounds_float() {
        let mut accessor = Accessor::new(ElementShape::Vec2, ComponentType::Float32);
        accessor.set_count(3);
        let bytes = f32_bytes(&[0.0, 1.0, -4.0, 2.0, 3.0, -1.0]);

        let bounds = accessor.compute_bounds(0, &bytes, 8).unwrap();
        assert_eq!(bounds.min, vec![-4.0, -1.0]);
        assert_eq!(bounds.max, vec![3.0, 2.0]);
        for element in bytes.chunks_exact(8) {
            let x = f32::from_le_bytes([element[0], element[1], element[2], element[3]]);
            let y = f32::from_le_bytes([element[4], element[5], element[6], element[7]]);
            assert!(bounds.contains(&[x as f64, y as f64]));
        }
    }

    #[test]
    fn test_bounds_unsigned_never_negative() {
        let mut accessor = Accessor::new(ElementShape::Scalar, ComponentType::Uint8);
        accessor.set_count(4);
        let bounds = accessor.compute_bounds(0, &[200, 7, 255, 9], 1).unwrap();
        assert_eq!(bounds.min, vec![7.0]);
        assert_eq!(bounds.max, vec![255.0]);
    }

    #[test]
    fn test_bounds_reject_nan() {
        let mut accessor = Accessor::new(ElementShape::Scalar, ComponentType::Float32);
        accessor.set_count(2);
        let err = accessor
            .compute_bounds(4, &f32_bytes(&[1.0, f32::NAN]), 4)
            .unwrap_err();
        assert!(err.to_string().contains("accessor 4 element 1 component 0 is NaN"));
    }

    #[test]
    fn test_bounds_view_too_small() {
        let mut accessor = Accessor::new(ElementShape::Vec3, ComponentType::Float32);
        accessor.set_count(2);
        assert!(matches!(
            accessor.compute_bounds(0, &[0u8; 20], 12),
            Err(GltfError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_view_message() {
        let mut accessor = Accessor::new(ElementShape::Vec3, ComponentType::Float32);
        accessor.set_count(1);
        let err = accessor.to_json(2, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation failed: accessor 2 has no buffer view"
        );
    }

    #[test]
    fn test_record_integer_bounds() {
        let views = vec![View::new(BufferIndex(0), 0, 6)];
        let mut accessor = Accessor::new(ElementShape::Scalar, ComponentType::Uint16);
        accessor.set_view(ViewIndex(0));
        accessor.set_count(3);
        accessor.set_bounds(Bounds {
            min: vec![0.0],
            max: vec![7.0],
        });

        let value = accessor.to_json(0, &views).unwrap();
        assert_eq!(
            value,
            json!({
                "bufferView": 0,
                "componentType": 5123,
                "count": 3,
                "type": "SCALAR",
                "min": [0],
                "max": [7]
            })
        );
    }

    #[test]
    fn test_fractional_integer_bound_rejected() {
        let views = vec![View::new(BufferIndex(0), 0, 6)];
        let mut accessor = Accessor::new(ElementShape::Scalar, ComponentType::Uint16);
        accessor.set_view(ViewIndex(0));
        accessor.set_count(3);
        accessor.set_bounds(Bounds {
            min: vec![0.0],
            max: vec![7.5],
        });

        let err = accessor.to_json(0, &views).unwrap_err();
        assert!(matches!(err, GltfError::Validation(ref m) if m.contains("7.5")));
    }

    #[test]
    fn test_stride_conflict_rejected() {
        let mut view = View::new(BufferIndex(0), 0, 48);
        view.set_range(0, 48, 16);
        let views = vec![view];

        let mut accessor = Accessor::new(ElementShape::Vec3, ComponentType::Float32);
        accessor.set_view(ViewIndex(0));
        accessor.set_count(2);
        accessor.set_interleaved(0, 24).unwrap();
        assert!(accessor.to_json(0, &views).is_err());

        accessor.set_interleaved(0, 16).unwrap();
        assert!(accessor.to_json(0, &views).is_ok());
    }
}
