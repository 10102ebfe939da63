//! Closed enumerations of the glTF format and their numeric codes

use std::fmt;
use std::path::Path;

use serde::{Serialize, Serializer};

/// Serialize a code enum as its numeric glTF code
macro_rules! serialize_as_code {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_u32(self.code())
                }
            }
        )*
    };
}

/// Serialize a named enum as its glTF string
macro_rules! serialize_as_name {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.name())
                }
            }
        )*
    };
}

// =============================================================================
// Component Types
// =============================================================================

/// Numeric type of one accessor component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
}

struct ComponentInfo {
    code: u32,
    size: usize,
    name: &'static str,
    /// Lowest representable value (-inf for floats)
    lowest: f64,
    /// Highest representable value (+inf for floats)
    highest: f64,
}

/// Indexed by `ComponentType as usize`
static COMPONENT_TABLE: [ComponentInfo; 7] = [
    ComponentInfo {
        code: 5120,
        size: 1,
        name: "int8",
        lowest: i8::MIN as f64,
        highest: i8::MAX as f64,
    },
    ComponentInfo {
        code: 5121,
        size: 1,
        name: "uint8",
        lowest: 0.0,
        highest: u8::MAX as f64,
    },
    ComponentInfo {
        code: 5122,
        size: 2,
        name: "int16",
        lowest: i16::MIN as f64,
        highest: i16::MAX as f64,
    },
    ComponentInfo {
        code: 5123,
        size: 2,
        name: "uint16",
        lowest: 0.0,
        highest: u16::MAX as f64,
    },
    ComponentInfo {
        code: 5124,
        size: 4,
        name: "int32",
        lowest: i32::MIN as f64,
        highest: i32::MAX as f64,
    },
    ComponentInfo {
        code: 5125,
        size: 4,
        name: "uint32",
        lowest: 0.0,
        highest: u32::MAX as f64,
    },
    ComponentInfo {
        code: 5126,
        size: 4,
        name: "float32",
        lowest: f64::NEG_INFINITY,
        highest: f64::INFINITY,
    },
];

impl ComponentType {
    pub const ALL: [ComponentType; 7] = [
        ComponentType::Int8,
        ComponentType::Uint8,
        ComponentType::Int16,
        ComponentType::Uint16,
        ComponentType::Int32,
        ComponentType::Uint32,
        ComponentType::Float32,
    ];

    fn info(self) -> &'static ComponentInfo {
        &COMPONENT_TABLE[self as usize]
    }

    /// glTF `componentType` code
    pub fn code(self) -> u32 {
        self.info().code
    }

    /// Size of one component in bytes
    pub fn byte_size(self) -> usize {
        self.info().size
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Starting value of a running maximum
    pub fn lowest(self) -> f64 {
        self.info().lowest
    }

    /// Starting value of a running minimum
    pub fn highest(self) -> f64 {
        self.info().highest
    }

    pub fn is_integer(self) -> bool {
        self != ComponentType::Float32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.code() == code)
    }

    /// Decode one little endian component as f64
    ///
    /// `bytes` must hold at least [`ComponentType::byte_size`] bytes.
    pub(crate) fn read_f64(self, bytes: &[u8]) -> f64 {
        match self {
            ComponentType::Int8 => bytes[0] as i8 as f64,
            ComponentType::Uint8 => bytes[0] as f64,
            ComponentType::Int16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            ComponentType::Uint16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            ComponentType::Int32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            ComponentType::Uint32 => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            ComponentType::Float32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Element Shapes
// =============================================================================

/// Accessor element shape (`type` in glTF JSON)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementShape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementShape {
    /// Components per element
    pub const fn component_count(self) -> usize {
        match self {
            ElementShape::Scalar => 1,
            ElementShape::Vec2 => 2,
            ElementShape::Vec3 => 3,
            ElementShape::Vec4 | ElementShape::Mat2 => 4,
            ElementShape::Mat3 => 9,
            ElementShape::Mat4 => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementShape::Scalar => "SCALAR",
            ElementShape::Vec2 => "VEC2",
            ElementShape::Vec3 => "VEC3",
            ElementShape::Vec4 => "VEC4",
            ElementShape::Mat2 => "MAT2",
            ElementShape::Mat3 => "MAT3",
            ElementShape::Mat4 => "MAT4",
        }
    }
}

// =============================================================================
// Buffer View Targets & Primitive Modes
// =============================================================================

/// Intended GPU binding of a buffer view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    ArrayBuffer,
    ElementArrayBuffer,
}

impl BufferTarget {
    pub const fn code(self) -> u32 {
        match self {
            BufferTarget::ArrayBuffer => 34962,
            BufferTarget::ElementArrayBuffer => 34963,
        }
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub const fn code(self) -> u32 {
        match self {
            PrimitiveMode::Points => 0,
            PrimitiveMode::Lines => 1,
            PrimitiveMode::LineLoop => 2,
            PrimitiveMode::LineStrip => 3,
            PrimitiveMode::Triangles => 4,
            PrimitiveMode::TriangleStrip => 5,
            PrimitiveMode::TriangleFan => 6,
        }
    }
}

// =============================================================================
// Attribute Semantics
// =============================================================================

/// Vertex attribute semantic
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    TexCoord(u32),
    Color(u32),
    Joints(u32),
    Weights(u32),
    /// Application specific attribute, name starts with `_`
    Custom(String),
}

impl Semantic {
    /// Attribute name as written in JSON
    pub fn name(&self) -> String {
        match self {
            Semantic::Position => "POSITION".to_string(),
            Semantic::Normal => "NORMAL".to_string(),
            Semantic::Tangent => "TANGENT".to_string(),
            Semantic::TexCoord(set) => format!("TEXCOORD_{set}"),
            Semantic::Color(set) => format!("COLOR_{set}"),
            Semantic::Joints(set) => format!("JOINTS_{set}"),
            Semantic::Weights(set) => format!("WEIGHTS_{set}"),
            Semantic::Custom(name) => name.clone(),
        }
    }

    /// Parse an attribute name; unknown names become [`Semantic::Custom`]
    pub fn parse(name: &str) -> Self {
        let indexed = |prefix: &str| -> Option<u32> {
            name.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('_'))
                .and_then(|set| set.parse().ok())
        };

        match name {
            "POSITION" => Semantic::Position,
            "NORMAL" => Semantic::Normal,
            "TANGENT" => Semantic::Tangent,
            _ => {
                if let Some(set) = indexed("TEXCOORD") {
                    Semantic::TexCoord(set)
                } else if let Some(set) = indexed("COLOR") {
                    Semantic::Color(set)
                } else if let Some(set) = indexed("JOINTS") {
                    Semantic::Joints(set)
                } else if let Some(set) = indexed("WEIGHTS") {
                    Semantic::Weights(set)
                } else {
                    Semantic::Custom(name.to_string())
                }
            }
        }
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for Semantic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

// =============================================================================
// Images, Materials & Samplers
// =============================================================================

/// Embedded image MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeType {
    Jpeg,
    Png,
}

impl MimeType {
    pub const fn name(self) -> &'static str {
        match self {
            MimeType::Jpeg => "image/jpeg",
            MimeType::Png => "image/png",
        }
    }

    /// Guess from the file extension (case insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(MimeType::Jpeg),
            "png" => Some(MimeType::Png),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    pub const fn name(self) -> &'static str {
        match self {
            AlphaMode::Opaque => "OPAQUE",
            AlphaMode::Mask => "MASK",
            AlphaMode::Blend => "BLEND",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

impl MagFilter {
    pub const fn code(self) -> u32 {
        match self {
            MagFilter::Nearest => 9728,
            MagFilter::Linear => 9729,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl MinFilter {
    pub const fn code(self) -> u32 {
        match self {
            MinFilter::Nearest => 9728,
            MinFilter::Linear => 9729,
            MinFilter::NearestMipmapNearest => 9984,
            MinFilter::LinearMipmapNearest => 9985,
            MinFilter::NearestMipmapLinear => 9986,
            MinFilter::LinearMipmapLinear => 9987,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
}

impl WrapMode {
    pub const fn code(self) -> u32 {
        match self {
            WrapMode::ClampToEdge => 33071,
            WrapMode::MirroredRepeat => 33648,
            WrapMode::Repeat => 10497,
        }
    }
}

serialize_as_code!(ComponentType, BufferTarget, PrimitiveMode, MagFilter, MinFilter, WrapMode);
serialize_as_name!(ElementShape, MimeType, AlphaMode);
