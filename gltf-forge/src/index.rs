//! Stable arena indices into a [`Document`](crate::Document)

use std::fmt;

use serde::Serialize;

macro_rules! arena_index {
    ($($(#[$meta:meta])* $name:ident => $kind:literal;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
            #[serde(transparent)]
            pub struct $name(pub u32);

            impl $name {
                /// Position in the owning arena
                pub fn index(self) -> usize {
                    self.0 as usize
                }

                pub(crate) fn from_position(position: usize) -> Self {
                    Self(position as u32)
                }

                /// Element kind used in diagnostics
                pub const KIND: &'static str = $kind;
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{} {}", $kind, self.0)
                }
            }
        )*
    };
}

arena_index! {
    /// Index of a [`Buffer`](crate::Buffer)
    BufferIndex => "buffer";
    /// Index of a [`View`](crate::View)
    ViewIndex => "buffer view";
    /// Index of an [`Accessor`](crate::Accessor)
    AccessorIndex => "accessor";
    MeshIndex => "mesh";
    NodeIndex => "node";
    SceneIndex => "scene";
    MaterialIndex => "material";
    TextureIndex => "texture";
    ImageIndex => "image";
    SamplerIndex => "sampler";
    CameraIndex => "camera";
}
