use serde::Serialize;
use serde_json::{Map, Value};

use super::{Element, ElementInfo};
use crate::error::{GltfError, Result};

/// Camera projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        aspect_ratio: Option<f32>,
        /// Vertical field of view in radians
        yfov: f32,
        znear: f32,
        /// `None` means an infinite projection
        zfar: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<f32>,
    yfov: f32,
    znear: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    zfar: Option<f32>,
}

#[derive(Serialize)]
struct OrthographicRecord {
    xmag: f32,
    ymag: f32,
    znear: f32,
    zfar: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    pub info: ElementInfo,
}

impl Camera {
    pub fn perspective(yfov: f32, znear: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                aspect_ratio: None,
                yfov,
                znear,
                zfar: None,
            },
            info: ElementInfo::default(),
        }
    }

    pub fn orthographic(xmag: f32, ymag: f32, znear: f32, zfar: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                xmag,
                ymag,
                znear,
                zfar,
            },
            info: ElementInfo::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self.projection {
            Projection::Perspective {
                aspect_ratio,
                yfov,
                znear,
                zfar,
            } => {
                if !(yfov > 0.0) || !(znear > 0.0) {
                    return Err(GltfError::validation(
                        "perspective camera needs yfov > 0 and znear > 0",
                    ));
                }
                if aspect_ratio.is_some_and(|a| !(a > 0.0)) {
                    return Err(GltfError::validation("aspectRatio must be positive"));
                }
                if zfar.is_some_and(|far| !(far > znear)) {
                    return Err(GltfError::validation("zfar must be greater than znear"));
                }
            }
            Projection::Orthographic {
                xmag,
                ymag,
                znear,
                zfar,
            } => {
                if xmag == 0.0 || ymag == 0.0 {
                    return Err(GltfError::validation("xmag and ymag must be non-zero"));
                }
                if !(znear >= 0.0) || !(zfar > znear) {
                    return Err(GltfError::validation(
                        "orthographic camera needs 0 <= znear < zfar",
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Element for Camera {
    fn to_json(&self) -> Result<Value> {
        self.validate()?;

        let mut object = Map::new();
        match self.projection {
            Projection::Perspective {
                aspect_ratio,
                yfov,
                znear,
                zfar,
            } => {
                object.insert("type".to_string(), Value::from("perspective"));
                object.insert(
                    "perspective".to_string(),
                    serde_json::to_value(PerspectiveRecord {
                        aspect_ratio,
                        yfov,
                        znear,
                        zfar,
                    })?,
                );
            }
            Projection::Orthographic {
                xmag,
                ymag,
                znear,
                zfar,
            } => {
                object.insert("type".to_string(), Value::from("orthographic"));
                object.insert(
                    "orthographic".to_string(),
                    serde_json::to_value(OrthographicRecord {
                        xmag,
                        ymag,
                        znear,
                        zfar,
                    })?,
                );
            }
        }
        self.info.write_into(&mut object);
        Ok(Value::Object(object))
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}
