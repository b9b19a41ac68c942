use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(StickerId);
id_newtype!(GenerationToken);

/// Side length of the square footprint every sticker is drawn into before
/// scaling. Stickers are anchored at their center.
pub const STICKER_SIZE: f64 = 150.0;

/// Opaque handle to generated image data: usually a `data:image/png;base64,`
/// URL, sometimes a plain remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_url(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Short form for log lines; inline data URLs can be megabytes long.
    pub fn summary(&self) -> String {
        const MAX: usize = 48;
        if self.0.len() <= MAX {
            return self.0.clone();
        }
        let cut = (0..=MAX)
            .rev()
            .find(|idx| self.0.is_char_boundary(*idx))
            .unwrap_or(0);
        format!("{}... ({} bytes)", &self.0[..cut], self.0.len())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Transform {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn merged(mut self, patch: &TransformPatch) -> Self {
        patch.apply_to(&mut self);
        self
    }

    /// Footprint box after scaling. Sides are signed, so a mirrored axis
    /// gives a negative side that never fits a minimum.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            x: self.x,
            y: self.y,
            width: STICKER_SIZE * self.scale_x,
            height: STICKER_SIZE * self.scale_y,
            rotation: self.rotation,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Partial transform reported by a drag/resize/rotate gesture. Absent fields
/// keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
}

impl TransformPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn scale(scale_x: f64, scale_y: f64) -> Self {
        Self {
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            ..Self::default()
        }
    }

    pub fn rotation(rotation: f64) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, transform: &mut Transform) {
        if let Some(v) = self.x {
            transform.x = v;
        }
        if let Some(v) = self.y {
            transform.y = v;
        }
        if let Some(v) = self.rotation {
            transform.rotation = v;
        }
        if let Some(v) = self.scale_x {
            transform.scale_x = v;
        }
        if let Some(v) = self.scale_y {
            transform.scale_y = v;
        }
    }
}

impl From<Transform> for TransformPatch {
    fn from(value: Transform) -> Self {
        Self {
            x: Some(value.x),
            y: Some(value.y),
            rotation: Some(value.rotation),
            scale_x: Some(value.scale_x),
            scale_y: Some(value.scale_y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl BoundingBox {
    pub fn fits_minimum(&self, min_side: f64) -> bool {
        self.width >= min_side && self.height >= min_side
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    pub id: StickerId,
    pub image_ref: ImageRef,
    #[serde(flatten)]
    pub transform: Transform,
}
