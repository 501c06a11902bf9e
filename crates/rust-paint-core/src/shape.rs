//! Shapes held by vector and text layers.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::history::VectorData;

/// A single resolution-independent shape. Colours are straight RGBA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: [u8; 4],
    },
    Ellipse {
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
        color: [u8; 4],
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        color: [u8; 4],
    },
}

impl Shape {
    /// Short name used in history labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rect { .. } => "Rectangle",
            Self::Ellipse { .. } => "Ellipse",
            Self::Text { .. } => "Text",
        }
    }
}

/// Serializes a shape list into the opaque form stored by the history.
pub fn encode_shapes(shapes: &[Shape]) -> Result<VectorData> {
    let bytes = bincode::serialize(shapes).context("Failed to serialize shape list")?;
    Ok(VectorData::new(bytes))
}

/// Inverse of [`encode_shapes`].
pub fn decode_shapes(data: &VectorData) -> Result<Vec<Shape>> {
    bincode::deserialize(data.as_bytes()).context("Failed to deserialize shape list")
}
