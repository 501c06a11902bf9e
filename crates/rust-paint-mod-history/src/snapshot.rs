//! Byte-accounted copies of layer state.
//!
//! These types know nothing about history semantics. They are plain values
//! produced by the document model on request and compared, stored and handed
//! back by the history engine. Every value reports the bytes it retains so
//! the memory budget can account for it.
use std::fmt;
use std::mem::size_of;

use image::RgbaImage;
use uuid::Uuid;

/// Stable identifier of a layer, independent of its position in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialized shape list of a vector or text layer.
///
/// The encoding belongs to the document model; the engine only compares
/// and stores the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VectorData(Vec<u8>);

impl VectorData {
    /// Wraps bytes produced by the document model.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The serialized shapes, as handed over.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Bytes retained, the payload length.
    pub fn byte_cost(&self) -> usize {
        self.0.len()
    }
}

/// Serialized effect stack of a layer (drop shadow, stroke, overlays...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectStackData(Vec<u8>);

impl EffectStackData {
    /// Wraps bytes produced by the document model. Empty means no effects.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The serialized effect stack, as handed over.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Bytes retained, the payload length.
    pub fn byte_cost(&self) -> usize {
        self.0.len()
    }
}

/// Which representation a layer's content uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// RGBA pixel buffer.
    Raster,
    /// Serialized shape list (vector shapes and text).
    Vector,
}

/// The content of one layer, in whichever representation it uses.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    Raster(RgbaImage),
    Vector(VectorData),
}

impl LayerContent {
    /// Representation of this content.
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Raster(_) => ContentKind::Raster,
            Self::Vector(_) => ContentKind::Vector,
        }
    }

    /// Bytes retained by the buffer or payload.
    pub fn byte_cost(&self) -> usize {
        match self {
            Self::Raster(pixels) => raster_cost(pixels),
            Self::Vector(data) => data.byte_cost(),
        }
    }
}

/// Bytes retained by a copied pixel buffer.
pub fn raster_cost(pixels: &RgbaImage) -> usize {
    pixels.as_raw().len()
}

/// Full state of one layer: metadata, geometry, content and effects.
///
/// Used for whole-document snapshots and for layers whose buffer is replaced
/// during a resize.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    /// Identity the record is restored under.
    pub id: LayerId,
    /// Display name.
    pub name: String,
    /// Visibility flag.
    pub visible: bool,
    /// Blend opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Horizontal offset of the layer's origin on the canvas.
    pub offset_x: i32,
    /// Vertical offset of the layer's origin on the canvas.
    pub offset_y: i32,
    /// Pixels or serialized shapes.
    pub content: LayerContent,
    /// Serialized effect stack.
    pub effects: EffectStackData,
}

impl LayerRecord {
    /// Record footprint plus name, content and effects.
    pub fn byte_cost(&self) -> usize {
        size_of::<Self>() + self.name.len() + self.content.byte_cost() + self.effects.byte_cost()
    }
}

/// Snapshot of the whole document: canvas size, layer order and every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// Canvas size in pixels.
    pub width: u32,
    pub height: u32,
    /// Layer tools paint on when the snapshot is restored.
    pub active_layer: Option<LayerId>,
    /// Layers bottom to top.
    pub layers: Vec<LayerRecord>,
}

impl DocumentSnapshot {
    /// Bytes retained by every layer record.
    pub fn byte_cost(&self) -> usize {
        size_of::<Self>() + self.layers.iter().map(LayerRecord::byte_cost).sum::<usize>()
    }

    /// Finds a layer record by id.
    pub fn layer(&self, id: LayerId) -> Option<&LayerRecord> {
        self.layers.iter().find(|r| r.id == id)
    }

    /// Layer ids, bottom to top.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|r| r.id).collect()
    }
}
