//! The contract between the history engine and the layer stack it edits.
use anyhow::Result;
use image::RgbaImage;

use crate::snapshot::{ContentKind, DocumentSnapshot, EffectStackData, LayerId, VectorData};

/// Read/write access to a document's layers.
///
/// Implemented by the document model. Reads always return owned copies so
/// the engine never aliases a live buffer; writes replace the layer's state
/// wholesale.
pub trait LayerAccess {
    /// Layer ids, bottom to top.
    fn layer_ids(&self) -> Vec<LayerId>;

    /// The layer tools currently paint on, if any.
    fn active_layer(&self) -> Option<LayerId>;

    /// Representation used by a layer's content, or `None` if it doesn't exist.
    fn content_kind(&self, id: LayerId) -> Option<ContentKind>;

    /// Copies the pixel buffer of a raster layer.
    fn read_raster(&self, id: LayerId) -> Option<RgbaImage>;

    /// Serializes the shape list of a vector layer.
    fn read_vector(&self, id: LayerId) -> Option<VectorData>;

    /// Serializes the effect stack of any layer.
    fn read_effects(&self, id: LayerId) -> Option<EffectStackData>;

    /// Copies the whole document.
    ///
    /// Fails if any layer can't be copied. A snapshot missing a layer would
    /// delete it when written back, so implementors must not skip layers.
    fn read_document(&self) -> Result<DocumentSnapshot>;

    /// Replaces a raster layer's pixel buffer.
    fn write_raster(&mut self, id: LayerId, pixels: &RgbaImage) -> Result<()>;

    /// Replaces a vector layer's shapes from their serialized form.
    fn write_vector(&mut self, id: LayerId, data: &VectorData) -> Result<()>;

    /// Replaces any layer's effect stack from its serialized form.
    fn write_effects(&mut self, id: LayerId, data: &EffectStackData) -> Result<()>;

    /// Replaces the canvas size, layer set, layer order and active layer.
    fn write_document(&mut self, snapshot: &DocumentSnapshot) -> Result<()>;
}
