//! Re-exports from rust-paint-mod-history and conversion traits.
//! Bridges the history crate's layer records with rust-paint-core's Layer type.
pub use rust_paint_mod_history::{
    Capture, ContentKind, DocumentSnapshot, EffectStackData, EntryId, EntryKind, EntryView,
    HistoryConfig, HistoryEntry, HistoryError, HistoryManager, LayerAccess, LayerContent, LayerId,
    LayerRecord, MemoryUsage, VectorData,
};

use anyhow::{Context, Error, Result};

use crate::effects::EffectStack;
use crate::layer::{Layer, LayerData};
use crate::shape::{decode_shapes, encode_shapes};

impl TryFrom<&Layer> for LayerRecord {
    type Error = Error;

    fn try_from(layer: &Layer) -> Result<Self> {
        let content = match &layer.data {
            LayerData::Raster(pixels) => LayerContent::Raster(pixels.clone()),
            LayerData::Vector(shapes) => LayerContent::Vector(encode_shapes(shapes)?),
        };
        Ok(LayerRecord {
            id: layer.id,
            name: layer.name.clone(),
            visible: layer.visible,
            opacity: layer.opacity,
            offset_x: layer.offset_x,
            offset_y: layer.offset_y,
            content,
            effects: layer.effects.to_data()?,
        })
    }
}

impl TryFrom<&LayerRecord> for Layer {
    type Error = Error;

    fn try_from(record: &LayerRecord) -> Result<Self> {
        let data = match &record.content {
            LayerContent::Raster(pixels) => LayerData::Raster(pixels.clone()),
            LayerContent::Vector(data) => LayerData::Vector(
                decode_shapes(data)
                    .with_context(|| format!("Failed to restore shapes of layer {}", record.id))?,
            ),
        };
        Ok(Layer {
            id: record.id,
            name: record.name.clone(),
            visible: record.visible,
            opacity: record.opacity,
            offset_x: record.offset_x,
            offset_y: record.offset_y,
            data,
            effects: EffectStack::from_data(&record.effects)
                .with_context(|| format!("Failed to restore effects of layer {}", record.id))?,
        })
    }
}
