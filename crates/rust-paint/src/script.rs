//! Edit scripts: a JSON list of steps replayed against a document.
use std::path::Path;

use anyhow::{Context, Result};
use image::Rgba;
use rust_paint_config::HexColor;
use rust_paint_core::document::Document;
use rust_paint_core::effects::{Effect, EffectStack};
use rust_paint_core::history::LayerId;
use rust_paint_core::shape::Shape;
use serde::Deserialize;

/// One scripted action. Layers are addressed by index, bottom to top, as the
/// stack looks when the step runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Paint {
        layer: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: HexColor,
    },
    Erase {
        layer: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Fill {
        layer: usize,
        color: HexColor,
    },
    AddLayer {
        name: String,
        #[serde(default)]
        vector: bool,
    },
    AddShape {
        layer: usize,
        shape: Shape,
    },
    RemoveLayer {
        layer: usize,
    },
    ResizeCanvas {
        width: u32,
        height: u32,
    },
    SetEffects {
        layer: usize,
        effects: Vec<Effect>,
    },
    SetOpacity {
        layer: usize,
        opacity: f32,
    },
    Undo,
    Redo,
    /// Moves the history cursor to `index` (0 = before the first entry).
    Jump {
        index: usize,
    },
}

/// Reads a script file.
pub fn load(path: &Path) -> Result<Vec<Step>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    parse(&contents).with_context(|| format!("Invalid script {}", path.display()))
}

/// Parses a script from JSON text.
pub fn parse(json: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(json)?)
}

fn rgba(color: HexColor) -> Rgba<u8> {
    Rgba(color.to_array())
}

fn layer_at(doc: &Document, index: usize) -> Result<LayerId> {
    doc.layers
        .layers()
        .get(index)
        .map(|layer| layer.id)
        .with_context(|| {
            format!(
                "No layer at index {index} (document has {})",
                doc.layers.len()
            )
        })
}

/// Applies one step. Undo/redo past either end of the history is not an error.
pub fn apply(doc: &mut Document, step: &Step) -> Result<()> {
    match step {
        Step::Paint {
            layer,
            x,
            y,
            width,
            height,
            color,
        } => {
            let id = layer_at(doc, *layer)?;
            doc.paint_rect(id, *x, *y, *width, *height, rgba(*color))
        }
        Step::Erase {
            layer,
            x,
            y,
            width,
            height,
        } => {
            let id = layer_at(doc, *layer)?;
            doc.erase_rect(id, *x, *y, *width, *height)
        }
        Step::Fill { layer, color } => {
            let id = layer_at(doc, *layer)?;
            doc.fill_layer(id, rgba(*color))
        }
        Step::AddLayer { name, vector } => {
            if *vector {
                doc.add_vector_layer(name)?;
            } else {
                doc.add_raster_layer(name)?;
            }
            Ok(())
        }
        Step::AddShape { layer, shape } => {
            let id = layer_at(doc, *layer)?;
            doc.add_shape(id, shape.clone())
        }
        Step::RemoveLayer { layer } => {
            let id = layer_at(doc, *layer)?;
            doc.remove_layer(id)
        }
        Step::ResizeCanvas { width, height } => doc.resize_canvas(*width, *height),
        Step::SetEffects { layer, effects } => {
            let id = layer_at(doc, *layer)?;
            doc.set_layer_effects(id, EffectStack::from(effects.clone()))
        }
        Step::SetOpacity { layer, opacity } => {
            let id = layer_at(doc, *layer)?;
            doc.set_layer_opacity(id, *opacity)
        }
        Step::Undo => {
            if !doc.undo() {
                tracing::info!("Nothing to undo");
            }
            Ok(())
        }
        Step::Redo => {
            if !doc.redo() {
                tracing::info!("Nothing to redo");
            }
            Ok(())
        }
        Step::Jump { index } => {
            let steps = doc.jump_to_history(*index);
            tracing::debug!("Jumped {steps} steps to {index}");
            Ok(())
        }
    }
}

/// Applies every step in order, stopping at the first failure.
pub fn run(doc: &mut Document, steps: &[Step]) -> Result<()> {
    for (i, step) in steps.iter().enumerate() {
        apply(doc, step).with_context(|| format!("Step {} ({step:?}) failed", i + 1))?;
    }
    Ok(())
}
