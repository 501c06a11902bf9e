//! Non-destructive layer effects.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::history::EffectStackData;

/// One effect applied on top of a layer's content at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    DropShadow {
        offset_x: i32,
        offset_y: i32,
        blur: f32,
        color: [u8; 4],
    },
    Stroke {
        width: f32,
        color: [u8; 4],
    },
    ColorOverlay {
        color: [u8; 4],
        opacity: f32,
    },
}

/// Ordered effects of one layer, applied first to last.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectStack {
    /// Effects, bottom to top.
    pub effects: Vec<Effect>,
}

impl EffectStack {
    /// Empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the layer renders without effects.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Appends an effect on top of the existing ones.
    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Serializes the stack for the history.
    ///
    /// An empty stack encodes to an empty payload so layers without effects
    /// cost nothing to capture.
    pub fn to_data(&self) -> Result<EffectStackData> {
        if self.effects.is_empty() {
            return Ok(EffectStackData::default());
        }
        let bytes = bincode::serialize(self).context("Failed to serialize effect stack")?;
        Ok(EffectStackData::new(bytes))
    }

    /// Inverse of [`to_data`](Self::to_data).
    pub fn from_data(data: &EffectStackData) -> Result<Self> {
        if data.as_bytes().is_empty() {
            return Ok(Self::default());
        }
        bincode::deserialize(data.as_bytes()).context("Failed to deserialize effect stack")
    }
}

impl From<Vec<Effect>> for EffectStack {
    fn from(effects: Vec<Effect>) -> Self {
        Self { effects }
    }
}
