//! Layers and their content.
use image::{Rgba, RgbaImage};

use crate::effects::EffectStack;
use crate::history::{ContentKind, LayerId};
use crate::shape::Shape;

/// Pixel or shape content of a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerData {
    Raster(RgbaImage),
    Vector(Vec<Shape>),
}

/// A single layer in the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Stable identity, preserved across undo/redo.
    pub id: LayerId,
    /// Display name shown in the layers panel.
    pub name: String,
    /// Hidden layers keep their content but are not rendered.
    pub visible: bool,
    /// Blend opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Position of the layer's top-left corner on the canvas.
    pub offset_x: i32,
    pub offset_y: i32,
    /// Pixels or shapes.
    pub data: LayerData,
    /// Effects rendered on top of the content.
    pub effects: EffectStack,
}

impl Layer {
    /// Creates a raster layer of the given size filled with `fill`.
    pub fn new_raster(name: impl Into<String>, width: u32, height: u32, fill: Rgba<u8>) -> Self {
        Self::with_data(name, LayerData::Raster(RgbaImage::from_pixel(width, height, fill)))
    }

    /// Creates an empty vector layer.
    pub fn new_vector(name: impl Into<String>) -> Self {
        Self::with_data(name, LayerData::Vector(Vec::new()))
    }

    fn with_data(name: impl Into<String>, data: LayerData) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            visible: true,
            opacity: 1.0,
            offset_x: 0,
            offset_y: 0,
            data,
            effects: EffectStack::default(),
        }
    }

    /// Which representation `data` uses.
    pub fn kind(&self) -> ContentKind {
        match self.data {
            LayerData::Raster(_) => ContentKind::Raster,
            LayerData::Vector(_) => ContentKind::Vector,
        }
    }

    /// Returns the pixel buffer, or None for vector layers.
    pub fn raster(&self) -> Option<&RgbaImage> {
        match &self.data {
            LayerData::Raster(pixels) => Some(pixels),
            LayerData::Vector(_) => None,
        }
    }

    /// Mutable pixel buffer, for raster layers only.
    pub fn raster_mut(&mut self) -> Option<&mut RgbaImage> {
        match &mut self.data {
            LayerData::Raster(pixels) => Some(pixels),
            LayerData::Vector(_) => None,
        }
    }

    /// Returns the shape list, or None for raster layers.
    pub fn shapes(&self) -> Option<&[Shape]> {
        match &self.data {
            LayerData::Vector(shapes) => Some(shapes),
            LayerData::Raster(_) => None,
        }
    }

    /// Mutable shape list, for vector layers only.
    pub fn shapes_mut(&mut self) -> Option<&mut Vec<Shape>> {
        match &mut self.data {
            LayerData::Vector(shapes) => Some(shapes),
            LayerData::Raster(_) => None,
        }
    }
}
