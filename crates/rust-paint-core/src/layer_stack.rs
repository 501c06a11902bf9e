//! Ordered layers plus canvas geometry.
//!
//! `LayerStack` is the live state the history engine reads and writes through
//! [`LayerAccess`]. Its own methods mutate layers directly and record nothing;
//! undoable editing goes through [`Document`](crate::document::Document).

use anyhow::{bail, Context, Result};
use image::{imageops, Rgba, RgbaImage};

use crate::effects::EffectStack;
use crate::history::{
    ContentKind, DocumentSnapshot, EffectStackData, LayerAccess, LayerId, LayerRecord, VectorData,
};
use crate::layer::{Layer, LayerData};
use crate::shape::{decode_shapes, encode_shapes, Shape};

/// Fully transparent pixel, what erasing leaves behind.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Layers of one document, bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    active: Option<LayerId>,
}

impl LayerStack {
    /// Creates a canvas with a single raster "Background" layer.
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        let background = Layer::new_raster("Background", width, height, background);
        let active = Some(background.id);
        Self {
            width,
            height,
            layers: vec![background],
            active,
        }
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Layers, bottom to top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True if every layer has been removed.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Finds a layer by id.
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .with_context(|| format!("No layer with id {id}"))
    }

    /// The layer edits target by default.
    pub fn active(&self) -> Option<LayerId> {
        self.active
    }

    /// Makes `id` the layer tools paint on.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist.
    pub fn set_active(&mut self, id: LayerId) -> Result<()> {
        if self.layer(id).is_none() {
            bail!("Cannot activate missing layer {id}");
        }
        self.active = Some(id);
        Ok(())
    }

    /// Adds a canvas-sized transparent raster layer on top and activates it.
    pub fn add_raster(&mut self, name: &str) -> LayerId {
        self.push(Layer::new_raster(name, self.width, self.height, TRANSPARENT))
    }

    /// Adds an empty vector layer on top and activates it.
    pub fn add_vector(&mut self, name: &str) -> LayerId {
        self.push(Layer::new_vector(name))
    }

    fn push(&mut self, layer: Layer) -> LayerId {
        let id = layer.id;
        self.layers.push(layer);
        self.active = Some(id);
        id
    }

    /// Removes a layer. The layer below it (or the new bottom) becomes active.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist.
    pub fn remove(&mut self, id: LayerId) -> Result<Layer> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .with_context(|| format!("Cannot remove missing layer {id}"))?;
        let removed = self.layers.remove(index);
        if self.active == Some(id) {
            self.active = self
                .layers
                .get(index.saturating_sub(1))
                .map(|l| l.id);
        }
        Ok(removed)
    }

    /// Sets every pixel of the rectangle to `color`, clipped to the layer.
    /// Returns the number of pixels written.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist or is not a raster layer.
    pub fn fill_rect(
        &mut self,
        id: LayerId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: Rgba<u8>,
    ) -> Result<u64> {
        let layer = self.layer_mut(id)?;
        let Some(pixels) = layer.raster_mut() else {
            bail!("Layer {id} is not a raster layer");
        };
        let x_end = x.saturating_add(width).min(pixels.width());
        let y_end = y.saturating_add(height).min(pixels.height());
        let mut written = 0;
        for py in y.min(y_end)..y_end {
            for px in x.min(x_end)..x_end {
                pixels.put_pixel(px, py, color);
                written += 1;
            }
        }
        Ok(written)
    }

    /// Fills a whole raster layer with `color`.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist or is not a raster layer.
    pub fn fill(&mut self, id: LayerId, color: Rgba<u8>) -> Result<()> {
        let layer = self.layer_mut(id)?;
        let Some(pixels) = layer.raster_mut() else {
            bail!("Layer {id} is not a raster layer");
        };
        pixels.pixels_mut().for_each(|p| *p = color);
        Ok(())
    }

    /// Appends a shape to a vector layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist or is not a vector layer.
    pub fn push_shape(&mut self, id: LayerId, shape: Shape) -> Result<()> {
        let layer = self.layer_mut(id)?;
        let Some(shapes) = layer.shapes_mut() else {
            bail!("Layer {id} is not a vector layer");
        };
        shapes.push(shape);
        Ok(())
    }

    /// Replaces a layer's effect stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist.
    pub fn set_effects(&mut self, id: LayerId, effects: EffectStack) -> Result<()> {
        self.layer_mut(id)?.effects = effects;
        Ok(())
    }

    /// Sets a layer's opacity, clamped to `0.0..=1.0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) -> Result<()> {
        self.layer_mut(id)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    /// Changes the canvas size, anchored at the top-left corner.
    ///
    /// Every raster layer gets a new buffer of the new size holding the
    /// overlapping region of the old one; uncovered area is transparent.
    /// Vector layers are left as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            bail!("Canvas size must be non-zero, got {width}x{height}");
        }
        for layer in &mut self.layers {
            if let Some(old) = layer.raster() {
                let mut resized = RgbaImage::from_pixel(width, height, TRANSPARENT);
                imageops::replace(&mut resized, old, 0, 0);
                layer.data = LayerData::Raster(resized);
            }
        }
        self.width = width;
        self.height = height;
        Ok(())
    }
}

impl LayerAccess for LayerStack {
    fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    fn active_layer(&self) -> Option<LayerId> {
        self.active
    }

    fn content_kind(&self, id: LayerId) -> Option<ContentKind> {
        self.layer(id).map(Layer::kind)
    }

    fn read_raster(&self, id: LayerId) -> Option<RgbaImage> {
        self.layer(id)?.raster().cloned()
    }

    fn read_vector(&self, id: LayerId) -> Option<VectorData> {
        let shapes = self.layer(id)?.shapes()?;
        match encode_shapes(shapes) {
            Ok(data) => Some(data),
            Err(err) => {
                tracing::warn!("Could not serialize shapes of layer {id}: {err:#}");
                None
            }
        }
    }

    fn read_effects(&self, id: LayerId) -> Option<EffectStackData> {
        match self.layer(id)?.effects.to_data() {
            Ok(data) => Some(data),
            Err(err) => {
                tracing::warn!("Could not serialize effects of layer {id}: {err:#}");
                None
            }
        }
    }

    fn read_document(&self) -> Result<DocumentSnapshot> {
        let layers = self
            .layers
            .iter()
            .map(|layer| {
                LayerRecord::try_from(layer)
                    .with_context(|| format!("Failed to snapshot layer {}", layer.id))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DocumentSnapshot {
            width: self.width,
            height: self.height,
            active_layer: self.active,
            layers,
        })
    }

    fn write_raster(&mut self, id: LayerId, pixels: &RgbaImage) -> Result<()> {
        let layer = self.layer_mut(id)?;
        match &mut layer.data {
            LayerData::Raster(current) => current.clone_from(pixels),
            LayerData::Vector(_) => bail!("Layer {id} is not a raster layer"),
        }
        Ok(())
    }

    fn write_vector(&mut self, id: LayerId, data: &VectorData) -> Result<()> {
        let shapes = decode_shapes(data)?;
        let layer = self.layer_mut(id)?;
        match &mut layer.data {
            LayerData::Vector(current) => *current = shapes,
            LayerData::Raster(_) => bail!("Layer {id} is not a vector layer"),
        }
        Ok(())
    }

    fn write_effects(&mut self, id: LayerId, data: &EffectStackData) -> Result<()> {
        let effects = EffectStack::from_data(data)?;
        self.layer_mut(id)?.effects = effects;
        Ok(())
    }

    fn write_document(&mut self, snapshot: &DocumentSnapshot) -> Result<()> {
        let layers = snapshot
            .layers
            .iter()
            .map(Layer::try_from)
            .collect::<Result<Vec<_>>>()
            .context("Failed to restore document snapshot")?;
        self.width = snapshot.width;
        self.height = snapshot.height;
        self.layers = layers;
        self.active = snapshot.active_layer;
        Ok(())
    }
}
