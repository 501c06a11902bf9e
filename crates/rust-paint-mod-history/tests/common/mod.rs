// Minimal in-memory layer stack used to drive the history engine in tests.
#![allow(dead_code)]

use anyhow::{bail, Result};
use image::{Rgba, RgbaImage};
use rust_paint_mod_history::{
    ContentKind, DocumentSnapshot, EffectStackData, LayerAccess, LayerContent, LayerId,
    LayerRecord, VectorData,
};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

#[derive(Debug, Clone, PartialEq)]
pub struct FakeLayers {
    pub width: u32,
    pub height: u32,
    pub active: Option<LayerId>,
    pub layers: Vec<LayerRecord>,
    /// Makes `read_document` fail, like a layer that can't be serialized.
    pub unreadable: bool,
}

impl FakeLayers {
    /// A document with one raster layer filled with `color`.
    pub fn with_raster(width: u32, height: u32, color: Rgba<u8>) -> (Self, LayerId) {
        let mut doc = Self {
            width,
            height,
            active: None,
            layers: Vec::new(),
            unreadable: false,
        };
        let id = doc.add_raster("Background", color);
        (doc, id)
    }

    pub fn add_raster(&mut self, name: &str, color: Rgba<u8>) -> LayerId {
        let id = LayerId::new();
        self.layers.push(LayerRecord {
            id,
            name: name.to_string(),
            visible: true,
            opacity: 1.0,
            offset_x: 0,
            offset_y: 0,
            content: LayerContent::Raster(RgbaImage::from_pixel(self.width, self.height, color)),
            effects: EffectStackData::default(),
        });
        self.active = Some(id);
        id
    }

    pub fn add_vector(&mut self, name: &str, shapes: &[u8]) -> LayerId {
        let id = LayerId::new();
        self.layers.push(LayerRecord {
            id,
            name: name.to_string(),
            visible: true,
            opacity: 1.0,
            offset_x: 0,
            offset_y: 0,
            content: LayerContent::Vector(VectorData::new(shapes.to_vec())),
            effects: EffectStackData::default(),
        });
        self.active = Some(id);
        id
    }

    pub fn remove(&mut self, id: LayerId) {
        self.layers.retain(|r| r.id != id);
        if self.active == Some(id) {
            self.active = self.layers.last().map(|r| r.id);
        }
    }

    fn record_mut(&mut self, id: LayerId) -> Option<&mut LayerRecord> {
        self.layers.iter_mut().find(|r| r.id == id)
    }

    pub fn record(&self, id: LayerId) -> &LayerRecord {
        self.layers
            .iter()
            .find(|r| r.id == id)
            .expect("layer exists")
    }

    pub fn raster(&self, id: LayerId) -> &RgbaImage {
        match &self.record(id).content {
            LayerContent::Raster(pixels) => pixels,
            LayerContent::Vector(_) => panic!("not a raster layer"),
        }
    }

    pub fn paint(&mut self, id: LayerId, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
        let record = self.record_mut(id).expect("layer exists");
        if let LayerContent::Raster(pixels) = &mut record.content {
            for py in y..(y + h).min(pixels.height()) {
                for px in x..(x + w).min(pixels.width()) {
                    pixels.put_pixel(px, py, color);
                }
            }
        }
    }

    pub fn set_vector(&mut self, id: LayerId, shapes: &[u8]) {
        let record = self.record_mut(id).expect("layer exists");
        record.content = LayerContent::Vector(VectorData::new(shapes.to_vec()));
    }

    pub fn set_effects(&mut self, id: LayerId, effects: &[u8]) {
        let record = self.record_mut(id).expect("layer exists");
        record.effects = EffectStackData::new(effects.to_vec());
    }

    pub fn set_offset(&mut self, id: LayerId, x: i32, y: i32) {
        let record = self.record_mut(id).expect("layer exists");
        record.offset_x = x;
        record.offset_y = y;
    }

    /// Replaces every raster buffer with a new one of the given size,
    /// keeping the overlapping top-left region.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        for record in &mut self.layers {
            if let LayerContent::Raster(old) = &record.content {
                let mut resized = RgbaImage::new(width, height);
                for y in 0..height.min(old.height()) {
                    for x in 0..width.min(old.width()) {
                        resized.put_pixel(x, y, *old.get_pixel(x, y));
                    }
                }
                record.content = LayerContent::Raster(resized);
            }
        }
    }
}

impl LayerAccess for FakeLayers {
    fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|r| r.id).collect()
    }

    fn active_layer(&self) -> Option<LayerId> {
        self.active
    }

    fn content_kind(&self, id: LayerId) -> Option<ContentKind> {
        self.layers
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.content.kind())
    }

    fn read_raster(&self, id: LayerId) -> Option<RgbaImage> {
        match &self.layers.iter().find(|r| r.id == id)?.content {
            LayerContent::Raster(pixels) => Some(pixels.clone()),
            LayerContent::Vector(_) => None,
        }
    }

    fn read_vector(&self, id: LayerId) -> Option<VectorData> {
        match &self.layers.iter().find(|r| r.id == id)?.content {
            LayerContent::Vector(data) => Some(data.clone()),
            LayerContent::Raster(_) => None,
        }
    }

    fn read_effects(&self, id: LayerId) -> Option<EffectStackData> {
        self.layers
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.effects.clone())
    }

    fn read_document(&self) -> Result<DocumentSnapshot> {
        if self.unreadable {
            bail!("layer could not be serialized");
        }
        Ok(DocumentSnapshot {
            width: self.width,
            height: self.height,
            active_layer: self.active,
            layers: self.layers.clone(),
        })
    }

    fn write_raster(&mut self, id: LayerId, pixels: &RgbaImage) -> Result<()> {
        let Some(record) = self.record_mut(id) else {
            bail!("no layer {id}");
        };
        record.content = LayerContent::Raster(pixels.clone());
        Ok(())
    }

    fn write_vector(&mut self, id: LayerId, data: &VectorData) -> Result<()> {
        let Some(record) = self.record_mut(id) else {
            bail!("no layer {id}");
        };
        record.content = LayerContent::Vector(data.clone());
        Ok(())
    }

    fn write_effects(&mut self, id: LayerId, data: &EffectStackData) -> Result<()> {
        let Some(record) = self.record_mut(id) else {
            bail!("no layer {id}");
        };
        record.effects = data.clone();
        Ok(())
    }

    fn write_document(&mut self, snapshot: &DocumentSnapshot) -> Result<()> {
        self.width = snapshot.width;
        self.height = snapshot.height;
        self.active = snapshot.active_layer;
        self.layers = snapshot.layers.clone();
        Ok(())
    }
}
