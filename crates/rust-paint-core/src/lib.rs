//! Document model for rust-paint.
//!
//! A [`Document`](document::Document) owns a [`LayerStack`](layer_stack::LayerStack)
//! of raster and vector layers plus the undo/redo history that records every
//! edit made through it.

pub mod document;
pub mod effects;
pub mod history;
pub mod layer;
pub mod layer_stack;
pub mod shape;
