// Integration tests for the history engine.
//
// These drive the HistoryManager against an in-memory layer stack through
// full capture / undo / redo / jump workflows.

mod common;

use common::{FakeLayers, BLACK, RED, WHITE};
use image::{Rgba, RgbaImage};
use rust_paint_mod_history::{
    DiffPayload, EffectStackData, EntryKind, HistoryConfig, HistoryError, HistoryManager,
    LayerAccess, LayerId,
};

fn stroke(
    history: &mut HistoryManager,
    doc: &mut FakeLayers,
    layer: LayerId,
    x: u32,
    color: Rgba<u8>,
) {
    history
        .begin_capture("Stroke", EntryKind::Brush, &[layer], doc)
        .unwrap();
    doc.paint(layer, x, 0, 1, 1, color);
    assert!(history.commit_capture(doc).is_some());
}

// ── Capture protocol ───────────────────────────────────────────────────

#[test]
fn test_brush_stroke_undo_restores_white_and_redo_restores_square() {
    let (mut doc, layer) = FakeLayers::with_raster(100, 100, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Brush Stroke", EntryKind::Brush, &[layer], &doc)
        .unwrap();
    doc.paint(layer, 0, 0, 10, 10, BLACK);
    let painted = doc.raster(layer).clone();
    history.commit_capture(&doc).unwrap();

    assert!(history.undo(&mut doc));
    assert_eq!(doc.raster(layer), &RgbaImage::from_pixel(100, 100, WHITE));

    assert!(history.redo(&mut doc));
    assert_eq!(doc.raster(layer), &painted);
    assert_eq!(*doc.raster(layer).get_pixel(9, 9), BLACK);
    assert_eq!(*doc.raster(layer).get_pixel(10, 10), WHITE);
}

#[test]
fn test_degenerate_capture_is_elided() {
    let (doc, layer) = FakeLayers::with_raster(8, 8, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Fill", EntryKind::Fill, &[layer], &doc)
        .unwrap();
    assert!(history.commit_capture(&doc).is_none());
    assert_eq!(history.len(), 0);
    assert!(!history.is_capturing());
}

#[test]
fn test_unchanged_layers_are_not_retained() {
    let (mut doc, a) = FakeLayers::with_raster(4, 4, WHITE);
    let b = doc.add_raster("B", WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Paint A", EntryKind::Brush, &[a, b], &doc)
        .unwrap();
    doc.paint(a, 0, 0, 1, 1, RED);
    history.commit_capture(&doc).unwrap();

    let entry = history.undo_entry().unwrap();
    assert_eq!(entry.affected_layer_ids(), &[a, b]);
    assert_eq!(entry.diffs().len(), 1);
    assert_eq!(entry.diffs()[0].layer_id(), a);
}

#[test]
fn test_abort_discards_capture() {
    let (mut doc, layer) = FakeLayers::with_raster(8, 8, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Delete Selection", EntryKind::Selection, &[layer], &doc)
        .unwrap();
    history.abort_capture();
    assert!(!history.is_capturing());

    // Nothing to commit once aborted, even if the layer changes afterwards.
    doc.paint(layer, 0, 0, 2, 2, BLACK);
    assert!(history.commit_capture(&doc).is_none());
    assert!(history.is_empty());
}

#[test]
fn test_commit_and_abort_while_idle_are_noops() {
    let (doc, _) = FakeLayers::with_raster(2, 2, WHITE);
    let mut history = HistoryManager::unlimited();
    history.abort_capture();
    assert!(history.commit_capture(&doc).is_none());
    assert!(history.is_empty());
}

#[test]
fn test_nested_begin_is_rejected_and_keeps_open_capture() {
    let (mut doc, layer) = FakeLayers::with_raster(4, 4, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Outer", EntryKind::Brush, &[layer], &doc)
        .unwrap();
    let err = history
        .begin_capture("Inner", EntryKind::Fill, &[layer], &doc)
        .unwrap_err();
    assert_eq!(
        err,
        HistoryError::CaptureInProgress {
            open: "Outer".to_string(),
            requested: "Inner".to_string(),
        }
    );

    doc.paint(layer, 0, 0, 1, 1, BLACK);
    history.commit_capture(&doc).unwrap();
    assert_eq!(history.entries()[0].label, "Outer");
}

#[test]
fn test_unknown_layer_is_skipped() {
    let (mut doc, layer) = FakeLayers::with_raster(4, 4, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Stroke", EntryKind::Brush, &[LayerId::new(), layer], &doc)
        .unwrap();
    doc.paint(layer, 1, 1, 1, 1, BLACK);
    history.commit_capture(&doc).unwrap();
    assert_eq!(history.undo_entry().unwrap().diffs().len(), 1);
}

#[test]
fn test_vector_layer_diff_round_trip() {
    let (mut doc, _) = FakeLayers::with_raster(4, 4, WHITE);
    let text = doc.add_vector("Title", b"hello");
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Edit Text", EntryKind::Layer, &[text], &doc)
        .unwrap();
    doc.set_vector(text, b"hello world");
    history.commit_capture(&doc).unwrap();

    let diff = &history.undo_entry().unwrap().diffs()[0];
    assert!(matches!(diff.payload(), DiffPayload::Vector { .. }));

    history.undo(&mut doc);
    assert_eq!(doc.read_vector(text).unwrap().as_bytes(), b"hello");
    history.redo(&mut doc);
    assert_eq!(doc.read_vector(text).unwrap().as_bytes(), b"hello world");
}

#[test]
fn test_save_state_captures_active_layer() {
    let (mut doc, _background) = FakeLayers::with_raster(4, 4, WHITE);
    let top = doc.add_raster("Top", WHITE);
    let mut history = HistoryManager::unlimited();

    history.save_state("Paste", EntryKind::Other, &doc).unwrap();
    doc.paint(top, 0, 0, 4, 4, RED);
    history.finish_state(&doc).unwrap();

    assert_eq!(history.undo_entry().unwrap().affected_layer_ids(), &[top]);
    history.undo(&mut doc);
    assert_eq!(*doc.raster(top).get_pixel(3, 3), WHITE);
}

// ── Effects ────────────────────────────────────────────────────────────

#[test]
fn test_effects_capture_reads_after_at_commit() {
    let (mut doc, layer) = FakeLayers::with_raster(4, 4, WHITE);
    doc.set_effects(layer, b"shadow:2");
    let mut history = HistoryManager::unlimited();

    let before = doc.read_effects(layer).unwrap();
    assert!(history.capture_effects_before("Drop Shadow", layer, before));
    doc.set_effects(layer, b"shadow:8");
    history.commit_capture(&doc).unwrap();

    let entry = history.undo_entry().unwrap();
    assert_eq!(entry.kind(), EntryKind::Effects);
    assert!(matches!(
        entry.diffs()[0].payload(),
        DiffPayload::Effects { .. }
    ));

    let pixels = doc.raster(layer).clone();
    history.undo(&mut doc);
    assert_eq!(doc.read_effects(layer).unwrap().as_bytes(), b"shadow:2");
    assert_eq!(doc.raster(layer), &pixels);
    history.redo(&mut doc);
    assert_eq!(doc.read_effects(layer).unwrap().as_bytes(), b"shadow:8");
}

#[test]
fn test_unchanged_effects_are_elided() {
    let (doc, layer) = FakeLayers::with_raster(4, 4, WHITE);
    let mut history = HistoryManager::unlimited();

    history.capture_effects_before("Stroke", layer, EffectStackData::default());
    assert!(history.commit_capture(&doc).is_none());
    assert!(history.is_empty());
}

#[test]
fn test_effects_join_open_capture() {
    let (mut doc, layer) = FakeLayers::with_raster(4, 4, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Stroke And Glow", EntryKind::Brush, &[layer], &doc)
        .unwrap();
    let before = doc.read_effects(layer).unwrap();
    assert!(history.capture_effects_before("ignored", layer, before.clone()));
    assert!(!history.capture_effects_before("ignored", layer, before));
    doc.paint(layer, 0, 0, 1, 1, BLACK);
    doc.set_effects(layer, b"glow");
    history.commit_capture(&doc).unwrap();

    let entry = history.undo_entry().unwrap();
    assert_eq!(entry.label(), "Stroke And Glow");
    assert_eq!(entry.diffs().len(), 2);

    history.undo(&mut doc);
    assert!(doc.read_effects(layer).unwrap().as_bytes().is_empty());
    assert_eq!(*doc.raster(layer).get_pixel(0, 0), WHITE);
}

// ── Stack semantics ────────────────────────────────────────────────────

#[test]
fn test_undo_redo_round_trip_is_byte_identical() {
    let (mut doc, a) = FakeLayers::with_raster(16, 16, WHITE);
    let text = doc.add_vector("Text", b"v0");
    let mut history = HistoryManager::unlimited();

    stroke(&mut history, &mut doc, a, 0, BLACK);

    history
        .begin_capture("Edit Text", EntryKind::Layer, &[text], &doc)
        .unwrap();
    doc.set_vector(text, b"v1");
    history.commit_capture(&doc).unwrap();

    history.capture_effects_before("Stroke Effect", a, doc.read_effects(a).unwrap());
    doc.set_effects(a, b"stroke");
    history.commit_capture(&doc).unwrap();

    history
        .begin_capture("Add Layer", EntryKind::Layer, &[], &doc)
        .unwrap();
    history.begin_structural_change(&doc).unwrap();
    doc.add_raster("New", RED);
    history.commit_capture(&doc).unwrap();

    stroke(&mut history, &mut doc, a, 5, RED);

    let final_state = doc.clone();
    let n = history.len();
    assert_eq!(n, 5);

    for _ in 0..n {
        assert!(history.undo(&mut doc));
    }
    assert!(!history.undo(&mut doc));
    assert_eq!(doc.layers.len(), 2);

    for _ in 0..n {
        assert!(history.redo(&mut doc));
    }
    assert!(!history.redo(&mut doc));
    assert_eq!(doc, final_state);
}

#[test]
fn test_redo_tail_truncated_by_new_commit() {
    let (mut doc, layer) = FakeLayers::with_raster(8, 1, WHITE);
    let mut history = HistoryManager::unlimited();

    stroke(&mut history, &mut doc, layer, 0, BLACK); // A
    stroke(&mut history, &mut doc, layer, 1, BLACK); // B
    stroke(&mut history, &mut doc, layer, 2, BLACK); // C
    let ids: Vec<_> = history.entries().iter().map(|e| e.id).collect();

    history.undo(&mut doc);
    history.undo(&mut doc);
    assert_eq!(history.current_index(), 1);

    stroke(&mut history, &mut doc, layer, 7, RED); // D
    assert!(!history.can_redo());
    let remaining: Vec<_> = history.entries().iter().map(|e| e.id).collect();
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0], ids[0]);
    assert!(!remaining.contains(&ids[1]));
    assert!(!remaining.contains(&ids[2]));
}

#[test]
fn test_undo_redo_at_bounds_return_false() {
    let (mut doc, _) = FakeLayers::with_raster(2, 2, WHITE);
    let mut history = HistoryManager::unlimited();
    assert!(!history.undo(&mut doc));
    assert!(!history.redo(&mut doc));
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn test_navigation_refused_while_capturing() {
    let (mut doc, layer) = FakeLayers::with_raster(4, 1, WHITE);
    let mut history = HistoryManager::unlimited();
    stroke(&mut history, &mut doc, layer, 0, BLACK);

    history
        .begin_capture("Open", EntryKind::Brush, &[layer], &doc)
        .unwrap();
    assert!(!history.undo(&mut doc));
    assert_eq!(history.jump_to_history(0, &mut doc), 0);
    assert_eq!(history.current_index(), 1);
    history.abort_capture();
    assert!(history.undo(&mut doc));
}

#[test]
fn test_clear_resets_history_and_open_capture() {
    let (mut doc, layer) = FakeLayers::with_raster(4, 1, WHITE);
    let mut history = HistoryManager::unlimited();
    stroke(&mut history, &mut doc, layer, 0, BLACK);
    history
        .begin_capture("Open", EntryKind::Brush, &[layer], &doc)
        .unwrap();

    history.clear();
    assert!(history.is_empty());
    assert!(!history.is_capturing());
    assert_eq!(history.current_index(), 0);
    assert_eq!(history.memory_usage().used_bytes, 0);
}

#[test]
fn test_vanished_layer_does_not_block_other_diffs() {
    let (mut doc, a) = FakeLayers::with_raster(4, 4, WHITE);
    let b = doc.add_raster("B", WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Both", EntryKind::Brush, &[a, b], &doc)
        .unwrap();
    doc.paint(a, 0, 0, 1, 1, BLACK);
    doc.paint(b, 0, 0, 1, 1, BLACK);
    history.commit_capture(&doc).unwrap();

    // Removed outside the capture protocol.
    doc.remove(b);
    assert!(history.undo(&mut doc));
    assert_eq!(history.current_index(), 0);
    assert_eq!(*doc.raster(a).get_pixel(0, 0), WHITE);
}

// ── Jump ───────────────────────────────────────────────────────────────

fn five_strokes() -> (FakeLayers, LayerId, HistoryManager) {
    let (mut doc, layer) = FakeLayers::with_raster(5, 1, WHITE);
    let mut history = HistoryManager::unlimited();
    for x in 0..5 {
        stroke(&mut history, &mut doc, layer, x, BLACK);
    }
    (doc, layer, history)
}

#[test]
fn test_jump_back_equals_repeated_undo() {
    let (mut doc_a, _, mut hist_a) = five_strokes();
    let (mut doc_b, _, mut hist_b) = five_strokes();
    hist_a.jump_to_history(3, &mut doc_a);
    hist_b.jump_to_history(3, &mut doc_b);
    // Fresh ids differ between documents; compare pixel content only.
    let pixels = |doc: &FakeLayers| doc.raster(doc.layers[0].id).clone();

    assert_eq!(hist_a.jump_to_history(1, &mut doc_a), 2);
    hist_b.undo(&mut doc_b);
    hist_b.undo(&mut doc_b);

    assert_eq!(hist_a.current_index(), 1);
    assert_eq!(hist_b.current_index(), 1);
    assert_eq!(pixels(&doc_a), pixels(&doc_b));
}

#[test]
fn test_jump_forward_equals_repeated_redo() {
    let (mut doc_a, layer_a, mut hist_a) = five_strokes();
    let (mut doc_b, layer_b, mut hist_b) = five_strokes();
    hist_a.jump_to_history(1, &mut doc_a);
    hist_b.jump_to_history(1, &mut doc_b);

    assert_eq!(hist_a.jump_to_history(5, &mut doc_a), 4);
    for _ in 0..4 {
        hist_b.redo(&mut doc_b);
    }

    assert_eq!(hist_a.current_index(), 5);
    assert_eq!(doc_a.raster(layer_a), doc_b.raster(layer_b));
    assert_eq!(doc_a.raster(layer_a), &RgbaImage::from_pixel(5, 1, BLACK));
}

#[test]
fn test_jump_clamps_and_same_index_is_noop() {
    let (mut doc, layer, mut history) = five_strokes();
    assert_eq!(history.jump_to_history(5, &mut doc), 0);
    assert_eq!(history.jump_to_history(99, &mut doc), 0);
    assert_eq!(history.jump_to_history(0, &mut doc), 5);
    assert_eq!(doc.raster(layer), &RgbaImage::from_pixel(5, 1, WHITE));
    assert_eq!(history.jump_to_history(usize::MAX, &mut doc), 5);
    assert_eq!(history.current_index(), 5);
}

// ── Memory budget ──────────────────────────────────────────────────────

#[test]
fn test_eviction_keeps_order_and_cursor() {
    // Measure the cost of one stroke entry.
    let cost = {
        let (mut doc, layer) = FakeLayers::with_raster(10, 10, WHITE);
        let mut solo = HistoryManager::unlimited();
        stroke(&mut solo, &mut doc, layer, 0, BLACK);
        solo.entries()[0].byte_cost
    };

    let (mut doc, layer) = FakeLayers::with_raster(10, 10, WHITE);
    let mut history = HistoryManager::new(HistoryConfig::new(cost * 2));
    stroke(&mut history, &mut doc, layer, 0, BLACK);
    stroke(&mut history, &mut doc, layer, 1, BLACK);
    let second = history.entries()[1].id;
    assert_eq!(history.len(), 2);

    stroke(&mut history, &mut doc, layer, 2, BLACK);
    let third = history.undo_entry().unwrap().id();

    let entries = history.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, second);
    assert_eq!(entries[1].id, third);
    assert!(entries[1].is_current);
    assert_eq!(history.current_index(), 2);
    assert!(!history.can_redo());
    assert_eq!(history.memory_usage().used_bytes, cost * 2);
}

#[test]
fn test_evicted_steps_are_unavailable() {
    let (mut doc, layer) = FakeLayers::with_raster(10, 10, WHITE);
    let mut history = HistoryManager::unlimited();
    for x in 0..4 {
        stroke(&mut history, &mut doc, layer, x, BLACK);
    }
    let cost = history.entries()[0].byte_cost;
    assert_eq!(history.set_max_bytes(cost), 3);

    assert!(history.undo(&mut doc));
    assert!(!history.undo(&mut doc));
    // The first three strokes are permanently applied.
    assert_eq!(*doc.raster(layer).get_pixel(2, 0), BLACK);
    assert_eq!(*doc.raster(layer).get_pixel(3, 0), WHITE);
}

#[test]
fn test_used_bytes_matches_entry_costs() {
    let (mut doc, layer, mut history) = five_strokes();
    history.jump_to_history(2, &mut doc);
    stroke(&mut history, &mut doc, layer, 4, RED);

    let sum: usize = history.entries().iter().map(|e| e.byte_cost).sum();
    assert_eq!(history.memory_usage().used_bytes, sum);
}

// ── Structural changes ─────────────────────────────────────────────────

#[test]
fn test_incremental_undo_leaves_other_layers_untouched() {
    let (mut doc, a) = FakeLayers::with_raster(8, 8, WHITE);
    let b = doc.add_raster("B", RED);
    let b_ptr = doc.raster(b).as_raw().as_ptr();
    let b_pixels = doc.raster(b).clone();
    let mut history = HistoryManager::unlimited();

    stroke(&mut history, &mut doc, a, 0, BLACK);
    history.undo(&mut doc);

    assert_eq!(doc.raster(b).as_raw().as_ptr(), b_ptr);
    assert_eq!(doc.raster(b), &b_pixels);
}

#[test]
fn test_structural_resize_restores_every_layer() {
    let (mut doc, a) = FakeLayers::with_raster(4, 4, WHITE);
    let b = doc.add_raster("B", RED);
    doc.set_offset(b, 3, 5);
    let text = doc.add_vector("Text", b"label");
    let before = doc.clone();
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Resize Canvas", EntryKind::Document, &[a], &doc)
        .unwrap();
    history.begin_structural_change(&doc).unwrap();
    for id in doc.layer_ids() {
        history.store_resized_layer(id, &doc).unwrap();
    }
    doc.resize(8, 2);
    doc.set_offset(b, 0, 0);
    history.commit_capture(&doc).unwrap();
    let after = doc.clone();

    let entry = history.undo_entry().unwrap();
    assert!(entry.is_structural());
    assert!(entry.affected_layer_ids().is_empty());
    let change = entry.structural_change().unwrap();
    assert_eq!(change.resized_layer_ids(), &before.layer_ids()[..]);
    assert!(change.resized_layers().eq(before.layers.iter()));

    history.undo(&mut doc);
    assert_eq!(doc, before);
    assert_eq!((doc.width, doc.height), (4, 4));
    assert_eq!(doc.raster(b).dimensions(), (4, 4));
    assert_eq!((doc.record(b).offset_x, doc.record(b).offset_y), (3, 5));
    assert_eq!(doc.read_vector(text).unwrap().as_bytes(), b"label");

    history.redo(&mut doc);
    assert_eq!(doc, after);
}

#[test]
fn test_structural_layer_removal_round_trip() {
    let (mut doc, _) = FakeLayers::with_raster(4, 4, WHITE);
    let b = doc.add_raster("B", RED);
    let before = doc.clone();
    let mut history = HistoryManager::unlimited();

    {
        let mut capture = history
            .capture("Delete Layer", EntryKind::Layer, &[], &doc)
            .unwrap();
        capture.structural(&doc).unwrap();
        doc.remove(b);
        capture.commit(&doc).unwrap();
    }
    assert_eq!(doc.layers.len(), 1);

    history.undo(&mut doc);
    assert_eq!(doc, before);
    assert_eq!(doc.active, Some(b));
}

#[test]
fn test_store_resized_layer_promotes_to_structural() {
    let (mut doc, a) = FakeLayers::with_raster(2, 2, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Resize Layer", EntryKind::Transform, &[a], &doc)
        .unwrap();
    history.store_resized_layer(a, &doc).unwrap();
    doc.resize(3, 3);
    history.commit_capture(&doc).unwrap();

    assert!(history.undo_entry().unwrap().is_structural());
    history.undo(&mut doc);
    assert_eq!(doc.raster(a).dimensions(), (2, 2));
}

#[test]
fn test_promotion_keeps_edits_made_before_the_resize() {
    let (mut doc, a) = FakeLayers::with_raster(4, 4, WHITE);
    let b = doc.add_raster("B", WHITE);
    doc.set_effects(b, b"plain");
    let before = doc.clone();
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Transform", EntryKind::Transform, &[b], &doc)
        .unwrap();
    history.capture_effects_before("", b, doc.read_effects(b).unwrap());
    doc.paint(b, 0, 0, 4, 4, BLACK);
    doc.set_effects(b, b"glow");
    history.store_resized_layer(a, &doc).unwrap();
    doc.resize(2, 2);
    history.commit_capture(&doc).unwrap();

    let change = history.undo_entry().unwrap().structural_change().unwrap();
    assert_eq!(change.before(), &before.read_document().unwrap());

    history.undo(&mut doc);
    assert_eq!(doc, before);
    assert_eq!(*doc.raster(b).get_pixel(0, 0), WHITE);
}

#[test]
fn test_structural_undo_ignores_edits_made_before_store_resized_layer() {
    let (mut doc, a) = FakeLayers::with_raster(4, 4, WHITE);
    let before = doc.clone();
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Resize Canvas", EntryKind::Document, &[], &doc)
        .unwrap();
    history.begin_structural_change(&doc).unwrap();
    doc.paint(a, 0, 0, 1, 1, RED);
    history.store_resized_layer(a, &doc).unwrap();
    doc.resize(6, 6);
    history.commit_capture(&doc).unwrap();

    history.undo(&mut doc);
    assert_eq!(doc, before);
    assert_eq!(doc.raster(a), &RgbaImage::from_pixel(4, 4, WHITE));
}

#[test]
fn test_store_resized_layer_skips_layers_unknown_to_snapshot() {
    let (mut doc, _) = FakeLayers::with_raster(2, 2, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Add and Resize", EntryKind::Document, &[], &doc)
        .unwrap();
    history.begin_structural_change(&doc).unwrap();
    let added = doc.add_raster("Added", RED);
    history.store_resized_layer(added, &doc).unwrap();
    doc.resize(3, 3);
    history.commit_capture(&doc).unwrap();

    let entry = history.undo_entry().unwrap();
    assert!(entry.structural_change().unwrap().resized_layer_ids().is_empty());
    history.undo(&mut doc);
    assert_eq!(doc.layers.len(), 1);
}

#[test]
fn test_unreadable_document_discards_structural_capture() {
    let (mut doc, a) = FakeLayers::with_raster(2, 2, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Delete Layer", EntryKind::Layer, &[a], &doc)
        .unwrap();
    doc.unreadable = true;
    let err = history.begin_structural_change(&doc).unwrap_err();
    assert!(matches!(err, HistoryError::SnapshotFailed { ref label, .. } if label == "Delete Layer"));
    assert!(!history.is_capturing());

    {
        let mut capture = history
            .capture("Resize Canvas", EntryKind::Document, &[], &doc)
            .unwrap();
        assert!(capture.store_resized_layer(a, &doc).is_err());
    }
    assert!(!history.is_capturing());
    assert!(history.is_empty());
}

#[test]
fn test_unreadable_document_at_commit_records_nothing() {
    let (mut doc, _) = FakeLayers::with_raster(2, 2, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Add Layer", EntryKind::Layer, &[], &doc)
        .unwrap();
    history.begin_structural_change(&doc).unwrap();
    doc.add_raster("New", RED);
    doc.unreadable = true;
    assert!(history.commit_capture(&doc).is_none());
    assert!(!history.is_capturing());
    assert!(history.is_empty());
}

#[test]
fn test_unchanged_structural_capture_is_elided() {
    let (doc, _) = FakeLayers::with_raster(2, 2, WHITE);
    let mut history = HistoryManager::unlimited();

    history
        .begin_capture("Resize Canvas", EntryKind::Document, &[], &doc)
        .unwrap();
    history.begin_structural_change(&doc).unwrap();
    assert!(history.commit_capture(&doc).is_none());
    assert!(history.is_empty());
}

// ── Guard ──────────────────────────────────────────────────────────────

#[test]
fn test_guard_aborts_on_drop() {
    let (mut doc, layer) = FakeLayers::with_raster(4, 4, WHITE);
    let mut history = HistoryManager::unlimited();

    {
        let _capture = history
            .capture("Forgotten", EntryKind::Brush, &[layer], &doc)
            .unwrap();
    }
    assert!(!history.is_capturing());

    // A new capture can start straight away.
    let capture = history
        .capture("Stroke", EntryKind::Brush, &[layer], &doc)
        .unwrap();
    doc.paint(layer, 0, 0, 1, 1, BLACK);
    assert!(capture.commit(&doc).is_some());
    assert_eq!(history.len(), 1);
}

#[test]
fn test_guard_explicit_abort() {
    let (doc, layer) = FakeLayers::with_raster(4, 4, WHITE);
    let mut history = HistoryManager::unlimited();

    let capture = history
        .capture("Zero Area", EntryKind::Selection, &[layer], &doc)
        .unwrap();
    capture.abort();
    assert!(!history.is_capturing());
    assert!(history.is_empty());
}

// ── Query facade ───────────────────────────────────────────────────────

#[test]
fn test_entry_flags_follow_cursor() {
    let (mut doc, _, mut history) = five_strokes();
    history.jump_to_history(3, &mut doc);

    let entries = history.entries();
    let current: Vec<usize> = entries
        .iter()
        .filter(|e| e.is_current)
        .map(|e| e.index)
        .collect();
    let future: Vec<usize> = entries
        .iter()
        .filter(|e| e.is_future)
        .map(|e| e.index)
        .collect();
    assert_eq!(current, vec![2]);
    assert_eq!(future, vec![3, 4]);

    assert_eq!(history.undo_entry().unwrap().id(), entries[2].id);
    assert_eq!(history.redo_entry().unwrap().id(), entries[3].id);
}

#[test]
fn test_no_current_entry_at_bottom() {
    let (mut doc, _, mut history) = five_strokes();
    history.jump_to_history(0, &mut doc);
    assert!(history.entries().iter().all(|e| !e.is_current && e.is_future));
    assert!(history.undo_entry().is_none());
    assert_eq!(history.redo_entry().unwrap().label(), "Stroke");
}

#[test]
fn test_memory_usage_reports_ceiling() {
    let (mut doc, layer) = FakeLayers::with_raster(4, 4, WHITE);
    let mut history = HistoryManager::new(HistoryConfig::new(1 << 20));
    stroke(&mut history, &mut doc, layer, 0, BLACK);

    let usage = history.memory_usage();
    assert_eq!(usage.max_bytes, 1 << 20);
    assert!(usage.used_bytes > 0);
    assert!(usage.percentage > 0.0 && usage.percentage <= 100.0);
}
