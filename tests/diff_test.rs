//! End-to-end comparison tests on in-memory documents.

use diffpdf::canvas::{RecordedPage, RecordingCanvas};
use diffpdf::{
    align, compare, Asset, Color, DiffOptions, EditOp, LayoutMode, MemoryDocument, MemoryPage,
    MemoryReader, DocumentReader, OpTag, PageStatus, Rect, Revision,
};

fn page(text: &str) -> MemoryPage {
    MemoryPage::letter().with_words(text, 72.0, 72.0)
}

fn document(pages: &[&str]) -> MemoryDocument {
    pages
        .iter()
        .fold(MemoryDocument::new(), |doc, text| doc.with_page(page(text)))
}

fn run(old: &MemoryDocument, new: &MemoryDocument, layout: LayoutMode) -> (Vec<RecordedPage>, diffpdf::DiffReport) {
    let options = DiffOptions::new().with_layout(layout);
    let output = compare(old, new, RecordingCanvas::new(), &options).unwrap();
    (RecordingCanvas::parse(&output.document).unwrap(), output.report)
}

#[test]
fn test_quick_slow_fox() {
    let old = document(&["The quick fox"]);
    let new = document(&["The slow fox"]);

    let script = align(&["The", "quick", "fox"], &["The", "slow", "fox"]);
    assert_eq!(
        script.ops(),
        &[
            EditOp::equal(0, 1, 0, 1),
            EditOp::replace(1, 2, 1, 2),
            EditOp::equal(2, 3, 2, 3),
        ]
    );

    let (pages, report) = run(&old, &new, LayoutMode::SideBySide);
    let quick = old.pages[0].tokens[1].bbox;
    let slow = new.pages[0].tokens[1].bbox;

    assert_eq!(pages[0].rects_of(Color::RED), vec![quick]);
    assert_eq!(pages[0].rects_of(Color::GREEN), vec![slow.shifted_x(612.0)]);
    assert_eq!(report.pages[0].replaced_tokens, 1);
}

#[test]
fn test_identical_documents() {
    let doc = document(&["Nothing changed here", "nor here"]);
    let (pages, report) = run(&doc, &doc.clone(), LayoutMode::SideBySide);

    assert_eq!(pages.len(), 2);
    for page in &pages {
        assert!(page.rects_of(Color::RED).is_empty());
        assert!(page.rects_of(Color::GREEN).is_empty());
        assert!(page.rects_of(Color::BLUE).is_empty());
        assert_eq!(page.line_count(), 1);
    }
    assert!(report.is_identical());

    let script = align(&["a", "b", "c"], &["a", "b", "c"]);
    assert_eq!(script.ops(), &[EditOp::equal(0, 3, 0, 3)]);
}

#[test]
fn test_three_vs_five_pages() {
    let old = document(&["one", "two", "three"]);
    let new = document(&["one", "two", "three", "four", "five"]);
    let (pages, report) = run(&old, &new, LayoutMode::SideBySide);

    assert_eq!(pages.len(), 5);
    for added in &pages[3..] {
        assert_eq!(added.rects_of(Color::BLUE), vec![Rect::new(612.0, 0.0, 1224.0, 792.0)]);
        assert!(added.rects_of(Color::GREEN).is_empty());
        let placements = added.placements();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].0, Revision::New);
    }
    assert_eq!(report.pages[3].status, PageStatus::Added);
    assert_eq!(report.totals.added_pages, 2);
}

#[test]
fn test_removed_pages() {
    let old = document(&["one", "two"]);
    let new = document(&["one"]);

    let (side, report) = run(&old, &new, LayoutMode::SideBySide);
    assert_eq!(side.len(), 2);
    assert_eq!(side[1].placements().len(), 1);
    assert_eq!(side[1].placements()[0].0, Revision::Old);
    assert_eq!(report.pages[1].status, PageStatus::Removed);

    let (single, _) = run(&old, &new, LayoutMode::Single);
    assert!(single[1].ops.is_empty());
    assert_eq!(single[1].width, 612.0);
}

#[test]
fn test_single_mode_width_and_separator() {
    let old = document(&["alpha beta"]);
    let new = document(&["alpha gamma"]);

    let (side, _) = run(&old, &new, LayoutMode::SideBySide);
    let (single, _) = run(&old, &new, LayoutMode::Single);

    assert_eq!(single[0].width * 2.0, side[0].width);
    assert_eq!(single[0].height, side[0].height);
    assert_eq!(side[0].line_count(), 1);
    assert_eq!(single[0].line_count(), 0);
    assert!(single[0].rects_of(Color::RED).is_empty());
    assert_eq!(single[0].rects_of(Color::GREEN).len(), 1);
}

#[test]
fn test_single_mode_asset_asymmetry() {
    let logo = Rect::new(400.0, 50.0, 500.0, 100.0);
    let chart = Rect::new(100.0, 300.0, 300.0, 450.0);
    let old = MemoryDocument::new().with_page(page("Report").with_asset(Asset::new("12", logo)));
    let new = MemoryDocument::new().with_page(page("Report").with_asset(Asset::new("40", chart)));

    let (single, report) = run(&old, &new, LayoutMode::Single);
    assert_eq!(single[0].rects_of(Color::RED), Vec::<Rect>::new());
    assert_eq!(single[0].rects_of(Color::GREEN), vec![chart]);
    assert_eq!(report.totals.removed_assets, 1);
    assert_eq!(report.totals.added_assets, 1);

    let (side, _) = run(&old, &new, LayoutMode::SideBySide);
    assert_eq!(side[0].rects_of(Color::RED), vec![logo]);
    assert_eq!(side[0].rects_of(Color::GREEN), vec![chart.shifted_x(612.0)]);
}

#[test]
fn test_swapping_revisions_swaps_operations() {
    let a = ["keep", "drop", "this", "x"];
    let b = ["keep", "this", "y", "extra"];
    let forward = align(&a, &b);
    let backward = align(&b, &a);

    assert_eq!(forward.len(), backward.len());
    for (f, r) in forward.iter().zip(backward.iter()) {
        let expected = match f.tag {
            OpTag::Insert => OpTag::Delete,
            OpTag::Delete => OpTag::Insert,
            other => other,
        };
        assert_eq!(r.tag, expected);
        assert_eq!((r.i1, r.i2, r.j1, r.j2), (f.j1, f.j2, f.i1, f.i2));
    }
}

#[test]
fn test_unreadable_page_degrades() {
    let old = MemoryDocument::new().with_page(page("hello world").unreadable());
    let new = document(&["hello world"]);
    let (pages, report) = run(&old, &new, LayoutMode::SideBySide);

    // the old side has no tokens, so every new token is an insertion
    assert_eq!(pages[0].rects_of(Color::GREEN).len(), 2);
    assert!(report.pages[0].degraded);
    assert_eq!(report.totals.degraded_pages, 1);
}

#[test]
fn test_documents_from_json() {
    let json = serde_json::to_vec(&document(&["from json"])).unwrap();
    let loaded = MemoryReader.load(&json).unwrap();
    let (pages, report) = run(&loaded, &document(&["from json"]), LayoutMode::Single);
    assert_eq!(pages.len(), 1);
    assert!(report.is_identical());
}
