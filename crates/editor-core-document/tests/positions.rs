use editor_core_document::{
    BadLocation, Document, DocumentError, DocumentEvent, Position, PositionIndex, PositionUpdater,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn test_positions_follow_document_edits() {
    let mut document = Document::new("let value = compute(input);");
    document.add_position_category("identifiers").unwrap();
    let value = document.add_position("identifiers", Position::new(4, 5)).unwrap();
    let input = document
        .add_position("identifiers", Position::new(20, 5))
        .unwrap();

    // Typing at the end of `value` extends it.
    document.replace(9, 0, "s").unwrap();
    assert_eq!(document.position(value).unwrap(), Some(Position::new(4, 6)));
    assert_eq!(document.position(input).unwrap(), Some(Position::new(21, 5)));

    // Replacing exactly `values` keeps the position and resizes it.
    document.replace(4, 6, "total").unwrap();
    assert_eq!(document.position(value).unwrap(), Some(Position::new(4, 5)));
    assert_eq!(document.position(input).unwrap(), Some(Position::new(20, 5)));

    // Deleting `(input)` swallows `input` entirely, which removes its position.
    document.replace(19, 7, "").unwrap();
    assert_eq!(
        document.positions("identifiers").unwrap(),
        vec![Position::new(4, 5)]
    );
    assert!(document.position(input).unwrap().is_some_and(|p| p.deleted));
    assert_eq!(document.text().unwrap(), "let total = compute;");
}

#[test]
fn test_replacing_a_range_edge_keeps_the_position() {
    let mut document = Document::new("0123456789abcdef");
    document.add_position_category("folds").unwrap();
    let head = document.add_position("folds", Position::new(4, 2)).unwrap();
    let tail = document.add_position("folds", Position::new(8, 2)).unwrap();

    // Both positions share one end with the replaced range `[4, 10)`.
    document.replace(4, 6, "xyz").unwrap();
    assert_eq!(document.position(head).unwrap(), Some(Position::new(4, 3)));
    assert_eq!(document.position(tail).unwrap(), Some(Position::new(4, 3)));
}

#[test]
fn test_unknown_category_is_reported() {
    let mut document = Document::new("abc");
    assert!(matches!(
        document.add_position("missing", Position::new(0, 1)),
        Err(DocumentError::BadPositionCategory(name)) if name == "missing"
    ));
    assert!(document.positions("missing").is_err());
    assert!(document.remove_position_category("missing").is_err());
}

#[test]
fn test_position_range_is_validated() {
    let mut document = Document::new("abc");
    document.add_position_category("c").unwrap();
    assert!(matches!(
        document.add_position("c", Position::new(2, 2)),
        Err(DocumentError::BadLocation(BadLocation::Range { .. }))
    ));
    assert!(document.add_position("c", Position::new(3, 0)).is_ok());
}

#[test]
fn test_index_in_category_and_overlap() {
    let mut document = Document::new("0123456789");
    document.add_position_category("c").unwrap();
    for offset in [1, 4, 4, 8] {
        document.add_position("c", Position::new(offset, 1)).unwrap();
    }
    assert_eq!(document.index_in_category("c", 0).unwrap(), 0);
    assert_eq!(document.index_in_category("c", 4).unwrap(), 1);
    assert_eq!(document.index_in_category("c", 5).unwrap(), 3);
    assert_eq!(document.index_in_category("c", 10).unwrap(), 4);

    let hits: Vec<Position> = document
        .overlapping_positions("c", 3, 3)
        .unwrap()
        .into_iter()
        .map(|(_, position)| position)
        .collect();
    assert_eq!(hits, vec![Position::new(4, 1), Position::new(4, 1)]);
}

#[test]
fn test_queries_reject_locations_outside_the_text() {
    let mut document = Document::new("0123456789");
    document.add_position_category("c").unwrap();
    document.add_position("c", Position::new(2, 3)).unwrap();

    assert!(matches!(
        document.index_in_category("c", 11),
        Err(DocumentError::BadLocation(BadLocation::Offset { offset: 11, len: 10 }))
    ));
    assert!(matches!(
        document.overlapping_positions("c", 500, 5),
        Err(DocumentError::BadLocation(BadLocation::Range { .. }))
    ));
    assert!(matches!(
        document.overlapping_positions("c", 3, usize::MAX),
        Err(DocumentError::BadLocation(BadLocation::Range { .. }))
    ));
    assert!(document.overlapping_positions("c", 10, 0).unwrap().is_empty());
}

#[test]
fn test_categories_are_independent() {
    let mut document = Document::new("abcdef");
    document.add_position_category("a").unwrap();
    document.add_position_category("b").unwrap();
    let first = document.add_position("a", Position::new(1, 2)).unwrap();
    document.add_position("b", Position::new(1, 2)).unwrap();

    assert!(!document.remove_position("b", first).unwrap());
    document.remove_position_category("b").unwrap();
    assert_eq!(
        document.position_categories().unwrap(),
        vec!["a".to_string()]
    );
    assert!(!document.contains_position_category("b").unwrap());
    assert_eq!(document.positions("a").unwrap(), vec![Position::new(1, 2)]);
}

/// Keeps every position where it is, whatever happens to the text.
struct Pinned;

impl PositionUpdater for Pinned {
    fn update(&self, _event: &DocumentEvent, _positions: &mut [Position]) {}
}

#[test]
fn test_custom_update_policy() {
    let mut document = Document::new("abcdef");
    document
        .add_position_category_with_updater("pinned", Arc::new(Pinned))
        .unwrap();
    document.add_position_category("moving").unwrap();
    document.add_position("pinned", Position::new(3, 1)).unwrap();
    document.add_position("moving", Position::new(3, 1)).unwrap();

    document.replace(0, 0, "xyz").unwrap();
    assert_eq!(
        document.positions("pinned").unwrap(),
        vec![Position::new(3, 1)]
    );
    assert_eq!(
        document.positions("moving").unwrap(),
        vec![Position::new(6, 1)]
    );
}

#[test]
fn test_index_without_document() {
    let mut index = PositionIndex::new(10);
    index.add_category("c");
    let id = index.add("c", Position::new(2, 3)).unwrap();
    index.update(&DocumentEvent::new(0, 2, "abcd"));
    assert_eq!(index.position(id), Some(Position::new(4, 3)));
    assert_eq!(index.document_length(), 12);
    assert!(index.remove("c", id).unwrap());
    assert!(index.snapshot("c").unwrap().is_empty());
}
