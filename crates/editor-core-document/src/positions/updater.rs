//! Update policies applied to a category when the text changes.

use super::Position;
use crate::event::DocumentEvent;

/// Adjusts the positions of one category for a text change.
///
/// `positions` is the category in offset order. Setting `deleted` on an entry
/// removes it from the category.
pub trait PositionUpdater: Send + Sync {
    /// Apply `event` to `positions`.
    fn update(&self, event: &DocumentEvent, positions: &mut [Position]);
}

/// Default policy.
///
/// For a change replacing `[o, o + n)` with `l` characters:
/// - positions ending before the change are left alone (for a pure insertion, a
///   position ending exactly at `o` absorbs the insertion instead);
/// - positions starting at or after `o + n` shift by `l - n`;
/// - positions containing the replaced range (an exact match included) grow or
///   shrink by `l - n`;
/// - positions strictly inside the replaced range are deleted;
/// - a position sharing only one end with the replaced range, or overlapping part
///   of it, is cut at the range and absorbs the inserted text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPositionUpdater;

impl PositionUpdater for DefaultPositionUpdater {
    fn update(&self, event: &DocumentEvent, positions: &mut [Position]) {
        let offset = event.offset;
        let end = event.end();
        let inserted = event.text_length();

        for position in positions.iter_mut() {
            let start = position.offset;
            let stop = position.end();

            if event.length == 0 {
                if stop < offset {
                    continue;
                }
                if start > offset {
                    position.offset += inserted;
                } else {
                    position.length += inserted;
                }
                continue;
            }

            if stop <= offset {
                // before the change
            } else if start >= end {
                position.offset = start - event.length + inserted;
            } else if start <= offset && stop >= end {
                position.length = stop - event.length + inserted - start;
            } else if start > offset && stop < end {
                position.deleted = true;
            } else if start <= offset {
                position.length = offset + inserted - start;
            } else {
                position.offset = offset;
                position.length = stop - end + inserted;
            }
        }
    }
}

/// Policy for projection segments.
///
/// Segments are never deleted: a segment swallowed by a deletion collapses to an
/// empty range at the change offset. Inserted text is absorbed by exactly one
/// segment touching the change, preferring the one that starts before it (the
/// predecessor when two segments meet at the change offset); every other segment at
/// or after the change offset is shifted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentUpdater;

impl PositionUpdater for SegmentUpdater {
    fn update(&self, event: &DocumentEvent, positions: &mut [Position]) {
        let offset = event.offset;
        let length = event.length;
        let end = event.end();
        let inserted = event.text_length();

        let mut touched = Vec::new();
        let mut before = vec![false; positions.len()];
        for (index, position) in positions.iter_mut().enumerate() {
            let start = position.offset;
            let stop = position.end();
            let touches = if length == 0 {
                start <= offset && offset <= stop
            } else {
                start < end && stop > offset
            };
            if touches {
                touched.push(index);
            }

            if length == 0 {
                before[index] = stop < offset;
            } else if stop <= offset {
                before[index] = true;
            } else if start >= end {
                position.offset = start - length;
            } else if start >= offset && stop <= end {
                position.offset = offset;
                position.length = 0;
            } else if start <= offset && stop >= end {
                position.length -= length;
            } else if start < offset {
                position.length = offset - start;
            } else {
                position.offset = offset;
                position.length = stop - end;
            }
        }

        if inserted == 0 {
            return;
        }
        let absorber = touched
            .iter()
            .copied()
            .find(|index| positions[*index].offset < offset)
            .or_else(|| touched.first().copied());
        for (index, position) in positions.iter_mut().enumerate() {
            if Some(index) == absorber {
                position.length += inserted;
            } else if !before[index] && position.offset >= offset {
                position.offset += inserted;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        updater: &dyn PositionUpdater,
        ranges: &[(usize, usize)],
        event: DocumentEvent,
    ) -> Vec<Option<(usize, usize)>> {
        let mut positions: Vec<Position> = ranges
            .iter()
            .map(|(offset, length)| Position::new(*offset, *length))
            .collect();
        updater.update(&event, &mut positions);
        positions
            .iter()
            .map(|p| (!p.deleted).then_some((p.offset, p.length)))
            .collect()
    }

    #[test]
    fn test_default_policy_cases() {
        let updater = DefaultPositionUpdater;
        let event = DocumentEvent::new(10, 5, "abc");
        assert_eq!(run(&updater, &[(0, 10)], event.clone()), vec![Some((0, 10))]);
        assert_eq!(run(&updater, &[(15, 5)], event.clone()), vec![Some((13, 5))]);
        assert_eq!(run(&updater, &[(5, 20)], event.clone()), vec![Some((5, 18))]);
        assert_eq!(run(&updater, &[(11, 2)], event.clone()), vec![None]);
        // an exact match is resized, not deleted
        assert_eq!(run(&updater, &[(10, 5)], event.clone()), vec![Some((10, 3))]);
        // sharing one end with the replaced range
        assert_eq!(run(&updater, &[(10, 2)], event.clone()), vec![Some((10, 3))]);
        assert_eq!(run(&updater, &[(12, 3)], event.clone()), vec![Some((10, 3))]);
        // partial overlaps
        assert_eq!(run(&updater, &[(5, 7)], event.clone()), vec![Some((5, 8))]);
        assert_eq!(run(&updater, &[(12, 8)], event), vec![Some((10, 8))]);
    }

    #[test]
    fn test_insertion_extends_at_boundaries() {
        let updater = DefaultPositionUpdater;
        let event = DocumentEvent::new(10, 0, "xy");
        assert_eq!(run(&updater, &[(5, 5)], event.clone()), vec![Some((5, 7))]);
        assert_eq!(run(&updater, &[(10, 5)], event.clone()), vec![Some((10, 7))]);
        assert_eq!(run(&updater, &[(0, 9)], event.clone()), vec![Some((0, 9))]);
        assert_eq!(run(&updater, &[(11, 2)], event), vec![Some((13, 2))]);
    }

    #[test]
    fn test_segments_collapse_instead_of_deleting() {
        let updater = SegmentUpdater;
        let ranges = [(0, 10), (20, 10), (40, 10)];
        assert_eq!(
            run(&updater, &ranges, DocumentEvent::new(15, 30, "")),
            vec![Some((0, 10)), Some((15, 0)), Some((15, 5))]
        );
    }

    #[test]
    fn test_segment_insertion_prefers_predecessor() {
        let updater = SegmentUpdater;
        let ranges = [(0, 10), (10, 10)];
        assert_eq!(
            run(&updater, &ranges, DocumentEvent::new(10, 0, "abc")),
            vec![Some((0, 13)), Some((13, 10))]
        );
        // Only the successor touches: it absorbs.
        let ranges = [(0, 5), (10, 10)];
        assert_eq!(
            run(&updater, &ranges, DocumentEvent::new(10, 0, "abc")),
            vec![Some((0, 5)), Some((10, 13))]
        );
    }

    #[test]
    fn test_segment_replacement_across_gap() {
        let updater = SegmentUpdater;
        // Replace [5, 25) which covers the end of the first and the start of the second.
        let ranges = [(0, 10), (20, 10)];
        assert_eq!(
            run(&updater, &ranges, DocumentEvent::new(5, 20, "xyz")),
            vec![Some((0, 8)), Some((8, 5))]
        );
        // Replace a hidden gap only.
        assert_eq!(
            run(&updater, &ranges, DocumentEvent::new(12, 4, "ab")),
            vec![Some((0, 10)), Some((18, 10))]
        );
    }
}
