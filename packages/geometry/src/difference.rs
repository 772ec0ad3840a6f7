//! Asymmetric buffered difference between two line sets.

use geo::{BooleanOps, LineString, MultiLineString, MultiPolygon};

use crate::buffer::BufferIndex;
use crate::index::LineSet;
use crate::normalize;

/// Counters describing how the ways of one direction were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifferenceStats {
    /// Ways no buffer touches; passed through unchanged.
    pub untouched: usize,
    /// Ways partly outside the buffers; the outside parts are kept.
    pub partial: usize,
    /// Ways entirely inside the buffers; dropped.
    pub covered: usize,
}

/// Parts of `ways` lying outside every buffer of the other set.
///
/// For each way, the buffers that intersect it (R-tree candidates confirmed
/// by an exact test) are merged and subtracted from it. A way no buffer
/// intersects is kept as it is. The result is normalized: single lines,
/// no exact duplicates.
#[must_use]
pub fn difference(ways: &LineSet, buffers: &BufferIndex) -> Vec<LineString<f64>> {
    difference_with_stats(ways, buffers).0
}

/// Same as [`difference`], also returning how each way was resolved.
#[must_use]
pub fn difference_with_stats(
    ways: &LineSet,
    buffers: &BufferIndex,
) -> (Vec<LineString<f64>>, DifferenceStats) {
    let mut stats = DifferenceStats::default();
    let mut leftovers = Vec::new();

    for way in ways.lines() {
        let hits = buffers.intersecting(way);
        if hits.is_empty() {
            stats.untouched += 1;
            leftovers.push(way.clone());
            continue;
        }

        let cover = union_all(&hits);
        let outside = cover.clip(&MultiLineString::new(vec![way.clone()]), true);
        if outside.0.is_empty() {
            stats.covered += 1;
        } else {
            stats.partial += 1;
            leftovers.extend(outside.0);
        }
    }

    log::debug!(
        "Difference: {} untouched, {} partial, {} covered",
        stats.untouched,
        stats.partial,
        stats.covered
    );

    (normalize::dedup_lines(leftovers), stats)
}

fn union_all(polygons: &[&MultiPolygon<f64>]) -> MultiPolygon<f64> {
    let Some((first, rest)) = polygons.split_first() else {
        return MultiPolygon::new(Vec::new());
    };
    rest.iter()
        .fold((*first).clone(), |merged, polygon| merged.union(*polygon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, line_string};

    fn length(lines: &[LineString<f64>]) -> f64 {
        lines
            .iter()
            .flat_map(|line| line.0.windows(2))
            .map(|pair| (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y))
            .sum()
    }

    fn min_x(lines: &[LineString<f64>]) -> f64 {
        lines
            .iter()
            .flat_map(LineString::coords)
            .map(|c: &Coord<f64>| c.x)
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn fully_covered_way_is_dropped() {
        let ways = LineSet::from_lines(vec![line_string![(x: 1.0, y: 0.0), (x: 4.0, y: 0.1)]]);
        let buffers = BufferIndex::build(&[line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)]], 0.5);

        let (result, stats) = difference_with_stats(&ways, &buffers);
        assert!(result.is_empty());
        assert_eq!(stats.covered, 1);
    }

    #[test]
    fn untouched_way_passes_through_unchanged() {
        let way = line_string![(x: 0.0, y: 10.0), (x: 3.0, y: 10.0), (x: 3.0, y: 12.0)];
        let ways = LineSet::from_lines(vec![way.clone()]);
        let buffers = BufferIndex::build(&[line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)]], 0.5);

        let (result, stats) = difference_with_stats(&ways, &buffers);
        assert_eq!(result, vec![way]);
        assert_eq!(stats.untouched, 1);
    }

    #[test]
    fn partially_covered_way_keeps_the_outside_part() {
        let ways = LineSet::from_lines(vec![line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]]);
        let buffers = BufferIndex::build(&[line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)]], 0.5);

        let (result, stats) = difference_with_stats(&ways, &buffers);
        assert_eq!(stats.partial, 1);
        assert!(!result.is_empty());

        let kept = length(&result);
        assert!(kept > 4.4 && kept < 4.6, "kept length {kept}");
        let start = min_x(&result);
        assert!(start > 5.4 && start < 5.6, "leftover starts at {start}");
    }

    #[test]
    fn union_of_several_buffers_is_subtracted() {
        // Two buffers cover [−0.5, 4.5] and [5.5, 10.5]; only the gap
        // around x = 5 is left.
        let ways = LineSet::from_lines(vec![line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]]);
        let buffers = BufferIndex::build(
            &[
                line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)],
                line_string![(x: 6.0, y: 0.0), (x: 10.0, y: 0.0)],
            ],
            0.5,
        );

        let result = difference(&ways, &buffers);
        let kept = length(&result);
        assert!(kept > 0.9 && kept < 1.1, "kept length {kept}");
    }

    #[test]
    fn box_overlap_without_contact_is_untouched() {
        let way = line_string![(x: 8.0, y: 1.0), (x: 9.0, y: 1.0)];
        let ways = LineSet::from_lines(vec![way.clone()]);
        let buffers =
            BufferIndex::build(&[line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)]], 0.5);

        assert_eq!(difference(&ways, &buffers), vec![way]);
    }

    #[test]
    fn empty_buffer_set_keeps_every_way() {
        let ways = LineSet::from_lines(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 0.0, y: 1.0), (x: 1.0, y: 1.0)],
        ]);
        let buffers = BufferIndex::build(&[], 0.5);
        assert_eq!(difference(&ways, &buffers), ways.lines().to_vec());
    }
}
