//! Tolerance buffers and their spatial index.
//!
//! Each way is expanded by the tolerance into a polygon corridor. A way of
//! the other set that falls inside the corridor is considered the same
//! street.

use geo::algorithm::Buffer;
use geo::{BoundingRect, Intersects, LineString, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::index::envelope_of;
use crate::normalize::has_length;

/// Buffers a single line.
///
/// Returns `None` for degenerate lines (no segment of non-zero length) and
/// for empty buffer results, the equivalent of a null `ST_Buffer`.
#[must_use]
pub fn buffer_line(line: &LineString<f64>, tolerance: f64) -> Option<MultiPolygon<f64>> {
    if !has_length(line) {
        return None;
    }

    let buffer = line.buffer(tolerance);
    if buffer.0.is_empty() {
        None
    } else {
        Some(buffer)
    }
}

/// A buffer polygon stored in the R-tree with its envelope.
struct BufferEntry {
    polygon: MultiPolygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BufferEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over the buffers of a line set.
pub struct BufferIndex {
    tree: RTree<BufferEntry>,
}

impl BufferIndex {
    /// Buffers every line and bulk-loads the results.
    #[must_use]
    pub fn build(lines: &[LineString<f64>], tolerance: f64) -> Self {
        let entries: Vec<BufferEntry> = lines
            .iter()
            .filter_map(|line| {
                let polygon = buffer_line(line, tolerance)?;
                let envelope = envelope_of(polygon.bounding_rect()?);
                Some(BufferEntry { polygon, envelope })
            })
            .collect();

        let discarded = lines.len() - entries.len();
        if discarded > 0 {
            log::debug!("Discarded {discarded} null buffers (degenerate lines)");
        }

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if no buffer was built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Buffers whose envelope intersects the line's envelope.
    ///
    /// Box candidates only; see [`Self::intersecting`] for the exact answer.
    #[must_use]
    pub fn candidates(&self, line: &LineString<f64>) -> Vec<&MultiPolygon<f64>> {
        let Some(rect) = line.bounding_rect() else {
            return Vec::new();
        };
        self.tree
            .locate_in_envelope_intersecting(&envelope_of(rect))
            .map(|entry| &entry.polygon)
            .collect()
    }

    /// Buffers that exactly intersect the line.
    ///
    /// The R-tree narrows the search to box candidates, each of which is
    /// then confirmed with an exact intersection test.
    #[must_use]
    pub fn intersecting(&self, line: &LineString<f64>) -> Vec<&MultiPolygon<f64>> {
        self.candidates(line)
            .into_iter()
            .filter(|polygon| polygon.intersects(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Contains, Point, line_string};

    #[test]
    fn degenerate_line_has_no_buffer() {
        let line = line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)];
        assert!(buffer_line(&line, 0.5).is_none());
    }

    #[test]
    fn buffer_is_a_corridor_of_the_tolerance() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let buffer = buffer_line(&line, 1.0).unwrap();

        assert!(buffer.contains(&Point::new(5.0, 0.9)));
        assert!(buffer.contains(&Point::new(5.0, -0.9)));
        assert!(!buffer.contains(&Point::new(5.0, 1.1)));
        assert!(!buffer.contains(&Point::new(11.5, 0.0)));
    }

    #[test]
    fn build_skips_null_buffers() {
        let index = BufferIndex::build(
            &[
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
                line_string![(x: 3.0, y: 3.0), (x: 3.0, y: 3.0)],
            ],
            0.1,
        );
        assert_eq!(index.len(), 1);
        assert!(!index.is_empty());
    }

    #[test]
    fn box_candidates_are_confirmed_exactly() {
        // The diagonal's buffer has a bounding box covering the whole
        // square, but the query line is far from the diagonal itself.
        let index = BufferIndex::build(&[line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)]], 0.5);
        let query = line_string![(x: 8.0, y: 1.0), (x: 9.0, y: 1.0)];

        assert_eq!(index.candidates(&query).len(), 1);
        assert!(index.intersecting(&query).is_empty());
    }

    #[test]
    fn pruned_search_matches_brute_force() {
        let lines: Vec<LineString<f64>> = (0..20)
            .map(|i| {
                let offset = f64::from(i) * 3.0;
                line_string![(x: offset, y: 0.0), (x: offset + 2.0, y: f64::from(i % 4))]
            })
            .collect();
        let tolerance = 0.4;
        let index = BufferIndex::build(&lines, tolerance);

        let query = line_string![(x: -1.0, y: 1.0), (x: 61.0, y: 1.5)];
        let brute_force = lines
            .iter()
            .filter_map(|line| buffer_line(line, tolerance))
            .filter(|buffer| buffer.intersects(&query))
            .count();

        assert_eq!(index.intersecting(&query).len(), brute_force);
    }
}
