//! R-tree indexed set of normalized lines.

use geo::{
    BooleanOps, BoundingRect, Geometry, Intersects, LineString, MultiLineString, MultiPolygon, Rect,
};
use rstar::{AABB, RTree, RTreeObject};

use crate::normalize;

/// A line stored in the R-tree by its position in [`LineSet::lines`].
struct LineEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for LineEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// A normalized set of ways with a spatial index over their envelopes.
///
/// Construction always goes through [`normalize`], so a `LineSet` never
/// contains multi-lines, null lines, or exact duplicates.
pub struct LineSet {
    lines: Vec<LineString<f64>>,
    tree: RTree<LineEntry>,
}

impl LineSet {
    /// Normalizes arbitrary geometries into a line set.
    pub fn from_geometries<I>(geometries: I) -> Self
    where
        I: IntoIterator<Item = Geometry<f64>>,
    {
        Self::from_normalized(normalize::normalize(geometries))
    }

    /// Builds a line set from lines, dropping null lines and duplicates.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = LineString<f64>>,
    {
        Self::from_normalized(normalize::dedup_lines(lines))
    }

    fn from_normalized(lines: Vec<LineString<f64>>) -> Self {
        let entries = lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| {
                line.bounding_rect().map(|rect| LineEntry {
                    index,
                    envelope: envelope_of(rect),
                })
            })
            .collect();

        Self {
            lines,
            tree: RTree::bulk_load(entries),
        }
    }

    /// The lines, in input order.
    #[must_use]
    pub fn lines(&self) -> &[LineString<f64>] {
        &self.lines
    }

    /// Consumes the set, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<LineString<f64>> {
        self.lines
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the set has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Extent of all lines, `None` for an empty set.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.lines
            .iter()
            .filter_map(|line| line.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }

    /// Lines whose envelope intersects `rect`, in input order.
    #[must_use]
    pub fn in_rect(&self, rect: Rect<f64>) -> Vec<&LineString<f64>> {
        let mut indices: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope_of(rect))
            .map(|entry| entry.index)
            .collect();
        indices.sort_unstable();
        indices.into_iter().map(|i| &self.lines[i]).collect()
    }

    /// Keeps the parts of every line that lie inside `boundary`.
    ///
    /// Lines outside the boundary's bounding box are skipped through the
    /// index; the remaining candidates are clipped exactly.
    #[must_use]
    pub fn clip_to(&self, boundary: &MultiPolygon<f64>) -> Self {
        let Some(rect) = boundary.bounding_rect() else {
            return Self::from_normalized(Vec::new());
        };

        let mut inside = Vec::new();
        for line in self.in_rect(rect) {
            if !boundary.intersects(line) {
                continue;
            }
            let clipped = boundary.clip(&MultiLineString::new(vec![line.clone()]), false);
            inside.extend(clipped.0);
        }

        let clipped = Self::from_lines(inside);
        log::debug!(
            "Clipped {} lines to boundary, {} parts inside",
            self.len(),
            clipped.len()
        );
        clipped
    }
}

/// Converts a bounding rectangle into an R-tree envelope.
pub(crate) fn envelope_of(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min, y: min),
            (x: max, y: min),
            (x: max, y: max),
            (x: min, y: max),
        ]])
    }

    #[test]
    fn dedupes_on_construction() {
        let a = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];
        let set = LineSet::from_lines(vec![a.clone(), a]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn bounding_rect_covers_all_lines() {
        let set = LineSet::from_lines(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 2.0)],
            line_string![(x: -3.0, y: 1.0), (x: 4.0, y: 1.0)],
        ]);
        let rect = set.bounding_rect().unwrap();
        assert_eq!(rect.min().x, -3.0);
        assert_eq!(rect.min().y, 0.0);
        assert_eq!(rect.max().x, 4.0);
        assert_eq!(rect.max().y, 2.0);
        assert!(LineSet::from_lines(Vec::new()).bounding_rect().is_none());
    }

    #[test]
    fn in_rect_returns_lines_in_input_order() {
        let set = LineSet::from_lines(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 50.0, y: 50.0), (x: 51.0, y: 50.0)],
            line_string![(x: 0.5, y: -1.0), (x: 0.5, y: 1.0)],
        ]);
        let found = set.in_rect(Rect::new((-1.0, -1.0), (2.0, 2.0)));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], &set.lines()[0]);
        assert_eq!(found[1], &set.lines()[2]);
    }

    #[test]
    fn clip_keeps_only_the_inside_part() {
        let set = LineSet::from_lines(vec![
            line_string![(x: -5.0, y: 5.0), (x: 5.0, y: 5.0)],
            line_string![(x: 20.0, y: 20.0), (x: 30.0, y: 20.0)],
        ]);
        let clipped = set.clip_to(&square(0.0, 10.0));

        assert_eq!(clipped.len(), 1);
        let rect = clipped.bounding_rect().unwrap();
        assert!((rect.min().x - 0.0).abs() < 1e-9);
        assert!((rect.max().x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn clip_to_empty_boundary_is_empty() {
        let set = LineSet::from_lines(vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]]);
        assert!(set.clip_to(&MultiPolygon::new(Vec::new())).is_empty());
    }
}
