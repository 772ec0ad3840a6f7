//! Canonical single-line form.
//!
//! Every input set is flattened to one `LineString` per record before any
//! set operation: multi-lines are exploded into their parts, anything that
//! is not a line is dropped, and exact duplicates are removed.

use std::collections::HashSet;

use geo::{Geometry, LineString};

/// Identity of a line by exact coordinate equality.
///
/// Two lines are the same record only if they have the same vertices in
/// the same order. Lines that are topologically equal but differ in vertex
/// order or in the last bit of a coordinate are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey(Vec<(u64, u64)>);

impl LineKey {
    /// Builds the key of a line.
    #[must_use]
    pub fn of(line: &LineString<f64>) -> Self {
        Self(
            line.coords()
                .map(|c| (canonical_bits(c.x), canonical_bits(c.y)))
                .collect(),
        )
    }
}

/// Bit pattern of a coordinate with `-0.0` folded into `0.0`.
fn canonical_bits(value: f64) -> u64 {
    // -0.0 + 0.0 == +0.0
    (value + 0.0).to_bits()
}

/// Appends the line parts of `geometry` to `out`.
///
/// Points and polygons (e.g. from clipping a way against a boundary it only
/// touches) are not ways and are dropped.
pub fn explode(geometry: Geometry<f64>, out: &mut Vec<LineString<f64>>) {
    match geometry {
        Geometry::LineString(line) => out.push(line),
        Geometry::MultiLineString(multi) => out.extend(multi.0),
        Geometry::Line(line) => out.push(LineString::from(vec![line.start, line.end])),
        Geometry::GeometryCollection(collection) => {
            for part in collection.0 {
                explode(part, out);
            }
        }
        Geometry::Point(_)
        | Geometry::MultiPoint(_)
        | Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => {}
    }
}

/// Flattens geometries into a deduplicated set of single lines.
///
/// Input order is preserved; the first occurrence of a duplicate wins.
pub fn normalize<I>(geometries: I) -> Vec<LineString<f64>>
where
    I: IntoIterator<Item = Geometry<f64>>,
{
    let mut parts = Vec::new();
    for geometry in geometries {
        explode(geometry, &mut parts);
    }
    dedup_lines(parts)
}

/// Drops null lines and exact duplicates, preserving order.
pub fn dedup_lines<I>(lines: I) -> Vec<LineString<f64>>
where
    I: IntoIterator<Item = LineString<f64>>,
{
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter(is_line)
        .filter(|line| seen.insert(LineKey::of(line)))
        .collect()
}

/// A usable line has at least two finite vertices.
fn is_line(line: &LineString<f64>) -> bool {
    line.0.len() >= 2 && line.coords().all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Returns `true` if the line has at least one segment of non-zero length.
#[must_use]
pub fn has_length(line: &LineString<f64>) -> bool {
    line.0.windows(2).any(|pair| pair[0] != pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{GeometryCollection, MultiLineString, Point, line_string, polygon};

    #[test]
    fn explodes_multilines_and_keeps_lines() {
        let multi = MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 2.0, y: 0.0), (x: 3.0, y: 0.0)],
        ]);
        let single = line_string![(x: 5.0, y: 5.0), (x: 6.0, y: 6.0)];

        let lines = normalize(vec![
            Geometry::MultiLineString(multi),
            Geometry::LineString(single.clone()),
        ]);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], single);
    }

    #[test]
    fn removes_exact_duplicates_across_single_and_multi() {
        let a = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        let lines = normalize(vec![
            Geometry::LineString(a.clone()),
            Geometry::MultiLineString(MultiLineString::new(vec![a.clone()])),
        ]);
        assert_eq!(lines, vec![a]);
    }

    #[test]
    fn keeps_near_duplicates_distinct() {
        let a = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        let b = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.000_000_000_1)];
        let reversed = line_string![(x: 1.0, y: 1.0), (x: 0.0, y: 0.0)];

        let lines = normalize(vec![
            Geometry::LineString(a),
            Geometry::LineString(b),
            Geometry::LineString(reversed),
        ]);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn negative_zero_is_the_same_coordinate() {
        let a = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];
        let b = line_string![(x: -0.0, y: 0.0), (x: 1.0, y: -0.0)];
        assert_eq!(LineKey::of(&a), LineKey::of(&b));
        assert_eq!(normalize(vec![a.into(), b.into()]).len(), 1);
    }

    #[test]
    fn drops_non_line_and_null_geometries() {
        let lines = normalize(vec![
            Geometry::Point(Point::new(1.0, 1.0)),
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
            ]),
            Geometry::LineString(LineString::new(Vec::new())),
            Geometry::LineString(line_string![(x: 3.0, y: 3.0)]),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: f64::NAN, y: 1.0)]),
        ]);
        assert!(lines.is_empty());
    }

    #[test]
    fn recurses_into_collections() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];
        let collection = GeometryCollection(vec![
            Geometry::Point(Point::new(0.0, 0.0)),
            Geometry::LineString(line.clone()),
        ]);
        assert_eq!(
            normalize(vec![Geometry::GeometryCollection(collection)]),
            vec![line]
        );
    }

    #[test]
    fn zero_length_lines_have_no_length() {
        assert!(!has_length(
            &line_string![(x: 2.0, y: 2.0), (x: 2.0, y: 2.0)]
        ));
        assert!(has_length(
            &line_string![(x: 2.0, y: 2.0), (x: 2.0, y: 2.0), (x: 2.0, y: 3.0)]
        ));
    }
}
