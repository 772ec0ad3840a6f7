//! Engines computing the buffered difference.

use compare_osm_database::spatial::SpatialComparator;
use compare_osm_geometry::{Comparison, LineSet};
use compare_osm_task_models::ComparatorKind;

use crate::TaskError;

/// Computes both result layers of a task.
pub trait Comparator: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &'static str;

    /// Compares normalized reference ways with normalized OSM ways.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] if the engine fails.
    fn compare(
        &self,
        reference: &LineSet,
        osm: &LineSet,
        tolerance: f64,
    ) -> Result<Comparison, TaskError>;
}

/// In-memory engine built on `geo` and an R-tree.
pub struct GeometryComparator;

impl Comparator for GeometryComparator {
    fn name(&self) -> &'static str {
        "geometry"
    }

    fn compare(
        &self,
        reference: &LineSet,
        osm: &LineSet,
        tolerance: f64,
    ) -> Result<Comparison, TaskError> {
        Ok(compare_osm_geometry::compare_sets(reference, osm, tolerance))
    }
}

/// `DuckDB` spatial SQL engine, on a fresh in-memory database per call.
pub struct DuckDbComparator;

impl Comparator for DuckDbComparator {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn compare(
        &self,
        reference: &LineSet,
        osm: &LineSet,
        tolerance: f64,
    ) -> Result<Comparison, TaskError> {
        let engine = SpatialComparator::new()?;
        Ok(engine.compare(reference.lines(), osm.lines(), tolerance)?)
    }
}

/// Returns the engine for a configured kind.
#[must_use]
pub fn for_kind(kind: ComparatorKind) -> Box<dyn Comparator> {
    match kind {
        ComparatorKind::Geometry => Box::new(GeometryComparator),
        ComparatorKind::DuckDb => Box::new(DuckDbComparator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    #[test]
    fn selects_engine_by_kind() {
        assert_eq!(for_kind(ComparatorKind::Geometry).name(), "geometry");
        assert_eq!(for_kind(ComparatorKind::DuckDb).name(), "duckdb");
    }

    #[test]
    fn geometry_engine_computes_both_directions() {
        let reference = LineSet::from_lines(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 0.0, y: 2.0), (x: 1.0, y: 2.0)],
        ]);
        let osm = LineSet::from_lines(vec![
            line_string![(x: 0.0, y: 0.01), (x: 1.0, y: 0.01)],
            line_string![(x: 0.0, y: -3.0), (x: 1.0, y: -3.0)],
        ]);

        let result = GeometryComparator.compare(&reference, &osm, 0.05).unwrap();
        assert_eq!(result.not_in_osm, vec![reference.lines()[1].clone()]);
        assert_eq!(result.only_in_osm, vec![osm.lines()[1].clone()]);
    }
}
