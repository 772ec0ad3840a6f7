//! Buffered difference as `DuckDB` spatial SQL.
//!
//! The same algorithm as `compare_osm_geometry`, expressed as statements
//! over the `layers` table of a task database:
//!
//! 1. each input layer is exploded with `ST_Dump` into single lines, non
//!    lines are dropped, and exact duplicates are grouped away;
//! 2. every line is buffered, null and empty buffers are discarded, and
//!    R-tree indexes are built on lines and buffers;
//! 3. for each ordered pair, lines whose extent hits a buffer extent and
//!    that truly intersect it get the union of those buffers subtracted;
//!    lines hitting no buffer are kept unchanged.
//!
//! Requires the `spatial` extension.

use compare_osm_geometry::{Comparison, LineSet};
use duckdb::Connection;
use geo::LineString;

use crate::DbError;
use crate::task_db::{self, OSM_LAYER, REFERENCE_LAYER};

const REFERENCE_LINES: &str = "reference_lines";
const OSM_LINES: &str = "osm_lines";
const REFERENCE_BUFFERS: &str = "reference_buffers";
const OSM_BUFFERS: &str = "osm_buffers";
const NOT_IN_OSM: &str = "notinosm_result";
const ONLY_IN_OSM: &str = "onlyinosm_result";

/// Quotes a string literal for inlining in SQL.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Statement loading the `spatial` extension, installing it if needed.
#[must_use]
pub const fn load_extension_sql() -> &'static str {
    "INSTALL spatial; LOAD spatial;"
}

/// Explodes a stored layer into a table of distinct single lines.
///
/// Ids follow the first position at which each line appears.
#[must_use]
pub fn normalize_sql(layer: &str, table: &str) -> String {
    format!(
        "CREATE OR REPLACE TABLE {table} AS
         WITH dumped AS (
             SELECT position, UNNEST(ST_Dump(ST_GeomFromGeoJSON(geojson))) AS part
             FROM layers
             WHERE layer = {layer}
         ),
         parts AS (
             SELECT position, part.geom AS geom FROM dumped
         )
         SELECT row_number() OVER (ORDER BY min(position)) AS id, geom
         FROM parts
         WHERE geom IS NOT NULL
           AND ST_GeometryType(geom) = 'LINESTRING'
           AND NOT ST_IsEmpty(geom)
         GROUP BY geom;
         CREATE INDEX {table}_rtree ON {table} USING RTREE (geom);",
        layer = literal(layer),
    )
}

/// Buffers every line of `lines`, dropping null and empty buffers.
#[must_use]
pub fn buffer_sql(lines: &str, buffers: &str, tolerance: f64) -> String {
    format!(
        "CREATE OR REPLACE TABLE {buffers} AS
         SELECT id, geom FROM (
             SELECT id, ST_Buffer(geom, {tolerance}) AS geom
             FROM {lines}
             WHERE ST_Length(geom) > 0
         )
         WHERE geom IS NOT NULL AND NOT ST_IsEmpty(geom);
         CREATE INDEX {buffers}_rtree ON {buffers} USING RTREE (geom);"
    )
}

/// Lines of `lines` outside the buffers in `buffers`, into `output`.
///
/// The extent test only prunes candidates; `ST_Intersects` decides.
#[must_use]
pub fn difference_sql(lines: &str, buffers: &str, output: &str) -> String {
    format!(
        "CREATE OR REPLACE TABLE {output} AS
         WITH hits AS (
             SELECT way.id, any_value(way.geom) AS geom, ST_Union_Agg(buffer.geom) AS cover
             FROM {lines} way
             JOIN {buffers} buffer
               ON ST_Intersects_Extent(way.geom, buffer.geom)
              AND ST_Intersects(way.geom, buffer.geom)
             GROUP BY way.id
         ),
         partial AS (
             SELECT id, ST_Difference(geom, cover) AS geom FROM hits
         ),
         untouched AS (
             SELECT id, geom FROM {lines}
             WHERE id NOT IN (SELECT id FROM hits)
         )
         SELECT id, geom FROM partial
         WHERE geom IS NOT NULL AND NOT ST_IsEmpty(geom)
         UNION ALL
         SELECT id, geom FROM untouched;"
    )
}

/// Reads a result table as `GeoJSON` geometries in id order.
#[must_use]
pub fn result_sql(output: &str) -> String {
    format!("SELECT ST_AsGeoJSON(geom)::VARCHAR FROM {output} ORDER BY id")
}

/// Runs the buffered difference inside `DuckDB`.
pub struct SpatialComparator {
    conn: Connection,
}

impl SpatialComparator {
    /// Creates a comparator on a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or the
    /// `spatial` extension cannot be loaded.
    pub fn new() -> Result<Self, DbError> {
        let conn = task_db::open_in_memory()?;
        conn.execute_batch(load_extension_sql())?;
        Ok(Self { conn })
    }

    /// Compares two networks in both directions.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a statement fails or a result row cannot be
    /// decoded.
    pub fn compare(
        &self,
        reference: &[LineString<f64>],
        osm: &[LineString<f64>],
        tolerance: f64,
    ) -> Result<Comparison, DbError> {
        task_db::replace_layer(&self.conn, REFERENCE_LAYER, reference)?;
        task_db::replace_layer(&self.conn, OSM_LAYER, osm)?;

        log::debug!("Normalizing layers");
        self.conn
            .execute_batch(&normalize_sql(REFERENCE_LAYER, REFERENCE_LINES))?;
        self.conn.execute_batch(&normalize_sql(OSM_LAYER, OSM_LINES))?;

        log::debug!("Buffering ways (tolerance {tolerance})");
        self.conn
            .execute_batch(&buffer_sql(REFERENCE_LINES, REFERENCE_BUFFERS, tolerance))?;
        self.conn
            .execute_batch(&buffer_sql(OSM_LINES, OSM_BUFFERS, tolerance))?;

        log::debug!("Computing differences");
        self.conn
            .execute_batch(&difference_sql(REFERENCE_LINES, OSM_BUFFERS, NOT_IN_OSM))?;
        self.conn
            .execute_batch(&difference_sql(OSM_LINES, REFERENCE_BUFFERS, ONLY_IN_OSM))?;

        Ok(Comparison {
            not_in_osm: self.read_result(NOT_IN_OSM)?,
            only_in_osm: self.read_result(ONLY_IN_OSM)?,
        })
    }

    fn read_result(&self, output: &str) -> Result<Vec<LineString<f64>>, DbError> {
        let mut stmt = self.conn.prepare(&result_sql(output))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut geometries = Vec::with_capacity(rows.len());
        for text in &rows {
            geometries.push(compare_osm_geometry::geojson::geometry_from_text(text)?);
        }
        Ok(LineSet::from_geometries(geometries).into_lines())
    }
}
