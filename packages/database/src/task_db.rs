//! Per-task layer storage in `DuckDB`.
//!
//! A task database holds every layer of one comparison: the normalized
//! reference and OSM ways and the two result layers. Each
//! row is one geometry stored as `GeoJSON` TEXT, numbered within its layer
//! so reads return the insertion order.

use std::collections::BTreeMap;
use std::path::Path;

use compare_osm_geometry::geojson::{geometry_from_text, line_to_text};
use duckdb::Connection;
use geo::{Geometry, LineString};

use crate::DbError;

/// Normalized reference ways.
pub const REFERENCE_LAYER: &str = "reference";

/// Normalized (and clipped) OSM ways.
pub const OSM_LAYER: &str = "osm";

/// Opens (or creates) a task `DuckDB` and ensures the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Opens an in-memory task database.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS layers (
            layer TEXT NOT NULL,
            position INTEGER NOT NULL,
            geojson TEXT NOT NULL,
            PRIMARY KEY (layer, position)
        );

        CREATE TABLE IF NOT EXISTS _meta (
            key TEXT PRIMARY KEY,
            value TEXT
        );",
    )?;
    Ok(())
}

/// Replaces the contents of a layer with `lines`.
///
/// Runs in a single transaction; on failure the previous contents are
/// kept. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if a statement fails.
pub fn replace_layer(
    conn: &Connection,
    layer: &str,
    lines: &[LineString<f64>],
) -> Result<usize, DbError> {
    conn.execute_batch("BEGIN TRANSACTION;")?;
    match write_layer(conn, layer, lines) {
        Ok(rows) => {
            conn.execute_batch("COMMIT;")?;
            log::debug!("Stored {rows} rows in layer {layer}");
            Ok(rows)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK;") {
                log::warn!("Rollback of layer {layer} failed: {rollback}");
            }
            Err(e)
        }
    }
}

fn write_layer(conn: &Connection, layer: &str, lines: &[LineString<f64>]) -> Result<usize, DbError> {
    conn.execute("DELETE FROM layers WHERE layer = ?", [layer])?;

    let mut stmt = conn.prepare("INSERT INTO layers (layer, position, geojson) VALUES (?, ?, ?)")?;
    for (position, line) in lines.iter().enumerate() {
        let position = i64::try_from(position).map_err(|e| DbError::Conversion {
            message: format!("layer {layer} position overflow: {e}"),
        })?;
        stmt.execute(duckdb::params![layer, position, line_to_text(line)])?;
    }

    Ok(lines.len())
}

/// Reads the geometries of a layer in stored order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row is not valid `GeoJSON`.
pub fn read_layer(conn: &Connection, layer: &str) -> Result<Vec<Geometry<f64>>, DbError> {
    let mut stmt = conn.prepare("SELECT geojson FROM layers WHERE layer = ? ORDER BY position")?;
    let rows = stmt
        .query_map([layer], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    rows.iter()
        .map(|text| geometry_from_text(text).map_err(DbError::from))
        .collect()
}

/// Number of rows in every non-empty layer.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn layer_counts(conn: &Connection) -> Result<BTreeMap<String, usize>, DbError> {
    let mut stmt = conn.prepare("SELECT layer, COUNT(*) FROM layers GROUP BY layer")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut counts = BTreeMap::new();
    for (layer, count) in rows {
        let count = row_count(&layer, count)?;
        counts.insert(layer, count);
    }
    Ok(counts)
}

fn row_count(layer: &str, count: i64) -> Result<usize, DbError> {
    usize::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("layer {layer} row count {count}: {e}"),
    })
}

/// Reads a metadata value.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
    let mut rows = stmt.query([key])?;
    match rows.next()? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(None),
    }
}

/// Writes a metadata value, replacing any previous one.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO _meta (key, value) VALUES (?, ?)",
        duckdb::params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn roads() -> Vec<LineString<f64>> {
        vec![
            line_string![(x: 11.0, y: 45.0), (x: 11.001, y: 45.0)],
            line_string![(x: 11.0, y: 45.1), (x: 11.0, y: 45.2), (x: 11.1, y: 45.2)],
        ]
    }

    #[test]
    fn layer_round_trips_in_order() {
        let conn = open_in_memory().unwrap();
        replace_layer(&conn, REFERENCE_LAYER, &roads()).unwrap();

        let stored = read_layer(&conn, REFERENCE_LAYER).unwrap();
        let expected: Vec<Geometry<f64>> = roads().into_iter().map(Geometry::LineString).collect();
        assert_eq!(stored, expected);
    }

    #[test]
    fn replace_discards_previous_rows() {
        let conn = open_in_memory().unwrap();
        replace_layer(&conn, OSM_LAYER, &roads()).unwrap();
        replace_layer(&conn, OSM_LAYER, &roads()[..1]).unwrap();

        assert_eq!(read_layer(&conn, OSM_LAYER).unwrap().len(), 1);
    }

    #[test]
    fn counts_only_non_empty_layers() {
        let conn = open_in_memory().unwrap();
        replace_layer(&conn, REFERENCE_LAYER, &roads()).unwrap();
        replace_layer(&conn, OSM_LAYER, &[]).unwrap();
        replace_layer(&conn, "notinosm", &roads()[1..]).unwrap();

        let counts = layer_counts(&conn).unwrap();
        assert_eq!(counts.get(REFERENCE_LAYER), Some(&2));
        assert_eq!(counts.get("notinosm"), Some(&1));
        assert_eq!(counts.get(OSM_LAYER), None);
    }

    #[test]
    fn missing_layer_reads_empty() {
        let conn = open_in_memory().unwrap();
        assert!(read_layer(&conn, "onlyinosm").unwrap().is_empty());
    }

    #[test]
    fn meta_values_are_replaced() {
        let conn = open_in_memory().unwrap();
        assert_eq!(get_meta(&conn, "analysis_time").unwrap(), None);

        set_meta(&conn, "analysis_time", "01/02/2025").unwrap();
        set_meta(&conn, "analysis_time", "03/04/2025").unwrap();
        assert_eq!(
            get_meta(&conn, "analysis_time").unwrap().as_deref(),
            Some("03/04/2025")
        );
    }

    #[test]
    fn file_database_persists_layers() {
        let tmp = std::env::temp_dir().join("compare_osm_task_db_test");
        let _ = std::fs::remove_dir_all(&tmp);
        let path = tmp.join("out").join("verona.duckdb");

        {
            let conn = open(&path).unwrap();
            replace_layer(&conn, REFERENCE_LAYER, &roads()).unwrap();
        }
        let conn = open(&path).unwrap();
        assert_eq!(read_layer(&conn, REFERENCE_LAYER).unwrap().len(), 2);

        drop(conn);
        std::fs::remove_dir_all(&tmp).unwrap();
    }

    #[test]
    fn invalid_row_count_is_an_error() {
        assert_eq!(row_count("osm", 3).unwrap(), 3);
        assert!(matches!(
            row_count("osm", -1),
            Err(DbError::Conversion { message }) if message.contains("layer osm")
        ));
    }
}
