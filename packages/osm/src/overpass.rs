//! Overpass API queries and response parsing.
//!
//! Queries ask for JSON output with `out geom`, so each way carries its
//! node coordinates inline and no second node lookup is needed.

use std::collections::BTreeMap;
use std::time::Duration;

use geo::{Coord, LineString};
use serde::Deserialize;

use crate::filter::escape;
use crate::{HighwayFilter, OsmError, OsmWay, retry};

/// Server-side timeout requested in the query header, in seconds.
pub const QUERY_TIMEOUT_SECS: u64 = 600;

/// Builds the area query for an administrative zone.
///
/// Selects the ways inside the area whose boundary relation has the given
/// `name` and `admin_level` tags, filtered by `filter`.
#[must_use]
pub fn zone_query(name: &str, admin_level: u8, filter: &HighwayFilter) -> String {
    format!(
        "[out:json][timeout:{QUERY_TIMEOUT_SECS}];\
         area[\"name\"=\"{}\"][\"admin_level\"=\"{admin_level}\"]->.zone;\
         way(area.zone){};\
         out geom;",
        escape(name),
        filter.overpass_clause(),
    )
}

/// Completes a user supplied query so that it returns JSON with inline
/// geometries.
///
/// A `[out:json]` header is added when the query has no settings header,
/// and `out geom;` is appended when the query does not print geometries.
#[must_use]
pub fn custom_query(query: &str) -> String {
    let body = query.trim();
    let mut full = String::new();
    if !body.starts_with('[') {
        full.push_str(&format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];"));
    }
    full.push_str(body);
    if !body.contains("out geom") {
        if !body.ends_with(';') {
            full.push(';');
        }
        full.push_str("out geom;");
    }
    full
}

/// Builds the HTTP client used for Overpass requests.
///
/// # Errors
///
/// Returns [`OsmError::Http`] if the client cannot be created.
pub fn client() -> Result<reqwest::Client, OsmError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("compare_osm/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS + 60))
        .build()?)
}

/// Posts a query to an Overpass endpoint and returns the raw response.
///
/// # Errors
///
/// Returns [`OsmError`] if the request fails after all retries.
#[allow(clippy::future_not_send)]
pub async fn fetch(
    client: &reqwest::Client,
    endpoint: &str,
    query: &str,
) -> Result<String, OsmError> {
    log::info!("Querying Overpass at {endpoint}");
    log::debug!("Overpass query: {query}");

    let body = retry::send_text(|| {
        client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(query.to_string())
    })
    .await?;

    log::info!("Received {} bytes from Overpass", body.len());
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    geometry: Vec<Option<Point>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Point {
    lat: f64,
    lon: f64,
}

/// Parses an Overpass JSON response into ways.
///
/// Only `way` elements accepted by `filter` are kept. Nodes outside the
/// query bounds are reported by Overpass as `null`; a way is split at them,
/// and parts with fewer than two nodes are dropped.
///
/// # Errors
///
/// * If the body is not a valid Overpass JSON response
/// * If the server reported a runtime error and returned no elements
pub fn parse_ways(body: &str, filter: &HighwayFilter) -> Result<Vec<OsmWay>, OsmError> {
    let response: Response = serde_json::from_str(body)?;

    if let Some(remark) = response.remark.as_deref() {
        if response.elements.is_empty() && remark.contains("error") {
            return Err(OsmError::Overpass {
                message: remark.to_string(),
            });
        }
        log::warn!("Overpass remark: {remark}");
    }

    let mut ways = Vec::new();
    for element in response.elements {
        if element.kind != "way" {
            continue;
        }
        let tags = element.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let Some(highway) = filter.accepts(tags) else {
            continue;
        };

        for part in element.geometry.split(Option::is_none) {
            if part.len() < 2 {
                continue;
            }
            let coords: Vec<Coord<f64>> = part
                .iter()
                .flatten()
                .map(|p| Coord { x: p.lon, y: p.lat })
                .collect();
            ways.push(OsmWay {
                id: element.id,
                highway: highway.to_string(),
                geometry: LineString::new(coords),
            });
        }
    }

    log::debug!("Parsed {} OSM ways", ways.len());
    Ok(ways)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "version": 0.6,
        "elements": [
            {
                "type": "way",
                "id": 10,
                "tags": {"highway": "residential", "name": "Via Roma"},
                "geometry": [{"lat": 45.0, "lon": 11.0}, {"lat": 45.001, "lon": 11.002}]
            },
            {
                "type": "way",
                "id": 11,
                "tags": {"highway": "footway"},
                "geometry": [{"lat": 45.0, "lon": 11.0}, {"lat": 45.1, "lon": 11.1}]
            },
            {
                "type": "way",
                "id": 12,
                "tags": {"highway": "primary"},
                "geometry": [
                    {"lat": 45.0, "lon": 11.0},
                    {"lat": 45.0, "lon": 11.1},
                    null,
                    {"lat": 45.2, "lon": 11.2},
                    null,
                    {"lat": 45.3, "lon": 11.3},
                    {"lat": 45.4, "lon": 11.4}
                ]
            },
            {"type": "node", "id": 1, "lat": 45.0, "lon": 11.0},
            {"type": "way", "id": 13, "tags": {"building": "yes"}, "geometry": []}
        ]
    }"#;

    #[test]
    fn zone_query_filters_highways_in_area() {
        let query = zone_query("Verona", 8, &HighwayFilter::default());
        assert!(query.starts_with("[out:json]"));
        assert!(query.contains("area[\"name\"=\"Verona\"][\"admin_level\"=\"8\"]->.zone;"));
        assert!(query.contains("way(area.zone)[\"highway\"][\"highway\"!=\"footway\"]"));
        assert!(query.ends_with("out geom;"));
    }

    #[test]
    fn custom_query_gets_header_and_output() {
        assert_eq!(
            custom_query("way[highway](45.0,11.0,45.1,11.1)"),
            format!(
                "[out:json][timeout:{QUERY_TIMEOUT_SECS}];way[highway](45.0,11.0,45.1,11.1);out geom;"
            )
        );
    }

    #[test]
    fn custom_query_with_header_is_kept() {
        let query = "[out:json];way[highway](1,2,3,4);out geom;";
        assert_eq!(custom_query(query), query);
    }

    #[test]
    fn parses_ways_and_applies_filter() {
        let ways = parse_ways(RESPONSE, &HighwayFilter::default()).unwrap();
        let ids: Vec<i64> = ways.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![10, 12, 12]);

        assert_eq!(ways[0].highway, "residential");
        let first = ways[0].geometry.0[0];
        assert!((first.x - 11.0).abs() < f64::EPSILON);
        assert!((first.y - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn splits_ways_at_missing_nodes() {
        let ways = parse_ways(RESPONSE, &HighwayFilter::default()).unwrap();
        let parts: Vec<usize> = ways
            .iter()
            .filter(|w| w.id == 12)
            .map(|w| w.geometry.0.len())
            .collect();
        assert_eq!(parts, vec![2, 2]);
    }

    #[test]
    fn runtime_error_without_elements_fails() {
        let body = r#"{"elements": [], "remark": "runtime error: Query timed out"}"#;
        assert!(matches!(
            parse_ways(body, &HighwayFilter::default()),
            Err(OsmError::Overpass { .. })
        ));
    }

    #[test]
    fn invalid_body_is_a_json_error() {
        assert!(matches!(
            parse_ways("<html>busy</html>", &HighwayFilter::default()),
            Err(OsmError::Json(_))
        ));
    }
}
