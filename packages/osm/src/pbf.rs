//! OpenStreetMap PBF street network reader.
//!
//! Ways reference their nodes by id, so the extract is read twice: the
//! first pass collects the accepted ways and the ids of their nodes, the
//! second resolves those node ids to coordinates.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use geo::{Coord, LineString};
use osmpbf::{Element, ElementReader};

use crate::{HighwayFilter, OsmError, OsmWay};

/// A way from the first pass, before its nodes are resolved.
#[derive(Debug)]
struct PendingWay {
    id: i64,
    highway: String,
    refs: Vec<i64>,
}

/// Reads the ways accepted by `filter` from a PBF extract.
///
/// Ways referencing nodes missing from the extract (common at the edges
/// of a clipped extract) are skipped.
///
/// # Errors
///
/// Returns an error if the PBF file cannot be read or parsed.
pub fn read_ways(path: &Path, filter: &HighwayFilter) -> Result<Vec<OsmWay>, OsmError> {
    if !path.exists() {
        return Err(OsmError::FileNotFound(path.display().to_string()));
    }

    log::info!("Reading OSM ways from {}", path.display());

    let mut pending = Vec::new();
    open(path)?
        .for_each(|element| {
            if let Element::Way(way) = element
                && let Some(highway) = filter.accepts(way.tags())
            {
                pending.push(PendingWay {
                    id: way.id(),
                    highway: highway.to_string(),
                    refs: way.refs().collect(),
                });
            }
        })
        .map_err(|e| parse_error(path, &e))?;

    let wanted: HashSet<i64> = pending.iter().flat_map(|w| w.refs.iter().copied()).collect();
    log::debug!(
        "First pass: {} ways referencing {} nodes",
        pending.len(),
        wanted.len()
    );

    let mut nodes: HashMap<i64, Coord<f64>> = HashMap::with_capacity(wanted.len());
    open(path)?
        .for_each(|element| {
            let (id, lon, lat) = match element {
                Element::Node(node) => (node.id(), node.lon(), node.lat()),
                Element::DenseNode(node) => (node.id(), node.lon(), node.lat()),
                Element::Way(_) | Element::Relation(_) => return,
            };
            if wanted.contains(&id) {
                nodes.insert(id, Coord { x: lon, y: lat });
            }
        })
        .map_err(|e| parse_error(path, &e))?;

    let (ways, skipped) = resolve(pending, &nodes);
    if skipped > 0 {
        log::warn!("Skipped {skipped} ways with nodes missing from the extract");
    }
    log::info!("Read {} OSM ways from {}", ways.len(), path.display());
    Ok(ways)
}

fn open(path: &Path) -> Result<ElementReader<std::io::BufReader<std::fs::File>>, OsmError> {
    ElementReader::from_path(path).map_err(|e| parse_error(path, &e))
}

fn parse_error(path: &Path, e: &osmpbf::Error) -> OsmError {
    OsmError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Turns pending ways into geometries. Returns the resolved ways and the
/// number of ways dropped for unresolved nodes.
fn resolve(pending: Vec<PendingWay>, nodes: &HashMap<i64, Coord<f64>>) -> (Vec<OsmWay>, usize) {
    let mut ways = Vec::with_capacity(pending.len());
    let mut skipped = 0;

    for way in pending {
        let coords: Option<Vec<Coord<f64>>> =
            way.refs.iter().map(|id| nodes.get(id).copied()).collect();
        match coords {
            Some(coords) if coords.len() >= 2 => ways.push(OsmWay {
                id: way.id,
                highway: way.highway,
                geometry: LineString::new(coords),
            }),
            _ => skipped += 1,
        }
    }

    (ways, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> HashMap<i64, Coord<f64>> {
        HashMap::from([
            (1, Coord { x: 11.0, y: 45.0 }),
            (2, Coord { x: 11.1, y: 45.0 }),
            (3, Coord { x: 11.1, y: 45.1 }),
        ])
    }

    #[test]
    fn resolves_node_coordinates_in_order() {
        let pending = vec![PendingWay {
            id: 7,
            highway: "residential".to_string(),
            refs: vec![3, 2, 1],
        }];
        let (ways, skipped) = resolve(pending, &nodes());

        assert_eq!(skipped, 0);
        assert_eq!(ways.len(), 1);
        assert_eq!(ways[0].geometry.0[0], Coord { x: 11.1, y: 45.1 });
        assert_eq!(ways[0].geometry.0[2], Coord { x: 11.0, y: 45.0 });
    }

    #[test]
    fn skips_ways_with_unresolved_nodes() {
        let pending = vec![
            PendingWay {
                id: 7,
                highway: "residential".to_string(),
                refs: vec![1, 99],
            },
            PendingWay {
                id: 8,
                highway: "service".to_string(),
                refs: vec![1],
            },
        ];
        let (ways, skipped) = resolve(pending, &nodes());
        assert!(ways.is_empty());
        assert_eq!(skipped, 2);
    }

    #[test]
    fn missing_file_is_reported() {
        let result = read_ways(
            Path::new("/nonexistent/extract.osm.pbf"),
            &HighwayFilter::default(),
        );
        assert!(matches!(result, Err(OsmError::FileNotFound(_))));
    }
}
