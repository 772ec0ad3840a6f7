//! Conversion between `GeoJSON` documents and `geo` geometries.

use geo::{BooleanOps, Geometry, LineString, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};

use crate::GeometryError;

/// Parses a `GeoJSON` document into its geometries.
///
/// Accepts a `FeatureCollection`, a single `Feature` or a bare geometry.
/// Features without a geometry are skipped.
///
/// # Errors
///
/// * If the text is not valid `GeoJSON`
/// * If a geometry cannot be converted
pub fn read_geometries(text: &str) -> Result<Vec<Geometry<f64>>, GeometryError> {
    let document: GeoJson = text.parse()?;
    geometries_from_geojson(document)
}

/// Extracts the geometries of a parsed `GeoJSON` document.
///
/// # Errors
///
/// * If a geometry cannot be converted
pub fn geometries_from_geojson(document: GeoJson) -> Result<Vec<Geometry<f64>>, GeometryError> {
    let geometries = match document {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .collect(),
        GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
        GeoJson::Geometry(geometry) => vec![geometry],
    };

    let mut converted = Vec::with_capacity(geometries.len());
    for geometry in geometries {
        converted.push(Geometry::<f64>::try_from(geometry)?);
    }
    Ok(converted)
}

/// Parses a single `GeoJSON` geometry, as stored in a layer table.
///
/// # Errors
///
/// * If the text is not a valid `GeoJSON` geometry
pub fn geometry_from_text(text: &str) -> Result<Geometry<f64>, GeometryError> {
    match text.parse::<GeoJson>()? {
        GeoJson::Geometry(geometry) => Ok(Geometry::try_from(geometry)?),
        other => Err(GeometryError::Conversion {
            message: format!("expected a GeoJSON geometry, got {}", kind_of(&other)),
        }),
    }
}

/// Serializes a line as a `GeoJSON` geometry string.
#[must_use]
pub fn line_to_text(line: &LineString<f64>) -> String {
    geojson::Geometry::new(geojson::Value::from(line)).to_string()
}

/// Merges every polygon among `geometries` into one boundary.
///
/// Non-polygonal geometries are ignored. Returns an empty multipolygon if
/// there are none.
#[must_use]
pub fn boundary_from_geometries<I>(geometries: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = Geometry<f64>>,
{
    let mut polygons = Vec::new();
    for geometry in geometries {
        collect_polygons(geometry, &mut polygons);
    }

    let mut parts = polygons.into_iter();
    let Some(first) = parts.next() else {
        return MultiPolygon::new(Vec::new());
    };
    parts.fold(first, |boundary, part| boundary.union(&part))
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<MultiPolygon<f64>>) {
    match geometry {
        Geometry::Polygon(polygon) => out.push(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => out.push(multi),
        Geometry::Rect(rect) => out.push(MultiPolygon::new(vec![rect.to_polygon()])),
        Geometry::Triangle(triangle) => out.push(MultiPolygon::new(vec![triangle.to_polygon()])),
        Geometry::GeometryCollection(collection) => {
            for part in collection.0 {
                collect_polygons(part, out);
            }
        }
        Geometry::Point(_)
        | Geometry::Line(_)
        | Geometry::LineString(_)
        | Geometry::MultiPoint(_)
        | Geometry::MultiLineString(_) => {}
    }
}

/// Builds a feature collection with one feature per line, all sharing
/// `properties`.
#[must_use]
pub fn feature_collection(lines: &[LineString<f64>], properties: &JsonObject) -> FeatureCollection {
    let features = lines
        .iter()
        .map(|line| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(line))),
            id: None,
            properties: Some(properties.clone()),
            foreign_members: None,
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

const fn kind_of(document: &GeoJson) -> &'static str {
    match document {
        GeoJson::Geometry(_) => "Geometry",
        GeoJson::Feature(_) => "Feature",
        GeoJson::FeatureCollection(_) => "FeatureCollection",
    }
}
