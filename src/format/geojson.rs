//! GeoJSON FeatureCollection conversion for the shape list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::error::FormatError;
use crate::geometry::{Position, ShapeGeometry};
use crate::model::{Properties, Shape};

#[derive(Debug, Serialize, Deserialize)]
struct FeatureCollectionDoc {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FeatureDoc {
    #[serde(rename = "type")]
    kind: String,
    geometry: GeometryDoc,
    #[serde(default)]
    properties: Option<Properties>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeometryDoc {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

/// Serialize the current shapes into a GeoJSON FeatureCollection.
pub fn shapes_to_geojson(shapes: &[Shape]) -> Result<String, FormatError> {
    let doc = FeatureCollectionDoc {
        kind: "FeatureCollection".to_string(),
        features: shapes
            .iter()
            .map(|shape| FeatureDoc {
                kind: "Feature".to_string(),
                geometry: geometry_to_doc(&shape.geometry),
                properties: Some(shape.properties.clone()),
            })
            .collect(),
    };
    log::debug!("📤 Exporting {} feature(s)", doc.features.len());
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parse a GeoJSON FeatureCollection into the payload for repopulating
/// the collection (see `ShapeCollection::replace_shapes`).
pub fn shapes_from_geojson(json: &str) -> Result<Vec<(ShapeGeometry, Properties)>, FormatError> {
    let doc: FeatureCollectionDoc = serde_json::from_str(json)?;
    if doc.kind != "FeatureCollection" {
        return Err(FormatError::InvalidDocument {
            message: format!("expected a FeatureCollection, got '{}'", doc.kind),
        });
    }
    doc.features
        .into_iter()
        .map(|feature| {
            if feature.kind != "Feature" {
                return Err(FormatError::InvalidDocument {
                    message: format!("expected a Feature, got '{}'", feature.kind),
                });
            }
            let geometry = geometry_from_doc(feature.geometry)?;
            Ok((geometry, feature.properties.unwrap_or_default()))
        })
        .collect()
}

fn position_to_pair(p: &Position) -> [f64; 2] {
    [p.x, p.y]
}

fn geometry_to_doc(geometry: &ShapeGeometry) -> GeometryDoc {
    let (kind, coordinates) = match geometry {
        ShapeGeometry::Point(p) => ("Point", serde_json::json!(position_to_pair(p))),
        ShapeGeometry::LineString(points) => (
            "LineString",
            serde_json::json!(points.iter().map(position_to_pair).collect::<Vec<_>>()),
        ),
        ShapeGeometry::Polygon(rings) => (
            "Polygon",
            serde_json::json!(
                rings
                    .iter()
                    .map(|ring| ring.iter().map(position_to_pair).collect::<Vec<_>>())
                    .collect::<Vec<_>>()
            ),
        ),
    };
    GeometryDoc {
        kind: kind.to_string(),
        coordinates,
    }
}

fn geometry_from_doc(doc: GeometryDoc) -> Result<ShapeGeometry, FormatError> {
    match doc.kind.as_str() {
        "Point" => {
            let pair: [f64; 2] = parse_coordinates(doc.coordinates)?;
            Ok(ShapeGeometry::Point(Position::new(pair[0], pair[1])))
        }
        "LineString" => {
            let pairs: Vec<[f64; 2]> = parse_coordinates(doc.coordinates)?;
            if pairs.len() < 2 {
                return Err(FormatError::InvalidCoordinates {
                    message: format!("LineString needs at least 2 positions, got {}", pairs.len()),
                });
            }
            Ok(ShapeGeometry::LineString(
                pairs.iter().map(|[x, y]| Position::new(*x, *y)).collect(),
            ))
        }
        "Polygon" => {
            let rings: Vec<Vec<[f64; 2]>> = parse_coordinates(doc.coordinates)?;
            if rings.is_empty() {
                return Err(FormatError::InvalidCoordinates {
                    message: "Polygon needs at least one ring".to_string(),
                });
            }
            let rings = rings
                .into_iter()
                .map(|pairs| {
                    let mut ring: Vec<Position> =
                        pairs.iter().map(|[x, y]| Position::new(*x, *y)).collect();
                    // Tolerate unclosed rings by closing them
                    if let Some(first) = ring.first().copied() {
                        if ring.last() != Some(&first) {
                            ring.push(first);
                        }
                    }
                    if ring.len() < 4 {
                        return Err(FormatError::InvalidCoordinates {
                            message: format!(
                                "Polygon ring needs at least 3 distinct positions, got {}",
                                ring.len().saturating_sub(1)
                            ),
                        });
                    }
                    Ok(ring)
                })
                .collect::<Result<Vec<_>, FormatError>>()?;
            Ok(ShapeGeometry::Polygon(rings))
        }
        other => Err(FormatError::UnsupportedGeometry {
            geometry_type: other.to_string(),
        }),
    }
}

fn parse_coordinates<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, FormatError> {
    serde_json::from_value(value).map_err(|e| FormatError::InvalidCoordinates {
        message: e.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
