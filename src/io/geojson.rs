use crate::error::{PipelineError, Result};
use crate::layers::{City, Watershed};
use crate::observation::WatershedId;
use geo::{Geometry, LineString, MultiPolygon, Point};
use geojson::{Feature, GeoJson};
use log::info;
use serde_json::Value as JsonValue;
use std::path::Path;

// Parse a GeoJSON document into its features
pub fn parse_features(content: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = content.parse()?;
    Ok(match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    })
}

pub fn read_features(path: &Path) -> Result<Vec<Feature>> {
    let content = std::fs::read_to_string(path)?;
    let features = parse_features(&content)?;
    info!("Read {} features from {}", features.len(), path.display());
    Ok(features)
}

fn to_geo(feature: Feature) -> Result<Option<Geometry<f64>>> {
    feature
        .geometry
        .map(|g| Geometry::<f64>::try_from(g.value).map_err(PipelineError::from))
        .transpose()
}

fn property_id(value: &JsonValue) -> Option<WatershedId> {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Watershed polygons keyed by the `id_property` of each feature.
pub fn to_watersheds(features: Vec<Feature>, id_property: &str) -> Result<Vec<Watershed>> {
    let mut watersheds = Vec::with_capacity(features.len());

    for (index, feature) in features.into_iter().enumerate() {
        let id = feature
            .property(id_property)
            .and_then(property_id)
            .ok_or_else(|| PipelineError::MissingWatershedId {
                index,
                property: id_property.to_string(),
            })?;

        let geometry = match to_geo(feature)? {
            Some(Geometry::Polygon(p)) => MultiPolygon(vec![p]),
            Some(Geometry::MultiPolygon(mp)) => mp,
            _ => {
                return Err(PipelineError::UnexpectedGeometry {
                    layer: format!("watershed {}", id),
                    expected: "Polygon or MultiPolygon",
                });
            }
        };

        watersheds.push(Watershed { id, geometry });
    }

    Ok(watersheds)
}

/// Flattens line and polygon features into polylines. Polygons contribute
/// their rings, so an outline layer may be stored either way.
pub fn to_lines(features: Vec<Feature>, layer: &str) -> Result<Vec<LineString<f64>>> {
    let mut lines = Vec::new();

    for feature in features {
        match to_geo(feature)? {
            Some(Geometry::LineString(ls)) => lines.push(ls),
            Some(Geometry::MultiLineString(mls)) => lines.extend(mls.0),
            Some(Geometry::Polygon(p)) => {
                let (exterior, interiors) = p.into_inner();
                lines.push(exterior);
                lines.extend(interiors);
            }
            Some(Geometry::MultiPolygon(mp)) => {
                for p in mp {
                    let (exterior, interiors) = p.into_inner();
                    lines.push(exterior);
                    lines.extend(interiors);
                }
            }
            None => continue,
            Some(_) => {
                return Err(PipelineError::UnexpectedGeometry {
                    layer: layer.to_string(),
                    expected: "LineString or Polygon",
                });
            }
        }
    }

    Ok(lines)
}

pub fn to_cities(features: Vec<Feature>, name_property: &str) -> Result<Vec<City>> {
    let mut cities = Vec::new();

    for feature in features {
        let name = feature
            .property(name_property)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let points: Vec<Point<f64>> = match to_geo(feature)? {
            Some(Geometry::Point(p)) => vec![p],
            Some(Geometry::MultiPoint(mp)) => mp.0,
            None => continue,
            Some(_) => {
                return Err(PipelineError::UnexpectedGeometry {
                    layer: "cities".to_string(),
                    expected: "Point",
                });
            }
        };

        cities.extend(points.into_iter().map(|location| City {
            name: name.clone(),
            location,
        }));
    }

    Ok(cities)
}
