//! `GeoJSON` region and land-cover layers.
//!
//! Layers are read as a `FeatureCollection`. Polygon and multi-polygon
//! geometries are kept; anything else (points, lines, missing geometry)
//! becomes an empty multi-polygon so the engine rejects or skips it with
//! the usual geometry error instead of the feature silently vanishing.

use geo::{Geometry, MultiPolygon};
use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue, feature::Id};
use ward_cover_geometry::{CrsTag, multi_polygon_area};
use ward_cover_models::{FeatureId, FeatureInput, RegionId, RegionInput};

use crate::{AreaUnit, IoError};

/// Attribute names used to read a region layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFields {
    pub id_field: String,
    pub name_field: String,
    /// Attribute holding an area published with the data, checked against
    /// the computed area but never used in its place.
    pub declared_area: Option<(String, AreaUnit)>,
}

/// Attribute names used to read a land-cover layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFields {
    pub id_field: Option<String>,
}

/// Relative difference above which a declared area is reported.
const DECLARED_AREA_TOLERANCE: f64 = 0.01;

/// A parsed `GeoJSON` layer and the CRS it declares, if any.
#[derive(Debug, Clone)]
pub struct Layer<T> {
    pub items: Vec<T>,
    pub crs: Option<CrsTag>,
}

fn parse_collection(text: &str) -> Result<FeatureCollection, IoError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(IoError::NotFeatureCollection { found: "Feature" }),
        GeoJson::Geometry(_) => Err(IoError::NotFeatureCollection { found: "Geometry" }),
    }
}

/// Parses a region layer.
///
/// Regions without an id attribute fall back to the `GeoJSON` feature id,
/// then to their position in the collection.
///
/// # Errors
///
/// * [`IoError::GeoJson`] if `text` is not valid `GeoJSON`
/// * [`IoError::NotFeatureCollection`] if it is not a `FeatureCollection`
pub fn parse_regions(text: &str, fields: &RegionFields) -> Result<Layer<RegionInput>, IoError> {
    let collection = parse_collection(text)?;
    let crs = declared_crs(collection.foreign_members.as_ref());

    let items: Vec<RegionInput> = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(position, feature)| {
            let id = attribute(feature.properties.as_ref(), &fields.id_field)
                .or_else(|| feature.id.as_ref().map(id_string))
                .unwrap_or_else(|| {
                    log::warn!("Region #{position} has no {} attribute", fields.id_field);
                    format!("#{position}")
                });
            let name = attribute(feature.properties.as_ref(), &fields.name_field)
                .unwrap_or_else(|| id.clone());
            let boundary = polygonal(feature.geometry, &id);

            if let Some((field, unit)) = &fields.declared_area
                && let Some(declared) = number(feature.properties.as_ref(), field)
            {
                check_declared_area(&id, &boundary, declared * unit.square_metres());
            }

            RegionInput {
                id: RegionId::from(id),
                name,
                boundary,
            }
        })
        .collect();

    log::info!("Parsed {} regions", items.len());

    Ok(Layer { items, crs })
}

/// Parses a land-cover layer.
///
/// # Errors
///
/// * [`IoError::GeoJson`] if `text` is not valid `GeoJSON`
/// * [`IoError::NotFeatureCollection`] if it is not a `FeatureCollection`
pub fn parse_features(text: &str, fields: &FeatureFields) -> Result<Layer<FeatureInput>, IoError> {
    let collection = parse_collection(text)?;
    let crs = declared_crs(collection.foreign_members.as_ref());

    let items: Vec<FeatureInput> = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(position, feature)| {
            let id = fields
                .id_field
                .as_ref()
                .and_then(|field| attribute(feature.properties.as_ref(), field))
                .or_else(|| feature.id.as_ref().map(id_string))
                .unwrap_or_else(|| format!("#{position}"));
            let geometry = polygonal(feature.geometry, &id);

            FeatureInput {
                id: FeatureId::from(id),
                geometry,
            }
        })
        .collect();

    log::debug!("Parsed {} features", items.len());

    Ok(Layer { items, crs })
}

/// The legacy `crs` member (`{"type": "name", "properties": {"name": ..}}`).
fn declared_crs(members: Option<&JsonObject>) -> Option<CrsTag> {
    let name = members?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    Some(CrsTag::new(name))
}

fn polygonal(geometry: Option<geojson::Geometry>, id: &str) -> MultiPolygon<f64> {
    let Some(geometry) = geometry else {
        log::debug!("Feature {id} has no geometry");
        return MultiPolygon::new(vec![]);
    };

    match Geometry::<f64>::try_from(geometry) {
        Ok(Geometry::MultiPolygon(shape)) => shape,
        Ok(Geometry::Polygon(polygon)) => MultiPolygon::new(vec![polygon]),
        Ok(_) => {
            log::debug!("Feature {id} is not polygonal");
            MultiPolygon::new(vec![])
        }
        Err(e) => {
            log::debug!("Feature {id} geometry could not be converted: {e}");
            MultiPolygon::new(vec![])
        }
    }
}

fn attribute(properties: Option<&JsonObject>, field: &str) -> Option<String> {
    match properties?.get(field)? {
        JsonValue::String(value) => Some(value.clone()),
        JsonValue::Number(value) => Some(value.to_string()),
        JsonValue::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

fn number(properties: Option<&JsonObject>, field: &str) -> Option<f64> {
    match properties?.get(field)? {
        JsonValue::Number(value) => value.as_f64(),
        JsonValue::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

fn id_string(id: &Id) -> String {
    match id {
        Id::String(value) => value.clone(),
        Id::Number(value) => value.to_string(),
    }
}

/// Warns when a published area disagrees with the boundary.
fn check_declared_area(id: &str, boundary: &MultiPolygon<f64>, declared: f64) {
    let computed = multi_polygon_area(boundary);
    if computed <= 0.0 || !declared.is_finite() {
        return;
    }

    let difference = (declared - computed).abs() / computed;
    if difference > DECLARED_AREA_TOLERANCE {
        log::warn!(
            "Region {id}: declared area {declared} differs from computed {computed} by {:.1}%",
            difference * 100.0
        );
    }
}
