//! GeoJSON documents served by the two feeds and the domain features parsed
//! out of them.
//!
//! Parsing is deliberately lenient: entries whose geometry does not fit the
//! feed are dropped, and only a document yielding nothing usable is an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::FeedError;

/// Geographic position in `(lat, lon)` order, as the map expects it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// GeoJSON stores `[lon, lat, ...]`.
    fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lon, lat, ..] => Some(Self::new(*lat, *lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection<P> {
    #[serde(default)]
    features: Vec<RawFeature<P>>,
}

#[derive(Debug, Deserialize)]
struct RawFeature<P> {
    #[serde(default)]
    properties: Option<P>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

enum Geometry {
    Point(Vec<f64>),
    LineString(Vec<Vec<f64>>),
    MultiLineString(Vec<Vec<Vec<f64>>>),
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

impl RawGeometry {
    /// Geometry kinds the map cannot draw, or coordinates of the wrong shape,
    /// yield `None`.
    fn decode(self) -> Option<Geometry> {
        let coordinates = self.coordinates;
        match self.kind.as_str() {
            "Point" => serde_json::from_value(coordinates).ok().map(Geometry::Point),
            "LineString" => serde_json::from_value(coordinates)
                .ok()
                .map(Geometry::LineString),
            "MultiLineString" => serde_json::from_value(coordinates)
                .ok()
                .map(Geometry::MultiLineString),
            "Polygon" => serde_json::from_value(coordinates).ok().map(Geometry::Polygon),
            "MultiPolygon" => serde_json::from_value(coordinates)
                .ok()
                .map(Geometry::MultiPolygon),
            _ => None,
        }
    }
}

/// Descriptive properties of one USGS event. Any field may be null upstream.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct QuakeProperties {
    #[serde(default)]
    pub mag: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    /// Epoch milliseconds, UTC.
    #[serde(default)]
    pub time: Option<i64>,
}

/// A single seismic event from the earthquake feed.
#[derive(Clone, Debug, PartialEq)]
pub struct EarthquakeFeature {
    pub position: LatLng,
    pub depth_km: Option<f64>,
    /// `None` when the feed entry carried no `properties` object at all.
    pub properties: Option<QuakeProperties>,
}

impl EarthquakeFeature {
    pub fn magnitude(&self) -> Option<f64> {
        self.properties.as_ref().and_then(|props| props.mag)
    }

    pub fn occurred_at(&self) -> Option<i64> {
        self.properties.as_ref().and_then(|props| props.time)
    }
}

/// One connected path of a plate boundary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaultLineFeature {
    pub name: Option<String>,
    pub vertices: Vec<LatLng>,
}

/// Parse the earthquake feed, keeping every entry with a point geometry.
pub fn parse_earthquakes(document: &str) -> Result<Vec<EarthquakeFeature>, FeedError> {
    let collection: FeatureCollection<QuakeProperties> = serde_json::from_str(document)?;
    let total = collection.features.len();

    let features: Vec<EarthquakeFeature> = collection
        .features
        .into_iter()
        .filter_map(|raw| {
            let Some(Geometry::Point(coordinates)) = raw.geometry.and_then(RawGeometry::decode)
            else {
                return None;
            };
            let position = LatLng::from_position(&coordinates)?;
            Some(EarthquakeFeature {
                position,
                depth_km: coordinates.get(2).copied(),
                properties: raw.properties,
            })
        })
        .collect();

    if features.len() < total {
        debug!(
            "Skipped {} earthquake entries without a point geometry",
            total - features.len()
        );
    }
    if features.is_empty() {
        return Err(FeedError::Empty { kind: "earthquake" });
    }
    Ok(features)
}

/// Parse the plate boundary feed into one feature per connected path.
///
/// Polygon rings are traced as closed lines, so a plate outline feed renders
/// the same way as a boundary feed.
pub fn parse_fault_lines(document: &str) -> Result<Vec<FaultLineFeature>, FeedError> {
    let collection: FeatureCollection<Value> = serde_json::from_str(document)?;

    let mut lines = Vec::new();
    for raw in collection.features {
        let name = raw.properties.as_ref().and_then(feature_name);
        let paths = match raw.geometry.and_then(RawGeometry::decode) {
            Some(Geometry::LineString(path)) => vec![path],
            Some(Geometry::MultiLineString(paths)) | Some(Geometry::Polygon(paths)) => paths,
            Some(Geometry::MultiPolygon(polygons)) => polygons.into_iter().flatten().collect(),
            _ => continue,
        };
        for path in paths {
            let vertices: Vec<LatLng> = path
                .iter()
                .filter_map(|position| LatLng::from_position(position))
                .collect();
            if vertices.len() >= 2 {
                lines.push(FaultLineFeature {
                    name: name.clone(),
                    vertices,
                });
            }
        }
    }

    if lines.is_empty() {
        return Err(FeedError::Empty { kind: "fault line" });
    }
    Ok(lines)
}

fn feature_name(properties: &Value) -> Option<String> {
    ["Name", "name", "PlateName", "LAYER"]
        .iter()
        .find_map(|key| properties.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
