use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

mod fit;

pub use fit::FitRecordDecoder;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in metres.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance_m(self.lat, self.lon, other.lat, other.lon)
    }
}

/// One sample along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub coordinate: Coordinate,
    pub timestamp: Option<DateTime<Utc>>,
    /// Metres per second.
    pub speed: Option<f64>,
    pub heart_rate: Option<u16>,
    /// Metres above sea level.
    pub elevation: Option<f64>,
    /// Cumulative metres from the start of the route.
    pub distance: Option<f64>,
    pub temperature: Option<f64>,
}

impl RoutePoint {
    pub fn at(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            timestamp: None,
            speed: None,
            heart_rate: None,
            elevation: None,
            distance: None,
            temperature: None,
        }
    }
}

/// Ordered, immutable sequence of route points. A new file load replaces the
/// whole route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    points: Vec<RoutePoint>,
}

impl Route {
    pub fn new(points: Vec<RoutePoint>) -> Self {
        let route = Self { points };
        if !route.is_time_ordered() {
            tracing::warn!(
                points = route.len(),
                "route timestamps are not monotonic, playback follows file order"
            );
        }
        route
    }

    /// Converts a stream of decoded records, skipping samples without a fix.
    pub fn from_records(records: impl IntoIterator<Item = TrackRecord>) -> Self {
        let mut skipped = 0usize;
        let points: Vec<RoutePoint> = records
            .into_iter()
            .filter_map(|record| {
                let point = record.into_point();
                if point.is_none() {
                    skipped += 1;
                }
                point
            })
            .collect();
        if skipped > 0 {
            tracing::debug!(skipped, "dropped records without a position");
        }
        Self::new(points)
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.points.iter().map(|p| p.coordinate).collect()
    }

    pub fn is_time_ordered(&self) -> bool {
        self.points
            .windows(2)
            .all(|pair| match (pair[0].timestamp, pair[1].timestamp) {
                (Some(a), Some(b)) => a <= b,
                _ => true,
            })
    }
}

/// A record produced by an external fitness-file decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub position_lat: Option<f64>,
    #[serde(default)]
    pub position_long: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Metres per second.
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heart_rate: Option<u16>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl TrackRecord {
    pub fn into_point(self) -> Option<RoutePoint> {
        let lat = self.position_lat.filter(|v| v.is_finite())?;
        let lon = self.position_long.filter(|v| v.is_finite())?;
        Some(RoutePoint {
            coordinate: Coordinate::new(lat, lon),
            timestamp: self.timestamp,
            speed: self.speed,
            heart_rate: self.heart_rate,
            elevation: self.altitude,
            distance: self.distance,
            temperature: self.temperature,
        })
    }
}

/// Capability boundary for fitness-file decoders.
pub trait RecordDecoder {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<TrackRecord>>;

    fn decode_route(&self, bytes: &[u8]) -> Result<Route> {
        let records = self.parse(bytes)?;
        let route = Route::from_records(records);
        tracing::info!(points = route.len(), "route decoded");
        Ok(route)
    }
}

/// Decoder for a JSON array of already-decoded records.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRecordDecoder;

impl RecordDecoder for JsonRecordDecoder {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<TrackRecord>> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_records_and_skips_missing_fixes() {
        let json = br#"[
            {"timestamp": "2024-05-01T08:00:00Z", "position_lat": 45.0, "position_long": 6.0,
             "speed": 4.2, "heart_rate": 120, "altitude": 350.5, "distance": 0.0},
            {"timestamp": "2024-05-01T08:00:01Z", "speed": 4.0},
            {"timestamp": "2024-05-01T08:00:02Z", "position_lat": 45.0001, "position_long": 6.0001}
        ]"#;

        let route = JsonRecordDecoder.decode_route(json).unwrap();
        assert_eq!(route.len(), 2);
        let first = &route.points()[0];
        assert_eq!(first.heart_rate, Some(120));
        assert_eq!(first.elevation, Some(350.5));
        assert!(route.points()[1].speed.is_none());
        assert!(route.is_time_ordered());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(JsonRecordDecoder.parse(b"{not json").is_err());
    }

    #[test]
    fn haversine_matches_known_distance() {
        // One degree of latitude is roughly 111.2 km.
        let d = haversine_distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 50.0);
        assert_eq!(haversine_distance_m(10.0, 10.0, 10.0, 10.0), 0.0);
    }
}
