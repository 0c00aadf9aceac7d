use serde::{Deserialize, Serialize};

use crate::{mapping::SpeedUnit, route::Route};

/// Aggregate metrics over a whole route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStatistics {
    pub total_points: usize,
    /// Sum of great-circle distances between consecutive points, in metres.
    pub total_distance_m: f64,
    /// Seconds between the earliest and latest timestamp.
    pub duration_secs: f64,
    /// Metres per second, averaged over samples that carry a speed.
    pub avg_speed: f64,
    pub max_speed: f64,
    pub avg_heart_rate: f64,
}

impl RouteStatistics {
    pub fn compute(route: &Route) -> Self {
        let points = route.points();
        if points.is_empty() {
            return Self::default();
        }

        let total_distance_m = points
            .windows(2)
            .map(|pair| pair[0].coordinate.distance_to(&pair[1].coordinate))
            .sum();

        let mut times = points.iter().filter_map(|p| p.timestamp);
        let duration_secs = match times.next() {
            Some(first) => {
                let (min, max) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
                (max - min).num_milliseconds() as f64 / 1000.0
            }
            None => 0.0,
        };

        let speeds: Vec<f64> = points.iter().filter_map(|p| p.speed).collect();
        let heart_rates: Vec<f64> = points
            .iter()
            .filter_map(|p| p.heart_rate.map(f64::from))
            .collect();

        Self {
            total_points: points.len(),
            total_distance_m,
            duration_secs,
            avg_speed: mean(&speeds),
            max_speed: speeds.iter().copied().fold(0.0, f64::max),
            avg_heart_rate: mean(&heart_rates),
        }
    }

    /// Lines of the information panel, formatted for the chosen speed unit.
    pub fn summary_lines(&self, unit: SpeedUnit) -> Vec<String> {
        let total = self.duration_secs.max(0.0) as u64;
        vec![
            format!("Total Points: {}", self.total_points),
            format!("Total Distance: {:.2} km", self.total_distance_m / 1000.0),
            format!(
                "Duration: {}h {}m {}s",
                total / 3600,
                (total % 3600) / 60,
                total % 60
            ),
            format!("Avg Speed: {}", unit.format(self.avg_speed)),
            format!("Max Speed: {}", unit.format(self.max_speed)),
            format!("Avg Heart Rate: {:.0} bpm", self.avg_heart_rate),
        ]
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::route::{Coordinate, RoutePoint};

    fn point(lat: f64, secs: i64, speed: Option<f64>, hr: Option<u16>) -> RoutePoint {
        RoutePoint {
            timestamp: Some(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()),
            speed,
            heart_rate: hr,
            ..RoutePoint::at(Coordinate::new(lat, 0.0))
        }
    }

    #[test]
    fn aggregates_route_metrics() {
        let route = Route::new(vec![
            point(0.0, 0, Some(2.0), Some(100)),
            point(0.01, 3725, Some(6.0), None),
            point(0.02, 7450, None, Some(140)),
        ]);

        let stats = RouteStatistics::compute(&route);
        assert_eq!(stats.total_points, 3);
        assert!((stats.total_distance_m - 2_223.9).abs() < 5.0);
        assert_eq!(stats.duration_secs, 7450.0);
        assert_eq!(stats.avg_speed, 4.0);
        assert_eq!(stats.max_speed, 6.0);
        assert_eq!(stats.avg_heart_rate, 120.0);

        let lines = stats.summary_lines(SpeedUnit::Kmh);
        assert_eq!(lines[2], "Duration: 2h 4m 10s");
        assert_eq!(lines[3], "Avg Speed: 14.4 km/h");
        assert_eq!(lines[5], "Avg Heart Rate: 120 bpm");
    }

    #[test]
    fn empty_route_yields_zeroes() {
        let stats = RouteStatistics::compute(&Route::default());
        assert_eq!(stats, RouteStatistics::default());
    }
}
