use std::fmt;

use serde::{Deserialize, Serialize};

const MS_TO_KMH: f64 = 3.6;
const KMH_TO_MPH: f64 = 0.621371;

/// Unit used when speeds are shown to the operator. Colour mapping always
/// works in km/h regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Kmh,
    Mph,
}

impl SpeedUnit {
    pub fn label(&self) -> &'static str {
        match self {
            SpeedUnit::Kmh => "km/h",
            SpeedUnit::Mph => "mph",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SpeedUnit::Kmh => SpeedUnit::Mph,
            SpeedUnit::Mph => SpeedUnit::Kmh,
        }
    }

    /// Converts metres per second into this unit.
    pub fn convert(&self, speed_ms: f64) -> f64 {
        let kmh = speed_ms * MS_TO_KMH;
        match self {
            SpeedUnit::Kmh => kmh,
            SpeedUnit::Mph => kmh * KMH_TO_MPH,
        }
    }

    pub fn format(&self, speed_ms: f64) -> String {
        format!("{:.1} {}", self.convert(speed_ms), self.label())
    }
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One entry of the speed legend. `upper_kmh` is exclusive; the last bucket
/// is open ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBucket {
    pub upper_kmh: Option<f64>,
    pub color: Color,
}

impl SpeedBucket {
    pub fn label(&self, previous_upper: Option<f64>) -> String {
        match (previous_upper, self.upper_kmh) {
            (None, Some(upper)) => format!("< {upper} km/h"),
            (Some(lower), Some(upper)) => format!("{lower}-{upper} km/h"),
            (Some(lower), None) => format!("{lower}+ km/h"),
            (None, None) => "any".to_string(),
        }
    }
}

/// Cold to hot palette shared by the heatmap, the point markers and the
/// animated trail. The shown legend depends on these exact values.
pub const SPEED_LEGEND: [SpeedBucket; 9] = [
    SpeedBucket { upper_kmh: Some(5.0), color: Color::rgb(0x31, 0x36, 0x95) },
    SpeedBucket { upper_kmh: Some(10.0), color: Color::rgb(0x45, 0x75, 0xb4) },
    SpeedBucket { upper_kmh: Some(15.0), color: Color::rgb(0x74, 0xad, 0xd1) },
    SpeedBucket { upper_kmh: Some(20.0), color: Color::rgb(0xab, 0xd9, 0xe9) },
    SpeedBucket { upper_kmh: Some(25.0), color: Color::rgb(0xe0, 0xf3, 0xf8) },
    SpeedBucket { upper_kmh: Some(30.0), color: Color::rgb(0xfe, 0xe0, 0x90) },
    SpeedBucket { upper_kmh: Some(35.0), color: Color::rgb(0xfd, 0xae, 0x61) },
    SpeedBucket { upper_kmh: Some(40.0), color: Color::rgb(0xf4, 0x6d, 0x43) },
    SpeedBucket { upper_kmh: None, color: Color::rgb(0xd7, 0x30, 0x27) },
];

/// Index into [`SPEED_LEGEND`] for a speed in metres per second.
pub fn speed_bucket(speed_ms: f64) -> usize {
    let kmh = speed_ms * MS_TO_KMH;
    SPEED_LEGEND
        .iter()
        .position(|bucket| match bucket.upper_kmh {
            Some(upper) => kmh < upper,
            None => true,
        })
        .unwrap_or(SPEED_LEGEND.len() - 1)
}

pub fn speed_color(speed_ms: f64) -> Color {
    SPEED_LEGEND[speed_bucket(speed_ms)].color
}

/// Legend rows as `(label, colour)` pairs, lowest speeds first.
pub fn legend_entries() -> Vec<(String, Color)> {
    let mut previous = None;
    SPEED_LEGEND
        .iter()
        .map(|bucket| {
            let label = bucket.label(previous);
            previous = bucket.upper_kmh;
            (label, bucket.color)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(kmh: f64) -> f64 {
        kmh / MS_TO_KMH
    }

    #[test]
    fn bucket_edges_are_exclusive_upper_bounds() {
        assert_eq!(speed_color(0.0).to_hex(), "#313695");
        assert_eq!(speed_color(ms(4.99)).to_hex(), "#313695");
        assert_eq!(speed_color(ms(5.0)).to_hex(), "#4575b4");
        assert_eq!(speed_color(ms(22.0)).to_hex(), "#e0f3f8");
        assert_eq!(speed_color(ms(39.9)).to_hex(), "#f46d43");
        assert_eq!(speed_color(ms(40.0)).to_hex(), "#d73027");
        assert_eq!(speed_color(ms(120.0)).to_hex(), "#d73027");
    }

    #[test]
    fn colours_are_constant_within_a_bucket_and_ordered_across() {
        for (lower, upper) in [(0.0, 5.0), (10.0, 15.0), (35.0, 40.0)] {
            let a = speed_color(ms(lower + 0.1));
            let b = speed_color(ms(upper - 0.1));
            assert_eq!(a, b);
        }

        let mut last = 0;
        for kmh in 0..80 {
            let bucket = speed_bucket(ms(kmh as f64));
            assert!(bucket >= last);
            last = bucket;
        }
        assert_eq!(last, SPEED_LEGEND.len() - 1);
    }

    #[test]
    fn formats_in_selected_unit() {
        assert_eq!(SpeedUnit::Kmh.format(10.0), "36.0 km/h");
        assert_eq!(SpeedUnit::Mph.format(10.0), "22.4 mph");
        assert_eq!(SpeedUnit::Kmh.toggled(), SpeedUnit::Mph);
    }

    #[test]
    fn legend_labels_cover_both_catch_alls() {
        let legend = legend_entries();
        assert_eq!(legend.len(), 9);
        assert_eq!(legend[0].0, "< 5 km/h");
        assert_eq!(legend[1].0, "5-10 km/h");
        assert_eq!(legend[8].0, "40+ km/h");
    }
}
