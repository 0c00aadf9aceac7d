//! Photo markers and their retirement during playback.
//!
//! Photos wait in a queue sorted by capture time. Each animation tick compares
//! the head of the queue, and only the head, with the timestamp of the point
//! being visited. A photo whose capture time falls between two visited points
//! by more than the threshold is never matched and stays on the map.

use std::collections::VecDeque;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    render::{MarkerId, MarkerStyle, Renderer},
    route::Coordinate,
};

mod exif;

pub use self::exif::read_photo_metadata;

/// Maximum distance between a photo's capture time and the visited point's
/// timestamp for the photo to be retired.
pub const CORRELATION_THRESHOLD: TimeDelta = TimeDelta::milliseconds(322);

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// A photo already placed on the map, waiting to be passed by the marker.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPhoto {
    pub marker: MarkerId,
    pub timestamp: DateTime<Utc>,
    pub coordinate: Coordinate,
    pub label: String,
}

/// Photo position and capture time after metadata conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedPhoto {
    pub label: String,
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
}

impl LocatedPhoto {
    /// Puts the photo on the map and returns its queue entry.
    pub fn place(self, renderer: &mut dyn Renderer) -> PendingPhoto {
        let marker = renderer.place_marker(
            self.coordinate,
            MarkerStyle::Photo {
                label: self.label.clone(),
            },
        );
        PendingPhoto {
            marker,
            timestamp: self.timestamp,
            coordinate: self.coordinate,
            label: self.label,
        }
    }
}

/// Unsigned rational as stored in EXIF GPS tags.
pub type Rational = [u32; 2];

/// GPS and capture-time tags as delivered by an external EXIF reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub gps_latitude: Option<[Rational; 3]>,
    #[serde(default)]
    pub gps_latitude_ref: Option<char>,
    #[serde(default)]
    pub gps_longitude: Option<[Rational; 3]>,
    #[serde(default)]
    pub gps_longitude_ref: Option<char>,
    /// `YYYY:MM:DD HH:MM:SS`, read as UTC.
    #[serde(default)]
    pub date_time_original: Option<String>,
}

impl PhotoMetadata {
    /// Converts the tags into a map position and capture time. Photos without
    /// GPS data are skipped; a missing or unreadable capture time falls back
    /// to `now`.
    pub fn locate(&self, now: DateTime<Utc>) -> Option<LocatedPhoto> {
        let lat = dms_to_decimal(&self.gps_latitude?, self.gps_latitude_ref.unwrap_or('N'))?;
        let lon = dms_to_decimal(&self.gps_longitude?, self.gps_longitude_ref.unwrap_or('E'))?;

        let timestamp = match self.date_time_original.as_deref().map(parse_exif_date) {
            Some(Some(parsed)) => parsed,
            Some(None) => {
                tracing::warn!(file = %self.file_name, "invalid EXIF capture date, using current time");
                now
            }
            None => now,
        };

        Some(LocatedPhoto {
            label: self.file_name.clone(),
            coordinate: Coordinate::new(lat, lon),
            timestamp,
        })
    }
}

/// Degrees, minutes, seconds rationals to signed decimal degrees. South and
/// west references are negative.
pub fn dms_to_decimal(dms: &[Rational; 3], reference: char) -> Option<f64> {
    let part = |r: &Rational| (r[1] != 0).then(|| f64::from(r[0]) / f64::from(r[1]));
    let decimal = part(&dms[0])? + part(&dms[1])? / 60.0 + part(&dms[2])? / 3600.0;
    Some(match reference.to_ascii_uppercase() {
        'S' | 'W' => -decimal,
        _ => decimal,
    })
}

pub fn parse_exif_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Ascending-by-capture-time queue of photos still on the map.
#[derive(Debug, Default)]
pub struct PhotoQueue {
    pending: VecDeque<PendingPhoto>,
}

impl PhotoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, photo: PendingPhoto) {
        self.pending.push_back(photo);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn head(&self) -> Option<&PendingPhoto> {
        self.pending.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingPhoto> {
        self.pending.iter()
    }

    /// Orders the queue by capture time. Called once when playback starts.
    pub fn sort_for_playback(&mut self) {
        self.pending
            .make_contiguous()
            .sort_by_key(|photo| photo.timestamp);
    }

    /// One correlation step against the point being visited. A matched head
    /// has its marker removed and is returned.
    pub fn correlate(
        &mut self,
        visited: Option<DateTime<Utc>>,
        renderer: &mut dyn Renderer,
    ) -> Option<PendingPhoto> {
        let visited = visited?;
        let head = self.pending.front()?;
        if (visited - head.timestamp).abs() >= CORRELATION_THRESHOLD {
            return None;
        }

        let photo = self.pending.pop_front()?;
        renderer.remove_marker(photo.marker);
        tracing::debug!(label = %photo.label, "photo passed, marker retired");
        Some(photo)
    }

    /// Removes every pending marker from the map and empties the queue.
    pub fn clear(&mut self, renderer: &mut dyn Renderer) {
        for photo in self.pending.drain(..) {
            renderer.remove_marker(photo.marker);
        }
    }
}
