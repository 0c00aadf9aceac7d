use std::io::Cursor;

use exif::{Field, In, Reader, Tag, Value};

use super::{PhotoMetadata, Rational};
use crate::{FlyoverError, Result};

/// Reads GPS and capture-time tags from a JPEG, TIFF, HEIF or PNG container.
/// Images without EXIF data fail; images without GPS tags produce metadata
/// that [`PhotoMetadata::locate`] skips.
pub fn read_photo_metadata(file_name: &str, bytes: &[u8]) -> Result<PhotoMetadata> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .map_err(|err| FlyoverError::Decode(format!("{file_name}: {err}")))?;
    let metadata = metadata_from_fields(file_name, exif.fields());
    tracing::debug!(
        file = file_name,
        has_gps = metadata.gps_latitude.is_some() && metadata.gps_longitude.is_some(),
        "EXIF read"
    );
    Ok(metadata)
}

fn metadata_from_fields<'a>(
    file_name: &str,
    fields: impl IntoIterator<Item = &'a Field>,
) -> PhotoMetadata {
    let mut meta = PhotoMetadata {
        file_name: file_name.to_string(),
        ..Default::default()
    };
    for field in fields.into_iter().filter(|f| f.ifd_num == In::PRIMARY) {
        let tag = field.tag;
        if tag == Tag::GPSLatitude {
            meta.gps_latitude = dms(&field.value);
        } else if tag == Tag::GPSLatitudeRef {
            meta.gps_latitude_ref = ascii(&field.value).and_then(|s| s.chars().next());
        } else if tag == Tag::GPSLongitude {
            meta.gps_longitude = dms(&field.value);
        } else if tag == Tag::GPSLongitudeRef {
            meta.gps_longitude_ref = ascii(&field.value).and_then(|s| s.chars().next());
        } else if tag == Tag::DateTimeOriginal {
            meta.date_time_original = ascii(&field.value);
        }
    }
    meta
}

fn dms(value: &Value) -> Option<[Rational; 3]> {
    match value {
        Value::Rational(parts) if parts.len() >= 3 => Some([
            [parts[0].num, parts[0].denom],
            [parts[1].num, parts[1].denom],
            [parts[2].num, parts[2].denom],
        ]),
        _ => None,
    }
}

fn ascii(value: &Value) -> Option<String> {
    let Value::Ascii(lines) = value else {
        return None;
    };
    let text = String::from_utf8_lossy(lines.first()?);
    let text = text.trim_end_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    fn rationals(parts: [(u32, u32); 3]) -> Value {
        Value::Rational(parts.into_iter().map(exif::Rational::from).collect())
    }

    #[test]
    fn extracts_gps_and_capture_time() {
        let fields = [
            field(Tag::GPSLatitude, rationals([(48, 1), (51, 1), (2952, 100)])),
            field(Tag::GPSLatitudeRef, Value::Ascii(vec![b"N".to_vec()])),
            field(Tag::GPSLongitude, rationals([(2, 1), (17, 1), (4020, 100)])),
            field(Tag::GPSLongitudeRef, Value::Ascii(vec![b"W".to_vec()])),
            field(
                Tag::DateTimeOriginal,
                Value::Ascii(vec![b"2024:06:02 09:15:00".to_vec()]),
            ),
            field(Tag::Make, Value::Ascii(vec![b"Camera".to_vec()])),
        ];
        let meta = metadata_from_fields("IMG_0042.jpg", &fields);
        assert_eq!(meta.file_name, "IMG_0042.jpg");
        assert_eq!(meta.gps_longitude_ref, Some('W'));

        let located = meta.locate(Utc::now()).unwrap();
        assert!((located.coordinate.lat - 48.8582).abs() < 1e-4);
        assert!((located.coordinate.lon + 2.2945).abs() < 1e-4);
        assert_eq!(
            located.timestamp,
            Utc.with_ymd_and_hms(2024, 6, 2, 9, 15, 0).unwrap()
        );
    }

    #[test]
    fn thumbnail_tags_and_short_values_are_ignored() {
        let fields = [
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::THUMBNAIL,
                value: rationals([(1, 1), (0, 1), (0, 1)]),
            },
            field(
                Tag::GPSLongitude,
                Value::Rational(vec![exif::Rational::from((2, 1))]),
            ),
            field(Tag::DateTimeOriginal, Value::Ascii(vec![b"\0".to_vec()])),
        ];
        let meta = metadata_from_fields("thumb.jpg", &fields);
        assert!(meta.gps_latitude.is_none());
        assert!(meta.gps_longitude.is_none());
        assert!(meta.date_time_original.is_none());
    }

    #[test]
    fn images_without_exif_fail_to_decode() {
        let err = read_photo_metadata("blank.jpg", b"not an image").unwrap_err();
        assert!(matches!(err, FlyoverError::Decode(msg) if msg.starts_with("blank.jpg")));
    }
}
