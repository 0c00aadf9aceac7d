use chrono::Utc;
use fitparser::{profile::MesgNum, Value};

use super::{RecordDecoder, TrackRecord};
use crate::{FlyoverError, Result};

/// FIT positions are signed 32-bit semicircles.
const DEGREES_PER_SEMICIRCLE: f64 = 180.0 / 2_147_483_648.0;

/// Decoder for binary FIT activity files. Only `record` messages are kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct FitRecordDecoder;

impl RecordDecoder for FitRecordDecoder {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<TrackRecord>> {
        let messages = fitparser::from_bytes(bytes)
            .map_err(|err| FlyoverError::Decode(format!("FIT file: {err}")))?;
        let total = messages.len();
        let records: Vec<TrackRecord> = messages
            .iter()
            .filter(|message| message.kind() == MesgNum::Record)
            .map(|message| {
                record_from_fields(
                    message
                        .fields()
                        .iter()
                        .map(|field| (field.name(), field.value())),
                )
            })
            .collect();
        tracing::debug!(messages = total, records = records.len(), "FIT file parsed");
        Ok(records)
    }
}

fn record_from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a Value)>) -> TrackRecord {
    let mut record = TrackRecord::default();
    for (name, value) in fields {
        match name {
            "timestamp" => {
                if let Value::Timestamp(ts) = value {
                    record.timestamp = Some(ts.with_timezone(&Utc));
                }
            }
            "position_lat" => record.position_lat = number(value).map(|v| v * DEGREES_PER_SEMICIRCLE),
            "position_long" => {
                record.position_long = number(value).map(|v| v * DEGREES_PER_SEMICIRCLE)
            }
            "distance" | "enhanced_distance" => record.distance = number(value).or(record.distance),
            "enhanced_altitude" => record.altitude = number(value).or(record.altitude),
            "altitude" if record.altitude.is_none() => record.altitude = number(value),
            "enhanced_speed" => record.speed = number(value).or(record.speed),
            "speed" if record.speed.is_none() => record.speed = number(value),
            "heart_rate" => record.heart_rate = number(value).map(|hr| hr as u16),
            "temperature" => record.temperature = number(value),
            _ => {}
        }
    }
    record
}

fn number(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Float32(v) => f64::from(*v),
        Value::Float64(v) => *v,
        Value::SInt8(v) => f64::from(*v),
        Value::UInt8(v) | Value::UInt8z(v) | Value::Byte(v) => f64::from(*v),
        Value::SInt16(v) => f64::from(*v),
        Value::UInt16(v) | Value::UInt16z(v) => f64::from(*v),
        Value::SInt32(v) => f64::from(*v),
        Value::UInt32(v) | Value::UInt32z(v) => f64::from(*v),
        Value::SInt64(v) => *v as f64,
        Value::UInt64(v) | Value::UInt64z(v) => *v as f64,
        Value::Array(values) => return values.iter().find_map(number),
        _ => return None,
    };
    v.is_finite().then_some(v)
}
