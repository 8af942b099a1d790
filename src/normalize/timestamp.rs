use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values at or above this magnitude are milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a timestamp cell into a UTC instant.
///
/// Strings may be RFC 3339 or naive `YYYY-MM-DD HH:MM:SS[.f]` (taken as
/// UTC). Numbers are epoch seconds, or epoch milliseconds when large enough.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::String(raw) => parse_text(raw),
        Value::Number(number) => {
            let epoch = number
                .as_f64()
                .ok_or_else(|| format!("timestamp {number} is not representable"))?;
            parse_epoch(epoch)
        }
        Value::Null => Err("timestamp is null".into()),
        other => Err(format!("timestamp has unsupported type: {other}")),
    }
}

fn parse_text(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(format!("invalid timestamp '{raw}'"))
}

fn parse_epoch(epoch: f64) -> Result<DateTime<Utc>, String> {
    if !epoch.is_finite() {
        return Err(format!("timestamp {epoch} is not finite"));
    }
    let millis = if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
        epoch
    } else {
        epoch * 1000.0
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
        .ok_or_else(|| format!("timestamp {epoch} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_timestamp(&json!("2024-05-01T12:00:00.250+02:00")).unwrap();
        assert_eq!(parsed, utc("2024-05-01T10:00:00.250Z"));
    }

    #[test]
    fn naive_strings_are_utc() {
        assert_eq!(
            parse_timestamp(&json!("2024-05-01 12:00:00")).unwrap(),
            utc("2024-05-01T12:00:00Z")
        );
        assert_eq!(
            parse_timestamp(&json!("2024-05-01T12:00:00.5")).unwrap(),
            utc("2024-05-01T12:00:00.5Z")
        );
    }

    #[test]
    fn epoch_seconds_and_millis() {
        assert_eq!(
            parse_timestamp(&json!(1_714_564_800)).unwrap(),
            utc("2024-05-01T12:00:00Z")
        );
        assert_eq!(
            parse_timestamp(&json!(1_714_564_800_500_i64)).unwrap(),
            utc("2024-05-01T12:00:00.5Z")
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp(&json!("yesterday")).is_err());
        assert!(parse_timestamp(&Value::Null).is_err());
        assert!(parse_timestamp(&json!(true)).is_err());
    }
}
