use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serializer;

use crate::types::ApiError;

pub fn serialize_date<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = date.to_rfc3339_opts(SecondsFormat::Millis, true);
    serializer.serialize_str(&s)
}

/// Turns a path segment that failed to parse as an id into a 400.
pub fn parse_id(id: Result<i32, &str>, message: &'static str) -> Result<i32, ApiError> {
    id.map_err(|_| ApiError::BadRequest(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(serde::Serialize)]
    struct Stamped {
        #[serde(serialize_with = "serialize_date")]
        at: DateTime<Utc>,
    }

    #[test]
    fn dates_use_millisecond_rfc3339() {
        let at = Utc.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap();
        let json = serde_json::to_string(&Stamped { at }).unwrap();
        assert_eq!(json, r#"{"at":"2023-04-05T06:07:08.000Z"}"#);
    }

    #[test]
    fn unparsable_ids_are_bad_requests() {
        assert_eq!(parse_id(Ok(7), "Invalid post ID").unwrap(), 7);
        match parse_id(Err("abc"), "Invalid post ID") {
            Err(ApiError::BadRequest(message)) => assert_eq!(message, "Invalid post ID"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
