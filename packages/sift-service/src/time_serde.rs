//! Timestamps cross the wire as RFC 3339 strings. Hosts may also send Unix seconds, which is
//! how they usually store modification times.

pub mod option;

use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
	Seconds(i64),
	Text(String),
}
impl Wire {
	/// `Ok(None)` for a blank string.
	fn parse(self) -> Result<Option<OffsetDateTime>, String> {
		match self {
			Self::Seconds(seconds) =>
				OffsetDateTime::from_unix_timestamp(seconds).map(Some).map_err(|e| e.to_string()),
			Self::Text(text) if text.trim().is_empty() => Ok(None),
			Self::Text(text) =>
				OffsetDateTime::parse(text.trim(), &Rfc3339).map(Some).map_err(|e| e.to_string()),
		}
	}
}

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&value.format(&Rfc3339).map_err(S::Error::custom)?)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	Wire::deserialize(deserializer)?
		.parse()
		.map_err(D::Error::custom)?
		.ok_or_else(|| D::Error::custom("timestamp must not be empty"))
}

#[cfg(test)]
mod tests {
	use serde::{Deserialize, Serialize};
	use time::macros::datetime;

	use super::*;

	#[derive(Debug, Serialize, Deserialize)]
	struct Stamped {
		#[serde(with = "crate::time_serde")]
		at: OffsetDateTime,
		#[serde(default, with = "crate::time_serde::option")]
		until: Option<OffsetDateTime>,
	}

	#[test]
	fn accepts_unix_seconds_and_rfc3339() {
		let seconds: Stamped =
			serde_json::from_str(r#"{"at": 1700000000}"#).expect("unix seconds");
		let text: Stamped =
			serde_json::from_str(r#"{"at": "2023-11-14T22:13:20Z"}"#).expect("rfc3339");

		assert_eq!(seconds.at, datetime!(2023-11-14 22:13:20 UTC));
		assert_eq!(seconds.at, text.at);
		assert_eq!(seconds.until, None);
	}

	#[test]
	fn blank_optional_bounds_are_absent() {
		let parsed: Stamped =
			serde_json::from_str(r#"{"at": 0, "until": "  "}"#).expect("blank bound");

		assert_eq!(parsed.until, None);
		assert!(serde_json::from_str::<Stamped>(r#"{"at": ""}"#).is_err());
	}

	#[test]
	fn serializes_as_rfc3339() {
		let stamped = Stamped {
			at: datetime!(2024-05-01 10:00:00 UTC),
			until: Some(datetime!(2024-05-02 10:00:00 UTC)),
		};
		let json = serde_json::to_value(&stamped).expect("serializable");

		assert_eq!(json["at"], "2024-05-01T10:00:00Z");
		assert_eq!(json["until"], "2024-05-02T10:00:00Z");
	}
}
