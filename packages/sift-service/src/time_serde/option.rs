use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
use time::OffsetDateTime;

use crate::time_serde::Wire;

pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match value {
		Some(value) => super::serialize(value, serializer),
		None => serializer.serialize_none(),
	}
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Wire>::deserialize(deserializer)? {
		Some(wire) => wire.parse().map_err(D::Error::custom),
		None => Ok(None),
	}
}
