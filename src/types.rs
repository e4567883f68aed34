//! Identifier and timestamp newtypes shared by every entity kind
use std::fmt;
use std::str::FromStr;

use std::cmp::Ordering;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use uuid7::{Uuid, uuid7};

use crate::error::{Error, Result};

const UUID_VERSION: u8 = 7;

// newtype wrapper over uuid because Uuid doesn't implement minicbor traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityId(Uuid);

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone = Utc>(DateTime<T>);

impl EntityId {
    pub fn new() -> Self {
        Self(uuid7())
    }
    /// Parses a hyphenated identifier, accepting only version 7 UUIDs.
    pub fn parse(raw: &str) -> Result<Self> {
        let id = Uuid::from_str(raw)
            .map_err(|_| Error::validation(format!("unable to parse an ID from \"{raw}\"")))?;

        let bytes = id.as_bytes();
        let version = bytes[6] >> 4;
        let variant = bytes[8] >> 6;
        if version != UUID_VERSION || variant != 0b10 {
            return Err(Error::validation(format!(
                "wrong ID format for \"{raw}\"; expected UUID version {UUID_VERSION}"
            )));
        }

        Ok(Self(id))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TimeStamp<Utc> {
    /// The current time in whole seconds, the precision timestamps are stored at.
    pub fn new() -> Self {
        Self(Utc::now().trunc_subsecs(0))
    }
    pub fn from_unix(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(TimeStamp)
    }
    pub fn unix(&self) -> i64 {
        self.0.timestamp()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

// Utc itself is not ordered, so the derive would not apply.
impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

// unset server-assigned timestamps read as the epoch
impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i64(self.0.timestamp())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let secs = d.i64()?;

        DateTime::from_timestamp(secs, 0)
            .map(TimeStamp)
            .ok_or(minicbor::decode::Error::message(
                "failed to convert timestamp to utc",
            ))
    }
}

impl<C> minicbor::Encode<C> for EntityId {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.to_string())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for EntityId {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let raw = d.str()?;

        EntityId::parse(raw).map_err(|e| minicbor::decode::Error::message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_encoding() {
        let original = EntityId::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: EntityId = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::from_unix(1_700_000_000).unwrap();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn current_timestamp_survives_encoding() {
        let now = TimeStamp::new();

        let encoding = minicbor::to_vec(now.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(now, decode);
    }

    #[test]
    fn timestamps_order_by_instant() {
        let earlier = TimeStamp::from_unix(1_000_000_000).unwrap();
        let later = TimeStamp::new();

        assert!(earlier < later);
        assert_eq!(later.cmp(&later.clone()), Ordering::Equal);
    }

    #[test]
    fn parse_accepts_display_output() {
        let id = EntityId::new();

        assert_eq!(EntityId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn parse_rejects_other_versions() {
        // version 4
        let err = EntityId::parse("9b2c4f3e-8d1a-4c6b-9f0e-2a7d5e1c3b4a").unwrap_err();
        assert!(err.to_string().contains("version 7"));

        assert!(EntityId::parse("not-an-id").is_err());
        assert!(EntityId::parse("").is_err());
    }
}
