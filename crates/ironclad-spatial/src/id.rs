use std::fmt;
use std::num::NonZeroU32;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable handle to a live entity inside a [`crate::World`].
///
/// Wrapping a `NonZeroU32` makes the wire sentinel `0` ("no entity", e.g. an empty weapon-owner
/// field) a value this type simply cannot hold, rather than a convention callers must remember.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EntityId(NonZeroU32);

impl EntityId {
    pub(crate) fn from_raw(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Parses the same hex text [`EntityId`]'s `Display`/`Serialize` impls produce. The inverse
    /// of `to_string`, for callers outside this crate that need to build an id without going
    /// through a full `serde` round trip (e.g. a bot composing an outgoing message by hand).
    #[must_use]
    pub fn from_hex(text: &str) -> Option<Self> {
        let raw = u32::from_str_radix(text, 16).ok()?;
        Self::from_raw(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0.get())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let raw = u32::from_str_radix(&text, 16).map_err(D::Error::custom)?;
        Self::from_raw(raw).ok_or_else(|| D::Error::custom("entity id 0 is not a valid wire value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips() {
        let id = EntityId::from_raw(0xdead_beef).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"deadbeef\"");
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn zero_is_not_a_valid_id() {
        assert!(EntityId::from_raw(0).is_none());
        let result: Result<EntityId, _> = serde_json::from_str("\"0\"");
        assert!(result.is_err());
    }

    #[test]
    fn from_hex_is_the_inverse_of_display() {
        let id = EntityId::from_raw(0x2a).unwrap();
        assert_eq!(EntityId::from_hex(&id.to_string()), Some(id));
        assert_eq!(EntityId::from_hex("0"), None);
        assert_eq!(EntityId::from_hex("not hex"), None);
    }
}
