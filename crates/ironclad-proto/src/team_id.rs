use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// A team identifier as it appears on the wire: 1-6 ASCII characters packed little-endian into a
/// 64-bit value (byte `i` of the name occupies bits `8*i..8*i+8`). Teams are identified by their
/// short name rather than an opaque handle, so this is also how a client asks to join one.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct WireTeamId(pub u64);

#[derive(Debug, thiserror::Error)]
pub enum TeamIdError {
    #[error("team name must be 1-6 ASCII characters, got {0:?}")]
    BadLength(String),
    #[error("team name must be ASCII, got {0:?}")]
    NotAscii(String),
}

impl WireTeamId {
    pub fn pack(name: &str) -> Result<Self, TeamIdError> {
        if !name.is_ascii() {
            return Err(TeamIdError::NotAscii(name.to_owned()));
        }
        if name.is_empty() || name.len() > 6 {
            return Err(TeamIdError::BadLength(name.to_owned()));
        }
        let mut packed: u64 = 0;
        for (i, byte) in name.bytes().enumerate() {
            packed |= u64::from(byte) << (8 * i);
        }
        Ok(Self(packed))
    }

    #[must_use]
    pub fn name(self) -> String {
        self.0
            .to_le_bytes()
            .into_iter()
            .take_while(|&b| b != 0)
            .map(char::from)
            .collect()
    }
}

impl Serialize for WireTeamId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for WireTeamId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let packed = u64::deserialize(deserializer)?;
        let id = Self(packed);
        // round-trip through `name()` to reject anything that isn't packed ASCII.
        if id.name().is_empty() {
            return Err(D::Error::custom("team id does not decode to a non-empty name"));
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trips() {
        for name in ["a", "alpha", "REDSIX"] {
            let id = WireTeamId::pack(name).unwrap();
            assert_eq!(id.name(), name);
        }
    }

    #[test]
    fn rejects_empty_and_overlong_names() {
        assert!(WireTeamId::pack("").is_err());
        assert!(WireTeamId::pack("toolong!").is_err());
    }

    #[test]
    fn little_endian_byte_order() {
        let id = WireTeamId::pack("ab").unwrap();
        assert_eq!(id.0, u64::from(b'a') | (u64::from(b'b') << 8));
    }
}
