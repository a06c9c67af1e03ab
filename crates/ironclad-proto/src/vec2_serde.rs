//! `Vec2` as a 2-element JSON array, matching `ironclad_catalog`'s wire convention rather than
//! relying on `glam`'s own derived `{x, y}` shape.

use glam::Vec2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S: Serializer>(value: &Vec2, serializer: S) -> Result<S::Ok, S::Error> {
    [value.x, value.y].serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec2, D::Error> {
    let [x, y] = <[f32; 2]>::deserialize(deserializer)?;
    Ok(Vec2::new(x, y))
}

pub mod option {
    use super::{Vec2, Deserializer, Serializer};
    use serde::{Deserialize, Serialize};

    pub fn serialize<S: Serializer>(value: &Option<Vec2>, serializer: S) -> Result<S::Ok, S::Error> {
        value.map(|v| [v.x, v.y]).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec2>, D::Error> {
        let raw = Option::<[f32; 2]>::deserialize(deserializer)?;
        Ok(raw.map(|[x, y]| Vec2::new(x, y)))
    }
}
