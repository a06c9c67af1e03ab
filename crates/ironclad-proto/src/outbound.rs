use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::contact::Contact;
use crate::team_id::WireTeamId;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub score: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathReasonWire {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

/// Wire form of a [`ironclad_terrain::TerrainSlice`]: `data` is the base-64 encoding of the
/// run-length payload, not the raw cell bytes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainWire {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub stride: usize,
    pub data: String,
    pub length: usize,
}

impl TerrainWire {
    #[must_use]
    pub fn encode(slice: &ironclad_terrain::TerrainSlice) -> Self {
        let encoded = slice.encode();
        Self {
            x: slice.x,
            y: slice.y,
            width: slice.width,
            stride: slice.stride,
            length: encoded.len(),
            data: BASE64.encode(encoded),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    pub world_radius: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Keyed by entity id hex string; a `BTreeMap` gives deterministic sorted-key iteration on
    /// serialize for free.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub contacts: BTreeMap<String, Contact>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub chats: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub team_chats: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_invite: Option<WireTeamId>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub team_members: Vec<TeamMember>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub team_join_requests: Vec<TeamMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_reason: Option<DeathReasonWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<TerrainWire>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPayload {
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Outbound {
    Update(UpdatePayload),
    Leaderboard(LeaderboardPayload),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contacts_serialize_in_sorted_key_order() {
        let mut payload = UpdatePayload { world_radius: 1000.0, ..Default::default() };
        payload.contacts.insert("0002".into(), sample_contact());
        payload.contacts.insert("0001".into(), sample_contact());
        let json = serde_json::to_string(&payload).unwrap();
        let pos1 = json.find("0001").unwrap();
        let pos2 = json.find("0002").unwrap();
        assert!(pos1 < pos2);
    }

    fn sample_contact() -> Contact {
        Contact {
            position: glam::Vec2::ZERO,
            velocity: ironclad_numerics::Velocity::ZERO,
            direction: ironclad_numerics::Angle::ZERO,
            altitude: 0.0,
            uncertainty: 1.0,
            entity_type: None,
            armament_consumption: None,
            turret_angles: None,
            damage_percent: None,
            guidance: None,
            friendly: None,
            owner: None,
        }
    }

    #[test]
    fn outbound_update_round_trips() {
        let payload = UpdatePayload { world_radius: 500.0, ..Default::default() };
        let msg = Outbound::Update(payload);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"update\""));
        let back: Outbound = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Outbound::Update(_)));
    }
}
