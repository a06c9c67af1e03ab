use glam::Vec2;
use ironclad_spatial::EntityId;
use serde::{Deserialize, Serialize};

use crate::contact::Guidance;
use crate::team_id::WireTeamId;
use crate::vec2_serde;

/// One decoded client intent. Unknown `type` tags fail to deserialize at the transport boundary
/// and are dropped there as `invalidInbound` — they never reach this enum.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Inbound {
    Spawn {
        name: String,
        #[serde(rename = "type")]
        entity_type: String,
        #[serde(default)]
        auth: Option<String>,
        #[serde(default)]
        invite: Option<WireTeamId>,
    },
    Upgrade {
        #[serde(rename = "type")]
        entity_type: String,
    },
    Fire {
        index: u8,
        #[serde(with = "vec2_serde")]
        position_target: Vec2,
        #[serde(default)]
        guidance: Option<Guidance>,
    },
    Manual {
        #[serde(default)]
        guidance: Option<Guidance>,
        #[serde(default)]
        ang_vel_target: Option<f32>,
        #[serde(default)]
        altitude_target: Option<f32>,
        #[serde(default, with = "vec2_serde::option")]
        turret_target: Option<Vec2>,
        entity_id: EntityId,
    },
    AimTurrets {
        #[serde(with = "vec2_serde")]
        target: Vec2,
    },
    CreateTeam {
        name: String,
    },
    AddToTeam {
        #[serde(default)]
        team_id: Option<WireTeamId>,
        #[serde(default)]
        player_id: Option<String>,
    },
    RemoveFromTeam {
        player_id: String,
    },
    SendChat {
        message: String,
        #[serde(default)]
        team: bool,
    },
    Pay {
        #[serde(with = "vec2_serde")]
        position: Vec2,
    },
    Trace {
        fps: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_round_trips() {
        let msg = Inbound::Spawn { name: "Ahab".into(), entity_type: "fairmileD".into(), auth: None, invite: None };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"spawn\""));
        let back: Inbound = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Inbound::Spawn { .. }));
    }

    #[test]
    fn unknown_tag_fails_to_parse() {
        let result: Result<Inbound, _> = serde_json::from_str(r#"{"type":"nonsense","data":{}}"#);
        assert!(result.is_err());
    }
}
