use glam::Vec2;
use ironclad_catalog::EntityTypeId;
use ironclad_numerics::{Angle, Ticks, Velocity};
use serde::{Deserialize, Serialize};

use crate::team_id::WireTeamId;
use crate::vec2_serde;

/// Guidance (direction/velocity target), disclosed only to the owner or a fully-known ally.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guidance {
    pub direction_target: Angle,
    pub velocity_target: Velocity,
}

/// Owner disclosure attached to a contact once uncertainty drops below the "who owns this"
/// threshold. `team_full` carries the spec's "small lies for bots to prefer joining" hook: the
/// hub may report a non-full team as full to steer bot recruitment, so this is not simply
/// `team.is_full()` mirrored verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactOwner {
    pub id: String,
    pub name: String,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<WireTeamId>,
    pub team_full: bool,
}

/// A filtered, possibly-uncertain view of one entity as seen by one observer. Field presence
/// follows a disclosure ladder: always position/velocity/direction/altitude/uncertainty; type
/// once uncertainty is low enough or the entity is close/collectible; armament/turret/damage/
/// guidance once known or visually resolved; owner identity only once known.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(with = "vec2_serde")]
    pub position: Vec2,
    pub velocity: Velocity,
    pub direction: Angle,
    pub altitude: f32,
    pub uncertainty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub armament_consumption: Option<Vec<Ticks>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turret_angles: Option<Vec<Angle>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<Guidance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<ContactOwner>,
}
