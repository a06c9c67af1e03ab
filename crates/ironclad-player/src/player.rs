use std::time::Instant;

use glam::Vec2;
use ironclad_catalog::EntityTypeId;
use ironclad_spatial::EntityId;

use crate::chat::ChatHistory;
use crate::id::TeamId;

/// Duration a dead player's last-known camera position remains valid client-side.
pub const DEATH_CAMERA_LIFETIME_SECS: f32 = 2.0;

#[derive(Clone, Debug)]
pub struct DeathReason {
    pub tag: DeathTag,
    pub attacker_name: Option<String>,
    pub attacker_type: Option<EntityTypeId>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DeathTag {
    Weapon,
    Collision,
    Ramming,
    Terrain,
    Border,
    Unknown,
}

pub struct Player {
    pub display_name: String,
    pub score: u32,
    pub team: Option<TeamId>,
    pub entity: Option<EntityId>,
    pub death_reason: Option<DeathReason>,
    pub death_position: Vec2,
    pub death_time: Option<Instant>,
    pub is_bot: bool,
    pub chat: ChatHistory,
}

impl Player {
    #[must_use]
    pub fn new(display_name: String, is_bot: bool, now: Instant) -> Self {
        Self {
            display_name,
            score: 0,
            team: None,
            entity: None,
            death_reason: None,
            death_position: Vec2::ZERO,
            death_time: None,
            is_bot,
            chat: ChatHistory::new(now),
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.entity.is_some()
    }

    pub fn mark_dead(&mut self, position: Vec2, reason: DeathReason, now: Instant) {
        self.entity = None;
        self.death_position = position;
        self.death_reason = Some(reason);
        self.death_time = Some(now);
    }

    /// Whether the client-visible dead camera has expired and a full respawn view can show.
    #[must_use]
    pub fn death_camera_expired(&self, now: Instant) -> bool {
        match self.death_time {
            Some(t) => (now - t).as_secs_f32() >= DEATH_CAMERA_LIFETIME_SECS,
            None => true,
        }
    }

    pub fn respawn(&mut self, entity: EntityId) {
        self.entity = Some(entity);
        self.death_reason = None;
        self.death_time = None;
    }

    /// Score required to upgrade into a boat of `level`, per the `(level² − 1) × 10` curve.
    #[must_use]
    pub fn upgrade_threshold(level: u8) -> u32 {
        let level = u32::from(level);
        (level * level).saturating_sub(1) * 10
    }
}
