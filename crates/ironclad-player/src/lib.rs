//! Player and team bookkeeping: identity, death/respawn state, chat spam throttling, and the
//! owner/member/join-request lifecycle of teams.

mod chat;
mod id;
mod player;
mod registry;
mod team;

pub use chat::{ChatHistory, ChatVerdict, Moderation};
pub use id::{player_id_from_hex, player_id_to_hex, PlayerId, TeamId};
pub use player::{DeathReason, DeathTag, Player, DEATH_CAMERA_LIFETIME_SECS};
pub use registry::Roster;
pub use team::{Team, TeamError, MAX_MEMBERS};
