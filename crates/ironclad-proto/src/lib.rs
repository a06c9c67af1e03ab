//! The wire schema: length-delimited JSON messages of shape `{"type": <tag>, "data": <payload>}`.
//! This crate only defines the schema — encoding/decoding the length-delimited framing and the
//! socket itself are a transport adapter's job (see the hub crate's `Transport` trait), not this
//! crate's.

mod contact;
mod inbound;
mod outbound;
mod team_id;
mod vec2_serde;

pub use contact::{Contact, ContactOwner, Guidance};
pub use inbound::Inbound;
pub use outbound::{ChatMessage, DeathReasonWire, LeaderboardEntry, LeaderboardPayload, Outbound, TeamMember, TerrainWire, UpdatePayload};
pub use team_id::{TeamIdError, WireTeamId};
