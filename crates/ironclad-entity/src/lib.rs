//! The runtime [`Entity`] type: kinematic transform, guidance targets, and the per-tick update
//! pipeline that turns inbound commands into motion, combat readiness, and (eventually) death.

mod entity;
mod extension;

pub use entity::{rotate_vec, Entity};
pub use extension::{Extension, TURRET_AIM_WINDOW};
