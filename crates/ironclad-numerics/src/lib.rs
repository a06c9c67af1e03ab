//! Fixed-width numeric types for the simulation's hot path and wire format.
//!
//! Every value that crosses the wire or sits inside an [`Entity`](https://docs.rs/ironclad-entity)
//! uses one of these three quantized types instead of a bare `f32`: [`Angle`], [`Velocity`] and
//! [`Ticks`]. All three round-trip through JSON as the natural float unit (radians, m/s, seconds)
//! and are lossy by construction — converting a float in and back out is only guaranteed to be
//! close, never exact.

mod angle;
mod ticks;
mod velocity;

pub use angle::Angle;
pub use ticks::{Ticks, TICKS_PER_DAMAGE, TICK_PERIOD};
pub use velocity::Velocity;
