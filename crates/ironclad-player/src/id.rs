use slotmap::{Key, KeyData};

slotmap::new_key_type! {
    /// Arena index into the live player roster. Stable for the player's whole session; unlike a
    /// raw pointer it stays valid (and distinguishable from a reused slot) across respawns.
    pub struct PlayerId;

    /// Arena index into the live team roster.
    pub struct TeamId;
}

/// Lowercase hex encoding of a [`PlayerId`] for the wire: not just an arena index internally, but
/// an opaque, non-dereferenceable string to anything outside the process.
#[must_use]
pub fn player_id_to_hex(id: PlayerId) -> String {
    format!("{:x}", id.data().as_ffi())
}

/// Inverse of [`player_id_to_hex`]. Returns `None` for malformed hex; a well-formed but stale
/// id (the slot has since been reused) is not detectable here — callers must look it up in the
/// live [`crate::Roster`] and treat a miss as "player no longer exists".
#[must_use]
pub fn player_id_from_hex(text: &str) -> Option<PlayerId> {
    let raw = u64::from_str_radix(text, 16).ok()?;
    Some(KeyData::from_ffi(raw).into())
}
