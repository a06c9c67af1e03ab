use crate::id::PlayerId;

pub const MAX_MEMBERS: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    #[error("team is full")]
    Full,
    #[error("player is already a member")]
    AlreadyMember,
    #[error("player already has a pending join request")]
    AlreadyRequested,
    #[error("only the team owner may accept join requests")]
    NotOwner,
}

/// A group of up to [`MAX_MEMBERS`] players. The owner is always `members[0]`; membership and
/// join-requests are kept disjoint by the [`crate::Roster`] that owns every `Team`.
pub struct Team {
    pub name: String,
    pub invite_code: u32,
    members: Vec<PlayerId>,
    join_requests: Vec<PlayerId>,
}

impl Team {
    #[must_use]
    pub fn new(name: String, owner: PlayerId, invite_code: u32) -> Self {
        Self { name, invite_code, members: vec![owner], join_requests: Vec::new() }
    }

    #[must_use]
    pub fn owner(&self) -> PlayerId {
        self.members[0]
    }

    #[must_use]
    pub fn members(&self) -> &[PlayerId] {
        &self.members
    }

    #[must_use]
    pub fn join_requests(&self) -> &[PlayerId] {
        &self.join_requests
    }

    #[must_use]
    pub fn is_member(&self, player: PlayerId) -> bool {
        self.members.contains(&player)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_MEMBERS
    }

    pub fn request_join(&mut self, player: PlayerId) -> Result<(), TeamError> {
        if self.is_member(player) {
            return Err(TeamError::AlreadyMember);
        }
        if self.join_requests.contains(&player) {
            return Err(TeamError::AlreadyRequested);
        }
        if self.members.len() + self.join_requests.len() >= MAX_MEMBERS {
            return Err(TeamError::Full);
        }
        self.join_requests.push(player);
        Ok(())
    }

    /// Only the owner may accept a join request; promotes a pending requester into `members`.
    pub fn accept(&mut self, requester: PlayerId, acting_player: PlayerId) -> Result<(), TeamError> {
        if acting_player != self.owner() {
            return Err(TeamError::NotOwner);
        }
        if self.is_full() {
            return Err(TeamError::Full);
        }
        if let Some(pos) = self.join_requests.iter().position(|p| *p == requester) {
            self.join_requests.remove(pos);
            self.members.push(requester);
        }
        Ok(())
    }

    /// Drops any pending join request from `player`, regardless of who asks.
    pub fn withdraw_request(&mut self, player: PlayerId) {
        self.join_requests.retain(|p| *p != player);
    }

    /// Removes `player` from membership. If they were the owner, ownership transfers to the next
    /// member in join order. Returns `true` if the team is now empty and should be destroyed.
    pub fn remove_member(&mut self, player: PlayerId) -> bool {
        if let Some(pos) = self.members.iter().position(|p| *p == player) {
            self.members.remove(pos);
        }
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<PlayerId> {
        let mut map: SlotMap<PlayerId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn owner_is_always_first_member() {
        let players = ids(2);
        let team = Team::new("Red".into(), players[0], 1234);
        assert_eq!(team.owner(), players[0]);
        assert_eq!(team.members(), &[players[0]]);
    }

    #[test]
    fn non_owner_cannot_accept_requests() {
        let players = ids(3);
        let mut team = Team::new("Red".into(), players[0], 1);
        team.request_join(players[1]).unwrap();
        let result = team.accept(players[1], players[2]);
        assert!(matches!(result, Err(TeamError::NotOwner)));
    }

    #[test]
    fn removing_owner_transfers_to_next_member() {
        let players = ids(2);
        let mut team = Team::new("Red".into(), players[0], 1);
        team.request_join(players[1]).unwrap();
        team.accept(players[1], players[0]).unwrap();
        let emptied = team.remove_member(players[0]);
        assert!(!emptied);
        assert_eq!(team.owner(), players[1]);
    }

    #[test]
    fn removing_last_member_reports_empty() {
        let players = ids(1);
        let mut team = Team::new("Red".into(), players[0], 1);
        assert!(team.remove_member(players[0]));
    }

    #[test]
    fn full_team_rejects_join_requests() {
        let players = ids(MAX_MEMBERS + 1);
        let mut team = Team::new("Red".into(), players[0], 1);
        for &p in &players[1..MAX_MEMBERS] {
            team.request_join(p).unwrap();
            team.accept(p, players[0]).unwrap();
        }
        assert!(team.is_full());
        let result = team.request_join(players[MAX_MEMBERS]);
        assert!(matches!(result, Err(TeamError::Full)));
    }
}
