use std::time::Instant;

use slotmap::SlotMap;
use tracing::debug;

use crate::id::{PlayerId, TeamId};
use crate::player::Player;
use crate::team::Team;

/// Owns every live [`Player`] and [`Team`]. The sole mutator of team membership, so the
/// "join-requests and members are disjoint across all teams for a player" invariant only has to
/// be checked in one place.
#[derive(Default)]
pub struct Roster {
    players: SlotMap<PlayerId, Player>,
    teams: SlotMap<TeamId, Team>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self { players: SlotMap::with_key(), teams: SlotMap::with_key() }
    }

    pub fn register(&mut self, display_name: String, is_bot: bool, now: Instant) -> PlayerId {
        self.players.insert(Player::new(display_name, is_bot, now))
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    #[must_use]
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    #[must_use]
    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(id)
    }

    #[must_use]
    pub fn team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.get_mut(id)
    }

    pub fn players(&self) -> impl Iterator<Item = (PlayerId, &Player)> {
        self.players.iter()
    }

    pub fn teams(&self) -> impl Iterator<Item = (TeamId, &Team)> {
        self.teams.iter()
    }

    pub fn create_team(&mut self, owner: PlayerId, name: String, invite_code: u32) -> Option<TeamId> {
        let player = self.players.get_mut(owner)?;
        if player.team.is_some() {
            return None;
        }
        let team_id = self.teams.insert(Team::new(name, owner, invite_code));
        self.players.get_mut(owner).unwrap().team = Some(team_id);
        Some(team_id)
    }

    pub fn request_join(&mut self, team_id: TeamId, player: PlayerId) -> bool {
        match self.players.get(player) {
            Some(p) if p.team.is_none() => {}
            _ => return false,
        }
        match self.teams.get_mut(team_id) {
            Some(team) => team.request_join(player).is_ok(),
            None => false,
        }
    }

    pub fn accept_join(&mut self, team_id: TeamId, requester: PlayerId, acting_player: PlayerId) -> bool {
        let Some(team) = self.teams.get_mut(team_id) else { return false };
        if team.accept(requester, acting_player).is_err() {
            return false;
        }
        if let Some(player) = self.players.get_mut(requester) {
            player.team = Some(team_id);
        }
        true
    }

    /// Removes `player` from whatever team they belong to (and from every team's pending
    /// join-request list), transferring ownership if they were an owner and destroying the team
    /// if it is left empty.
    pub fn leave_team(&mut self, player: PlayerId) {
        for team in self.teams.values_mut() {
            team.withdraw_request(player);
        }
        let Some(team_id) = self.players.get(player).and_then(|p| p.team) else { return };
        if let Some(team) = self.teams.get_mut(team_id) {
            if team.remove_member(player) {
                self.teams.remove(team_id);
            }
        }
        if let Some(p) = self.players.get_mut(player) {
            p.team = None;
        }
    }

    /// Unregisters `player` entirely: clears every team join-request that names them, removes
    /// them from their team (transferring or destroying it), then drops the player record.
    pub fn unregister(&mut self, player: PlayerId) {
        self.leave_team(player);
        if self.players.remove(player).is_none() {
            debug!("unregister called for an already-absent player");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregister_clears_join_requests_and_membership() {
        let mut roster = Roster::new();
        let now = Instant::now();
        let owner = roster.register("owner".into(), false, now);
        let pending = roster.register("pending".into(), false, now);
        let team_id = roster.create_team(owner, "Red".into(), 1).unwrap();
        assert!(roster.request_join(team_id, pending));

        roster.unregister(pending);

        assert!(roster.player(pending).is_none());
        assert!(roster.team(team_id).unwrap().join_requests().is_empty());
    }

    #[test]
    fn unregistering_owner_transfers_then_destroys_when_last_leaves() {
        let mut roster = Roster::new();
        let now = Instant::now();
        let owner = roster.register("owner".into(), false, now);
        let member = roster.register("member".into(), false, now);
        let team_id = roster.create_team(owner, "Red".into(), 1).unwrap();
        roster.request_join(team_id, member);
        roster.accept_join(team_id, member, owner);

        roster.unregister(owner);
        assert_eq!(roster.team(team_id).unwrap().owner(), member);

        roster.unregister(member);
        assert!(roster.team(team_id).is_none());
    }

    #[test]
    fn player_cannot_join_two_teams_at_once() {
        let mut roster = Roster::new();
        let now = Instant::now();
        let owner_a = roster.register("a".into(), false, now);
        let owner_b = roster.register("b".into(), false, now);
        let joiner = roster.register("joiner".into(), false, now);
        let team_a = roster.create_team(owner_a, "A".into(), 1).unwrap();
        let team_b = roster.create_team(owner_b, "B".into(), 2).unwrap();

        assert!(roster.request_join(team_a, joiner));
        roster.accept_join(team_a, joiner, owner_a);
        assert!(!roster.request_join(team_b, joiner));
    }
}
