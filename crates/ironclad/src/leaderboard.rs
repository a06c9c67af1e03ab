//! Top-10 leaderboard computation, recomputed once per second alongside the rest of
//! [`crate::Hub::maintenance_pass`].

use ironclad_player::Roster;
use ironclad_proto::{LeaderboardEntry, LeaderboardPayload};

const TOP_N: usize = 10;
/// Below this population, a full sort is cheaper than maintaining a heap; above it, a
/// bounded min-heap avoids sorting the whole roster just to keep the top ten.
const HEAP_THRESHOLD: usize = 64;

#[must_use]
pub fn compute(roster: &Roster) -> LeaderboardPayload {
    let count = roster.players().count();
    let entries = if count <= HEAP_THRESHOLD {
        top_n_by_sort(roster)
    } else {
        top_n_by_heap(roster)
    };
    LeaderboardPayload { entries }
}

fn top_n_by_sort(roster: &Roster) -> Vec<LeaderboardEntry> {
    let mut all: Vec<LeaderboardEntry> = roster.players().map(|(_, p)| LeaderboardEntry { name: p.display_name.clone(), score: p.score }).collect();
    all.sort_unstable_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    all.truncate(TOP_N);
    all
}

fn top_n_by_heap(roster: &Roster) -> Vec<LeaderboardEntry> {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    let mut heap: BinaryHeap<Reverse<(u32, std::cmp::Reverse<String>)>> = BinaryHeap::with_capacity(TOP_N + 1);
    for (_, p) in roster.players() {
        heap.push(Reverse((p.score, std::cmp::Reverse(p.display_name.clone()))));
        if heap.len() > TOP_N {
            heap.pop();
        }
    }
    let mut entries: Vec<LeaderboardEntry> = heap.into_iter().map(|Reverse((score, Reverse(name)))| LeaderboardEntry { name, score }).collect();
    entries.sort_unstable_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn orders_by_score_descending() {
        let mut roster = Roster::new();
        let now = Instant::now();
        let a = roster.register("alice".into(), false, now);
        let b = roster.register("bob".into(), false, now);
        roster.player_mut(a).unwrap().score = 10;
        roster.player_mut(b).unwrap().score = 50;
        let payload = compute(&roster);
        assert_eq!(payload.entries[0].name, "bob");
        assert_eq!(payload.entries[1].name, "alice");
    }

    #[test]
    fn truncates_to_top_ten() {
        let mut roster = Roster::new();
        let now = Instant::now();
        for i in 0..20u32 {
            let id = roster.register(format!("player{i}"), false, now);
            roster.player_mut(id).unwrap().score = i;
        }
        let payload = compute(&roster);
        assert_eq!(payload.entries.len(), 10);
        assert_eq!(payload.entries[0].score, 19);
    }
}
