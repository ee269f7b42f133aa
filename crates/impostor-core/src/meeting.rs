//! Emergency meeting voting.
//!
//! A meeting snapshots the participant ids when it is called; players who
//! join later cannot be voted for, and players who leave can still collect
//! votes.  Voters are not tracked, so one player may vote any number of
//! times, including for themselves.

use std::collections::BTreeMap;

use crate::protocol::{PlayerId, PlayerVotes};

/// A single voting session over a fixed set of participants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmergencyMeeting {
    /// Tally per participant.  Ordered so results are reproducible.
    votes: BTreeMap<PlayerId, u32>,
}

impl EmergencyMeeting {
    /// Open a meeting with zero votes for every participant.
    pub fn new<I>(participants: I) -> Self
    where
        I: IntoIterator<Item = PlayerId>,
    {
        Self {
            votes: participants.into_iter().map(|id| (id, 0)).collect(),
        }
    }

    pub fn is_participant(&self, id: &str) -> bool {
        self.votes.contains_key(id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &PlayerId> {
        self.votes.keys()
    }

    pub fn votes_for(&self, id: &str) -> Option<u32> {
        self.votes.get(id).copied()
    }

    /// Record one vote for `target`.
    ///
    /// Returns whether the vote counted: dead voters and targets outside the
    /// snapshot are ignored.
    pub fn vote(&mut self, voter_is_alive: bool, target: &str) -> bool {
        if !voter_is_alive {
            return false;
        }
        match self.votes.get_mut(target) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    /// The participant to eliminate, if exactly one holds the most votes.
    pub fn resolve(&self) -> Option<&PlayerId> {
        scan_leader(self.votes.iter().map(|(id, &votes)| (id, votes)))
    }

    /// Per-participant tallies in participant order.
    pub fn player_votes(&self) -> Vec<PlayerVotes> {
        self.votes
            .iter()
            .map(|(id, &votes)| PlayerVotes {
                id: id.clone(),
                votes,
            })
            .collect()
    }
}

/// Running-maximum scan: a tie with the current maximum clears the leader,
/// a strictly higher count takes over.  The outcome is the unique global
/// maximum (or none on a tie) whatever the order of `tallies`.
fn scan_leader<'a, I>(tallies: I) -> Option<&'a PlayerId>
where
    I: IntoIterator<Item = (&'a PlayerId, u32)>,
{
    let mut max: Option<u32> = None;
    let mut leader = None;
    for (id, votes) in tallies {
        match max {
            Some(m) if votes == m => leader = None,
            Some(m) if votes < m => {}
            _ => {
                max = Some(votes);
                leader = Some(id);
            }
        }
    }
    leader
}
