//! Resolution engine
//!
//! Pure computation over votes and slots: quorum detection, seat allocation at
//! finalize time, post-finalize admission, vacancy promotion and re-vote
//! timestamp merging. Nothing in here touches the database or the network;
//! `services::scheduling` feeds it rows loaded inside a transaction and
//! persists what it returns.

pub mod allocation;
pub mod ballot;
pub mod quorum;

use chrono::{DateTime, Utc};
use crate::models::{Vote, VotePreference};

pub use allocation::{allocate_seats, admit_after_finalize, promote_from_waitlist, Allocation};
pub use ballot::{merge_ballot, BallotEntry};
pub use quorum::{decide_alert, event_quorum, slot_quorum, EventQuorum, NotificationFlags, QuorumAlert, SlotQuorum};

/// A vote as the engine sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotVote {
    pub participant_id: i64,
    pub preference: VotePreference,
    pub can_host: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Vote> for SlotVote {
    fn from(vote: &Vote) -> Self {
        Self {
            participant_id: vote.participant_id,
            preference: vote.preference,
            can_host: vote.can_host,
            created_at: vote.created_at,
        }
    }
}

/// First-come ordering with preference priority: YES before MAYBE, then
/// earliest vote, then lowest participant id for a stable tie-break.
/// NO votes sort last.
pub(crate) fn seat_order(a: &SlotVote, b: &SlotVote) -> std::cmp::Ordering {
    let rank = |v: &SlotVote| v.preference.seat_rank().unwrap_or(u8::MAX);
    rank(a)
        .cmp(&rank(b))
        .then(a.created_at.cmp(&b.created_at))
        .then(a.participant_id.cmp(&b.participant_id))
}
