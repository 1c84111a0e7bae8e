//! Re-vote merging
//!
//! A ballot replaces all of a participant's votes for the event. The vote
//! clock (`created_at`) is the first-come tie-break, so an entry whose slot and
//! preference did not change keeps its original timestamp; toggling `can_host`
//! alone does not cost a voter their place.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use crate::models::{Vote, VoteInput, VotePreference};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotEntry {
    pub slot_id: i64,
    pub preference: VotePreference,
    pub can_host: bool,
    pub created_at: DateTime<Utc>,
}

/// Merge a submitted ballot with the votes already stored
///
/// Duplicate slot ids in the ballot collapse to the last one submitted. The
/// result is ordered by slot id.
pub fn merge_ballot(previous: &[Vote], ballot: &[VoteInput], now: DateTime<Utc>) -> Vec<BallotEntry> {
    let mut by_slot: BTreeMap<i64, &VoteInput> = BTreeMap::new();
    for input in ballot {
        by_slot.insert(input.slot_id, input);
    }

    by_slot
        .into_values()
        .map(|input| {
            let created_at = previous
                .iter()
                .find(|old| old.slot_id == input.slot_id && old.preference == input.preference)
                .map_or(now, |old| old.created_at);

            BallotEntry {
                slot_id: input.slot_id,
                preference: input.preference,
                can_host: input.can_host,
                created_at,
            }
        })
        .collect()
}
