//! Seat allocation, post-finalize admission and vacancy promotion

use crate::models::{ParticipantStatus, VotePreference};
use super::{seat_order, SlotVote};

/// Outcome of finalizing one slot, in seat order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Allocation {
    pub accepted: Vec<i64>,
    pub waitlist: Vec<i64>,
}

fn capacity(max_players: Option<i32>) -> Option<usize> {
    max_players.map(|max| usize::try_from(max).unwrap_or(0))
}

/// Allocate seats on the finalized slot
///
/// YES voters are seated first-come up to capacity. MAYBE voters are only
/// used to reach `min_players`; once YES alone meets the minimum they stay on
/// the waitlist even if seats remain. Everyone else who voted YES or MAYBE is
/// waitlisted, YES before MAYBE, then by vote time.
pub fn allocate_seats(votes: &[SlotVote], min_players: i32, max_players: Option<i32>) -> Allocation {
    let mut yes: Vec<SlotVote> = votes
        .iter()
        .copied()
        .filter(|v| v.preference == VotePreference::Yes)
        .collect();
    let mut maybe: Vec<SlotVote> = votes
        .iter()
        .copied()
        .filter(|v| v.preference == VotePreference::Maybe)
        .collect();
    yes.sort_by(seat_order);
    maybe.sort_by(seat_order);

    let cap = capacity(max_players);
    let min = usize::try_from(min_players).unwrap_or(0);

    let yes_seated = cap.map_or(yes.len(), |cap| yes.len().min(cap));
    let mut accepted: Vec<SlotVote> = yes[..yes_seated].to_vec();
    let mut waitlist: Vec<SlotVote> = yes[yes_seated..].to_vec();

    let mut maybe_seated = 0;
    if accepted.len() < min {
        let room = cap.map_or(usize::MAX, |cap| cap.saturating_sub(accepted.len()));
        maybe_seated = (min - accepted.len()).min(room).min(maybe.len());
        accepted.extend_from_slice(&maybe[..maybe_seated]);
    }
    waitlist.extend_from_slice(&maybe[maybe_seated..]);
    waitlist.sort_by(seat_order);

    Allocation {
        accepted: accepted.iter().map(|v| v.participant_id).collect(),
        waitlist: waitlist.iter().map(|v| v.participant_id).collect(),
    }
}

/// Status for a participant who votes after the event was finalized
///
/// `vote` is their preference on the finalized slot, if any. Acceptance is
/// sticky: an ACCEPTED participant who still wants to come keeps the seat no
/// matter what the capacity math says.
pub fn admit_after_finalize(
    current: ParticipantStatus,
    vote: Option<VotePreference>,
    accepted_count: usize,
    max_players: Option<i32>,
) -> ParticipantStatus {
    let wants_seat = matches!(vote, Some(VotePreference::Yes) | Some(VotePreference::Maybe));
    if !wants_seat {
        return ParticipantStatus::Pending;
    }

    if current == ParticipantStatus::Accepted {
        return ParticipantStatus::Accepted;
    }

    match capacity(max_players) {
        Some(cap) if accepted_count >= cap => ParticipantStatus::Waitlist,
        _ => ParticipantStatus::Accepted,
    }
}

/// Pick waitlisted participants to fill freed seats
///
/// Only seats given up since `accepted_before` are refilled, and never past
/// capacity. Returns nothing when capacity is unlimited (nobody is ever
/// waitlisted for lack of room) or the accepted count did not drop.
pub fn promote_from_waitlist(
    waitlist: &[SlotVote],
    accepted_before: usize,
    accepted_after: usize,
    max_players: Option<i32>,
) -> Vec<i64> {
    let Some(cap) = capacity(max_players) else {
        return Vec::new();
    };
    let freed = accepted_before.saturating_sub(accepted_after);
    let free = freed.min(cap.saturating_sub(accepted_after));
    if free == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<SlotVote> = waitlist
        .iter()
        .copied()
        .filter(|v| v.preference.seat_rank().is_some())
        .collect();
    candidates.sort_by(seat_order);

    candidates.iter().take(free).map(|v| v.participant_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn v(participant_id: i64, preference: VotePreference, minute: i64) -> SlotVote {
        SlotVote { participant_id, preference, can_host: false, created_at: at(minute) }
    }

    #[test]
    fn test_maybe_not_used_once_yes_meets_minimum() {
        let votes = vec![
            v(1, VotePreference::Yes, 1),
            v(2, VotePreference::Yes, 2),
            v(3, VotePreference::Yes, 3),
            v(4, VotePreference::Yes, 4),
            v(5, VotePreference::Yes, 5),
            v(6, VotePreference::Maybe, 0),
        ];
        let allocation = allocate_seats(&votes, 4, Some(6));
        assert_eq!(allocation.accepted, vec![1, 2, 3, 4, 5]);
        assert_eq!(allocation.waitlist, vec![6]);
    }

    #[test]
    fn test_earliest_maybe_fills_to_minimum() {
        let votes = vec![
            v(1, VotePreference::Yes, 10),
            v(2, VotePreference::Yes, 11),
            v(3, VotePreference::Yes, 12),
            v(4, VotePreference::Maybe, 20),
            v(5, VotePreference::Maybe, 5),
        ];
        let allocation = allocate_seats(&votes, 4, Some(6));
        assert_eq!(allocation.accepted, vec![1, 2, 3, 5]);
        assert_eq!(allocation.waitlist, vec![4]);
    }

    #[test]
    fn test_excess_yes_waitlisted_before_maybe() {
        let votes = vec![
            v(1, VotePreference::Yes, 1),
            v(2, VotePreference::Yes, 2),
            v(3, VotePreference::Maybe, 0),
            v(4, VotePreference::Yes, 3),
            v(5, VotePreference::No, 0),
        ];
        let allocation = allocate_seats(&votes, 2, Some(2));
        assert_eq!(allocation.accepted, vec![1, 2]);
        assert_eq!(allocation.waitlist, vec![4, 3]);
    }

    #[test]
    fn test_unlimited_capacity_seats_all_yes() {
        let votes: Vec<SlotVote> = (1..=9).map(|i| v(i, VotePreference::Yes, i)).collect();
        let allocation = allocate_seats(&votes, 3, None);
        assert_eq!(allocation.accepted.len(), 9);
        assert!(allocation.waitlist.is_empty());
    }

    #[test]
    fn test_ties_broken_by_participant_id() {
        let votes = vec![v(8, VotePreference::Yes, 1), v(3, VotePreference::Yes, 1)];
        let allocation = allocate_seats(&votes, 1, Some(1));
        assert_eq!(allocation.accepted, vec![3]);
        assert_eq!(allocation.waitlist, vec![8]);
    }

    #[test]
    fn test_promotion_prefers_yes_over_earlier_maybe() {
        let waitlist = vec![v(1, VotePreference::Maybe, 1), v(2, VotePreference::Yes, 2)];
        assert_eq!(promote_from_waitlist(&waitlist, 6, 5, Some(6)), vec![2]);
    }

    #[test]
    fn test_promotion_fills_every_free_seat() {
        let waitlist = vec![
            v(1, VotePreference::Yes, 1),
            v(2, VotePreference::Yes, 2),
            v(3, VotePreference::Maybe, 0),
        ];
        assert_eq!(promote_from_waitlist(&waitlist, 5, 3, Some(5)), vec![1, 2]);
        assert!(promote_from_waitlist(&waitlist, 5, 5, Some(5)).is_empty());
        assert!(promote_from_waitlist(&waitlist, 1, 0, None).is_empty());
    }

    #[test]
    fn test_spare_capacity_alone_promotes_nobody() {
        // 5 YES seated with max 6; the MAYBE stays backup until someone leaves
        let waitlist = vec![v(6, VotePreference::Maybe, 0)];
        assert!(promote_from_waitlist(&waitlist, 5, 5, Some(6)).is_empty());
        assert_eq!(promote_from_waitlist(&waitlist, 5, 4, Some(6)), vec![6]);
    }

    #[test]
    fn test_promotion_limited_to_freed_seats() {
        let waitlist = vec![
            v(1, VotePreference::Yes, 1),
            v(2, VotePreference::Yes, 2),
        ];
        assert_eq!(promote_from_waitlist(&waitlist, 4, 3, Some(8)), vec![1]);
    }

    #[test]
    fn test_accepted_is_sticky_after_finalize() {
        let status = admit_after_finalize(ParticipantStatus::Accepted, Some(VotePreference::Maybe), 6, Some(6));
        assert_eq!(status, ParticipantStatus::Accepted);
    }

    #[test]
    fn test_new_voter_cannot_bump_full_event() {
        let status = admit_after_finalize(ParticipantStatus::Pending, Some(VotePreference::Yes), 6, Some(6));
        assert_eq!(status, ParticipantStatus::Waitlist);

        let status = admit_after_finalize(ParticipantStatus::Waitlist, Some(VotePreference::Yes), 5, Some(6));
        assert_eq!(status, ParticipantStatus::Accepted);
    }

    #[test]
    fn test_no_vote_after_finalize_releases_seat() {
        let status = admit_after_finalize(ParticipantStatus::Accepted, Some(VotePreference::No), 6, Some(6));
        assert_eq!(status, ParticipantStatus::Pending);
        assert_eq!(admit_after_finalize(ParticipantStatus::Waitlist, None, 0, None), ParticipantStatus::Pending);
    }
}
