//! Quorum detection and one-time manager alert decisions

use crate::models::VotePreference;
use super::SlotVote;

/// Per-slot tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuorum {
    pub slot_id: i64,
    pub yes: usize,
    pub maybe: usize,
    pub viable: bool,
    pub perfect: bool,
}

/// Event level quorum, the OR of every slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuorum {
    pub viable: bool,
    pub perfect: bool,
    pub slots: Vec<SlotQuorum>,
}

impl EventQuorum {
    pub fn slot(&self, slot_id: i64) -> Option<&SlotQuorum> {
        self.slots.iter().find(|s| s.slot_id == slot_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumAlert {
    Viable,
    Perfect,
}

/// Stored at-most-once flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationFlags {
    pub viable_notified: bool,
    pub perfect_notified: bool,
}

/// Tally one slot
///
/// `viable` holds iff YES + MAYBE reaches `min_players`. `perfect` requires
/// every participant of the event to have voted YES, somebody willing to host,
/// and enough participants overall.
pub fn slot_quorum(slot_id: i64, votes: &[SlotVote], total_participants: usize, min_players: i32) -> SlotQuorum {
    let yes = votes.iter().filter(|v| v.preference == VotePreference::Yes).count();
    let maybe = votes.iter().filter(|v| v.preference == VotePreference::Maybe).count();
    let min = usize::try_from(min_players).unwrap_or(0);
    let has_host = votes
        .iter()
        .any(|v| v.can_host && v.preference != VotePreference::No);

    SlotQuorum {
        slot_id,
        yes,
        maybe,
        viable: yes + maybe >= min,
        perfect: total_participants > 0 && yes == total_participants && has_host && total_participants >= min,
    }
}

/// Tally every slot of an event
pub fn event_quorum<'a, I>(slots: I, total_participants: usize, min_players: i32) -> EventQuorum
where
    I: IntoIterator<Item = (i64, &'a [SlotVote])>,
{
    let slots: Vec<SlotQuorum> = slots
        .into_iter()
        .map(|(slot_id, votes)| slot_quorum(slot_id, votes, total_participants, min_players))
        .collect();

    EventQuorum {
        viable: slots.iter().any(|s| s.viable),
        perfect: slots.iter().any(|s| s.perfect),
        slots,
    }
}

/// Decide whether a manager alert fires and what the flags become
///
/// Flags only ever go from false to true. A perfect alert also marks viable as
/// notified so a later drop from perfect to viable stays silent.
pub fn decide_alert(quorum: &EventQuorum, flags: NotificationFlags) -> Option<(QuorumAlert, NotificationFlags)> {
    if quorum.perfect && !flags.perfect_notified {
        return Some((
            QuorumAlert::Perfect,
            NotificationFlags { viable_notified: true, perfect_notified: true },
        ));
    }

    if quorum.viable && !flags.viable_notified && !flags.perfect_notified {
        return Some((
            QuorumAlert::Viable,
            NotificationFlags { viable_notified: true, perfect_notified: flags.perfect_notified },
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn vote(participant_id: i64, preference: VotePreference, can_host: bool) -> SlotVote {
        SlotVote {
            participant_id,
            preference,
            can_host,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(participant_id),
        }
    }

    #[test]
    fn test_viable_counts_maybe() {
        let votes = vec![
            vote(1, VotePreference::Yes, false),
            vote(2, VotePreference::Maybe, false),
            vote(3, VotePreference::No, false),
        ];
        let q = slot_quorum(10, &votes, 3, 2);
        assert!(q.viable);
        assert!(!q.perfect);
        assert_eq!((q.yes, q.maybe), (1, 1));
    }

    #[test]
    fn test_perfect_needs_host() {
        let votes = vec![vote(1, VotePreference::Yes, false), vote(2, VotePreference::Yes, false)];
        assert!(!slot_quorum(1, &votes, 2, 2).perfect);

        let votes = vec![vote(1, VotePreference::Yes, true), vote(2, VotePreference::Yes, false)];
        assert!(slot_quorum(1, &votes, 2, 2).perfect);
    }

    #[test]
    fn test_perfect_needs_min_players() {
        let votes = vec![vote(1, VotePreference::Yes, true), vote(2, VotePreference::Yes, false)];
        assert!(!slot_quorum(1, &votes, 2, 3).perfect);
    }

    #[test]
    fn test_perfect_needs_every_participant() {
        let votes = vec![vote(1, VotePreference::Yes, true), vote(2, VotePreference::Yes, false)];
        assert!(!slot_quorum(1, &votes, 3, 2).perfect);
    }

    #[test]
    fn test_event_quorum_is_or_of_slots() {
        let a = vec![vote(1, VotePreference::No, false)];
        let b = vec![vote(1, VotePreference::Yes, true)];
        let q = event_quorum(vec![(1, a.as_slice()), (2, b.as_slice())], 1, 1);
        assert!(q.viable);
        assert!(q.perfect);
        assert!(!q.slot(1).unwrap().viable);
        assert!(q.slot(2).unwrap().perfect);
    }

    #[test]
    fn test_perfect_alert_marks_viable_too() {
        let q = EventQuorum { viable: true, perfect: true, slots: vec![] };
        let (alert, flags) = decide_alert(&q, NotificationFlags::default()).unwrap();
        assert_eq!(alert, QuorumAlert::Perfect);
        assert!(flags.viable_notified && flags.perfect_notified);
    }

    #[test]
    fn test_downgrade_after_perfect_does_not_realert() {
        let flags = NotificationFlags { viable_notified: true, perfect_notified: true };
        let viable_only = EventQuorum { viable: true, perfect: false, slots: vec![] };
        assert_eq!(decide_alert(&viable_only, flags), None);
    }

    #[test]
    fn test_viable_then_perfect_upgrades_once() {
        let viable_only = EventQuorum { viable: true, perfect: false, slots: vec![] };
        let (alert, flags) = decide_alert(&viable_only, NotificationFlags::default()).unwrap();
        assert_eq!(alert, QuorumAlert::Viable);
        assert!(!flags.perfect_notified);

        let perfect = EventQuorum { viable: true, perfect: true, slots: vec![] };
        let (alert, flags) = decide_alert(&perfect, flags).unwrap();
        assert_eq!(alert, QuorumAlert::Perfect);
        assert_eq!(decide_alert(&perfect, flags), None);
    }

    fn preference_strategy() -> impl Strategy<Value = VotePreference> {
        prop_oneof![
            Just(VotePreference::Yes),
            Just(VotePreference::Maybe),
            Just(VotePreference::No),
        ]
    }

    proptest! {
        #[test]
        fn prop_viable_iff_committed_reaches_min(
            prefs in proptest::collection::vec((preference_strategy(), any::<bool>()), 0..20),
            min_players in 1i32..12,
        ) {
            let votes: Vec<SlotVote> = prefs
                .iter()
                .enumerate()
                .map(|(i, (p, host))| vote(i as i64, *p, *host))
                .collect();
            let q = slot_quorum(1, &votes, votes.len(), min_players);
            let committed = votes.iter().filter(|v| v.preference != VotePreference::No).count();
            prop_assert_eq!(q.viable, committed >= min_players as usize);
        }

        #[test]
        fn prop_flags_never_reset(
            viable in any::<bool>(),
            perfect in any::<bool>(),
            viable_notified in any::<bool>(),
            perfect_notified in any::<bool>(),
        ) {
            let q = EventQuorum { viable: viable || perfect, perfect, slots: vec![] };
            let flags = NotificationFlags { viable_notified, perfect_notified };
            if let Some((_, next)) = decide_alert(&q, flags) {
                prop_assert!(next.viable_notified || !flags.viable_notified);
                prop_assert!(next.perfect_notified || !flags.perfect_notified);
            }
        }
    }
}
