// Unit tests for SubscriberSet

use crate::host::SubscriberSet;

/// **VALUE**: Verifies insert/remove report whether they changed the set.
///
/// **WHY THIS MATTERS**: The subscribe/unsubscribe replies sent to clients are exactly these
/// booleans. A duplicate subscribe must answer `false`, not add a second entry.
///
/// **BUG THIS CATCHES**: Would catch a Vec push without a contains check, which delivers
/// every event twice to a party that subscribed twice.
#[test]
fn given_party_when_inserting_and_removing_twice_then_reports_true_then_false() {
    let mut set = SubscriberSet::new();

    assert!(set.insert(7));
    assert!(!set.insert(7));
    assert_eq!(set.len(), 1);

    assert!(set.remove(7));
    assert!(!set.remove(7));
    assert!(set.is_empty());
}

/// **VALUE**: Verifies dead parties are dropped lazily when the set is iterated.
///
/// **WHY THIS MATTERS**: Parties can vanish without unsubscribing. Emitting to them must
/// neither fail nor keep them around forever.
///
/// **BUG THIS CATCHES**: Would catch `live` returning the snapshot before pruning, or
/// pruning live parties.
#[test]
fn given_vanished_party_when_taking_live_snapshot_then_drops_only_that_party() {
    // GIVEN: Three subscribers, party 2 has vanished
    let mut set = SubscriberSet::new();
    for party in [1, 2, 3] {
        set.insert(party);
    }

    // WHEN: Taking the live snapshot
    let live = set.live(|party| party != 2);

    // THEN: Snapshot and set both exclude the dead party
    assert_eq!(live, vec![1, 3]);
    assert!(!set.contains(2));
    assert_eq!(set.len(), 2);
}
