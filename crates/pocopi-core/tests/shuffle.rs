// crates/pocopi-core/tests/shuffle.rs
// ============================================================================
// Module: Shuffle Property Tests
// Description: Permutation properties of the in-place shuffle.
// Purpose: Ensure shuffling never adds, drops, or duplicates elements.
// Dependencies: pocopi-core, proptest, rand
// ============================================================================

//! Permutation properties of the in-place shuffle.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions are permitted."
)]

use pocopi_core::shuffle;
use pocopi_core::shuffle_with;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

proptest! {
    #[test]
    fn shuffle_is_a_permutation(mut items in proptest::collection::vec(any::<u16>(), 0 .. 64)) {
        let mut expected = items.clone();
        expected.sort_unstable();
        let len = items.len();
        let shuffled = shuffle(&mut items);
        prop_assert_eq!(shuffled.len(), len);
        let mut sorted = shuffled.to_vec();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, expected);
    }

    #[test]
    fn seeded_shuffle_is_a_permutation(seed in any::<u64>(), len in 0_usize .. 40) {
        let mut items: Vec<usize> = (0 .. len).collect();
        shuffle_with(&mut items, &mut StdRng::seed_from_u64(seed));
        items.sort_unstable();
        prop_assert_eq!(items, (0 .. len).collect::<Vec<_>>());
    }
}

#[test]
fn every_position_is_reachable() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut seen_first = [false; 4];
    for _ in 0 .. 400 {
        let mut items = [0_usize, 1, 2, 3];
        shuffle_with(&mut items, &mut rng);
        seen_first[items[0]] = true;
    }
    assert!(seen_first.iter().all(|seen| *seen));
}
