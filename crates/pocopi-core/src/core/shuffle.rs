// crates/pocopi-core/src/core/shuffle.rs
// ============================================================================
// Module: Shuffle
// Description: In-place Fisher-Yates shuffle over a CSPRNG.
// Purpose: Randomize presentation order without a predictable generator.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Presentation order must not be reconstructible from repeated
//! observations, so the default entry point draws every swap index from the
//! operating system generator. [`shuffle_with`] accepts any generator for
//! seeded tests.

use rand::Rng;
use rand::rngs::OsRng;

/// Shuffles `items` in place using the operating system CSPRNG.
///
/// Returns the same slice it mutated.
pub fn shuffle<T>(items: &mut [T]) -> &mut [T] {
    shuffle_with(items, &mut OsRng)
}

/// Shuffles `items` in place with the provided generator.
///
/// Performs exactly `len - 1` swaps, walking from the last index down to
/// index 1 and swapping with a uniform index in `[0, i]`. Indices are drawn
/// as `u32` while they fit, so a seeded generator yields the same order as
/// `rand::seq::SliceRandom::shuffle`.
pub fn shuffle_with<'a, T, R: Rng + ?Sized>(items: &'a mut [T], rng: &mut R) -> &'a mut [T] {
    for index in (1 .. items.len()).rev() {
        let bound = index + 1;
        let target = match u32::try_from(bound) {
            Ok(bound) => rng.gen_range(0 .. bound) as usize,
            Err(_) => rng.gen_range(0 .. bound),
        };
        items.swap(index, target);
    }
    items
}
