//! Fixed catalog of image prompts.
//!
//! Each round draws two different entries: one per player. The prompt text is
//! what the opponent has to name in a guess.

use rand::Rng;

pub const IMAGE_PROMPTS: &[&str] = &[
    "simple pencil",
    "computer keyboard",
    "country house",
    "clouds in a blue sky",
    "bright sun",
    "sewing needle",
    "coffee cup",
    "open book",
    "wooden chair",
    "green tree",
    "red car",
    "green apple",
    "yellow banana",
    "smartphone",
    "wristwatch",
    "football",
    "acoustic guitar",
    "old camera",
    "bicycle",
    "small boat",
    "snowy mountain",
    "calm river",
    "sunflower",
    "colorful butterfly",
    "cute cat",
    "friendly dog",
    "wise owl",
    "goldfish",
    "eiffel tower",
    "pyramids of giza",
];

/// Pick two different prompts uniformly at random.
pub fn pick_two_distinct() -> (&'static str, &'static str) {
    pick_two_distinct_with_rng(&mut rand::rng())
}

/// Pick two different prompts using a specific RNG (for testing/seeding).
///
/// The second draw is resampled until it differs from the first, which always
/// terminates because the catalog holds more than one entry.
pub fn pick_two_distinct_with_rng<R: Rng>(rng: &mut R) -> (&'static str, &'static str) {
    let first = IMAGE_PROMPTS[rng.random_range(0..IMAGE_PROMPTS.len())];
    loop {
        let second = IMAGE_PROMPTS[rng.random_range(0..IMAGE_PROMPTS.len())];
        if second != first {
            return (first, second);
        }
    }
}

/// Position of a prompt in the catalog
pub fn catalog_index(prompt: &str) -> Option<usize> {
    IMAGE_PROMPTS.iter().position(|p| *p == prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_is_usable() {
        assert!(IMAGE_PROMPTS.len() >= 2);
        let unique: HashSet<_> = IMAGE_PROMPTS.iter().collect();
        assert_eq!(unique.len(), IMAGE_PROMPTS.len(), "catalog has duplicates");
    }

    #[test]
    fn test_pairs_are_distinct_and_from_catalog() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let (a, b) = pick_two_distinct_with_rng(&mut rng);
            assert_ne!(a, b);
            assert!(catalog_index(a).is_some());
            assert!(catalog_index(b).is_some());
        }
    }

    #[test]
    fn test_seeded_pick_is_deterministic() {
        let mut rng1 = rand::rngs::StdRng::seed_from_u64(42);
        let mut rng2 = rand::rngs::StdRng::seed_from_u64(42);
        assert_eq!(
            pick_two_distinct_with_rng(&mut rng1),
            pick_two_distinct_with_rng(&mut rng2)
        );
    }
}
