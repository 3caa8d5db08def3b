//! Seeded random stream keyed by a shareable phrase
//!
//! Seeding transform (fixed, platform independent):
//! 1. Normalize the phrase: trim, lowercase, collapse whitespace runs, join
//!    the words with `-`.
//! 2. Hash the normalized UTF-8 bytes with 64-bit FNV-1a.
//! 3. Seed `Pcg32` via `SeedableRng::seed_from_u64` with that hash.
//!
//! Draws read `next_u64` directly and map it through the arithmetic below
//! rather than rand's distribution types, so the sequence only depends on
//! PCG32 itself.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;

/// Words per seed phrase
pub const PHRASE_WORDS: usize = 3;

/// Seed phrase vocabulary (256 distinct words, 8 bits each)
pub const WORD_POOL: [&str; 256] = [
    // Nature
    "river", "stream", "rapids", "waterfall", "wave", "tide", "ocean", "pond",
    "forest", "jungle", "meadow", "valley", "mountain", "canyon", "desert", "tundra",
    "otter", "beaver", "salmon", "trout", "turtle", "frog", "heron", "eagle",
    "oak", "pine", "willow", "birch", "maple", "cedar", "redwood", "aspen",
    "stone", "pebble", "boulder", "gravel", "cliff", "cave", "ridge", "peak",
    "cloud", "mist", "fog", "rain", "snow", "frost", "ice", "storm",
    "dawn", "dusk", "noon", "night", "spring", "summer", "autumn", "winter",
    "north", "south", "east", "west", "wind", "breeze", "gust", "calm",
    // Colours
    "amber", "azure", "bronze", "cobalt", "coral", "crimson", "emerald", "golden",
    "indigo", "ivory", "jade", "lavender", "magenta", "navy", "olive", "pearl",
    "ruby", "rusty", "silver", "slate", "sunset", "teal", "violet", "white",
    "copper", "chrome", "onyx", "sapphire", "topaz", "turquoise", "scarlet", "maroon",
    // Actions
    "swift", "quick", "rapid", "speedy", "nimble", "agile", "dashing", "rushing",
    "gliding", "diving", "splashing", "swimming", "floating", "drifting", "soaring", "leaping",
    "brave", "bold", "fierce", "wild", "gentle", "steady", "serene", "peaceful",
    "lucky", "mighty", "clever", "cunning", "playful", "curious", "eager", "spirited",
    // Objects
    "coin", "gem", "crystal", "bead", "shell", "acorn", "pinecone", "feather",
    "log", "branch", "twig", "leaf", "flower", "lily", "reed", "moss",
    "star", "moon", "sun", "comet", "spark", "flame", "ember", "glow",
    "crown", "shield", "charm", "token", "relic", "treasure", "prize", "trophy",
    // Places
    "haven", "harbor", "lagoon", "cove", "bay", "inlet", "delta", "estuary",
    "grove", "glade", "hollow", "dell", "glen", "thicket", "copse", "orchard",
    "summit", "plateau", "bluff", "mesa", "butte", "gorge", "ravine", "chasm",
    "isle", "atoll", "reef", "shoal", "bank", "shore", "beach", "dune",
    // Descriptors
    "ancient", "eternal", "mystic", "hidden", "secret", "sacred", "primal", "rugged",
    "frozen", "blazing", "misty", "stormy", "sunny", "starry", "moonlit", "shadowy",
    "glassy", "marble", "gilded", "silken", "verdant", "diamond", "opal", "garnet",
    "endless", "infinite", "timeless", "boundless", "vast", "grand", "noble", "royal",
    // Misc
    "alpha", "omega", "zenith", "apex", "nexus", "core", "heart", "soul",
    "echo", "whisper", "roar", "thunder", "silence", "harmony", "rhythm", "melody",
    "quest", "voyage", "journey", "odyssey", "trek", "expedition", "venture", "mission",
    "legend", "myth", "saga", "tale", "fable", "story", "dream", "vision",
];

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ *byte as u64).wrapping_mul(FNV_PRIME)
    })
}

/// Canonical form of a phrase: lowercase words separated by single spaces
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Seed derived from a phrase
pub fn phrase_to_seed(phrase: &str) -> u64 {
    let key = normalize_phrase(phrase).replace(' ', "-");
    fnv1a_64(key.as_bytes())
}

/// Draw a fresh phrase from the word pool (uses OS entropy, not the run stream)
pub fn generate_seed_phrase() -> String {
    let mut rng = rand::rng();
    (0..PHRASE_WORDS)
        .map(|_| WORD_POOL[rng.random_range(0..WORD_POOL.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

/// True for exactly three pool words (case and spacing insensitive)
pub fn is_valid_seed_phrase(phrase: &str) -> bool {
    let normalized = normalize_phrase(phrase);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    words.len() == PHRASE_WORDS && words.iter().all(|w| WORD_POOL.contains(w))
}

/// Deterministic random stream owned by one run
#[derive(Debug, Clone)]
pub struct RandomStream {
    phrase: String,
    seed: u64,
    rng: Pcg32,
}

impl RandomStream {
    /// Create from a phrase, generating one if absent
    pub fn new(phrase: Option<&str>) -> Self {
        match phrase {
            Some(p) => Self::from_phrase(p),
            None => Self::from_phrase(&generate_seed_phrase()),
        }
    }

    pub fn from_phrase(phrase: &str) -> Self {
        let seed = phrase_to_seed(phrase);
        Self {
            phrase: normalize_phrase(phrase),
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// The normalized phrase in use
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform in [0, 1) with 53 bits of precision
    pub fn random(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in [min, max] inclusive
    pub fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max as i64 - min as i64 + 1) as f64;
        let offset = (self.random() * span).floor() as i64;
        (min as i64 + offset).min(max as i64) as i32
    }

    /// Uniform float in [min, max)
    pub fn float(&mut self, min: f32, max: f32) -> f32 {
        let value = (min as f64 + self.random() * (max as f64 - min as f64)) as f32;
        // Rounding to f32 can land exactly on `max`
        if value >= max { min } else { value }
    }

    /// Uniform element, `None` for an empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = (self.random() * items.len() as f64).floor() as usize;
        items.get(index.min(items.len() - 1))
    }

    /// Fisher-Yates shuffle into a new vector
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut result = items.to_vec();
        for i in (1..result.len()).rev() {
            let j = ((self.random() * (i + 1) as f64).floor() as usize).min(i);
            result.swap(i, j);
        }
        result
    }

    /// True with probability `probability`
    pub fn chance(&mut self, probability: f64) -> bool {
        self.random() < probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_word_pool_is_distinct() {
        let unique: HashSet<_> = WORD_POOL.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_same_phrase_same_sequence() {
        let mut a = RandomStream::from_phrase("swift otter river");
        let mut b = RandomStream::from_phrase("  Swift   OTTER river ");
        assert_eq!(a.phrase(), b.phrase());
        for _ in 0..100 {
            assert_eq!(a.random().to_bits(), b.random().to_bits());
        }
        assert_eq!(a.int(0, 2), b.int(0, 2));
    }

    #[test]
    fn test_different_phrases_diverge() {
        let mut a = RandomStream::from_phrase("swift otter river");
        let mut b = RandomStream::from_phrase("calm otter river");
        let sa: Vec<u64> = (0..8).map(|_| a.random().to_bits()).collect();
        let sb: Vec<u64> = (0..8).map(|_| b.random().to_bits()).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn test_int_is_inclusive() {
        let mut rng = RandomStream::from_phrase("jade lagoon echo");
        let mut seen = [false; 3];
        for _ in 0..500 {
            let v = rng.int(0, 2);
            assert!((0..=2).contains(&v));
            seen[v as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_float_is_half_open() {
        let mut rng = RandomStream::from_phrase("mist gorge saga");
        for _ in 0..1000 {
            let v = rng.float(-3.0, 3.0);
            assert!((-3.0..3.0).contains(&v));
        }
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = RandomStream::from_phrase("oak isle dream");
        let mut shuffled = rng.shuffle(&[1, 2, 3, 4, 5, 6]);
        shuffled.sort();
        assert_eq!(shuffled, vec![1, 2, 3, 4, 5, 6]);
        assert!(rng.pick::<u8>(&[]).is_none());
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = RandomStream::from_phrase("ember reef myth");
        assert!((0..50).all(|_| !rng.chance(0.0)));
        assert!((0..50).all(|_| rng.chance(1.0)));
    }

    #[test]
    fn test_seed_phrase_validation() {
        assert!(is_valid_seed_phrase("River Otter Stone"));
        assert!(!is_valid_seed_phrase("river otter"));
        assert!(!is_valid_seed_phrase("river otter zebra"));
        assert!(!is_valid_seed_phrase("river otter stone pond"));
        assert!(is_valid_seed_phrase(&generate_seed_phrase()));
    }
}
