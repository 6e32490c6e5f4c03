//! Random number generation for ids, demo data and the API simulator.
//!
//! RULE: Nothing outside this module touches a platform RNG directly.
//! Each store gets its own stream derived from one master seed:
//!   - A fixed seed makes ids and simulated outcomes reproducible in tests.
//!   - Adding a new slot never changes the streams of existing slots.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

const BASE36_LOWER: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const BASE36_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A named random stream owned by a single store.
#[derive(Clone)]
pub struct StoreRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StoreRng {
    /// Create a stream from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a u64 in [low, high] inclusive.
    pub fn range_inclusive(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        low + self.next_u64_below(high - low + 1)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element uniformly. Returns None for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_u64_below(items.len() as u64) as usize;
        items.get(idx)
    }

    /// Lowercase base-36 suffix of `len` chars, used in record ids.
    pub fn base36(&mut self, len: usize) -> String {
        self.alphabet_string(BASE36_LOWER, len)
    }

    /// Uppercase base-36 suffix of `len` chars, used in display codes.
    pub fn base36_upper(&mut self, len: usize) -> String {
        self.alphabet_string(BASE36_UPPER, len)
    }

    fn alphabet_string(&mut self, alphabet: &[u8], len: usize) -> String {
        (0..len)
            .map(|_| alphabet[self.next_u64_below(alphabet.len() as u64) as usize] as char)
            .collect()
    }
}

/// Build a record id: `<prefix>_<unix millis>_<9 base-36 chars>`.
/// Uniqueness is probabilistic only.
pub fn record_id(prefix: &str, millis: i64, rng: &mut StoreRng) -> String {
    format!("{prefix}_{millis}_{}", rng.base36(9))
}

/// All store streams for one process, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Seed from OS entropy. Used when no seed is configured.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_store(&self, slot: StoreSlot) -> StoreRng {
        StoreRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every store's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StoreSlot {
    Transaction = 0,
    Admin = 1,
    Support = 2,
    News = 3,
    ApiSimulator = 4,
    Notifications = 5,
}

impl StoreSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Admin => "admin",
            Self::Support => "support",
            Self::News => "news",
            Self::ApiSimulator => "api_simulator",
            Self::Notifications => "notifications",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RngBank::new(12345).for_store(StoreSlot::Support);
        let mut b = RngBank::new(12345).for_store(StoreSlot::Support);
        assert_eq!(a.base36(12), b.base36(12));
    }

    #[test]
    fn slots_get_distinct_streams() {
        let bank = RngBank::new(7);
        let mut a = bank.for_store(StoreSlot::Transaction);
        let mut b = bank.for_store(StoreSlot::News);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn base36_upper_uses_expected_alphabet() {
        let mut rng = RngBank::new(99).for_store(StoreSlot::Transaction);
        for _ in 0..100 {
            let s = rng.base36_upper(6);
            assert_eq!(s.len(), 6);
            assert!(s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn range_inclusive_stays_in_bounds() {
        let mut rng = RngBank::new(1).for_store(StoreSlot::ApiSimulator);
        for _ in 0..1000 {
            let v = rng.range_inclusive(200, 1200);
            assert!((200..=1200).contains(&v));
        }
        assert_eq!(rng.range_inclusive(5, 5), 5);
    }
}
