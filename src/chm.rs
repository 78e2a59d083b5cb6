use crate::graph::Graph;
use crate::hash::KeyVertices;
use ahash::RandomState;
use hashbrown::HashSet;
use log::{debug, info};
use std::borrow::Borrow;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimal perfect hash by the CHM acyclic-graph construction:
/// - two per-character-position salt tables drive the fingerprints
/// - one edge per key in a graph over `[0, ng)` vertices
/// - the resolution array `g` is read off an acyclic orientation of that graph
///
/// Query: candidate = `(g[f1(k)] + g[f2(k)]) % ng`, confirmed against the
/// key table.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Mphf {
    /// First salt table, one weight per character position.
    pub s1: Vec<u32>,
    /// Second salt table, same length as `s1`.
    pub s2: Vec<u32>,
    /// Resolution array; `g.len() == ng`.
    pub g: Vec<u32>,
    /// Vertex count, `ng >= keys.len()`.
    pub ng: u32,
    /// The key set reordered so position `i` holds the key hashing to `i`.
    pub keys: Vec<Vec<u8>>,
}

impl Mphf {
    /// Number of keys the function was built over.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Raw combined-hash candidate in `[0, ng)`.
    ///
    /// Every byte string produces some candidate; only [`get`](Self::get)
    /// distinguishes members from collisions.
    #[inline]
    pub fn index(&self, key: &[u8]) -> u32 {
        let kv = KeyVertices::from_key(key, &self.s1, &self.s2, self.ng);
        // Safety: f1, f2 < ng == g.len()
        let ga = unsafe { *self.g.get_unchecked(kv.f1 as usize) };
        let gb = unsafe { *self.g.get_unchecked(kv.f2 as usize) };
        ((u64::from(ga) + u64::from(gb)) % u64::from(self.ng)) as u32
    }

    #[inline]
    pub fn index_str(&self, s: &str) -> u32 {
        self.index(s.as_bytes())
    }

    /// Verified lookup: the unique index in `[0, n)` for a member key,
    /// `None` for anything else.
    ///
    /// Candidates landing in the padding region `[n, ng)` miss immediately;
    /// in-range candidates are confirmed by comparing the probe against the
    /// key stored at that slot. The comparison is mandatory — the bijection
    /// holds only over the original key set.
    #[inline]
    pub fn get(&self, key: &[u8]) -> Option<u32> {
        let candidate = self.index(key);
        let slot = self.keys.get(candidate as usize)?;
        (slot.as_slice() == key).then_some(candidate)
    }

    #[inline]
    pub fn get_str(&self, s: &str) -> Option<u32> {
        self.get(s.as_bytes())
    }

    /// Membership test over the original key set.
    #[inline]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    #[cfg(feature = "serde")]
    pub fn to_bytes(&self) -> Result<Vec<u8>, MphError> {
        Ok(bincode::serialize(self)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MphError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Build parameters.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Vertex ratio `ng / n`. Acyclicity wants ratios above 2; smaller values
    /// shrink `g` but burn more retries.
    pub gamma: f64,
    /// Salt-table pairs to try per vertex-table size before growing it.
    pub trials_per_ng: u32,
    /// How many times `ng` may grow (5% per step) before the build fails.
    pub growth_steps: u32,
    /// Salt-table length cap; keys are hashed over at most this many bytes.
    /// Keys agreeing on that prefix collide and rely on lookup verification.
    pub max_key_width: usize,
    /// Seed for the deterministic salt-table search.
    pub seed: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            gamma: 2.09,
            trials_per_ng: 5,
            growth_steps: 24,
            max_key_width: 64,
            seed: 0xC0FF_EE00_D15E_A5E,
        }
    }
}

#[derive(Debug, Error)]
pub enum MphError {
    #[error("duplicate key detected during build")]
    DuplicateKey,
    #[error(
        "no acyclic construction after {attempts} attempts (vertex table grown to {ng}); \
         retry with a larger gamma, a wider key cap, or another seed"
    )]
    Unresolvable { attempts: u32, ng: u32 },
    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serde(#[from] Box<bincode::ErrorKind>),
}

pub struct Builder {
    cfg: BuildConfig,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            cfg: BuildConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: BuildConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Build the MPH. Keys must be **unique**; their input order fixes the
    /// assigned indices.
    pub fn build<K, I>(self, keys: I) -> Result<Mphf, MphError>
    where
        K: Borrow<[u8]>,
        I: IntoIterator<Item = K>,
    {
        // Collect and validate uniqueness on the exact bytes.
        let mut uniq = Vec::<Vec<u8>>::new();
        let mut seen: HashSet<Vec<u8>, RandomState> = HashSet::default();
        for k in keys {
            let v = k.borrow().to_vec();
            if !seen.insert(v.clone()) {
                return Err(MphError::DuplicateKey);
            }
            uniq.push(v);
        }

        let n = uniq.len();
        if n == 0 {
            // Degenerate but legal: every lookup misses.
            return Ok(Mphf {
                s1: Vec::new(),
                s2: Vec::new(),
                g: vec![0],
                ng: 1,
                keys: Vec::new(),
            });
        }

        let ns = uniq
            .iter()
            .map(|k| k.len())
            .max()
            .unwrap_or(0)
            .min(self.cfg.max_key_width);

        let mut ng = initial_ng(n, self.cfg.gamma);
        let mut attempts = 0u32;

        for _ in 0..=self.cfg.growth_steps {
            for _ in 0..self.cfg.trials_per_ng {
                let mut prng = XorShift64::seeded(mix_salt(self.cfg.seed, attempts));
                attempts += 1;

                let s1 = random_salt(&mut prng, ns, ng);
                let s2 = random_salt(&mut prng, ns, ng);

                if let Some(g) = try_assign(&uniq, &s1, &s2, ng) {
                    info!("acyclic construction after {attempts} attempts (n={n}, ng={ng})");
                    let mph = Mphf {
                        s1,
                        s2,
                        g,
                        ng,
                        keys: uniq,
                    };
                    debug_assert!(is_bijection(&mph));
                    return Ok(mph);
                }
            }
            ng = grow_ng(ng);
            debug!("trial budget spent, growing vertex table to {ng}");
        }

        Err(MphError::Unresolvable { attempts, ng })
    }
}

/// One construction attempt for a fixed salt pair: derive the edge per key,
/// reject degenerate edge shapes early, then orient the rest of the forest.
fn try_assign(keys: &[Vec<u8>], s1: &[u32], s2: &[u32], ng: u32) -> Option<Vec<u32>> {
    let edges = derive_edges(keys, s1, s2, ng);

    // A self-loop cannot take part in any acyclic orientation, and a repeated
    // endpoint pair would pin two distinct targets to the same equation.
    let mut seen: HashSet<(u32, u32), RandomState> =
        HashSet::with_capacity_and_hasher(edges.len(), RandomState::new());
    for kv in &edges {
        if kv.f1 == kv.f2 {
            debug!("self-loop at vertex {}, rejecting salts", kv.f1);
            return None;
        }
        if !seen.insert((kv.f1.min(kv.f2), kv.f1.max(kv.f2))) {
            debug!("duplicate edge {}-{}, rejecting salts", kv.f1, kv.f2);
            return None;
        }
    }

    let mut graph = Graph::new(ng);
    for (target, kv) in edges.iter().enumerate() {
        graph.connect(kv.f1, kv.f2, target as u32);
    }
    graph.assign_vertex_values()
}

/// Derive both fingerprint vertices for every key (in parallel with the
/// "parallel" feature; per-key work shares nothing mutable).
fn derive_edges(keys: &[Vec<u8>], s1: &[u32], s2: &[u32], ng: u32) -> Vec<KeyVertices> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        keys.par_iter()
            .map(|k| KeyVertices::from_key(k, s1, s2, ng))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        keys.iter()
            .map(|k| KeyVertices::from_key(k, s1, s2, ng))
            .collect()
    }
}

/// Salt table with one weight in `[0, ng)` per character position.
fn random_salt(prng: &mut XorShift64, ns: usize, ng: u32) -> Vec<u32> {
    (0..ns).map(|_| (prng.next() % u64::from(ng)) as u32).collect()
}

/// Smallest vertex table for `n` keys at ratio `gamma`, never below `n`.
fn initial_ng(n: usize, gamma: f64) -> u32 {
    let scaled = (gamma * n as f64).ceil() as u32;
    scaled.max(n as u32).max(1)
}

/// 5% growth per step; the `+1` keeps tiny tables moving.
fn grow_ng(ng: u32) -> u32 {
    (ng + 1).max((f64::from(ng) * 1.05).ceil() as u32)
}

/// Post-construction sanity pass: every key must map to its own slot.
fn is_bijection(mph: &Mphf) -> bool {
    mph.keys
        .iter()
        .enumerate()
        .all(|(i, k)| mph.index(k) == i as u32)
}

/// Minimal xorshift PRNG. The whole salt search derives from it, so builds
/// are reproducible for a fixed seed.
struct XorShift64(u64);

impl XorShift64 {
    fn seeded(mut s: u64) -> Self {
        if s == 0 {
            s = 0x9E37_79B9_7F4A_7C15
        }
        Self(s)
    }

    #[inline]
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

/// Deterministically mix the base seed with the attempt number (FNV-like).
fn mix_salt(base: u64, attempt: u32) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut h = FNV_OFFSET ^ base;
    h ^= u64::from(attempt);
    h = h.wrapping_mul(FNV_PRIME);
    h ^ (h >> 33)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn build(keys: &[&str]) -> Mphf {
        Builder::new()
            .build(keys.iter().map(|k| k.as_bytes()))
            .unwrap()
    }

    fn random_words(n: usize, seed: u64) -> Vec<String> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = std::collections::HashSet::new();
        let mut words = Vec::with_capacity(n);
        while words.len() < n {
            let len = rng.gen_range(1..=20);
            let w: String = (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
            if seen.insert(w.clone()) {
                words.push(w);
            }
        }
        words
    }

    #[test]
    fn three_word_example() {
        let mph = build(&["alpha", "beta", "gamma"]);
        assert_eq!(mph.get_str("alpha"), Some(0));
        assert_eq!(mph.get_str("beta"), Some(1));
        assert_eq!(mph.get_str("gamma"), Some(2));
        assert_eq!(mph.get_str("delta"), None);
        // a prefix of a member is not a member
        assert_eq!(mph.get_str("alph"), None);
        assert!(mph.contains(b"beta"));
        assert!(!mph.contains(b"betamax"));
    }

    #[test]
    fn bijection_over_random_words() {
        let words = random_words(250, 42);
        let mph = Builder::new()
            .build(words.iter().map(|w| w.as_bytes()))
            .unwrap();
        assert_eq!(mph.len(), 250);
        assert!(mph.ng >= 250);
        assert_eq!(mph.g.len(), mph.ng as usize);
        for (i, w) in words.iter().enumerate() {
            assert_eq!(mph.get(w.as_bytes()), Some(i as u32), "key {w:?}");
        }
    }

    #[test]
    fn single_key() {
        let mph = build(&["solo"]);
        assert_eq!(mph.get_str("solo"), Some(0));
        assert_eq!(mph.get_str("duo"), None);
    }

    #[test]
    fn empty_key_set_builds() {
        let mph = Builder::new().build(Vec::<Vec<u8>>::new()).unwrap();
        assert!(mph.is_empty());
        assert_eq!(mph.get(b"anything"), None);
        assert_eq!(mph.get(b""), None);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = Builder::new()
            .build(["dup", "other", "dup"].iter().map(|k| k.as_bytes()))
            .unwrap_err();
        assert!(matches!(err, MphError::DuplicateKey));
    }

    // Hand-assembled artifact over ng=5, n=1, key "a" (byte 97):
    // f1("a") = 97 % 5 = 2, f2("a") = 3*97 % 5 = 1, g[2] + g[1] = 0.
    fn tiny_artifact() -> Mphf {
        Mphf {
            s1: vec![1],
            s2: vec![3],
            g: vec![0, 0, 0, 4, 4],
            ng: 5,
            keys: vec![b"a".to_vec()],
        }
    }

    #[test]
    fn out_of_range_candidate_misses_without_comparison() {
        let mph = tiny_artifact();
        assert_eq!(mph.get(b"a"), Some(0));
        // "b" = 98: f1 = 3, f2 = 4, candidate = (4 + 4) % 5 = 3 >= n
        assert_eq!(mph.index(b"b"), 3);
        assert_eq!(mph.get(b"b"), None);
    }

    #[test]
    fn in_range_false_positive_needs_verification() {
        let mph = tiny_artifact();
        // "f" = 102: f1 = 2, f2 = 1, same candidate slot as "a"
        assert_eq!(mph.index(b"f"), mph.index(b"a"));
        assert!((mph.index(b"f") as usize) < mph.len());
        // the range check alone would accept it; the comparison rejects it
        assert_eq!(mph.get(b"f"), None);
    }

    #[test]
    fn truncated_probe_collides_but_is_rejected() {
        let cfg = BuildConfig {
            max_key_width: 4,
            ..Default::default()
        };
        let keys = ["alphabet", "betamax", "gamma"];
        let mph = Builder::new()
            .with_config(cfg)
            .build(keys.iter().map(|k| k.as_bytes()))
            .unwrap();
        assert_eq!(mph.s1.len(), 4);
        assert_eq!(mph.get_str("alphabet"), Some(0));

        // Shares the hashed prefix "alph", so the raw candidate aliases the
        // real key's slot; only the comparison tells them apart.
        assert_eq!(mph.index(b"alphXYZ"), mph.index(b"alphabet"));
        assert_eq!(mph.get(b"alphXYZ"), None);
    }

    #[test]
    fn keys_identical_under_truncation_cannot_build() {
        let cfg = BuildConfig {
            max_key_width: 6,
            trials_per_ng: 3,
            growth_steps: 4,
            ..Default::default()
        };
        let err = Builder::new()
            .with_config(cfg)
            .build(["prefix-one", "prefix-two"].iter().map(|k| k.as_bytes()))
            .unwrap_err();
        assert!(matches!(err, MphError::Unresolvable { attempts: 15, .. }));
    }

    #[test]
    fn same_seed_reproduces_the_artifact() {
        let words = random_words(64, 7);
        let a = Builder::new()
            .build(words.iter().map(|w| w.as_bytes()))
            .unwrap();
        let b = Builder::new()
            .build(words.iter().map(|w| w.as_bytes()))
            .unwrap();
        assert_eq!(a.s1, b.s1);
        assert_eq!(a.s2, b.s2);
        assert_eq!(a.g, b.g);
        assert_eq!(a.ng, b.ng);
    }

    #[test]
    fn other_seeds_still_yield_a_bijection() {
        let words = random_words(64, 7);
        for seed in [1u64, 99, 0xDEAD_BEEF] {
            let cfg = BuildConfig {
                seed,
                ..Default::default()
            };
            let mph = Builder::new()
                .with_config(cfg)
                .build(words.iter().map(|w| w.as_bytes()))
                .unwrap();
            for (i, w) in words.iter().enumerate() {
                assert_eq!(mph.get(w.as_bytes()), Some(i as u32));
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn artifact_roundtrips_through_bytes() {
        let mph = build(&["alpha", "beta", "gamma"]);
        let bytes = mph.to_bytes().unwrap();
        let back = Mphf::from_bytes(&bytes).unwrap();
        assert_eq!(back.get_str("beta"), Some(1));
        assert_eq!(back.get_str("delta"), None);
        assert_eq!(back.g, mph.g);
    }
}
