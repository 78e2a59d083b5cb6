/// Pair of graph vertices derived from one key: the same salted sum under two
/// independent salt tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct KeyVertices {
    pub f1: u32,
    pub f2: u32,
}

impl KeyVertices {
    #[inline]
    pub fn from_key(key: &[u8], s1: &[u32], s2: &[u32], ng: u32) -> Self {
        Self {
            f1: salted_sum(s1, key, ng),
            f2: salted_sum(s2, key, ng),
        }
    }
}

/// Position-weighted fingerprint: `(Σ salt[i] · key[i]) mod ng`, accumulated
/// over the first `min(key len, salt len)` bytes with per-step reduction.
///
/// Keys longer than the salt table hash only their prefix; the verified
/// lookup rejects any false match truncation admits.
#[inline]
pub(crate) fn salted_sum(salt: &[u32], key: &[u8], ng: u32) -> u32 {
    debug_assert!(ng > 0);
    let m = u64::from(ng);
    let mut acc = 0u64;
    for (&s, &b) in salt.iter().zip(key) {
        acc = (acc + u64::from(s) * u64::from(b)) % m;
    }
    acc as u32
}
