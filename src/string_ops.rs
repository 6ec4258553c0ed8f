//! Ops for `String` keys and values.

use crate::ops::Ops;

/// Longest key [`StringOps`] accepts by default, and the number of leading
/// bytes its hashes read.
pub const KEY_LEN_MAX: usize = 512;

const HASH_MASK: i64 = 0x7FFF_FFFF;

/// BKDR string hash (seed 131) over at most [`KEY_LEN_MAX`] bytes.
pub fn hash_bkdr(bytes: &[u8]) -> u64 {
    let h = bytes
        .iter()
        .take(KEY_LEN_MAX)
        .fold(0i64, |h, &b| h.wrapping_mul(131).wrapping_add(b as i8 as i64));
    (h & HASH_MASK) as u64
}

/// AP string hash over at most [`KEY_LEN_MAX`] bytes.
pub fn hash_ap(bytes: &[u8]) -> u64 {
    let h = bytes
        .iter()
        .take(KEY_LEN_MAX)
        .enumerate()
        .fold(0i64, |h, (i, &b)| {
            let c = b as i8 as i64;
            if i & 1 == 0 {
                h ^ (h << 7 ^ c ^ h >> 3)
            } else {
                h ^ !(h << 11 ^ c ^ h >> 5)
            }
        });
    (h & HASH_MASK) as u64
}

/// Ops for string maps: non-empty keys up to a length limit, non-empty
/// values, lexicographic order. Stored strings are trimmed to their exact
/// length on the way in.
#[derive(Copy, Clone, Debug)]
pub struct StringOps {
    max_key_len: usize,
    hash: fn(&[u8]) -> u64,
}

impl Default for StringOps {
    fn default() -> Self {
        Self {
            max_key_len: KEY_LEN_MAX,
            hash: hash_bkdr,
        }
    }
}

impl StringOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_key_len(mut self, n: usize) -> Self {
        self.max_key_len = n;
        self
    }

    pub fn with_hash(mut self, hash: fn(&[u8]) -> u64) -> Self {
        self.hash = hash;
        self
    }

    pub fn max_key_len(&self) -> usize {
        self.max_key_len
    }
}

fn exact(mut s: String) -> String {
    s.shrink_to_fit();
    s
}

impl Ops<String, String> for StringOps {
    #[inline]
    fn hash(&self, key: &String) -> u64 {
        (self.hash)(key.as_bytes())
    }

    #[inline]
    fn less(&self, left: &String, right: &String) -> bool {
        left < right
    }

    #[inline]
    fn equal(&self, left: &String, right: &String) -> bool {
        left == right
    }

    fn valid_key(&self, key: &String) -> bool {
        let ok = !key.is_empty() && key.len() <= self.max_key_len;
        if !ok {
            tracing::trace!(len = key.len(), max = self.max_key_len, "string key rejected");
        }
        ok
    }

    fn valid_value(&self, value: &String) -> bool {
        !value.is_empty()
    }

    fn copy_key(&self, key: String) -> Option<String> {
        Some(exact(key))
    }

    fn copy_value(&self, value: String) -> Option<String> {
        Some(exact(value))
    }
}
