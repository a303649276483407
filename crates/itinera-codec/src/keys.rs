// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Short alphabetic keys used in place of field names inside share links.

pub const KEY_ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: usize = KEY_ALPHABET.len();

/// Infinite sequence `a, b, ..., Z, aa, ab, ..., ZZ, aaa, ...`.
///
/// Internally a little-endian base-52 counter; each key is the digits rendered
/// most-significant first. When every digit overflows a new zero digit is pushed,
/// so each key length gets its full `52^len` block.
#[derive(Debug, Clone)]
pub struct KeySequence {
    digits: Vec<usize>,
}

impl Default for KeySequence {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySequence {
    pub fn new() -> Self {
        Self { digits: vec![0] }
    }

    fn increment(&mut self) {
        for digit in self.digits.iter_mut() {
            *digit += 1;
            if *digit < BASE {
                return;
            }
            *digit = 0;
        }
        self.digits.push(0);
    }
}

impl Iterator for KeySequence {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let key = self
            .digits
            .iter()
            .rev()
            .map(|&d| KEY_ALPHABET[d] as char)
            .collect();
        self.increment();
        Some(key)
    }
}

/// First `n` keys of [`KeySequence`]. `generate_keys(n)` is always a prefix of
/// `generate_keys(n + 1)`.
pub fn generate_keys(n: usize) -> Vec<String> {
    KeySequence::new().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_first_key() {
        assert_eq!(generate_keys(0), Vec::<String>::new());
        assert_eq!(generate_keys(1), vec!["a".to_string()]);
    }

    #[test]
    fn test_single_character_block() {
        let keys = generate_keys(52);
        assert_eq!(keys[25], "z");
        assert_eq!(keys[26], "A");
        assert_eq!(keys[51], "Z");
        assert!(keys.iter().all(|k| k.len() == 1));
    }

    #[test]
    fn test_rollover() {
        let keys = generate_keys(52 + 52 * 52 + 1);
        assert_eq!(keys[52], "aa");
        assert_eq!(keys[53], "ab");
        assert_eq!(keys[103], "aZ");
        assert_eq!(keys[104], "ba");
        assert_eq!(keys[52 + 52 * 52 - 1], "ZZ");
        assert_eq!(keys[52 + 52 * 52], "aaa");
    }

    #[test]
    fn test_prefix_property() {
        let long = generate_keys(300);
        for n in 0..300 {
            assert_eq!(generate_keys(n)[..], long[..n]);
        }
    }

    #[test]
    fn test_keys_are_unique() {
        let keys = generate_keys(6000);
        let unique: HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
