//! Content fingerprinting and duplicate detection

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A 64-bit xxHash of a page's visible text
///
/// Serialized as 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Hashes visible text with xxh64, seed 0
    pub fn of(text: &str) -> Self {
        Self(xxhash_rust::xxh64::xxh64(text.as_bytes(), 0))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex.parse()
            .map_err(|e| D::Error::custom(format!("invalid fingerprint {:?}: {}", hex, e)))
    }
}

/// Tracks which content fingerprints have been stored
///
/// The global set spans all locales: identical content reached from two locales is stored
/// once. The per-locale sets record which locale stored each fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDeduplicator {
    content_hashes: BTreeSet<Fingerprint>,
    locale_hashes: BTreeMap<String, BTreeSet<Fingerprint>>,
}

impl ContentDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the fingerprint of a page's visible text
    pub fn fingerprint(&self, body_text: &str) -> Fingerprint {
        Fingerprint::of(body_text)
    }

    /// Returns true if content with this fingerprint has already been stored
    pub fn is_duplicate(&self, fingerprint: Fingerprint) -> bool {
        self.content_hashes.contains(&fingerprint)
    }

    /// Commits a fingerprint as stored by `locale`
    ///
    /// Call only once the page is confirmed for storage.
    ///
    /// # Returns
    ///
    /// `false` if the fingerprint was already recorded
    pub fn record(&mut self, locale: &str, fingerprint: Fingerprint) -> bool {
        if !self.content_hashes.insert(fingerprint) {
            return false;
        }

        self.locale_hashes
            .entry(locale.to_string())
            .or_default()
            .insert(fingerprint);
        true
    }

    /// Number of distinct fingerprints stored across all locales
    pub fn len(&self) -> usize {
        self.content_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content_hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let dedup = ContentDeduplicator::new();
        assert_eq!(dedup.fingerprint("hello"), dedup.fingerprint("hello"));
        assert_ne!(dedup.fingerprint("hello"), dedup.fingerprint("hello!"));
        // Reference value of xxh64("", 0)
        assert_eq!(dedup.fingerprint("").to_string(), "ef46db3751d8e999");
    }

    #[test]
    fn test_fingerprint_hex_format() {
        assert_eq!(Fingerprint(0xab).to_string(), "00000000000000ab");
        assert_eq!("00000000000000ab".parse::<Fingerprint>().unwrap(), Fingerprint(0xab));
    }

    #[test]
    fn test_fingerprint_serde() {
        let json = serde_json::to_string(&Fingerprint(0xdead_beef)).unwrap();
        assert_eq!(json, "\"00000000deadbeef\"");
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Fingerprint(0xdead_beef));
        assert!(serde_json::from_str::<Fingerprint>("\"xyz\"").is_err());
    }

    #[test]
    fn test_duplicate_is_global_across_locales() {
        let mut dedup = ContentDeduplicator::new();
        let fp = dedup.fingerprint("same text");

        assert!(!dedup.is_duplicate(fp));
        assert!(dedup.record("en", fp));
        assert!(dedup.is_duplicate(fp));
        assert!(!dedup.record("es", fp));

        assert_eq!(dedup.len(), 1);
        assert_eq!(dedup.locale_hashes["en"].len(), 1);
        assert!(!dedup.locale_hashes.contains_key("es"));
    }
}
