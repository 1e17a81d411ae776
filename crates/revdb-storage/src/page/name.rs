//! Name pages.

use std::collections::BTreeMap;
use std::hash::Hasher;

use revdb_common::types::NameKey;
use siphasher::sip::SipHasher13;

/// String-interning table of one revision.
///
/// Keys derive from a deterministic hash of the name. A key already taken
/// by a different name is resolved by probing the following keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamePage {
    names: BTreeMap<NameKey, String>,
}

/// Deterministic home key of `name`.
pub fn name_hash(name: &str) -> NameKey {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write(name.as_bytes());
    NameKey::new((hasher.finish() & i32::MAX as u64) as i32)
}

impl NamePage {
    /// Creates an empty name page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name stored under `key`.
    pub fn get(&self, key: NameKey) -> Option<&str> {
        self.names.get(&key).map(String::as_str)
    }

    /// Key of `name`, if interned.
    pub fn lookup(&self, name: &str) -> Option<NameKey> {
        let mut key = name_hash(name);
        loop {
            match self.names.get(&key) {
                Some(existing) if existing == name => return Some(key),
                Some(_) => key = key.next_candidate(),
                None => return None,
            }
        }
    }

    /// Interns `name`, returning its existing key or a newly assigned one.
    pub fn intern(&mut self, name: &str) -> NameKey {
        let mut key = name_hash(name);
        loop {
            match self.names.get(&key) {
                Some(existing) if existing == name => return key,
                Some(_) => key = key.next_candidate(),
                None => {
                    self.names.insert(key, name.to_owned());
                    return key;
                }
            }
        }
    }

    /// Stores `name` under an explicit key. Used when decoding.
    pub fn insert(&mut self, key: NameKey, name: String) {
        self.names.insert(key, name);
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing is interned.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over names in key order.
    pub fn iter(&self) -> impl Iterator<Item = (NameKey, &str)> {
        self.names.iter().map(|(key, name)| (*key, name.as_str()))
    }
}
