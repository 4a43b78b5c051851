use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// An ordered set of CMake settings with last-write-wins semantics.
///
/// Keys are option flags as passed to CMake (`-DENABLE_TESTS`,
/// `-DCMAKE_AR:FILEPATH`). Overwriting a key replaces its value but keeps the
/// position where the key was first inserted, so emission order is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationSet {
  entries: Vec<(String, String)>,
  index: HashMap<String, usize>,
}

impl ConfigurationSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or overwrite `key`.
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();
    match self.index.get(&key) {
      Some(&pos) => self.entries[pos].1 = value,
      None => {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
      }
    }
  }

  /// Builder-style [`set`](Self::set), used by the overlay stages.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.set(key, value);
    self
  }

  /// Apply every entry of `other` on top of `self`, in `other`'s order.
  pub fn merge(mut self, other: &ConfigurationSet) -> Self {
    for (key, value) in other.iter() {
      self.set(key, value);
    }
    self
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.index.get(key).map(|&pos| self.entries[pos].1.as_str())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.index.contains_key(key)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Every setting as a `key=value` command-line argument, in order.
  pub fn to_args(&self) -> Vec<String> {
    self.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigurationSet {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut set = Self::new();
    for (key, value) in iter {
      set.set(key, value);
    }
    set
  }
}

impl Serialize for ConfigurationSet {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (key, value) in &self.entries {
      map.serialize_entry(key, value)?;
    }
    map.end()
  }
}
