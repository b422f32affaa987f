// src/resources/class_params.rs
//! Class parameters: free-form key/value metadata attached to backend
//! objects, carried on the wire as a url-encoded query string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{IpamError, Result};

/// Ordered class parameter map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassParameters(BTreeMap<String, String>);

impl ClassParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the wire form (`key=value&key2=value2`)
    pub fn decode(encoded: &str) -> Result<Self> {
        if encoded.trim().is_empty() {
            return Ok(Self::new());
        }
        // Repeated keys keep their first value
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(encoded)
            .map_err(|e| IpamError::backend(200, format!("malformed class parameters '{}': {}", encoded, e)))?;
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            map.entry(k).or_insert(v);
        }
        Ok(Self(map))
    }

    /// Encode into the wire form
    pub fn encode(&self) -> String {
        // Serializing a map of strings cannot fail
        serde_urlencoded::to_string(&self.0).unwrap_or_default()
    }

    /// Keep only the keys configured locally; keys unknown to the backend map to ""
    pub fn project(&self, configured: &ClassParameters) -> ClassParameters {
        configured
            .0
            .keys()
            .map(|k| (k.clone(), self.0.get(k).cloned().unwrap_or_default()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Copy with `key` set to `value`
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.insert(key, value);
        copy
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for ClassParameters {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(String, String)> for ClassParameters {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
