//! Device records
//!
//! A record is one row as the device sends it: an ordered list of key/value
//! pairs. The reserved key [`ID_KEY`] carries the row identifier.

use serde::{Deserialize, Serialize};

/// Key of the row identifier property
pub const ID_KEY: &str = ".id";

/// One row as received from the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pairs: Vec<(String, String)>,
}

impl Record {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Append a pair
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Row identifier, or `""` when the record carries none
    pub fn id(&self) -> &str {
        self.get(ID_KEY).unwrap_or("")
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every pair except the identifier, in wire order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter(|(k, _)| k != ID_KEY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every pair, in wire order
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_extraction() {
        let rec = Record::new().with("name", "ether1").with(ID_KEY, "*1");
        assert_eq!(rec.id(), "*1");
        assert_eq!(Record::new().with("name", "ether1").id(), "");
    }

    #[test]
    fn test_properties_skip_id() {
        let rec: Record = [(ID_KEY, "*2"), ("mac-address", "aa:bb"), ("mtu", "1500")]
            .into_iter()
            .collect();
        let props: Vec<_> = rec.properties().collect();
        assert_eq!(props, vec![("mac-address", "aa:bb"), ("mtu", "1500")]);
        assert_eq!(rec.len(), 3);
    }
}
