#![forbid(unsafe_code)]

//! Theme maps and their key identity maps.
//!
//! A [`ThemeMap`] is an ordered `key -> stylesheet locator` table. Cloning it
//! shares the same storage, and [`ThemeMap::same_as`] compares that storage
//! by pointer: the provider treats two maps as "the same input" only when they
//! are the same allocation, the way a UI framework compares props by
//! reference. Content equality is still available through `PartialEq`.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

struct ThemeMapInner {
    entries: Vec<(String, String)>,
    index: AHashMap<String, usize>,
}

/// Ordered mapping from theme key to stylesheet locator.
#[derive(Clone)]
pub struct ThemeMap {
    inner: Rc<ThemeMapInner>,
}

impl ThemeMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::from_entries(Vec::new())
    }

    /// Build from ordered entries. A repeated key keeps its first position and
    /// its last locator.
    fn from_entries(pairs: Vec<(String, String)>) -> Self {
        let mut entries: Vec<(String, String)> = Vec::with_capacity(pairs.len());
        let mut index: AHashMap<String, usize> = AHashMap::with_capacity(pairs.len());
        for (key, href) in pairs {
            match index.get(&key) {
                Some(&at) => entries[at].1 = href,
                None => {
                    index.insert(key.clone(), entries.len());
                    entries.push((key, href));
                }
            }
        }
        Self {
            inner: Rc::new(ThemeMapInner { entries, index }),
        }
    }

    /// Locator for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .index
            .get(key)
            .map(|&at| self.inner.entries[at].1.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.index.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.entries.iter().map(|(key, _)| key.as_str())
    }

    /// `(key, locator)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.inner
            .entries
            .iter()
            .map(|(key, href)| (key.as_str(), href.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Whether both handles point at the same storage.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether both maps hold the same set of keys, ignoring order and
    /// locators.
    #[must_use]
    pub fn same_key_set(&self, other: &Self) -> bool {
        self.len() == other.len() && self.keys().all(|key| other.contains_key(key))
    }
}

impl Default for ThemeMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ThemeMap {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other) || self.inner.entries == other.inner.entries
    }
}

impl Eq for ThemeMap {}

impl fmt::Debug for ThemeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ThemeMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(
            iter.into_iter()
                .map(|(key, href)| (key.into(), href.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for ThemeMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ThemeMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct OrderedVisitor;

        impl<'de> serde::de::Visitor<'de> for OrderedVisitor {
            type Value = ThemeMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of theme keys to stylesheet locators")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, href)) = access.next_entry::<String, String>()? {
                    entries.push((key, href));
                }
                Ok(ThemeMap::from_entries(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Identity map over theme keys: every key maps to itself.
///
/// Lets consumers name themes symbolically (`themes.get("dark")`) instead of
/// hardcoding strings. Identity is shared the same way as [`ThemeMap`].
#[derive(Clone, PartialEq, Eq)]
pub struct ThemeKeys {
    keys: Rc<[String]>,
}

impl ThemeKeys {
    /// Build the identity map for `keys`, keeping first occurrences.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        Self {
            keys: unique.into(),
        }
    }

    /// Identity map over the keys of `map`.
    #[must_use]
    pub fn of(map: &ThemeMap) -> Self {
        Self::from_keys(map.keys())
    }

    /// The key itself, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|known| known.as_str() == key)
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.keys.iter().map(|key| (key.as_str(), key.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.keys, &other.keys)
    }
}

impl fmt::Debug for ThemeKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
