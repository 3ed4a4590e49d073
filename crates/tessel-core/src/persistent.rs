// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent string-keyed map with structural sharing.
//!
//! A hash array mapped trie: 32-way branch nodes addressed by 5-bit fragments
//! of an Fx hash, with leaves holding every entry that shares a full 64-bit
//! hash. Nodes are reference counted and never mutated in place; writes copy
//! the root-to-leaf path and share everything else, so [`Clone`] is O(1) and
//! a clone diverges from its source only where it is written.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

const BITS: u32 = 5;
const MASK: u64 = (1 << BITS) - 1;

enum Node<V> {
    Branch {
        bitmap: u32,
        children: Vec<Arc<Node<V>>>,
    },
    Leaf {
        hash: u64,
        entries: Vec<(String, V)>,
    },
}

enum Removal<V> {
    NotFound,
    Removed {
        node: Option<Arc<Node<V>>>,
        value: V,
    },
}

fn hash_key(key: &str) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

fn fragment(hash: u64, shift: u32) -> u32 {
    let bits = hash.checked_shr(shift).unwrap_or(0) & MASK;
    u32::try_from(bits).unwrap_or(0)
}

fn slot(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

fn leaf<V>(hash: u64, key: String, value: V) -> Arc<Node<V>> {
    Arc::new(Node::Leaf {
        hash,
        entries: vec![(key, value)],
    })
}

fn insert_node<V: Clone>(
    node: &Arc<Node<V>>,
    shift: u32,
    hash: u64,
    key: String,
    value: V,
) -> (Arc<Node<V>>, Option<V>) {
    match &**node {
        Node::Leaf { hash: existing, entries } if *existing == hash => {
            let mut entries = entries.clone();
            let previous = match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
                None => {
                    entries.push((key, value));
                    None
                }
            };
            (Arc::new(Node::Leaf { hash, entries }), previous)
        }
        Node::Leaf { hash: existing, .. } => {
            // Hashes differ somewhere below bit 64, so the split terminates.
            let split = Arc::new(Node::Branch {
                bitmap: 1 << fragment(*existing, shift),
                children: vec![Arc::clone(node)],
            });
            insert_node(&split, shift, hash, key, value)
        }
        Node::Branch { bitmap, children } => {
            let bit = 1 << fragment(hash, shift);
            let idx = slot(*bitmap, bit);
            let mut children = children.clone();
            if bitmap & bit == 0 {
                children.insert(idx, leaf(hash, key, value));
                let node = Node::Branch {
                    bitmap: bitmap | bit,
                    children,
                };
                return (Arc::new(node), None);
            }
            let (child, previous) = insert_node(&children[idx], shift + BITS, hash, key, value);
            children[idx] = child;
            let node = Node::Branch {
                bitmap: *bitmap,
                children,
            };
            (Arc::new(node), previous)
        }
    }
}

fn remove_node<V: Clone>(node: &Arc<Node<V>>, shift: u32, hash: u64, key: &str) -> Removal<V> {
    match &**node {
        Node::Leaf {
            hash: existing,
            entries,
        } => {
            if *existing != hash {
                return Removal::NotFound;
            }
            let Some(pos) = entries.iter().position(|(k, _)| k == key) else {
                return Removal::NotFound;
            };
            let mut entries = entries.clone();
            let (_, value) = entries.remove(pos);
            let node = if entries.is_empty() {
                None
            } else {
                Some(Arc::new(Node::Leaf { hash, entries }))
            };
            Removal::Removed { node, value }
        }
        Node::Branch { bitmap, children } => {
            let bit = 1 << fragment(hash, shift);
            if bitmap & bit == 0 {
                return Removal::NotFound;
            }
            let idx = slot(*bitmap, bit);
            let (child, value) = match remove_node(&children[idx], shift + BITS, hash, key) {
                Removal::NotFound => return Removal::NotFound,
                Removal::Removed { node, value } => (node, value),
            };
            let mut children = children.clone();
            let bitmap = match child {
                Some(child) => {
                    children[idx] = child;
                    *bitmap
                }
                None => {
                    children.remove(idx);
                    bitmap & !bit
                }
            };
            let node = match children.as_slice() {
                [] => None,
                [only] if matches!(**only, Node::Leaf { .. }) => Some(Arc::clone(only)),
                _ => Some(Arc::new(Node::Branch { bitmap, children })),
            };
            Removal::Removed { node, value }
        }
    }
}

/// Persistent map from `String` keys to `V`.
pub struct PersistentMap<V> {
    root: Option<Arc<Node<V>>>,
    len: usize,
}

impl<V> Clone for PersistentMap<V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            len: self.len,
        }
    }
}

impl<V> Default for PersistentMap<V> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<V> PersistentMap<V> {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Looks up `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        let hash = hash_key(key);
        let mut node = self.root.as_deref()?;
        let mut shift = 0;
        loop {
            match node {
                Node::Leaf {
                    hash: existing,
                    entries,
                } => {
                    if *existing != hash {
                        return None;
                    }
                    return entries.iter().find(|(k, _)| k == key).map(|(_, v)| v);
                }
                Node::Branch { bitmap, children } => {
                    let bit = 1 << fragment(hash, shift);
                    if bitmap & bit == 0 {
                        return None;
                    }
                    node = &children[slot(*bitmap, bit)];
                    shift += BITS;
                }
            }
        }
    }

    /// `true` when `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// `true` when both maps share the same root node.
    ///
    /// Two empty maps are considered shared.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Iterates entries in trie order (stable for a given key set, not sorted).
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: self.root.as_deref().into_iter().collect(),
            current: Default::default(),
            remaining: self.len,
        }
    }

    /// Iterates keys in trie order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates values in trie order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<V: Clone> PersistentMap<V> {
    /// Inserts `value` at `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        let hash = hash_key(&key);
        self.insert_hashed(hash, key, value)
    }

    fn insert_hashed(&mut self, hash: u64, key: String, value: V) -> Option<V> {
        let (root, previous) = match &self.root {
            None => (leaf(hash, key, value), None),
            Some(root) => insert_node(root, 0, hash, key, value),
        };
        self.root = Some(root);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let hash = hash_key(key);
        self.remove_hashed(hash, key)
    }

    fn remove_hashed(&mut self, hash: u64, key: &str) -> Option<V> {
        let root = self.root.as_ref()?;
        match remove_node(root, 0, hash, key) {
            Removal::NotFound => None,
            Removal::Removed { node, value } => {
                self.root = node;
                self.len -= 1;
                Some(value)
            }
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for PersistentMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for PersistentMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && (self.ptr_eq(other) || self.iter().all(|(k, v)| other.get(k) == Some(v)))
    }
}

impl<K: Into<String>, V: Clone> FromIterator<(K, V)> for PersistentMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<'a, V> IntoIterator for &'a PersistentMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a [`PersistentMap`].
pub struct Iter<'a, V> {
    stack: Vec<&'a Node<V>>,
    current: std::slice::Iter<'a, (String, V)>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.current.next() {
                self.remaining = self.remaining.saturating_sub(1);
                return Some((key.as_str(), value));
            }
            match self.stack.pop()? {
                Node::Branch { children, .. } => {
                    self.stack.extend(children.iter().rev().map(|child| &**child));
                }
                Node::Leaf { entries, .. } => self.current = entries.iter(),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
