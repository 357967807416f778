//! Typed value registries for parameters and exposed properties
//!
//! A registry keeps entries in authoring order. Two lookup paths exist on
//! purpose: authoring tools search linearly by name (rare, and tolerant of
//! renames), while a runtime instance freezes a hash→index table once at clone
//! time and resolves every per-tick lookup through it.

use std::collections::HashMap;

use super::ids::NameHash;
use super::value::{ParameterValue, PropertyValue, TypedValue};

/// One named value
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry<V> {
    /// Display name, unique within the registry
    pub name: String,
    /// Stable hash of `name`
    pub hash: NameHash,
    /// Current value
    pub value: V,
}

impl<V> RegistryEntry<V> {
    fn new(name: String, value: V) -> Self {
        let hash = NameHash::of(&name);
        Self { name, hash, value }
    }
}

/// Result of writing a value through a hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The stored value changed
    Changed,
    /// The stored value already equalled the new one
    Unchanged,
    /// No entry has this hash
    Missing,
    /// The entry exists with a different kind; nothing was written
    KindMismatch,
}

/// Ordered, named, typed value storage
#[derive(Debug, Clone)]
pub struct ValueRegistry<V> {
    entries: Vec<RegistryEntry<V>>,
    /// hash -> position; only populated on frozen (runtime) registries
    index: HashMap<NameHash, usize>,
    frozen: bool,
}

/// Registry of transition-driving parameters
pub type ParameterRegistry = ValueRegistry<ParameterValue>;

/// Registry of binder-written exposed properties
pub type PropertyRegistry = ValueRegistry<PropertyValue>;

impl<V: TypedValue> ValueRegistry<V> {
    /// Create an empty authoring registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            frozen: false,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this registry carries a hash index (runtime copy)
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Iterate entries in authoring order
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry<V>> {
        self.entries.iter()
    }

    /// Entry at a position
    pub fn entry(&self, index: usize) -> Option<&RegistryEntry<V>> {
        self.entries.get(index)
    }

    /// Value at a position
    pub fn value(&self, index: usize) -> Option<&V> {
        self.entries.get(index).map(|e| &e.value)
    }

    /// Mutable value at a position
    pub fn value_mut(&mut self, index: usize) -> Option<&mut V> {
        self.entries.get_mut(index).map(|e| &mut e.value)
    }

    /// Add an entry, renaming it if the name is taken. Returns its position.
    pub fn add(&mut self, name: &str, value: V) -> usize {
        let name = self.unique_name(name, None);
        self.entries.push(RegistryEntry::new(name, value));
        self.entries.len() - 1
    }

    /// Rename an entry, applying the same duplicate avoidance as `add`.
    ///
    /// Returns the name actually assigned.
    pub fn rename(&mut self, index: usize, name: &str) -> Option<String> {
        if index >= self.entries.len() {
            return None;
        }
        let name = self.unique_name(name, Some(index));
        let entry = &mut self.entries[index];
        entry.hash = NameHash::of(&name);
        entry.name = name.clone();
        self.reindex();
        Some(name)
    }

    /// Remove an entry; later entries shift down by one
    pub fn remove(&mut self, index: usize) -> Option<RegistryEntry<V>> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        self.reindex();
        Some(entry)
    }

    /// Position of the first entry with this name (linear scan)
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Value by name (linear scan, authoring path)
    pub fn get_by_name(&self, name: &str) -> Option<&V> {
        self.position_by_name(name).map(|i| &self.entries[i].value)
    }

    /// Mutable value by name (linear scan, authoring path)
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut V> {
        let index = self.position_by_name(name)?;
        Some(&mut self.entries[index].value)
    }

    /// Position for a hash
    ///
    /// Frozen registries answer from the index. Authoring registries fall back
    /// to comparing stored hashes.
    pub fn position(&self, hash: NameHash) -> Option<usize> {
        if self.frozen {
            self.index.get(&hash).copied()
        } else {
            self.entries.iter().position(|e| e.hash == hash)
        }
    }

    /// Value for a hash
    pub fn get(&self, hash: NameHash) -> Option<&V> {
        self.position(hash).map(|i| &self.entries[i].value)
    }

    /// Mutable value for a hash
    pub fn get_mut(&mut self, hash: NameHash) -> Option<&mut V> {
        let index = self.position(hash)?;
        Some(&mut self.entries[index].value)
    }

    /// Value for a hash, only if it has the requested kind
    pub fn get_kind(&self, kind: V::Kind, hash: NameHash) -> Option<&V> {
        self.get(hash).filter(|v| v.value_kind() == kind)
    }

    /// Mutable value for a hash, only if it has the requested kind
    pub fn get_kind_mut(&mut self, kind: V::Kind, hash: NameHash) -> Option<&mut V> {
        self.get_mut(hash).filter(|v| v.value_kind() == kind)
    }

    /// Write a value through a hash without changing the entry's kind
    pub fn set(&mut self, hash: NameHash, value: V) -> SetOutcome {
        let Some(slot) = self.get_mut(hash) else {
            return SetOutcome::Missing;
        };
        if slot.value_kind() != value.value_kind() {
            return SetOutcome::KindMismatch;
        }
        if *slot == value {
            return SetOutcome::Unchanged;
        }
        *slot = value;
        SetOutcome::Changed
    }

    /// Deep copy for a runtime instance, with the hash index built
    ///
    /// Hashes are recomputed from names so a stale or hand-edited hash never
    /// survives into an instance. On a hash collision the first entry wins.
    pub fn freeze(&self) -> Self {
        let entries: Vec<_> = self
            .entries
            .iter()
            .map(|e| RegistryEntry::new(e.name.clone(), e.value.clone()))
            .collect();
        let mut frozen = Self {
            entries,
            index: HashMap::new(),
            frozen: true,
        };
        frozen.reindex();
        frozen
    }

    fn reindex(&mut self) {
        if !self.frozen {
            return;
        }
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            if let Some(existing) = self.index.get(&entry.hash) {
                tracing::warn!(
                    name = %entry.name,
                    shadowed_by = %self.entries[*existing].name,
                    "Duplicate name hash in registry; later entry is unreachable by hash"
                );
                continue;
            }
            self.index.insert(entry.hash, i);
        }
    }

    fn unique_name(&self, base: &str, skip: Option<usize>) -> String {
        let taken = |candidate: &str| {
            self.entries
                .iter()
                .enumerate()
                .any(|(i, e)| Some(i) != skip && e.name == candidate)
        };
        if !taken(base) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base} ({n})");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

impl<V: TypedValue> Default for ValueRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::ParameterKind;

    #[test]
    fn test_duplicate_names_are_renamed() {
        let mut reg = ParameterRegistry::new();
        reg.add("Speed", ParameterValue::Float(0.0));
        let second = reg.add("Speed", ParameterValue::Float(1.0));
        let third = reg.add("Speed", ParameterValue::Float(2.0));

        assert_eq!(reg.entry(second).unwrap().name, "Speed (1)");
        assert_eq!(reg.entry(third).unwrap().name, "Speed (2)");
    }

    #[test]
    fn test_rename_keeps_own_name() {
        let mut reg = ParameterRegistry::new();
        let i = reg.add("Go", ParameterValue::Bool(false));
        assert_eq!(reg.rename(i, "Go").as_deref(), Some("Go"));
        assert_eq!(reg.rename(i, "Run").as_deref(), Some("Run"));
        assert_eq!(reg.entry(i).unwrap().hash, NameHash::of("Run"));
        assert!(reg.get_by_name("Go").is_none());
    }

    #[test]
    fn test_hash_lookup_authoring_and_frozen() {
        let mut reg = ParameterRegistry::new();
        reg.add("Speed", ParameterValue::Float(2.5));
        reg.add("Jumps", ParameterValue::Int(1));

        assert_eq!(reg.position(NameHash::of("Jumps")), Some(1));

        let frozen = reg.freeze();
        assert!(frozen.is_frozen());
        assert_eq!(frozen.position(NameHash::of("Jumps")), Some(1));
        assert_eq!(
            frozen.get(NameHash::of("Speed")),
            Some(&ParameterValue::Float(2.5))
        );
        assert!(frozen.get(NameHash::of("Missing")).is_none());
    }

    #[test]
    fn test_frozen_copy_is_independent() {
        let mut reg = ParameterRegistry::new();
        reg.add("Speed", ParameterValue::Float(1.0));
        let mut frozen = reg.freeze();

        *frozen.get_mut(NameHash::of("Speed")).unwrap() = ParameterValue::Float(9.0);
        assert_eq!(reg.get_by_name("Speed"), Some(&ParameterValue::Float(1.0)));
    }

    #[test]
    fn test_kind_filtered_lookup() {
        let mut reg = ParameterRegistry::new();
        reg.add("Go", ParameterValue::Bool(true));
        let frozen = reg.freeze();

        assert!(frozen.get_kind(ParameterKind::Bool, NameHash::of("Go")).is_some());
        assert!(frozen.get_kind(ParameterKind::Float, NameHash::of("Go")).is_none());
    }

    #[test]
    fn test_set_outcomes() {
        let mut reg = ParameterRegistry::new();
        reg.add("Speed", ParameterValue::Float(1.0));
        let mut frozen = reg.freeze();
        let speed = NameHash::of("Speed");

        assert_eq!(frozen.set(speed, ParameterValue::Float(1.0)), SetOutcome::Unchanged);
        assert_eq!(frozen.set(speed, ParameterValue::Float(2.0)), SetOutcome::Changed);
        assert_eq!(frozen.set(speed, ParameterValue::Int(2)), SetOutcome::KindMismatch);
        assert_eq!(
            frozen.set(NameHash::of("Nope"), ParameterValue::Int(2)),
            SetOutcome::Missing
        );
        assert_eq!(frozen.get(speed), Some(&ParameterValue::Float(2.0)));
    }

    #[test]
    fn test_remove_reindexes() {
        let mut reg = ParameterRegistry::new();
        reg.add("A", ParameterValue::Int(0));
        reg.add("B", ParameterValue::Int(1));
        let mut frozen = reg.freeze();
        frozen.remove(0);
        assert_eq!(frozen.position(NameHash::of("B")), Some(0));
        assert_eq!(frozen.position(NameHash::of("A")), None);
    }
}
