//! Repeatable-entry collections
//!
//! Obligations, income sources and co-borrowers are user-extensible lists
//! nested inside a parent form (the main borrower, or one other-borrower
//! page). Ids are allocated per parent:
//!
//! - a new id is `max(existing) + 1`, or `0` for an empty collection
//! - once an entry holds `u32::MAX` no further id can be allocated and
//!   adding fails with [`ContentError::IdExhausted`]
//! - ids freed by deletion are not reused, survivors are never renumbered
//! - display captions ("Borrower #2") come from list position, not from id

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use tracing::warn;

use crate::types::{ContentError, Result};

/// An entry with an id unique among its siblings
pub trait Identified {
    fn id(&self) -> u32;
    fn set_id(&mut self, id: u32);
}

/// Next id for a new entry among `entries`. Duplicate ids do not change the
/// result. `None` when the highest id is already `u32::MAX`.
pub fn generate_new_id<T: Identified>(entries: &[T]) -> Option<u32> {
    match entries.iter().map(Identified::id).max() {
        Some(max) => max.checked_add(1),
        None => Some(0),
    }
}

/// Ids that occur more than once, sorted. Logged, never repaired.
pub fn find_duplicate_ids<T: Identified>(entries: &[T]) -> Vec<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.id()).or_default() += 1;
    }
    let duplicates: Vec<u32> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect();

    if !duplicates.is_empty() {
        warn!(ids = ?duplicates, entries = entries.len(), "Duplicate ids in collection");
    }
    duplicates
}

// =============================================================================
// Collection
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepeatableCollection<T> {
    entries: Vec<T>,
}

impl<T> Default for RepeatableCollection<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Identified> RepeatableCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing entries as they are
    pub fn from_entries(entries: Vec<T>) -> Self {
        find_duplicate_ids(&entries);
        Self { entries }
    }

    pub fn next_id(&self) -> Option<u32> {
        generate_new_id(&self.entries)
    }

    fn allocate(&self) -> Result<u32> {
        self.next_id().ok_or_else(|| {
            warn!(entries = self.entries.len(), "Collection id space exhausted");
            ContentError::IdExhausted
        })
    }

    /// Append `entry` under a freshly allocated id
    pub fn add(&mut self, mut entry: T) -> Result<u32> {
        let id = self.allocate()?;
        entry.set_id(id);
        self.entries.push(entry);
        Ok(id)
    }

    /// Append the entry built by `build` from the allocated id
    pub fn add_with(&mut self, build: impl FnOnce(u32) -> T) -> Result<u32> {
        let id = self.allocate()?;
        let mut entry = build(id);
        entry.set_id(id);
        self.entries.push(entry);
        Ok(id)
    }

    /// Replace the entry with the same id, or add `entry` as new when its id
    /// is unknown. Returns the id the entry ended up with.
    pub fn upsert(&mut self, entry: T) -> Result<u32> {
        let id = entry.id();
        match self.entries.iter_mut().find(|e| e.id() == id) {
            Some(existing) => {
                *existing = entry;
                Ok(id)
            }
            None => self.add(entry),
        }
    }

    pub fn update(&mut self, id: u32, apply: impl FnOnce(&mut T)) -> bool {
        match self.entries.iter_mut().find(|e| e.id() == id) {
            Some(entry) => {
                apply(entry);
                entry.set_id(id);
                true
            }
            None => false,
        }
    }

    /// Remove by id; other entries keep their ids
    pub fn remove(&mut self, id: u32) -> Option<T> {
        let index = self.entries.iter().position(|e| e.id() == id)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// 1-based list position, used for display captions
    pub fn position_label(&self, id: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id).map(|i| i + 1)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(Identified::id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// =============================================================================
// Parent scoping
// =============================================================================

/// Which form a nested collection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorrowerPage {
    Main,
    /// Other-borrower page, by the borrower's id
    Other(u32),
}

impl fmt::Display for BorrowerPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Other(id) => write!(f, "other:{id}"),
        }
    }
}

/// One collection per parent. Allocation only ever sees siblings.
#[derive(Debug, Clone)]
pub struct ParentScopedCollections<P, T> {
    parents: HashMap<P, RepeatableCollection<T>>,
}

impl<P, T> Default for ParentScopedCollections<P, T> {
    fn default() -> Self {
        Self {
            parents: HashMap::new(),
        }
    }
}

impl<P: Eq + Hash + Clone, T: Identified> ParentScopedCollections<P, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, parent: &P) -> Option<&RepeatableCollection<T>> {
        self.parents.get(parent)
    }

    pub fn collection_mut(&mut self, parent: P) -> &mut RepeatableCollection<T> {
        self.parents.entry(parent).or_default()
    }

    pub fn add(&mut self, parent: P, entry: T) -> Result<u32> {
        self.collection_mut(parent).add(entry)
    }

    pub fn remove(&mut self, parent: &P, id: u32) -> Option<T> {
        self.parents.get_mut(parent)?.remove(id)
    }

    pub fn next_id(&self, parent: &P) -> Option<u32> {
        self.parents.get(parent).map_or(Some(0), RepeatableCollection::next_id)
    }

    /// Drop a parent together with its entries
    pub fn remove_parent(&mut self, parent: &P) -> Option<RepeatableCollection<T>> {
        self.parents.remove(parent)
    }

    pub fn parents(&self) -> impl Iterator<Item = &P> {
        self.parents.keys()
    }

    pub fn total_entries(&self) -> usize {
        self.parents.values().map(RepeatableCollection::len).sum()
    }
}

// =============================================================================
// Entry types
// =============================================================================

/// An existing debt of a borrower
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: u32,
    pub obligation_type: String,
    pub bank: Option<String>,
    pub monthly_payment: Option<u64>,
    pub end_date: Option<NaiveDate>,
}

/// A main or additional source of income
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeSource {
    pub id: u32,
    pub source: String,
    pub monthly_income: Option<u64>,
    pub start_date: Option<NaiveDate>,
    pub field_of_activity: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherBorrower {
    pub id: u32,
    pub name: Option<String>,
    pub relationship: Option<String>,
}

macro_rules! impl_identified {
    ($($ty:ty),*) => {
        $(impl Identified for $ty {
            fn id(&self) -> u32 {
                self.id
            }

            fn set_id(&mut self, id: u32) {
                self.id = id;
            }
        })*
    };
}

impl_identified!(Obligation, IncomeSource, OtherBorrower);
