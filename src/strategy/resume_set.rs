//! Bounded candidate sets for set-resumable strategies.

use crate::offset::Addressable;

/// A bounded, enumerable set of candidates a [`super::SetResumeStrategy`] can filter.
///
/// Object-safe so strategies can filter any candidate type.
pub trait ResumableSet: Send {
    /// Keep only the entries for which `keep` returns `true`
    fn resume_each(&mut self, keep: &mut dyn FnMut(&Addressable) -> bool);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Candidates keyed by their addressable, in discovery order
#[derive(Debug, Clone)]
pub struct ResumeSet<T> {
    entries: Vec<(Addressable, T)>,
}

impl<T> Default for ResumeSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ResumeSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, addressable: Addressable, item: T) {
        self.entries.push((addressable, item));
    }

    pub fn addressables(&self) -> impl Iterator<Item = &Addressable> {
        self.entries.iter().map(|(addressable, _)| addressable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Addressable, &T)> {
        self.entries.iter().map(|(addressable, item)| (addressable, item))
    }

    pub fn into_items(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, item)| item).collect()
    }

    pub fn into_entries(self) -> Vec<(Addressable, T)> {
        self.entries
    }
}

impl<T> FromIterator<(Addressable, T)> for ResumeSet<T> {
    fn from_iter<I: IntoIterator<Item = (Addressable, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<T: Send> ResumableSet for ResumeSet<T> {
    fn resume_each(&mut self, keep: &mut dyn FnMut(&Addressable) -> bool) {
        self.entries.retain(|(addressable, _)| keep(addressable));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
