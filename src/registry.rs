use log::debug;

use crate::host::Host;

/// Elements still waiting to be loaded.
///
/// Stored in reverse document order so a scan from the back visits elements
/// in document order and each removal only shifts already-visited slots.
#[derive(Debug)]
pub struct CandidateRegistry<E> {
    candidates: Vec<E>,
}

impl<E: Clone + PartialEq> CandidateRegistry<E> {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// Replace the registry with a fresh query of `selector`.
    pub fn rebuild<H>(&mut self, host: &H, selector: &str)
    where
        H: Host<Element = E>,
    {
        let mut candidates: Vec<E> = Vec::new();
        for element in host.query_selector_all(selector) {
            if !candidates.contains(&element) {
                candidates.push(element);
            }
        }
        candidates.reverse();
        debug!(
            "Registry rebuilt from '{}': {} candidates",
            selector,
            candidates.len()
        );
        self.candidates = candidates;
    }

    pub fn remove(&mut self, index: usize) -> E {
        self.candidates.remove(index)
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.candidates.get(index)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
    }

    pub fn contains(&self, element: &E) -> bool {
        self.candidates.contains(element)
    }

    /// Candidates in document order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.candidates.iter().rev()
    }
}

impl<E: Clone + PartialEq> Default for CandidateRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
