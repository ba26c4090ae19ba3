//! The visited set shared across one closing pass.

use rustc_hash::FxHashSet;

use genbind_types::Ty;

/// Closed identities already bound during the current pass.
///
/// A closed identity enters the registry at most once; re-encountering it
/// ends that branch of propagation.
#[derive(Debug, Default)]
pub struct VisitedSet {
    closed: FxHashSet<Ty>,
    /// Insertion order, for reporting.
    order: Vec<Ty>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, ty: &Ty) -> bool {
        self.closed.contains(ty)
    }

    /// Record `ty`. Returns false if it was already present.
    pub fn insert(&mut self, ty: Ty) -> bool {
        if !self.closed.insert(ty.clone()) {
            return false;
        }
        self.order.push(ty);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Closed identities in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Ty> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_once() {
        let mut visited = VisitedSet::new();
        let a = Ty::generic("Handler", vec![Ty::named("Cmd1")]);
        assert!(visited.insert(a.clone()));
        assert!(!visited.insert(a.clone()));
        assert!(visited.contains(&a));
        assert_eq!(visited.len(), 1);
    }
}
