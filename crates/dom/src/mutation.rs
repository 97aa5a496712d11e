//! Mutation records and observer registrations
//!
//! Implements the bookkeeping half of `MutationObserver`: which observers
//! are interested in a mutation, and the per-observer queue of records
//! waiting to be delivered. Delivery itself (callbacks, microtask timing)
//! belongs to the runtime.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{DomError, DomResult};
use crate::node::NodeId;

/// Identifier of a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObserverId({})", self.0)
    }
}

/// Category of a mutation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Children were added and/or removed
    ChildList,
    /// An attribute was set or removed
    Attributes,
    /// Text or comment data changed
    CharacterData,
}

/// A single discrete DOM mutation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Parent for `ChildList`, element for `Attributes`, data node for `CharacterData`
    pub target: NodeId,
    pub added_nodes: SmallVec<[NodeId; 2]>,
    pub removed_nodes: SmallVec<[NodeId; 2]>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Lowercased attribute name for `Attributes` records
    pub attribute_name: Option<String>,
    /// Previous value, only when the observer asked for old values
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub(crate) fn child_list(
        target: NodeId,
        added_nodes: SmallVec<[NodeId; 2]>,
        removed_nodes: SmallVec<[NodeId; 2]>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
        }
    }

    pub(crate) fn attributes(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added_nodes: SmallVec::new(),
            removed_nodes: SmallVec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_ascii_lowercase()),
            old_value,
        }
    }

    pub(crate) fn character_data(target: NodeId, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            added_nodes: SmallVec::new(),
            removed_nodes: SmallVec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value,
        }
    }
}

/// Which mutations an observer wants for a target (`MutationObserverInit`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    /// Also observe descendants of the target
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    /// Restrict attribute records to these names
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_child_list(mut self, enabled: bool) -> Self {
        self.child_list = enabled;
        self
    }

    pub fn with_attributes(mut self, enabled: bool) -> Self {
        self.attributes = enabled;
        self
    }

    pub fn with_character_data(mut self, enabled: bool) -> Self {
        self.character_data = enabled;
        self
    }

    pub fn with_subtree(mut self, enabled: bool) -> Self {
        self.subtree = enabled;
        self
    }

    pub fn with_attribute_old_value(mut self, enabled: bool) -> Self {
        self.attribute_old_value = enabled;
        self
    }

    pub fn with_character_data_old_value(mut self, enabled: bool) -> Self {
        self.character_data_old_value = enabled;
        self
    }

    /// Restrict attribute observation to the given names
    pub fn with_attribute_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Apply the implied flags and reject option sets that observe nothing
    pub fn normalized(mut self) -> DomResult<Self> {
        if self.attribute_old_value || self.attribute_filter.is_some() {
            self.attributes = true;
        }
        if self.character_data_old_value {
            self.character_data = true;
        }
        if let Some(filter) = self.attribute_filter.as_mut() {
            for name in filter.iter_mut() {
                *name = name.to_ascii_lowercase();
            }
        }
        if !(self.child_list || self.attributes || self.character_data) {
            return Err(DomError::InvalidObserveOptions);
        }
        Ok(self)
    }

    fn wants_attribute(&self, name: &str) -> bool {
        self.attributes
            && self
                .attribute_filter
                .as_ref()
                .map(|filter| filter.iter().any(|n| n == name))
                .unwrap_or(true)
    }
}

/// One observer: its registrations and the records not yet delivered
#[derive(Debug, Default)]
pub(crate) struct ObserverState {
    registrations: SmallVec<[(NodeId, ObserveOptions); 1]>,
    pending: Vec<MutationRecord>,
}

/// All observers of a tree
#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    observers: Vec<(ObserverId, ObserverState)>,
    next_id: u32,
}

impl ObserverRegistry {
    pub(crate) fn create(&mut self) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, ObserverState::default()));
        id
    }

    fn state_mut(&mut self, id: ObserverId) -> DomResult<&mut ObserverState> {
        self.observers
            .iter_mut()
            .find(|(oid, _)| *oid == id)
            .map(|(_, state)| state)
            .ok_or(DomError::ObserverNotFound(id.0))
    }

    pub(crate) fn register(
        &mut self,
        id: ObserverId,
        target: NodeId,
        options: ObserveOptions,
    ) -> DomResult<()> {
        let state = self.state_mut(id)?;
        // Observing the same target again replaces its options
        if let Some(existing) = state.registrations.iter_mut().find(|(node, _)| *node == target) {
            existing.1 = options;
        } else {
            state.registrations.push((target, options));
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        before != self.observers.len()
    }

    pub(crate) fn take_records(&mut self, id: ObserverId) -> DomResult<Vec<MutationRecord>> {
        Ok(std::mem::take(&mut self.state_mut(id)?.pending))
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.observers.iter().any(|(_, state)| !state.pending.is_empty())
    }

    /// Drain every non-empty queue in observer creation order
    pub(crate) fn take_pending(&mut self) -> Vec<(ObserverId, Vec<MutationRecord>)> {
        self.observers
            .iter_mut()
            .filter(|(_, state)| !state.pending.is_empty())
            .map(|(id, state)| (*id, std::mem::take(&mut state.pending)))
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.iter().all(|(_, state)| state.registrations.is_empty())
    }

    /// Queue `record` for every interested observer.
    ///
    /// `ancestors` are the inclusive ancestors of the record's target,
    /// target first. `old_value` is attached only for observers that asked
    /// for it.
    pub(crate) fn queue(
        &mut self,
        ancestors: &[NodeId],
        record: MutationRecord,
        old_value: Option<&str>,
    ) {
        for (_, state) in self.observers.iter_mut() {
            let mut interested = false;
            let mut wants_old = false;

            for (node, options) in &state.registrations {
                let Some(depth) = ancestors.iter().position(|a| a == node) else {
                    continue;
                };
                if depth > 0 && !options.subtree {
                    continue;
                }
                let matches = match record.kind {
                    MutationKind::ChildList => options.child_list,
                    MutationKind::Attributes => record
                        .attribute_name
                        .as_deref()
                        .map(|name| options.wants_attribute(name))
                        .unwrap_or(false),
                    MutationKind::CharacterData => options.character_data,
                };
                if !matches {
                    continue;
                }
                interested = true;
                wants_old |= match record.kind {
                    MutationKind::Attributes => options.attribute_old_value,
                    MutationKind::CharacterData => options.character_data_old_value,
                    MutationKind::ChildList => false,
                };
            }

            if interested {
                let mut queued = record.clone();
                if wants_old {
                    queued.old_value = old_value.map(str::to_string);
                }
                state.pending.push(queued);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_implied_flags() {
        let options = ObserveOptions::new()
            .with_attribute_filter(["Class"])
            .with_character_data_old_value(true)
            .normalized()
            .unwrap();

        assert!(options.attributes);
        assert!(options.character_data);
        assert_eq!(options.attribute_filter, Some(vec!["class".to_string()]));
    }

    #[test]
    fn test_normalize_rejects_empty_options() {
        let err = ObserveOptions::new().with_subtree(true).normalized().unwrap_err();
        assert_eq!(err, DomError::InvalidObserveOptions);
    }

    #[test]
    fn test_queue_respects_subtree_and_filter() {
        let mut registry = ObserverRegistry::default();
        let shallow = registry.create();
        let deep = registry.create();
        let root = NodeId(1);
        let child = NodeId(2);

        let attrs = ObserveOptions::new().with_attribute_filter(["title"]).normalized().unwrap();
        registry.register(shallow, root, attrs.clone()).unwrap();
        registry.register(deep, root, attrs.with_subtree(true)).unwrap();

        registry.queue(&[child, root], MutationRecord::attributes(child, "title", None), None);
        registry.queue(&[root], MutationRecord::attributes(root, "id", None), None);

        let pending = registry.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, deep);
        assert_eq!(pending[0].1.len(), 1);
        assert!(!registry.has_pending());
    }

    #[test]
    fn test_old_value_only_when_requested() {
        let mut registry = ObserverRegistry::default();
        let plain = registry.create();
        let with_old = registry.create();
        let node = NodeId(5);

        registry
            .register(plain, node, ObserveOptions::new().with_character_data(true))
            .unwrap();
        registry
            .register(with_old, node, ObserveOptions::new().with_character_data_old_value(true).normalized().unwrap())
            .unwrap();

        registry.queue(&[node], MutationRecord::character_data(node, None), Some("before"));

        assert_eq!(registry.take_records(plain).unwrap()[0].old_value, None);
        assert_eq!(
            registry.take_records(with_old).unwrap()[0].old_value.as_deref(),
            Some("before")
        );
    }

    #[test]
    fn test_remove_drops_pending() {
        let mut registry = ObserverRegistry::default();
        let id = registry.create();
        let node = NodeId(3);
        registry.register(id, node, ObserveOptions::new().with_child_list(true)).unwrap();
        registry.queue(
            &[node],
            MutationRecord::child_list(node, SmallVec::new(), SmallVec::new(), None, None),
            None,
        );

        assert!(registry.has_pending());
        assert!(registry.remove(id));
        assert!(!registry.has_pending());
        assert!(registry.is_empty());
        assert!(!registry.remove(id));
        assert_eq!(registry.take_records(id), Err(DomError::ObserverNotFound(id.0)));
    }
}
