//! Change summaries

use rustc_hash::FxHashMap;

use domwatch_dom::{DomTree, MutationKind, MutationRecord, NodeId};

/// Aggregate view of a batch of mutation records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Element nodes added, across all child-list records, in record order
    pub added_elements: Vec<NodeId>,
    /// Element nodes removed, across all child-list records, in record order
    pub removed_elements: Vec<NodeId>,
    /// Number of character-data records
    pub text_change_count: usize,
    /// Number of attribute records per attribute name
    pub attribute_change_counts: FxHashMap<String, usize>,
}

impl ChangeSummary {
    /// Summarize `records`; node types are read from `tree`
    pub fn from_records(tree: &DomTree, records: &[MutationRecord]) -> Self {
        let is_element = |id: &&NodeId| tree.get(**id).map(|n| n.is_element()).unwrap_or(false);
        let mut summary = Self::default();

        for record in records {
            match record.kind {
                MutationKind::ChildList => {
                    summary.added_elements.extend(record.added_nodes.iter().filter(is_element));
                    summary.removed_elements.extend(record.removed_nodes.iter().filter(is_element));
                }
                MutationKind::CharacterData => summary.text_change_count += 1,
                MutationKind::Attributes => {
                    if let Some(name) = &record.attribute_name {
                        *summary.attribute_change_counts.entry(name.clone()).or_insert(0) += 1;
                    }
                }
            }
        }

        summary
    }

    /// Count of attribute records for one attribute
    pub fn attribute_changes(&self, name: &str) -> usize {
        self.attribute_change_counts.get(name).copied().unwrap_or(0)
    }

    /// True when nothing was added, removed or changed
    pub fn is_empty(&self) -> bool {
        self.added_elements.is_empty()
            && self.removed_elements.is_empty()
            && self.text_change_count == 0
            && self.attribute_change_counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domwatch_dom::ObserveOptions;

    #[test]
    fn test_summary_counts() {
        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        tree.append_child(tree.document_id(), root).unwrap();
        let observer = tree.create_observer();
        tree.observe(
            observer,
            root,
            ObserveOptions::new()
                .with_child_list(true)
                .with_attributes(true)
                .with_character_data(true)
                .with_subtree(true),
        )
        .unwrap();

        let p = tree.create_element("p");
        let text = tree.create_text("a");
        tree.append_child(root, p).unwrap();
        tree.append_child(root, text).unwrap();
        tree.set_text(text, "b").unwrap();
        tree.set_text(text, "c").unwrap();
        tree.set_attribute(p, "class", "x").unwrap();
        tree.set_attribute(p, "class", "y").unwrap();
        tree.set_attribute(root, "title", "t").unwrap();
        tree.remove_child(root, p).unwrap();

        let records = tree.take_records(observer).unwrap();
        let summary = ChangeSummary::from_records(&tree, &records);

        // Text nodes are not reported as added elements
        assert_eq!(summary.added_elements, vec![p]);
        assert_eq!(summary.removed_elements, vec![p]);
        assert_eq!(summary.text_change_count, 2);
        assert_eq!(summary.attribute_changes("class"), 2);
        assert_eq!(summary.attribute_changes("title"), 1);
        assert_eq!(summary.attribute_changes("id"), 0);
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_empty_summary() {
        let tree = DomTree::new();
        assert!(ChangeSummary::from_records(&tree, &[]).is_empty());
    }
}
