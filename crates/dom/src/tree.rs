//! DOM Tree structure
//!
//! Nodes live in an arena keyed by [`NodeId`] and are never freed, so
//! ids held by mutation records stay valid after a node is detached.

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};
use std::fmt;

use crate::error::{DomError, DomResult};
use crate::mutation::{MutationRecord, ObserveOptions, ObserverId, ObserverRegistry};
use crate::node::{ElementData, Node, NodeId, NodeType};

/// DOM tree that owns all nodes
pub struct DomTree {
    /// All nodes in the tree
    nodes: FxHashMap<NodeId, Node>,
    /// Next available node ID
    next_id: u32,
    /// Root document node
    document_id: NodeId,
    /// Mutation observers and their undelivered records
    observers: ObserverRegistry,
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        let document_id = NodeId::new(0);
        let document = Node::new(document_id, NodeType::Document);

        let mut nodes = FxHashMap::default();
        nodes.insert(document_id, document);

        Self {
            nodes,
            next_id: 1,
            document_id,
            observers: ObserverRegistry::default(),
        }
    }

    /// Get the document (root) node ID
    pub fn document_id(&self) -> NodeId {
        self.document_id
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.nodes.get(&id).ok_or(DomError::NodeNotFound(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id.0))
    }

    fn insert_node(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, node_type));
        id
    }

    /// Create a new (detached) element node
    pub fn create_element(&mut self, tag_name: impl Into<String>) -> NodeId {
        self.insert_node(NodeType::Element(ElementData::new(tag_name)))
    }

    /// Create a new (detached) text node
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.insert_node(NodeType::Text(content.into()))
    }

    /// Create a new (detached) comment node
    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.insert_node(NodeType::Comment(content.into()))
    }

    // ---- Navigation ----

    /// Parent of a node, if attached
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id)
            .map(|n| n.children.to_vec())
            .unwrap_or_default()
    }

    /// Position of a node among its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.get(parent)?.children.iter().position(|c| *c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).and_then(|i| self.get(parent)?.children.get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.get(parent)?.children.get(index + 1).copied()
    }

    /// The node itself followed by its ancestors up to its root
    pub fn inclusive_ancestors(&self, id: NodeId) -> SmallVec<[NodeId; 16]> {
        let mut chain = SmallVec::new();
        let mut current = self.get(id).map(|n| n.id);
        while let Some(node_id) = current {
            chain.push(node_id);
            current = self.parent(node_id);
        }
        chain
    }

    /// Topmost ancestor of a node (the document when connected)
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.inclusive_ancestors(id).last().copied().unwrap_or(id)
    }

    /// Whether `descendant` is `ancestor` or lies somewhere beneath it
    pub fn contains(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        self.inclusive_ancestors(descendant).contains(&ancestor)
    }

    /// Whether a node is attached to the document
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.root_of(id) == self.document_id
    }

    /// Child indices from the node's root down to the node.
    ///
    /// Comparing positions lexicographically gives document order for
    /// nodes sharing a root.
    pub fn tree_position(&self, id: NodeId) -> SmallVec<[usize; 16]> {
        let mut path: SmallVec<[usize; 16]> = self
            .inclusive_ancestors(id)
            .iter()
            .filter_map(|node| self.index_in_parent(*node))
            .collect();
        path.reverse();
        path
    }

    /// Get the text content of a node and all its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, result: &mut String) {
        if let Some(node) = self.get(id) {
            match &node.node_type {
                NodeType::Text(text) => result.push_str(text),
                NodeType::Comment(_) => {}
                _ => {
                    for &child_id in &node.children {
                        self.collect_text(child_id, result);
                    }
                }
            }
        }
    }

    /// Get an attribute of an element
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attribute(name)
    }

    // ---- Mutation ----

    fn ensure_insertable(
        &self,
        parent_id: NodeId,
        child_id: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let parent = self.node(parent_id)?;
        let child = self.node(child_id)?;

        if !parent.can_have_children() {
            return Err(DomError::HierarchyRequest(format!(
                "{} cannot have children",
                parent_id
            )));
        }
        if child.is_document() {
            return Err(DomError::HierarchyRequest("the document cannot be inserted".into()));
        }
        if self.contains(child_id, parent_id) {
            return Err(DomError::HierarchyRequest(format!(
                "{} is an ancestor of {}",
                child_id, parent_id
            )));
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent_id) {
                return Err(DomError::NotAChild { parent: parent_id.0, child: reference.0 });
            }
        }
        Ok(())
    }

    /// Append a child node to a parent, moving it if already attached
    pub fn append_child(&mut self, parent_id: NodeId, child_id: NodeId) -> DomResult<()> {
        self.insert_before(parent_id, child_id, None)
    }

    /// Insert `child_id` before `reference` (or at the end when `None`)
    pub fn insert_before(
        &mut self,
        parent_id: NodeId,
        child_id: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.ensure_insertable(parent_id, child_id, reference)?;

        let reference = if reference == Some(child_id) {
            self.next_sibling(child_id)
        } else {
            reference
        };

        self.detach(child_id)?;

        let index = match reference {
            Some(r) => self.index_in_parent(r).unwrap_or(self.node(parent_id)?.children.len()),
            None => self.node(parent_id)?.children.len(),
        };
        let previous = index
            .checked_sub(1)
            .and_then(|i| self.get(parent_id).and_then(|p| p.children.get(i).copied()));

        self.node_mut(parent_id)?.children.insert(index, child_id);
        self.node_mut(child_id)?.parent = Some(parent_id);

        self.queue_record(
            MutationRecord::child_list(parent_id, smallvec![child_id], SmallVec::new(), previous, reference),
            None,
        );
        Ok(())
    }

    /// Remove a node from its parent
    pub fn remove_child(&mut self, parent_id: NodeId, child_id: NodeId) -> DomResult<()> {
        self.node(parent_id)?;
        self.node(child_id)?;
        if self.parent(child_id) != Some(parent_id) {
            return Err(DomError::NotAChild { parent: parent_id.0, child: child_id.0 });
        }
        self.detach(child_id)
    }

    /// Remove a node from whatever parent it has; no-op when detached
    pub fn detach(&mut self, child_id: NodeId) -> DomResult<()> {
        let Some(parent_id) = self.parent(child_id) else {
            return Ok(());
        };
        let previous = self.previous_sibling(child_id);
        let next = self.next_sibling(child_id);

        self.unlink(parent_id, child_id)?;

        self.queue_record(
            MutationRecord::child_list(parent_id, SmallVec::new(), smallvec![child_id], previous, next),
            None,
        );
        Ok(())
    }

    fn unlink(&mut self, parent_id: NodeId, child_id: NodeId) -> DomResult<()> {
        self.node_mut(parent_id)?.children.retain(|id| *id != child_id);
        self.node_mut(child_id)?.parent = None;
        Ok(())
    }

    /// Replace `old_child` with `new_child` as a single mutation
    pub fn replace_child(
        &mut self,
        parent_id: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<()> {
        self.node(old_child)?;
        if self.parent(old_child) != Some(parent_id) {
            return Err(DomError::NotAChild { parent: parent_id.0, child: old_child.0 });
        }
        self.ensure_insertable(parent_id, new_child, None)?;
        if new_child == old_child {
            return Ok(());
        }

        let mut reference = self.next_sibling(old_child);
        if reference == Some(new_child) {
            reference = self.next_sibling(new_child);
        }
        let mut previous = self.previous_sibling(old_child);
        if previous == Some(new_child) {
            previous = self.previous_sibling(new_child);
        }

        self.detach(new_child)?;

        let index = self.index_in_parent(old_child).unwrap_or(0);
        self.unlink(parent_id, old_child)?;
        self.node_mut(parent_id)?.children.insert(index, new_child);
        self.node_mut(new_child)?.parent = Some(parent_id);

        self.queue_record(
            MutationRecord::child_list(
                parent_id,
                smallvec![new_child],
                smallvec![old_child],
                previous,
                reference,
            ),
            None,
        );
        Ok(())
    }

    /// Replace all children of `parent_id` as a single mutation
    ///
    /// A node listed more than once is inserted once, at its last position.
    pub fn replace_children(&mut self, parent_id: NodeId, new_children: &[NodeId]) -> DomResult<()> {
        let new_children: Vec<NodeId> = new_children
            .iter()
            .enumerate()
            .filter(|(i, child)| !new_children[i + 1..].contains(*child))
            .map(|(_, child)| *child)
            .collect();

        for &child in &new_children {
            self.ensure_insertable(parent_id, child, None)?;
        }
        for &child in &new_children {
            if self.parent(child) != Some(parent_id) {
                self.detach(child)?;
            }
        }

        let removed: SmallVec<[NodeId; 2]> = self
            .node(parent_id)?
            .children
            .iter()
            .copied()
            .filter(|c| !new_children.contains(c))
            .collect();

        let old_children = self.node(parent_id)?.children.clone();
        for old in old_children {
            self.node_mut(old)?.parent = None;
        }
        self.node_mut(parent_id)?.children = new_children.iter().copied().collect();
        for &child in &new_children {
            self.node_mut(child)?.parent = Some(parent_id);
        }

        let added: SmallVec<[NodeId; 2]> = new_children.iter().copied().collect();
        if !added.is_empty() || !removed.is_empty() {
            self.queue_record(MutationRecord::child_list(parent_id, added, removed, None, None), None);
        }
        Ok(())
    }

    /// Replace an element's children with a single text node (`textContent = ...`)
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        if !self.node(id)?.can_have_children() {
            return self.set_text(id, text);
        }
        if text.is_empty() {
            return self.replace_children(id, &[]);
        }
        let text_node = self.create_text(text);
        self.replace_children(id, &[text_node])
    }

    /// Change the data of a text or comment node
    pub fn set_text(&mut self, id: NodeId, data: &str) -> DomResult<()> {
        let old = self
            .node(id)?
            .character_data()
            .map(str::to_string)
            .ok_or(DomError::InvalidNodeType)?;

        self.queue_record(MutationRecord::character_data(id, None), Some(&old));

        match &mut self.node_mut(id)?.node_type {
            NodeType::Text(text) | NodeType::Comment(text) => *text = data.to_string(),
            _ => return Err(DomError::InvalidNodeType),
        }
        Ok(())
    }

    /// Set an attribute on an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> DomResult<()> {
        let old = self
            .node(id)?
            .as_element()
            .ok_or(DomError::InvalidNodeType)?
            .get_attribute(name)
            .map(str::to_string);

        self.queue_record(MutationRecord::attributes(id, name, None), old.as_deref());

        if let Some(elem) = self.node_mut(id)?.as_element_mut() {
            elem.set_attribute(name, value);
        }
        Ok(())
    }

    /// Remove an attribute from an element, returning its old value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        let old = self
            .node(id)?
            .as_element()
            .ok_or(DomError::InvalidNodeType)?
            .get_attribute(name)
            .map(str::to_string);

        let Some(old) = old else {
            return Ok(None);
        };

        self.queue_record(MutationRecord::attributes(id, name, None), Some(&old));

        Ok(self.node_mut(id)?.as_element_mut().and_then(|e| e.remove_attribute(name)))
    }

    fn queue_record(&mut self, record: MutationRecord, old_value: Option<&str>) {
        if self.observers.is_empty() {
            return;
        }
        let ancestors = self.inclusive_ancestors(record.target);
        log::trace!("Queueing {:?} record for {}", record.kind, record.target);
        self.observers.queue(&ancestors, record, old_value);
    }

    // ---- Observers ----

    /// Create an observer with no registrations
    pub fn create_observer(&mut self) -> ObserverId {
        self.observers.create()
    }

    /// Start (or re-configure) observing `target`
    pub fn observe(&mut self, observer: ObserverId, target: NodeId, options: ObserveOptions) -> DomResult<()> {
        self.node(target)?;
        let options = options.normalized()?;
        log::debug!("{} observing {} with {:?}", observer, target, options);
        self.observers.register(observer, target, options)
    }

    /// Forget an observer along with its registrations and undelivered records
    pub fn remove_observer(&mut self, observer: ObserverId) -> bool {
        self.observers.remove(observer)
    }

    /// Take the undelivered records of one observer (`takeRecords()`)
    pub fn take_records(&mut self, observer: ObserverId) -> DomResult<Vec<MutationRecord>> {
        self.observers.take_records(observer)
    }

    /// Whether any observer has undelivered records
    pub fn has_pending_records(&self) -> bool {
        self.observers.has_pending()
    }

    /// Drain undelivered records of every observer, in creation order
    pub fn take_pending_records(&mut self) -> Vec<(ObserverId, Vec<MutationRecord>)> {
        self.observers.take_pending()
    }

    // ---- Misc ----

    /// Get the number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (only has document node)
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Pretty print the tree for debugging
    pub fn pretty_print(&self) -> String {
        let mut output = String::new();
        self.print_node(self.document_id, 0, &mut output);
        output
    }

    fn print_node(&self, id: NodeId, depth: usize, output: &mut String) {
        let indent = "  ".repeat(depth);

        if let Some(node) = self.get(id) {
            match &node.node_type {
                NodeType::Document => {
                    output.push_str("#document\n");
                }
                NodeType::Element(elem) => {
                    let mut attrs: Vec<String> = elem
                        .attributes
                        .iter()
                        .map(|(k, v)| format!("{}=\"{}\"", k, v))
                        .collect();
                    attrs.sort();
                    let attrs_str = if attrs.is_empty() {
                        String::new()
                    } else {
                        format!(" {}", attrs.join(" "))
                    };
                    output.push_str(&format!("{}<{}{}>\n", indent, elem.tag_name, attrs_str));
                }
                NodeType::Text(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        output.push_str(&format!("{}#text: {:?}\n", indent, trimmed));
                    }
                }
                NodeType::Comment(text) => {
                    output.push_str(&format!("{}<!-- {} -->\n", indent, text));
                }
            }

            for &child_id in &node.children {
                self.print_node(child_id, depth + 1, output);
            }
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DomTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty_print())
    }
}
