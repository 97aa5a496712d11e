//! DOM Node representation

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;

/// Unique identifier for a node in the DOM tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Type of DOM node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// Document root node
    Document,
    /// Element node (HTML tag)
    Element(ElementData),
    /// Text content
    Text(String),
    /// HTML comment
    Comment(String),
}

/// Element-specific data
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Tag name (lowercase)
    pub tag_name: String,
    /// Element attributes
    pub attributes: FxHashMap<String, String>,
}

impl ElementData {
    /// Create a new element with the given tag name
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: FxHashMap::default(),
        }
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    /// Check if the element has a class
    pub fn has_class(&self, class: &str) -> bool {
        self.class_list().contains(&class)
    }

    /// Get the element's ID
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Class names in attribute order with duplicates removed, like
    /// `Element.classList`
    pub fn class_list(&self) -> SmallVec<[&str; 4]> {
        let mut classes: SmallVec<[&str; 4]> = SmallVec::new();
        if let Some(value) = self.get_attribute("class") {
            for class in value.split_ascii_whitespace() {
                if !classes.contains(&class) {
                    classes.push(class);
                }
            }
        }
        classes
    }

    // Attribute writes go through `DomTree` so observers see them.
    pub(crate) fn set_attribute(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.attributes.insert(name.to_ascii_lowercase(), value.into())
    }

    pub(crate) fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(&name.to_ascii_lowercase())
    }
}

/// A node in the DOM tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Node type and associated data
    pub node_type: NodeType,
    /// Parent node ID (None for root and detached nodes)
    pub parent: Option<NodeId>,
    /// Child node IDs
    pub children: SmallVec<[NodeId; 8]>,
}

impl Node {
    /// Create a new node
    pub fn new(id: NodeId, node_type: NodeType) -> Self {
        Self {
            id,
            node_type,
            parent: None,
            children: SmallVec::new(),
        }
    }

    /// Check if this is a document node
    pub fn is_document(&self) -> bool {
        matches!(self.node_type, NodeType::Document)
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element(_))
    }

    /// Whether this node may have children
    pub fn can_have_children(&self) -> bool {
        matches!(self.node_type, NodeType::Document | NodeType::Element(_))
    }

    /// Get element data if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Character data of a text or comment node
    pub fn character_data(&self) -> Option<&str> {
        match &self.node_type {
            NodeType::Text(data) | NodeType::Comment(data) => Some(data),
            _ => None,
        }
    }

    /// Get the tag name if this is an element
    pub fn tag_name(&self) -> Option<&str> {
        self.as_element().map(|e| e.tag_name.as_str())
    }
}
