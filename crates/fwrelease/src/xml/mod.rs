//! Comment-preserving XML tree.
//!
//! The tree holds enough structure to find
//! elements by name and attribute, insert and remove children, and write the
//! document back with stable indentation. Comments, CDATA sections and
//! processing instructions are carried through untouched.

mod parser;
mod writer;

pub use parser::parse;
pub use writer::write;

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Everything before the root element (declaration, comments, doctype).
    pub prolog: Vec<Misc>,
    /// The root element.
    pub root: Element,
    /// Comments and processing instructions after the root element.
    pub epilog: Vec<Misc>,
}

/// Markup allowed outside the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Misc {
    /// `<?xml ...?>`, kept verbatim.
    Declaration(String),
    /// `<!DOCTYPE ...>`, kept verbatim.
    Doctype(String),
    /// Comment body without the `<!--`/`-->` delimiters.
    Comment(String),
    /// `<?target ...?>`, kept verbatim.
    ProcessingInstruction(String),
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data, already unescaped.
    Text(String),
    /// Comment body without delimiters.
    Comment(String),
    /// CDATA section body.
    CData(String),
    /// Processing instruction, kept verbatim.
    ProcessingInstruction(String),
}

impl Node {
    /// The element inside this node, if it is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Mutable access to the element inside this node, if it is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any previous value in place.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Iterate over child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Iterate mutably over child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// First child element with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// First child element with the given name, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// Follow a `/`-separated path of child names.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .try_fold(self, |current, step| current.child(step))
    }

    /// All descendant elements in document order, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        for child in self.elements() {
            out.push(child);
            out.extend(child.descendants());
        }
        out
    }

    /// First descendant matching `predicate`, mutably, depth-first.
    pub fn find_descendant_mut<F>(&mut self, predicate: &F) -> Option<&mut Element>
    where
        F: Fn(&Element) -> bool,
    {
        for child in self.elements_mut() {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant_mut(predicate) {
                return Some(found);
            }
        }
        None
    }

    /// Insert an element as the first non-text child.
    ///
    /// Leading whitespace stays in front; comments and elements follow the new
    /// element.
    pub fn prepend_element(&mut self, element: Element) {
        let at = self
            .children
            .iter()
            .position(|n| !n.is_text())
            .unwrap_or(self.children.len());
        self.children.insert(at, Node::Element(element));
    }

    /// Remove every child element matching `predicate`, returning them.
    pub fn remove_elements<F>(&mut self, predicate: F) -> Vec<Element>
    where
        F: Fn(&Element) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for node in std::mem::take(&mut self.children) {
            match node {
                Node::Element(e) if predicate(&e) => removed.push(e),
                other => kept.push(other),
            }
        }
        self.children = kept;
        removed
    }
}
