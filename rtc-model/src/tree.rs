//! The configuration tree: an ordered, named, recursively nested container
//! of typed values, navigated by a cursor.
//!
//! Grounded on MARTe2's `ConfigurationDatabase`: `MoveToChild`/
//! `MoveToAncestor`/`MoveAbsolute`/`MoveToRoot` plus `Read`/`Write` at the
//! current position. Keys are unique at each level and insertion order is
//! preserved, which is what later lets the scheduler read function order
//! straight off the `Functions` node.

use crate::error::{ModelError, Result};
use crate::value::TypedValue;

/// One node of the configuration tree: a name, an optional scalar/array
/// value, and an ordered list of named children.
#[derive(Debug, Clone, Default)]
pub struct ConfigNode {
    value: Option<TypedValue>,
    children: Vec<(String, ConfigNode)>,
}

impl ConfigNode {
    /// An empty, valueless node.
    pub fn new() -> Self {
        Self::default()
    }

    /// A leaf node holding `value`.
    pub fn leaf(value: TypedValue) -> Self {
        Self { value: Some(value), children: Vec::new() }
    }

    fn child_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|(n, _)| n == name)
    }

    /// Insert a new child, failing if the name is already present at this
    /// level.
    pub fn add_child(&mut self, name: impl Into<String>, node: ConfigNode) -> Result<()> {
        let name = name.into();
        if self.child_index(&name).is_some() {
            return Err(ModelError::DuplicateKey(name));
        }
        self.children.push((name, node));
        Ok(())
    }

    /// Names of direct children, in insertion order.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Borrow a direct child by name.
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.child_index(name).map(|i| &self.children[i].1)
    }

    /// Mutably borrow a direct child by name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut ConfigNode> {
        self.child_index(name).map(move |i| &mut self.children[i].1)
    }

    /// Value held at this node, if it is a leaf.
    pub fn value(&self) -> Option<&TypedValue> {
        self.value.as_ref()
    }

    /// Set the value held at this node.
    pub fn set_value(&mut self, value: TypedValue) {
        self.value = Some(value);
    }
}

/// A cursor over a `ConfigNode` tree, supporting move-by-name navigation
/// and read/write at the current position.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    root: ConfigNode,
    path: Vec<String>,
}

impl ConfigTree {
    /// Construct a tree cursor rooted at `root`, positioned at the root.
    pub fn new(root: ConfigNode) -> Self {
        Self { root, path: Vec::new() }
    }

    fn resolve<'a>(root: &'a ConfigNode, path: &[String]) -> Option<&'a ConfigNode> {
        let mut node = root;
        for segment in path {
            node = node.child(segment)?;
        }
        Some(node)
    }

    fn resolve_mut<'a>(root: &'a mut ConfigNode, path: &[String]) -> Option<&'a mut ConfigNode> {
        let mut node = root;
        for segment in path {
            node = node.child_mut(segment)?;
        }
        Some(node)
    }

    /// The node at the current cursor position.
    pub fn current(&self) -> &ConfigNode {
        Self::resolve(&self.root, &self.path).expect("cursor path must always be valid")
    }

    fn current_mut(&mut self) -> &mut ConfigNode {
        Self::resolve_mut(&mut self.root, &self.path).expect("cursor path must always be valid")
    }

    /// Absolute dotted path of the current position (`"Application.Functions.F1"`).
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Move to a direct child by name.
    pub fn move_to_child(&mut self, name: &str) -> Result<()> {
        if self.current().child(name).is_none() {
            return Err(ModelError::NoSuchNode(format!("{}.{name}", self.current_path())));
        }
        self.path.push(name.to_string());
        Ok(())
    }

    /// Move to the parent of the current position. A no-op error at root.
    pub fn move_to_parent(&mut self) -> Result<()> {
        if self.path.pop().is_none() {
            return Err(ModelError::NoSuchNode("<above root>".to_string()));
        }
        Ok(())
    }

    /// Move to the root.
    pub fn move_to_root(&mut self) {
        self.path.clear();
    }

    /// Move to an absolute dotted path from the root.
    pub fn move_absolute(&mut self, path: &str) -> Result<()> {
        let segments: Vec<String> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('.').map(str::to_string).collect()
        };
        if Self::resolve(&self.root, &segments).is_none() {
            return Err(ModelError::NoSuchNode(path.to_string()));
        }
        self.path = segments;
        Ok(())
    }

    /// Names of the current node's direct children, in insertion order.
    pub fn child_names(&self) -> Vec<&str> {
        self.current().child_names()
    }

    /// Create a child of the current node and move into it.
    pub fn create_child(&mut self, name: &str) -> Result<()> {
        self.current_mut().add_child(name, ConfigNode::new())?;
        self.move_to_child(name)
    }

    /// Read the typed value at the current position.
    pub fn read(&self) -> Result<&TypedValue> {
        self.current().value().ok_or_else(|| ModelError::NotALeaf(self.current_path()))
    }

    /// Write a typed value at the current position.
    pub fn write(&mut self, value: TypedValue) {
        self.current_mut().set_value(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ElementType, Scalar};

    fn sample_tree() -> ConfigTree {
        let mut root = ConfigNode::new();
        let mut functions = ConfigNode::new();
        functions.add_child("F1", ConfigNode::leaf(TypedValue::scalar(ElementType::U32, Scalar::U32(1)))).unwrap();
        functions.add_child("F2", ConfigNode::leaf(TypedValue::scalar(ElementType::U32, Scalar::U32(2)))).unwrap();
        root.add_child("Functions", functions).unwrap();
        ConfigTree::new(root)
    }

    #[test]
    fn insertion_order_is_preserved() {
        let tree = sample_tree();
        let mut cursor = tree;
        cursor.move_to_child("Functions").unwrap();
        assert_eq!(cursor.child_names(), vec!["F1", "F2"]);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut functions = ConfigNode::new();
        functions.add_child("F1", ConfigNode::new()).unwrap();
        let err = functions.add_child("F1", ConfigNode::new()).unwrap_err();
        assert_eq!(err, ModelError::DuplicateKey("F1".to_string()));
    }

    #[test]
    fn move_absolute_then_read() {
        let mut cursor = sample_tree();
        cursor.move_absolute("Functions.F2").unwrap();
        assert_eq!(cursor.read().unwrap().to_text(), "2");
    }

    #[test]
    fn move_to_parent_then_root() {
        let mut cursor = sample_tree();
        cursor.move_to_child("Functions").unwrap();
        cursor.move_to_child("F1").unwrap();
        cursor.move_to_parent().unwrap();
        assert_eq!(cursor.current_path(), "Functions");
        cursor.move_to_root();
        assert_eq!(cursor.current_path(), "");
    }

    #[test]
    fn move_to_unknown_child_fails() {
        let mut cursor = sample_tree();
        assert!(cursor.move_to_child("DoesNotExist").is_err());
    }
}
