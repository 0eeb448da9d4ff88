//! On-disk `ConfigNode` tree fixtures for tests and the example binary.
//!
//! This is ambient test/config-loading tooling, not a configuration
//! language: it deserializes a plain JSON shape into a `ConfigNode` tree.
//! Gated behind the `fixtures` feature, grounded on the teacher's use of
//! `serde_json` for fixture loading in `knhk-config`.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{ModelError, Result};
use crate::tree::ConfigNode;
use crate::value::{ElementType, TypedValue};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureNode {
    Leaf { #[serde(rename = "type")] element_type: String, value: String },
    // `IndexMap` (not `BTreeMap`) so a branch's children build in the order
    // they appear in the fixture file, not alphabetical order.
    Branch(IndexMap<String, FixtureNode>),
}

fn parse_element_type(name: &str) -> Result<ElementType> {
    Ok(match name {
        "int8" => ElementType::I8,
        "uint8" => ElementType::U8,
        "int16" => ElementType::I16,
        "uint16" => ElementType::U16,
        "int32" => ElementType::I32,
        "uint32" => ElementType::U32,
        "int64" => ElementType::I64,
        "uint64" => ElementType::U64,
        "float32" => ElementType::F32,
        "float64" => ElementType::F64,
        other => {
            return Err(ModelError::BadLiteral { text: other.to_string(), element_type: "element type name".into() })
        }
    })
}

fn build(node: FixtureNode) -> Result<ConfigNode> {
    match node {
        FixtureNode::Leaf { element_type, value } => {
            let ty = parse_element_type(&element_type)?;
            let typed = if value.contains(',') {
                TypedValue::from_text_vector(ty, &value)?
            } else {
                TypedValue::from_text_scalar(ty, &value)?
            };
            Ok(ConfigNode::leaf(typed))
        }
        FixtureNode::Branch(children) => {
            let mut out = ConfigNode::new();
            for (name, child) in children {
                out.add_child(name, build(child)?)?;
            }
            Ok(out)
        }
    }
}

/// Load a `ConfigNode` tree from a JSON fixture file.
pub fn load_tree(path: &Path) -> Result<ConfigNode> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ModelError::BadLiteral { text: path.display().to_string(), element_type: e.to_string() })?;
    let fixture: FixtureNode = serde_json::from_str(&text)
        .map_err(|e| ModelError::BadLiteral { text: path.display().to_string(), element_type: e.to_string() })?;
    build(fixture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_nested_fixture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"Functions": {{"F1": {{"type": "uint32", "value": "7"}}}}}}"#
        )
        .unwrap();
        let tree = load_tree(file.path()).unwrap();
        let functions = tree.child("Functions").unwrap();
        let f1 = functions.child("F1").unwrap();
        assert_eq!(f1.value().unwrap().to_text(), "7");
    }

    #[test]
    fn preserves_declaration_order_of_siblings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"Zebra": {{"type": "uint32", "value": "1"}}, "Apple": {{"type": "uint32", "value": "2"}}, "Mango": {{"type": "uint32", "value": "3"}}}}"#
        )
        .unwrap();
        let tree = load_tree(file.path()).unwrap();
        assert_eq!(tree.child_names(), vec!["Zebra", "Apple", "Mango"]);
    }
}
