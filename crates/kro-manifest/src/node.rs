use std::{fmt, ops::Index};

use indexmap::IndexMap;
use serde_json::Number;
use thiserror::Error;

/// Mapping node, keys stay in the order they were authored.
pub type Mapping = IndexMap<String, Node>;

/// String scalar together with its rendering hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
	/// Rendered plain when unambiguous, double-quoted otherwise.
	Plain(String),
	/// Always rendered as a `|` block scalar.
	BlockLiteral(String),
}

impl Scalar {
	pub fn as_str(&self) -> &str {
		match self {
			Scalar::Plain(s) | Scalar::BlockLiteral(s) => s,
		}
	}

	pub fn into_string(self) -> String {
		match self {
			Scalar::Plain(s) | Scalar::BlockLiteral(s) => s,
		}
	}

	pub fn is_block_literal(&self) -> bool {
		matches!(self, Scalar::BlockLiteral(_))
	}
}

/// A node of a configuration document.
///
/// Rendering hints are not part of the logical value: two strings with the
/// same text compare equal regardless of whether one of them is marked as a
/// block literal. This is what makes "reload and compare" checks meaningful,
/// since the loader cannot recover the style a scalar was written in.
#[derive(Debug, Clone)]
pub enum Node {
	Null,
	Bool(bool),
	Number(Number),
	String(Scalar),
	Sequence(Vec<Node>),
	Mapping(Mapping),
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Node::Null, Node::Null) => true,
			(Node::Bool(a), Node::Bool(b)) => a == b,
			(Node::Number(a), Node::Number(b)) => a == b,
			(Node::String(a), Node::String(b)) => a.as_str() == b.as_str(),
			(Node::Sequence(a), Node::Sequence(b)) => a == b,
			(Node::Mapping(a), Node::Mapping(b)) => {
				a.len() == b.len() && a.iter().zip(b.iter()).all(|(l, r)| l == r)
			}
			_ => false,
		}
	}
}

/// Shape of a node, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	Null,
	Bool,
	Number,
	String,
	Sequence,
	Mapping,
}

impl fmt::Display for NodeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			NodeType::Null => "null",
			NodeType::Bool => "boolean",
			NodeType::Number => "number",
			NodeType::String => "string",
			NodeType::Sequence => "sequence",
			NodeType::Mapping => "mapping",
		};
		f.write_str(name)
	}
}

/// Failure of one of the typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
	#[error("expected a mapping to look up `{key}` in, found {found}")]
	NotAMapping { key: String, found: NodeType },

	#[error("`{key}` is missing")]
	Missing { key: String },

	#[error("`{key}` should be a {expected}, found {found}")]
	WrongType {
		key: String,
		expected: NodeType,
		found: NodeType,
	},
}

impl Node {
	/// Plain string node.
	pub fn string(value: impl Into<String>) -> Self {
		Node::String(Scalar::Plain(value.into()))
	}

	/// String node that the writer renders as a block literal.
	pub fn block_literal(value: impl Into<String>) -> Self {
		Node::String(Scalar::BlockLiteral(value.into()))
	}

	pub fn node_type(&self) -> NodeType {
		match self {
			Node::Null => NodeType::Null,
			Node::Bool(_) => NodeType::Bool,
			Node::Number(_) => NodeType::Number,
			Node::String(_) => NodeType::String,
			Node::Sequence(_) => NodeType::Sequence,
			Node::Mapping(_) => NodeType::Mapping,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Node::Null)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Node::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Node::String(s) => Some(s.as_str()),
			_ => None,
		}
	}

	pub fn as_scalar(&self) -> Option<&Scalar> {
		match self {
			Node::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_sequence(&self) -> Option<&Vec<Node>> {
		match self {
			Node::Sequence(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Node>> {
		match self {
			Node::Sequence(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_mapping(&self) -> Option<&Mapping> {
		match self {
			Node::Mapping(m) => Some(m),
			_ => None,
		}
	}

	pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
		match self {
			Node::Mapping(m) => Some(m),
			_ => None,
		}
	}

	/// Looks up `key` if this node is a mapping.
	pub fn get(&self, key: &str) -> Option<&Node> {
		self.as_mapping().and_then(|m| m.get(key))
	}

	pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
		self.as_mapping_mut().and_then(|m| m.get_mut(key))
	}

	fn entry(&self, key: &str) -> Result<Option<&Node>, AccessError> {
		match self {
			Node::Mapping(m) => Ok(m.get(key)),
			other => Err(AccessError::NotAMapping {
				key: key.to_owned(),
				found: other.node_type(),
			}),
		}
	}

	fn entry_mut(&mut self, key: &str) -> Result<Option<&mut Node>, AccessError> {
		match self {
			Node::Mapping(m) => Ok(m.get_mut(key)),
			other => Err(AccessError::NotAMapping {
				key: key.to_owned(),
				found: other.node_type(),
			}),
		}
	}

	/// Required string field of this mapping.
	pub fn get_string(&self, key: &str) -> Result<&str, AccessError> {
		match self.entry(key)? {
			None => Err(AccessError::Missing { key: key.to_owned() }),
			Some(Node::String(s)) => Ok(s.as_str()),
			Some(other) => Err(wrong_type(key, NodeType::String, other)),
		}
	}

	/// Required mapping field of this mapping.
	pub fn get_mapping(&self, key: &str) -> Result<&Node, AccessError> {
		match self.entry(key)? {
			None => Err(AccessError::Missing { key: key.to_owned() }),
			Some(node @ Node::Mapping(_)) => Ok(node),
			Some(other) => Err(wrong_type(key, NodeType::Mapping, other)),
		}
	}

	/// Required mapping field of this mapping, for mutation.
	///
	/// The returned node is guaranteed to be [`Node::Mapping`], so it can be
	/// used with the other accessors directly.
	pub fn get_mapping_mut(&mut self, key: &str) -> Result<&mut Node, AccessError> {
		match self.entry_mut(key)? {
			None => Err(AccessError::Missing { key: key.to_owned() }),
			Some(node @ Node::Mapping(_)) => Ok(node),
			Some(other) => Err(wrong_type(key, NodeType::Mapping, other)),
		}
	}

	/// Optional mapping field, `null` counts as absent.
	pub fn find_mapping_mut(&mut self, key: &str) -> Result<Option<&mut Node>, AccessError> {
		match self.entry_mut(key)? {
			None | Some(Node::Null) => Ok(None),
			Some(node @ Node::Mapping(_)) => Ok(Some(node)),
			Some(other) => Err(wrong_type(key, NodeType::Mapping, other)),
		}
	}

	/// Optional sequence field, `null` counts as absent.
	pub fn find_sequence(&self, key: &str) -> Result<Option<&Vec<Node>>, AccessError> {
		match self.entry(key)? {
			None | Some(Node::Null) => Ok(None),
			Some(Node::Sequence(items)) => Ok(Some(items)),
			Some(other) => Err(wrong_type(key, NodeType::Sequence, other)),
		}
	}

	/// Optional sequence field for mutation, `null` counts as absent.
	pub fn find_sequence_mut(&mut self, key: &str) -> Result<Option<&mut Vec<Node>>, AccessError> {
		match self.entry_mut(key)? {
			None | Some(Node::Null) => Ok(None),
			Some(Node::Sequence(items)) => Ok(Some(items)),
			Some(other) => Err(wrong_type(key, NodeType::Sequence, other)),
		}
	}

	/// Sets `key` on this mapping, keeping its position if it already exists
	/// and appending it otherwise.
	pub fn set(&mut self, key: &str, value: Node) -> Result<(), AccessError> {
		match self {
			Node::Mapping(m) => {
				if let Some(slot) = m.get_mut(key) {
					*slot = value;
				} else {
					m.insert(key.to_owned(), value);
				}
				Ok(())
			}
			other => Err(AccessError::NotAMapping {
				key: key.to_owned(),
				found: other.node_type(),
			}),
		}
	}
}

static NULL: Node = Node::Null;

/// Missing keys and out of range indices yield `null`.
impl Index<&str> for Node {
	type Output = Node;

	fn index(&self, key: &str) -> &Node {
		self.get(key).unwrap_or(&NULL)
	}
}

impl Index<usize> for Node {
	type Output = Node;

	fn index(&self, index: usize) -> &Node {
		self.as_sequence()
			.and_then(|items| items.get(index))
			.unwrap_or(&NULL)
	}
}

fn wrong_type(key: &str, expected: NodeType, found: &Node) -> AccessError {
	AccessError::WrongType {
		key: key.to_owned(),
		expected,
		found: found.node_type(),
	}
}

impl From<&str> for Node {
	fn from(value: &str) -> Self {
		Node::string(value)
	}
}

impl From<String> for Node {
	fn from(value: String) -> Self {
		Node::string(value)
	}
}

impl From<bool> for Node {
	fn from(value: bool) -> Self {
		Node::Bool(value)
	}
}

impl<T: Into<Node>> From<Vec<T>> for Node {
	fn from(value: Vec<T>) -> Self {
		Node::Sequence(value.into_iter().map(Into::into).collect())
	}
}

impl From<Node> for serde_json::Value {
	fn from(node: Node) -> Self {
		match node {
			Node::Null => serde_json::Value::Null,
			Node::Bool(b) => serde_json::Value::Bool(b),
			Node::Number(n) => serde_json::Value::Number(n),
			Node::String(s) => serde_json::Value::String(s.into_string()),
			Node::Sequence(items) => {
				serde_json::Value::Array(items.into_iter().map(Into::into).collect())
			}
			Node::Mapping(m) => serde_json::Value::Object(
				m.into_iter().map(|(k, v)| (k, v.into())).collect(),
			),
		}
	}
}

impl From<serde_json::Value> for Node {
	fn from(value: serde_json::Value) -> Self {
		match value {
			serde_json::Value::Null => Node::Null,
			serde_json::Value::Bool(b) => Node::Bool(b),
			serde_json::Value::Number(n) => Node::Number(n),
			serde_json::Value::String(s) => Node::string(s),
			serde_json::Value::Array(items) => {
				Node::Sequence(items.into_iter().map(Into::into).collect())
			}
			serde_json::Value::Object(m) => {
				Node::Mapping(m.into_iter().map(|(k, v)| (k, v.into())).collect())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use serde_json::json;

	use super::*;

	#[test]
	fn test_block_literal_equals_plain_with_same_text() {
		assert_eq!(Node::block_literal("a\nb"), Node::string("a\nb"));
		assert_ne!(Node::block_literal("a"), Node::string("b"));
	}

	#[test]
	fn test_mapping_equality_respects_order() {
		let a = Node::from(json!({"x": 1, "y": 2}));
		let b = Node::from(json!({"y": 2, "x": 1}));
		assert_ne!(a, b);
	}

	#[test]
	fn test_get_string_errors() {
		let node = Node::from(json!({"kind": 3}));
		assert_matches!(
			node.get_string("kind"),
			Err(AccessError::WrongType { expected: NodeType::String, found: NodeType::Number, .. })
		);
		assert_matches!(node.get_string("other"), Err(AccessError::Missing { key }) if key == "other");
		assert_matches!(
			Node::string("x").get_string("kind"),
			Err(AccessError::NotAMapping { found: NodeType::String, .. })
		);
	}

	#[test]
	fn test_find_sequence_treats_null_as_absent() {
		let mut node = Node::from(json!({"rules": null, "list": [1], "bad": "x"}));
		assert_eq!(node.find_sequence_mut("rules").unwrap(), None);
		assert_eq!(node.find_sequence_mut("missing").unwrap(), None);
		assert_eq!(node.find_sequence_mut("list").unwrap().map(|l| l.len()), Some(1));
		assert!(node.find_sequence_mut("bad").is_err());
	}

	#[test]
	fn test_set_keeps_position() {
		let mut node = Node::from(json!({"a": 1, "b": 2}));
		node.set("a", Node::string("x")).unwrap();
		node.set("c", Node::Bool(true)).unwrap();
		let keys: Vec<_> = node.as_mapping().unwrap().keys().cloned().collect();
		assert_eq!(keys, ["a", "b", "c"]);
		assert_eq!(node.get("a"), Some(&Node::string("x")));
	}
}
