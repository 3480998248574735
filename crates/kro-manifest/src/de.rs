use std::{borrow::Cow, fmt};

use serde::{
	de::{Error, MapAccess, SeqAccess, Visitor},
	Deserialize, Deserializer,
};
use serde_json::Number;

use crate::{Mapping, Node};

impl<'de> Deserialize<'de> for Node {
	fn deserialize<D>(deserializer: D) -> Result<Node, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct NodeVisitor;

		impl<'de> Visitor<'de> for NodeVisitor {
			type Value = Node;

			fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
				formatter.write_str("any yaml value")
			}

			fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(Node::Bool(v))
			}

			fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(Node::Number(v.into()))
			}

			fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(Node::Number(v.into()))
			}

			fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Number::from_f64(v)
					.map(Node::Number)
					.ok_or_else(|| E::custom("only finite numbers are supported"))
			}

			fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(Node::string(v))
			}

			fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(Node::string(v))
			}

			fn visit_none<E>(self) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(Node::Null)
			}

			fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
			where
				D: Deserializer<'de>,
			{
				deserializer.deserialize_any(self)
			}

			fn visit_unit<E>(self) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(Node::Null)
			}

			fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
			where
				D: Deserializer<'de>,
			{
				deserializer.deserialize_any(self)
			}

			fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
			where
				A: SeqAccess<'de>,
			{
				let mut out = seq.size_hint().map_or_else(Vec::new, Vec::with_capacity);
				while let Some(item) = seq.next_element::<Node>()? {
					out.push(item);
				}
				Ok(Node::Sequence(out))
			}

			fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
			where
				A: MapAccess<'de>,
			{
				let mut out = map
					.size_hint()
					.map_or_else(Mapping::new, Mapping::with_capacity);
				while let Some((k, v)) = map.next_entry::<Cow<'de, str>, Node>()? {
					// Later duplicates win, keeping the position of the first one
					out.insert(k.into_owned(), v);
				}
				Ok(Node::Mapping(out))
			}
		}

		deserializer.deserialize_any(NodeVisitor)
	}
}
