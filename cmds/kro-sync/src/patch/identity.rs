use std::path::Path;

use kro_manifest::Node;
use tracing::debug;

use super::{
	find_template_spec_mut, malformed, resource_id, resources_mut, Patch, RESOURCE_GRAPH_DEFINITION,
};
use crate::error::ValidationError;

const ASSOCIATION_ID: &str = "podidentityassociation";
const ROLE_ID: &str = "role";
const POLICY_FIELD: &str = "assumeRolePolicyDocument";

/// Binds the pod identity association to the cluster and normalizes the
/// role's trust policy into a readable block.
#[derive(Debug, Clone, Copy)]
pub struct IdentityPatch<'a> {
	pub cluster_name: &'a str,
}

impl Patch for IdentityPatch<'_> {
	const KIND: &'static str = RESOURCE_GRAPH_DEFINITION;

	fn label(&self) -> &'static str {
		"identity YAML"
	}

	fn apply(&self, document: &mut Node, path: &Path) -> Result<(), ValidationError> {
		let mut found = false;
		for (index, resource) in resources_mut(document, path)?.iter_mut().enumerate() {
			let id = resource_id(resource, index, path)?;
			let id = id.as_deref().unwrap_or_default();
			let Some(spec) = find_template_spec_mut(resource, id, path)? else {
				continue;
			};
			// Resources with an empty spec have nothing to patch
			if spec.as_mapping().is_some_and(|m| m.is_empty()) {
				continue;
			}

			match id {
				ASSOCIATION_ID => {
					spec.set("clusterName", Node::string(self.cluster_name))
						.map_err(malformed(path, format!("resource `{id}`")))?;
					found = true;
				}
				ROLE_ID => {
					if let Some(policy) = spec.get_mut(POLICY_FIELD) {
						*policy = canonical_policy(policy);
						debug!("trust policy normalized");
					}
				}
				_ => {}
			}
		}

		if !found {
			return Err(ValidationError::MissingResource {
				path: path.to_path_buf(),
				id: ASSOCIATION_ID,
			});
		}
		Ok(())
	}
}

/// Re-encodes a trust policy as 2-space indented JSON, marked for block
/// literal rendering.
///
/// Structured values are encoded directly. Strings are parsed as JSON first;
/// if that fails the original text is kept verbatim.
pub fn canonical_policy(policy: &Node) -> Node {
	let value = match policy {
		Node::String(text) => match serde_json::from_str::<serde_json::Value>(text.as_str()) {
			Ok(value) => value,
			Err(_) => return Node::block_literal(text.as_str()),
		},
		other => serde_json::Value::from(other.clone()),
	};
	let encoded = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
	Node::block_literal(escape_non_ascii(&encoded))
}

/// Non-ASCII characters only occur inside JSON strings, where `\uXXXX`
/// escapes (as UTF-16 units) are equivalent.
fn escape_non_ascii(json: &str) -> String {
	let mut out = String::with_capacity(json.len());
	for c in json.chars() {
		if c.is_ascii() {
			out.push(c);
		} else {
			for unit in c.encode_utf16(&mut [0; 2]) {
				out.push_str(&format!("\\u{unit:04x}"));
			}
		}
	}
	out
}
