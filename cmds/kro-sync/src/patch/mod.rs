//! Kind-validated document patchers.
//!
//! Every patcher follows the same shape: load the document, check its `kind`,
//! locate the resources it cares about and overwrite specific fields, then
//! write the document back. Validation happens entirely in memory, so a
//! document that fails it is never rewritten.

use std::path::Path;

use kro_manifest::{AccessError, Node};
use tracing::{debug, instrument};

use crate::error::{SyncError, ValidationError};

mod identity;
mod ingress;
mod network;
mod stack;

pub use identity::{canonical_policy, IdentityPatch};
pub use ingress::IngressPatch;
pub use network::NetworkPatch;
pub use stack::{image_reference, DbWebStackPatch, WebStackPatch};

pub const RESOURCE_GRAPH_DEFINITION: &str = "ResourceGraphDefinition";
pub const DB_WEB_STACK: &str = "DbWebStack";
pub const WEB_STACK: &str = "WebStack";

/// A mutation of one kind of configuration document.
pub trait Patch {
	/// `kind` the document must declare.
	const KIND: &'static str;

	/// Human readable name of the document, used in progress messages.
	fn label(&self) -> &'static str;

	/// Mutates an already kind-checked document. `path` is only used for
	/// error messages.
	fn apply(&self, document: &mut Node, path: &Path) -> Result<(), ValidationError>;
}

/// Checks the declared kind and applies `patch` in memory.
pub fn apply_patch<P: Patch>(
	patch: &P,
	document: &mut Node,
	path: &Path,
) -> Result<(), ValidationError> {
	let actual = document.get("kind").and_then(Node::as_str);
	if actual != Some(P::KIND) {
		return Err(ValidationError::KindMismatch {
			path: path.to_path_buf(),
			expected: P::KIND,
			actual: actual.map(str::to_owned),
		});
	}
	patch.apply(document, path)
}

/// Load, validate, mutate and write back the document at `path`.
#[instrument(skip_all, fields(kind = P::KIND, path = %path.display()))]
pub fn patch_file<P: Patch>(patch: &P, path: &Path) -> Result<(), SyncError> {
	let mut document = kro_manifest::load(path)?;
	apply_patch(patch, &mut document, path)?;
	kro_manifest::write(path, &document)?;
	debug!("document patched");
	Ok(())
}

/// Builds [`ValidationError::Malformed`] for a failed accessor at `location`.
pub(crate) fn malformed(
	path: &Path,
	location: impl Into<String>,
) -> impl FnOnce(AccessError) -> ValidationError + '_ {
	let location = location.into();
	move |problem| ValidationError::Malformed {
		path: path.to_path_buf(),
		location,
		problem,
	}
}

/// Entries of `spec.resources`; a missing list is treated as empty.
pub(crate) fn resources_mut<'d>(
	document: &'d mut Node,
	path: &Path,
) -> Result<&'d mut [Node], ValidationError> {
	let spec = document
		.get_mapping_mut("spec")
		.map_err(malformed(path, "document"))?;
	Ok(spec
		.find_sequence_mut("resources")
		.map_err(malformed(path, "spec"))?
		.map(Vec::as_mut_slice)
		.unwrap_or_default())
}

/// `id` of a resource entry, if it has a string one.
pub(crate) fn resource_id(
	resource: &Node,
	index: usize,
	path: &Path,
) -> Result<Option<String>, ValidationError> {
	if resource.as_mapping().is_none() {
		return Err(malformed(path, format!("spec.resources[{index}]"))(
			AccessError::NotAMapping {
				key: "id".to_owned(),
				found: resource.node_type(),
			},
		));
	}
	Ok(resource.get("id").and_then(Node::as_str).map(str::to_owned))
}

/// `template.spec` of a resource that must have one.
pub(crate) fn template_spec_mut<'r>(
	resource: &'r mut Node,
	id: &str,
	path: &Path,
) -> Result<&'r mut Node, ValidationError> {
	resource
		.get_mapping_mut("template")
		.and_then(|template| template.get_mapping_mut("spec"))
		.map_err(malformed(path, format!("resource `{id}`")))
}

/// `template.spec` of a resource, `None` if either level is absent.
pub(crate) fn find_template_spec_mut<'r>(
	resource: &'r mut Node,
	id: &str,
	path: &Path,
) -> Result<Option<&'r mut Node>, ValidationError> {
	let location = || format!("resource `{id}`");
	match resource
		.find_mapping_mut("template")
		.map_err(malformed(path, location()))?
	{
		Some(template) => template
			.find_mapping_mut("spec")
			.map_err(malformed(path, location())),
		None => Ok(None),
	}
}
