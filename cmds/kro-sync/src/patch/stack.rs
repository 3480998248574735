use std::path::Path;

use kro_manifest::Node;
use tracing::debug;

use super::{malformed, Patch, DB_WEB_STACK, WEB_STACK};
use crate::error::ValidationError;

/// `<repository>:<tag>`, no validation is done on either part.
pub fn image_reference(repository: &str, tag: &str) -> String {
	format!("{repository}:{tag}")
}

/// Sets the image of a database-backed stack instance, and the RDS region
/// when RDS is enabled.
#[derive(Debug, Clone, Copy)]
pub struct DbWebStackPatch<'a> {
	pub image: &'a str,
	pub region: &'a str,
}

impl Patch for DbWebStackPatch<'_> {
	const KIND: &'static str = DB_WEB_STACK;

	fn label(&self) -> &'static str {
		"DbWebStack YAML"
	}

	fn apply(&self, document: &mut Node, path: &Path) -> Result<(), ValidationError> {
		let spec = document
			.get_mapping_mut("spec")
			.map_err(malformed(path, "document"))?;
		spec.set("image", Node::string(self.image))
			.map_err(malformed(path, "spec"))?;

		if self.region.is_empty() {
			return Ok(());
		}
		let Some(rds) = spec
			.find_mapping_mut("rds")
			.map_err(malformed(path, "spec"))?
		else {
			return Ok(());
		};
		// Only a literal `true` enables RDS, strings like "true" do not
		if rds.get("enabled").and_then(Node::as_bool) == Some(true) {
			rds.set("awsRegion", Node::string(self.region))
				.map_err(malformed(path, "spec.rds"))?;
			debug!(region = self.region, "rds region updated");
		}
		Ok(())
	}
}

/// Sets the image of a web-only stack instance and, when known, the cluster
/// it runs in.
#[derive(Debug, Clone, Copy)]
pub struct WebStackPatch<'a> {
	pub image: &'a str,
	pub cluster_name: &'a str,
}

impl Patch for WebStackPatch<'_> {
	const KIND: &'static str = WEB_STACK;

	fn label(&self) -> &'static str {
		"WebStack YAML"
	}

	fn apply(&self, document: &mut Node, path: &Path) -> Result<(), ValidationError> {
		let spec = document
			.get_mapping_mut("spec")
			.map_err(malformed(path, "document"))?;
		spec.set("image", Node::string(self.image))
			.map_err(malformed(path, "spec"))?;
		if !self.cluster_name.is_empty() {
			spec.set("clusterName", Node::string(self.cluster_name))
				.map_err(malformed(path, "spec"))?;
		}
		Ok(())
	}
}
