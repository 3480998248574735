use std::path::Path;

use kro_manifest::Node;
use tracing::debug;

use super::{
	malformed, resource_id, resources_mut, template_spec_mut, Patch, RESOURCE_GRAPH_DEFINITION,
};
use crate::{discover::NetworkFacts, error::ValidationError};

/// Points the security group and DB subnet group at the cluster's VPC.
///
/// Every assignment is absolute, so applying the patch twice with the same
/// facts produces the same document.
#[derive(Debug, Clone, Copy)]
pub struct NetworkPatch<'f> {
	pub facts: &'f NetworkFacts,
}

impl Patch for NetworkPatch<'_> {
	const KIND: &'static str = RESOURCE_GRAPH_DEFINITION;

	fn label(&self) -> &'static str {
		"network YAML"
	}

	fn apply(&self, document: &mut Node, path: &Path) -> Result<(), ValidationError> {
		for (index, resource) in resources_mut(document, path)?.iter_mut().enumerate() {
			match resource_id(resource, index, path)?.as_deref() {
				Some("securityGroup") => self.patch_security_group(resource, path)?,
				Some("subnetGroup") => {
					let spec = template_spec_mut(resource, "subnetGroup", path)?;
					spec.set(
						"subnetIDs",
						Node::from(self.facts.private_subnet_ids.to_vec()),
					)
					.map_err(malformed(path, "resource `subnetGroup`"))?;
					debug!("subnet group updated");
				}
				_ => {}
			}
		}
		Ok(())
	}
}

impl NetworkPatch<'_> {
	fn patch_security_group(&self, resource: &mut Node, path: &Path) -> Result<(), ValidationError> {
		let location = "resource `securityGroup`";
		let spec = template_spec_mut(resource, "securityGroup", path)?;
		spec.set("vpcID", Node::string(&self.facts.vpc_id))
			.map_err(malformed(path, location))?;

		let Some(rules) = spec
			.find_sequence_mut("ingressRules")
			.map_err(malformed(path, location))?
		else {
			return Ok(());
		};
		let mut ranges = 0;
		for (rule_index, rule) in rules.iter_mut().enumerate() {
			let rule_location = format!("{location}: ingressRules[{rule_index}]");
			let Some(ip_ranges) = rule
				.find_sequence_mut("ipRanges")
				.map_err(malformed(path, rule_location.clone()))?
			else {
				continue;
			};
			for ip_range in ip_ranges {
				ip_range
					.set("cidrIP", Node::string(&self.facts.cidr_block))
					.map_err(malformed(path, rule_location.clone()))?;
				ranges += 1;
			}
		}
		debug!(ranges, "security group updated");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;
	use crate::patch::apply_patch;

	fn facts() -> NetworkFacts {
		NetworkFacts {
			vpc_id: "vpc-1".to_owned(),
			cidr_block: "10.0.0.0/16".to_owned(),
			private_subnet_ids: ["subnet-a".to_owned(), "subnet-b".to_owned()],
		}
	}

	fn parse(yaml: &str) -> Node {
		kro_manifest::from_str(yaml, Path::new("network.yaml")).unwrap()
	}

	#[test]
	fn test_every_ip_range_gets_the_cidr() {
		let facts = facts();
		let mut document = parse(indoc! {"
			kind: ResourceGraphDefinition
			spec:
			  resources:
			    - id: securityGroup
			      template:
			        spec:
			          vpcID: old
			          ingressRules:
			            - ipRanges:
			                - cidrIP: 1.1.1.1/32
			                - cidrIP: 2.2.2.2/32
			            - fromPort: 80
			            - ipRanges:
			                - description: db
		"});

		apply_patch(&NetworkPatch { facts: &facts }, &mut document, Path::new("n.yaml")).unwrap();

		assert_eq!(
			kro_manifest::to_yaml(&document),
			indoc! {"
				kind: ResourceGraphDefinition
				spec:
				  resources:
				    - id: securityGroup
				      template:
				        spec:
				          vpcID: vpc-1
				          ingressRules:
				            - ipRanges:
				                - cidrIP: 10.0.0.0/16
				                - cidrIP: 10.0.0.0/16
				            - fromPort: 80
				            - ipRanges:
				                - description: db
				                  cidrIP: 10.0.0.0/16
			"}
		);
	}

	#[test]
	fn test_missing_resources_is_a_no_op() {
		let facts = facts();
		let mut document = parse("kind: ResourceGraphDefinition\nspec:\n  schema: {}\n");
		let before = document.clone();
		apply_patch(&NetworkPatch { facts: &facts }, &mut document, Path::new("n.yaml")).unwrap();
		assert_eq!(document, before);
	}

	#[test]
	fn test_security_group_without_template_is_malformed() {
		let facts = facts();
		let mut document = parse(
			"kind: ResourceGraphDefinition\nspec:\n  resources:\n    - id: securityGroup\n",
		);
		let result = apply_patch(&NetworkPatch { facts: &facts }, &mut document, Path::new("n.yaml"));
		assert_matches!(
			result,
			Err(ValidationError::Malformed { location, .. }) if location == "resource `securityGroup`"
		);
	}

	#[test]
	fn test_wrong_kind() {
		let facts = facts();
		let mut document = parse("kind: WebStack\nspec: {}\n");
		assert_matches!(
			apply_patch(&NetworkPatch { facts: &facts }, &mut document, Path::new("n.yaml")),
			Err(ValidationError::KindMismatch { expected: "ResourceGraphDefinition", actual: Some(kind), .. })
				if kind == "WebStack"
		);
	}
}
