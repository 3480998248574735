use std::path::Path;

use kro_manifest::Node;

use super::{
	find_template_spec_mut, malformed, resource_id, resources_mut, Patch, RESOURCE_GRAPH_DEFINITION,
};
use crate::error::ValidationError;

const INGRESS_ID: &str = "ingress";

/// Selects the ingress class of the web application's ingress resource.
#[derive(Debug, Clone, Copy)]
pub struct IngressPatch<'a> {
	pub ingress_class: &'a str,
}

impl Patch for IngressPatch<'_> {
	const KIND: &'static str = RESOURCE_GRAPH_DEFINITION;

	fn label(&self) -> &'static str {
		"WebApp ingress YAML"
	}

	fn apply(&self, document: &mut Node, path: &Path) -> Result<(), ValidationError> {
		let mut updated = false;
		for (index, resource) in resources_mut(document, path)?.iter_mut().enumerate() {
			if resource_id(resource, index, path)?.as_deref() != Some(INGRESS_ID) {
				continue;
			}
			let Some(spec) = find_template_spec_mut(resource, INGRESS_ID, path)? else {
				continue;
			};
			spec.set("ingressClassName", Node::string(self.ingress_class))
				.map_err(malformed(path, "resource `ingress`"))?;
			updated = true;
		}

		if !updated {
			return Err(ValidationError::MissingResource {
				path: path.to_path_buf(),
				id: INGRESS_ID,
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;
	use crate::patch::apply_patch;

	fn parse(yaml: &str) -> Node {
		kro_manifest::from_str(yaml, Path::new("webapp.yaml")).unwrap()
	}

	#[test]
	fn test_sets_ingress_class() {
		let mut document = parse(indoc! {"
			kind: ResourceGraphDefinition
			spec:
			  resources:
			    - id: deployment
			      template:
			        spec:
			          replicas: 1
			    - id: ingress
			      template:
			        spec:
			          ingressClassName: nginx
			          rules: []
		"});

		apply_patch(&IngressPatch { ingress_class: "alb" }, &mut document, Path::new("w.yaml"))
			.unwrap();

		assert_eq!(
			kro_manifest::to_yaml(&document),
			indoc! {"
				kind: ResourceGraphDefinition
				spec:
				  resources:
				    - id: deployment
				      template:
				        spec:
				          replicas: 1
				    - id: ingress
				      template:
				        spec:
				          ingressClassName: alb
				          rules: []
			"}
		);
	}

	#[test]
	fn test_empty_spec_still_counts() {
		let mut document = parse(indoc! {"
			kind: ResourceGraphDefinition
			spec:
			  resources:
			    - id: ingress
			      template:
			        spec: {}
		"});
		apply_patch(&IngressPatch { ingress_class: "alb" }, &mut document, Path::new("w.yaml"))
			.unwrap();
		assert_eq!(
			document["spec"]["resources"][0]["template"]["spec"]["ingressClassName"],
			Node::string("alb")
		);
	}

	#[test]
	fn test_ingress_without_template_is_missing() {
		let mut document = parse(indoc! {"
			kind: ResourceGraphDefinition
			spec:
			  resources:
			    - id: ingress
		"});
		assert_matches!(
			apply_patch(&IngressPatch { ingress_class: "alb" }, &mut document, Path::new("w.yaml")),
			Err(ValidationError::MissingResource { id: "ingress", .. })
		);
	}

	#[test]
	fn test_no_resources() {
		let mut document = parse("kind: ResourceGraphDefinition\nspec: {}\n");
		assert_matches!(
			apply_patch(&IngressPatch { ingress_class: "alb" }, &mut document, Path::new("w.yaml")),
			Err(ValidationError::MissingResource { .. })
		);
	}
}
