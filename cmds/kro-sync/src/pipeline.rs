//! The synchronization run as an explicit state machine.
//!
//! ```text
//! Init -> FactsResolved -> NetworkPatched -> IdentityPatched -> DbPatched
//!      -> WebPatched -> IngressPatched -> Done
//! ```
//!
//! Each transition runs only once the previous one succeeded. The first error
//! is reported and ends the run; documents written before it stay modified.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::{
	discover::{resolve_network_facts, ControlPlane, NetworkFacts},
	error::{LoadError, SyncError, ValidationError},
	patch::{
		image_reference, patch_file, DbWebStackPatch, IdentityPatch, IngressPatch, NetworkPatch,
		Patch, WebStackPatch,
	},
	report::{Event, Reporter},
};

/// The five documents of a run, in the order they are patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
	pub network: PathBuf,
	pub identity: PathBuf,
	pub db_web_stack: PathBuf,
	pub web_stack: PathBuf,
	pub webapp: PathBuf,
}

impl DocumentPaths {
	pub fn in_order(&self) -> [&Path; 5] {
		[
			self.network.as_path(),
			self.identity.as_path(),
			self.db_web_stack.as_path(),
			self.web_stack.as_path(),
			self.webapp.as_path(),
		]
	}
}

/// Everything a run needs besides the control plane.
#[derive(Debug, Clone)]
pub struct SyncRequest {
	pub documents: DocumentPaths,
	pub cluster: String,
	pub region: String,
	/// Repository the stack images are pulled from, without a tag.
	pub image_repository: Option<String>,
	pub db_tag: String,
	pub web_tag: String,
	pub ingress_class: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	Init,
	FactsResolved,
	NetworkPatched,
	IdentityPatched,
	DbPatched,
	WebPatched,
	IngressPatched,
	Done,
}

/// The document patches, run in this order once the facts are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
	Network,
	Identity,
	DbWebStack,
	WebStack,
	Ingress,
}

impl Stage {
	const ORDER: [Stage; 5] = [
		Stage::Network,
		Stage::Identity,
		Stage::DbWebStack,
		Stage::WebStack,
		Stage::Ingress,
	];

	/// State reached once this stage succeeded.
	fn reaches(self) -> Step {
		match self {
			Stage::Network => Step::NetworkPatched,
			Stage::Identity => Step::IdentityPatched,
			Stage::DbWebStack => Step::DbPatched,
			Stage::WebStack => Step::WebPatched,
			Stage::Ingress => Step::IngressPatched,
		}
	}
}

/// A run that stopped early.
#[derive(Debug)]
pub struct Failure {
	/// Last step that completed.
	pub after: Step,
	pub error: SyncError,
}

pub struct Pipeline<'r> {
	request: &'r SyncRequest,
}

impl<'r> Pipeline<'r> {
	pub fn new(request: &'r SyncRequest) -> Self {
		Self { request }
	}

	/// Drives the run to completion, reporting progress along the way.
	#[instrument(skip_all, fields(cluster = %self.request.cluster, region = %self.request.region))]
	pub fn run(
		&self,
		plane: &dyn ControlPlane,
		reporter: &mut dyn Reporter,
	) -> Result<NetworkFacts, Failure> {
		let facts = self
			.resolve(plane, reporter)
			.map_err(|error| fail(reporter, Step::Init, error))?;
		let mut reached = Step::FactsResolved;
		for stage in Stage::ORDER {
			if let Err(error) = self.advance(stage, &facts, reporter) {
				return Err(fail(reporter, reached, error));
			}
			reached = stage.reaches();
			info!(step = ?reached, "step completed");
		}
		reporter.report(Event::Completed);
		info!(step = ?Step::Done, "step completed");
		Ok(facts)
	}

	/// `Init -> FactsResolved`: preflight checks, then discovery.
	fn resolve(
		&self,
		plane: &dyn ControlPlane,
		reporter: &mut dyn Reporter,
	) -> Result<NetworkFacts, SyncError> {
		for path in self.request.documents.in_order() {
			if !path.exists() {
				return Err(LoadError::NotFound {
					path: path.to_path_buf(),
				}
				.into());
			}
		}
		self.repository()?;

		reporter.report(Event::FetchingCluster {
			cluster: self.request.cluster.clone(),
			region: self.request.region.clone(),
		});
		let facts = resolve_network_facts(plane, &self.request.cluster)?;
		reporter.report(Event::FactsResolved(facts.clone()));
		Ok(facts)
	}

	/// Applies the patch of `stage` to its document.
	fn advance(
		&self,
		stage: Stage,
		facts: &NetworkFacts,
		reporter: &mut dyn Reporter,
	) -> Result<(), SyncError> {
		let request = self.request;
		let documents = &request.documents;
		match stage {
			Stage::Network => patch(reporter, &NetworkPatch { facts }, &documents.network),
			Stage::Identity => patch(
				reporter,
				&IdentityPatch {
					cluster_name: &request.cluster,
				},
				&documents.identity,
			),
			Stage::DbWebStack => {
				let image = image_reference(self.repository()?, &request.db_tag);
				patch(
					reporter,
					&DbWebStackPatch {
						image: &image,
						region: &request.region,
					},
					&documents.db_web_stack,
				)
			}
			Stage::WebStack => {
				let image = image_reference(self.repository()?, &request.web_tag);
				patch(
					reporter,
					&WebStackPatch {
						image: &image,
						cluster_name: &request.cluster,
					},
					&documents.web_stack,
				)
			}
			Stage::Ingress => patch(
				reporter,
				&IngressPatch {
					ingress_class: &request.ingress_class,
				},
				&documents.webapp,
			),
		}
	}

	fn repository(&self) -> Result<&'r str, ValidationError> {
		self.request
			.image_repository
			.as_deref()
			.filter(|repository| !repository.is_empty())
			.ok_or(ValidationError::MissingImageRepository)
	}
}

fn fail(reporter: &mut dyn Reporter, after: Step, error: SyncError) -> Failure {
	reporter.report(Event::failed(&error));
	Failure { after, error }
}

fn patch<P: Patch>(reporter: &mut dyn Reporter, patch: &P, path: &Path) -> Result<(), SyncError> {
	reporter.report(Event::Patching {
		document: patch.label(),
		path: path.to_path_buf(),
	});
	patch_file(patch, path)?;
	reporter.report(Event::Patched {
		document: patch.label(),
	});
	Ok(())
}
