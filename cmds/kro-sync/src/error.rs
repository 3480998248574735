//! Error kinds of the synchronization pipeline.

use std::{io, path::PathBuf, process::ExitStatus, time::Duration};

use kro_manifest::AccessError;
pub use kro_manifest::{LoadError, WriteError};
use thiserror::Error;

/// Cloud lookup failed or returned incomplete data.
#[derive(Debug, Error)]
pub enum DiscoveryError {
	#[error("failed to retrieve VPC ID or subnet IDs for cluster `{cluster}`")]
	IncompleteCluster { cluster: String },

	#[error("VPC `{vpc_id}` not found")]
	VpcNotFound { vpc_id: String },

	#[error("VPC `{vpc_id}` has no CIDR block")]
	MissingCidr { vpc_id: String },

	#[error("not enough private subnets found: need 2, found {found}")]
	NotEnoughPrivateSubnets { found: usize },

	#[error("failed to start control-plane runtime")]
	Runtime(#[source] io::Error),

	#[error("failed to execute `{command}`")]
	Spawn {
		command: String,
		#[source]
		source: io::Error,
	},

	#[error("`{command}` did not finish within {}s", limit.as_secs_f64())]
	Timeout { command: String, limit: Duration },

	#[error("`{command}` failed ({status}): {stderr}")]
	CommandFailed {
		command: String,
		status: ExitStatus,
		stderr: String,
	},

	#[error("unexpected output from `{command}`")]
	Decode {
		command: String,
		#[source]
		source: serde_json::Error,
	},
}

/// A document is not the one a patcher expects.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("{} is not a {expected} (found {})", path.display(), describe_kind(actual.as_deref()))]
	KindMismatch {
		path: PathBuf,
		expected: &'static str,
		actual: Option<String>,
	},

	#[error("no '{id}' resource found in {}", path.display())]
	MissingResource { path: PathBuf, id: &'static str },

	#[error("{}: {location}: {problem}", path.display())]
	Malformed {
		path: PathBuf,
		location: String,
		problem: AccessError,
	},

	#[error("ECR repository URI must be provided via --ecr-repo-uri or ECR_IMAGE_URI env var")]
	MissingImageRepository,
}

fn describe_kind(kind: Option<&str>) -> String {
	match kind {
		Some(kind) => format!("kind `{kind}`"),
		None => "no kind".to_owned(),
	}
}

/// Any failure that ends a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),

	#[error(transparent)]
	Load(#[from] LoadError),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Write(#[from] WriteError),
}
