//! Sync command handler.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, Level};

use crate::{
	aws::AwsCli,
	config::SyncConfig,
	discover::ControlPlane,
	pipeline::{DocumentPaths, Pipeline, SyncRequest},
	report::{Event, Reporter},
};

/// Sync kro resource graph definitions and stack instances with the network
/// of an EKS cluster
#[derive(Parser, Debug, Clone)]
#[command(name = "kro-sync", version, long_about = None)]
pub struct SyncArgs {
	/// Network ResourceGraphDefinition (security group, DB subnet group)
	pub network_yaml: PathBuf,

	/// Identity ResourceGraphDefinition (pod identity association, IAM role)
	pub identity_yaml: PathBuf,

	/// DbWebStack instance
	pub db_yaml: PathBuf,

	/// WebStack instance
	pub web_yaml: PathBuf,

	/// WebApp ResourceGraphDefinition containing the ingress
	pub webapp_yaml: PathBuf,

	/// AWS region of the cluster
	#[arg(long)]
	pub region: String,

	/// EKS cluster name
	#[arg(long, default_value = "kro")]
	pub cluster: String,

	/// ECR repository URI, without a tag
	#[arg(long, env = "ECR_IMAGE_URI")]
	pub ecr_repo_uri: Option<String>,

	/// Image tag for the DbWebStack instance
	#[arg(long, default_value = "rds-latest")]
	pub ecr_tag: String,

	/// Image tag for the WebStack instance
	#[arg(long, default_value = "web-latest")]
	pub web_tag: String,

	/// Ingress class for the WebApp ingress
	#[arg(long, default_value = "alb")]
	pub ingress_class: String,

	/// Timeout in seconds for a single control-plane call
	#[arg(long, value_name = "SECONDS")]
	pub timeout: Option<u64>,

	/// Config file to use instead of searching for .kro-sync.yaml
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Log level for diagnostics (error, warn, info, debug, trace)
	#[arg(long)]
	pub log_level: Option<Level>,
}

impl SyncArgs {
	pub fn request(&self) -> SyncRequest {
		SyncRequest {
			documents: DocumentPaths {
				network: self.network_yaml.clone(),
				identity: self.identity_yaml.clone(),
				db_web_stack: self.db_yaml.clone(),
				web_stack: self.web_yaml.clone(),
				webapp: self.webapp_yaml.clone(),
			},
			cluster: self.cluster.clone(),
			region: self.region.clone(),
			image_repository: self.ecr_repo_uri.clone(),
			db_tag: self.ecr_tag.clone(),
			web_tag: self.web_tag.clone(),
			ingress_class: self.ingress_class.clone(),
		}
	}
}

/// Builds the AWS CLI backend from the config file and the flags.
pub fn control_plane(args: &SyncArgs) -> Result<AwsCli> {
	let cwd = std::env::current_dir().context("failed to determine working directory")?;
	let config = SyncConfig::resolve(args.config.as_deref(), &cwd)?.control_plane;
	let timeout = args
		.timeout
		.map(Duration::from_secs)
		.or_else(|| config.timeout());

	let mut cli = AwsCli::new(&args.region)?
		.with_profile(config.profile)
		.with_timeout(timeout);
	if let Some(binary) = config.aws_cli {
		cli = cli.with_binary(binary);
	}
	debug!(?cli, "control plane configured");
	Ok(cli)
}

/// Run the sync command against the AWS CLI.
pub fn run(args: SyncArgs, reporter: &mut dyn Reporter) -> ExitCode {
	match control_plane(&args) {
		Ok(plane) => run_with(&args, &plane, reporter),
		Err(e) => {
			reporter.report(Event::failed(e.as_ref()));
			ExitCode::FAILURE
		}
	}
}

/// Run the sync command against an already constructed control plane.
pub fn run_with(
	args: &SyncArgs,
	plane: &dyn ControlPlane,
	reporter: &mut dyn Reporter,
) -> ExitCode {
	let request = args.request();
	match Pipeline::new(&request).run(plane, reporter) {
		Ok(_) => ExitCode::SUCCESS,
		Err(failure) => {
			debug!(after = ?failure.after, "sync stopped");
			ExitCode::FAILURE
		}
	}
}
