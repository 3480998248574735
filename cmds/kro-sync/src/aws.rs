//! [`ControlPlane`] backed by the `aws` command line tool.
//!
//! Every lookup is one CLI invocation with `--output json`. Invocations run on
//! a current-thread tokio runtime so that an optional per-call timeout can be
//! applied; the child process is killed when it elapses.

use std::{
	ffi::OsString,
	path::PathBuf,
	time::Duration,
};

use serde::{de::DeserializeOwned, Deserialize};
use tokio::{process::Command, runtime::Runtime};
use tracing::{debug, instrument};

use crate::{
	discover::{ClusterDescription, ControlPlane, SubnetDescription, VpcDescription},
	error::DiscoveryError,
};

/// Error code the EC2 API returns for unknown VPC ids.
const VPC_NOT_FOUND_CODE: &str = "InvalidVpcID.NotFound";

pub struct AwsCli {
	binary: PathBuf,
	region: String,
	profile: Option<String>,
	timeout: Option<Duration>,
	runtime: Runtime,
}

impl std::fmt::Debug for AwsCli {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AwsCli")
			.field("binary", &self.binary)
			.field("region", &self.region)
			.field("profile", &self.profile)
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}

impl AwsCli {
	/// Client for `region`, invoking `aws` from `PATH` without a timeout.
	pub fn new(region: impl Into<String>) -> Result<Self, DiscoveryError> {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(DiscoveryError::Runtime)?;
		Ok(Self {
			binary: PathBuf::from("aws"),
			region: region.into(),
			profile: None,
			timeout: None,
			runtime,
		})
	}

	pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
		self.binary = binary.into();
		self
	}

	pub fn with_profile(mut self, profile: Option<String>) -> Self {
		self.profile = profile;
		self
	}

	/// Limits how long a single invocation may run. Disabled by default.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	fn arguments(&self, args: &[&str]) -> Vec<OsString> {
		let mut out: Vec<OsString> = args.iter().map(OsString::from).collect();
		out.push("--region".into());
		out.push(self.region.clone().into());
		if let Some(profile) = &self.profile {
			out.push("--profile".into());
			out.push(profile.into());
		}
		out.push("--output".into());
		out.push("json".into());
		out
	}

	#[instrument(skip(self), fields(region = %self.region))]
	fn invoke<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, DiscoveryError> {
		let command = format!("{} {}", self.binary.display(), args.join(" "));
		let arguments = self.arguments(args);

		let output = self.runtime.block_on(async {
			let mut cmd = Command::new(&self.binary);
			cmd.args(&arguments).kill_on_drop(true);
			match self.timeout {
				Some(limit) => tokio::time::timeout(limit, cmd.output())
					.await
					.map_err(|_| DiscoveryError::Timeout {
						command: command.clone(),
						limit,
					})?,
				None => cmd.output().await,
			}
			.map_err(|source| DiscoveryError::Spawn {
				command: command.clone(),
				source,
			})
		})?;

		if !output.status.success() {
			return Err(DiscoveryError::CommandFailed {
				command,
				status: output.status,
				stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
			});
		}
		debug!(bytes = output.stdout.len(), "aws cli responded");

		serde_json::from_slice(&output.stdout)
			.map_err(|source| DiscoveryError::Decode { command, source })
	}
}

#[derive(Deserialize)]
struct DescribeClusterOutput {
	cluster: EksCluster,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EksCluster {
	#[serde(default)]
	resources_vpc_config: EksVpcConfig,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EksVpcConfig {
	vpc_id: Option<String>,
	#[serde(default)]
	subnet_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVpcsOutput {
	#[serde(default)]
	vpcs: Vec<Ec2Vpc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Vpc {
	vpc_id: String,
	cidr_block: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSubnetsOutput {
	#[serde(default)]
	subnets: Vec<Ec2Subnet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Subnet {
	subnet_id: String,
	#[serde(default)]
	map_public_ip_on_launch: bool,
}

impl ControlPlane for AwsCli {
	fn describe_cluster(&self, name: &str) -> Result<ClusterDescription, DiscoveryError> {
		let output: DescribeClusterOutput =
			self.invoke(&["eks", "describe-cluster", "--name", name])?;
		let config = output.cluster.resources_vpc_config;
		Ok(ClusterDescription {
			vpc_id: config.vpc_id,
			subnet_ids: config.subnet_ids,
		})
	}

	fn describe_vpc(&self, vpc_id: &str) -> Result<Option<VpcDescription>, DiscoveryError> {
		let output: DescribeVpcsOutput =
			match self.invoke(&["ec2", "describe-vpcs", "--vpc-ids", vpc_id]) {
				Ok(output) => output,
				Err(DiscoveryError::CommandFailed { stderr, .. })
					if stderr.contains(VPC_NOT_FOUND_CODE) =>
				{
					return Ok(None)
				}
				Err(e) => return Err(e),
			};
		Ok(output.vpcs.into_iter().next().map(|vpc| VpcDescription {
			vpc_id: vpc.vpc_id,
			cidr_block: vpc.cidr_block,
		}))
	}

	fn describe_subnets(
		&self,
		subnet_ids: &[String],
	) -> Result<Vec<SubnetDescription>, DiscoveryError> {
		// Without ids the CLI lists every subnet in the region
		if subnet_ids.is_empty() {
			return Ok(Vec::new());
		}
		let mut args = vec!["ec2", "describe-subnets", "--subnet-ids"];
		args.extend(subnet_ids.iter().map(String::as_str));
		let output: DescribeSubnetsOutput = self.invoke(&args)?;
		Ok(output
			.subnets
			.into_iter()
			.map(|subnet| SubnetDescription {
				subnet_id: subnet.subnet_id,
				map_public_ip_on_launch: subnet.map_public_ip_on_launch,
			})
			.collect())
	}
}

#[cfg(all(test, unix))]
mod tests {
	use std::{fs, os::unix::fs::PermissionsExt, path::Path};

	use assert_matches::assert_matches;
	use tempfile::TempDir;

	use super::*;

	/// Installs a shell script standing in for the `aws` binary.
	fn fake_aws(dir: &Path, script: &str) -> PathBuf {
		let path = dir.join("aws");
		fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
		fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
		path
	}

	#[test]
	fn test_describe_cluster_parses_eks_output() {
		let temp = TempDir::new().unwrap();
		let binary = fake_aws(
			temp.path(),
			r#"echo "$@" > "$(dirname "$0")/args"
cat <<'JSON'
{"cluster": {"name": "kro", "resourcesVpcConfig": {"vpcId": "vpc-1", "subnetIds": ["subnet-a", "subnet-b"]}}}
JSON"#,
		);
		let cli = AwsCli::new("us-west-2")
			.unwrap()
			.with_binary(&binary)
			.with_profile(Some("ops".to_owned()));

		let cluster = cli.describe_cluster("kro").unwrap();
		assert_eq!(
			cluster,
			ClusterDescription {
				vpc_id: Some("vpc-1".to_owned()),
				subnet_ids: vec!["subnet-a".to_owned(), "subnet-b".to_owned()],
			}
		);

		let args = fs::read_to_string(temp.path().join("args")).unwrap();
		assert_eq!(
			args.trim(),
			"eks describe-cluster --name kro --region us-west-2 --profile ops --output json"
		);
	}

	#[test]
	fn test_describe_subnets_keeps_listing_order() {
		let temp = TempDir::new().unwrap();
		let binary = fake_aws(
			temp.path(),
			r#"cat <<'JSON'
{"Subnets": [
  {"SubnetId": "subnet-b", "MapPublicIpOnLaunch": false},
  {"SubnetId": "subnet-a", "MapPublicIpOnLaunch": true},
  {"SubnetId": "subnet-c"}
]}
JSON"#,
		);
		let cli = AwsCli::new("us-west-2").unwrap().with_binary(&binary);
		let ids = ["subnet-a", "subnet-b", "subnet-c"].map(String::from);

		let subnets = cli.describe_subnets(&ids).unwrap();
		let listed: Vec<_> = subnets
			.iter()
			.map(|s| (s.subnet_id.as_str(), s.map_public_ip_on_launch))
			.collect();
		assert_eq!(
			listed,
			[("subnet-b", false), ("subnet-a", true), ("subnet-c", false)]
		);
	}

	#[test]
	fn test_unknown_vpc_is_none() {
		let temp = TempDir::new().unwrap();
		let binary = fake_aws(
			temp.path(),
			"echo 'An error occurred (InvalidVpcID.NotFound) when calling the DescribeVpcs operation' >&2\nexit 254",
		);
		let cli = AwsCli::new("us-west-2").unwrap().with_binary(&binary);
		assert_eq!(cli.describe_vpc("vpc-404").unwrap(), None);
	}

	#[test]
	fn test_failed_invocation_reports_stderr() {
		let temp = TempDir::new().unwrap();
		let binary = fake_aws(temp.path(), "echo 'Unable to locate credentials' >&2\nexit 253");
		let cli = AwsCli::new("us-west-2").unwrap().with_binary(&binary);
		assert_matches!(
			cli.describe_cluster("kro"),
			Err(DiscoveryError::CommandFailed { stderr, .. }) if stderr == "Unable to locate credentials"
		);
	}

	#[test]
	fn test_timeout_kills_slow_invocation() {
		let temp = TempDir::new().unwrap();
		let binary = fake_aws(temp.path(), "sleep 5");
		let cli = AwsCli::new("us-west-2")
			.unwrap()
			.with_binary(&binary)
			.with_timeout(Some(Duration::from_millis(100)));
		assert_matches!(
			cli.describe_cluster("kro"),
			Err(DiscoveryError::Timeout { .. })
		);
	}

	#[test]
	fn test_missing_binary() {
		let cli = AwsCli::new("us-west-2")
			.unwrap()
			.with_binary("/nonexistent/aws");
		assert_matches!(
			cli.describe_cluster("kro"),
			Err(DiscoveryError::Spawn { .. })
		);
	}

	#[test]
	fn test_garbage_output() {
		let temp = TempDir::new().unwrap();
		let binary = fake_aws(temp.path(), "echo not-json");
		let cli = AwsCli::new("us-west-2").unwrap().with_binary(&binary);
		assert_matches!(
			cli.describe_cluster("kro"),
			Err(DiscoveryError::Decode { .. })
		);
	}
}
