//! Shared helpers for kro-sync integration tests.

#![allow(dead_code)]

use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use kro_sync::{
	commands::sync::SyncArgs,
	discover::{ClusterDescription, ControlPlane, SubnetDescription, VpcDescription},
	error::DiscoveryError,
	report::{Event, Reporter},
};
use tempfile::TempDir;

pub const DOCUMENTS: [&str; 5] = [
	"network.yaml",
	"identity.yaml",
	"dbwebstack.yaml",
	"webstack.yaml",
	"webapp.yaml",
];

pub fn testdata(name: &str) -> PathBuf {
	Path::new(env!("CARGO_MANIFEST_DIR"))
		.join("tests")
		.join("testdata")
		.join(name)
}

/// Copies the fixture documents into a scratch directory.
pub fn workspace() -> TempDir {
	let dir = TempDir::new().unwrap();
	for name in DOCUMENTS {
		fs::copy(testdata(name), dir.path().join(name)).unwrap();
	}
	dir
}

pub fn read(dir: &TempDir, name: &str) -> String {
	fs::read_to_string(dir.path().join(name)).unwrap()
}

pub fn load(dir: &TempDir, name: &str) -> kro_manifest::Node {
	kro_manifest::load(&dir.path().join(name)).unwrap()
}

/// Arguments for a run over the documents in `dir`.
pub fn args(dir: &TempDir, extra: &[&str]) -> SyncArgs {
	let mut argv: Vec<String> = vec!["kro-sync".to_owned()];
	argv.extend(
		DOCUMENTS
			.iter()
			.map(|name| dir.path().join(name).display().to_string()),
	);
	argv.extend(
		[
			"--region",
			"us-west-2",
			"--cluster",
			"kro",
			"--ecr-repo-uri",
			"123.dkr.ecr/app",
		]
		.map(String::from),
	);
	argv.extend(extra.iter().map(|arg| (*arg).to_owned()));
	SyncArgs::try_parse_from(argv).unwrap()
}

/// Cluster `vpc-1` in `10.0.0.0/16`, listing a public subnet first.
pub struct FakeControlPlane {
	pub subnets: Vec<SubnetDescription>,
}

impl Default for FakeControlPlane {
	fn default() -> Self {
		Self {
			subnets: vec![
				subnet("subnet-pub", true),
				subnet("subnet-a", false),
				subnet("subnet-b", false),
				subnet("subnet-c", false),
			],
		}
	}
}

pub fn subnet(id: &str, public: bool) -> SubnetDescription {
	SubnetDescription {
		subnet_id: id.to_owned(),
		map_public_ip_on_launch: public,
	}
}

impl ControlPlane for FakeControlPlane {
	fn describe_cluster(&self, _name: &str) -> Result<ClusterDescription, DiscoveryError> {
		Ok(ClusterDescription {
			vpc_id: Some("vpc-1".to_owned()),
			subnet_ids: self.subnets.iter().map(|s| s.subnet_id.clone()).collect(),
		})
	}

	fn describe_vpc(&self, vpc_id: &str) -> Result<Option<VpcDescription>, DiscoveryError> {
		Ok((vpc_id == "vpc-1").then(|| VpcDescription {
			vpc_id: vpc_id.to_owned(),
			cidr_block: Some("10.0.0.0/16".to_owned()),
		}))
	}

	fn describe_subnets(
		&self,
		_subnet_ids: &[String],
	) -> Result<Vec<SubnetDescription>, DiscoveryError> {
		Ok(self.subnets.clone())
	}
}

#[derive(Default)]
pub struct RecordingReporter {
	pub events: Vec<Event>,
}

impl Reporter for RecordingReporter {
	fn report(&mut self, event: Event) {
		self.events.push(event);
	}
}

impl RecordingReporter {
	pub fn failure(&self) -> Option<&str> {
		self.events.iter().find_map(|event| match event {
			Event::Failed { message } => Some(message.as_str()),
			_ => None,
		})
	}
}
