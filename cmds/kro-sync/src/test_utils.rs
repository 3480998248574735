//! Common test utilities.

use std::cell::RefCell;

use crate::{
	discover::{ClusterDescription, ControlPlane, SubnetDescription, VpcDescription},
	error::DiscoveryError,
	report::{Event, Reporter},
};

/// A control plane serving fixed answers and recording every call.
#[derive(Default)]
pub struct FakeControlPlane {
	cluster: ClusterDescription,
	vpcs: Vec<VpcDescription>,
	subnets: Vec<SubnetDescription>,
	pub calls: RefCell<Vec<String>>,
}

impl FakeControlPlane {
	/// Cluster `vpc-1` with one public and three private subnets.
	pub fn standard() -> Self {
		let subnet = |id: &str, public| SubnetDescription {
			subnet_id: id.to_owned(),
			map_public_ip_on_launch: public,
		};
		Self::default()
			.with_cluster(ClusterDescription {
				vpc_id: Some("vpc-1".to_owned()),
				subnet_ids: ["subnet-pub", "subnet-a", "subnet-b", "subnet-c"]
					.map(String::from)
					.to_vec(),
			})
			.with_vpc("vpc-1", "10.0.0.0/16")
			.with_subnets(vec![
				subnet("subnet-pub", true),
				subnet("subnet-a", false),
				subnet("subnet-b", false),
				subnet("subnet-c", false),
			])
	}

	pub fn with_cluster(mut self, cluster: ClusterDescription) -> Self {
		self.cluster = cluster;
		self
	}

	pub fn with_vpc(mut self, vpc_id: &str, cidr_block: &str) -> Self {
		self.vpcs.push(VpcDescription {
			vpc_id: vpc_id.to_owned(),
			cidr_block: Some(cidr_block.to_owned()),
		});
		self
	}

	pub fn with_subnets(mut self, subnets: Vec<SubnetDescription>) -> Self {
		self.subnets = subnets;
		self
	}
}

impl ControlPlane for FakeControlPlane {
	fn describe_cluster(&self, name: &str) -> Result<ClusterDescription, DiscoveryError> {
		self.calls.borrow_mut().push(format!("describe-cluster {name}"));
		Ok(self.cluster.clone())
	}

	fn describe_vpc(&self, vpc_id: &str) -> Result<Option<VpcDescription>, DiscoveryError> {
		self.calls.borrow_mut().push(format!("describe-vpcs {vpc_id}"));
		Ok(self.vpcs.iter().find(|vpc| vpc.vpc_id == vpc_id).cloned())
	}

	fn describe_subnets(
		&self,
		subnet_ids: &[String],
	) -> Result<Vec<SubnetDescription>, DiscoveryError> {
		self.calls
			.borrow_mut()
			.push(format!("describe-subnets {}", subnet_ids.join(",")));
		Ok(self
			.subnets
			.iter()
			.filter(|subnet| subnet_ids.contains(&subnet.subnet_id))
			.cloned()
			.collect())
	}
}

/// A reporter keeping every event in memory.
#[derive(Default)]
pub struct RecordingReporter {
	pub events: Vec<Event>,
}

impl Reporter for RecordingReporter {
	fn report(&mut self, event: Event) {
		self.events.push(event);
	}
}
