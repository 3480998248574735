//! Cluster network discovery.
//!
//! Facts are looked up through a [`ControlPlane`], one client per region. The
//! production implementation drives the AWS CLI (see [`crate::aws`]).

use std::fmt;

use tracing::{debug, instrument};

use crate::error::DiscoveryError;

/// Network configuration of an EKS cluster as reported by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterDescription {
	pub vpc_id: Option<String>,
	pub subnet_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpcDescription {
	pub vpc_id: String,
	pub cidr_block: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetDescription {
	pub subnet_id: String,
	/// Whether instances launched in the subnet get a public IP.
	pub map_public_ip_on_launch: bool,
}

/// Read-only view of the cloud control plane.
pub trait ControlPlane {
	fn describe_cluster(&self, name: &str) -> Result<ClusterDescription, DiscoveryError>;

	/// `None` when the VPC does not exist.
	fn describe_vpc(&self, vpc_id: &str) -> Result<Option<VpcDescription>, DiscoveryError>;

	/// Subnets are returned in whatever order the control plane lists them.
	fn describe_subnets(
		&self,
		subnet_ids: &[String],
	) -> Result<Vec<SubnetDescription>, DiscoveryError>;
}

/// VPC and subnets a cluster is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterNetwork {
	pub vpc_id: String,
	pub subnet_ids: Vec<String>,
}

/// Everything the network document needs, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkFacts {
	pub vpc_id: String,
	pub cidr_block: String,
	pub private_subnet_ids: [String; 2],
}

impl fmt::Display for NetworkFacts {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [first, second] = &self.private_subnet_ids;
		write!(
			f,
			"VPC {} ({}), private subnets {first}, {second}",
			self.vpc_id, self.cidr_block
		)
	}
}

#[instrument(skip(plane))]
pub fn resolve_cluster_network(
	plane: &dyn ControlPlane,
	cluster: &str,
) -> Result<ClusterNetwork, DiscoveryError> {
	let description = plane.describe_cluster(cluster)?;
	match description.vpc_id {
		Some(vpc_id) if !vpc_id.is_empty() && !description.subnet_ids.is_empty() => {
			debug!(%vpc_id, subnets = description.subnet_ids.len(), "cluster network found");
			Ok(ClusterNetwork {
				vpc_id,
				subnet_ids: description.subnet_ids,
			})
		}
		_ => Err(DiscoveryError::IncompleteCluster {
			cluster: cluster.to_owned(),
		}),
	}
}

#[instrument(skip(plane))]
pub fn resolve_cidr(plane: &dyn ControlPlane, vpc_id: &str) -> Result<String, DiscoveryError> {
	let vpc = plane
		.describe_vpc(vpc_id)?
		.ok_or_else(|| DiscoveryError::VpcNotFound {
			vpc_id: vpc_id.to_owned(),
		})?;
	vpc.cidr_block
		.filter(|cidr| !cidr.is_empty())
		.ok_or_else(|| DiscoveryError::MissingCidr {
			vpc_id: vpc_id.to_owned(),
		})
}

/// Picks the first two subnets that do not auto-assign public IPs.
///
/// Selection follows the order in which the control plane lists the subnets,
/// the ids are never sorted.
#[instrument(skip(plane))]
pub fn resolve_private_subnets(
	plane: &dyn ControlPlane,
	subnet_ids: &[String],
) -> Result<[String; 2], DiscoveryError> {
	let subnets = plane.describe_subnets(subnet_ids)?;
	let mut private = subnets
		.into_iter()
		.filter(|subnet| !subnet.map_public_ip_on_launch)
		.map(|subnet| subnet.subnet_id);

	match (private.next(), private.next()) {
		(Some(first), Some(second)) => Ok([first, second]),
		(first, _) => Err(DiscoveryError::NotEnoughPrivateSubnets {
			found: usize::from(first.is_some()),
		}),
	}
}

/// Resolves cluster network, VPC CIDR and private subnets in that order.
pub fn resolve_network_facts(
	plane: &dyn ControlPlane,
	cluster: &str,
) -> Result<NetworkFacts, DiscoveryError> {
	let network = resolve_cluster_network(plane, cluster)?;
	let cidr_block = resolve_cidr(plane, &network.vpc_id)?;
	let private_subnet_ids = resolve_private_subnets(plane, &network.subnet_ids)?;
	Ok(NetworkFacts {
		vpc_id: network.vpc_id,
		cidr_block,
		private_subnet_ids,
	})
}
