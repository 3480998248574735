//! Synchronizes kro configuration documents with the network of a live EKS
//! cluster and the images published to ECR.

pub mod aws;
pub mod commands;
pub mod config;
pub mod discover;
pub mod error;
pub mod patch;
pub mod pipeline;
pub mod report;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
