//! Configuration documents as an order-preserving node tree.
//!
//! Documents are read with serde-saphyr into [`Node`] and written back with a
//! hand-written emitter (see [`emit`]) so that the output layout does not
//! depend on serializer defaults.

mod de;
pub mod emit;
mod node;

use std::{
	fs, io,
	path::{Path, PathBuf},
};

pub use emit::to_yaml;
pub use node::{AccessError, Mapping, Node, NodeType, Scalar};
use thiserror::Error;
use tracing::instrument;

/// A document could not be read.
#[derive(Debug, Error)]
pub enum LoadError {
	#[error("file not found: {}", path.display())]
	NotFound { path: PathBuf },

	#[error("failed to read {}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("failed to parse {}: {message}", path.display())]
	Parse { path: PathBuf, message: String },

	#[error("{} contains no document", path.display())]
	Empty { path: PathBuf },

	#[error("{} contains {count} documents, expected exactly one", path.display())]
	MultipleDocuments { path: PathBuf, count: usize },
}

/// A document could not be persisted.
#[derive(Debug, Error)]
#[error("failed to write {}", path.display())]
pub struct WriteError {
	pub path: PathBuf,
	#[source]
	pub source: io::Error,
}

/// Parses a single YAML document.
pub fn from_str(content: &str, path: &Path) -> Result<Node, LoadError> {
	let options = serde_saphyr::Options {
		legacy_octal_numbers: true,
		// Inputs are local files the operator points us at
		budget: None,
		..Default::default()
	};
	let documents: Vec<Node> = serde_saphyr::from_multiple_with_options(content, options)
		.map_err(|e| LoadError::Parse {
			path: path.to_path_buf(),
			// The rest is a rendered source snippet
			message: e
				.to_string()
				.lines()
				.map(str::trim)
				.find(|line| !line.is_empty())
				.unwrap_or_default()
				.to_owned(),
		})?;

	let count = documents.len();
	let mut documents = documents.into_iter();
	match (documents.next(), count) {
		(Some(document), 1) => Ok(document),
		(None, _) => Err(LoadError::Empty {
			path: path.to_path_buf(),
		}),
		(Some(_), count) => Err(LoadError::MultipleDocuments {
			path: path.to_path_buf(),
			count,
		}),
	}
}

/// Reads and parses the document stored at `path`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load(path: &Path) -> Result<Node, LoadError> {
	let content = fs::read_to_string(path).map_err(|source| {
		if source.kind() == io::ErrorKind::NotFound {
			LoadError::NotFound {
				path: path.to_path_buf(),
			}
		} else {
			LoadError::Read {
				path: path.to_path_buf(),
				source,
			}
		}
	})?;
	from_str(&content, path)
}

/// Renders `node` and replaces the contents of `path` with it.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write(path: &Path, node: &Node) -> Result<(), WriteError> {
	let rendered = to_yaml(node);
	fs::write(path, rendered).map_err(|source| WriteError {
		path: path.to_path_buf(),
		source,
	})?;
	tracing::debug!("document written");
	Ok(())
}
