//! Operator-facing progress messages.
//!
//! These are separate from `tracing` diagnostics: they form the tool's output
//! contract, one `[INFO]` line per step and a single `[ERROR]` line on failure.

use std::{error::Error, fmt, io::Write, path::PathBuf};

use crate::discover::NetworkFacts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	FetchingCluster { cluster: String, region: String },
	FactsResolved(NetworkFacts),
	Patching {
		document: &'static str,
		path: PathBuf,
	},
	Patched { document: &'static str },
	Completed,
	Failed { message: String },
}

impl Event {
	/// Failure event carrying `error` and all of its sources, folded onto a
	/// single line.
	pub fn failed(error: &(dyn Error + 'static)) -> Self {
		let mut message = error.to_string();
		let mut source = error.source();
		while let Some(cause) = source {
			message.push_str(": ");
			message.push_str(&cause.to_string());
			source = cause.source();
		}
		let message = message
			.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty())
			.collect::<Vec<_>>()
			.join(" ");
		Event::Failed { message }
	}

	pub fn is_failure(&self) -> bool {
		matches!(self, Event::Failed { .. })
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Event::FetchingCluster { cluster, region } => {
				write!(f, "Fetching cluster '{cluster}' in {region}")
			}
			Event::FactsResolved(facts) => write!(f, "Resolved {facts}"),
			Event::Patching { document, path } => {
				write!(f, "Updating {document}: {}", path.display())
			}
			Event::Patched { document } => write!(f, "  ✓ {document} updated"),
			Event::Completed => f.write_str("All updates completed successfully."),
			Event::Failed { message } => f.write_str(message),
		}
	}
}

pub trait Reporter {
	fn report(&mut self, event: Event);
}

/// Prints progress to `out` and failures to `err`.
pub struct ConsoleReporter<O, E> {
	out: O,
	err: E,
}

impl<O: Write, E: Write> ConsoleReporter<O, E> {
	pub fn new(out: O, err: E) -> Self {
		Self { out, err }
	}
}

impl<O: Write, E: Write> Reporter for ConsoleReporter<O, E> {
	fn report(&mut self, event: Event) {
		// Nothing sensible can be done when the console itself is gone
		let _ = if event.is_failure() {
			writeln!(self.err, "[ERROR] {event}")
		} else {
			writeln!(self.out, "[INFO] {event}")
		};
	}
}
