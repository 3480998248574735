use std::{io, process::ExitCode};

use clap::Parser;
use kro_sync::{
	commands::{
		sync::{self, SyncArgs},
		util::BrokenPipeGuard,
	},
	report::ConsoleReporter,
	telemetry,
};

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

fn main() -> ExitCode {
	let args = SyncArgs::parse();

	telemetry::init(args.log_level);

	let mut reporter = ConsoleReporter::new(BrokenPipeGuard::new(io::stdout()), io::stderr());
	sync::run(args, &mut reporter)
}
