// Provides the CLI for the program.

// Uses
use clap::{value_parser, Arg, Command};

// Constants
pub const APPLICATION_PROPER_NAME: &str = "ctls-kernel";
pub const APPLICATION_BIN_NAME: &str = env!("CARGO_PKG_NAME");

/// Builds the command-line interface: a trace-replay harness for local
/// kernel debugging, not a certification test harness.
pub fn build_cli() -> Command {
	Command::new(APPLICATION_PROPER_NAME)
		.version(env!("CARGO_PKG_VERSION"))
		.author(env!("CARGO_PKG_AUTHORS"))
		.about(env!("CARGO_PKG_DESCRIPTION"))
		.arg_required_else_help(true)
		.arg(
			Arg::new("colour")
				.alias("color")
				.long("colour")
				.num_args(1)
				.default_value("auto")
				.value_parser(["auto", "always", "ansi", "never"])
				.value_name("WHEN")
				.help("When to use colour in console output"),
		)
		.next_help_heading("TRACE REPLAY")
		.arg(
			Arg::new("trace")
				.short('t')
				.long("trace")
				.num_args(1)
				.required(true)
				.value_name("FILE")
				.help("Path to a trace file of `COMMAND_HEX RESPONSE_HEX` pairs, one exchange per line"),
		)
		.arg(
			Arg::new("scheme")
				.short('s')
				.long("scheme")
				.num_args(1)
				.default_value("generic")
				.value_parser(["visa", "mastercard", "generic"])
				.value_name("SCHEME")
				.help("Which scheme kernel to drive the trace through"),
		)
		.arg(
			Arg::new("aid")
				.long("aid")
				.num_args(1)
				.required(true)
				.value_name("HEX")
				.help("The application identifier (AID) selected for this trace"),
		)
		.arg(
			Arg::new("amount")
				.short('a')
				.long("amount")
				.num_args(1)
				.default_value("0")
				.value_parser(value_parser!(u64))
				.value_name("MINOR UNITS")
				.help("Transaction amount, in the currency's minor units"),
		)
		.next_help_heading("TERMINAL PROFILE")
		.arg(
			Arg::new("floor-limit")
				.long("floor-limit")
				.num_args(1)
				.value_parser(value_parser!(u64))
				.value_name("MINOR UNITS")
				.help("Overrides the configured terminal floor limit"),
		)
		.arg(
			Arg::new("cvm-limit")
				.long("cvm-limit")
				.num_args(1)
				.value_parser(value_parser!(u64))
				.value_name("MINOR UNITS")
				.help("Overrides the configured contactless CVM limit"),
		)
}
