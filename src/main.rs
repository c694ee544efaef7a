//! A trace-replay harness for the kernel suite: feeds a captured sequence of
//! command/response APDU pairs through a chosen scheme kernel and prints the
//! resulting outcome. Not a certification test tool - just a way to drive
//! the state machine against a fixed script without real hardware.

// Linting Rules
#![warn(
	clippy::complexity,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::clone_on_ref_ptr,
	clippy::dbg_macro,
	clippy::filetype_is_file,
	clippy::if_then_some_else_none,
	clippy::self_named_module_files,
	clippy::undocumented_unsafe_blocks
)]
#![allow(
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::similar_names,
	clippy::struct_excessive_bools,
	clippy::too_many_arguments,
	clippy::too_many_lines
)]

// Modules
mod cli;

// Uses
use std::{
	fs,
	io::Write as _,
	process::ExitCode,
	time::{SystemTime, UNIX_EPOCH},
};

use ctls_kernel::{
	capabilities::{CaKeyStore, CaPublicKey, Clock, CommsError, IssuerScriptAuthenticator, OdaResult, OdaVerifier, Rng, ScriptAuthResult, Transceiver},
	config::{apply_cli_arguments, Config},
	entry_point::{dispatch_kernel, KernelFamily},
	error::ParseError,
	kernel::{generic::GenericKernel, mastercard::MastercardKernel, visa::VisaKernel, Kernel, KernelServices, TransactionParameters},
	outcome::KernelOutcome,
	output_colours::header_colour_spec,
	transaction::Transaction,
	util::parse_hex_str,
};
use termcolor::{ColorChoice, StandardStream, WriteColor};

use crate::cli::build_cli;

/// Replays a fixed script of command/response pairs read from a trace file,
/// ignoring whatever bytes the kernel actually sends - a trace is a
/// recording, not a live card.
struct ScriptReplayTransceiver {
	responses: Vec<Vec<u8>>,
	cursor: usize,
}

impl ScriptReplayTransceiver {
	fn from_trace(contents: &str) -> Result<Self, ParseError> {
		let mut responses = Vec::new();
		for line in contents.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			let mut parts = line.split_whitespace();
			let _command_hex = parts.next();
			let response_hex = parts.next().ok_or(ParseError::NonCompliant)?;
			responses.push(parse_hex_str(response_hex)?);
		}
		Ok(Self { responses, cursor: 0 })
	}
}

impl Transceiver for ScriptReplayTransceiver {
	fn transceive(&mut self, _command_bytes: &[u8]) -> Result<Vec<u8>, CommsError> {
		let response = self
			.responses
			.get(self.cursor)
			.cloned()
			.ok_or_else(|| CommsError::Other("trace exhausted before the kernel finished".to_owned()))?;
		self.cursor += 1;
		Ok(response)
	}
}

/// Always reports success for every ODA method: a trace replay has no real
/// certificates to check against, so offline data authentication is assumed
/// to have already happened when the trace was captured.
struct AlwaysSucceedsOda;

impl OdaVerifier for AlwaysSucceedsOda {
	fn perform_sda(&mut self, _: &[u8], _: &[u8], _: &[u8], _: &[u8]) -> OdaResult {
		OdaResult::Success("sda")
	}

	fn perform_dda(&mut self, _: &[u8], _: &[u8], _: &[u8], _: &[u8], _: &[u8]) -> OdaResult {
		OdaResult::Success("dda")
	}

	fn perform_fdda(&mut self, _: &[u8], _: &[u8], _: &[u8], _: &[u8], _: &[u8]) -> OdaResult {
		OdaResult::Success("fdda")
	}

	fn perform_cda(&mut self, _: &[u8], _: &[u8], _: &[u8], _: &[u8], _: &[u8], _: &[u8]) -> OdaResult {
		OdaResult::Success("cda")
	}
}

/// A CA key store with nothing registered; trace replay never needs a real
/// key lookup since [`AlwaysSucceedsOda`] short-circuits verification.
struct EmptyCaKeyStore;

impl CaKeyStore for EmptyCaKeyStore {
	fn lookup(&self, _rid: &[u8], _index: u8) -> Option<CaPublicKey> {
		None
	}
}

struct AlwaysSucceedsScriptAuthenticator;

impl IssuerScriptAuthenticator for AlwaysSucceedsScriptAuthenticator {
	fn validate(&mut self, _arpc: &[u8], _arc: &[u8], _session_key_inputs: &[u8]) -> ScriptAuthResult {
		ScriptAuthResult::Success
	}
}

/// Fills every buffer with zero bytes, so a replayed trace is reproducible:
/// random online selection and unpredictable-number generation always draw
/// the same value.
struct ZeroRng;

impl Rng for ZeroRng {
	fn fill_random(&mut self, buf: &mut [u8]) {
		buf.fill(0);
	}
}

struct SystemClock;

impl Clock for SystemClock {
	fn now_millis(&self) -> u64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|duration| duration.as_millis() as u64)
			.unwrap_or(0)
	}
}

fn main() -> ExitCode {
	env_logger::init();
	let matches = build_cli().get_matches();

	let config: Config = match Config::try_from(apply_cli_arguments(Config::figment(), &matches)) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("Configuration error: {err}");
			return ExitCode::FAILURE;
		}
	};

	let colour_choice: ColorChoice = config.cli_colour.change_based_on_tty().into();
	let mut stdout = StandardStream::stdout(colour_choice);

	match run(&matches, &config) {
		Ok(outcome) => {
			print_outcome(&mut stdout, &outcome);
			match outcome {
				KernelOutcome::Approved(_) | KernelOutcome::OnlineRequest(_) => ExitCode::SUCCESS,
				_ => ExitCode::FAILURE,
			}
		}
		Err(message) => {
			eprintln!("{message}");
			ExitCode::FAILURE
		}
	}
}

fn run(matches: &clap::ArgMatches, config: &Config) -> Result<KernelOutcome, String> {
	let trace_path = matches.get_one::<String>("trace").expect("required by clap");
	let trace = fs::read_to_string(trace_path).map_err(|err| format!("couldn't read trace file: {err}"))?;
	let mut transceiver = ScriptReplayTransceiver::from_trace(&trace).map_err(|err| format!("malformed trace file: {err}"))?;

	let aid_hex = matches.get_one::<String>("aid").expect("required by clap");
	let aid = parse_hex_str(aid_hex).map_err(|err| format!("invalid AID: {err}"))?;

	let scheme = matches.get_one::<String>("scheme").map(String::as_str).unwrap_or("generic");
	let family = match scheme {
		"visa" => KernelFamily::Visa,
		"mastercard" => KernelFamily::Mastercard,
		_ => dispatch_kernel(&aid).unwrap_or(KernelFamily::Visa),
	};

	let amount_authorized = *matches.get_one::<u64>("amount").unwrap_or(&0);
	let profile = config
		.terminal
		.to_terminal_profile()
		.map_err(|err| format!("invalid terminal configuration: {err}"))?;
	let params = TransactionParameters {
		amount_authorized,
		amount_other: 0,
		transaction_type: 0x00,
		transaction_date_bcd: [0x26, 0x07, 0x31],
		unpredictable_number: [0xDE, 0xAD, 0xBE, 0xEF],
	};

	let mut transaction = Transaction::new();
	let mut oda_verifier = AlwaysSucceedsOda;
	let ca_key_store = EmptyCaKeyStore;
	let mut script_authenticator = AlwaysSucceedsScriptAuthenticator;
	let mut rng = ZeroRng;
	let clock = SystemClock;

	let mut services = KernelServices {
		transceiver: &mut transceiver,
		oda_verifier: &mut oda_verifier,
		ca_key_store: &ca_key_store,
		script_authenticator: &mut script_authenticator,
		rng: &mut rng,
		clock: &clock,
	};

	let mut kernel: Box<dyn Kernel> = match family {
		KernelFamily::Visa => Box::new(VisaKernel::new(aid)),
		KernelFamily::Mastercard => Box::new(MastercardKernel::new(aid)),
		KernelFamily::Amex | KernelFamily::Discover | KernelFamily::Jcb | KernelFamily::UnionPay => Box::new(GenericKernel::new(aid)),
	};

	Ok(kernel.process_transaction(&mut transaction, &profile, &params, &mut services))
}

fn print_outcome(stdout: &mut StandardStream, outcome: &KernelOutcome) {
	let _ = stdout.set_color(&header_colour_spec());
	let _ = write!(stdout, "Outcome: ");
	let _ = stdout.reset();

	match outcome {
		KernelOutcome::Approved(data) => {
			println!("approved offline");
			println!("  PAN: {}", data.masked_pan());
			println!("  Cryptogram: {}", data.application_cryptogram.to_hex());
		}
		KernelOutcome::OnlineRequest(data) => {
			println!("online request");
			println!("  PAN: {}", data.masked_pan());
			println!("  Cryptogram: {}", data.application_cryptogram.to_hex());
		}
		KernelOutcome::Declined(reason, data) => {
			println!("declined ({reason:?})");
			if let Some(data) = data {
				println!("  PAN: {}", data.masked_pan());
			}
		}
		KernelOutcome::TryAnotherInterface(reason) => println!("try another interface ({reason:?})"),
		KernelOutcome::EndApplication(err) => println!("ended on error: {err}"),
	}
}
