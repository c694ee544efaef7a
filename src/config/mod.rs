// Modules
pub mod colour_choice;

// Uses
use clap::ArgMatches;
use figment::{
	providers::{Env, Format, Serialized, Toml},
	value::{Dict, Map},
	Error as FigmentError,
	Figment,
	Metadata,
	Profile,
	Provider,
};
use serde_derive::{Deserialize, Serialize};

use self::colour_choice::ColourChoice;
use crate::{
	durability::ReversalQueueConfig,
	emv::{AdditionalTerminalCapabilities, TerminalCapabilities},
	kernel::TerminalProfile,
	tac::TerminalActionCodes,
};

// Constants
const FILE_NAME: &str = "ctls-kernel.toml";
/// Concatenated with the variable names below.
const ENV_PREFIX: &str = "CTLS_KERNEL_";
// TODO: Test this
const ENV_FILE_NAME_OVERRIDE: &str = "CONFIG";
const ENV_PROFILE: &str = "PROFILE";

/// The terminal-side parameters a kernel needs, as carried through the
/// configuration layer - a serialisable mirror of [`TerminalProfile`]'s
/// fields, since that type itself isn't `Deserialize` (it's constructed
/// fresh per transaction from whatever the embedder's config stack produces).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TerminalConfig {
	pub terminal_country_code: [u8; 2],
	pub transaction_currency_code: [u8; 2],
	pub merchant_category_code: [u8; 2],
	pub terminal_capabilities: [u8; 3],
	pub additional_terminal_capabilities: [u8; 5],
	pub floor_limit: u64,
	pub contactless_cvm_limit: u64,
	pub random_online_threshold: u64,
	pub terminal_id: Vec<u8>,
}

impl Default for TerminalConfig {
	fn default() -> Self {
		Self {
			terminal_country_code: [0x08, 0x40],
			transaction_currency_code: [0x08, 0x40],
			merchant_category_code: [0x00, 0x00],
			terminal_capabilities: [0x00; 3],
			additional_terminal_capabilities: [0x00; 5],
			floor_limit: 0,
			contactless_cvm_limit: 0,
			random_online_threshold: 0,
			terminal_id: Vec::new(),
		}
	}
}

impl TerminalConfig {
	/// Builds the [`TerminalProfile`] a kernel actually consumes, parsing the
	/// raw capability bytes this config stores and falling back to all-ones
	/// Terminal Action Codes (the EMV-specified default, same as the IAC
	/// defaults) when none are configured.
	///
	/// # Errors
	/// Returns [`crate::error::ParseError`] if `terminal_capabilities` or
	/// `additional_terminal_capabilities` aren't valid bitmask bytes.
	pub fn to_terminal_profile(&self) -> Result<TerminalProfile, crate::error::ParseError> {
		Ok(TerminalProfile {
			terminal_country_code: self.terminal_country_code,
			transaction_currency_code: self.transaction_currency_code,
			merchant_category_code: self.merchant_category_code,
			terminal_capabilities: TerminalCapabilities::try_from(self.terminal_capabilities.as_slice())?,
			additional_terminal_capabilities: AdditionalTerminalCapabilities::try_from(
				self.additional_terminal_capabilities.as_slice(),
			)?,
			tac: TerminalActionCodes::default(),
			floor_limit: self.floor_limit,
			contactless_cvm_limit: self.contactless_cvm_limit,
			random_online_threshold: self.random_online_threshold,
			terminal_id: self.terminal_id.clone(),
		})
	}
}

/// The app configuration.
#[non_exhaustive]
#[derive(Deserialize, Serialize)]
pub struct Config {
	#[serde(skip)]
	pub profile: Profile,
	pub cli_colour: ColourChoice,
	pub masking_characters: Vec<char>,
	pub terminal: TerminalConfig,
	pub reversal_queue: ReversalQueueConfig,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			profile: Self::DEFAULT_PROFILE,
			cli_colour: ColourChoice::default(),
			masking_characters: vec!['*'],
			terminal: TerminalConfig::default(),
			reversal_queue: ReversalQueueConfig::default(),
		}
	}
}

impl Config {
	// Constants
	pub const DEFAULT_PROFILE: Profile = Profile::const_new("default");
	// Key Names
	pub const PROFILE: &'static str = "profile";
	pub const CLI_COLOUR: &'static str = "cli_colour";
	pub const MASKING_CHARACTERS: &'static str = "masking_characters";
	pub const TERMINAL: &'static str = "terminal";
	pub const REVERSAL_QUEUE: &'static str = "reversal_queue";

	/// Allows the configuration to be extracted from any [`Provider`].
	///
	/// The reason this isn't a [`TryFrom`] implementation is because it
	/// conflicts with a default implementation provided by Rust.
	pub fn try_from<P>(provider: P) -> Result<Config, FigmentError>
	where
		P: Provider,
	{
		Figment::from(provider).extract()
	}

	/// Provides a default provider.
	pub fn figment() -> Figment {
		Figment::from(Serialized::defaults(Config::default()))
			.merge(
				Toml::file(Env::var_or(
					format!("{}{}", ENV_PREFIX, ENV_FILE_NAME_OVERRIDE).as_str(),
					FILE_NAME,
				))
				.nested(),
			)
			.merge(
				Env::prefixed(ENV_PREFIX)
					.ignore(&[ENV_FILE_NAME_OVERRIDE, ENV_PROFILE])
					.global(),
			)
			.select(Profile::from_env_or(
				format!("{}{}", ENV_PREFIX, ENV_PROFILE).as_str(),
				Self::DEFAULT_PROFILE,
			))
	}
}

impl Provider for Config {
	fn metadata(&self) -> Metadata {
		Metadata::named("App Config")
	}

	fn data(&self) -> Result<Map<Profile, Dict>, FigmentError> {
		Serialized::defaults(self).data()
	}

	fn profile(&self) -> Option<Profile> {
		Some(self.profile.clone())
	}
}

/// Applies values provided via CLI to the `figment`, overriding anything from
/// the configuration or environment variables.
///
/// This effectively sets up the following hierarchy: CLI arguments ->
/// environment variables -> configuration file
pub fn apply_cli_arguments(mut figment: Figment, matches: &ArgMatches) -> Figment {
	// CLI Colour Choice
	if let Some(colour_choice) = matches.get_one::<String>("colour") {
		if colour_choice != "from_config" {
			figment = figment.merge((
				Config::CLI_COLOUR,
				TryInto::<ColourChoice>::try_into(colour_choice.as_str())
					.expect("this value's validity is enforced by clap"),
			));
		}
	}

	if let Some(floor_limit) = matches.get_one::<u64>("floor-limit") {
		figment = figment.merge((format!("{}.floor_limit", Config::TERMINAL), *floor_limit));
	}
	if let Some(cvm_limit) = matches.get_one::<u64>("cvm-limit") {
		figment = figment.merge((format!("{}.contactless_cvm_limit", Config::TERMINAL), *cvm_limit));
	}

	figment
}
