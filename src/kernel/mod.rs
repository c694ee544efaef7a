//! The shared kernel contract and the stage-by-stage mechanics every scheme
//! kernel drives through, per §4.4: GPO, READ RECORD, ODA, restrictions,
//! CVM, risk management, terminal action analysis and GENERATE AC.
//!
//! Each scheme module ([`visa`], [`mastercard`], [`generic`]) supplies its
//! own [`Kernel`] impl that calls into the helpers here, varying only the
//! points §4.5 calls out as scheme-specific (ODA method choice, RRP,
//! second GENERATE AC, mag-stripe CVC3).

pub mod generic;
pub mod mastercard;
pub mod visa;

use crate::{
	apdu::{transceive_with_chaining, CommandApdu},
	capabilities::{CaKeyStore, Clock, CommsError, IssuerScriptAuthenticator, OdaVerifier, Rng, Transceiver},
	data_store::DataStore,
	dol::Dol,
	emv::{
		bitflag_values::BitflagValue,
		AdditionalTerminalCapabilities,
		ApplicationUsageControl,
		CardholderVerificationMethodList,
		CardholderVerificationMethodResults,
		CardholderVerificationRule,
		CvMethod,
		CvmCondition,
		CvmResult,
		IssuerActionCodeDefault,
		IssuerActionCodeDenial,
		IssuerActionCodeOnline,
		TerminalCapabilities,
		TerminalVerificationResults,
	},
	error::KernelError,
	outcome::{AuthorizationData, DeclineReason, KernelOutcome, TransactionMode},
	sensitive::{Cryptogram, Pan},
	tac::TerminalActionCodes,
	transaction::Transaction,
};

// Well-known EMV tags used directly by the shared kernel mechanics.
pub const TAG_AIP: [u8; 1] = [0x82];
pub const TAG_AFL: [u8; 1] = [0x94];
pub const TAG_PAN: [u8; 1] = [0x5A];
pub const TAG_TRACK2_EQUIVALENT: [u8; 1] = [0x57];
pub const TAG_CID: [u8; 2] = [0x9F, 0x27];
pub const TAG_ATC: [u8; 2] = [0x9F, 0x36];
pub const TAG_IAD: [u8; 2] = [0x9F, 0x10];
pub const TAG_TVR: [u8; 1] = [0x95];
pub const TAG_TSI: [u8; 1] = [0x9B];
pub const TAG_AC: [u8; 2] = [0x9F, 0x26];
pub const TAG_CDOL1: [u8; 1] = [0x8C];
pub const TAG_CDOL2: [u8; 1] = [0x8D];
pub const TAG_PDOL: [u8; 2] = [0x9F, 0x38];
pub const TAG_IAC_DEFAULT: [u8; 2] = [0x9F, 0x0D];
pub const TAG_IAC_ONLINE: [u8; 2] = [0x9F, 0x0E];
pub const TAG_IAC_DENIAL: [u8; 2] = [0x9F, 0x0F];

/// Terminal-side configuration a kernel needs to build DOLs and make risk
/// decisions. Deliberately separate from [`crate::config::Config`] (the
/// CLI-facing, figment-layered configuration) so the kernel stays testable
/// without pulling in the config stack - an embedder maps its own `Config`
/// into one of these once at startup.
#[derive(Clone, Debug)]
pub struct TerminalProfile {
	pub terminal_country_code: [u8; 2],
	pub transaction_currency_code: [u8; 2],
	pub merchant_category_code: [u8; 2],
	pub terminal_capabilities: TerminalCapabilities,
	pub additional_terminal_capabilities: AdditionalTerminalCapabilities,
	pub tac: TerminalActionCodes,
	pub floor_limit: u64,
	pub contactless_cvm_limit: u64,
	pub random_online_threshold: u64,
	pub terminal_id: Vec<u8>,
}

/// The capability bundle a kernel reaches for during `process_transaction`,
/// grouped so scheme modules don't each thread five separate parameters.
pub struct KernelServices<'a> {
	pub transceiver: &'a mut dyn Transceiver,
	pub oda_verifier: &'a mut dyn OdaVerifier,
	pub ca_key_store: &'a dyn CaKeyStore,
	pub script_authenticator: &'a mut dyn IssuerScriptAuthenticator,
	pub rng: &'a mut dyn Rng,
	pub clock: &'a dyn Clock,
}

/// The transaction-specific parameters supplied by the POS application at
/// the start of processing.
#[derive(Clone, Debug)]
pub struct TransactionParameters {
	pub amount_authorized: u64,
	pub amount_other: u64,
	pub transaction_type: u8,
	pub transaction_date_bcd: [u8; 3],
	pub unpredictable_number: [u8; 4],
}

/// The shared entry point every scheme kernel implements. `process_online_response`
/// is only meaningful for kernels that support a second GENERATE AC
/// (Mastercard); others can leave the default no-op.
pub trait Kernel {
	/// Drives the full offline portion of a transaction: GPO through
	/// GENERATE AC.
	fn process_transaction(
		&mut self,
		transaction: &mut Transaction,
		profile: &TerminalProfile,
		params: &TransactionParameters,
		services: &mut KernelServices,
	) -> KernelOutcome;
}

fn capability_error(err: &CommsError) -> KernelError {
	KernelError::CapabilityError {
		which: "Transceiver",
		detail: err.to_string(),
	}
}

/// Sends `command` via `services.transceiver`, transparently following
/// `0x61xx` GET RESPONSE chaining.
///
/// # Errors
/// Returns [`KernelError::CapabilityError`] on a transport failure, or
/// [`KernelError::UnexpectedSw`] if the final status word isn't success or
/// warning class.
pub fn exchange(command: &CommandApdu, transceiver: &mut dyn Transceiver) -> Result<crate::apdu::ResponseApdu, KernelError> {
	log::debug!("-> CLA {:02X} INS {:02X} P1 {:02X} P2 {:02X}", command.cla, command.ins, command.p1, command.p2);
	let response = transceive_with_chaining(command, |bytes| {
		transceiver.transceive(bytes).map_err(|err| capability_error(&err))
	})?;
	log::debug!("<- SW {:04X} ({} data bytes)", response.sw, response.data.len());
	Ok(response)
}

/// Populates the terminal data store with the standard tags every DOL
/// (PDOL/CDOL) is likely to reference, per §4.2's DOL assembly rules.
pub fn populate_terminal_store(
	store: &mut DataStore,
	profile: &TerminalProfile,
	params: &TransactionParameters,
	tvr: &TerminalVerificationResults,
) {
	store.set(&[0x9F, 0x02], amount_to_bcd(params.amount_authorized, 12));
	store.set(&[0x9F, 0x03], amount_to_bcd(params.amount_other, 12));
	store.set(&[0x9F, 0x1A], profile.terminal_country_code.to_vec());
	store.set(&[0x5F, 0x2A], profile.transaction_currency_code.to_vec());
	store.set(&[0x9A], params.transaction_date_bcd.to_vec());
	store.set(&[0x9C], vec![params.transaction_type]);
	store.set(&[0x9F, 0x37], params.unpredictable_number.to_vec());
	store.set(&[0x9F, 0x33], profile.terminal_capabilities.to_bytes());
	store.set(&[0x9F, 0x40], profile.additional_terminal_capabilities.to_bytes());
	store.set(&[0x9F, 0x15], profile.merchant_category_code.to_vec());
	store.set(&TAG_TVR, tvr.to_bytes());
	if !profile.terminal_id.is_empty() {
		store.set(&[0x9F, 0x1C], profile.terminal_id.clone());
	}
}

/// BCD-encodes `value` into `num_digits` decimal digits (padded with leading
/// zeroes), the wire format used by amount tags like `0x9F02`.
#[must_use]
pub fn amount_to_bcd(value: u64, num_digits: usize) -> Vec<u8> {
	let digits = format!("{value:0width$}", width = num_digits);
	crate::util::digit_string_to_bcd_bytes(&digits)
		.expect("a decimal-formatted amount string is always valid BCD input")
}

/// Issues GET PROCESSING OPTIONS with `pdol_data` as the command data,
/// returning the parsed response: AIP plus the AFL entries, both ingested
/// into `card_store`.
///
/// # Errors
/// Returns [`KernelError`] on a transport failure or malformed response.
pub fn get_processing_options(
	pdol_data: Vec<u8>,
	services: &mut KernelServices,
	card_store: &mut DataStore,
) -> Result<(), KernelError> {
	let mut data = vec![0x83, pdol_data.len() as u8];
	data.extend(pdol_data);
	let command = CommandApdu::new(0x80, 0xA8, 0x00, 0x00).with_data(data).with_le(0);
	let response = exchange(&command, services.transceiver)?;

	if response.data.first() == Some(&0x80) {
		// Format 1: primitive template, AIP(2) || AFL(rest).
		if response.data.len() < 4 {
			return Err(KernelError::MissingMandatoryData { tag: 0x82 });
		}
		let payload = &response.data[2..];
		card_store.set(&TAG_AIP, payload[0..2].to_vec());
		card_store.set(&TAG_AFL, payload[2..].to_vec());
	} else {
		// Format 2: constructed 0x77 template, tag-value pairs.
		let block = crate::emv::ber_tlv::parse(&response.data)?;
		card_store.ingest_block(&block);
	}

	if card_store.get(&TAG_AIP).is_none() {
		return Err(KernelError::MissingMandatoryData { tag: 0x82 });
	}
	Ok(())
}

/// Issues READ RECORD for every entry in `afl`, ingesting each returned
/// record's primitive tags into `card_store`.
///
/// # Errors
/// Returns [`KernelError`] on a transport failure, a non-success status
/// word, or a malformed record.
pub fn read_records(
	afl: &[u8],
	services: &mut KernelServices,
	card_store: &mut DataStore,
) -> Result<(), KernelError> {
	for entry in afl.chunks(4) {
		if entry.len() < 4 {
			return Err(KernelError::MalformedTlv(crate::error::ParseError::Unsupported));
		}
		let sfi = entry[0] >> 3;
		let start_record = entry[1];
		let end_record = entry[2];

		for record_number in start_record..=end_record {
			let p2 = (sfi << 3) | 0x04;
			let command = CommandApdu::new(0x00, 0xB2, record_number, p2).with_le(0);
			let response = exchange(&command, services.transceiver)?;
			let block = crate::emv::ber_tlv::parse(&response.data)?;
			card_store.ingest_block(&block);
		}
	}
	Ok(())
}

/// The terminal action analysis decision, per EMV Book 4 §6.3.6: the card's
/// Issuer Action Codes are OR'd with the terminal's Terminal Action Codes
/// before being AND'd against the TVR.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaaDecision {
	ApproveOffline,
	RequestOnline,
	DeclineOffline,
}

fn or_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
	a.iter().zip(b.iter()).map(|(x, y)| x | y).collect()
}

fn any_bit_set(tvr: &[u8], action_code: &[u8]) -> bool {
	tvr.iter().zip(action_code.iter()).any(|(t, a)| t & a != 0)
}

/// Reads the card's Issuer Action Codes from `card_store`, falling back to
/// the EMV-specified defaults (all-ones for Default/Online, all-zeroes for
/// Denial) when the card omits them.
#[must_use]
pub fn card_action_codes(card_store: &DataStore) -> (IssuerActionCodeDefault, IssuerActionCodeOnline, IssuerActionCodeDenial) {
	let default = card_store
		.get(&TAG_IAC_DEFAULT)
		.and_then(|bytes| IssuerActionCodeDefault::try_from(bytes).ok())
		.unwrap_or_default();
	let online = card_store
		.get(&TAG_IAC_ONLINE)
		.and_then(|bytes| IssuerActionCodeOnline::try_from(bytes).ok())
		.unwrap_or_default();
	let denial = card_store
		.get(&TAG_IAC_DENIAL)
		.and_then(|bytes| IssuerActionCodeDenial::try_from(bytes).ok())
		.unwrap_or_default();
	(default, online, denial)
}

fn to_array(bytes: Vec<u8>) -> [u8; 5] {
	bytes.try_into().expect("TVR-shaped values are always 5 bytes")
}

/// Runs terminal action analysis against `tvr`, using
/// [`TerminalVerificationResults::matches_action_code`] for the
/// OR-then-AND bit matching rule.
#[must_use]
pub fn terminal_action_analysis(
	tvr: &TerminalVerificationResults,
	tac: &TerminalActionCodes,
	iac_default: &IssuerActionCodeDefault,
	iac_online: &IssuerActionCodeOnline,
	iac_denial: &IssuerActionCodeDenial,
) -> TaaDecision {
	if tvr.matches_action_code(&to_array(iac_denial.tvr.to_bytes()), &to_array(tac.denial.tvr.to_bytes())) {
		return TaaDecision::DeclineOffline;
	}

	if tvr.matches_action_code(&to_array(iac_online.tvr.to_bytes()), &to_array(tac.online.tvr.to_bytes())) {
		return TaaDecision::RequestOnline;
	}

	// The terminal is assumed always online-capable; per EMV Book 4 §6.3.6
	// the Default action codes only gate behaviour for offline-only
	// terminals, so a Default match here also routes online rather than
	// declining.
	if tvr.matches_action_code(&to_array(iac_default.tvr.to_bytes()), &to_array(tac.default.tvr.to_bytes())) {
		return TaaDecision::RequestOnline;
	}

	TaaDecision::ApproveOffline
}

/// The cryptogram type requested via GENERATE AC's P1 byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CryptogramRequest {
	Aac,
	Tc,
	Arqc,
}

impl CryptogramRequest {
	#[must_use]
	pub fn p1(self, cda_requested: bool) -> u8 {
		let base = match self {
			Self::Aac => 0b0000_0000,
			Self::Tc => 0b0100_0000,
			Self::Arqc => 0b1000_0000,
		};
		if cda_requested {
			base | 0b0001_0000
		} else {
			base
		}
	}
}

/// Issues GENERATE AC with `cdol_data`, requesting `request`.
///
/// # Errors
/// Returns [`KernelError`] on a transport failure or malformed response.
pub fn generate_ac(
	request: CryptogramRequest,
	cda_requested: bool,
	cdol_data: Vec<u8>,
	services: &mut KernelServices,
) -> Result<DataStore, KernelError> {
	let mut data = vec![0x83, cdol_data.len() as u8];
	data.extend(cdol_data);
	let command = CommandApdu::new(0x80, 0xAE, request.p1(cda_requested), 0x00)
		.with_data(data)
		.with_le(0);
	let response = exchange(&command, services.transceiver)?;
	let mut store = DataStore::new();
	if response.data.first() == Some(&0x80) {
		if response.data.len() < 2 {
			return Err(KernelError::MissingMandatoryData { tag: 0x9F27 });
		}
		let payload = &response.data[2..];
		if payload.len() < 3 {
			return Err(KernelError::MissingMandatoryData { tag: 0x9F27 });
		}
		store.set(&TAG_CID, payload[0..1].to_vec());
		store.set(&TAG_ATC, payload[1..3].to_vec());
		store.set(&TAG_AC, payload[3..].to_vec());
	} else {
		let block = crate::emv::ber_tlv::parse(&response.data)?;
		store.ingest_block(&block);
	}
	Ok(store)
}

/// Assembles the caller-facing [`AuthorizationData`] from the terminal and
/// card stores plus the freshly-generated cryptogram.
///
/// # Errors
/// Returns [`KernelError::MissingMandatoryData`] if a mandatory tag is
/// absent from either store.
pub fn build_authorization_data(
	terminal_store: &DataStore,
	card_store: &DataStore,
	ac_store: &DataStore,
	profile: &TerminalProfile,
	params: &TransactionParameters,
	aid: Vec<u8>,
	transaction_mode: TransactionMode,
) -> Result<AuthorizationData, KernelError> {
	let pan_bytes = card_store
		.get(&TAG_PAN)
		.ok_or(KernelError::MissingMandatoryData { tag: 0x5A })?;
	let pan = Pan::new(crate::util::bcd_bytes_to_digit_string(pan_bytes)?);

	let cryptogram_bytes = ac_store
		.get(&TAG_AC)
		.ok_or(KernelError::MissingMandatoryData { tag: 0x9F26 })?;
	let cid = ac_store
		.get(&TAG_CID)
		.and_then(|bytes| bytes.first().copied())
		.ok_or(KernelError::MissingMandatoryData { tag: 0x9F27 })?;
	let atc = ac_store
		.get(&TAG_ATC)
		.filter(|bytes| bytes.len() == 2)
		.map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
		.ok_or(KernelError::MissingMandatoryData { tag: 0x9F36 })?;

	let tvr_bytes = terminal_store
		.get(&TAG_TVR)
		.ok_or(KernelError::MissingMandatoryData { tag: 0x95 })?;
	let tvr = TerminalVerificationResults::try_from(tvr_bytes)?;

	let aip_bytes = card_store
		.get(&TAG_AIP)
		.ok_or(KernelError::MissingMandatoryData { tag: 0x82 })?;

	Ok(AuthorizationData {
		pan,
		pan_sequence_number: card_store.get(&[0x5F, 0x34]).and_then(|bytes| bytes.first().copied()),
		expiry_yymm: card_store
			.get(&[0x5F, 0x24])
			.filter(|bytes| bytes.len() >= 2)
			.map(|bytes| (bytes[0], bytes[1])),
		track2_equivalent: card_store
			.get(&TAG_TRACK2_EQUIVALENT)
			.map(|bytes| crate::sensitive::Track2Equivalent::new(bytes.to_vec())),
		application_cryptogram: Cryptogram::new(cryptogram_bytes.to_vec()),
		cryptogram_information_data: cid,
		atc,
		issuer_application_data: card_store.get(&TAG_IAD).map(<[u8]>::to_vec).unwrap_or_default(),
		tvr,
		cvm_results: card_store
			.get(&[0x9F, 0x34])
			.and_then(|bytes| crate::emv::CardholderVerificationMethodResults::try_from(bytes).ok()),
		amount_authorized: params.amount_authorized,
		amount_other: params.amount_other,
		terminal_country_code: profile.terminal_country_code,
		currency_code: profile.transaction_currency_code,
		transaction_date_bcd: params.transaction_date_bcd,
		transaction_type: params.transaction_type,
		unpredictable_number: params.unpredictable_number,
		aip: [aip_bytes[0], aip_bytes[1]],
		aid,
		cardholder_name: card_store
			.get(&[0x5F, 0x20])
			.map(|bytes| String::from_utf8_lossy(bytes).trim().to_owned()),
		transaction_mode,
	})
}

/// Classifies a GENERATE AC response's CID top two bits into the outcome
/// the terminal must act on, per EMV Book 3 §10.3.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CryptogramType {
	Aac,
	Tc,
	Arqc,
}

#[must_use]
pub fn classify_cid(cid: u8) -> CryptogramType {
	match cid & 0b1100_0000 {
		0b1000_0000 => CryptogramType::Arqc,
		0b0100_0000 => CryptogramType::Tc,
		_ => CryptogramType::Aac,
	}
}

/// Decides whether the risk-management "go online anyway" random selection
/// fires, using `services.rng` for the draw, per EMV Book 3's Terminal Risk
/// Management random transaction selection.
#[must_use]
pub fn random_transaction_selection(profile: &TerminalProfile, amount_authorized: u64, rng: &mut dyn Rng) -> bool {
	if profile.random_online_threshold == 0 || amount_authorized >= profile.floor_limit {
		return amount_authorized >= profile.floor_limit;
	}
	let mut buf = [0u8; 1];
	rng.fill_random(&mut buf);
	let draw = u64::from(buf[0]);
	draw * profile.floor_limit.max(1) < profile.random_online_threshold * 256
}

/// Builds the declined-outcome helper shared by every scheme kernel.
#[must_use]
pub fn decline_outcome(reason: DeclineReason, authorization_data: Option<AuthorizationData>) -> KernelOutcome {
	KernelOutcome::Declined(reason, authorization_data)
}

/// Pulls `tag`'s DOL definition out of `card_store`, returning an empty DOL
/// (hence a zero-length command data field) if the card doesn't carry one -
/// valid for schemes whose CDOL2 is optional.
#[must_use]
pub fn dol_from_store(card_store: &DataStore, tag: &[u8]) -> Dol {
	card_store
		.get(tag)
		.and_then(|bytes| Dol::parse(bytes).ok())
		.unwrap_or_else(|| Dol { entries: Vec::new() })
}

/// The outcome of classifying the first GENERATE AC's returned CID, per EMV
/// Book 3 §10.3: a card may downgrade an ARQC/TC request to AAC, or force a
/// TC approval despite a terminal decision to go online or decline.
#[derive(Clone, Debug)]
pub enum FirstAcOutcome {
	Approved,
	OnlineRequest,
	Declined(DeclineReason),
}

/// Maps a terminal action analysis decision onto the cryptogram type
/// requested at the first GENERATE AC.
#[must_use]
pub fn requested_cryptogram(taa: TaaDecision) -> CryptogramRequest {
	match taa {
		TaaDecision::ApproveOffline => CryptogramRequest::Tc,
		TaaDecision::RequestOnline => CryptogramRequest::Arqc,
		TaaDecision::DeclineOffline => CryptogramRequest::Aac,
	}
}

/// Classifies the first GENERATE AC's CID against the terminal's own action
/// analysis decision: the card has final say, so an AAC response is routed
/// to [`DeclineReason::ActionAnalysisDenial`] when the terminal itself had
/// decided to decline, or [`DeclineReason::CardDeclinedOffline`] when the
/// card declined a transaction the terminal would otherwise have approved or
/// sent online.
#[must_use]
pub fn classify_first_ac(taa: TaaDecision, cid: u8) -> FirstAcOutcome {
	match classify_cid(cid) {
		CryptogramType::Tc => FirstAcOutcome::Approved,
		CryptogramType::Arqc => FirstAcOutcome::OnlineRequest,
		CryptogramType::Aac => FirstAcOutcome::Declined(match taa {
			TaaDecision::DeclineOffline => DeclineReason::ActionAnalysisDenial,
			TaaDecision::ApproveOffline | TaaDecision::RequestOnline => DeclineReason::CardDeclinedOffline,
		}),
	}
}

/// Derives the current full year from the terminal's own transaction date
/// (`9A`, packed BCD `YYMMDD`), for use as the sliding-window pivot when
/// decoding the card's expiry/effective dates. Assumes the 2000s century,
/// consistent with every other YY-only EMV date tag.
///
/// # Errors
/// Returns [`KernelError::MalformedTlv`] if the transaction date's year
/// nibbles aren't valid BCD digits.
pub fn transaction_current_year(params: &TransactionParameters) -> Result<u16, KernelError> {
	let digits = crate::util::bcd_bytes_to_digit_string(&params.transaction_date_bcd[0..1])?;
	Ok(2000 + digits.parse::<u16>().expect("two BCD digits always parse as a u16"))
}

/// Checks the card's expiry (`5F24`) and, if present, effective (`5F25`)
/// dates against the terminal's transaction date, setting the corresponding
/// [`TerminalVerificationResults`] bits. Per §4.4's RESTRICTIONS step, an
/// expired or not-yet-effective application doesn't itself abort the
/// transaction - it's left to terminal action analysis to decide whether the
/// resulting TVR bit forces the transaction online or offline-declined.
///
/// # Errors
/// Returns [`KernelError::MalformedTlv`] if a present date tag isn't valid
/// packed BCD.
pub fn check_application_dates(
	card_store: &DataStore,
	params: &TransactionParameters,
	tvr: &mut TerminalVerificationResults,
) -> Result<(), KernelError> {
	let current_year = transaction_current_year(params)?;
	let current_month: u8 = crate::util::bcd_bytes_to_digit_string(&params.transaction_date_bcd[1..2])?
		.parse()
		.expect("two BCD digits always parse as a u8");

	if let Some(bytes) = card_store.get(&[0x5F, 0x24]).filter(|b| b.len() >= 2) {
		let padded = [bytes[0], bytes[1], bytes.get(2).copied().unwrap_or(0x01)];
		let (year, month, _day) = crate::util::decode_bcd_date_sliding_window(&padded, current_year)?;
		if (year, month) < (current_year, current_month) {
			tvr.expired_application = true;
		}
	}
	if let Some(bytes) = card_store.get(&[0x5F, 0x25]).filter(|b| b.len() >= 2) {
		let padded = [bytes[0], bytes[1], bytes.get(2).copied().unwrap_or(0x01)];
		let (year, month, _day) = crate::util::decode_bcd_date_sliding_window(&padded, current_year)?;
		if (year, month) > (current_year, current_month) {
			tvr.application_not_yet_effective = true;
		}
	}
	Ok(())
}

/// Checks the card's Application Usage Control (`9F07`), if present, against
/// a generic goods/services point-of-sale terminal (never an ATM, never
/// cash), setting `requested_service_not_allowed` when none of the usage
/// bits relevant to this terminal type are set.
pub fn check_application_usage_control(card_store: &DataStore, tvr: &mut TerminalVerificationResults) {
	if let Some(auc) = card_store
		.get(&[0x9F, 0x07])
		.and_then(|bytes| ApplicationUsageControl::try_from(bytes).ok())
	{
		let allowed = auc.valid_for_domestic_goods
			|| auc.valid_for_international_goods
			|| auc.valid_for_domestic_services
			|| auc.valid_for_international_services
			|| auc.valid_at_terminals_other_than_atms;
		if !allowed {
			tvr.requested_service_not_allowed = true;
		}
	}
}

/// Walks the card's CVM List (`8E`), per EMV Book 3 Annex C3: each rule's
/// condition is checked against the transaction amount and the card's own
/// `x_value`/`y_value` thresholds, in list order, stopping at the first rule
/// whose condition applies and (if the method fails or is unrecognized)
/// whose `continue_if_unsuccessful` flag is unset.
///
/// Returns `None` if the card has no CVM List at all (no CVM required) or if
/// every applicable rule was exhausted without a conclusive result, in which
/// case `cardholder_verification_unsuccessful` is set on `tvr`.
pub fn evaluate_cvm(
	card_store: &DataStore,
	amount_authorized: u64,
	terminal_supports_online_pin: bool,
	tvr: &mut TerminalVerificationResults,
) -> Option<CardholderVerificationMethodResults> {
	let cvm_list = card_store
		.get(&[0x8E])
		.and_then(|bytes| CardholderVerificationMethodList::try_from(bytes).ok())?;

	for rule in &cvm_list.cv_rules {
		let condition: Option<CvmCondition> = rule.condition.clone().into();
		let condition_applies = match condition {
			Some(CvmCondition::Always | CvmCondition::TerminalSupported) => true,
			Some(CvmCondition::InApplicationCurrencyUnderX) => amount_authorized < u64::from(cvm_list.x_value),
			Some(CvmCondition::InApplicationCurrencyOverX) => amount_authorized > u64::from(cvm_list.x_value),
			Some(CvmCondition::InApplicationCurrencyUnderY) => amount_authorized < u64::from(cvm_list.y_value),
			Some(CvmCondition::InApplicationCurrencyOverY) => amount_authorized > u64::from(cvm_list.y_value),
			// Unattended cash / manual cash / cashback conditions never apply
			// at a goods-and-services POS terminal.
			_ => false,
		};
		if !condition_applies {
			continue;
		}

		let method: Option<CvMethod> = rule.method.clone().into();
		let outcome = match method {
			Some(CvMethod::NoCvmRequired) => Some(CvmResult::Successful),
			Some(CvMethod::Signature) => Some(CvmResult::Successful),
			Some(CvMethod::EncipheredPinOnline) if terminal_supports_online_pin => Some(CvmResult::Successful),
			Some(CvMethod::FailCvmProcessing) => Some(CvmResult::Failed),
			_ => None,
		};

		let result = match outcome {
			Some(result) => result,
			None => {
				if rule.continue_if_unsuccessful {
					continue;
				}
				tvr.unrecognized_cvm = true;
				return Some(CardholderVerificationMethodResults {
					cv_rule: rule.clone(),
					result: CvmResult::Unknown,
				});
			}
		};

		if result == CvmResult::Failed && rule.continue_if_unsuccessful {
			continue;
		}
		if result == CvmResult::Failed {
			tvr.cardholder_verification_unsuccessful = true;
		}
		return Some(CardholderVerificationMethodResults {
			cv_rule: rule.clone(),
			result,
		});
	}

	tvr.cardholder_verification_unsuccessful = true;
	None
}

/// Extends [`evaluate_cvm`] with the CDCVM/online-PIN preference order used
/// by the contactless-qualifier schemes (Visa qVSDC, Mastercard
/// M/Chip+PayPass): a consumer device CVM already performed by the card or
/// announced by the terminal wins outright, an online PIN requirement above
/// the contactless CVM limit comes next, and only then does the card's own
/// CVM list get walked.
#[must_use]
pub fn evaluate_cvm_with_preference(
	card_store: &DataStore,
	amount_authorized: u64,
	contactless_cvm_limit: u64,
	terminal_supports_online_pin: bool,
	cdcvm_indicated: bool,
	tvr: &mut TerminalVerificationResults,
) -> Option<CardholderVerificationMethodResults> {
	if cdcvm_indicated {
		return Some(CardholderVerificationMethodResults {
			cv_rule: CardholderVerificationRule {
				continue_if_unsuccessful: false,
				method: Some(CvMethod::NoCvmRequired).into(),
				condition: Some(CvmCondition::Always).into(),
			},
			result: CvmResult::Successful,
		});
	}

	if terminal_supports_online_pin && amount_authorized > contactless_cvm_limit {
		tvr.online_pin_entered = true;
		return Some(CardholderVerificationMethodResults {
			cv_rule: CardholderVerificationRule {
				continue_if_unsuccessful: false,
				method: Some(CvMethod::EncipheredPinOnline).into(),
				condition: Some(CvmCondition::TerminalSupported).into(),
			},
			result: CvmResult::Successful,
		});
	}

	evaluate_cvm(card_store, amount_authorized, terminal_supports_online_pin, tvr)
}
