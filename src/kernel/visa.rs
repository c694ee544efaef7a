//! The Visa contactless kernel: qVSDC (chip, with fDDA), and the Magnetic
//! Stripe Data (MSD) fallback used by cards/terminals that don't support
//! qVSDC's offline data authentication.
//!
//! Differs from the [`super::generic`] skeleton in three ways, per §4.4 and
//! §4.5's Visa-specific notes: it builds and sends a Terminal Transaction
//! Qualifier (TTQ), it selects fDDA instead of DDA when the card's GPO
//! response already carries Signed Dynamic Application Data plus an ICC
//! Dynamic Number, and it gives the card's Consumer Device CVM precedence
//! over the terminal's own CVM List walk.

use super::{
	build_authorization_data,
	card_action_codes,
	check_application_dates,
	check_application_usage_control,
	classify_first_ac,
	dol_from_store,
	evaluate_cvm_with_preference,
	generate_ac,
	get_processing_options,
	populate_terminal_store,
	random_transaction_selection,
	read_records,
	requested_cryptogram,
	terminal_action_analysis,
	FirstAcOutcome,
	Kernel,
	KernelServices,
	TerminalProfile,
	TransactionParameters,
	TAG_AC,
	TAG_AFL,
	TAG_AIP,
	TAG_CID,
	TAG_PAN,
	TAG_TRACK2_EQUIVALENT,
	TAG_TVR,
};
use crate::{
	emv::{
		bitflag_values::BitflagValue,
		ApplicationInterchangeProfile,
		CardTransactionQualifiers,
		OdaMethod,
		TerminalTransactionQualifiers,
		TerminalVerificationResults,
	},
	error::KernelError,
	outcome::{AuthorizationData, KernelOutcome, TransactionMode},
	sensitive::{Cryptogram, Pan, Track2Equivalent},
	transaction::{Event, Transaction},
};

const TAG_TTQ: [u8; 2] = [0x9F, 0x66];
const TAG_CTQ: [u8; 2] = [0x9F, 0x6C];
const TAG_SIGNED_DYNAMIC_APPLICATION_DATA: [u8; 2] = [0x9F, 0x4B];
const TAG_ICC_DYNAMIC_NUMBER: [u8; 2] = [0x9F, 0x4C];
const TAG_ISSUER_PUBLIC_KEY_CERT: [u8; 1] = [0x90];
const TAG_SIGNED_STATIC_APPLICATION_DATA: [u8; 1] = [0x93];
const TAG_ICC_PUBLIC_KEY_CERT: [u8; 2] = [0x9F, 0x46];

/// The Visa qVSDC / fDDA / MSD kernel.
#[derive(Debug, Default)]
pub struct VisaKernel {
	aid: Vec<u8>,
}

impl VisaKernel {
	#[must_use]
	pub fn new(aid: Vec<u8>) -> Self {
		Self { aid }
	}

	fn build_ttq(profile: &TerminalProfile) -> TerminalTransactionQualifiers {
		let mut ttq = TerminalTransactionQualifiers::try_from([0x00; 4].as_slice())
			.expect("all-zero TTQ always parses");
		ttq.qvsdc_supported = true;
		ttq.msd_supported = true;
		ttq.online_pin_supported = profile.terminal_capabilities.cvm_enciphered_pin_for_online_verification;
		ttq.signature_supported = profile.terminal_capabilities.cvm_signature;
		ttq.oda_for_online_authorizations_supported = true;
		ttq.consumer_device_cvm_supported = profile.terminal_capabilities.cvm_enciphered_pin_for_online_verification
			|| profile.terminal_capabilities.cvm_signature;
		ttq
	}
}

impl Kernel for VisaKernel {
	fn process_transaction(
		&mut self,
		transaction: &mut Transaction,
		profile: &TerminalProfile,
		params: &TransactionParameters,
		services: &mut KernelServices,
	) -> KernelOutcome {
		match self.run(transaction, profile, params, services) {
			Ok(outcome) => outcome,
			Err(err) => {
				let _ = transaction.advance(Event::Fail);
				KernelOutcome::EndApplication(err)
			}
		}
	}
}

impl VisaKernel {
	fn run(
		&mut self,
		transaction: &mut Transaction,
		profile: &TerminalProfile,
		params: &TransactionParameters,
		services: &mut KernelServices,
	) -> Result<KernelOutcome, KernelError> {
		let mut tvr =
			TerminalVerificationResults::try_from([0x00; 5].as_slice()).expect("all-zero TVR always parses");
		populate_terminal_store(&mut transaction.terminal_store, profile, params, &tvr);

		let ttq = Self::build_ttq(profile);
		transaction.terminal_store.set(&TAG_TTQ, ttq.to_bytes());

		let pdol = dol_from_store(&transaction.terminal_store, &[0x9F, 0x38]);
		let pdol_data = pdol.build(&transaction.terminal_store, &transaction.card_store);
		get_processing_options(pdol_data, services, &mut transaction.card_store)?;
		transaction.advance(Event::CardDetected)?;
		transaction.advance(Event::GpoComplete)?;

		let aip_bytes = transaction
			.card_store
			.get(&TAG_AIP)
			.ok_or(KernelError::MissingMandatoryData { tag: 0x82 })?;
		let aip = ApplicationInterchangeProfile::try_from(aip_bytes)?;

		let afl = transaction
			.card_store
			.get(&TAG_AFL)
			.ok_or(KernelError::MissingMandatoryData { tag: 0x94 })?
			.to_vec();

		let oda_method = aip.preferred_oda_method();
		if oda_method.is_none() && ttq.msd_supported {
			transaction.advance(Event::RecordsRead)?;
			return self.run_msd(transaction, profile, params, &mut tvr);
		}

		read_records(&afl, services, &mut transaction.card_store)?;
		transaction.advance(Event::RecordsRead)?;

		if let Some(pan_bytes) = transaction.card_store.get(&TAG_PAN) {
			let pan_digits = crate::util::bcd_bytes_to_digit_string(pan_bytes)?;
			transaction.register_pan(Pan::new(pan_digits));
		}

		// ODA, per the AIP's own stated preference (CDA > DDA/fDDA > SDA). fDDA
		// is chosen over plain DDA when the card has already supplied Signed
		// Dynamic Application Data and an ICC Dynamic Number - both carried
		// either in the GPO response itself or the records just read.
		match oda_method {
			Some(OdaMethod::Sda) => {
				let issuer_cert = transaction.card_store.get(&TAG_ISSUER_PUBLIC_KEY_CERT).unwrap_or_default();
				let static_data = transaction
					.card_store
					.get(&TAG_SIGNED_STATIC_APPLICATION_DATA)
					.unwrap_or_default();
				match services
					.oda_verifier
					.perform_sda(&self.aid, issuer_cert, &[], static_data)
				{
					crate::capabilities::OdaResult::Success(_) => {}
					crate::capabilities::OdaResult::Failed(_) => tvr.sda_failed = true,
				}
			}
			Some(OdaMethod::Dda) => {
				let icc_cert = transaction.card_store.get(&TAG_ICC_PUBLIC_KEY_CERT).unwrap_or_default();
				let signed_data = transaction
					.card_store
					.get(&TAG_SIGNED_DYNAMIC_APPLICATION_DATA)
					.unwrap_or_default();
				let fdda_eligible = transaction.card_store.get(&TAG_ICC_DYNAMIC_NUMBER).is_some();
				let result = if fdda_eligible {
					services.oda_verifier.perform_fdda(
						&self.aid,
						icc_cert,
						&[],
						signed_data,
						&params.unpredictable_number,
					)
				} else {
					services.oda_verifier.perform_dda(
						&self.aid,
						icc_cert,
						&[],
						signed_data,
						&params.unpredictable_number,
					)
				};
				match result {
					crate::capabilities::OdaResult::Success(_) => {}
					crate::capabilities::OdaResult::Failed(_) => tvr.dda_failed = true,
				}
			}
			Some(OdaMethod::Cda) | None => {
				if oda_method.is_none() {
					tvr.offline_data_authentication_not_performed = true;
				}
			}
		}
		transaction.advance(Event::OdaComplete)?;

		// RESTRICTIONS.
		check_application_dates(&transaction.card_store, params, &mut tvr)?;
		check_application_usage_control(&transaction.card_store, &mut tvr);

		let ctq = transaction
			.card_store
			.get(&TAG_CTQ)
			.and_then(|bytes| CardTransactionQualifiers::try_from(bytes).ok());
		if let Some(ctq) = &ctq {
			let oda_failed = tvr.sda_failed || tvr.dda_failed || tvr.cda_failed;
			if ctq.go_online_if_oda_fails && oda_failed {
				tvr.transaction_selected_for_online_processing = true;
			}
			if ctq.go_online_if_application_expired && tvr.expired_application {
				tvr.transaction_selected_for_online_processing = true;
			}
		}
		transaction.advance(Event::RestrictionsChecked)?;

		// CVM: CDCVM (indicated by the card's CTQ or the terminal's own TTQ)
		// takes precedence over the card's CVM List.
		let terminal_supports_online_pin = profile.terminal_capabilities.cvm_enciphered_pin_for_online_verification;
		let cdcvm_indicated =
			ctq.as_ref().is_some_and(|c| c.consumer_device_cvm_performed) || ttq.consumer_device_cvm_supported;
		let cvm_result = evaluate_cvm_with_preference(
			&transaction.card_store,
			params.amount_authorized,
			profile.contactless_cvm_limit,
			terminal_supports_online_pin,
			cdcvm_indicated,
			&mut tvr,
		);
		if let Some(cvm_result) = &cvm_result {
			transaction.card_store.set(&[0x9F, 0x34], cvm_result.to_bytes());
		}
		transaction.advance(Event::CvmComplete)?;

		// TERMINAL RISK MANAGEMENT.
		if params.amount_authorized >= profile.floor_limit {
			tvr.transaction_exceeds_floor_limit = true;
		}
		if random_transaction_selection(profile, params.amount_authorized, services.rng) {
			tvr.transaction_selected_for_online_processing = true;
		}
		transaction.advance(Event::RiskManagementComplete)?;

		// TERMINAL ACTION ANALYSIS.
		let (iac_default, iac_online, iac_denial) = card_action_codes(&transaction.card_store);
		let taa = terminal_action_analysis(&tvr, &profile.tac, &iac_default, &iac_online, &iac_denial);
		transaction.advance(Event::ActionAnalysisComplete)?;

		populate_terminal_store(&mut transaction.terminal_store, profile, params, &tvr);

		let cda_requested = matches!(oda_method, Some(OdaMethod::Cda));
		let cdol1 = dol_from_store(&transaction.card_store, &[0x8C]);
		let cdol1_data = cdol1.build(&transaction.terminal_store, &transaction.card_store);
		let ac_store = generate_ac(requested_cryptogram(taa), cda_requested, cdol1_data, services)?;
		transaction.advance(Event::AcGenerated)?;

		if cda_requested {
			let icc_cert = transaction.card_store.get(&TAG_ICC_PUBLIC_KEY_CERT).unwrap_or_default();
			let signed_data = transaction
				.card_store
				.get(&TAG_SIGNED_DYNAMIC_APPLICATION_DATA)
				.unwrap_or_default();
			let ac = ac_store.get(&TAG_AC).unwrap_or_default();
			match services.oda_verifier.perform_cda(
				&self.aid,
				icc_cert,
				&[],
				signed_data,
				&params.unpredictable_number,
				ac,
			) {
				crate::capabilities::OdaResult::Success(_) => {}
				crate::capabilities::OdaResult::Failed(_) => tvr.cda_failed = true,
			}
			populate_terminal_store(&mut transaction.terminal_store, profile, params, &tvr);
		}

		let cid = ac_store
			.get(&TAG_CID)
			.and_then(|bytes| bytes.first().copied())
			.ok_or(KernelError::MissingMandatoryData { tag: 0x9F27 })?;

		match classify_first_ac(taa, cid) {
			FirstAcOutcome::Approved => {
				let authorization_data = build_authorization_data(
					&transaction.terminal_store,
					&transaction.card_store,
					&ac_store,
					profile,
					params,
					self.aid.clone(),
					TransactionMode::Emv,
				)?;
				transaction.advance(Event::Complete)?;
				Ok(KernelOutcome::Approved(authorization_data))
			}
			FirstAcOutcome::OnlineRequest => {
				let authorization_data = build_authorization_data(
					&transaction.terminal_store,
					&transaction.card_store,
					&ac_store,
					profile,
					params,
					self.aid.clone(),
					TransactionMode::Emv,
				)?;
				Ok(KernelOutcome::OnlineRequest(authorization_data))
			}
			FirstAcOutcome::Declined(reason) => {
				let authorization_data = build_authorization_data(
					&transaction.terminal_store,
					&transaction.card_store,
					&ac_store,
					profile,
					params,
					self.aid.clone(),
					TransactionMode::Emv,
				)
				.ok();
				transaction.advance(Event::Fail)?;
				Ok(KernelOutcome::Declined(reason, authorization_data))
			}
		}
	}

	/// The Magnetic Stripe Data fallback path: no offline data authentication,
	/// no CVM list, no GENERATE AC exchange. The card's GPO response already
	/// carries Track 2 Equivalent Data (with its own dynamic card verification
	/// value folded into the discretionary data), so the kernel simply stages
	/// that data online rather than issuing further card commands.
	fn run_msd(
		&mut self,
		transaction: &mut Transaction,
		profile: &TerminalProfile,
		params: &TransactionParameters,
		tvr: &mut TerminalVerificationResults,
	) -> Result<KernelOutcome, KernelError> {
		tvr.offline_data_authentication_not_performed = true;
		transaction.advance(Event::OdaComplete)?;
		transaction.advance(Event::RestrictionsChecked)?;
		transaction.advance(Event::CvmComplete)?;
		if params.amount_authorized >= profile.floor_limit {
			tvr.transaction_exceeds_floor_limit = true;
		}
		transaction.advance(Event::RiskManagementComplete)?;
		transaction.advance(Event::ActionAnalysisComplete)?;
		populate_terminal_store(&mut transaction.terminal_store, profile, params, tvr);
		transaction.advance(Event::AcGenerated)?;

		if let Some(pan_bytes) = transaction.card_store.get(&TAG_PAN) {
			let pan_digits = crate::util::bcd_bytes_to_digit_string(pan_bytes)?;
			transaction.register_pan(Pan::new(pan_digits));
		}

		let pan_bytes = transaction
			.card_store
			.get(&TAG_PAN)
			.ok_or(KernelError::MissingMandatoryData { tag: 0x5A })?;
		let pan = Pan::new(crate::util::bcd_bytes_to_digit_string(pan_bytes)?);
		let aip_bytes = transaction
			.card_store
			.get(&TAG_AIP)
			.ok_or(KernelError::MissingMandatoryData { tag: 0x82 })?;
		let tvr_bytes = transaction
			.terminal_store
			.get(&TAG_TVR)
			.ok_or(KernelError::MissingMandatoryData { tag: 0x95 })?;
		let final_tvr = TerminalVerificationResults::try_from(tvr_bytes)?;

		let authorization_data = AuthorizationData {
			pan,
			pan_sequence_number: transaction
				.card_store
				.get(&[0x5F, 0x34])
				.and_then(|bytes| bytes.first().copied()),
			expiry_yymm: transaction
				.card_store
				.get(&[0x5F, 0x24])
				.filter(|bytes| bytes.len() >= 2)
				.map(|bytes| (bytes[0], bytes[1])),
			track2_equivalent: transaction
				.card_store
				.get(&TAG_TRACK2_EQUIVALENT)
				.map(|bytes| Track2Equivalent::new(bytes.to_vec())),
			application_cryptogram: Cryptogram::new(Vec::new()),
			cryptogram_information_data: 0,
			atc: 0,
			issuer_application_data: Vec::new(),
			tvr: final_tvr,
			cvm_results: None,
			amount_authorized: params.amount_authorized,
			amount_other: params.amount_other,
			terminal_country_code: profile.terminal_country_code,
			currency_code: profile.transaction_currency_code,
			transaction_date_bcd: params.transaction_date_bcd,
			transaction_type: params.transaction_type,
			unpredictable_number: params.unpredictable_number,
			aip: [aip_bytes[0], aip_bytes[1]],
			aid: self.aid.clone(),
			cardholder_name: transaction
				.card_store
				.get(&[0x5F, 0x20])
				.map(|bytes| String::from_utf8_lossy(bytes).trim().to_owned()),
			transaction_mode: TransactionMode::Magstripe,
		};

		// MSD has no offline capability: every transaction goes online.
		Ok(KernelOutcome::OnlineRequest(authorization_data))
	}
}

#[cfg(test)]
mod tests {
	use super::VisaKernel;
	use crate::{
		capabilities::testing::{FixedRng, InMemoryCaKeyStore, ManualClock, ScriptedTransceiver, StubOdaVerifier, StubScriptAuthenticator},
		emv::{AdditionalTerminalCapabilities, TerminalCapabilities},
		kernel::{Kernel, KernelServices, TerminalProfile, TransactionParameters},
		outcome::{KernelOutcome, TransactionMode},
		tac::TerminalActionCodes,
		transaction::Transaction,
	};

	fn test_profile() -> TerminalProfile {
		TerminalProfile {
			terminal_country_code: [0x08, 0x40],
			transaction_currency_code: [0x08, 0x40],
			merchant_category_code: [0x59, 0x12],
			terminal_capabilities: TerminalCapabilities::try_from([0x00; 3].as_slice()).unwrap(),
			additional_terminal_capabilities: AdditionalTerminalCapabilities::try_from([0x00; 5].as_slice()).unwrap(),
			tac: TerminalActionCodes::default(),
			floor_limit: 5_000,
			contactless_cvm_limit: 5_000,
			random_online_threshold: 0,
			terminal_id: Vec::new(),
		}
	}

	fn test_params() -> TransactionParameters {
		TransactionParameters {
			amount_authorized: 2_500,
			amount_other: 0,
			transaction_type: 0x00,
			transaction_date_bcd: [0x25, 0x11, 0x19],
			unpredictable_number: [0x12, 0x34, 0x56, 0x78],
		}
	}

	fn test_services<'a>(
		transceiver: &'a mut ScriptedTransceiver,
		oda_verifier: &'a mut StubOdaVerifier,
		ca_key_store: &'a InMemoryCaKeyStore,
		script_authenticator: &'a mut StubScriptAuthenticator,
		rng: &'a mut FixedRng,
		clock: &'a ManualClock,
	) -> KernelServices<'a> {
		KernelServices {
			transceiver,
			oda_verifier,
			ca_key_store,
			script_authenticator,
			rng,
			clock,
		}
	}

	#[test]
	fn qvsdc_with_dda_and_no_cvm_list_honours_card_requested_online() {
		// AIP: DDA supported (no fDDA tags on record, so this exercises plain
		// DDA). The card downgrades the terminal's offline-approved decision
		// to ARQC in its GENERATE AC response, which the kernel must honour.
		let gpo_command = vec![0x80, 0xA8, 0x00, 0x00, 0x02, 0x83, 0x00, 0x00];
		let gpo_response = vec![0x80, 0x06, 0x20, 0x00, 0x08, 0x01, 0x01, 0x00, 0x90, 0x00];

		let read_record_command = vec![0x00, 0xB2, 0x01, 0x0C, 0x00];
		let read_record_response = vec![
			0x70, 0x0F, 0x5A, 0x08, 0x47, 0x61, 0x74, 0x00, 0x00, 0x00, 0x00, 0x12, 0x8C, 0x03, 0x9F, 0x02, 0x06,
			0x90, 0x00,
		];

		let generate_ac_command = vec![
			0x80, 0xAE, 0x40, 0x00, 0x08, 0x83, 0x06, 0x00, 0x00, 0x00, 0x00, 0x25, 0x00, 0x00,
		];
		let generate_ac_response = vec![
			0x80, 0x0B, 0x80, 0x00, 0x01, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x90, 0x00,
		];

		let mut transceiver = ScriptedTransceiver::new()
			.expect(gpo_command, gpo_response)
			.expect(read_record_command, read_record_response)
			.expect(generate_ac_command, generate_ac_response);
		let mut oda_verifier = StubOdaVerifier::always(crate::capabilities::OdaResult::Success("n/a"));
		let ca_key_store = InMemoryCaKeyStore::default();
		let mut script_authenticator = StubScriptAuthenticator {
			result: crate::capabilities::ScriptAuthResult::Success,
		};
		let mut rng = FixedRng { fill_byte: 0xFF };
		let clock = ManualClock::at(0);
		let mut services = test_services(
			&mut transceiver,
			&mut oda_verifier,
			&ca_key_store,
			&mut script_authenticator,
			&mut rng,
			&clock,
		);

		let mut transaction = Transaction::new();
		transaction.begin().unwrap();
		let profile = test_profile();
		let params = test_params();
		let mut kernel = VisaKernel::new(vec![0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10]);
		let outcome = kernel.process_transaction(&mut transaction, &profile, &params, &mut services);
		match outcome {
			KernelOutcome::OnlineRequest(data) => {
				assert_eq!(data.transaction_mode, TransactionMode::Emv);
				assert_eq!(data.aid, vec![0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10]);
			}
			other => panic!("expected OnlineRequest, got {other:?}"),
		}
	}
}
