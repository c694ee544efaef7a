//! The shared contactless kernel skeleton used by every scheme that doesn't
//! carry its own Type Approval-mandated deviations from base EMV: AmEx
//! (ExpressPay), Discover (D-PAS), JCB (J/Speedy) and UnionPay (QuickPass).
//!
//! Unlike Visa qVSDC/MSD and Mastercard M/Chip+PayPass, these schemes don't
//! define scheme-specific fallback interfaces or a second GENERATE AC in the
//! portion of the flow this crate's Non-goals leave in scope, so a single
//! `Kernel` impl covers all four: GPO, READ RECORD, ODA (SDA/DDA/CDA per the
//! AIP's own preference, never fDDA - that's qVSDC-specific), restrictions,
//! CVM, terminal risk management, terminal action analysis, and the first
//! GENERATE AC.

use super::{
	build_authorization_data,
	card_action_codes,
	check_application_dates,
	check_application_usage_control,
	classify_first_ac,
	dol_from_store,
	evaluate_cvm,
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
};
use crate::{
	emv::{ApplicationInterchangeProfile, OdaMethod, TerminalVerificationResults},
	outcome::{KernelOutcome, TransactionMode},
	transaction::{Event, Transaction},
};

/// The shared skeleton kernel for the schemes that don't need their own
/// `Kernel` impl.
#[derive(Debug, Default)]
pub struct GenericKernel {
	aid: Vec<u8>,
}

impl GenericKernel {
	#[must_use]
	pub fn new(aid: Vec<u8>) -> Self {
		Self { aid }
	}
}

impl Kernel for GenericKernel {
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

impl GenericKernel {
	fn run(
		&mut self,
		transaction: &mut Transaction,
		profile: &TerminalProfile,
		params: &TransactionParameters,
		services: &mut KernelServices,
	) -> Result<KernelOutcome, crate::error::KernelError> {
		let mut tvr = TerminalVerificationResults::try_from([0x00; 5].as_slice())
			.expect("all-zero TVR always parses");
		populate_terminal_store(&mut transaction.terminal_store, profile, params, &tvr);

		// GET PROCESSING OPTIONS. The generic kernel's PDOL is identical in
		// shape to Visa/Mastercard's; build it from whatever the card asked
		// for via tag 0x9F38 during Entry Point's SELECT, already folded into
		// the terminal store by the caller.
		let pdol = dol_from_store(&transaction.terminal_store, &[0x9F, 0x38]);
		let pdol_data = pdol.build(&transaction.terminal_store, &transaction.card_store);
		get_processing_options(pdol_data, services, &mut transaction.card_store)?;
		transaction.advance(Event::CardDetected)?;
		transaction.advance(Event::GpoComplete)?;

		let aip_bytes = transaction
			.card_store
			.get(&TAG_AIP)
			.ok_or(crate::error::KernelError::MissingMandatoryData { tag: 0x82 })?;
		let aip = ApplicationInterchangeProfile::try_from(aip_bytes)?;

		let afl = transaction
			.card_store
			.get(&TAG_AFL)
			.ok_or(crate::error::KernelError::MissingMandatoryData { tag: 0x94 })?
			.to_vec();
		read_records(&afl, services, &mut transaction.card_store)?;
		transaction.advance(Event::RecordsRead)?;

		if let Some(pan_bytes) = transaction.card_store.get(&TAG_PAN) {
			let pan_digits = crate::util::bcd_bytes_to_digit_string(pan_bytes)?;
			transaction.register_pan(crate::sensitive::Pan::new(pan_digits));
		}

		// ODA, per the AIP's own stated preference (CDA > DDA > SDA). CDA's
		// actual verification happens after GENERATE AC, since it covers the
		// freshly-minted application cryptogram; here we only note the
		// chosen method so the right P1 bit is set on the GENERATE AC P1.
		let oda_method = aip.preferred_oda_method();
		match oda_method {
			Some(OdaMethod::Sda) => {
				let issuer_cert = transaction.card_store.get(&[0x90]).unwrap_or_default();
				let static_data = transaction.card_store.get(&[0x93]).unwrap_or_default();
				match services
					.oda_verifier
					.perform_sda(&self.aid, issuer_cert, &[], static_data)
				{
					crate::capabilities::OdaResult::Success(_) => {}
					crate::capabilities::OdaResult::Failed(_) => tvr.sda_failed = true,
				}
			}
			Some(OdaMethod::Dda) => {
				let icc_cert = transaction.card_store.get(&[0x9F, 0x46]).unwrap_or_default();
				let signed_data = transaction.card_store.get(&[0x9F, 0x4B]).unwrap_or_default();
				match services.oda_verifier.perform_dda(
					&self.aid,
					icc_cert,
					&[],
					signed_data,
					&params.unpredictable_number,
				) {
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
		transaction.advance(Event::RestrictionsChecked)?;

		// CVM.
		let terminal_supports_online_pin = profile.terminal_capabilities.cvm_enciphered_pin_for_online_verification;
		let cvm_result = evaluate_cvm(
			&transaction.card_store,
			params.amount_authorized,
			terminal_supports_online_pin,
			&mut tvr,
		);
		if let Some(cvm_result) = &cvm_result {
			use crate::emv::bitflag_values::BitflagValue;
			transaction
				.card_store
				.set(&[0x9F, 0x34], cvm_result.to_bytes());
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
			let icc_cert = transaction.card_store.get(&[0x9F, 0x46]).unwrap_or_default();
			let signed_data = transaction.card_store.get(&[0x9F, 0x4B]).unwrap_or_default();
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
			.ok_or(crate::error::KernelError::MissingMandatoryData { tag: 0x9F27 })?;

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
}

#[cfg(test)]
mod tests {
	use super::GenericKernel;
	use crate::{
		capabilities::testing::{FixedRng, InMemoryCaKeyStore, ManualClock, ScriptedTransceiver, StubOdaVerifier, StubScriptAuthenticator},
		emv::{AdditionalTerminalCapabilities, TerminalCapabilities},
		kernel::{Kernel, KernelServices, TerminalProfile, TransactionParameters},
		outcome::KernelOutcome,
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
			amount_authorized: 1_000,
			amount_other: 0,
			transaction_type: 0x00,
			transaction_date_bcd: [0x25, 0x06, 0x15],
			unpredictable_number: [0x12, 0x34, 0x56, 0x78],
		}
	}

	#[test]
	fn declines_on_aac_even_when_terminal_action_analysis_would_go_online() {
		// No PDOL on record, so GPO's command data is an empty template.
		let gpo_command = vec![0x80, 0xA8, 0x00, 0x00, 0x02, 0x83, 0x00, 0x00];
		let gpo_response = vec![0x80, 0x06, 0x00, 0x00, 0x08, 0x01, 0x01, 0x00, 0x90, 0x00];

		let read_record_command = vec![0x00, 0xB2, 0x01, 0x0C, 0x00];
		let read_record_response = vec![
			0x70, 0x0F, 0x5A, 0x08, 0x41, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x8C, 0x03, 0x9F, 0x02, 0x06,
			0x90, 0x00,
		];

		let generate_ac_command = vec![
			0x80, 0xAE, 0x80, 0x00, 0x08, 0x83, 0x06, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00,
		];
		let generate_ac_response = vec![
			0x80, 0x0B, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x90, 0x00,
		];

		let mut transceiver = ScriptedTransceiver::new()
			.expect(gpo_command, gpo_response)
			.expect(read_record_command, read_record_response)
			.expect(generate_ac_command, generate_ac_response);

		let mut transaction = Transaction::new();
		transaction.begin().unwrap();
		let profile = test_profile();
		let params = test_params();
		let mut oda_verifier = StubOdaVerifier::always(crate::capabilities::OdaResult::Success("n/a"));
		let ca_key_store = InMemoryCaKeyStore::default();
		let mut script_authenticator = StubScriptAuthenticator {
			result: crate::capabilities::ScriptAuthResult::Success,
		};
		let mut rng = FixedRng { fill_byte: 0xFF };
		let clock = ManualClock::at(0);
		let mut services = KernelServices {
			transceiver: &mut transceiver,
			oda_verifier: &mut oda_verifier,
			ca_key_store: &ca_key_store,
			script_authenticator: &mut script_authenticator,
			rng: &mut rng,
			clock: &clock,
		};

		let mut kernel = GenericKernel::new(vec![0xA0, 0x00, 0x00, 0x00, 0x25, 0x01]);
		let outcome = kernel.process_transaction(&mut transaction, &profile, &params, &mut services);
		assert!(matches!(outcome, KernelOutcome::Declined(_, _)));
	}
}
