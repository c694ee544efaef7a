//! All EMV-related parsers.

// Modules
mod additional_terminal_capabilities;
mod aip;
mod auc;
mod authorisation_response_code;
pub mod bitflag_values;
pub mod ccd;
mod ctq;
mod cv_rule;
mod cvm_list;
mod cvm_results;
mod iac;
mod pos_entry_mode;
mod terminal_capabilities;
mod terminal_type;
mod tlv_parsing;
mod transaction_type;
mod tsi;
mod ttq;
mod tvr;

// Public Exports
pub use self::{
	additional_terminal_capabilities::*,
	aip::*,
	auc::*,
	authorisation_response_code::*,
	bitflag_values::*,
	ctq::*,
	cv_rule::*,
	cvm_list::*,
	cvm_results::*,
	iac::*,
	pos_entry_mode::*,
	terminal_capabilities::*,
	terminal_type::*,
	tlv_parsing::*,
	transaction_type::*,
	tsi::*,
	ttq::*,
	tvr::*,
};
