//! Entry Point / AID selection: PPSE discovery, candidate ordering, and
//! RID-prefix kernel dispatch, per §4.5.

use crate::emv::{ber_tlv, RawEmvBlock};

/// `2PAY.SYS.DDF01`, the PPSE name selected to discover contactless
/// candidate applications.
pub const PPSE_NAME: &[u8] = b"2PAY.SYS.DDF01";

const TAG_AID: [u8; 1] = [0x4F];
const TAG_APPLICATION_PRIORITY_INDICATOR: [u8; 1] = [0x87];
const TAG_PDOL: [u8; 2] = [0x9F, 0x38];

/// The kernel family a RID prefix dispatches to, per §4.5's table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KernelFamily {
	Visa,
	Mastercard,
	Amex,
	Discover,
	Jcb,
	UnionPay,
}

/// Registered RID prefixes (first 5 bytes of the AID), in the order they're
/// checked.
const RID_TABLE: &[(&[u8], KernelFamily)] = &[
	(&[0xA0, 0x00, 0x00, 0x00, 0x03], KernelFamily::Visa),
	(&[0xA0, 0x00, 0x00, 0x00, 0x04], KernelFamily::Mastercard),
	(&[0xA0, 0x00, 0x00, 0x00, 0x25], KernelFamily::Amex),
	(&[0xA0, 0x00, 0x00, 0x01, 0x52], KernelFamily::Discover),
	(&[0xA0, 0x00, 0x00, 0x00, 0x65], KernelFamily::Jcb),
	(&[0xA0, 0x00, 0x00, 0x03, 0x33], KernelFamily::UnionPay),
];

/// Looks up the kernel family registered for `aid`'s RID (first 5 bytes).
#[must_use]
pub fn dispatch_kernel(aid: &[u8]) -> Option<KernelFamily> {
	if aid.len() < 5 {
		return None;
	}
	RID_TABLE
		.iter()
		.find(|(rid, _)| aid.starts_with(rid))
		.map(|(_, family)| *family)
}

/// A single candidate application entry from the PPSE's FCI, as offered
/// for selection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AidCandidate {
	pub aid: Vec<u8>,
	/// 1 = highest priority; `None` when the FCI omitted tag `0x87`, in
	/// which case the candidate sorts after every prioritized one, in FCI
	/// order.
	pub priority: Option<u8>,
}

/// Parses a PPSE FCI response into its ordered candidate list: every
/// `0x61` (Application Template) entry's `0x4F` (AID) and `0x87` (priority)
/// pair, sorted by priority ascending (1 = highest), with unprioritized
/// entries last in encounter order.
///
/// # Errors
/// Returns [`crate::error::ParseError`] if `fci_bytes` isn't valid BER-TLV.
pub fn parse_candidate_list(fci_bytes: &[u8]) -> Result<Vec<AidCandidate>, crate::error::ParseError> {
	let block = ber_tlv::parse(fci_bytes)?;
	let mut candidates = Vec::new();
	collect_candidates(&block, &mut candidates);

	candidates.sort_by_key(|candidate| candidate.priority.unwrap_or(u8::MAX));
	Ok(candidates)
}

fn collect_candidates(block: &RawEmvBlock, out: &mut Vec<AidCandidate>) {
	// Each `0x61` Application Template is a constructed node; collect its
	// own AID/priority pair rather than flattening with the rest of the
	// document, since there may be several sibling 0x61 templates.
	for node in &block.nodes {
		if node.tag.tag == [0x61] {
			let aid = node.child_block.find(&TAG_AID).map(|tag| tag.data.clone());
			let priority = node
				.child_block
				.find(&TAG_APPLICATION_PRIORITY_INDICATOR)
				.and_then(|tag| tag.data.first().map(|b| b & 0x0F));
			if let Some(aid) = aid {
				out.push(AidCandidate { aid, priority });
			}
		} else {
			collect_candidates(&node.child_block, out);
		}
	}
}

/// Extracts the PDOL (tag `0x9F38`) from a SELECT AID response's FCI, if
/// present.
///
/// # Errors
/// Returns [`crate::error::ParseError`] if `fci_bytes` isn't valid BER-TLV.
pub fn extract_pdol(fci_bytes: &[u8]) -> Result<Option<Vec<u8>>, crate::error::ParseError> {
	let block = ber_tlv::parse(fci_bytes)?;
	Ok(block.find(&TAG_PDOL).map(|tag| tag.data.clone()))
}

/// A selected application, carried forward into kernel processing - see
/// `SPEC_FULL.md`'s glossary note on PIX preservation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectedApplication {
	pub aid: Vec<u8>,
	pub kernel: KernelFamily,
	pub pdol: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
	use super::{dispatch_kernel, extract_pdol, parse_candidate_list, KernelFamily};

	fn application_template(aid: &[u8], priority: Option<u8>) -> Vec<u8> {
		let mut inner = vec![0x4F, aid.len() as u8];
		inner.extend_from_slice(aid);
		if let Some(priority) = priority {
			inner.extend_from_slice(&[0x87, 0x01, priority]);
		}
		let mut template = vec![0x61, inner.len() as u8];
		template.extend(inner);
		template
	}

	#[test]
	fn dispatch_kernel_matches_visa_rid() {
		assert_eq!(
			dispatch_kernel(&[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10]),
			Some(KernelFamily::Visa)
		);
	}

	#[test]
	fn dispatch_kernel_returns_none_for_unregistered_rid() {
		assert_eq!(dispatch_kernel(&[0xA0, 0x00, 0x00, 0x01, 0x01]), None);
	}

	#[test]
	fn candidate_list_sorted_by_priority_ascending() {
		let mut fci = Vec::new();
		fci.extend(application_template(&[0xA0, 0x00, 0x00, 0x00, 0x04, 0x10, 0x10], Some(2)));
		fci.extend(application_template(&[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10], Some(1)));

		let candidates = parse_candidate_list(&fci).unwrap();
		assert_eq!(candidates.len(), 2);
		assert_eq!(candidates[0].aid, vec![0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10]);
		assert_eq!(candidates[1].priority, Some(2));
	}

	#[test]
	fn unprioritized_candidates_sort_last() {
		let mut fci = Vec::new();
		fci.extend(application_template(&[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10], None));
		fci.extend(application_template(&[0xA0, 0x00, 0x00, 0x00, 0x04, 0x10, 0x10], Some(1)));

		let candidates = parse_candidate_list(&fci).unwrap();
		assert_eq!(candidates[0].priority, Some(1));
		assert_eq!(candidates[1].priority, None);
	}

	#[test]
	fn extract_pdol_from_fci() {
		let fci = vec![0x9F, 0x38, 0x03, 0x9F, 0x66, 0x04];
		assert_eq!(extract_pdol(&fci).unwrap(), Some(vec![0x9F, 0x66, 0x04]));
	}
}
