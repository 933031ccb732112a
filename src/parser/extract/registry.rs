use std::sync::LazyLock;

use serde::Serialize;
use tracing::debug;

use crate::parser::classify::{self, LitigationVerdict, Verdict};
use crate::parser::fields::{FieldMap, FieldRule, RuleSet};
use crate::parser::sections::{
    self, HeaderRegistry, AS_DEFENDANT, AS_PLAINTIFF, BANKRUPTCY, LITIGATION,
    LITIGATION_DEFENDANT, LITIGATION_PLAINTIFF,
};

pub const INDIVIDUAL_NAME: &str = "Individual Name";
pub const NRIC: &str = "NRIC";
pub const ADDRESS_UPDATED: &str = "Address Updated";
pub const ACRA_ADDRESS: &str = "ACRA Address";
pub const COMPANY_UEN: &str = "Current Company UEN";
pub const COMPANY: &str = "Current Company";
pub const APPOINTMENT_DATE: &str = "Appointment Date";
pub const POSITION: &str = "Position";

const RULES: &[FieldRule] = &[
    FieldRule::new(
        &[INDIVIDUAL_NAME],
        &[
            r"REQUESTED INDIVIDUAL NAME\s*:\s*(.+)",
            r"INDIVIDUAL NAME\s*:\s*(.+)",
        ],
    ),
    FieldRule::new(&[NRIC], &[r"NRIC\s*/\s*ID\s*:\s*([A-Z0-9]+)"]),
    FieldRule::new(
        &[ADDRESS_UPDATED, ACRA_ADDRESS],
        &[r"ADDRESS\s*CHANGED DATE.*?\n(\d{2}/\d{2}/\d{4})\s+(.+)"],
    ),
    FieldRule::new(
        &[COMPANY_UEN, COMPANY, APPOINTMENT_DATE, POSITION],
        &[r"(?s)CURRENT COMPANIES.*?\n([0-9A-Z]+)\s+(.+?)\n.*?\n(\d{2}/\d{2}/\d{4}).*?(DIRECTOR|MANAGER|PARTNER|SHAREHOLDER)"],
    ),
];

static FIELDS: LazyLock<RuleSet> =
    LazyLock::new(|| RuleSet::compile(RULES).expect("registry field patterns"));
static SIDES: LazyLock<HeaderRegistry> = LazyLock::new(HeaderRegistry::litigation_sides);

/// Registry document fields plus its litigation and bankruptcy verdicts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryExtract {
    pub fields: FieldMap,
    pub litigation: LitigationVerdict,
    pub bankruptcy: Verdict,
}

impl Default for RegistryExtract {
    fn default() -> Self {
        extract("")
    }
}

pub fn extract(text: &str) -> RegistryExtract {
    let fields = FIELDS.apply(text);

    let (plaintiff, defendant) = litigation_sections(text);
    let litigation = classify::litigation(plaintiff, defendant);

    let bankruptcy = classify::classify_bankruptcy(sections::locate(text, BANKRUPTCY).as_str());

    debug!(
        fields = fields.len(),
        litigation = %litigation.status,
        side = %litigation.side,
        bankruptcy = %bankruptcy.status,
        "registry document extracted"
    );
    RegistryExtract {
        fields,
        litigation,
        bankruptcy,
    }
}

/// Plaintiff and defendant sections. Documents without side-labelled headers
/// get their combined LITIGATION block split on the "AS PLAINTIFF" /
/// "AS DEFENDANT" markers; without markers both sides see the whole block.
pub fn litigation_sections(text: &str) -> (&str, &str) {
    let plaintiff = sections::locate(text, LITIGATION_PLAINTIFF);
    let defendant = sections::locate(text, LITIGATION_DEFENDANT);
    if !plaintiff.is_empty() || !defendant.is_empty() {
        return (plaintiff.as_str(), defendant.as_str());
    }

    let combined = sections::locate(text, LITIGATION).as_str();
    let upper = combined.to_ascii_uppercase();
    let has_plaintiff = upper.contains(AS_PLAINTIFF);
    let has_defendant = upper.contains(AS_DEFENDANT);
    if !has_plaintiff && !has_defendant {
        return (combined, combined);
    }

    // The marker itself stands in as the side header; the other marker bounds it.
    let side = |present: bool, marker: &str| {
        if present {
            SIDES.locate(combined, marker).as_str()
        } else {
            ""
        }
    };
    (side(has_plaintiff, AS_PLAINTIFF), side(has_defendant, AS_DEFENDANT))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::classify::{Side, Status};

    #[test]
    fn requested_name_preferred() {
        let text = "INDIVIDUAL NAME : OTHER\nREQUESTED INDIVIDUAL NAME : TAN AH KOW\n";
        let out = extract(text);
        assert_eq!(out.fields.text(INDIVIDUAL_NAME), Some("TAN AH KOW"));
    }

    #[test]
    fn name_fallback_and_nric() {
        let out = extract("INDIVIDUAL NAME : LIM MEI LING\nNRIC / ID : S1234567D\n");
        assert_eq!(out.fields.text(INDIVIDUAL_NAME), Some("LIM MEI LING"));
        assert_eq!(out.fields.text(NRIC), Some("S1234567D"));
    }

    #[test]
    fn address_row_after_header() {
        let text = "ADDRESS CHANGED DATE   ADDRESS\n14/02/2022   21 MEYER ROAD #10-01 SINGAPORE 437894\n";
        let out = extract(text);
        assert_eq!(out.fields.text(ADDRESS_UPDATED), Some("14/02/2022"));
        assert_eq!(
            out.fields.text(ACRA_ADDRESS),
            Some("21 MEYER ROAD #10-01 SINGAPORE 437894")
        );
    }

    #[test]
    fn side_labelled_plaintiff_section() {
        let text = "LITIGATION - AS PLAINTIFF\nHC/OS 123/2021 TAN AH KOW v ACME PTE LTD\nLITIGATION - AS DEFENDANT\nNO RECORD FOUND\n";
        let out = extract(text);
        assert_eq!(out.litigation.status, Status::Present);
        assert_eq!(out.litigation.side, Side::Plaintiff);
        assert_eq!(
            out.litigation.plaintiff.evidence.as_deref(),
            Some("HC/OS 123/2021 TAN AH KOW v ACME PTE LTD")
        );
    }

    #[test]
    fn combined_block_split_on_markers() {
        let text = "LITIGATION\nAS PLAINTIFF/CLAIMANT\nNO RECORD FOUND\nAS DEFENDANT\nDC/DC/881/2020 ACME v TAN\nBANKRUPTCY\nNIL\n";
        let (p, d) = litigation_sections(text);
        assert_eq!(p, "NO RECORD FOUND");
        assert_eq!(d, "DC/DC/881/2020 ACME v TAN");

        let out = extract(text);
        assert_eq!(out.litigation.side, Side::Defendant);
        assert_eq!(out.bankruptcy.status, Status::NoRecord);
    }

    #[test]
    fn combined_block_without_markers_feeds_both() {
        let text = "LITIGATION\nMC/M/12/2023 claim filed\nBANKRUPTCY\nNIL\n";
        let (p, d) = litigation_sections(text);
        assert_eq!(p, d);
        assert_eq!(extract(text).litigation.side, Side::Both);
    }

    #[test]
    fn bankruptcy_synonym_present() {
        let text = "BANKRUPTCY / WINDING UP\nHC/B 2231/2018 Bankruptcy order made\n";
        let out = extract(text);
        assert_eq!(out.bankruptcy.status, Status::Present);
        assert!(out.bankruptcy.evidence.is_some());
    }

    #[test]
    fn bankruptcy_table_shell_is_no_record() {
        let text = "BANKRUPTCY / WINDING UP\nCASE NO      DATE FILED     STATUS\n-----------------------------\n";
        let out = extract(text);
        assert_eq!(out.bankruptcy.status, Status::NoRecord);
        assert_eq!(out.bankruptcy.rule, "header_only");
        assert!(out.bankruptcy.evidence.is_none());
    }

    #[test]
    fn empty_text_is_total() {
        let out = extract("");
        assert!(out.fields.is_empty());
        assert_eq!(out.litigation.side, Side::None);
        assert_eq!(out.bankruptcy.status, Status::NoRecord);
    }
}
