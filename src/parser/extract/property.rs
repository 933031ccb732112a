use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::parser::fields::{FieldMap, FieldRule, FieldValue, Post, RuleSet};

pub const LOT_NUMBER: &str = "Lot Number";
pub const PROPERTY_ADDRESS: &str = "Property Address";
pub const LOT_AREA_SQM: &str = "Lot Area (SqM)";
pub const LOT_AREA_SQFT: &str = "Lot Area (SqFt)";
pub const TENURE: &str = "State Title Tenure";
pub const LEASE_DURATION: &str = "Lease Duration";
pub const COMMENCEMENT_DATE: &str = "Commencement Date";
pub const EXPIRY_DATE: &str = "Expiry Date";
pub const OWNERS: &str = "Owners";
pub const PROPERTY_TYPE: &str = "Property Type";
pub const POSTAL_CODE: &str = "Postal Code";
pub const ENCUMBRANCES: &str = "Encumbrances";

const SQFT_PER_SQM: f64 = 10.7639;

const RULES: &[FieldRule] = &[
    FieldRule::new(&[LOT_NUMBER], &[r"Lot Number\s*:\s*(.+)"]),
    FieldRule::new(&[PROPERTY_ADDRESS], &[r"(?s)Property Address\s*:\s*(.*?)\n\s*\n"])
        .with_post(Post::JoinLines),
    FieldRule::new(&[LOT_AREA_SQM], &[r"Lot Area\s*:\s*([0-9]+(?:\.[0-9]+)?)\s*SqM"]),
    FieldRule::new(&[TENURE], &[r"State Title Tenure\s*:\s*(.+)"]),
    FieldRule::new(&[LEASE_DURATION], &[r"Lease Duration\s*:\s*(.+)"]),
    FieldRule::new(&[COMMENCEMENT_DATE], &[r"Commencement Date\s*:\s*([0-9]{2}/[0-9]{2}/[0-9]{4})"]),
    FieldRule::new(
        &[EXPIRY_DATE],
        &[r"State Title Expiry Date\s*:\s*([0-9]{2}/[0-9]{2}/[0-9]{4}|[0-9]{2}/[0-9]{4})"],
    ),
    FieldRule::new(
        &[PROPERTY_TYPE],
        &[r"\b(EXECUTIVE CONDOMINIUM|APARTMENT|HDB|LANDED|CONDOMINIUM)\b"],
    ),
];

static FIELDS: LazyLock<RuleSet> =
    LazyLock::new(|| RuleSet::compile(RULES).expect("property field patterns"));

static OWNER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Name\s*:\s*([A-Z0-9 ()/.\-]+)\n\s*Address").unwrap());
static POSTAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{6})\b").unwrap());

static ENCUMBRANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(APPLICATION TO NOTIFY CHARGE|MORTGAGE)\s+([A-Z0-9/]+)\s+lodged?\s+on\s+([0-9/]+)\s+at\s+([0-9:]+)",
    )
    .unwrap()
});
static NUMBERED_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\d+\s").unwrap());
static CHARGEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CHARGEE\s*-+\s*\n\s*(.+)").unwrap());
static MORTGAGEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"MORTGAGEE\s*-+\s*\n\s*(.+)").unwrap());
static CHARGE_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Type of Charge\s*:\s*(.+)").unwrap());
static NOTIFIED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"NOTIFIED ON\s*:\s*([0-9/]+)").unwrap());
static REGISTERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"REGISTERED ON\s*:\s*([0-9/]+)").unwrap());

/// A charge or mortgage registered against the title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncumbranceRecord {
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lodged_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lodged_time: Option<String>,
    #[serde(rename = "RegisteredOrNotifiedOn", skip_serializing_if = "Option::is_none")]
    pub registered_on: Option<String>,
}

impl EncumbranceRecord {
    /// Identity used for de-duplication: lower-cased, trimmed, lodged time excluded.
    pub fn dedup_key(&self) -> [String; 5] {
        let norm = |v: &Option<String>| v.as_deref().unwrap_or("").trim().to_lowercase();
        [
            norm(&self.kind),
            norm(&self.instrument_no),
            norm(&self.counterparty),
            norm(&self.lodged_on),
            norm(&self.registered_on),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncumbranceKind {
    NotifyCharge,
    Mortgage,
}

impl EncumbranceKind {
    fn from_anchor(word: &str) -> Self {
        if word.to_ascii_uppercase().starts_with("MORTGAGE") {
            EncumbranceKind::Mortgage
        } else {
            EncumbranceKind::NotifyCharge
        }
    }

    fn label(self) -> &'static str {
        match self {
            EncumbranceKind::NotifyCharge => "Application to Notify Charge",
            EncumbranceKind::Mortgage => "Mortgage",
        }
    }

    fn counterparty_re(self) -> &'static Regex {
        match self {
            EncumbranceKind::NotifyCharge => &CHARGEE_RE,
            EncumbranceKind::Mortgage => &MORTGAGEE_RE,
        }
    }

    fn registered_re(self) -> &'static Regex {
        match self {
            EncumbranceKind::NotifyCharge => &NOTIFIED_RE,
            EncumbranceKind::Mortgage => &REGISTERED_RE,
        }
    }
}

pub fn extract(text: &str) -> FieldMap {
    let mut data = FIELDS.apply(text);

    // Area: keep the number only when it parses, derive square feet from it.
    if let Some(raw) = data.text(LOT_AREA_SQM).map(str::to_string) {
        if let Ok(sqm) = raw.parse::<f64>() {
            data.insert(LOT_AREA_SQM, FieldValue::Number(sqm));
            data.insert(LOT_AREA_SQFT, FieldValue::Integer(sqm_to_sqft(sqm)));
        }
    }

    let owners: Vec<&str> = OWNER_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|o| !o.is_empty())
        .collect();
    if !owners.is_empty() {
        data.insert_text(OWNERS, owners.join(", "));
    }

    let postal = data
        .text(PROPERTY_ADDRESS)
        .and_then(|addr| POSTAL_RE.captures(addr))
        .map(|c| c[1].to_string());
    if let Some(postal) = postal {
        data.insert_text(POSTAL_CODE, postal);
    }

    let encumbrances = extract_encumbrances(text);
    if !encumbrances.is_empty() {
        data.insert(ENCUMBRANCES, FieldValue::Encumbrances(encumbrances));
    }

    debug!(fields = data.len(), "property document extracted");
    data
}

pub fn sqm_to_sqft(sqm: f64) -> i64 {
    (sqm * SQFT_PER_SQM).round() as i64
}

/// Collect every charge/mortgage entry in document order. An entry's body runs
/// to the next numbered line, the next entry, or the end of the text.
pub fn extract_encumbrances(text: &str) -> Vec<EncumbranceRecord> {
    let anchors: Vec<_> = ENCUMBRANCE_RE.captures_iter(text).collect();
    let mut records = Vec::with_capacity(anchors.len());

    for (idx, caps) in anchors.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let kind = EncumbranceKind::from_anchor(&caps[1]);

        let body_start = whole.end();
        let next_anchor = anchors
            .get(idx + 1)
            .and_then(|c| c.get(0))
            .map_or(text.len(), |m| m.start());
        let numbered = NUMBERED_LINE_RE
            .find(&text[body_start..])
            .map_or(text.len(), |m| body_start + m.start());
        let body = &text[body_start..next_anchor.min(numbered)];

        let grab = |re: &Regex| {
            re.captures(body)
                .map(|c| c[1].trim().to_string())
                .filter(|v| !v.is_empty())
        };

        records.push(EncumbranceRecord {
            kind: Some(kind.label().to_string()),
            instrument_no: Some(caps[2].to_string()),
            counterparty: grab(kind.counterparty_re()),
            charge_type: grab(&CHARGE_TYPE_RE),
            lodged_on: Some(caps[3].to_string()),
            lodged_time: Some(caps[4].to_string()),
            registered_on: grab(kind.registered_re()),
        });
    }

    records
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_area_converted() {
        let data = extract("Lot Area : 100.5 SqM\n");
        assert_eq!(data.number(LOT_AREA_SQM), Some(100.5));
        assert_eq!(data.integer(LOT_AREA_SQFT), Some(1082));
    }

    #[test]
    fn no_area_no_conversion() {
        let data = extract("Lot Area : unknown\n");
        assert!(!data.contains(LOT_AREA_SQM));
        assert!(!data.contains(LOT_AREA_SQFT));
    }

    #[test]
    fn address_and_postal_code() {
        let text = "Property Address : 21 MEYER ROAD\n#10-01\nSINGAPORE 437894\n\nLot Number : MK25-01234N\n";
        let data = extract(text);
        assert_eq!(
            data.text(PROPERTY_ADDRESS),
            Some("21 MEYER ROAD #10-01 SINGAPORE 437894")
        );
        assert_eq!(data.text(POSTAL_CODE), Some("437894"));
        assert_eq!(data.text(LOT_NUMBER), Some("MK25-01234N"));
    }

    #[test]
    fn postal_code_only_from_address() {
        let data = extract("Reference 123456\n");
        assert!(!data.contains(POSTAL_CODE));
    }

    #[test]
    fn property_type_first_match_in_text() {
        let data = extract("Unit in CONDOMINIUM development, not an APARTMENT\n");
        assert_eq!(data.text(PROPERTY_TYPE), Some("CONDOMINIUM"));
        let data = extract("EXECUTIVE CONDOMINIUM\n");
        assert_eq!(data.text(PROPERTY_TYPE), Some("EXECUTIVE CONDOMINIUM"));
    }

    #[test]
    fn expiry_month_year_form() {
        let data = extract("State Title Expiry Date : 06/2105\n");
        assert_eq!(data.text(EXPIRY_DATE), Some("06/2105"));
    }

    #[test]
    fn owners_joined() {
        let text = "Name : TAN AH KOW\n  Address : 1 X ST\nName : LIM MEI LING (LIN MEILING)\nAddress : 1 X ST\n";
        let data = extract(text);
        assert_eq!(data.text(OWNERS), Some("TAN AH KOW, LIM MEI LING (LIN MEILING)"));
    }

    #[test]
    fn encumbrances_in_document_order() {
        let text = "\
1 MORTGAGE IA/123456A lodged on 02/03/2015 at 10:15
MORTGAGEE ----------
DBS BANK LTD.
REGISTERED ON : 05/03/2015
2 APPLICATION TO NOTIFY CHARGE IC/777B lodge on 01/06/2020 at 09:00
CHARGEE -----
CENTRAL PROVIDENT FUND BOARD
Type of Charge : CPF Charge
NOTIFIED ON : 03/06/2020
";
        let encs = extract_encumbrances(text);
        assert_eq!(encs.len(), 2);

        assert_eq!(encs[0].kind.as_deref(), Some("Mortgage"));
        assert_eq!(encs[0].instrument_no.as_deref(), Some("IA/123456A"));
        assert_eq!(encs[0].counterparty.as_deref(), Some("DBS BANK LTD."));
        assert_eq!(encs[0].registered_on.as_deref(), Some("05/03/2015"));
        assert_eq!(encs[0].lodged_time.as_deref(), Some("10:15"));
        assert_eq!(encs[0].charge_type, None);

        assert_eq!(encs[1].kind.as_deref(), Some("Application to Notify Charge"));
        assert_eq!(encs[1].counterparty.as_deref(), Some("CENTRAL PROVIDENT FUND BOARD"));
        assert_eq!(encs[1].charge_type.as_deref(), Some("CPF Charge"));
        assert_eq!(encs[1].registered_on.as_deref(), Some("03/06/2020"));
        assert_eq!(encs[1].lodged_on.as_deref(), Some("01/06/2020"));
    }

    #[test]
    fn body_stops_at_numbered_line() {
        let text = "MORTGAGE IA/1 lodged on 01/01/2010 at 10:00\n2 Something else\nMORTGAGEE ---\nOTHER BANK\n";
        let encs = extract_encumbrances(text);
        assert_eq!(encs.len(), 1);
        assert_eq!(encs[0].counterparty, None);
    }

    #[test]
    fn dedup_key_ignores_case_and_time() {
        let a = EncumbranceRecord {
            kind: Some("Mortgage".into()),
            counterparty: Some("DBS Bank".into()),
            lodged_time: Some("10:00".into()),
            ..Default::default()
        };
        let b = EncumbranceRecord {
            kind: Some("MORTGAGE".into()),
            counterparty: Some(" dbs bank ".into()),
            lodged_time: Some("11:30".into()),
            ..Default::default()
        };
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn empty_text_is_empty_map() {
        assert!(extract("").is_empty());
        assert!(extract_encumbrances("").is_empty());
    }
}
