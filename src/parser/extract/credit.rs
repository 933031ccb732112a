use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::parser::fields::{FieldMap, FieldRule, FieldValue, Post, RuleSet};
use crate::parser::sections::{self, NARRATIVES};

pub const CBS_NAME: &str = "CBS Name";
pub const ID_TYPE: &str = "ID Type";
pub const CBS_ID: &str = "CBS NRIC/ID";
pub const DATE_OF_BIRTH: &str = "Date of Birth";
pub const CBS_POSTAL_CODE: &str = "CBS Postal Code";
pub const CREDIT_SCORE: &str = "Credit Score";
pub const RISK_GRADE: &str = "Risk Grade";
pub const TOTAL_CREDIT_LIMIT: &str = "Total Credit Limit";
pub const TOTAL_OUTSTANDING: &str = "Total Outstanding Balance";
pub const ENQUIRIES_12M: &str = "Previous Enquiries (12m)";
pub const DEFAULT_LOADED: &str = "Default Loaded";
pub const DEFAULT_ORIGINAL: &str = "Default Original Amount";
pub const DEFAULT_BALANCE: &str = "Default Balance";
pub const BANKRUPTCY_ORDER_NO: &str = "Bankruptcy Order No";
pub const BANKRUPTCY_ORDER_DATE: &str = "Bankruptcy Order Date";
pub const BANKRUPTCY_DISCHARGE_NO: &str = "Bankruptcy Discharge No";
pub const BANKRUPTCY_DISCHARGE_DATE: &str = "Bankruptcy Discharge Date";
pub const CBS_NARRATIVES: &str = "CBS Narratives";

pub const MAX_NARRATIVE_LINES: usize = 5;

const NARRATIVE_HEADER_WORDS: &[&str] = &[
    "NARRATIVES",
    "NARRATIVE",
    "ACCOUNT NARRATIVES",
    "ACCOUNTS NARRATIVE",
    "DATE LOADED TYPE",
];

const RULES: &[FieldRule] = &[
    FieldRule::new(&[CBS_NAME], &[r"(?s)Name:\s*(.+?)\s{2,}Date of Earliest"])
        .with_post(Post::CollapseWhitespace),
    FieldRule::new(&[ID_TYPE], &[r"ID Type:\s*(\w+)\s{2,}"]),
    FieldRule::new(&[CBS_ID], &[r"ID Number:\s*([A-Z0-9]+)\s{2,}"]),
    FieldRule::new(&[DATE_OF_BIRTH], &[r"Date of Birth:\s*([0-9/]+)"]),
    FieldRule::new(&[CBS_POSTAL_CODE], &[r"Postal Code:\s*([0-9]{6})"]),
    FieldRule::new(&[CREDIT_SCORE], &[r"(?i)Score[.\s:]*([0-9]{3,4})"]),
    FieldRule::new(&[RISK_GRADE], &[r"(?i)Risk\s*Grade[.\s:]*([A-Z]{1,2}[0-9]?)"]),
    FieldRule::new(
        &[TOTAL_CREDIT_LIMIT],
        &[r"(?i)Total\s*Credit\s*Limit\s*[:\s]\s*\$?\s*([0-9,]+\.[0-9]{2}|[0-9,]+)"],
    ),
    FieldRule::new(
        &[TOTAL_OUTSTANDING],
        &[r"(?i)Total\s*Outstanding\s*Balance\s*[:\s]\s*\$?\s*([0-9,]+\.[0-9]{2}|[0-9,]+)"],
    ),
    FieldRule::new(
        &[ENQUIRIES_12M],
        &[r"(?is)Previous\s*Enquiries.*?Last\s*12\s*Months\s*[:\s]\s*([0-9]+)"],
    ),
    FieldRule::new(
        &[DEFAULT_LOADED, DEFAULT_ORIGINAL, DEFAULT_BALANCE],
        &[r"(?s)Default Records.*?(\d{2}/\d{2}/\d{4})\s+([0-9,]+\.[0-9]{2})\s+([0-9,]+\.[0-9]{2})"],
    ),
    FieldRule::new(
        &[
            BANKRUPTCY_ORDER_NO,
            BANKRUPTCY_ORDER_DATE,
            BANKRUPTCY_DISCHARGE_NO,
            BANKRUPTCY_DISCHARGE_DATE,
        ],
        &[r"(?s)Bankruptcy Number.*?\n([0-9]+)\s+([0-9/]+).*?\n.*?([0-9]+)\s+([0-9/]+)"],
    ),
];

static FIELDS: LazyLock<RuleSet> =
    LazyLock::new(|| RuleSet::compile(RULES).expect("credit field patterns"));
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-_ ]{2,}$").unwrap());
static STRAY_LETTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]$").unwrap());

pub fn extract(text: &str) -> FieldMap {
    let mut data = FIELDS.apply(text);

    let narratives = clean_narratives(sections::locate(text, NARRATIVES).as_str());
    if !narratives.is_empty() {
        data.insert(CBS_NARRATIVES, FieldValue::Lines(narratives));
    }

    debug!(fields = data.len(), "credit report extracted");
    data
}

/// Narrative lines minus headers, separators, stray letters and repeats.
pub fn clean_narratives(block: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if NARRATIVE_HEADER_WORDS.contains(&line.to_ascii_uppercase().as_str())
            || SEPARATOR_RE.is_match(line)
            || STRAY_LETTER_RE.is_match(line)
        {
            continue;
        }
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !seen.insert(line.clone()) {
            continue;
        }
        out.push(line);
        if out.len() >= MAX_NARRATIVE_LINES {
            break;
        }
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_stops_at_wide_gap() {
        let text = "Name: TAN\n AH KOW    Date of Earliest Record: 01/01/2005\n";
        assert_eq!(extract(text).text(CBS_NAME), Some("TAN AH KOW"));
    }

    #[test]
    fn identity_fields() {
        let text = "ID Type: NRIC    ID Number: S1234567D    \nDate of Birth: 01/01/1990\nPostal Code: 437894\n";
        let data = extract(text);
        assert_eq!(data.text(ID_TYPE), Some("NRIC"));
        assert_eq!(data.text(CBS_ID), Some("S1234567D"));
        assert_eq!(data.text(DATE_OF_BIRTH), Some("01/01/1990"));
        assert_eq!(data.text(CBS_POSTAL_CODE), Some("437894"));
    }

    #[test]
    fn score_grade_and_totals() {
        let text = "Credit Score.......1843\nRisk Grade: BB\nTotal Credit Limit: $45,000.00\nTotal Outstanding Balance  12,345\n";
        let data = extract(text);
        assert_eq!(data.text(CREDIT_SCORE), Some("1843"));
        assert_eq!(data.text(RISK_GRADE), Some("BB"));
        assert_eq!(data.text(TOTAL_CREDIT_LIMIT), Some("45,000.00"));
        assert_eq!(data.text(TOTAL_OUTSTANDING), Some("12,345"));
    }

    #[test]
    fn enquiries_and_default_row() {
        let text = "Previous Enquiries\nLast 12 Months: 3\nDefault Records\nDate Loaded  Original  Balance\n12/05/2019  8,000.00  2,150.50\n";
        let data = extract(text);
        assert_eq!(data.text(ENQUIRIES_12M), Some("3"));
        assert_eq!(data.text(DEFAULT_LOADED), Some("12/05/2019"));
        assert_eq!(data.text(DEFAULT_ORIGINAL), Some("8,000.00"));
        assert_eq!(data.text(DEFAULT_BALANCE), Some("2,150.50"));
    }

    #[test]
    fn bankruptcy_rows() {
        let text = "Bankruptcy Number   Order Date\n2231   03/04/2018\nDischarge Number   Date\n2231   05/06/2021\n";
        let data = extract(text);
        assert_eq!(data.text(BANKRUPTCY_ORDER_NO), Some("2231"));
        assert_eq!(data.text(BANKRUPTCY_ORDER_DATE), Some("03/04/2018"));
        assert_eq!(data.text(BANKRUPTCY_DISCHARGE_DATE), Some("05/06/2021"));
    }

    #[test]
    fn narratives_cleaned_and_capped() {
        let block = "ACCOUNT NARRATIVES\n-----\nA\nDate Loaded Type\nAccount   closed\nAccount closed\nL1\nL2\nL3\nL4\nL5\n";
        let lines = clean_narratives(block);
        assert_eq!(lines, vec!["Account closed", "L1", "L2", "L3", "L4"]);
    }

    #[test]
    fn narratives_from_document() {
        let text = "NARRATIVES\nPayment arrangement in place\n____\nDEFAULT RECORDS\nNIL\n";
        let data = extract(text);
        assert_eq!(data.lines(CBS_NARRATIVES), &["Payment arrangement in place".to_string()]);
    }

    #[test]
    fn missing_everything() {
        assert!(extract("").is_empty());
        assert!(clean_narratives("").is_empty());
    }
}
