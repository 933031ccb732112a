use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::news::AdverseNewsHit;
use crate::parser::classify::{Side, Status};
use crate::parser::extract::property::{self, EncumbranceRecord};
use crate::parser::extract::registry::{self, RegistryExtract};
use crate::parser::extract::credit;
use crate::parser::fields::FieldMap;

const DAYS_PER_YEAR: f64 = 365.25;
const MAX_ENCUMBRANCE_BULLETS: usize = 3;
pub const NO_RISK_FLAGS: &str = "None seen in docs";

static SHORT_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{2}$").unwrap());

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_expiry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_area_sqm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_area_sqft: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoanSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_credit_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_outstanding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enquiries_12m: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_loaded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bankruptcy_order_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bankruptcy_order_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bankruptcy_discharge_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bankruptcy_discharge_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub narratives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorrowerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cbs_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cbs_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cbs_postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acra_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acra_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acra_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_uen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<String>,
    pub bankruptcy_status: Status,
    pub litigation_status: Status,
    pub litigation_side: Side,
}

/// The one-line-per-topic view of the case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanSummary {
    pub risk_flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_address: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub encumbrances: Vec<String>,
    pub litigation: String,
    pub bankruptcy: String,
    pub adverse_news_count: usize,
}

impl LoanSummary {
    pub fn risk_flags_text(&self) -> String {
        if self.risk_flags.is_empty() {
            NO_RISK_FLAGS.to_string()
        } else {
            self.risk_flags.join(", ")
        }
    }
}

/// Raw section text behind Present registry verdicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub litigation_plaintiff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub litigation_defendant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bankruptcy: Option<String>,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        self.litigation_plaintiff.is_none()
            && self.litigation_defendant.is_none()
            && self.bankruptcy.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub property: PropertySection,
    pub encumbrances: Vec<EncumbranceRecord>,
    pub loan: LoanSection,
    pub borrower: BorrowerSection,
    pub summary: LoanSummary,
    pub adverse_news: Vec<AdverseNewsHit>,
    pub evidence: Evidence,
    pub attachments: Vec<String>,
}

pub fn assemble(
    property: &FieldMap,
    registry: &RegistryExtract,
    credit: &FieldMap,
    hits: Vec<AdverseNewsHit>,
    attachments: Vec<String>,
    today: NaiveDate,
) -> CaseRecord {
    let text = |map: &FieldMap, key: &str| map.text(key).map(str::to_string);
    let reg = &registry.fields;

    let property_section = PropertySection {
        address: text(property, property::PROPERTY_ADDRESS),
        postal_code: text(property, property::POSTAL_CODE),
        property_type: text(property, property::PROPERTY_TYPE),
        tenure: text(property, property::TENURE),
        lease_duration: text(property, property::LEASE_DURATION),
        lease_start: text(property, property::COMMENCEMENT_DATE),
        lease_expiry: text(property, property::EXPIRY_DATE),
        years_remaining: property
            .text(property::EXPIRY_DATE)
            .and_then(parse_date)
            .map(|expiry| years_remaining(expiry, today)),
        lot_area_sqm: property.number(property::LOT_AREA_SQM),
        lot_area_sqft: property.integer(property::LOT_AREA_SQFT),
        lot_number: text(property, property::LOT_NUMBER),
        owners: text(property, property::OWNERS),
    };
    let encumbrances = property.encumbrances(property::ENCUMBRANCES).to_vec();

    let loan = LoanSection {
        credit_score: text(credit, credit::CREDIT_SCORE),
        risk_grade: text(credit, credit::RISK_GRADE),
        total_credit_limit: text(credit, credit::TOTAL_CREDIT_LIMIT),
        total_outstanding: text(credit, credit::TOTAL_OUTSTANDING),
        enquiries_12m: text(credit, credit::ENQUIRIES_12M),
        default_loaded: text(credit, credit::DEFAULT_LOADED),
        default_original: text(credit, credit::DEFAULT_ORIGINAL),
        default_balance: text(credit, credit::DEFAULT_BALANCE),
        bankruptcy_order_no: text(credit, credit::BANKRUPTCY_ORDER_NO),
        bankruptcy_order_date: text(credit, credit::BANKRUPTCY_ORDER_DATE),
        bankruptcy_discharge_no: text(credit, credit::BANKRUPTCY_DISCHARGE_NO),
        bankruptcy_discharge_date: text(credit, credit::BANKRUPTCY_DISCHARGE_DATE),
        narratives: credit.lines(credit::CBS_NARRATIVES).to_vec(),
    };

    let borrower = BorrowerSection {
        cbs_name: text(credit, credit::CBS_NAME),
        cbs_id: text(credit, credit::CBS_ID),
        date_of_birth: text(credit, credit::DATE_OF_BIRTH),
        age: credit
            .text(credit::DATE_OF_BIRTH)
            .and_then(parse_date)
            .and_then(|dob| age(dob, today)),
        cbs_postal_code: text(credit, credit::CBS_POSTAL_CODE),
        acra_name: text(reg, registry::INDIVIDUAL_NAME),
        acra_id: text(reg, registry::NRIC),
        acra_address: text(reg, registry::ACRA_ADDRESS),
        address_updated: text(reg, registry::ADDRESS_UPDATED),
        company: text(reg, registry::COMPANY),
        company_uen: text(reg, registry::COMPANY_UEN),
        position: text(reg, registry::POSITION),
        appointment_date: text(reg, registry::APPOINTMENT_DATE),
        bankruptcy_status: registry.bankruptcy.status,
        litigation_status: registry.litigation.status,
        litigation_side: registry.litigation.side,
    };

    let summary = LoanSummary {
        risk_flags: risk_flags(&loan, registry),
        borrower_name: borrower.cbs_name.clone().or_else(|| borrower.acra_name.clone()),
        borrower_id: borrower.cbs_id.clone().or_else(|| borrower.acra_id.clone()),
        property_address: property_section.address.clone(),
        encumbrances: summarize_encumbrances(&encumbrances),
        litigation: litigation_label(registry),
        bankruptcy: registry.bankruptcy.status.bankruptcy_label().to_string(),
        adverse_news_count: hits.len(),
    };

    let evidence = if registry.litigation.status.is_present() {
        let (plaintiff, defendant) = registry.litigation.evidence();
        Evidence {
            litigation_plaintiff: plaintiff.map(str::to_string),
            litigation_defendant: defendant.map(str::to_string),
            bankruptcy: None,
        }
    } else {
        Evidence::default()
    };
    let evidence = Evidence {
        bankruptcy: registry.bankruptcy.evidence.clone(),
        ..evidence
    };

    info!(
        flags = summary.risk_flags.len(),
        encumbrances = encumbrances.len(),
        adverse_news = hits.len(),
        "case record assembled"
    );

    CaseRecord {
        property: property_section,
        encumbrances,
        loan,
        borrower,
        summary,
        adverse_news: hits,
        evidence,
        attachments,
    }
}

/// `dd/mm/yyyy`, `dd-mm-yyyy`, `yyyy-mm-dd` or `dd/mm/yy`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // %Y would also accept a two-digit year, so the short form is checked first.
    if SHORT_YEAR_RE.is_match(raw) {
        return NaiveDate::parse_from_str(raw, "%d/%m/%y").ok();
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Whole calendar years lived; `None` for a birth date after `today`.
pub fn age(dob: NaiveDate, today: NaiveDate) -> Option<u32> {
    today.years_since(dob)
}

/// Years left on the lease, to one decimal. Negative once expired.
pub fn years_remaining(expiry: NaiveDate, today: NaiveDate) -> f64 {
    let days = (expiry - today).num_days() as f64;
    (days / DAYS_PER_YEAR * 10.0).round() / 10.0
}

fn litigation_label(registry: &RegistryExtract) -> String {
    let lit = &registry.litigation;
    if lit.status.is_present() {
        format!("{} ({})", lit.status, lit.side)
    } else {
        lit.status.to_string()
    }
}

pub fn risk_flags(loan: &LoanSection, registry: &RegistryExtract) -> Vec<String> {
    let mut flags = Vec::new();
    if loan.default_balance.is_some() {
        flags.push("Default record present".to_string());
    }
    if loan.bankruptcy_order_no.is_some() {
        let discharged = if loan.bankruptcy_discharge_date.is_some() {
            " (discharged)"
        } else {
            ""
        };
        flags.push(format!("Bankruptcy history{}", discharged));
    }
    if !loan.narratives.is_empty() {
        flags.push("Narratives present in CBS".to_string());
    }
    if registry.litigation.status.is_present() {
        flags.push(format!("SCCB Litigation present ({})", registry.litigation.side));
    }
    if registry.bankruptcy.status.is_present() {
        flags.push("SCCB Bankruptcy present".to_string());
    }
    flags
}

/// Up to three bullets for the distinct encumbrances, first-seen order, plus a
/// "+N more" line when some were left out.
pub fn summarize_encumbrances(records: &[EncumbranceRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let unique: Vec<&EncumbranceRecord> = records
        .iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect();

    let mut bullets: Vec<String> = unique
        .iter()
        .take(MAX_ENCUMBRANCE_BULLETS)
        .filter_map(|r| encumbrance_bullet(r))
        .collect();

    if unique.len() > MAX_ENCUMBRANCE_BULLETS {
        bullets.push(format!("• +{} more item(s)", unique.len() - MAX_ENCUMBRANCE_BULLETS));
    }
    bullets
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn encumbrance_bullet(r: &EncumbranceRecord) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(kind) = non_blank(&r.kind) {
        parts.push(title_case(kind));
    }
    if let Some(cp) = non_blank(&r.counterparty) {
        parts.push(format!("({})", cp));
    }
    if let Some(instr) = non_blank(&r.instrument_no) {
        parts.push(format!("#{}", instr));
    }
    if let Some(lodged) = non_blank(&r.lodged_on) {
        parts.push(format!("lodged {}", lodged));
    }
    if let Some(reg) = non_blank(&r.registered_on) {
        parts.push(format!("registered/notified {}", reg));
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("• {}", parts.join(" ")))
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

// ── Tests ──
