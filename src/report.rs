use std::path::{Path, PathBuf};

use tracing::info;

use crate::assemble::CaseRecord;
use crate::db::SqliteReport;
use crate::error::CaseError;

pub const CASE_DATA_SHEET: &str = "Case Data";
pub const SUMMARY_SHEET: &str = "Summary";
pub const RAW_SHEET: &str = "SCCB_Raw";

const ENCUMBRANCE_COLUMNS: &[&str] = &[
    "Type",
    "Instrument No",
    "Counterparty",
    "Charge Type",
    "Lodged On",
    "Registered/Notified On",
];
const MAX_NEWS_ITEMS: usize = 5;

/// A grid of text cells. Row and column order is significant; blank rows
/// separate sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub hidden: bool,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    fn blank(&mut self) {
        self.rows.push(Vec::new());
    }

    /// Title, Field/Value header, then the non-empty pairs. Nothing at all when
    /// every value is empty.
    fn add_section(&mut self, title: &str, kv: Vec<(&str, Option<String>)>) {
        let present: Vec<_> = kv
            .into_iter()
            .filter_map(|(k, v)| v.filter(|v| !v.trim().is_empty()).map(|v| (k, v)))
            .collect();
        if present.is_empty() {
            return;
        }
        self.push_row([title]);
        self.push_row(["Field", "Value"]);
        for (k, v) in present {
            self.push_row([k.to_string(), v]);
        }
        self.blank();
    }

    /// Blank fields to be completed by hand.
    fn add_placeholder(&mut self, title: &str, fields: &[&str]) {
        self.push_row([title]);
        self.push_row(["Field", "Value"]);
        for field in fields {
            self.push_row([*field, ""]);
        }
        self.blank();
    }

    fn add_table(&mut self, title: &str, columns: &[&str], rows: Vec<Vec<String>>) {
        if rows.is_empty() {
            return;
        }
        self.push_row([title]);
        self.push_row(columns.iter().copied());
        for row in rows {
            self.push_row(row);
        }
        self.blank();
    }

    fn add_kv(&mut self, label: &str, value: Option<String>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.push_row([label.to_string(), value]);
        }
    }

    /// Value cell of the first row labelled `label`.
    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.first().is_some_and(|c| c == label))
            .and_then(|r| r.get(1))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// Something that persists a finished case record.
pub trait ReportRenderer {
    fn render(&self, record: &CaseRecord) -> Result<(), CaseError>;
}

/// Serialized case record as pretty JSON.
pub struct JsonReport {
    path: PathBuf,
}

impl JsonReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonReport { path: path.into() }
    }
}

impl ReportRenderer for JsonReport {
    fn render(&self, record: &CaseRecord) -> Result<(), CaseError> {
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, json).map_err(|source| CaseError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "JSON report written");
        Ok(())
    }
}

/// `.json` gets the JSON renderer, anything else the SQLite workbook.
pub fn renderer_for(path: &Path) -> Box<dyn ReportRenderer> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Box::new(JsonReport::new(path))
    } else {
        Box::new(SqliteReport::new(path))
    }
}

fn opt<T: ToString>(v: &Option<T>) -> Option<String> {
    v.as_ref().map(ToString::to_string)
}

fn bullets(lines: &[String]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    Some(
        lines
            .iter()
            .map(|l| format!("• {}", l))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Join the present parts with `sep`; `None` when none are present.
fn join_present(parts: &[&Option<String>], sep: &str) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.trim().is_empty())
        .collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(sep))
    }
}

pub fn build_workbook(record: &CaseRecord) -> Workbook {
    let mut sheets = vec![case_data_sheet(record), summary_sheet(record)];
    if !record.evidence.is_empty() {
        sheets.push(raw_sheet(record));
    }
    Workbook { sheets }
}

fn case_data_sheet(record: &CaseRecord) -> Sheet {
    let (p, l, b, s) = (&record.property, &record.loan, &record.borrower, &record.summary);
    let mut ws = Sheet::new(CASE_DATA_SHEET);

    ws.add_section(
        "Property Details",
        vec![
            ("Property Address", p.address.clone()),
            ("Postal Code", p.postal_code.clone()),
            ("Property Type", p.property_type.clone()),
            ("Tenure", p.tenure.clone()),
            ("Leasehold Years", p.lease_duration.clone()),
            ("Lease Start", p.lease_start.clone()),
            ("Lease Expiry", p.lease_expiry.clone()),
            ("Years Remaining (approx.)", p.years_remaining.map(|y| format!("{:.1}", y))),
            ("Lot Area (SqM)", opt(&p.lot_area_sqm)),
            ("Lot Area (SqFt)", opt(&p.lot_area_sqft)),
            ("Lot Number", p.lot_number.clone()),
            ("Owners", p.owners.clone()),
        ],
    );

    let enc_rows: Vec<Vec<String>> = record
        .encumbrances
        .iter()
        .map(|e| {
            [
                &e.kind,
                &e.instrument_no,
                &e.counterparty,
                &e.charge_type,
                &e.lodged_on,
                &e.registered_on,
            ]
            .into_iter()
            .map(|v| v.clone().unwrap_or_default())
            .collect()
        })
        .collect();
    ws.add_table("Encumbrances: Charges & Mortgages", ENCUMBRANCE_COLUMNS, enc_rows);

    ws.add_section(
        "Loan Detail & Outstanding",
        vec![
            ("Credit Score", l.credit_score.clone()),
            ("Risk Grade", l.risk_grade.clone()),
            ("Total Credit Limit", l.total_credit_limit.clone()),
            ("Total Outstanding Balance", l.total_outstanding.clone()),
            ("Previous Enquiries (Last 12m)", l.enquiries_12m.clone()),
            ("Default Record Loaded", l.default_loaded.clone()),
            ("Default Original Amount", l.default_original.clone()),
            ("Default Balance", l.default_balance.clone()),
            ("Bankruptcy Order No", l.bankruptcy_order_no.clone()),
            ("Bankruptcy Order Date", l.bankruptcy_order_date.clone()),
            ("Bankruptcy Discharge No", l.bankruptcy_discharge_no.clone()),
            ("Bankruptcy Discharge Date", l.bankruptcy_discharge_date.clone()),
            ("CBS Narratives", bullets(&l.narratives)),
        ],
    );

    ws.add_section(
        "Individual Borrower / PG",
        vec![
            ("Name (CBS)", b.cbs_name.clone()),
            ("NRIC/ID (CBS)", b.cbs_id.clone()),
            ("Date of Birth", b.date_of_birth.clone()),
            ("Age (years)", opt(&b.age)),
            ("Postal Code (CBS)", b.cbs_postal_code.clone()),
            ("Name (ACRA)", b.acra_name.clone()),
            ("NRIC/ID (ACRA)", b.acra_id.clone()),
            ("Residential / ACRA Address", b.acra_address.clone()),
            ("Address Updated", b.address_updated.clone()),
            ("Current Company", b.company.clone()),
            ("UEN", b.company_uen.clone()),
            ("Position", b.position.clone()),
            ("Appointment Date", b.appointment_date.clone()),
            ("SCCB Bankruptcy Status", Some(b.bankruptcy_status.bankruptcy_label().to_string())),
            ("SCCB Litigation Status", Some(b.litigation_status.to_string())),
            ("SCCB Litigation Sides", Some(b.litigation_side.to_string())),
        ],
    );

    let mut summary = vec![
        ("Overall Risk Flags", Some(s.risk_flags_text())),
        ("Borrower Name", s.borrower_name.clone()),
        ("NRIC/ID", s.borrower_id.clone()),
        ("Property Address", s.property_address.clone()),
        ("Encumbrances (compact)", Some(s.encumbrances.join("\n"))),
        ("SCCB Litigation", Some(s.litigation.clone())),
        ("SCCB Bankruptcy", Some(s.bankruptcy.clone())),
    ];
    if s.adverse_news_count > 0 {
        summary.push(("Adverse News", Some(format!("{} item(s)", s.adverse_news_count))));
    }
    ws.add_section("Loan Summary", summary);

    let news = record
        .adverse_news
        .iter()
        .take(MAX_NEWS_ITEMS)
        .map(|h| format!("• {} - {}\n{}", h.title, h.link, h.snippet).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n\n");
    ws.add_section("Adverse News (Top Hits)", vec![("Items", Some(news))]);

    ws.add_placeholder("Broker Information", &["Broker Name", "Contact", "Notes"]);
    ws.add_section(
        "Attachments",
        record
            .attachments
            .iter()
            .map(|a| ("Attachment", Some(a.clone())))
            .collect(),
    );
    ws.add_placeholder(
        "Revenue",
        &["Property Valuation", "Brokerage Fee (%)", "Brokerage Fee ($)", "Other Fees"],
    );
    ws
}

fn summary_sheet(record: &CaseRecord) -> Sheet {
    let (p, l, b, s) = (&record.property, &record.loan, &record.borrower, &record.summary);
    let mut ws = Sheet::new(SUMMARY_SHEET);
    ws.push_row(["Case Summary"]);
    ws.blank();

    ws.add_kv("Borrower", s.borrower_name.clone());
    ws.add_kv("NRIC/ID", s.borrower_id.clone());
    ws.add_kv("DOB / Age", join_present(&[&b.date_of_birth, &opt(&b.age)], " / "));
    ws.add_kv("Property Address", p.address.clone());
    ws.add_kv(
        "Lot / Area (SqM)",
        join_present(&[&p.lot_number, &opt(&p.lot_area_sqm)], " / "),
    );
    ws.add_kv("Area (SqFt)", opt(&p.lot_area_sqft));
    ws.add_kv("Tenure / Lease", join_present(&[&p.tenure, &p.lease_duration], " | "));
    ws.add_kv(
        "Lease Commence -> Expiry",
        join_present(&[&p.lease_start, &p.lease_expiry], " -> "),
    );
    ws.add_kv("Years Remaining (approx.)", p.years_remaining.map(|y| format!("{:.1}", y)));
    ws.add_kv("Encumbrances", Some(s.encumbrances.join("\n")));
    ws.add_kv("Credit Score / Grade", join_present(&[&l.credit_score, &l.risk_grade], " / "));
    ws.add_kv(
        "Totals (Limit / O/S)",
        join_present(&[&l.total_credit_limit, &l.total_outstanding], " / "),
    );
    let defaults = match &l.default_balance {
        Some(balance) => format!(
            "Loaded {} | Balance {}",
            l.default_loaded.as_deref().unwrap_or(""),
            balance
        ),
        None => "None seen".to_string(),
    };
    ws.add_kv("Defaults", Some(defaults));
    ws.add_kv("SCCB Litigation", Some(s.litigation.clone()));
    ws.add_kv("SCCB Bankruptcy", Some(s.bankruptcy.clone()));
    ws.add_kv("Risk Flags", Some(s.risk_flags_text()));
    if s.adverse_news_count > 0 {
        ws.add_kv("Adverse News", Some(format!("{} item(s)", s.adverse_news_count)));
    }
    ws.add_kv("Attachments", Some(record.attachments.join(", ")));
    ws
}

fn raw_sheet(record: &CaseRecord) -> Sheet {
    let mut ws = Sheet::new(RAW_SHEET);
    ws.hidden = true;
    let blocks = [
        ("Litigation - As Plaintiff", &record.evidence.litigation_plaintiff),
        ("Litigation - As Defendant", &record.evidence.litigation_defendant),
        ("Bankruptcy / Winding Up", &record.evidence.bankruptcy),
    ];
    for (title, content) in blocks {
        let Some(content) = content else { continue };
        ws.push_row([title]);
        ws.push_row(["Text", "Content"]);
        ws.push_row(["Raw", content.as_str()]);
        ws.blank();
    }
    ws
}

// ── Tests ──
