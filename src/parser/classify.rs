use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:NO RECORDS? FOUND|NO RECORDS?|NONE|NIL)\b").unwrap()
});
static CASE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,5}/[0-9A-Z]+/\d{2,4}\b").unwrap());
// Loose: also matches dates and page counters ("1/12"). Kept because some
// registry layouts print the case number as a bare "123/2021".
static NUMERIC_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,4}/\d{2,4}\b").unwrap());
static NON_LETTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Z ]+").unwrap());
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-_ ]{2,}$").unwrap());
static NOT_APPLICABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:N/?A|NA)$").unwrap());

const HEADER_TOKENS: &[&str] = &[
    "CASE", "CASE NO", "CASENO", "CASE NUMBER", "NO", "NUMBER", "COURT", "CITATION", "DATE",
    "FILED", "FILING DATE", "HEARING DATE", "PARTY", "PARTIES", "PLAINTIFF", "DEFENDANT",
    "RESPONDENT", "STATUS", "OUTCOME", "REMARKS", "REFERENCE", "AMOUNT", "SUMS",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    NoRecord,
    Present,
}

impl Status {
    pub fn is_present(self) -> bool {
        self == Status::Present
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::NoRecord => "NO RECORD FOUND",
            Status::Present => "Present",
        }
    }

    /// Bankruptcy rows print absence as "NIL".
    pub fn bankruptcy_label(self) -> &'static str {
        match self {
            Status::NoRecord => "NIL",
            Status::Present => "Present",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which litigation side(s) carry a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    None,
    Plaintiff,
    Defendant,
    Both,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::None => "None",
            Side::Plaintiff => "Plaintiff",
            Side::Defendant => "Defendant",
            Side::Both => "Both",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of classifying one section. `evidence` is only set when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub status: Status,
    pub rule: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Verdict {
    pub fn is_present(&self) -> bool {
        self.status.is_present()
    }
}

/// Raw slice plus its whitespace-collapsed upper-case form.
pub struct Candidate<'a> {
    pub raw: &'a str,
    pub norm: String,
}

impl<'a> Candidate<'a> {
    pub fn new(raw: &'a str) -> Self {
        let norm = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        Candidate { raw, norm }
    }
}

pub struct Rule {
    pub name: &'static str,
    pub test: fn(&Candidate) -> bool,
    pub outcome: Status,
}

pub const LITIGATION_RULES: &[Rule] = &[
    Rule { name: "empty", test: is_empty, outcome: Status::NoRecord },
    Rule { name: "negative_evidence", test: has_negative_evidence, outcome: Status::NoRecord },
    Rule { name: "header_only", test: is_header_only, outcome: Status::NoRecord },
    Rule { name: "case_token", test: has_case_token, outcome: Status::Present },
    Rule { name: "numeric_row", test: has_numeric_row, outcome: Status::Present },
    Rule { name: "default", test: always, outcome: Status::NoRecord },
];

/// Any bankruptcy section with more than layout that doesn't state absence
/// counts as a record.
pub const BANKRUPTCY_RULES: &[Rule] = &[
    Rule { name: "empty", test: is_empty, outcome: Status::NoRecord },
    Rule { name: "negative_evidence", test: has_negative_evidence, outcome: Status::NoRecord },
    Rule { name: "header_only", test: is_header_only, outcome: Status::NoRecord },
    Rule { name: "content", test: always, outcome: Status::Present },
];

fn is_empty(c: &Candidate) -> bool {
    c.norm.is_empty()
}

fn has_negative_evidence(c: &Candidate) -> bool {
    NEGATIVE_RE.is_match(&c.norm)
}

fn is_header_only(c: &Candidate) -> bool {
    c.raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .all(is_noise_line)
}

fn is_noise_line(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    // Case numbers are short letter runs too ("HC/S 1/2020").
    if CASE_TOKEN_RE.is_match(&upper) || NUMERIC_ROW_RE.is_match(&upper) {
        return false;
    }
    let letters = NON_LETTER_RE.replace_all(&upper, " ");
    let words: Vec<&str> = letters.split_whitespace().collect();
    if !words.is_empty()
        && words
            .iter()
            .all(|w| w.len() <= 2 || HEADER_TOKENS.contains(w))
    {
        return true;
    }
    SEPARATOR_RE.is_match(line) || NOT_APPLICABLE_RE.is_match(line)
}

fn has_case_token(c: &Candidate) -> bool {
    CASE_TOKEN_RE.is_match(&c.norm)
}

fn has_numeric_row(c: &Candidate) -> bool {
    NUMERIC_ROW_RE.is_match(&c.norm)
}

fn always(_: &Candidate) -> bool {
    true
}

/// First rule in `rules` whose predicate holds for `text`.
pub fn first_matching_rule<'r>(rules: &'r [Rule], text: &str) -> Option<&'r Rule> {
    let candidate = Candidate::new(text);
    rules.iter().find(|rule| (rule.test)(&candidate))
}

pub fn classify_with(rules: &[Rule], text: &str) -> Verdict {
    let (status, rule) = match first_matching_rule(rules, text) {
        Some(rule) => (rule.outcome, rule.name),
        None => (Status::NoRecord, "default"),
    };
    let evidence = status.is_present().then(|| text.trim().to_string());
    Verdict { status, rule, evidence }
}

/// Classify a litigation-style section.
pub fn classify(text: &str) -> Verdict {
    classify_with(LITIGATION_RULES, text)
}

pub fn classify_bankruptcy(text: &str) -> Verdict {
    let verdict = classify_with(BANKRUPTCY_RULES, text);
    debug!(status = %verdict.status, rule = verdict.rule, "bankruptcy classified");
    verdict
}

/// Combined litigation verdict over the plaintiff and defendant sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LitigationVerdict {
    pub status: Status,
    pub side: Side,
    pub plaintiff: Verdict,
    pub defendant: Verdict,
}

impl LitigationVerdict {
    /// Evidence of the sides that carry a record.
    pub fn evidence(&self) -> (Option<&str>, Option<&str>) {
        (
            self.plaintiff.evidence.as_deref(),
            self.defendant.evidence.as_deref(),
        )
    }
}

pub fn litigation(plaintiff: &str, defendant: &str) -> LitigationVerdict {
    let plaintiff = classify(plaintiff);
    let defendant = classify(defendant);

    let side = match (plaintiff.is_present(), defendant.is_present()) {
        (false, false) => Side::None,
        (true, true) => Side::Both,
        (true, false) => Side::Plaintiff,
        (false, true) => Side::Defendant,
    };
    let status = if side == Side::None {
        Status::NoRecord
    } else {
        Status::Present
    };

    debug!(
        %status,
        %side,
        plaintiff_rule = plaintiff.rule,
        defendant_rule = defendant.rule,
        "litigation classified"
    );
    LitigationVerdict {
        status,
        side,
        plaintiff,
        defendant,
    }
}

// ── Tests ──
