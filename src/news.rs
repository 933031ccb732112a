use std::cmp::Reverse;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Settings;

const SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const PROXIMITY_WINDOW: usize = 80;
const ALLOWLIST_SCORE: u32 = 2;

pub const NEG_TERMS: &[&str] = &[
    "bankrupt",
    "bankruptcy",
    "winding up",
    "insolvency",
    "fraud",
    "scam",
    "cheat",
    "embezzle",
    "forgery",
    "lawsuit",
    "sued",
    "prosecuted",
    "charged",
    "convicted",
    "court",
    "litigation",
    "police probe",
    "investigation",
    "criminal breach of trust",
    "cbt",
];

const NEWS_ALLOWLIST: &[&str] = &[
    "straitstimes.com",
    "todayonline.com",
    "channelnewsasia.com",
    "businesstimes.com.sg",
    "asiaone.com",
    "reuters.com",
    "bloomberg.com",
    "bbc.com",
    "scmp.com",
];

const HARD_EXCLUDE: &[&str] = &[
    "instagram.com",
    "facebook.com",
    "linkedin.com",
    "x.com",
    "twitter.com",
    "isca.org.sg",
    "youtube.com",
    "tiktok.com",
    "medium.com",
    "wikipedia.org",
];

const SECOND_LEVEL_LABELS: &[&str] = &["com", "co", "org", "net", "gov", "edu", "sg", "my"];

/// One search result before filtering.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
}

/// A search result judged to concern the subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdverseNewsHit {
    pub title: String,
    pub snippet: String,
    pub link: String,
    #[serde(skip)]
    pub score: u32,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Candidate>,
}

/// Host of `url`, lower-cased, without `www.`.
fn extract_domain(url: &str) -> String {
    url.split("//")
        .nth(1)
        .unwrap_or(url)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .split('@')
        .last()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
        .trim_start_matches("www.")
        .to_string()
}

/// Registrable domain: last two labels, or last three under a second-level
/// suffix such as `com.sg`.
pub fn source_domain(url: &str) -> String {
    let host = extract_domain(url);
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    let keep = if labels.len() >= 3 && SECOND_LEVEL_LABELS.contains(&labels[labels.len() - 2]) {
        3
    } else {
        2
    };
    labels[labels.len().saturating_sub(keep)..].join(".")
}

fn name_tokens(name: &str) -> Vec<String> {
    name.split_whitespace()
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// The first two name tokens (all of them if fewer) appear in `text`.
pub fn contains_name(text: &str, name: &str) -> bool {
    let tokens = name_tokens(name);
    if tokens.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    tokens.iter().take(2).all(|t| haystack.contains(t.as_str()))
}

pub fn has_neg_term(text: &str) -> bool {
    let haystack = text.to_lowercase();
    NEG_TERMS.iter().any(|t| haystack.contains(t))
}

/// A negative term within `window` characters of the first occurrence of the
/// full name (whitespace between name parts may vary).
pub fn name_neg_near(text: &str, name: &str, window: usize) -> bool {
    let parts: Vec<String> = name.split_whitespace().map(|p| regex::escape(&p.to_lowercase())).collect();
    if parts.is_empty() {
        return false;
    }
    let Ok(name_re) = Regex::new(&parts.join(r"\s+")) else {
        return false;
    };

    let haystack = text.to_lowercase();
    let Some(m) = name_re.find(&haystack) else {
        return false;
    };

    let start = floor_char_boundary(&haystack, m.start().saturating_sub(window));
    let end = ceil_char_boundary(&haystack, (m.end() + window).min(haystack.len()));
    has_neg_term(&haystack[start..end])
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn is_allowlisted(domain: &str) -> bool {
    NEWS_ALLOWLIST.contains(&domain)
}

/// Keep candidates that mention `subject` alongside a negative term, rank
/// reputable outlets first, and keep at most `limit`.
pub fn filter(subject: &str, candidates: &[Candidate], limit: usize) -> Vec<AdverseNewsHit> {
    let mut hits: Vec<AdverseNewsHit> = candidates
        .iter()
        .filter_map(|c| judge(subject, c))
        .collect();

    hits.sort_by_key(|h| Reverse(h.score));
    hits.truncate(limit);
    hits
}

fn judge(subject: &str, candidate: &Candidate) -> Option<AdverseNewsHit> {
    let title = candidate.title.trim();
    let snippet = candidate.snippet.trim();
    let link = candidate.link.trim();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let domain = source_domain(link);
    if HARD_EXCLUDE.contains(&domain.as_str()) {
        debug!(%domain, "excluded source");
        return None;
    }

    let combined = format!("{} {}", title, snippet);
    if !contains_name(&combined, subject) || !has_neg_term(&combined) {
        return None;
    }

    let allowlisted = is_allowlisted(&domain);
    if !name_neg_near(&combined, subject, PROXIMITY_WINDOW) && !allowlisted {
        return None;
    }

    Some(AdverseNewsHit {
        title: title.to_string(),
        snippet: snippet.to_string(),
        link: link.to_string(),
        score: if allowlisted { ALLOWLIST_SCORE } else { 0 },
    })
}

/// Exact-name query OR-ing the negative terms, without PDFs and social sites.
pub fn build_query(name: &str) -> String {
    let terms = NEG_TERMS
        .iter()
        .map(|t| {
            if t.contains(' ') {
                format!("\"{}\"", t)
            } else {
                t.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ");
    format!(
        "\"{}\" ({}) -filetype:pdf -site:linkedin.com -site:instagram.com -site:facebook.com",
        name, terms
    )
}

/// Results requested per search: five per wanted hit, within the API's 1..=10.
fn search_size(limit: usize) -> usize {
    limit.saturating_mul(5).clamp(1, 10)
}

/// Web search client. Only built when both credentials are configured.
pub struct NewsClient {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
}

impl NewsClient {
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let (api_key, engine_id) = settings.news_credentials()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.news_timeout_secs))
            .build()
            .map_err(|e| warn!("Failed to build search client: {}", e))
            .ok()?;
        Some(NewsClient {
            client,
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
        })
    }

    /// Raw candidates for `name`. Failures are logged and yield nothing.
    pub async fn search(&self, name: &str, limit: usize) -> Vec<Candidate> {
        let num = search_size(limit).to_string();
        let query = build_query(name);
        let params = [
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("q", query.as_str()),
            ("num", num.as_str()),
            ("safe", "active"),
            ("gl", "sg"),
            ("lr", "lang_en"),
            ("dateRestrict", "y1"),
        ];

        let resp = match self.client.get(SEARCH_URL).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Adverse-news request failed: {}", e);
                return Vec::new();
            }
        };
        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "Adverse-news search returned an error status");
            return Vec::new();
        }

        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Adverse-news response unreadable: {}", e);
                return Vec::new();
            }
        };
        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Vec<Candidate> {
    match serde_json::from_str::<SearchResponse>(body) {
        Ok(resp) => resp.items,
        Err(e) => {
            warn!("Malformed adverse-news response: {}", e);
            Vec::new()
        }
    }
}

/// Search and filter. Never fails: without credentials or a name the result is
/// simply empty.
pub async fn adverse_news(settings: &Settings, name: &str, limit: usize) -> Vec<AdverseNewsHit> {
    let name = name.trim();
    if name.is_empty() {
        debug!("No subject name, adverse-news search skipped");
        return Vec::new();
    }
    let Some(client) = NewsClient::from_settings(settings) else {
        debug!("Search credentials not configured, adverse-news search skipped");
        return Vec::new();
    };

    let candidates = client.search(name, limit).await;
    let hits = filter(name, &candidates, limit);
    info!(
        candidates = candidates.len(),
        hits = hits.len(),
        "Adverse-news search complete"
    );
    hits
}

// ── Tests ──
