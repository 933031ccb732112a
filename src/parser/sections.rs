use std::sync::LazyLock;

use regex::Regex;

static LABEL_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z ()/&\-':]{2,}$").unwrap());

pub const LITIGATION_PLAINTIFF: &str = "LITIGATION - AS PLAINTIFF";
pub const LITIGATION_DEFENDANT: &str = "LITIGATION - AS DEFENDANT";
pub const LITIGATION: &str = "LITIGATION";
pub const BANKRUPTCY: &str = "BANKRUPTCY";
pub const NARRATIVES: &str = "NARRATIVES";
pub const DEFAULT_RECORDS: &str = "DEFAULT RECORDS";
pub const PREVIOUS_ENQUIRIES: &str = "PREVIOUS ENQUIRIES";

pub const AS_PLAINTIFF: &str = "AS PLAINTIFF";
pub const AS_DEFENDANT: &str = "AS DEFENDANT";

static STANDARD: LazyLock<HeaderRegistry> = LazyLock::new(HeaderRegistry::standard);

/// Text between a located header and the next known header. Borrowed from the
/// document it was cut from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionSlice<'a> {
    text: &'a str,
}

impl<'a> SectionSlice<'a> {
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
struct HeaderDef {
    name: String,
    /// Upper-cased, longest first.
    variants: Vec<String>,
}

/// Named section headers and their synonyms. Every variant of every entry is
/// also an end boundary for any located section.
#[derive(Debug, Clone, Default)]
pub struct HeaderRegistry {
    headers: Vec<HeaderDef>,
}

impl HeaderRegistry {
    /// Headers seen across the registry and credit-bureau documents.
    pub fn standard() -> Self {
        Self::default()
            .with_header(LITIGATION_PLAINTIFF, &[LITIGATION_PLAINTIFF])
            .with_header(LITIGATION_DEFENDANT, &[LITIGATION_DEFENDANT])
            .with_header(LITIGATION, &[LITIGATION])
            .with_header(
                BANKRUPTCY,
                &[BANKRUPTCY, "BANKRUPTCY / WINDING UP", "BANKRUPTCY & WINDING UP"],
            )
            .with_header(
                NARRATIVES,
                &[NARRATIVES, "NARRATIVE", "ACCOUNT NARRATIVES", "ACCOUNTS NARRATIVE"],
            )
            .with_header(DEFAULT_RECORDS, &[DEFAULT_RECORDS])
            .with_header(PREVIOUS_ENQUIRIES, &[PREVIOUS_ENQUIRIES])
    }

    /// Standard headers plus the side markers found inside a combined
    /// litigation block.
    pub fn litigation_sides() -> Self {
        Self::standard()
            .with_header(AS_PLAINTIFF, &["AS PLAINTIFF/CLAIMANT", AS_PLAINTIFF])
            .with_header(AS_DEFENDANT, &[AS_DEFENDANT])
    }

    /// Register a header (or extra synonyms for an existing one).
    pub fn with_header(mut self, name: &str, variants: &[&str]) -> Self {
        let mut upper: Vec<String> = variants
            .iter()
            .chain(std::iter::once(&name))
            .map(|v| v.trim().to_ascii_uppercase())
            .filter(|v| !v.is_empty())
            .collect();

        match self.headers.iter_mut().find(|h| h.name.eq_ignore_ascii_case(name)) {
            Some(existing) => existing.variants.append(&mut upper),
            None => self.headers.push(HeaderDef {
                name: name.to_string(),
                variants: upper,
            }),
        }

        for header in &mut self.headers {
            header.variants.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            header.variants.dedup();
        }
        self
    }

    /// Find `header` (case-insensitive) and cut the text after it up to the
    /// nearest following line-start header. Absence is an empty slice.
    pub fn locate<'a>(&self, text: &'a str, header: &str) -> SectionSlice<'a> {
        let upper = text.to_ascii_uppercase();
        let variants = self.variants_for(header);

        // Earliest occurrence wins; at a shared position the longest variant does.
        let hit = variants
            .iter()
            .filter_map(|v| upper.find(v.as_str()).map(|pos| (pos, v.len())))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let Some((pos, len)) = hit else {
            return SectionSlice::default();
        };

        let start = pos + len;
        let end = self.next_boundary(&upper, start).unwrap_or(text.len());
        SectionSlice {
            text: strip_label_line(&text[start..end]),
        }
    }

    fn variants_for(&self, header: &str) -> Vec<String> {
        let wanted = header.trim().to_ascii_uppercase();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(&wanted))
            .map(|h| h.variants.clone())
            .unwrap_or_else(|| vec![wanted])
    }

    fn next_boundary(&self, upper: &str, start: usize) -> Option<usize> {
        let rest = &upper[start..];
        self.headers
            .iter()
            .flat_map(|h| &h.variants)
            .filter_map(|v| rest.find(&format!("\n{}", v)).map(|i| start + i))
            .min()
    }
}

/// Locate `header` using the standard header registry.
pub fn locate<'a>(text: &'a str, header: &str) -> SectionSlice<'a> {
    STANDARD.locate(text, header)
}

/// Drop the remainder of the header line when it is only an upper-case label
/// (e.g. "SEARCH RESULTS"), then trim. Lines with digits are never labels.
fn strip_label_line(block: &str) -> &str {
    let first_end = block.find('\n');
    let first = first_end.map_or(block, |i| &block[..i]);
    let body = if LABEL_LINE_RE.is_match(first.trim()) {
        first_end.map_or("", |i| &block[i + 1..])
    } else {
        block
    };
    body.trim()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_header_is_empty() {
        let slice = locate("Nothing relevant in here\nat all", BANKRUPTCY);
        assert!(slice.is_empty());
        assert_eq!(slice.as_str(), "");
    }

    #[test]
    fn empty_text_and_empty_header() {
        assert!(locate("", LITIGATION).is_empty());
        assert!(locate("LITIGATION\nHC/S 1/2020", "").is_empty());
    }

    #[test]
    fn slice_ends_at_next_header() {
        let text = "LITIGATION - AS PLAINTIFF\nHC/S 12/2021 TAN\nLITIGATION - AS DEFENDANT\nNO RECORD FOUND\nBANKRUPTCY\nNIL";
        assert_eq!(locate(text, LITIGATION_PLAINTIFF).as_str(), "HC/S 12/2021 TAN");
        assert_eq!(locate(text, LITIGATION_DEFENDANT).as_str(), "NO RECORD FOUND");
        assert_eq!(locate(text, BANKRUPTCY).as_str(), "NIL");
    }

    #[test]
    fn case_insensitive_search() {
        let text = "Bankruptcy\nno record found";
        assert_eq!(locate(text, BANKRUPTCY).as_str(), "no record found");
    }

    #[test]
    fn longest_synonym_consumed() {
        let text = "BANKRUPTCY / WINDING UP\nDC/B 44/2019 ORDER MADE";
        assert_eq!(locate(text, BANKRUPTCY).as_str(), "DC/B 44/2019 ORDER MADE");
    }

    #[test]
    fn synonym_variants_act_as_boundaries() {
        let text = "LITIGATION\nHC/S 1/2020\nBANKRUPTCY & WINDING UP\nNIL";
        assert_eq!(locate(text, LITIGATION).as_str(), "HC/S 1/2020");
    }

    #[test]
    fn boundaries_must_start_a_line() {
        let text = "NARRATIVES\nAccount closed after litigation settled\nDEFAULT RECORDS\n01/02/2020";
        assert_eq!(
            locate(text, NARRATIVES).as_str(),
            "Account closed after litigation settled"
        );
    }

    #[test]
    fn label_remainder_stripped() {
        let text = "LITIGATION SEARCH RESULTS\nHC/S 1/2020 LIM";
        assert_eq!(locate(text, LITIGATION).as_str(), "HC/S 1/2020 LIM");
    }

    #[test]
    fn case_number_on_header_line_kept() {
        let text = "LITIGATION - AS PLAINTIFF HC/S 1/2020\nLITIGATION - AS DEFENDANT\nNIL";
        assert_eq!(locate(text, LITIGATION_PLAINTIFF).as_str(), "HC/S 1/2020");
    }

    #[test]
    fn content_on_next_line_kept() {
        // Only the remainder of the header line is a candidate label.
        let text = "LITIGATION - AS PLAINTIFF\nHC/OS 123/2021 TAN AH KOW";
        assert_eq!(
            locate(text, LITIGATION_PLAINTIFF).as_str(),
            "HC/OS 123/2021 TAN AH KOW"
        );
    }

    #[test]
    fn unregistered_header_searched_literally() {
        let text = "Intro\nCHARGES\nsomething\nBANKRUPTCY\nNIL";
        assert_eq!(locate(text, "charges").as_str(), "something");
    }

    #[test]
    fn registry_is_extensible() {
        let registry = HeaderRegistry::standard().with_header("INSOLVENCY", &["INSOLVENCY"]);
        let text = "LITIGATION\nHC/S 1/2020\nINSOLVENCY\nNIL";
        assert_eq!(registry.locate(text, LITIGATION).as_str(), "HC/S 1/2020");
        assert_eq!(locate(text, LITIGATION).as_str(), "HC/S 1/2020\nINSOLVENCY\nNIL");
    }

    #[test]
    fn extra_synonyms_merge_into_existing_header() {
        let registry =
            HeaderRegistry::standard().with_header(BANKRUPTCY, &["BANKRUPTCY SEARCH"]);
        let text = "BANKRUPTCY SEARCH\nNIL";
        assert_eq!(registry.locate(text, BANKRUPTCY).as_str(), "NIL");
    }

    #[test]
    fn side_markers_bound_combined_block() {
        let registry = HeaderRegistry::litigation_sides();
        let text = "AS PLAINTIFF/CLAIMANT\nHC/S 9/2022\nAS DEFENDANT\nNO RECORD FOUND";
        assert_eq!(registry.locate(text, AS_PLAINTIFF).as_str(), "HC/S 9/2022");
        assert_eq!(registry.locate(text, AS_DEFENDANT).as_str(), "NO RECORD FOUND");
    }
}
