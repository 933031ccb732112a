pub mod classify;
pub mod extract;
pub mod fields;
pub mod sections;

use extract::ExtractedDocs;

/// Raw text of the three documents of one case.
#[derive(Debug, Clone, Default)]
pub struct CaseTexts {
    pub property: String,
    pub registry: String,
    pub credit: String,
}

/// Two-pass pipeline: text → field maps + section slices → verdicts.
pub fn process_case(texts: &CaseTexts) -> ExtractedDocs {
    extract::extract_all(&texts.property, &texts.registry, &texts.credit)
}
