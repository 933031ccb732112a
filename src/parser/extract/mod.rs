pub mod credit;
pub mod property;
pub mod registry;

use serde::Serialize;

use super::fields::FieldMap;
use registry::RegistryExtract;

/// Field maps and verdicts for the three documents of one case.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedDocs {
    pub property: FieldMap,
    pub registry: RegistryExtract,
    pub credit: FieldMap,
}

/// Run the three extractors. They share nothing, so they run side by side.
pub fn extract_all(property_text: &str, registry_text: &str, credit_text: &str) -> ExtractedDocs {
    let (property, (registry, credit)) = rayon::join(
        || property::extract(property_text),
        || {
            rayon::join(
                || registry::extract(registry_text),
                || credit::extract(credit_text),
            )
        },
    );

    ExtractedDocs {
        property,
        registry,
        credit,
    }
}

// ── Tests ──
