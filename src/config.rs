use config::{Config, Environment};
use serde::Deserialize;

use crate::error::CaseError;

pub const DEFAULT_NEWS_LIMIT: usize = 5;
pub const DEFAULT_NEWS_TIMEOUT_SECS: u64 = 10;

/// Runtime settings. Search credentials come from `GOOGLE_CSE_API_KEY` and
/// `GOOGLE_CSE_ENGINE_ID`; tuning knobs from `CASE_NEWS_LIMIT` and
/// `CASE_NEWS_TIMEOUT_SECS`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub engine_id: Option<String>,
    pub news_limit: usize,
    pub news_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: None,
            engine_id: None,
            news_limit: DEFAULT_NEWS_LIMIT,
            news_timeout_secs: DEFAULT_NEWS_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, CaseError> {
        let settings = Config::builder()
            .set_default("news_limit", DEFAULT_NEWS_LIMIT as u64)?
            .set_default("news_timeout_secs", DEFAULT_NEWS_TIMEOUT_SECS)?
            .add_source(Environment::with_prefix("GOOGLE_CSE"))
            .add_source(Environment::with_prefix("CASE").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// `(api_key, engine_id)` when both are set and non-blank.
    pub fn news_credentials(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let cx = self.engine_id.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        Some((key, cx))
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.news_limit, 5);
        assert_eq!(s.news_timeout_secs, 10);
        assert!(s.news_credentials().is_none());
    }

    #[test]
    fn credentials_need_both() {
        let mut s = Settings {
            api_key: Some("key".into()),
            ..Settings::default()
        };
        assert!(s.news_credentials().is_none());

        s.engine_id = Some("   ".into());
        assert!(s.news_credentials().is_none());

        s.engine_id = Some("cx-1".into());
        assert_eq!(s.news_credentials(), Some(("key", "cx-1")));
    }
}
