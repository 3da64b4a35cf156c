/// Supported locales and per-locale text with an explicit fallback chain
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of locales the catalog carries translations for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
    Es,
    Fr,
    Pt,
    De,
}

impl Locale {
    pub const ALL: [Locale; 6] = [
        Locale::En,
        Locale::Ru,
        Locale::Es,
        Locale::Fr,
        Locale::Pt,
        Locale::De,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
            Locale::Es => "es",
            Locale::Fr => "fr",
            Locale::Pt => "pt",
            Locale::De => "de",
        }
    }

    /// Parse a language tag. Only the primary subtag is considered, so
    /// "pt-BR" and "en_GB" resolve to their base language.
    pub fn parse(tag: &str) -> Option<Locale> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Locale::ALL.into_iter().find(|l| l.code() == primary)
    }

    /// Resolve a caller-supplied tag, falling back to `default` when absent or unsupported
    pub fn resolve(tag: Option<&str>, default: Locale) -> Locale {
        tag.and_then(Locale::parse).unwrap_or(default)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Display text keyed by locale
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<Locale, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, locale: Locale, text: impl Into<String>) -> Self {
        self.0.insert(locale, text.into());
        self
    }

    pub fn insert(&mut self, locale: Locale, text: impl Into<String>) {
        self.0.insert(locale, text.into());
    }

    pub fn get(&self, locale: Locale) -> Option<&str> {
        self.0.get(&locale).map(String::as_str)
    }

    /// Fallback chain: requested locale, then the default locale, then the raw key.
    /// Empty translations count as missing.
    pub fn resolve<'a>(&'a self, requested: Locale, default: Locale, raw_key: &'a str) -> &'a str {
        [requested, default]
            .into_iter()
            .filter_map(|locale| self.get(locale))
            .find(|text| !text.trim().is_empty())
            .unwrap_or(raw_key)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Locale, String)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (Locale, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
