use std::fmt;

/// Canonical form of a show name used for every identity comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase and strip spaces, single quotes, double quotes and periods.
pub fn normalize(name: &str) -> NormalizedKey {
    NormalizedKey(
        name.to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '\'' | '"' | '.'))
            .collect(),
    )
}

/// Shows the user asked to leave out of the report.
///
/// The raw list is normalized as one string and names are tested by
/// substring containment, so `"show a"` also hides a show called `"Show"`.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList(String);

impl IgnoreList {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw).0)
    }

    pub fn contains(&self, name: &NormalizedKey) -> bool {
        self.0.contains(name.as_str())
    }
}
