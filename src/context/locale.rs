//! Preferred locales of the caller.

use serde::{Deserialize, Serialize};

/// Ordered language tags, most preferred first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleFrame {
    pub preferred_locales: Vec<String>,
}

fn language_of(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}

fn same_tag(a: &str, b: &str) -> bool {
    a.replace('_', "-").eq_ignore_ascii_case(&b.replace('_', "-"))
}

impl LocaleFrame {
    pub fn new<I, S>(preferred_locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preferred_locales: preferred_locales.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse an `Accept-Language` value, honouring `q` weights.
    pub fn from_accept_language(header: &str) -> Self {
        let mut weighted: Vec<(f32, usize, String)> = header
            .split(',')
            .enumerate()
            .filter_map(|(i, part)| {
                let mut pieces = part.split(';');
                let tag = pieces.next()?.trim();
                if tag.is_empty() || tag == "*" {
                    return None;
                }
                let q = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((q, i, tag.to_string()))
            })
            .collect();
        weighted.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        Self::new(weighted.into_iter().map(|(_, _, tag)| tag))
    }

    /// Pick the best of `available` for these preferences.
    ///
    /// Preferences are walked in order. An exact tag wins; otherwise the bare
    /// language is tried, unless that language appears later in the list, in
    /// which case the walk continues so the more specific preference can
    /// match first. `None` means the caller should use its root bundle.
    pub fn best_match(&self, available: &[&str]) -> Option<String> {
        let find = |tag: &str| {
            available
                .iter()
                .find(|a| same_tag(a, tag))
                .map(|a| a.to_string())
        };

        for (i, preferred) in self.preferred_locales.iter().enumerate() {
            if let Some(found) = find(preferred) {
                return Some(found);
            }
            let language = language_of(preferred);
            if same_tag(language, preferred) {
                continue;
            }
            let listed_later = self.preferred_locales[i + 1..]
                .iter()
                .any(|later| same_tag(later, language));
            if listed_later {
                continue;
            }
            if let Some(found) = find(language) {
                return Some(found);
            }
        }
        None
    }
}
