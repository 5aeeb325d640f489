//! Host allow-list for upstream fetches.
//!
//! Every URL the proxy fetches, the source image and each overlay image
//! named inside the pipeline, goes through [`AllowList::is_allowed`]. An
//! empty list allows every host; otherwise the host must end with one of
//! the configured suffixes, so `example.com` also permits `img.example.com`.

use reqwest::Url;

use crate::config::AccessConfig;

/// Immutable allow-list of permitted host suffixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    suffixes: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(&config.allow_list)
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Check whether `url` may be fetched.
    ///
    /// A URL without a parsable host is never allowed, even when the list
    /// is empty: there is nothing the fetcher could connect to.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };

        self.suffixes.is_empty() || self.suffixes.iter().any(|suffix| host.ends_with(suffix))
    }
}

/// Split a comma-separated allow-list, trimming entries and dropping empties.
pub fn parse_allow_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercased host of an absolute URL, parsed the same way the fetcher parses it
fn host_of(url: &str) -> Option<String> {
    let url = Url::parse(url.trim()).ok()?;
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}
