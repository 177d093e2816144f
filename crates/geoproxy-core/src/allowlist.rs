//! ArcGIS host allow-list.
//!
//! The spatial-query route accepts a caller-supplied layer URL, so the only
//! thing standing between a browser and an arbitrary outbound POST is this
//! list. It is built once at startup and never mutated afterwards.
//!
//! # Matching
//!
//! | Entry                   | Matches                                       |
//! |-------------------------|-----------------------------------------------|
//! | `"gisn.tel-aviv.gov.il"`| That exact hostname, any scheme, any port.    |
//!
//! There are no wildcards and no subdomain matching: `"tel-aviv.gov.il"`
//! does **not** admit `"gisn.tel-aviv.gov.il"`.

use std::collections::HashSet;
use url::Url;

/// Municipal ArcGIS host allowed when nothing else is configured.
pub const DEFAULT_ARCGIS_HOST: &str = "gisn.tel-aviv.gov.il";

/// Immutable set of permitted upstream hostnames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllowList {
    hosts: HashSet<String>,
}

/// Default allow-list: the single municipal ArcGIS host.
impl Default for HostAllowList {
    fn default() -> Self {
        Self::new([DEFAULT_ARCGIS_HOST])
    }
}

impl HostAllowList {
    /// Build an allow-list from hostnames.
    ///
    /// Entries are trimmed and lowercased (URL hostnames are normalised to
    /// lowercase by the parser); empty entries are dropped.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { hosts }
    }

    /// Build an allow-list from a comma-separated string such as
    /// `"gisn.tel-aviv.gov.il, maps.example.org"`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Check whether `url`'s hostname is on the list.
    ///
    /// Unparseable URLs and URLs without a host are never allowed.
    pub fn is_allowed(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => parsed
                .host_str()
                .is_some_and(|host| self.hosts.contains(host)),
            Err(_) => false,
        }
    }

    /// Iterate over the permitted hostnames (unordered).
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    /// Number of permitted hostnames.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// `true` when no host is permitted, so every spatial query is refused.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
