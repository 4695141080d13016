use std::collections::HashMap;

use chrono::NaiveDate;

/// Lowercased-variant → canonical folder name mapping, loaded once at
/// startup from whatever configuration source the process is given
/// (environment-supplied JSON in the default binary; a literal map in
/// tests). Unknown shows fall back to a slugified form.
#[derive(Debug, Clone, Default)]
pub struct ShowMappings(HashMap<String, String>);

impl ShowMappings {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(entries.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect())
    }

    pub fn lookup(&self, raw_name: &str) -> Option<&str> {
        self.0.get(&raw_name.to_lowercase()).map(String::as_str)
    }
}

/// Deterministic mapping from extracted metadata to canonical episode IDs
/// and filesystem paths. Pure and stateless beyond the loaded mapping
/// table; every other component that needs a path or ID goes through here.
#[derive(Debug, Clone, Default)]
pub struct NamingService {
    mappings: ShowMappings,
}

pub const UNCATEGORIZED: &str = "_uncategorized";

impl NamingService {
    pub fn new(mappings: ShowMappings) -> Self {
        Self { mappings }
    }

    /// Case-insensitive exact match against the configured table, falling
    /// back to a slugified form of the raw name for unknown shows.
    pub fn map_show(&self, raw_name: &str) -> String {
        match self.mappings.lookup(raw_name) {
            Some(canonical) => canonical.to_string(),
            None => slugify(raw_name),
        }
    }

    /// `{show}_ep{zero_padded_number}_{YYYY-MM-DD}` when all three are
    /// known; otherwise the caller should use `generate_fallback_id`.
    pub fn generate_episode_id(&self, show: &str, episode_number: u32, date: NaiveDate) -> String {
        format!("{show}_ep{episode_number:03}_{}", date.format("%Y-%m-%d"))
    }

    /// `{slug(source_name)}_{unix_timestamp}`, used when show, episode
    /// number, or air date is unavailable.
    pub fn generate_fallback_id(&self, source_name: &str, timestamp: chrono::DateTime<chrono::Utc>) -> String {
        format!("{}_{}", slugify(source_name), timestamp.timestamp())
    }

    /// Inverse of `generate_episode_id`: recovers `(show, episode_number,
    /// date)` from a canonical ID, or `None` if `id` is not in that form
    /// (e.g. it was produced by the fallback path).
    pub fn parse_episode_id(id: &str) -> Option<(String, u32, NaiveDate)> {
        let (rest, date_str) = id.rsplit_once('_')?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
        let (show, ep_token) = rest.rsplit_once('_')?;
        let num_str = ep_token.strip_prefix("ep")?;
        let number: u32 = num_str.parse().ok()?;
        Some((show.to_string(), number, date))
    }

    /// `{root}/{show}/{YYYY}/{episode_id}`, or `{root}/_uncategorized/{episode_id}`
    /// when the show is unknown.
    pub fn episode_folder(&self, root: &str, episode_id: &str, show: Option<&str>, year: Option<i32>) -> String {
        match (show, year) {
            (Some(show), Some(year)) => format!("{root}/{show}/{year}/{episode_id}"),
            _ => format!("{root}/{UNCATEGORIZED}/{episode_id}"),
        }
    }
}

/// Lowercase, ASCII-alnum-and-hyphen form suitable for filesystem and URL use.
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_sep = true;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('-');
            last_was_sep = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
