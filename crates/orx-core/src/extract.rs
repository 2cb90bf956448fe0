//! Change-request URLs: the one artifact shape tasks produce and the sequencer consumes.

use std::sync::LazyLock;

use regex::Regex;

static CHANGE_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<scheme>https?)://(?P<host>[^/\s]+)/(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+)/pull/(?P<number>\d+)",
    )
    .expect("change request pattern must compile")
});

/// Find the change-request URL a task reported in its logs.
///
/// Returns the last match: agents often mention a URL early (dry runs, templates) and print
/// the real one when they actually open the request.
pub fn extract_from_logs(text: &str) -> Option<String> {
    CHANGE_REQUEST
        .find_iter(text)
        .last()
        .map(|m| m.as_str().to_string())
}

/// Returns `true` if `uri` contains a change-request URL.
pub fn is_change_request(uri: &str) -> bool {
    CHANGE_REQUEST.is_match(uri)
}

/// Parsed `scheme://host/owner/repo/pull/<number>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequestRef {
    pub url: String,
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl ChangeRequestRef {
    /// `owner/repo`.
    pub fn repo_full(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Parse the first change-request URL found in `url`.
pub fn parse_change_request(url: &str) -> Option<ChangeRequestRef> {
    let caps = CHANGE_REQUEST.captures(url)?;
    Some(ChangeRequestRef {
        url: caps.get(0)?.as_str().to_string(),
        host: caps["host"].to_string(),
        owner: caps["owner"].to_string(),
        repo: caps["repo"].to_string(),
        number: caps["number"].parse().ok()?,
    })
}
