use crate::config::UserConfig;
use crate::types::{Hit, SearchResults, UserInfo};
use log::debug;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Hits whose proximity distance exceeds this are not exact timestamp
/// matches and get filtered out of transcript views.
const EXACT_PROXIMITY_MAX: u64 = 3;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed search response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no matching log lines")]
    NoHits,
}

/// The two query shapes the index is ever asked for. `Restricted` fixes
/// paging to a single hit and exists purely for metadata/facet extraction;
/// `General` pulls a full page with highlighting tags disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Restricted,
    General,
}

/// Read-only client for the hosted log index. Cheap to clone; clones share
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::blocking::Client,
    app_id: String,
    api_key: String,
    index: String,
    page_size: u64,
}

impl SearchClient {
    pub fn new(config: &UserConfig) -> Result<Self, SearchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout()))
            .build()?;
        Ok(Self {
            http,
            app_id: config.resolve_app_id(),
            api_key: config.resolve_api_key(),
            index: config.resolve_index(),
            page_size: config.page_size(),
        })
    }

    fn base_params(&self, kind: QueryKind) -> Map<String, Value> {
        let mut base = Map::new();
        match kind {
            QueryKind::Restricted => {
                base.insert("page".to_string(), Value::from(1));
                base.insert("hitsPerPage".to_string(), Value::from(1));
                base.insert("length".to_string(), Value::from(1));
            }
            QueryKind::General => {
                base.insert("highlightPreTag".to_string(), Value::from(""));
                base.insert("highlightPostTag".to_string(), Value::from(""));
                base.insert("hitsPerPage".to_string(), Value::from(self.page_size));
            }
        }
        base
    }

    /// Submit one query to the index. Criteria overlay the base parameter
    /// set for `kind`; criteria keys win on conflict. Criteria values are
    /// passed through unvalidated, so a malformed override surfaces as the
    /// backend's own error.
    pub fn search(
        &self,
        query: &str,
        kind: QueryKind,
        criteria: Map<String, Value>,
    ) -> Result<SearchResults, SearchError> {
        let mut params = merge_params(self.base_params(kind), criteria);
        params.insert("query".to_string(), Value::from(query));

        let url = format!(
            "https://{}-dsn.algolia.net/1/indexes/{}/query",
            self.app_id, self.index
        );
        debug!("query {:?} against {}", query, self.index);
        let response = self
            .http
            .post(&url)
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
            .json(&Value::Object(params))
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// List the indexed channels, lexically ordered.
    pub fn channels(&self) -> Result<Vec<String>, SearchError> {
        let mut criteria = Map::new();
        criteria.insert("facets".to_string(), Value::from("channel"));
        let results = self.search("", QueryKind::Restricted, criteria)?;
        Ok(results.facet_keys("channel"))
    }

    /// Transcript lines for a given minute stamp in one channel. Only
    /// exact timestamp matches survive, which is what the ranking info
    /// is requested for.
    pub fn log_lines(&self, timestamp: &str, channel: &str) -> Result<Vec<String>, SearchError> {
        let mut criteria = Map::new();
        criteria.insert(
            "facetFilters".to_string(),
            Value::from(vec![format!("channel:{channel}")]),
        );
        criteria.insert("getRankingInfo".to_string(), Value::from(1));
        let results = self.search(timestamp, QueryKind::General, criteria)?;
        Ok(exact_log_lines(&results.hits))
    }

    /// Timestamp of the most recent line a user sent.
    pub fn last_seen(&self, username: &str) -> Result<String, SearchError> {
        let mut criteria = Map::new();
        criteria.insert(
            "facetFilters".to_string(),
            Value::from(vec![format!("username:{username}")]),
        );
        criteria.insert("getRankingInfo".to_string(), Value::from(1));
        let results = self.search("", QueryKind::General, criteria)?;
        most_recent_stamp(&results.hits)
    }

    /// Channel set, message count and first-seen stamp for a user.
    pub fn whois(&self, username: &str) -> Result<UserInfo, SearchError> {
        let mut criteria = Map::new();
        criteria.insert("facets".to_string(), Value::from("*"));
        criteria.insert("getRankingInfo".to_string(), Value::from(1));
        let results = self.search(username, QueryKind::Restricted, criteria)?;
        let first = results.hits.first().ok_or(SearchError::NoHits)?;
        Ok(UserInfo {
            channels: results.facet_keys("channel"),
            messages: results.nb_hits,
            first_seen: first.datestamp.clone(),
        })
    }

    /// The most active usernames, busiest first.
    pub fn top_users(&self, limit: usize) -> Result<Vec<String>, SearchError> {
        let mut criteria = Map::new();
        criteria.insert("facets".to_string(), Value::from("username"));
        let results = self.search("", QueryKind::Restricted, criteria)?;
        let Some(counts) = results.facet_counts("username") else {
            return Ok(Vec::new());
        };
        Ok(rank_by_count(counts, limit))
    }

    /// Total number of indexed log lines.
    pub fn total_records(&self) -> Result<u64, SearchError> {
        let results = self.search("", QueryKind::General, Map::new())?;
        Ok(results.nb_hits)
    }

    /// Free-text search, optionally restricted to one channel. Results
    /// come back already formatted for display.
    pub fn search_lines(
        &self,
        text: &str,
        channel: Option<&str>,
    ) -> Result<Vec<String>, SearchError> {
        let mut criteria = Map::new();
        if let Some(channel) = channel {
            criteria.insert(
                "facetFilters".to_string(),
                Value::from(vec![format!("channel:{channel}")]),
            );
        }
        let results = self.search(text, QueryKind::General, criteria)?;
        Ok(results.hits.iter().map(Hit::as_search_line).collect())
    }
}

/// Overlay `overrides` onto `base`. Override keys always win; base-only
/// keys are retained.
pub fn merge_params(
    base: Map<String, Value>,
    overrides: Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = base;
    for (key, value) in overrides {
        merged.insert(key, value);
    }
    merged
}

/// Keep only exact timestamp matches and render them as transcript lines.
/// A hit without ranking info never counts as exact.
pub fn exact_log_lines(hits: &[Hit]) -> Vec<String> {
    hits.iter()
        .filter(|hit| {
            hit.ranking
                .as_ref()
                .is_some_and(|ranking| ranking.proximity_distance <= EXACT_PROXIMITY_MAX)
        })
        .map(Hit::as_log_line)
        .collect()
}

/// The backend returns hits ascending by time, so the freshest stamp is
/// the last one.
pub fn most_recent_stamp(hits: &[Hit]) -> Result<String, SearchError> {
    hits.last()
        .map(|hit| hit.datestamp.clone())
        .ok_or(SearchError::NoHits)
}

fn rank_by_count(counts: &BTreeMap<String, u64>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, u64)> = counts.iter().map(|(k, v)| (k, *v)).collect();
    // BTreeMap iteration is lexical, so ties stay lexically ordered under
    // a stable sort by count.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(limit)
        .map(|(name, _)| name.clone())
        .collect()
}
