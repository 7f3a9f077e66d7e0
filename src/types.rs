use serde::Deserialize;
use std::collections::BTreeMap;

/// One indexed log line as the backend returns it. Immutable once decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    pub datestamp: String,
    #[serde(default)]
    pub channel: String,
    pub username: String,
    pub message: String,
    #[serde(rename = "_rankingInfo")]
    pub ranking: Option<RankingInfo>,
}

impl Hit {
    /// The classic IRC transcript rendering of a hit.
    pub fn as_log_line(&self) -> String {
        format!("[{}] {}: {}", self.datestamp, self.username, self.message)
    }

    /// Rendering used for cross-channel search results, where the channel
    /// is not implied by the query.
    pub fn as_search_line(&self) -> String {
        format!(
            "[{}] ({}/{}): {}",
            self.datestamp, self.channel, self.username, self.message
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingInfo {
    #[serde(rename = "proximityDistance", default)]
    pub proximity_distance: u64,
}

/// Decoded response to one search call: hits in backend order, the total
/// match count, and facet occurrence counts when facets were requested.
///
/// Facet value maps decode into `BTreeMap`, so facet keys always come back
/// in lexical order regardless of what the backend chose.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub hits: Vec<Hit>,
    #[serde(rename = "nbHits", default)]
    pub nb_hits: u64,
    #[serde(default)]
    pub facets: BTreeMap<String, BTreeMap<String, u64>>,
}

impl SearchResults {
    pub fn facet_keys(&self, name: &str) -> Vec<String> {
        self.facets
            .get(name)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn facet_counts(&self, name: &str) -> Option<&BTreeMap<String, u64>> {
        self.facets.get(name)
    }
}

/// Summary of a user's history, derived from one restricted query.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub channels: Vec<String>,
    pub messages: u64,
    pub first_seen: String,
}

impl UserInfo {
    pub fn describe(&self, username: &str) -> String {
        format!(
            "{} was first seen on {}. Since then they have sent {} messages in the following channels: {}",
            username,
            self.first_seen,
            self.messages,
            self.channels.join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facet_keys_are_lexically_ordered() {
        let raw = serde_json::json!({
            "hits": [],
            "nbHits": 0,
            "facets": {
                "channel": {"ubuntu-meeting": 3, "kubuntu": 9, "ubuntu": 120}
            }
        });
        let results: SearchResults = serde_json::from_value(raw).unwrap();
        assert_eq!(
            results.facet_keys("channel"),
            vec!["kubuntu", "ubuntu", "ubuntu-meeting"]
        );
        assert!(results.facet_keys("username").is_empty());
    }

    #[test]
    fn hit_renders_transcript_and_search_forms() {
        let hit = Hit {
            datestamp: "2017-05-16T09:41".to_string(),
            channel: "ubuntu".to_string(),
            username: "sabdfl".to_string(),
            message: "hello world".to_string(),
            ranking: None,
        };
        assert_eq!(hit.as_log_line(), "[2017-05-16T09:41] sabdfl: hello world");
        assert_eq!(
            hit.as_search_line(),
            "[2017-05-16T09:41] (ubuntu/sabdfl): hello world"
        );
    }

    #[test]
    fn whois_summary_reads_like_a_sentence() {
        let info = UserInfo {
            channels: vec!["ubuntu".to_string(), "ubuntu-devel".to_string()],
            messages: 42,
            first_seen: "2017-05-16T09:00".to_string(),
        };
        assert_eq!(
            info.describe("sabdfl"),
            "sabdfl was first seen on 2017-05-16T09:00. Since then they have sent 42 messages \
             in the following channels: ubuntu ubuntu-devel"
        );
    }
}
