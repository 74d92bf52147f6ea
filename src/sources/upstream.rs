use std::time::Instant;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::credential::Credential;
use crate::error::ProxyError;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;

static ERROR_MSG: &str = "error";

/// One authenticated GET against the osu! API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// low-cardinality name used for metrics and logs
    pub label: &'static str,
    /// path segments below the API base, each percent-encoded on its own
    pub segments: Vec<String>,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn me() -> Self {
        Self {
            label: "me",
            segments: vec!["me".to_string()],
            params: Vec::new(),
        }
    }

    pub fn user(user_id: &str) -> Self {
        Self {
            label: "user",
            segments: vec!["users".to_string(), user_id.to_string(), "osu".to_string()],
            params: Vec::new(),
        }
    }

    pub fn best_scores(user_id: &str, query: &ScoreQuery) -> Self {
        Self {
            label: "scores",
            segments: vec![
                "users".to_string(),
                user_id.to_string(),
                "scores".to_string(),
                "best".to_string(),
            ],
            params: query.to_params(),
        }
    }

    /// Full request URL. A `/`, `?` or `#` inside a segment stays inside it.
    pub fn url(&self, api_base_url: &str) -> Result<Url, ProxyError> {
        let mut url = Url::parse(api_base_url)
            .map_err(|e| ProxyError::InvalidUpstreamUrl(format!("'{}': {}", api_base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ProxyError::InvalidUpstreamUrl(format!("'{}' cannot carry a path", api_base_url)))?
            .pop_if_empty()
            .extend(&self.segments);
        Ok(url)
    }
}

/// Query accepted by `/api/user/{user_id}/scores`; only given fields are forwarded.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ScoreQuery {
    pub mode: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub include_fails: Option<String>,
}

impl ScoreQuery {
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(mode) = &self.mode {
            params.push(("mode".to_string(), mode.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(include_fails) = &self.include_fails {
            params.push(("include_fails".to_string(), include_fails.clone()));
        }
        params
    }
}

/// Upstream answer relayed to the caller as-is.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    pub api_base_url: String,
    pub client: Client,
    pub retry: RetrySettings,
}

impl UpstreamClient {
    pub fn new(api_base_url: String, client: Client, retry: RetrySettings) -> Self {
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            client,
            retry,
        }
    }

    pub async fn get(&self, request: &ApiRequest, credential: &Credential) -> Result<UpstreamResponse, ProxyError> {
        let metrics = get_metrics().await;
        let start = Instant::now();

        let result = self
            .retry
            .run_with_retry(|| self.get_once(request, credential), ProxyError::is_retryable)
            .await;
        metrics
            .upstream_duration
            .with_label_values(&[request.label])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                metrics
                    .upstream_requests
                    .with_label_values(&[request.label, response.status.as_str()])
                    .inc();
                Ok(response)
            }
            // 5xx after the last attempt is still an upstream answer
            Err(ProxyError::UpstreamStatus { status, body }) => {
                metrics
                    .upstream_requests
                    .with_label_values(&[request.label, status.as_str()])
                    .inc();
                Ok(UpstreamResponse { status, body })
            }
            Err(e) => {
                metrics
                    .upstream_requests
                    .with_label_values(&[request.label, ERROR_MSG])
                    .inc();
                Err(e)
            }
        }
    }

    async fn get_once(&self, request: &ApiRequest, credential: &Credential) -> Result<UpstreamResponse, ProxyError> {
        let url = request.url(&self.api_base_url)?;
        debug!("upstream GET '{}', params: {:?}", url, request.params);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&request.params)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "raw": text }));
        info!("upstream '{}' answered {}", request.label, status);

        if status.is_server_error() {
            return Err(ProxyError::UpstreamStatus { status, body });
        }
        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_query_forwards_only_given_fields() {
        let query = ScoreQuery {
            mode: Some("taiko".into()),
            limit: Some(5),
            offset: None,
            include_fails: Some("1".into()),
        };
        let request = ApiRequest::best_scores("2", &query);

        assert_eq!(
            request.url("https://osu.ppy.sh/api/v2").unwrap().as_str(),
            "https://osu.ppy.sh/api/v2/users/2/scores/best"
        );
        assert_eq!(
            request.params,
            vec![
                ("mode".to_string(), "taiko".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("include_fails".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = UpstreamClient::new(
            "https://osu.ppy.sh/api/v2/".into(),
            Client::new(),
            RetrySettings::default(),
        );
        assert_eq!(client.api_base_url, "https://osu.ppy.sh/api/v2");
        assert_eq!(
            ApiRequest::user("7").url(&client.api_base_url).unwrap().as_str(),
            "https://osu.ppy.sh/api/v2/users/7/osu"
        );
    }

    #[test]
    fn user_id_stays_one_path_segment() {
        let url = ApiRequest::user("7/scores/best?limit=99#")
            .url("https://osu.ppy.sh/api/v2")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://osu.ppy.sh/api/v2/users/7%2Fscores%2Fbest%3Flimit=99%23/osu"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }
}
