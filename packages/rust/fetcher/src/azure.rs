//! Azure DevOps Boards REST client.
//!
//! Epics are selected with a WIQL query, then loaded (with relations) through
//! the work-items batch endpoint. Child ids come from forward hierarchy links
//! and are loaded with the same batch call.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use epicreport_shared::{AzureDevOpsConfig, Epic, EpicQuery, ReportError, Result};

use crate::WorkItemSource;
use crate::wire::RawWorkItem;

/// The work-items batch endpoint accepts at most this many ids per call.
const MAX_BATCH: usize = 200;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("epicreport/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct WiqlResponse {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WiqlReference>,
}

#[derive(Debug, Deserialize)]
struct WiqlReference {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    // `errorPolicy=omit` yields `null` for ids that no longer resolve.
    #[serde(default)]
    value: Vec<Option<RawWorkItem>>,
}

/// Live source backed by the Azure DevOps REST API.
#[derive(Debug, Clone)]
pub struct AzureDevOpsSource {
    client: Client,
    /// `{base_url}/{organization}/`
    org_url: Url,
    api_version: String,
    pat: String,
}

impl AzureDevOpsSource {
    /// Build a client for the organization in `config`, authenticating with `pat`.
    pub fn new(config: &AzureDevOpsConfig, pat: impl Into<String>) -> Result<Self> {
        if config.organization.trim().is_empty() {
            return Err(ReportError::config(
                "azure_devops.organization is not set",
            ));
        }

        let mut org_url = Url::parse(&config.base_url).map_err(|e| {
            ReportError::config(format!("invalid base_url '{}': {e}", config.base_url))
        })?;
        org_url
            .path_segments_mut()
            .map_err(|_| ReportError::config("base_url cannot be a base"))?
            .pop_if_empty()
            .push(config.organization.trim())
            .push("");

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            org_url,
            api_version: config.api_version.clone(),
            pat: pat.into(),
        })
    }

    /// `{org}/{project}/_apis/wit/{endpoint}?api-version=...`
    fn endpoint(&self, project: &str, endpoint: &str) -> Result<Url> {
        let mut url = self.org_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReportError::config("base_url cannot be a base"))?
            .pop_if_empty()
            .extend([project, "_apis", "wit", endpoint]);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// Run the epic-selection WIQL query and return matching ids in id order.
    #[instrument(skip_all, fields(project = %query.project))]
    async fn query_epic_ids(&self, query: &EpicQuery) -> Result<Vec<u64>> {
        let url = self.endpoint(&query.project, "wiql")?;
        let body = serde_json::json!({ "query": build_wiql(query) });

        debug!(%url, "running WIQL query");
        let response = self
            .client
            .post(url.clone())
            .basic_auth("", Some(&self.pat))
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::source_unavailable(format!("{url}: {e}")))?;

        let parsed: WiqlResponse = decode(response, &url).await?;
        Ok(parsed.work_items.into_iter().map(|r| r.id).collect())
    }

    /// Load work items with relations, preserving the order of `ids`.
    async fn fetch_work_items(&self, project: &str, ids: &[u64]) -> Result<Vec<RawWorkItem>> {
        let mut by_id: HashMap<u64, RawWorkItem> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_BATCH) {
            let mut url = self.endpoint(project, "workitems")?;
            let joined = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            url.query_pairs_mut()
                .append_pair("ids", &joined)
                .append_pair("$expand", "relations")
                .append_pair("errorPolicy", "omit");

            debug!(count = chunk.len(), "fetching work item batch");
            let response = self
                .client
                .get(url.clone())
                .basic_auth("", Some(&self.pat))
                .send()
                .await
                .map_err(|e| ReportError::source_unavailable(format!("{url}: {e}")))?;

            let batch: BatchResponse = decode(response, &url).await?;
            for item in batch.value.into_iter().flatten() {
                by_id.insert(item.id, item);
            }
        }

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(id) {
                Some(item) => items.push(item),
                None => warn!(id, "work item could not be loaded, skipping"),
            }
        }
        Ok(items)
    }
}

impl WorkItemSource for AzureDevOpsSource {
    fn describe(&self) -> String {
        format!("Azure DevOps ({})", self.org_url.as_str().trim_end_matches('/'))
    }

    #[instrument(skip_all, fields(area = %query.area_path, iteration = %query.iteration_path))]
    async fn fetch_epics(&self, query: &EpicQuery) -> Result<Vec<Epic>> {
        let fetched_at = Utc::now();

        let epic_ids = self.query_epic_ids(query).await?;
        info!(count = epic_ids.len(), "epics matched query");
        if epic_ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw_epics = self.fetch_work_items(&query.project, &epic_ids).await?;

        let child_ids: Vec<u64> = raw_epics.iter().flat_map(RawWorkItem::child_ids).collect();
        let mut children: HashMap<u64, RawWorkItem> = self
            .fetch_work_items(&query.project, &child_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        debug!(count = children.len(), "child items loaded");

        let epics = raw_epics
            .into_iter()
            .map(|raw| {
                let owned = raw
                    .child_ids()
                    .into_iter()
                    .filter_map(|id| children.remove(&id))
                    .map(RawWorkItem::into_child)
                    .collect();
                raw.into_epic(owned, fetched_at)
            })
            .collect();

        Ok(epics)
    }
}

/// Build the epic-selection query. String literals are quote-escaped.
pub(crate) fn build_wiql(query: &EpicQuery) -> String {
    format!(
        "SELECT [System.Id] FROM WorkItems \
         WHERE [System.TeamProject] = '{}' \
         AND [System.WorkItemType] = 'Epic' \
         AND [System.AreaPath] UNDER '{}' \
         AND [System.IterationPath] UNDER '{}' \
         ORDER BY [System.Id]",
        wiql_escape(&query.project),
        wiql_escape(&query.area_path),
        wiql_escape(&query.iteration_path),
    )
}

fn wiql_escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Check status and decode a JSON body, mapping every failure to
/// [`ReportError::SourceUnavailable`].
async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    url: &Url,
) -> Result<T> {
    let status = response.status();

    // An invalid token gets a 203 with an HTML sign-in page rather than a 401.
    if status == StatusCode::NON_AUTHORITATIVE_INFORMATION || status == StatusCode::UNAUTHORIZED {
        return Err(ReportError::source_unavailable(format!(
            "{url}: authentication failed (HTTP {status}), check the personal access token"
        )));
    }
    if !status.is_success() {
        return Err(ReportError::source_unavailable(format!(
            "{url}: HTTP {status}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ReportError::source_unavailable(format!("{url}: failed to read body: {e}")))?;

    serde_json::from_str(&body).map_err(|e| {
        ReportError::source_unavailable(format!(
            "{url}: unexpected response body: {e} (got: {})",
            body.chars().take(200).collect::<String>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AzureDevOpsConfig {
        AzureDevOpsConfig {
            organization: "contoso".into(),
            base_url: server.uri(),
            ..AzureDevOpsConfig::default()
        }
    }

    fn query() -> EpicQuery {
        EpicQuery {
            project: "One".into(),
            area_path: "One\\CloudInit".into(),
            iteration_path: "One\\Bromine".into(),
        }
    }

    fn child_link(id: u64) -> serde_json::Value {
        serde_json::json!({
            "rel": "System.LinkTypes.Hierarchy-Forward",
            "url": format!("https://dev.azure.com/contoso/_apis/wit/workItems/{id}")
        })
    }

    #[test]
    fn wiql_escapes_quotes_and_selects_epics() {
        let wiql = build_wiql(&EpicQuery {
            project: "One".into(),
            area_path: "One\\O'Brien".into(),
            iteration_path: "One\\Bromine".into(),
        });
        assert!(wiql.contains("[System.WorkItemType] = 'Epic'"));
        assert!(wiql.contains("UNDER 'One\\O''Brien'"));
        assert!(wiql.ends_with("ORDER BY [System.Id]"));
    }

    #[test]
    fn rejects_missing_organization() {
        let err = AzureDevOpsSource::new(&AzureDevOpsConfig::default(), "pat").unwrap_err();
        assert!(err.to_string().contains("organization"));
    }

    #[tokio::test]
    async fn fetches_epics_with_children() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/contoso/One/_apis/wit/wiql"))
            .and(query_param("api-version", "7.1"))
            .and(basic_auth("", "secret-pat"))
            .and(body_string_contains("UNDER 'One\\\\CloudInit'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "workItems": [ { "id": 100 }, { "id": 200 } ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/contoso/One/_apis/wit/workitems"))
            .and(query_param("ids", "100,200"))
            .and(query_param("$expand", "relations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 2,
                "value": [
                    {
                        "id": 200,
                        "fields": { "System.Title": "Grooming Required", "System.State": "New" }
                    },
                    {
                        "id": 100,
                        "fields": {
                            "System.Title": "Test and Migrate to Aurora",
                            "System.State": "Active",
                            "System.AssignedTo": { "displayName": "Ben Ryan" },
                            "System.ChangedDate": "2025-06-01T08:00:00Z"
                        },
                        "relations": [ child_link(102), child_link(101) ]
                    }
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/contoso/One/_apis/wit/workitems"))
            .and(query_param("ids", "102,101"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 2,
                "value": [
                    {
                        "id": 101,
                        "fields": {
                            "System.Title": "Aurora Platform Testing Framework",
                            "System.WorkItemType": "User Story",
                            "System.State": "Active",
                            "System.ChangedDate": "2025-06-10T08:00:00Z"
                        }
                    },
                    {
                        "id": 102,
                        "fields": {
                            "System.Title": "Aurora Migration Strategy",
                            "System.WorkItemType": "Task",
                            "System.State": "To Do"
                        }
                    }
                ]
            })))
            .mount(&server)
            .await;

        let source = AzureDevOpsSource::new(&config_for(&server), "secret-pat").unwrap();
        let epics = source.fetch_epics(&query()).await.unwrap();

        // WIQL order, not batch response order.
        assert_eq!(epics.iter().map(|e| e.id).collect::<Vec<_>>(), vec![100, 200]);

        let aurora = &epics[0];
        assert_eq!(aurora.assignee, "Ben Ryan");
        // Relation order.
        assert_eq!(
            aurora.children.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![102, 101]
        );
        assert_eq!(aurora.children[1].work_item_type, "User Story");
        assert!(epics[1].children.is_empty());
        assert_eq!(epics[1].assignee, "Unassigned");
    }

    #[tokio::test]
    async fn empty_query_result_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/contoso/One/_apis/wit/wiql"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "workItems": [] })),
            )
            .mount(&server)
            .await;

        let source = AzureDevOpsSource::new(&config_for(&server), "pat").unwrap();
        let epics = source.fetch_epics(&query()).await.unwrap();
        assert!(epics.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_source_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/contoso/One/_apis/wit/wiql"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = AzureDevOpsSource::new(&config_for(&server), "pat").unwrap();
        let err = source.fetch_epics(&query()).await.unwrap_err();
        assert!(matches!(err, ReportError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn sign_in_page_is_reported_as_auth_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/contoso/One/_apis/wit/wiql"))
            .respond_with(ResponseTemplate::new(203).set_body_string("<html>Sign In</html>"))
            .mount(&server)
            .await;

        let source = AzureDevOpsSource::new(&config_for(&server), "expired").unwrap();
        let err = source.fetch_epics(&query()).await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
    }
}
