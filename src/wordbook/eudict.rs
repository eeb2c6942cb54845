use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;

use super::{Wordbook, page_count};
use crate::config::EudictEndpoints;
use crate::error::{Error, Result};
use crate::http::ResilientHttpClient;
use crate::types::{Group, LandingDocument, SessionStatus, SessionToken};

/// Cookie set by a successful Eudict login
const SESSION_COOKIE: &str = "EudicWebSession";

/// Category links on the study-list landing page
const GROUP_SELECTOR: &str = "a.media_heading_a.new_cateitem_click";

/// Eudict study lists
pub struct Eudict {
    endpoints: EudictEndpoints,
    client: Arc<ResilientHttpClient>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordCount {
    records_total: u64,
}

#[derive(Deserialize)]
struct WordPage {
    #[serde(default)]
    data: Vec<WordRecord>,
}

#[derive(Deserialize)]
struct WordRecord {
    uuid: String,
}

impl Eudict {
    /// Create the service client
    pub fn new(endpoints: EudictEndpoints, client: Arc<ResilientHttpClient>) -> Self {
        Self { endpoints, client }
    }

    /// Whether a response ended on the login page
    fn is_login_redirect(&self, final_url: &str) -> bool {
        match (url::Url::parse(final_url), url::Url::parse(&self.endpoints.login_url)) {
            (Ok(landed), Ok(login)) => {
                landed.host_str() == login.host_str()
                    && landed.port_or_known_default() == login.port_or_known_default()
                    && landed.path().starts_with(login.path())
            }
            _ => final_url.starts_with(&self.endpoints.login_url),
        }
    }
}

#[async_trait]
impl Wordbook for Eudict {
    fn name(&self) -> &str {
        "eudict"
    }

    fn login_url(&self) -> &str {
        &self.endpoints.login_url
    }

    fn login_succeeded(&self, cookies: &SessionToken, _page: &str) -> bool {
        cookies.contains(SESSION_COOKIE)
    }

    async fn validate(&self, token: &SessionToken) -> Result<SessionStatus> {
        let response = self
            .client
            .get_as(&self.endpoints.study_list_url, &[], token)
            .await?;

        if self.is_login_redirect(&response.url) {
            tracing::info!(service = "eudict", "session rejected");
            return Ok(SessionStatus::Invalid);
        }

        tracing::info!(service = "eudict", "session valid");
        Ok(SessionStatus::Valid(LandingDocument::Html(response.text())))
    }

    fn use_session(&self, token: &SessionToken) {
        self.client.set_session(token);
    }

    fn list_groups(&self, landing: &LandingDocument) -> Vec<Group> {
        let LandingDocument::Html(html) = landing else {
            return vec![];
        };
        let selector = match Selector::parse(GROUP_SELECTOR) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::warn!(error = %e, "invalid group selector");
                return vec![];
            }
        };

        let document = Html::parse_document(html);
        let groups: Vec<Group> = document
            .select(&selector)
            .filter_map(|link| {
                let id = link.value().attr("data-id")?;
                let name = link.text().collect::<String>().trim().to_string();
                Some(Group::new(name, id))
            })
            .collect();

        tracing::info!(service = "eudict", count = groups.len(), "groups listed");
        groups
    }

    fn page_size(&self) -> u32 {
        self.endpoints.page_size
    }

    async fn total_pages(&self, group: &Group) -> Result<u32> {
        let count: RecordCount = self
            .client
            .get(
                &self.endpoints.words_data_url,
                &[("categoryid", group.id.clone())],
            )
            .await?
            .json()
            .map_err(|e| Error::Parse(format!("word count of {}: {e}", group.name)))?;

        let pages = page_count(count.records_total, self.endpoints.page_size);
        tracing::info!(group = %group.name, records = count.records_total, pages, "group size");
        Ok(pages)
    }

    async fn fetch_page(&self, group: &Group, page: u32) -> Result<Vec<String>> {
        let size = self.endpoints.page_size;
        let query = [
            ("columns[2][data]", "word".to_string()),
            ("start", (u64::from(page) * u64::from(size)).to_string()),
            ("length", size.to_string()),
            ("categoryid", group.id.clone()),
            ("_", chrono::Utc::now().timestamp_millis().to_string()),
        ];

        tracing::debug!(group = %group.name, page = page + 1, "fetching page");
        let words: WordPage = self
            .client
            .get(&self.endpoints.words_data_url, &query)
            .await?
            .json()
            .map_err(|e| Error::Parse(format!("page {page} of {}: {e}", group.name)))?;

        Ok(words.data.into_iter().map(|record| record.uuid).collect())
    }
}
