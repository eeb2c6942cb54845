use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{Wordbook, page_count};
use crate::config::YoudaoEndpoints;
use crate::error::{Error, Result};
use crate::http::ResilientHttpClient;
use crate::types::{Group, LandingDocument, SessionStatus, SessionToken};

/// Cookie set by a successful Youdao login
const SESSION_COOKIE: &str = "DICT_SESS";

/// Youdao word books
pub struct Youdao {
    endpoints: YoudaoEndpoints,
    client: Arc<ResilientHttpClient>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct WordTotal {
    total: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordItems {
    #[serde(default)]
    item_list: Vec<WordItem>,
}

#[derive(Deserialize)]
struct WordItem {
    word: String,
}

impl Youdao {
    /// Create the service client
    pub fn new(endpoints: YoudaoEndpoints, client: Arc<ResilientHttpClient>) -> Self {
        Self { endpoints, client }
    }
}

// Book ids come back as numbers or strings depending on the account age.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Wordbook for Youdao {
    fn name(&self) -> &str {
        "youdao"
    }

    fn login_url(&self) -> &str {
        &self.endpoints.login_url
    }

    fn login_succeeded(&self, cookies: &SessionToken, _page: &str) -> bool {
        cookies.contains(SESSION_COOKIE)
    }

    async fn validate(&self, token: &SessionToken) -> Result<SessionStatus> {
        let account = self
            .client
            .get_as(&self.endpoints.account_info_url, &[], token)
            .await?;

        // An expired session is answered with an HTML login page instead of JSON.
        let code = account
            .json::<Value>()
            .ok()
            .and_then(|body| body.get("code").and_then(Value::as_i64));
        if code != Some(0) {
            tracing::info!(service = "youdao", ?code, "session rejected");
            return Ok(SessionStatus::Invalid);
        }

        let books: Value = self
            .client
            .get_as(&self.endpoints.books_url, &[], token)
            .await?
            .json()?;

        tracing::info!(service = "youdao", "session valid");
        Ok(SessionStatus::Valid(LandingDocument::Json(books)))
    }

    fn use_session(&self, token: &SessionToken) {
        self.client.set_session(token);
    }

    fn list_groups(&self, landing: &LandingDocument) -> Vec<Group> {
        let LandingDocument::Json(books) = landing else {
            return vec![];
        };
        let Some(entries) = books.get("data").and_then(Value::as_array) else {
            tracing::warn!(service = "youdao", "book listing has no data array");
            return vec![];
        };

        let groups: Vec<Group> = entries
            .iter()
            .filter_map(|book| {
                let name = book.get("bookName")?.as_str()?;
                let id = id_string(book.get("bookId")?)?;
                Some(Group::new(name, id))
            })
            .collect();

        tracing::info!(service = "youdao", count = groups.len(), "groups listed");
        groups
    }

    fn page_size(&self) -> u32 {
        self.endpoints.page_size
    }

    async fn total_pages(&self, group: &Group) -> Result<u32> {
        let query = [
            ("bookId", group.id.clone()),
            ("limit", "1".to_string()),
            ("offset", "0".to_string()),
        ];
        let total: Envelope<WordTotal> = self
            .client
            .get(&self.endpoints.words_url, &query)
            .await?
            .json()
            .map_err(|e| Error::Parse(format!("word count of {}: {e}", group.name)))?;

        let pages = page_count(total.data.total, self.endpoints.page_size);
        tracing::info!(group = %group.name, records = total.data.total, pages, "group size");
        Ok(pages)
    }

    async fn fetch_page(&self, group: &Group, page: u32) -> Result<Vec<String>> {
        let size = self.endpoints.page_size;
        let query = [
            ("bookId", group.id.clone()),
            ("limit", size.to_string()),
            ("offset", (u64::from(page) * u64::from(size)).to_string()),
        ];

        tracing::debug!(group = %group.name, page = page + 1, "fetching page");
        let items: Envelope<WordItems> = self
            .client
            .get(&self.endpoints.words_url, &query)
            .await?
            .json()
            .map_err(|e| Error::Parse(format!("page {page} of {}: {e}", group.name)))?;

        Ok(items.data.item_list.into_iter().map(|item| item.word).collect())
    }
}
