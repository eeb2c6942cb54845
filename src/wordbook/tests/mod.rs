use super::*;
use crate::config::{EudictEndpoints, HttpConfig, RetryConfig, YoudaoEndpoints};
use crate::error::Error;
use crate::types::Event;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LANDING_PAGE: &str = r#"
<html><body>
  <div class="media">
    <a class="media_heading_a new_cateitem_click" data-id="0"> 我的生詞本 </a>
  </div>
  <div class="media">
    <a class="media_heading_a new_cateitem_click" data-id="132">GRE</a>
  </div>
  <div class="media">
    <a class="media_heading_a" data-id="999">not a category</a>
  </div>
</body></html>
"#;

fn fast_client() -> Arc<ResilientHttpClient> {
    let retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    Arc::new(ResilientHttpClient::new(&HttpConfig::default(), &retry).unwrap())
}

fn eudict_for(server: &MockServer) -> Eudict {
    let endpoints = EudictEndpoints {
        study_list_url: format!("{}/studylist", server.uri()),
        words_data_url: format!("{}/StudyList/WordsDataSource", server.uri()),
        login_url: format!("{}/account/login", server.uri()),
        page_size: 100,
    };
    Eudict::new(endpoints, fast_client())
}

fn youdao_for(server: &MockServer) -> Youdao {
    let endpoints = YoudaoEndpoints {
        account_info_url: format!("{}/login/acc/query/accountinfo", server.uri()),
        books_url: format!("{}/wordbook/webapi/books", server.uri()),
        words_url: format!("{}/wordbook/webapi/words", server.uri()),
        login_url: format!("{}/login", server.uri()),
        page_size: 15,
    };
    Youdao::new(endpoints, fast_client())
}

fn uuid_page(words: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "data": words.iter().map(|w| serde_json::json!({ "uuid": w })).collect::<Vec<_>>()
    })
}

async fn mount_eudict_pages(server: &MockServer, pages: [serde_json::Value; 3]) {
    Mock::given(method("GET"))
        .and(path("/StudyList/WordsDataSource"))
        .and(query_param("categoryid", "132"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "recordsTotal": 250 })))
        .expect(1)
        .mount(server)
        .await;

    for (index, body) in pages.into_iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/StudyList/WordsDataSource"))
            .and(query_param("categoryid", "132"))
            .and(query_param("start", (index * 100).to_string()))
            .and(query_param("length", "100"))
            .and(query_param("columns[2][data]", "word"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn gre() -> Group {
    Group::new("GRE", "132")
}

#[test]
fn page_count_rounds_up() {
    assert_eq!(page_count(250, 100), 3);
    assert_eq!(page_count(200, 100), 2);
    assert_eq!(page_count(0, 100), 0);
    assert_eq!(page_count(31, 15), 3);
}

#[test]
fn preselected_keeps_service_order_and_drops_unknown_names() {
    let groups = vec![
        Group::new("Default", "0"),
        Group::new("GRE", "132"),
        Group::new("TOEFL", "140"),
    ];
    let previous = vec!["TOEFL".to_string(), "Renamed".to_string(), "Default".to_string()];

    let picked = preselected(&groups, &previous);

    assert_eq!(picked, vec![Group::new("Default", "0"), Group::new("TOEFL", "140")]);
}

#[test]
fn eudict_lists_groups_in_page_order() {
    let eudict = Eudict::new(EudictEndpoints::default(), fast_client());

    let groups = eudict.list_groups(&LandingDocument::Html(LANDING_PAGE.to_string()));

    assert_eq!(groups, vec![Group::new("我的生詞本", "0"), Group::new("GRE", "132")]);
}

#[test]
fn eudict_tolerates_a_landing_page_without_groups() {
    let eudict = Eudict::new(EudictEndpoints::default(), fast_client());
    let groups = eudict.list_groups(&LandingDocument::Html("<html><body></body></html>".into()));
    assert!(groups.is_empty());
}

#[test]
fn login_predicates_look_for_the_session_cookie() {
    let eudict = Eudict::new(EudictEndpoints::default(), fast_client());
    let youdao = Youdao::new(YoudaoEndpoints::default(), fast_client());
    let eudict_cookies: SessionToken = [("EudicWebSession", "x")].into_iter().collect();
    let youdao_cookies: SessionToken = [("DICT_SESS", "y")].into_iter().collect();

    assert!(eudict.login_succeeded(&eudict_cookies, ""));
    assert!(!eudict.login_succeeded(&youdao_cookies, ""));
    assert!(youdao.login_succeeded(&youdao_cookies, ""));
    assert!(!youdao.login_succeeded(&SessionToken::new(), ""));
}

#[tokio::test]
async fn eudict_session_valid_returns_landing_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/studylist"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LANDING_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    let eudict = eudict_for(&server);

    let token: SessionToken = [("EudicWebSession", "abc")].into_iter().collect();
    let status = eudict.validate(&token).await.unwrap();

    let SessionStatus::Valid(landing) = status else {
        panic!("expected a valid session");
    };
    assert_eq!(eudict.list_groups(&landing).len(), 2);
}

#[tokio::test]
async fn eudict_redirect_to_login_means_invalid_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/studylist"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/account/login?returnUrl=/studylist", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/account/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form>login</form>"))
        .mount(&server)
        .await;

    let status = eudict_for(&server).validate(&SessionToken::new()).await.unwrap();

    assert!(!status.is_valid());
}

#[tokio::test]
async fn eudict_fetch_group_issues_one_request_per_page_and_dedups() {
    let server = MockServer::start().await;
    mount_eudict_pages(
        &server,
        [
            uuid_page(&["abandon", "ability", "abandon"]),
            uuid_page(&["ability", "absent"]),
            uuid_page(&["zeal"]),
        ],
    )
    .await;

    let (tx, _rx) = tokio::sync::broadcast::channel(16);
    let fetcher = WordFetcher::new(Arc::new(eudict_for(&server)), tx);

    let words = fetcher.fetch_group(&gre(), &CancellationToken::new()).await;

    let expected: HashSet<String> = ["abandon", "ability", "absent", "zeal"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(words, expected);
}

#[tokio::test]
async fn eudict_page_count_rounds_up_the_record_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/StudyList/WordsDataSource"))
        .and(query_param("categoryid", "132"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "recordsTotal": 250 })))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, _rx) = tokio::sync::broadcast::channel(16);
    let fetcher = WordFetcher::new(Arc::new(eudict_for(&server)), tx);

    assert_eq!(fetcher.total_pages(&gre()).await, 3);
}

#[tokio::test]
async fn failed_page_is_skipped_and_other_pages_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/StudyList/WordsDataSource"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "recordsTotal": 250 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/StudyList/WordsDataSource"))
        .and(query_param("start", "100"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/StudyList/WordsDataSource"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(uuid_page(&["first"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/StudyList/WordsDataSource"))
        .and(query_param("start", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(uuid_page(&["last"])))
        .mount(&server)
        .await;

    let (tx, _rx) = tokio::sync::broadcast::channel(16);
    let fetcher = WordFetcher::new(Arc::new(eudict_for(&server)), tx);
    let words = fetcher.fetch_group(&gre(), &CancellationToken::new()).await;

    assert_eq!(words.len(), 2);
    assert!(words.contains("first"));
    assert!(words.contains("last"));
}

#[tokio::test]
async fn unreadable_group_size_yields_zero_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/StudyList/WordsDataSource"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let eudict = eudict_for(&server);
    assert!(matches!(eudict.total_pages(&gre()).await, Err(Error::Parse(_))));

    let (tx, _rx) = tokio::sync::broadcast::channel(16);
    let fetcher = WordFetcher::new(Arc::new(eudict), tx);
    assert_eq!(fetcher.total_pages(&gre()).await, 0);
    assert!(fetcher.fetch_group(&gre(), &CancellationToken::new()).await.is_empty());
}

#[tokio::test]
async fn youdao_session_check_uses_the_response_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login/acc/query/accountinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "code": 0 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wordbook/webapi/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                { "bookName": "Default", "bookId": 0 },
                { "bookName": "Travel", "bookId": "b-17" },
                { "bookName": "Broken" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let youdao = youdao_for(&server);

    let status = youdao.validate(&SessionToken::new()).await.unwrap();

    let SessionStatus::Valid(landing) = status else {
        panic!("expected a valid session");
    };
    assert_eq!(
        youdao.list_groups(&landing),
        vec![Group::new("Default", "0"), Group::new("Travel", "b-17")]
    );
}

#[tokio::test]
async fn youdao_nonzero_code_or_html_means_invalid_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login/acc/query/accountinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "code": 2033 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login/acc/query/accountinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wordbook/webapi/books"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let youdao = youdao_for(&server);

    assert!(!youdao.validate(&SessionToken::new()).await.unwrap().is_valid());
    assert!(!youdao.validate(&SessionToken::new()).await.unwrap().is_valid());
}

#[tokio::test]
async fn youdao_pages_by_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wordbook/webapi/words"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": { "total": 31 } })))
        .mount(&server)
        .await;
    for (offset, word) in [("0", "alpha"), ("15", "beta"), ("30", "gamma")] {
        Mock::given(method("GET"))
            .and(path("/wordbook/webapi/words"))
            .and(query_param("bookId", "b-17"))
            .and(query_param("limit", "15"))
            .and(query_param("offset", offset))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "itemList": [ { "word": word } ] }
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (tx, _rx) = tokio::sync::broadcast::channel(16);
    let fetcher = WordFetcher::new(Arc::new(youdao_for(&server)), tx);
    let words = fetcher
        .fetch_group(&Group::new("Travel", "b-17"), &CancellationToken::new())
        .await;

    assert_eq!(words.len(), 3);
    assert!(words.contains("gamma"));
}

/// In-memory word list cancelling the run while a given page is fetched
struct CancellingWordbook {
    pages: u32,
    cancel_on_page: u32,
    cancel: CancellationToken,
    requests: AtomicU32,
}

#[async_trait]
impl Wordbook for CancellingWordbook {
    fn name(&self) -> &str {
        "stub"
    }

    fn login_url(&self) -> &str {
        "http://stub/login"
    }

    fn login_succeeded(&self, _cookies: &SessionToken, _page: &str) -> bool {
        true
    }

    async fn validate(&self, _token: &SessionToken) -> Result<SessionStatus> {
        Ok(SessionStatus::Valid(LandingDocument::Json(serde_json::Value::Null)))
    }

    fn use_session(&self, _token: &SessionToken) {}

    fn list_groups(&self, _landing: &LandingDocument) -> Vec<Group> {
        vec![]
    }

    fn page_size(&self) -> u32 {
        1
    }

    async fn total_pages(&self, _group: &Group) -> Result<u32> {
        Ok(self.pages)
    }

    async fn fetch_page(&self, group: &Group, page: u32) -> Result<Vec<String>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if page == self.cancel_on_page {
            self.cancel.cancel();
        }
        Ok(vec![format!("{}-{page}", group.id)])
    }
}

#[tokio::test]
async fn no_page_request_after_cancellation_is_observed() {
    let cancel = CancellationToken::new();
    let wordbook = Arc::new(CancellingWordbook {
        pages: 5,
        cancel_on_page: 1,
        cancel: cancel.clone(),
        requests: AtomicU32::new(0),
    });
    let (tx, _rx) = tokio::sync::broadcast::channel(16);
    let fetcher = WordFetcher::new(wordbook.clone(), tx);

    let words = fetcher
        .fetch_all(&[Group::new("a", "a"), Group::new("b", "b")], &cancel)
        .await;

    assert_eq!(wordbook.requests.load(Ordering::SeqCst), 2);
    assert_eq!(words.len(), 2, "pages finished before cancellation are kept");
}

#[tokio::test]
async fn fetch_all_merges_groups_and_ticks_once_per_group() {
    let wordbook = Arc::new(CancellingWordbook {
        pages: 2,
        cancel_on_page: u32::MAX,
        cancel: CancellationToken::new(),
        requests: AtomicU32::new(0),
    });
    let (tx, mut rx) = tokio::sync::broadcast::channel(64);
    let fetcher = WordFetcher::new(wordbook, tx);

    let words = fetcher
        .fetch_all(
            &[Group::new("first", "x"), Group::new("second", "y")],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(words.len(), 4);

    let mut ticks = Vec::new();
    let mut fetched_groups = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            Event::Progress { progress, .. } => ticks.push((progress.completed, progress.total)),
            Event::GroupFetched { group, words } => fetched_groups.push((group, words)),
            _ => {}
        }
    }
    assert_eq!(ticks, vec![(1, 2), (2, 2)]);
    assert_eq!(
        fetched_groups,
        vec![("first".to_string(), 2), ("second".to_string(), 2)]
    );
}
