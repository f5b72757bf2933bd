// src/wiki/fetch.rs
// =============================================================================
// This module asks a MediaWiki site which articles a batch of pages link to.
//
// Strategy:
// - One GET to {base}/w/api.php per batch of at most 50 titles
// - Decode query.pages[*].title and query.pages[*].links[*].title
// - Follow "continue" responses until the API has listed every link
// - Retry transient failures (timeouts, 5xx, 429) a bounded number of times
//
// The search core never sees reqwest: it only talks to the LinkFetcher trait,
// which lets the tests swap in a stub that serves a hard-coded link graph.
//
// Rust concepts:
// - Traits: LinkFetcher is the seam between the search and the network
// - async fn in traits: the trait method returns a future directly
// - serde derive: JSON responses decode straight into structs
// - Option<T> with #[serde(default)]: fields the API may leave out
// =============================================================================

use super::query::{batch, build_url};
use crate::config::{SearchConfig, MAX_BATCH_SIZE};
use crate::error::FetchError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Page title -> titles it links to, in the order the wiki lists them
pub type LinkMap = HashMap<String, Vec<String>>;

/// Upper bound on "continue" round-trips for a single batch
///
/// Big hub articles legitimately need hundreds of continuations, so this
/// only stops a server that keeps inventing fresh tokens forever.
const MAX_CONTINUATIONS: usize = 10_000;

/// Anything that can look up the outbound links of a batch of titles
///
/// Titles the source does not know are left out of the result. Link lists
/// keep duplicates exactly as the source reports them. Every requested
/// spelling of a known page gets its own entry, so asking for both
/// "joseph opala" and "Joseph Opala" yields two keys with the same links.
#[allow(async_fn_in_trait)]
pub trait LinkFetcher {
    async fn fetch_links(&self, titles: &[String]) -> Result<LinkMap, FetchError>;
}

// -----------------------------------------------------------------------------
// Response shape
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WikiResponse {
    #[serde(default)]
    query: Option<WikiQuery>,
    #[serde(rename = "continue", default)]
    continuation: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct WikiQuery {
    #[serde(default)]
    normalized: Vec<Normalization>,
    // Keyed by page id, which we don't care about
    #[serde(default)]
    pages: HashMap<String, WikiPage>,
}

#[derive(Debug, Deserialize)]
struct Normalization {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    title: String,
    #[serde(default)]
    links: Vec<WikiLink>,
    #[serde(default)]
    missing: Option<Value>,
    #[serde(default)]
    invalid: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WikiLink {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

impl WikiPage {
    fn exists(&self) -> bool {
        self.missing.is_none() && self.invalid.is_none()
    }
}

// Continuation values are strings in practice; anything else is stringified
fn continuation_params(raw: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    raw.into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect()
}

// -----------------------------------------------------------------------------
// HTTP implementation
// -----------------------------------------------------------------------------

/// LinkFetcher backed by a live MediaWiki API
pub struct WikiFetcher {
    client: Client,
    base_url: String,
    retries: u32,
    backoff: Duration,
}

impl WikiFetcher {
    pub fn new(base_url: &str, config: &SearchConfig) -> Result<Self, FetchError> {
        // Fail fast on a bad base URL instead of on the first request
        build_url(base_url, &[], &BTreeMap::new())?;

        let client = Client::builder()
            .user_agent(concat!("wiki-path/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            retries: config.retries,
            backoff: config.retry_backoff,
        })
    }

    // Fetches every link of one batch, following continuations
    //
    // The API hands out links a slice at a time. Each response either ends
    // the listing (no "continue" object) or tells us what to send back to
    // get the next slice.
    async fn fetch_batch(&self, titles: &[String], links: &mut LinkMap) -> Result<(), FetchError> {
        // The first request carries no continuation parameters
        let mut continuation = BTreeMap::new();

        for _ in 0..MAX_CONTINUATIONS {
            // Same titles every time; only the continuation part changes
            let url = build_url(&self.base_url, titles, &continuation)?;
            let response = self.get_with_retry(url).await?;

            // MediaWiki reports bad requests with HTTP 200 and an "error" object
            if let Some(error) = response.error {
                return Err(FetchError::Decode(format!(
                    "API error '{}': {}",
                    error.code, error.info
                )));
            }

            if let Some(query) = response.query {
                merge_pages(query, titles, links);
            }

            let next = match response.continuation {
                Some(next) => continuation_params(next),
                // No "continue" object: every link has been listed
                None => return Ok(()),
            };

            // Sending back the same token would return the same slice forever
            if next == continuation {
                return Err(FetchError::Decode(format!(
                    "continuation did not advance: {:?}",
                    next
                )));
            }

            continuation = next;
        }

        Err(FetchError::TooManyContinuations(MAX_CONTINUATIONS))
    }

    // Sends one request, retrying it while the failure looks temporary
    //
    // Returns the decoded response, or the last error once the retries run
    // out (or straight away for errors that won't go away, like bad JSON).
    async fn get_with_retry(&self, url: Url) -> Result<WikiResponse, FetchError> {
        // Number of retries made so far (the first try is not a retry)
        let mut attempt = 0;

        loop {
            // url is reused on the next pass, so each attempt gets a clone
            match self.get_once(url.clone()).await {
                // Success: hand the decoded response back
                Ok(response) => return Ok(response),

                // Timeout, connection trouble, 5xx or 429 with retries left:
                // wait a bit longer each time, then go around again
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!(%url, attempt, error = %e, "retrying wiki request");
                    tokio::time::sleep(self.backoff * attempt).await;
                }

                // Permanent failure, or out of retries
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(&self, url: Url) -> Result<WikiResponse, FetchError> {
        debug!(%url, "GET");

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl LinkFetcher for WikiFetcher {
    async fn fetch_links(&self, titles: &[String]) -> Result<LinkMap, FetchError> {
        let mut links = LinkMap::new();

        // The core already hands us batches, but oversize input is still legal
        for group in batch(titles, MAX_BATCH_SIZE) {
            self.fetch_batch(&group, &mut links).await?;
        }

        Ok(links)
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(error)
    }
}

// Adds one response's pages to `links`, keyed by the titles we asked for
//
// The API may rewrite a requested title ("joseph opala" -> "Joseph Opala").
// Mapping it back lets the caller look pages up by its own spelling. Several
// spellings can land on one page, and each of them gets the links.
// Continuation responses repeat a page with the next slice of its links,
// so lists are extended rather than replaced.
fn merge_pages(query: WikiQuery, requested: &[String], links: &mut LinkMap) {
    // Canonical title -> every spelling of it that we sent
    let mut spellings: HashMap<String, Vec<String>> = HashMap::new();
    for n in query.normalized {
        spellings.entry(n.to).or_default().push(n.from);
    }

    for page in query.pages.into_values() {
        // Missing and invalid titles come back as pages too; skip them
        if !page.exists() {
            continue;
        }

        let mut keys = spellings.remove(&page.title).unwrap_or_default();
        if keys.is_empty() || requested.contains(&page.title) {
            keys.push(page.title);
        }

        let page_links: Vec<String> = page.links.into_iter().map(|l| l.title).collect();
        for key in keys {
            links.entry(key).or_default().extend(page_links.iter().cloned());
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is a "continue" object?
//    - pllimit=max still caps how many links one response may carry
//    - When more remain, the API adds {"continue": {"plcontinue": ...}}
//    - Sending those values back gets the next slice; no object means done
//
// 2. Why compare the new token with the previous one?
//    - A healthy server always moves forward
//    - Getting the same token back would repeat the same slice forever
//
// 3. Why is Decode not retried?
//    - Timeouts and 5xx errors often pass on their own
//    - A body that isn't valid JSON will be just as broken on the next try
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, Request, Respond, ResponseTemplate,
    };

    // Builds a format=json body with one page entry per (title, links) pair
    fn wiki_body(pages: &[(&str, &[&str])]) -> Value {
        let pages: serde_json::Map<String, Value> = pages
            .iter()
            .enumerate()
            .map(|(i, (title, links))| {
                let links: Vec<Value> = links.iter().map(|l| json!({ "title": l })).collect();
                (i.to_string(), json!({ "title": title, "links": links }))
            })
            .collect();

        json!({ "batchcomplete": "", "query": { "pages": pages } })
    }

    fn fetcher(server: &MockServer) -> WikiFetcher {
        let config = SearchConfig {
            retry_backoff: Duration::from_millis(1),
            ..SearchConfig::default()
        };
        WikiFetcher::new(&server.uri(), &config).unwrap()
    }

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fetch_two_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("action", "query"))
            .and(query_param("titles", "Joseph Opala|Ferrari"))
            .and(query_param("prop", "links"))
            .and(query_param("pllimit", "max"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(wiki_body(&[
                ("Joseph Opala", &["whatever"]),
                ("Ferrari", &["lamborghini"]),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let links = fetcher(&server)
            .fetch_links(&titles(&["Joseph Opala", "Ferrari"]))
            .await
            .unwrap();

        let mut expected = LinkMap::new();
        expected.insert("Joseph Opala".to_string(), titles(&["whatever"]));
        expected.insert("Ferrari".to_string(), titles(&["lamborghini"]));
        assert_eq!(links, expected);
    }

    #[tokio::test]
    async fn test_more_than_fifty_titles_takes_two_requests() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(wiki_body(&[])))
            .expect(2)
            .mount(&server)
            .await;

        let many: Vec<String> = (0..51).map(|i| i.to_string()).collect();
        let links = fetcher(&server).fetch_links(&many).await.unwrap();

        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_titles_are_omitted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": {
                    "-1": { "ns": 0, "title": "Nowhere Land", "missing": "" },
                    "12": { "ns": 0, "title": "Ferrari", "links": [{ "ns": 0, "title": "Enzo Ferrari" }] }
                }}
            })))
            .mount(&server)
            .await;

        let links = fetcher(&server)
            .fetch_links(&titles(&["Nowhere Land", "Ferrari"]))
            .await
            .unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(links["Ferrari"], titles(&["Enzo Ferrari"]));
    }

    #[tokio::test]
    async fn test_page_without_links_is_still_present() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { "7": { "ns": 0, "title": "Dead End" } } }
            })))
            .mount(&server)
            .await;

        let links = fetcher(&server).fetch_links(&titles(&["Dead End"])).await.unwrap();
        assert_eq!(links.get("Dead End"), Some(&Vec::new()));
    }

    #[tokio::test]
    async fn test_normalized_titles_keyed_by_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {
                    "normalized": [{ "from": "joseph opala", "to": "Joseph Opala" }],
                    "pages": { "3": { "title": "Joseph Opala", "links": [{ "title": "Batman" }] } }
                }
            })))
            .mount(&server)
            .await;

        let links = fetcher(&server).fetch_links(&titles(&["joseph opala"])).await.unwrap();
        assert_eq!(links["joseph opala"], titles(&["Batman"]));
    }

    #[tokio::test]
    async fn test_both_spellings_of_one_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {
                    "normalized": [{ "from": "joseph opala", "to": "Joseph Opala" }],
                    "pages": { "3": { "title": "Joseph Opala", "links": [{ "title": "Batman" }] } }
                }
            })))
            .mount(&server)
            .await;

        let links = fetcher(&server)
            .fetch_links(&titles(&["joseph opala", "Joseph Opala"]))
            .await
            .unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(links["joseph opala"], titles(&["Batman"]));
        assert_eq!(links["Joseph Opala"], titles(&["Batman"]));
    }

    #[tokio::test]
    async fn test_duplicate_links_are_kept() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(wiki_body(&[(
                "Batman",
                &["Robin", "Robin", "Joker"],
            )])))
            .mount(&server)
            .await;

        let links = fetcher(&server).fetch_links(&titles(&["Batman"])).await.unwrap();
        assert_eq!(links["Batman"], titles(&["Robin", "Robin", "Joker"]));
    }

    #[tokio::test]
    async fn test_follows_continuation() {
        let server = MockServer::start().await;

        // Second page of results, matched only when plcontinue is sent back
        Mock::given(method("GET"))
            .and(query_param("plcontinue", "12|0|Lamborghini"))
            .and(query_param("continue", "||"))
            .respond_with(ResponseTemplate::new(200).set_body_json(wiki_body(&[(
                "Ferrari",
                &["Lamborghini", "Maserati"],
            )])))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        let mut first = wiki_body(&[("Ferrari", &["Enzo Ferrari", "Fiat"])]);
        first["continue"] = json!({ "plcontinue": "12|0|Lamborghini", "continue": "||" });

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first))
            .expect(1)
            .mount(&server)
            .await;

        let links = fetcher(&server).fetch_links(&titles(&["Ferrari"])).await.unwrap();
        assert_eq!(
            links["Ferrari"],
            titles(&["Enzo Ferrari", "Fiat", "Lamborghini", "Maserati"])
        );
    }

    // Answers with one link per request and a fresh plcontinue token
    // ("1|0|<n+1>") until `last` tokens have been handed out
    struct AdvancingTokens {
        last: usize,
    }

    impl Respond for AdvancingTokens {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let step: usize = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "plcontinue")
                .and_then(|(_, v)| v.rsplit('|').next().and_then(|n| n.parse().ok()))
                .unwrap_or(0);

            let mut body = wiki_body(&[("Hub", &[])]);
            body["query"]["pages"]["0"]["links"] = json!([{ "title": format!("Link {}", step) }]);
            if step < self.last {
                body["continue"] = json!({
                    "plcontinue": format!("1|0|{}", step + 1),
                    "continue": "||"
                });
            }

            ResponseTemplate::new(200).set_body_json(body)
        }
    }

    #[tokio::test]
    async fn test_long_continuation_chain_completes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(AdvancingTokens { last: 150 })
            .expect(151)
            .mount(&server)
            .await;

        let links = fetcher(&server).fetch_links(&titles(&["Hub"])).await.unwrap();

        let hub = &links["Hub"];
        assert_eq!(hub.len(), 151);
        assert_eq!(hub[0], "Link 0");
        assert_eq!(hub[150], "Link 150");
    }

    #[tokio::test]
    async fn test_repeated_continuation_is_an_error() {
        let server = MockServer::start().await;

        let mut body = wiki_body(&[("Hub", &["Somewhere"])]);
        body["continue"] = json!({ "plcontinue": "1|0|Stuck", "continue": "||" });

        // First request gets the token, second sends it back and gets it again
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(2)
            .mount(&server)
            .await;

        let err = fetcher(&server).fetch_links(&titles(&["Hub"])).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(err.to_string().contains("did not advance"));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(wiki_body(&[("Robin", &["Joker"])])))
            .expect(1)
            .mount(&server)
            .await;

        let links = fetcher(&server).fetch_links(&titles(&["Robin"])).await.unwrap();
        assert_eq!(links["Robin"], titles(&["Joker"]));
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let server = MockServer::start().await;

        // One attempt plus the two default retries
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = fetcher(&server).fetch_links(&titles(&["Robin"])).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(500)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(&server).fetch_links(&titles(&["Robin"])).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_api_error_object() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "code": "toomanyvalues", "info": "Too many values supplied" }
            })))
            .mount(&server)
            .await;

        let err = fetcher(&server).fetch_links(&titles(&["Robin"])).await.unwrap_err();
        assert!(err.to_string().contains("toomanyvalues"));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = WikiFetcher::new("definitely not a url", &SearchConfig::default());
        assert!(matches!(result, Err(FetchError::InvalidBaseUrl(_))));
    }
}
