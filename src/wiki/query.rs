// src/wiki/query.rs
// =============================================================================
// Turns a list of page titles into MediaWiki "prop=links" requests.
//
// The API accepts at most 50 titles per request, so a long frontier is cut
// into contiguous batches first. Each batch then becomes one URL:
//
//   {base}/w/api.php?action=query&titles=A|B|C&prop=links&pllimit=max&format=json
//
// When the API answers with a "continue" object, its key/value pairs are
// appended to the same query to fetch the next page of links.
//
// Rust concepts:
// - Slices: batch() borrows &[String] and chunks() walks it without copying
// - query_pairs_mut(): the url crate percent-encodes values for us
// =============================================================================

use crate::error::FetchError;
use std::collections::BTreeMap;
use url::Url;

/// Path of the MediaWiki action API relative to the wiki's base URL
const API_PATH: &str = "/w/api.php";

// Splits `titles` into contiguous groups of at most `max_size` titles
//
// Order is preserved and nothing is dropped or duplicated, so joining the
// groups back together gives the input. Empty input yields no groups.
pub fn batch(titles: &[String], max_size: usize) -> Vec<Vec<String>> {
    // chunks() panics on 0, and a zero-sized batch would never make progress
    let max_size = max_size.max(1);

    titles
        .chunks(max_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

// The query parameters asking for the outbound links of one batch
pub fn build_query(titles: &[String]) -> Vec<(&'static str, String)> {
    vec![
        ("action", "query".to_string()),
        ("titles", titles.join("|")),
        ("prop", "links".to_string()),
        ("pllimit", "max".to_string()),
        ("format", "json".to_string()),
    ]
}

// Full request URL for one batch, plus any continuation parameters
//
// Example:
//   build_url("https://pt.wikipedia.org", ["Ronaldo"], {})
//   -> https://pt.wikipedia.org/w/api.php?action=query&titles=Ronaldo&...
pub fn build_url(
    base_url: &str,
    titles: &[String],
    continuation: &BTreeMap<String, String>,
) -> Result<Url, FetchError> {
    // "https://pt.wikipedia.org/" and "https://pt.wikipedia.org" both work
    let endpoint = format!("{}{}", base_url.trim_end_matches('/'), API_PATH);

    let mut url = Url::parse(&endpoint)
        .map_err(|e| FetchError::InvalidBaseUrl(format!("'{}': {}", base_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidBaseUrl(format!(
            "'{}': only http and https are supported",
            base_url
        )));
    }

    // The serializer borrows url mutably, so keep it in its own block
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in build_query(titles) {
            pairs.append_pair(key, &value);
        }
        for (key, value) in continuation {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}
