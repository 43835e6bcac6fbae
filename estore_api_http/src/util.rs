use estore_configuration::EMBED_QUERY_PARAM;
use estore_proto::{classify_status, types::EmbedMode, FeedError};
use reqwest::{RequestBuilder, Response};
use url::Url;

use crate::HttpClientError;

/// `host` extended by `segments`, each segment percent-encoded
pub(crate) fn endpoint(host: &Url, segments: &[&str]) -> Url {
    let mut url = host.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Url of a feed page request. Any embed parameter already on the link is replaced, and none
/// is sent for [`EmbedMode::None`].
pub(crate) fn feed_request_url(url: &str, embed_mode: EmbedMode) -> Result<Url, FeedError> {
    let mut parsed = Url::parse(url).map_err(|e| HttpClientError::from(e).into_feed_error(url))?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != EMBED_QUERY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed.set_query(None);
    if !kept.is_empty() || embed_mode.query_value().is_some() {
        let mut query = parsed.query_pairs_mut();
        query.extend_pairs(kept);
        if let Some(mode) = embed_mode.query_value() {
            query.append_pair(EMBED_QUERY_PARAM, mode);
        }
    }
    Ok(parsed)
}

pub(crate) fn parse_url(url: &str) -> Result<Url, FeedError> {
    Url::parse(url).map_err(|e| HttpClientError::from(e).into_feed_error(url))
}

pub(crate) async fn send(request: RequestBuilder, url: &str) -> Result<Response, FeedError> {
    request
        .send()
        .await
        .map_err(|e| HttpClientError::from(e).into_feed_error(url))
}

/// Classify the response status and read the body of a successful response
pub(crate) async fn read_body(response: Response, url: &str) -> Result<Vec<u8>, FeedError> {
    classify_status(response.status().as_u16(), url)?;
    let body = response
        .bytes()
        .await
        .map_err(|e| HttpClientError::from(e).into_feed_error(url))?;
    Ok(body.to_vec())
}
