//! Fetch boundary: retrieves raw feed bytes and hands decoded feeds to the
//! board.
//!
//! Transport and decode failures stop here. Callers always receive a
//! [`FeedMessage`], empty when anything went wrong, so projection code only
//! ever sees "no matching entities".

mod basic;
mod client;
mod headers;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use headers::WithHeader;

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::model::FeedMessage;
use crate::parser::FeedDecoder;
use crate::stats::FeedSummary;

/// GETs `url`, failing on transport errors and non-2xx statuses.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Loads feed bytes from a local file path or over HTTP.
pub async fn load_bytes<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http") {
        fetch_bytes(client, source).await
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read feed file '{source}'"))
    }
}

/// Fetches and decodes one feed, substituting an empty feed on failure.
#[tracing::instrument(skip(client, decoder))]
pub async fn fetch_feed<C: HttpClient>(
    client: &C,
    decoder: &FeedDecoder,
    source: &str,
) -> FeedMessage {
    let bytes = match load_bytes(client, source).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Feed fetch failed");
            return FeedMessage::empty();
        }
    };

    debug!(bytes = bytes.len(), "Feed bytes received, decoding");
    match decoder.decode(&bytes) {
        Ok(feed) => {
            let summary = FeedSummary::from_feed(&feed);
            debug!(
                entities = summary.total_entities,
                trip_updates = summary.trip_updates,
                alerts = summary.alerts,
                "Feed decoded"
            );
            feed
        }
        Err(e) => {
            error!(error = %e, "Feed decode failed");
            FeedMessage::empty()
        }
    }
}

/// The two feeds of one refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct FeedPair {
    pub trips: FeedMessage,
    pub alerts: FeedMessage,
}

/// Fetches the trips and alerts feeds concurrently.
pub async fn fetch_both<C: HttpClient>(
    client: &C,
    decoder: &FeedDecoder,
    trips: &str,
    alerts: &str,
) -> FeedPair {
    let (trips, alerts) = tokio::join!(
        fetch_feed(client, decoder, trips),
        fetch_feed(client, decoder, alerts)
    );
    FeedPair { trips, alerts }
}
