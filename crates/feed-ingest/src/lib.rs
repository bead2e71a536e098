//! Background fetchers for the earthquake and fault-line feeds.
//!
//! Each feed is requested on its own thread with a blocking client and its
//! completion is forwarded over the returned [`Receiver`]. Fetches are
//! independent, so events arrive in whichever order the servers answer.

use std::{thread, time::Duration};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use reqwest::blocking::Client;
use tracing::{debug, info_span, warn};

mod types;

pub use types::{FeedEvent, FeedKind, FeedSource, FetchError};

const USER_AGENT: &str = concat!("quakemap/", env!("CARGO_PKG_VERSION"));

/// Knobs shared by every fetch thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchOptions {
    /// Overall request timeout. `None` waits for as long as the server does.
    pub timeout: Option<Duration>,
}

/// Build the blocking client used for feed requests.
pub fn build_client(options: FetchOptions) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(options.timeout)
        .build()
        .context("failed to build HTTP client")
        .map_err(FetchError::Other)
}

/// GET a document and return its body as text.
pub fn fetch_document(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })
}

/// Spawn one fetch thread per source and return the channel their
/// completions arrive on. Each source produces exactly one event.
pub fn spawn_feed_readers(
    sources: Vec<FeedSource>,
    options: FetchOptions,
) -> Result<Receiver<FeedEvent>> {
    let (tx, rx) = bounded(sources.len().max(1));

    for source in sources {
        let tx = tx.clone();
        thread::Builder::new()
            .name(format!("feed-{}", source.kind.label()))
            .spawn(move || fetch_loop(source, options, tx))
            .context("Failed to spawn feed reader thread")?;
    }

    Ok(rx)
}

fn fetch_loop(source: FeedSource, options: FetchOptions, tx: Sender<FeedEvent>) {
    let span = info_span!("feed.fetch", feed = source.kind.label(), url = %source.url);
    let _guard = span.enter();

    let result = build_client(options).and_then(|client| fetch_document(&client, &source.url));
    match &result {
        Ok(body) => debug!("Fetched {} bytes", body.len()),
        Err(err) => warn!("Fetch failed: {err}"),
    }

    if tx
        .send(FeedEvent {
            kind: source.kind,
            result,
        })
        .is_err()
    {
        debug!("Feed receiver dropped before completion was delivered");
    }
}
