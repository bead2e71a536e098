use thiserror::Error;

/// The two remote documents the map is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Earthquakes,
    FaultLines,
}

impl FeedKind {
    pub fn label(self) -> &'static str {
        match self {
            FeedKind::Earthquakes => "earthquakes",
            FeedKind::FaultLines => "fault_lines",
        }
    }
}

/// Where to fetch one feed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedSource {
    pub kind: FeedKind,
    pub url: String,
}

/// Completion of one fetch, successful or not.
#[derive(Debug)]
pub struct FeedEvent {
    pub kind: FeedKind,
    pub result: Result<String, FetchError>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
