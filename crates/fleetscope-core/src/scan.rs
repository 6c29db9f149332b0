// ── Multi-host scan cursors ──
//
// A logical scan over one cluster walks each host independently. The
// cursor keeps one token per host: `None` means not started, `Some(0)`
// means exhausted, anything else resumes that host's scan.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-host token that marks an exhausted host.
pub const EXHAUSTED: u64 = 0;

/// Wire form of a [`Cursor`]: `{ "complete": bool, "cursors": { host: n|null } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCursor {
    pub complete: bool,
    #[serde(default)]
    pub cursors: IndexMap<String, Option<u64>>,
}

/// Scan progress across the hosts of one cluster, in host order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    tokens: IndexMap<String, Option<u64>>,
}

impl Cursor {
    /// A cursor with every host not yet started.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: hosts.into_iter().map(|h| (h.into(), None)).collect(),
        }
    }

    /// Rebuild a cursor for `hosts` from what the client sent back.
    ///
    /// Hosts the client did not mention start fresh; hosts the client
    /// mentions that are not in `hosts` are dropped.
    pub fn from_client_cursor<I, S>(hosts: I, client: Option<&ClientCursor>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = hosts
            .into_iter()
            .map(|host| {
                let host = host.into();
                let token = client
                    .and_then(|c| c.cursors.get(&host).copied())
                    .flatten();
                (host, token)
            })
            .collect();
        Self { tokens }
    }

    /// Token for `host`; `None` if not started or unknown.
    pub fn token(&self, host: &str) -> Option<u64> {
        self.tokens.get(host).copied().flatten()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    /// The first host, in order, that is not exhausted.
    pub fn first_incomplete(&self) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(_, token)| **token != Some(EXHAUSTED))
            .map(|(host, _)| host.as_str())
    }

    /// `true` when every host's token is unset or exhausted.
    pub fn is_complete(&self) -> bool {
        self.tokens
            .values()
            .all(|token| matches!(token, None | Some(EXHAUSTED)))
    }

    pub fn to_client_cursor(&self) -> ClientCursor {
        ClientCursor {
            complete: self.is_complete(),
            cursors: self.tokens.clone(),
        }
    }

    fn set(&mut self, host: &str, token: u64) {
        match self.tokens.get_mut(host) {
            Some(slot) => *slot = Some(token),
            None => {
                self.tokens.insert(host.to_owned(), Some(token));
            }
        }
    }
}

/// One page of a multi-host scan, ready to return to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPage<T> {
    pub results: Vec<T>,
    pub total: usize,
    pub scan_count: usize,
    pub cursor: ClientCursor,
}

/// Collects per-host scan pages into one result and one cursor.
///
/// Results keep scan order; nothing is sorted or deduplicated.
#[derive(Debug, Clone)]
pub struct ScanAggregator<T> {
    cursor: Cursor,
    results: Vec<T>,
    total: usize,
    scan_count: usize,
}

impl<T> ScanAggregator<T> {
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            results: Vec::new(),
            total: 0,
            scan_count: 0,
        }
    }

    /// Record one host scan: bump the scan count, move the host's token,
    /// and append its results.
    pub fn add_host_scan_results(&mut self, host: &str, next_cursor: u64, results: Vec<T>) {
        self.scan_count += 1;
        self.total += results.len();
        self.cursor.set(host, next_cursor);
        self.results.extend(results);
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    pub fn results(&self) -> &[T] {
        &self.results
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn into_page(self) -> ScanPage<T> {
        ScanPage {
            cursor: self.cursor.to_client_cursor(),
            results: self.results,
            total: self.total,
            scan_count: self.scan_count,
        }
    }
}
