// src/adstxt/mod.rs
// =============================================================================
// This module knows everything about ads.txt files themselves.
//
// Submodules:
// - fetch: Downloads http://{domain}/ads.txt and rejects HTML placeholders
// - parse: Turns the text of an ads.txt file into entries and sub-domains
//
// This file holds the record types that flow through the rest of the
// crawler: a FetchResult comes out of the fetcher, a ParsedRecord goes to
// the output file.
// =============================================================================

mod fetch;
mod parse;

pub use fetch::{fetch_domain, Fetcher, HttpFetcher};
pub use parse::parse;

use crate::error::FetchError;
use serde::{Deserialize, Serialize};

// One seller line of an ads.txt file, e.g.
//   google.com, pub-0000000000000000, DIRECT, f08c47fec0942fa0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Advertising system domain (first field)
    pub domain: String,
    /// Publisher account id within that system
    pub publisher: String,
    /// Relationship, usually DIRECT or RESELLER
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional certification authority id (fourth field)
    pub certificate_id: Option<String>,
}

// Everything extracted from one ads.txt body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parsed {
    pub subdomains: Vec<String>,
    pub entries: Vec<Entry>,
}

// Raw outcome of fetching one domain.
//
// At most one of `body` and `error` is set. Both are None when the server
// answered with something that is not an ads.txt file (an HTML page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub domain: String,
    pub body: Option<String>,
    pub error: Option<FetchError>,
}

// The unit written to the output file, one per processed domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub domain: String,
    pub body: Option<String>,
    pub error: Option<FetchError>,
    pub parsed: Parsed,
}

impl From<FetchResult> for ParsedRecord {
    fn from(result: FetchResult) -> Self {
        let parsed = parse(result.body.as_deref());
        ParsedRecord {
            domain: result.domain,
            body: result.body,
            error: result.error,
            parsed,
        }
    }
}

// Serialized shape of a record when raw bodies are not kept.
// Borrows from the record so stripping the body costs nothing.
#[derive(Debug, Serialize)]
pub struct StrippedRecord<'a> {
    pub domain: &'a str,
    pub error: &'a Option<FetchError>,
    pub parsed: &'a Parsed,
}

impl<'a> From<&'a ParsedRecord> for StrippedRecord<'a> {
    fn from(record: &'a ParsedRecord) -> Self {
        StrippedRecord {
            domain: &record.domain,
            error: &record.error,
            parsed: &record.parsed,
        }
    }
}
