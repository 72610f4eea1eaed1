// src/adstxt/parse.rs
// =============================================================================
// Parses the text of an ads.txt file.
//
// Format (one record per line):
//   # comments run from '#' to the end of the line
//   <ad system domain>, <publisher id>, <DIRECT|RESELLER>[, <cert authority id>]
//   subdomain=<child domain that has its own ads.txt>
//
// Parsing never fails: lines that don't look like either form are skipped.
// The function is pure, so parsing the same body twice gives the same result.
// =============================================================================

use super::{Entry, Parsed};
use once_cell::sync::Lazy;
use regex::Regex;

// `subdomain = value`, key matched case-insensitively anywhere on the line
static SUBDOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)subdomain\s*=(.*)$").expect("subdomain pattern is valid"));

// Parses an ads.txt body into entries and declared sub-domains
//
// A missing body (fetch failed, or the server sent HTML) parses to an
// empty result.
pub fn parse(body: Option<&str>) -> Parsed {
    let mut parsed = Parsed::default();

    let Some(body) = body else {
        return parsed;
    };

    for line in body.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(subdomain) = parse_subdomain(line) {
            parsed.subdomains.push(subdomain);
        }

        if let Some(entry) = parse_entry(line) {
            parsed.entries.push(entry);
        }
    }

    parsed
}

// Everything before the first '#'
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(index) => &line[..index],
        None => line,
    }
}

fn parse_subdomain(line: &str) -> Option<String> {
    let captures = SUBDOMAIN.captures(line)?;
    let value = captures.get(1)?.as_str().trim();

    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// A data line needs at least three comma-separated fields
fn parse_entry(line: &str) -> Option<Entry> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    if fields.len() <= 2 {
        return None;
    }

    Some(Entry {
        domain: fields[0].to_string(),
        publisher: fields[1].to_string(),
        kind: fields[2].to_string(),
        certificate_id: fields.get(3).map(|id| id.to_string()),
    })
}
