//! RSS and Atom headline discovery

use crate::errors::{WorkerError, WorkerResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use tracing::{info, warn};

/// Item titles of an RSS 2.0 or Atom document, in document order
pub fn parse_titles(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut titles = Vec::new();
    let mut in_item = false;
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"item" | b"entry" => in_item = true,
                b"title" if in_item => current = Some(String::new()),
                _ => {}
            },
            Event::Text(e) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"title" => {
                    if let Some(title) = current.take() {
                        let title = title.trim();
                        if !title.is_empty() {
                            titles.push(title.to_string());
                        }
                    }
                }
                b"item" | b"entry" => in_item = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(titles)
}

/// Drop repeated headlines, keeping the first occurrence
pub fn dedupe(headlines: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headlines
        .into_iter()
        .filter(|h| seen.insert(h.clone()))
        .collect()
}

async fn fetch_feed(http: &reqwest::Client, url: &str) -> WorkerResult<Vec<String>> {
    let body = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    parse_titles(&body).map_err(|e| WorkerError::Feed {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Headlines from every feed; unreachable or malformed feeds are skipped
pub async fn fetch_headlines(http: &reqwest::Client, feeds: &[String]) -> Vec<String> {
    let mut all = Vec::new();

    for url in feeds {
        match fetch_feed(http, url).await {
            Ok(titles) => {
                info!(url = %url, count = titles.len(), "Feed read");
                all.extend(titles);
            }
            Err(e) => warn!(url = %url, error = %e, "Skipping feed"),
        }
    }

    let unique = dedupe(all);
    info!(count = unique.len(), "Unique headlines collected");
    unique
}
