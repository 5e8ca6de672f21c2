//! Week-scoped plan files for the weekly cluster and e-book jobs
//!
//! Plans are pretty-printed JSON on local disk. A plan stamped with another
//! ISO year or week than today's is stale and gets regenerated.

use crate::errors::{WorkerError, WorkerResult};
use chrono::{Datelike, NaiveDate};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Completed,
    Skipped,
}

/// ISO `(year, week)` of `date`
pub fn iso_week(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

/// Anything stamped with an ISO year and week
pub trait WeekScoped {
    fn week(&self) -> (i32, u32);

    fn is_current(&self, today: NaiveDate) -> bool {
        self.week() == iso_week(today)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTopic {
    pub title: String,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    /// ISO week-based year; plans written without it count as stale
    #[serde(default)]
    pub week_year: i32,
    pub week_number: u32,
    pub pillar_topic: String,
    pub category: String,
    pub topics: Vec<PlannedTopic>,
}

impl WeeklyPlan {
    /// Index of the first topic still pending
    pub fn next_pending(&self) -> Option<usize> {
        self.topics.iter().position(|t| t.status == Status::Pending)
    }

    pub fn mark(&mut self, index: usize, status: Status) {
        if let Some(topic) = self.topics.get_mut(index) {
            topic.status = status;
        }
    }
}

impl WeekScoped for WeeklyPlan {
    fn week(&self) -> (i32, u32) {
        (self.week_year, self.week_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EbookPlan {
    #[serde(default)]
    pub week_year: i32,
    pub week_number: u32,
    pub ebook_title: String,
    pub subtitle: String,
    pub category: String,
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
}

impl EbookPlan {
    pub fn pending_chapters(&self) -> Vec<usize> {
        self.chapters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.status != Status::Completed)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        !self.chapters.is_empty() && self.pending_chapters().is_empty()
    }

    pub fn outline(&self) -> Vec<String> {
        self.chapters.iter().map(|c| c.title.clone()).collect()
    }

    /// Title block followed by every chapter as a level-one section
    pub fn manuscript(&self) -> String {
        let mut out = format!(
            "---\ntitle: \"{}\"\nsubtitle: \"{}\"\n---\n\n",
            self.ebook_title.replace('"', "'"),
            self.subtitle.replace('"', "'")
        );

        for chapter in &self.chapters {
            out.push_str(&format!("# {}\n\n", chapter.title));
            out.push_str(chapter.content.as_deref().unwrap_or_default().trim());
            out.push_str("\n\n");
        }

        out
    }
}

impl WeekScoped for EbookPlan {
    fn week(&self) -> (i32, u32) {
        (self.week_year, self.week_number)
    }
}

/// Read a plan; a missing or unreadable file yields `None`
pub async fn load<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Plan file unreadable");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(plan) => Some(plan),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Plan file is corrupt, it will be replaced");
            None
        }
    }
}

/// Write a plan as pretty JSON
pub async fn save<T: Serialize>(path: &Path, plan: &T) -> WorkerResult<()> {
    let json = serde_json::to_string_pretty(plan).map_err(|e| WorkerError::Plan {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    tokio::fs::write(path, json).await?;
    Ok(())
}
