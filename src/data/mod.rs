//! Core data models for paperfeed
//!
//! This module contains the types shared by the API client and the cache:
//! the ranking [`Mode`], the pass-through [`Paper`] record, and the
//! category-keyed [`PaperFeed`] result structure.

pub mod client;
pub mod transport;

pub use client::{
    FeedConfig, FeedError, FeedSource, FetchFailure, FetchOutcome, PaperFeedClient,
    MAX_PAPERS_PER_MODE,
};
pub use transport::{HttpRequester, HttpResponse, ReqwestRequester, TransportError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Name of the synthetic bucket that aggregates papers from every category
pub const ALL_CATEGORY: &str = "all";

/// Time window used by the API to rank papers by tweet count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Recent,
    Daily,
    Weekly,
    Monthly,
}

impl Mode {
    /// Returns every mode, in ranking-window order
    pub fn all() -> &'static [Mode] {
        &[Mode::Recent, Mode::Daily, Mode::Weekly, Mode::Monthly]
    }

    /// Returns the name the API expects in `sorted_by`
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Recent => "recent",
            Mode::Daily => "daily",
            Mode::Weekly => "weekly",
            Mode::Monthly => "monthly",
        }
    }

    /// Parses an exact mode name.
    ///
    /// Matching is case-sensitive; the API only accepts the lowercase names.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Mode> {
        Mode::all().iter().copied().find(|mode| mode.as_str() == s)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a JSON object can't be used as a paper record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaperError {
    /// The record is not a JSON object
    #[error("paper record is not a JSON object")]
    NotAnObject,

    /// `primary_category` is absent or not a string
    #[error("paper record has no string `primary_category`")]
    MissingCategory,

    /// `num_tweets` is absent or not an integer
    #[error("paper record has no integer `num_tweets`")]
    MissingTweets,
}

/// A single paper as returned by the API
///
/// Only `primary_category` and `num_tweets` are interpreted. Every field of the
/// source object is kept and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Paper {
    /// Primary subject category, e.g. `cs.AI`
    category: String,
    /// Tweet count used for ranking
    num_tweets: i64,
    /// The full source object
    fields: Map<String, Value>,
}

impl Paper {
    /// Validates a raw API value and wraps it
    pub fn from_value(value: Value) -> Result<Self, PaperError> {
        match value {
            Value::Object(fields) => Self::try_from(fields),
            _ => Err(PaperError::NotAnObject),
        }
    }

    /// Primary subject category
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Number of tweets mentioning the paper
    pub fn num_tweets(&self) -> i64 {
        self.num_tweets
    }

    /// Looks up any field of the source object
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the paper title when the API supplied one
    pub fn title(&self) -> Option<&str> {
        self.field("title").and_then(Value::as_str)
    }
}

impl TryFrom<Map<String, Value>> for Paper {
    type Error = PaperError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let category = fields
            .get("primary_category")
            .and_then(Value::as_str)
            .ok_or(PaperError::MissingCategory)?
            .to_string();
        let num_tweets = fields
            .get("num_tweets")
            .and_then(Value::as_i64)
            .ok_or(PaperError::MissingTweets)?;

        Ok(Self {
            category,
            num_tweets,
            fields,
        })
    }
}

impl From<Paper> for Map<String, Value> {
    fn from(paper: Paper) -> Self {
        paper.fields
    }
}

/// Papers grouped by category, then by mode
///
/// Each `(category, mode)` bucket holds papers sorted by tweet count, highest
/// first. The `"all"` category holds every paper of every category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperFeed {
    categories: BTreeMap<String, BTreeMap<Mode, Vec<Paper>>>,
}

impl PaperFeed {
    /// Creates an empty feed
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a paper to the `(category, mode)` bucket, creating it if needed
    pub fn push(&mut self, category: &str, mode: Mode, paper: Paper) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .entry(mode)
            .or_default()
            .push(paper);
    }

    /// Ranks one mode's papers and files each under its category and `"all"`
    ///
    /// The sort is stable, so papers with equal tweet counts keep the order
    /// the API returned them in.
    pub fn insert_ranked(&mut self, mode: Mode, mut papers: Vec<Paper>) {
        papers.sort_by(|a, b| b.num_tweets.cmp(&a.num_tweets));

        for paper in papers {
            let category = paper.category.clone();
            if category != ALL_CATEGORY {
                self.push(&category, mode, paper.clone());
            }
            self.push(ALL_CATEGORY, mode, paper);
        }
    }

    /// Returns the papers in a bucket, or an empty slice if it doesn't exist
    pub fn papers(&self, category: &str, mode: Mode) -> &[Paper] {
        self.categories
            .get(category)
            .and_then(|modes| modes.get(&mode))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the modes present for a category
    pub fn modes(&self, category: &str) -> Vec<Mode> {
        self.categories
            .get(category)
            .map(|modes| modes.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Iterates over category names in sorted order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Number of categories, including `"all"`
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
