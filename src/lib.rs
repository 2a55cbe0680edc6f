//! paperfeed library
//!
//! Most-tweeted research papers per category, fetched from papers.labml.ai and
//! cached in a single local JSON file. The binary is a thin wrapper over
//! [`data::PaperFeedClient`].

pub mod cache;
pub mod cli;
pub mod data;
