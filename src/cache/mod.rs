//! Cache module for storing the paper feed on disk
//!
//! This module provides a cache manager that persists a single JSON document to
//! the filesystem and decides freshness from the file's modification time and a
//! configurable TTL (time-to-live).

mod manager;

pub use manager::{CacheError, CacheManager};
