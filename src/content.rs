//! Content posts that a scan result resolves into.
//!
//! The scanner does not fetch or cache content itself; it asks a
//! `ContentRepository` for the feed and looks posts up by `GarbageType`.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::GarbageType;

/// Every Nth feed request fails in the in-memory repository (0 disables).
pub const DEFAULT_FAIL_EVERY: u32 = 5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub garbage_type: GarbageType,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    /// Asset name of the header image.
    pub image: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PostsFeed {
    #[serde(default)]
    pub reduced_info: Vec<Post>,
    #[serde(default)]
    pub info: Vec<Post>,
}

impl PostsFeed {
    /// Reduced posts first, then full posts.
    pub fn all_posts(&self) -> impl Iterator<Item = &Post> {
        self.reduced_info.iter().chain(self.info.iter())
    }

    pub fn find(&self, garbage_type: GarbageType) -> Option<&Post> {
        self.all_posts().find(|post| post.garbage_type == garbage_type)
    }
}

/// Source of content posts.
pub trait ContentRepository: Send + Sync {
    fn posts_feed(&self) -> Result<PostsFeed>;

    fn post(&self, garbage_type: GarbageType) -> Result<Post>;
}

/// Repository backed by an in-memory feed.
///
/// Like a flaky remote, every `fail_every`-th feed request fails.
pub struct InMemoryContentRepository {
    feed: PostsFeed,
    fail_every: u32,
    requests: AtomicU32,
}

impl InMemoryContentRepository {
    pub fn new(feed: PostsFeed) -> Self {
        Self {
            feed,
            fail_every: DEFAULT_FAIL_EVERY,
            requests: AtomicU32::new(0),
        }
    }

    /// Built-in posts for every garbage type.
    pub fn builtin() -> Self {
        Self::new(builtin_feed())
    }

    /// Load a feed from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read content feed {}", path.display()))?;
        let feed: PostsFeed = serde_json::from_str(&raw)
            .with_context(|| format!("invalid content feed {}", path.display()))?;
        Ok(Self::new(feed))
    }

    pub fn with_fail_every(mut self, fail_every: u32) -> Self {
        self.fail_every = fail_every;
        self
    }

    pub fn request_count(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ContentRepository for InMemoryContentRepository {
    fn posts_feed(&self) -> Result<PostsFeed> {
        let request = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && request % self.fail_every == 0 {
            return Err(anyhow!("content feed request #{} failed", request));
        }
        Ok(self.feed.clone())
    }

    fn post(&self, garbage_type: GarbageType) -> Result<Post> {
        self.feed
            .find(garbage_type)
            .cloned()
            .ok_or_else(|| anyhow!("post not found for {}", garbage_type))
    }
}

fn post(garbage_type: GarbageType, title: &str, subtitle: &str, paragraph: &str, image: &str) -> Post {
    Post {
        garbage_type,
        title: title.to_string(),
        subtitle: Some(subtitle.to_string()),
        paragraphs: vec![paragraph.to_string()],
        image: image.to_string(),
    }
}

fn builtin_feed() -> PostsFeed {
    PostsFeed {
        reduced_info: Vec::new(),
        info: vec![
            post(
                GarbageType::Plastic,
                "Plastic",
                "Plastic is a serious threat to the environment.",
                "Only a small share of plastic waste is recycled; the rest ends up in landfills \
                 where it breaks down and releases toxic substances.",
                "plastic",
            ),
            post(
                GarbageType::Paper,
                "Paper",
                "More than a third of household waste is paper and cardboard.",
                "Recycling paper and cardboard helps preserve forests.",
                "paperboard",
            ),
            post(
                GarbageType::Metal,
                "Metal",
                "Worn-out metal items are fit for recycling.",
                "Recycled metal saves non-renewable resources and reduces landfill area.",
                "metal",
            ),
            post(
                GarbageType::Glass,
                "Glass",
                "Glass recycling matters.",
                "Glass barely decomposes, yet it can be recycled indefinitely at low cost.",
                "glass",
            ),
            post(
                GarbageType::Organic,
                "Organic",
                "Organic waste is food leftovers.",
                "Bio-waste goes into the brown container.",
                "bio_apple",
            ),
        ],
    }
}
