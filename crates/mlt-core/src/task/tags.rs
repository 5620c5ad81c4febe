//! Tag groups for multi-link batches: one cancellation token per tag.
//!
//! A batch registers its tag when it starts; members (and the batch runner)
//! check the token at their safe points and stop once the tag is gone.
//! Removing a tag cancels its token. Removal is one-way and idempotent.

use rand::Rng;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use super::TagId;

const TAG_MIN: TagId = 100_000;
const TAG_MAX: TagId = 999_999;

/// Result of stopping a tag group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagStop {
    Stopped,
    AlreadyStopped,
}

/// Handle held by a batch member. Cheap to clone; checking it needs no lock.
#[derive(Debug, Clone)]
pub struct TagToken {
    tag: TagId,
    token: CancellationToken,
}

impl TagToken {
    pub fn tag(&self) -> TagId {
        self.tag
    }

    /// False once the group was cancelled or closed.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves when the group is cancelled.
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }
}

/// Set of live tag groups. Lives inside the registry state, so every access
/// happens under the registry mutex.
#[derive(Debug, Default)]
pub struct TagGroups {
    active: HashMap<TagId, CancellationToken>,
}

impl TagGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a group under a fresh six-digit tag.
    pub fn open(&mut self) -> TagToken {
        let mut rng = rand::thread_rng();
        loop {
            let tag = rng.gen_range(TAG_MIN..=TAG_MAX);
            if !self.active.contains_key(&tag) {
                return self.insert(tag);
            }
        }
    }

    /// Register `tag` (or return the live token if it is already registered).
    pub fn insert(&mut self, tag: TagId) -> TagToken {
        let token = self.active.entry(tag).or_default().clone();
        TagToken { tag, token }
    }

    pub fn contains(&self, tag: TagId) -> bool {
        self.active.contains_key(&tag)
    }

    /// Token for a live tag, e.g. for a member submitted after the batch started.
    pub fn token(&self, tag: TagId) -> Option<TagToken> {
        self.active.get(&tag).map(|token| TagToken {
            tag,
            token: token.clone(),
        })
    }

    /// Cancel a group: drop the tag and signal every holder of its token.
    pub fn cancel(&mut self, tag: TagId) -> TagStop {
        match self.active.remove(&tag) {
            Some(token) => {
                token.cancel();
                TagStop::Stopped
            }
            None => TagStop::AlreadyStopped,
        }
    }

    /// Drop a tag after its batch finished submitting. Members keep running.
    pub fn close(&mut self, tag: TagId) {
        self.active.remove(&tag);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// True if `s` is the six-digit form of a tag (`/cancel_123456`).
pub fn parse_tag(s: &str) -> Option<TagId> {
    if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}
