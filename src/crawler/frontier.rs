//! Breadth-first crawl frontier
//!
//! The frontier owns both the FIFO queue and the visited set of one domain
//! job. A URL enters the visited set at the moment it is queued, so it can be
//! queued at most once per job.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A queued URL and the number of link hops from the start URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
}

impl Frontier {
    /// Creates a frontier holding only `start` at depth 0
    pub fn seeded(start: Url) -> Self {
        let mut frontier = Self::default();
        frontier.push_if_new(start, 0);
        frontier
    }

    /// Queues `url` unless it has been queued before
    ///
    /// Returns true if the URL was new.
    pub fn push_if_new(&mut self, url: Url, depth: u32) -> bool {
        if !self.visited.insert(url.as_str().to_owned()) {
            return false;
        }
        self.queue.push_back(FrontierEntry { url, depth });
        true
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Marks `url` as seen without queueing it
    ///
    /// Used for the final address of a redirect. Returns true if the URL was
    /// new.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(url.as_str().to_owned())
    }

    /// Entries still waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops everything still queued and returns how many entries that was
    pub fn discard(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }
}
