use std::collections::VecDeque;

/// How many handled event ids are remembered for redelivery detection.
pub const RECENT_EVENT_CAPACITY: usize = 20;

/// Most-recent-first log of handled event ids, bounded in size.
#[derive(Debug)]
pub struct RecentEvents {
    ids: VecDeque<String>,
    capacity: usize,
}

impl RecentEvents {
    pub fn new() -> Self {
        Self::with_capacity(RECENT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|seen| seen == id)
    }

    /// Record `id` as handled. Returns `false` if it was already recorded,
    /// in which case the log is left untouched.
    pub fn record(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push_front(id.to_string());
        self.ids.truncate(self.capacity);
        true
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for RecentEvents {
    fn default() -> Self {
        Self::new()
    }
}
