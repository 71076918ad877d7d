use std::time::{Duration, Instant};

use crate::error::ApiError;

/// Lifecycle phase of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPhase {
    Idle,
    Loading,
    Success,
    Error,
}

/// A cached entry with settle bookkeeping.
///
/// Entries transition `Idle → Loading` on dispatch and `Loading →
/// Success | Error` on settle. A settle carries the sequence number of the
/// dispatch that produced it; settles older than `applied_seq` must be
/// discarded by the store. Data from the last success is retained across a
/// later error.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: Option<V>,
    pub error: Option<ApiError>,
    pub phase: EntryPhase,
    pub updated_at: Instant,
    pub is_stale: bool,
    pub applied_seq: u64,
}

impl<V> CacheEntry<V> {
    /// A fresh entry with no data.
    pub fn empty() -> Self {
        Self {
            data: None,
            error: None,
            phase: EntryPhase::Idle,
            updated_at: Instant::now(),
            is_stale: false,
            applied_seq: 0,
        }
    }

    /// Marks a dispatch in progress. Existing data is retained so stale
    /// results stay visible during a background refetch.
    pub fn begin_loading(&mut self) {
        self.phase = EntryPhase::Loading;
    }

    /// Applies a successful settle, resetting staleness.
    pub fn succeed(&mut self, data: V, seq: u64) {
        self.data = Some(data);
        self.error = None;
        self.phase = EntryPhase::Success;
        self.updated_at = Instant::now();
        self.is_stale = false;
        self.applied_seq = seq;
    }

    /// Applies a failed settle. Previous data is retained but stale.
    pub fn fail(&mut self, error: ApiError, seq: u64) {
        self.error = Some(error);
        self.phase = EntryPhase::Error;
        self.updated_at = Instant::now();
        self.is_stale = true;
        self.applied_seq = seq;
    }

    /// Checks if this entry is stale based on the given stale time.
    pub fn check_staleness(&mut self, stale_time: Duration) -> bool {
        if self.updated_at.elapsed() > stale_time {
            self.is_stale = true;
        }
        self.is_stale
    }

    /// Marks this entry as stale.
    pub fn mark_stale(&mut self) {
        self.is_stale = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_empty_entry() {
        let entry: CacheEntry<i32> = CacheEntry::empty();
        assert_eq!(entry.phase, EntryPhase::Idle);
        assert!(entry.data.is_none());
        assert!(entry.error.is_none());
        assert!(!entry.is_stale);
        assert_eq!(entry.applied_seq, 0);
    }

    #[test]
    fn test_succeed_clears_error_and_staleness() {
        let mut entry = CacheEntry::empty();
        entry.fail(
            ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            },
            1,
        );

        entry.succeed(42, 2);
        assert_eq!(entry.phase, EntryPhase::Success);
        assert_eq!(entry.data, Some(42));
        assert!(entry.error.is_none());
        assert!(!entry.is_stale);
        assert_eq!(entry.applied_seq, 2);
    }

    #[test]
    fn test_fail_retains_previous_data() {
        let mut entry = CacheEntry::empty();
        entry.succeed(42, 1);

        entry.fail(
            ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            },
            2,
        );
        assert_eq!(entry.phase, EntryPhase::Error);
        assert_eq!(entry.data, Some(42));
        assert!(entry.error.is_some());
        assert!(entry.is_stale);
    }

    #[test]
    fn test_begin_loading_retains_data() {
        let mut entry = CacheEntry::empty();
        entry.succeed(7, 1);
        entry.begin_loading();
        assert_eq!(entry.phase, EntryPhase::Loading);
        assert_eq!(entry.data, Some(7));
    }

    #[test]
    fn test_check_staleness_fresh() {
        let mut entry = CacheEntry::empty();
        entry.succeed(42, 1);
        let is_stale = entry.check_staleness(Duration::from_secs(1));
        assert!(!is_stale);
        assert!(!entry.is_stale);
    }

    #[test]
    fn test_check_staleness_stale() {
        let mut entry = CacheEntry::empty();
        entry.succeed(42, 1);
        sleep(Duration::from_millis(10));
        let is_stale = entry.check_staleness(Duration::from_millis(5));
        assert!(is_stale);
        assert!(entry.is_stale);
    }

    #[test]
    fn test_mark_stale() {
        let mut entry = CacheEntry::empty();
        entry.succeed(42, 1);
        assert!(!entry.is_stale);
        entry.mark_stale();
        assert!(entry.is_stale);
    }
}
