use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied time-bucket contract for temporal playback. The temporal
/// index is a no-op when the bucketizer carries neither a start nor an end
/// date.
pub trait Bucketizer {
    fn start(&self) -> Option<DateTime<Utc>>;
    fn end(&self) -> Option<DateTime<Utc>>;
    fn num_buckets(&self) -> usize;
    fn bucket_index(&self, date: DateTime<Utc>) -> usize;

    fn has_dates(&self) -> bool {
        self.start().is_some() || self.end().is_some()
    }
}

/// Evenly splits [start, end] into a fixed number of buckets; out-of-range
/// dates clamp to the first/last bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformBucketizer {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buckets: usize,
}

impl UniformBucketizer {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, buckets: usize) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        Self {
            start,
            end,
            buckets: buckets.max(1),
        }
    }
}

impl Bucketizer for UniformBucketizer {
    fn start(&self) -> Option<DateTime<Utc>> {
        Some(self.start)
    }

    fn end(&self) -> Option<DateTime<Utc>> {
        Some(self.end)
    }

    fn num_buckets(&self) -> usize {
        self.buckets
    }

    fn bucket_index(&self, date: DateTime<Utc>) -> usize {
        if self.buckets <= 1 {
            return 0;
        }
        let span = (self.end - self.start).num_milliseconds();
        if span <= 0 {
            return 0;
        }
        let offset = (date - self.start).num_milliseconds().clamp(0, span);
        let idx = (offset as f64 / span as f64 * self.buckets as f64) as usize;
        idx.min(self.buckets - 1)
    }
}

/// Bucketizer for widgets with no time axis: no dates, no buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullBucketizer;

impl Bucketizer for NullBucketizer {
    fn start(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn end(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn num_buckets(&self) -> usize {
        0
    }

    fn bucket_index(&self, _date: DateTime<Utc>) -> usize {
        0
    }
}
