//! Ingestion timestamps that never run backwards

use std::sync::Mutex;

use chrono::{DateTime, SubsecRound, Utc};

/// Hands out `ingested_at` values for appended rows.
///
/// A fresh stamp is `max(now, newest value seen so far)`, so wall-clock
/// adjustments can not reorder a target's history. Caller-provided stamps are
/// kept but still advance the clock. All stamps carry millisecond precision,
/// matching what the SQLite backend can store.
#[derive(Debug, Default)]
pub struct IngestClock {
    newest: Mutex<Option<DateTime<Utc>>>,
}

impl IngestClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the newest value already in the store.
    pub fn starting_at(newest: Option<DateTime<Utc>>) -> Self {
        Self {
            newest: Mutex::new(newest),
        }
    }

    pub fn stamp(&self, requested: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let mut newest = match self.newest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let stamp = match requested {
            Some(stamp) => stamp.trunc_subsecs(3),
            None => {
                let now = Utc::now().trunc_subsecs(3);
                newest.map_or(now, |previous| now.max(previous))
            }
        };

        *newest = Some(newest.map_or(stamp, |previous| previous.max(stamp)));
        stamp
    }
}
