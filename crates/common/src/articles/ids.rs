//! Article identifier generation

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

/// Length of the random suffix
const SUFFIX_LEN: usize = 9;

/// Source of fresh article ids
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// `article-<unix millis>-<9 lowercase alphanumerics>`
///
/// Ids sort by creation time; the store's primary key remains the
/// authority on uniqueness.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    fn next_id(&self) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();

        format!("article-{}-{}", Utc::now().timestamp_millis(), suffix)
    }
}
