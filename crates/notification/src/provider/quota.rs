use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Quota {
    pub used: u64,
    pub total: u64,
    pub remaining: u64,
}

/// In-process usage counter of an SMS gateway, counted in segments.
///
/// Sends are never refused for exceeding the total.
#[derive(Debug)]
pub struct QuotaTracker {
    used: AtomicU64,
    total: u64,
}

impl QuotaTracker {
    #[must_use]
    pub const fn new(total: u64) -> Self { Self { used: AtomicU64::new(0), total } }

    pub fn record(&self, segments: u64) {
        let _ = self.used.fetch_add(segments, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> Quota {
        let used = self.used.load(Ordering::Relaxed);
        Quota { used, total: self.total, remaining: self.total.saturating_sub(used) }
    }
}

/// Price of `segments` at `price_per_segment` each.
pub(crate) fn segment_cost(segments: u64, price_per_segment: f64) -> f64 {
    f64::from(u32::try_from(segments).unwrap_or(u32::MAX)) * price_per_segment
}
