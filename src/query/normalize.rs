//! Query parameter normalization.
//!
//! The reporting endpoints accept optional raw parameters. This module
//! resolves them into guaranteed-valid arguments: absent time bounds fall back
//! to documented defaults and the result limit is clamped into a fixed window.
//! Backends only ever see a [`TimeRange`] that satisfies `to > from`.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Fallback lookback window when `from` is absent.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Result count when `limit` is absent.
pub const DEFAULT_LIMIT: u32 = 20;

/// Upper clamp bound for `limit`.
pub const MAX_LIMIT: u32 = 100;

/// Lower clamp bound for `limit`. Not configurable.
const MIN_LIMIT: u32 = 1;

/// Defaults and bounds applied while resolving raw query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDefaults {
    pub window_days: u32,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

/// Validated reporting window. `to` lies strictly after `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Builds a range, rejecting empty and inverted windows.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, InvalidRange> {
        if to <= from {
            return Err(InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }
}

/// Rejected time range: `to` did not lie strictly after `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "to must be greater than from")
    }
}

impl std::error::Error for InvalidRange {}

/// Resolves raw time bounds into a validated range.
///
/// An absent `to` resolves to the clock's current instant; an absent `from`
/// resolves to `to` minus the configured window.
pub fn resolve_time_range(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    defaults: &QueryDefaults,
    clock: &dyn Clock,
) -> Result<TimeRange, InvalidRange> {
    let to = to.unwrap_or_else(|| clock.now());
    let from = from.unwrap_or_else(|| to - Duration::days(i64::from(defaults.window_days)));
    TimeRange::new(from, to)
}

/// Clamps a requested result count into `[1, max_limit]`.
///
/// Out-of-range values are adjusted silently. An absent value takes the
/// configured default before clamping, so a misconfigured default still lands
/// inside the bounds.
pub fn clamp_limit(requested: Option<i64>, defaults: &QueryDefaults) -> u32 {
    let max = defaults.max_limit.max(MIN_LIMIT);
    let requested = requested.unwrap_or_else(|| i64::from(defaults.default_limit));
    let clamped = requested.clamp(i64::from(MIN_LIMIT), i64::from(max));
    u32::try_from(clamped).unwrap_or(max)
}
