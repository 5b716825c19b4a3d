//! Range resolution across the fast and durable tiers.
//!
//! A request names an inclusive range of absolute message ids. The fast tier
//! only ever holds one contiguous window per chat, so a request can relate to
//! it in a handful of ways. [`plan`] classifies the request and splits it into
//! tier segments; [`RangeResolver`] executes the segments in order and
//! concatenates the results.
//!
//! Segment boundaries are inclusive on both sides and partition the request
//! exactly, so no id is read twice.

use chatstore_types::error::{StoreError, Tier};
use chatstore_types::message::Message;
use chatstore_types::window::CacheWindow;
use thiserror::Error;
use tracing::debug;

use crate::repository::durable::DurableTier;
use crate::repository::fast::FastTier;

/// Inclusive range of message ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub start: u64,
    pub end: u64,
}

impl IdRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// The id range addressed by a `limit`/`offset` request:
    /// `[offset, offset + limit - 1]`.
    ///
    /// `offset` is an absolute message id, not a skip count. Returns `None`
    /// for `limit == 0`. The end saturates at `u64::MAX`.
    pub fn from_page(limit: u64, offset: u64) -> Option<Self> {
        if limit == 0 {
            return None;
        }
        Some(Self {
            start: offset,
            end: offset.saturating_add(limit - 1),
        })
    }
}

/// How a request relates to the cache window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// The chat has no window; everything comes from the durable tier.
    NoWindow,
    /// The request lies inside the window.
    CacheOnly,
    /// The request does not overlap the window (touching counts as outside).
    Disjoint,
    /// The request starts before the window and ends inside it.
    StraddlesStart,
    /// The request starts inside the window and ends after it.
    StraddlesEnd,
    /// The request starts before and ends after the window.
    Encloses,
}

/// One tier read within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub tier: Tier,
    pub range: IdRange,
}

impl Segment {
    fn durable(start: u64, end: u64) -> Self {
        Self {
            tier: Tier::Durable,
            range: IdRange::new(start, end),
        }
    }

    fn fast(start: u64, end: u64) -> Self {
        Self {
            tier: Tier::Fast,
            range: IdRange::new(start, end),
        }
    }
}

/// Ordered tier reads that together cover a request exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    pub kind: PlanKind,
    pub segments: Vec<Segment>,
}

/// A request/window combination no plan covers.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("inverted {what} [{start}, {end}]")]
    Inverted {
        what: &'static str,
        start: u64,
        end: u64,
    },

    #[error("request [{start}, {end}] matched no case against window [{window_start}, {window_end}]")]
    Unmatched {
        start: u64,
        end: u64,
        window_start: u64,
        window_end: u64,
    },
}

/// Split `requested` into tier segments against the chat's window.
pub fn plan(requested: IdRange, window: Option<&CacheWindow>) -> Result<ReadPlan, PlanError> {
    let IdRange { start, end } = requested;
    if start > end {
        return Err(PlanError::Inverted {
            what: "request",
            start,
            end,
        });
    }

    let Some(window) = window else {
        return Ok(ReadPlan {
            kind: PlanKind::NoWindow,
            segments: vec![Segment::durable(start, end)],
        });
    };

    let (cs, ce) = (window.start, window.end);
    if cs > ce {
        return Err(PlanError::Inverted {
            what: "window",
            start: cs,
            end: ce,
        });
    }

    let (kind, segments) = if start >= cs && end <= ce {
        (PlanKind::CacheOnly, vec![Segment::fast(start, end)])
    } else if start >= ce || end <= cs {
        // The durable tier is complete, so a request that only touches the
        // window boundary is served from it alone.
        (PlanKind::Disjoint, vec![Segment::durable(start, end)])
    } else if start < cs && end > ce {
        (
            PlanKind::Encloses,
            vec![
                Segment::durable(start, cs - 1),
                Segment::fast(cs, ce),
                Segment::durable(ce + 1, end),
            ],
        )
    } else if start < cs {
        (
            PlanKind::StraddlesStart,
            vec![Segment::durable(start, cs - 1), Segment::fast(cs, end)],
        )
    } else if end > ce {
        (
            PlanKind::StraddlesEnd,
            vec![Segment::fast(start, ce), Segment::durable(ce + 1, end)],
        )
    } else {
        return Err(PlanError::Unmatched {
            start,
            end,
            window_start: cs,
            window_end: ce,
        });
    };

    Ok(ReadPlan { kind, segments })
}

/// Executes read plans against a pair of tiers.
pub struct RangeResolver<'a, D: DurableTier, F: FastTier> {
    durable: &'a D,
    fast: &'a F,
}

impl<'a, D: DurableTier, F: FastTier> RangeResolver<'a, D, F> {
    pub fn new(durable: &'a D, fast: &'a F) -> Self {
        Self { durable, fast }
    }

    /// Read every live message of `chat_id` with an id in `requested`,
    /// ascending by id.
    ///
    /// Any tier failure aborts the read; partial results are never returned.
    pub async fn resolve(&self, chat_id: &str, requested: IdRange) -> Result<Vec<Message>, StoreError> {
        let window = self
            .fast
            .get_window(chat_id)
            .await
            .map_err(|e| StoreError::from_tier(Tier::Fast, "get_window", chat_id, e))?;

        let plan = plan(requested, window.as_ref()).map_err(|e| StoreError::InvariantViolation {
            chat_id: chat_id.to_string(),
            detail: e.to_string(),
        })?;

        debug!(
            chat_id,
            start = requested.start,
            end = requested.end,
            window = ?window.as_ref().map(|w| (w.start, w.end)),
            kind = ?plan.kind,
            "resolved read plan"
        );

        let mut messages = Vec::new();
        for segment in &plan.segments {
            let IdRange { start, end } = segment.range;
            let part = match segment.tier {
                Tier::Fast => self
                    .fast
                    .get_range(chat_id, start, end)
                    .await
                    .map_err(|e| StoreError::from_tier(Tier::Fast, "get_range", chat_id, e))?,
                Tier::Durable => self
                    .durable
                    .get_range(chat_id, start, end)
                    .await
                    .map_err(|e| StoreError::from_tier(Tier::Durable, "get_range", chat_id, e))?,
            };
            debug!(chat_id, tier = %segment.tier, start, end, count = part.len(), "segment read");
            messages.extend(part);
        }

        Ok(messages)
    }
}
