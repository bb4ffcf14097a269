//! Lazy batch iterator over a span.

use super::FetchUnit;
use crate::range::ByteRange;

/// Iterator of fetch-unit batches covering a span exactly once.
///
/// Unit `i` covers `[cursor, min(cursor + block_size - 1, end)]` and the cursor
/// moves to `range.end + 1`. The span end is inclusive, so the last byte is
/// always part of the final unit.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    /// Next offset to assign; `None` once the span is exhausted.
    cursor: Option<u64>,
    end: u64,
    block_size: u64,
    pool_size: usize,
    next_index: usize,
}

impl ChunkPlan {
    /// `block_size` and `pool_size` are clamped to at least 1.
    pub fn new(span: ByteRange, block_size: u64, pool_size: usize) -> Self {
        Self {
            cursor: Some(span.start),
            end: span.end,
            block_size: block_size.max(1),
            pool_size: pool_size.max(1),
            next_index: 0,
        }
    }

    /// A plan with nothing to fetch.
    pub fn empty() -> Self {
        Self {
            cursor: None,
            end: 0,
            block_size: 1,
            pool_size: 1,
            next_index: 0,
        }
    }

    /// Total number of units this plan yields from its current position.
    pub fn remaining_units(&self) -> u64 {
        match self.cursor {
            Some(c) => (self.end - c) / self.block_size + 1,
            None => 0,
        }
    }

    fn next_unit(&mut self) -> Option<FetchUnit> {
        let start = self.cursor?;
        let end = start.saturating_add(self.block_size - 1).min(self.end);
        self.cursor = if end < self.end { Some(end + 1) } else { None };
        let unit = FetchUnit {
            index: self.next_index,
            range: ByteRange { start, end },
        };
        self.next_index += 1;
        Some(unit)
    }
}

impl Iterator for ChunkPlan {
    type Item = Vec<FetchUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.pool_size);
        while batch.len() < self.pool_size {
            match self.next_unit() {
                Some(unit) => batch.push(unit),
                None => break,
            }
        }
        (!batch.is_empty()).then_some(batch)
    }
}
