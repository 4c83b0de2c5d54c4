use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest contact id already consumed by a chunk walk.
///
/// Lives only for the duration of one job execution; it is never persisted,
/// so a re-run of the whole job always restarts from [`Watermark::ZERO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Watermark(pub i64);

impl Watermark {
    pub const ZERO: Watermark = Watermark(0);

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of processing one chunk.
///
/// `Done` is the sole exhaustion signal: the source returned no rows above
/// the watermark, so no further `Continue` is possible without new inserts.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkResult<P> {
    Continue { watermark: Watermark, payload: P },
    Done,
}

impl<P> ChunkResult<P> {
    pub fn is_done(&self) -> bool {
        matches!(self, ChunkResult::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watermark_orders_by_contact_id() {
        assert!(Watermark(5) > Watermark(4));
        assert_eq!(Watermark::ZERO, Watermark(0));
    }

    #[test]
    fn done_is_terminal() {
        let result: ChunkResult<()> = ChunkResult::Done;
        assert!(result.is_done());
        let result = ChunkResult::Continue {
            watermark: Watermark(10),
            payload: (),
        };
        assert!(!result.is_done());
    }
}
