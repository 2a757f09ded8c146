//! Interrupt-driven raw edge queue.
//!
//! Every monitored input fires an any-edge GPIO interrupt.  The ISR samples
//! the pin, timestamps the edge and pushes it here; it never debounces and
//! never blocks.  The input task drains the queue and feeds the debouncers.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO ISR ×5 │────▶│  RawEdge Q32 │────▶│  Input task  │
//! │ (any edge)  │     │  (lock-free) │     │  (debounce)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! A full queue drops the edge and bumps a counter.  Lost sensor edges are
//! repaired by the periodic re-check; a lost button edge is a missed press.

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::mpmc::Q32;

use crate::app::ports::InputId;

/// One undebounced edge as seen by the ISR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEdge {
    pub input: InputId,
    /// Logical level after the edge (`true` = asserted / pressed).
    pub asserted: bool,
    /// Milliseconds since boot (wrapping).
    pub at_ms: u32,
}

static RAW_EDGES: Q32<RawEdge> = Q32::new();
static DROPPED: AtomicU32 = AtomicU32::new(0);

/// Push an edge.  Safe to call from ISR context.
/// Returns `false` if the queue was full and the edge was dropped.
pub fn push_raw_edge(edge: RawEdge) -> bool {
    if RAW_EDGES.enqueue(edge).is_err() {
        DROPPED.fetch_add(1, Ordering::Relaxed);
        return false;
    }
    true
}

/// Drain every pending edge into `f`, oldest first.  Returns the count.
pub fn drain_raw_edges(mut f: impl FnMut(RawEdge)) -> usize {
    let mut n = 0;
    while let Some(edge) = RAW_EDGES.dequeue() {
        f(edge);
        n += 1;
    }
    n
}

/// Edges dropped on overflow since boot.
pub fn dropped_edges() -> u32 {
    DROPPED.load(Ordering::Relaxed)
}
