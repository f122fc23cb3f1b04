//! Pipeline stages for financial statement extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap an
//! implementation (e.g. the extraction backend) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ extract ──▶ consolidate
//! (score+rank)  (VLM calls)  (merge+validate)
//! ```
//!
//! 1. [`classify`] — score every page against per-statement-type pattern
//!    sets and a numeric-density heuristic; rank score-descending. Pure
//!    CPU work, fans out over `spawn_blocking` on large documents.
//! 2. [`extract`] — drive the vision extraction call for each selected
//!    page with rate-limit retry/backoff; the only stage with network I/O.
//! 3. [`consolidate`] — merge the per-page results into one statement:
//!    dedup, confidence conflict resolution, the equity-into-balance-sheet
//!    merge, and cross-statement arithmetic validation.

pub mod classify;
pub(crate) mod extract;
pub mod consolidate;
