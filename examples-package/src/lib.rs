//! Runnable examples for the granular-invalidation crates.
//!
//! See the `examples/` directory; run with e.g.
//! `cargo run --example plan_invalidations`.
