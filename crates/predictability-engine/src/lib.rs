//! Financial Predictability Scoring Engine
//!
//! Pure, synchronous pipeline that turns multi-year per-share revenue and
//! EBITDA history into a star rating. Every condition resolves into a
//! well-formed result; nothing here performs I/O or raises past the boundary.

pub mod breaks;
pub mod pipeline;
pub mod regression;
pub mod scoring;
pub mod volatility;
pub mod watch;

pub use pipeline::PredictabilityEngine;
pub use scoring::StarMapper;
