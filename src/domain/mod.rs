//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod expr;
pub mod expr_eval;
pub mod predicate;
pub mod strategy;
pub mod registry;
pub mod simulator;
pub mod metrics;
pub mod backtest;
pub mod error;
