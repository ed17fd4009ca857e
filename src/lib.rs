//! swingtrader: swing-trading strategy backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], and the command surface in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
