//! On-disk artifact management.
//!
//! # Submodules
//!
//! - [`json`]: snapshot and market-summary persistence
//! - [`identity`]: per-date sequence allocation for snapshot names
//! - [`retention`]: horizon-based pruning of aged snapshots
//!
//! # Artifact layout
//!
//! ```text
//! data/
//! ├── 2025-05-06_01.json
//! ├── 2025-05-06_02.json
//! └── global_point_2025-05-06.json
//! ```
//!
//! The on-disk files are the only state shared between runs: duplicate
//! suppression reads the latest snapshot back, allocation scans the names,
//! and the sweeper prunes them.

pub mod identity;
pub mod json;
pub mod retention;
