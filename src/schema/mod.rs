//! Report input schema
//!
//! This module defines the tabular shape of an Ad Exchange performance
//! report as handed over by a file loader, and the mapping from report
//! column headers to pipeline metrics.

mod columns;
mod table;

pub use columns::*;
pub use table::*;
