//! Core library for the costbook command line application.
//!
//! The crate consolidates heterogeneous monthly spreadsheet reports into a
//! single normalized cost-ledger workbook. The modules keep responsibilities
//! narrow and composable: [`source`] snapshots source workbooks, [`extract`]
//! locates regions and pulls raw rows, [`transform`] applies the per-task
//! business rules, [`dest`] owns the shared destination workbook, and
//! [`collect`] orchestrates the tasks described in [`task`].

pub mod collect;
pub mod config;
pub mod dates;
pub mod dest;
pub mod error;
pub mod extract;
pub mod registry;
pub mod source;
pub mod task;
pub mod transform;

pub use error::{CollectError, Result};
