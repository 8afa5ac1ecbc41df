//! police-stops - reporting catalog and executor for vehicle-stop enforcement data.
//!
//! The [`catalog`] holds every report as validated, parameterized SQL; the
//! [`report`] executor runs one report per request against a
//! [`db::DatabaseClient`] and normalizes the rows into scalars, tables or an
//! explicit empty-result signal.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod predict;
pub mod report;
