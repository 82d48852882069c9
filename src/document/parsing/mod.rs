//! Document parsing utilities
//!
//! This module contains the readers that turn raw WordprocessingML elements
//! into text, formatting and table roles.

pub(crate) mod formatting;
pub(crate) mod table;
