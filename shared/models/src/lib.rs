//! # TerraLab Domain Models
//!
//! Core domain models for the TerraLab testing laboratory backend.
//! All models serialize with serde; request payloads validate with the
//! validator crate; database rows derive sqlx::FromRow.
//!
//! ## Key Models
//!
//! - **Client / Enquiry / Project**: the commercial registry
//! - **Quotation / QuotationItem**: priced test lines per division
//! - **TestRequest / TestRequestItem**: ordered work against a quotation
//! - **Sample**: generated per request with a permanent test assignment
//! - **Worksheet**: one per (sample, test type), issued at most once
//! - **Report**: consolidated result files reviewed as a group
//!
//! Lifecycle rules live in [`status`]; handlers go through the enums
//! there instead of comparing raw status strings.

pub mod quotation;
pub mod registry;
pub mod report;
pub mod request;
pub mod sample;
pub mod status;
pub mod worksheet;

#[cfg(test)]
pub mod property_tests;

pub use quotation::*;
pub use registry::*;
pub use report::*;
pub use request::*;
pub use sample::*;
pub use status::*;
pub use worksheet::*;
