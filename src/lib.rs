//! Client for a shared-housing (PG/hostel) listing service: catalog
//! search/filter/sort/paging over the fetched listings, and visit booking
//! gated on phone OTP verification.

pub mod api;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod error;
pub mod maps;
pub mod models;
pub mod session;

pub use error::{ApiError, ApiResult, ValidationError};
