//! HTTP adapter for the field-data REST API.

mod client;
mod dto;

pub use client::{ApiClientBuildError, ApiHttpClient};
