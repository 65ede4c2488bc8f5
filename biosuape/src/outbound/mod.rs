//! Outbound adapters implementing the domain ports.

pub mod geolocation;
pub mod http;
pub mod session_file;
