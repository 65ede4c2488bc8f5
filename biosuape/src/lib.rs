//! Core of the BioSuape field-data client.
//!
//! Field teams record sightings of bioindicator species (occurrences) with a
//! geotag and optional water readings. This crate holds the workflow behind
//! that: location acquisition with a cached-fix fallback, the contribution
//! submission state machine, the occurrence list cache, and a session that
//! expires cleanly when the server rejects its token.
//!
//! - [`domain`]: types, services, and the ports they drive.
//! - [`outbound`]: HTTP, file, and configured-position adapters.
//! - [`settings`]: configuration loaded with OrthoConfig.

pub mod domain;
pub mod outbound;
pub mod settings;
