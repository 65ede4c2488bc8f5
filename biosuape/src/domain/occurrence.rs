//! Occurrence drafts, field validation, and server-confirmed occurrences.
//!
//! A draft lives only inside a contribution workflow. It becomes an
//! [`OccurrencePayload`] once validated and geotagged, and an [`Occurrence`]
//! once the remote API has stored it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Coordinates;

/// Maximum number of characters accepted in the notes field.
pub const NOTES_MAX_CHARS: usize = 250;
/// Lowest accepted pH reading.
pub const PH_MIN: f64 = 0.0;
/// Highest accepted pH reading.
pub const PH_MAX: f64 = 14.0;

/// Draft field identifiers, named as the remote API names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DraftField {
    /// Bioindicator species identifier.
    #[serde(rename = "speciesId")]
    SpeciesId,
    /// Free-text observation notes.
    #[serde(rename = "notes")]
    Notes,
    /// Water pH reading.
    #[serde(rename = "pH")]
    Ph,
    /// Water temperature reading in degrees Celsius.
    #[serde(rename = "waterTemperature")]
    WaterTemperature,
    /// Geotag of the observation.
    #[serde(rename = "coordinates")]
    Coordinates,
}

impl DraftField {
    /// Wire name of the field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpeciesId => "speciesId",
            Self::Notes => "notes",
            Self::Ph => "pH",
            Self::WaterTemperature => "waterTemperature",
            Self::Coordinates => "coordinates",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single per-field validation failure shown next to the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field that failed validation.
    pub field: DraftField,
    /// User-facing explanation.
    pub message: String,
}

impl FieldError {
    /// Build a field error.
    pub fn new(field: DraftField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Parse a numeric form input.
///
/// Blank input means "not measured" and yields `None`. A decimal comma is
/// accepted because field teams type readings such as `7,5`.
///
/// # Errors
///
/// Returns a [`FieldError`] for `field` when the text is not a finite number.
///
/// # Examples
/// ```
/// use biosuape::domain::{DraftField, parse_measurement};
///
/// assert_eq!(parse_measurement(DraftField::Ph, " 7,5 ").unwrap(), Some(7.5));
/// assert_eq!(parse_measurement(DraftField::Ph, "").unwrap(), None);
/// assert!(parse_measurement(DraftField::Ph, "acidic").is_err());
/// ```
pub fn parse_measurement(field: DraftField, raw: &str) -> Result<Option<f64>, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let normalised = trimmed.replace(',', ".");
    match normalised.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(FieldError::new(field, "must be a number")),
    }
}

/// User-edited occurrence record in progress.
///
/// Drafts are never persisted locally; they exist only while a contribution
/// form is open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccurrenceDraft {
    /// Bioindicator species identifier. Required.
    pub species_id: String,
    /// Free-text notes, at most [`NOTES_MAX_CHARS`] characters.
    pub notes: String,
    /// pH reading within [`PH_MIN`, `PH_MAX`] when present.
    pub ph: Option<f64>,
    /// Water temperature in degrees Celsius when present.
    pub water_temperature: Option<f64>,
    /// Local handle of an attached photo. Uploaded as part of the payload.
    pub image_ref: Option<String>,
    /// Geotag attached when the form opened.
    pub coordinates: Option<Coordinates>,
}

impl OccurrenceDraft {
    /// Start an empty draft geotagged at `coordinates`.
    #[must_use]
    pub fn at(coordinates: Coordinates) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..Self::default()
        }
    }

    /// Check every field rule and collect all failures.
    ///
    /// Missing coordinates are not reported here; the workflow treats them as a
    /// location failure rather than a field error.
    ///
    /// # Errors
    ///
    /// Returns every [`FieldError`] found, in field order.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.species_id.trim().is_empty() {
            errors.push(FieldError::new(DraftField::SpeciesId, "species is required"));
        }

        if self.notes.chars().count() > NOTES_MAX_CHARS {
            errors.push(FieldError::new(
                DraftField::Notes,
                format!("notes must be at most {NOTES_MAX_CHARS} characters"),
            ));
        }

        if let Some(ph) = self.ph {
            if !ph.is_finite() {
                errors.push(FieldError::new(DraftField::Ph, "must be a number"));
            } else if !(PH_MIN..=PH_MAX).contains(&ph) {
                errors.push(FieldError::new(
                    DraftField::Ph,
                    format!("pH must be between {PH_MIN} and {PH_MAX}"),
                ));
            }
        }

        if let Some(temperature) = self.water_temperature {
            if !temperature.is_finite() {
                errors.push(FieldError::new(
                    DraftField::WaterTemperature,
                    "must be a number",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Assemble the submission payload.
    ///
    /// Returns `None` while the draft has no geotag. Callers validate first.
    #[must_use]
    pub fn to_payload(&self) -> Option<OccurrencePayload> {
        let coordinates = self.coordinates?;
        let notes = self.notes.trim();
        Some(OccurrencePayload {
            species_id: self.species_id.trim().to_owned(),
            notes: (!notes.is_empty()).then(|| notes.to_owned()),
            ph: self.ph,
            water_temperature: self.water_temperature,
            image_ref: self.image_ref.clone(),
            coordinates,
        })
    }
}

/// Validated, geotagged occurrence ready for the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrencePayload {
    /// Bioindicator species identifier, trimmed.
    pub species_id: String,
    /// Notes, omitted when blank.
    pub notes: Option<String>,
    /// pH reading.
    pub ph: Option<f64>,
    /// Water temperature in degrees Celsius.
    pub water_temperature: Option<f64>,
    /// Local photo handle.
    pub image_ref: Option<String>,
    /// Geotag.
    pub coordinates: Coordinates,
}

/// Server-confirmed occurrence held in the local read cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Server-assigned identifier.
    pub id: String,
    /// Identifier of the submitting user.
    pub author_id: String,
    /// Bioindicator species identifier.
    pub species_id: String,
    /// Observation notes.
    pub notes: Option<String>,
    /// pH reading.
    pub ph: Option<f64>,
    /// Water temperature in degrees Celsius.
    pub water_temperature: Option<f64>,
    /// Photo reference as stored by the server.
    pub image_ref: Option<String>,
    /// Geotag.
    pub coordinates: Coordinates,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Occurrence {
    /// Build the stored representation of `payload` as a server would.
    #[must_use]
    pub fn from_payload(
        id: impl Into<String>,
        author_id: impl Into<String>,
        payload: OccurrencePayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            species_id: payload.species_id,
            notes: payload.notes,
            ph: payload.ph,
            water_temperature: payload.water_temperature,
            image_ref: payload.image_ref,
            coordinates: payload.coordinates,
            created_at: now,
            updated_at: now,
        }
    }
}
