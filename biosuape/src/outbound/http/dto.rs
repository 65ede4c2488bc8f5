//! Wire DTOs for the field-data REST API.
//!
//! Responses decode into these types first, then map into domain records in
//! one pass. Field names follow the API's camelCase, with `pH` spelled as the
//! server spells it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{
    AuthenticatedUser, Coordinates, LoginCredentials, Occurrence, OccurrencePayload, Registration,
};

/// Identifier that some deployments send as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum IdDto {
    Text(String),
    Number(i64),
}

impl From<IdDto> for String {
    fn from(value: IdDto) -> Self {
        match value {
            IdDto::Text(text) => text,
            IdDto::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateOccurrenceRequestDto<'a> {
    species_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    #[serde(rename = "pH", skip_serializing_if = "Option::is_none")]
    ph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    water_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_ref: Option<&'a str>,
    latitude: f64,
    longitude: f64,
}

impl<'a> From<&'a OccurrencePayload> for CreateOccurrenceRequestDto<'a> {
    fn from(payload: &'a OccurrencePayload) -> Self {
        Self {
            species_id: &payload.species_id,
            notes: payload.notes.as_deref(),
            ph: payload.ph,
            water_temperature: payload.water_temperature,
            image_ref: payload.image_ref.as_deref(),
            latitude: payload.coordinates.latitude(),
            longitude: payload.coordinates.longitude(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OccurrenceDto {
    id: IdDto,
    #[serde(default, alias = "userId")]
    author_id: Option<IdDto>,
    species_id: IdDto,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default, rename = "pH")]
    ph: Option<f64>,
    #[serde(default)]
    water_temperature: Option<f64>,
    #[serde(default, alias = "imageUrl")]
    image_ref: Option<String>,
    latitude: f64,
    longitude: f64,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl OccurrenceDto {
    pub(super) fn into_domain(self) -> Result<Occurrence, String> {
        let id = String::from(self.id);
        let coordinates = Coordinates::new(self.latitude, self.longitude)
            .map_err(|err| format!("occurrence {id} has invalid coordinates: {err}"))?;
        Ok(Occurrence {
            author_id: self.author_id.map(String::from).unwrap_or_default(),
            species_id: self.species_id.into(),
            notes: self.notes,
            ph: self.ph,
            water_temperature: self.water_temperature,
            image_ref: self.image_ref,
            coordinates,
            created_at: self.created_at,
            updated_at: self.updated_at.unwrap_or(self.created_at),
            id,
        })
    }
}

/// `GET /occurrences/mine` answers with a bare array on some deployments and
/// a `{ "data": [...] }` envelope on others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum OccurrenceListDto {
    Bare(Vec<OccurrenceDto>),
    Wrapped { data: Vec<OccurrenceDto> },
}

impl OccurrenceListDto {
    /// Map every item, skipping records the domain cannot hold.
    pub(super) fn into_domain(self) -> Vec<Occurrence> {
        let items = match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        };
        items
            .into_iter()
            .filter_map(|item| {
                item.into_domain()
                    .inspect_err(|reason| warn!(%reason, "skipping unreadable occurrence"))
                    .ok()
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(super) struct LoginRequestDto<'a> {
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a LoginCredentials> for LoginRequestDto<'a> {
    fn from(credentials: &'a LoginCredentials) -> Self {
        Self {
            email: credentials.email(),
            password: credentials.password(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct RegisterRequestDto<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Registration> for RegisterRequestDto<'a> {
    fn from(registration: &'a Registration) -> Self {
        Self {
            name: registration.name(),
            email: registration.credentials().email(),
            password: registration.credentials().password(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserDto {
    id: IdDto,
    #[serde(alias = "nome")]
    name: String,
    email: String,
    #[serde(default, alias = "createdAt")]
    registered_at: Option<DateTime<Utc>>,
}

impl From<UserDto> for AuthenticatedUser {
    fn from(value: UserDto) -> Self {
        Self {
            id: value.id.into(),
            name: value.name,
            email: value.email,
            registered_at: value.registered_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginResponseDto {
    #[serde(default)]
    pub(super) token: Option<String>,
    #[serde(default, alias = "usuario")]
    pub(super) user: Option<UserDto>,
}

/// Body of confirmations and error responses.
#[derive(Debug, Default, Deserialize)]
pub(super) struct MessageDto {
    #[serde(default)]
    pub(super) message: Option<String>,
}
