//! Domain types and services of the field client.
//!
//! Purpose: model occurrences, sessions, and bioindicators independently of
//! any transport, and drive the contribution workflow against the ports in
//! [`ports`]. Adapters live in [`crate::outbound`].
//!
//! Public surface:
//! - Error / ErrorCode: failure payload every service returns.
//! - ContributionService / ContributionWorkflow: the submission state machine.
//! - LocationAcquisitionService: permission, fresh fix, cached fix.
//! - OccurrenceListRefresh / OccurrenceCache: read cache of the server list.
//! - SessionManager / AuthService: session lifecycle and account calls.
//! - CatalogueService, ReportService: browsing and monthly trends.

pub mod auth;
pub mod auth_service;
pub mod bioindicator;
pub mod coordinates;
pub mod error;
pub mod formatting;
pub mod location;
pub mod occurrence;
pub mod occurrence_list;
pub mod ports;
pub mod reports;
pub mod session;
pub mod submission;

pub use self::auth::{
    AuthenticatedUser, CredentialsValidationError, LoginCredentials, LoginGrant, Registration,
    SessionToken,
};
pub use self::auth_service::AuthService;
pub use self::bioindicator::{Bioindicator, CatalogueService};
pub use self::coordinates::{Coordinates, CoordinatesValidationError, DEFAULT_MAP_CENTRE};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::formatting::{MessageKind, UserMessage, format_one_decimal, format_timestamp};
pub use self::location::{LocationAcquisitionService, LocationError};
pub use self::occurrence::{
    DraftField, FieldError, NOTES_MAX_CHARS, Occurrence, OccurrenceDraft, OccurrencePayload,
    PH_MAX, PH_MIN, parse_measurement,
};
pub use self::occurrence_list::{OccurrenceCache, OccurrenceListRefresh};
pub use self::reports::{
    MAX_REPORT_MONTHS, MonthlyBucket, MonthlyReport, ReportService, aggregate, month_label,
};
pub use self::session::SessionManager;
pub use self::submission::{
    CancelHandle, ContributionService, ContributionWorkflow, SUBMISSION_FAILED_MESSAGE,
    SubmissionOutcome, WorkflowState,
};
