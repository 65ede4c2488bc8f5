//! Contribution submission workflow.
//!
//! One workflow drives one form session:
//!
//! ```text
//! Idle -> AcquiringLocation -> Editing -> Validating -> Submitting -> Succeeded
//!                 |                ^           |              |
//!                 v                +-----------+--------------+ (field errors, send failure)
//!              Aborted
//! ```
//!
//! Any non-terminal state can move to `Cancelled`. Once cancelled, results of
//! pending calls are dropped without touching the draft or the caches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;
use tracing::{debug, info, warn};

use super::ports::{GeolocationProvider, OccurrenceApi, OccurrenceApiError};
use super::{
    Coordinates, DraftField, Error, FieldError, LocationAcquisitionService, Occurrence,
    OccurrenceDraft, OccurrenceListRefresh, parse_measurement,
};

/// Message shown for every failed send, whatever the cause.
pub const SUBMISSION_FAILED_MESSAGE: &str = "Could not send your contribution. Please try again.";
const CANCELLED_MESSAGE: &str = "The contribution form was closed.";
const NOT_EDITING_MESSAGE: &str = "The contribution form is not open for editing.";

/// Position of a workflow in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Created, form not opened yet.
    Idle,
    /// Waiting for a position fix.
    AcquiringLocation,
    /// Form open and accepting edits.
    Editing,
    /// Running field checks.
    Validating,
    /// Waiting for the remote API.
    Submitting,
    /// Stored remotely. Terminal.
    Succeeded,
    /// Location could not be acquired; the form never opened. Terminal.
    Aborted,
    /// Closed by the user. Terminal.
    Cancelled,
}

impl WorkflowState {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Aborted | Self::Cancelled)
    }
}

/// Cloneable handle for closing a workflow from another task.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Ask the workflow to discard whatever it is waiting on.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// The occurrence as stored by the server.
    pub occurrence: Occurrence,
    /// Community list returned by the follow-up refresh, when it succeeded.
    pub occurrences: Option<Vec<Occurrence>>,
    /// Why a follow-up refresh failed, community list first. The submission
    /// itself still stands.
    pub refresh_error: Option<Error>,
}

/// Builds contribution workflows over shared collaborators.
pub struct ContributionService<G, A> {
    location: LocationAcquisitionService<G>,
    api: Arc<A>,
    refresh: OccurrenceListRefresh<A>,
}

impl<G, A> Clone for ContributionService<G, A> {
    fn clone(&self) -> Self {
        Self {
            location: self.location.clone(),
            api: Arc::clone(&self.api),
            refresh: self.refresh.clone(),
        }
    }
}

impl<G, A> ContributionService<G, A>
where
    G: GeolocationProvider,
    A: OccurrenceApi,
{
    /// Create a service. `refresh` must wrap the same API as `api` so the
    /// post-submission refresh sees the new occurrence.
    pub fn new(
        location: LocationAcquisitionService<G>,
        api: Arc<A>,
        refresh: OccurrenceListRefresh<A>,
    ) -> Self {
        Self {
            location,
            api,
            refresh,
        }
    }

    /// Start a workflow in [`WorkflowState::Idle`].
    #[must_use]
    pub fn start(&self) -> ContributionWorkflow<G, A> {
        ContributionWorkflow {
            service: self.clone(),
            state: WorkflowState::Idle,
            draft: OccurrenceDraft::default(),
            field_errors: Vec::new(),
            parse_errors: Vec::new(),
            cancel: CancelHandle::default(),
        }
    }
}

/// One contribution form session.
pub struct ContributionWorkflow<G, A> {
    service: ContributionService<G, A>,
    state: WorkflowState,
    draft: OccurrenceDraft,
    field_errors: Vec<FieldError>,
    parse_errors: Vec<FieldError>,
    cancel: CancelHandle,
}

impl<G, A> ContributionWorkflow<G, A>
where
    G: GeolocationProvider,
    A: OccurrenceApi,
{
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Draft as currently edited.
    #[must_use]
    pub fn draft(&self) -> &OccurrenceDraft {
        &self.draft
    }

    /// Field errors from the last failed validation or unparsable input.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// Handle for closing this workflow from another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Close the form. Pending calls resolve into `Cancelled`.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if !self.state.is_terminal() {
            self.state = WorkflowState::Cancelled;
        }
        debug!("contribution workflow cancelled");
    }

    fn discard_if_cancelled(&mut self, pending: &str) -> Result<(), Error> {
        if self.state == WorkflowState::Cancelled
            || (!self.state.is_terminal() && self.cancel.is_cancelled())
        {
            debug!(pending, "workflow cancelled; discarding result");
            self.state = WorkflowState::Cancelled;
            return Err(Error::cancelled(CANCELLED_MESSAGE));
        }
        Ok(())
    }

    /// Open the form, geotagging the draft.
    ///
    /// With `preset` coordinates, acquisition is skipped.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` or `LocationUnavailable` when no position could be
    ///   obtained; the workflow moves to [`WorkflowState::Aborted`].
    /// - `Cancelled` when closed while waiting for the fix.
    /// - `InvalidRequest` when the workflow is not [`WorkflowState::Idle`].
    pub async fn open(&mut self, preset: Option<Coordinates>) -> Result<(), Error> {
        self.discard_if_cancelled("open")?;
        if self.state != WorkflowState::Idle {
            return Err(Error::invalid_request("The contribution form is already open."));
        }

        let coordinates = match preset {
            Some(coordinates) => coordinates,
            None => {
                self.state = WorkflowState::AcquiringLocation;
                let acquired = self.service.location.acquire().await;
                self.discard_if_cancelled("location")?;
                match acquired {
                    Ok(coordinates) => coordinates,
                    Err(err) => {
                        self.state = WorkflowState::Aborted;
                        return Err(err.into());
                    }
                }
            }
        };

        self.draft = OccurrenceDraft::at(coordinates);
        self.state = WorkflowState::Editing;
        debug!(%coordinates, "contribution form opened");
        Ok(())
    }

    fn ensure_editing(&mut self) -> Result<(), Error> {
        self.discard_if_cancelled("edit")?;
        if self.state == WorkflowState::Editing {
            Ok(())
        } else {
            Err(Error::invalid_request(NOT_EDITING_MESSAGE))
        }
    }

    /// Select the bioindicator species.
    ///
    /// # Errors
    ///
    /// `Cancelled` once the form was closed; `InvalidRequest` outside
    /// [`WorkflowState::Editing`].
    pub fn set_species(&mut self, species_id: impl Into<String>) -> Result<(), Error> {
        self.ensure_editing()?;
        self.draft.species_id = species_id.into();
        Ok(())
    }

    /// Replace the notes text.
    ///
    /// # Errors
    ///
    /// `Cancelled` once the form was closed; `InvalidRequest` outside
    /// [`WorkflowState::Editing`].
    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<(), Error> {
        self.ensure_editing()?;
        self.draft.notes = notes.into();
        Ok(())
    }

    /// Set or clear the pH reading.
    ///
    /// # Errors
    ///
    /// `Cancelled` once the form was closed; `InvalidRequest` outside
    /// [`WorkflowState::Editing`].
    pub fn set_ph(&mut self, ph: Option<f64>) -> Result<(), Error> {
        self.ensure_editing()?;
        self.clear_parse_error(DraftField::Ph);
        self.draft.ph = ph;
        Ok(())
    }

    /// Set or clear the water temperature reading.
    ///
    /// # Errors
    ///
    /// `Cancelled` once the form was closed; `InvalidRequest` outside
    /// [`WorkflowState::Editing`].
    pub fn set_water_temperature(&mut self, celsius: Option<f64>) -> Result<(), Error> {
        self.ensure_editing()?;
        self.clear_parse_error(DraftField::WaterTemperature);
        self.draft.water_temperature = celsius;
        Ok(())
    }

    /// Set the pH reading from form text.
    ///
    /// Unparsable text clears the reading and is reported by the next
    /// [`Self::submit`].
    ///
    /// # Errors
    ///
    /// `Cancelled` once the form was closed; `InvalidRequest` outside
    /// [`WorkflowState::Editing`].
    pub fn set_ph_text(&mut self, raw: &str) -> Result<(), Error> {
        self.ensure_editing()?;
        self.draft.ph = self.parse_text(DraftField::Ph, raw);
        Ok(())
    }

    /// Set the water temperature from form text. See [`Self::set_ph_text`].
    ///
    /// # Errors
    ///
    /// `Cancelled` once the form was closed; `InvalidRequest` outside
    /// [`WorkflowState::Editing`].
    pub fn set_water_temperature_text(&mut self, raw: &str) -> Result<(), Error> {
        self.ensure_editing()?;
        self.draft.water_temperature = self.parse_text(DraftField::WaterTemperature, raw);
        Ok(())
    }

    /// Attach a local photo handle. Nothing is uploaded until submission.
    ///
    /// # Errors
    ///
    /// `Cancelled` once the form was closed; `InvalidRequest` outside
    /// [`WorkflowState::Editing`].
    pub fn attach_image(&mut self, image_ref: Option<String>) -> Result<(), Error> {
        self.ensure_editing()?;
        self.draft.image_ref = image_ref;
        Ok(())
    }

    fn parse_text(&mut self, field: DraftField, raw: &str) -> Option<f64> {
        self.clear_parse_error(field);
        match parse_measurement(field, raw) {
            Ok(value) => value,
            Err(err) => {
                self.parse_errors.push(err);
                None
            }
        }
    }

    fn clear_parse_error(&mut self, field: DraftField) {
        self.parse_errors.retain(|error| error.field != field);
    }

    fn collect_field_errors(&self) -> Vec<FieldError> {
        let mut errors = self.parse_errors.clone();
        if let Err(found) = self.draft.validate() {
            errors.extend(
                found
                    .into_iter()
                    .filter(|error| !self.parse_errors.iter().any(|p| p.field == error.field)),
            );
        }
        errors.sort_by_key(|error| error.field);
        errors
    }

    /// Validate and send the draft.
    ///
    /// On success the draft is cleared, the community and own occurrence
    /// lists are refreshed, and the workflow ends in
    /// [`WorkflowState::Succeeded`].
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` with the field errors in the details; the API is
    ///   not called and editing continues.
    /// - `LocationUnavailable` when the draft lost its geotag.
    /// - `SubmissionFailed` with a generic message when sending fails; the
    ///   draft is kept for a retry.
    /// - `AuthExpired` when the server rejected the session.
    /// - `Cancelled` when closed while sending.
    /// - `InvalidRequest` outside [`WorkflowState::Editing`].
    pub async fn submit(&mut self) -> Result<SubmissionOutcome, Error> {
        self.ensure_editing()?;

        self.state = WorkflowState::Validating;
        let errors = self.collect_field_errors();
        if !errors.is_empty() {
            debug!(count = errors.len(), "draft failed validation");
            let details = validation_details(&errors);
            self.field_errors = errors;
            self.state = WorkflowState::Editing;
            return Err(Error::validation_failed("Please correct the highlighted fields.")
                .with_details(details));
        }
        self.field_errors.clear();

        let Some(payload) = self.draft.to_payload() else {
            self.state = WorkflowState::Editing;
            warn!("draft has no coordinates; refusing to submit");
            return Err(Error::location_unavailable(
                "Could not determine your location. Please try again.",
            ));
        };

        self.state = WorkflowState::Submitting;
        let created = self.service.api.create(&payload).await;
        self.discard_if_cancelled("create")?;

        let occurrence = match created {
            Ok(occurrence) => occurrence,
            Err(err) => {
                self.state = WorkflowState::Editing;
                return Err(classify_send_failure(&err));
            }
        };
        info!(occurrence_id = %occurrence.id, "contribution stored");

        self.draft = OccurrenceDraft::default();
        self.state = WorkflowState::Succeeded;

        let (occurrences, mut refresh_error) = match self.service.refresh.refresh().await {
            Ok(list) => (Some(list), None),
            Err(err) => {
                warn!(error = %err, "refresh after submission failed");
                (None, Some(err))
            }
        };
        if let Err(err) = self.service.refresh.refresh_mine().await {
            warn!(error = %err, "own occurrences refresh after submission failed");
            refresh_error.get_or_insert(err);
        }
        Ok(SubmissionOutcome {
            occurrence,
            occurrences,
            refresh_error,
        })
    }
}

fn validation_details(errors: &[FieldError]) -> serde_json::Value {
    let fields: Vec<_> = errors
        .iter()
        .map(|error| json!({ "field": error.field.as_str(), "message": error.message }))
        .collect();
    json!({ "fields": fields })
}

fn classify_send_failure(error: &OccurrenceApiError) -> Error {
    match error {
        OccurrenceApiError::Unauthorized { message } => {
            warn!(failure = "unauthorized", %message, "contribution refused: session expired");
            Error::auth_expired("Your session has expired. Please log in again.")
        }
        OccurrenceApiError::Rejected { status, message } => {
            warn!(failure = "rejected", status, %message, "contribution rejected by server");
            Error::submission_failed(SUBMISSION_FAILED_MESSAGE)
        }
        OccurrenceApiError::Decode { message } => {
            warn!(failure = "decode", %message, "contribution response unreadable");
            Error::submission_failed(SUBMISSION_FAILED_MESSAGE)
        }
        network => {
            warn!(failure = "network", error = %network, "contribution could not reach server");
            Error::submission_failed(SUBMISSION_FAILED_MESSAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{
        FixtureGeolocationProvider, FixtureOccurrenceApi, GeolocationProviderError,
        MockGeolocationProvider, MockOccurrenceApi, PermissionStatus,
    };
    use crate::domain::OccurrencePayload;
    use async_trait::async_trait;
    use rstest::{fixture, rstest};
    use tokio::sync::Notify;

    fn here() -> Coordinates {
        Coordinates::new(-8.05, -34.88).expect("valid coordinates")
    }

    fn service_over<G, A>(provider: G, api: Arc<A>) -> ContributionService<G, A>
    where
        G: GeolocationProvider,
        A: OccurrenceApi,
    {
        ContributionService::new(
            LocationAcquisitionService::new(Arc::new(provider)),
            Arc::clone(&api),
            OccurrenceListRefresh::new(api),
        )
    }

    #[fixture]
    fn fixture_service() -> ContributionService<FixtureGeolocationProvider, FixtureOccurrenceApi> {
        service_over(
            FixtureGeolocationProvider::at(here()),
            Arc::new(FixtureOccurrenceApi::default()),
        )
    }

    fn untouched_api() -> Arc<MockOccurrenceApi> {
        let mut api = MockOccurrenceApi::new();
        api.expect_create().times(0);
        api.expect_list().times(0);
        Arc::new(api)
    }

    #[rstest]
    #[tokio::test]
    async fn successful_submission_appears_once_after_refresh(
        fixture_service: ContributionService<FixtureGeolocationProvider, FixtureOccurrenceApi>,
    ) {
        let mut workflow = fixture_service.start();
        workflow.open(None).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");
        workflow.set_ph(Some(7.5)).expect("editing");
        workflow.set_water_temperature(Some(25.0)).expect("editing");

        let outcome = workflow.submit().await.expect("submission succeeds");

        assert_eq!(workflow.state(), WorkflowState::Succeeded);
        assert_eq!(workflow.draft(), &OccurrenceDraft::default());
        let listed = outcome.occurrences.expect("refresh succeeded");
        let matching: Vec<_> = listed
            .iter()
            .filter(|o| o.id == outcome.occurrence.id)
            .collect();
        assert_eq!(matching.len(), 1);
        let stored = matching.first().expect("one match");
        assert!(!stored.id.is_empty());
        assert_eq!(stored.species_id, "sp1");
        assert_eq!(stored.ph, Some(7.5));
        assert_eq!(stored.water_temperature, Some(25.0));
        assert_eq!(stored.coordinates, here());
    }

    #[tokio::test]
    async fn successful_submission_refreshes_both_lists() {
        let api = Arc::new(FixtureOccurrenceApi::default());
        let refresh = OccurrenceListRefresh::new(Arc::clone(&api));
        let service = ContributionService::new(
            LocationAcquisitionService::new(Arc::new(FixtureGeolocationProvider::at(here()))),
            Arc::clone(&api),
            refresh.clone(),
        );
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");

        let outcome = workflow.submit().await.expect("submission succeeds");

        assert!(outcome.refresh_error.is_none());
        assert_eq!(refresh.cache().generation(), 1);
        assert_eq!(refresh.mine_cache().generation(), 1);
        let mine = refresh.mine_cache().snapshot().await;
        assert_eq!(mine.len(), 1);
        assert_eq!(
            mine.first().map(|o| o.id.as_str()),
            Some(outcome.occurrence.id.as_str())
        );
    }

    #[tokio::test]
    async fn failed_own_list_refresh_is_reported_without_failing_the_send() {
        let mut api = MockOccurrenceApi::new();
        api.expect_create().times(1).return_once(|payload| {
            Ok(Occurrence::from_payload(
                "42",
                "author-1",
                payload.clone(),
                chrono::Utc::now(),
            ))
        });
        api.expect_list().times(1).return_once(|| Ok(Vec::new()));
        api.expect_list_mine()
            .times(1)
            .return_once(|| Err(OccurrenceApiError::timeout("15s")));
        let service = service_over(FixtureGeolocationProvider::at(here()), Arc::new(api));
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");

        let outcome = workflow.submit().await.expect("submission stands");

        assert_eq!(outcome.occurrence.id, "42");
        assert_eq!(outcome.occurrences, Some(Vec::new()));
        let err = outcome.refresh_error.expect("own refresh failure recorded");
        assert_eq!(err.code(), ErrorCode::FetchFailed);
        assert_eq!(workflow.state(), WorkflowState::Succeeded);
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[tokio::test]
    async fn missing_species_never_reaches_the_api(#[case] species: &str) {
        let service = service_over(FixtureGeolocationProvider::at(here()), untouched_api());
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species(species).expect("editing");

        let err = workflow.submit().await.expect_err("must fail");

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(workflow.state(), WorkflowState::Editing);
        let fields: Vec<_> = workflow.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![DraftField::SpeciesId]);
    }

    #[rstest]
    #[case("-1")]
    #[case("14.1")]
    #[case("neutral")]
    #[tokio::test]
    async fn bad_ph_text_is_a_ph_field_error(#[case] raw: &str) {
        let service = service_over(FixtureGeolocationProvider::at(here()), untouched_api());
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");
        workflow.set_ph_text(raw).expect("editing");

        let err = workflow.submit().await.expect_err("must fail");

        let details = err.details().expect("field details");
        assert_eq!(details["fields"][0]["field"], "pH");
        let fields: Vec<_> = workflow.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![DraftField::Ph]);
    }

    #[rstest]
    #[tokio::test]
    async fn omitted_ph_passes(
        fixture_service: ContributionService<FixtureGeolocationProvider, FixtureOccurrenceApi>,
    ) {
        let mut workflow = fixture_service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");
        workflow.set_ph_text("abc").expect("editing");
        workflow.set_ph_text("").expect("editing");

        workflow.submit().await.expect("submission succeeds");
    }

    #[tokio::test]
    async fn unavailable_location_never_opens_the_form() {
        let mut provider = MockGeolocationProvider::new();
        provider
            .expect_request_permission()
            .return_once(|| Ok(PermissionStatus::Granted));
        provider
            .expect_current_position()
            .return_once(|| Err(GeolocationProviderError::unavailable("no fix")));
        provider
            .expect_last_known_position()
            .return_once(|| Ok(None));
        let service = service_over(provider, untouched_api());
        let mut workflow = service.start();

        let err = workflow.open(None).await.expect_err("must fail");

        assert_eq!(err.code(), ErrorCode::LocationUnavailable);
        assert_eq!(workflow.state(), WorkflowState::Aborted);
        assert!(workflow.set_species("sp1").is_err());
    }

    #[rstest]
    #[case(OccurrenceApiError::transport("connection reset"))]
    #[case(OccurrenceApiError::timeout("15s"))]
    #[case(OccurrenceApiError::rejected(422_u16, "unknown species"))]
    #[tokio::test]
    async fn send_failure_keeps_draft_and_shows_generic_message(
        #[case] failure: OccurrenceApiError,
    ) {
        let mut api = MockOccurrenceApi::new();
        api.expect_create().times(1).return_once(move |_| Err(failure));
        api.expect_list().times(0);
        let service = service_over(FixtureGeolocationProvider::at(here()), Arc::new(api));
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");
        workflow.set_notes("turbid water").expect("editing");

        let err = workflow.submit().await.expect_err("must fail");

        assert_eq!(err.code(), ErrorCode::SubmissionFailed);
        assert_eq!(err.message(), SUBMISSION_FAILED_MESSAGE);
        assert_eq!(workflow.state(), WorkflowState::Editing);
        assert_eq!(workflow.draft().notes, "turbid water");
    }

    #[tokio::test]
    async fn unauthorized_send_is_auth_expired() {
        let mut api = MockOccurrenceApi::new();
        api.expect_create()
            .times(1)
            .return_once(|_| Err(OccurrenceApiError::unauthorized("token expired")));
        let service = service_over(FixtureGeolocationProvider::at(here()), Arc::new(api));
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");

        let err = workflow.submit().await.expect_err("must fail");

        assert!(err.requires_reauthentication());
    }

    /// Occurrence API whose `create` waits until released.
    #[derive(Default)]
    struct GatedOccurrenceApi {
        inner: FixtureOccurrenceApi,
        gate: Notify,
    }

    #[async_trait]
    impl OccurrenceApi for GatedOccurrenceApi {
        async fn create(
            &self,
            payload: &OccurrencePayload,
        ) -> Result<Occurrence, OccurrenceApiError> {
            self.gate.notified().await;
            self.inner.create(payload).await
        }

        async fn list(&self) -> Result<Vec<Occurrence>, OccurrenceApiError> {
            self.inner.list().await
        }

        async fn list_mine(&self) -> Result<Vec<Occurrence>, OccurrenceApiError> {
            self.inner.list_mine().await
        }
    }

    #[tokio::test]
    async fn closing_while_submitting_leaves_cache_untouched() {
        let api = Arc::new(GatedOccurrenceApi::default());
        let refresh = OccurrenceListRefresh::new(Arc::clone(&api));
        let service = ContributionService::new(
            LocationAcquisitionService::new(Arc::new(FixtureGeolocationProvider::at(here()))),
            Arc::clone(&api),
            refresh.clone(),
        );
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");
        let handle = workflow.cancel_handle();

        let (result, ()) = tokio::join!(workflow.submit(), async {
            handle.cancel();
            api.gate.notify_one();
        });

        let err = result.expect_err("cancelled");
        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert_eq!(workflow.state(), WorkflowState::Cancelled);
        assert_eq!(refresh.cache().generation(), 0);
        assert!(refresh.cache().snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn edits_are_rejected_after_cancel() {
        let service = service_over(FixtureGeolocationProvider::at(here()), untouched_api());
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");

        workflow.cancel();

        assert_eq!(workflow.state(), WorkflowState::Cancelled);
        let err = workflow.set_species("sp1").expect_err("closed");
        assert_eq!(err.code(), ErrorCode::Cancelled);
    }

    #[tokio::test]
    async fn closing_through_the_handle_stops_edits_and_submission() {
        let service = service_over(FixtureGeolocationProvider::at(here()), untouched_api());
        let mut workflow = service.start();
        workflow.open(Some(here())).await.expect("form opens");
        workflow.set_species("sp1").expect("editing");

        workflow.cancel_handle().cancel();

        let err = workflow.set_notes("late edit").expect_err("closed");
        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert_eq!(workflow.state(), WorkflowState::Cancelled);
        assert_eq!(workflow.draft().notes, "");
        assert_eq!(workflow.draft().species_id, "sp1");
        let err = workflow.submit().await.expect_err("closed");
        assert_eq!(err.code(), ErrorCode::Cancelled);
    }

    #[tokio::test]
    async fn closing_before_open_keeps_the_form_closed() {
        let service = service_over(FixtureGeolocationProvider::at(here()), untouched_api());
        let mut workflow = service.start();
        workflow.cancel_handle().cancel();

        let err = workflow.open(Some(here())).await.expect_err("closed");

        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert_eq!(workflow.state(), WorkflowState::Cancelled);
        assert_eq!(workflow.draft(), &OccurrenceDraft::default());
    }

    /// Geolocation provider whose current fix waits until released.
    struct GatedGeolocationProvider {
        fix: Coordinates,
        gate: Notify,
    }

    #[async_trait]
    impl GeolocationProvider for GatedGeolocationProvider {
        async fn request_permission(&self) -> Result<PermissionStatus, GeolocationProviderError> {
            Ok(PermissionStatus::Granted)
        }

        async fn current_position(&self) -> Result<Coordinates, GeolocationProviderError> {
            self.gate.notified().await;
            Ok(self.fix)
        }

        async fn last_known_position(
            &self,
        ) -> Result<Option<Coordinates>, GeolocationProviderError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn closing_while_acquiring_discards_the_fix() {
        let provider = Arc::new(GatedGeolocationProvider {
            fix: here(),
            gate: Notify::new(),
        });
        let service = ContributionService::new(
            LocationAcquisitionService::new(Arc::clone(&provider)),
            untouched_api(),
            OccurrenceListRefresh::new(untouched_api()),
        );
        let mut workflow = service.start();
        let handle = workflow.cancel_handle();

        let (result, ()) = tokio::join!(workflow.open(None), async {
            handle.cancel();
            provider.gate.notify_one();
        });

        let err = result.expect_err("cancelled");
        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert_eq!(workflow.state(), WorkflowState::Cancelled);
        assert_eq!(workflow.draft(), &OccurrenceDraft::default());
        assert!(workflow.set_species("sp1").is_err());
    }
}
