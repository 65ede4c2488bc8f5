//! `biosuape` command-line client: log in, record occurrences, browse data.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use biosuape::domain::ports::{
    AuthExpiryListener, FixtureBioindicatorCatalogue, GeolocationProvider, OccurrenceApi,
};
use biosuape::domain::{
    AuthService, CatalogueService, ContributionService, ContributionWorkflow, Coordinates, Error,
    ErrorCode, LocationAcquisitionService, LoginCredentials, Occurrence, OccurrenceListRefresh,
    Registration, ReportService, SessionManager, UserMessage, format_one_decimal, format_timestamp,
};
use biosuape::outbound::http::ApiHttpClient;
use biosuape::outbound::session_file::FileSessionStore;
use biosuape::settings::{ClientSettings, LogFormat};
use chrono::Local;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `biosuape` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "biosuape",
    about = "Record and browse bioindicator occurrences in the Suape estuary",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a session.
    Login {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long)]
        password: String,
    },
    /// Create an account.
    Register {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long)]
        password: String,
    },
    /// End the session.
    Logout,
    /// List occurrences.
    Occurrences {
        /// Only occurrences submitted by the logged-in user.
        #[arg(long)]
        mine: bool,
    },
    /// Record a new occurrence.
    Submit {
        /// Bioindicator species id (see `catalogue`).
        #[arg(long)]
        species: String,
        /// Observation notes.
        #[arg(long)]
        notes: Option<String>,
        /// Water pH reading.
        #[arg(long)]
        ph: Option<String>,
        /// Water temperature in degrees Celsius.
        #[arg(long = "water-temperature")]
        water_temperature: Option<String>,
        /// Local photo reference.
        #[arg(long)]
        image: Option<String>,
        /// Latitude; skips location acquisition together with `--longitude`.
        #[arg(long, requires = "longitude", allow_negative_numbers = true)]
        latitude: Option<f64>,
        /// Longitude; skips location acquisition together with `--latitude`.
        #[arg(long, requires = "latitude", allow_negative_numbers = true)]
        longitude: Option<f64>,
    },
    /// Browse the bioindicator catalogue.
    Catalogue {
        /// Filter on popular or scientific name.
        #[arg(long)]
        search: Option<String>,
    },
    /// Monthly occurrence trend.
    Report {
        /// Number of months, ending with the current one.
        #[arg(long, default_value_t = 6)]
        months: u32,
    },
}

/// Tells the user on stderr that they must log in again.
struct ExpiryNotice;

impl AuthExpiryListener for ExpiryNotice {
    fn on_auth_expired(&self) {
        if let Err(write_err) = writeln!(
            io::stderr().lock(),
            "Your session has expired. Run `biosuape login` to continue."
        ) {
            warn!(error = %write_err, "could not print session expiry notice");
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let settings = ClientSettings::load_from_iter([OsString::from("biosuape")])
        .wrap_err("load configuration")?;
    init_tracing(settings.log_format()?);

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(run(cli.command, settings))
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("biosuape=info"));
    let builder = fmt().with_env_filter(filter).with_writer(io::stderr);
    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if let Err(e) = result {
        warn!(error = %e, "tracing init failed");
    }
}

/// Print `error` for the user and turn it into a report.
fn fail(error: &Error) -> color_eyre::Report {
    let message = UserMessage::from(error);
    let mut stderr = io::stderr().lock();
    if let Err(write_err) = writeln!(stderr, "{message}") {
        drop(write_err);
    }
    if error.code() == ErrorCode::ValidationFailed {
        let fields = error
            .details()
            .and_then(|details| details.get("fields"))
            .and_then(|fields| fields.as_array())
            .cloned()
            .unwrap_or_default();
        for field in fields {
            let name = field.get("field").and_then(|v| v.as_str()).unwrap_or("?");
            let text = field.get("message").and_then(|v| v.as_str()).unwrap_or("");
            if let Err(write_err) = writeln!(stderr, "  {name}: {text}") {
                drop(write_err);
            }
        }
    }
    eyre!("{error}")
}

async fn run(command: Command, settings: ClientSettings) -> Result<()> {
    let store = Arc::new(FileSessionStore::new(settings.session_file()));
    let session = Arc::new(SessionManager::new(store).with_listener(Arc::new(ExpiryNotice)));
    session.restore().await.map_err(|e| fail(&e))?;

    let api = Arc::new(
        ApiHttpClient::new(
            &settings.api_base_url()?,
            settings.request_timeout(),
            Arc::clone(&session),
        )
        .wrap_err("build API client")?,
    );
    let refresh = OccurrenceListRefresh::new(Arc::clone(&api));
    let catalogue = CatalogueService::new(Arc::new(FixtureBioindicatorCatalogue));
    let mut out = io::stdout().lock();

    match command {
        Command::Login { email, password } => {
            let credentials = LoginCredentials::try_from_parts(&email, &password)
                .map_err(|e| fail(&Error::invalid_request(e.to_string())))?;
            let user = AuthService::new(api, session)
                .login(&credentials)
                .await
                .map_err(|e| fail(&e))?;
            let greeting = format!("Logged in as {} <{}>.", user.name, user.email);
            writeln!(out, "{}", UserMessage::success(greeting))?;
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let registration = Registration::try_from_parts(&name, &email, &password)
                .map_err(|e| fail(&Error::invalid_request(e.to_string())))?;
            let message = AuthService::new(api, session)
                .register(&registration)
                .await
                .map_err(|e| fail(&e))?;
            writeln!(out, "{}", UserMessage::success(message))?;
        }
        Command::Logout => {
            AuthService::new(api, session)
                .logout()
                .await
                .map_err(|e| fail(&e))?;
            writeln!(out, "{}", UserMessage::success("Logged out."))?;
        }
        Command::Occurrences { mine } => {
            let listed = if mine {
                refresh.refresh_mine().await
            } else {
                refresh.refresh().await
            }
            .map_err(|e| fail(&e))?;
            if listed.is_empty() {
                writeln!(out, "No occurrences recorded yet.")?;
            }
            for occurrence in &listed {
                let species = catalogue
                    .find(&occurrence.species_id)
                    .await
                    .ok()
                    .flatten()
                    .map_or_else(|| occurrence.species_id.clone(), |s| s.popular_name);
                writeln!(out, "{}", occurrence_line(occurrence, &species))?;
            }
        }
        Command::Submit {
            species,
            notes,
            ph,
            water_temperature,
            image,
            latitude,
            longitude,
        } => {
            let preset = match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => Some(
                    Coordinates::new(latitude, longitude)
                        .map_err(|e| fail(&Error::invalid_request(e.to_string())))?,
                ),
                _ => None,
            };
            let provider = settings.geolocation_provider()?;
            let location = LocationAcquisitionService::new(Arc::new(provider));
            let mut workflow =
                ContributionService::new(location, Arc::clone(&api), refresh.clone()).start();
            workflow.open(preset).await.map_err(|e| fail(&e))?;
            let draft = DraftArgs {
                species,
                notes,
                ph,
                water_temperature,
                image,
            };
            fill_draft(&mut workflow, draft).map_err(|e| fail(&e))?;

            let submitted = tokio::select! {
                result = workflow.submit() => result,
                _ = tokio::signal::ctrl_c() => Err(Error::cancelled("Submission cancelled.")),
            };
            if submitted.as_ref().is_err_and(|e| e.code() == ErrorCode::Cancelled) {
                workflow.cancel();
            }
            let outcome = submitted.map_err(|e| fail(&e))?;
            writeln!(
                out,
                "{}",
                UserMessage::success(format!("Contribution sent (id {}).", outcome.occurrence.id))
            )?;
            if let Some(error) = outcome.refresh_error {
                writeln!(io::stderr(), "{}", UserMessage::from(&error))?;
            }
        }
        Command::Catalogue { search } => {
            let species = catalogue
                .search(search.as_deref().unwrap_or(""))
                .await
                .map_err(|e| fail(&e))?;
            if species.is_empty() {
                writeln!(out, "No bioindicator matches that search.")?;
            }
            for entry in species {
                writeln!(
                    out,
                    "{:>3}  {} ({})\n     {}\n     Indicates: {}",
                    entry.id,
                    entry.popular_name,
                    entry.scientific_name,
                    entry.description,
                    entry.indicator_role
                )?;
            }
        }
        Command::Report { months } => {
            let report = ReportService::new(refresh, Arc::new(DefaultClock))
                .monthly(months)
                .await
                .map_err(|e| fail(&e))?;
            if report.is_empty() {
                writeln!(out, "No data available for the selected period.")?;
            }
            for bucket in &report.buckets {
                writeln!(
                    out,
                    "{} {}  {:>4}  pH {:>5}  {:>5} °C",
                    bucket.label,
                    bucket.year,
                    bucket.count,
                    format_one_decimal(bucket.mean_ph),
                    format_one_decimal(bucket.mean_water_temperature)
                )?;
            }
        }
    }
    Ok(())
}

/// Form values given on the command line.
struct DraftArgs {
    species: String,
    notes: Option<String>,
    ph: Option<String>,
    water_temperature: Option<String>,
    image: Option<String>,
}

fn fill_draft<G, A>(
    workflow: &mut ContributionWorkflow<G, A>,
    draft: DraftArgs,
) -> std::result::Result<(), Error>
where
    G: GeolocationProvider,
    A: OccurrenceApi,
{
    workflow.set_species(draft.species)?;
    workflow.set_notes(draft.notes.unwrap_or_default())?;
    workflow.set_ph_text(draft.ph.as_deref().unwrap_or(""))?;
    workflow.set_water_temperature_text(draft.water_temperature.as_deref().unwrap_or(""))?;
    workflow.attach_image(draft.image)
}

fn occurrence_line(occurrence: &Occurrence, species: &str) -> String {
    format!(
        "{}  {}  {}  pH {}  {} °C  [{}]",
        format_timestamp(&occurrence.created_at.with_timezone(&Local)),
        species,
        occurrence.id,
        format_one_decimal(occurrence.ph),
        format_one_decimal(occurrence.water_temperature),
        occurrence.coordinates
    )
}
