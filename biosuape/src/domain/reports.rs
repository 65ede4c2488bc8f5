//! Monthly trend report over the occurrence list.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use mockable::Clock;
use tracing::debug;

use super::ports::OccurrenceApi;
use super::{Error, Occurrence, OccurrenceListRefresh};

/// Longest window a report may cover.
pub const MAX_REPORT_MONTHS: u32 = 24;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Short Portuguese label for `month` (1-based).
#[must_use]
pub fn month_label(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_LABELS.get(index as usize))
        .copied()
        .unwrap_or("?")
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    samples: u32,
}

#[expect(
    clippy::float_arithmetic,
    reason = "means of water readings are inherently floating point"
)]
impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.samples += 1;
        }
    }

    fn value(self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum / f64::from(self.samples))
    }
}

/// Aggregates for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBucket {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-based.
    pub month: u32,
    /// Chart label such as `Fev`.
    pub label: &'static str,
    /// Occurrences recorded in the month.
    pub count: u32,
    /// Mean pH over occurrences that recorded one.
    pub mean_ph: Option<f64>,
    /// Mean water temperature over occurrences that recorded one.
    pub mean_water_temperature: Option<f64>,
}

/// Oldest-first monthly buckets ending with the current month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReport {
    /// One bucket per month in the window.
    pub buckets: Vec<MonthlyBucket>,
}

impl MonthlyReport {
    /// Whether no occurrence fell inside the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Occurrences counted across all buckets.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }
}

fn month_index(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

/// Bucket `occurrences` into the `months` calendar months ending at `now`.
///
/// Occurrences outside the window are ignored. Months are taken in UTC.
#[must_use]
pub fn aggregate(occurrences: &[Occurrence], now: DateTime<Utc>, months: u32) -> MonthlyReport {
    let current = month_index(now.year(), now.month());
    let first = current - i64::from(months) + 1;

    let mut counts = vec![(0_u32, Mean::default(), Mean::default()); months as usize];
    for occurrence in occurrences {
        let at = occurrence.created_at;
        let offset = month_index(at.year(), at.month()) - first;
        let Some(slot) = usize::try_from(offset)
            .ok()
            .and_then(|offset| counts.get_mut(offset))
        else {
            continue;
        };
        slot.0 += 1;
        slot.1.add(occurrence.ph);
        slot.2.add(occurrence.water_temperature);
    }

    let buckets = counts
        .into_iter()
        .zip(first..)
        .map(|((count, ph, temperature), index)| {
            let year = i32::try_from(index.div_euclid(12)).unwrap_or(i32::MAX);
            let month = u32::try_from(index.rem_euclid(12) + 1).unwrap_or(1);
            MonthlyBucket {
                year,
                month,
                label: month_label(month),
                count,
                mean_ph: ph.value(),
                mean_water_temperature: temperature.value(),
            }
        })
        .collect();
    MonthlyReport { buckets }
}

/// Builds trend reports from a fresh occurrence list.
pub struct ReportService<A> {
    refresh: OccurrenceListRefresh<A>,
    clock: Arc<dyn Clock>,
}

impl<A> ReportService<A>
where
    A: OccurrenceApi,
{
    /// Create a service reading through `refresh`, dating reports with `clock`.
    pub fn new(refresh: OccurrenceListRefresh<A>, clock: Arc<dyn Clock>) -> Self {
        Self { refresh, clock }
    }

    /// Refresh the list and aggregate the trailing `months` months.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` when `months` is zero or above [`MAX_REPORT_MONTHS`].
    /// - Any refresh error (`FetchFailed`, `AuthExpired`).
    pub async fn monthly(&self, months: u32) -> Result<MonthlyReport, Error> {
        if months == 0 || months > MAX_REPORT_MONTHS {
            return Err(Error::invalid_request(format!(
                "months must be between 1 and {MAX_REPORT_MONTHS}"
            )));
        }
        let occurrences = self.refresh.refresh().await?;
        let report = aggregate(&occurrences, self.clock.utc(), months);
        debug!(months, total = report.total(), "monthly report built");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::FixtureOccurrenceApi;
    use crate::domain::{Coordinates, OccurrencePayload};
    use chrono::{Local, TimeZone};
    use rstest::rstest;

    struct FixtureClock {
        utc_now: DateTime<Utc>,
    }

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<Local> {
            self.utc_now.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.utc_now
        }
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("valid fixture timestamp")
    }

    fn occurrence(created_at: DateTime<Utc>, ph: Option<f64>, temp: Option<f64>) -> Occurrence {
        let payload = OccurrencePayload {
            species_id: "1".to_owned(),
            notes: None,
            ph,
            water_temperature: temp,
            image_ref: None,
            coordinates: Coordinates::new(-8.3, -34.9).expect("valid coordinates"),
        };
        Occurrence::from_payload("id", "author", payload, created_at)
    }

    #[test]
    fn buckets_span_year_boundary_oldest_first() {
        let report = aggregate(&[], at(2025, 2, 10), 4);
        let labels: Vec<_> = report
            .buckets
            .iter()
            .map(|b| (b.year, b.label))
            .collect();
        assert_eq!(
            labels,
            vec![(2024, "Nov"), (2024, "Dez"), (2025, "Jan"), (2025, "Fev")]
        );
        assert!(report.is_empty());
    }

    #[test]
    fn means_ignore_missing_readings() {
        let occurrences = vec![
            occurrence(at(2025, 2, 1), Some(7.0), Some(24.0)),
            occurrence(at(2025, 2, 20), Some(8.0), None),
            occurrence(at(2025, 1, 5), None, None),
            occurrence(at(2024, 6, 5), Some(1.0), Some(1.0)),
        ];
        let report = aggregate(&occurrences, at(2025, 2, 28), 2);

        let [january, february] = report.buckets.as_slice() else {
            panic!("expected two buckets, got {:?}", report.buckets);
        };
        assert_eq!(january.count, 1);
        assert_eq!(january.mean_ph, None);
        assert_eq!(february.count, 2);
        assert_eq!(february.mean_ph, Some(7.5));
        assert_eq!(february.mean_water_temperature, Some(24.0));
        assert_eq!(report.total(), 3);
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_REPORT_MONTHS + 1)]
    #[tokio::test]
    async fn window_must_be_bounded(#[case] months: u32) {
        let service = ReportService::new(
            OccurrenceListRefresh::new(Arc::new(FixtureOccurrenceApi::default())),
            Arc::new(FixtureClock {
                utc_now: at(2025, 2, 1),
            }),
        );
        let err = service.monthly(months).await.expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn monthly_reads_a_fresh_list() {
        let api = FixtureOccurrenceApi::seeded(vec![occurrence(at(2025, 3, 2), Some(6.5), None)]);
        let refresh = OccurrenceListRefresh::new(Arc::new(api));
        let service = ReportService::new(
            refresh.clone(),
            Arc::new(FixtureClock {
                utc_now: at(2025, 3, 15),
            }),
        );

        let report = service.monthly(6).await.expect("report builds");

        assert_eq!(report.buckets.len(), 6);
        assert_eq!(report.buckets.last().map(|b| b.label), Some("Mar"));
        assert_eq!(report.total(), 1);
        assert_eq!(refresh.cache().generation(), 1);
    }

    #[rstest]
    #[case(1, "Jan")]
    #[case(12, "Dez")]
    #[case(0, "?")]
    #[case(13, "?")]
    fn labels_are_portuguese_short_months(#[case] month: u32, #[case] label: &str) {
        assert_eq!(month_label(month), label);
    }
}
