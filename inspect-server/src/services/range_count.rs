//! Per-window record counts and monthly histogram

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::models::{DataRow, MonthlyCount, RecordCounts, ValidateRangesRequest, WindowKind};

/// Count rows per window (inclusive both ends) and bucket them by month.
///
/// A month is labelled by the first window whose date-only range contains
/// its first day, checked training, testing, then simulation.
pub fn count_ranges(req: &ValidateRangesRequest, rows: &[DataRow]) -> (RecordCounts, Vec<MonthlyCount>) {
    let mut counts = RecordCounts::default();
    let mut months: BTreeMap<(i32, u32), usize> = BTreeMap::new();

    for row in rows {
        let ts = row.timestamp;
        if req.training_period.contains(ts) {
            counts.training += 1;
        }
        if req.testing_period.contains(ts) {
            counts.testing += 1;
        }
        if req.simulation_period.contains(ts) {
            counts.simulation += 1;
        }
        *months.entry((ts.year(), ts.month())).or_default() += 1;
    }

    let monthly = months
        .into_iter()
        .filter_map(|((year, month), count)| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(MonthlyCount {
                month: first.format("%b %Y").to_string(),
                count,
                kind: classify_month(req, first),
            })
        })
        .collect();

    (counts, monthly)
}

fn classify_month(req: &ValidateRangesRequest, first_of_month: NaiveDate) -> WindowKind {
    if req.training_period.contains_date(first_of_month) {
        WindowKind::Training
    } else if req.testing_period.contains_date(first_of_month) {
        WindowKind::Testing
    } else if req.simulation_period.contains_date(first_of_month) {
        WindowKind::Simulation
    } else {
        WindowKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeWindow;
    use crate::store::tests::{epoch, spaced_rows};
    use chrono::{Duration, TimeZone, Utc};

    fn day(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_monthly_histogram_is_chronological_and_labelled() {
        // 2021-01-01 .. 2021-04-30, one row a day
        let rows = spaced_rows(120, Duration::days(1));
        assert_eq!(rows[0].timestamp, epoch());

        let req = ValidateRangesRequest {
            training_period: TimeWindow::new(day(2021, 1, 1), day(2021, 2, 10)),
            testing_period: TimeWindow::new(day(2021, 2, 11), day(2021, 3, 5)),
            simulation_period: TimeWindow::new(day(2021, 3, 6), day(2021, 3, 31)),
        };

        let (counts, monthly) = count_ranges(&req, &rows);
        assert_eq!(counts.training, 41);
        assert_eq!(counts.testing, 23);
        assert_eq!(counts.simulation, 26);

        let labels: Vec<_> = monthly.iter().map(|m| (m.month.as_str(), m.kind, m.count)).collect();
        assert_eq!(
            labels,
            vec![
                ("Jan 2021", WindowKind::Training, 31),
                ("Feb 2021", WindowKind::Training, 28),
                // Mar 1 falls in testing even though most of March is simulation
                ("Mar 2021", WindowKind::Testing, 31),
                ("Apr 2021", WindowKind::Other, 30),
            ]
        );
    }

    #[test]
    fn test_counts_on_empty_rows() {
        let req = ValidateRangesRequest {
            training_period: TimeWindow::new(day(2021, 1, 1), day(2021, 1, 2)),
            testing_period: TimeWindow::new(day(2021, 1, 3), day(2021, 1, 4)),
            simulation_period: TimeWindow::new(day(2021, 1, 5), day(2021, 1, 6)),
        };
        let (counts, monthly) = count_ranges(&req, &[]);
        assert_eq!(counts, RecordCounts::default());
        assert!(monthly.is_empty());
    }
}
