//! Reindexes a table onto a strictly regular hourly or daily grid.
//!
//! The grid spans `floor(min(time_stamp))..=ceil(max(time_stamp))` in the
//! target zone. Hourly slots are stepped in absolute time from the floored
//! minimum, so a local day has 23 or 25 slots across DST transitions. Daily
//! slots start at local midnight.
//!
//! Hourly rows join the grid by exact instant; rows between grid instants are
//! dropped and counted in an `OffGridRows` warning. Daily rows join the slot of
//! their local calendar day. The first row of a slot (in input order) wins
//! unless daily mean aggregation is selected.

use crate::core::timezone::zone_value;
use crate::domain::model::{
    DailyAggregation, DateRange, Granularity, PipelineWarning, Table, Value, TIME_STAMP,
};
use crate::domain::settings::PipelineSettings;
use crate::utils::error::Result;
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Timelike};
use chrono_tz::Tz;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ResampleOptions {
    pub granularity: Granularity,
    pub timezone: Tz,
    pub min_year_exclusive: Option<i32>,
    pub aggregation: DailyAggregation,
    pub date_range: DateRange,
}

impl ResampleOptions {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            granularity: settings.granularity,
            timezone: settings.timezone,
            min_year_exclusive: settings.cutoff_year(),
            aggregation: settings.daily_aggregation,
            date_range: settings.date_range,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resampled {
    pub table: Table,
    pub warnings: Vec<PipelineWarning>,
}

/// Hourly grid using the hourly half of `settings` regardless of its granularity.
pub fn resample_hourly(table: &Table, settings: &PipelineSettings) -> Result<Table> {
    let mut settings = settings.clone();
    settings.granularity = Granularity::Hourly;
    Ok(resample(table, &settings)?.table)
}

/// Daily grid using the daily half of `settings` regardless of its granularity.
pub fn resample_daily(table: &Table, settings: &PipelineSettings) -> Result<Table> {
    let mut settings = settings.clone();
    settings.granularity = Granularity::Daily;
    Ok(resample(table, &settings)?.table)
}

pub fn resample(table: &Table, settings: &PipelineSettings) -> Result<Resampled> {
    resample_with(table, &ResampleOptions::from_settings(settings))
}

pub fn resample_with(table: &Table, options: &ResampleOptions) -> Result<Resampled> {
    let ts_idx = table.require_column(TIME_STAMP)?;
    let tz = options.timezone;

    let payload: Vec<usize> = (0..table.columns.len()).filter(|&i| i != ts_idx).collect();
    let mut columns = Vec::with_capacity(table.columns.len());
    columns.push(TIME_STAMP.to_string());
    columns.extend(payload.iter().map(|&i| table.columns[i].clone()));

    let mut warnings = Vec::new();

    // Join key -> member rows in input order
    let mut slots: HashMap<SlotKey, Vec<usize>> = HashMap::new();
    let mut bounds: Option<(DateTime<Tz>, DateTime<Tz>)> = None;
    let mut untimed = 0usize;

    for (i, row) in table.rows.iter().enumerate() {
        let zoned = zone_value(&row[ts_idx], &tz, i + 1)?;
        let Some(ts) = zoned.as_timestamp().copied() else {
            untimed += 1;
            continue;
        };
        let Some(key) = join_key(options.granularity, &tz, &ts) else {
            untimed += 1;
            continue;
        };
        slots.entry(key).or_default().push(i);
        bounds = Some(match bounds {
            None => (ts, ts),
            Some((lo, hi)) => (lo.min(ts), hi.max(ts)),
        });
    }

    if untimed > 0 {
        tracing::warn!("{} rows have no time_stamp and were left off the grid", untimed);
        warnings.push(PipelineWarning::UntimedRows { count: untimed });
    }

    let Some((min, max)) = bounds else {
        return Ok(Resampled {
            table: Table::new(columns),
            warnings,
        });
    };

    let grid = build_grid(options.granularity, &tz, &min, &max);
    let on_grid: HashSet<SlotKey> = grid.iter().map(SlotKey::of).collect();

    let (mut duplicates, mut off_grid) = (0usize, 0usize);
    for (key, members) in &slots {
        if on_grid.contains(key) {
            duplicates += members.len() - 1;
        } else {
            off_grid += members.len();
        }
    }
    if off_grid > 0 {
        tracing::warn!("{} rows fall between grid instants and were dropped", off_grid);
        warnings.push(PipelineWarning::OffGridRows { count: off_grid });
    }
    if duplicates > 0 {
        tracing::debug!("{} rows repeat an earlier grid instant", duplicates);
        warnings.push(PipelineWarning::DuplicateSlots { count: duplicates });
    }

    tracing::debug!(
        "Built {} grid with {} slots from {} to {}",
        options.granularity,
        grid.len(),
        min,
        max
    );

    let mean = options.granularity == Granularity::Daily
        && options.aggregation == DailyAggregation::Mean;

    let mut rows = Vec::with_capacity(grid.len());
    for slot in grid {
        if options
            .min_year_exclusive
            .is_some_and(|year| slot.year() <= year)
        {
            continue;
        }
        if !options.date_range.contains(slot.date_naive()) {
            continue;
        }

        let mut out = Vec::with_capacity(columns.len());
        out.push(Value::Timestamp(slot));
        match slots.get(&SlotKey::of(&slot)) {
            Some(members) if mean => {
                out.extend(payload.iter().map(|&col| mean_of(table, members, col)));
            }
            Some(members) => {
                let first = &table.rows[members[0]];
                out.extend(payload.iter().map(|&col| first[col].clone()));
            }
            None => out.extend(payload.iter().map(|_| Value::Null)),
        }
        rows.push(out);
    }

    Ok(Resampled {
        table: Table::with_rows(columns, rows),
        warnings,
    })
}

/// Strictly increasing slot starts covering `min..=max`.
pub fn build_grid(
    granularity: Granularity,
    tz: &Tz,
    min: &DateTime<Tz>,
    max: &DateTime<Tz>,
) -> Vec<DateTime<Tz>> {
    match granularity {
        Granularity::Hourly => {
            let origin = floor_hour(min);
            let span = *max - origin;
            let mut steps = span.num_hours();
            if span > TimeDelta::hours(steps) {
                steps += 1;
            }
            (0..=steps)
                .map(|step| origin + TimeDelta::hours(step))
                .collect()
        }
        Granularity::Daily => {
            let first = min.date_naive();
            let last_date = max.date_naive();
            let last = match start_of_day(tz, last_date) {
                Some(start) if start == *max => last_date,
                _ => last_date.succ_opt().unwrap_or(last_date),
            };
            first
                .iter_days()
                .take_while(|date| *date <= last)
                .filter_map(|date| start_of_day(tz, date))
                .collect()
        }
    }
}

/// Absolute instant used to join rows onto grid slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotKey {
    secs: i64,
    nanos: u32,
}

impl SlotKey {
    fn of(ts: &DateTime<Tz>) -> Self {
        Self {
            secs: ts.timestamp(),
            nanos: ts.timestamp_subsec_nanos(),
        }
    }
}

fn join_key(granularity: Granularity, tz: &Tz, ts: &DateTime<Tz>) -> Option<SlotKey> {
    match granularity {
        Granularity::Hourly => Some(SlotKey::of(ts)),
        Granularity::Daily => start_of_day(tz, ts.date_naive()).map(|start| SlotKey::of(&start)),
    }
}

/// Start of the local wall-clock hour containing `ts`.
fn floor_hour(ts: &DateTime<Tz>) -> DateTime<Tz> {
    let into_hour = TimeDelta::seconds(i64::from(ts.minute() * 60 + ts.second()))
        + TimeDelta::nanoseconds(i64::from(ts.nanosecond()));
    *ts - into_hour
}

/// First valid local instant of `date`; zones that skip midnight start later.
fn start_of_day(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    (0..96).find_map(|quarter| {
        tz.from_local_datetime(&(midnight + TimeDelta::minutes(15 * quarter)))
            .earliest()
    })
}

fn mean_of(table: &Table, members: &[usize], col: usize) -> Value {
    let values: Vec<&Value> = members.iter().map(|&r| &table.rows[r][col]).collect();
    let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();
    let numbers: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();

    if numbers.is_empty() || numbers.len() != present.len() {
        return values[0].clone();
    }
    Value::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{HUMIDITY, PM25_ATM};
    use chrono_tz::America::New_York;

    fn text(s: &str) -> Value {
        if s.is_empty() {
            Value::Null
        } else {
            Value::Text(s.to_string())
        }
    }

    fn table(rows: &[(&str, &str, &str)]) -> Table {
        Table::with_rows(
            vec![
                TIME_STAMP.to_string(),
                PM25_ATM.to_string(),
                HUMIDITY.to_string(),
            ],
            rows.iter()
                .map(|(ts, pm, h)| vec![text(ts), text(pm), text(h)])
                .collect(),
        )
    }

    fn stamps(table: &Table) -> Vec<String> {
        table.rows.iter().map(|r| r[0].render()).collect()
    }

    #[test]
    fn test_hourly_fills_gaps_with_nulls() {
        let input = table(&[
            ("2024-01-01T05:00:00Z", "10", "50"),
            ("2024-01-01T08:00:00Z", "12", "45"),
        ]);
        let out = resample_hourly(&input, &PipelineSettings::hourly()).unwrap();

        assert_eq!(
            stamps(&out),
            vec![
                "2024-01-01 00:00:00-05:00",
                "2024-01-01 01:00:00-05:00",
                "2024-01-01 02:00:00-05:00",
                "2024-01-01 03:00:00-05:00",
            ]
        );
        assert_eq!(out.rows[0][1], Value::Text("10".to_string()));
        assert!(out.rows[1][1].is_null() && out.rows[1][2].is_null());
        assert_eq!(out.rows[3][2], Value::Text("45".to_string()));
    }

    #[test]
    fn test_hourly_sorts_unordered_input() {
        let input = table(&[
            ("2024-02-01T07:00:00Z", "3", "1"),
            ("2024-02-01T05:00:00Z", "1", "1"),
        ]);
        let out = resample_hourly(&input, &PipelineSettings::hourly()).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.rows[0][1], Value::Text("1".to_string()));
        assert_eq!(out.rows[2][1], Value::Text("3".to_string()));
    }

    #[test]
    fn test_duplicate_timestamps_keep_first_row() {
        let input = table(&[
            ("2024-01-01T05:00:00Z", "10", "50"),
            ("2024-01-01 00:00:00-05:00", "99", "99"),
            ("2024-01-01T06:00:00Z", "11", "50"),
        ]);
        let result = resample(&input, &PipelineSettings::hourly()).unwrap();

        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.rows[0][1], Value::Text("10".to_string()));
        assert!(result
            .warnings
            .contains(&PipelineWarning::DuplicateSlots { count: 1 }));
    }

    #[test]
    fn test_off_grid_reading_does_not_displace_on_grid_reading() {
        let input = table(&[
            ("2024-01-01T05:30:00Z", "1", "50"),
            ("2024-01-01T05:00:00Z", "2", "50"),
        ]);
        let result = resample(&input, &PipelineSettings::hourly()).unwrap();

        assert_eq!(
            stamps(&result.table),
            vec!["2024-01-01 00:00:00-05:00", "2024-01-01 01:00:00-05:00"]
        );
        assert_eq!(result.table.rows[0][1], Value::Text("2".to_string()));
        assert!(result.table.rows[1][1].is_null());
        assert!(result
            .warnings
            .contains(&PipelineWarning::OffGridRows { count: 1 }));
        assert!(!result
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::DuplicateSlots { .. })));
    }

    #[test]
    fn test_off_grid_reading_leaves_its_hour_empty() {
        let input = table(&[
            ("2024-01-01T05:40:00Z", "7", "50"),
            ("2024-01-01T07:00:00Z", "9", "50"),
        ]);
        let out = resample_hourly(&input, &PipelineSettings::hourly()).unwrap();

        assert_eq!(out.len(), 3);
        assert!(out.rows[0][1].is_null());
        assert!(out.rows[1][1].is_null());
        assert_eq!(out.rows[2][1], Value::Text("9".to_string()));
    }

    #[test]
    fn test_half_hour_dst_shift_keeps_grid_hourly() {
        // Lord Howe falls back 30 minutes at 02:00 local on 2024-04-07
        let input = table(&[
            ("2024-04-06T13:00:00Z", "1", "50"),
            ("2024-04-06T16:30:00Z", "2", "50"),
        ]);
        let settings = PipelineSettings::hourly()
            .with_timezone_name("Australia/Lord_Howe")
            .unwrap();
        let result = resample(&input, &settings).unwrap();

        let grid: Vec<DateTime<Tz>> = result
            .table
            .rows
            .iter()
            .map(|r| *r[0].as_timestamp().unwrap())
            .collect();
        assert_eq!(grid.len(), 5);
        assert!(grid
            .windows(2)
            .all(|pair| pair[1] - pair[0] == TimeDelta::hours(1)));
        let latest = chrono::Utc.with_ymd_and_hms(2024, 4, 6, 16, 30, 0).unwrap();
        assert!(*grid.last().unwrap() >= latest);
        assert_eq!(result.table.rows[0][1], Value::Text("1".to_string()));
        assert!(result
            .warnings
            .contains(&PipelineWarning::OffGridRows { count: 1 }));
    }

    #[test]
    fn test_spring_forward_day_has_23_hourly_slots() {
        let input = table(&[
            ("2024-03-10T05:00:00Z", "1", "1"),
            ("2024-03-11T04:00:00Z", "1", "1"),
        ]);
        let out = resample_hourly(&input, &PipelineSettings::hourly()).unwrap();
        let on_day = out
            .rows
            .iter()
            .filter(|r| {
                r[0].as_timestamp().map(|ts| ts.date_naive())
                    == NaiveDate::from_ymd_opt(2024, 3, 10)
            })
            .count();
        assert_eq!(on_day, 23);
        assert!(!stamps(&out).iter().any(|s| s.starts_with("2024-03-10 02:")));
    }

    #[test]
    fn test_fall_back_day_has_25_hourly_slots() {
        let input = table(&[
            ("2024-11-03T04:00:00Z", "1", "1"),
            ("2024-11-04T05:00:00Z", "1", "1"),
        ]);
        let out = resample_hourly(&input, &PipelineSettings::hourly()).unwrap();
        let on_day = out
            .rows
            .iter()
            .filter(|r| {
                r[0].as_timestamp().map(|ts| ts.date_naive())
                    == NaiveDate::from_ymd_opt(2024, 11, 3)
            })
            .count();
        assert_eq!(on_day, 25);
    }

    #[test]
    fn test_hourly_cutoff_drops_2023_but_daily_keeps_it() {
        let input = table(&[
            ("2023-12-31T12:00:00Z", "5", "40"),
            ("2024-01-01T05:00:00Z", "6", "40"),
        ]);

        let hourly = resample_hourly(&input, &PipelineSettings::hourly()).unwrap();
        assert!(hourly
            .rows
            .iter()
            .all(|r| r[0].as_timestamp().unwrap().year() > 2023));
        assert_eq!(hourly.rows[0][1], Value::Text("6".to_string()));

        let daily = resample_daily(&input, &PipelineSettings::daily()).unwrap();
        assert_eq!(
            stamps(&daily),
            vec!["2023-12-31 00:00:00-05:00", "2024-01-01 00:00:00-05:00"]
        );
        assert_eq!(daily.rows[0][1], Value::Text("5".to_string()));
    }

    #[test]
    fn test_cutoff_can_be_disabled() {
        let input = table(&[("2023-06-01T12:00:00Z", "5", "40")]);
        let mut settings = PipelineSettings::hourly();
        settings.cutoff = crate::domain::settings::CutoffPolicy::disabled();
        let out = resample_hourly(&input, &settings).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_daily_grid_is_consecutive_days() {
        let input = table(&[
            ("2024-05-01T12:00:00Z", "1", "1"),
            ("2024-05-01T18:00:00Z", "2", "1"),
            ("2024-05-04T12:00:00Z", "4", "1"),
        ]);
        let out = resample_daily(&input, &PipelineSettings::daily()).unwrap();

        // 05-04 08:00 local is past midnight, so the ceiling adds 05-05
        assert_eq!(
            stamps(&out),
            vec![
                "2024-05-01 00:00:00-04:00",
                "2024-05-02 00:00:00-04:00",
                "2024-05-03 00:00:00-04:00",
                "2024-05-04 00:00:00-04:00",
                "2024-05-05 00:00:00-04:00",
            ]
        );
        assert_eq!(out.rows[0][1], Value::Text("1".to_string()));
        assert!(out.rows[1][1].is_null());
        assert_eq!(out.rows[3][1], Value::Text("4".to_string()));
    }

    #[test]
    fn test_daily_mean_aggregation() {
        let input = table(&[
            ("2024-05-01T12:00:00Z", "1", "40"),
            ("2024-05-01T18:00:00Z", "3", ""),
        ]);
        let mut settings = PipelineSettings::daily();
        settings.daily_aggregation = DailyAggregation::Mean;
        let out = resample_daily(&input, &settings).unwrap();

        assert_eq!(out.rows[0][1], Value::Number(2.0));
        assert_eq!(out.rows[0][2], Value::Number(40.0));
    }

    #[test]
    fn test_resampling_is_idempotent() {
        let input = table(&[
            ("2024-03-09T12:30:00Z", "1", "1"),
            ("2024-03-10T12:00:00Z", "2", "2"),
            ("2024-03-10T12:00:00Z", "3", "3"),
        ]);
        for settings in [PipelineSettings::hourly(), PipelineSettings::daily()] {
            let once = resample(&input, &settings).unwrap().table;
            let twice = resample(&once, &settings).unwrap().table;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_date_range_filter() {
        let input = table(&[
            ("2024-05-01T12:00:00Z", "1", "1"),
            ("2024-05-05T12:00:00Z", "5", "1"),
        ]);
        let mut settings = PipelineSettings::daily();
        settings.date_range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 5, 2),
            end: NaiveDate::from_ymd_opt(2024, 5, 3),
        };
        let out = resample_daily(&input, &settings).unwrap();
        assert_eq!(
            stamps(&out),
            vec!["2024-05-02 00:00:00-04:00", "2024-05-03 00:00:00-04:00"]
        );
    }

    #[test]
    fn test_empty_table_keeps_schema() {
        let input = table(&[]);
        let out = resample_hourly(&input, &PipelineSettings::hourly()).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns, vec![TIME_STAMP, PM25_ATM, HUMIDITY]);
    }

    #[test]
    fn test_rows_without_timestamp_are_skipped() {
        let input = table(&[("", "1", "1"), ("2024-01-01T05:00:00Z", "2", "2")]);
        let result = resample(&input, &PipelineSettings::hourly()).unwrap();
        assert_eq!(result.table.len(), 1);
        assert!(result
            .warnings
            .contains(&PipelineWarning::UntimedRows { count: 1 }));
    }

    #[test]
    fn test_time_stamp_moves_to_first_column() {
        let input = Table::with_rows(
            vec!["sensor".to_string(), TIME_STAMP.to_string()],
            vec![vec![
                Value::Text("A1".to_string()),
                Value::Text("2024-01-01T05:00:00Z".to_string()),
            ]],
        );
        let out = resample_hourly(&input, &PipelineSettings::hourly()).unwrap();
        assert_eq!(out.columns, vec![TIME_STAMP, "sensor"]);
        assert_eq!(out.rows[0][1], Value::Text("A1".to_string()));
    }
}
