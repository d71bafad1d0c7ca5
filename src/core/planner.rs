//! Turns a day of hourly prices into the cheapest set of contiguous
//! "device on" windows covering the configured amount of active hours.

use chrono::{DateTime, Local, MappedLocalTime, NaiveDate, TimeDelta};
use ordered_float::OrderedFloat;

use crate::{
    core::{
        series::{HourSample, PriceSeries},
        window::{Plan, Window},
    },
    prelude::*,
};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("active hours must be between 1 and 24, got {0}")]
    ActiveHoursOutOfRange(u32),

    #[error("hour {hour} on {day} does not exist in the local timezone")]
    UnrepresentableLocalTime { day: NaiveDate, hour: u32 },
}

/// Plan the day's windows.
///
/// The selection is a two-phase construction carried over from the previous
/// incarnation of this tool: ranges of adjacent hours are discovered while
/// walking the samples in price order, cheapest first, and only re-sorted by
/// hour at the very end. Two hour-adjacent slots therefore end up in separate
/// ranges whenever the price walk visited some other hour in between. That
/// grouping is part of the observable contract (see the tests); true
/// hour-contiguity grouping would change which windows come out.
///
/// A budget larger than the series is not an error: every range is kept and
/// the plan simply covers fewer hours than requested.
#[instrument(skip_all, fields(n_samples = series.len(), required_active_hours))]
pub fn plan(series: &PriceSeries, required_active_hours: u32) -> Result<Plan, PlanError> {
    if !(1..=24).contains(&required_active_hours) {
        return Err(PlanError::ActiveHoursOutOfRange(required_active_hours));
    }

    let ranges = correlative_ranges(series);
    let kept = truncate_to_budget(ranges, required_active_hours as usize);

    let mut windows = Vec::with_capacity(kept.len());
    for mut range in kept {
        range.sort_by_key(|sample| sample.hour);
        let (Some(first), Some(last)) = (range.first(), range.last()) else {
            continue;
        };
        let start = local_slot_start(first.day, first.hour)? + TimeDelta::minutes(5);
        // A lone slot runs for 50 minutes; a longer range stops 5 minutes
        // before the boundary that follows its last slot.
        let stop = if range.len() == 1 {
            start + TimeDelta::minutes(50)
        } else {
            local_slot_start(last.day, last.hour)? + TimeDelta::minutes(55)
        };
        windows.push(Window { start, stop });
    }

    windows.sort_by_key(|window| window.start);
    Ok(Plan::new(windows))
}

/// Group the samples into runs of adjacent hours, walking them cheapest
/// first. Adjacency is checked against the immediately preceding sample of
/// the price-ordered walk, not against the hour order.
fn correlative_ranges(series: &PriceSeries) -> Vec<Vec<HourSample>> {
    let mut by_price = series.samples().to_vec();
    // The sort is stable: equally priced slots keep the feed order.
    by_price.sort_by_key(|sample| OrderedFloat(sample.price.0));

    let mut ranges: Vec<Vec<HourSample>> = Vec::new();
    for sample in by_price {
        match ranges.last_mut() {
            Some(range)
                if range
                    .last()
                    .is_some_and(|previous| previous.hour.abs_diff(sample.hour) == 1) =>
            {
                range.push(sample);
            }
            _ => ranges.push(vec![sample]),
        }
    }
    ranges
}

/// Keep whole ranges, cheapest first, until the budget runs out. The range
/// that would cross the budget is cut down to its cheapest prefix, which is
/// simply its head since ranges are discovered in price order.
fn truncate_to_budget(
    ranges: Vec<Vec<HourSample>>,
    budget: usize,
) -> Vec<Vec<HourSample>> {
    let mut remaining = budget;
    let mut kept = Vec::new();
    for mut range in ranges {
        if remaining == 0 {
            break;
        }
        range.truncate(remaining);
        remaining -= range.len();
        kept.push(range);
    }
    kept
}

fn local_slot_start(day: NaiveDate, hour: u32) -> Result<DateTime<Local>, PlanError> {
    let Some(naive) = day.and_hms_opt(hour, 0, 0) else {
        return Err(PlanError::UnrepresentableLocalTime { day, hour });
    };
    match naive.and_local_timezone(Local) {
        MappedLocalTime::Single(start) | MappedLocalTime::Ambiguous(start, _) => Ok(start),
        MappedLocalTime::None => Err(PlanError::UnrepresentableLocalTime { day, hour }),
    }
}
