use std::fmt::{Debug, Display, Formatter};

use chrono::NaiveDate;
use itertools::Itertools;

/// Price of one hour slot, in the feed's unit (€/MWh).
#[derive(
    Copy,
    Clone,
    PartialEq,
    PartialOrd,
    derive_more::From,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct HourRate(pub f64);

impl Display for HourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} €/MWh", self.0)
    }
}

impl Debug for HourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}€/MWh", self.0)
    }
}

/// One priced hour slot for one zone on one day. Immutable once fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct HourSample {
    pub day: NaiveDate,
    pub hour: u32,
    pub price: HourRate,
    pub zone: String,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SeriesError {
    #[error("the price series is empty")]
    Empty,

    #[error("hour {0} is outside 0..24")]
    HourOutOfRange(u32),

    #[error("hour {0} appears more than once")]
    DuplicateHour(u32),

    #[error("the series mixes days {0} and {1}")]
    MixedDays(NaiveDate, NaiveDate),

    #[error("the series mixes zones {0:?} and {1:?}")]
    MixedZones(String, String),
}

/// Hourly prices for a single day in a single zone.
///
/// Samples are kept in the order the feed returned them: the planner relies
/// on that order for stable tie-breaking. Hours are unique but not
/// necessarily contiguous.
#[derive(Clone, Debug)]
pub struct PriceSeries {
    samples: Vec<HourSample>,
}

impl PriceSeries {
    pub fn try_new(samples: Vec<HourSample>) -> Result<Self, SeriesError> {
        let Some(first) = samples.first() else {
            return Err(SeriesError::Empty);
        };
        for sample in &samples {
            if sample.hour >= 24 {
                return Err(SeriesError::HourOutOfRange(sample.hour));
            }
            if sample.day != first.day {
                return Err(SeriesError::MixedDays(first.day, sample.day));
            }
            if sample.zone != first.zone {
                return Err(SeriesError::MixedZones(first.zone.clone(), sample.zone.clone()));
            }
        }
        if let Some(hour) = samples.iter().map(|sample| sample.hour).duplicates().next() {
            return Err(SeriesError::DuplicateHour(hour));
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[HourSample] {
        &self.samples
    }

    pub fn day(&self) -> NaiveDate {
        self.samples[0].day
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop the slots that already passed. Returns [`None`] when no slot of
    /// the day is left.
    pub fn discard_hours_before(&self, hour: u32) -> Option<Self> {
        let samples: Vec<HourSample> =
            self.samples.iter().filter(|sample| sample.hour >= hour).cloned().collect();
        (!samples.is_empty()).then_some(Self { samples })
    }
}
