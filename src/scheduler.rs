//! The daily loop: once per day, gate on the weather, fetch the prices, plan
//! the windows, and arm one timer pair per window. Everything that can fail
//! is contained inside the cycle; the loop itself runs until the process
//! dies.

use std::sync::Arc;

use chrono::{DateTime, Local, MappedLocalTime, TimeDelta, Timelike};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};

use crate::{
    api::provider::{PriceProvider, WeatherProvider},
    config::Settings,
    core::{
        planner,
        weather::{self, DevicePolarity},
        window::Plan,
    },
    dispatch::{Action, ActionDispatcher},
    prelude::*,
    retry::RetryPolicy,
};

/// Coarse result of one scheduling cycle, logged once per day.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CycleOutcome {
    /// Timers are live for today's windows.
    Armed { windows: usize },

    /// The weather provider kept failing; nothing runs today.
    WeatherUnavailable,

    /// The weather is unsuitable for the device polarity; nothing runs today.
    WeatherUnsuitable,

    /// The price provider kept failing; nothing runs today.
    PricesUnavailable,

    /// The fetched series was unusable; nothing runs today.
    PlanFailed,

    /// Every remaining hour slot of today has already passed.
    NothingLeftToday,
}

pub struct Scheduler {
    polarity: DevicePolarity,
    active_hours: u32,
    ignore_passed_hours: bool,
    price_retry: RetryPolicy,
    weather_retry: RetryPolicy,
    prices: Box<dyn PriceProvider>,
    weather: Option<Box<dyn WeatherProvider>>,
    dispatcher: Arc<ActionDispatcher>,

    /// Handles of every timer spawned for the current plan, kept so that the
    /// next cycle can cancel whatever is still pending.
    armed: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        settings: &Settings,
        prices: Box<dyn PriceProvider>,
        weather: Option<Box<dyn WeatherProvider>>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            polarity: settings.device.polarity,
            active_hours: settings.device.active_hours,
            ignore_passed_hours: settings.ignore_passed_hours,
            price_retry: settings.price.retry,
            weather_retry: settings
                .weather
                .as_ref()
                .map_or_else(RetryPolicy::default, |weather| weather.retry),
            prices,
            weather,
            dispatcher: Arc::new(dispatcher),
            armed: Vec::new(),
        }
    }

    /// Run the daily loop forever. The first cycle starts immediately; every
    /// following one is anchored at local midnight + 1 minute, when the
    /// day-ahead prices are known.
    pub async fn run(mut self) -> Result {
        loop {
            let woke_at = Local::now();
            let outcome = self.run_cycle(woke_at).await;
            info!(outcome = ?outcome, "cycle finished");

            let now = Local::now();
            let pause = next_anchor(now) - now;
            info!(seconds = pause.num_seconds(), "sleeping until the next scheduling anchor");
            sleep(pause.to_std().unwrap_or_default()).await;
        }
    }

    async fn run_cycle(&mut self, now: DateTime<Local>) -> CycleOutcome {
        // Whatever yesterday left pending is superseded by today's plan.
        self.abort_pending();

        if let Some(provider) = &self.weather {
            let provider = provider.as_ref();
            let is_cold = match self.weather_retry.run(move || provider.is_cold_today()).await {
                Ok(is_cold) => is_cold,
                Err(error) => {
                    warn!(
                        error = format!("{error:#}"),
                        "could not settle today's weather, skipping the day",
                    );
                    return CycleOutcome::WeatherUnavailable;
                }
            };
            if !weather::should_run(self.polarity, is_cold) {
                info!(polarity = ?self.polarity, is_cold, "unsuitable weather, skipping the day");
                return CycleOutcome::WeatherUnsuitable;
            }
        }

        let prices = self.prices.as_ref();
        let series = match self.price_retry.run(move || prices.fetch_today()).await {
            Ok(series) => series,
            Err(error) => {
                warn!(
                    error = format!("{error:#}"),
                    "could not fetch today's prices, skipping the day",
                );
                return CycleOutcome::PricesUnavailable;
            }
        };

        let series = if self.ignore_passed_hours {
            match series.discard_hours_before(now.hour()) {
                Some(series) => series,
                None => {
                    info!("all of today's hour slots have already passed");
                    return CycleOutcome::NothingLeftToday;
                }
            }
        } else {
            series
        };

        let plan = match planner::plan(&series, self.active_hours) {
            Ok(plan) => plan,
            Err(error) => {
                error!(%error, "failed to build today's plan");
                return CycleOutcome::PlanFailed;
            }
        };
        info!(n_windows = plan.len(), "built today's plan");

        let windows = self.arm(&plan).await;
        CycleOutcome::Armed { windows }
    }

    /// Arm one start timer and one stop timer per window. Spawning is
    /// serialized per window through a confirmation channel: the next window
    /// is not touched until both tasks of the current one are live. Firing is
    /// not serialized; the tasks sleep and fire on their own.
    async fn arm(&mut self, plan: &Plan) -> usize {
        // If a previous run died inside a window, the device may still be on.
        self.dispatcher.on_stop().await;

        let mut windows = 0;
        for window in plan.iter() {
            let now = Local::now();
            let (confirm, mut confirmed) = mpsc::channel::<()>(2);
            let mut launched = 0;

            let until_start = window.start - now;
            let until_stop = window.stop - now;

            // A start in the future gets a timer; a start that already passed
            // while the stop has not means we woke up inside the window and
            // the device should go on right away.
            if until_start > TimeDelta::zero() || window.contains(now) {
                let handle =
                    self.spawn_action(Action::Start, window.start, until_start, confirm.clone());
                self.armed.push(handle);
                launched += 1;
            }
            if until_stop > TimeDelta::zero() {
                let handle =
                    self.spawn_action(Action::Stop, window.stop, until_stop, confirm.clone());
                self.armed.push(handle);
                launched += 1;
            }
            drop(confirm);

            // Launch barrier: wait for the spawn confirmations only, never
            // for the timers to fire.
            for _ in 0..launched {
                let _ = confirmed.recv().await;
            }
            if launched > 0 {
                windows += 1;
            }
        }
        windows
    }

    fn spawn_action(
        &self,
        action: Action,
        at: DateTime<Local>,
        until: TimeDelta,
        confirm: mpsc::Sender<()>,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        // An already-passed start fires immediately.
        let delay = until.to_std().unwrap_or_default();
        tokio::spawn(async move {
            info!(?action, at = %at, "action armed");
            let _ = confirm.send(()).await;
            sleep(delay).await;
            dispatcher.dispatch(action).await;
            info!(?action, at = %at, "action executed");
        })
    }

    fn abort_pending(&mut self) {
        let mut aborted = 0;
        for handle in self.armed.drain(..) {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            warn!(aborted, "cancelled timers still pending from the previous cycle");
        }
    }
}

/// The next day's scheduling instant: local midnight + 1 minute. Falls back
/// to 24 hours ahead in the degenerate case where 00:01 does not exist
/// locally.
fn next_anchor(now: DateTime<Local>) -> DateTime<Local> {
    let next_day = now.date_naive() + TimeDelta::days(1);
    match next_day.and_hms_opt(0, 1, 0).map(|anchor| anchor.and_local_timezone(Local)) {
        Some(MappedLocalTime::Single(anchor) | MappedLocalTime::Ambiguous(anchor, _)) => anchor,
        _ => now + TimeDelta::hours(24),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::core::{
        series::{HourRate, HourSample, PriceSeries},
        window::Window,
    };

    fn settings(toml: &str) -> Settings {
        toml::from_str(toml).unwrap()
    }

    const HEATER: &str = r#"
        [device]
        polarity = "heater"
        active_hours = 1

        [price]
        zone = "mainland"
        retry = { attempts = 2, delay_seconds = 0 }

        [weather]
        retry = { attempts = 1, delay_seconds = 0 }

        [weather.coordinates]
        latitude = 40.4
        longitude = -3.7

        [weather.temperature]
        threshold = 15.0
    "#;

    struct StaticPrices {
        series: Option<PriceSeries>,
        calls: &'static AtomicU32,
    }

    #[async_trait]
    impl PriceProvider for StaticPrices {
        async fn fetch_today(&self) -> Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.series.clone().context("the feed is down")
        }
    }

    struct StaticWeather(bool);

    #[async_trait]
    impl WeatherProvider for StaticWeather {
        async fn is_cold_today(&self) -> Result<bool> {
            Ok(self.0)
        }
    }

    struct Recording(&'static Mutex<Vec<&'static str>>);

    #[async_trait]
    impl crate::integrations::Integration for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn turn_on(&self) -> Result {
            self.0.lock().unwrap().push("on");
            Ok(())
        }

        async fn turn_off(&self) -> Result {
            self.0.lock().unwrap().push("off");
            Ok(())
        }
    }

    fn recording_dispatcher(log: &'static Mutex<Vec<&'static str>>) -> ActionDispatcher {
        ActionDispatcher::from_integrations(vec![(
            Box::new(Recording(log)),
            RetryPolicy { attempts: 1, delay: Duration::ZERO },
        )])
    }

    fn tomorrow_series() -> PriceSeries {
        let day = Local::now().date_naive() + TimeDelta::days(1);
        PriceSeries::try_new(vec![HourSample {
            day,
            hour: 10,
            price: HourRate(50.0),
            zone: "mainland".to_string(),
        }])
        .unwrap()
    }

    #[test]
    fn anchor_is_next_day_one_minute_past_midnight() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(13, 37, 42)
            .unwrap()
            .and_local_timezone(Local)
            .earliest()
            .unwrap();
        let anchor = next_anchor(now);
        assert_eq!(anchor.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
        assert_eq!(anchor.time(), NaiveTime::from_hms_opt(0, 1, 0).unwrap());
    }

    #[tokio::test]
    async fn unsuitable_weather_skips_the_day_without_fetching_prices() {
        static LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
        static CALLS: AtomicU32 = AtomicU32::new(0);
        let mut scheduler = Scheduler::new(
            &settings(HEATER),
            Box::new(StaticPrices { series: Some(tomorrow_series()), calls: &CALLS }),
            Some(Box::new(StaticWeather(false))),
            recording_dispatcher(&LOG),
        );
        // A heater on a warm day stays off.
        let outcome = scheduler.run_cycle(Local::now()).await;
        assert_eq!(outcome, CycleOutcome::WeatherUnsuitable);
        assert!(scheduler.armed.is_empty());
        assert!(LOG.lock().unwrap().is_empty());
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn price_retry_exhaustion_skips_the_day() {
        static LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
        static CALLS: AtomicU32 = AtomicU32::new(0);
        let mut scheduler = Scheduler::new(
            &settings(HEATER),
            Box::new(StaticPrices { series: None, calls: &CALLS }),
            Some(Box::new(StaticWeather(true))),
            recording_dispatcher(&LOG),
        );
        let outcome = scheduler.run_cycle(Local::now()).await;
        assert_eq!(outcome, CycleOutcome::PricesUnavailable);
        assert!(scheduler.armed.is_empty());
        assert!(LOG.lock().unwrap().is_empty());
        // The configured policy gives the feed two attempts.
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn a_cold_day_arms_both_timers_of_the_window() {
        static LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
        static CALLS: AtomicU32 = AtomicU32::new(0);
        let mut scheduler = Scheduler::new(
            &settings(HEATER),
            Box::new(StaticPrices { series: Some(tomorrow_series()), calls: &CALLS }),
            Some(Box::new(StaticWeather(true))),
            recording_dispatcher(&LOG),
        );
        let outcome = scheduler.run_cycle(Local::now()).await;
        assert_eq!(outcome, CycleOutcome::Armed { windows: 1 });
        assert_eq!(scheduler.armed.len(), 2);
        // The crash-safety stop fired before any timer.
        assert_eq!(*LOG.lock().unwrap(), vec!["off"]);
        scheduler.abort_pending();
    }

    #[tokio::test]
    async fn waking_up_inside_a_window_fires_the_start_immediately() {
        static LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
        let now = Local::now();
        let plan = Plan::new(vec![
            // Already over: no timers at all.
            Window { start: now - TimeDelta::hours(2), stop: now - TimeDelta::hours(1) },
            // In flight: immediate start, short stop timer.
            Window {
                start: now - TimeDelta::minutes(1),
                stop: now + TimeDelta::milliseconds(200),
            },
        ]);
        static CALLS: AtomicU32 = AtomicU32::new(0);
        let mut scheduler = Scheduler::new(
            &settings(HEATER),
            Box::new(StaticPrices { series: None, calls: &CALLS }),
            None,
            recording_dispatcher(&LOG),
        );
        let windows = scheduler.arm(&plan).await;
        assert_eq!(windows, 1);
        assert_eq!(scheduler.armed.len(), 2);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*LOG.lock().unwrap(), vec!["off", "on", "off"]);
    }
}
