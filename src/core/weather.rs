/// Whether the controlled device heats or cools, deciding which way the
/// weather gate cuts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevicePolarity {
    Heater,
    Cooler,
}

/// A heater is pointless on a warm day, a cooler on a cold one.
pub const fn should_run(polarity: DevicePolarity, is_cold_today: bool) -> bool {
    match polarity {
        DevicePolarity::Heater => is_cold_today,
        DevicePolarity::Cooler => !is_cold_today,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_runs_on_cold_days_only() {
        assert!(should_run(DevicePolarity::Heater, true));
        assert!(!should_run(DevicePolarity::Heater, false));
    }

    #[test]
    fn cooler_runs_on_warm_days_only() {
        assert!(should_run(DevicePolarity::Cooler, false));
        assert!(!should_run(DevicePolarity::Cooler, true));
    }
}
