//! Configuration loading and validation.
//!
//! Turns a raw `ConfigPort` into validated domain config values. Thresholds
//! are deliberately configuration, not constants: the drawdown limit in
//! particular has no universally correct value, so `[simulation]` must spell
//! it out. Required keys are surfaced as `ConfigMissing`, never silently
//! defaulted.

use crate::domain::engine::SimulationConfig;
use crate::domain::error::RiskbenchError;
use crate::domain::killswitch::KillSwitchThresholds;
use crate::ports::config_port::ConfigPort;

fn invalid(section: &str, key: &str, reason: &str) -> RiskbenchError {
    RiskbenchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn missing(section: &str, key: &str) -> RiskbenchError {
    RiskbenchError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn require_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<f64, RiskbenchError> {
    match config.get_string(section, key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(section, key, "not a number")),
        None => Err(missing(section, key)),
    }
}

/// Load and validate the `[simulation]` section, plus `[killswitch]` when
/// enabled there.
pub fn load_simulation_config(
    config: &dyn ConfigPort,
) -> Result<SimulationConfig, RiskbenchError> {
    let initial_capital = require_double(config, "simulation", "initial_capital")?;
    if initial_capital <= 0.0 {
        return Err(invalid(
            "simulation",
            "initial_capital",
            "must be positive",
        ));
    }

    let max_drawdown_limit = require_double(config, "simulation", "max_drawdown_limit")?;
    if max_drawdown_limit <= 0.0 || max_drawdown_limit >= 1.0 {
        return Err(invalid(
            "simulation",
            "max_drawdown_limit",
            "must be a fraction between 0 and 1",
        ));
    }

    let position_fraction = config.get_double("simulation", "position_fraction", 0.10);
    if position_fraction <= 0.0 || position_fraction > 1.0 {
        return Err(invalid(
            "simulation",
            "position_fraction",
            "must be in (0, 1]",
        ));
    }

    let commission_rate = config.get_double("simulation", "commission_rate", 0.0);
    if !(0.0..1.0).contains(&commission_rate) {
        return Err(invalid(
            "simulation",
            "commission_rate",
            "must be a fraction in [0, 1)",
        ));
    }

    let slippage_rate = config.get_double("simulation", "slippage_rate", 0.0);
    if !(0.0..1.0).contains(&slippage_rate) {
        return Err(invalid(
            "simulation",
            "slippage_rate",
            "must be a fraction in [0, 1)",
        ));
    }

    let risk_free_rate = config.get_double("simulation", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            "simulation",
            "risk_free_rate",
            "must be between 0 and 1",
        ));
    }

    let bars_per_year = config.get_double("simulation", "bars_per_year", 252.0);
    if bars_per_year <= 0.0 {
        return Err(invalid("simulation", "bars_per_year", "must be positive"));
    }

    let kill_switch = if config.get_bool("killswitch", "enabled", false) {
        Some(load_kill_switch_thresholds(config)?)
    } else {
        None
    };

    Ok(SimulationConfig {
        initial_capital,
        position_fraction,
        max_drawdown_limit,
        commission_rate,
        slippage_rate,
        allow_shorting: config.get_bool("simulation", "allow_shorting", false),
        risk_free_rate,
        bars_per_year,
        kill_switch,
    })
}

/// Load and validate the `[killswitch]` section. All keys default to the
/// monitor's standard thresholds.
pub fn load_kill_switch_thresholds(
    config: &dyn ConfigPort,
) -> Result<KillSwitchThresholds, RiskbenchError> {
    let defaults = KillSwitchThresholds::default();

    let max_drawdown = config.get_double("killswitch", "max_drawdown", defaults.max_drawdown);
    if max_drawdown <= 0.0 || max_drawdown >= 1.0 {
        return Err(invalid(
            "killswitch",
            "max_drawdown",
            "must be a fraction between 0 and 1",
        ));
    }

    let spread_multiple =
        config.get_double("killswitch", "spread_multiple", defaults.spread_multiple);
    if spread_multiple <= 1.0 {
        return Err(invalid(
            "killswitch",
            "spread_multiple",
            "must be greater than 1",
        ));
    }

    let volume_lookback =
        config.get_int("killswitch", "volume_lookback", defaults.volume_lookback as i64);
    if volume_lookback < 1 {
        return Err(invalid(
            "killswitch",
            "volume_lookback",
            "must be at least 1",
        ));
    }

    Ok(KillSwitchThresholds {
        max_drawdown,
        spread_multiple,
        volume_lookback: volume_lookback as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = r#"
[simulation]
initial_capital = 100000.0
position_fraction = 0.25
max_drawdown_limit = 0.20
commission_rate = 0.001
slippage_rate = 0.0005
allow_shorting = true
risk_free_rate = 0.05
bars_per_year = 252
"#;

    #[test]
    fn valid_config_loads() {
        let config = make_config(VALID);
        let sim = load_simulation_config(&config).unwrap();
        assert!((sim.initial_capital - 100_000.0).abs() < f64::EPSILON);
        assert!((sim.position_fraction - 0.25).abs() < f64::EPSILON);
        assert!((sim.max_drawdown_limit - 0.20).abs() < f64::EPSILON);
        assert!(sim.allow_shorting);
        assert!(sim.kill_switch.is_none());
    }

    #[test]
    fn initial_capital_required() {
        let config = make_config("[simulation]\nmax_drawdown_limit = 0.2\n");
        let err = load_simulation_config(&config).unwrap_err();
        assert!(
            matches!(err, RiskbenchError::ConfigMissing { key, .. } if key == "initial_capital")
        );
    }

    #[test]
    fn initial_capital_must_be_positive() {
        let config =
            make_config("[simulation]\ninitial_capital = -100\nmax_drawdown_limit = 0.2\n");
        let err = load_simulation_config(&config).unwrap_err();
        assert!(
            matches!(err, RiskbenchError::ConfigInvalid { key, .. } if key == "initial_capital")
        );
    }

    #[test]
    fn drawdown_limit_required_not_defaulted() {
        let config = make_config("[simulation]\ninitial_capital = 100000\n");
        let err = load_simulation_config(&config).unwrap_err();
        assert!(
            matches!(err, RiskbenchError::ConfigMissing { key, .. } if key == "max_drawdown_limit")
        );
    }

    #[test]
    fn drawdown_limit_must_be_fractional() {
        let config =
            make_config("[simulation]\ninitial_capital = 100000\nmax_drawdown_limit = 20\n");
        let err = load_simulation_config(&config).unwrap_err();
        assert!(
            matches!(err, RiskbenchError::ConfigInvalid { key, .. } if key == "max_drawdown_limit")
        );
    }

    #[test]
    fn position_fraction_bounds() {
        let config = make_config(
            "[simulation]\ninitial_capital = 100000\nmax_drawdown_limit = 0.2\nposition_fraction = 1.5\n",
        );
        let err = load_simulation_config(&config).unwrap_err();
        assert!(
            matches!(err, RiskbenchError::ConfigInvalid { key, .. } if key == "position_fraction")
        );
    }

    #[test]
    fn kill_switch_loaded_when_enabled() {
        let content = format!(
            "{VALID}\n[killswitch]\nenabled = true\nmax_drawdown = 0.15\nspread_multiple = 4.0\nvolume_lookback = 10\n"
        );
        let config = make_config(&content);
        let sim = load_simulation_config(&config).unwrap();
        let ks = sim.kill_switch.unwrap();
        assert!((ks.max_drawdown - 0.15).abs() < f64::EPSILON);
        assert!((ks.spread_multiple - 4.0).abs() < f64::EPSILON);
        assert_eq!(ks.volume_lookback, 10);
    }

    #[test]
    fn kill_switch_defaults_apply() {
        let config = make_config("[killswitch]\nenabled = true\n");
        let ks = load_kill_switch_thresholds(&config).unwrap();
        assert!((ks.max_drawdown - 0.20).abs() < f64::EPSILON);
        assert!((ks.spread_multiple - 3.0).abs() < f64::EPSILON);
        assert_eq!(ks.volume_lookback, 5);
    }

    #[test]
    fn kill_switch_rejects_bad_lookback() {
        let config = make_config("[killswitch]\nvolume_lookback = 0\n");
        let err = load_kill_switch_thresholds(&config).unwrap_err();
        assert!(
            matches!(err, RiskbenchError::ConfigInvalid { key, .. } if key == "volume_lookback")
        );
    }

    #[test]
    fn spread_multiple_must_exceed_one() {
        let config = make_config("[killswitch]\nspread_multiple = 0.5\n");
        assert!(load_kill_switch_thresholds(&config).is_err());
    }
}
