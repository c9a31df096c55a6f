//! Strategy descriptors.
//!
//! A descriptor names a strategy, lists the indicators it needs, and carries
//! the buy and sell predicates. Descriptors are built either in code or from
//! a `ConfigPort` with `[strategy]`, `[indicators]` and `[conditions]`
//! sections.

use crate::domain::error::{ParseError, TradesimError};
use crate::domain::indicator::{
    macd, IndicatorSpec, IndicatorType, DEFAULT_BOLLINGER_MULT, DEFAULT_BOLLINGER_PERIOD,
    DEFAULT_RSI_PERIOD,
};
use crate::domain::predicate::Predicate;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone)]
pub struct Conditions {
    pub buy: Predicate,
    pub sell: Predicate,
}

#[derive(Debug, Clone)]
pub struct StrategyDescriptor {
    pub name: String,
    pub description: String,
    pub indicators: IndicatorSpec,
    pub conditions: Conditions,
}

impl StrategyDescriptor {
    pub fn new(
        name: impl Into<String>,
        indicators: IndicatorSpec,
        buy: Predicate,
        sell: Predicate,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            indicators,
            conditions: Conditions { buy, sell },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Checks that hold for descriptors built in code as well as from files.
    pub fn validate(&self) -> Result<(), TradesimError> {
        if self.name.trim().is_empty() {
            return Err(TradesimError::DescriptorMissing {
                fields: vec!["name".into()],
            });
        }
        for indicator in self.indicators.requests() {
            if let Some(reason) = parameter_problem(indicator) {
                return Err(TradesimError::DescriptorInvalid {
                    key: indicator.to_string(),
                    reason: reason.into(),
                });
            }
        }
        Ok(())
    }

    /// Syntax errors in textual conditions, labelled `buy` / `sell`.
    ///
    /// These do not make the descriptor invalid: a broken condition simply
    /// never fires.
    pub fn syntax_errors(&self) -> Vec<(&'static str, &str, &ParseError)> {
        [("buy", &self.conditions.buy), ("sell", &self.conditions.sell)]
            .into_iter()
            .filter_map(|(side, predicate)| match predicate {
                Predicate::Expression(e) => e.syntax_error().map(|err| (side, e.source(), err)),
                Predicate::Callable(_) => None,
            })
            .collect()
    }

    /// Build a descriptor from `[strategy]`, `[indicators]` and `[conditions]`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradesimError> {
        let name = config
            .get_string("strategy", "name")
            .filter(|s| !s.trim().is_empty());
        let buy = config
            .get_string("conditions", "buy")
            .filter(|s| !s.trim().is_empty());
        let sell = config
            .get_string("conditions", "sell")
            .filter(|s| !s.trim().is_empty());

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name".to_string());
        }
        if !config.has_section("indicators") {
            missing.push("indicators".to_string());
        }
        if !config.has_section("conditions") {
            missing.push("conditions".to_string());
        } else {
            if buy.is_none() {
                missing.push("conditions.buy".to_string());
            }
            if sell.is_none() {
                missing.push("conditions.sell".to_string());
            }
        }

        let (Some(name), Some(buy), Some(sell)) = (name, buy, sell) else {
            return Err(TradesimError::DescriptorMissing { fields: missing });
        };
        if !missing.is_empty() {
            return Err(TradesimError::DescriptorMissing { fields: missing });
        }

        let mut descriptor = StrategyDescriptor::new(
            name.trim(),
            parse_indicator_section(config)?,
            Predicate::expression(buy.trim()),
            Predicate::expression(sell.trim()),
        );
        if let Some(description) = config.get_string("strategy", "description") {
            descriptor = descriptor.with_description(description.trim());
        }
        descriptor.validate()?;
        Ok(descriptor)
    }
}

fn parameter_problem(indicator: &IndicatorType) -> Option<&'static str> {
    let zero_period = match *indicator {
        IndicatorType::Sma(p)
        | IndicatorType::Ema(p)
        | IndicatorType::Rsi(p)
        | IndicatorType::VolumeSma(p) => p == 0,
        IndicatorType::Macd { fast, slow, signal } => fast == 0 || slow == 0 || signal == 0,
        IndicatorType::Bollinger { period, mult } => {
            if !mult.is_valid() {
                return Some("multiplier must be finite and non-negative");
            }
            period == 0
        }
    };
    zero_period.then_some("periods must be positive")
}

fn parse_indicator_section(config: &dyn ConfigPort) -> Result<IndicatorSpec, TradesimError> {
    let mut spec = IndicatorSpec::new();

    for key in config.keys("indicators") {
        let raw = config.get_string("indicators", &key).unwrap_or_default();
        let value = raw.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("false") {
            continue;
        }
        let enabled = value.eq_ignore_ascii_case("true");

        match key.as_str() {
            "sma" => {
                for period in parse_periods(&key, value)? {
                    spec.add(IndicatorType::Sma(period));
                }
            }
            "ema" => {
                for period in parse_periods(&key, value)? {
                    spec.add(IndicatorType::Ema(period));
                }
            }
            "rsi" => {
                let period = if enabled {
                    DEFAULT_RSI_PERIOD
                } else {
                    single_period(&key, value)?
                };
                spec.add(IndicatorType::Rsi(period));
            }
            "volume_sma" | "volumesma" => {
                spec.add(IndicatorType::VolumeSma(single_period(&key, value)?));
            }
            "macd" => {
                let (fast, slow, signal) = if enabled {
                    (macd::DEFAULT_FAST, macd::DEFAULT_SLOW, macd::DEFAULT_SIGNAL)
                } else {
                    match parse_periods(&key, value)?.as_slice() {
                        [fast, slow, signal] => (*fast, *slow, *signal),
                        _ => {
                            return Err(invalid(&key, "expected fast, slow, signal"));
                        }
                    }
                };
                spec.add(IndicatorType::Macd { fast, slow, signal });
            }
            "bollinger" => {
                let (period, mult) = if enabled {
                    (DEFAULT_BOLLINGER_PERIOD, DEFAULT_BOLLINGER_MULT)
                } else {
                    parse_bollinger(&key, value)?
                };
                spec.add(IndicatorType::bollinger(period, mult));
            }
            _ => return Err(invalid(&key, "unknown indicator")),
        }
    }

    Ok(spec)
}

fn parse_periods(key: &str, value: &str) -> Result<Vec<usize>, TradesimError> {
    value
        .split(',')
        .map(|part| {
            let part = part.trim();
            match part.parse::<usize>() {
                Ok(p) if p > 0 => Ok(p),
                _ => Err(invalid(key, &format!("'{}' is not a positive integer period", part))),
            }
        })
        .collect()
}

fn single_period(key: &str, value: &str) -> Result<usize, TradesimError> {
    match parse_periods(key, value)?.as_slice() {
        [period] => Ok(*period),
        _ => Err(invalid(key, "expected a single period")),
    }
}

fn parse_bollinger(key: &str, value: &str) -> Result<(usize, f64), TradesimError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let period = single_period(key, parts[0])?;
    let mult = match parts.as_slice() {
        [_] => DEFAULT_BOLLINGER_MULT,
        [_, mult] => match mult.parse::<f64>() {
            Ok(m) if m.is_finite() && m >= 0.0 => m,
            _ => return Err(invalid(key, &format!("'{}' is not a valid multiplier", mult))),
        },
        _ => return Err(invalid(key, "expected period, multiplier")),
    };
    Ok((period, mult))
}

fn invalid(key: &str, reason: &str) -> TradesimError {
    TradesimError::DescriptorInvalid {
        key: format!("indicators.{}", key),
        reason: reason.to_string(),
    }
}
