//! Buy/sell predicates.
//!
//! A predicate is either a native callable or a textual condition. Both are
//! resolved through `Predicate::evaluate` with the same three inputs: the
//! indicator values defined at the bar, the full bar series, and the index.

use crate::domain::error::{EvalError, ParseError};
use crate::domain::expr::{self, Expr};
use crate::domain::expr_eval::evaluate_bool;
use crate::domain::ohlcv::Bar;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Indicator values defined at one bar, keyed like `IndicatorSeries`.
/// Lines still in warm-up are absent.
pub type IndicatorValues = HashMap<String, f64>;

pub type PredicateFn = dyn Fn(&IndicatorValues, &[Bar], usize) -> bool + Send + Sync;

#[derive(Clone)]
pub enum Predicate {
    Callable(Arc<PredicateFn>),
    Expression(ExpressionPredicate),
}

/// A textual condition, parsed once when the predicate is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionPredicate {
    source: String,
    parsed: Result<Expr, ParseError>,
}

impl ExpressionPredicate {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let parsed = expr::parse(&source);
        Self { source, parsed }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.parsed.as_ref().ok()
    }

    pub fn syntax_error(&self) -> Option<&ParseError> {
        self.parsed.as_ref().err()
    }

    fn evaluate(&self, values: &IndicatorValues, bar: &Bar, index: usize) -> Result<bool, EvalError> {
        let expr = self.parsed.as_ref().map_err(|e| EvalError::Syntax(e.clone()))?;
        evaluate_bool(expr, &expression_context(values, bar, index))
    }
}

impl Predicate {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&IndicatorValues, &[Bar], usize) -> bool + Send + Sync + 'static,
    {
        Predicate::Callable(Arc::new(f))
    }

    pub fn expression(source: impl Into<String>) -> Self {
        Predicate::Expression(ExpressionPredicate::new(source))
    }

    /// Resolve the predicate at `index`. Callables cannot fail.
    pub fn evaluate(
        &self,
        values: &IndicatorValues,
        bars: &[Bar],
        index: usize,
    ) -> Result<bool, EvalError> {
        match self {
            Predicate::Callable(f) => Ok(f(values, bars, index)),
            Predicate::Expression(e) => e.evaluate(values, &bars[index], index),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Callable(_) => f.write_str("Callable(<fn>)"),
            Predicate::Expression(e) => f.debug_tuple("Expression").field(&e.source).finish(),
        }
    }
}

/// Names visible to a textual condition: the defined indicator values plus
/// the current bar's `open`, `high`, `low`, `close` and the bar `index`.
pub fn expression_context(values: &IndicatorValues, bar: &Bar, index: usize) -> HashMap<String, f64> {
    let mut context = values.clone();
    context.insert("open".into(), bar.open);
    context.insert("high".into(), bar.high);
    context.insert("low".into(), bar.low);
    context.insert("close".into(), bar.close);
    context.insert("index".into(), index as f64);
    context
}
