// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Input and output boundary of the expander.
//!
//! `SeriesRequest` and `CombinationRequest` turn the textual primitives (expression,
//! variables, `var=point` assignments, order, combination mode) into validated requests;
//! `SeriesReport` renders the results as text, as a table or as rows for report files.
use crate::symbolic::parse_expr::parse_expression_func;
use crate::symbolic::series_errors::{ParseFailure, SeriesError, SeriesResult};
use crate::symbolic::series_expander::{
    CombineMode, ExpansionPoint, ExpansionResult, JointExpansion, MultivariableExpansion,
    SeriesExpander,
};
use crate::symbolic::symbolic_engine::Expr;
use itertools::Itertools;
use log::info;
use std::collections::HashSet;
use std::str::FromStr;
use tabled::{builder::Builder, settings::Style};

/// Parses `x=0; y=1.5` into expansion points. Each token is split on its first `=`;
/// empty tokens (a trailing `;`) are skipped.
pub fn parse_assignments(text: &str, field: &'static str) -> SeriesResult<Vec<ExpansionPoint>> {
    let mut points = Vec::new();
    for token in text.split(';').map(str::trim).filter(|t| !t.is_empty()) {
        let (name, value) = token.split_once('=').ok_or_else(|| {
            SeriesError::parsing(field, ParseFailure::MissingAssignment(token.to_string()))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SeriesError::parsing(
                field,
                ParseFailure::EmptyVariable(token.to_string()),
            ));
        }
        points.push(ExpansionPoint::new(name, parse_point(value, field)?));
    }
    Ok(points)
}

fn parse_point(token: &str, field: &'static str) -> SeriesResult<f64> {
    let token = token.trim();
    let point = f64::from_str(token).map_err(|source| {
        SeriesError::parsing(
            field,
            ParseFailure::InvalidPoint {
                token: token.to_string(),
                source,
            },
        )
    })?;
    if !point.is_finite() {
        return Err(SeriesError::parsing(
            field,
            ParseFailure::NonFinite(token.to_string()),
        ));
    }
    Ok(point)
}

fn parse_order(token: &str) -> SeriesResult<i64> {
    let token = token.trim();
    i64::from_str(token).map_err(|source| {
        SeriesError::parsing(
            "order",
            ParseFailure::InvalidOrder {
                token: token.to_string(),
                source,
            },
        )
    })
}

fn parse_variables(text: &str) -> SeriesResult<Vec<String>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut variables: Vec<String> = Vec::new();
    for name in text.split(',').map(str::trim) {
        if name.is_empty() {
            return Err(SeriesError::parsing(
                "variables",
                ParseFailure::EmptyVariable(text.to_string()),
            ));
        }
        if variables.iter().any(|v| v == name) {
            return Err(SeriesError::VariableMismatch(format!(
                "variable '{}' is declared twice",
                name
            )));
        }
        variables.push(name.to_string());
    }
    Ok(variables)
}

/// A validated request for a (multivariable) expansion of one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub expression: Expr,
    /// expansion points in the order the variables were declared
    pub points: Vec<ExpansionPoint>,
    pub order: i64,
}

impl SeriesRequest {
    /// # Arguments
    /// * `expression` - formula text, e.g. `exp(x)*sin(y)`
    /// * `variables` - comma-separated names, e.g. `x, y`
    /// * `points` - `;`-separated assignments, e.g. `x=0; y=1`
    /// * `order` - signed integer; range checks happen in the expander
    ///
    /// # Errors
    /// `InputParsing` naming the first field that failed to parse; `VariableMismatch` when
    /// the declared variables and the assignments do not correspond one to one.
    pub fn from_strings(
        expression: &str,
        variables: &str,
        points: &str,
        order: &str,
    ) -> SeriesResult<Self> {
        let expression = Expr::parse_expression(expression)?;
        let variables = parse_variables(variables)?;
        let assignments = parse_assignments(points, "points")?;
        let order = parse_order(order)?;

        let mut seen = HashSet::new();
        for p in &assignments {
            if !variables.contains(&p.symbol) {
                return Err(SeriesError::VariableMismatch(format!(
                    "point given for '{}', which is not among the variables {}",
                    p.symbol,
                    variables.join(", ")
                )));
            }
            if !seen.insert(p.symbol.clone()) {
                return Err(SeriesError::VariableMismatch(format!(
                    "'{}' has more than one expansion point",
                    p.symbol
                )));
            }
        }
        let mut ordered = Vec::with_capacity(variables.len());
        for variable in &variables {
            let point = assignments
                .iter()
                .find(|p| &p.symbol == variable)
                .ok_or_else(|| {
                    SeriesError::VariableMismatch(format!(
                        "no expansion point for variable '{}'",
                        variable
                    ))
                })?;
            ordered.push(point.clone());
        }
        Ok(Self {
            expression,
            points: ordered,
            order,
        })
    }

    pub fn variables(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.symbol.as_str()).collect()
    }

    /// sequential expansion variable after variable
    pub fn run(&self, expander: &SeriesExpander) -> SeriesResult<MultivariableExpansion> {
        info!(
            "series request: {} around ({})",
            self.expression,
            self.points.iter().join(", ")
        );
        expander.expand_multivariable(&self.expression, &self.points, self.order)
    }

    /// joint expansion with mixed partials
    pub fn run_joint(&self, expander: &SeriesExpander) -> SeriesResult<JointExpansion> {
        expander.expand_joint(&self.expression, &self.points, self.order)
    }
}

/// A validated request for a sum/product combination of independent expansions.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationRequest {
    pub functions: Vec<Expr>,
    pub points: Vec<f64>,
    pub order: i64,
    pub mode: CombineMode,
}

impl CombinationRequest {
    /// `functions` and `points` are `;`-separated, `mode` is one of `sum`, `product`,
    /// `sum_then_product`, `product_then_sum`. Unequal list lengths are left to the
    /// expander's length policy.
    pub fn from_strings(
        functions: &str,
        points: &str,
        order: &str,
        mode: &str,
    ) -> SeriesResult<Self> {
        let functions = functions
            .split(';')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| parse_expression_func(f).map_err(|cause| SeriesError::parsing("functions", cause)))
            .collect::<SeriesResult<Vec<Expr>>>()?;
        let points = points
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| parse_point(p, "points"))
            .collect::<SeriesResult<Vec<f64>>>()?;
        let order = parse_order(order)?;
        let mode = CombineMode::from_str(mode.trim()).map_err(|_| {
            SeriesError::parsing("mode", ParseFailure::UnknownMode(mode.trim().to_string()))
        })?;
        Ok(Self {
            functions,
            points,
            order,
            mode,
        })
    }

    pub fn run(&self, expander: &SeriesExpander) -> SeriesResult<ExpansionResult> {
        info!(
            "combination request: {} of {} functions",
            self.mode,
            self.functions.len()
        );
        let pairs = expander.pair_functions(self.functions.clone(), self.points.clone())?;
        expander.combine(self.mode, &pairs, self.order)
    }
}

/// Approximation and original function evaluated at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointComparison {
    pub at: Vec<ExpansionPoint>,
    pub approximation: f64,
    /// `None` for combinations, which have no single original function
    pub original: Option<f64>,
}

/// Everything the output boundary prints or saves about one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesReport {
    pub title: String,
    pub expression: Expr,
    pub lines: Vec<String>,
    /// one row per term: stage, n, point, derivative at point, term
    pub rows: Vec<Vec<String>>,
    pub comparison: Option<PointComparison>,
}

impl SeriesReport {
    pub const HEADERS: [&'static str; 5] = ["stage", "n", "point", "derivative", "term"];

    pub fn from_expansion(title: &str, result: &ExpansionResult) -> Self {
        let rows = result
            .trace()
            .iter()
            .map(|t| {
                vec![
                    t.symbol.clone(),
                    t.order.to_string(),
                    t.point.to_string(),
                    t.derivative_value.to_string(),
                    t.term.to_string(),
                ]
            })
            .collect();
        Self {
            title: title.to_string(),
            expression: result.expression().clone(),
            lines: result.trace_lines(),
            rows,
            comparison: None,
        }
    }

    pub fn from_multivariable(title: &str, result: &MultivariableExpansion) -> Self {
        Self {
            lines: result.trace_lines(),
            ..Self::from_expansion(title, result.result())
        }
    }

    pub fn from_joint(title: &str, result: &JointExpansion) -> Self {
        let point = result.points().iter().map(|p| p.point).join(", ");
        let stage = result.points().iter().map(|p| p.symbol.as_str()).join(", ");
        let rows = result
            .terms()
            .iter()
            .map(|t| {
                vec![
                    stage.clone(),
                    format!("({})", t.multi_index.iter().join(", ")),
                    format!("({})", point),
                    t.derivative_value.to_string(),
                    t.term.to_string(),
                ]
            })
            .collect();
        Self {
            title: title.to_string(),
            expression: result.expression().clone(),
            lines: result.trace_lines(),
            rows,
            comparison: None,
        }
    }

    /// Evaluates the approximation, and `original` when given, at `at`.
    ///
    /// # Errors
    /// `Evaluation` when a variable of either expression is not assigned in `at`.
    pub fn with_comparison(
        mut self,
        original: Option<&Expr>,
        at: Vec<ExpansionPoint>,
    ) -> SeriesResult<Self> {
        let names: Vec<&str> = at.iter().map(|p| p.symbol.as_str()).collect();
        let values: Vec<f64> = at.iter().map(|p| p.point).collect();
        let approximation = self.expression.eval_expression(&names, &values)?;
        let original = original
            .map(|f| f.eval_expression(&names, &values))
            .transpose()?;
        self.comparison = Some(PointComparison {
            at,
            approximation,
            original,
        });
        Ok(self)
    }

    pub fn table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(Self::HEADERS);
        for row in &self.rows {
            builder.push_record(row.clone());
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }

    /// Final expression, then the trace lines (or the table) when asked for.
    pub fn render(&self, show_trace: bool, as_table: bool) -> String {
        let mut out = vec![format!("{}: {}", self.title, self.expression)];
        if show_trace {
            if as_table {
                out.push(self.table());
            } else {
                out.extend(self.lines.iter().cloned());
            }
        }
        if let Some(cmp) = &self.comparison {
            let at = cmp.at.iter().join(", ");
            match cmp.original {
                Some(original) => out.push(format!(
                    "at {}: series = {}, function = {}, difference = {:e}",
                    at,
                    cmp.approximation,
                    original,
                    (cmp.approximation - original).abs()
                )),
                None => out.push(format!("at {}: series = {}", at, cmp.approximation)),
            }
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::series_expander::ExpanderSettings;
    use approx::assert_relative_eq;

    #[test]
    fn test_series_request_from_strings() {
        let request =
            SeriesRequest::from_strings("exp(x) * cos(y)", "x, y", "y = 1; x=0.5;", "3").unwrap();
        assert_eq!(request.variables(), vec!["x", "y"]);
        assert_eq!(request.points[0], ExpansionPoint::new("x", 0.5));
        assert_eq!(request.points[1], ExpansionPoint::new("y", 1.0));
        assert_eq!(request.order, 3);
    }

    #[test]
    fn test_point_split_on_first_equals() {
        let err = SeriesRequest::from_strings("x", "x", "x=1=2", "1").unwrap_err();
        match err {
            SeriesError::InputParsing { field, cause } => {
                assert_eq!(field, "points");
                assert!(matches!(cause, ParseFailure::InvalidPoint { ref token, .. } if token == "1=2"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parse_failures_name_the_field() {
        let cases = [
            (("sin(x", "x", "x=0", "2"), "expression"),
            (("x", "x,,y", "x=0", "2"), "variables"),
            (("x", "x", "x0", "2"), "points"),
            (("x", "x", "=0", "2"), "points"),
            (("x", "x", "x=abc", "2"), "points"),
            (("x", "x", "x=0", "two"), "order"),
            (("x", "x", "x=0", "2.5"), "order"),
        ];
        for ((expression, variables, points, order), expected) in cases {
            match SeriesRequest::from_strings(expression, variables, points, order) {
                Err(SeriesError::InputParsing { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected a parse failure of {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_parse_failure_keeps_its_source() {
        use std::error::Error;
        let err = SeriesRequest::from_strings("x", "x", "x=0", "many").unwrap_err();
        let cause = err.source().unwrap();
        assert!(cause.to_string().contains("many"));
        assert!(cause.source().is_some());
    }

    #[test]
    fn test_non_finite_points_are_rejected() {
        for points in ["x=NaN", "x=inf", "x=-inf", "x=1e400"] {
            match SeriesRequest::from_strings("sin(x)", "x", points, "2") {
                Err(SeriesError::InputParsing { field: "points", cause: ParseFailure::NonFinite(_) }) => {}
                other => panic!("{} should be rejected, got {:?}", points, other),
            }
        }
        let err = CombinationRequest::from_strings("sin(x)", "infinity", "2", "sum").unwrap_err();
        assert!(matches!(
            err,
            SeriesError::InputParsing { field: "points", cause: ParseFailure::NonFinite(_) }
        ));
        assert!(parse_assignments("x=0.1; y=nan", "at").is_err());
    }

    #[test]
    fn test_variable_mismatches() {
        for (variables, points) in [("x", "x=0; y=1"), ("x, y", "x=0"), ("x, x", "x=0"), ("x", "x=0; x=1")] {
            assert!(
                matches!(
                    SeriesRequest::from_strings("x + y", variables, points, "1"),
                    Err(SeriesError::VariableMismatch(_))
                ),
                "{} / {}",
                variables,
                points
            );
        }
    }

    #[test]
    fn test_request_runs_and_negative_order_is_rejected_by_expander() {
        let expander = SeriesExpander::default();
        let request = SeriesRequest::from_strings("sin(x)", "x", "x=0", "3").unwrap();
        let result = request.run(&expander).unwrap();
        assert_eq!(result.expression().to_string(), "x - 0.16666666666666666 * x^3");
        let request = SeriesRequest::from_strings("sin(x)", "x", "x=0", "-1").unwrap();
        assert!(matches!(
            request.run(&expander),
            Err(SeriesError::InvalidOrder { order: -1, .. })
        ));
    }

    #[test]
    fn test_combination_request() {
        let request =
            CombinationRequest::from_strings("sin(x); cos(y);", "0; 0", "2", "product").unwrap();
        assert_eq!(request.functions.len(), 2);
        assert_eq!(request.mode, CombineMode::Product);
        let result = request.run(&SeriesExpander::default()).unwrap();
        let value = result
            .expression()
            .eval_expression(&["x", "y"], &[0.2, 0.3])
            .unwrap();
        assert_relative_eq!(value, 0.2 * (1.0 - 0.045), epsilon = 1e-12);

        let err = CombinationRequest::from_strings("x", "0", "1", "average").unwrap_err();
        assert!(matches!(
            err,
            SeriesError::InputParsing { field: "mode", cause: ParseFailure::UnknownMode(_) }
        ));
        let err = CombinationRequest::from_strings("x; (y", "0; 0", "1", "sum").unwrap_err();
        assert!(matches!(err, SeriesError::InputParsing { field: "functions", .. }));
    }

    #[test]
    fn test_combination_length_policy() {
        let request = CombinationRequest::from_strings("x; y", "0", "1", "sum").unwrap();
        assert!(matches!(
            request.run(&SeriesExpander::default()),
            Err(SeriesError::LengthMismatch { functions: 2, points: 1 })
        ));
        let lenient = SeriesExpander::new(
            ExpanderSettings::default()
                .with_length_policy(crate::symbolic::series_expander::LengthPolicy::Truncate),
        );
        assert_eq!(request.run(&lenient).unwrap().expression(), &Expr::Var("x".to_string()));
    }

    #[test]
    fn test_report_rendering() {
        let expander = SeriesExpander::default();
        let request = SeriesRequest::from_strings("exp(x)", "x", "x=0", "2").unwrap();
        let result = request.run(&expander).unwrap();
        let report = SeriesReport::from_multivariable("exp(x)", &result)
            .with_comparison(Some(&request.expression), parse_assignments("x=0.1", "at").unwrap())
            .unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[2][1], "2");
        let cmp = report.comparison.as_ref().unwrap();
        assert_relative_eq!(cmp.approximation, 1.105, epsilon = 1e-12);
        assert_relative_eq!(cmp.original.unwrap(), 0.1f64.exp(), epsilon = 1e-12);
        let text = report.render(true, false);
        assert!(text.starts_with("exp(x): 1 + x + 0.5 * x^2"));
        assert!(text.contains("stage 1: x around 0"));
        let table = report.render(true, true);
        assert!(table.contains("derivative"));
        assert!(!report.render(false, false).contains("stage"));
    }

    #[test]
    fn test_comparison_needs_all_variables() {
        let result = SeriesExpander::default()
            .expand_one_variable(&Expr::parse_expression("x * y").unwrap(), "x", 0.0, 1)
            .unwrap();
        let report = SeriesReport::from_expansion("xy", &result);
        assert!(matches!(
            report.with_comparison(None, vec![ExpansionPoint::new("x", 1.0)]),
            Err(SeriesError::Evaluation(_))
        ));
    }

    #[test]
    fn test_joint_report_rows() {
        let request = SeriesRequest::from_strings("exp(x + y)", "x, y", "x=0; y=0", "1").unwrap();
        let joint = request.run_joint(&SeriesExpander::default()).unwrap();
        let report = SeriesReport::from_joint("joint", &joint);
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[1][1], "(0, 1)");
        assert_eq!(report.rows[1][0], "x, y");
    }
}
