// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Taylor Series Expander
//!
//! Truncated Taylor/Maclaurin polynomials of symbolic expressions, with a trace of every
//! generated term.
//!
//! ## Operations
//! - `expand_one_variable` - f(x) ≈ Σ f^(n)(a)/n! (x - a)^n, n = 0..=order
//! - `expand_multivariable` - the one-variable expansion applied variable after variable,
//!   each stage feeding its polynomial into the next (no mixed partial terms)
//! - `expand_joint` - true multivariate polynomial with mixed partials
//! - `sum_of_expansions` / `product_of_expansions` - independent functions, each expanded
//!   in its own variable, then added or multiplied
//! - `combined_sum_then_product` / `combined_product_then_sum` - the list split at len/2
//! - `expand_tree` - explicit sum/product tree of expansions
//!
//! ## Example
//! ```rust, ignore
//! use RustedTaylor::symbolic::series_expander::SeriesExpander;
//! use RustedTaylor::symbolic::symbolic_engine::Expr;
//! let f = Expr::parse_expression("sin(x)")?;
//! let result = SeriesExpander::default().expand_one_variable(&f, "x", 0.0, 3)?;
//! println!("{}", result); // x - 0.16666666666666666 * x^3
//! for line in result.trace_lines() {
//!     println!("{}", line);
//! }
//! ```
use crate::symbolic::series_errors::{SeriesError, SeriesResult};
use crate::symbolic::symbolic_engine::Expr;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use strum_macros::{Display, EnumString};

/// What the input boundary does when a combinator gets different numbers of
/// functions and expansion points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LengthPolicy {
    /// fail with `SeriesError::LengthMismatch`
    #[default]
    Reject,
    /// pair functions and points up to the shorter list
    Truncate,
}

/// How a list of (function, point) pairs is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CombineMode {
    #[default]
    Sum,
    Product,
    /// (sum of the first half) * (product of the second half)
    SumThenProduct,
    /// (sum of the first half) + (product of the second half)
    ProductThenSum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpanderSettings {
    /// highest accepted truncation order
    pub max_order: usize,
    /// simplify the accumulated series
    pub simplify: bool,
    /// multiply out powers of (x - a) and collect a polynomial in x
    pub expand: bool,
    pub length_policy: LengthPolicy,
    /// expansion variable of a combinator function that has no free variable
    pub default_variable: String,
}

impl Default for ExpanderSettings {
    fn default() -> Self {
        Self {
            max_order: 50,
            simplify: true,
            expand: false,
            length_policy: LengthPolicy::Reject,
            default_variable: "x".to_string(),
        }
    }
}

impl ExpanderSettings {
    pub fn with_max_order(mut self, max_order: usize) -> Self {
        self.max_order = max_order;
        self
    }

    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    pub fn with_expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    pub fn with_length_policy(mut self, length_policy: LengthPolicy) -> Self {
        self.length_policy = length_policy;
        self
    }

    pub fn with_default_variable(mut self, default_variable: &str) -> Self {
        self.default_variable = default_variable.to_string();
        self
    }
}

/// A variable and the value it is expanded around.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionPoint {
    pub symbol: String,
    pub point: f64,
}

impl ExpansionPoint {
    pub fn new(symbol: &str, point: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            point,
        }
    }
}

impl fmt::Display for ExpansionPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", self.symbol, self.point)
    }
}

/// One contribution to a series: `derivative_value / n! * (symbol - point)^n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub symbol: String,
    pub point: f64,
    /// derivative order n
    pub order: usize,
    /// n-th derivative evaluated at the point
    pub derivative_value: Expr,
    pub term: Expr,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: n = {}, d^{}f/d{}^{} at {} = {} -> {}",
            self.symbol,
            self.order,
            self.order,
            self.symbol,
            self.order,
            self.point,
            self.derivative_value,
            self.term
        )
    }
}

/// Truncated series plus the terms it was built from, in generation order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionResult {
    expression: Expr,
    trace: Vec<Term>,
}

impl ExpansionResult {
    fn new(expression: Expr, trace: Vec<Term>) -> Self {
        Self { expression, trace }
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn trace(&self) -> &[Term] {
        &self.trace
    }

    pub fn into_parts(self) -> (Expr, Vec<Term>) {
        (self.expression, self.trace)
    }

    pub fn trace_lines(&self) -> Vec<String> {
        self.trace.iter().map(|term| term.to_string()).collect()
    }
}

impl fmt::Display for ExpansionResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// Result of one variable during `expand_multivariable`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionStage {
    pub symbol: String,
    pub point: f64,
    pub result: ExpansionResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultivariableExpansion {
    result: ExpansionResult,
    stages: Vec<ExpansionStage>,
}

impl MultivariableExpansion {
    /// final series; its trace is every stage trace in input order
    pub fn result(&self) -> &ExpansionResult {
        &self.result
    }

    pub fn stages(&self) -> &[ExpansionStage] {
        &self.stages
    }

    pub fn expression(&self) -> &Expr {
        self.result.expression()
    }

    /// stage headers followed by their terms
    pub fn trace_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (i, stage) in self.stages.iter().enumerate() {
            lines.push(format!(
                "stage {}: {} around {} -> {}",
                i + 1,
                stage.symbol,
                stage.point,
                stage.result.expression()
            ));
            lines.extend(stage.result.trace_lines().into_iter().map(|l| format!("  {}", l)));
        }
        lines
    }
}

/// Term of a joint expansion, `∂^α f(a) / α! · Π (x_i − a_i)^{α_i}`.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTerm {
    /// α, one entry per expansion point
    pub multi_index: Vec<usize>,
    pub derivative_value: Expr,
    pub term: Expr,
}

impl fmt::Display for JointTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let alpha: Vec<String> = self.multi_index.iter().map(|a| a.to_string()).collect();
        write!(
            f,
            "alpha = ({}), derivative at point = {} -> {}",
            alpha.join(", "),
            self.derivative_value,
            self.term
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JointExpansion {
    expression: Expr,
    points: Vec<ExpansionPoint>,
    terms: Vec<JointTerm>,
}

impl JointExpansion {
    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn points(&self) -> &[ExpansionPoint] {
        &self.points
    }

    /// terms in lexicographic multi-index order
    pub fn terms(&self) -> &[JointTerm] {
        &self.terms
    }

    pub fn trace_lines(&self) -> Vec<String> {
        self.terms.iter().map(|term| term.to_string()).collect()
    }
}

impl fmt::Display for JointExpansion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// Explicit sum/product tree over expansions; each leaf is expanded in its implicit variable.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesNode {
    Leaf { expr: Expr, point: f64 },
    Sum(Vec<SeriesNode>),
    Product(Vec<SeriesNode>),
}

impl SeriesNode {
    pub fn leaf(expr: Expr, point: f64) -> Self {
        SeriesNode::Leaf { expr, point }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeriesExpander {
    settings: ExpanderSettings,
}

impl SeriesExpander {
    pub fn new(settings: ExpanderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExpanderSettings {
        &self.settings
    }

    /// Accepts `0 <= order <= max_order`.
    pub fn check_order(&self, order: i64) -> SeriesResult<usize> {
        let max = self.settings.max_order;
        match usize::try_from(order) {
            Ok(valid) if valid <= max => Ok(valid),
            _ => Err(SeriesError::InvalidOrder { order, max }),
        }
    }

    /// Truncated Taylor series of `f` in `symbol` around `point`.
    ///
    /// The running derivative is differentiated once per order and collected into
    /// monomials, then evaluated at the point; the factorial is kept as a running product.
    /// If `symbol` does not occur in `f` the result is `f` itself.
    ///
    /// # Errors
    /// `InvalidOrder` for a negative order or one above `max_order`, `Differentiation`
    /// when `f` contains an unknown function of `symbol`.
    pub fn expand_one_variable(
        &self,
        f: &Expr,
        symbol: &str,
        point: f64,
        order: i64,
    ) -> SeriesResult<ExpansionResult> {
        let order = self.check_order(order)?;
        info!(
            "expanding {} in {} around {} up to order {}",
            f, symbol, point, order
        );
        let shift = Expr::Sub(
            Box::new(Expr::Var(symbol.to_string())),
            Box::new(Expr::Const(point)),
        );
        let mut derivative = f.clone();
        let mut factorial = 1.0_f64;
        let mut accumulated: Option<Expr> = None;
        let mut trace = Vec::with_capacity(order + 1);
        for n in 0..=order {
            if n > 0 {
                derivative = derivative.collected_derivative(symbol)?;
                factorial *= n as f64;
            }
            let value = derivative.set_variable(symbol, point).simplify();
            warn_if_not_finite(&value, symbol, point, n);
            let coefficient =
                Expr::Div(Box::new(value.clone()), Box::new(Expr::Const(factorial))).simplify();
            let term = Expr::Mul(
                Box::new(coefficient),
                Box::new(Expr::Pow(
                    Box::new(shift.clone()),
                    Box::new(Expr::Const(n as f64)),
                )),
            )
            .simplify();
            debug!("{}: n = {}, value = {}, term = {}", symbol, n, value, term);
            accumulated = Some(match accumulated {
                None => term.clone(),
                Some(acc) => Expr::Add(Box::new(acc), Box::new(term.clone())),
            });
            trace.push(Term {
                symbol: symbol.to_string(),
                point,
                order: n,
                derivative_value: value,
                term,
            });
        }
        let expression = self.finish(accumulated.unwrap_or(Expr::Const(0.0)));
        Ok(ExpansionResult::new(expression, trace))
    }

    /// Sequential expansion: each pair is expanded in turn, the truncated series of one
    /// stage being the function of the next. Mixed partial terms of a true multivariate
    /// expansion are not produced; see `expand_joint`.
    pub fn expand_multivariable(
        &self,
        f: &Expr,
        expansions: &[ExpansionPoint],
        order: i64,
    ) -> SeriesResult<MultivariableExpansion> {
        self.check_order(order)?;
        check_distinct(expansions)?;
        let mut current = f.clone();
        let mut trace = Vec::new();
        let mut stages = Vec::with_capacity(expansions.len());
        if expansions.is_empty() {
            current = self.finish(current);
        }
        for expansion in expansions {
            let result =
                self.expand_one_variable(&current, &expansion.symbol, expansion.point, order)?;
            current = result.expression().clone();
            trace.extend(result.trace().iter().cloned());
            stages.push(ExpansionStage {
                symbol: expansion.symbol.clone(),
                point: expansion.point,
                result,
            });
        }
        info!("multivariable expansion finished after {} stages", stages.len());
        Ok(MultivariableExpansion {
            result: ExpansionResult::new(current, trace),
            stages,
        })
    }

    /// Multivariate Taylor polynomial with mixed partials:
    /// `Σ_{|α| <= order} ∂^α f(a) / α! · Π (x_i − a_i)^{α_i}`.
    ///
    /// Derivatives are computed along the multi-index tree, every child being one
    /// differentiation of its parent, and terms come out in lexicographic order of α.
    pub fn expand_joint(
        &self,
        f: &Expr,
        expansions: &[ExpansionPoint],
        order: i64,
    ) -> SeriesResult<JointExpansion> {
        let order = self.check_order(order)?;
        check_distinct(expansions)?;
        info!(
            "joint expansion of {} around ({}) up to total order {}",
            f,
            expansions
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            order
        );
        let mut terms = Vec::new();
        let mut alpha = Vec::with_capacity(expansions.len());
        self.joint_terms(f.clone(), 0, order, &mut alpha, expansions, &mut terms)?;
        let accumulated = terms
            .iter()
            .map(|t| t.term.clone())
            .reduce(|acc, t| Expr::Add(Box::new(acc), Box::new(t)))
            .unwrap_or(Expr::Const(0.0));
        Ok(JointExpansion {
            expression: self.finish(accumulated),
            points: expansions.to_vec(),
            terms,
        })
    }

    fn joint_terms(
        &self,
        derivative: Expr,
        position: usize,
        budget: usize,
        alpha: &mut Vec<usize>,
        points: &[ExpansionPoint],
        terms: &mut Vec<JointTerm>,
    ) -> SeriesResult<()> {
        if position == points.len() {
            let at: HashMap<String, f64> =
                points.iter().map(|p| (p.symbol.clone(), p.point)).collect();
            let value = derivative.set_variable_from_map(&at).simplify();
            let denominator: f64 = alpha.iter().map(|&a| factorial(a)).product();
            let mut term =
                Expr::Div(Box::new(value.clone()), Box::new(Expr::Const(denominator)));
            for (p, &a) in points.iter().zip(alpha.iter()) {
                let shift = Expr::Sub(
                    Box::new(Expr::Var(p.symbol.clone())),
                    Box::new(Expr::Const(p.point)),
                );
                term = Expr::Mul(
                    Box::new(term),
                    Box::new(Expr::Pow(Box::new(shift), Box::new(Expr::Const(a as f64)))),
                );
            }
            let term = term.simplify();
            debug!("alpha = {:?}, value = {}, term = {}", alpha, value, term);
            terms.push(JointTerm {
                multi_index: alpha.clone(),
                derivative_value: value,
                term,
            });
            return Ok(());
        }
        let symbol = &points[position].symbol;
        let mut current = derivative;
        for a in 0..=budget {
            if a > 0 {
                current = current.collected_derivative(symbol)?;
            }
            alpha.push(a);
            self.joint_terms(current.clone(), position + 1, budget - a, alpha, points, terms)?;
            alpha.pop();
        }
        Ok(())
    }

    /// Expands every function in its implicit variable and adds the series.
    /// An empty list gives 0.
    pub fn sum_of_expansions(
        &self,
        pairs: &[(Expr, f64)],
        order: i64,
    ) -> SeriesResult<ExpansionResult> {
        self.fold_expansions(pairs, order, 0.0, Expr::Add)
    }

    /// Expands every function in its implicit variable and multiplies the series.
    /// An empty list gives 1.
    pub fn product_of_expansions(
        &self,
        pairs: &[(Expr, f64)],
        order: i64,
    ) -> SeriesResult<ExpansionResult> {
        self.fold_expansions(pairs, order, 1.0, Expr::Mul)
    }

    /// (sum of the first `len / 2` expansions) * (product of the rest). An empty list gives 1.
    pub fn combined_sum_then_product(
        &self,
        pairs: &[(Expr, f64)],
        order: i64,
    ) -> SeriesResult<ExpansionResult> {
        self.combine_halves(pairs, order, 1.0, Expr::Mul)
    }

    /// (sum of the first `len / 2` expansions) + (product of the rest). An empty list gives 0.
    pub fn combined_product_then_sum(
        &self,
        pairs: &[(Expr, f64)],
        order: i64,
    ) -> SeriesResult<ExpansionResult> {
        self.combine_halves(pairs, order, 0.0, Expr::Add)
    }

    /// dispatches on `mode`
    pub fn combine(
        &self,
        mode: CombineMode,
        pairs: &[(Expr, f64)],
        order: i64,
    ) -> SeriesResult<ExpansionResult> {
        match mode {
            CombineMode::Sum => self.sum_of_expansions(pairs, order),
            CombineMode::Product => self.product_of_expansions(pairs, order),
            CombineMode::SumThenProduct => self.combined_sum_then_product(pairs, order),
            CombineMode::ProductThenSum => self.combined_product_then_sum(pairs, order),
        }
    }

    /// Expands an explicit sum/product tree; traces are concatenated depth-first.
    pub fn expand_tree(&self, node: &SeriesNode, order: i64) -> SeriesResult<ExpansionResult> {
        self.check_order(order)?;
        let (expression, trace) = self.expand_node(node, order)?;
        Ok(ExpansionResult::new(self.finish(expression), trace))
    }

    fn expand_node(&self, node: &SeriesNode, order: i64) -> SeriesResult<(Expr, Vec<Term>)> {
        match node {
            SeriesNode::Leaf { expr, point } => {
                let symbol = self.implicit_variable(expr)?;
                Ok(self
                    .expand_one_variable(expr, &symbol, *point, order)?
                    .into_parts())
            }
            SeriesNode::Sum(children) => self.fold_nodes(children, order, 0.0, Expr::Add),
            SeriesNode::Product(children) => self.fold_nodes(children, order, 1.0, Expr::Mul),
        }
    }

    fn fold_nodes(
        &self,
        children: &[SeriesNode],
        order: i64,
        identity: f64,
        op: fn(Box<Expr>, Box<Expr>) -> Expr,
    ) -> SeriesResult<(Expr, Vec<Term>)> {
        let mut acc = Expr::Const(identity);
        let mut trace = Vec::new();
        for child in children {
            let (expression, child_trace) = self.expand_node(child, order)?;
            acc = op(Box::new(acc), Box::new(expression));
            trace.extend(child_trace);
        }
        Ok((acc, trace))
    }

    /// Pairs functions with points according to `length_policy`.
    pub fn pair_functions(
        &self,
        functions: Vec<Expr>,
        points: Vec<f64>,
    ) -> SeriesResult<Vec<(Expr, f64)>> {
        if functions.len() != points.len() {
            match self.settings.length_policy {
                LengthPolicy::Reject => {
                    return Err(SeriesError::LengthMismatch {
                        functions: functions.len(),
                        points: points.len(),
                    });
                }
                LengthPolicy::Truncate => warn!(
                    "{} functions but {} points, extra entries are dropped",
                    functions.len(),
                    points.len()
                ),
            }
        }
        Ok(functions.into_iter().zip(points).collect())
    }

    /// The variable a combinator expands `f` in: its only free variable, the default
    /// variable for a constant, or the default variable if it occurs among several.
    pub fn implicit_variable(&self, f: &Expr) -> SeriesResult<String> {
        let default = &self.settings.default_variable;
        let mut vars = f.all_arguments_are_variables();
        match vars.len() {
            0 => Ok(default.clone()),
            1 => Ok(vars.remove(0)),
            _ if vars.contains(default) => Ok(default.clone()),
            _ => Err(SeriesError::VariableMismatch(format!(
                "{} has free variables {} and none of them is '{}'",
                f,
                vars.join(", "),
                default
            ))),
        }
    }

    fn fold_expansions(
        &self,
        pairs: &[(Expr, f64)],
        order: i64,
        identity: f64,
        op: fn(Box<Expr>, Box<Expr>) -> Expr,
    ) -> SeriesResult<ExpansionResult> {
        self.check_order(order)?;
        let mut acc = Expr::Const(identity);
        let mut trace = Vec::new();
        for (f, point) in pairs {
            let symbol = self.implicit_variable(f)?;
            let (expression, terms) = self
                .expand_one_variable(f, &symbol, *point, order)?
                .into_parts();
            acc = op(Box::new(acc), Box::new(expression));
            trace.extend(terms);
        }
        Ok(ExpansionResult::new(self.finish(acc), trace))
    }

    fn combine_halves(
        &self,
        pairs: &[(Expr, f64)],
        order: i64,
        identity: f64,
        join: fn(Box<Expr>, Box<Expr>) -> Expr,
    ) -> SeriesResult<ExpansionResult> {
        self.check_order(order)?;
        if pairs.is_empty() {
            return Ok(ExpansionResult::new(Expr::Const(identity), Vec::new()));
        }
        let (first, second) = pairs.split_at(pairs.len() / 2);
        debug!("summing {} expansions, multiplying {}", first.len(), second.len());
        let (sum, mut trace) = self.sum_of_expansions(first, order)?.into_parts();
        let (product, product_trace) = self.product_of_expansions(second, order)?.into_parts();
        trace.extend(product_trace);
        let expression = self.finish(join(Box::new(sum), Box::new(product)));
        Ok(ExpansionResult::new(expression, trace))
    }

    fn finish(&self, expression: Expr) -> Expr {
        if self.settings.expand {
            expression.expand().simplify()
        } else if self.settings.simplify {
            expression.simplify()
        } else {
            expression
        }
    }
}

fn check_distinct(expansions: &[ExpansionPoint]) -> SeriesResult<()> {
    let mut seen = HashSet::new();
    for p in expansions {
        if !seen.insert(p.symbol.as_str()) {
            return Err(SeriesError::VariableMismatch(format!(
                "variable '{}' has more than one expansion point",
                p.symbol
            )));
        }
    }
    Ok(())
}

fn warn_if_not_finite(value: &Expr, symbol: &str, point: f64, n: usize) {
    if !value.all_arguments_are_variables().is_empty() {
        return;
    }
    if let Ok(v) = value.eval_expression(&[], &[]) {
        if !v.is_finite() {
            warn!(
                "derivative of order {} in {} is not finite at {} = {}",
                n, symbol, symbol, point
            );
        }
    }
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(input: &str) -> Expr {
        Expr::parse_expression(input).unwrap()
    }

    fn eval_x(expr: &Expr, x: f64) -> f64 {
        expr.eval_expression(&["x"], &[x]).unwrap()
    }

    #[test]
    fn test_sin_around_zero() {
        let expander = SeriesExpander::default();
        let result = expander
            .expand_one_variable(&parse("sin(x)"), "x", 0.0, 3)
            .unwrap();
        assert_eq!(result.to_string(), "x - 0.16666666666666666 * x^3");
        let orders: Vec<usize> = result.trace().iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
        assert!(result.trace()[0].term.is_zero());
        assert!(result.trace()[2].term.is_zero());
        assert_eq!(result.trace()[3].derivative_value, Expr::Const(-1.0));
        for x in [-0.5, 0.1, 0.7] {
            assert_relative_eq!(eval_x(result.expression(), x), x - x.powi(3) / 6.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_exp_around_zero() {
        let result = SeriesExpander::default()
            .expand_one_variable(&parse("exp(x)"), "x", 0.0, 2)
            .unwrap();
        assert_eq!(result.to_string(), "1 + x + 0.5 * x^2");
    }

    #[test]
    fn test_expansion_around_nonzero_point() {
        // ln(x) around 1: (x - 1) - (x - 1)^2 / 2 + (x - 1)^3 / 3
        let result = SeriesExpander::default()
            .expand_one_variable(&parse("ln(x)"), "x", 1.0, 3)
            .unwrap();
        for x in [0.9, 1.2, 1.5] {
            let t: f64 = x - 1.0;
            let expected = t - t * t / 2.0 + t.powi(3) / 3.0;
            assert_relative_eq!(eval_x(result.expression(), x), expected, epsilon = 1e-12);
        }
        assert!(result.to_string().contains("x - 1"));
    }

    #[test]
    fn test_rational_function_at_high_order() {
        // 1/(1 + x^2) = 1 - x^2 + x^4 - ..., f^(2k)(0) = (-1)^k (2k)!
        let result = SeriesExpander::default()
            .expand_one_variable(&parse("1 / (1 + x^2)"), "x", 0.0, 16)
            .unwrap();
        for term in result.trace() {
            let value = term.derivative_value.as_const().unwrap();
            let n = term.order;
            let expected = if n % 2 == 1 {
                0.0
            } else if (n / 2) % 2 == 0 {
                factorial(n)
            } else {
                -factorial(n)
            };
            assert_relative_eq!(value, expected, max_relative = 1e-9);
        }
        let x: f64 = 0.3;
        let expected: f64 = (0..=8).map(|k| (-x * x).powi(k)).sum();
        assert_relative_eq!(eval_x(result.expression(), x), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_tangent_at_high_order() {
        // odd derivatives of tan at 0 are the tangent numbers
        let tangent_numbers = [1.0, 2.0, 16.0, 272.0, 7936.0, 353792.0, 22368256.0, 1903757312.0];
        let result = SeriesExpander::default()
            .expand_one_variable(&parse("tan(x)"), "x", 0.0, 15)
            .unwrap();
        for term in result.trace() {
            let value = term.derivative_value.as_const().unwrap();
            let expected = if term.order % 2 == 1 {
                tangent_numbers[term.order / 2]
            } else {
                0.0
            };
            assert_relative_eq!(value, expected, max_relative = 1e-9, epsilon = 1e-9);
        }
        assert_relative_eq!(eval_x(result.expression(), 0.2), 0.2f64.tan(), epsilon = 1e-12);
    }

    #[test]
    fn test_order_zero_is_value_at_point() {
        let f = parse("exp(x) * cos(x) + 3");
        let result = SeriesExpander::default()
            .expand_one_variable(&f, "x", 0.5, 0)
            .unwrap();
        assert_eq!(result.trace().len(), 1);
        assert_eq!(result.trace()[0].order, 0);
        let expected = 0.5f64.exp() * 0.5f64.cos() + 3.0;
        match result.expression() {
            Expr::Const(value) => assert_relative_eq!(*value, expected, epsilon = 1e-12),
            other => panic!("expected a constant, got {}", other),
        }
    }

    #[test]
    fn test_symbol_not_in_function() {
        let f = parse("y^2 + sin(y)");
        let expander = SeriesExpander::default();
        for order in 0..4 {
            let result = expander.expand_one_variable(&f, "x", 2.0, order).unwrap();
            assert_eq!(result.expression(), &f.simplify());
            assert_eq!(result.trace().len(), order as usize + 1);
        }
    }

    #[test]
    fn test_invalid_orders() {
        let expander = SeriesExpander::new(ExpanderSettings::default().with_max_order(5));
        let f = parse("sin(x)");
        assert_eq!(
            expander.expand_one_variable(&f, "x", 0.0, -1),
            Err(SeriesError::InvalidOrder { order: -1, max: 5 })
        );
        assert_eq!(
            expander.expand_one_variable(&f, "x", 0.0, 6),
            Err(SeriesError::InvalidOrder { order: 6, max: 5 })
        );
        assert!(expander.sum_of_expansions(&[], -2).is_err());
        assert!(expander.expand_multivariable(&f, &[], -2).is_err());
    }

    #[test]
    fn test_unknown_function_cannot_be_expanded() {
        let result = SeriesExpander::default().expand_one_variable(&parse("f(x) + x"), "x", 0.0, 2);
        assert!(matches!(result, Err(SeriesError::Differentiation(_))));
        // the same function is a constant with respect to another variable
        let result = SeriesExpander::default()
            .expand_one_variable(&parse("f(y) * x"), "x", 0.0, 2)
            .unwrap();
        assert_eq!(result.expression(), &parse("f(y) * x"));
    }

    #[test]
    fn test_simplification_is_idempotent() {
        let result = SeriesExpander::default()
            .expand_one_variable(&parse("exp(x) * sin(x)"), "x", 1.0, 4)
            .unwrap();
        assert_eq!(&result.expression().simplify(), result.expression());
    }

    #[test]
    fn test_expand_setting_collects_polynomial() {
        let expander = SeriesExpander::new(ExpanderSettings::default().with_expand(true));
        let result = expander
            .expand_one_variable(&parse("x^3"), "x", 1.0, 3)
            .unwrap();
        // the Taylor polynomial of a cubic of order 3 is the cubic itself
        assert_eq!(result.expression(), &parse("x^3"));
    }

    #[test]
    fn test_without_simplification() {
        let expander = SeriesExpander::new(ExpanderSettings::default().with_simplify(false));
        let result = expander
            .expand_one_variable(&parse("exp(x)"), "x", 0.0, 2)
            .unwrap();
        assert!(matches!(result.expression(), Expr::Add(_, _)));
        assert_relative_eq!(eval_x(result.expression(), 0.5), 1.625, epsilon = 1e-12);
    }

    #[test]
    fn test_multivariable_stages() {
        let f = parse("exp(x) * cos(y)");
        let expansions = [ExpansionPoint::new("x", 0.0), ExpansionPoint::new("y", 0.0)];
        let result = SeriesExpander::default()
            .expand_multivariable(&f, &expansions, 2)
            .unwrap();
        assert_eq!(result.stages().len(), 2);
        assert_eq!(result.stages()[0].symbol, "x");
        assert_eq!(result.result().trace().len(), 6);
        let trace_symbols: Vec<&str> = result
            .result()
            .trace()
            .iter()
            .map(|t| t.symbol.as_str())
            .collect();
        assert_eq!(trace_symbols, vec!["x", "x", "x", "y", "y", "y"]);
        // (1 + x + x^2/2) * (1 - y^2/2)
        let (x, y) = (0.3, -0.2);
        let value = result
            .expression()
            .eval_expression(&["x", "y"], &[x, y])
            .unwrap();
        assert_relative_eq!(value, (1.0 + x + x * x / 2.0) * (1.0 - y * y / 2.0), epsilon = 1e-12);
        assert_eq!(result.trace_lines().len(), 2 + 6);
    }

    #[test]
    fn test_multivariable_empty_and_duplicate() {
        let f = parse("x + 0");
        let expander = SeriesExpander::default();
        let result = expander.expand_multivariable(&f, &[], 3).unwrap();
        assert_eq!(result.expression(), &parse("x"));
        assert!(result.stages().is_empty());
        let duplicate = [ExpansionPoint::new("x", 0.0), ExpansionPoint::new("x", 1.0)];
        assert!(matches!(
            expander.expand_multivariable(&f, &duplicate, 1),
            Err(SeriesError::VariableMismatch(_))
        ));
    }

    #[test]
    fn test_joint_expansion_of_exp_sum() {
        let f = parse("exp(x + y)");
        let expansions = [ExpansionPoint::new("x", 0.0), ExpansionPoint::new("y", 0.0)];
        let joint = SeriesExpander::default()
            .expand_joint(&f, &expansions, 2)
            .unwrap();
        let indices: Vec<Vec<usize>> = joint.terms().iter().map(|t| t.multi_index.clone()).collect();
        assert_eq!(
            indices,
            vec![vec![0, 0], vec![0, 1], vec![0, 2], vec![1, 0], vec![1, 1], vec![2, 0]]
        );
        for (x, y) in [(0.1, 0.2), (-0.3, 0.5), (1.0, 1.0)] {
            let value = joint.expression().eval_expression(&["x", "y"], &[x, y]).unwrap();
            let s: f64 = x + y;
            assert_relative_eq!(value, 1.0 + s + s * s / 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sequential_matches_joint_near_point_for_separable_function() {
        let f = parse("exp(x) * cos(y)");
        let expansions = [ExpansionPoint::new("x", 0.0), ExpansionPoint::new("y", 0.0)];
        let expander = SeriesExpander::default();
        let sequential = expander.expand_multivariable(&f, &expansions, 4).unwrap();
        let joint = expander.expand_joint(&f, &expansions, 4).unwrap();
        let at = [0.05, -0.05];
        let a = sequential.expression().eval_expression(&["x", "y"], &at).unwrap();
        let b = joint.expression().eval_expression(&["x", "y"], &at).unwrap();
        assert_relative_eq!(a, b, epsilon = 1e-6);
    }

    #[test]
    fn test_sum_of_expansions_matches_individual_expansions() {
        let expander = SeriesExpander::default();
        let sin = parse("sin(x)");
        let cos = parse("cos(x)");
        let combined = expander
            .sum_of_expansions(&[(sin.clone(), 0.0), (cos.clone(), 0.0)], 2)
            .unwrap();
        let a = expander.expand_one_variable(&sin, "x", 0.0, 2).unwrap();
        let b = expander.expand_one_variable(&cos, "x", 0.0, 2).unwrap();
        let expected_trace: Vec<Term> = a.trace().iter().chain(b.trace()).cloned().collect();
        assert_eq!(combined.trace(), expected_trace.as_slice());
        let expected = Expr::Add(a.expression().clone().boxed(), b.expression().clone().boxed()).simplify();
        assert_eq!(combined.expression(), &expected);
    }

    #[test]
    fn test_product_of_one_pair_equals_single_expansion() {
        let expander = SeriesExpander::default();
        let f = parse("exp(x)");
        let product = expander.product_of_expansions(&[(f.clone(), 1.0)], 3).unwrap();
        let single = expander.expand_one_variable(&f, "x", 1.0, 3).unwrap();
        assert_eq!(product, single);
    }

    #[test]
    fn test_empty_combinations_are_identities() {
        let expander = SeriesExpander::default();
        assert_eq!(expander.sum_of_expansions(&[], 2).unwrap().expression(), &Expr::Const(0.0));
        assert_eq!(expander.product_of_expansions(&[], 2).unwrap().expression(), &Expr::Const(1.0));
        assert_eq!(
            expander.combined_sum_then_product(&[], 2).unwrap().expression(),
            &Expr::Const(1.0)
        );
        assert_eq!(
            expander.combined_product_then_sum(&[], 2).unwrap().expression(),
            &Expr::Const(0.0)
        );
    }

    #[test]
    fn test_combined_modes_split_at_half() {
        let expander = SeriesExpander::default();
        let pairs = vec![
            (parse("x"), 0.0),
            (parse("y^2"), 0.0),
            (parse("exp(z)"), 0.0),
            (parse("1 + w"), 0.0),
        ];
        let at = [0.3, 0.2, 0.1, 0.4];
        let names = ["x", "y", "z", "w"];
        let (x, y, z, w) = (at[0], at[1], at[2], at[3]);
        let exp_z = 1.0 + z + z * z / 2.0;
        let sp = expander.combined_sum_then_product(&pairs, 2).unwrap();
        let value = sp.expression().eval_expression(&names, &at).unwrap();
        assert_relative_eq!(value, (x + y * y) * (exp_z * (1.0 + w)), epsilon = 1e-12);
        let ps = expander.combined_product_then_sum(&pairs, 2).unwrap();
        let value = ps.expression().eval_expression(&names, &at).unwrap();
        assert_relative_eq!(value, (x + y * y) + exp_z * (1.0 + w), epsilon = 1e-12);
        assert_eq!(sp.trace().len(), 12);
        let by_mode = expander
            .combine(CombineMode::ProductThenSum, &pairs, 2)
            .unwrap();
        assert_eq!(by_mode, ps);
    }

    #[test]
    fn test_implicit_variable() {
        let expander = SeriesExpander::default();
        assert_eq!(expander.implicit_variable(&parse("sin(t)")).unwrap(), "t");
        assert_eq!(expander.implicit_variable(&parse("5")).unwrap(), "x");
        assert_eq!(expander.implicit_variable(&parse("x * y")).unwrap(), "x");
        assert!(matches!(
            expander.implicit_variable(&parse("u * v")),
            Err(SeriesError::VariableMismatch(_))
        ));
    }

    #[test]
    fn test_length_policy() {
        let functions = vec![parse("x"), parse("y"), parse("z")];
        let points = vec![0.0, 1.0];
        let strict = SeriesExpander::default();
        assert_eq!(
            strict.pair_functions(functions.clone(), points.clone()),
            Err(SeriesError::LengthMismatch { functions: 3, points: 2 })
        );
        let lenient = SeriesExpander::new(
            ExpanderSettings::default().with_length_policy(LengthPolicy::Truncate),
        );
        let pairs = lenient.pair_functions(functions, points).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], (parse("y"), 1.0));
    }

    #[test]
    fn test_expand_tree() {
        // sin(x) + exp(y) * cos(z)
        let tree = SeriesNode::Sum(vec![
            SeriesNode::leaf(parse("sin(x)"), 0.0),
            SeriesNode::Product(vec![
                SeriesNode::leaf(parse("exp(y)"), 0.0),
                SeriesNode::leaf(parse("cos(z)"), 0.0),
            ]),
        ]);
        let result = SeriesExpander::default().expand_tree(&tree, 3).unwrap();
        assert_eq!(result.trace().len(), 12);
        let (x, y, z): (f64, f64, f64) = (0.2, 0.1, 0.3);
        let expected =
            (x - x.powi(3) / 6.0) + (1.0 + y + y * y / 2.0 + y.powi(3) / 6.0) * (1.0 - z * z / 2.0);
        let value = result
            .expression()
            .eval_expression(&["x", "y", "z"], &[x, y, z])
            .unwrap();
        assert_relative_eq!(value, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_modes_parse_from_strings() {
        use std::str::FromStr;
        assert_eq!(CombineMode::from_str("sum_then_product").unwrap(), CombineMode::SumThenProduct);
        assert_eq!(CombineMode::from_str("Product").unwrap(), CombineMode::Product);
        assert_eq!(LengthPolicy::from_str("truncate").unwrap(), LengthPolicy::Truncate);
        assert_eq!(CombineMode::ProductThenSum.to_string(), "product_then_sum");
        assert!(CombineMode::from_str("division").is_err());
    }
}
