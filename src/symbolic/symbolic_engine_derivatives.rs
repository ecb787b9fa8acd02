// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Symbolic Engine Derivatives Module
//!
//! Extends the symbolic engine with differentiation, numeric evaluation and parsing
//! entry points.
//!
//! ## Key Methods
//!
//! ### Differentiation
//! - `diff(var: &str)` - Analytical partial/total derivative, fails on unknown functions
//!   that depend on `var`
//! - `collected_derivative(var: &str)` - One differentiation step kept as a sum of
//!   monomials, used for higher-order derivatives
//!
//! ### Function evaluation
//! - `eval_expression()` - Direct evaluation against named values
//!
//! ### Parsing and Utilities
//! - `parse_expression()` - String to symbolic expression
//! - `all_arguments_are_variables()` - Extract variable names
//!
//! ## Interesting Code Features
//!
//! 1. **Recursive Differentiation Rules**: product rule, quotient rule and chain rule for
//!    all supported functions; `Pow` distinguishes constant exponent, constant base and
//!    the general `f^g` case. Denominators are written as negative powers, so that
//!    repeated derivatives of `1/g` carry `g^-k` rather than `g^(2^k)`
//! 2. **Fallible backend**: both differentiation and evaluation return `SeriesResult`,
//!    so an `Apply` node surfaces as an error instead of a panic

use crate::symbolic::parse_expr::parse_expression_func;
use crate::symbolic::series_errors::{SeriesError, SeriesResult};
use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::PI;

impl Expr {
    /// DIFFERENTIATION

    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// Implements the standard differentiation rules:
    /// - Power rule: d/dx(x^n) = n*x^(n-1)
    /// - Exponential rule: d/dx(a^g) = a^g * ln(a) * g'
    /// - General power: d/dx(f^g) = f^g * (g' * ln(f) + g * f' / f)
    /// - Product rule: d/dx(f*g) = f'*g + f*g'
    /// - Quotient rule: d/dx(f/g) = f' * g^(-1) - f * g' * g^(-2)
    /// - Chain rule: d/dx(f(g(x))) = f'(g(x))*g'(x)
    ///
    /// # Errors
    /// `SeriesError::Differentiation` when an unknown function (`Apply`) depends on `var`.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x")?; // 2*x^1*1
    /// ```
    pub fn diff(&self, var: &str) -> SeriesResult<Expr> {
        let derivative = match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)?), Box::new(rhs.diff(var)?)),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)?), Box::new(rhs.diff(var)?)),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)?), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)?))),
            ),
            Expr::Div(lhs, rhs) if !rhs.contains_variable(var) => {
                Expr::Div(Box::new(lhs.diff(var)?), rhs.clone())
            }
            // f/g = f * g^(-1): the power of g grows by one per derivative instead of doubling
            Expr::Div(lhs, rhs) => Expr::Mul(lhs.clone(), Box::new(power(rhs, -1.0))).diff(var)?,
            Expr::Pow(base, exp) if !exp.contains_variable(var) => Expr::Mul(
                Box::new(Expr::Mul(
                    exp.clone(),
                    Box::new(Expr::Pow(
                        base.clone(),
                        Box::new(Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0)))),
                    )),
                )),
                Box::new(base.diff(var)?),
            ),
            Expr::Pow(base, exp) if !base.contains_variable(var) => Expr::Mul(
                Box::new(Expr::Mul(Box::new(self.clone()), Box::new(Expr::Ln(base.clone())))),
                Box::new(exp.diff(var)?),
            ),
            Expr::Pow(base, exp) => Expr::Mul(
                Box::new(self.clone()),
                Box::new(Expr::Add(
                    Box::new(Expr::Mul(Box::new(exp.diff(var)?), Box::new(Expr::Ln(base.clone())))),
                    Box::new(Expr::Mul(
                        Box::new(Expr::Mul(exp.clone(), Box::new(base.diff(var)?))),
                        Box::new(power(base, -1.0)),
                    )),
                )),
            ),
            Expr::Exp(expr) => {
                Expr::Mul(Box::new(Expr::Exp(expr.clone())), Box::new(expr.diff(var)?))
            }
            Expr::Ln(expr) => Expr::Mul(Box::new(expr.diff(var)?), Box::new(power(expr, -1.0))),
            Expr::sin(expr) => {
                Expr::Mul(Box::new(Expr::cos(expr.clone())), Box::new(expr.diff(var)?))
            }
            Expr::cos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::sin(expr.clone())),
                )),
                Box::new(expr.diff(var)?),
            ),
            Expr::tg(expr) => Expr::Mul(
                Box::new(power(&Expr::cos(expr.clone()), -2.0)),
                Box::new(expr.diff(var)?),
            ),
            Expr::ctg(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(power(&Expr::sin(expr.clone()), -2.0)),
                )),
                Box::new(expr.diff(var)?),
            ),
            Expr::arcsin(expr) => Expr::Mul(
                Box::new(expr.diff(var)?),
                Box::new(power(&one_minus_square(expr), -0.5)),
            ),
            Expr::arccos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)?),
                )),
                Box::new(power(&one_minus_square(expr), -0.5)),
            ),
            Expr::arctg(expr) => Expr::Mul(
                Box::new(expr.diff(var)?),
                Box::new(power(&one_plus_square(expr), -1.0)),
            ),
            Expr::arcctg(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)?),
                )),
                Box::new(power(&one_plus_square(expr), -1.0)),
            ),
            Expr::Apply(name, arg) => {
                if arg.contains_variable(var) {
                    return Err(SeriesError::Differentiation(format!(
                        "no derivative rule for function '{}' in {} with respect to '{}'",
                        name, self, var
                    )));
                }
                Expr::Const(0.0)
            }
        };
        Ok(derivative)
    }

    /// One derivative with products distributed over sums and like terms collected.
    ///
    /// Repeated steps keep the derivative a sum of monomials over the same factors
    /// (`x`, `cos(x)`, `(1 + x^2)^-3`, ...), so its size grows polynomially with the
    /// number of steps. Powers of sums are left as they are.
    pub fn collected_derivative(&self, var: &str) -> SeriesResult<Expr> {
        Ok(self.diff(var)?.expand_products().simplify())
    }

    /// Evaluates the expression with `vars[i]` bound to `values[i]`.
    ///
    /// # Errors
    /// `SeriesError::Evaluation` for an unbound variable, mismatched argument lists or
    /// an unknown function.
    pub fn eval_expression(&self, vars: &[&str], values: &[f64]) -> SeriesResult<f64> {
        if vars.len() != values.len() {
            return Err(SeriesError::Evaluation(format!(
                "{} variables but {} values",
                vars.len(),
                values.len()
            )));
        }
        self.eval_with(vars, values)
    }

    fn eval_with(&self, vars: &[&str], values: &[f64]) -> SeriesResult<f64> {
        let value = match self {
            Expr::Var(name) => {
                let index = vars.iter().position(|&x| x == name).ok_or_else(|| {
                    SeriesError::Evaluation(format!("variable '{}' has no value", name))
                })?;
                values[index]
            }
            Expr::Const(val) => *val,
            Expr::Add(lhs, rhs) => lhs.eval_with(vars, values)? + rhs.eval_with(vars, values)?,
            Expr::Sub(lhs, rhs) => lhs.eval_with(vars, values)? - rhs.eval_with(vars, values)?,
            Expr::Mul(lhs, rhs) => lhs.eval_with(vars, values)? * rhs.eval_with(vars, values)?,
            Expr::Div(lhs, rhs) => lhs.eval_with(vars, values)? / rhs.eval_with(vars, values)?,
            Expr::Pow(base, exp) => {
                let base_fn = base.eval_with(vars, values)?;
                let exp_fn = exp.eval_with(vars, values)?;
                base_fn.powf(exp_fn)
            }
            Expr::Exp(expr) => expr.eval_with(vars, values)?.exp(),
            Expr::Ln(expr) => expr.eval_with(vars, values)?.ln(),
            Expr::sin(expr) => expr.eval_with(vars, values)?.sin(),
            Expr::cos(expr) => expr.eval_with(vars, values)?.cos(),
            Expr::tg(expr) => expr.eval_with(vars, values)?.tan(),
            Expr::ctg(expr) => 1.0 / expr.eval_with(vars, values)?.tan(),
            Expr::arcsin(expr) => expr.eval_with(vars, values)?.asin(),
            Expr::arccos(expr) => expr.eval_with(vars, values)?.acos(),
            Expr::arctg(expr) => expr.eval_with(vars, values)?.atan(),
            Expr::arcctg(expr) => PI / 2.0 - expr.eval_with(vars, values)?.atan(),
            Expr::Apply(name, _) => {
                return Err(SeriesError::Evaluation(format!(
                    "unknown function '{}' cannot be evaluated",
                    name
                )));
            }
        };
        Ok(value)
    } // end of eval_expression

    /// EXPRESSION PARSING FROM STRINGS

    /// Parses a mathematical expression from string representation.
    ///
    /// # Supported Syntax
    /// - Variables: x, y, var_name
    /// - Constants: 3.14, 2.5, 1e-6, pi
    /// - Operators: +, -, *, /, ^ (right associative), unary minus
    /// - Functions: sin, cos, tg/tan, ctg/cot, arcsin, arccos, arctg/arctan,
    ///   arcctg/arccot, exp, ln/log; any other `name(arg)` becomes `Apply`
    /// - Parentheses for grouping
    ///
    /// # Errors
    /// `SeriesError::InputParsing` with field `expression`.
    pub fn parse_expression(input: &str) -> SeriesResult<Expr> {
        parse_expression_func(input).map_err(|cause| SeriesError::parsing("expression", cause))
    }

    /// Extracts all unique variable names from the symbolic expression.
    ///
    /// Returns a sorted, deduplicated list of variable names.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let expr = Expr::parse_expression("x^2 + y*z + x")?;
    /// let vars = expr.all_arguments_are_variables();
    /// assert_eq!(vars, vec!["x", "y", "z"]);
    /// ```
    pub fn all_arguments_are_variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    } // end of all_arguments_are_variables

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Expr::Var(name) => vars.push(name.clone()),
            Expr::Const(_) => {}
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => {
                lhs.collect_variables(vars);
                rhs.collect_variables(vars);
            }
            Expr::Exp(expr)
            | Expr::Ln(expr)
            | Expr::sin(expr)
            | Expr::cos(expr)
            | Expr::tg(expr)
            | Expr::ctg(expr)
            | Expr::arcsin(expr)
            | Expr::arccos(expr)
            | Expr::arctg(expr)
            | Expr::arcctg(expr)
            | Expr::Apply(_, expr) => expr.collect_variables(vars),
        }
    }
}

fn power(base: &Expr, exponent: f64) -> Expr {
    Expr::Pow(Box::new(base.clone()), Box::new(Expr::Const(exponent)))
}

fn one_minus_square(expr: &Expr) -> Expr {
    Expr::Sub(Box::new(Expr::Const(1.0)), Box::new(power(expr, 2.0)))
}

fn one_plus_square(expr: &Expr) -> Expr {
    Expr::Add(Box::new(Expr::Const(1.0)), Box::new(power(expr, 2.0)))
}
