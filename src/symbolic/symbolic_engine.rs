// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Symbolic Engine Module
//!
//! Core expression tree of the crate. Everything the series expander needs from a
//! "symbolic backend" lives on [`Expr`]: construction, substitution, differentiation
//! (see `symbolic_engine_derivatives`), simplification (see `symbolic_simplify`) and
//! display.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - symbolic variables like "x", "y"
//! - **Constants**: `Const(f64)` - numerical constants
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `ctg`, `arcsin`, `arccos`, `arctg`, `arcctg`
//! - **Unknown functions**: `Apply(name, arg)` - kept symbolic, cannot be differentiated
//!   with respect to a variable its argument depends on
//!
//! ### Key Methods
//! - `set_variable()` / `set_variable_from_map()` - Substitute variables with values
//! - `contains_variable()` - Dependency check used by the differentiation rules
//!
//! ## Interesting Code Features
//!
//! 1. **Recursive Expression Tree**: Uses Box<Expr> for nested expressions
//! 2. **Operator Overloading**: std::ops traits give natural syntax: `x + y * z`
//! 3. **Non-standard Function Names**: mathematical notation (tg, ctg) instead of
//!    programming conventions (tan, cot); the parser accepts both

#![allow(non_camel_case_types)]

use std::collections::HashMap;
use std::f64;
use std::fmt;

/// Core symbolic expression enum representing mathematical expressions as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// use RustedTaylor::symbolic::symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "y", "velocity")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    sin(Box<Expr>),
    cos(Box<Expr>),
    /// Tangent function - uses mathematical notation 'tg'
    tg(Box<Expr>),
    /// Cotangent function - uses mathematical notation 'ctg'
    ctg(Box<Expr>),
    arcsin(Box<Expr>),
    arccos(Box<Expr>),
    /// Arctangent function - uses mathematical notation 'arctg'
    arctg(Box<Expr>),
    /// Arccotangent function - uses mathematical notation 'arcctg'
    arcctg(Box<Expr>),
    /// Application of a function the engine has no rules for, e.g. `f(x)`
    Apply(String, Box<Expr>),
}

impl Expr {
    /// binding strength used by `Display` to decide where parentheses are needed
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(_, _) | Expr::Sub(_, _) => 1,
            Expr::Mul(_, _) | Expr::Div(_, _) => 2,
            Expr::Const(val) if *val < 0.0 => 2,
            Expr::Pow(_, _) => 3,
            _ => 4,
        }
    }

    /// `Some(-self)` when the expression is printed with a leading minus sign
    fn negated(&self) -> Option<Expr> {
        match self {
            Expr::Const(val) if *val < 0.0 => Some(Expr::Const(-val)),
            Expr::Mul(lhs, rhs) => match lhs.as_ref() {
                Expr::Const(c) if *c == -1.0 => Some(*rhs.clone()),
                Expr::Const(c) if *c < 0.0 => Some(Expr::Mul(Box::new(Expr::Const(-c)), rhs.clone())),
                _ => None,
            },
            _ => None,
        }
    }

    fn function_name(&self) -> Option<(&str, &Expr)> {
        match self {
            Expr::Exp(arg) => Some(("exp", arg)),
            Expr::Ln(arg) => Some(("ln", arg)),
            Expr::sin(arg) => Some(("sin", arg)),
            Expr::cos(arg) => Some(("cos", arg)),
            Expr::tg(arg) => Some(("tg", arg)),
            Expr::ctg(arg) => Some(("ctg", arg)),
            Expr::arcsin(arg) => Some(("arcsin", arg)),
            Expr::arccos(arg) => Some(("arccos", arg)),
            Expr::arctg(arg) => Some(("arctg", arg)),
            Expr::arcctg(arg) => Some(("arcctg", arg)),
            Expr::Apply(name, arg) => Some((name.as_str(), arg)),
            _ => None,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Display implementation for pretty printing symbolic expressions.
///
/// Infix notation with the minimal set of parentheses; `a + (-c) * b` is printed
/// as `a - c * b`. The output can be parsed back by `Expr::parse_expression`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => {
                let magnitude = val.abs();
                if val.is_finite() && magnitude != 0.0 && !(1e-6..1e15).contains(&magnitude) {
                    write!(f, "{:e}", val)
                } else {
                    write!(f, "{}", val)
                }
            }
            Expr::Add(lhs, rhs) => {
                write!(f, "{}", lhs)?;
                match rhs.negated() {
                    Some(positive) => {
                        write!(f, " - ")?;
                        write_operand(f, &positive, positive.precedence() <= 1)
                    }
                    None => write!(f, " + {}", rhs),
                }
            }
            Expr::Sub(lhs, rhs) => {
                write!(f, "{} - ", lhs)?;
                write_operand(f, rhs, rhs.precedence() <= 1)
            }
            Expr::Mul(lhs, rhs) => {
                if let Expr::Const(c) = lhs.as_ref() {
                    if *c == -1.0 {
                        write!(f, "-")?;
                        return write_operand(f, rhs, rhs.precedence() < 2);
                    }
                }
                write_operand(f, lhs, lhs.precedence() < 2)?;
                write!(f, " * ")?;
                let negative_const = matches!(rhs.as_ref(), Expr::Const(c) if *c < 0.0);
                write_operand(f, rhs, rhs.precedence() < 2 || negative_const)
            }
            Expr::Div(lhs, rhs) => {
                write_operand(f, lhs, lhs.precedence() < 2)?;
                write!(f, " / ")?;
                write_operand(f, rhs, rhs.precedence() <= 2)
            }
            Expr::Pow(base, exp) => {
                write_operand(f, base, base.precedence() <= 3)?;
                write!(f, "^")?;
                write_operand(f, exp, exp.precedence() < 4)
            }
            other => match other.function_name() {
                Some((name, arg)) => write!(f, "{}({})", name, arg),
                None => unreachable!("every remaining variant is a function"),
            },
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::AddAssign for Expr {
    fn add_assign(&mut self, rhs: Self) {
        *self = Expr::Add(Box::new(self.clone()), Box::new(rhs));
    }
}

impl std::ops::MulAssign for Expr {
    fn mul_assign(&mut self, rhs: Self) {
        *self = Expr::Mul(Box::new(self.clone()), Box::new(rhs));
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Rebuilds the node with every direct child replaced by `f(child)`.
    /// Leaves are returned unchanged.
    pub fn map_children<F>(&self, f: F) -> Expr
    where
        F: Fn(&Expr) -> Expr,
    {
        let b = |e: &Expr| Box::new(f(e));
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(b(lhs), b(rhs)),
            Expr::Sub(lhs, rhs) => Expr::Sub(b(lhs), b(rhs)),
            Expr::Mul(lhs, rhs) => Expr::Mul(b(lhs), b(rhs)),
            Expr::Div(lhs, rhs) => Expr::Div(b(lhs), b(rhs)),
            Expr::Pow(base, exp) => Expr::Pow(b(base), b(exp)),
            Expr::Exp(arg) => Expr::Exp(b(arg)),
            Expr::Ln(arg) => Expr::Ln(b(arg)),
            Expr::sin(arg) => Expr::sin(b(arg)),
            Expr::cos(arg) => Expr::cos(b(arg)),
            Expr::tg(arg) => Expr::tg(b(arg)),
            Expr::ctg(arg) => Expr::ctg(b(arg)),
            Expr::arcsin(arg) => Expr::arcsin(b(arg)),
            Expr::arccos(arg) => Expr::arccos(b(arg)),
            Expr::arctg(arg) => Expr::arctg(b(arg)),
            Expr::arcctg(arg) => Expr::arcctg(b(arg)),
            Expr::Apply(name, arg) => Expr::Apply(name.clone(), b(arg)),
        }
    }

    /// Substitutes a variable with a constant value throughout the expression.
    ///
    /// # Arguments
    /// * `var` - Name of the variable to substitute
    /// * `value` - Numerical value to substitute for the variable
    pub fn set_variable(&self, var: &str, value: f64) -> Expr {
        match self {
            Expr::Var(name) if name == var => Expr::Const(value),
            Expr::Add(lhs, rhs) => Expr::Add(
                Box::new(lhs.set_variable(var, value)),
                Box::new(rhs.set_variable(var, value)),
            ),
            Expr::Sub(lhs, rhs) => Expr::Sub(
                Box::new(lhs.set_variable(var, value)),
                Box::new(rhs.set_variable(var, value)),
            ),
            Expr::Mul(lhs, rhs) => Expr::Mul(
                Box::new(lhs.set_variable(var, value)),
                Box::new(rhs.set_variable(var, value)),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(lhs.set_variable(var, value)),
                Box::new(rhs.set_variable(var, value)),
            ),
            Expr::Pow(base, exp) => Expr::Pow(
                Box::new(base.set_variable(var, value)),
                Box::new(exp.set_variable(var, value)),
            ),
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            _ => self.map_children(|child| child.set_variable(var, value)),
        }
    }

    /// Substitutes multiple variables with constant values using a HashMap.
    /// Only variables present in the map are substituted.
    pub fn set_variable_from_map(&self, var_map: &HashMap<String, f64>) -> Expr {
        match self {
            Expr::Var(name) => match var_map.get(name) {
                Some(value) => Expr::Const(*value),
                None => self.clone(),
            },
            _ => self.map_children(|child| child.set_variable_from_map(var_map)),
        }
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            Expr::Add(left, right)
            | Expr::Sub(left, right)
            | Expr::Mul(left, right)
            | Expr::Div(left, right)
            | Expr::Pow(left, right) => {
                left.contains_variable(var_name) || right.contains_variable(var_name)
            }
            Expr::Exp(arg)
            | Expr::Ln(arg)
            | Expr::sin(arg)
            | Expr::cos(arg)
            | Expr::tg(arg)
            | Expr::ctg(arg)
            | Expr::arcsin(arg)
            | Expr::arccos(arg)
            | Expr::arctg(arg)
            | Expr::arcctg(arg)
            | Expr::Apply(_, arg) => arg.contains_variable(var_name),
        }
    }

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Creates exponential function e^(self).
    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    /// Creates natural logarithm ln(self).
    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    /// Creates power expression self^rhs.
    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    /// Checks if expression is exactly zero (constant 0.0).
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }

    /// numeric value of a constant node
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(val) => Some(*val),
            _ => None,
        }
    }
}
