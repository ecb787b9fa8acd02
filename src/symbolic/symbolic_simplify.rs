// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Symbolic Expression Simplification Module
//!
//! Algebraic simplification and polynomial expansion of symbolic expressions.
//!
//! ## Simplification Strategy
//!
//! 1. **Constant Folding**: arithmetic on numerical constants, and elementary functions of
//!    constants (`sin(0.5)` becomes a number) whenever the result is finite
//! 2. **Algebraic Identities**: x + 0 = x, x * 1 = x, x^0 = 1, x - x = 0
//! 3. **Power Rules**: x^a * x^b = x^(a+b), x^a / x^b = x^(a-b)
//! 4. **Like Term Collection**: 3x + 2x = 5x, including terms whose factors are arbitrary
//!    subexpressions such as `0.5 * (x - 1)^2`
//!
//! Collected terms come out in a fixed order (by monomial key), so simplifying the same
//! expression twice always prints the same way.
//!
//! ## Expansion
//!
//! `expand()` distributes products over sums and raises sums to small integer powers,
//! after which `simplify()` collects a canonical polynomial.

use crate::symbolic::symbolic_engine::Expr;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// largest integer power of a sum that `expand` multiplies out
const MAX_EXPANDED_POWER: f64 = 16.0;

/// passes of `simplify_` performed by `simplify` before giving up on a fixed point
const SIMPLIFY_PASSES: usize = 4;

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// One bottom-up pass of algebraic simplification.
    ///
    /// ### Additive Identities
    /// - `x + 0 = x`, `0 + x = x`, `x - 0 = x`, `x - x = 0`
    ///
    /// ### Multiplicative Identities
    /// - `x * 1 = x`, `x * 0 = 0`, `(c1 * x) * c2 = (c1 * c2) * x`
    ///
    /// ### Power Rules
    /// - `x^0 = 1`, `x^1 = x`, `1^x = 1`, `x^a * x^b = x^(a+b)`, `(x^a)^n = x^(a*n)` for integer n
    ///
    /// ### Functions
    /// Any supported function of a constant is evaluated when the value is finite.
    pub fn simplify_(&self) -> Expr {
        match self {
            Expr::Var(_) => self.clone(),
            Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b), // (a) + (b) = (a + b)
                    (Expr::Const(0.0), _) => rhs,                           // 0 + x = x
                    (_, Expr::Const(0.0)) => lhs,                           // x + 0 = x
                    _ => {
                        let expr = Expr::Add(Box::new(lhs), Box::new(rhs));
                        Self::simplify_polynomial(&expr, true).unwrap_or(expr)
                    }
                }
            }
            Expr::Sub(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b), // (a) - (b) = (a - b)
                    (_, Expr::Const(0.0)) => lhs,                           // x - 0 = x
                    _ if lhs == rhs => Expr::Const(0.0),
                    (Expr::Const(0.0), _) => {
                        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(rhs)).simplify_()
                    }
                    _ => {
                        // a - b = a + (-1)*b, so like terms across the minus sign are collected
                        let neg_rhs =
                            Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(rhs.clone())).simplify_();
                        let add_expr = Expr::Add(Box::new(lhs.clone()), Box::new(neg_rhs));
                        Self::simplify_polynomial(&add_expr, false)
                            .unwrap_or_else(|| Expr::Sub(Box::new(lhs), Box::new(rhs)))
                    }
                }
            }
            Expr::Mul(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b), // (a) * (b) = (a * b)
                    (Expr::Const(0.0), _) | (_, Expr::Const(0.0)) => Expr::Const(0.0), // 0 * x = 0
                    (Expr::Const(1.0), _) => rhs,                           // 1 * x = x
                    (_, Expr::Const(1.0)) => lhs,                           // x * 1 = x
                    // x^a * x^b = x^(a+b)
                    (Expr::Pow(base1, exp1), Expr::Pow(base2, exp2)) if base1 == base2 => {
                        let new_exp = Expr::Add(exp1.clone(), exp2.clone()).simplify_();
                        Expr::Pow(base1.clone(), Box::new(new_exp)).simplify_()
                    }
                    (Expr::Var(v1), Expr::Pow(base, exp)) | (Expr::Pow(base, exp), Expr::Var(v1)) => {
                        if let Expr::Var(v2) = base.as_ref() {
                            if v1 == v2 {
                                let new_exp =
                                    Expr::Add(Box::new(Expr::Const(1.0)), exp.clone()).simplify_();
                                return Expr::Pow(Box::new(Expr::Var(v1.clone())), Box::new(new_exp))
                                    .simplify_();
                            }
                        }
                        Expr::Mul(Box::new(lhs), Box::new(rhs))
                    }
                    (Expr::Var(v1), Expr::Var(v2)) if v1 == v2 => {
                        Expr::Pow(Box::new(Expr::Var(v1.clone())), Box::new(Expr::Const(2.0)))
                    }
                    // (c1 * expr) * c2 = (c1 * c2) * expr
                    (Expr::Mul(inner_lhs, inner_rhs), Expr::Const(c))
                    | (Expr::Const(c), Expr::Mul(inner_lhs, inner_rhs)) => {
                        match (inner_lhs.as_ref(), inner_rhs.as_ref()) {
                            (Expr::Const(c1), _) => {
                                Expr::Mul(Box::new(Expr::Const(c1 * c)), inner_rhs.clone())
                                    .simplify_()
                            }
                            (_, Expr::Const(c1)) => {
                                Expr::Mul(Box::new(Expr::Const(c1 * c)), inner_lhs.clone())
                                    .simplify_()
                            }
                            _ => {
                                let expr = Expr::Mul(Box::new(lhs.clone()), Box::new(rhs.clone()));
                                Self::simplify_product(&expr).unwrap_or(expr)
                            }
                        }
                    }
                    _ => {
                        let expr = Expr::Mul(Box::new(lhs), Box::new(rhs));
                        Self::simplify_product(&expr).unwrap_or(expr)
                    }
                }
            }
            Expr::Div(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) if *b != 0.0 => Expr::Const(a / b), // (a) / (b) = (a / b)
                    (Expr::Const(0.0), _) if !rhs.is_zero() => Expr::Const(0.0), // 0 / x = 0
                    (_, Expr::Const(1.0)) => lhs,                                // x / 1 = x
                    _ if lhs == rhs && !lhs.is_zero() => Expr::Const(1.0),       // x / x = 1
                    // x^a / x^b = x^(a-b)
                    (Expr::Pow(base1, exp1), Expr::Pow(base2, exp2)) if base1 == base2 => {
                        let new_exp = Expr::Sub(exp1.clone(), exp2.clone()).simplify_();
                        Expr::Pow(base1.clone(), Box::new(new_exp)).simplify_()
                    }
                    (Expr::Var(v1), Expr::Pow(base, exp)) => {
                        if let Expr::Var(v2) = base.as_ref() {
                            if v1 == v2 {
                                let new_exp =
                                    Expr::Sub(Box::new(Expr::Const(1.0)), exp.clone()).simplify_();
                                return Expr::Pow(Box::new(Expr::Var(v1.clone())), Box::new(new_exp))
                                    .simplify_();
                            }
                        }
                        Expr::Div(Box::new(lhs), Box::new(rhs))
                    }
                    (Expr::Pow(base, exp), Expr::Var(v2)) => {
                        if let Expr::Var(v1) = base.as_ref() {
                            if v1 == v2 {
                                let new_exp =
                                    Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0))).simplify_();
                                return Expr::Pow(Box::new(Expr::Var(v1.clone())), Box::new(new_exp))
                                    .simplify_();
                            }
                        }
                        Expr::Div(Box::new(lhs), Box::new(rhs))
                    }
                    // (c1 * expr) / c2 = (c1/c2) * expr
                    (Expr::Mul(inner_lhs, inner_rhs), Expr::Const(c)) if *c != 0.0 => {
                        match (inner_lhs.as_ref(), inner_rhs.as_ref()) {
                            (Expr::Const(c1), _) => {
                                Expr::Mul(Box::new(Expr::Const(c1 / c)), inner_rhs.clone())
                                    .simplify_()
                            }
                            (_, Expr::Const(c1)) => {
                                Expr::Mul(Box::new(Expr::Const(c1 / c)), inner_lhs.clone())
                                    .simplify_()
                            }
                            _ => Expr::Div(Box::new(lhs), Box::new(rhs)),
                        }
                    }
                    _ => Expr::Div(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Pow(base, exp) => {
                let base = base.simplify_();
                let exp = exp.simplify_();
                match (&base, &exp) {
                    (Expr::Const(a), Expr::Const(b)) if a.powf(*b).is_finite() => {
                        Expr::Const(a.powf(*b)) // (a) ^ (b) = (a ^ b)
                    }
                    (_, Expr::Const(0.0)) => Expr::Const(1.0), // x ^ 0 = 1
                    (_, Expr::Const(1.0)) => base,             // x ^ 1 = x
                    (Expr::Const(1.0), _) => Expr::Const(1.0), // 1 ^ x = 1
                    // (x^a)^n = x^(a*n)
                    (Expr::Pow(inner_base, inner_exp), Expr::Const(n)) if n.fract() == 0.0 => {
                        let new_exp = Expr::Mul(inner_exp.clone(), Box::new(exp.clone())).simplify_();
                        Expr::Pow(inner_base.clone(), Box::new(new_exp)).simplify_()
                    }
                    _ => Expr::Pow(Box::new(base), Box::new(exp)),
                }
            }
            Expr::Exp(expr) => fold_function(expr.simplify_(), Expr::Exp, f64::exp),
            Expr::Ln(expr) => fold_function(expr.simplify_(), Expr::Ln, f64::ln),
            Expr::sin(expr) => fold_function(expr.simplify_(), Expr::sin, f64::sin),
            Expr::cos(expr) => fold_function(expr.simplify_(), Expr::cos, f64::cos),
            Expr::tg(expr) => fold_function(expr.simplify_(), Expr::tg, f64::tan),
            Expr::ctg(expr) => fold_function(expr.simplify_(), Expr::ctg, |v| 1.0 / v.tan()),
            Expr::arcsin(expr) => fold_function(expr.simplify_(), Expr::arcsin, f64::asin),
            Expr::arccos(expr) => fold_function(expr.simplify_(), Expr::arccos, f64::acos),
            Expr::arctg(expr) => fold_function(expr.simplify_(), Expr::arctg, f64::atan),
            Expr::arcctg(expr) => {
                fold_function(expr.simplify_(), Expr::arcctg, |v| PI / 2.0 - v.atan())
            }
            Expr::Apply(_, _) => self.map_children(|child| child.simplify_()),
        }
    }

    /// Simplify a sum by collecting like terms.
    ///
    /// Flattens nested Add/Sub into a list of terms, splits each into a coefficient and a
    /// monomial key, sums coefficients per key and rebuilds the sum in key order.
    ///
    /// ## Examples
    ///
    /// - `3x + 2x` → `5x`
    /// - `x^2 + 2x^2 - x^2` → `2x^2`
    /// - `sin(y) * x + 2 * x * sin(y)` → `3 * sin(y) * x`
    ///
    /// # Returns
    /// * `Some(simplified_expr)` - when terms were merged, or when `reorder` is set and the
    ///   terms were out of key order
    /// * `None` - when nothing changes
    fn simplify_polynomial(expr: &Expr, reorder: bool) -> Option<Expr> {
        let mut terms = Vec::new();
        flatten_add(expr, &mut terms);
        if terms.len() < 2 {
            return None;
        }
        let mut bases = BTreeMap::new();
        let monomials: Vec<(MonomialKey, f64)> = terms
            .iter()
            .map(|term| extract_monomial(term, &mut bases))
            .collect();
        if monomials.windows(2).all(|pair| pair[0].0 < pair[1].0) {
            return None;
        }
        let mut poly_map: BTreeMap<MonomialKey, f64> = BTreeMap::new();
        for (monomial, coeff) in monomials {
            *poly_map.entry(monomial).or_insert(0.0) += coeff;
        }
        if poly_map.len() == terms.len() && !reorder {
            return None;
        }
        let result_terms: Vec<Expr> = poly_map
            .into_iter()
            .filter(|(_, coeff)| *coeff != 0.0)
            .map(|(monomial, coeff)| Self::build_monomial_term(&monomial, coeff, &bases))
            .collect();
        Some(sum_of(result_terms))
    }

    /// Merge repeated factors and constants of a single product: `2 * x * 3 * x` → `6 * x^2`.
    fn simplify_product(expr: &Expr) -> Option<Expr> {
        let mut factors = Vec::new();
        flatten_mul(expr, &mut factors);
        let mut bases = BTreeMap::new();
        let (monomial, coeff) = extract_monomial(expr, &mut bases);
        if coeff == 0.0 {
            return Some(Expr::Const(0.0));
        }
        let rebuilt_len = monomial.0.len() + usize::from(coeff != 1.0);
        if rebuilt_len < factors.len() {
            Some(Self::build_monomial_term(&monomial, coeff, &bases))
        } else {
            None
        }
    }

    /// Build a term from monomial key and coefficient.
    ///
    /// - `monomial: {}, coeff: 5.0` → `Const(5.0)`
    /// - `monomial: {"x": 1}, coeff: 3.0` → `3.0 * x`
    /// - `monomial: {"x": 1, "y": 2}, coeff: 2.0` → `2.0 * x * y^2`
    fn build_monomial_term(
        monomial: &MonomialKey,
        coeff: f64,
        bases: &BTreeMap<String, Expr>,
    ) -> Expr {
        let mut factors = Vec::new();
        if coeff != 1.0 || monomial.0.is_empty() {
            factors.push(Expr::Const(coeff));
        }
        for (key, exp) in &monomial.0 {
            let base = bases
                .get(key)
                .cloned()
                .unwrap_or_else(|| Expr::Var(key.clone()));
            if *exp == 1 {
                factors.push(base);
            } else {
                factors.push(Expr::Pow(Box::new(base), Box::new(Expr::Const(*exp as f64))));
            }
        }
        factors
            .into_iter()
            .reduce(|a, b| Expr::Mul(Box::new(a), Box::new(b)))
            .unwrap_or(Expr::Const(1.0))
    }

    /// Public interface for expression simplification.
    ///
    /// Repeats `simplify_()` until the expression stops changing (bounded number of passes).
    pub fn simplify(&self) -> Expr {
        let mut current = self.simplify_();
        for _ in 1..SIMPLIFY_PASSES {
            let next = current.simplify_();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    //___________________________________EXPANSION____________________________________

    /// Distributes products over sums, rewrites `a - b` as `a + (-1)*b`, splits
    /// `(a + b) / c` into `a / c + b / c` and multiplies out `(a + b)^n` for integer
    /// `2 <= n <= 16`. The result is not simplified.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let e = Expr::parse_expression("(x + 1)^2")?.expand().simplify(); // 1 + 2*x + x^2
    /// ```
    pub fn expand(&self) -> Expr {
        self.expand_with(true)
    }

    /// Like `expand`, but powers of sums stay as they are: `(x + 1)^16 * (y + 2)` becomes
    /// `(x + 1)^16 * y + 2 * (x + 1)^16`.
    pub fn expand_products(&self) -> Expr {
        self.expand_with(false)
    }

    fn expand_with(&self, powers: bool) -> Expr {
        match self {
            Expr::Add(lhs, rhs) => Expr::Add(
                Box::new(lhs.expand_with(powers)),
                Box::new(rhs.expand_with(powers)),
            ),
            Expr::Sub(lhs, rhs) => Expr::Add(
                Box::new(lhs.expand_with(powers)),
                Box::new(distribute(&Expr::Const(-1.0), &rhs.expand_with(powers))),
            ),
            Expr::Mul(lhs, rhs) => distribute(&lhs.expand_with(powers), &rhs.expand_with(powers)),
            Expr::Div(lhs, rhs) => {
                let denominator = rhs.expand_with(powers);
                let terms = summands(&lhs.expand_with(powers))
                    .into_iter()
                    .map(|term| Expr::Div(Box::new(term), Box::new(denominator.clone())))
                    .collect();
                sum_of(terms)
            }
            Expr::Pow(base, exp) => {
                let base = base.expand_with(powers);
                let exp = exp.expand_with(powers);
                match exp {
                    Expr::Const(n)
                        if powers
                            && n.fract() == 0.0
                            && (2.0..=MAX_EXPANDED_POWER).contains(&n)
                            && summands(&base).len() > 1 =>
                    {
                        let mut acc = base.clone();
                        for _ in 1..(n as usize) {
                            acc = distribute(&acc, &base);
                        }
                        acc
                    }
                    _ => Expr::Pow(Box::new(base), Box::new(exp)),
                }
            }
            _ => self.map_children(|child| child.expand_with(powers)),
        }
    }
}

/// evaluates `wrap(arg)` numerically when `arg` is a constant and the value is finite
fn fold_function(arg: Expr, wrap: fn(Box<Expr>) -> Expr, f: fn(f64) -> f64) -> Expr {
    match arg {
        Expr::Const(c) if f(c).is_finite() => Expr::Const(f(c)),
        _ => wrap(Box::new(arg)),
    }
}

fn sum_of(terms: Vec<Expr>) -> Expr {
    terms
        .into_iter()
        .reduce(|a, b| Expr::Add(Box::new(a), Box::new(b)))
        .unwrap_or(Expr::Const(0.0))
}

/// top-level summands of an expanded expression
fn summands(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Add(lhs, rhs) => {
            let mut terms = summands(lhs);
            terms.extend(summands(rhs));
            terms
        }
        _ => vec![expr.clone()],
    }
}

fn distribute(lhs: &Expr, rhs: &Expr) -> Expr {
    let left = summands(lhs);
    let right = summands(rhs);
    if left.len() == 1 && right.len() == 1 {
        return Expr::Mul(Box::new(lhs.clone()), Box::new(rhs.clone()));
    }
    let mut terms = Vec::with_capacity(left.len() * right.len());
    for a in &left {
        for b in &right {
            terms.push(Expr::Mul(Box::new(a.clone()), Box::new(b.clone())));
        }
    }
    sum_of(terms)
}

/// Represents the factor part of a polynomial term (monomial).
///
/// Keys are variable names, or the printed form of any other factor (`x - 1`, `sin(y)`),
/// mapped to integer exponents. `BTreeMap` gives a canonical order, so `x*y` and `y*x`
/// have identical keys.
///
/// - `x^2` → `MonomialKey({"x": 2})`
/// - `0.5 * (x - 1)^2` → `MonomialKey({"x - 1": 2})`, coefficient 0.5
/// - `5` (constant) → `MonomialKey({})`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonomialKey(pub BTreeMap<String, i32>);

/// Flatten nested Add/Sub expressions into a list of terms.
///
/// - `a - b` → `[a, -1*b]`
/// - `-1 * (x + y)` → `[-1*x, -1*y]`
/// - `(a + b) - (c + d)` → `[a, b, -1*c, -1*d]`
fn flatten_add(expr: &Expr, out: &mut Vec<Expr>) {
    match expr {
        Expr::Add(a, b) => {
            flatten_add(a, out);
            flatten_add(b, out);
        }
        Expr::Sub(a, b) => {
            flatten_add(a, out);
            let neg_b = Expr::Mul(Box::new(Expr::Const(-1.0)), b.clone());
            flatten_add(&neg_b, out);
        }
        Expr::Mul(lhs, rhs) => {
            let distributed = match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Const(-1.0), Expr::Add(a, b)) | (Expr::Add(a, b), Expr::Const(-1.0)) => {
                    Some((a, b, false))
                }
                (Expr::Const(-1.0), Expr::Sub(a, b)) | (Expr::Sub(a, b), Expr::Const(-1.0)) => {
                    Some((a, b, true))
                }
                _ => None,
            };
            match distributed {
                // -1 * (a + b) = (-1 * a) + (-1 * b); -1 * (a - b) = (-1 * a) + b
                Some((a, b, is_sub)) => {
                    flatten_add(&Expr::Mul(Box::new(Expr::Const(-1.0)), a.clone()), out);
                    if is_sub {
                        flatten_add(b, out);
                    } else {
                        flatten_add(&Expr::Mul(Box::new(Expr::Const(-1.0)), b.clone()), out);
                    }
                }
                None => out.push(expr.clone()),
            }
        }
        _ => out.push(expr.clone()),
    }
}

/// Flatten nested multiplication expressions into a list of factors: `(a * b) * c` → `[a, b, c]`
fn flatten_mul(expr: &Expr, out: &mut Vec<Expr>) {
    match expr {
        Expr::Mul(a, b) => {
            flatten_mul(a, out);
            flatten_mul(b, out);
        }
        _ => out.push(expr.clone()),
    }
}

/// registers a non-variable factor under its printed form
fn factor_key(base: &Expr, bases: &mut BTreeMap<String, Expr>) -> String {
    match base {
        Expr::Var(name) => name.clone(),
        _ => {
            let key = base.to_string();
            bases.entry(key.clone()).or_insert_with(|| base.clone());
            key
        }
    }
}

/// Split a term into its monomial key and numeric coefficient.
fn extract_monomial(expr: &Expr, bases: &mut BTreeMap<String, Expr>) -> (MonomialKey, f64) {
    match expr {
        Expr::Const(c) => (MonomialKey(BTreeMap::new()), *c),
        Expr::Mul(_, _) => {
            let mut factors = Vec::new();
            flatten_mul(expr, &mut factors);
            let mut coeff = 1.0;
            let mut map: BTreeMap<String, i32> = BTreeMap::new();
            for factor in factors {
                let (mon, c) = extract_monomial(&factor, bases);
                coeff *= c;
                for (key, exp) in mon.0 {
                    let total = map.entry(key).or_insert(0);
                    match total.checked_add(exp) {
                        Some(sum) => *total = sum,
                        None => return opaque_factor(expr, bases),
                    }
                }
            }
            map.retain(|_, exp| *exp != 0);
            (MonomialKey(map), coeff)
        }
        Expr::Div(lhs, rhs) => match rhs.as_ref() {
            Expr::Const(c) if *c != 0.0 => {
                let (mon, coeff) = extract_monomial(lhs, bases);
                (mon, coeff / c)
            }
            _ => opaque_factor(expr, bases),
        },
        Expr::Pow(base, exp) => match exp.as_ref() {
            Expr::Const(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => {
                let mut m = BTreeMap::new();
                m.insert(factor_key(base, bases), *n as i32);
                (MonomialKey(m), 1.0)
            }
            _ => opaque_factor(expr, bases),
        },
        _ => opaque_factor(expr, bases),
    }
}

fn opaque_factor(expr: &Expr, bases: &mut BTreeMap<String, Expr>) -> (MonomialKey, f64) {
    let mut m = BTreeMap::new();
    m.insert(factor_key(expr, bases), 1);
    (MonomialKey(m), 1.0)
}
