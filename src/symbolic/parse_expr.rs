// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! a module turns a String expression into a symbolic expression
//!# Example
//! ```
//! use RustedTaylor::symbolic::symbolic_engine::Expr;
//! let parsed_expression = Expr::parse_expression("x^2.3 * log(x + y + y^2.6)").unwrap();
//! println!(" parsed_expression {}", parsed_expression);
//! ```
//                  grammar, lowest binding first
//                |_________________________________|
//                | sum      := product (('+'|'-') product)*
//                | product  := unary (('*'|'/') unary)*
//                | unary    := ('-'|'+') unary | power
//                | power    := primary ('^' unary)?      right associative
//                | primary  := '(' sum ')' | number | name '(' sum ')' | name
//                |_________________________________|
use crate::symbolic::series_errors::ParseFailure;
use crate::symbolic::symbolic_engine::Expr;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, map_res, opt, recognize},
    error::Error,
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded},
};
use std::f64::consts::PI;

/// Parses the whole input into an expression; trailing garbage is an error.
pub fn parse_expression_func(input: &str) -> Result<Expr, ParseFailure> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(failure(input, "empty expression".to_string()));
    }
    match all_consuming(ws(parse_add_sub)).parse(trimmed) {
        Ok((_, expr)) => match non_finite_constant(&expr) {
            Some(value) => Err(ParseFailure::NonFinite(format!("{} in '{}'", value, input))),
            None => Ok(expr),
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let reason = if e.input.trim().is_empty() {
                "unexpected end of input".to_string()
            } else {
                format!("unexpected input at '{}'", e.input.trim())
            };
            Err(failure(input, reason))
        }
        Err(nom::Err::Incomplete(_)) => Err(failure(input, "incomplete input".to_string())),
    }
}

/// number literals that overflow `f64`, such as `1e400`
fn non_finite_constant(expr: &Expr) -> Option<f64> {
    match expr {
        Expr::Const(c) if !c.is_finite() => Some(*c),
        Expr::Const(_) | Expr::Var(_) => None,
        Expr::Add(lhs, rhs)
        | Expr::Sub(lhs, rhs)
        | Expr::Mul(lhs, rhs)
        | Expr::Div(lhs, rhs)
        | Expr::Pow(lhs, rhs) => non_finite_constant(lhs).or_else(|| non_finite_constant(rhs)),
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
        | Expr::Apply(_, arg) => non_finite_constant(arg),
    }
}

fn failure(input: &str, reason: String) -> ParseFailure {
    ParseFailure::Expression {
        input: input.to_string(),
        reason,
    }
}

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn parse_add_sub(input: &str) -> IResult<&str, Expr> {
    let (rest, init) = parse_mul_div(input)?;
    fold_many0(
        pair(ws(alt((char('+'), char('-')))), parse_mul_div),
        move || init.clone(),
        |acc, (op, rhs)| match op {
            '+' => Expr::Add(acc.boxed(), rhs.boxed()),
            _ => Expr::Sub(acc.boxed(), rhs.boxed()),
        },
    )
    .parse(rest)
}

fn parse_mul_div(input: &str) -> IResult<&str, Expr> {
    let (rest, init) = parse_unary(input)?;
    fold_many0(
        pair(ws(alt((char('*'), char('/')))), parse_unary),
        move || init.clone(),
        |acc, (op, rhs)| match op {
            '*' => Expr::Mul(acc.boxed(), rhs.boxed()),
            _ => Expr::Div(acc.boxed(), rhs.boxed()),
        },
    )
    .parse(rest)
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    if let Ok((rest, expr)) = preceded(ws(char('-')), parse_unary).parse(input) {
        let negated = match expr {
            Expr::Const(c) => Expr::Const(-c),
            other => Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(other)),
        };
        return Ok((rest, negated));
    }
    if let Ok((rest, expr)) = preceded(ws(char('+')), parse_unary).parse(input) {
        return Ok((rest, expr));
    }
    parse_pow(input)
}

fn parse_pow(input: &str) -> IResult<&str, Expr> {
    let (rest, base) = parse_primary(input)?;
    // the exponent goes back through unary, so 2^-1 and a^b^c = a^(b^c) both work
    if let Ok((next, exp)) = preceded(ws(char('^')), parse_unary).parse(rest) {
        Ok((next, Expr::Pow(base.boxed(), exp.boxed())))
    } else {
        Ok((rest, base))
    }
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((parse_parens, parse_number, parse_call_or_symbol))).parse(input)
}

fn parse_parens(input: &str) -> IResult<&str, Expr> {
    delimited(char('('), ws(parse_add_sub), char(')')).parse(input)
}

fn parse_number(input: &str) -> IResult<&str, Expr> {
    map_res(
        alt((
            recognize((digit1, opt((char('.'), digit0)), opt(parse_exponent))),
            recognize((char('.'), digit1, opt(parse_exponent))),
        )),
        |s: &str| s.parse::<f64>().map(Expr::Const),
    )
    .parse(input)
}

fn parse_exponent(input: &str) -> IResult<&str, &str> {
    recognize((one_of("eE"), opt(one_of("+-")), digit1)).parse(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn parse_call_or_symbol(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = parse_identifier(input)?;
    let (rest, arg) = opt(preceded(
        multispace0,
        delimited(char('('), ws(parse_add_sub), char(')')),
    ))
    .parse(rest)?;
    let expr = match arg {
        Some(arg) => function_call(name, arg),
        None if name == "pi" => Expr::Const(PI),
        None => Expr::Var(name.to_string()),
    };
    Ok((rest, expr))
}

/// Maps a function name to its node; names without rules become `Apply`.
fn function_call(name: &str, arg: Expr) -> Expr {
    let arg = Box::new(arg);
    match name {
        "exp" => Expr::Exp(arg),
        "ln" | "log" => Expr::Ln(arg),
        "sqrt" => Expr::Pow(arg, Box::new(Expr::Const(0.5))),
        "sin" => Expr::sin(arg),
        "cos" => Expr::cos(arg),
        "tg" | "tan" => Expr::tg(arg),
        "ctg" | "cot" => Expr::ctg(arg),
        "arcsin" | "asin" => Expr::arcsin(arg),
        "arccos" | "acos" => Expr::arccos(arg),
        "arctg" | "arctan" | "atan" => Expr::arctg(arg),
        "arcctg" | "arccot" | "acot" => Expr::arcctg(arg),
        other => Expr::Apply(other.to_string(), arg),
    }
}
