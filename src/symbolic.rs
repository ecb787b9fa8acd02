// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedTaylor::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("x^2 * exp(y) - sin(x)/2").unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// assert_eq!(parsed_expression.all_arguments_are_variables(), vec!["x", "y"]);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
/// errors of parsing, differentiation, evaluation and expansion
pub mod series_errors;
///____________________________________________________________________________________________________________________________
/// # Taylor series expander
/// truncated Taylor polynomials in one or several variables, sums and products of expansions,
/// with the trace of every term
///# Example
/// ```
/// use RustedTaylor::symbolic::series_expander::SeriesExpander;
/// use RustedTaylor::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("exp(x)").unwrap();
/// let result = SeriesExpander::default().expand_one_variable(&f, "x", 0.0, 2).unwrap();
/// assert_eq!(result.to_string(), "1 + x + 0.5 * x^2");
/// for line in result.trace_lines() {
///     println!("{}", line);
/// }
/// ```
pub mod series_expander;
/// requests built from text fields and reports of the results
///# Example
/// ```
/// use RustedTaylor::symbolic::series_expander::SeriesExpander;
/// use RustedTaylor::symbolic::series_input::{SeriesReport, SeriesRequest};
/// let request = SeriesRequest::from_strings("exp(x)*cos(y)", "x, y", "x=0; y=0", "2").unwrap();
/// let result = request.run(&SeriesExpander::default()).unwrap();
/// println!("{}", SeriesReport::from_multivariable("exp(x)*cos(y)", &result).render(true, true));
/// ```
pub mod series_input;
/// ________________________________________________________________________________________________________________________________________________
/// # Symbolic engine
/// 1) expression tree with substitution and evaluation
/// 2) symbolic differentiation
/// 3) simplification and expansion of products
///# Example
/// ```
/// use RustedTaylor::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x^3 + sin(x)").unwrap();
/// let df_dx = f.diff("x").unwrap().simplify();
/// println!("df_dx = {}", df_dx);
/// let value = df_dx.eval_expression(&["x"], &[0.0]).unwrap();
/// assert_eq!(value, 1.0);
/// ```
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
pub mod symbolic_simplify;
