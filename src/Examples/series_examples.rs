// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_snake_case)]

use crate::symbolic::series_errors::SeriesResult;
use crate::symbolic::series_expander::{
    CombineMode, ExpanderSettings, ExpansionPoint, SeriesExpander, SeriesNode,
};
use crate::symbolic::series_input::{CombinationRequest, SeriesReport, SeriesRequest};
use crate::symbolic::symbolic_engine::Expr;

/// number of the last example accepted by `series_examples`
pub const LAST_EXAMPLE: usize = 7;

/// compares a combination with the exact combination of the functions at `x`
fn print_combination(
    mode: CombineMode,
    functions: &str,
    points: &str,
    order: &str,
    at: &[(&str, f64)],
) -> SeriesResult<()> {
    let request = CombinationRequest::from_strings(functions, points, order, &mode.to_string())?;
    let expander = SeriesExpander::default();
    let result = request.run(&expander)?;
    let report = SeriesReport::from_expansion(&format!("{} of {}", mode, functions), &result);
    println!("{}", report.render(true, true));
    let names: Vec<&str> = at.iter().map(|(name, _)| *name).collect();
    let values: Vec<f64> = at.iter().map(|(_, value)| *value).collect();
    let approximation = result.expression().eval_expression(&names, &values)?;
    let pieces = request
        .functions
        .iter()
        .map(|f| f.eval_expression(&names, &values))
        .collect::<SeriesResult<Vec<f64>>>()?;
    let half = pieces.len() / 2;
    let exact = match mode {
        CombineMode::Sum => pieces.iter().sum::<f64>(),
        CombineMode::Product => pieces.iter().product::<f64>(),
        CombineMode::SumThenProduct => {
            pieces[..half].iter().sum::<f64>() * pieces[half..].iter().product::<f64>()
        }
        CombineMode::ProductThenSum => {
            pieces[..half].iter().sum::<f64>() + pieces[half..].iter().product::<f64>()
        }
    };
    println!(
        "approximated value at {:?}: {}, exact: {}\n",
        at, approximation, exact
    );
    Ok(())
}

pub fn series_examples(example: usize) -> SeriesResult<()> {
    match example {
        0 => {
            // ONE VARIABLE: Maclaurin series of sin(x) with the trace of every term
            let f = Expr::parse_expression("sin(x)")?;
            let result = SeriesExpander::default().expand_one_variable(&f, "x", 0.0, 5)?;
            let report = SeriesReport::from_expansion("sin(x)", &result)
                .with_comparison(Some(&f), vec![ExpansionPoint::new("x", 0.5)])?;
            println!("{}", report.render(true, false));
        }
        1 => {
            // sum of functions, each around its own point
            print_combination(CombineMode::Sum, "sin(x); cos(x)", "2; 3", "4", &[("x", 2.5)])?;
        }
        2 => {
            // product of functions
            print_combination(CombineMode::Product, "sin(x); cos(x)", "2; 3", "4", &[("x", 2.5)])?;
        }
        3 => {
            // d(x) + f(y) + g(z): every function in its own variable
            print_combination(
                CombineMode::Sum,
                "sin(x); exp(y); ln(z)",
                "0; 0; 1",
                "4",
                &[("x", 0.3), ("y", 0.2), ("z", 1.1)],
            )?;
        }
        4 => {
            // first half summed, second half multiplied, the two parts multiplied
            print_combination(
                CombineMode::SumThenProduct,
                "sin(x); cos(x); exp(x); ln(1 + x)",
                "0; 0; 0; 0",
                "4",
                &[("x", 0.2)],
            )?;
        }
        5 => {
            // first half summed, second half multiplied, the two parts added
            print_combination(
                CombineMode::ProductThenSum,
                "sin(x); cos(x); exp(x); ln(1 + x)",
                "0; 0; 0; 0",
                "4",
                &[("x", 0.2)],
            )?;
        }
        6 => {
            // MULTIVARIABLE: sequential stages against the joint expansion with mixed partials
            let request = SeriesRequest::from_strings("exp(x) * sin(x + y)", "x, y", "x=0; y=0", "3")?;
            let expander = SeriesExpander::default();
            let at = vec![ExpansionPoint::new("x", 0.1), ExpansionPoint::new("y", 0.2)];
            let sequential = SeriesReport::from_multivariable("sequential", &request.run(&expander)?)
                .with_comparison(Some(&request.expression), at.clone())?;
            println!("{}\n", sequential.render(true, false));
            let joint = SeriesReport::from_joint("joint", &request.run_joint(&expander)?)
                .with_comparison(Some(&request.expression), at)?;
            println!("{}", joint.render(true, true));
        }
        7 => {
            // explicit tree: sin(x) * (exp(y) + cos(z)), with the polynomial multiplied out
            let expander = SeriesExpander::new(ExpanderSettings::default().with_expand(true));
            let tree = SeriesNode::Product(vec![
                SeriesNode::leaf(Expr::parse_expression("sin(x)")?, 0.0),
                SeriesNode::Sum(vec![
                    SeriesNode::leaf(Expr::parse_expression("exp(y)")?, 0.0),
                    SeriesNode::leaf(Expr::parse_expression("cos(z)")?, 0.0),
                ]),
            ]);
            let result = expander.expand_tree(&tree, 3)?;
            println!("{}", SeriesReport::from_expansion("tree", &result).render(true, false));
        }
        _ => {
            println!("no example number {}, choose 0..={}", example, LAST_EXAMPLE);
        }
    }
    Ok(())
}
