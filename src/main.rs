// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Command line interface of RustedTaylor
//!
//! ```bash
//! # Maclaurin series of sin(x) with the trace of every term
//! rusted_taylor expand "sin(x)" -v x -p "x=0" -o 5 --trace
//!
//! # joint expansion in two variables, compared with the function at a point
//! rusted_taylor expand "exp(x)*cos(y)" -v "x, y" -p "x=0; y=0" -o 3 --joint --at "x=0.1; y=0.2"
//!
//! # product of independent expansions saved as csv
//! rusted_taylor combine "sin(x); cos(y)" "0; 0" -o 4 -m product --csv trace.csv
//!
//! # task document
//! rusted_taylor task task.txt --table
//! ```
#![allow(non_snake_case)]
use RustedTaylor::Examples::series_examples::{LAST_EXAMPLE, series_examples};
use RustedTaylor::Utils::logger::{init_logger, save_trace_to_csv, save_trace_to_file};
use RustedTaylor::Utils::task_parser::{Job, SeriesTask};
use RustedTaylor::symbolic::series_errors::{SeriesError, SeriesResult};
use RustedTaylor::symbolic::series_expander::{ExpanderSettings, LengthPolicy, SeriesExpander};
use RustedTaylor::symbolic::series_input::{
    CombinationRequest, SeriesReport, SeriesRequest, parse_assignments,
};
use RustedTaylor::symbolic::symbolic_engine::Expr;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "rusted_taylor")]
#[command(version)]
#[command(about = "Truncated Taylor series of symbolic expressions with a trace of every term")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level: debug, info, warn, error, off
    #[arg(long, global = true, default_value = "warn")]
    loglevel: String,

    /// Mirror the log into log_<date_time>.txt
    #[arg(long, global = true)]
    log_file: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand one expression in one or several variables
    Expand {
        /// Expression, e.g. "exp(x)*sin(y)"
        expression: String,

        /// Comma-separated variables, e.g. "x, y"
        #[arg(short, long)]
        variables: String,

        /// Expansion points, e.g. "x=0; y=1"
        #[arg(short, long)]
        points: String,

        /// Truncation order
        #[arg(short, long, default_value = "5", allow_hyphen_values = true)]
        order: String,

        /// Multivariate expansion with mixed partial derivatives instead of sequential stages
        #[arg(long)]
        joint: bool,

        #[command(flatten)]
        settings: SettingsArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Expand independent functions and combine them
    Combine {
        /// Functions separated by ';', e.g. "sin(x); cos(y)"
        functions: String,

        /// Expansion points separated by ';', one per function
        points: String,

        /// Truncation order
        #[arg(short, long, default_value = "5", allow_hyphen_values = true)]
        order: String,

        /// sum, product, sum_then_product or product_then_sum
        #[arg(short, long, default_value = "sum")]
        mode: String,

        #[command(flatten)]
        settings: SettingsArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run a task document
    Task {
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run a built-in example
    Demo {
        /// Example number
        #[arg(default_value_t = 0)]
        example: usize,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// Highest accepted order
    #[arg(long, default_value_t = 50)]
    max_order: usize,

    /// Keep the accumulated series as built
    #[arg(long)]
    no_simplify: bool,

    /// Multiply out the powers of (x - a)
    #[arg(long)]
    expand: bool,

    /// Pair functions and points up to the shorter list instead of failing
    #[arg(long)]
    truncate: bool,

    /// Expansion variable of constant functions
    #[arg(long, default_value = "x")]
    default_variable: String,
}

impl SettingsArgs {
    fn settings(&self) -> ExpanderSettings {
        let policy = if self.truncate {
            LengthPolicy::Truncate
        } else {
            LengthPolicy::Reject
        };
        ExpanderSettings::default()
            .with_max_order(self.max_order)
            .with_simplify(!self.no_simplify)
            .with_expand(self.expand)
            .with_length_policy(policy)
            .with_default_variable(&self.default_variable)
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Print the trace of every term
    #[arg(long)]
    trace: bool,

    /// Print the trace as a table
    #[arg(long)]
    table: bool,

    /// Save the trace as csv
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Save the trace as a tab-separated file
    #[arg(long)]
    tsv: Option<PathBuf>,

    /// Evaluate the series (and the function) at, e.g. "x=0.1; y=0.2"
    #[arg(long)]
    at: Option<String>,
}

impl OutputArgs {
    fn finish(&self, report: SeriesReport, original: Option<&Expr>) -> SeriesResult<String> {
        let report = match &self.at {
            Some(at) => report.with_comparison(original, parse_assignments(at, "at")?)?,
            None => report,
        };
        if let Some(path) = &self.csv {
            save_trace_to_csv(&SeriesReport::HEADERS, &report.rows, path)
                .map_err(|e| write_error(path, e))?;
        }
        if let Some(path) = &self.tsv {
            save_trace_to_file(&SeriesReport::HEADERS, &report.rows, path)
                .map_err(|e| write_error(path, e))?;
        }
        Ok(report.render(self.trace || self.table, self.table))
    }
}

fn write_error(path: &Path, e: std::io::Error) -> SeriesError {
    SeriesError::Configuration(format!("cannot write {}: {}", path.display(), e))
}

fn run(cli: Cli) -> SeriesResult<String> {
    match cli.command {
        Commands::Expand {
            expression,
            variables,
            points,
            order,
            joint,
            settings,
            output,
        } => {
            init_logger(&cli.loglevel, cli.log_file)?;
            let request = SeriesRequest::from_strings(&expression, &variables, &points, &order)?;
            let expander = SeriesExpander::new(settings.settings());
            let report = if joint {
                SeriesReport::from_joint(&expression, &request.run_joint(&expander)?)
            } else {
                SeriesReport::from_multivariable(&expression, &request.run(&expander)?)
            };
            output.finish(report, Some(&request.expression))
        }
        Commands::Combine {
            functions,
            points,
            order,
            mode,
            settings,
            output,
        } => {
            init_logger(&cli.loglevel, cli.log_file)?;
            let request = CombinationRequest::from_strings(&functions, &points, &order, &mode)?;
            let expander = SeriesExpander::new(settings.settings());
            let result = request.run(&expander)?;
            let title = format!("{} of {}", request.mode, functions);
            output.finish(SeriesReport::from_expansion(&title, &result), None)
        }
        Commands::Task { file, output } => {
            let task = SeriesTask::from_file(&file)?;
            let loglevel = task.loglevel.clone().unwrap_or(cli.loglevel);
            init_logger(&loglevel, cli.log_file)?;
            let original = match &task.job {
                Job::Series { request, .. } => Some(request.expression.clone()),
                Job::Combination(_) => None,
            };
            output.finish(task.run()?, original.as_ref())
        }
        Commands::Demo { example } => {
            if example > LAST_EXAMPLE {
                return Err(SeriesError::Configuration(format!(
                    "no example number {}, choose 0..={}",
                    example, LAST_EXAMPLE
                )));
            }
            init_logger(&cli.loglevel, cli.log_file)?;
            series_examples(example)?;
            Ok(String::new())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(text) => {
            if !text.is_empty() {
                println!("{}", text);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
