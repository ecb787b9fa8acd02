// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Task documents: plain text with sections like
//!
//! ```text
//! series
//! expression: exp(x) * sin(y)
//! variables: x, y
//! points: x=0, y=0
//! order: 3
//! joint: false
//!
//! settings
//! max_order: 20
//! loglevel: info
//! ```
//!
//! A title line opens a section, each `key: value, value` line adds a list of values.
//! Lines starting with `//`, `#`, `%` or `;` are comments. A document holds exactly one
//! `series` or `combination` section and optionally a `settings` section.
use crate::symbolic::series_errors::{ParseFailure, SeriesError, SeriesResult};
use crate::symbolic::series_expander::{ExpanderSettings, LengthPolicy, SeriesExpander};
use crate::symbolic::series_input::{CombinationRequest, SeriesReport, SeriesRequest};
use itertools::Itertools;
use log::info;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

type SectionMap = HashMap<String, Vec<Value>>;
type DocumentMap = HashMap<String, SectionMap>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// identifier: letter or underscore, then letters, digits, underscores
fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        String::from,
    )
    .parse(input)
}

/// Parses a title; trailing whitespace and newlines are dropped
fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = identifier(input)?;
    Ok((input.trim(), result))
}

fn parse_key(input: &str) -> IResult<&str, String> {
    identifier(input)
}

/// A single value runs up to the next comma or line end, so it may contain spaces
/// (`exp(x) * y`) and semicolons.
fn parse_value(input: &str) -> IResult<&str, Value> {
    let (input, raw) = take_while1(|c: char| !matches!(c, ',' | '\n' | '\r')).parse(input)?;
    let s = raw.trim();
    let value = if let Ok(val) = s.parse::<i64>() {
        Value::Integer(val)
    } else if let Ok(val) = s.parse::<f64>() {
        Value::Float(val)
    } else if let Ok(val) = s.parse::<bool>() {
        Value::Boolean(val)
    } else {
        Value::String(s.to_string())
    };
    Ok((input, value))
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let separator_coma = delimited(space0, tag(","), space0);
    separated_list0(separator_coma, parse_value).parse(input)
}

/// Parses a key-value pair where value is a list
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let (input, result) =
        separated_pair(parse_key, colon_separator, parse_value_list).parse(input)?;
    Ok((input.trim(), result))
}

/// Parses a section with a title and one or more key-value pairs
fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let (input, pairs) = many1(terminated(parse_key_value_pair, space0)).parse(input)?;
    Ok((input, (title, pairs.into_iter().collect())))
}

/// Filters out comment lines (starting with //, #, %, or ;) and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

fn document_error(message: String) -> SeriesError {
    SeriesError::parsing("document", ParseFailure::Document(message))
}

/// Parses a whole document (comments removed first) into sections.
///
/// # Errors
/// `InputParsing` with field `document` on a syntax error, on unparsed trailing text, on
/// a repeated section title and on a number that is not finite (`inf`, `NaN`, `1e400`).
pub fn parse_document(input: &str) -> SeriesResult<DocumentMap> {
    let filtered = filter_comments(input);
    let mut parser = many1(delimited(space0, parse_section, multispace0));
    let (remaining, sections) = parser
        .parse(filtered.as_str())
        .map_err(|e| document_error(format!("{:?}", e)))?;
    if !remaining.trim().is_empty() {
        return Err(document_error(format!(
            "failed to parse entire document, remaining: '{}'",
            remaining
        )));
    }
    let mut result = HashMap::new();
    for (title, section) in sections {
        for (key, values) in &section {
            if let Some(value) = values
                .iter()
                .find(|v| matches!(v, Value::Float(f) if !f.is_finite()))
            {
                return Err(SeriesError::parsing(
                    "document",
                    ParseFailure::NonFinite(format!("{}.{} = {}", title, key, value)),
                ));
            }
        }
        if result.insert(title.clone(), section).is_some() {
            return Err(document_error(format!("section '{}' appears twice", title)));
        }
    }
    Ok(result)
}

/// What a task document asks to compute.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Series { request: SeriesRequest, joint: bool },
    Combination(CombinationRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTask {
    pub job: Job,
    pub settings: ExpanderSettings,
    pub loglevel: Option<String>,
}

impl SeriesTask {
    pub fn parse(input: &str) -> SeriesResult<Self> {
        let mut document = parse_document(input)?;
        if let Some(title) = document
            .keys()
            .find(|t| !matches!(t.as_str(), "series" | "combination" | "settings"))
        {
            return Err(document_error(format!("unknown section '{}'", title)));
        }
        let (settings, loglevel) = match document.remove("settings") {
            Some(section) => parse_settings(section)?,
            None => (ExpanderSettings::default(), None),
        };
        let job = match (document.remove("series"), document.remove("combination")) {
            (Some(section), None) => parse_series_section(section)?,
            (None, Some(section)) => parse_combination_section(section)?,
            (Some(_), Some(_)) => {
                return Err(document_error(
                    "a task holds either a series or a combination section, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(document_error(
                    "no series or combination section".to_string(),
                ));
            }
        };
        Ok(Self {
            job,
            settings,
            loglevel,
        })
    }

    pub fn from_file(path: &Path) -> SeriesResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SeriesError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        info!("task loaded from {}", path.display());
        Self::parse(&content)
    }

    pub fn run(&self) -> SeriesResult<SeriesReport> {
        let expander = SeriesExpander::new(self.settings.clone());
        match &self.job {
            Job::Series {
                request,
                joint: true,
            } => {
                let result = request.run_joint(&expander)?;
                Ok(SeriesReport::from_joint(&request.expression.to_string(), &result))
            }
            Job::Series {
                request,
                joint: false,
            } => {
                let result = request.run(&expander)?;
                Ok(SeriesReport::from_multivariable(
                    &request.expression.to_string(),
                    &result,
                ))
            }
            Job::Combination(request) => {
                let result = request.run(&expander)?;
                let title = format!("{} of {}", request.mode, request.functions.iter().join(", "));
                Ok(SeriesReport::from_expansion(&title, &result))
            }
        }
    }
}

/// Pops `key` from the section as one text, values joined with `separator`.
fn take_joined(
    section: &mut SectionMap,
    title: &str,
    key: &str,
    separator: &str,
) -> SeriesResult<String> {
    section
        .remove(key)
        .map(|values| values.iter().join(separator))
        .ok_or_else(|| document_error(format!("section '{}' has no key '{}'", title, key)))
}

fn reject_unknown_keys(section: &SectionMap, title: &str) -> SeriesResult<()> {
    match section.keys().next() {
        Some(key) => Err(document_error(format!(
            "unknown key '{}' in section '{}'",
            key, title
        ))),
        None => Ok(()),
    }
}

fn parse_series_section(mut section: SectionMap) -> SeriesResult<Job> {
    let expression = take_joined(&mut section, "series", "expression", ", ")?;
    let variables = take_joined(&mut section, "series", "variables", ",")?;
    let points = take_joined(&mut section, "series", "points", ";")?;
    let order = take_joined(&mut section, "series", "order", ",")?;
    let joint = match section.remove("joint") {
        None => false,
        Some(values) => single(&values)
            .and_then(Value::as_boolean)
            .ok_or_else(|| document_error("joint must be true or false".to_string()))?,
    };
    reject_unknown_keys(&section, "series")?;
    let request = SeriesRequest::from_strings(&expression, &variables, &points, &order)?;
    Ok(Job::Series { request, joint })
}

fn parse_combination_section(mut section: SectionMap) -> SeriesResult<Job> {
    let functions = take_joined(&mut section, "combination", "functions", ";")?;
    let points = take_joined(&mut section, "combination", "points", ";")?;
    let order = take_joined(&mut section, "combination", "order", ",")?;
    let mode = match section.remove("mode") {
        Some(values) => values.iter().join(","),
        None => "sum".to_string(),
    };
    reject_unknown_keys(&section, "combination")?;
    Ok(Job::Combination(CombinationRequest::from_strings(
        &functions, &points, &order, &mode,
    )?))
}

fn single(values: &[Value]) -> Option<&Value> {
    match values {
        [value] => Some(value),
        _ => None,
    }
}

fn setting_error(key: &str, values: &[Value], expected: &str) -> SeriesError {
    SeriesError::Configuration(format!(
        "setting {} = '{}': expected {}",
        key,
        values.iter().join(", "),
        expected
    ))
}

fn parse_settings(section: SectionMap) -> SeriesResult<(ExpanderSettings, Option<String>)> {
    let mut settings = ExpanderSettings::default();
    let mut loglevel = None;
    for (key, values) in section.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        let value = single(values);
        match key.as_str() {
            "max_order" => {
                let max = value
                    .and_then(Value::as_integer)
                    .and_then(|m| usize::try_from(m).ok())
                    .ok_or_else(|| setting_error(key, values, "a non-negative integer"))?;
                settings = settings.with_max_order(max);
            }
            "simplify" => {
                let flag = value
                    .and_then(Value::as_boolean)
                    .ok_or_else(|| setting_error(key, values, "true or false"))?;
                settings = settings.with_simplify(flag);
            }
            "expand" => {
                let flag = value
                    .and_then(Value::as_boolean)
                    .ok_or_else(|| setting_error(key, values, "true or false"))?;
                settings = settings.with_expand(flag);
            }
            "length_policy" => {
                let policy = value
                    .and_then(|v| LengthPolicy::from_str(&v.to_string()).ok())
                    .ok_or_else(|| setting_error(key, values, "reject or truncate"))?;
                settings = settings.with_length_policy(policy);
            }
            "default_variable" => {
                let name = value
                    .map(|v| v.to_string())
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| setting_error(key, values, "a variable name"))?;
                settings = settings.with_default_variable(&name);
            }
            "loglevel" => {
                loglevel = Some(
                    value
                        .map(|v| v.to_string())
                        .ok_or_else(|| setting_error(key, values, "a log level"))?,
                );
            }
            other => {
                return Err(SeriesError::Configuration(format!(
                    "unknown setting '{}'",
                    other
                )));
            }
        }
    }
    Ok((settings, loglevel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::series_expander::{CombineMode, ExpansionPoint};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("title1\n key1: value1").unwrap();
        assert_eq!(title, "title1");
        assert_eq!(remaining, "key1: value1");

        let (remaining, title) = parse_title("title_with_underscore key1: value1").unwrap();
        assert_eq!(title, "title_with_underscore");
        assert_eq!(remaining, "key1: value1");
    }

    #[test]
    fn test_parse_key() {
        let (remaining, key) = parse_key("max_order: 10").unwrap();
        assert_eq!(key, "max_order");
        assert_eq!(remaining, ": 10");
        assert!(parse_key("1key: value").is_err());
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("exp(x) * y, next").unwrap();
        assert_eq!(value, Value::String("exp(x) * y".to_string()));
        assert_eq!(remaining, ", next");

        let (remaining, value) = parse_value("123\nnext: 1").unwrap();
        assert_eq!(value, Value::Integer(123));
        assert_eq!(remaining, "\nnext: 1");

        let (_, value) = parse_value("0.25").unwrap();
        assert_eq!(value, Value::Float(0.25));
        let (_, value) = parse_value("true").unwrap();
        assert_eq!(value, Value::Boolean(true));
    }

    #[test]
    fn test_parse_value_list() {
        let (remaining, values) = parse_value_list("x=0, 123, 45.67, true").unwrap();
        assert_eq!(
            values,
            vec![
                Value::String("x=0".to_string()),
                Value::Integer(123),
                Value::Float(45.67),
                Value::Boolean(true)
            ]
        );
        assert_eq!(remaining, "");

        let (remaining, values) = parse_value_list("").unwrap();
        assert_eq!(values, Vec::<Value>::new());
        assert_eq!(remaining, "");
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) =
            parse_key_value_pair("variables: x, y\norder: 2").unwrap();
        assert_eq!(key, "variables");
        assert_eq!(
            values,
            vec![Value::String("x".to_string()), Value::String("y".to_string())]
        );
        assert_eq!(remaining, "order: 2");
    }

    #[test]
    fn test_parse_section() {
        let (remaining, (title, section)) =
            parse_section("series\nexpression: sin(x)\norder: 3\nsettings\nexpand: true").unwrap();
        assert_eq!(title, "series");
        assert_eq!(section.len(), 2);
        assert_eq!(section["order"], vec![Value::Integer(3)]);
        assert_eq!(remaining, "settings\nexpand: true");
    }

    #[test]
    fn test_filter_comments() {
        let filtered = filter_comments("// head\nseries\n# note\n  % other\n; more\n\norder: 1");
        assert_eq!(filtered, "series\norder: 1");
    }

    #[test]
    fn test_parse_document_errors() {
        assert!(parse_document("").is_err());
        assert!(parse_document("series\norder: 1\nseries\norder: 2").is_err());
        assert!(matches!(
            parse_document("series\norder: 1\n: stray"),
            Err(SeriesError::InputParsing { field: "document", .. })
        ));
    }

    #[test]
    fn test_series_task() {
        let input = r#"
        // expansion of a product around the origin
        series
          expression: exp(x) * sin(y)
          variables: x, y
          points: x=0, y=0.5
          order: 2
        settings
          max_order: 10
          expand: true
          loglevel: warn
        "#;
        let task = SeriesTask::parse(input).unwrap();
        assert_eq!(task.settings.max_order, 10);
        assert!(task.settings.expand);
        assert_eq!(task.loglevel.as_deref(), Some("warn"));
        match &task.job {
            Job::Series { request, joint } => {
                assert!(!joint);
                assert_eq!(request.order, 2);
                assert_eq!(request.points[1], ExpansionPoint::new("y", 0.5));
                assert_eq!(request.expression.to_string(), "exp(x) * sin(y)");
            }
            other => panic!("unexpected job {:?}", other),
        }
        let report = task.run().unwrap();
        assert_eq!(report.rows.len(), 6);
    }

    #[test]
    fn test_combination_task() {
        let input = "combination\nfunctions: sin(x), exp(y), x^2\npoints: 0, 0\norder: 3\nmode: sum_then_product\nsettings\nlength_policy: truncate";
        let task = SeriesTask::parse(input).unwrap();
        assert_eq!(task.settings.length_policy, LengthPolicy::Truncate);
        match &task.job {
            Job::Combination(request) => {
                assert_eq!(request.mode, CombineMode::SumThenProduct);
                assert_eq!(request.functions.len(), 3);
                assert_eq!(request.points, vec![0.0, 0.0]);
            }
            other => panic!("unexpected job {:?}", other),
        }
        // truncated to sin(x), exp(y): sin(x) expansion times exp(y) expansion
        let report = task.run().unwrap();
        assert_eq!(report.rows.len(), 8);
    }

    #[test]
    fn test_task_errors() {
        let missing = "series\nexpression: x\nvariables: x\norder: 1";
        assert!(matches!(
            SeriesTask::parse(missing),
            Err(SeriesError::InputParsing { field: "document", .. })
        ));
        let unknown_section = "series\nexpression: x\nvariables: x\npoints: x=0\norder: 1\nplots\nwidth: 3";
        assert!(SeriesTask::parse(unknown_section).is_err());
        let bad_setting = "series\nexpression: x\nvariables: x\npoints: x=0\norder: 1\nsettings\nmax_order: -3";
        assert!(matches!(
            SeriesTask::parse(bad_setting),
            Err(SeriesError::Configuration(_))
        ));
        let unknown_setting = "series\nexpression: x\nvariables: x\npoints: x=0\norder: 1\nsettings\ncolor: red";
        assert!(matches!(
            SeriesTask::parse(unknown_setting),
            Err(SeriesError::Configuration(_))
        ));
        let bad_expression = "series\nexpression: sin(x\nvariables: x\npoints: x=0\norder: 1";
        assert!(matches!(
            SeriesTask::parse(bad_expression),
            Err(SeriesError::InputParsing { field: "expression", .. })
        ));
    }

    #[test]
    fn test_non_finite_values_in_document() {
        for points in ["0, inf", "NaN", "1e400, 0"] {
            let input = format!("combination\nfunctions: sin(x), cos(x)\npoints: {}\norder: 2", points);
            match SeriesTask::parse(&input) {
                Err(SeriesError::InputParsing { field: "document", cause: ParseFailure::NonFinite(_) }) => {}
                other => panic!("points {} should be rejected, got {:?}", points, other),
            }
        }
        let input = "series\nexpression: sin(x)\nvariables: x\npoints: x=-inf\norder: 2";
        assert!(matches!(
            SeriesTask::parse(input),
            Err(SeriesError::InputParsing { field: "points", cause: ParseFailure::NonFinite(_) })
        ));
    }

    #[test]
    fn test_task_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("task.txt");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "# joint expansion").unwrap();
        writeln!(file, "series").unwrap();
        writeln!(file, "  expression: exp(x + y)").unwrap();
        writeln!(file, "  variables: x, y").unwrap();
        writeln!(file, "  points: x=0, y=0").unwrap();
        writeln!(file, "  order: 2").unwrap();
        writeln!(file, "  joint: true").unwrap();
        drop(file);

        let task = SeriesTask::from_file(&file_path).unwrap();
        let report = task.run().unwrap();
        assert_eq!(report.rows.len(), 6);
        assert!(SeriesTask::from_file(&dir.path().join("missing.txt")).is_err());
    }
}
