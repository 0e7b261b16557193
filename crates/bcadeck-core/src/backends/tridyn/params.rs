use crate::core::config::validation::{IssueKind, ValidationIssue};
use crate::core::io::format::{parse_int, parse_number};
use phf::{Map, phf_map};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Arg {
    Int,
    Float,
}

impl Arg {
    fn accepts(self, token: &str) -> bool {
        match self {
            Arg::Int => parse_int(token).is_some(),
            Arg::Float => parse_number(token).is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Signature {
    /// A bare flag without arguments.
    Flag,
    /// Free text.
    Text,
    Scalar(Arg),
    /// A fixed number of typed arguments.
    List(&'static [Arg]),
}

use Arg::{Float, Int};

/// Keys of the TRIDYN input and the arguments each takes.
pub(super) static INPUT_KEYS: Map<&'static str, Signature> = phf_map! {
    "cdat" => Signature::List(&[Int, Float, Int]),
    "geom" => Signature::List(&[Float, Int, Float]),
    "atda" => Signature::Text,
    "comp" => Signature::Text,
    "irra" => Signature::List(&[Int, Float, Float, Float]),
    "thrd" => Signature::Scalar(Int),
    "pspr" => Signature::Scalar(Int),
    "irrd" => Signature::List(&[Int, Float, Float]),
    "angd" => Signature::List(&[Int, Int, Float, Float, Float]),
    "coll" => Signature::List(&[Int, Float]),
    "rcsp" => Signature::Scalar(Int),
    "damg" => Signature::Scalar(Float),
    "cmpd" => Signature::Text,
    "mass" => Signature::List(&[Int, Float]),
    "edsp" => Signature::List(&[Int, Float]),
    "edsc" => Signature::Text,
    "elst" => Signature::Scalar(Int),
    "elsc" => Signature::List(&[Int, Float]),
    "efin" => Signature::List(&[Int, Float]),
    "elbk" => Signature::List(&[Int, Float]),
    "dens" => Signature::List(&[Int, Float]),
    "sbem" => Signature::Text,
    "sbei" => Signature::List(&[Int, Int, Float]),
    "sbes" => Signature::Scalar(Float),
    "sbec" => Signature::Scalar(Float),
    "relx" => Signature::Scalar(Float),
    "exst" => Signature::List(&[Int, Float, Int, Int]),
    "qmxv" => Signature::Text,
    "prec" => Signature::Scalar(Float),
    "fout" => Signature::List(&[Int, Int, Int]),
    "outp" => Signature::Flag,
    "lout" => Signature::Text,
    "outi" => Signature::Text,
    "dsrf" => Signature::Scalar(Float),
    "mixg" => Signature::Flag,
    "edep" => Signature::Flag,
    "outl" => Signature::Text,
    "sclm" => Signature::Text,
    "rand" => Signature::Scalar(Int),
};

/// Whether a line is a row of a numeric matrix such as the one following `sbem`.
pub(super) fn is_numeric_row(line: &str) -> bool {
    line.split_whitespace().next().is_some_and(|t| parse_number(t).is_some())
}

/// Checks free-form `key args...` lines.
///
/// Every problem is an error: TRIDYN aborts on keys it does not know.
pub(super) fn check_additional(lines: &[String]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut in_matrix = false;
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let field = format!("additional[{i}]");
        let error = |kind: IssueKind, message: String| ValidationIssue::error(kind, &field, message);

        if line.contains('=') {
            issues.push(error(IssueKind::MalformedLine, format!("'=' is not allowed in '{line}'")));
            continue;
        }
        if in_matrix && is_numeric_row(line) {
            continue;
        }
        in_matrix = false;

        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = tokens.collect();
        let Some(signature) = INPUT_KEYS.get(key.as_str()) else {
            issues.push(error(IssueKind::UnknownParameter, format!("unknown key '{key}'")));
            continue;
        };
        if key == "sbem" {
            in_matrix = true;
        }
        let problem = match signature {
            Signature::Flag if !args.is_empty() => Some("takes no arguments".to_string()),
            Signature::Flag | Signature::Text => None,
            Signature::Scalar(arg) => match args.as_slice() {
                [value] if arg.accepts(value) => None,
                _ => Some(format!("expects one {} argument", describe(*arg))),
            },
            Signature::List(expected) => {
                if args.len() != expected.len() {
                    Some(format!("expects {} arguments, found {}", expected.len(), args.len()))
                } else {
                    expected
                        .iter()
                        .zip(&args)
                        .position(|(arg, value)| !arg.accepts(value))
                        .map(|pos| {
                            format!(
                                "argument {} '{}' is not {}",
                                pos + 1,
                                args[pos],
                                describe(expected[pos])
                            )
                        })
                }
            }
        };
        if let Some(problem) = problem {
            issues.push(error(IssueKind::MalformedLine, format!("'{key}' {problem}")));
        }
    }
    issues
}

fn describe(arg: Arg) -> &'static str {
    match arg {
        Arg::Int => "an integer",
        Arg::Float => "a number",
    }
}
