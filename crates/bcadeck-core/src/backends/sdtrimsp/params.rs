use crate::core::config::validation::{IssueKind, ValidationIssue};
use crate::core::io::format::{parse_bool, parse_int, parse_number};
use phf::{Map, phf_map};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ParamType {
    Bool,
    Int,
    Float,
    Str,
}

/// Namelist variables of `tri.inp`, keyed by their lowercase name without indices.
pub(super) static TRI_INP_PARAMETERS: Map<&'static str, ParamType> = phf_map! {
    "a_mass" => ParamType::Float,
    "a_num" => ParamType::Int,
    "alpha0" => ParamType::Float,
    "case_alpha" => ParamType::Int,
    "case_diff" => ParamType::Int,
    "case_e0" => ParamType::Int,
    "case_layer_thick" => ParamType::Int,
    "case_qumax" => ParamType::Int,
    "case_tab_energ" => ParamType::Int,
    "ck_elec" => ParamType::Float,
    "deltahd" => ParamType::Float,
    "deltahf" => ParamType::Float,
    "dns0" => ParamType::Float,
    "dsf" => ParamType::Float,
    "e0" => ParamType::Float,
    "e_bulkb" => ParamType::Float,
    "e_cutoff" => ParamType::Float,
    "e_displ" => ParamType::Float,
    "e_surfb" => ParamType::Float,
    "flc" => ParamType::Float,
    "idout" => ParamType::Int,
    "idrel" => ParamType::Int,
    "iintegral" => ParamType::Int,
    "inel0" => ParamType::Int,
    "ioutput_hist" => ParamType::Int,
    "ioutput_part" => ParamType::Int,
    "ipivot" => ParamType::Int,
    "ipot" => ParamType::Int,
    "iq0" => ParamType::Int,
    "irand" => ParamType::Int,
    "irc0" => ParamType::Int,
    "isbv" => ParamType::Int,
    "isot" => ParamType::Int,
    "iwc" => ParamType::Int,
    "iwrt_thick" => ParamType::Int,
    "lenergy_distr" => ParamType::Bool,
    "lmatrices" => ParamType::Bool,
    "lmeasurement" => ParamType::Bool,
    "lmoments" => ParamType::Bool,
    "loutgas" => ParamType::Bool,
    "lpart_r_ed" => ParamType::Bool,
    "lparticle_p" => ParamType::Bool,
    "lparticle_r" => ParamType::Bool,
    "lrestart" => ParamType::Bool,
    "ltableread" => ParamType::Bool,
    "lterm_dif" => ParamType::Bool,
    "ltraj_p" => ParamType::Bool,
    "ltraj_r" => ParamType::Bool,
    "ncp" => ParamType::Int,
    "ncp_proj" => ParamType::Int,
    "nh" => ParamType::Int,
    "nm" => ParamType::Int,
    "nqx" => ParamType::Int,
    "nr_pproj" => ParamType::Int,
    "number_calc" => ParamType::Int,
    "numb_hist" => ParamType::Int,
    "qu" => ParamType::Float,
    "qubeam" => ParamType::Float,
    "qumax" => ParamType::Float,
    "symbol" => ParamType::Str,
    "tableinp" => ParamType::Str,
    "temp" => ParamType::Float,
    "text" => ParamType::Str,
    "ttarget" => ParamType::Float,
    "ttdyn" => ParamType::Float,
    "x0" => ParamType::Float,
};

fn accepts(kind: ParamType, element: &str) -> bool {
    let value = element.rsplit_once('*').map_or(element, |(_, v)| v).trim();
    match kind {
        ParamType::Bool => parse_bool(value).is_some(),
        ParamType::Int => parse_int(value).is_some(),
        ParamType::Float => parse_number(value).is_some(),
        ParamType::Str => true,
    }
}

/// Checks free-form `key = value` namelist lines.
///
/// Unknown variables are warnings since the code accepts more than the table
/// lists; syntax problems and values of the wrong type are errors.
pub(super) fn check_additional(lines: &[String]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }
        let field = format!("additional[{i}]");
        let error = |message: String| ValidationIssue::error(IssueKind::MalformedLine, &field, message);

        let Some((key, value)) = line.split_once('=').filter(|(_, v)| !v.contains('=')) else {
            issues.push(error(format!("missing or too many '=' in '{line}'")));
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        let name = key.split('(').next().unwrap_or(key).trim().to_ascii_lowercase();

        let kind = TRI_INP_PARAMETERS.get(name.as_str()).copied();
        if kind.is_none() {
            issues.push(ValidationIssue::warning(
                IssueKind::UnknownParameter,
                &field,
                format!("unknown variable '{key}'"),
            ));
        }
        if key.matches('(').count() != key.matches(')').count() {
            issues.push(error(format!("parentheses do not match in '{key}'")));
        }
        if value.is_empty() {
            issues.push(error(format!("variable '{key}' has no value")));
            continue;
        }
        if let Some(kind) = kind
            && !value.split(',').all(|element| accepts(kind, element))
        {
            issues.push(error(format!(
                "variable '{key}' has wrong type (expected {})",
                match kind {
                    ParamType::Bool => "logical",
                    ParamType::Int => "integer",
                    ParamType::Float => "real",
                    ParamType::Str => "string",
                }
            )));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::validation::Severity;

    fn check(lines: &[&str]) -> Vec<ValidationIssue> {
        check_additional(&lines.iter().map(|l| l.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn well_formed_lines_pass() {
        let issues = check(&[
            "! tuning",
            "",
            "e_cutoff = 1.5, 2.0",
            "ioutput_part(2) = 1000",
            "lmoments = .true.",
            "qumax = 2*0.5",
            "tableinp = \"../tables\"",
            "ck_elec = 1",
        ]);

        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn unknown_variable_is_a_warning() {
        let issues = check(&["foo_bar = 3"]);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::UnknownParameter);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].field, "additional[0]");
    }

    #[test]
    fn syntax_errors_are_reported_per_line() {
        let issues = check(&["nh 1000", "nh = 1 = 2", "ioutput_part(2 = 4", "flc ="]);

        assert!(issues.iter().all(|i| i.kind == IssueKind::MalformedLine && i.is_error()));
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["additional[0]", "additional[1]", "additional[2]", "additional[3]"]);
    }

    #[test]
    fn wrong_value_type_is_an_error() {
        let issues = check(&["nh = 1.5", "lmatrices = yes", "flc = abc", "inel0 = 3, x"]);

        assert_eq!(issues.len(), 4);
        assert!(issues.iter().all(|i| i.message.contains("wrong type")));
    }
}
