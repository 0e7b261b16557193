use super::model::Configuration;
use super::options::{AngleMode, KineticEnergyMode};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Allowed deviation of an abundance sum from 1.0.
pub const ABUNDANCE_TOLERANCE: f64 = 1e-6;

const THICKNESS_RELATIVE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingBeam,
    MissingTarget,
    BeamAbundanceSum,
    TargetAbundanceSum,
    MaxFractionRange,
    IndexNotUnique,
    IndexNotContiguous,
    EnergyRange,
    AngleRange,
    LayerLength,
    LayerAbundanceSum,
    LayerAboveMaxFraction,
    LayerThickness,
    LayerSegments,
    ThicknessMismatch,
    SegmentMismatch,
    UnknownParameter,
    MalformedLine,
}

/// A single finding of [`validate`], pointing at the offending field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Path of the offending value, e.g. `structure[1].abundances`.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(kind: IssueKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{level}] {}: {}", self.field, self.message)
    }
}

pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}

/// Checks a configuration against the structural invariants every backend relies on.
///
/// The check is pure. Range problems of beam energy and angle are errors only when
/// the corresponding beam mode uses the per-row value directly.
pub fn validate(config: &Configuration) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_presence(config, &mut issues);
    check_section_sums(config, &mut issues);
    check_indices(config, &mut issues);
    check_beam_ranges(config, &mut issues);
    check_structure(config, &mut issues);
    issues
}

fn check_presence(config: &Configuration, issues: &mut Vec<ValidationIssue>) {
    if config.beam_rows.is_empty() {
        issues.push(ValidationIssue::error(
            IssueKind::MissingBeam,
            "beam_rows",
            "at least one beam row is required",
        ));
    }
    if config.target_rows.is_empty() {
        issues.push(ValidationIssue::error(
            IssueKind::MissingTarget,
            "target_rows",
            "at least one target row is required",
        ));
    }
}

fn check_section_sums(config: &Configuration, issues: &mut Vec<ValidationIssue>) {
    let sections = [
        ("beam_rows", &config.beam_rows, IssueKind::BeamAbundanceSum),
        ("target_rows", &config.target_rows, IssueKind::TargetAbundanceSum),
    ];
    for (name, rows, kind) in sections {
        if rows.is_empty() {
            continue;
        }
        let sum: f64 = rows.iter().map(|r| r.abundance).sum();
        if (sum - 1.0).abs() > ABUNDANCE_TOLERANCE {
            issues.push(ValidationIssue::error(
                kind,
                name,
                format!("abundances sum to {sum}, expected 1.0"),
            ));
        }
        for (i, row) in rows.iter().enumerate() {
            if !(0.0..=1.0).contains(&row.max_atomic_fraction) {
                issues.push(ValidationIssue::error(
                    IssueKind::MaxFractionRange,
                    format!("{name}[{i}].max_atomic_fraction"),
                    format!("{} is outside [0, 1]", row.max_atomic_fraction),
                ));
            }
        }
    }
}

fn check_indices(config: &Configuration, issues: &mut Vec<ValidationIssue>) {
    let mut seen = BTreeSet::new();
    for row in config.rows() {
        if !seen.insert(row.index) {
            issues.push(ValidationIssue::error(
                IssueKind::IndexNotUnique,
                format!("rows[index={}]", row.index),
                format!("index {} is used by more than one row", row.index),
            ));
        }
    }
    let expected: BTreeSet<usize> = (1..=seen.len()).collect();
    if seen != expected {
        issues.push(ValidationIssue::error(
            IssueKind::IndexNotContiguous,
            "rows",
            "row indices must be contiguous starting at 1",
        ));
    }
}

fn check_beam_ranges(config: &Configuration, issues: &mut Vec<ValidationIssue>) {
    let energy_strict = config.beam_arguments.kinetic_energy_mode == KineticEnergyMode::Fixed;
    let angle_strict = config.beam_arguments.angle_mode == AngleMode::Fixed;
    let severity_issue = |strict: bool, kind, field: String, message: String| {
        if strict {
            ValidationIssue::error(kind, field, message)
        } else {
            ValidationIssue::warning(kind, field, message)
        }
    };

    for (i, row) in config.beam_rows.iter().enumerate() {
        let energy = row.energy.unwrap_or(0.0);
        if !(energy >= 0.0) {
            issues.push(severity_issue(
                energy_strict,
                IssueKind::EnergyRange,
                format!("beam_rows[{i}].energy"),
                format!("energy {energy} must not be negative"),
            ));
        }
        let angle = row.angle.unwrap_or(0.0);
        if !(0.0..90.0).contains(&angle) {
            issues.push(severity_issue(
                angle_strict,
                IssueKind::AngleRange,
                format!("beam_rows[{i}].angle"),
                format!("angle {angle} is outside [0, 90)"),
            ));
        }
    }
}

fn check_structure(config: &Configuration, issues: &mut Vec<ValidationIssue>) {
    let targets = config.target_rows.len();
    for (i, layer) in config.structure.iter().enumerate() {
        let field = format!("structure[{i}]");
        if !(layer.thickness > 0.0) {
            issues.push(ValidationIssue::error(
                IssueKind::LayerThickness,
                format!("{field}.thickness"),
                format!("layer '{}' must have a positive thickness", layer.name),
            ));
        }
        if layer.segments == 0 {
            issues.push(ValidationIssue::error(
                IssueKind::LayerSegments,
                format!("{field}.segments"),
                format!("layer '{}' must have at least one segment", layer.name),
            ));
        }
        if layer.abundances.len() != targets {
            issues.push(ValidationIssue::error(
                IssueKind::LayerLength,
                format!("{field}.abundances"),
                format!(
                    "layer '{}' has {} abundances for {targets} target rows",
                    layer.name,
                    layer.abundances.len()
                ),
            ));
            continue;
        }
        let sum: f64 = layer.abundances.iter().sum();
        if sum > 1.0 + ABUNDANCE_TOLERANCE {
            issues.push(ValidationIssue::error(
                IssueKind::LayerAbundanceSum,
                format!("{field}.abundances"),
                format!("layer '{}' abundances sum to {sum}", layer.name),
            ));
        }
        for (j, (value, row)) in layer.abundances.iter().zip(&config.target_rows).enumerate() {
            if *value > row.max_atomic_fraction + ABUNDANCE_TOLERANCE {
                issues.push(ValidationIssue::warning(
                    IssueKind::LayerAboveMaxFraction,
                    format!("{field}.abundances[{j}]"),
                    format!(
                        "{} abundance {value} exceeds its maximum atomic fraction {}",
                        row.symbol, row.max_atomic_fraction
                    ),
                ));
            }
        }
    }

    let declared = config.target_arguments.thickness;
    let total = config.layer_thickness_sum();
    if (total - declared).abs() > THICKNESS_RELATIVE_TOLERANCE * declared.abs().max(1.0) {
        issues.push(ValidationIssue::error(
            IssueKind::ThicknessMismatch,
            "target_arguments.thickness",
            format!("layers add up to {total}, target declares {declared}"),
        ));
    }
    let segments = config.layer_segment_sum();
    if segments != u64::from(config.target_arguments.segments) {
        issues.push(ValidationIssue::error(
            IssueKind::SegmentMismatch,
            "target_arguments.segments",
            format!(
                "layers add up to {segments} segments, target declares {}",
                config.target_arguments.segments
            ),
        ));
    }
}
