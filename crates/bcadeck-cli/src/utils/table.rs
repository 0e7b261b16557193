use bcadeck::SimulationResult;
use bcadeck::core::elements::element::ElementData;
use bcadeck::core::result::compare::{Comparison, Delta};
use bcadeck::core::result::model::Reported;
use std::fmt::Write;

fn cell(value: Reported, precision: usize) -> String {
    match value {
        Reported::Value(v) => format!("{v:.precision$}"),
        Reported::NotApplicable => "n/a".to_string(),
        Reported::Absent => "absent".to_string(),
        Reported::NotReported => "-".to_string(),
    }
}

fn delta(value: Delta, precision: usize) -> String {
    let change = value
        .relative()
        .map(|r| format!("{:+.1}%", r * 100.0))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>12} {:>12} {:>9}",
        cell(value.left, precision),
        cell(value.right, precision),
        change
    )
}

/// Summary of one parsed report: a header line and one row per component.
pub fn result_table(label: &str, result: &SimulationResult, precision: usize) -> String {
    let meta = result.metadata();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{label} [{}{}] {}",
        meta.code,
        meta.version.as_deref().map(|v| format!(" {v}")).unwrap_or_default(),
        meta.title.as_deref().unwrap_or("")
    );
    let _ = writeln!(
        out,
        "  {:<4} {:>12} {:>12} {:>12} {:>12}",
        "", "yield", "reflection", "transmission", "mean depth"
    );
    for component in result.components() {
        let _ = writeln!(
            out,
            "  {:<4} {:>12} {:>12} {:>12} {:>12}",
            component.symbol,
            cell(component.sputtering_yield, precision),
            cell(component.backscattering, precision),
            cell(component.transmission, precision),
            cell(component.implantation.mean, precision),
        );
    }
    let _ = writeln!(
        out,
        "  {:<4} {:>12} {:>12}",
        "sum",
        cell(result.total_sputtering_yield(), precision),
        cell(result.total_backscattering(), precision)
    );
    for issue in result.issues() {
        let _ = writeln!(out, "  ! {} (line {}): {}", issue.block, issue.line, issue.details);
    }
    out
}

pub fn comparison_table(comparison: &Comparison, precision: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} {:>12} {:>12} {:>9}", "", "left", "right", "change");
    for species in &comparison.species {
        let rows = [
            ("yield", species.sputtering_yield),
            ("reflection", species.backscattering),
            ("transmission", species.transmission),
            ("mean depth", species.mean_depth),
        ];
        for (name, value) in rows {
            let _ = writeln!(
                out,
                "{:<16} {}",
                format!("{} {name}", species.symbol),
                delta(value, precision)
            );
        }
    }
    let _ = writeln!(
        out,
        "{:<16} {}",
        "total yield",
        delta(comparison.total_sputtering_yield, precision)
    );
    let _ = writeln!(
        out,
        "{:<16} {}",
        "total reflection",
        delta(comparison.total_backscattering, precision)
    );
    out
}

pub fn element_table<'a>(
    elements: impl IntoIterator<Item = &'a ElementData>,
    locales: &str,
    precision: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:>4} {:<24} {:>12} {:>12} {:>10}",
        "", "Z", "name", "mass [amu]", "dens [1/Å³]", "SBE [eV]"
    );
    for element in elements {
        let _ = writeln!(
            out,
            "{:<4} {:>4} {:<24} {:>12.precision$} {:>12.precision$} {:>10.precision$}",
            element.symbol,
            element.atomic_number,
            element.display_name(locales),
            element.atomic_mass,
            element.atomic_density,
            element.surface_binding_energy,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcadeck::ElementCatalog;

    const REPORT: &str = "
 pseudoprojectile statistics:
 irradiation condition = 1
 launched = 1.0E+03
 scattered = 2.5E+02
";

    #[test]
    fn markers_are_rendered_as_text() {
        assert_eq!(cell(Reported::Value(0.123456), 3), "0.123");
        assert_eq!(cell(Reported::NotApplicable, 3), "n/a");
        assert_eq!(cell(Reported::Absent, 3), "absent");
        assert_eq!(cell(Reported::NotReported, 3), "-");
    }

    #[test]
    fn result_table_lists_components() {
        let result = bcadeck::parse_any(REPORT).unwrap();

        let table = result_table("run_out.dat", &result, 2);

        assert!(table.starts_with("run_out.dat [TRIDYN"));
        assert!(table.contains("0.25"));
        assert!(table.lines().any(|l| l.trim_start().starts_with("sum")));
    }

    #[test]
    fn comparison_shows_relative_change() {
        let left = bcadeck::parse_any(REPORT).unwrap();
        let right = bcadeck::parse_any(&REPORT.replace("2.5E+02", "5.0E+02")).unwrap();
        let comparison = bcadeck::core::result::compare::compare(&left, &right);

        let table = comparison_table(&comparison, 2);

        assert!(table.contains("+100.0%"));
    }

    #[test]
    fn element_table_uses_requested_locales() {
        let catalog = ElementCatalog::builtin().unwrap();

        let table = element_table(catalog.matching("W"), "en", 3);

        assert!(table.lines().any(|l| l.starts_with("W ")));
    }
}
