use super::model::{ComponentResult, Reported, SimulationResult};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

fn cell(value: Reported) -> String {
    match value {
        Reported::Value(v) => v.to_string(),
        Reported::NotApplicable => "n/a".to_string(),
        Reported::Absent => "absent".to_string(),
        Reported::NotReported => String::new(),
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    source: &'a str,
    code: &'static str,
    title: &'a str,
    index: usize,
    symbol: &'a str,
    mass: String,
    beam_fraction: String,
    incident: String,
    reflected: String,
    reemitted: String,
    sputtered: String,
    deposited: String,
    transmitted: String,
    sputtering_yield: String,
    transmission_sputtering_yield: String,
    backscattering: String,
    energy_backscattering: String,
    transmission: String,
    projectile_nuclear_loss: String,
    projectile_electronic_loss: String,
    recoil_nuclear_loss: String,
    recoil_electronic_loss: String,
    mean_depth: String,
    depth_std_dev: String,
    depth_skewness: String,
    depth_kurtosis: String,
}

impl<'a> CsvRecord<'a> {
    fn new(source: &'a str, result: &'a SimulationResult, c: &'a ComponentResult) -> Self {
        Self {
            source,
            code: result.code().name(),
            title: result.metadata().title.as_deref().unwrap_or_default(),
            index: c.index,
            symbol: &c.symbol,
            mass: optional(c.mass),
            beam_fraction: optional(c.beam_fraction),
            incident: cell(c.balance.incident),
            reflected: cell(c.balance.reflected),
            reemitted: cell(c.balance.reemitted),
            sputtered: cell(c.balance.sputtered),
            deposited: cell(c.balance.deposited),
            transmitted: cell(c.balance.transmitted),
            sputtering_yield: cell(c.sputtering_yield),
            transmission_sputtering_yield: cell(c.transmission_sputtering_yield),
            backscattering: cell(c.backscattering),
            energy_backscattering: cell(c.energy_backscattering),
            transmission: cell(c.transmission),
            projectile_nuclear_loss: cell(c.projectile_energy_loss.nuclear),
            projectile_electronic_loss: cell(c.projectile_energy_loss.electronic),
            recoil_nuclear_loss: cell(c.recoil_energy_loss.nuclear),
            recoil_electronic_loss: cell(c.recoil_energy_loss.electronic),
            mean_depth: cell(c.implantation.mean),
            depth_std_dev: cell(c.implantation.std_dev),
            depth_skewness: cell(c.implantation.skewness),
            depth_kurtosis: cell(c.implantation.kurtosis),
        }
    }
}

/// Writes one CSV row per component of every labelled result.
///
/// Missing values are written as empty cells, placeholders as `n/a` and
/// terminal absences as `absent`.
pub fn write_csv<W: Write>(
    results: &[(&str, &SimulationResult)],
    writer: W,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (source, result) in results {
        for component in result.components() {
            csv_writer.serialize(CsvRecord::new(source, result, component))?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_csv(path: &Path, results: &[(&str, &SimulationResult)]) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    write_csv(results, file).map_err(|e| ExportError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::options::SimulationCode;
    use crate::core::result::model::ResultBuilder;
    use tempfile::tempdir;

    fn sample() -> SimulationResult {
        let mut builder = ResultBuilder::new(SimulationCode::SdTrimSp);
        builder.metadata_mut().title = Some("W on WO".to_string());
        let o = builder.component_mut(1);
        o.symbol = "O".to_string();
        o.sputtering_yield = Reported::Value(0.3153);
        o.transmission = Reported::Absent;
        let w = builder.component_mut(2);
        w.symbol = "W".to_string();
        w.sputtering_yield = Reported::NotApplicable;
        builder.finish()
    }

    #[test]
    fn csv_has_header_and_one_row_per_component() {
        let result = sample();
        let mut buffer = Vec::new();

        write_csv(&[("run1", &result)], &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("source,code,title,index,symbol,mass"));
        assert!(lines[1].starts_with("run1,SDTrimSP,W on WO,1,O,,"));
        assert!(lines[1].contains(",0.3153,"));
        assert!(lines[1].contains(",absent,"));
        assert!(lines[2].contains(",n/a,"));
    }

    #[test]
    fn export_writes_file() {
        let result = sample();
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");

        export_csv(&path, &[("run1", &result)]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 2);
    }
}
