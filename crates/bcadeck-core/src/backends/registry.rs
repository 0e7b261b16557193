use super::sdtrimsp::{SdTrimSp, SdTrimSpVersion};
use super::tridyn::Tridyn;
use crate::core::config::options::SimulationCode;
use crate::core::io::traits::Backend;
use crate::core::result::model::SimulationResult;
use crate::error::ReportError;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;
use tracing::{debug, instrument};

static SDTRIMSP_6_01: SdTrimSp = SdTrimSp::new(SdTrimSpVersion::V6_01);
static SDTRIMSP_6_09: SdTrimSp = SdTrimSp::new(SdTrimSpVersion::V6_09);
static TRIDYN: Tridyn = Tridyn;

/// Every supported code in its default dialect, in detection order.
pub fn backends() -> [&'static dyn Backend; 2] {
    [&SDTRIMSP_6_01, &TRIDYN]
}

/// The backend for `code` in its default dialect.
pub fn backend_for(code: SimulationCode) -> &'static dyn Backend {
    backend_with_version(code, SdTrimSpVersion::default())
}

/// The backend for `code`; `version` selects the SDTrimSP dialect and is ignored
/// for other codes.
pub fn backend_with_version(code: SimulationCode, version: SdTrimSpVersion) -> &'static dyn Backend {
    match code {
        SimulationCode::SdTrimSp => match version {
            SdTrimSpVersion::V6_01 => &SDTRIMSP_6_01,
            SdTrimSpVersion::V6_09 => &SDTRIMSP_6_09,
        },
        SimulationCode::Tridyn => &TRIDYN,
    }
}

/// Parses report text with the first backend that recognizes it.
///
/// # Errors
///
/// Returns [`ReportError::UnrecognizedFormat`] without a code when no backend
/// recognizes the text.
pub fn parse_any(text: &str) -> Result<SimulationResult, ReportError> {
    parse_any_reader(&mut Cursor::new(text))
}

/// Streams a report through each backend in detection order until one
/// recognizes it, rewinding before every attempt.
///
/// Each attempt scans forward and holds one block at a time, so the report is
/// never loaded whole.
#[instrument(skip_all, name = "detect_report")]
pub fn parse_any_reader<R: BufRead + Seek>(reader: &mut R) -> Result<SimulationResult, ReportError> {
    for backend in backends() {
        reader.rewind()?;
        match backend.read_from(&mut *reader) {
            Ok(result) => {
                debug!(code = %backend.code(), "Report recognized");
                return Ok(result);
            }
            Err(ReportError::UnrecognizedFormat { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(ReportError::UnrecognizedFormat { code: None })
}

pub fn parse_any_path(path: &Path) -> Result<SimulationResult, ReportError> {
    let io_error = |source| ReportError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let mut reader = BufReader::new(file);
    parse_any_reader(&mut reader).map_err(|e| match e {
        ReportError::Read(source) => io_error(source),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TRIDYN_REPORT: &str = "
 pseudoprojectile statistics:
 irradiation condition = 1
 launched = 1.0E+03
 scattered = 1.0E+02
";

    const SDTRIMSP_REPORT: &str = "
 SPUTTERING DATA (BACKWARD)
 no backward sputtering
";

    #[test]
    fn lookup_returns_matching_backend() {
        assert_eq!(backend_for(SimulationCode::Tridyn).code(), SimulationCode::Tridyn);
        assert_eq!(backend_for(SimulationCode::SdTrimSp).label(), "SDTrimSP 6.01");
        assert_eq!(
            backend_with_version(SimulationCode::SdTrimSp, SdTrimSpVersion::V6_09).label(),
            "SDTrimSP 6.09"
        );
    }

    #[test]
    fn detection_picks_the_recognizing_parser() {
        assert_eq!(parse_any(TRIDYN_REPORT).unwrap().code(), SimulationCode::Tridyn);
        assert_eq!(parse_any(SDTRIMSP_REPORT).unwrap().code(), SimulationCode::SdTrimSp);
        assert!(matches!(
            parse_any("hello\nworld\n"),
            Err(ReportError::UnrecognizedFormat { code: None })
        ));
    }

    #[test]
    fn detection_rewinds_between_attempts() {
        let mut reader = Cursor::new(TRIDYN_REPORT.as_bytes());
        reader.set_position(TRIDYN_REPORT.len() as u64);

        let result = parse_any_reader(&mut reader).unwrap();

        assert_eq!(result.code(), SimulationCode::Tridyn);
        assert_eq!(result.component(1).unwrap().balance.incident.value(), Some(1000.0));
    }

    #[test]
    fn detection_reads_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run_out.dat");
        std::fs::write(&path, TRIDYN_REPORT).unwrap();

        let result = parse_any_path(&path).unwrap();

        assert!((result.component(1).unwrap().backscattering.value().unwrap() - 0.1).abs() < 1e-12);
        assert!(matches!(
            parse_any_path(&dir.path().join("missing.dat")),
            Err(ReportError::Io { .. })
        ));
    }
}
