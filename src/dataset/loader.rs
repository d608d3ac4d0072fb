//! CSV loading with encoding handling and header validation.

use crate::config::{DataConfig, SourceEncoding};
use crate::error::DashboardError;
use crate::models::{Dataset, TicketRecord, Weight};
use csv::StringRecord;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const COL_AREA: &str = "area";
pub const COL_LABEL: &str = "LABEL";
pub const COL_CATEGORY: &str = "CATEGORIA";
pub const COL_CREATED: &str = "Fecha_de_creacion";
pub const COL_WEIGHT: &str = "count-area";

/// Options for loading a dataset.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Whether to show a spinner while reading.
    pub show_progress: bool,
}

/// Positions of the required columns within a record.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    area: usize,
    label: usize,
    category: usize,
    created: usize,
    weight: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self, DashboardError> {
        // A repeated header name resolves to its first column.
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            by_name.entry(name.trim()).or_insert(idx);
        }

        let find = |column: &'static str| {
            by_name
                .get(column)
                .copied()
                .ok_or_else(|| DashboardError::MissingColumn {
                    path: path.to_path_buf(),
                    column,
                })
        };

        Ok(Self {
            area: find(COL_AREA)?,
            label: find(COL_LABEL)?,
            category: find(COL_CATEGORY)?,
            created: find(COL_CREATED)?,
            weight: find(COL_WEIGHT)?,
        })
    }
}

/// Load the dataset described by `config`.
pub fn load_dataset(config: &DataConfig, options: &LoadOptions) -> Result<Dataset, DashboardError> {
    info!("Loading tickets from: {}", config.path.display());

    let bytes = std::fs::read(&config.path).map_err(|source| DashboardError::Io {
        path: config.path.clone(),
        source,
    })?;
    debug!("Read {} bytes", bytes.len());

    let text = decode(bytes, config.encoding, &config.path)?;
    let delimiter = delimiter_byte(config.delimiter, &config.path)?;

    let progress = options.show_progress.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg} {pos} rows")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Reading tickets");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = parse_dataset(&text, config.path.clone(), delimiter, progress.as_ref());

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let dataset = result?;
    info!(
        "Loaded {} tickets ({} areas, {} labels)",
        dataset.len(),
        dataset.areas().len(),
        dataset.labels().len()
    );

    let invalid = dataset.invalid_weight_count();
    if invalid > 0 {
        warn!(
            "{} rows have a non-numeric {} value; aggregations that sum them will fail",
            invalid, COL_WEIGHT
        );
    }

    Ok(dataset)
}

/// Decode raw file bytes to text, stripping a UTF-8 byte order mark.
pub fn decode(bytes: Vec<u8>, encoding: SourceEncoding, path: &Path) -> Result<String, DashboardError> {
    let text = match encoding {
        SourceEncoding::Utf8 => {
            String::from_utf8(bytes).map_err(|e| DashboardError::Encoding {
                path: path.to_path_buf(),
                encoding: "UTF-8",
                offset: e.utf8_error().valid_up_to(),
            })?
        }
        SourceEncoding::Latin1 => decode_latin1(&bytes),
        SourceEncoding::Auto => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!(
                    "{} is not UTF-8 (offset {}), decoding as ISO-8859-1",
                    path.display(),
                    e.utf8_error().valid_up_to()
                );
                decode_latin1(e.as_bytes())
            }
        },
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// ISO-8859-1 maps every byte to the code point of the same value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn delimiter_byte(delimiter: char, path: &Path) -> Result<u8, DashboardError> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(DashboardError::Csv {
            path: path.to_path_buf(),
            line: None,
            message: format!("delimiter '{}' is not a single ASCII character", delimiter),
        })
    }
}

/// Parse decoded CSV text into a dataset.
pub fn parse_dataset(
    text: &str,
    source: PathBuf,
    delimiter: u8,
    progress: Option<&ProgressBar>,
) -> Result<Dataset, DashboardError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let csv_error = |e: csv::Error| DashboardError::Csv {
        path: source.clone(),
        line: e.position().map(|p| p.line()),
        message: e.to_string(),
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let columns = ColumnIndex::resolve(&headers, &source)?;
    debug!("Header columns: {:?}", headers.iter().collect::<Vec<_>>());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        records.push(to_ticket(&record, columns, line));

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    Ok(Dataset::new(source, records))
}

fn to_ticket(record: &StringRecord, columns: ColumnIndex, line: u64) -> TicketRecord {
    let text = |idx: usize| {
        record
            .get(idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    TicketRecord {
        line,
        area: text(columns.area),
        label: text(columns.label),
        category: text(columns.category),
        created: text(columns.created),
        weight: Weight::parse(record.get(columns.weight).unwrap_or("")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
id,area,LABEL,CATEGORIA,Fecha_de_creacion,count-area
1,IT,P1,Bug,2023-01-01,2
2,IT,P2,Bug,2023-01-01,3
3,HR,P1,Request,2023-01-02,1
";

    fn parse(text: &str) -> Result<Dataset, DashboardError> {
        parse_dataset(text, PathBuf::from("sample.csv"), b',', None)
    }

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
    }

    #[test]
    fn test_parse_sample() {
        let dataset = parse(SAMPLE).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.areas(), ["IT", "HR"]);
        assert_eq!(dataset.labels(), ["P1", "P2"]);

        let first = &dataset.records()[0];
        assert_eq!(first.line, 2);
        assert_eq!(first.area.as_deref(), Some("IT"));
        assert_eq!(first.category.as_deref(), Some("Bug"));
        assert_eq!(first.created.as_deref(), Some("2023-01-01"));
        assert_eq!(first.weight, Weight::Value(2.0));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let text = "area,LABEL,CATEGORIA,count-area\nIT,P1,Bug,1\n";
        match parse(text) {
            Err(DashboardError::MissingColumn { column, .. }) => {
                assert_eq!(column, COL_CREATED)
            }
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_header_uses_first_column() {
        let dataset = parse(
            "area,LABEL,CATEGORIA,Fecha_de_creacion,count-area,area\nIT,P1,Bug,2023-01-01,1,HR\n",
        )
        .unwrap();

        assert_eq!(dataset.records()[0].area.as_deref(), Some("IT"));
        assert_eq!(dataset.areas(), ["IT"]);
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let text = "area,LABEL,CATEGORIA,Fecha_de_creacion,count-area\nIT,P1,Bug\n";
        match parse(text) {
            Err(DashboardError::Csv { line, .. }) => assert_eq!(line, Some(2)),
            other => panic!("expected Csv error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_cells_and_bad_weights_are_kept() {
        let text = "\
area,LABEL,CATEGORIA,Fecha_de_creacion,count-area
IT,,Bug,2023-01-01,
 ,P1,Bug,2023-01-01,n/a
";
        let dataset = parse(text).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].label, None);
        assert_eq!(dataset.records()[0].weight, Weight::Missing);
        assert_eq!(dataset.records()[1].area, None);
        assert_eq!(dataset.records()[1].weight, Weight::Invalid("n/a".to_string()));
        assert_eq!(dataset.areas(), ["IT"]);
        assert_eq!(dataset.invalid_weight_count(), 1);
    }

    #[test]
    fn test_header_only_gives_empty_dataset() {
        let dataset = parse("area,LABEL,CATEGORIA,Fecha_de_creacion,count-area\n").unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.areas().is_empty());
    }

    #[test]
    fn test_decode_latin1_and_auto() {
        // "Área" in ISO-8859-1
        let bytes = vec![0xC1, b'r', b'e', b'a'];
        let path = Path::new("x.csv");

        assert_eq!(decode(bytes.clone(), SourceEncoding::Latin1, path).unwrap(), "Área");
        assert_eq!(decode(bytes.clone(), SourceEncoding::Auto, path).unwrap(), "Área");
        match decode(bytes, SourceEncoding::Utf8, path) {
            Err(DashboardError::Encoding { offset, .. }) => assert_eq!(offset, 0),
            other => panic!("expected Encoding error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"area");
        let text = decode(bytes, SourceEncoding::Auto, Path::new("x.csv")).unwrap();
        assert_eq!(text, "area");
    }

    #[test]
    fn test_load_semicolon_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.replace(',', ";").as_bytes()).unwrap();

        let config = DataConfig {
            path: file.path().to_path_buf(),
            encoding: SourceEncoding::Utf8,
            delimiter: ';',
        };
        let dataset = load_dataset(&config, &LoadOptions::default()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.source, file.path());
    }

    #[test]
    fn test_load_missing_file() {
        let config = DataConfig {
            path: PathBuf::from("/nonexistent/tickets.csv"),
            ..DataConfig::default()
        };
        let err = load_dataset(&config, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DashboardError::Io { .. }));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = DataConfig {
            path: fixture("tickets.csv"),
            encoding: SourceEncoding::Auto,
            delimiter: '¦',
        };
        let err = load_dataset(&config, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DashboardError::Csv { line: None, .. }));
    }

    #[test]
    fn test_load_latin1_fixture() {
        let config = DataConfig {
            path: fixture("tickets_latin1.csv"),
            encoding: SourceEncoding::Latin1,
            delimiter: ',',
        };
        let dataset = load_dataset(&config, &LoadOptions::default()).unwrap();
        assert!(dataset.has_area("Administración"));
        assert!(dataset
            .records()
            .iter()
            .any(|r| r.category.as_deref() == Some("Petición")));
    }

    #[test]
    fn test_load_utf8_fixture() {
        let config = DataConfig {
            path: fixture("tickets.csv"),
            ..DataConfig::default()
        };
        let dataset = load_dataset(&config, &LoadOptions::default()).unwrap();
        assert_eq!(dataset.len(), 10);
        assert_eq!(dataset.areas(), ["Sistemas", "Administración", "Operaciones"]);
        assert_eq!(dataset.labels(), ["TABANTAJ", "PORTAL", "ERP"]);
    }
}
