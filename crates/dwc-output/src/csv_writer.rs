use std::collections::BTreeMap;
use std::fs::OpenOptions;

use camino::{Utf8Path, Utf8PathBuf};
use csv::{Terminator, WriterBuilder};

use crate::error::OutputError;

/// Fixed column order for `identification_history.csv` (§6).
pub const IDENT_HISTORY_COLUMNS: &[&str] = &[
    "occurrenceID",
    "identificationID",
    "identifiedBy",
    "dateIdentified",
    "scientificName",
    "scientificNameAuthorship",
    "taxonRank",
    "identificationQualifier",
    "identificationRemarks",
    "identificationReferences",
    "identificationVerificationStatus",
    "isCurrent",
];

fn open_for_append(path: &Utf8Path) -> Result<(std::fs::File, bool), OutputError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| OutputError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let existed = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok((file, existed))
}

/// Writes `occurrence.csv`: one row per specimen, columns driven by the
/// configured canonical term order (§4.12, §6).
pub struct OccurrenceCsvWriter {
    writer: csv::Writer<std::fs::File>,
    term_order: Vec<String>,
}

impl OccurrenceCsvWriter {
    pub fn open(path: impl AsRef<Utf8Path>, term_order: Vec<String>) -> Result<Self, OutputError> {
        let path = path.as_ref();
        let (file, existed) = open_for_append(path)?;
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(file);
        if !existed {
            writer.write_record(term_order.iter())?;
        }
        Ok(Self { writer, term_order })
    }

    pub fn append_record(&mut self, fields: &BTreeMap<String, String>) -> Result<(), OutputError> {
        let row = self
            .term_order
            .iter()
            .map(|term| fields.get(term).map(String::as_str).unwrap_or(""));
        self.writer.write_record(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush().map_err(|source| OutputError::Io {
            path: Utf8PathBuf::new(),
            source,
        })
    }
}

/// Writes `identification_history.csv` using the fixed column set (§6).
pub struct IdentHistoryCsvWriter {
    writer: csv::Writer<std::fs::File>,
}

impl IdentHistoryCsvWriter {
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, OutputError> {
        let path = path.as_ref();
        let (file, existed) = open_for_append(path)?;
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(file);
        if !existed {
            writer.write_record(IDENT_HISTORY_COLUMNS.iter())?;
        }
        Ok(Self { writer })
    }

    pub fn append_record(&mut self, fields: &BTreeMap<String, String>) -> Result<(), OutputError> {
        let row = IDENT_HISTORY_COLUMNS
            .iter()
            .map(|term| fields.get(*term).map(String::as_str).unwrap_or(""));
        self.writer.write_record(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush().map_err(|source| OutputError::Io {
            path: Utf8PathBuf::new(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
    }

    #[test]
    fn occurrence_csv_uses_configured_term_order_and_lf_terminator() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "occurrence.csv");
        let term_order = vec!["catalogNumber".to_string(), "scientificName".to_string()];

        let mut writer = OccurrenceCsvWriter::open(&path, term_order).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("scientificName".to_string(), "Quercus alba".to_string());
        fields.insert("catalogNumber".to_string(), "Herbarium-00001".to_string());
        writer.append_record(&fields).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("\r\n"));
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), "catalogNumber,scientificName");
        assert_eq!(lines.next().unwrap(), "Herbarium-00001,Quercus alba");
    }

    #[test]
    fn reopening_an_existing_file_does_not_rewrite_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "occurrence.csv");
        let term_order = vec!["catalogNumber".to_string()];

        {
            let mut writer = OccurrenceCsvWriter::open(&path, term_order.clone()).unwrap();
            let mut fields = BTreeMap::new();
            fields.insert("catalogNumber".to_string(), "Herbarium-00001".to_string());
            writer.append_record(&fields).unwrap();
            writer.flush().unwrap();
        }
        {
            let mut writer = OccurrenceCsvWriter::open(&path, term_order).unwrap();
            let mut fields = BTreeMap::new();
            fields.insert("catalogNumber".to_string(), "Herbarium-00002".to_string());
            writer.append_record(&fields).unwrap();
            writer.flush().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["catalogNumber", "Herbarium-00001", "Herbarium-00002"]);
    }

    #[test]
    fn identification_history_csv_writes_fixed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "identification_history.csv");

        let mut writer = IdentHistoryCsvWriter::open(&path).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("occurrenceID".to_string(), "sp1".to_string());
        fields.insert("isCurrent".to_string(), "true".to_string());
        writer.append_record(&fields).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), IDENT_HISTORY_COLUMNS.join(","));
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row[0], "sp1");
        assert_eq!(row[11], "true");
    }
}
