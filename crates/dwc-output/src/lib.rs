//! Output writers for a completed (or resumed) run (§4.12): the raw JSONL
//! event log, the two DwC-A CSVs, `manifest.json`, `meta.xml`, and the
//! zipped DwC-A bundle.
//!
//! These are building blocks, not orchestration — `dwc-run-controller`
//! decides when to call each one, what term order to use, and what goes
//! into the manifest. This crate just guarantees each artifact is written
//! the way §4.12 and §6 require: `\n`-terminated, UTF-8, `"`-quoted CSVs,
//! and a `meta.xml` whose `linesTerminatedBy` is the literal two-character
//! string `\n`, matching the convention real DwC-A consumers expect.

mod archive;
mod csv_writer;
mod error;
mod events;
mod manifest;
mod meta_xml;

pub use archive::{archive_name, write_bundle, BundleFileStats, BundleFormat};
pub use csv_writer::{IdentHistoryCsvWriter, OccurrenceCsvWriter, IDENT_HISTORY_COLUMNS};
pub use error::OutputError;
pub use events::EventWriter;
pub use manifest::{build_manifest, Manifest, ProvenanceManifestSection};
pub use meta_xml::{build_meta_xml, term_uri, IDENT_HISTORY_ROW_TYPE, OCCURRENCE_ROW_TYPE};

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use camino::Utf8PathBuf;
    use chrono::Utc;
    use dwc_config::Config;

    use super::*;

    #[test]
    fn full_bundle_round_trip_matches_seed_scenario_4() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let term_order = vec!["catalogNumber".to_string(), "scientificName".to_string()];
        let occurrence_path = root.join("occurrence.csv");
        let mut occ_writer = OccurrenceCsvWriter::open(&occurrence_path, term_order.clone()).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("catalogNumber".to_string(), "Herbarium-00001".to_string());
        fields.insert("scientificName".to_string(), "Quercus alba".to_string());
        occ_writer.append_record(&fields).unwrap();
        occ_writer.flush().unwrap();
        drop(occ_writer);

        let ident_path = root.join("identification_history.csv");
        let mut ident_writer = IdentHistoryCsvWriter::open(&ident_path).unwrap();
        let mut ident_fields = BTreeMap::new();
        ident_fields.insert("occurrenceID".to_string(), "Herbarium-00001".to_string());
        ident_fields.insert("isCurrent".to_string(), "true".to_string());
        ident_writer.append_record(&ident_fields).unwrap();
        ident_writer.flush().unwrap();
        drop(ident_writer);

        let meta_path = root.join("meta.xml");
        let xml = build_meta_xml(&term_order).unwrap();
        std::fs::write(&meta_path, &xml).unwrap();

        let mut fragment_types = BTreeMap::new();
        fragment_types.insert("dwc_extraction".to_string(), 1);
        let manifest = build_manifest(
            "run1",
            Utc::now(),
            None,
            &Config::defaults(),
            fragment_types,
            "provenance.jsonl",
        )
        .unwrap();
        let manifest_path = root.join("manifest.json");
        manifest.write(&manifest_path).unwrap();

        let (bundle_path, stats) = write_bundle(
            &root,
            "1.2.3",
            BundleFormat::Simple,
            "20260730T000000Z",
            None,
            None,
            &[
                ("occurrence.csv", occurrence_path),
                ("identification_history.csv", ident_path),
                ("meta.xml", meta_path),
                ("manifest.json", manifest_path),
            ],
            true,
        )
        .unwrap();

        assert_eq!(bundle_path.file_name().unwrap(), "dwca_v1.2.3.zip");
        assert_eq!(stats.len(), 4);

        let file = std::fs::File::open(&bundle_path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let mut names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "identification_history.csv",
                "manifest.json",
                "meta.xml",
                "occurrence.csv",
            ]
        );
    }
}
