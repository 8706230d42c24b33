use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::csv_writer::IDENT_HISTORY_COLUMNS;
use crate::error::OutputError;

pub const OCCURRENCE_ROW_TYPE: &str = "http://rs.tdwg.org/dwc/terms/Occurrence";
pub const IDENT_HISTORY_ROW_TYPE: &str = "http://rs.gbif.org/terms/1.0/Identification";

/// Maps a bare Darwin Core term to its full TDWG (or, for the one GBIF-only
/// identification-history field, GBIF) URI, as `meta.xml` requires (§4.12).
#[must_use]
pub fn term_uri(term: &str) -> String {
    if term == "isCurrent" {
        "http://rs.gbif.org/terms/1.0/isCurrent".to_string()
    } else {
        format!("http://rs.tdwg.org/dwc/terms/{term}")
    }
}

fn write_field_block(
    writer: &mut Writer<Vec<u8>>,
    row_type: &str,
    files_location: &str,
    id_tag: &str,
    terms: &[String],
) -> Result<(), OutputError> {
    let mut block = BytesStart::new(if id_tag == "id" { "core" } else { "extension" });
    block.push_attribute(("encoding", "UTF-8"));
    block.push_attribute(("fieldsTerminatedBy", ","));
    block.push_attribute(("linesTerminatedBy", "\\n"));
    block.push_attribute(("fieldsEnclosedBy", "\""));
    block.push_attribute(("ignoreHeaderLines", "1"));
    block.push_attribute(("rowType", row_type));
    let end = block.to_end().into_owned();
    writer.write_event(Event::Start(block))?;

    writer.write_event(Event::Start(BytesStart::new("files")))?;
    writer.write_event(Event::Start(BytesStart::new("location")))?;
    writer.write_event(Event::Text(BytesText::new(files_location)))?;
    writer.write_event(Event::End(BytesEnd::new("location")))?;
    writer.write_event(Event::End(BytesEnd::new("files")))?;

    let mut id_elem = BytesStart::new(id_tag);
    id_elem.push_attribute(("index", "0"));
    writer.write_event(Event::Empty(id_elem))?;

    for (index, term) in terms.iter().enumerate() {
        let uri = term_uri(term);
        let mut field = BytesStart::new("field");
        field.push_attribute(("index", index.to_string().as_str()));
        field.push_attribute(("term", uri.as_str()));
        writer.write_event(Event::Empty(field))?;
    }

    writer.write_event(Event::End(end))?;
    Ok(())
}

/// Builds the DwC-A `meta.xml` descriptor: an `Occurrence` core backed by
/// `occurrence.csv`, plus an `Identification` extension backed by
/// `identification_history.csv` (§4.12).
pub fn build_meta_xml(occurrence_terms: &[String]) -> Result<Vec<u8>, OutputError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut archive = BytesStart::new("archive");
    archive.push_attribute(("xmlns", "http://rs.tdwg.org/dwc/text/"));
    writer.write_event(Event::Start(archive.clone()))?;

    write_field_block(
        &mut writer,
        OCCURRENCE_ROW_TYPE,
        "occurrence.csv",
        "id",
        occurrence_terms,
    )?;

    let ident_terms: Vec<String> = IDENT_HISTORY_COLUMNS.iter().map(|s| s.to_string()).collect();
    write_field_block(
        &mut writer,
        IDENT_HISTORY_ROW_TYPE,
        "identification_history.csv",
        "coreid",
        &ident_terms,
    )?;

    writer.write_event(Event::End(archive.to_end().into_owned()))?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_uri_special_cases_is_current() {
        assert_eq!(term_uri("isCurrent"), "http://rs.gbif.org/terms/1.0/isCurrent");
        assert_eq!(term_uri("catalogNumber"), "http://rs.tdwg.org/dwc/terms/catalogNumber");
    }

    #[test]
    fn meta_xml_contains_both_blocks_with_expected_row_types() {
        let terms = vec!["catalogNumber".to_string(), "scientificName".to_string()];
        let xml = build_meta_xml(&terms).unwrap();
        let text = String::from_utf8(xml).unwrap();

        assert!(text.contains(OCCURRENCE_ROW_TYPE));
        assert!(text.contains(IDENT_HISTORY_ROW_TYPE));
        assert!(text.contains("occurrence.csv"));
        assert!(text.contains("identification_history.csv"));
        assert!(text.contains("<coreid index=\"0\"/>"));
        assert!(text.contains("linesTerminatedBy=\"\\n\""));
        assert!(text.contains("http://rs.tdwg.org/dwc/terms/catalogNumber"));
        assert!(text.contains("http://rs.gbif.org/terms/1.0/isCurrent"));
    }
}
