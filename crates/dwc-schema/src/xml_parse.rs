use std::collections::BTreeSet;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::SchemaError;
use crate::model::ParsedSchema;

/// Parse an XSD-shaped schema document, pulling out every `<element
/// name="...">` term, the document's `targetNamespace`, and any element
/// carrying `deprecated="true"` (§4.8).
pub fn parse_schema_xml(name: &str, xml: &[u8]) -> Result<ParsedSchema, SchemaError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut terms = BTreeSet::new();
    let mut deprecated_terms = BTreeSet::new();
    let mut namespace = None;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| SchemaError::Xml {
                name: name.to_string(),
                source,
            })?;
        match event {
            Event::Eof => break,
            Event::Start(tag) | Event::Empty(tag) => {
                let local_name = local_name(tag.name().as_ref());
                if local_name == "schema" {
                    for attr in tag.attributes().flatten() {
                        if local_name_bytes(attr.key.as_ref()) == b"targetNamespace" {
                            namespace = Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                    }
                } else if local_name == "element" {
                    let mut element_name = None;
                    let mut deprecated = false;
                    for attr in tag.attributes().flatten() {
                        match local_name_bytes(attr.key.as_ref()) {
                            b"name" => {
                                element_name = Some(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                            b"deprecated" => {
                                deprecated = attr.value.as_ref() == b"true";
                            }
                            _ => {}
                        }
                    }
                    if let Some(element_name) = element_name {
                        if deprecated {
                            deprecated_terms.insert(element_name.clone());
                        }
                        terms.insert(element_name);
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(ParsedSchema {
        name: name.to_string(),
        namespace,
        terms,
        deprecated_terms,
    })
}

fn local_name(qualified: &[u8]) -> String {
    String::from_utf8_lossy(local_name_bytes(qualified)).into_owned()
}

fn local_name_bytes(qualified: &[u8]) -> &[u8] {
    match qualified.iter().rposition(|b| *b == b':') {
        Some(idx) => &qualified[idx + 1..],
        None => qualified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XSD: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="http://rs.tdwg.org/dwc/terms/">
  <xs:element name="catalogNumber" type="xs:string"/>
  <xs:element name="scientificName" type="xs:string"/>
  <xs:element name="individualID" type="xs:string" deprecated="true"/>
</xs:schema>"#;

    #[test]
    fn parses_terms_and_namespace() {
        let parsed = parse_schema_xml("dwc", SAMPLE_XSD.as_bytes()).unwrap();
        assert_eq!(parsed.namespace.as_deref(), Some("http://rs.tdwg.org/dwc/terms/"));
        assert!(parsed.terms.contains("catalogNumber"));
        assert!(parsed.terms.contains("scientificName"));
        assert_eq!(parsed.term_count(), 3);
    }

    #[test]
    fn flags_deprecated_elements() {
        let parsed = parse_schema_xml("dwc", SAMPLE_XSD.as_bytes()).unwrap();
        assert!(parsed.deprecated_terms.contains("individualID"));
        assert!(!parsed.deprecated_terms.contains("catalogNumber"));
    }
}
