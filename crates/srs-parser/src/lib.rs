//! Raw content decoders for source records.
//!
//! Converts raw MARC (ISO 2709) and EDIFACT text into structured JSON
//! documents. Pure and synchronous; no HTTP or database dependencies, and
//! identical input always yields identical output.
//!
//! # Quick start
//!
//! ```no_run
//! use srs_core::record::RecordType;
//!
//! match srs_parser::parse(RecordType::Marc, "{\"leader\":\"...\"}") {
//!   Ok(doc) => println!("parsed: {doc}"),
//!   Err(e) => println!("failed on {:?}: {e}", e.content),
//! }
//! ```

pub mod error;
mod edifact;
mod marc;

pub use error::{Error, ParseError, Result};
use serde_json::Value;
use srs_core::record::{Decoding, RecordType};

/// Content starting with this character is taken to be a JSON document that
/// has already been decoded upstream.
///
/// This is a heuristic: raw content that happens to begin with `{` is never
/// fed to the format decoder.
const STRUCTURED_PREFIX: char = '{';

/// Whether `raw` looks like an already-structured document.
pub fn is_structured(raw: &str) -> bool { raw.starts_with(STRUCTURED_PREFIX) }

/// Decode `raw` into a structured document.
///
/// Already-structured content is passed through as parsed JSON. Any failure
/// carries the verbatim input in [`ParseError::content`].
pub fn parse(record_type: RecordType, raw: &str) -> Result<Value, ParseError> {
  let decoded = if is_structured(raw) {
    serde_json::from_str(raw).map_err(Error::from)
  } else {
    match record_type {
      RecordType::Marc => marc::decode(raw),
      RecordType::Edifact => edifact::decode(raw),
    }
  };
  decoded.map_err(|kind| ParseError::new(kind, raw))
}

/// [`parse`], folded into the [`Decoding`] attached to a new record.
pub fn decode(record_type: RecordType, raw: &str) -> Decoding {
  match parse(record_type, raw) {
    Ok(doc) => Decoding::Parsed(doc),
    Err(e) => Decoding::Failed {
      description: format!("Error parsing {record_type} record: {e}"),
      content:     e.content,
    },
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn structured_content_passes_through() {
    let raw = r#"{"leader":"01542ccm a2200361   4500","fields":[]}"#;
    let doc = parse(RecordType::Marc, raw).unwrap();
    assert_eq!(doc, json!({ "leader": "01542ccm a2200361   4500", "fields": [] }));
  }

  #[test]
  fn structured_content_keeps_key_order() {
    let raw = r#"{"leader":"00000nam a2200000   4500","fields":[{"245":{"ind1":"0"}}],"a":1}"#;
    let doc = parse(RecordType::Marc, raw).unwrap();
    assert_eq!(doc.to_string(), raw);
  }

  #[test]
  fn broken_structured_content_is_a_failure() {
    let raw = "{not json";
    let err = parse(RecordType::Marc, raw).unwrap_err();
    assert!(matches!(err.kind, Error::Json(_)));
    assert_eq!(err.content, raw);
  }

  #[test]
  fn failure_keeps_offending_content_verbatim() {
    let raw = "Duis aute irure dolor in reprehenderit in voluptate velit esse.";
    let Decoding::Failed { content, description } = decode(RecordType::Marc, raw)
    else {
      panic!("expected failure")
    };
    assert_eq!(content, raw);
    assert!(description.starts_with("Error parsing MARC record"));
  }

  #[test]
  fn marc_is_decoded() {
    let raw = marc::encode_for_test("ncm", &[("001", "abc".to_string())]);
    let Decoding::Parsed(doc) = decode(RecordType::Marc, &raw) else {
      panic!("expected parsed")
    };
    assert_eq!(doc["fields"][0]["001"], "abc");
  }

  #[test]
  fn parsing_is_deterministic() {
    let raw = marc::encode_for_test("ncm", &[
      ("001", "abc".to_string()),
      ("245", "00\u{1F}aTitle".to_string()),
    ]);
    assert_eq!(
      parse(RecordType::Marc, &raw).unwrap(),
      parse(RecordType::Marc, &raw).unwrap()
    );
  }

  #[test]
  fn edifact_is_dispatched_by_record_type() {
    let doc = parse(RecordType::Edifact, "UNH+1+ORDERS'UNT+2+1'").unwrap();
    assert_eq!(doc["segments"][0]["tag"], "UNH");
  }
}
