//! MARC 21 (ISO 2709) decoder producing MARC-in-JSON.
//!
//! Pipeline:
//!   raw &str
//!     └─ split_leader()       → leader, base address
//!          └─ read_directory()  → Vec<DirEntry>
//!               └─ decode_field()  → JSON field object
//!                    └─ {"leader": ..., "fields": [...]}

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

const LEADER_LEN: usize = 24;
const DIR_ENTRY_LEN: usize = 12;

const SUBFIELD_DELIMITER: u8 = 0x1F;
const FIELD_TERMINATOR: u8 = 0x1E;
const RECORD_TERMINATOR: u8 = 0x1D;

struct DirEntry {
  tag:    String,
  length: usize,
  start:  usize,
}

// ─── Low-level helpers ───────────────────────────────────────────────────────

fn parse_digits(bytes: &[u8]) -> Option<usize> {
  if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
    return None;
  }
  std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn utf8<'a>(tag: &str, bytes: &'a [u8]) -> Result<&'a str> {
  std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8 {
    tag: tag.to_owned(),
  })
}

/// Control fields (`001`–`009`) carry data without indicators or subfields.
fn is_control_tag(tag: &str) -> bool { tag.starts_with("00") }

// ─── Record structure ────────────────────────────────────────────────────────

/// Returns the leader string and the base address of the data area.
fn split_leader(record: &[u8]) -> Result<(&str, usize)> {
  if record.len() < LEADER_LEN {
    return Err(Error::LeaderTooShort(record.len()));
  }
  let leader = &record[..LEADER_LEN];
  if !leader.is_ascii() {
    return Err(Error::InvalidLeader("leader contains non-ASCII bytes".into()));
  }
  let leader = utf8("LDR", leader)?;

  parse_digits(&record[..5])
    .ok_or_else(|| Error::InvalidLeader(format!("bad record length {:?}", &leader[..5])))?;
  let base = parse_digits(&record[12..17])
    .ok_or_else(|| Error::InvalidLeader(format!("bad base address {:?}", &leader[12..17])))?;

  if base <= LEADER_LEN || base > record.len() {
    return Err(Error::InvalidLeader(format!(
      "base address {base} outside record of {} bytes",
      record.len()
    )));
  }
  Ok((leader, base))
}

fn read_directory(record: &[u8], base: usize) -> Result<Vec<DirEntry>> {
  // The directory ends with a field terminator just before the data area.
  if record[base - 1] != FIELD_TERMINATOR {
    return Err(Error::MalformedDirectory(
      "directory is not terminated".into(),
    ));
  }
  let directory = &record[LEADER_LEN..base - 1];
  if directory.len() % DIR_ENTRY_LEN != 0 {
    return Err(Error::MalformedDirectory(format!(
      "length {} is not a multiple of {DIR_ENTRY_LEN}",
      directory.len()
    )));
  }

  directory
    .chunks(DIR_ENTRY_LEN)
    .map(|entry| {
      let tag = &entry[..3];
      if !tag.iter().all(u8::is_ascii_alphanumeric) {
        return Err(Error::MalformedDirectory(format!(
          "invalid tag {:?}",
          String::from_utf8_lossy(tag)
        )));
      }
      let tag = String::from_utf8_lossy(tag).into_owned();
      let length = parse_digits(&entry[3..7]).ok_or_else(|| {
        Error::MalformedDirectory(format!("bad length for {tag}"))
      })?;
      let start = parse_digits(&entry[7..12]).ok_or_else(|| {
        Error::MalformedDirectory(format!("bad start position for {tag}"))
      })?;
      Ok(DirEntry { tag, length, start })
    })
    .collect()
}

fn decode_field(data_area: &[u8], entry: &DirEntry) -> Result<Value> {
  let end = entry.start + entry.length;
  let raw = data_area.get(entry.start..end).ok_or_else(|| {
    Error::FieldOutOfBounds { tag: entry.tag.clone() }
  })?;
  let raw = raw.strip_suffix(&[FIELD_TERMINATOR]).unwrap_or(raw);

  let mut field = Map::new();
  if is_control_tag(&entry.tag) {
    field.insert(entry.tag.clone(), Value::String(utf8(&entry.tag, raw)?.to_owned()));
    return Ok(Value::Object(field));
  }

  if raw.len() < 2 {
    return Err(Error::MissingIndicators { tag: entry.tag.clone() });
  }
  let ind1 = utf8(&entry.tag, &raw[..1])?;
  let ind2 = utf8(&entry.tag, &raw[1..2])?;

  // Anything before the first delimiter is not part of a subfield.
  let subfields = raw[2..]
    .split(|b| *b == SUBFIELD_DELIMITER)
    .skip(1)
    .filter(|chunk| !chunk.is_empty())
    .map(|chunk| {
      let text = utf8(&entry.tag, chunk)?;
      let mut chars = text.chars();
      let code = chars.next().map(String::from).unwrap_or_default();
      let mut sub = Map::new();
      sub.insert(code, Value::String(chars.as_str().to_owned()));
      Ok(Value::Object(sub))
    })
    .collect::<Result<Vec<_>>>()?;

  field.insert(
    entry.tag.clone(),
    json!({ "ind1": ind1, "ind2": ind2, "subfields": subfields }),
  );
  Ok(Value::Object(field))
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Decode one ISO 2709 record. Trailing line breaks after the record
/// terminator are tolerated.
pub(crate) fn decode(raw: &str) -> Result<Value> {
  let bytes = raw.trim_end_matches(['\r', '\n']).as_bytes();
  let record = bytes
    .strip_suffix(&[RECORD_TERMINATOR])
    .ok_or(Error::MissingRecordTerminator)?;

  let (leader, base) = split_leader(record)?;
  let directory = read_directory(record, base)?;
  let data_area = &record[base..];

  let fields = directory
    .iter()
    .map(|entry| decode_field(data_area, entry))
    .collect::<Result<Vec<_>>>()?;

  Ok(json!({ "leader": leader, "fields": fields }))
}

// ─── Test helpers ────────────────────────────────────────────────────────────

/// Build an ISO 2709 record from control and data fields.
#[cfg(test)]
pub(crate) fn encode_for_test(
  leader_status: &str,
  fields: &[(&str, String)],
) -> String {
  let mut directory = String::new();
  let mut data = String::new();
  for (tag, body) in fields {
    let body = format!("{body}\u{1E}");
    directory.push_str(&format!("{tag}{:04}{:05}", body.len(), data.len()));
    data.push_str(&body);
  }
  directory.push('\u{1E}');
  let base = LEADER_LEN + directory.len();
  let total = base + data.len() + 1;
  let leader = format!("{total:05}{leader_status} a22{base:05}   4500");
  format!("{leader}{directory}{data}\u{1D}")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> String {
    encode_for_test("ncm", &[
      ("001", "in00000001".to_string()),
      ("245", "10\u{1F}aThe title :\u{1F}bsubtitle".to_string()),
      ("650", " 0\u{1F}aMusic".to_string()),
    ])
  }

  #[test]
  fn decodes_leader_and_fields() {
    let json = decode(&sample()).unwrap();
    let leader = json["leader"].as_str().unwrap();
    assert_eq!(leader.len(), 24);
    assert_eq!(&leader[5..8], "ncm");

    let fields = json["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0]["001"], "in00000001");
    assert_eq!(fields[1]["245"]["ind1"], "1");
    assert_eq!(fields[1]["245"]["ind2"], "0");
    assert_eq!(fields[1]["245"]["subfields"][0]["a"], "The title :");
    assert_eq!(fields[1]["245"]["subfields"][1]["b"], "subtitle");
    assert_eq!(fields[2]["650"]["ind1"], " ");
  }

  #[test]
  fn tolerates_trailing_newline() {
    let raw = format!("{}\n", sample());
    assert!(decode(&raw).is_ok());
  }

  #[test]
  fn multibyte_subfields_survive() {
    let raw = encode_for_test("ncm", &[(
      "100",
      "1 \u{1F}aDvořák, Antonín".to_string(),
    )]);
    let json = decode(&raw).unwrap();
    assert_eq!(json["fields"][0]["100"]["subfields"][0]["a"], "Dvořák, Antonín");
  }

  #[test]
  fn rejects_plain_text() {
    let err = decode("Duis aute irure dolor in reprehenderit").unwrap_err();
    assert!(matches!(err, Error::MissingRecordTerminator));
  }

  #[test]
  fn rejects_short_record() {
    let err = decode("00012\u{1D}").unwrap_err();
    assert!(matches!(err, Error::LeaderTooShort(5)));
  }

  #[test]
  fn rejects_bad_base_address() {
    let mut raw = sample();
    raw.replace_range(12..17, "99999");
    assert!(matches!(decode(&raw).unwrap_err(), Error::InvalidLeader(_)));
  }

  #[test]
  fn rejects_field_pointing_past_end() {
    let raw = sample();
    // Corrupt the first directory entry's start position.
    let mut bytes = raw.into_bytes();
    bytes[24 + 7..24 + 12].copy_from_slice(b"90000");
    let raw = String::from_utf8(bytes).unwrap();
    assert!(matches!(
      decode(&raw).unwrap_err(),
      Error::FieldOutOfBounds { ref tag } if tag == "001"
    ));
  }
}
