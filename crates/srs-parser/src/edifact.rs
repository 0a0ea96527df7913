//! UN/EDIFACT interchange decoder.
//!
//! Only the syntax layer is decoded: segments, data elements and components.
//! Message semantics (which segments are required where) are not checked.

use serde_json::{Value, json};

use crate::error::{Error, Result};

/// Delimiters announced by the `UNA` service string advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Delimiters {
  component: char,
  element:   char,
  release:   char,
  segment:   char,
}

impl Default for Delimiters {
  fn default() -> Self {
    Self {
      component: ':',
      element:   '+',
      release:   '?',
      segment:   '\'',
    }
  }
}

/// Split off a leading `UNA` advice, returning the delimiters in force and
/// the remaining interchange text.
fn read_service_advice(input: &str) -> Result<(Delimiters, &str)> {
  let Some(rest) = input.strip_prefix("UNA") else {
    return Ok((Delimiters::default(), input));
  };
  let advice: Vec<char> = rest.chars().take(6).collect();
  if advice.len() < 6 {
    return Err(Error::InvalidServiceAdvice);
  }
  // Order: component, element, decimal mark, release, reserved, segment.
  let delimiters = Delimiters {
    component: advice[0],
    element:   advice[1],
    release:   advice[3],
    segment:   advice[5],
  };
  let consumed: usize = advice.iter().map(|c| c.len_utf8()).sum();
  Ok((delimiters, &rest[consumed..]))
}

type Segment = Vec<Vec<String>>;

fn tokenize(body: &str, d: Delimiters) -> Result<Vec<Segment>> {
  let mut segments = Vec::new();
  let mut elements: Segment = Vec::new();
  let mut components: Vec<String> = Vec::new();
  let mut current = String::new();
  let mut chars = body.chars();
  let mut pending = false;

  while let Some(c) = chars.next() {
    // Line breaks between segments are formatting, not data.
    if !pending && (c == '\r' || c == '\n') {
      continue;
    }
    pending = true;
    if c == d.release {
      if let Some(escaped) = chars.next() {
        current.push(escaped);
      }
    } else if c == d.component {
      components.push(std::mem::take(&mut current));
    } else if c == d.element {
      components.push(std::mem::take(&mut current));
      elements.push(std::mem::take(&mut components));
    } else if c == d.segment {
      components.push(std::mem::take(&mut current));
      elements.push(std::mem::take(&mut components));
      segments.push(std::mem::take(&mut elements));
      pending = false;
    } else {
      current.push(c);
    }
  }

  if pending {
    let component = d.component.to_string();
    let element = d.element.to_string();
    components.push(current);
    elements.push(components);
    let tail = elements
      .iter()
      .map(|e| e.join(component.as_str()))
      .collect::<Vec<_>>();
    return Err(Error::UnterminatedSegment(tail.join(element.as_str())));
  }
  Ok(segments)
}

fn segment_to_json(mut segment: Segment) -> Result<Value> {
  let tag = segment
    .first_mut()
    .and_then(|e| e.first_mut())
    .map(std::mem::take)
    .unwrap_or_default();
  let tag = tag.trim().to_owned();
  if tag.len() != 3 || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
    return Err(Error::InvalidSegmentTag(tag));
  }

  let data_elements = segment
    .into_iter()
    .skip(1)
    .map(|components| {
      let components = components
        .into_iter()
        .map(|data| json!({ "data": data }))
        .collect::<Vec<_>>();
      json!({ "components": components })
    })
    .collect::<Vec<_>>();

  Ok(json!({ "tag": tag, "dataElements": data_elements }))
}

/// Decode an interchange into `{"segments": [...]}`.
pub(crate) fn decode(raw: &str) -> Result<Value> {
  let (delimiters, body) = read_service_advice(raw.trim())?;
  let segments = tokenize(body, delimiters)?;
  if segments.is_empty() {
    return Err(Error::EmptyInterchange);
  }
  let segments = segments
    .into_iter()
    .map(segment_to_json)
    .collect::<Result<Vec<_>>>()?;
  Ok(json!({ "segments": segments }))
}
