//! Compilation of [`RecordQuery`] trees into parameterised SQL.

use rusqlite::types::Value;
use srs_core::query::{OrderBy, RecordField, RecordFilter, RecordQuery, SortDirection};

use crate::encode::encode_uuid;

/// A WHERE predicate with its positional parameters.
#[derive(Debug, Default)]
pub struct Compiled {
  pub predicate: String,
  pub params:    Vec<Value>,
}

impl Compiled {
  fn bind(&mut self, value: Value) -> String {
    self.params.push(value);
    format!("?{}", self.params.len())
  }

  fn compile(&mut self, filter: &RecordFilter) -> String {
    match filter {
      RecordFilter::All => "1 = 1".into(),
      RecordFilter::Id(id) => {
        format!("r.id = {}", self.bind(Value::Text(encode_uuid(*id))))
      }
      RecordFilter::MatchedId(id) => {
        format!("r.matched_id = {}", self.bind(Value::Text(encode_uuid(*id))))
      }
      RecordFilter::SnapshotId(id) => {
        format!("r.snapshot_id = {}", self.bind(Value::Text(encode_uuid(*id))))
      }
      RecordFilter::State(state) => {
        format!("r.state = {}", self.bind(Value::Text(state.as_ref().into())))
      }
      RecordFilter::RecordType(t) => {
        format!("r.record_type = {}", self.bind(Value::Text(t.as_ref().into())))
      }
      RecordFilter::SuppressDiscovery(flag) => format!(
        "r.suppress_discovery = {}",
        self.bind(Value::Integer(i64::from(*flag)))
      ),
      RecordFilter::InstanceId(id) => {
        format!("r.instance_id = {}", self.bind(Value::Text(encode_uuid(*id))))
      }
      RecordFilter::HasErrorRecord(true) => "e.id IS NOT NULL".into(),
      RecordFilter::HasErrorRecord(false) => "e.id IS NULL".into(),
      RecordFilter::HasParsedRecord(true) => "p.id IS NOT NULL".into(),
      RecordFilter::HasParsedRecord(false) => "p.id IS NULL".into(),
      RecordFilter::And(parts) => self.join(parts, " AND ", "1 = 1"),
      RecordFilter::Or(parts) => self.join(parts, " OR ", "1 = 0"),
      RecordFilter::Not(inner) => format!("NOT ({})", self.compile(inner)),
    }
  }

  fn join(&mut self, parts: &[RecordFilter], op: &str, empty: &str) -> String {
    if parts.is_empty() {
      return empty.into();
    }
    let clauses = parts.iter().map(|p| self.compile(p)).collect::<Vec<_>>();
    format!("({})", clauses.join(op))
  }
}

/// Compile the filter of `query` into a predicate plus parameters.
pub fn compile_filter(filter: &RecordFilter) -> Compiled {
  let mut compiled = Compiled::default();
  compiled.predicate = compiled.compile(filter);
  compiled
}

fn column(field: RecordField) -> &'static str {
  match field {
    RecordField::Order => "r.\"order\"",
    RecordField::CreatedDate => "r.created_date",
    RecordField::UpdatedDate => "r.updated_date",
    RecordField::Id => "r.id",
  }
}

/// `ORDER BY` clause. Insertion order breaks ties so paging is stable.
pub fn order_clause(order_by: &[OrderBy]) -> String {
  let mut terms = order_by
    .iter()
    .map(|o| {
      let dir = match o.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
      };
      format!("{} {dir}", column(o.field))
    })
    .collect::<Vec<_>>();
  terms.push("r.rowid ASC".into());
  format!("ORDER BY {}", terms.join(", "))
}

/// Page bounds as SQL integers.
pub fn page(query: &RecordQuery) -> (i64, i64) {
  (
    i64::try_from(query.limit).unwrap_or(i64::MAX),
    i64::try_from(query.offset).unwrap_or(i64::MAX),
  )
}

#[cfg(test)]
mod tests {
  use srs_core::record::RecordState;
  use uuid::Uuid;

  use super::*;

  #[test]
  fn all_compiles_to_tautology() {
    let c = compile_filter(&RecordFilter::All);
    assert_eq!(c.predicate, "1 = 1");
    assert!(c.params.is_empty());
  }

  #[test]
  fn parameters_are_numbered_in_order() {
    let snapshot = Uuid::new_v4();
    let filter = RecordFilter::SnapshotId(snapshot)
      .and(RecordFilter::State(RecordState::Actual).or(RecordFilter::State(RecordState::Old)));
    let c = compile_filter(&filter);
    assert_eq!(
      c.predicate,
      "(r.snapshot_id = ?1 AND (r.state = ?2 OR r.state = ?3))"
    );
    assert_eq!(c.params.len(), 3);
    assert_eq!(c.params[1], Value::Text("ACTUAL".into()));
  }

  #[test]
  fn negation_wraps_inner_clause() {
    let c = compile_filter(&RecordFilter::HasErrorRecord(true).not());
    assert_eq!(c.predicate, "NOT (e.id IS NOT NULL)");
  }

  #[test]
  fn empty_disjunction_matches_nothing() {
    assert_eq!(compile_filter(&RecordFilter::Or(vec![])).predicate, "1 = 0");
  }

  #[test]
  fn order_clause_appends_rowid() {
    let clause = order_clause(&[OrderBy::desc(RecordField::Order)]);
    assert_eq!(clause, "ORDER BY r.\"order\" DESC, r.rowid ASC");
  }

  #[test]
  fn order_clause_keeps_terms_in_given_order() {
    let clause = order_clause(&[
      OrderBy::asc(RecordField::CreatedDate),
      OrderBy::desc(RecordField::Id),
    ]);
    assert_eq!(
      clause,
      "ORDER BY r.created_date ASC, r.id DESC, r.rowid ASC"
    );
  }

  #[test]
  fn parsed_presence_checks_the_parsed_join() {
    let c = compile_filter(&RecordFilter::HasParsedRecord(true));
    assert_eq!(c.predicate, "p.id IS NOT NULL");
  }
}
