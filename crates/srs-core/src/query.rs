//! Typed record predicates and ordering.
//!
//! Listings are described by a [`RecordFilter`] tree built by the caller and
//! evaluated by the storage backend. There is no textual query language.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{RecordState, RecordType};

// ─── Predicates ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecordFilter {
  /// Matches every record.
  #[default]
  All,
  Id(Uuid),
  MatchedId(Uuid),
  SnapshotId(Uuid),
  State(RecordState),
  RecordType(RecordType),
  SuppressDiscovery(bool),
  InstanceId(Uuid),
  /// `true` selects records whose decoding failed.
  HasErrorRecord(bool),
  HasParsedRecord(bool),
  And(Vec<RecordFilter>),
  Or(Vec<RecordFilter>),
  Not(Box<RecordFilter>),
}

impl RecordFilter {
  /// Conjunction that flattens `All` away; an empty conjunction is `All`.
  pub fn and(self, other: RecordFilter) -> RecordFilter {
    match (self, other) {
      (RecordFilter::All, f) | (f, RecordFilter::All) => f,
      (RecordFilter::And(mut lhs), RecordFilter::And(rhs)) => {
        lhs.extend(rhs);
        RecordFilter::And(lhs)
      }
      (RecordFilter::And(mut lhs), f) => {
        lhs.push(f);
        RecordFilter::And(lhs)
      }
      (f, g) => RecordFilter::And(vec![f, g]),
    }
  }

  pub fn or(self, other: RecordFilter) -> RecordFilter {
    match (self, other) {
      (RecordFilter::Or(mut lhs), RecordFilter::Or(rhs)) => {
        lhs.extend(rhs);
        RecordFilter::Or(lhs)
      }
      (RecordFilter::Or(mut lhs), f) => {
        lhs.push(f);
        RecordFilter::Or(lhs)
      }
      (f, g) => RecordFilter::Or(vec![f, g]),
    }
  }

  #[allow(clippy::should_implement_trait)]
  pub fn not(self) -> RecordFilter { RecordFilter::Not(Box::new(self)) }

  /// Live source records: `ACTUAL` ones, plus `DELETED` ones when
  /// `include_deleted` is set.
  pub fn source_records(include_deleted: bool) -> RecordFilter {
    let actual = RecordFilter::State(RecordState::Actual);
    if include_deleted {
      actual.or(RecordFilter::State(RecordState::Deleted))
    } else {
      actual
    }
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
  Order,
  CreatedDate,
  UpdatedDate,
  Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
  pub field:     RecordField,
  pub direction: SortDirection,
}

impl OrderBy {
  pub fn asc(field: RecordField) -> Self {
    Self { field, direction: SortDirection::Asc }
  }

  pub fn desc(field: RecordField) -> Self {
    Self { field, direction: SortDirection::Desc }
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::SourceStorage::list_records`] and
/// [`crate::store::SourceStorage::list_source_records`].
#[derive(Debug, Clone)]
pub struct RecordQuery {
  pub filter:   RecordFilter,
  pub order_by: Vec<OrderBy>,
  pub offset:   usize,
  pub limit:    usize,
}

impl RecordQuery {
  pub const DEFAULT_LIMIT: usize = 10;

  pub fn new(filter: RecordFilter) -> Self {
    Self {
      filter,
      order_by: Vec::new(),
      offset: 0,
      limit: Self::DEFAULT_LIMIT,
    }
  }

  pub fn order_by(mut self, order: OrderBy) -> Self {
    self.order_by.push(order);
    self
  }

  pub fn page(mut self, offset: usize, limit: usize) -> Self {
    self.offset = offset;
    self.limit = limit;
    self
  }
}

impl Default for RecordQuery {
  fn default() -> Self { Self::new(RecordFilter::All) }
}
