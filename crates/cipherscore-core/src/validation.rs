//! Field validation for new records.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::record::RecordFields;
use crate::types::MAX_RECORD_ID_LEN;

/// Size limits applied to caller-supplied fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    /// Can only tighten [`MAX_RECORD_ID_LEN`]; larger values are clamped to it.
    pub max_id_len: usize,
    pub max_label_len: usize,
    pub max_notes_len: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            max_id_len: MAX_RECORD_ID_LEN,
            max_label_len: 128,
            max_notes_len: 1024,
        }
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(CoreError::FieldTooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

/// Validate an id string against the limits.
///
/// [`RecordId::new`](crate::RecordId::new) enforces the absolute maximum;
/// this enforces a deployment's possibly tighter one.
pub fn validate_id(id: &str, limits: &FieldLimits) -> Result<()> {
    if id.is_empty() {
        return Err(CoreError::EmptyField { field: "id" });
    }
    check_len("id", id, limits.max_id_len.min(MAX_RECORD_ID_LEN))
}

/// Validate the plaintext fields of a new record.
///
/// The label must be non-empty. Whitespace counts as content, as for ids.
pub fn validate_fields(fields: &RecordFields, limits: &FieldLimits) -> Result<()> {
    if fields.label.is_empty() {
        return Err(CoreError::EmptyField { field: "label" });
    }
    check_len("label", &fields.label, limits.max_label_len)?;
    check_len("notes", &fields.notes, limits.max_notes_len)
}
