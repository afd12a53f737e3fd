//! # Field Copier
//!
//! Copies stored field values between content objects by walking the
//! source's field manifest. Computed fields and excluded names are skipped.
//! Values are copied verbatim; nothing is validated, transitioned or
//! reindexed.

use crate::models::{Content, FieldValues};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct FieldCopier {
    excluded: HashSet<String>,
}

impl FieldCopier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn excluding<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().and_excluding(names)
    }

    /// Add more names to the exclusion set
    pub fn and_excluding<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    /// Copy every copyable field the source has a value for. Returns the
    /// number of fields the destination accepted.
    pub fn copy(&self, source: &dyn Content, destination: &mut dyn Content) -> usize {
        let mut copied = 0;
        for (name, value) in self.to_record(source) {
            if destination.set_field(&name, value) {
                copied += 1;
            }
        }
        copied
    }

    /// Collect copyable field values into a plain record
    pub fn to_record(&self, source: &dyn Content) -> FieldValues {
        let mut record = FieldValues::new();
        for field in source.manifest() {
            if field.is_computed() || self.is_excluded(field.name) {
                continue;
            }
            if let Some(value) = source.field_values().get(field.name) {
                record.insert(field.name.to_string(), value.clone());
            }
        }
        record
    }
}
