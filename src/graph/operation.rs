//! Operations recorded against a package repository.
//!
//! Each operation carries an explicit [`OperationType`] discriminant. The
//! discriminant decides which fields are present:
//!
//! - `WithId`        -> `id`             (e.g. listing available versions)
//! - `WithIdVersion` -> `id`, `version`  (e.g. fetching one archive)
//!
//! Trace metadata (hit index, dependencies) lives on the owning node, never on
//! the operation itself.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationType {
    WithId,
    WithIdVersion,
}

impl OperationType {
    pub const ALL: [OperationType; 2] = [OperationType::WithId, OperationType::WithIdVersion];

    /// Textual name used as the `t` property on disk.
    pub const fn name(self) -> &'static str {
        match self {
            OperationType::WithId => "WithId",
            OperationType::WithIdVersion => "WithIdVersion",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    WithId { id: String },
    WithIdVersion { id: String, version: String },
}

impl Operation {
    pub fn with_id(id: impl Into<String>) -> Self {
        Operation::WithId { id: id.into() }
    }

    pub fn with_id_version(id: impl Into<String>, version: impl Into<String>) -> Self {
        Operation::WithIdVersion {
            id: id.into(),
            version: version.into(),
        }
    }

    pub fn operation_type(&self) -> OperationType {
        match self {
            Operation::WithId { .. } => OperationType::WithId,
            Operation::WithIdVersion { .. } => OperationType::WithIdVersion,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Operation::WithId { id } | Operation::WithIdVersion { id, .. } => id,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Operation::WithId { .. } => None,
            Operation::WithIdVersion { version, .. } => Some(version),
        }
    }
}

/// Immutable name <-> discriminant lookup table.
///
/// Built once and handed to the codec. A table may deliberately cover only a
/// subset of [`OperationType`]; the codec then refuses the missing types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTypes {
    by_name: BTreeMap<&'static str, OperationType>,
}

impl OperationTypes {
    pub fn all() -> Self {
        Self::only(&OperationType::ALL)
    }

    pub fn only(types: &[OperationType]) -> Self {
        let by_name = types.iter().map(|t| (t.name(), *t)).collect();
        Self { by_name }
    }

    pub fn parse(&self, name: &str) -> Option<OperationType> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, operation_type: OperationType) -> bool {
        self.by_name.contains_key(operation_type.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = OperationType> + '_ {
        self.by_name.values().copied()
    }
}

impl Default for OperationTypes {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn variant_fields_follow_discriminant() {
        let index = Operation::with_id("foo");
        assert_eq!(index.operation_type(), OperationType::WithId);
        assert_eq!(index.id(), "foo");
        assert_eq!(index.version(), None);

        let nupkg = Operation::with_id_version("foo", "1.0.0");
        assert_eq!(nupkg.operation_type(), OperationType::WithIdVersion);
        assert_eq!(nupkg.version(), Some("1.0.0"));
    }

    #[test]
    fn full_table_parses_every_name() {
        let types = OperationTypes::all();
        for t in OperationType::ALL {
            assert_eq!(types.parse(t.name()), Some(t));
            assert!(types.contains(t));
        }
        assert_eq!(types.parse("withid"), None);
        assert_eq!(types.parse("PackageBaseAddressIndex"), None);
    }

    #[test]
    fn restricted_table_drops_missing_types() {
        let types = OperationTypes::only(&[OperationType::WithId]);
        assert!(types.contains(OperationType::WithId));
        assert!(!types.contains(OperationType::WithIdVersion));
        assert_eq!(types.parse("WithIdVersion"), None);
        assert_eq!(types.iter().collect::<Vec<_>>(), vec![OperationType::WithId]);
    }
}
