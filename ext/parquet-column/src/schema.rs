use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ParquetError, Result};

/// Physical storage types of leaf columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    ByteArray,
    /// Fixed-length byte array with the given width in bytes
    FixedLenByteArray(usize),
}

impl PhysicalType {
    /// Get the type name for display
    pub fn type_name(&self) -> &'static str {
        match self {
            PhysicalType::Boolean => "Boolean",
            PhysicalType::Int32 => "Int32",
            PhysicalType::Int64 => "Int64",
            PhysicalType::Float => "Float",
            PhysicalType::Double => "Double",
            PhysicalType::ByteArray => "ByteArray",
            PhysicalType::FixedLenByteArray(_) => "FixedLenByteArray",
        }
    }

    /// Width of a PLAIN-encoded value, `None` for variable-length values
    /// and for booleans which are bit-packed
    pub fn plain_width(&self) -> Option<usize> {
        match self {
            PhysicalType::Int32 | PhysicalType::Float => Some(4),
            PhysicalType::Int64 | PhysicalType::Double => Some(8),
            PhysicalType::FixedLenByteArray(len) => Some(*len),
            PhysicalType::Boolean | PhysicalType::ByteArray => None,
        }
    }

    /// Check if values of this type have a defined min/max ordering usable
    /// by `lt`/`gt` style predicates
    pub fn supports_ordering(&self) -> bool {
        !matches!(self, PhysicalType::Boolean)
    }
}

/// Describes a single flat leaf column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: Arc<str>,
    physical_type: PhysicalType,
    nullable: bool,
}

impl ColumnDescriptor {
    /// Create a descriptor, rejecting zero-width fixed-length columns
    pub fn new<S: AsRef<str>>(name: S, physical_type: PhysicalType, nullable: bool) -> Result<Self> {
        if let PhysicalType::FixedLenByteArray(0) = physical_type {
            return Err(ParquetError::Configuration(format!(
                "Column '{}' declares a fixed length of 0",
                name.as_ref()
            )));
        }
        Ok(Self {
            name: Arc::from(name.as_ref()),
            physical_type,
            nullable,
        })
    }

    /// Shorthand for a non-nullable column
    pub fn required<S: AsRef<str>>(name: S, physical_type: PhysicalType) -> Result<Self> {
        Self::new(name, physical_type, false)
    }

    /// Shorthand for a nullable column
    pub fn optional<S: AsRef<str>>(name: S, physical_type: PhysicalType) -> Result<Self> {
        Self::new(name, physical_type, true)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Maximum definition level of a flat column
    pub fn max_def_level(&self) -> i16 {
        if self.nullable {
            1
        } else {
            0
        }
    }
}

/// A flat set of leaf columns, used to validate predicates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Find a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Builder for creating schemas
#[derive(Default)]
pub struct SchemaBuilder {
    columns: Vec<ColumnDescriptor>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> Result<Schema> {
        for (idx, column) in self.columns.iter().enumerate() {
            if self.columns[..idx].iter().any(|c| c.name() == column.name()) {
                return Err(ParquetError::Configuration(format!(
                    "Duplicate column name: {}",
                    column.name()
                )));
            }
        }
        Ok(Schema {
            columns: self.columns,
        })
    }
}
