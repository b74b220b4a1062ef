use serde::{Deserialize, Serialize};

/// Closed set of logical column types a `Field` can carry.
///
/// Nested variants are boxed/owned so a `TypeTag` remains cheap to clone at
/// the shallow levels that dominate real schemas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeTag {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Boolean,
    String,
    Date,
    Datetime,
    Duration,
    List(Box<TypeTag>),
    Struct(Vec<crate::Field>),
}

impl TypeTag {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeTag::Int8
                | TypeTag::Int16
                | TypeTag::Int32
                | TypeTag::Int64
                | TypeTag::UInt8
                | TypeTag::UInt16
                | TypeTag::UInt32
                | TypeTag::UInt64
                | TypeTag::Float32
                | TypeTag::Float64
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, TypeTag::Date | TypeTag::Datetime | TypeTag::Duration)
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, TypeTag::List(_) | TypeTag::Struct(_))
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeTag::Int8 => write!(f, "Int8"),
            TypeTag::Int16 => write!(f, "Int16"),
            TypeTag::Int32 => write!(f, "Int32"),
            TypeTag::Int64 => write!(f, "Int64"),
            TypeTag::UInt8 => write!(f, "UInt8"),
            TypeTag::UInt16 => write!(f, "UInt16"),
            TypeTag::UInt32 => write!(f, "UInt32"),
            TypeTag::UInt64 => write!(f, "UInt64"),
            TypeTag::Float32 => write!(f, "Float32"),
            TypeTag::Float64 => write!(f, "Float64"),
            TypeTag::Boolean => write!(f, "Boolean"),
            TypeTag::String => write!(f, "String"),
            TypeTag::Date => write!(f, "Date"),
            TypeTag::Datetime => write!(f, "Datetime"),
            TypeTag::Duration => write!(f, "Duration"),
            TypeTag::List(inner) => write!(f, "List[{}]", inner),
            TypeTag::Struct(fields) => {
                write!(f, "Struct{{{}}}", fields.len())
            }
        }
    }
}
