use flowfile_schema::{Field, Schema, TypeTag};
use polars::prelude::DataType;

/// Maps a polars `DataType` onto our closed `TypeTag` taxonomy. Types polars
/// supports that we have no catalog use for (categoricals, binary, decimal,
/// …) collapse to the closest logical type rather than failing — schema
/// prediction must never error on a type the engine itself can produce.
pub fn type_tag_from_polars(dtype: &DataType) -> TypeTag {
    match dtype {
        DataType::Int8 => TypeTag::Int8,
        DataType::Int16 => TypeTag::Int16,
        DataType::Int32 => TypeTag::Int32,
        DataType::Int64 => TypeTag::Int64,
        DataType::UInt8 => TypeTag::UInt8,
        DataType::UInt16 => TypeTag::UInt16,
        DataType::UInt32 => TypeTag::UInt32,
        DataType::UInt64 => TypeTag::UInt64,
        DataType::Float32 => TypeTag::Float32,
        DataType::Float64 => TypeTag::Float64,
        DataType::Boolean => TypeTag::Boolean,
        DataType::String => TypeTag::String,
        DataType::Date => TypeTag::Date,
        DataType::Datetime(_, _) => TypeTag::Datetime,
        DataType::Duration(_) => TypeTag::Duration,
        DataType::List(inner) => TypeTag::List(Box::new(type_tag_from_polars(inner))),
        DataType::Struct(fields) => TypeTag::Struct(
            fields
                .iter()
                .enumerate()
                .map(|(i, f)| Field::new(f.name().as_str(), type_tag_from_polars(f.dtype()), i as i32, true))
                .collect(),
        ),
        _ => TypeTag::String,
    }
}

/// Converts a polars schema (as returned by `LazyFrame::collect_schema`)
/// into our ordered `Schema`.
pub fn schema_from_polars(schema: &polars::prelude::Schema) -> Schema {
    schema
        .iter()
        .enumerate()
        .map(|(i, (name, dtype))| Field::new(name.as_str(), type_tag_from_polars(dtype), i as i32, true))
        .collect()
}
