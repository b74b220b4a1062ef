//! Per-kind schema prediction and validation.
//!
//! Every function here is pure: given settings and the parents' already-known
//! schemas, it returns the output schema or a typed error. None of this
//! touches a `DataHandle`.

use crate::catalog::*;
use crate::{NodeSettings, ValidationError};
use flowfile_schema::{Field, Schema, SchemaError, TypeTag};

fn require_one(inputs: &[Schema]) -> Result<&Schema, SchemaError> {
    match inputs {
        [only] => Ok(only),
        other => Err(SchemaError::WrongInputCount {
            expected: 1,
            got: other.len(),
        }),
    }
}

fn require_two(inputs: &[Schema]) -> Result<(&Schema, &Schema), SchemaError> {
    match inputs {
        [left, right] => Ok((left, right)),
        other => Err(SchemaError::WrongInputCount {
            expected: 2,
            got: other.len(),
        }),
    }
}

fn agg_output_type(agg: AggFunc, input_type: &TypeTag) -> TypeTag {
    match agg {
        AggFunc::Count => TypeTag::UInt32,
        AggFunc::Sum | AggFunc::Mean => {
            if input_type.is_numeric() {
                TypeTag::Float64
            } else {
                input_type.clone()
            }
        }
        AggFunc::Min | AggFunc::Max | AggFunc::First | AggFunc::Last => input_type.clone(),
    }
}

pub(crate) fn predict(settings: &NodeSettings, inputs: &[Schema]) -> Result<Schema, SchemaError> {
    match settings {
        NodeSettings::ManualInput(s) => predict_manual_input(s),

        NodeSettings::Read(_)
        | NodeSettings::DatabaseReader(_)
        | NodeSettings::CloudStorageReader(_)
        | NodeSettings::ExternalSource(_)
        | NodeSettings::PolarsCode(_)
        | NodeSettings::UserDefined(_)
        | NodeSettings::Pivot(_) => {
            // Unknowable without inspecting data or running arbitrary code;
            // stays `None` until the node actually executes once, at which
            // point the engine backfills `cached_schema` from the real
            // result.
            Err(SchemaError::UpstreamUnavailable)
        }

        NodeSettings::Filter(_) | NodeSettings::Sort(_) | NodeSettings::Unique(_) | NodeSettings::Sample(_) | NodeSettings::TextToRows(_) => {
            require_one(inputs).cloned()
        }

        NodeSettings::Formula(s) => predict_formula(s, require_one(inputs)?),
        NodeSettings::Select(s) => predict_select(s, require_one(inputs)?),
        NodeSettings::GroupBy(s) => predict_group_by(s, require_one(inputs)?),
        NodeSettings::Unpivot(s) => predict_unpivot(s, require_one(inputs)?),
        NodeSettings::RecordId(s) => predict_record_id(s, require_one(inputs)?),
        NodeSettings::GraphSolver(s) => predict_graph_solver(s, require_one(inputs)?),

        NodeSettings::DatabaseWriter(_) | NodeSettings::CloudStorageWriter(_) | NodeSettings::Output(_) => {
            require_one(inputs).cloned()
        }

        NodeSettings::Union(_) => predict_union(inputs),

        NodeSettings::Join(s) => {
            let (left, right) = require_two(inputs)?;
            predict_join(s, left, right)
        }
        NodeSettings::CrossJoin(s) => {
            let (left, right) = require_two(inputs)?;
            predict_cross_join(s, left, right)
        }
    }
}

fn predict_manual_input(s: &ManualInputSettings) -> Result<Schema, SchemaError> {
    let Some(first) = s.rows.first() else {
        return Ok(Schema::empty());
    };
    let fields = first
        .iter()
        .enumerate()
        .map(|(i, (name, value))| Field::new(name.clone(), type_tag_from_json(value), i as i32, value.is_null()))
        .collect();
    Ok(Schema::new(fields))
}

fn type_tag_from_json(value: &serde_json::Value) -> TypeTag {
    match value {
        serde_json::Value::Bool(_) => TypeTag::Boolean,
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => TypeTag::Int64,
        serde_json::Value::Number(_) => TypeTag::Float64,
        serde_json::Value::Array(_) => TypeTag::List(Box::new(TypeTag::String)),
        serde_json::Value::Object(_) => TypeTag::Struct(Vec::new()),
        _ => TypeTag::String,
    }
}

fn predict_formula(s: &FormulaSettings, input: &Schema) -> Result<Schema, SchemaError> {
    let mut fields: Vec<Field> = input.fields().to_vec();
    if let Some(existing) = fields.iter_mut().find(|f| f.name == s.output_column) {
        existing.logical_type = TypeTag::Float64;
    } else {
        let position = fields.len() as i32;
        fields.push(Field::new(s.output_column.clone(), TypeTag::Float64, position, true));
    }
    Ok(Schema::new(fields))
}

fn predict_select(s: &SelectSettings, input: &Schema) -> Result<Schema, SchemaError> {
    let mut fields = Vec::new();
    for (i, col) in s.columns.iter().filter(|c| c.keep).enumerate() {
        let source = input
            .field(&col.original_name)
            .ok_or_else(|| SchemaError::MissingColumn(col.original_name.clone()))?;
        let mut field = source.clone();
        field.position = i as i32;
        if let Some(new_name) = &col.renamed_to {
            field.name = new_name.clone();
        }
        fields.push(field);
    }
    Ok(Schema::new(fields))
}

fn predict_group_by(s: &GroupBySettings, input: &Schema) -> Result<Schema, SchemaError> {
    let mut fields = Vec::new();
    let mut position = 0;
    for name in &s.group_by_columns {
        let source = input.field(name).ok_or_else(|| SchemaError::MissingColumn(name.clone()))?;
        let mut field = source.clone();
        field.position = position;
        fields.push(field);
        position += 1;
    }
    for agg in &s.aggregations {
        let source = input
            .field(&agg.column)
            .ok_or_else(|| SchemaError::MissingColumn(agg.column.clone()))?;
        let output_type = agg_output_type(agg.agg, &source.logical_type);
        fields.push(Field::new(agg.output_column.clone(), output_type, position, true));
        position += 1;
    }
    Ok(Schema::new(fields))
}

fn predict_unpivot(s: &UnpivotSettings, input: &Schema) -> Result<Schema, SchemaError> {
    let mut fields = Vec::new();
    let mut position = 0;
    for name in &s.index_columns {
        let source = input.field(name).ok_or_else(|| SchemaError::MissingColumn(name.clone()))?;
        let mut field = source.clone();
        field.position = position;
        fields.push(field);
        position += 1;
    }
    let value_type = s
        .value_columns
        .iter()
        .filter_map(|name| input.field(name))
        .map(|f| f.logical_type.clone())
        .reduce(|a, b| if a == b { a } else { TypeTag::String })
        .unwrap_or(TypeTag::String);
    fields.push(Field::new("variable", TypeTag::String, position, false));
    fields.push(Field::new("value", value_type, position + 1, true));
    Ok(Schema::new(fields))
}

fn predict_record_id(s: &RecordIdSettings, input: &Schema) -> Result<Schema, SchemaError> {
    let mut fields = vec![Field::new(s.output_column.clone(), TypeTag::Int64, 0, false)];
    for f in input.fields() {
        let mut field = f.clone();
        field.position += 1;
        fields.push(field);
    }
    Ok(Schema::new(fields))
}

fn predict_graph_solver(s: &GraphSolverSettings, input: &Schema) -> Result<Schema, SchemaError> {
    input.require_columns(&[&s.from_column, &s.to_column])?;
    let mut fields = input.fields().to_vec();
    let position = fields.len() as i32;
    fields.push(Field::new(s.output_column.clone(), TypeTag::Int64, position, false));
    Ok(Schema::new(fields))
}

fn predict_union(inputs: &[Schema]) -> Result<Schema, SchemaError> {
    let Some(first) = inputs.first() else {
        return Err(SchemaError::WrongInputCount { expected: 1, got: 0 });
    };
    for other in &inputs[1..] {
        if other != first {
            return Err(SchemaError::TypeMismatch {
                column: "<union>".to_string(),
                left: format!("{} columns", first.len()),
                right: format!("{} columns", other.len()),
            });
        }
    }
    Ok(first.clone())
}

fn predict_join(s: &JoinSettings, left: &Schema, right: &Schema) -> Result<Schema, SchemaError> {
    left.require_columns(&s.left_on.iter().map(String::as_str).collect::<Vec<_>>())?;
    right.require_columns(&s.right_on.iter().map(String::as_str).collect::<Vec<_>>())?;

    let mut fields = left.fields().to_vec();
    let mut position = fields.len() as i32;
    for f in right.fields() {
        if s.right_on.contains(&f.name) {
            continue;
        }
        let mut field = f.clone();
        if left.contains(&field.name) {
            field.name = format!("{}{}", field.name, s.suffix);
        }
        field.position = position;
        field.nullable = field.nullable || matches!(s.how, JoinHow::Left | JoinHow::Outer);
        fields.push(field);
        position += 1;
    }
    Ok(Schema::new(fields))
}

fn predict_cross_join(s: &CrossJoinSettings, left: &Schema, right: &Schema) -> Result<Schema, SchemaError> {
    let mut fields = left.fields().to_vec();
    let mut position = fields.len() as i32;
    for f in right.fields() {
        let mut field = f.clone();
        if left.contains(&field.name) {
            field.name = format!("{}{}", field.name, s.suffix);
        }
        field.position = position;
        fields.push(field);
        position += 1;
    }
    Ok(Schema::new(fields))
}

pub(crate) fn validate(settings: &NodeSettings, inputs: &[Schema]) -> Result<(), ValidationError> {
    let kind = settings.kind().as_str();
    let check_columns = |schema: &Schema, names: &[&str]| -> Result<(), ValidationError> {
        for name in names {
            if !schema.contains(name) {
                return Err(ValidationError::UnknownColumn((*name).to_string()));
            }
        }
        Ok(())
    };

    match settings {
        NodeSettings::Select(s) => {
            if let Some(input) = inputs.first() {
                let names: Vec<&str> = s.columns.iter().map(|c| c.original_name.as_str()).collect();
                check_columns(input, &names)?;
            }
        }
        NodeSettings::GroupBy(s) => {
            if let Some(input) = inputs.first() {
                let mut names: Vec<&str> = s.group_by_columns.iter().map(String::as_str).collect();
                names.extend(s.aggregations.iter().map(|a| a.column.as_str()));
                check_columns(input, &names)?;
            }
        }
        NodeSettings::Sort(s) => {
            if let Some(input) = inputs.first() {
                let names: Vec<&str> = s.by.iter().map(|k| k.column.as_str()).collect();
                check_columns(input, &names)?;
            }
        }
        NodeSettings::Unique(s) => {
            if let (Some(input), Some(subset)) = (inputs.first(), &s.subset) {
                let names: Vec<&str> = subset.iter().map(String::as_str).collect();
                check_columns(input, &names)?;
            }
        }
        NodeSettings::Formula(s) if s.expression.trim().is_empty() => {
            return Err(ValidationError::InvalidPayload {
                kind,
                reason: "expression must not be empty".to_string(),
            });
        }
        NodeSettings::Join(s) => {
            if let (Some(left), Some(right)) = (inputs.first(), inputs.get(1)) {
                check_columns(left, &s.left_on.iter().map(String::as_str).collect::<Vec<_>>())?;
                check_columns(right, &s.right_on.iter().map(String::as_str).collect::<Vec<_>>())?;
            }
        }
        NodeSettings::GraphSolver(s) => {
            if let Some(input) = inputs.first() {
                check_columns(input, &[&s.from_column, &s.to_column])?;
            }
        }
        _ => {}
    }

    let required = settings.required_ports();
    if !required.is_empty() && inputs.len() < required.len() {
        return Err(ValidationError::MissingRequiredInput {
            kind,
            port: if required.contains(&crate::Port::Left) { "left" } else { "main" },
        });
    }

    Ok(())
}
