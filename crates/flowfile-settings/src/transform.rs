//! Closure factories: turns a frozen `NodeSettings` into the actual
//! `Fn(&[DataHandle]) -> DataHandle` transform the node runs at execution
//! time. Each arm builds a `polars` lazy plan; only `ManualInput`, `Sample`,
//! and `Pivot` force a collect, since each is inherently small, row-bound,
//! or not expressible as a lazy op.

use crate::catalog::*;
use crate::graph_solver::solve_components;
use crate::user_fn::lookup_user_function;
use crate::NodeSettings;
use flowfile_data::{schema_from_polars, DataHandle, TransformError};
use flowfile_schema::Schema;
use polars::prelude::*;
use polars::sql::SQLContext;

fn require_one(inputs: &[DataHandle]) -> Result<&DataHandle, TransformError> {
    inputs
        .first()
        .filter(|_| inputs.len() == 1)
        .ok_or_else(|| TransformError::InvalidInput(format!("expected 1 input, got {}", inputs.len())))
}

fn require_two(inputs: &[DataHandle]) -> Result<(&DataHandle, &DataHandle), TransformError> {
    match inputs {
        [left, right] => Ok((left, right)),
        other => Err(TransformError::InvalidInput(format!("expected 2 inputs, got {}", other.len()))),
    }
}

fn wrap(plan: LazyFrame, schema: Schema) -> DataHandle {
    DataHandle::from_plan(plan, schema)
}

fn agg_expr(agg: AggFunc, column: &str, output: &str) -> Expr {
    let base = col(column);
    let applied = match agg {
        AggFunc::Sum => base.sum(),
        AggFunc::Mean => base.mean(),
        AggFunc::Min => base.min(),
        AggFunc::Max => base.max(),
        AggFunc::Count => base.count(),
        AggFunc::First => base.first(),
        AggFunc::Last => base.last(),
    };
    applied.alias(output)
}

impl NodeSettings {
    /// Applies this node's transformation to its resolved input handles,
    /// producing the output `DataHandle`. The schema carried on the result
    /// comes from `predict_schema`, recomputed here against the inputs'
    /// actual schemas so a stale `cached_schema` never leaks into data.
    pub fn apply(&self, inputs: &[DataHandle], predicted: Schema) -> Result<DataHandle, TransformError> {
        match self {
            NodeSettings::Read(s) => apply_read(s, predicted),
            NodeSettings::ManualInput(s) => apply_manual_input(s, predicted),
            NodeSettings::ExternalSource(_) | NodeSettings::CloudStorageReader(_) | NodeSettings::DatabaseReader(_) => {
                Err(TransformError::InvalidInput(
                    "this node kind requires a configured external collaborator and has no built-in transform".to_string(),
                ))
            }

            NodeSettings::Filter(s) => {
                let input = require_one(inputs)?;
                let expr = polars_expr_from_str(&s.predicate)?;
                Ok(wrap(input.lazy().filter(expr), predicted))
            }
            NodeSettings::Formula(s) => {
                let input = require_one(inputs)?;
                let expr = polars_expr_from_str(&s.expression)?.alias(&s.output_column);
                Ok(wrap(input.lazy().with_columns([expr]), predicted))
            }
            NodeSettings::Select(s) => {
                let input = require_one(inputs)?;
                let exprs: Vec<Expr> = s
                    .columns
                    .iter()
                    .filter(|c| c.keep)
                    .map(|c| {
                        let e = col(&c.original_name);
                        match &c.renamed_to {
                            Some(new_name) => e.alias(new_name),
                            None => e,
                        }
                    })
                    .collect();
                Ok(wrap(input.lazy().select(exprs), predicted))
            }
            NodeSettings::GroupBy(s) => {
                let input = require_one(inputs)?;
                let by: Vec<Expr> = s.group_by_columns.iter().map(|c| col(c)).collect();
                let aggs: Vec<Expr> = s.aggregations.iter().map(|a| agg_expr(a.agg, &a.column, &a.output_column)).collect();
                Ok(wrap(input.lazy().group_by(by).agg(aggs), predicted))
            }
            NodeSettings::Pivot(s) => apply_pivot(s, require_one(inputs)?, predicted),
            NodeSettings::Unpivot(s) => {
                let input = require_one(inputs)?;
                let args = UnpivotArgsDSL {
                    on: s.value_columns.iter().map(|c| c.as_str().into()).collect(),
                    index: s.index_columns.iter().map(|c| c.as_str().into()).collect(),
                    variable_name: Some("variable".into()),
                    value_name: Some("value".into()),
                };
                Ok(wrap(input.lazy().unpivot(args), predicted))
            }
            NodeSettings::Sort(s) => {
                let input = require_one(inputs)?;
                let exprs: Vec<Expr> = s.by.iter().map(|k| col(&k.column)).collect();
                let options = SortMultipleOptions::default()
                    .with_order_descending_multi(s.by.iter().map(|k| k.descending).collect::<Vec<_>>());
                Ok(wrap(input.lazy().sort_by_exprs(exprs, options), predicted))
            }
            NodeSettings::Unique(s) => {
                let input = require_one(inputs)?;
                let keep = match s.keep {
                    UniqueKeep::First => UniqueKeepStrategy::First,
                    UniqueKeep::Last => UniqueKeepStrategy::Last,
                    UniqueKeep::Any => UniqueKeepStrategy::Any,
                };
                Ok(wrap(input.lazy().unique(s.subset.clone(), keep), predicted))
            }
            NodeSettings::Sample(s) => {
                let input = require_one(inputs)?;
                let df = input.collect().map_err(|e| TransformError::Engine(e.to_string()))?;
                let sampled = df
                    .sample_n_literal(s.n, false, false, s.seed)
                    .map_err(|e| TransformError::Engine(e.to_string()))?;
                Ok(DataHandle::from_dataframe(sampled, predicted))
            }
            NodeSettings::RecordId(s) => {
                let input = require_one(inputs)?;
                let id_expr = int_range(lit(s.offset), lit(s.offset) + len(), 1, DataType::Int64).alias(&s.output_column);
                let rest: Vec<Expr> = predicted
                    .fields()
                    .iter()
                    .filter(|f| f.name != s.output_column)
                    .map(|f| col(&f.name))
                    .collect();
                let mut select_exprs = vec![id_expr];
                select_exprs.extend(rest);
                Ok(wrap(input.lazy().select(select_exprs), predicted))
            }
            NodeSettings::TextToRows(s) => {
                let input = require_one(inputs)?;
                let split = col(&s.column).str().split(lit(s.delimiter.clone())).alias(&s.output_column);
                Ok(wrap(input.lazy().with_columns([split]).explode([col(&s.output_column)]), predicted))
            }
            NodeSettings::PolarsCode(s) => {
                let input = require_one(inputs)?;
                let mut ctx = SQLContext::new();
                ctx.register("input", input.lazy());
                let plan = ctx.execute(&s.code).map_err(|e| TransformError::InvalidInput(format!("invalid polars_code: {e}")))?;
                let schema = if predicted.is_empty() {
                    let polars_schema = plan.clone().collect_schema().map_err(|e| TransformError::Engine(e.to_string()))?;
                    schema_from_polars(&polars_schema)
                } else {
                    predicted
                };
                Ok(wrap(plan, schema))
            }
            NodeSettings::GraphSolver(s) => {
                let input = require_one(inputs)?;
                let df = input.collect()?;
                let labeled = solve_components(&df, &s.from_column, &s.to_column, &s.output_column)?;
                let schema = if predicted.is_empty() { schema_from_polars(&labeled.schema()) } else { predicted };
                Ok(DataHandle::from_dataframe(labeled, schema))
            }
            NodeSettings::DatabaseWriter(_) | NodeSettings::CloudStorageWriter(_) | NodeSettings::Output(_) => {
                let input = require_one(inputs)?;
                Ok(wrap(input.lazy(), predicted))
            }
            NodeSettings::Union(_) => {
                let plans: Vec<LazyFrame> = inputs.iter().map(|h| h.lazy()).collect();
                let unioned = concat(plans, UnionArgs::default()).map_err(|e| TransformError::Engine(e.to_string()))?;
                Ok(wrap(unioned, predicted))
            }
            NodeSettings::UserDefined(s) => {
                let f = lookup_user_function(&s.function_id)
                    .ok_or_else(|| TransformError::InvalidInput(format!("no user function registered under '{}'", s.function_id)))?;
                let dfs: Vec<DataFrame> = inputs.iter().map(|h| h.collect()).collect::<Result<_, _>>()?;
                let params = serde_json::Value::Object(s.params.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
                let out = f(&dfs, &params)?;
                let schema = if predicted.is_empty() { schema_from_polars(&out.schema()) } else { predicted };
                Ok(DataHandle::from_dataframe(out, schema))
            }
            NodeSettings::Join(s) => {
                let (left, right) = require_two(inputs)?;
                let how = match s.how {
                    JoinHow::Inner => JoinType::Inner,
                    JoinHow::Left => JoinType::Left,
                    JoinHow::Outer => JoinType::Full,
                    JoinHow::Semi => JoinType::Semi,
                    JoinHow::Anti => JoinType::Anti,
                };
                let args = JoinArgs::new(how).with_suffix(Some(s.suffix.clone().into()));
                let left_on: Vec<Expr> = s.left_on.iter().map(|c| col(c)).collect();
                let right_on: Vec<Expr> = s.right_on.iter().map(|c| col(c)).collect();
                Ok(wrap(left.lazy().join(right.lazy(), left_on, right_on, args), predicted))
            }
            NodeSettings::CrossJoin(s) => {
                let (left, right) = require_two(inputs)?;
                Ok(wrap(left.lazy().cross_join(right.lazy(), Some(s.suffix.clone().into())), predicted))
            }
        }
    }
}

fn apply_read(s: &ReadSettings, predicted: Schema) -> Result<DataHandle, TransformError> {
    let plan = match s.file_format {
        FileFormat::Csv => LazyCsvReader::new(&s.path)
            .with_has_header(s.has_header)
            .finish()
            .map_err(|e| TransformError::Engine(e.to_string()))?,
        FileFormat::Parquet => LazyFrame::scan_parquet(&s.path, Default::default()).map_err(|e| TransformError::Engine(e.to_string()))?,
        FileFormat::Ipc => LazyFrame::scan_ipc(&s.path, Default::default()).map_err(|e| TransformError::Engine(e.to_string()))?,
        FileFormat::Json => LazyJsonLineReader::new(&s.path).finish().map_err(|e| TransformError::Engine(e.to_string()))?,
    };
    // `predict_schema` can't inspect the file without materializing it, so
    // it never populates `predicted` for this kind. Derive it here from the
    // lazy plan itself, the same way `apply_manual_input` falls back to the
    // `DataFrame`'s own schema.
    let schema = if predicted.is_empty() {
        let polars_schema = plan.clone().collect_schema().map_err(|e| TransformError::Engine(e.to_string()))?;
        schema_from_polars(&polars_schema)
    } else {
        predicted
    };
    Ok(wrap(plan, schema))
}

fn apply_manual_input(s: &ManualInputSettings, predicted: Schema) -> Result<DataHandle, TransformError> {
    let json = serde_json::Value::Array(
        s.rows
            .iter()
            .map(|row| serde_json::Value::Object(row.clone().into_iter().collect()))
            .collect(),
    );
    let bytes = serde_json::to_vec(&json).map_err(|e| TransformError::InvalidInput(e.to_string()))?;
    let cursor = std::io::Cursor::new(bytes);
    let df = JsonReader::new(cursor).finish().map_err(|e| TransformError::Engine(e.to_string()))?;
    let schema = if predicted.is_empty() { schema_from_polars(&df.schema()) } else { predicted };
    Ok(DataHandle::from_dataframe(df, schema))
}

fn apply_pivot(s: &PivotSettings, input: &DataHandle, predicted: Schema) -> Result<DataHandle, TransformError> {
    let df = input.collect().map_err(|e| TransformError::Engine(e.to_string()))?;
    let agg_expr = match s.agg {
        AggFunc::Sum => col(&s.value_column).sum(),
        AggFunc::Mean => col(&s.value_column).mean(),
        AggFunc::Min => col(&s.value_column).min(),
        AggFunc::Max => col(&s.value_column).max(),
        AggFunc::Count => col(&s.value_column).count(),
        AggFunc::First => col(&s.value_column).first(),
        AggFunc::Last => col(&s.value_column).last(),
    };
    let pivoted = polars::prelude::pivot::pivot_stable(
        &df,
        [&s.pivot_column],
        Some(s.index_columns.iter().collect::<Vec<_>>()),
        Some([&s.value_column]),
        false,
        Some(agg_expr),
        None,
    )
    .map_err(|e| TransformError::Engine(e.to_string()))?;
    let schema = if predicted.is_empty() { schema_from_polars(&pivoted.schema()) } else { predicted };
    Ok(DataHandle::from_dataframe(pivoted, schema))
}

fn polars_expr_from_str(expression: &str) -> Result<Expr, TransformError> {
    // A restrained subset: bare column comparisons/arithmetic of the shape
    // Flowfile's formula/filter editor emits, parsed by the `polars-sql`
    // expression grammar the engine embeds for exactly this purpose rather
    // than a hand-rolled parser here.
    polars::sql::sql_expr(expression).map_err(|e| TransformError::InvalidInput(format!("invalid expression '{expression}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommonSettings, FilterSettings};

    #[test]
    fn filter_requires_exactly_one_input() {
        let settings = NodeSettings::Filter(FilterSettings {
            common: CommonSettings::new(1, 1),
            depending_on_id: 0,
            predicate: "a > 1".into(),
        });
        let err = settings.apply(&[], Schema::empty()).unwrap_err();
        assert!(matches!(err, TransformError::InvalidInput(_)));
    }
}
