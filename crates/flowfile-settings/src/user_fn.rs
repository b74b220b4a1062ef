//! A process-wide registry of user-defined transforms, keyed by the
//! `function_id` a `UserDefinedSettings` node names.
//!
//! Every built-in kind carries its transform inline via `NodeSettings::apply`
//! (see `transform.rs`); `user_defined` is the one kind whose payload names a
//! transform rather than encoding one, so the host application registers a
//! closure ahead of time and the node looks it up by id at execution time —
//! the same register-under-a-logical-name shape as a built-in kind, just
//! resolved at runtime instead of compile time.

use dashmap::DashMap;
use flowfile_data::TransformError;
use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use std::sync::Arc;

pub type UserFunction = dyn Fn(&[DataFrame], &serde_json::Value) -> Result<DataFrame, TransformError> + Send + Sync;

static REGISTRY: Lazy<DashMap<String, Arc<UserFunction>>> = Lazy::new(DashMap::new);

/// Registers (or replaces) the transform run for `function_id`.
pub fn register_user_function<F>(function_id: impl Into<String>, f: F)
where
    F: Fn(&[DataFrame], &serde_json::Value) -> Result<DataFrame, TransformError> + Send + Sync + 'static,
{
    REGISTRY.insert(function_id.into(), Arc::new(f));
}

pub fn unregister_user_function(function_id: &str) {
    REGISTRY.remove(function_id);
}

pub fn lookup_user_function(function_id: &str) -> Option<Arc<UserFunction>> {
    REGISTRY.get(function_id).map(|entry| entry.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn registered_function_is_found_by_id() {
        register_user_function("double_a", |inputs, _params| {
            let df = inputs.first().cloned().ok_or_else(|| TransformError::InvalidInput("no input".into()))?;
            Ok(df)
        });
        assert!(lookup_user_function("double_a").is_some());
        assert!(lookup_user_function("no-such-function").is_none());
        unregister_user_function("double_a");
        assert!(lookup_user_function("double_a").is_none());
    }

    #[test]
    fn registered_function_runs() {
        register_user_function("add_flag", |inputs, params| {
            let mut df = inputs.first().cloned().ok_or_else(|| TransformError::InvalidInput("no input".into()))?;
            let flag = params.get("flag").and_then(|v| v.as_bool()).unwrap_or(false);
            let col = polars::prelude::Series::new("flag".into(), vec![flag; df.height()]);
            df.with_column(col).map_err(|e| TransformError::Engine(e.to_string()))?;
            Ok(df)
        });
        let df = df!["a" => [1i64, 2, 3]].unwrap();
        let f = lookup_user_function("add_flag").unwrap();
        let out = f(&[df], &serde_json::json!({"flag": true})).unwrap();
        assert_eq!(out.column("flag").unwrap().len(), 3);
        unregister_user_function("add_flag");
    }
}
