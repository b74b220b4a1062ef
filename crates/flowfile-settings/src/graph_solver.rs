//! Connected-component labeling for `graph_solver` nodes: each row names an
//! edge via `from_column`/`to_column`, and every vertex reachable from every
//! other through those edges gets the same id written into `output_column`.
//! This is irreducibly data-dependent (the component structure can only be
//! known by walking the actual edge values), so unlike the rest of the
//! catalog's transforms it collects its input up front rather than composing
//! a lazy expression.

use flowfile_data::TransformError;
use polars::prelude::*;
use std::collections::HashMap;

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Labels every row of `df` with the id of the connected component its
/// `from_column`/`to_column` pair belongs to, writing the result to
/// `output_column`. Component ids are assigned in first-seen order over the
/// `from_column` values, starting at 0, so the result is deterministic for a
/// given row order.
pub fn solve_components(df: &DataFrame, from_column: &str, to_column: &str, output_column: &str) -> Result<DataFrame, TransformError> {
    let from_ca = df
        .column(from_column)
        .map_err(|e| TransformError::Engine(e.to_string()))?
        .cast(&DataType::String)
        .map_err(|e| TransformError::Engine(e.to_string()))?;
    let to_ca = df
        .column(to_column)
        .map_err(|e| TransformError::Engine(e.to_string()))?
        .cast(&DataType::String)
        .map_err(|e| TransformError::Engine(e.to_string()))?;
    let from_ca = from_ca.str().map_err(|e| TransformError::Engine(e.to_string()))?;
    let to_ca = to_ca.str().map_err(|e| TransformError::Engine(e.to_string()))?;

    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut key = |v: Option<&str>| -> usize {
        let k = v.unwrap_or("").to_string();
        let next = index_of.len();
        *index_of.entry(k).or_insert(next)
    };

    let from_idx: Vec<usize> = from_ca.into_iter().map(&mut key).collect();
    let to_idx: Vec<usize> = to_ca.into_iter().map(&mut key).collect();

    let mut uf = UnionFind::new(index_of.len());
    for (&a, &b) in from_idx.iter().zip(to_idx.iter()) {
        uf.union(a, b);
    }

    let mut component_id: HashMap<usize, i64> = HashMap::new();
    let labels: Vec<i64> = from_idx
        .iter()
        .map(|&idx| {
            let root = uf.find(idx);
            let next_id = component_id.len() as i64;
            *component_id.entry(root).or_insert(next_id)
        })
        .collect();

    let mut out = df.clone();
    let column = Series::new(output_column.into(), labels);
    out.with_column(column).map_err(|e| TransformError::Engine(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn two_disjoint_chains_get_two_labels() {
        let df = df![
            "from" => ["a", "b", "x", "y"],
            "to" => ["b", "c", "y", "z"],
        ]
        .unwrap();
        let out = solve_components(&df, "from", "to", "component").unwrap();
        let labels: Vec<i64> = out.column("component").unwrap().i64().unwrap().into_no_null_iter().collect();
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[0], labels[2]);
        assert_eq!(labels[2], labels[3]);
    }

    #[test]
    fn a_bridging_edge_merges_two_components() {
        let df = df![
            "from" => ["a", "x", "b"],
            "to" => ["b", "y", "x"],
        ]
        .unwrap();
        let out = solve_components(&df, "from", "to", "component").unwrap();
        let labels: Vec<i64> = out.column("component").unwrap().i64().unwrap().into_no_null_iter().collect();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
    }
}
