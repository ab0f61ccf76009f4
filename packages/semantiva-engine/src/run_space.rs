//! Fan-out and run-space expansion (SPEC_FULL.md §4.K).
//!
//! A launch declares either a `fanout` block (a flat list of runs read from an inline list or a
//! CSV/JSON file) or a `run_space` block (an ordered list of fan-out-shaped *blocks*, combined
//! under a Cartesian product or an element-wise zip). Both produce the same shape: an ordered
//! sequence of per-run context maps plus a `meta` record describing where the values came from.
//!
//! Grounded on `semantiva/payload_operations/run_space.py`'s `expand_fanout`/`expand_run_space`
//! (inline-vs-file source handling, `single`/`multi_zip` modes, `broadcast` cycling) and
//! `codegraph-orchestration::dag`'s block composition for the Cartesian-product accumulation
//! shape, generalised from graph nodes to fan-out blocks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use semantiva_trace::canonicalise;

use crate::error::{EngineError, Result};

fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// `single` maps each inline/CSV row positionally onto `keys`; `multi_zip` zips a set of named
/// columns together (§4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutMode {
    Single,
    MultiZip,
}

/// One fan-out (or run-space block) declaration. Values are either supplied inline or read from
/// `source_file` (a `.csv` or `.json` path resolved relative to the caller's `cwd`); exactly one
/// of the two must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutSpec {
    pub mode: Option<FanoutMode>,
    /// For `single`: the ordered context keys each row's positional values are bound to.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Inline rows for `single` mode: `rows[i][j]` binds to `keys[j]`.
    #[serde(default)]
    pub rows: Option<Vec<Vec<Value>>>,
    /// Inline named columns for `multi_zip` mode.
    #[serde(default)]
    pub columns: Option<IndexMap<String, Vec<Value>>>,
    #[serde(default)]
    pub source_file: Option<PathBuf>,
    /// When set, a column/row set shorter than the longest one cycles rather than erroring.
    #[serde(default)]
    pub broadcast: bool,
}

impl FanoutSpec {
    fn mode(&self) -> FanoutMode {
        self.mode.unwrap_or(if self.columns.is_some() { FanoutMode::MultiZip } else { FanoutMode::Single })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    Product,
    Zip,
}

fn default_max_runs() -> usize {
    10_000
}

/// `run_space` declaration (§4.K): an ordered list of fan-out-shaped blocks, combined by
/// Cartesian product or element-wise zip, bounded by `max_runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpaceSpec {
    pub blocks: Vec<FanoutSpec>,
    pub combine: CombineMode,
    #[serde(default = "default_max_runs")]
    pub max_runs: usize,
}

/// One expanded run: the context values it contributes, and (for file-backed fan-outs) the
/// SHA-256 of every source file the run's values were drawn from, used to build `inputs_id`.
#[derive(Debug, Clone)]
pub struct ExpandedRun {
    pub context: IndexMap<String, Value>,
}

/// `meta` accompanying an `expand_fanout`/`expand_run_space` call: `{mode, source_file?,
/// source_sha256?}` per §4.K, one entry per block.
#[derive(Debug, Clone, Serialize)]
pub struct SourceMeta {
    pub mode: FanoutMode,
    pub source_file: Option<String>,
    pub source_sha256: Option<String>,
}

fn read_file(cwd: &Path, path: &Path) -> Result<(String, Vec<u8>)> {
    let resolved = if path.is_absolute() { path.to_path_buf() } else { cwd.join(path) };
    let bytes = std::fs::read(&resolved)?;
    Ok((resolved.to_string_lossy().into_owned(), bytes))
}

/// Parses a CSV file into named columns keyed by its header row.
fn csv_columns(bytes: &[u8]) -> Result<IndexMap<String, Vec<Value>>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = reader.headers().map_err(|e| EngineError::FanoutSourceError(e.to_string()))?.iter().map(str::to_string).collect();
    let mut columns: IndexMap<String, Vec<Value>> = headers.iter().map(|h| (h.clone(), Vec::new())).collect();
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::FanoutSourceError(e.to_string()))?;
        for (header, field) in headers.iter().zip(record.iter()) {
            let value = serde_json::from_str::<Value>(field).unwrap_or_else(|_| Value::String(field.to_string()));
            columns.get_mut(header).expect("header present").push(value);
        }
    }
    Ok(columns)
}

/// Parses a CSV file into ordered rows (header row used only to determine row width, not names).
fn csv_rows(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = reader.headers().map_err(|e| EngineError::FanoutSourceError(e.to_string()))?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::FanoutSourceError(e.to_string()))?;
        let row: Vec<Value> = record
            .iter()
            .map(|field| serde_json::from_str::<Value>(field).unwrap_or_else(|_| Value::String(field.to_string())))
            .collect();
        rows.push(row);
    }
    Ok((headers, rows))
}

fn json_columns(value: Value) -> Result<IndexMap<String, Vec<Value>>> {
    match value {
        Value::Object(map) => {
            let mut columns = IndexMap::new();
            for (key, column) in map {
                match column {
                    Value::Array(items) => {
                        columns.insert(key, items);
                    }
                    other => {
                        return Err(EngineError::FanoutSourceError(format!(
                            "multi_zip JSON column '{key}' must be an array, got {other}"
                        )))
                    }
                }
            }
            Ok(columns)
        }
        other => Err(EngineError::FanoutSourceError(format!("expected a JSON object of columns, got {other}"))),
    }
}

fn json_rows(value: Value) -> Result<Vec<Vec<Value>>> {
    match value {
        Value::Array(rows) => rows
            .into_iter()
            .map(|row| match row {
                Value::Array(items) => Ok(items),
                other => Err(EngineError::FanoutSourceError(format!("expected a JSON array row, got {other}"))),
            })
            .collect(),
        other => Err(EngineError::FanoutSourceError(format!("expected a JSON array of rows, got {other}"))),
    }
}

/// Cycles `values` out to `len` entries when `broadcast` is set; otherwise requires an exact
/// length match.
fn broadcast_to(values: &[Value], len: usize, broadcast: bool, name: &str) -> Result<Vec<Value>> {
    if values.len() == len {
        return Ok(values.to_vec());
    }
    if !broadcast || values.is_empty() {
        return Err(EngineError::FanoutLengthMismatch(BTreeMap::from([(name.to_string(), values.len())])));
    }
    Ok((0..len).map(|i| values[i % values.len()].clone()).collect())
}

/// Expands one [`FanoutSpec`] into its ordered runs plus source metadata (§4.K). Both
/// `expand_fanout` and each block of `expand_run_space` funnel through this.
pub fn expand_fanout(spec: &FanoutSpec, cwd: &Path) -> Result<(Vec<ExpandedRun>, SourceMeta, Option<String>)> {
    let mode = spec.mode();

    let (source_file, source_sha256, file_columns, file_rows) = match &spec.source_file {
        Some(path) => {
            let (resolved, bytes) = read_file(cwd, path)?;
            let sha256 = sha256_hex_bytes(&bytes);
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
            match (mode, extension.as_str()) {
                (FanoutMode::MultiZip, "csv") => (Some(resolved), Some(sha256), Some(csv_columns(&bytes)?), None),
                (FanoutMode::MultiZip, "json") => {
                    let value: Value = serde_json::from_slice(&bytes).map_err(|e| EngineError::FanoutSourceError(e.to_string()))?;
                    (Some(resolved), Some(sha256), Some(json_columns(value)?), None)
                }
                (FanoutMode::Single, "csv") => {
                    let (_headers, rows) = csv_rows(&bytes)?;
                    (Some(resolved), Some(sha256), None, Some(rows))
                }
                (FanoutMode::Single, "json") => {
                    let value: Value = serde_json::from_slice(&bytes).map_err(|e| EngineError::FanoutSourceError(e.to_string()))?;
                    (Some(resolved), Some(sha256), None, Some(json_rows(value)?))
                }
                (_, other) => {
                    return Err(EngineError::FanoutSourceError(format!(
                        "unsupported fan-out source file extension '{other}' (expected .csv or .json)"
                    )))
                }
            }
        }
        None => (None, None, None, None),
    };

    let runs = match mode {
        FanoutMode::Single => {
            let rows = file_rows.or_else(|| spec.rows.clone()).ok_or_else(|| {
                EngineError::FanoutSourceError("single fan-out requires either 'rows' or 'source_file'".to_string())
            })?;
            if spec.keys.is_empty() {
                return Err(EngineError::FanoutSourceError("single fan-out requires non-empty 'keys'".to_string()));
            }
            rows.into_iter()
                .map(|row| {
                    let mut context = IndexMap::new();
                    for (key, value) in spec.keys.iter().zip(row.into_iter()) {
                        context.insert(key.clone(), value);
                    }
                    ExpandedRun { context }
                })
                .collect::<Vec<_>>()
        }
        FanoutMode::MultiZip => {
            let columns = file_columns.or_else(|| spec.columns.clone()).ok_or_else(|| {
                EngineError::FanoutSourceError("multi_zip fan-out requires either 'columns' or 'source_file'".to_string())
            })?;
            if columns.is_empty() {
                Vec::new()
            } else {
                let len = columns.values().map(Vec::len).max().unwrap_or(0);
                let mut broadcasted: IndexMap<String, Vec<Value>> = IndexMap::new();
                for (name, values) in &columns {
                    broadcasted.insert(name.clone(), broadcast_to(values, len, spec.broadcast, name)?);
                }
                (0..len)
                    .map(|i| {
                        let mut context = IndexMap::new();
                        for (name, values) in &broadcasted {
                            context.insert(name.clone(), values[i].clone());
                        }
                        ExpandedRun { context }
                    })
                    .collect()
            }
        }
    };

    let meta = SourceMeta { mode, source_file, source_sha256: source_sha256.clone() };
    Ok((runs, meta, source_sha256))
}

/// Merges two run contexts for the Cartesian-product combinator: `b`'s keys win on collision
/// (later blocks are declared later in `run_space.blocks` and are expected to be the more
/// specific axis, matching how later pipeline nodes shadow earlier context writes).
fn merge_contexts(a: &IndexMap<String, Value>, b: &IndexMap<String, Value>) -> IndexMap<String, Value> {
    let mut merged = a.clone();
    for (k, v) in b {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// `expandRunSpace` (§4.K): expands every block independently, then combines them under
/// `combine=product` (full Cartesian product, bounded by `max_runs`) or `combine=zip`
/// (element-wise; all blocks must yield the same number of rows).
pub fn expand_run_space(spec: &RunSpaceSpec, cwd: &Path) -> Result<(Vec<ExpandedRun>, Vec<SourceMeta>, Option<String>)> {
    let mut block_runs: Vec<Vec<IndexMap<String, Value>>> = Vec::with_capacity(spec.blocks.len());
    let mut metas = Vec::with_capacity(spec.blocks.len());
    let mut file_hashes: Vec<String> = Vec::new();

    for block in &spec.blocks {
        let (runs, meta, hash) = expand_fanout(block, cwd)?;
        block_runs.push(runs.into_iter().map(|r| r.context).collect());
        metas.push(meta);
        if let Some(hash) = hash {
            file_hashes.push(hash);
        }
    }

    let combined: Vec<IndexMap<String, Value>> = match spec.combine {
        CombineMode::Product => {
            let mut acc: Vec<IndexMap<String, Value>> = vec![IndexMap::new()];
            for runs in &block_runs {
                if runs.is_empty() {
                    acc = Vec::new();
                    break;
                }
                let mut next = Vec::with_capacity(acc.len() * runs.len());
                for prefix in &acc {
                    for row in runs {
                        next.push(merge_contexts(prefix, row));
                    }
                }
                acc = next;
                if acc.len() > spec.max_runs {
                    return Err(EngineError::RunSpaceTooLarge { actual: acc.len(), max_runs: spec.max_runs });
                }
            }
            acc
        }
        CombineMode::Zip => {
            let lengths: Vec<usize> = block_runs.iter().map(Vec::len).collect();
            if let Some(&first) = lengths.first() {
                if lengths.iter().any(|&l| l != first) {
                    return Err(EngineError::RunSpaceBlockLengthMismatch(lengths));
                }
            }
            let len = lengths.first().copied().unwrap_or(0);
            (0..len)
                .map(|i| {
                    block_runs.iter().fold(IndexMap::new(), |acc, runs| merge_contexts(&acc, &runs[i]))
                })
                .collect()
        }
    };

    if combined.len() > spec.max_runs {
        return Err(EngineError::RunSpaceTooLarge { actual: combined.len(), max_runs: spec.max_runs });
    }

    let expanded = combined.into_iter().map(|context| ExpandedRun { context }).collect();
    let inputs_id = if file_hashes.is_empty() {
        None
    } else {
        file_hashes.sort();
        Some(sha256_hex_bytes(canonicalise(&serde_json::to_value(&file_hashes).unwrap()).as_bytes()))
    };

    Ok((expanded, metas, inputs_id))
}

/// `spec_id = SHA256(canonicalise(spec))` (§4.K): identifies a declared run-space/fan-out
/// regardless of how many times it is launched.
pub fn compute_spec_id<T: Serialize>(spec: &T) -> String {
    let value = serde_json::to_value(spec).expect("run-space spec must serialize to JSON");
    sha256_hex_bytes(canonicalise(&value).as_bytes())
}

/// Fresh UUIDv7 launch identifier, one per invocation (§4.K).
pub fn fresh_launch_id() -> String {
    Uuid::now_v7().to_string()
}
