// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
//! Per-worker key-hashing scratch and the column fold codec.
//!
//! Responsibilities:
//! - Holds the per-row 64-bit fingerprint accumulators, null flags, and the
//!   scratch encode buffer for one side of a join.
//! - Folds key columns row-by-row into the accumulators; values that compare
//!   equal under SQL semantics fold to equal fingerprints.
//!
//! Key exported interfaces:
//! - Types: `HashContext`.
//! - Functions: `hash_chunk_selected`.

use arrow::datatypes::DataType;

use crate::common::error::{ExecError, ExecResult};
use crate::exec::chunk::Chunk;
use crate::exec::hash_table::hash::{combine_hash, hash_bytes_with_seed, FINGERPRINT_SEED};

/// Scratch state for hashing the key columns of one side. Each worker owns
/// its own context, so no locking is needed on the hot path.
pub struct HashContext {
    all_types: Vec<DataType>,
    key_col_idx: Vec<usize>,
    pub(crate) hash_vals: Vec<u64>,
    pub(crate) has_null: Vec<bool>,
    buf: Vec<u8>,
}

impl HashContext {
    pub fn new(all_types: Vec<DataType>, key_col_idx: Vec<usize>) -> Self {
        Self {
            all_types,
            key_col_idx,
            hash_vals: Vec::new(),
            has_null: Vec::new(),
            buf: Vec::new(),
        }
    }

    pub fn all_types(&self) -> &[DataType] {
        &self.all_types
    }

    pub fn key_col_idx(&self) -> &[usize] {
        &self.key_col_idx
    }

    /// Reset the per-row accumulators for a batch of `n` rows.
    pub fn init_hash(&mut self, n: usize) {
        self.hash_vals.clear();
        self.hash_vals.resize(n, FINGERPRINT_SEED);
        self.has_null.clear();
        self.has_null.resize(n, false);
    }

    /// Fold every key column of `chunk` into the accumulators. Rows whose
    /// selection bit is cleared are skipped; rows with a null in any key
    /// column get their null flag set instead of a hash.
    pub fn hash_key_columns(&mut self, chunk: &Chunk, selected: Option<&[bool]>) -> ExecResult<()> {
        let Self {
            key_col_idx,
            hash_vals,
            has_null,
            buf,
            ..
        } = self;
        for &col_idx in key_col_idx.iter() {
            hash_chunk_selected(hash_vals, has_null, chunk, col_idx, buf, selected)?;
        }
        Ok(())
    }
}

/// Fold one column's selected rows into the fingerprint accumulators and
/// flag null cells. The codec contract: equal SQL values produce identical
/// hashes for the column's type.
pub(crate) fn hash_chunk_selected(
    hash_vals: &mut [u64],
    has_null: &mut [bool],
    chunk: &Chunk,
    col_idx: usize,
    buf: &mut Vec<u8>,
    selected: Option<&[bool]>,
) -> ExecResult<()> {
    let n = chunk.num_rows();
    if hash_vals.len() != n || has_null.len() != n {
        return Err(ExecError::Hashing(format!(
            "hash accumulators sized {} but chunk has {} rows",
            hash_vals.len(),
            n
        )));
    }
    if col_idx >= chunk.num_cols() {
        return Err(ExecError::Hashing(format!(
            "key column {} out of bounds (chunk has {})",
            col_idx,
            chunk.num_cols()
        )));
    }
    let column = chunk.column(col_idx);
    for row in 0..n {
        if let Some(selected) = selected {
            if !selected[row] {
                continue;
            }
        }
        if has_null[row] {
            continue;
        }
        if column.is_null(row) {
            has_null[row] = true;
            continue;
        }
        buf.clear();
        column.encode_value(row, buf)?;
        let value_hash = hash_bytes_with_seed(FINGERPRINT_SEED, buf);
        hash_vals[row] = combine_hash(hash_vals[row], value_hash);
    }
    Ok(())
}
