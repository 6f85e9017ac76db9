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
//! Hash-row container: fingerprint index over build-side chunks.
//!
//! Responsibilities:
//! - Stores build-side chunks append-only so row handles stay valid for the
//!   container's lifetime, and indexes rows by 64-bit key fingerprint.
//! - Answers probe lookups with fingerprint candidates re-checked for full
//!   key equality, since fingerprints collide.
//!
//! Key exported interfaces:
//! - Types: `HashRowContainer`.
//!
//! Current limitations:
//! - Single-writer during the build phase; concurrent reads are safe only
//!   after the build completes.

use hashbrown::raw::RawTable;

use crate::common::error::ExecResult;
use crate::exec::chunk::{Chunk, ChunkList, Row, RowPtr};
use crate::exec::hash_table::hash_context::HashContext;

struct KeyEntry {
    hash: u64,
    rows: Vec<RowPtr>,
}

/// Maps key fingerprints to the build-side rows that produced them.
///
/// Rows with a null in any key column are never inserted: under SQL
/// equi-join semantics they can match nothing.
pub struct HashRowContainer {
    hash_ctx: HashContext,
    records: ChunkList,
    table: RawTable<KeyEntry>,
}

impl HashRowContainer {
    pub fn new(est_count: usize, hash_ctx: HashContext) -> Self {
        Self {
            hash_ctx,
            records: ChunkList::new(),
            table: RawTable::with_capacity(est_count),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.records.num_rows()
    }

    pub fn num_chunks(&self) -> usize {
        self.records.num_chunks()
    }

    pub fn key_col_idx(&self) -> &[usize] {
        self.hash_ctx.key_col_idx()
    }

    /// Index every non-null-keyed row of `chunk` and take ownership of the
    /// chunk. Build-phase only.
    pub fn put_chunk(&mut self, chunk: Chunk) -> ExecResult<()> {
        let n = chunk.num_rows();
        if n == 0 {
            return Ok(());
        }
        self.hash_ctx.init_hash(n);
        self.hash_ctx.hash_key_columns(&chunk, None)?;
        let chunk_idx = self.records.add_chunk(chunk);
        for row_idx in 0..n {
            if self.hash_ctx.has_null[row_idx] {
                continue;
            }
            let hash = self.hash_ctx.hash_vals[row_idx];
            let ptr = RowPtr {
                chunk_idx,
                row_idx: row_idx as u32,
            };
            match self.table.get_mut(hash, |e| e.hash == hash) {
                Some(entry) => entry.rows.push(ptr),
                None => {
                    self.table.insert(
                        hash,
                        KeyEntry {
                            hash,
                            rows: vec![ptr],
                        },
                        |e| e.hash,
                    );
                }
            }
        }
        Ok(())
    }

    /// Return every build row whose key columns are fully equal to the probe
    /// row's. Fingerprint candidates that merely collide are filtered out
    /// here; callers can trust the result.
    pub fn get_matched_rows(
        &self,
        probe_hash: u64,
        probe_row: Row<'_>,
        probe_ctx: &HashContext,
    ) -> ExecResult<Vec<RowPtr>> {
        let Some(entry) = self.table.get(probe_hash, |e| e.hash == probe_hash) else {
            return Ok(Vec::new());
        };
        let probe_keys = probe_ctx.key_col_idx();
        let build_keys = self.hash_ctx.key_col_idx();
        let mut matched = Vec::with_capacity(entry.rows.len());
        for &ptr in &entry.rows {
            let build_row = self.records.row(ptr)?;
            if keys_equal(probe_row, probe_keys, build_row, build_keys) {
                matched.push(ptr);
            }
        }
        Ok(matched)
    }

    pub fn row(&self, ptr: RowPtr) -> ExecResult<Row<'_>> {
        self.records.row(ptr)
    }
}

fn keys_equal(
    probe_row: Row<'_>,
    probe_keys: &[usize],
    build_row: Row<'_>,
    build_keys: &[usize],
) -> bool {
    probe_keys.iter().zip(build_keys).all(|(&p, &b)| {
        probe_row
            .chunk()
            .column(p)
            .eq_at(probe_row.index(), build_row.chunk().column(b), build_row.index())
    })
}
