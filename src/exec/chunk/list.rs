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
use crate::common::error::{ExecError, ExecResult};
use crate::exec::chunk::{Chunk, Row};

/// Stable handle to a row inside a `ChunkList`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowPtr {
    pub chunk_idx: u32,
    pub row_idx: u32,
}

/// Append-only list of chunks. Chunks are never removed or mutated after
/// `add_chunk`, so every `RowPtr` handed out stays valid for the list's
/// lifetime.
#[derive(Default)]
pub struct ChunkList {
    chunks: Vec<Chunk>,
    total_rows: usize,
}

impl ChunkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chunk(&mut self, chunk: Chunk) -> u32 {
        let idx = self.chunks.len() as u32;
        self.total_rows += chunk.num_rows();
        self.chunks.push(chunk);
        idx
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn num_rows(&self) -> usize {
        self.total_rows
    }

    pub fn row(&self, ptr: RowPtr) -> ExecResult<Row<'_>> {
        let chunk = self.chunks.get(ptr.chunk_idx as usize).ok_or_else(|| {
            ExecError::Internal(format!("row pointer chunk {} out of bounds", ptr.chunk_idx))
        })?;
        if ptr.row_idx as usize >= chunk.num_rows() {
            return Err(ExecError::Internal(format!(
                "row pointer row {} out of bounds in chunk {}",
                ptr.row_idx, ptr.chunk_idx
            )));
        }
        Ok(chunk.row(ptr.row_idx as usize))
    }
}
