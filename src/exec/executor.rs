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
use arrow::datatypes::DataType;

use crate::common::config::{default_init_chunk_capacity, default_max_chunk_capacity};
use crate::common::error::ExecResult;
use crate::exec::chunk::Chunk;

/// Per-query execution context shared with child executors: chunk sizing
/// comes from here so every operator in a tree allocates batches the same
/// way.
#[derive(Clone, Copy, Debug)]
pub struct ExecContext {
    pub init_chunk_capacity: usize,
    pub max_chunk_capacity: usize,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            init_chunk_capacity: default_init_chunk_capacity(),
            max_chunk_capacity: default_max_chunk_capacity(),
        }
    }
}

impl ExecContext {
    pub fn new_chunk(&self, types: &[DataType]) -> ExecResult<Chunk> {
        Chunk::new(types, self.max_chunk_capacity)
    }
}

/// Volcano-style executor surface. `next` fills the caller's chunk; a
/// zero-row fill signals end of input.
pub trait Executor: Send {
    fn open(&mut self, ctx: &ExecContext) -> ExecResult<()>;

    fn next(&mut self, ctx: &ExecContext, chunk: &mut Chunk) -> ExecResult<()>;

    fn close(&mut self) -> ExecResult<()>;

    fn schema(&self) -> &[DataType];
}
