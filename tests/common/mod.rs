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
//! Common utilities and fixtures for hash-join integration tests.
#![allow(dead_code)]

use arrow::datatypes::DataType;

use riffle::{Chunk, Datum, ExecContext, ExecError, ExecResult, Executor};

pub fn int(v: i64) -> Datum {
    Datum::Int64(v)
}

pub fn s(v: &str) -> Datum {
    Datum::Utf8(v.to_string())
}

pub fn null() -> Datum {
    Datum::Null
}

/// `(1,'a'), (2,'b'), (2,'c'), (NULL,'d')` keyed on column 0.
pub fn t1_rows() -> Vec<Vec<Datum>> {
    vec![
        vec![int(1), s("a")],
        vec![int(2), s("b")],
        vec![int(2), s("c")],
        vec![null(), s("d")],
    ]
}

/// `(1,'x'), (2,'y'), (2,'z'), (3,'w'), (NULL,'v')` keyed on column 0.
pub fn t2_rows() -> Vec<Vec<Datum>> {
    vec![
        vec![int(1), s("x")],
        vec![int(2), s("y")],
        vec![int(2), s("z")],
        vec![int(3), s("w")],
        vec![null(), s("v")],
    ]
}

pub fn int_utf8_types() -> Vec<DataType> {
    vec![DataType::Int64, DataType::Utf8]
}

/// Serves a preset row list in batches. Optionally fails after a given
/// number of served batches to exercise upstream error propagation.
pub struct MockExec {
    types: Vec<DataType>,
    rows: Vec<Vec<Datum>>,
    cursor: usize,
    batch_rows: usize,
    fail_at_batch: Option<usize>,
    batches_served: usize,
}

impl MockExec {
    pub fn new(types: Vec<DataType>, rows: Vec<Vec<Datum>>) -> Self {
        Self {
            types,
            rows,
            cursor: 0,
            batch_rows: usize::MAX,
            fail_at_batch: None,
            batches_served: 0,
        }
    }

    pub fn with_batch_rows(mut self, batch_rows: usize) -> Self {
        self.batch_rows = batch_rows.max(1);
        self
    }

    pub fn failing_at_batch(mut self, batch: usize) -> Self {
        self.fail_at_batch = Some(batch);
        self
    }
}

impl Executor for MockExec {
    fn open(&mut self, _ctx: &ExecContext) -> ExecResult<()> {
        self.cursor = 0;
        self.batches_served = 0;
        Ok(())
    }

    fn next(&mut self, _ctx: &ExecContext, chunk: &mut Chunk) -> ExecResult<()> {
        chunk.reset();
        if let Some(fail_at) = self.fail_at_batch {
            if self.batches_served >= fail_at {
                return Err(ExecError::Upstream("mock executor failure".to_string()));
            }
        }
        let take = self.batch_rows.min(chunk.capacity());
        while chunk.num_rows() < take && self.cursor < self.rows.len() {
            chunk.append_row(&self.rows[self.cursor])?;
            self.cursor += 1;
        }
        self.batches_served += 1;
        Ok(())
    }

    fn close(&mut self) -> ExecResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[DataType] {
        &self.types
    }
}

/// Produces full chunks of the same row forever; used by shutdown tests.
pub struct EndlessExec {
    types: Vec<DataType>,
}

impl EndlessExec {
    pub fn new() -> Self {
        Self {
            types: int_utf8_types(),
        }
    }
}

impl Executor for EndlessExec {
    fn open(&mut self, _ctx: &ExecContext) -> ExecResult<()> {
        Ok(())
    }

    fn next(&mut self, _ctx: &ExecContext, chunk: &mut Chunk) -> ExecResult<()> {
        chunk.reset();
        while !chunk.is_full() {
            chunk.append_row(&[int(1), s("loop")])?;
        }
        Ok(())
    }

    fn close(&mut self) -> ExecResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[DataType] {
        &self.types
    }
}

/// Panics on the first `next`; used to verify panic-to-error conversion.
pub struct PanicExec {
    types: Vec<DataType>,
}

impl PanicExec {
    pub fn new() -> Self {
        Self {
            types: int_utf8_types(),
        }
    }
}

impl Executor for PanicExec {
    fn open(&mut self, _ctx: &ExecContext) -> ExecResult<()> {
        Ok(())
    }

    fn next(&mut self, _ctx: &ExecContext, _chunk: &mut Chunk) -> ExecResult<()> {
        panic!("probe child exploded");
    }

    fn close(&mut self) -> ExecResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[DataType] {
        &self.types
    }
}

/// Build a two-column ([Int64, Utf8]) hash join keyed on column 0 over mock
/// children; build side first.
pub fn join_over(
    join_type: riffle::JoinType,
    concurrency: usize,
    build_rows: Vec<Vec<Datum>>,
    probe_rows: Vec<Vec<Datum>>,
    probe_side_filter: Vec<Box<dyn riffle::FilterExpr>>,
) -> riffle::HashJoinExec {
    let build = Box::new(MockExec::new(int_utf8_types(), build_rows).with_batch_rows(2));
    let probe = Box::new(MockExec::new(int_utf8_types(), probe_rows).with_batch_rows(2));
    riffle::HashJoinExec::new(
        build,
        probe,
        riffle::HashJoinConfig {
            concurrency,
            join_type,
            probe_keys: vec![0],
            build_keys: vec![0],
            probe_side_filter,
            build_side_est_count: 8,
        },
    )
    .expect("hash join construction")
}

/// Open, drain, and close a join built by [`join_over`].
pub fn run_join(
    join_type: riffle::JoinType,
    concurrency: usize,
    build_rows: Vec<Vec<Datum>>,
    probe_rows: Vec<Vec<Datum>>,
    probe_side_filter: Vec<Box<dyn riffle::FilterExpr>>,
) -> Vec<Vec<Datum>> {
    let mut join = join_over(join_type, concurrency, build_rows, probe_rows, probe_side_filter);
    let ctx = ExecContext::default();
    join.open(&ctx).expect("open");
    let rows = collect_rows(&mut join, &ctx);
    join.close().expect("close");
    rows
}

/// Drain an executor to end-of-input and return every produced row.
pub fn collect_rows(exec: &mut dyn Executor, ctx: &ExecContext) -> Vec<Vec<Datum>> {
    let types = exec.schema().to_vec();
    let mut out = Vec::new();
    loop {
        let mut chunk = Chunk::new(&types, ctx.max_chunk_capacity).expect("result chunk");
        exec.next(ctx, &mut chunk).expect("join next");
        if chunk.num_rows() == 0 {
            return out;
        }
        for row in chunk.rows() {
            out.push((0..row.width()).map(|c| row.datum(c)).collect());
        }
    }
}

/// Order-insensitive view of a row multiset.
pub fn normalize(rows: &[Vec<Datum>]) -> Vec<String> {
    let mut keys: Vec<String> = rows.iter().map(|r| format!("{r:?}")).collect();
    keys.sort();
    keys
}

pub fn assert_same_multiset(actual: &[Vec<Datum>], expected: &[Vec<Datum>]) {
    assert_eq!(
        normalize(actual),
        normalize(expected),
        "row multisets differ"
    );
}
