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
//! Vectorized filter expressions over chunks.
//!
//! Responsibilities:
//! - Defines the conjunctive-filter contract consumed by operators: each
//!   expression clears the selection bit of every row it rejects.
//! - Provides column-against-constant comparisons for residual predicates.
//!
//! Key exported interfaces:
//! - Types: `FilterExpr`, `ColumnCompare`, `CmpOp`.
//! - Functions: `vectorized_filter`.

use std::cmp::Ordering;

use crate::common::error::{ExecError, ExecResult};
use crate::exec::chunk::{Chunk, Datum};

/// One clause of a CNF predicate. Implementations must leave selection bits
/// of rows they accept untouched and clear the bits of rows they reject,
/// so clauses compose by conjunction.
pub trait FilterExpr: Send + Sync {
    fn eval(&self, chunk: &Chunk, selected: &mut [bool]) -> ExecResult<()>;
}

/// Evaluate a conjunction of filter clauses over a chunk, producing a
/// per-row boolean selection vector of the same length as the chunk.
pub fn vectorized_filter(
    exprs: &[Box<dyn FilterExpr>],
    chunk: &Chunk,
    selected: &mut Vec<bool>,
) -> ExecResult<()> {
    selected.clear();
    selected.resize(chunk.num_rows(), true);
    for expr in exprs {
        expr.eval(chunk, selected)?;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Compares a column against a constant. A null cell rejects the row for
/// every operator, per SQL three-valued logic.
pub struct ColumnCompare {
    col_idx: usize,
    op: CmpOp,
    value: Datum,
}

impl ColumnCompare {
    pub fn new(col_idx: usize, op: CmpOp, value: Datum) -> Self {
        Self { col_idx, op, value }
    }
}

impl FilterExpr for ColumnCompare {
    fn eval(&self, chunk: &Chunk, selected: &mut [bool]) -> ExecResult<()> {
        if self.col_idx >= chunk.num_cols() {
            return Err(ExecError::Expression(format!(
                "filter column {} out of bounds (chunk has {})",
                self.col_idx,
                chunk.num_cols()
            )));
        }
        let column = chunk.column(self.col_idx);
        for row in 0..chunk.num_rows() {
            if !selected[row] {
                continue;
            }
            let cell = column.datum(row);
            let ordering = match compare_datums(&cell, &self.value) {
                Some(ordering) => ordering,
                None => {
                    selected[row] = false;
                    continue;
                }
            };
            let keep = match self.op {
                CmpOp::Eq => ordering == Ordering::Equal,
                CmpOp::Ne => ordering != Ordering::Equal,
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::Le => ordering != Ordering::Greater,
                CmpOp::Gt => ordering == Ordering::Greater,
                CmpOp::Ge => ordering != Ordering::Less,
            };
            if !keep {
                selected[row] = false;
            }
        }
        Ok(())
    }
}

fn compare_datums(a: &Datum, b: &Datum) -> Option<Ordering> {
    match (a, b) {
        (Datum::Null, _) | (_, Datum::Null) => None,
        (Datum::Int64(a), Datum::Int64(b)) => Some(a.cmp(b)),
        (Datum::Float64(a), Datum::Float64(b)) => a.partial_cmp(b),
        (Datum::Decimal128(a), Datum::Decimal128(b)) => Some(a.cmp(b)),
        (Datum::Utf8(a), Datum::Utf8(b)) => Some(a.cmp(b)),
        (Datum::Date32(a), Datum::Date32(b)) => Some(a.cmp(b)),
        (Datum::TimestampMicros(a), Datum::TimestampMicros(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
