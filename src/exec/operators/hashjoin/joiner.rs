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
//! Per-join-type row emission strategies.
//!
//! Responsibilities:
//! - Composes output rows for matched and unmatched probe rows according to
//!   the join type; each worker owns one joiner so scratch needs no locks.
//! - Keeps the strategy surface to two hooks, `on_miss_match` and
//!   `try_to_match_inners`, so a new join type stays localized here.
//!
//! Key exported interfaces:
//! - Types: `Joiner`, `RowPtrIter`.
//! - Functions: `new_joiner`.

use super::JoinType;
use crate::common::error::{ExecError, ExecResult};
use crate::exec::chunk::{Chunk, Row, RowPtr};
use crate::exec::hash_table::HashRowContainer;

/// Cursor over the matched build rows for one probe row. Keeps its position
/// across output-chunk rotations, so a strategy can emit a large match set
/// through several result chunks.
pub(crate) struct RowPtrIter {
    rows: Vec<RowPtr>,
    cursor: usize,
}

impl RowPtrIter {
    pub(crate) fn new(rows: Vec<RowPtr>) -> Self {
        Self { rows, cursor: 0 }
    }

    fn peek(&self) -> Option<RowPtr> {
        self.rows.get(self.cursor).copied()
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }

    fn mark_done(&mut self) {
        self.cursor = self.rows.len();
    }

    pub(crate) fn is_done(&self) -> bool {
        self.cursor >= self.rows.len()
    }
}

/// Join-type specific row composition. `try_to_match_inners` may consume any
/// prefix of the iterator and append any number of rows; it reports whether
/// it emitted (or registered) at least one match.
pub(crate) trait Joiner: Send {
    fn on_miss_match(&mut self, probe_row: Row<'_>, out: &mut Chunk) -> ExecResult<()>;

    fn try_to_match_inners(
        &mut self,
        probe_row: Row<'_>,
        container: &HashRowContainer,
        iter: &mut RowPtrIter,
        out: &mut Chunk,
    ) -> ExecResult<bool>;
}

pub(crate) fn new_joiner(
    join_type: JoinType,
    probe_is_left: bool,
    build_width: usize,
) -> Box<dyn Joiner> {
    match join_type {
        JoinType::Inner => Box::new(InnerJoiner { probe_is_left }),
        JoinType::LeftOuter | JoinType::RightOuter => Box::new(OuterJoiner {
            probe_is_left,
            build_width,
        }),
        JoinType::LeftSemi => Box::new(SemiJoiner),
        JoinType::LeftAntiSemi => Box::new(AntiSemiJoiner),
    }
}

fn joiner_err(err: ExecError) -> ExecError {
    ExecError::Joiner(err.to_string())
}

fn append_joined_row(
    out: &mut Chunk,
    probe_is_left: bool,
    probe_row: Row<'_>,
    build_row: Row<'_>,
) -> ExecResult<()> {
    if probe_is_left {
        out.append_partial_row(0, probe_row).map_err(joiner_err)?;
        out.append_partial_row(probe_row.width(), build_row)
            .map_err(joiner_err)?;
    } else {
        out.append_partial_row(0, build_row).map_err(joiner_err)?;
        out.append_partial_row(build_row.width(), probe_row)
            .map_err(joiner_err)?;
    }
    Ok(())
}

fn match_cartesian(
    probe_is_left: bool,
    probe_row: Row<'_>,
    container: &HashRowContainer,
    iter: &mut RowPtrIter,
    out: &mut Chunk,
) -> ExecResult<bool> {
    let mut matched = false;
    while !out.is_full() {
        let Some(ptr) = iter.peek() else { break };
        let build_row = container.row(ptr).map_err(joiner_err)?;
        append_joined_row(out, probe_is_left, probe_row, build_row)?;
        iter.advance();
        matched = true;
    }
    Ok(matched)
}

struct InnerJoiner {
    probe_is_left: bool,
}

impl Joiner for InnerJoiner {
    fn on_miss_match(&mut self, _probe_row: Row<'_>, _out: &mut Chunk) -> ExecResult<()> {
        Ok(())
    }

    fn try_to_match_inners(
        &mut self,
        probe_row: Row<'_>,
        container: &HashRowContainer,
        iter: &mut RowPtrIter,
        out: &mut Chunk,
    ) -> ExecResult<bool> {
        match_cartesian(self.probe_is_left, probe_row, container, iter, out)
    }
}

/// Preserves the probe side: unmatched probe rows are emitted padded with
/// nulls on the build side. Covers left-outer (probe on the left) and
/// right-outer (probe on the right) alike.
struct OuterJoiner {
    probe_is_left: bool,
    build_width: usize,
}

impl Joiner for OuterJoiner {
    fn on_miss_match(&mut self, probe_row: Row<'_>, out: &mut Chunk) -> ExecResult<()> {
        if self.probe_is_left {
            out.append_partial_row(0, probe_row).map_err(joiner_err)?;
            out.append_nulls(probe_row.width(), self.build_width)
                .map_err(joiner_err)?;
        } else {
            out.append_nulls(0, self.build_width).map_err(joiner_err)?;
            out.append_partial_row(self.build_width, probe_row)
                .map_err(joiner_err)?;
        }
        Ok(())
    }

    fn try_to_match_inners(
        &mut self,
        probe_row: Row<'_>,
        container: &HashRowContainer,
        iter: &mut RowPtrIter,
        out: &mut Chunk,
    ) -> ExecResult<bool> {
        match_cartesian(self.probe_is_left, probe_row, container, iter, out)
    }
}

struct SemiJoiner;

impl Joiner for SemiJoiner {
    fn on_miss_match(&mut self, _probe_row: Row<'_>, _out: &mut Chunk) -> ExecResult<()> {
        Ok(())
    }

    fn try_to_match_inners(
        &mut self,
        probe_row: Row<'_>,
        _container: &HashRowContainer,
        iter: &mut RowPtrIter,
        out: &mut Chunk,
    ) -> ExecResult<bool> {
        if iter.is_done() {
            return Ok(false);
        }
        if out.is_full() {
            // No progress while the chunk is full; the caller rotates and
            // retries with the iterator still positioned on the match set.
            return Ok(false);
        }
        out.append_partial_row(0, probe_row).map_err(joiner_err)?;
        iter.mark_done();
        Ok(true)
    }
}

struct AntiSemiJoiner;

impl Joiner for AntiSemiJoiner {
    fn on_miss_match(&mut self, probe_row: Row<'_>, out: &mut Chunk) -> ExecResult<()> {
        out.append_partial_row(0, probe_row).map_err(joiner_err)
    }

    fn try_to_match_inners(
        &mut self,
        _probe_row: Row<'_>,
        _container: &HashRowContainer,
        iter: &mut RowPtrIter,
        _out: &mut Chunk,
    ) -> ExecResult<bool> {
        if iter.is_done() {
            return Ok(false);
        }
        iter.mark_done();
        Ok(true)
    }
}
