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

use crate::common::error::{ExecError, ExecResult};

pub mod column;
pub mod list;

pub use column::{Column, Datum};
pub use list::{ChunkList, RowPtr};

/// A chunk of data: a fixed-capacity column-oriented batch of rows.
///
/// Chunks are the unit of transport between pipeline components and the unit
/// of recycling: `reset` zeroes the rows but keeps the buffers, and
/// `swap_columns` transfers buffers between two chunks without copying.
#[derive(Debug)]
pub struct Chunk {
    columns: Vec<Column>,
    capacity: usize,
}

impl Chunk {
    pub fn new(types: &[DataType], capacity: usize) -> ExecResult<Self> {
        let mut columns = Vec::with_capacity(types.len());
        for t in types {
            columns.push(Column::new(t)?);
        }
        Ok(Self {
            columns,
            capacity: capacity.max(1),
        })
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Number of complete rows. Columns always hold the same row count
    /// outside of a partial-row append sequence.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn is_full(&self) -> bool {
        self.num_rows() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn data_types(&self) -> Vec<DataType> {
        self.columns.iter().map(|c| c.data_type().clone()).collect()
    }

    pub fn column(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    /// Zero the rows, keep the buffers.
    pub fn reset(&mut self) {
        for col in &mut self.columns {
            col.reset();
        }
    }

    /// Transfer column buffers between two chunks of the same schema.
    pub fn swap_columns(&mut self, other: &mut Chunk) {
        std::mem::swap(&mut self.columns, &mut other.columns);
        std::mem::swap(&mut self.capacity, &mut other.capacity);
    }

    pub fn append_row(&mut self, datums: &[Datum]) -> ExecResult<()> {
        if datums.len() != self.columns.len() {
            return Err(ExecError::Internal(format!(
                "row width {} does not match chunk width {}",
                datums.len(),
                self.columns.len()
            )));
        }
        for (col, datum) in self.columns.iter_mut().zip(datums) {
            col.append_datum(datum)?;
        }
        Ok(())
    }

    /// Copy all of `row`'s columns into this chunk starting at `col_offset`.
    /// Callers compose one logical output row from one or more partial
    /// appends that together cover every column.
    pub fn append_partial_row(&mut self, col_offset: usize, row: Row<'_>) -> ExecResult<()> {
        let width = row.width();
        if col_offset + width > self.columns.len() {
            return Err(ExecError::Internal(format!(
                "partial row [{}, {}) exceeds chunk width {}",
                col_offset,
                col_offset + width,
                self.columns.len()
            )));
        }
        for i in 0..width {
            self.columns[col_offset + i].append_from(row.chunk.column(i), row.idx)?;
        }
        Ok(())
    }

    /// Append one null cell to each of `width` columns starting at
    /// `col_offset`; pads the unpreserved side of an outer-join row.
    pub fn append_nulls(&mut self, col_offset: usize, width: usize) -> ExecResult<()> {
        if col_offset + width > self.columns.len() {
            return Err(ExecError::Internal(format!(
                "null pad [{}, {}) exceeds chunk width {}",
                col_offset,
                col_offset + width,
                self.columns.len()
            )));
        }
        for i in 0..width {
            self.columns[col_offset + i].append_null();
        }
        Ok(())
    }

    pub fn row(&self, idx: usize) -> Row<'_> {
        debug_assert!(idx < self.num_rows());
        Row { chunk: self, idx }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.num_rows()).map(move |idx| Row { chunk: self, idx })
    }
}

/// A borrowed view of one row inside a chunk.
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    chunk: &'a Chunk,
    idx: usize,
}

impl<'a> Row<'a> {
    pub fn chunk(&self) -> &'a Chunk {
        self.chunk
    }

    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn width(&self) -> usize {
        self.chunk.num_cols()
    }

    pub fn datum(&self, col: usize) -> Datum {
        self.chunk.column(col).datum(self.idx)
    }

    pub fn is_null(&self, col: usize) -> bool {
        self.chunk.column(col).is_null(self.idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_utf8_chunk(capacity: usize) -> Chunk {
        Chunk::new(&[DataType::Int64, DataType::Utf8], capacity).expect("chunk")
    }

    #[test]
    fn append_until_full() {
        let mut chunk = int_utf8_chunk(2);
        assert!(chunk.is_empty());
        chunk
            .append_row(&[Datum::Int64(1), Datum::Utf8("a".into())])
            .unwrap();
        assert!(!chunk.is_full());
        chunk
            .append_row(&[Datum::Null, Datum::Utf8("b".into())])
            .unwrap();
        assert!(chunk.is_full());
        assert_eq!(chunk.num_rows(), 2);
        assert_eq!(chunk.row(1).datum(0), Datum::Null);
    }

    #[test]
    fn reset_then_reuse() {
        let mut chunk = int_utf8_chunk(4);
        chunk
            .append_row(&[Datum::Int64(1), Datum::Utf8("a".into())])
            .unwrap();
        chunk.reset();
        assert_eq!(chunk.num_rows(), 0);
        chunk
            .append_row(&[Datum::Int64(2), Datum::Utf8("b".into())])
            .unwrap();
        assert_eq!(chunk.row(0).datum(1), Datum::Utf8("b".into()));
    }

    #[test]
    fn swap_columns_moves_buffers() {
        let mut a = int_utf8_chunk(4);
        let mut b = int_utf8_chunk(4);
        a.append_row(&[Datum::Int64(1), Datum::Utf8("x".into())])
            .unwrap();
        b.swap_columns(&mut a);
        assert_eq!(a.num_rows(), 0);
        assert_eq!(b.num_rows(), 1);
        assert_eq!(b.row(0).datum(0), Datum::Int64(1));
    }

    #[test]
    fn partial_rows_compose_joined_output() {
        let mut left = Chunk::new(&[DataType::Int64], 4).unwrap();
        let mut right = Chunk::new(&[DataType::Utf8], 4).unwrap();
        left.append_row(&[Datum::Int64(42)]).unwrap();
        right.append_row(&[Datum::Utf8("y".into())]).unwrap();

        let mut out = int_utf8_chunk(4);
        out.append_partial_row(0, left.row(0)).unwrap();
        out.append_partial_row(1, right.row(0)).unwrap();
        assert_eq!(out.num_rows(), 1);
        assert_eq!(out.row(0).datum(0), Datum::Int64(42));
        assert_eq!(out.row(0).datum(1), Datum::Utf8("y".into()));
    }

    #[test]
    fn null_padding_covers_missing_side() {
        let mut out = int_utf8_chunk(4);
        let mut probe = Chunk::new(&[DataType::Int64], 4).unwrap();
        probe.append_row(&[Datum::Int64(5)]).unwrap();
        out.append_partial_row(0, probe.row(0)).unwrap();
        out.append_nulls(1, 1).unwrap();
        assert_eq!(out.row(0).datum(1), Datum::Null);
    }
}
