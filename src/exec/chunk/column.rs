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
use arrow::datatypes::{DataType, TimeUnit};

use crate::common::error::{ExecError, ExecResult};

/// A single typed value. Used at the operator edges (construction, filter
/// constants, tests); hot paths copy column-to-column without materializing
/// datums.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Int64(i64),
    Float64(f64),
    Decimal128(i128),
    Utf8(String),
    Date32(i32),
    TimestampMicros(i64),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }
}

#[derive(Debug)]
enum ColumnBuf {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Decimal128(Vec<i128>),
    Utf8 { offsets: Vec<u32>, data: Vec<u8> },
    Date32(Vec<i32>),
    TimestampMicros(Vec<i64>),
}

/// Growable typed buffer plus a validity vector. `reset` keeps the
/// allocations so recycled chunks do not re-allocate on the hot path.
#[derive(Debug)]
pub struct Column {
    data_type: DataType,
    buf: ColumnBuf,
    validity: Vec<bool>,
}

impl Column {
    pub fn new(data_type: &DataType) -> ExecResult<Self> {
        let buf = match data_type {
            DataType::Int64 => ColumnBuf::Int64(Vec::new()),
            DataType::Float64 => ColumnBuf::Float64(Vec::new()),
            DataType::Decimal128(_, _) => ColumnBuf::Decimal128(Vec::new()),
            DataType::Utf8 => ColumnBuf::Utf8 {
                offsets: vec![0],
                data: Vec::new(),
            },
            DataType::Date32 => ColumnBuf::Date32(Vec::new()),
            DataType::Timestamp(TimeUnit::Microsecond, None) => {
                ColumnBuf::TimestampMicros(Vec::new())
            }
            other => {
                return Err(ExecError::Internal(format!(
                    "column type not supported: {other}"
                )))
            }
        };
        Ok(Self {
            data_type: data_type.clone(),
            buf,
            validity: Vec::new(),
        })
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn len(&self) -> usize {
        self.validity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validity.is_empty()
    }

    pub fn is_null(&self, row: usize) -> bool {
        !self.validity[row]
    }

    pub fn reset(&mut self) {
        self.validity.clear();
        match &mut self.buf {
            ColumnBuf::Int64(v) => v.clear(),
            ColumnBuf::Float64(v) => v.clear(),
            ColumnBuf::Decimal128(v) => v.clear(),
            ColumnBuf::Utf8 { offsets, data } => {
                offsets.truncate(1);
                data.clear();
            }
            ColumnBuf::Date32(v) => v.clear(),
            ColumnBuf::TimestampMicros(v) => v.clear(),
        }
    }

    pub fn append_null(&mut self) {
        self.validity.push(false);
        match &mut self.buf {
            ColumnBuf::Int64(v) => v.push(0),
            ColumnBuf::Float64(v) => v.push(0.0),
            ColumnBuf::Decimal128(v) => v.push(0),
            ColumnBuf::Utf8 { offsets, data } => offsets.push(data.len() as u32),
            ColumnBuf::Date32(v) => v.push(0),
            ColumnBuf::TimestampMicros(v) => v.push(0),
        }
    }

    pub fn append_datum(&mut self, datum: &Datum) -> ExecResult<()> {
        if datum.is_null() {
            self.append_null();
            return Ok(());
        }
        match (&mut self.buf, datum) {
            (ColumnBuf::Int64(v), Datum::Int64(val)) => v.push(*val),
            (ColumnBuf::Float64(v), Datum::Float64(val)) => v.push(*val),
            (ColumnBuf::Decimal128(v), Datum::Decimal128(val)) => v.push(*val),
            (ColumnBuf::Utf8 { offsets, data }, Datum::Utf8(val)) => {
                data.extend_from_slice(val.as_bytes());
                offsets.push(data.len() as u32);
            }
            (ColumnBuf::Date32(v), Datum::Date32(val)) => v.push(*val),
            (ColumnBuf::TimestampMicros(v), Datum::TimestampMicros(val)) => v.push(*val),
            _ => {
                return Err(ExecError::Internal(format!(
                    "datum {:?} does not fit column type {}",
                    datum, self.data_type
                )))
            }
        }
        self.validity.push(true);
        Ok(())
    }

    /// Copy one cell from `other`, which must have the same storage type.
    pub fn append_from(&mut self, other: &Column, row: usize) -> ExecResult<()> {
        if !other.validity[row] {
            self.append_null();
            return Ok(());
        }
        match (&mut self.buf, &other.buf) {
            (ColumnBuf::Int64(dst), ColumnBuf::Int64(src)) => dst.push(src[row]),
            (ColumnBuf::Float64(dst), ColumnBuf::Float64(src)) => dst.push(src[row]),
            (ColumnBuf::Decimal128(dst), ColumnBuf::Decimal128(src)) => dst.push(src[row]),
            (
                ColumnBuf::Utf8 { offsets, data },
                ColumnBuf::Utf8 {
                    offsets: src_offsets,
                    data: src_data,
                },
            ) => {
                let start = src_offsets[row] as usize;
                let end = src_offsets[row + 1] as usize;
                data.extend_from_slice(&src_data[start..end]);
                offsets.push(data.len() as u32);
            }
            (ColumnBuf::Date32(dst), ColumnBuf::Date32(src)) => dst.push(src[row]),
            (ColumnBuf::TimestampMicros(dst), ColumnBuf::TimestampMicros(src)) => {
                dst.push(src[row])
            }
            _ => {
                return Err(ExecError::Internal(format!(
                    "column type mismatch on append: {} vs {}",
                    self.data_type, other.data_type
                )))
            }
        }
        self.validity.push(true);
        Ok(())
    }

    pub fn datum(&self, row: usize) -> Datum {
        if !self.validity[row] {
            return Datum::Null;
        }
        match &self.buf {
            ColumnBuf::Int64(v) => Datum::Int64(v[row]),
            ColumnBuf::Float64(v) => Datum::Float64(v[row]),
            ColumnBuf::Decimal128(v) => Datum::Decimal128(v[row]),
            ColumnBuf::Utf8 { offsets, data } => {
                let start = offsets[row] as usize;
                let end = offsets[row + 1] as usize;
                Datum::Utf8(String::from_utf8_lossy(&data[start..end]).into_owned())
            }
            ColumnBuf::Date32(v) => Datum::Date32(v[row]),
            ColumnBuf::TimestampMicros(v) => Datum::TimestampMicros(v[row]),
        }
    }

    /// SQL equality of two non-null cells. Null cells never compare equal.
    pub fn eq_at(&self, row: usize, other: &Column, other_row: usize) -> bool {
        if !self.validity[row] || !other.validity[other_row] {
            return false;
        }
        match (&self.buf, &other.buf) {
            (ColumnBuf::Int64(a), ColumnBuf::Int64(b)) => a[row] == b[other_row],
            (ColumnBuf::Float64(a), ColumnBuf::Float64(b)) => a[row] == b[other_row],
            (ColumnBuf::Decimal128(a), ColumnBuf::Decimal128(b)) => a[row] == b[other_row],
            (
                ColumnBuf::Utf8 { offsets, data },
                ColumnBuf::Utf8 {
                    offsets: other_offsets,
                    data: other_data,
                },
            ) => {
                let a = &data[offsets[row] as usize..offsets[row + 1] as usize];
                let b = &other_data
                    [other_offsets[other_row] as usize..other_offsets[other_row + 1] as usize];
                a == b
            }
            (ColumnBuf::Date32(a), ColumnBuf::Date32(b)) => a[row] == b[other_row],
            (ColumnBuf::TimestampMicros(a), ColumnBuf::TimestampMicros(b)) => {
                a[row] == b[other_row]
            }
            _ => false,
        }
    }

    /// Write the canonical byte encoding of a non-null cell into `buf`.
    /// Values that compare equal under SQL semantics encode to equal bytes:
    /// integers as little-endian `i64`, floats by canonical NaN bits,
    /// decimals as 128-bit two's complement, strings as raw bytes.
    pub(crate) fn encode_value(&self, row: usize, buf: &mut Vec<u8>) -> ExecResult<()> {
        if !self.validity[row] {
            return Err(ExecError::Hashing(format!(
                "cannot encode null cell at row {row}"
            )));
        }
        match &self.buf {
            ColumnBuf::Int64(v) => buf.extend_from_slice(&v[row].to_le_bytes()),
            ColumnBuf::Float64(v) => {
                let bits = crate::exec::hash_table::hash::canonical_f64_bits(v[row]);
                buf.extend_from_slice(&bits.to_le_bytes());
            }
            ColumnBuf::Decimal128(v) => buf.extend_from_slice(&v[row].to_le_bytes()),
            ColumnBuf::Utf8 { offsets, data } => {
                buf.extend_from_slice(&data[offsets[row] as usize..offsets[row + 1] as usize])
            }
            ColumnBuf::Date32(v) => buf.extend_from_slice(&(v[row] as i64).to_le_bytes()),
            ColumnBuf::TimestampMicros(v) => buf.extend_from_slice(&v[row].to_le_bytes()),
        }
        Ok(())
    }
}
