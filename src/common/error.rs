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
use thiserror::Error;

/// Fatal execution errors surfaced through operator `next` calls.
///
/// Shutdown is not represented here: a task that observes the shutdown
/// signal exits cleanly without reporting anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// A child executor's `next` failed.
    #[error("upstream executor failed: {0}")]
    Upstream(String),

    /// Key-column hashing failed in the codec.
    #[error("hashing key column failed: {0}")]
    Hashing(String),

    /// Expression evaluation failed while filtering a probe chunk.
    #[error("expression evaluation failed: {0}")]
    Expression(String),

    /// Row composition failed inside a joiner.
    #[error("joiner failed: {0}")]
    Joiner(String),

    /// Key lists or key types do not line up; caught at open.
    #[error("operand shape mismatch: {0}")]
    OperandShape(String),

    /// A spawned task panicked; the payload is carried as text.
    #[error("task panicked: {0}")]
    Panic(String),

    #[error("{0}")]
    Internal(String),
}

pub type ExecResult<T> = Result<T, ExecError>;
