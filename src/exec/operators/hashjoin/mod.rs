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
pub mod hash_join;
pub(crate) mod joiner;

pub use hash_join::{HashJoinConfig, HashJoinExec};

/// Join semantics supported by the hash-join operator.
///
/// `RightOuter` preserves the probe side on the right: the constructor
/// mirrors the plan-time build/probe swap, so output columns stay in
/// left-then-right order and unmatched probe rows are null-padded on the
/// left.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    LeftSemi,
    LeftAntiSemi,
}

impl JoinType {
    /// Whether the probe side occupies the left half of the output row.
    pub(crate) fn probe_is_left(self) -> bool {
        !matches!(self, JoinType::RightOuter)
    }
}
