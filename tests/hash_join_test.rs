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
//! End-to-end scenarios for the parallel hash-join operator.

use std::sync::mpsc;
use std::time::Duration;

use riffle::{
    Chunk, CmpOp, ColumnCompare, ExecContext, ExecError, Executor, FilterExpr, HashJoinConfig,
    HashJoinExec, JoinType,
};

use crate::common::{
    assert_same_multiset, collect_rows, int, int_utf8_types, join_over, null, run_join, s,
    t1_rows, t2_rows, EndlessExec, MockExec, PanicExec,
};

mod common;

#[test]
fn inner_join_produces_cartesian_matches() {
    // probe = T1 (left in the output), build = T2.
    let rows = run_join(JoinType::Inner, 2, t2_rows(), t1_rows(), Vec::new());
    let expected = vec![
        vec![int(1), s("a"), int(1), s("x")],
        vec![int(2), s("b"), int(2), s("y")],
        vec![int(2), s("b"), int(2), s("z")],
        vec![int(2), s("c"), int(2), s("y")],
        vec![int(2), s("c"), int(2), s("z")],
    ];
    assert_same_multiset(&rows, &expected);
}

#[test]
fn left_outer_join_pads_unmatched_probe_rows() {
    let rows = run_join(JoinType::LeftOuter, 2, t2_rows(), t1_rows(), Vec::new());
    let expected = vec![
        vec![int(1), s("a"), int(1), s("x")],
        vec![int(2), s("b"), int(2), s("y")],
        vec![int(2), s("b"), int(2), s("z")],
        vec![int(2), s("c"), int(2), s("y")],
        vec![int(2), s("c"), int(2), s("z")],
        vec![null(), s("d"), null(), null()],
    ];
    assert_same_multiset(&rows, &expected);
}

#[test]
fn right_outer_join_preserves_probe_on_the_right() {
    // T2 is the left/build side, T1 the right/probe side; output stays in
    // left-then-right column order with null padding on the left.
    let rows = run_join(JoinType::RightOuter, 2, t2_rows(), t1_rows(), Vec::new());
    let expected = vec![
        vec![int(1), s("x"), int(1), s("a")],
        vec![int(2), s("y"), int(2), s("b")],
        vec![int(2), s("z"), int(2), s("b")],
        vec![int(2), s("y"), int(2), s("c")],
        vec![int(2), s("z"), int(2), s("c")],
        vec![null(), null(), null(), s("d")],
    ];
    assert_same_multiset(&rows, &expected);
}

#[test]
fn left_semi_join_emits_each_matching_probe_row_once() {
    let rows = run_join(JoinType::LeftSemi, 2, t2_rows(), t1_rows(), Vec::new());
    let expected = vec![
        vec![int(1), s("a")],
        vec![int(2), s("b")],
        vec![int(2), s("c")],
    ];
    assert_same_multiset(&rows, &expected);
}

#[test]
fn left_anti_semi_join_emits_only_unmatched_probe_rows() {
    let rows = run_join(JoinType::LeftAntiSemi, 2, t2_rows(), t1_rows(), Vec::new());
    let expected = vec![vec![null(), s("d")]];
    assert_same_multiset(&rows, &expected);
}

#[test]
fn probe_side_filter_narrows_the_join() {
    // probe = T2 with filter col0 != 2, build = T1.
    let filter: Vec<Box<dyn FilterExpr>> =
        vec![Box::new(ColumnCompare::new(0, CmpOp::Ne, int(2)))];
    let rows = run_join(JoinType::Inner, 2, t1_rows(), t2_rows(), filter);
    let expected = vec![vec![int(1), s("x"), int(1), s("a")]];
    assert_same_multiset(&rows, &expected);
}

#[test]
fn output_multiset_is_independent_of_concurrency() {
    let mut build = Vec::new();
    for k in 0..20i64 {
        build.push(vec![int(k % 7), s(&format!("b{k}"))]);
    }
    let mut probe = Vec::new();
    for k in 0..40i64 {
        let key = if k % 11 == 0 { null() } else { int(k % 9) };
        probe.push(vec![key, s(&format!("p{k}"))]);
    }

    let baseline = run_join(
        JoinType::Inner,
        1,
        build.clone(),
        probe.clone(),
        Vec::new(),
    );
    for concurrency in [2usize, 8] {
        let rows = run_join(
            JoinType::Inner,
            concurrency,
            build.clone(),
            probe.clone(),
            Vec::new(),
        );
        assert_same_multiset(&rows, &baseline);
    }
}

#[test]
fn tiny_result_chunks_force_rotation_without_row_loss() {
    let ctx = ExecContext {
        init_chunk_capacity: 1,
        max_chunk_capacity: 2,
    };
    let mut join = join_over(JoinType::Inner, 2, t2_rows(), t1_rows(), Vec::new());
    join.open(&ctx).expect("open");
    let rows = collect_rows(&mut join, &ctx);
    join.close().expect("close");
    assert_eq!(rows.len(), 5);
}

#[test]
fn close_mid_stream_terminates_promptly() {
    let build_rows = vec![vec![int(1), s("m")]];
    let build = Box::new(MockExec::new(int_utf8_types(), build_rows));
    let probe = Box::new(EndlessExec::new());
    let mut join = HashJoinExec::new(
        build,
        probe,
        HashJoinConfig {
            concurrency: 2,
            join_type: JoinType::Inner,
            probe_keys: vec![0],
            build_keys: vec![0],
            probe_side_filter: Vec::new(),
            build_side_est_count: 0,
        },
    )
    .expect("hash join construction");
    let ctx = ExecContext::default();
    join.open(&ctx).expect("open");

    let mut chunk = Chunk::new(join.schema(), ctx.max_chunk_capacity).expect("chunk");
    join.next(&ctx, &mut chunk).expect("first next");
    assert!(chunk.num_rows() > 0);

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let handle = std::thread::spawn(move || {
        join.close().expect("close");
        let _ = done_tx.send(());
        join
    });
    done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("close should finish in bounded time");
    let mut join = handle.join().expect("close thread");

    let mut chunk = Chunk::new(&join.schema().to_vec(), ctx.max_chunk_capacity).expect("chunk");
    join.next(&ctx, &mut chunk).expect("next after close");
    assert_eq!(chunk.num_rows(), 0);
}

#[test]
fn close_before_any_next_is_safe() {
    let mut join = join_over(JoinType::Inner, 2, t2_rows(), t1_rows(), Vec::new());
    let ctx = ExecContext::default();
    join.open(&ctx).expect("open");
    join.close().expect("close before next");
}

#[test]
fn build_side_error_aborts_before_probe_phase() {
    let build = Box::new(MockExec::new(int_utf8_types(), t2_rows()).failing_at_batch(0));
    let probe = Box::new(MockExec::new(int_utf8_types(), t1_rows()));
    let mut join = HashJoinExec::new(
        build,
        probe,
        HashJoinConfig {
            concurrency: 2,
            join_type: JoinType::Inner,
            probe_keys: vec![0],
            build_keys: vec![0],
            probe_side_filter: Vec::new(),
            build_side_est_count: 0,
        },
    )
    .expect("hash join construction");
    let ctx = ExecContext::default();
    join.open(&ctx).expect("open");

    let mut chunk = Chunk::new(join.schema(), ctx.max_chunk_capacity).expect("chunk");
    let err = join.next(&ctx, &mut chunk).expect_err("build failure");
    assert!(matches!(err, ExecError::Upstream(_)));
    join.close().expect("close after error");
}

#[test]
fn probe_side_error_surfaces_through_next() {
    let build = Box::new(MockExec::new(int_utf8_types(), t2_rows()));
    let probe = Box::new(
        MockExec::new(int_utf8_types(), t1_rows())
            .with_batch_rows(1)
            .failing_at_batch(1),
    );
    let mut join = HashJoinExec::new(
        build,
        probe,
        HashJoinConfig {
            concurrency: 2,
            join_type: JoinType::Inner,
            probe_keys: vec![0],
            build_keys: vec![0],
            probe_side_filter: Vec::new(),
            build_side_est_count: 0,
        },
    )
    .expect("hash join construction");
    let ctx = ExecContext::default();
    join.open(&ctx).expect("open");

    let mut saw_error = false;
    loop {
        let mut chunk = Chunk::new(join.schema(), ctx.max_chunk_capacity).expect("chunk");
        match join.next(&ctx, &mut chunk) {
            Ok(()) if chunk.num_rows() == 0 => break,
            Ok(()) => continue,
            Err(err) => {
                assert!(matches!(err, ExecError::Upstream(_)), "got {err}");
                saw_error = true;
                break;
            }
        }
    }
    assert!(saw_error, "probe failure never surfaced");
    join.close().expect("close after error");
}

#[test]
fn probe_side_panic_becomes_an_error_result() {
    let build = Box::new(MockExec::new(int_utf8_types(), t2_rows()));
    let probe = Box::new(PanicExec::new());
    let mut join = HashJoinExec::new(
        build,
        probe,
        HashJoinConfig {
            concurrency: 2,
            join_type: JoinType::Inner,
            probe_keys: vec![0],
            build_keys: vec![0],
            probe_side_filter: Vec::new(),
            build_side_est_count: 0,
        },
    )
    .expect("hash join construction");
    let ctx = ExecContext::default();
    join.open(&ctx).expect("open");

    let mut saw_panic = false;
    loop {
        let mut chunk = Chunk::new(join.schema(), ctx.max_chunk_capacity).expect("chunk");
        match join.next(&ctx, &mut chunk) {
            Ok(()) if chunk.num_rows() == 0 => break,
            Ok(()) => continue,
            Err(err) => {
                assert!(matches!(err, ExecError::Panic(_)), "got {err}");
                saw_panic = true;
                break;
            }
        }
    }
    assert!(saw_panic, "panic never surfaced as an error result");
    join.close().expect("close after panic");
}

#[test]
fn empty_build_side_yields_no_inner_matches_and_all_anti_rows() {
    let inner = run_join(JoinType::Inner, 2, Vec::new(), t1_rows(), Vec::new());
    assert!(inner.is_empty());

    let anti = run_join(JoinType::LeftAntiSemi, 2, Vec::new(), t1_rows(), Vec::new());
    assert_same_multiset(&anti, &t1_rows());
}

#[test]
fn mismatched_key_shapes_are_rejected_at_open() {
    let mut join = {
        let build = Box::new(MockExec::new(int_utf8_types(), t2_rows()));
        let probe = Box::new(MockExec::new(int_utf8_types(), t1_rows()));
        HashJoinExec::new(
            build,
            probe,
            HashJoinConfig {
                concurrency: 2,
                join_type: JoinType::Inner,
                probe_keys: vec![0, 1],
                build_keys: vec![0],
                probe_side_filter: Vec::new(),
                build_side_est_count: 0,
            },
        )
        .expect("hash join construction")
    };
    let err = join.open(&ExecContext::default()).expect_err("arity");
    assert!(matches!(err, ExecError::OperandShape(_)));

    let mut join = {
        let build = Box::new(MockExec::new(int_utf8_types(), t2_rows()));
        let probe = Box::new(MockExec::new(int_utf8_types(), t1_rows()));
        HashJoinExec::new(
            build,
            probe,
            HashJoinConfig {
                concurrency: 2,
                join_type: JoinType::Inner,
                probe_keys: vec![0],
                build_keys: vec![1],
                probe_side_filter: Vec::new(),
                build_side_est_count: 0,
            },
        )
        .expect("hash join construction")
    };
    let err = join.open(&ExecContext::default()).expect_err("key types");
    assert!(matches!(err, ExecError::OperandShape(_)));
}
