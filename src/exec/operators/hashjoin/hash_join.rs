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
//! Parallel hash-join operator.
//!
//! Responsibilities:
//! - Runs the sequential build pump, then fans probe batches out to join
//!   workers over bounded chunk-recycling channels and fans results back in.
//! - Owns shutdown broadcast, channel draining on close, and panic-to-error
//!   conversion for every spawned task.
//!
//! Key exported interfaces:
//! - Types: `HashJoinExec`, `HashJoinConfig`.
//!
//! Current limitations:
//! - The build side must fit in memory; there is no spill path.
//! - Full-outer joins are not implemented (they would need a build-side
//!   seen bitmap drained after probe input ends).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;

use arrow::datatypes::DataType;
use crossbeam_channel::{bounded, select, Receiver, Sender};

use super::joiner::{new_joiner, Joiner, RowPtrIter};
use super::JoinType;
use crate::common::config::default_join_concurrency;
use crate::common::error::{ExecError, ExecResult};
use crate::exec::chunk::{Chunk, Row};
use crate::exec::executor::{ExecContext, Executor};
use crate::exec::expr::{vectorized_filter, FilterExpr};
use crate::exec::hash_table::{HashContext, HashRowContainer};
use crate::riffle_logging::{debug, error};

/// Construction options for [`HashJoinExec`]. Key lists are ordered column
/// indices into the respective child schemas; chunk sizing comes from the
/// [`ExecContext`] the operator is opened with.
pub struct HashJoinConfig {
    pub concurrency: usize,
    pub join_type: JoinType,
    pub probe_keys: Vec<usize>,
    pub build_keys: Vec<usize>,
    pub probe_side_filter: Vec<Box<dyn FilterExpr>>,
    pub build_side_est_count: usize,
}

impl Default for HashJoinConfig {
    fn default() -> Self {
        Self {
            concurrency: default_join_concurrency(),
            join_type: JoinType::Inner,
            probe_keys: Vec::new(),
            build_keys: Vec::new(),
            probe_side_filter: Vec::new(),
            build_side_est_count: 0,
        }
    }
}

/// Carries an empty probe chunk back to the fetcher together with the index
/// of the worker whose probe channel must receive it once refilled. The
/// resource-to-worker assignment is fixed at startup.
struct ProbeChunkResource {
    chk: Chunk,
    dest: usize,
}

/// One result chunk travelling to the caller. `src` is the owning worker's
/// result pool; the caller pushes the emptied chunk back through it after
/// swapping the columns out.
pub(crate) struct JoinWorkerResult {
    pub(crate) chk: Chunk,
    pub(crate) src: Sender<Chunk>,
}

/// Hash join executor: builds a hash-row container from the build child,
/// then probes it in parallel with batches from the probe child.
pub struct HashJoinExec {
    build_side: Box<dyn Executor>,
    probe_side: Arc<Mutex<Box<dyn Executor>>>,
    join_type: JoinType,
    probe_is_left: bool,
    concurrency: usize,
    probe_keys: Vec<usize>,
    build_keys: Vec<usize>,
    probe_side_filter: Arc<Vec<Box<dyn FilterExpr>>>,
    build_side_est_count: usize,
    probe_types: Vec<DataType>,
    build_types: Vec<DataType>,
    schema: Vec<DataType>,
    row_container: Option<Arc<HashRowContainer>>,
    shutdown_tx: Option<Sender<()>>,
    shutdown_rx: Option<Receiver<()>>,
    join_result_rx: Option<Receiver<ExecResult<JoinWorkerResult>>>,
    prepared: bool,
}

impl HashJoinExec {
    pub fn new(
        build_side: Box<dyn Executor>,
        probe_side: Box<dyn Executor>,
        config: HashJoinConfig,
    ) -> ExecResult<Self> {
        if config.concurrency == 0 {
            return Err(ExecError::Internal(
                "hash join concurrency must be positive".to_string(),
            ));
        }
        let probe_types = probe_side.schema().to_vec();
        let build_types = build_side.schema().to_vec();
        let probe_is_left = config.join_type.probe_is_left();
        let schema = output_types(
            config.join_type,
            probe_is_left,
            &probe_types,
            &build_types,
        );
        Ok(Self {
            build_side,
            probe_side: Arc::new(Mutex::new(probe_side)),
            join_type: config.join_type,
            probe_is_left,
            concurrency: config.concurrency,
            probe_keys: config.probe_keys,
            build_keys: config.build_keys,
            probe_side_filter: Arc::new(config.probe_side_filter),
            build_side_est_count: config.build_side_est_count,
            probe_types,
            build_types,
            schema,
            row_container: None,
            shutdown_tx: None,
            shutdown_rx: None,
            join_result_rx: None,
            prepared: false,
        })
    }

    fn validate_keys(&self) -> ExecResult<()> {
        if self.probe_keys.is_empty() || self.probe_keys.len() != self.build_keys.len() {
            return Err(ExecError::OperandShape(format!(
                "join key arity mismatch: probe={} build={}",
                self.probe_keys.len(),
                self.build_keys.len()
            )));
        }
        for (&p, &b) in self.probe_keys.iter().zip(&self.build_keys) {
            let probe_type = self.probe_types.get(p).ok_or_else(|| {
                ExecError::OperandShape(format!("probe key column {p} out of bounds"))
            })?;
            let build_type = self.build_types.get(b).ok_or_else(|| {
                ExecError::OperandShape(format!("build key column {b} out of bounds"))
            })?;
            if probe_type != build_type {
                return Err(ExecError::OperandShape(format!(
                    "join key type mismatch: probe[{p}]={probe_type} build[{b}]={build_type}"
                )));
            }
        }
        Ok(())
    }

    /// Drain the build child into a fresh hash-row container. Runs to
    /// completion before any probe task starts; a child error aborts the
    /// caller's `next` before the probe phase.
    fn fetch_and_build_hash_table(&mut self, ctx: &ExecContext) -> ExecResult<()> {
        let hash_ctx = HashContext::new(self.build_types.clone(), self.build_keys.clone());
        let mut container = HashRowContainer::new(self.build_side_est_count, hash_ctx);
        loop {
            let mut chunk = ctx.new_chunk(&self.build_types)?;
            self.build_side.next(ctx, &mut chunk)?;
            if chunk.num_rows() == 0 {
                break;
            }
            container.put_chunk(chunk)?;
        }
        debug!(
            "HashJoin build phase done: rows={} chunks={}",
            container.num_rows(),
            container.num_chunks()
        );
        self.row_container = Some(Arc::new(container));
        Ok(())
    }

    /// Wire the bounded channels and spawn the probe fetcher and the join
    /// workers. Capacities: per-worker probe channel 1, per-worker result
    /// pool 1, fetcher resource pool N, shared result channel N+1.
    fn fetch_and_probe(&mut self, ctx: &ExecContext) -> ExecResult<()> {
        let container = Arc::clone(self.row_container.as_ref().ok_or_else(|| {
            ExecError::Internal("hash join probe started before build".to_string())
        })?);
        let shutdown_rx = self
            .shutdown_rx
            .clone()
            .ok_or_else(|| ExecError::Internal("hash join executor is not open".to_string()))?;

        let n = self.concurrency;
        let mut probe_txs = Vec::with_capacity(n);
        let mut probe_rxs = Vec::with_capacity(n);
        for _ in 0..n {
            let (tx, rx) = bounded::<Chunk>(1);
            probe_txs.push(tx);
            probe_rxs.push(rx);
        }

        let (resource_tx, resource_rx) = bounded::<ProbeChunkResource>(n);
        for dest in 0..n {
            let chk = ctx.new_chunk(&self.probe_types)?;
            resource_tx
                .send(ProbeChunkResource { chk, dest })
                .map_err(|_| {
                    ExecError::Internal("probe resource pool closed during setup".to_string())
                })?;
        }

        let (result_tx, result_rx) = bounded::<ExecResult<JoinWorkerResult>>(n + 1);

        let fetcher_ctx = *ctx;
        let probe_side = Arc::clone(&self.probe_side);
        let fetcher_result_tx = result_tx.clone();
        let fetcher_shutdown = shutdown_rx.clone();
        thread::spawn(move || {
            let panic_tx = fetcher_result_tx.clone();
            let outcome = catch_unwind(AssertUnwindSafe(move || {
                run_probe_fetcher(
                    probe_side,
                    fetcher_ctx,
                    resource_rx,
                    probe_txs,
                    fetcher_result_tx,
                    fetcher_shutdown,
                );
            }));
            // Unwinding drops the per-worker probe senders, which is what
            // lets workers drain and exit after a fetcher panic.
            if let Err(payload) = outcome {
                let err = panic_error(payload);
                error!("HashJoin probe fetcher panicked: err={}", err);
                let _ = panic_tx.send(Err(err));
            }
        });

        for (id, probe_rx) in probe_rxs.into_iter().enumerate() {
            let (chk_tx, chk_rx) = bounded::<Chunk>(1);
            chk_tx.send(ctx.new_chunk(&self.schema)?).map_err(|_| {
                ExecError::Internal("result chunk pool closed during setup".to_string())
            })?;
            let worker = JoinWorker {
                id,
                probe_rx,
                probe_resource_tx: resource_tx.clone(),
                chk_resource_rx: chk_rx,
                chk_resource_tx: chk_tx,
                result_tx: result_tx.clone(),
                shutdown_rx: shutdown_rx.clone(),
                container: Arc::clone(&container),
                probe_filter: Arc::clone(&self.probe_side_filter),
                hash_ctx: HashContext::new(self.probe_types.clone(), self.probe_keys.clone()),
                joiner: new_joiner(self.join_type, self.probe_is_left, self.build_types.len()),
                selected: Vec::new(),
            };
            let panic_tx = result_tx.clone();
            thread::spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(move || worker.run()));
                if let Err(payload) = outcome {
                    let err = panic_error(payload);
                    error!("HashJoin worker panicked: err={}", err);
                    let _ = panic_tx.send(Err(err));
                }
            });
        }

        // The operator keeps only the receiving end: the shared result
        // channel disconnects exactly when the last task drops its sender,
        // which is the end-of-input barrier the caller observes.
        self.join_result_rx = Some(result_rx);
        Ok(())
    }
}

impl Executor for HashJoinExec {
    fn open(&mut self, ctx: &ExecContext) -> ExecResult<()> {
        self.validate_keys()?;
        self.prepared = false;
        self.row_container = None;
        let (tx, rx) = bounded::<()>(0);
        self.shutdown_tx = Some(tx);
        self.shutdown_rx = Some(rx);
        self.build_side.open(ctx)?;
        self.probe_side
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .open(ctx)
    }

    fn next(&mut self, ctx: &ExecContext, chunk: &mut Chunk) -> ExecResult<()> {
        chunk.reset();
        if self.shutdown_rx.is_none() {
            // Not open (or already closed): keep yielding end-of-input.
            return Ok(());
        }
        if !self.prepared {
            self.fetch_and_build_hash_table(ctx)?;
            self.fetch_and_probe(ctx)?;
            self.prepared = true;
        }
        let result_rx = self.join_result_rx.as_ref().ok_or_else(|| {
            ExecError::Internal("hash join result channel missing".to_string())
        })?;
        match result_rx.recv() {
            Err(_) => Ok(()),
            Ok(Err(err)) => Err(err),
            Ok(Ok(mut result)) => {
                chunk.swap_columns(&mut result.chk);
                let _ = result.src.send(result.chk);
                Ok(())
            }
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        // Broadcast shutdown, then drain the shared result channel so every
        // pending send unblocks; disconnection means all tasks have exited.
        self.shutdown_tx = None;
        if self.prepared {
            if let Some(result_rx) = self.join_result_rx.take() {
                while result_rx.recv().is_ok() {}
            }
            self.prepared = false;
        }
        self.join_result_rx = None;
        self.shutdown_rx = None;
        self.row_container = None;
        let build_res = self.build_side.close();
        let probe_res = self
            .probe_side
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .close();
        build_res?;
        probe_res
    }

    fn schema(&self) -> &[DataType] {
        &self.schema
    }
}

fn output_types(
    join_type: JoinType,
    probe_is_left: bool,
    probe_types: &[DataType],
    build_types: &[DataType],
) -> Vec<DataType> {
    match join_type {
        JoinType::LeftSemi | JoinType::LeftAntiSemi => probe_types.to_vec(),
        _ => {
            let (left, right) = if probe_is_left {
                (probe_types, build_types)
            } else {
                (build_types, probe_types)
            };
            left.iter().chain(right).cloned().collect()
        }
    }
}

fn panic_error(payload: Box<dyn std::any::Any + Send>) -> ExecError {
    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    ExecError::Panic(msg)
}

/// Pull probe batches and route each to its resource's worker. Exits on
/// shutdown, pool disconnection, child error, or end of probe input; every
/// exit path drops the probe senders so workers observe end-of-input.
fn run_probe_fetcher(
    probe_side: Arc<Mutex<Box<dyn Executor>>>,
    ctx: ExecContext,
    resource_rx: Receiver<ProbeChunkResource>,
    probe_txs: Vec<Sender<Chunk>>,
    result_tx: Sender<ExecResult<JoinWorkerResult>>,
    shutdown_rx: Receiver<()>,
) {
    loop {
        let resource = select! {
            recv(shutdown_rx) -> _ => return,
            recv(resource_rx) -> res => match res {
                Ok(resource) => resource,
                Err(_) => return,
            },
        };
        let ProbeChunkResource { mut chk, dest } = resource;
        let fill = {
            let mut probe = probe_side.lock().unwrap_or_else(|e| e.into_inner());
            probe.next(&ctx, &mut chk)
        };
        if let Err(err) = fill {
            select! {
                recv(shutdown_rx) -> _ => {}
                send(result_tx, Err(err)) -> _ => {}
            }
            return;
        }
        if chk.num_rows() == 0 {
            return;
        }
        select! {
            recv(shutdown_rx) -> _ => return,
            send(probe_txs[dest], chk) -> res => {
                if res.is_err() {
                    return;
                }
            }
        }
    }
}

struct JoinWorker {
    id: usize,
    probe_rx: Receiver<Chunk>,
    probe_resource_tx: Sender<ProbeChunkResource>,
    chk_resource_rx: Receiver<Chunk>,
    chk_resource_tx: Sender<Chunk>,
    result_tx: Sender<ExecResult<JoinWorkerResult>>,
    shutdown_rx: Receiver<()>,
    container: Arc<HashRowContainer>,
    probe_filter: Arc<Vec<Box<dyn FilterExpr>>>,
    hash_ctx: HashContext,
    joiner: Box<dyn Joiner>,
    selected: Vec<bool>,
}

impl JoinWorker {
    fn run(mut self) {
        let Some(mut result) = self.get_new_join_result() else {
            return;
        };
        loop {
            let probe_chunk = select! {
                recv(self.shutdown_rx) -> _ => return,
                recv(self.probe_rx) -> chk => match chk {
                    Ok(chunk) => chunk,
                    Err(_) => break,
                },
            };
            result = match self.join2_chunk(&probe_chunk, result) {
                Ok(Some(result)) => result,
                Ok(None) => return,
                Err(err) => {
                    select! {
                        recv(self.shutdown_rx) -> _ => {}
                        send(self.result_tx, Err(err)) -> _ => {}
                    }
                    return;
                }
            };
            let mut probe_chunk = probe_chunk;
            probe_chunk.reset();
            // The recycle send fails only after the fetcher exited; the
            // remaining buffered probe chunks still drain through the loop.
            let _ = self.probe_resource_tx.send(ProbeChunkResource {
                chk: probe_chunk,
                dest: self.id,
            });
        }
        if result.chk.num_rows() > 0 {
            select! {
                recv(self.shutdown_rx) -> _ => {}
                send(self.result_tx, Ok(result)) -> _ => {}
            }
        }
    }

    /// Probe one batch: filter, hash the key columns of selected rows, then
    /// dispatch row-by-row. Returns the (possibly rotated) result chunk, or
    /// `None` when shutdown aborted a blocking step.
    fn join2_chunk(
        &mut self,
        probe_chunk: &Chunk,
        mut result: JoinWorkerResult,
    ) -> ExecResult<Option<JoinWorkerResult>> {
        let n = probe_chunk.num_rows();
        vectorized_filter(&self.probe_filter, probe_chunk, &mut self.selected)?;
        self.hash_ctx.init_hash(n);
        self.hash_ctx
            .hash_key_columns(probe_chunk, Some(&self.selected))?;
        for i in 0..n {
            if !self.selected[i] || self.hash_ctx.has_null[i] {
                self.joiner.on_miss_match(probe_chunk.row(i), &mut result.chk)?;
            } else {
                let probe_key = self.hash_ctx.hash_vals[i];
                result = match self.join_matched_probe_side_row(
                    probe_key,
                    probe_chunk.row(i),
                    result,
                )? {
                    Some(result) => result,
                    None => return Ok(None),
                };
            }
            if result.chk.is_full() {
                result = match self.flush_and_rotate(result) {
                    Some(result) => result,
                    None => return Ok(None),
                };
            }
        }
        Ok(Some(result))
    }

    /// One matched probe row: collect true matches from the container and
    /// hand them to the joiner, rotating the result chunk whenever it fills.
    fn join_matched_probe_side_row(
        &mut self,
        probe_key: u64,
        probe_row: Row<'_>,
        mut result: JoinWorkerResult,
    ) -> ExecResult<Option<JoinWorkerResult>> {
        let build_rows = self
            .container
            .get_matched_rows(probe_key, probe_row, &self.hash_ctx)?;
        if build_rows.is_empty() {
            self.joiner.on_miss_match(probe_row, &mut result.chk)?;
            return Ok(Some(result));
        }
        let mut iter = RowPtrIter::new(build_rows);
        let mut has_match = false;
        while !iter.is_done() {
            let matched = self.joiner.try_to_match_inners(
                probe_row,
                &self.container,
                &mut iter,
                &mut result.chk,
            )?;
            has_match = has_match || matched;
            if result.chk.is_full() {
                result = match self.flush_and_rotate(result) {
                    Some(result) => result,
                    None => return Ok(None),
                };
            }
        }
        if !has_match {
            self.joiner.on_miss_match(probe_row, &mut result.chk)?;
        }
        Ok(Some(result))
    }

    /// Ship the full result chunk and acquire an empty one from the pool.
    fn flush_and_rotate(&self, result: JoinWorkerResult) -> Option<JoinWorkerResult> {
        select! {
            recv(self.shutdown_rx) -> _ => return None,
            send(self.result_tx, Ok(result)) -> res => {
                if res.is_err() {
                    return None;
                }
            }
        }
        self.get_new_join_result()
    }

    /// Acquire an empty result chunk, aborting on shutdown.
    fn get_new_join_result(&self) -> Option<JoinWorkerResult> {
        select! {
            recv(self.shutdown_rx) -> _ => None,
            recv(self.chk_resource_rx) -> chk => chk.ok().map(|chk| JoinWorkerResult {
                chk,
                src: self.chk_resource_tx.clone(),
            }),
        }
    }
}
