use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::api::ApiClient;
use crate::rpc::RpcClient;
use crate::types::{
    lenient_f64, ClaimStatus, MiningCooldown, MiningDebug, MiningOverview, NodeDetail,
    NodeMetricsReport, NodeStatusCard, TaskStats,
};
use crate::watch::coordinator::{FetchKind, FetchPayload, FetchResult, FetchWave};
use crate::watch::status::{FetchError, FetchStatus};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct FetchJob {
    wave: FetchWave,
}

/// One worker thread per lane, each draining its queue to the newest job.
///
/// Workers check the dispatched job against the live generation before doing
/// any network work, so a superseded wave usually costs nothing. A job that
/// slips through is still harmless: its result arrives tagged and dies at
/// the coordinator's commit point.
pub struct FetchPool {
    job_txs: Vec<Sender<FetchJob>>,
    live: Arc<AtomicU64>,
    handles: Vec<JoinHandle<()>>,
}

impl FetchPool {
    pub fn spawn(
        api: ApiClient,
        rpc: RpcClient,
        shutdown: Arc<AtomicBool>,
    ) -> Result<(Self, Receiver<FetchResult>)> {
        let (result_tx, result_rx) = unbounded();
        let live = Arc::new(AtomicU64::new(0));

        let mut job_txs = Vec::with_capacity(FetchKind::ALL.len());
        let mut handles = Vec::with_capacity(FetchKind::ALL.len());

        for kind in FetchKind::ALL {
            let (job_tx, job_rx) = unbounded::<FetchJob>();
            let api = api.clone();
            let rpc = rpc.clone();
            let live = Arc::clone(&live);
            let shutdown = Arc::clone(&shutdown);
            let result_tx = result_tx.clone();

            let handle = std::thread::Builder::new()
                .name(format!("fetch-{}", kind.as_str()))
                .spawn(move || {
                    worker_loop(kind, &api, &rpc, &job_rx, &result_tx, &live, &shutdown)
                })
                .with_context(|| format!("failed to spawn {} worker", kind.as_str()))?;

            job_txs.push(job_tx);
            handles.push(handle);
        }

        Ok((
            Self {
                job_txs,
                live,
                handles,
            },
            result_rx,
        ))
    }

    /// Publish the wave's generation as live, then hand each lane its job.
    /// The store happens first so workers can skip jobs that are already
    /// superseded when they pick them up.
    pub fn dispatch(&self, wave: &FetchWave) {
        self.live.store(wave.generation, Ordering::SeqCst);
        for tx in &self.job_txs {
            let _ = tx.send(FetchJob { wave: wave.clone() });
        }
    }

    /// Mark every outstanding job superseded without dispatching a new wave.
    pub fn supersede(&self, generation: u64) {
        self.live.store(generation, Ordering::SeqCst);
    }

    pub fn join(mut self) {
        self.job_txs.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    kind: FetchKind,
    api: &ApiClient,
    rpc: &RpcClient,
    jobs: &Receiver<FetchJob>,
    results: &Sender<FetchResult>,
    live: &AtomicU64,
    shutdown: &AtomicBool,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let mut job = match jobs.recv_timeout(POLL_INTERVAL) {
            Ok(job) => job,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
        };
        // Drain to the newest job; older queued waves are already superseded.
        while let Ok(newer) = jobs.try_recv() {
            job = newer;
        }
        if job.wave.generation < live.load(Ordering::SeqCst) {
            continue;
        }

        let status = run_lane(kind, api, rpc, &job);
        let result = FetchResult {
            generation: job.wave.generation,
            kind,
            status,
        };
        if results.send(result).is_err() {
            return;
        }
    }
}

fn run_lane(kind: FetchKind, api: &ApiClient, rpc: &RpcClient, job: &FetchJob) -> FetchStatus<FetchPayload> {
    let node_id = job.wave.node_id.as_str();
    let address = &job.wave.address;
    match kind {
        FetchKind::Metrics => {
            let status = FetchStatus::from_result(api.check_cooldown(node_id).map(|report| {
                // Detail failures degrade the card instead of failing it.
                let detail = api.node_detail(node_id).unwrap_or_default();
                assemble_status_card(report, detail)
            }));
            status.map(FetchPayload::Metrics)
        }
        FetchKind::Mining => {
            let status = FetchStatus::from_result(api.mining_cooldown(node_id).map(|cooldown| {
                let claim = api.claim_status(address.as_str()).unwrap_or_default();
                let debug = api
                    .mining_debug_contract(address.as_str())
                    .unwrap_or_default();
                Some(assemble_mining_overview(cooldown, claim, debug))
            }));
            status.map(FetchPayload::Mining)
        }
        FetchKind::Balances => {
            let result: Result<_, FetchError> = rpc.wallet_balances(address).map(Some);
            FetchStatus::from_result(result).map(FetchPayload::Balances)
        }
        FetchKind::TaskStats => {
            let status = FetchStatus::from_result(api.task_stats(node_id).map(|stats| {
                if stats_are_empty(&stats) {
                    None
                } else {
                    Some(stats)
                }
            }));
            status.map(FetchPayload::TaskStats)
        }
    }
}

/// Merge the hardware report and directory detail. `None` when neither side
/// carried anything renderable, which surfaces as the empty card.
fn assemble_status_card(report: NodeMetricsReport, detail: NodeDetail) -> Option<NodeStatusCard> {
    let mut card = NodeStatusCard {
        node_type: detail.node_type,
        status: detail.status,
        ..Default::default()
    };

    if let Some(sync) = report.last_successful_sync {
        card.last_sync_at = sync.timestamp;
        if let Some(details) = sync.details {
            card.sync_status = details.sync_status;
            card.meets_requirements = details.meets_requirements;
            if let Some(metrics) = details.metrics {
                card.cpu_cores = metrics.cpu;
                card.ram_gb = metrics.ram_gb;
                card.disk_gb = metrics.disk_gb;
                card.download_mbps = metrics.speed_mbps;
                card.upload_mbps = metrics.upload_speed_mbps;
            }
        }
    }

    if card == NodeStatusCard::default() {
        None
    } else {
        Some(card)
    }
}

fn assemble_mining_overview(
    cooldown: MiningCooldown,
    claim: ClaimStatus,
    debug: MiningDebug,
) -> MiningOverview {
    let mining_info = debug
        .contract
        .and_then(|contract| contract.mining_info);
    MiningOverview {
        can_start_mining: cooldown.can_start_mining,
        last_mining_start: cooldown.last_mining_start,
        mined_tokens: lenient_f64(claim.mined_tokens_formatted.as_ref())
            .or_else(|| lenient_f64(cooldown.mined_tokens.as_ref())),
        can_claim: claim.can_claim,
        last_claim_time: claim.last_claim_time,
        mining_duration: claim
            .requirements
            .and_then(|requirements| requirements.mining_duration),
        remaining_time: claim
            .mining_session
            .and_then(|session| session.formatted_remaining_time),
        speed_per_sec: mining_info
            .as_ref()
            .and_then(|info| lenient_f64(info.speed_per_sec.as_ref())),
        percent_complete: mining_info
            .as_ref()
            .and_then(|info| lenient_f64(info.percent_complete_number.as_ref())),
    }
}

fn stats_are_empty(stats: &TaskStats) -> bool {
    stats.last_polled_at.is_none()
        && stats.last_task_completed.is_none()
        && stats.last_task_assigned.is_none()
        && stats.tts_power_status.is_none()
        && stats.available_ram.is_none()
        && stats.task_count.is_none()
}
