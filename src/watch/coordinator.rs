use std::time::{Duration, Instant};

use crate::types::{Address, MiningOverview, NodeStatusCard, TaskStats, WalletBalances};
use crate::watch::status::FetchStatus;

/// The four independent fetch lanes of a load wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Metrics,
    Mining,
    Balances,
    TaskStats,
}

impl FetchKind {
    pub const ALL: [FetchKind; 4] = [
        FetchKind::Metrics,
        FetchKind::Mining,
        FetchKind::Balances,
        FetchKind::TaskStats,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FetchKind::Metrics => "metrics",
            FetchKind::Mining => "mining",
            FetchKind::Balances => "balances",
            FetchKind::TaskStats => "task stats",
        }
    }

    fn index(self) -> usize {
        match self {
            FetchKind::Metrics => 0,
            FetchKind::Mining => 1,
            FetchKind::Balances => 2,
            FetchKind::TaskStats => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchPayload {
    Metrics(NodeStatusCard),
    Mining(MiningOverview),
    Balances(WalletBalances),
    TaskStats(TaskStats),
}

/// One dispatched load wave: every lane fetched for this identity under this
/// generation.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchWave {
    pub generation: u64,
    pub node_id: String,
    pub address: Address,
}

/// A worker's answer for one lane, tagged with the generation it was
/// dispatched under.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub generation: u64,
    pub kind: FetchKind,
    pub status: FetchStatus<FetchPayload>,
}

#[derive(Debug, PartialEq)]
pub enum Applied {
    /// Result belongs to the live generation and is now visible.
    /// `wave_complete` is true exactly once, when the last lane lands.
    Committed { wave_complete: bool },
    /// Result was dispatched under a superseded generation; dropped unseen.
    Stale,
}

/// Single commit point for everything the dashboard renders about the
/// selected node.
///
/// Selection is cancel-and-replace: choosing a new identity (or clearing)
/// bumps the generation, and results tagged with any older generation are
/// dropped at [`Coordinator::apply`]. Workers are never interrupted, their
/// answers just stop mattering. A short settle window after selection
/// coalesces rapid re-selections into a single dispatched wave.
#[derive(Debug)]
pub struct Coordinator {
    settle_delay: Duration,
    generation: u64,
    current: Option<Current>,
}

#[derive(Debug)]
struct Current {
    node_id: String,
    address: Address,
    generation: u64,
    settle_deadline: Option<Instant>,
    pending: [bool; 4],
    results: [Option<FetchStatus<FetchPayload>>; 4],
    last_updated_at: Option<Instant>,
}

impl Coordinator {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            generation: 0,
            current: None,
        }
    }

    /// Make `node_id` the selected identity. Any in-flight wave is
    /// superseded; the wave for this selection dispatches after the settle
    /// window via [`Coordinator::poll`].
    pub fn select(&mut self, node_id: String, address: Address, now: Instant) {
        self.generation += 1;
        self.current = Some(Current {
            node_id,
            address,
            generation: self.generation,
            settle_deadline: Some(now + self.settle_delay),
            pending: [false; 4],
            results: Default::default(),
            last_updated_at: None,
        });
    }

    /// Drop the selection. In-flight results die at the commit point.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.current = None;
    }

    /// Re-dispatch every lane for the current identity while keeping the
    /// rendered results in place until fresh ones land.
    pub fn begin_refresh(&mut self, now: Instant) {
        self.generation += 1;
        if let Some(current) = self.current.as_mut() {
            current.generation = self.generation;
            current.settle_deadline = Some(now);
            current.pending = [false; 4];
        }
    }

    /// A due settle window yields the wave to dispatch. Each selection yields
    /// at most one wave.
    pub fn poll(&mut self, now: Instant) -> Option<FetchWave> {
        let current = self.current.as_mut()?;
        let deadline = current.settle_deadline?;
        if now < deadline {
            return None;
        }
        current.settle_deadline = None;
        current.pending = [true; 4];
        Some(FetchWave {
            generation: current.generation,
            node_id: current.node_id.clone(),
            address: current.address.clone(),
        })
    }

    /// The commit point. Only results tagged with the live generation become
    /// visible; everything else is stale and discarded.
    pub fn apply(&mut self, result: FetchResult, now: Instant) -> Applied {
        let Some(current) = self.current.as_mut() else {
            return Applied::Stale;
        };
        if result.generation != current.generation {
            return Applied::Stale;
        }

        let idx = result.kind.index();
        current.results[idx] = Some(result.status);
        current.pending[idx] = false;

        let wave_complete = !current.pending.iter().any(|pending| *pending);
        if wave_complete {
            current.last_updated_at = Some(now);
        }
        Applied::Committed { wave_complete }
    }

    pub fn selection(&self) -> Option<(&str, &Address)> {
        self.current
            .as_ref()
            .map(|current| (current.node_id.as_str(), &current.address))
    }

    pub fn result(&self, kind: FetchKind) -> Option<&FetchStatus<FetchPayload>> {
        self.current.as_ref()?.results[kind.index()].as_ref()
    }

    pub fn is_loading(&self, kind: FetchKind) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.pending[kind.index()])
    }

    pub fn last_updated_at(&self) -> Option<Instant> {
        self.current.as_ref()?.last_updated_at
    }

    /// The live generation. Anything tagged lower is already superseded.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_millis(150);

    fn addr(tail: char) -> Address {
        let raw = format!("0x{}", std::iter::repeat(tail).take(40).collect::<String>());
        Address::parse(&raw).expect("test address should parse")
    }

    fn result(generation: u64, kind: FetchKind) -> FetchResult {
        FetchResult {
            generation,
            kind,
            status: FetchStatus::Ok(FetchPayload::TaskStats(TaskStats::default())),
        }
    }

    fn commit_wave(coordinator: &mut Coordinator, generation: u64, now: Instant) {
        for kind in FetchKind::ALL {
            coordinator.apply(result(generation, kind), now);
        }
    }

    #[test]
    fn superseded_results_never_become_visible() {
        let mut coordinator = Coordinator::new(SETTLE);
        let t0 = Instant::now();

        coordinator.select("node-a".to_string(), addr('a'), t0);
        let wave_a = coordinator.poll(t0 + SETTLE).expect("wave for node-a");

        // User picks a different node before node-a's results land.
        coordinator.select("node-b".to_string(), addr('b'), t0 + SETTLE);

        assert_eq!(
            coordinator.apply(result(wave_a.generation, FetchKind::Metrics), t0 + SETTLE),
            Applied::Stale
        );
        assert!(coordinator.result(FetchKind::Metrics).is_none());

        let wave_b = coordinator
            .poll(t0 + SETTLE + SETTLE)
            .expect("wave for node-b");
        assert_eq!(wave_b.node_id, "node-b");
        assert!(matches!(
            coordinator.apply(result(wave_b.generation, FetchKind::Metrics), t0),
            Applied::Committed { .. }
        ));
    }

    #[test]
    fn rapid_reselection_dispatches_one_wave() {
        let mut coordinator = Coordinator::new(SETTLE);
        let t0 = Instant::now();

        coordinator.select("node-a".to_string(), addr('a'), t0);
        coordinator.select("node-b".to_string(), addr('b'), t0 + Duration::from_millis(50));

        // node-a's settle deadline has passed, but its selection is gone.
        assert!(coordinator.poll(t0 + SETTLE).is_none());

        let wave = coordinator
            .poll(t0 + Duration::from_millis(200))
            .expect("single wave for the final selection");
        assert_eq!(wave.node_id, "node-b");

        // One wave per selection.
        assert!(coordinator.poll(t0 + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn wave_complete_fires_exactly_once() {
        let mut coordinator = Coordinator::new(SETTLE);
        let t0 = Instant::now();

        coordinator.select("node-a".to_string(), addr('a'), t0);
        let wave = coordinator.poll(t0 + SETTLE).expect("wave");

        let mut completions = 0;
        for kind in FetchKind::ALL {
            if let Applied::Committed { wave_complete: true } =
                coordinator.apply(result(wave.generation, kind), t0)
            {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert!(coordinator.last_updated_at().is_some());
    }

    #[test]
    fn refresh_keeps_rendered_results_until_replaced() {
        let mut coordinator = Coordinator::new(SETTLE);
        let t0 = Instant::now();

        coordinator.select("node-a".to_string(), addr('a'), t0);
        let first = coordinator.poll(t0 + SETTLE).expect("initial wave");
        commit_wave(&mut coordinator, first.generation, t0 + SETTLE);
        let loaded_at = coordinator
            .last_updated_at()
            .expect("initial wave stamps the timestamp");

        coordinator.begin_refresh(t0 + Duration::from_secs(300));

        // Old values stay on screen while the refresh is in flight.
        assert!(coordinator.result(FetchKind::TaskStats).is_some());

        let refresh = coordinator
            .poll(t0 + Duration::from_secs(300))
            .expect("refresh wave dispatches immediately");
        assert_eq!(refresh.node_id, "node-a");
        assert!(refresh.generation > first.generation);

        // A straggler from the original wave is stale now.
        assert_eq!(
            coordinator.apply(result(first.generation, FetchKind::Mining), t0),
            Applied::Stale
        );

        // The refresh wave commits at a later instant and the timestamp
        // moves with it.
        commit_wave(
            &mut coordinator,
            refresh.generation,
            t0 + Duration::from_secs(301),
        );
        let refreshed_at = coordinator
            .last_updated_at()
            .expect("refresh wave stamps the timestamp");
        assert!(refreshed_at > loaded_at);
    }

    #[test]
    fn clear_drops_selection_and_in_flight_wave() {
        let mut coordinator = Coordinator::new(SETTLE);
        let t0 = Instant::now();

        coordinator.select("node-a".to_string(), addr('a'), t0);
        let wave = coordinator.poll(t0 + SETTLE).expect("wave");
        coordinator.clear();

        assert_eq!(
            coordinator.apply(result(wave.generation, FetchKind::Balances), t0),
            Applied::Stale
        );
        assert!(coordinator.selection().is_none());
        assert!(coordinator.poll(t0 + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn lanes_report_loading_until_their_result_lands() {
        let mut coordinator = Coordinator::new(SETTLE);
        let t0 = Instant::now();

        coordinator.select("node-a".to_string(), addr('a'), t0);
        assert!(!coordinator.is_loading(FetchKind::Metrics));

        let wave = coordinator.poll(t0 + SETTLE).expect("wave");
        assert!(coordinator.is_loading(FetchKind::Metrics));
        assert!(coordinator.is_loading(FetchKind::Balances));

        coordinator.apply(result(wave.generation, FetchKind::Metrics), t0);
        assert!(!coordinator.is_loading(FetchKind::Metrics));
        assert!(coordinator.is_loading(FetchKind::Balances));
    }
}
