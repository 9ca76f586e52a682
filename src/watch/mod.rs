use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{select, Receiver};

use crate::api::ApiClient;
use crate::config::Config;
use crate::rpc::RpcClient;
use crate::types::Address;

pub mod cache;
pub mod coordinator;
pub mod debounce;
pub mod fetch;
pub mod refresh;
pub mod resolver;
pub mod status;
mod ui;

use cache::SharedStore;
use coordinator::{Applied, Coordinator};
use debounce::{AddressDebouncer, AddressEvent};
use fetch::FetchPool;
use refresh::RefreshScheduler;
use resolver::IdentityResolver;

const TICK: Duration = Duration::from_millis(100);
const OVERVIEW_PERIOD: Duration = Duration::from_secs(30);

/// The dashboard driver: a single-threaded event loop over stdin input,
/// worker results and the timer set. All state transitions happen here;
/// the workers only fetch.
pub fn run(
    config: &Config,
    api: ApiClient,
    rpc: RpcClient,
    store: SharedStore,
    shutdown: Arc<AtomicBool>,
    input_rx: Receiver<String>,
) -> Result<()> {
    ui::startup_banner(&[
        ("api", config.api_url.clone()),
        ("rpc", config.rpc_url.clone()),
        ("refresh", format!("{}s", config.refresh_period.as_secs())),
        ("cooldown", format!("{}s", config.cooldown_window.as_secs())),
    ]);

    let mut resolver = IdentityResolver::new();
    let mut coordinator = Coordinator::new(config.settle_delay);
    let mut debouncer = AddressDebouncer::new(config.debounce_quiet);
    let mut scheduler = RefreshScheduler::new(config.refresh_period);

    let (pool, results_rx) = FetchPool::spawn(api.clone(), rpc, Arc::clone(&shutdown))?;

    let mut overview_deadline = Instant::now();

    if let Some(address) = &config.initial_address {
        debouncer.push(address, Instant::now());
    }

    while !shutdown.load(Ordering::SeqCst) {
        select! {
            recv(input_rx) -> line => match line {
                Ok(line) => debouncer.push(&line, Instant::now()),
                Err(_) => {
                    // stdin closed; keep refreshing whatever is selected.
                }
            },
            recv(results_rx) -> result => {
                if let Ok(result) = result {
                    let now = Instant::now();
                    let kind = result.kind;
                    if let Applied::Committed { wave_complete } = coordinator.apply(result, now) {
                        if let Some(result_status) = coordinator.result(kind) {
                            let line = ui::card_line(kind, result_status);
                            match result_status {
                                status::FetchStatus::Error(_) => ui::error("card", line),
                                status::FetchStatus::Cooldown { .. } => ui::warn("card", line),
                                _ => ui::info("card", line),
                            }
                        }
                        if wave_complete {
                            scheduler.arm(now);
                            if let Some(secs) = scheduler.remaining_secs(now) {
                                ui::success("fetch", format!("all cards loaded, next refresh in {secs}s"));
                            }
                        }
                    }
                }
            },
            default(TICK) => {}
        }

        let now = Instant::now();

        if now >= overview_deadline {
            overview_deadline = now + OVERVIEW_PERIOD;
            reload_overview(&api, &store, &mut resolver);
        }

        if let Some(event) = debouncer.poll(now) {
            handle_address_event(
                event,
                &api,
                &store,
                &resolver,
                &mut coordinator,
                &mut scheduler,
                &pool,
            );
        }

        if scheduler.poll(now) {
            if let Some((node_id, address)) = coordinator.selection() {
                ui::info("refresh", format!("auto-refresh for node {node_id}"));
                // Refresh must reach the network, same as a fresh selection.
                if let Ok(mut store) = store.lock() {
                    store.evict_matching(node_id);
                    store.evict_matching(address.as_str());
                }
            }
            coordinator.begin_refresh(now);
        }

        if let Some(wave) = coordinator.poll(now) {
            ui::info(
                "fetch",
                format!("loading node={} wallet={}", wave.node_id, wave.address),
            );
            pool.dispatch(&wave);
        }
    }

    pool.join();
    Ok(())
}

fn handle_address_event(
    event: AddressEvent,
    api: &ApiClient,
    store: &SharedStore,
    resolver: &IdentityResolver,
    coordinator: &mut Coordinator,
    scheduler: &mut RefreshScheduler,
    pool: &FetchPool,
) {
    match event {
        AddressEvent::Cleared => {
            clear_selection(coordinator, scheduler);
            pool.supersede(coordinator.generation());
            ui::info("select", "selection cleared");
        }
        AddressEvent::Invalid(message) => {
            // Malformed settled input drops the previous node too; leaving it
            // selected would keep auto-refreshing a node the user typed away.
            ui::warn("input", message);
            clear_selection(coordinator, scheduler);
            pool.supersede(coordinator.generation());
        }
        AddressEvent::Accepted(address) => select_wallet(
            address,
            api,
            store,
            resolver,
            coordinator,
            scheduler,
            pool,
        ),
    }
}

fn select_wallet(
    address: Address,
    api: &ApiClient,
    store: &SharedStore,
    resolver: &IdentityResolver,
    coordinator: &mut Coordinator,
    scheduler: &mut RefreshScheduler,
    pool: &FetchPool,
) {
    let Some(node_id) = resolver.resolve(api, &address) else {
        let err = status::FetchError::NotFound(format!("node for wallet {address}"));
        ui::warn("resolve", err.to_string());
        clear_selection(coordinator, scheduler);
        pool.supersede(coordinator.generation());
        return;
    };

    // A fresh selection always reaches the network, even inside a cooldown
    // window left over from the previous look at the same node.
    if let Ok(mut store) = store.lock() {
        store.evict_matching(&node_id);
        store.evict_matching(address.as_str());
    }

    ui::success("resolve", format!("wallet {address} is node {node_id}"));
    scheduler.disarm();
    coordinator.select(node_id, address, Instant::now());
}

fn clear_selection(coordinator: &mut Coordinator, scheduler: &mut RefreshScheduler) {
    coordinator.clear();
    scheduler.disarm();
}

fn reload_overview(api: &ApiClient, store: &SharedStore, resolver: &mut IdentityResolver) {
    // The guard stamps at response time, so a stamp sits `latency` past the
    // period boundary and would gate every other scheduled reload. Scheduled
    // reloads are exactly the cadence the window exists to enforce, so open
    // their keys first.
    if let Ok(mut store) = store.lock() {
        store.evict_matching("/lite/nodes/stats");
        store.evict_matching("/lite/nodes/active");
    }

    match api.lite_stats() {
        Ok(stats) => ui::info("network", ui::network_line(&stats.stats)),
        Err(status::FetchError::Cooldown { .. }) => {}
        Err(err) => ui::warn("network", err.to_string()),
    }

    match api.active_nodes() {
        Ok(entries) => {
            ui::info("network", format!("directory loaded, {} nodes", entries.len()));
            resolver.install_directory(entries);
        }
        Err(status::FetchError::Cooldown { .. }) => {}
        Err(err) => ui::warn("network", err.to_string()),
    }

    match api.requirements() {
        Ok(requirements) => ui::info("network", ui::requirements_line(&requirements)),
        Err(err) => ui::warn("network", err.to_string()),
    }
}
