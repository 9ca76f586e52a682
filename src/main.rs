use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

mod api;
mod config;
mod rpc;
mod types;
mod watch;

use api::ApiClient;
use config::{Cli, Config};
use rpc::RpcClient;
use watch::cache::ResponseStore;

fn main() -> Result<()> {
    let config = Config::from_cli(Cli::parse())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("failed to install ctrl-c handler")?;
    }

    let store = ResponseStore::shared(config.cooldown_window);
    let api = ApiClient::new(
        config.api_url.clone(),
        config.request_timeout,
        Arc::clone(&store),
    )?;
    let rpc = RpcClient::new(
        config.rpc_url.clone(),
        config.price_url.clone(),
        config.request_timeout,
    )?;

    // Stdin is the address input: one line per edit, an empty line clears
    // the selection. The reader thread ends with stdin; the driver keeps
    // running on its timers.
    let (input_tx, input_rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if input_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader")?;

    watch::run(&config, api, rpc, store, shutdown, input_rx)
}
