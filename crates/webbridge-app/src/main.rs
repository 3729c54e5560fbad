// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// webbridge demo host.
//
// Drives a bridge channel against the stub web view with a scripted page:
// fire-and-forget and callback-bearing sends, a named script handler, a
// timeout, a cancellation, a page-initiated request and the lifecycle from
// create to destroy.
//
// Usage: webbridge [CONFIG.json]

mod page;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use webbridge_channel::{
    BridgeChannel, CallOptions, CallTimeout, LifecycleForwarder, Responder, TokioExecutor,
    spawn_timeout_sweeper,
};
use webbridge_core::config::BridgeConfig;
use webbridge_core::error::Result;
use webbridge_core::types::LifecycleEvent;
use webbridge_host::StubHost;

use page::SimulatedPage;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("webbridge starting");

    if let Err(e) = run().await {
        error!(error = %e, "webbridge demo failed");
        std::process::exit(1);
    }
}

fn load_config() -> Result<BridgeConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "loading bridge config");
            BridgeConfig::load(&path)
        }
        None => Ok(BridgeConfig::default()),
    }
}

async fn run() -> Result<()> {
    let config = load_config()?;
    let host = Arc::new(StubHost::new(config.js_namespace.clone()));
    let executor = TokioExecutor::new(tokio::runtime::Handle::current());
    let channel = Arc::new(
        BridgeChannel::new(host.clone(), config.clone())?.with_executor(Arc::new(executor)),
    );
    let sweeper = spawn_timeout_sweeper(&channel, config.sweep_interval());
    let lifecycle = LifecycleForwarder::new(Arc::clone(&channel));
    let mut page = SimulatedPage::new(host, Arc::clone(&channel));

    for event in [LifecycleEvent::Create, LifecycleEvent::Start, LifecycleEvent::Resume] {
        lifecycle.notify(event)?;
    }

    channel.register_handler("getDeviceInfo", |_data: String, responder: Responder| {
        let info = serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "bridge": env!("CARGO_PKG_VERSION"),
        });
        if let Err(e) = responder.respond(&info.to_string()) {
            warn!(error = %e, "could not answer getDeviceInfo");
        }
    })?;

    // Native -> page.
    channel.send("hello from native")?;
    let ping = channel.request("ping")?;
    let score = channel.request_with_options("", CallOptions::handler("getScore"))?;
    let silent = channel.request_with_options(
        "nobody answers",
        CallOptions::default().with_timeout(CallTimeout::After(Duration::from_millis(200))),
    )?;
    let abandoned = channel.request("abandon me")?;

    let in_flight = serde_json::to_string_pretty(&channel.pending_calls())?;
    info!(pending = channel.pending_count(), "calls in flight:\n{in_flight}");

    page.pump()?;
    channel.cancel(abandoned.id())?;

    for (label, reply) in [
        ("ping", ping),
        ("getScore", score),
        ("abandoned call", abandoned),
        ("silent call", silent),
    ] {
        let outcome = reply.recv().await;
        info!(?outcome, "{label}");
    }

    // Page -> native.
    let outcomes = page.call_native("getDeviceInfo", "")?;
    info!(?outcomes, "page request routed");
    tokio::time::sleep(Duration::from_millis(10)).await;
    for reply in page.pump()? {
        info!(
            response_id = ?reply.response_id,
            data = ?reply.response_data,
            "page received native reply"
        );
    }

    let leftover = channel.request("never answered")?;
    for event in [LifecycleEvent::Pause, LifecycleEvent::Stop, LifecycleEvent::Destroy] {
        lifecycle.notify(event)?;
    }
    let outcome = leftover.recv().await;
    info!(?outcome, "call pending at destroy");

    if let Err(e) = sweeper.await {
        warn!(error = %e, "timeout sweeper task failed");
    }
    info!(closed = channel.is_closed(), "webbridge finished");
    Ok(())
}
