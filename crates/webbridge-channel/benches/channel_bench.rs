// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bridge channel: envelope encoding, single
// round trips and bursts of out-of-order responses against the stub host.

use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use webbridge_channel::BridgeChannel;
use webbridge_core::config::BridgeConfig;
use webbridge_core::envelope::{self, Envelope};
use webbridge_core::types::CallId;
use webbridge_host::StubHost;

const NS: &str = "WebViewJavascriptBridge";

fn setup() -> (Arc<StubHost>, BridgeChannel) {
    let host = Arc::new(StubHost::new(NS));
    let channel = BridgeChannel::new(host.clone(), BridgeConfig::default())
        .expect("default config is valid");
    (host, channel)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Encode a 4 KiB request into a dispatch script and parse it back.
fn bench_dispatch_script(c: &mut Criterion) {
    let payload = "x".repeat(4 * 1024);
    let env = Envelope::request(&payload, Some(CallId(42)), Some("getScore"));

    c.bench_function("dispatch_script (4 KiB)", |b| {
        b.iter(|| {
            let script = envelope::dispatch_script(NS, black_box(&env)).expect("encode");
            let back = envelope::parse_dispatch_script(NS, &script).expect("decode");
            black_box(back);
        });
    });
}

/// One callback-bearing send answered by the page.
fn bench_round_trip(c: &mut Criterion) {
    let (host, channel) = setup();

    c.bench_function("send_with_callback + response", |b| {
        b.iter(|| {
            let id = channel
                .send_with_callback(black_box("ping"), |outcome| {
                    let _ = black_box(outcome);
                })
                .expect("send");
            let reply = Envelope::reply(&id.to_wire(), "pong")
                .to_json()
                .expect("encode reply");
            channel.handle_inbound(&reply).expect("route reply");
        });
        host.take_envelopes().expect("drain");
    });
}

/// 100 outstanding calls answered newest first.
fn bench_reverse_burst(c: &mut Criterion) {
    c.bench_function("100 calls, reverse-order responses", |b| {
        b.iter_batched(
            setup,
            |(_host, channel)| {
                let ids: Vec<CallId> = (0..100)
                    .map(|i| {
                        channel
                            .send_with_callback(&format!("msg-{i}"), |outcome| {
                                let _ = black_box(outcome);
                            })
                            .expect("send")
                    })
                    .collect();
                for id in ids.iter().rev() {
                    let reply = Envelope::reply(&id.to_wire(), "ok")
                        .to_json()
                        .expect("encode reply");
                    channel.handle_inbound(&reply).expect("route reply");
                }
                assert_eq!(channel.pending_count(), 0);
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_dispatch_script, bench_round_trip, bench_reverse_burst);
criterion_main!(benches);
