//! Property-based tests for telemetry bounds, counter monotonicity, and
//! store reset determinism.

mod common;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use storage_console_sim::router::dispatch::SimRequest;
use storage_console_sim::telemetry::walk::{
    CounterRange, WalkBounds, bounded_walk, counter_increment,
};

// ──────────────────── strategies ────────────────────

fn arb_bounds() -> impl Strategy<Value = WalkBounds> {
    (-1_000.0f64..1_000.0, 0.0f64..500.0, 0.0f64..50.0, 0u32..=4).prop_map(
        |(min, width, step, precision)| WalkBounds::new(min, min + width, step, precision),
    )
}

/// Mutating requests a UI could plausibly send, valid or not.
fn arb_request() -> impl Strategy<Value = SimRequest> {
    let names = prop::sample::select(vec!["tank", "backup", "tank2", "alice", "data", "smbd"]);
    (0u8..10, names).prop_map(|(kind, name)| match kind {
        0 => SimRequest::post(
            "/api/zpool/create/",
            json!({"pool_name": name, "vdev_type": "stripe", "devices": ["sdz"]}),
        ),
        1 => SimRequest::delete("/api/zpool/delete/", json!({"pool_name": name})),
        2 => SimRequest::post(
            "/api/volume/create/",
            json!({"volume_name": format!("{name}/v"), "volsize": "5G"}),
        ),
        3 => SimRequest::delete("/api/volume/delete/", json!({"volume_name": format!("tank/{name}")})),
        4 => SimRequest::post("/api/os/user/create/", json!({"username": name})),
        5 => SimRequest::delete("/api/os/user/delete/", json!({"username": name})),
        6 => SimRequest::post("/api/service/", json!({"service": name, "action": "stop"})),
        7 => SimRequest::delete("/api/samba/config/remove/", json!({"share_name": name})),
        8 => SimRequest::get("/api/disk/"),
        _ => SimRequest::get("/api/net/"),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any walk that starts inside the bounds never leaves them.
    #[test]
    fn bounded_walk_stays_in_range(
        bounds in arb_bounds(),
        start_frac in 0.0f64..=1.0,
        seed in any::<u64>(),
        steps in 1usize..200,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut value = bounds.min + (bounds.max - bounds.min) * start_frac;
        for _ in 0..steps {
            let next = bounded_walk(value, &bounds, &mut rng);
            prop_assert!(next >= bounds.min && next <= bounds.max, "{next} escaped {bounds:?}");
            value = next;
        }
    }

    /// Counters only ever grow.
    #[test]
    fn counters_are_monotonic(
        start in 0u64..u64::MAX / 2,
        min_delta in 0.0f64..1_000.0,
        extra in 0.0f64..1_000.0,
        seed in any::<u64>(),
    ) {
        let range = CounterRange::new(min_delta, min_delta + extra);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut value = start;
        for _ in 0..50 {
            let next = counter_increment(value, &range, &mut rng);
            prop_assert!(next >= value);
            value = next;
        }
    }

    /// Whatever happened before, reset restores the baseline exactly.
    #[test]
    fn reset_is_deterministic(requests in prop::collection::vec(arb_request(), 0..25)) {
        let sim = common::simulator();
        let baseline = sim.store().baseline().clone();
        for request in &requests {
            let _ = sim.dispatch(request);
        }
        sim.reset();
        prop_assert_eq!(sim.snapshot(), baseline);
    }

    /// Disk IO counters reported by the API never decrease between calls.
    #[test]
    fn disk_counters_never_decrease(calls in 2usize..12) {
        let sim = common::simulator();
        let mut previous: Option<Value> = None;
        for _ in 0..calls {
            let body = common::get(&sim, "/api/disk/").unwrap().body;
            if let Some(prev) = &previous {
                for (before, after) in prev["data"].as_array().unwrap().iter()
                    .zip(body["data"].as_array().unwrap())
                {
                    for key in ["read_bytes", "write_bytes", "read_count", "busy_time"] {
                        prop_assert!(after["io"][key].as_u64() >= before["io"][key].as_u64());
                    }
                }
            }
            previous = Some(body);
        }
    }
}
