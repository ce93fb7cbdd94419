//! Stale runner eviction.

use pack_gateway::{Gateway, GatewayConfig, gateway::sweep};
use protocol::{ClientMessage, ServerMessage};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::{broadcast, mpsc::UnboundedReceiver};

fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn join(gateway: &Gateway, conn: &str, name: &str) {
    gateway.dispatch(
        conn,
        ClientMessage::JoinRun {
            run_id: "r1".into(),
            runner_name: name.into(),
        },
    );
}

#[test]
fn sweep_announces_and_unbinds_idle_runner() {
    let gateway = Gateway::new(&GatewayConfig::default());
    let (idle, mut rx_idle) = gateway.connect();
    join(&gateway, &idle, "Ana");
    std::thread::sleep(Duration::from_millis(60));
    let (fresh, mut rx_fresh) = gateway.connect();
    join(&gateway, &fresh, "Ben");
    drain(&mut rx_idle);
    drain(&mut rx_fresh);

    assert_eq!(gateway.sweep_stale(Duration::from_millis(30)), 1);

    let left = ServerMessage::RunnerLeft {
        runner_id: idle.clone(),
        runner_name: "Ana".into(),
        total_runners: 1,
    };
    assert_eq!(drain(&mut rx_fresh), vec![left.clone()]);
    assert_eq!(drain(&mut rx_idle), vec![left]);
    assert!(gateway.lifecycle.bound_run(&idle).is_none());
    assert_eq!(gateway.hub.members("r1"), vec![fresh.clone()]);

    // Updates from the evicted connection no longer reach the run.
    gateway.dispatch(
        &idle,
        ClientMessage::UpdatePosition {
            latitude: 1.0,
            longitude: 1.0,
            speed: None,
        },
    );
    assert!(drain(&mut rx_fresh).is_empty());
    assert_eq!(gateway.registry.with_session("r1", |s| s.len()), Some(1));
}

#[test]
fn sweep_with_nothing_idle_is_quiet() {
    let gateway = Gateway::new(&GatewayConfig::default());
    let (conn, mut rx) = gateway.connect();
    join(&gateway, &conn, "Ana");
    drain(&mut rx);

    assert_eq!(gateway.sweep_stale(Duration::from_secs(3600)), 0);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn rejoin_during_sweeps_keeps_binding_with_record() {
    let gateway = Gateway::new(&GatewayConfig::default());
    let (conn, _rx) = gateway.connect();
    let done = Arc::new(AtomicBool::new(false));

    let sweeper = {
        let gateway = gateway.clone();
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                gateway.sweep_stale(Duration::ZERO);
            }
        })
    };

    for _ in 0..2000 {
        join(&gateway, &conn, "Ana");
        // Only this thread joins, so once the binding is gone the record
        // must be gone as well.
        if gateway.lifecycle.bound_run(&conn).is_none() {
            let present = gateway.registry.with_session("r1", |s| s.contains(&conn));
            assert_ne!(present, Some(true), "record left without a binding");
        }
    }

    done.store(true, Ordering::Relaxed);
    sweeper.join().unwrap();

    let present = gateway
        .registry
        .with_session("r1", |s| s.contains(&conn))
        .unwrap_or(false);
    assert_eq!(gateway.lifecycle.bound_run(&conn).is_some(), present);
    assert_eq!(gateway.hub.members("r1").contains(&conn), present);
}

#[tokio::test]
async fn sweeper_task_evicts_and_stops_on_shutdown() {
    let gateway = Gateway::new(&GatewayConfig::default());
    let (conn, _rx) = gateway.connect();
    join(&gateway, &conn, "Ana");

    let (tx, rx) = broadcast::channel(1);
    let task = sweep::start(
        gateway.clone(),
        Duration::from_millis(10),
        Duration::from_millis(20),
        rx,
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(gateway.registry.is_empty());

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}
