//! End-to-end supervision scenarios against real `sh` workers.
#![cfg(unix)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use rigvisor::{
    ChannelSink, EventKind, HookError, HookFn, Message, MessageKind, RestartPolicy, RuntimeError,
    ShutdownReason, SignalKind, StateRelay, Supervisor, SupervisorConfig, WorkerCommand,
    WorkerSpec, WorkerState,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

const LIMIT: Duration = Duration::from_secs(10);

fn sh(script: &str) -> WorkerCommand {
    WorkerCommand::new("sh").args(["-c", script])
}

fn supervisor(cfg: SupervisorConfig) -> (Arc<Supervisor>, mpsc::Receiver<Message>) {
    let (sink, rx) = ChannelSink::new(1024);
    let sup = Supervisor::builder(cfg).with_sink(Arc::new(sink)).build();
    (sup, rx)
}

async fn within<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(LIMIT, fut).await.expect("scenario timed out")
}

fn kill(pid: u32) {
    let status = std::process::Command::new("kill")
        .arg(pid.to_string())
        .status()
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn killed_worker_is_restarted_after_its_delay() {
    let (sup, _rx) = supervisor(SupervisorConfig::default());
    let spec = WorkerSpec::new("sensor", sh("exec sleep 30")).with_delay(Duration::from_millis(1000));
    let handle = sup.start(spec).await.unwrap();

    let first = within(handle.wait_for(|s| s.state == WorkerState::Running)).await;
    let pid = first.pid.unwrap();
    assert_eq!(first.restarts, 0);

    let killed_at = Instant::now();
    kill(pid);

    let second = within(handle.wait_for(|s| s.state == WorkerState::Running && s.restarts == 1)).await;
    let elapsed = killed_at.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "restarted too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1200), "restarted too late: {elapsed:?}");
    assert_ne!(second.pid, Some(pid));
    assert_eq!(second.restarts, 1);

    sup.stop_all().await.unwrap();
}

#[tokio::test]
async fn no_restart_once_stop_all_completed() {
    let (sup, _rx) = supervisor(SupervisorConfig::default());
    let mut events = sup.bus().subscribe();

    let spec = WorkerSpec::new("gps", sh("exit 3")).with_delay(Duration::from_millis(300));
    let handle = sup.start(spec).await.unwrap();

    // Wait until the restart timer is armed.
    let mut spawned = 0;
    within(async {
        loop {
            let ev = events.recv().await.unwrap();
            match ev.kind {
                EventKind::WorkerSpawned => spawned += 1,
                EventKind::RestartScheduled => break,
                _ => {}
            }
        }
    })
    .await;

    sup.stop_all().await.unwrap();
    assert!(sup.is_terminating());

    tokio::time::sleep(Duration::from_millis(600)).await;
    let status = handle.status();
    assert_eq!(status.state, WorkerState::Stopped);
    assert_eq!(status.restarts, 0);
    assert_eq!(status.last_exit_code, Some(3));

    let mut cancelled = false;
    while let Ok(ev) = events.try_recv() {
        match ev.kind {
            EventKind::WorkerSpawned => spawned += 1,
            EventKind::RestartCancelled => cancelled = true,
            _ => {}
        }
    }
    assert_eq!(spawned, 1);
    assert!(cancelled);
}

#[tokio::test]
async fn messages_arrive_in_output_order() {
    let (sup, mut rx) = supervisor(SupervisorConfig::default());
    let script = r#"i=1; while [ $i -le 50 ]; do echo "{\"i\":$i}"; i=$((i+1)); done"#;
    let spec = WorkerSpec::new("modem", sh(script))
        .with_restart(RestartPolicy::Never)
        .with_exit_notice(true);
    let handle = sup.start(spec).await.unwrap();
    within(handle.stopped()).await;

    let mut payloads = Vec::new();
    let mut seqs = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        assert_eq!(&*msg.worker, "modem");
        seqs.push(msg.seq);
        payloads.push(msg.payload);
    }

    let mut expected: Vec<Value> = (1..=50).map(|i| json!({ "i": i })).collect();
    expected.push(Value::Null);
    assert_eq!(payloads, expected);
    assert_eq!(seqs, (1..=51).collect::<Vec<u64>>());
}

#[tokio::test]
async fn chunked_output_without_newlines_is_decoded() {
    let (sup, mut rx) = supervisor(SupervisorConfig::default());
    let spec = WorkerSpec::new("sensor", sh(r#"printf '{"t":1}{"t":2}'; sleep 0.1; printf '{"t":3}'"#))
        .with_restart(RestartPolicy::Never);
    let handle = sup.start(spec).await.unwrap();
    within(handle.stopped()).await;

    let mut got = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        got.push(msg.payload);
    }
    assert_eq!(got, vec![json!({"t": 1}), json!({"t": 2}), json!({"t": 3})]);
}

#[tokio::test]
async fn concurrent_triggers_tear_down_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let hook = {
        let calls = calls.clone();
        HookFn::arc("release-camera", move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HookError>(())
            }
        })
    };
    let (sink, _rx) = ChannelSink::new(16);
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_sink(Arc::new(sink))
        .with_teardown(hook)
        .build();
    sup.start(WorkerSpec::new("sensor", sh("exec sleep 30"))).await.unwrap();

    let coordinator = Arc::new(sup.coordinator());
    let triggers = (0..8).map(|i| {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let reason = if i % 2 == 0 {
                ShutdownReason::Signal(SignalKind::User1)
            } else {
                ShutdownReason::Signal(SignalKind::User2)
            };
            coordinator.trigger(reason).await
        })
    });
    let outcomes: Vec<_> = within(futures::future::join_all(triggers))
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(outcomes[0].exit_code, 0);
    assert!(coordinator.is_triggered());
}

#[tokio::test]
async fn interrupt_stops_both_workers_with_status_zero() {
    let (sup, _rx) = supervisor(SupervisorConfig::default());
    let sensor = sup.start(WorkerSpec::new("sensor", sh("exec sleep 30"))).await.unwrap();
    let gps = sup.start(WorkerSpec::new("gps", sh("exec sleep 30"))).await.unwrap();
    within(sensor.wait_for(|s| s.state == WorkerState::Running)).await;
    within(gps.wait_for(|s| s.state == WorkerState::Running)).await;

    let outcome = within(
        sup.coordinator()
            .trigger(ShutdownReason::Signal(SignalKind::Interrupt)),
    )
    .await;

    assert_eq!(outcome.exit_code, 0);
    assert!(outcome.stuck.is_empty());
    assert_eq!(sensor.state(), WorkerState::Stopped);
    assert_eq!(gps.state(), WorkerState::Stopped);
    assert_eq!(sensor.pid(), None);
    assert_eq!(sup.list().await, vec!["gps".to_string(), "sensor".to_string()]);
}

#[tokio::test]
async fn reported_fault_exits_with_status_one() {
    let (sup, _rx) = supervisor(SupervisorConfig::default());
    sup.start(WorkerSpec::new("sensor", sh("exec sleep 30"))).await.unwrap();

    let coordinator = sup.coordinator();
    let reporter = coordinator.fault_reporter();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        reporter.report("uplink socket exploded");
    });

    let outcome = within(coordinator.wait()).await;
    assert_eq!(outcome.reason, ShutdownReason::Fault("uplink socket exploded".into()));
    assert_eq!(outcome.exit_code, 1);
}

#[tokio::test]
async fn run_returns_when_every_worker_finished() {
    let (sup, _rx) = supervisor(SupervisorConfig::default());
    let specs = vec![
        WorkerSpec::new("calibrate", sh("exit 0")).with_restart(RestartPolicy::Never),
        WorkerSpec::new("probe", sh("exit 0")).with_restart(RestartPolicy::OnFailure),
    ];

    let outcome = within(sup.run(specs)).await;
    assert_eq!(outcome.reason, ShutdownReason::WorkersFinished);
    assert_eq!(outcome.exit_code, 0);
}

#[tokio::test]
async fn start_rejects_duplicates_and_refuses_after_shutdown() {
    let (sup, _rx) = supervisor(SupervisorConfig::default());
    sup.start(WorkerSpec::new("sensor", sh("exec sleep 30"))).await.unwrap();

    let dup = sup.start(WorkerSpec::new("sensor", sh("exec sleep 30"))).await;
    assert!(matches!(dup, Err(RuntimeError::DuplicateWorker { .. })));

    sup.stop_all().await.unwrap();
    sup.stop_all().await.unwrap();

    let late = sup.start(WorkerSpec::new("gps", sh("exec sleep 30"))).await;
    assert!(matches!(late, Err(RuntimeError::Terminating { .. })));
}

#[tokio::test]
async fn stopped_worker_name_can_be_reused() {
    let (sup, _rx) = supervisor(SupervisorConfig::default());
    let first = sup
        .start(WorkerSpec::new("webrtc", sh("exit 0")).with_restart(RestartPolicy::Never))
        .await
        .unwrap();
    within(first.stopped()).await;
    // The actor task may still be unwinding right after the status flips.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = sup.start(WorkerSpec::new("webrtc", sh("exec sleep 30"))).await.unwrap();
    within(second.wait_for(|s| s.state == WorkerState::Running)).await;
    sup.stop_all().await.unwrap();
}

#[tokio::test]
async fn exit_hook_completes_before_stop_all_returns() {
    let done = Arc::new(AtomicUsize::new(0));
    let hook = {
        let done = done.clone();
        HookFn::arc("gps-radio-off", move || {
            let done = done.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HookError>(())
            }
        })
    };
    let (sup, _rx) = supervisor(SupervisorConfig::default());
    let handle = sup
        .start(WorkerSpec::new("gps", sh("exec sleep 30")).with_exit_hook(hook))
        .await
        .unwrap();
    within(handle.wait_for(|s| s.state == WorkerState::Running)).await;

    let stopping = {
        let sup = Arc::clone(&sup);
        tokio::spawn(async move { sup.stop_all().await })
    };
    let during_hook = within(handle.wait_for(|s| s.state != WorkerState::Running)).await;
    assert_eq!(during_hook.state, WorkerState::Exited);
    assert_eq!(during_hook.pid, None);
    assert!(!handle.is_running());

    within(stopping).await.unwrap().unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert_eq!(handle.state(), WorkerState::Stopped);
}

#[tokio::test]
async fn stuck_teardown_exceeds_grace() {
    let hook = HookFn::arc("hangs", || async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok::<(), HookError>(())
    });
    let cfg = SupervisorConfig {
        grace: Duration::from_millis(200),
        hook_timeout: Duration::ZERO,
        ..SupervisorConfig::default()
    };
    let (sup, _rx) = supervisor(cfg);
    let handle = sup
        .start(WorkerSpec::new("gps", sh("exec sleep 30")).with_exit_hook(hook))
        .await
        .unwrap();
    within(handle.wait_for(|s| s.state == WorkerState::Running)).await;

    let outcome = within(sup.coordinator().trigger(ShutdownReason::Requested)).await;
    assert_eq!(outcome.stuck, vec!["gps".to_string()]);
    assert_eq!(outcome.exit_code, 1);

    let status = handle.status();
    assert_eq!(status.state, WorkerState::Stopped);
    assert_eq!(status.pid, None);
    assert!(!handle.is_running());
}

#[tokio::test]
async fn repeated_spawn_failures_give_up_when_capped() {
    let cfg = SupervisorConfig {
        spawn_failure_limit: 3,
        ..SupervisorConfig::default()
    };
    let (sup, _rx) = supervisor(cfg);
    let mut events = sup.bus().subscribe();
    let spec = WorkerSpec::new("ghost", WorkerCommand::new("/nonexistent/rig-worker"))
        .with_delay(Duration::from_millis(10));
    let handle = sup.start(spec).await.unwrap();

    let last = within(handle.stopped()).await;
    assert_eq!(last.restarts, 2);

    let mut spawn_failed = 0;
    let mut gave_up = false;
    while let Ok(ev) = events.try_recv() {
        match ev.kind {
            EventKind::SpawnFailed => spawn_failed += 1,
            EventKind::WorkerGaveUp => gave_up = true,
            _ => {}
        }
    }
    assert_eq!(spawn_failed, 3);
    assert!(gave_up);
}

#[tokio::test]
async fn state_table_reaches_the_sink() {
    let (sink, mut rx) = ChannelSink::new(1024);
    let sink: rigvisor::SinkRef = Arc::new(sink);
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_sink(Arc::clone(&sink))
        .with_subscriber(Arc::new(StateRelay::new(sink)))
        .build();

    let spec = WorkerSpec::new("mpu6050", sh(r#"sleep 0.2; echo '{"ax":0.1}'; sleep 0.2"#))
        .with_restart(RestartPolicy::Never);
    let handle = sup.start(spec).await.unwrap();
    within(handle.stopped()).await;

    let mut tables = Vec::new();
    within(async {
        while let Some(msg) = rx.recv().await {
            if msg.kind != MessageKind::State {
                continue;
            }
            let done = msg.payload == json!({"mpu6050": false}) && !tables.is_empty();
            tables.push(msg.payload);
            if done {
                break;
            }
        }
    })
    .await;

    assert_eq!(
        tables,
        vec![
            json!({"mpu6050": false}),
            json!({"mpu6050": true}),
            json!({"mpu6050": false}),
        ]
    );
}
