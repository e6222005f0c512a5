use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rigvisor::{
    DedupSink, JsonLinesSink, LogSink, LogWriter, RigFile, Settings, SinkRef, StateRelay,
    Supervisor, SupervisorConfig, init_tracing,
};

#[derive(Parser)]
#[command(name = "rigvisor")]
#[command(about = "Supervise the workers of an in-car streaming rig", long_about = None)]
struct Cli {
    /// Rig file (JSON) listing workers and teardown commands.
    #[arg(long)]
    rig: PathBuf,

    /// Where worker messages go.
    #[arg(long, value_enum, default_value_t = SinkKind::Stdout)]
    sink: SinkKind,

    /// Forward a message only when it differs from the worker's previous one.
    #[arg(long)]
    dedupe: bool,

    /// Do not send the worker online/offline table to the sink.
    #[arg(long)]
    no_state: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SinkKind {
    /// One JSON line per message on stdout.
    Stdout,
    /// Messages are logged.
    Log,
}

fn build_sink(kind: SinkKind, dedupe: bool) -> SinkRef {
    match (kind, dedupe) {
        (SinkKind::Stdout, false) => Arc::new(JsonLinesSink::stdout()),
        (SinkKind::Stdout, true) => Arc::new(DedupSink::new(JsonLinesSink::stdout())),
        (SinkKind::Log, false) => Arc::new(LogSink),
        (SinkKind::Log, true) => Arc::new(DedupSink::new(LogSink)),
    }
}

async fn run(cli: Cli, settings: Settings) -> anyhow::Result<i32> {
    let rig = RigFile::load(&cli.rig).with_context(|| format!("loading {}", cli.rig.display()))?;

    let mut cfg = SupervisorConfig::default();
    rig.apply(&mut cfg);

    let env = settings.worker_env();
    let specs = rig.worker_specs(&cfg, &env);

    let sink = build_sink(cli.sink, cli.dedupe);
    let mut builder = rig
        .teardown_hooks(&env)
        .into_iter()
        .fold(Supervisor::builder(cfg), |b, hook| b.with_teardown(hook))
        .with_sink(Arc::clone(&sink))
        .with_subscriber(Arc::new(LogWriter::new()));
    if !cli.no_state {
        builder = builder.with_subscriber(Arc::new(StateRelay::new(sink)));
    }
    let sup = builder.build();

    let coordinator = sup.coordinator();
    coordinator.install_panic_hook();

    tracing::info!(workers = specs.len(), rig = %cli.rig.display(), "rig starting");
    let outcome = sup.run_with(&coordinator, specs).await;
    if !outcome.stuck.is_empty() {
        tracing::error!(stuck = ?outcome.stuck, "some workers had to be aborted");
    }
    Ok(outcome.exit_code)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = Settings::from_env();
    init_tracing(settings.as_ref().ok().and_then(|s| s.log_level.as_deref()));

    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid environment");
            std::process::exit(1);
        }
    };

    let code = match run(cli, settings).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            1
        }
    };
    std::process::exit(code);
}
