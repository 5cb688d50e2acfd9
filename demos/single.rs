//! # Demo: single supervised process
//!
//! Supervises one child process whose readiness is signaled by a marker in
//! its output.
//!
//! Shows how to:
//! - Build a [`ProcessSpec`] with a readiness marker and deadline
//! - Invoke it through the [`Supervisor`]
//! - Observe lifecycle events with the built-in [`LogWriter`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Supervisor::new(cfg, [LogWriter])
//!   ├─► ProcessSpec "api": sh -c "echo API started; exec sleep 30"
//!   │       marker = "started", deadline from Config (5s)
//!   └─► sup.run(runner)
//!         ├─► [starting] … [spawning] … [ready] … [started]
//!         ├─► Ctrl-C ─► signal forwarded to the child
//!         └─► child exits ─► run returns Ok(())
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example single --features logging
//! ```

use std::sync::Arc;

use procvisor::{Config, LogWriter, ProcessRunner, ProcessSpec, RunnerRef, Subscribe, Supervisor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== single example (press Ctrl-C to stop) ===\n");

    let cfg = Config::default();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let sup = Supervisor::new(cfg.clone(), subs);

    let spec = ProcessSpec::new("api", "sh")
        .with_args(["-c", "echo API started; exec sleep 30"])
        .with_start_marker("started")
        .with_defaults(&cfg);
    let runner: RunnerRef = Arc::new(ProcessRunner::new(spec, sup.bus()));

    // A terminal failure is fatal for the whole program; supervision is
    // never retried here — restart the supervisor externally.
    if let Err(e) = sup.run(runner).await {
        eprintln!("supervision failed: {e}");
        std::process::exit(1);
    }
    Ok(())
}
