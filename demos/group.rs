//! # Demo: supervised runner group
//!
//! Supervises two cooperating processes as one logical unit: a "debug"
//! sidecar that is ready immediately, and an "api" server that is ready once
//! it prints its startup marker.
//!
//! Shows how to:
//! - Compose named [`Member`]s into a [`RunnerGroup`]
//! - Become ready only when **all** members are ready
//! - Fan a termination signal out to every member on Ctrl-C
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Supervisor::new(cfg, [LogWriter])
//!   ├─► group "unit":
//!   │     ├─ "debug": sh -c "exec sleep 600"                (marker "", ready now)
//!   │     └─ "api":   sh -c "…; echo started; sleep…"  (marker "started")
//!   ├─► sup.run(group)
//!   │     ├─► group ready exactly when "api" prints "started"
//!   │     ├─► Ctrl-C ─► same signal delivered to BOTH members
//!   │     └─► returns Ok(()) once both exit
//!   └─► non-zero exit on terminal failure
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example group --features logging
//! ```

use std::sync::Arc;

use procvisor::{
    Config, LogWriter, Member, ProcessRunner, ProcessSpec, RunnerGroup, RunnerRef, Subscribe,
    Supervisor,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== group example (press Ctrl-C to stop) ===\n");

    let cfg = Config::default();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let sup = Supervisor::new(cfg.clone(), subs);
    let bus = sup.bus();

    let debug = ProcessSpec::new("debug", "sh").with_args(["-c", "exec sleep 600"]);
    let api = ProcessSpec::new("api", "sh")
        .with_args(["-c", "sleep 1; echo API started; exec sleep 600"])
        .with_start_marker("started")
        .with_defaults(&cfg);

    let unit = RunnerGroup::new(
        "unit",
        vec![
            Member::new("debug", Arc::new(ProcessRunner::new(debug, bus.clone())) as _),
            Member::new("api", Arc::new(ProcessRunner::new(api, bus.clone())) as _),
        ],
        bus,
    );

    if let Err(e) = sup.run(Arc::new(unit) as RunnerRef).await {
        eprintln!("supervision failed: {e}");
        std::process::exit(1);
    }
    Ok(())
}
