use anyhow::Context;
use clap::Parser;
use sst::sst_config::TrackerConfig;
use sst::sst_controllers::{SSTControllers, Tracker};
use sst::sst_requester::Requester;
use sst::sst_views::{MemoryScreen, TerminalScreen};

fn main() -> anyhow::Result<()> {
    // Set up panic hook for better error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n{}", "═".repeat(60));
        eprintln!("❌ APPLICATION PANIC");
        eprintln!("{}", "═".repeat(60));
        eprintln!("\n{}", panic_info);
        eprintln!("\n💡 Run again with RUST_LOG=debug for details");
        eprintln!("{}", "═".repeat(60));
    }));

    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = TrackerConfig::parse();
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        if config.once {
            run_once(config).await
        } else {
            SSTControllers::run(config).await.map_err(Into::into)
        }
    })
}

/// Search the configured line once, printing either the terminal view or JSON.
async fn run_once(config: TrackerConfig) -> anyhow::Result<()> {
    let requester = Requester::new(&config)?;
    let line = config
        .initial_line()
        .context("--once needs a line (--line or SUBWAY_LINE)")?;

    if config.json {
        let tracker = Tracker::new(requester, MemoryScreen::default(), Some(line.clone()));
        tracker.search(&line).await;

        let screen = tracker.screen();
        let output = serde_json::json!({
            "line": line,
            "status": screen.status(),
            "status_class": screen.status().map(|status| status.class_name()),
            "trains": screen.list(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let tracker = Tracker::new(requester, TerminalScreen, Some(line.clone()));
        tracker.search(&line).await;
    }

    Ok(())
}
