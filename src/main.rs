use clap::{Parser, Subcommand};
use screen_relay::config::{self, Config};
use screen_relay::protocol::FsArtifactStore;
use screen_relay::{supervisor, worker};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "screen-relay",
    about = "Watches a desktop window region, OCRs it, and relays new text to a webhook"
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the capture worker loop in the foreground
    Watch {
        /// Run exactly one cycle, save a screenshot, then exit
        #[arg(long)]
        once: bool,
    },
    /// Spawn a detached worker process
    Start,
    /// Request a graceful worker shutdown via the stop signal
    Stop,
    /// Report worker liveness and the latest recognized text
    Status,
}

fn main() -> ExitCode {
    env_logger::init();
    config::load_env_file();

    let cli = Cli::parse();

    let mut cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = FsArtifactStore::from_config(&cfg);

    let result = match cli.command {
        Cmd::Watch { once } => {
            if once {
                cfg.single_shot = true;
            }
            log::info!("Starting OCR loop (poll {}s)", cfg.poll_sec);
            worker::run(&cfg, &store).map_err(|e| e.to_string())
        }
        Cmd::Start => supervisor::start(&cfg, &store)
            .map(|pid| println!("Started worker (pid {})", pid))
            .map_err(|e| e.to_string()),
        Cmd::Stop => supervisor::stop(&store)
            .map(|()| println!("Stop requested"))
            .map_err(|e| e.to_string()),
        Cmd::Status => {
            let report = supervisor::status(&cfg, &store);
            print_status(&report);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_status(report: &supervisor::StatusReport) {
    println!(
        "Status: {}",
        if report.running { "running" } else { "not running" }
    );
    if let Some(age) = report.heartbeat_age_secs {
        println!("Last heartbeat: {}s ago", age);
    }
    if let Some(pid) = report.pid {
        println!("Worker pid: {}", pid);
    }
    if let Some(text) = &report.last_text {
        if !text.is_empty() {
            println!("Latest text:\n{}", text);
        }
    }
}
