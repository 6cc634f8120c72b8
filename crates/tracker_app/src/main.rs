mod cli;
mod config;
mod logging;
mod render;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracker_core::{JobKind, JobStatus, JobView};
use tracker_engine::JobTracker;
use tracker_logging::{tracker_error, tracker_info, tracker_warn};

use crate::cli::Args;
use crate::config::FileConfig;

const EXIT_JOB_FAILED: u8 = 1;
const EXIT_START_FAILED: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::initialize(args.log, args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            tracker_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_START_FAILED)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let file = match args.config.as_deref() {
        Some(path) => config::load(path)?,
        None => FileConfig::default(),
    };
    let run = config::resolve(&args, file);
    let mut tracker = JobTracker::connect(run.settings).context("invalid tracker settings")?;

    let job_id = match tracker.start(run.request).await {
        Ok(job_id) => job_id,
        Err(err) => {
            eprintln!("could not start job: {err}");
            return Ok(ExitCode::from(EXIT_START_FAILED));
        }
    };
    println!("tracking job {job_id}");

    let mut views = tracker
        .subscribe()
        .context("tracker has no session after start")?;
    let mut previous: Option<JobView> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let view = views.borrow_and_update().clone();
        print_changes(previous.as_ref(), &view);
        if view.job.status.is_terminal() {
            break;
        }
        previous = Some(view);

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                eprintln!("interrupted, cancelling job {job_id}");
                if let Err(err) = tracker.cancel_remote().await {
                    tracker_warn!(job = job_id; "cancel request failed: {}", err);
                }
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        }
    }

    let outcome = tracker.wait_terminal().await;
    tracker.stop();
    Ok(exit_code_for(outcome.as_ref()))
}

fn print_changes(previous: Option<&JobView>, view: &JobView) {
    if previous == Some(view) {
        return;
    }
    println!("{}", render::status_line(view));
    if view.job.kind == JobKind::Playlist {
        for item in render::changed_items(previous, view) {
            println!("{}", render::item_line(item));
        }
    }
}

fn exit_code_for(view: Option<&JobView>) -> ExitCode {
    match view.map(|view| view.job.status) {
        Some(JobStatus::Completed) => {
            tracker_info!("job completed");
            ExitCode::SUCCESS
        }
        Some(status) => {
            tracker_info!("job ended as {:?}", status);
            ExitCode::from(EXIT_JOB_FAILED)
        }
        None => ExitCode::from(EXIT_JOB_FAILED),
    }
}
