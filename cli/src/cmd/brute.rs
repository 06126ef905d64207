use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize as _;
use cpjudge_core::judge::BruteForceOutcome;
use cpjudge_core::testing::Recompile;
use cpjudge_core::StopMode;

use crate::{observer::TerminalObserver, print_success, style, util};

use super::{GlobalArgs, SubcmdResult};

/// Looks for an input on which the program disagrees with a brute-force solution
#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Program printing one random input to stdout
    #[arg(long, requires = "reference")]
    pub generator: Option<PathBuf>,

    /// Trusted solution whose output is taken as the answer
    #[arg(long, requires = "generator")]
    pub reference: Option<PathBuf>,

    /// Forget the saved generator and brute-force solution
    #[arg(long, conflicts_with_all = ["generator", "reference", "rounds"])]
    pub unset: bool,

    /// Stop after N rounds (default: until a difference is found or Ctrl-C)
    #[arg(short = 'n', long)]
    pub rounds: Option<u64>,

    /// Recompile even if the cached binaries are up to date
    #[arg(short, long)]
    pub force: bool,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    super::load_problem(&session, &program_file)?;

    if args.unset {
        anyhow::ensure!(session.clear_brute_force(), "Failed to clear brute-force sources");
        print_success!("{}", "Brute-force sources removed");
        return Ok(());
    }
    if let (Some(generator), Some(reference)) = (&args.generator, &args.reference) {
        let generator = util::program_file(generator)?;
        let reference = util::program_file(reference)?;
        anyhow::ensure!(
            session.set_brute_force(generator, reference),
            "Failed to set brute-force sources"
        );
    }

    let recompile = if args.force {
        Recompile::Always
    } else {
        Recompile::Auto
    };
    let run = session.run_brute_force(recompile, args.rounds);
    tokio::pin!(run);

    let finished = tokio::select! {
        outcome = &mut run => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    let outcome = match finished {
        Some(outcome) => outcome,
        None => {
            eprintln!("{}", "Stopping...".bright_yellow());
            session.stop(StopMode::All);
            run.await
        }
    };

    match outcome {
        BruteForceOutcome::Found { id, .. } => {
            let problem = session.problem();
            let found = problem.as_ref().and_then(|p| Some((p.index_of(id)?, p.case(id)?)));
            if let Some((index, tc)) = found {
                style::print_test_result_detail(index + 1, tc);
            }
            Ok(())
        }
        BruteForceOutcome::NoDifference { .. } => Ok(()),
        // already reported through the observer
        BruteForceOutcome::Failed { .. } => anyhow::bail!("Brute-force run failed"),
    }
}
