use std::path::PathBuf;
use std::sync::Arc;

use cpjudge_core::judge::ProblemDetails;
use url::Url;

use crate::{observer::TerminalObserver, print_success, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    #[arg(short, long)]
    pub name: Option<String>,

    #[arg(short, long)]
    pub url: Option<Url>,

    /// Time limit in milliseconds
    #[arg(short, long)]
    pub time_limit: Option<u64>,

    /// Memory limit in megabytes
    #[arg(short, long)]
    pub memory_limit: Option<u64>,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    session.create_problem(&program_file)?;

    let problem = session
        .problem()
        .ok_or_else(|| anyhow::anyhow!("Failed to open problem"))?;
    let mut details = ProblemDetails::of(&problem);
    let before = details.clone();
    if let Some(name) = &args.name {
        details.name = name.clone();
    }
    if let Some(url) = &args.url {
        details.url = Some(url.clone());
    }
    if let Some(ms) = args.time_limit {
        anyhow::ensure!(ms > 0, "Time limit must be positive");
        details.time_limit_ms = ms;
    }
    if let Some(mb) = args.memory_limit {
        details.memory_limit_mb = mb;
    }
    if details != before {
        session.edit_details(details.clone());
    }

    print_success!(
        "Problem '{}' is ready: {} test case(s), {}ms, {}MB",
        details.name,
        problem.len(),
        details.time_limit_ms,
        details.memory_limit_mb,
    );
    Ok(())
}
