pub mod add;
pub mod brute;
pub mod case;
pub mod checker;
pub mod clear;
pub mod delete;
pub mod init;
pub mod interactor;
pub mod list;
pub mod new;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use cpjudge_core::storage::FileStore;
use cpjudge_core::{Config, Observer, Problem, Session};

use crate::util;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Config file to use instead of the nearest `cpjudge.toml`
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::Args),
    New(new::Args),

    #[command(alias("a"))]
    Add(add::Args),

    #[command(alias("ls"))]
    List(list::Args),

    #[command(alias("r"))]
    Run(run::Args),

    Case(case::Args),
    Checker(checker::Args),
    Interactor(interactor::Args),

    #[command(alias("bf"))]
    Brute(brute::Args),
    Clear(clear::Args),
    Delete(delete::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Init(args) => init::exec(args, self),
            New(args) => new::exec(args, self),
            Add(args) => add::exec(args, self),
            List(args) => list::exec(args, self),
            Run(args) => run::exec(args, self).await,
            Case(args) => case::exec(args, self).await,
            Checker(args) => checker::exec(args, self),
            Interactor(args) => interactor::exec(args, self),
            Brute(args) => brute::exec(args, self).await,
            Clear(args) => clear::exec(args, self),
            Delete(args) => delete::exec(args, self),
        }
    }

    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_toml_file(path.clone())?,
            None => Config::load_or_default(util::current_dir())?,
        };
        if let Some(dir) = &self.cache_dir {
            cfg.cache.directory = Some(dir.clone());
        }
        if let Some(path) = &cfg.source_config_file {
            log::info!("Using config {}", util::replace_homedir_to_tilde(path).display());
        }
        Ok(cfg)
    }

    pub fn open_session(&self, observer: Arc<dyn Observer>) -> anyhow::Result<Session> {
        let cfg = self.load_config()?;
        let store = FileStore::new(&cfg.problem.data_dir);
        Ok(Session::new(cfg, Box::new(store), observer))
    }
}

/// Loads the saved problem of `program_file` into `session` and returns a snapshot.
pub fn load_problem(session: &Session, program_file: &Path) -> anyhow::Result<Problem> {
    if !session.load_problem(program_file)? {
        anyhow::bail!(
            "No problem is saved for {}. Run `cpjudge new` first.",
            util::replace_homedir_to_tilde(program_file).display()
        );
    }
    session
        .problem()
        .context("Problem was closed while loading")
}
