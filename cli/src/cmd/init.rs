use std::path::PathBuf;

use cpjudge_core::Config;

use crate::print_success;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg(default_value = "./")]
    dir: PathBuf,

    /// Overwrite an existing config file
    #[arg(short, long)]
    force: bool,
}

pub fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    let path = args.dir.join(Config::FILENAME);
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.to_string_lossy()
        );
    }
    fsutil::write_with_mkdir(&path, Config::example_toml())?;
    print_success!("Successfully wrote {}", path.to_string_lossy());
    Ok(())
}
