use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::judge::ExpandBehavior;
use crate::testing::compare::CompareOptions;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Read(#[from] fsutil::Error),

    #[error("Invalid config TOML ({0}): {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Cannot find '{0}' in the current dir or its ancestors")]
    NotFound(&'static str),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub cache: CacheConfig,
    pub compile: CompileConfig,
    pub run: RunConfig,
    pub compare: CompareOptions,
    pub problem: ProblemConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Defaults to `<user cache dir>/cpjudge`.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    pub timeout_ms: u64,
    pub lang: Vec<LangConfig>,
}

/// How to build and launch one language.
/// A language without `compiler` is interpreted: its source file is passed to `runner`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LangConfig {
    pub name: String,
    pub extensions: Vec<String>,
    pub compiler: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub runner: Option<String>,
    #[serde(default)]
    pub run_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Grace period on top of the problem's time limit before the process is killed.
    pub time_addition_ms: u64,
    pub checker_time_limit_ms: u64,
    /// Limits of the input generator and the reference solution in brute-force mode.
    pub generator_time_limit_ms: u64,
    pub brute_force_time_limit_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProblemConfig {
    pub default_time_limit_ms: u64,
    pub default_memory_limit_mb: u64,
    /// Outputs longer than this (in bytes) are kept in scratch files instead of inline.
    pub max_inline_len: usize,
    pub expand_behavior: ExpandBehavior,
    pub clear_before_load: bool,
    /// Directory (relative to the source file) holding persisted problems.
    pub data_dir: PathBuf,
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "cpjudge.toml";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).expect("example config must be embedded");
        String::from_utf8_lossy(file.data.as_ref()).into_owned()
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> Result<Self, ConfigError> {
        let toml = fsutil::read_to_string(&filepath)?;
        let mut cfg = Self::from_toml(&toml).map_err(|e| ConfigError::Parse(filepath.clone(), e))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
            .ok_or(ConfigError::NotFound(Self::FILENAME))
    }

    /// Like [`Self::find_file_in_ancestors`] but falls back to the defaults when no file exists.
    pub fn load_or_default(cur_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::find_file_in_ancestors(cur_dir) {
            Ok(path) => Self::from_toml_file(path),
            Err(ConfigError::NotFound(_)) => {
                log::debug!("No {} found; using default config", Self::FILENAME);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache.directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("cpjudge")
        })
    }
}

impl CompileConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Looks up the language by the file extension, ignoring case.
    pub fn find_lang_for(&self, src: impl AsRef<Path>) -> Option<&LangConfig> {
        let ext = src.as_ref().extension()?.to_str()?;
        self.lang
            .iter()
            .find(|l| l.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

impl LangConfig {
    pub fn is_interpreted(&self) -> bool {
        self.compiler.is_none()
    }
}

impl RunConfig {
    pub fn time_addition(&self) -> Duration {
        Duration::from_millis(self.time_addition_ms)
    }

    pub fn checker_time_limit(&self) -> Duration {
        Duration::from_millis(self.checker_time_limit_ms)
    }

    pub fn generator_time_limit(&self) -> Duration {
        Duration::from_millis(self.generator_time_limit_ms)
    }

    pub fn brute_force_time_limit(&self) -> Duration {
        Duration::from_millis(self.brute_force_time_limit_ms)
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        let strs = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let lang = vec![
            LangConfig {
                name: "C++".into(),
                extensions: strs(&["cpp", "cc", "cxx"]),
                compiler: Some("g++".into()),
                args: strs(&["-std=c++17", "-O2"]),
                runner: None,
                run_args: vec![],
            },
            LangConfig {
                name: "C".into(),
                extensions: strs(&["c"]),
                compiler: Some("gcc".into()),
                args: strs(&["-O2"]),
                runner: None,
                run_args: vec![],
            },
            LangConfig {
                name: "Rust".into(),
                extensions: strs(&["rs"]),
                compiler: Some("rustc".into()),
                args: strs(&["-O"]),
                runner: None,
                run_args: vec![],
            },
            LangConfig {
                name: "Python".into(),
                extensions: strs(&["py"]),
                compiler: None,
                args: vec![],
                runner: Some("python3".into()),
                run_args: vec![],
            },
            LangConfig {
                name: "JavaScript".into(),
                extensions: strs(&["js"]),
                compiler: None,
                args: vec![],
                runner: Some("node".into()),
                run_args: vec![],
            },
        ];
        Self {
            timeout_ms: 10_000,
            lang,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_addition_ms: 500,
            checker_time_limit_ms: 10_000,
            generator_time_limit_ms: 10_000,
            brute_force_time_limit_ms: 10_000,
        }
    }
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            default_time_limit_ms: 2000,
            default_memory_limit_mb: 1024,
            max_inline_len: 64 * 1024,
            expand_behavior: ExpandBehavior::default(),
            clear_before_load: true,
            data_dir: ".cpjudge".into(),
        }
    }
}
