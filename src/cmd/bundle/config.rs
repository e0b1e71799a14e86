use {
    anyhow::{Context, Result},
    serde::Deserialize,
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Resolved bundler configuration.
///
/// Normally read from a `jspack.toml` file, with individual fields
/// overridable from the command line. Command line values win.
#[derive(Debug, Clone)]
pub struct Config {
    /// Entry file path, exactly as it will appear in the generated
    /// runtime's initial `require` call.
    pub entry: String,

    /// Output artifact location.
    pub output: Output,
}

/// Output artifact location.
#[derive(Debug, Clone)]
pub struct Output {
    /// Directory the artifact is written into. Must already exist.
    pub path: PathBuf,

    /// Artifact file name.
    pub filename: String,
}

/// On-disk configuration, where every field is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    entry: Option<String>,
    #[serde(default)]
    output: OutputFile,
}

#[derive(Debug, Default, Deserialize)]
struct OutputFile {
    path: Option<PathBuf>,
    filename: Option<String>,
}

impl Config {
    /// Merge the configuration file (if present) with command line
    /// overrides.
    pub fn resolve(
        config_path: &Path,
        entry: Option<String>,
        out_dir: Option<PathBuf>,
        filename: Option<String>,
    ) -> Result<Self> {
        let file = if config_path.exists() {
            let content = fs::read_to_string(config_path).context(format!(
                "failed to read config file {}",
                config_path.display()
            ))?;
            toml::from_str::<ConfigFile>(&content).context(format!(
                "failed to parse config file {}",
                config_path.display()
            ))?
        } else {
            ConfigFile::default()
        };

        let entry = entry
            .or(file.entry)
            .context("no entry file: set `entry` in jspack.toml or pass it on the command line")?;

        Ok(Self {
            entry,
            output: Output {
                path: out_dir
                    .or(file.output.path)
                    .unwrap_or_else(|| PathBuf::from("dist")),
                filename: filename
                    .or(file.output.filename)
                    .unwrap_or_else(|| String::from("bundle.js")),
            },
        })
    }
}
