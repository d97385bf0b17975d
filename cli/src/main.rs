//! `esforge`: a thin CLI shell over `esforge_core::convert`. Deliberately
//! outside the `esforge-core` crate (SPEC_FULL.md §6: "CLI is an
//! external collaborator"), the way the reference toolkit's `pmat`
//! binary is a thin shell around its own library crate's services.
//!
//! The core never parses SRC source text itself (§6's parser-adapter
//! seam); this binary's own [`JsonAstParser`] expects its input file to
//! already be a JSON-encoded AST (`Node`, serialized via `serde_json`,
//! per §3's "added" Serialization note) rather than SRC source — a real
//! front-end would plug in here instead.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::ValueEnum;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use esforge_core::compiler::filters::{AutoExports, EsLevel, OrStyle};
use esforge_core::compiler::parser::{ParseUnit, Parser as CoreParser};
use esforge_core::{convert, CompileError, Options};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EsLevelArg {
    Es2015,
    Es2017,
    Es2019,
    Es2020,
    Es2021,
    Es2022,
    Es2023,
    Es2024,
    Es2025,
}

impl From<EsLevelArg> for EsLevel {
    fn from(v: EsLevelArg) -> Self {
        match v {
            EsLevelArg::Es2015 => EsLevel::Es2015,
            EsLevelArg::Es2017 => EsLevel::Es2017,
            EsLevelArg::Es2019 => EsLevel::Es2019,
            EsLevelArg::Es2020 => EsLevel::Es2020,
            EsLevelArg::Es2021 => EsLevel::Es2021,
            EsLevelArg::Es2022 => EsLevel::Es2022,
            EsLevelArg::Es2023 => EsLevel::Es2023,
            EsLevelArg::Es2024 => EsLevel::Es2024,
            EsLevelArg::Es2025 => EsLevel::Es2025,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrStyleArg {
    Logical,
    Nullish,
}

impl From<OrStyleArg> for OrStyle {
    fn from(v: OrStyleArg) -> Self {
        match v {
            OrStyleArg::Logical => OrStyle::Logical,
            OrStyleArg::Nullish => OrStyle::Nullish,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AutoExportsArg {
    Off,
    On,
    Default,
}

impl From<AutoExportsArg> for AutoExports {
    fn from(v: AutoExportsArg) -> Self {
        match v {
            AutoExportsArg::Off => AutoExports::Off,
            AutoExportsArg::On => AutoExports::On,
            AutoExportsArg::Default => AutoExports::Default,
        }
    }
}

/// Flags that override whatever `esforge.toml` says (§4.10 precedence:
/// CLI flag > project file > default). Every field is optional so
/// "not passed on the command line" is distinguishable from "set to a
/// value that happens to match the default".
#[derive(Debug, clap::Parser)]
#[command(name = "esforge", version, about = "Translate SRC ASTs into TGT source")]
struct Cli {
    /// JSON-encoded AST input file.
    input: PathBuf,

    /// Where to write emitted TGT source; stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Project config file, defaults to `esforge.toml` in the current directory.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    eslevel: Option<EsLevelArg>,

    #[arg(long, value_enum)]
    or: Option<OrStyleArg>,

    #[arg(long, value_enum)]
    autoexports: Option<AutoExportsArg>,

    #[arg(long)]
    include_all: bool,

    #[arg(long)]
    require_recursive: bool,

    #[arg(long)]
    truthy_ruby: bool,

    #[arg(long)]
    private_fields: Option<bool>,

    #[arg(long)]
    verbose: bool,
}

/// The subset of [`Options`] a project file may set, deserialized from
/// TOML and layered under CLI flags (§4.10).
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct ProjectConfig {
    eslevel: Option<String>,
    or: Option<String>,
    autoexports: Option<String>,
    include_all: Option<bool>,
    require_recursive: Option<bool>,
    truthy_ruby: Option<bool>,
    private_fields: Option<bool>,
}

fn load_project_config(path: &PathBuf) -> Result<ProjectConfig> {
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn parse_eslevel(s: &str) -> Option<EsLevel> {
    Some(match s {
        "es2015" => EsLevel::Es2015,
        "es2017" => EsLevel::Es2017,
        "es2019" => EsLevel::Es2019,
        "es2020" => EsLevel::Es2020,
        "es2021" => EsLevel::Es2021,
        "es2022" => EsLevel::Es2022,
        "es2023" => EsLevel::Es2023,
        "es2024" => EsLevel::Es2024,
        "es2025" => EsLevel::Es2025,
        _ => return None,
    })
}

fn build_options(cli: &Cli, project: &ProjectConfig) -> Options {
    let mut options = Options::default();

    if let Some(level) = project.eslevel.as_deref().and_then(parse_eslevel) {
        options.eslevel = level;
    }
    if let Some(style) = &project.or {
        options.or = match style.as_str() {
            "nullish" => OrStyle::Nullish,
            _ => OrStyle::Logical,
        };
    }
    if let Some(ae) = &project.autoexports {
        options.autoexports = match ae.as_str() {
            "on" => AutoExports::On,
            "default" => AutoExports::Default,
            _ => AutoExports::Off,
        };
    }
    options.include_all = project.include_all.unwrap_or(options.include_all);
    options.require_recursive = project.require_recursive.unwrap_or(options.require_recursive);
    options.truthy_ruby = project.truthy_ruby.unwrap_or(options.truthy_ruby);
    options.private_fields = project.private_fields.or(options.private_fields);

    if let Some(level) = cli.eslevel {
        options.eslevel = level.into();
    }
    if let Some(style) = cli.or {
        options.or = style.into();
    }
    if let Some(ae) = cli.autoexports {
        options.autoexports = ae.into();
    }
    if cli.include_all {
        options.include_all = true;
    }
    if cli.require_recursive {
        options.require_recursive = true;
    }
    if cli.truthy_ruby {
        options.truthy_ruby = true;
    }
    if cli.private_fields.is_some() {
        options.private_fields = cli.private_fields;
    }
    options.file = Some(cli.input.display().to_string());

    options
}

/// Reads a JSON-encoded [`esforge_core::compiler::ast::Node`] and hands
/// it back wrapped as a [`ParseUnit`] with no comments — standing in for
/// a real front-end, which would additionally report the comment stream
/// pragma-scanning needs.
struct JsonAstParser;

impl CoreParser for JsonAstParser {
    fn parse(&self, source: &str, buffer_name: &str) -> Result<ParseUnit, CompileError> {
        let root = serde_json::from_str(source)
            .map_err(|e| CompileError::malformed(format!("invalid AST JSON in {buffer_name}: {e}")))?;
        Ok(ParseUnit {
            root,
            comments: Vec::new(),
            source_buffer_name: std::sync::Arc::from(buffer_name),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { EnvFilter::new("esforge=debug") } else { EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")) };
    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer().compact()).init();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("esforge.toml"));
    let project = load_project_config(&config_path)?;
    let options = build_options(&cli, &project);

    let source = fs::read_to_string(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;
    let buffer_name = cli.input.display().to_string();

    info!(input = %buffer_name, "converting");
    let out = convert(&JsonAstParser, &source, &buffer_name, options).map_err(|e| anyhow::anyhow!(e))?;

    match &cli.output {
        Some(path) => fs::write(path, out.code).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", out.code),
    }

    Ok(())
}
