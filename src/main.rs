//! weft CLI
//!
//! Usage:
//!   weft compile [OPTIONS] <FILE>
//!   weft render [OPTIONS] --values <FILE> <FILE>
//!
//! Template files are markup with `${name}` slots. `compile` prints the
//! marker-annotated markup and the binding descriptors; `render` fills the
//! slots from a TOML table and prints the resulting markup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::debug;

use weft::{
    compile, ConfigError, EngineConfig, Markers, MemoryHost, Renderer, ResultKind, TemplateError,
    TemplateResult, TemplateStrings, Value,
};

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Compile and render incremental templates")]
struct Cli {
    /// Log more (repeat for trace output); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the compiled form of a template file
    Compile {
        /// Template file
        file: PathBuf,

        /// Treat the template as SVG content
        #[arg(long)]
        svg: bool,

        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Marker seed, overriding the configuration
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Render a template file with values from a TOML table
    Render {
        /// Template file
        file: PathBuf,

        /// Values for the template's slots (TOML)
        #[arg(long)]
        values: PathBuf,

        /// Treat the template as SVG content
        #[arg(long)]
        svg: bool,

        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Errors surfaced by the CLI
#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to parse values: {0}")]
    Values(#[from] toml::de::Error),

    #[error("value '{name}' must be a string, integer, float or boolean")]
    UnsupportedValue { name: String },

    #[error("unterminated slot at byte {offset}")]
    UnterminatedSlot { offset: usize },

    /// Carries the rendered ariadne report
    #[error("{report}")]
    Template { report: String },
}

/// A template file split into fragments and slot names
struct Source {
    strings: TemplateStrings,
    names: Vec<String>,
    filename: String,
}

impl Source {
    fn load(path: &Path) -> Result<Self, CliError> {
        let text = read(path)?;
        let (fragments, names) = split_slots(&text)?;
        Ok(Self {
            strings: TemplateStrings::intern(fragments),
            names,
            filename: path.display().to_string(),
        })
    }

    fn fail(&self, error: TemplateError) -> CliError {
        CliError::Template {
            report: error.report(&self.strings, &self.filename),
        }
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Split `${name}` slots out of template text
fn split_slots(text: &str) -> Result<(Vec<String>, Vec<String>), CliError> {
    let mut fragments = Vec::new();
    let mut names = Vec::new();
    let mut rest = text;
    let mut offset = 0;
    while let Some(open) = rest.find("${") {
        let Some(close) = rest[open..].find('}') else {
            return Err(CliError::UnterminatedSlot {
                offset: offset + open,
            });
        };
        fragments.push(rest[..open].to_string());
        names.push(rest[open + 2..open + close].trim().to_string());
        offset += open + close + 1;
        rest = &rest[open + close + 1..];
    }
    fragments.push(rest.to_string());
    Ok((fragments, names))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    Ok(match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    })
}

fn kind(svg: bool) -> ResultKind {
    if svg {
        ResultKind::Svg
    } else {
        ResultKind::Html
    }
}

fn run_compile(file: &Path, svg: bool, config: Option<&Path>, seed: Option<u64>) -> Result<(), CliError> {
    let source = Source::load(file)?;
    let config = load_config(config)?;
    let seed = seed.or(config.marker_seed).unwrap_or(0);
    let config = config.with_marker_seed(seed);

    let compiled = compile(&source.strings, kind(svg), &Markers::from_seed(seed)).map_err(|e| source.fail(e))?;
    let mut renderer = Renderer::new(MemoryHost::new(), &config);
    let values = vec![Value::Nothing; source.names.len()];
    let result = TemplateResult::new(source.strings.clone(), kind(svg), values);
    let template = renderer.template(&result).map_err(|e| source.fail(e))?;

    println!("markup:\n  {}", compiled.html);
    println!("attributes: {:?}", compiled.attribute_names);
    println!("parts:");
    for part in template.parts() {
        println!("  {:?}", part);
    }
    Ok(())
}

fn run_render(file: &Path, values: &Path, svg: bool, config: Option<&Path>) -> Result<(), CliError> {
    let source = Source::load(file)?;
    let config = load_config(config)?;
    let table: toml::Table = toml::from_str(&read(values)?)?;

    let mut slots = Vec::with_capacity(source.names.len());
    for name in &source.names {
        slots.push(match table.get(name) {
            None => Value::Nothing,
            Some(toml::Value::String(s)) => Value::from(s.as_str()),
            Some(toml::Value::Integer(i)) => Value::from(*i),
            Some(toml::Value::Float(f)) => Value::from(*f),
            Some(toml::Value::Boolean(b)) => Value::from(*b),
            Some(_) => return Err(CliError::UnsupportedValue { name: name.clone() }),
        });
    }
    debug!(slots = slots.len(), file = %source.filename, "rendering");

    let mut host = MemoryHost::new();
    let body = host.create_element("body");
    let mut renderer = Renderer::new(host, &config);
    let result = TemplateResult::new(source.strings.clone(), kind(svg), slots);
    renderer.render(result, body).map_err(|e| source.fail(e))?;
    println!("{}", renderer.host().rendered_html(body));
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let result = match &cli.command {
        Command::Compile {
            file,
            svg,
            config,
            seed,
        } => run_compile(file, *svg, config.as_deref(), *seed),
        Command::Render {
            file,
            values,
            svg,
            config,
        } => run_render(file, values, *svg, config.as_deref()),
    };

    if let Err(e) = result {
        match e {
            CliError::Template { report } => eprint!("{}", report),
            other => eprintln!("Error: {}", other),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_slots() {
        let (fragments, names) = split_slots("<p class=${ cls }>${text}</p>").unwrap();
        assert_eq!(fragments, vec!["<p class=", ">", "</p>"]);
        assert_eq!(names, vec!["cls", "text"]);
    }

    #[test]
    fn test_split_slots_unterminated() {
        assert!(matches!(
            split_slots("<p>${oops</p>"),
            Err(CliError::UnterminatedSlot { offset: 3 })
        ));
    }
}
