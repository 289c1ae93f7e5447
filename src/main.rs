use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ulib_docs::theme::merged_theme_options;
use ulib_docs::{
    substitute, AliasFilter, BuildConfig, ConfigValue, LanguageDomain, PlaceholderSettings,
    Placeholders, PythonConfigParser, ThemeRegistry, ValidationOptions, ValidationSeverity,
};

/// Generate, configure and check the Sphinx configuration of the
/// Doxygen/Breathe documentation build.
#[derive(Parser, Debug)]
#[command(name = "ulib-docs", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the conf.py.in template with every placeholder unresolved.
    Template {
        /// Language domain (c or cpp)
        #[arg(short, long, default_value = "c")]
        domain: LanguageDomain,

        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Substitute @NAME@ placeholders in a template.
    Configure {
        template: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        values: PlaceholderArgs,

        /// Fail instead of leaving undefined placeholders in place
        #[arg(long)]
        strict: bool,
    },

    /// Write a configured conf.py directly.
    Generate {
        #[arg(short, long, default_value = "c")]
        domain: LanguageDomain,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        values: PlaceholderArgs,
    },

    /// Load a conf.py and check the configuration contract.
    Check {
        conf: PathBuf,

        /// Also check the referenced directories and files
        #[arg(long)]
        paths: bool,

        /// Treat warnings as errors
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Print the namespace of a conf.py.
    Dump {
        conf: PathBuf,

        #[arg(short, long, value_enum, default_value_t = DumpFormat::Json)]
        format: DumpFormat,

        /// Complete html_theme_options with the defaults of the theme chain
        #[arg(long)]
        theme_defaults: bool,
    },

    /// Doxygen INPUT_FILTER rewriting @alias docstrings.
    Alias { file: PathBuf },
}

#[derive(clap::Args, Debug)]
struct PlaceholderArgs {
    /// Settings file (TOML, YAML or JSON) with placeholder values
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// NAME=VALUE placeholder definition, may be repeated
    #[arg(short = 'D', value_parser = parse_key_val)]
    define: Vec<(String, String)>,
}

impl PlaceholderArgs {
    fn placeholders(&self) -> Result<Placeholders> {
        let settings = PlaceholderSettings::load(self.settings.as_deref())
            .context("failed to load placeholder settings")?;
        let mut placeholders = Placeholders::from_settings(&settings);
        for (name, value) in &self.define {
            placeholders.define(name, value.clone());
        }
        Ok(placeholders)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DumpFormat {
    Json,
    Yaml,
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow!("invalid NAME=VALUE: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => io::stdout().write_all(content.as_bytes())?,
    }
    Ok(())
}

fn load_conf(path: &Path) -> Result<ulib_docs::Namespace> {
    PythonConfigParser::new()
        .load_file(path)
        .with_context(|| format!("failed to load {}", path.display()))
}

fn check(conf: &Path, paths: bool, deny_warnings: bool) -> Result<()> {
    let ns = load_conf(conf)?;
    let options = ValidationOptions {
        check_paths: paths,
        base_dir: conf.parent().map(Path::to_path_buf),
    };
    let report = ulib_docs::validate(&ns, options);

    for diagnostic in &report.diagnostics {
        println!("{}", diagnostic);
    }
    println!(
        "{}: {} error(s), {} warning(s)",
        conf.display(),
        report.count(ValidationSeverity::Error),
        report.count(ValidationSeverity::Warning)
    );

    if report.has_errors() || (deny_warnings && report.has_warnings()) {
        bail!("configuration check failed");
    }
    Ok(())
}

fn main() {
    match main_result() {
        Ok(_) => {}
        Err(err) => {
            eprintln!("{:?}", err);
            std::process::exit(1);
        }
    }
}

fn main_result() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Commands::Template { domain, output } => {
            let source = BuildConfig::template(domain).to_conf_py()?;
            write_output(output.as_deref(), &source)
        }

        Commands::Configure {
            template,
            output,
            values,
            strict,
        } => {
            let text = fs::read_to_string(&template)
                .with_context(|| format!("failed to read {}", template.display()))?;
            let result = substitute(&text, &values.placeholders()?);
            let text = if strict {
                result.into_complete()?
            } else {
                result.text
            };
            write_output(output.as_deref(), &text)
        }

        Commands::Generate {
            domain,
            output,
            values,
        } => {
            let placeholders = values.placeholders()?;
            for name in placeholders.missing() {
                warn!("Placeholder @{}@ is not defined and is left as is", name);
            }
            let source = BuildConfig::for_domain(&placeholders, domain).to_conf_py()?;
            write_output(output.as_deref(), &source)
        }

        Commands::Check {
            conf,
            paths,
            deny_warnings,
        } => check(&conf, paths, deny_warnings),

        Commands::Dump {
            conf,
            format,
            theme_defaults,
        } => {
            let mut ns = load_conf(&conf)?;
            if theme_defaults {
                let registry = ThemeRegistry::for_namespace(&ns, conf.parent())?;
                let merged = merged_theme_options(&ns, &registry)?;
                ns.insert("html_theme_options".to_string(), ConfigValue::Dict(merged));
            }
            let text = match format {
                DumpFormat::Json => serde_json::to_string_pretty(&ns)? + "\n",
                DumpFormat::Yaml => serde_yaml::to_string(&ns)?,
            };
            write_output(None, &text)
        }

        Commands::Alias { file } => {
            let input = fs::File::open(&file)
                .with_context(|| format!("failed to open {}", file.display()))?;
            let stdout = io::stdout();
            AliasFilter::new().filter(BufReader::new(input), BufWriter::new(stdout.lock()))?;
            Ok(())
        }
    }
}
