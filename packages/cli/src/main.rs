//! `agentstxt`: command-line interface for agents.txt manifests.
//!
//! - **`validate`** parses and checks a manifest, printing every diagnostic.
//! - **`convert`** re-renders a manifest in the other syntax.
//! - **`discover`** fetches a manifest from a live origin.
//!
//! `validate` and `convert` read a file path or stdin (`-`). `--policy`
//! switches either command to the ai.txt variant.
//!
//! Exit status: 0 on success, 1 when the manifest has errors, 2 when the
//! command itself could not run.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{self, ExitCode};
use std::time::Duration;

use agentstxt::{
    generate_json, generate_policy, generate_policy_json, generate_text, parse_json,
    parse_policy, parse_policy_json, parse_text, validate, validate_policy, Diagnostic, Document,
    GenerateError, InputError, ParseOptions, ParseResult, PolicyDocument, ValidationReport,
};
use agentstxt_client::{ClientConfig, DiscoveryClient};
use clap::{Parser, Subcommand, ValueEnum};

/// agentstxt: validate, convert and discover agents.txt manifests
#[derive(Parser)]
#[command(name = "agentstxt", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Syntax {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Lookup {
    Text,
    Json,
    /// JSON first, then text.
    Any,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and validate a manifest.
    ///
    /// Prints each warning and error with its line or field. Exits 1 if
    /// there is any error.
    Validate {
        /// Path to the manifest, or `-` for stdin.
        file: PathBuf,

        /// Input syntax. Defaults to json for `.json` files, text otherwise.
        #[arg(long, value_enum)]
        format: Option<Syntax>,

        /// Treat the input as an ai.txt policy.
        #[arg(long)]
        policy: bool,

        /// Print the report as JSON instead of one line per diagnostic.
        #[arg(long)]
        json: bool,
    },

    /// Convert a manifest between the text and JSON syntaxes.
    ///
    /// The input is validated first; nothing is printed if it has errors.
    Convert {
        /// Path to the manifest, or `-` for stdin.
        file: PathBuf,

        #[arg(long, value_enum)]
        format: Option<Syntax>,

        /// Output syntax.
        #[arg(long, value_enum)]
        to: Syntax,

        #[arg(long)]
        policy: bool,

        /// Set the `Generated` timestamp to now.
        #[arg(long)]
        stamp: bool,
    },

    /// Fetch a manifest from an origin's well-known paths.
    ///
    /// Examples:
    ///   agentstxt discover https://example.com
    ///   agentstxt discover https://example.com --format text --to json
    Discover {
        /// Origin to query, e.g. https://example.com
        url: String,

        /// Which manifest syntax to look for.
        #[arg(long, value_enum, default_value_t = Lookup::Any)]
        format: Lookup,

        /// Per-request timeout in milliseconds.
        #[arg(long, env = "AGENTSTXT_TIMEOUT_MS")]
        timeout_ms: Option<u64>,

        /// Fetch ai.txt instead.
        #[arg(long, conflicts_with = "format")]
        policy: bool,

        /// Syntax to print the fetched manifest in.
        #[arg(long, value_enum, default_value_t = Syntax::Text)]
        to: Syntax,
    },
}

// ---------------------------------------------------------------------------
// Manifest kinds
// ---------------------------------------------------------------------------

type ParseFn<T> = fn(&str, &ParseOptions) -> Result<ParseResult<T>, InputError>;

/// The operations one manifest kind supports.
struct Kind<T> {
    parse_text: ParseFn<T>,
    parse_json: ParseFn<T>,
    validate: fn(&T) -> ValidationReport,
    generate_text: fn(&T) -> String,
    generate_json: fn(&T) -> Result<String, GenerateError>,
    stamped_now: fn(T) -> T,
}

const AGENTS: Kind<Document> = Kind {
    parse_text,
    parse_json,
    validate,
    generate_text,
    generate_json,
    stamped_now: Document::stamped_now,
};

const POLICY: Kind<PolicyDocument> = Kind {
    parse_text: parse_policy,
    parse_json: parse_policy_json,
    validate: validate_policy,
    generate_text: generate_policy,
    generate_json: generate_policy_json,
    stamped_now: PolicyDocument::stamped_now,
};

impl<T> Kind<T> {
    /// Parse then, if parsing succeeded, validate. Diagnostics from both
    /// stages are merged into one report.
    fn check(&self, input: &str, syntax: Syntax) -> (Option<T>, ValidationReport) {
        let parse = match syntax {
            Syntax::Text => self.parse_text,
            Syntax::Json => self.parse_json,
        };
        let parsed = parse(input, &ParseOptions::default()).unwrap_or_else(|e| fatal(&e));
        let mut errors = parsed.errors;
        let mut warnings = parsed.warnings;
        if let Some(doc) = &parsed.document {
            let report = (self.validate)(doc);
            errors.extend(report.errors);
            warnings.extend(report.warnings);
        }
        let valid = errors.is_empty();
        let doc = if valid { parsed.document } else { None };
        (
            doc,
            ValidationReport {
                valid,
                errors,
                warnings,
            },
        )
    }

    fn render(&self, doc: &T, syntax: Syntax) -> String {
        match syntax {
            Syntax::Text => (self.generate_text)(doc),
            Syntax::Json => {
                let mut json = (self.generate_json)(doc).unwrap_or_else(|e| fatal(&e));
                json.push('\n');
                json
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Validate {
            file,
            format,
            policy,
            json,
        } => {
            let input = read_input(&file);
            let syntax = syntax_for(&file, format);
            let report = if policy {
                POLICY.check(&input, syntax).1
            } else {
                AGENTS.check(&input, syntax).1
            };

            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{out}"),
                    Err(e) => fatal(&e),
                }
            } else {
                print_diagnostics(&report.warnings, "warning");
                print_diagnostics(&report.errors, "error");
                if report.valid {
                    println!("valid ({} warning(s))", report.warnings.len());
                }
            }
            exit_for(report.valid)
        }

        Command::Convert {
            file,
            format,
            to,
            policy,
            stamp,
        } => {
            let input = read_input(&file);
            let syntax = syntax_for(&file, format);
            if policy {
                convert(&POLICY, &input, syntax, to, stamp)
            } else {
                convert(&AGENTS, &input, syntax, to, stamp)
            }
        }

        Command::Discover {
            url,
            format,
            timeout_ms,
            policy,
            to,
        } => {
            init_tracing();
            let mut config = ClientConfig::from_env();
            if let Some(ms) = timeout_ms {
                config = config.with_timeout(Duration::from_millis(ms));
            }
            let client = DiscoveryClient::new(config).unwrap_or_else(|e| fatal(&e));

            if policy {
                let result = client
                    .discover_policy(&url)
                    .await
                    .unwrap_or_else(|e| fatal(&e));
                show(&POLICY, result, to)
            } else {
                let result = match format {
                    Lookup::Text => client.discover(&url).await,
                    Lookup::Json => client.discover_json(&url).await,
                    Lookup::Any => client.discover_any(&url).await,
                }
                .unwrap_or_else(|e| fatal(&e));
                show(&AGENTS, result, to)
            }
        }
    }
}

fn convert<T>(kind: &Kind<T>, input: &str, from: Syntax, to: Syntax, stamp: bool) -> ExitCode {
    let (doc, report) = kind.check(input, from);
    print_diagnostics(&report.warnings, "warning");
    match doc {
        Some(doc) => {
            let doc = if stamp { (kind.stamped_now)(doc) } else { doc };
            print!("{}", kind.render(&doc, to));
            ExitCode::SUCCESS
        }
        None => {
            print_diagnostics(&report.errors, "error");
            ExitCode::from(1)
        }
    }
}

fn show<T>(kind: &Kind<T>, result: ParseResult<T>, to: Syntax) -> ExitCode {
    print_diagnostics(&result.warnings, "warning");
    print_diagnostics(&result.errors, "error");
    match &result.document {
        Some(doc) => {
            print!("{}", kind.render(doc, to));
            ExitCode::SUCCESS
        }
        None => ExitCode::from(1),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Client logs go to stderr so stdout stays a clean manifest.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentstxt_client=info".into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// An explicit `--format` wins; otherwise `.json` files are JSON.
fn syntax_for(path: &Path, format: Option<Syntax>) -> Syntax {
    format.unwrap_or_else(|| {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            Syntax::Json
        } else {
            Syntax::Text
        }
    })
}

fn print_diagnostics(diagnostics: &[Diagnostic], label: &str) {
    for d in diagnostics {
        eprintln!("{label}: {d}");
    }
}

fn exit_for(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {e}", path.display())))
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &dyn std::fmt::Display) -> ! {
    eprintln!("agentstxt: {msg}");
    process::exit(2);
}
