//! askdb CLI binary: natural-language questions in, authorization-scoped SQL out.
//!
//! Default: one turn (`-m` or positional text), or a REPL with `-i`.
//! Subcommands: `rewrite` (scope a statement directly), `rules` (add/list
//! access rules), `references` (load reference data for entity resolution).

mod logging;
mod repl;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use askdb::{AccessRule, AppConfig, TurnRequest};
use cli::{format_output, OutputFormat};
use repl::run_repl_loop;

#[derive(Parser, Debug)]
#[command(name = "askdb")]
#[command(about = "askdb: ask a database question in plain language, get SQL scoped to what you may see")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// User message (or pass as positional arguments)
    #[arg(short, long, value_name = "TEXT")]
    message: Option<String>,

    /// Positional args: user message when -m/--message is not used
    #[arg(trailing_var_arg = true)]
    rest: Vec<String>,

    /// Subject the access rules are looked up for
    #[arg(long, env = "ASKDB_SUBJECT", value_name = "ID")]
    subject: Option<String>,

    /// Conversation key; turns with the same subject and key share history
    #[arg(long, value_name = "KEY", default_value = "default")]
    conversation: String,

    /// Resource matched against access rules (default: the conversation key)
    #[arg(long, value_name = "NAME")]
    resource: Option<String>,

    /// Interactive REPL: keep reading turns from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Print the reply envelope as JSON
    #[arg(long)]
    json: bool,

    /// With --json, pretty-print
    #[arg(long)]
    pretty: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Scope a SQL statement for a subject and resource
    Rewrite(RewriteArgs),
    /// Manage access rules
    Rules(RulesArgs),
    /// Manage reference data used to resolve names to keys
    References(ReferencesArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct RewriteArgs {
    #[arg(long, env = "ASKDB_SUBJECT", value_name = "ID")]
    subject: String,
    #[arg(long, value_name = "NAME")]
    resource: String,
    /// Statement to scope
    sql: String,
}

#[derive(clap::Args, Debug, Clone)]
struct RulesArgs {
    #[command(subcommand)]
    sub: RulesCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum RulesCommand {
    /// Add or replace a rule. RESOURCE is exact (`R1`), a prefix family (`7*`) or `*`
    Add {
        subject: String,
        resource: String,
        /// Boolean SQL condition; empty string for an unrestricted grant
        predicate: String,
    },
    /// List a subject's rules in store order
    List { subject: String },
}

#[derive(clap::Args, Debug, Clone)]
struct ReferencesArgs {
    #[command(subcommand)]
    sub: ReferencesCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum ReferencesCommand {
    /// Replace a reference set from a JSONL file of {"key", "label"} objects
    Load { table: String, file: PathBuf },
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("askdb: {}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = AppConfig::load("askdb", None).unwrap_or_else(|e| fail(e));
    logging::init()?;

    let args = Args::parse();
    let format = OutputFormat::from_flags(args.json, args.pretty);

    match &args.cmd {
        Some(Command::Rewrite(ra)) => {
            let r = cli::rewrite(&app, &ra.sql, &ra.subject, &ra.resource)
                .await
                .unwrap_or_else(|e| fail(e));
            if args.json {
                let out = serde_json::json!({
                    "sql": r.sql,
                    "applied": r.applied,
                    "decision": format!("{:?}", r.decision),
                });
                println!("{}", out);
            } else {
                println!("{}", r.sql);
            }
            return Ok(());
        }
        Some(Command::Rules(ra)) => {
            match &ra.sub {
                RulesCommand::Add {
                    subject,
                    resource,
                    predicate,
                } => {
                    let rule = AccessRule::new(subject.as_str(), resource, predicate.as_str());
                    cli::add_rule(&app, &rule).await.unwrap_or_else(|e| fail(e));
                }
                RulesCommand::List { subject } => {
                    let rules = cli::list_rules(&app, subject)
                        .await
                        .unwrap_or_else(|e| fail(e));
                    for rule in rules {
                        println!("{}\t{}\t{}", rule.subject, rule.resource, rule.predicate);
                    }
                }
            }
            return Ok(());
        }
        Some(Command::References(ra)) => {
            let ReferencesCommand::Load { table, file } = &ra.sub;
            let entries = cli::read_reference_file(file).unwrap_or_else(|e| fail(e));
            let stored = cli::load_references(&app, table, entries)
                .await
                .unwrap_or_else(|e| fail(e));
            eprintln!("{} entries stored in {}", stored, table);
            return Ok(());
        }
        None => {}
    }

    let subject = args
        .subject
        .clone()
        .unwrap_or_else(|| fail("provide --subject or ASKDB_SUBJECT"));
    let message = args.message.clone().or_else(|| {
        if args.rest.is_empty() {
            None
        } else {
            Some(args.rest.join(" "))
        }
    });
    if !args.interactive && message.is_none() {
        fail("provide a message via -m/--message or positional args");
    }

    let orchestrator = cli::build_orchestrator(&app).unwrap_or_else(|e| fail(e));
    let base = TurnRequest {
        subject: subject.clone(),
        conversation_key: args.conversation.clone(),
        resource: args.resource.clone(),
        utterance: String::new(),
    };

    if let Some(text) = message {
        let output = orchestrator
            .run_request(TurnRequest {
                utterance: text,
                ..base.clone()
            })
            .await
            .unwrap_or_else(|e| fail(format!("{}: {}", e.code(), e)));
        println!("{}", format_output(&output, &subject, format)?);
    }
    if args.interactive {
        run_repl_loop(&orchestrator, &base, format).await?;
    }
    Ok(())
}
