//! askdb CLI library: builds the orchestrator and its collaborators from
//! [`AppConfig`](askdb::AppConfig), runs administrative commands and formats
//! turn output.
//!
//! Used by the `askdb` binary.

pub mod admin;
pub mod error;
pub mod run;

pub use admin::{add_rule, list_rules, load_references, read_reference_file, rewrite};
pub use error::CliError;
pub use run::{build_orchestrator, format_output, rule_store, OutputFormat};
