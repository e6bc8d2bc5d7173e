//! Command-line interface for skillroute
//!
//! Provides argument parsing and subcommand handling for the skillroute binary.

use clap::{Parser, Subcommand};

/// Chat intent router for serverless skill functions
#[derive(Parser)]
#[command(name = "skillroute")]
#[command(version)]
#[command(about = "Chat intent router for serverless skill functions")]
#[command(
    long_about = "skillroute normalizes Slack and Telegram events, classifies the sender's \
    intent with a language model and invokes the skill function that handles it."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# skillroute configuration
# ========================
#
# Credentials never live in this file. Each credential setting names an
# environment variable; a .env file next to the binary is loaded at start-up.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
host = "0.0.0.0"
port = 3000

# Timeout for the completion call and for each downstream invocation (1-300)
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# INTENT CLASSIFIER
# ─────────────────────────────────────────────────────────────────────────────

[classifier]
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4o"
api_key_env = "OPENAI_API_KEY"

# ─────────────────────────────────────────────────────────────────────────────
# SKILLS
# ─────────────────────────────────────────────────────────────────────────────
#
# One table per recognised skill. The classifier may only answer with these
# names or "other"; "other" is never dispatched.
#
#   function:       downstream function invoked by name
#   request_field:  request key carrying the chat text (default "text")
#   reply_field:    reply key returned to the caller (whole reply if unset)
#   example:        sample user message for the classifier prompt

[skills.link_shortener]
function = "link-shortener"
request_field = "longLink"
reply_field = "shortLink"
example = "short"

# ─────────────────────────────────────────────────────────────────────────────
# DOWNSTREAM INVOCATION
# ─────────────────────────────────────────────────────────────────────────────
#
# Functions are invoked at {base_url}/functions/{function}/invocations.
# Point this at the router itself to use the hosted functions below.

[invoker]
base_url = "http://127.0.0.1:3000"

# ─────────────────────────────────────────────────────────────────────────────
# TOKEN AUTHORIZER
# ─────────────────────────────────────────────────────────────────────────────
#
# secret_store = "env" reads the variable named by secret_id;
# secret_store = "file" reads {secrets_dir}/{secret_id}.

[authorizer]
secret_store = "env"
secret_id = "ROUTER_BEARER_SECRET"
principal_id = "user"

# ─────────────────────────────────────────────────────────────────────────────
# HOSTED FUNCTIONS
# ─────────────────────────────────────────────────────────────────────────────

[functions.link_shortener]
name = "link-shortener"
api_base = "https://api.dub.co"
api_key_env = "DUB_API_KEY"
# domain = "dub.sh"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# trace, debug, info, warn, error (RUST_LOG overrides)
log_level = "info"
"#
}
