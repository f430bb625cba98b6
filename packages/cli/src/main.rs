use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use fedit_adapters::{build_registry, FeditSettings};
use fedit_cli::{adapter_help, decode_context, encode_context, CliError};
use fedit_codec::{CodecConfig, CodecKind};

/// fedit - frontend editing helpers
#[derive(Parser, Debug)]
#[command(name = "fedit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file; FEDIT_* environment variables override it
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print how to call the registered adapters
    AdapterHelp {
        /// Only this adapter
        identifier: Option<String>,
    },
    /// Inspect shared-context tokens
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Turn a JSON object into a token
    Encode {
        #[command(flatten)]
        codec: CodecArgs,
        json: String,
    },
    /// Print the JSON behind a token
    Decode {
        #[command(flatten)]
        codec: CodecArgs,
        token: String,
    },
}

#[derive(Args, Debug)]
struct CodecArgs {
    /// signed, plain or session
    #[arg(long)]
    mode: Option<CodecKind>,

    /// Signing secret for the signed codec
    #[arg(long, env = "FEDIT_SECRET_KEY", hide_env_values = true)]
    secret: Option<String>,

    /// Reject signed tokens older than this many seconds
    #[arg(long)]
    max_age: Option<u64>,
}

impl CodecArgs {
    fn apply(self, mut config: CodecConfig) -> CodecConfig {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(secret) = self.secret {
            config.secret_key = secret;
        }
        if self.max_age.is_some() {
            config.max_age_secs = self.max_age;
        }
        config
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let settings = match &cli.settings {
        Some(path) => FeditSettings::from_json_file(path)?,
        None => FeditSettings::default(),
    }
    .apply_env()?;

    match cli.command {
        Command::AdapterHelp { identifier } => adapter_help(&build_registry()?, identifier.as_deref()),
        Command::Context { action } => match action {
            ContextAction::Encode { codec, json } => encode_context(&codec.apply(settings.codec), &json),
            ContextAction::Decode { codec, token } => decode_context(&codec.apply(settings.codec), &token),
        },
    }
}

fn main() {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
