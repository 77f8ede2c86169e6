//! Operator CLI for driving the ceremonies of a secrets-management service.
//!
//! Ceremony rounds outlive any single process, so each invocation submits
//! at most one share and binds it to the round with an explicit `--nonce`
//! (or lets the service bind the first submission). Shares can be passed
//! as arguments or, preferably, fed on stdin to keep them out of shell
//! history.

use std::io::BufRead;

use clap::{Parser, Subcommand};
use eyre::bail;
use sealkit_core::{Client, ExposeSecret, RekeyParams, RootGenerationMode};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sealkit",
    version,
    about = "Drive the operator ceremonies of a secrets-management service"
)]
struct Cli {
    /// Service address.
    #[arg(
        long,
        env = "SEALKIT_ADDR",
        default_value = "https://127.0.0.1:8200",
        global = true
    )]
    address: String,

    /// Token authenticating requests. Unseal and status work without one.
    #[arg(long, env = "SEALKIT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the seal status.
    Status,
    /// Seal the service. Undoing this takes a full unseal ceremony.
    Seal,
    /// Submit unseal shares, from arguments or stdin when none are given.
    Unseal {
        /// Discard the active round's progress instead of submitting.
        #[arg(long)]
        reset: bool,
        /// Master-key shares to submit, in any order.
        shares: Vec<String>,
    },
    /// Drive a master-key rekey round.
    Rekey {
        #[command(subcommand)]
        command: RekeyCommand,
    },
    /// Drive a root-credential generation round.
    GenerateRoot {
        #[command(subcommand)]
        command: GenerateRootCommand,
    },
    /// Unwrap a single-use envelope. Without a token, the ambient
    /// credential is treated as the envelope (self-unwrap).
    Unwrap {
        /// The envelope's single-use wrapping token.
        wrap_token: Option<String>,
    },
    /// Revoke an envelope through its accessor without reading it.
    RevokeAccessor {
        /// The envelope's `wrapped_accessor`.
        accessor: String,
    },
    /// Rotate the backend encryption key.
    Rotate,
    /// Print the encryption-key rotation term.
    KeyStatus,
}

#[derive(Subcommand)]
enum RekeyCommand {
    /// Start a round.
    Start {
        /// Number of shares to split the new master key into.
        #[arg(long, default_value_t = 5)]
        shares: u32,
        /// Shares required to reconstruct the new master key.
        #[arg(long, default_value_t = 3)]
        threshold: u32,
        /// Retain an encrypted backup of the new shares service-side.
        #[arg(long)]
        backup: bool,
    },
    /// Print the round's status.
    Status,
    /// Submit one share of the current master key. On the completing
    /// submission the output carries the new shares; persist them
    /// immediately, they are not retrievable again.
    Submit {
        /// A current-key share.
        share: String,
        /// Nonce binding the submission to the round.
        #[arg(long)]
        nonce: Option<String>,
    },
    /// Cancel the round, discarding all progress.
    Cancel,
    /// Retrieve the encrypted backup of the new shares.
    Backup,
}

#[derive(Subcommand)]
enum GenerateRootCommand {
    /// Start a round. Exactly one protection mode is required.
    Start {
        /// Base64 one-time pad the credential will be XORed against.
        #[arg(long, conflicts_with = "pgp_key")]
        otp: Option<String>,
        /// Base64 PGP public key the credential will be encrypted to.
        #[arg(long)]
        pgp_key: Option<String>,
    },
    /// Print the round's status.
    Status,
    /// Submit one master-key share.
    Submit {
        /// A master-key share.
        share: String,
        /// Nonce binding the submission to the round.
        #[arg(long)]
        nonce: Option<String>,
    },
    /// Cancel the round, discarding all progress.
    Cancel,
    /// Decode an XOR-protected credential against its one-time pad.
    Decode {
        /// The `encoded_root_token` from the completed round.
        encoded_root_token: String,
        /// The base64 one-time pad supplied at start.
        otp: String,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let client = Client::new(&cli.address, cli.token.unwrap_or_default());

    match cli.command {
        Command::Status => print_json(&client.seal_status().await?),
        Command::Seal => {
            client.seal().await?;
            println!("service sealed");
            Ok(())
        }
        Command::Unseal { reset, shares } => unseal(&client, reset, shares).await,
        Command::Rekey { command } => rekey(&client, command).await,
        Command::GenerateRoot { command } => generate_root(&client, command).await,
        Command::Unwrap { wrap_token } => {
            print_json(&client.unwrap(wrap_token.as_deref()).await?)
        }
        Command::RevokeAccessor { accessor } => {
            client.revoke_accessor(&accessor).await?;
            println!("envelope revoked");
            Ok(())
        }
        Command::Rotate => {
            client.rotate().await?;
            println!("encryption key rotated");
            Ok(())
        }
        Command::KeyStatus => print_json(&client.key_status().await?),
    }
}

async fn unseal(client: &Client, reset: bool, shares: Vec<String>) -> eyre::Result<()> {
    let mut session = client.unseal();
    if reset {
        return print_json(&session.reset().await?);
    }

    let shares = if shares.is_empty() {
        read_lines_from_stdin()?
    } else {
        shares
    };
    if shares.is_empty() {
        bail!("no shares given on the command line or stdin");
    }

    let status = session.submit_shares(&shares).await?;
    if status.sealed {
        println!(
            "still sealed: {} of {} shares submitted",
            status.progress, status.threshold
        );
    } else {
        println!("service unsealed");
    }
    print_json(&status)
}

async fn rekey(client: &Client, command: RekeyCommand) -> eyre::Result<()> {
    let mut session = client.rekey();
    match command {
        RekeyCommand::Start {
            shares,
            threshold,
            backup,
        } => {
            let params = RekeyParams {
                secret_shares: shares,
                secret_threshold: threshold,
                backup,
            };
            print_json(&session.start(&params).await?)
        }
        RekeyCommand::Status => print_json(&session.status().await?),
        RekeyCommand::Submit { share, nonce } => {
            let update = session.submit_share(&share, nonce.as_deref()).await?;
            if update.complete {
                eprintln!(
                    "rekey complete: persist the keys below now; they cannot be retrieved again"
                );
                // The printed update carries the shares; the cached copy is
                // claimed so it is not reported as lost.
                let _ = session.take_result();
            }
            print_json(&update)
        }
        RekeyCommand::Cancel => {
            session.cancel().await?;
            println!("rekey round canceled");
            Ok(())
        }
        RekeyCommand::Backup => print_json(&session.read_backup().await?),
    }
}

async fn generate_root(client: &Client, command: GenerateRootCommand) -> eyre::Result<()> {
    let mut session = client.generate_root();
    match command {
        GenerateRootCommand::Start { otp, pgp_key } => {
            let mode = match (otp, pgp_key) {
                (Some(otp), None) => RootGenerationMode::Otp(otp),
                (None, Some(key)) => RootGenerationMode::PgpKey(key),
                _ => bail!("exactly one of --otp or --pgp-key is required"),
            };
            print_json(&session.start(mode).await?)
        }
        GenerateRootCommand::Status => print_json(&session.status().await?),
        GenerateRootCommand::Submit { share, nonce } => {
            let progress = session.submit_share(&share, nonce.as_deref()).await?;
            if progress.status.complete && progress.status.encoded_root_token.is_some() {
                eprintln!(
                    "round complete: decode with `sealkit generate-root decode <encoded_root_token> <otp>`"
                );
            }
            print_json(&progress.status)
        }
        GenerateRootCommand::Cancel => {
            session.cancel().await?;
            println!("root generation round canceled");
            Ok(())
        }
        GenerateRootCommand::Decode {
            encoded_root_token,
            otp,
        } => {
            let token = sealkit_core::decode_root_token(&encoded_root_token, &otp)?;
            println!("{}", token.expose_secret());
            Ok(())
        }
    }
}

fn read_lines_from_stdin() -> eyre::Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
