//! Keybase CLI application.
//!
//! Manages encrypted Ed25519 accounts in a JSON store file. Passphrases are
//! always prompted for, never taken from arguments.

use clap::{Parser, Subcommand};
use keybase::config::{KeybaseConfig, DEFAULT_LOG_FILTER, ENV_STORE_PATH};
use keybase::error::{KeybaseError, Result};
use keybase::Keybase;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "keybase")]
#[command(about = "Keybase: encrypted Ed25519 account vault", long_about = None)]
struct Cli {
    /// Store file path (default: ./keybase.json)
    #[arg(long, global = true, env = ENV_STORE_PATH)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account management operations
    #[command(subcommand)]
    Account(AccountCommands),
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Generate a new account
    Create,

    /// Import a 64-byte private key from a hex file
    Import {
        /// File containing the private key as hex
        #[arg(long)]
        file: PathBuf,
    },

    /// List all accounts
    List,

    /// Show one account
    Show {
        #[arg(long)]
        address: String,
    },

    /// Delete an account
    Delete {
        #[arg(long)]
        address: String,
    },

    /// Re-encrypt an account under a new passphrase
    UpdatePassphrase {
        #[arg(long)]
        address: String,
    },

    /// Export the raw private key as hex
    Export {
        #[arg(long)]
        address: String,

        /// Optional output file (if not specified, prints to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Sign a hex payload
    Sign {
        #[arg(long)]
        address: String,

        /// Payload as hex
        #[arg(long)]
        payload: String,
    },

    /// Verify a signature
    Verify {
        /// Public key as hex
        #[arg(long)]
        public_key: String,

        /// Payload as hex
        #[arg(long)]
        payload: String,

        /// Signature as hex
        #[arg(long)]
        signature: String,
    },

    /// Export an account as an armored portable private key
    ExportPpk {
        #[arg(long)]
        address: String,

        /// Hint stored in clear alongside the armored key
        #[arg(long, default_value = "")]
        hint: String,

        /// Optional output file (if not specified, prints to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import an armored portable private key
    ImportPpk {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = KeybaseConfig::from_env()?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let keybase = Keybase::from_config(&config)?;

    match cli.command {
        Commands::Account(cmd) => handle_account_command(&keybase, cmd).await,
    }
}

fn decode_hex(label: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim())
        .map_err(|e| KeybaseError::ParseError(format!("Invalid {} hex: {}", label, e)))
}

fn prompt_new_passphrase(prompt: &str) -> Result<String> {
    let passphrase = rpassword::prompt_password(prompt)?;
    let confirm = rpassword::prompt_password("Confirm passphrase: ")?;
    if passphrase != confirm {
        return Err(KeybaseError::ParseError(
            "Passphrases do not match".to_string(),
        ));
    }
    Ok(passphrase)
}

fn write_or_print(output: Option<PathBuf>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, contents)?;
            println!("Written to: {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}

async fn handle_account_command(keybase: &Keybase, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create => {
            let passphrase = prompt_new_passphrase("Enter passphrase to encrypt key: ")?;
            let account = keybase.create_account(&passphrase).await?;

            println!("Created account: {}", account.address_hex());
            println!("Public key: {}", account.public_key_hex());
            Ok(())
        }

        AccountCommands::Import { file } => {
            let contents = fs::read_to_string(&file)?;
            let private_key = zeroize::Zeroizing::new(decode_hex("private key", &contents)?);

            let passphrase = prompt_new_passphrase("Enter passphrase to encrypt key: ")?;
            let account = keybase.import_account(&private_key, &passphrase).await?;

            println!("Imported account: {}", account.address_hex());
            println!("Public key: {}", account.public_key_hex());
            Ok(())
        }

        AccountCommands::List => {
            let accounts = keybase.list_accounts().await?;

            if accounts.is_empty() {
                println!("No accounts found in keybase.");
            } else {
                println!("{:<40}  Public Key", "Address");
                println!("{}", "-".repeat(106));
                for account in accounts {
                    println!("{:<40}  {}", account.address_hex(), account.public_key_hex());
                }
            }
            Ok(())
        }

        AccountCommands::Show { address } => {
            let account = keybase.get_account(&address).await?;
            println!("Address: {}", account.address_hex());
            println!("Public key: {}", account.public_key_hex());
            Ok(())
        }

        AccountCommands::Delete { address } => {
            let passphrase = rpassword::prompt_password("Enter passphrase to decrypt key: ")?;
            keybase.delete_account(&address, &passphrase).await?;

            println!("Deleted account: {}", address);
            Ok(())
        }

        AccountCommands::UpdatePassphrase { address } => {
            let old = rpassword::prompt_password("Enter current passphrase: ")?;
            let new = prompt_new_passphrase("Enter new passphrase: ")?;
            keybase.update_account_passphrase(&address, &old, &new).await?;

            println!("Updated passphrase for: {}", address);
            Ok(())
        }

        AccountCommands::Export { address, output } => {
            let passphrase = rpassword::prompt_password("Enter passphrase to decrypt key: ")?;
            let private_key = zeroize::Zeroizing::new(
                keybase.export_account(&address, &passphrase).await?,
            );

            write_or_print(output, &hex::encode(private_key.as_slice()))
        }

        AccountCommands::Sign { address, payload } => {
            let payload = decode_hex("payload", &payload)?;
            let passphrase = rpassword::prompt_password("Enter passphrase to decrypt key: ")?;
            let signature = keybase.sign(&address, &passphrase, &payload).await?;

            println!("{}", hex::encode(signature));
            Ok(())
        }

        AccountCommands::Verify {
            public_key,
            payload,
            signature,
        } => {
            let valid = Keybase::verify_signature(
                &decode_hex("public key", &public_key)?,
                &decode_hex("payload", &payload)?,
                &decode_hex("signature", &signature)?,
            );

            if valid {
                println!("✓ Signature is valid");
                Ok(())
            } else {
                Err(KeybaseError::CryptoError(
                    "Signature verification failed".to_string(),
                ))
            }
        }

        AccountCommands::ExportPpk {
            address,
            hint,
            output,
        } => {
            let passphrase = rpassword::prompt_password("Enter passphrase to decrypt key: ")?;
            let ppk_passphrase = prompt_new_passphrase("Enter passphrase for the exported key: ")?;
            let ppk = keybase
                .export_ppk(&address, &passphrase, &ppk_passphrase, &hint)
                .await?;

            write_or_print(output, &ppk)
        }

        AccountCommands::ImportPpk { file } => {
            let ppk = fs::read_to_string(&file)?;
            let ppk_passphrase = rpassword::prompt_password("Enter passphrase of the PPK file: ")?;
            let passphrase = prompt_new_passphrase("Enter passphrase to encrypt key: ")?;
            let account = keybase.import_ppk(&ppk, &ppk_passphrase, &passphrase).await?;

            println!("Imported account: {}", account.address_hex());
            println!("Public key: {}", account.public_key_hex());
            Ok(())
        }
    }
}
