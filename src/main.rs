use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use sereto_crypt::{
    ArchiveCipher, Config, CredentialBackend, KdfParams, Password, credential,
    select_credential_store,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 memory cost in KiB (default: 1048576)
    #[arg(long = "argon-mem")]
    memory_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations (default: 4)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 parallelism (default: 8)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,
}

impl Argon2Args {
    fn to_kdf_params(&self, base: KdfParams) -> sereto_crypt::Result<KdfParams> {
        KdfParams::new(
            self.memory_cost_kib.unwrap_or(base.memory_cost_kib()),
            self.time_cost.unwrap_or(base.time_cost()),
            self.parallelism.unwrap_or(base.parallelism()),
        )
    }
}

#[derive(Debug, Parser)]
#[command(name = "sereto-crypt")]
#[command(
    version,
    about = "Encrypts and decrypts SeReTo project source archives."
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, value_name = "PATH", env = "SERETO_CONFIG")]
    config: Option<PathBuf>,

    /// Where the archive password is kept: auto, os or file
    #[arg(long, global = true, value_name = "BACKEND", env = "SERETO_CREDENTIAL_BACKEND")]
    credential_backend: Option<CredentialBackend>,

    /// Path of the plaintext credential file
    #[arg(long, global = true, value_name = "PATH", env = "SERETO_CREDENTIAL_FILE")]
    credential_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts an archive into a .sereto file
    #[command(arg_required_else_help = true)]
    Encrypt {
        file: PathBuf,

        /// Keep the plaintext archive
        #[arg(long, default_value_t = false)]
        keep_original: bool,

        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Decrypts a .sereto file into a .tgz archive
    #[command(arg_required_else_help = true)]
    Decrypt {
        file: PathBuf,

        /// Remove the .sereto file after decryption
        #[arg(long, default_value_t = false)]
        delete_original: bool,
    },

    /// Manages the archive encryption password
    #[command(subcommand)]
    Password(PasswordCommands),
}

#[derive(Debug, Subcommand)]
enum PasswordCommands {
    /// Stores a new archive encryption password
    Set,

    /// Shows whether a usable password is stored
    Status,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Cli::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(backend) = args.credential_backend {
        config.credential_backend = backend;
    }
    if let Some(path) = args.credential_file {
        config.credential_file = path;
    }

    let credentials = select_credential_store(config.credential_backend, &config.credential_file)?;

    match args.command {
        Commands::Encrypt {
            file,
            keep_original,
            argon2,
        } => {
            let kdf = argon2.to_kdf_params(config.kdf)?;
            let cipher = ArchiveCipher::from_config(&config, credentials).with_kdf(kdf);
            let output = cipher
                .encrypt_file(&file, keep_original)
                .with_context(|| format!("failed to encrypt '{}'", file.display()))?;
            println!("encrypted archive written to '{}'", output.display());
        }
        Commands::Decrypt {
            file,
            delete_original,
        } => {
            let cipher = ArchiveCipher::from_config(&config, credentials);
            let output = cipher
                .decrypt_file(&file, !delete_original)
                .with_context(|| format!("failed to decrypt '{}'", file.display()))?;
            println!("decrypted archive written to '{}'", output.display());
        }
        Commands::Password(PasswordCommands::Set) => {
            let password = Password::new(auth::read_new_password_with_confirmation()?.as_str())?;
            credentials.set_secret(credential::SERVICE, credential::ACCOUNT, password.expose())?;
            println!("password stored in {}", credentials.name());
        }
        Commands::Password(PasswordCommands::Status) => {
            let secure = if credentials.is_secure() {
                "secure"
            } else {
                "insecure"
            };
            match credentials.get_secret(credential::SERVICE, credential::ACCOUNT)? {
                Some(secret) => match Password::new(secret.as_str()) {
                    Ok(_) => println!(
                        "password configured ({}, {secure})",
                        credentials.name()
                    ),
                    Err(e) => println!("stored password is unusable: {e}"),
                },
                None => println!("no password configured ({}, {secure})", credentials.name()),
            }
        }
    }

    Ok(())
}
