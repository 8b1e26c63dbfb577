use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};

use ykpiv_ssh_agent::{
    agent,
    api::{self, ManagementKey, Pin, ReaderName, SigningPolicy},
    ProvisioningRequest,
};

#[derive(Parser, Debug)]
#[command(name = "ykpiv-agent")]
#[command(about = "SSH agent backed by a YubiKey PIV slot", version)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the SSH agent on a Unix socket
    Serve {
        /// Socket path. Defaults to ~/.ssh/ykpiv-agent.sock
        #[arg(long)]
        socket: Option<PathBuf>,

        /// Yubikey to use. Defaults to the only key in the system, errors if <> 1 present
        #[arg(long)]
        reader: Option<String>,

        /// PIN for the PIV applet
        #[arg(long, default_value = "123456")]
        pin: Pin,
    },

    /// List yubikeys in system
    Readers,

    /// Init slot 9a for SSH operations
    Initialize {
        /// Yubikey to use. Defaults to the only key in the system, errors if <> 1 present
        #[arg(long)]
        reader: Option<String>,

        /// Initialize even if the slot is already initialized. This is destructive
        #[arg(long)]
        force: bool,

        /// Management key for the PIV applet (48 hex chars = 24 bytes)
        #[arg(long, default_value = "010203040506070801020304050607080102030405060708")]
        management_key: ManagementKey,
    },

    /// Print SSH format key
    PublicKey {
        /// Yubikey to use. Defaults to the only key in the system, errors if <> 1 present
        #[arg(long)]
        reader: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve {
            socket,
            reader,
            pin,
        } => {
            let socket = match socket {
                Some(socket) => socket,
                None => agent::default_socket_path()?,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime
                .block_on(api::serve_agent(&socket, reader.map(ReaderName::new), pin))
                .context("SSH agent stopped")?;
        }

        Commands::Readers => {
            let readers = api::readers().context("failed to list readers")?;
            for reader in readers {
                println!("{}", reader);
            }
        }

        Commands::Initialize {
            reader,
            force,
            management_key,
        } => {
            let request = ProvisioningRequest {
                reader: reader.map(ReaderName::new),
                management_key,
                force,
                policy: SigningPolicy::reference(),
            };
            api::initialize(&request).context("failed to initialize slot")?;
            println!("Slot initialized");
        }

        Commands::PublicKey { reader } => {
            let reader = reader.map(ReaderName::new);
            let line = api::public_key(reader.as_ref()).context("failed to read public key")?;
            println!("{}", line);
        }
    }

    Ok(())
}
