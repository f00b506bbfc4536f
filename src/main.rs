//! rcsync CLI - inspect paths, digests and targets, replay sync cycles

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rcsync::{
    hexdigest_named, Client, Config, Content, Error, IoResultExt, Matcher, Path, Receiver,
    ReplayTransport, TargetMap,
};

#[derive(Parser)]
#[command(name = "rcsync")]
#[command(about = "remote configuration sync engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// parse a config path and show its parts
    Path {
        /// path string, e.g. datadog/2/ASM/exclusion_filters/config
        path: String,
    },

    /// print the hex digest of a file
    Digest {
        /// file to hash
        file: PathBuf,

        /// hash algorithm (sha256, sha512)
        #[arg(short, long, default_value = "sha256")]
        algorithm: String,
    },

    /// check a payload file against its signed target
    Verify {
        /// signed targets document (json)
        #[arg(short, long)]
        targets: PathBuf,

        /// config path of the payload
        #[arg(short, long)]
        path: String,

        /// payload file
        file: PathBuf,
    },

    /// run one sync cycle per recorded agent response
    Replay {
        /// recorded response bodies, applied in order
        #[arg(required = true)]
        responses: Vec<PathBuf>,

        /// client configuration (toml)
        #[arg(short, long, env = "RCSYNC_CONFIG")]
        config: Option<PathBuf>,

        /// mark every changed config as applied
        #[arg(long)]
        ack: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> rcsync::Result<ExitCode> {
    match cli.command {
        Commands::Path { path } => {
            let p = Path::parse(&path)?;
            println!("source:    {}", p.source());
            if let Some(org_id) = p.org_id() {
                println!("org_id:    {}", org_id);
            }
            println!("product:   {}", p.product());
            println!("config_id: {}", p.config_id());
            println!("name:      {}", p.name());
        }

        Commands::Digest { file, algorithm } => {
            let mut f = File::open(&file).with_path(&file)?;
            println!("{}  {}", hexdigest_named(&algorithm, &mut f)?, file.display());
        }

        Commands::Verify {
            targets,
            path,
            file,
        } => {
            let raw = read(&targets)?;
            let map = TargetMap::from_slice(&raw)?;
            let p = Path::parse(&path)?;
            let target = map
                .get(&p)
                .ok_or_else(|| Error::Sync(format!("no target for path '{}'", p)))?;

            let content = Content::new(p.clone(), read(&file)?);
            if target.check(&content) {
                println!(
                    "ok {} (version {}, {} bytes)",
                    p,
                    target.version(),
                    content.length()
                );
            } else {
                println!("mismatch {}", p);
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Replay {
            responses,
            config,
            ack,
        } => {
            let config = match config {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            };

            let mut client = Client::new(config);
            if ack {
                client.register(Receiver::new(Matcher::Any, |repo, changes| {
                    for change in changes {
                        if let Some(content) = repo.content_mut(change.path()) {
                            content.applied();
                        }
                    }
                }));
            }

            let mut transport = ReplayTransport::from_files(&responses);
            let mut failed = false;
            for response in &responses {
                println!("# {}", response.display());
                match client.sync(&mut transport) {
                    Ok(changes) => {
                        for change in &changes {
                            println!("{}", change);
                        }
                    }
                    Err(e) => {
                        eprintln!("error: {}", e);
                        failed = true;
                    }
                }
            }

            println!("{}", client.payload().to_json()?);

            if failed {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read(path: &std::path::Path) -> rcsync::Result<Vec<u8>> {
    std::fs::read(path).with_path(path)
}
