//! Command-line interface for the host simulator.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use psu_webadmin::adapters::NorFlashStorage;
use psu_webadmin::domain::{BootImage, StorageLayout, UpgradeSubsystem};
use psu_webadmin::infrastructure::{
    Exchange, LoopbackConfig, LoopbackServer, Outcome, Response, SimRelay,
};
use psu_webadmin::{Tick, WebAdmin};

use crate::file_flash::FileFlash;
use crate::host::{HostSystem, JsonParamStore, StagedUpgrade};

/// Free heap the simulated chip reports.
const FREE_HEAP: u32 = 40 * 1024;

/// Virtual time skipped per timer step when settling deferred actions.
const TICK_MS: u32 = 20;

type Admin =
    WebAdmin<NorFlashStorage<FileFlash>, StagedUpgrade, SimRelay, HostSystem, JsonParamStore>;

#[derive(Parser)]
#[command(name = "psu-sim")]
#[command(about = "Run the relay's web admin handlers against a flash image", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Flash image file (created erased if missing)
    #[arg(short, long, default_value = "flash.img", global = true)]
    pub image: PathBuf,

    /// Parameter record file
    #[arg(long, default_value = "params.json", global = true)]
    pub params: PathBuf,

    /// Flash map preset locating the page region
    #[arg(long, value_enum, default_value_t = FlashMap::Map2, global = true)]
    pub map: FlashMap,

    /// Transport chunk size in bytes
    #[arg(long, default_value_t = 1024, global = true)]
    pub chunk: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replace the stored page (POST /)
    Store {
        /// Compressed page to store
        file: PathBuf,
    },
    /// Serve the stored page (GET /)
    Serve {
        /// Write the page here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stage a firmware image and reboot into it (UPGRADE /firmware)
    Upgrade {
        /// Firmware image
        firmware: PathBuf,

        /// Where the staged image is written
        #[arg(long, default_value = "firmware.staged")]
        staged: PathBuf,
    },
    /// Set parameters, e.g. `set zone=lab name=bench` (POST /params)
    Set {
        /// `field=value` pairs; a bare `field` clears it
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Print the parameter record (GET /params.json)
    Params,
    /// Print the status record (GET /status.json)
    Status,
    /// Print the system summary (INFO /)
    Info,
    /// Switch the relay (ON / or OFF /)
    Power {
        #[arg(value_enum)]
        state: PowerState,
    },
    /// Reboot into the other firmware slot (TOGGLE /boots)
    Toggle,
    /// Restart (REBOOT /)
    Reboot,
}

/// Flash map presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlashMap {
    /// 1MB flash, 512KB + 512KB images
    Map2,
    /// 4MB flash, 512KB + 512KB images
    Map4,
    /// 4MB flash, 1024KB + 1024KB images
    Map6,
}

impl FlashMap {
    fn layout(self) -> StorageLayout {
        match self {
            Self::Map2 => StorageLayout::MAP2,
            Self::Map4 => StorageLayout::MAP4,
            Self::Map6 => StorageLayout::MAP6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

pub fn run(cli: Cli) -> Result<()> {
    let layout = cli.map.layout();
    let server = LoopbackServer::new(LoopbackConfig::default().with_chunk(cli.chunk));
    let staged = match &cli.command {
        Commands::Upgrade { staged, .. } => staged.clone(),
        _ => PathBuf::from("firmware.staged"),
    };
    let mut admin = open(&cli, layout, staged)?;

    match cli.command {
        Commands::Store { file } => {
            let body =
                fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let exchange = request(&server, &mut admin, "POST", "/", &body)?;
            print_text(&exchange);
            log::info!("Stored {} bytes from {}", body.len(), file.display());
        }
        Commands::Serve { output } => {
            let exchange = request(&server, &mut admin, "GET", "/", b"")?;
            let body = exchange.response.map(|r| r.body).unwrap_or_default();
            match output {
                Some(path) => fs::write(&path, &body)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => io::stdout()
                    .write_all(&body)
                    .context("Failed to write page to stdout")?,
            }
        }
        Commands::Upgrade { firmware, .. } => {
            let image = fs::read(&firmware)
                .with_context(|| format!("Failed to read {}", firmware.display()))?;
            let exchange = request(&server, &mut admin, "UPGRADE", "/firmware", &image)?;
            print_text(&exchange);
            settle(&mut admin);
            println!(
                "Staged {} bytes at {}, running {}",
                admin.upgrade().staged(),
                admin.upgrade().path().display(),
                running_image(&admin)
            );
        }
        Commands::Set { fields } => {
            let body = fields.join("&");
            let exchange = request(&server, &mut admin, "POST", "/params", body.as_bytes())?;
            print_text(&exchange);
            settle(&mut admin);
        }
        Commands::Params => {
            print_text(&request(&server, &mut admin, "GET", "/params.json", b"")?);
        }
        Commands::Status => {
            print_text(&request(&server, &mut admin, "GET", "/status.json", b"")?);
        }
        Commands::Info => print_text(&request(&server, &mut admin, "INFO", "/", b"")?),
        Commands::Power { state } => {
            let verb = match state {
                PowerState::On => "ON",
                PowerState::Off => "OFF",
            };
            let exchange = request(&server, &mut admin, verb, "/", b"")?;
            if let Some(response) = exchange.response.as_ref() {
                println!("{}", response.status);
            }
            settle(&mut admin);
        }
        Commands::Toggle => {
            print_text(&request(&server, &mut admin, "TOGGLE", "/boots", b"")?);
            settle(&mut admin);
            println!("Running {}", running_image(&admin));
        }
        Commands::Reboot => {
            print_text(&request(&server, &mut admin, "REBOOT", "/", b"")?);
            settle(&mut admin);
        }
    }

    Ok(())
}

fn open(cli: &Cli, layout: StorageLayout, staged: PathBuf) -> Result<Admin> {
    let capacity = layout.region_address().value() as usize + layout.region_capacity();
    let flash = FileFlash::open(&cli.image, capacity)
        .with_context(|| format!("Failed to open flash image {}", cli.image.display()))?;
    let storage = NorFlashStorage::new(flash, layout.sector_size())
        .context("Flash geometry does not match the layout")?;

    let store = JsonParamStore::new(&cli.params);
    let params = store.load()?;

    Ok(WebAdmin::new(
        storage,
        StagedUpgrade::new(staged, BootImage::User1),
        SimRelay::new(),
        HostSystem::new(FREE_HEAP),
        store,
        params,
    )
    .with_layout(layout))
}

fn request(
    server: &LoopbackServer,
    admin: &mut Admin,
    verb: &str,
    path: &str,
    body: &[u8],
) -> Result<Exchange> {
    let exchange = server.request(admin, verb, path, body);
    log::debug!(
        "{} {}: {:?} after {} calls, {} sends, {} unholds",
        verb,
        path,
        exchange.outcome,
        exchange.calls,
        exchange.sent_callbacks,
        exchange.unholds
    );

    match &exchange.outcome {
        Outcome::Completed => Ok(exchange),
        Outcome::Failed(e) => bail!("{} {} failed: {} (code {})", verb, path, e, e.code()),
        Outcome::NotFound => bail!("{} {}: no such route", verb, path),
        Outcome::Disconnected => bail!("{} {}: connection dropped", verb, path),
        Outcome::Stalled => bail!("{} {}: transfer stalled", verb, path),
    }
}

/// Run the status timer to the end of its pattern, skipping the wait.
fn settle(admin: &mut Admin) {
    loop {
        let now = admin.system().now_ms();
        match admin.tick(now) {
            Tick::Idle => break,
            Tick::Blink { .. } => admin.system_mut().advance(TICK_MS),
            Tick::Done(action) => {
                if let Some(action) = action {
                    log::info!("Ran deferred {:?}", action);
                }
                if admin.system().restart_requested() {
                    println!("Restarted");
                }
                break;
            }
        }
    }
}

fn print_text(exchange: &Exchange) {
    if let Some(Response { status, body, .. }) = exchange.response.as_ref() {
        match std::str::from_utf8(body) {
            Ok(text) if !text.is_empty() => print!("{}", text.trim_end_matches("\r\n")),
            _ => print!("{}", status),
        }
        println!();
    }
}

fn running_image(admin: &Admin) -> BootImage {
    admin.upgrade().running_image()
}
