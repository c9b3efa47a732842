use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use bepinex_manager_lib::core::cancel::{cancel_pair, CancelHandle};
use bepinex_manager_lib::core::config_files::ConfigStore;
use bepinex_manager_lib::core::discovery::{inspect_directory, GameDiscovery, GameRecord};
use bepinex_manager_lib::core::error::{ManagerError, ManagerResult};
use bepinex_manager_lib::core::launch::{launch_game, InstallationMonitor, MonitorOutcome};
use bepinex_manager_lib::core::plugins::{PluginListing, PluginManager};
use bepinex_manager_lib::core::setup::{FrameworkSetup, SetupOutcome};
use bepinex_manager_lib::core::state::AppState;

/// BepInEx Manager - find Unity games, install BepInEx, manage plugins
#[derive(Parser, Debug)]
#[command(name = "bepinex-manager")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print machine-readable JSON where a command has output
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan every launcher for installed Unity games
    Scan,
    /// Manage manually registered games
    Games {
        #[command(subcommand)]
        action: GamesAction,
    },
    /// Download and install the latest BepInEx into a game
    Install { game: String },
    /// Remove BepInEx from a game
    Uninstall { game: String },
    /// Start a game
    Launch { game: String },
    /// Start a game and wait for BepInEx to create its folders
    Verify { game: String },
    /// Manage plugin packages of a game
    Plugins {
        #[command(subcommand)]
        action: PluginsAction,
    },
    /// Read or write BepInEx config files of a game
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum GamesAction {
    /// Register a game directory by path
    Add { path: PathBuf },
}

#[derive(Subcommand, Debug)]
enum PluginsAction {
    List {
        game: String,
    },
    /// Add .dll or .zip files to a named package
    Add {
        game: String,
        package: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Enable {
        game: String,
        package: String,
        file: String,
    },
    Disable {
        game: String,
        package: String,
        file: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    List {
        game: String,
    },
    Show {
        game: String,
        name: String,
    },
    /// Replace a config file with the contents of --from, or stdin
    Write {
        game: String,
        name: String,
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    bepinex_manager_lib::init_tracing();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> ManagerResult<()> {
    let mut state = AppState::new()?;
    let json = args.json;

    match args.command {
        Command::Scan => {
            let catalog = GameDiscovery::for_host(&state.settings)
                .discover_async()
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
                return Ok(());
            }
            for game in catalog.iter() {
                println!(
                    "{:<40} {:<16} {:<28} {}{}",
                    game.name,
                    game.source,
                    game.platform_label(),
                    game.install_path.display(),
                    if game.framework_installed { "  [BepInEx]" } else { "" }
                );
            }
            for warning in &catalog.warnings {
                eprintln!("warning: {warning}");
            }
        }

        Command::Games {
            action: GamesAction::Add { path },
        } => {
            let record = inspect_directory(&path)?;
            if state.settings.add_manual_game(record.install_path.clone()) {
                state.save_settings()?;
            }
            println!("{} ({})", record.name, record.platform_label());
        }

        Command::Install { game } => {
            let record = resolve_game(&state, &game).await?;
            let (handle, signal) = cancel_pair();
            let watcher = tokio::spawn(cancel_on_ctrl_c(handle));

            let setup = FrameworkSetup::from_state(&state);
            let outcome = setup
                .install(&record.install_path, record.architecture, &signal, |pct| {
                    eprint!("\rDownloading... {pct:>3}%");
                })
                .await;
            watcher.abort();
            eprintln!();

            match outcome? {
                SetupOutcome::Installed { asset, report } => {
                    info!("Installed {} into {}", asset.name, record.name);
                    println!(
                        "Installed {} ({} loader files, payload replaced: {})",
                        asset.name,
                        report.loader_files.len(),
                        report.payload_replaced
                    );
                }
                SetupOutcome::Cancelled => println!("Cancelled"),
            }
        }

        Command::Uninstall { game } => {
            let record = resolve_game(&state, &game).await?;
            let report = FrameworkSetup::from_state(&state)
                .uninstall(&record.install_path)
                .await?;
            println!("Removed {} entries", report.removed.len());
        }

        Command::Launch { game } => {
            let record = resolve_game(&state, &game).await?;
            let pid = launch_game(&record.install_path)?;
            println!("Started {} (pid {pid})", record.name);
        }

        Command::Verify { game } => {
            let record = resolve_game(&state, &game).await?;
            let (handle, signal) = cancel_pair();
            let watcher = tokio::spawn(cancel_on_ctrl_c(handle));

            let monitor = InstallationMonitor::new(state.settings.monitor.clone());
            let outcome = monitor
                .monitor(
                    &record.install_path,
                    || launch_game(&record.install_path).map(|_| ()),
                    &signal,
                )
                .await;
            watcher.abort();

            match outcome? {
                MonitorOutcome::Confirmed { polls } => {
                    println!("BepInEx is working ({polls} checks)")
                }
                MonitorOutcome::TimedOut { polls } => {
                    println!("BepInEx folders did not appear after {polls} checks")
                }
                MonitorOutcome::Cancelled { .. } => println!("Cancelled"),
            }
        }

        Command::Plugins { action } => run_plugins(&state, action, json).await?,
        Command::Config { action } => run_config(&state, action, json).await?,
    }

    Ok(())
}

async fn run_plugins(state: &AppState, action: PluginsAction, json: bool) -> ManagerResult<()> {
    match action {
        PluginsAction::List { game } => {
            let manager = plugin_manager(state, &game).await?;
            let listing = manager.list_packages()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
                return Ok(());
            }
            match listing {
                PluginListing::Empty => println!("No plugins installed"),
                PluginListing::Packages(packages) => {
                    for package in packages {
                        println!("{}/", package.folder_name);
                        for file in package.files {
                            let mark = if file.enabled { "x" } else { " " };
                            println!("  [{mark}] {}", file.file_name);
                        }
                    }
                }
            }
        }
        PluginsAction::Add {
            game,
            package,
            files,
        } => {
            let manager = plugin_manager(state, &game).await?;
            let report = manager.install_package(&package, &files)?;
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            println!("{} DLL files installed to {}", report.placed.len(), package);
        }
        PluginsAction::Enable {
            game,
            package,
            file,
        } => {
            let manager = plugin_manager(state, &game).await?;
            let file = manager.set_enabled(&package, &file, true)?;
            println!("Enabled {}", file.file_name);
        }
        PluginsAction::Disable {
            game,
            package,
            file,
        } => {
            let manager = plugin_manager(state, &game).await?;
            let file = manager.set_enabled(&package, &file, false)?;
            println!("Disabled {}", file.file_name);
        }
    }
    Ok(())
}

async fn run_config(state: &AppState, action: ConfigAction, json: bool) -> ManagerResult<()> {
    match action {
        ConfigAction::List { game } => {
            let store = config_store(state, &game).await?;
            let files = store.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else {
                for file in files {
                    println!("{}", file.name);
                }
            }
        }
        ConfigAction::Show { game, name } => {
            let store = config_store(state, &game).await?;
            print!("{}", store.read(&name)?);
        }
        ConfigAction::Write { game, name, from } => {
            let store = config_store(state, &game).await?;
            let contents = match from {
                Some(path) => {
                    std::fs::read_to_string(&path).map_err(|e| ManagerError::io(path, e))?
                }
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            store.write(&name, &contents)?;
            println!("Saved {name}");
        }
    }
    Ok(())
}

async fn plugin_manager(state: &AppState, game: &str) -> ManagerResult<PluginManager> {
    let record = resolve_game(state, game).await?;
    Ok(PluginManager::for_game(&record.install_path))
}

async fn config_store(state: &AppState, game: &str) -> ManagerResult<ConfigStore> {
    let record = resolve_game(state, game).await?;
    Ok(ConfigStore::for_game(&record.install_path))
}

/// A game argument is either a directory or the name of a discovered game.
async fn resolve_game(state: &AppState, game: &str) -> ManagerResult<GameRecord> {
    let path = Path::new(game);
    if path.is_dir() {
        return inspect_directory(path);
    }

    let catalog = GameDiscovery::for_host(&state.settings)
        .discover_async()
        .await?;
    catalog
        .find(game)
        .cloned()
        .ok_or_else(|| ManagerError::Other(format!("no game named {game:?} found")))
}

/// Keeps `handle` alive until Ctrl-C, then cancels.
async fn cancel_on_ctrl_c(handle: CancelHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            eprintln!("\nCancelling...");
            handle.cancel();
        }
        Err(e) => {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
