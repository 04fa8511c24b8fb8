//! Binary entrypoint for the tagforge CLI.
//!
//! Commands:
//! - `start` - run the service with the periodic display resync until ctrl-c
//! - `init` - create a starter `config.toml` and bootstrap the data documents
//! - `status` - print document counts and the data directory
//! - `title define|remove|list` - manage the title catalog
//! - `grant` / `revoke` / `activate` / `clear-title` - per-player title state
//! - `tag set|color|clear` - per-player custom tags
//! - `preview` - render markup through the configured palette
//!
//! The CLI is the host-side command gateway: arguments arrive already typed,
//! and domain failures are printed as the player-visible reply.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use tagforge::config::Config;
use tagforge::errors::TagError;
use tagforge::gradient;
use tagforge::titles::{spawn_resync, ConsoleCommandSink, TitleService};

#[derive(Parser)]
#[command(name = "tagforge")]
#[command(about = "Persistent player titles and gradient nametags for game servers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service with the periodic display resync loop
    Start {
        /// Override the resync interval from the config file (seconds)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Initialize a new configuration and bootstrap the data documents
    Init,
    /// Show document counts and the data directory
    Status,
    /// Manage the title catalog
    Title {
        #[command(subcommand)]
        command: TitleCommands,
    },
    /// Grant a title to a player
    Grant { player: String, title: String },
    /// Revoke a title from a player
    Revoke { player: String, title: String },
    /// Activate a title the player owns
    Activate { player: String, title: String },
    /// Clear the player's active title
    ClearTitle { player: String },
    /// Manage a player's custom tag
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Render markup through the configured palette and print the result
    Preview { text: String },
    /// Update the runtime configuration document
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum TitleCommands {
    /// Define a new title
    Define {
        id: String,
        /// Display template; may contain markup and the {player} placeholder
        template: String,
        /// Permission level the host requires for this title
        #[arg(short, long, default_value_t = 0)]
        level: u8,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Remove a title (profiles keep dangling references)
    Remove { id: String },
    /// List all titles in definition order
    List,
}

#[derive(Subcommand)]
enum TagCommands {
    /// Set a freeform tag (supports &g shorthand and &x color codes)
    Set { player: String, text: String },
    /// Re-color the current tag with an allowed color
    Color { player: String, color: String },
    /// Drop the custom tag
    Clear { player: String },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set the maximum custom tag length
    MaxTagLength { max: usize },
    /// Set the admin permission level used by host-side checks
    AdminLevel { level: u8 },
    /// Replace the gradient palette (color names or § codes, minimum 2)
    Palette { colors: Vec<String> },
    /// Add a color name to the allowed set
    AllowColor { name: String },
    /// Remove a color name from the allowed set
    DenyColor { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { interval } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting tagforge v{}", env!("CARGO_PKG_VERSION"));
            let service = open_service(&config)?;
            let secs = interval.unwrap_or(config.server.sync_interval_secs);
            let resync = spawn_resync(service.clone(), Duration::from_secs(secs.max(1)));
            info!("display resync every {}s; ctrl-c to stop", secs.max(1));

            tokio::signal::ctrl_c().await?;
            info!("shutting down");
            resync.shutdown().await;
        }
        Commands::Init => {
            info!("Initializing tagforge configuration");
            let config = Config::default();
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            // Opening the service bootstraps the default documents on disk.
            let service = open_service(&config)?;
            let status = service.status().await;
            info!(
                "Bootstrapped {} titles in {}/titles.json",
                status.titles, config.storage.data_dir
            );
        }
        Commands::Status => {
            let config = require_config(pre_config, &cli.config).await?;
            let service = open_service(&config)?;
            let status = service.status().await;
            println!("tagforge: {}", config.server.name);
            println!("  data dir:  {}", config.storage.data_dir);
            println!("  titles:    {}", status.titles);
            println!("  profiles:  {}", status.profiles);
            println!("  present:   {}", status.present);
            let runtime = service.runtime_config().await;
            println!("  max tag:   {} chars", runtime.max_tag_length);
            println!(
                "  palette:   {}",
                runtime.gradient_palette.join("")
            );
        }
        Commands::Title { command } => {
            let config = require_config(pre_config, &cli.config).await?;
            let service = open_service(&config)?;
            match command {
                TitleCommands::Define {
                    id,
                    template,
                    level,
                    description,
                } => reply(
                    service
                        .define_title(&id, &template, level, description, "console")
                        .await
                        .map(|_| format!("Title '{}' defined", id)),
                ),
                TitleCommands::Remove { id } => reply(
                    service
                        .remove_title(&id)
                        .await
                        .map(|_| format!("Title '{}' removed", id)),
                ),
                TitleCommands::List => {
                    for (id, def) in service.list_titles().await {
                        println!(
                            "{:<16} level {:<3} {}",
                            id,
                            def.required_permission_level,
                            def.description.as_deref().unwrap_or(&def.display_template)
                        );
                    }
                }
            }
        }
        Commands::Grant { player, title } => {
            let service = open_from(&pre_config, &cli.config).await?;
            reply(service.grant(&player, &title).await.map(|granted| {
                if granted {
                    format!("Granted '{}' to {}", title, player)
                } else {
                    format!("{} already owns '{}'", player, title)
                }
            }));
        }
        Commands::Revoke { player, title } => {
            let service = open_from(&pre_config, &cli.config).await?;
            reply(service.revoke(&player, &title).await.map(|revoked| {
                if revoked {
                    format!("Revoked '{}' from {}", title, player)
                } else {
                    format!("{} does not own '{}'", player, title)
                }
            }));
        }
        Commands::Activate { player, title } => {
            let service = open_from(&pre_config, &cli.config).await?;
            reply(
                service
                    .set_active(&player, &title)
                    .await
                    .map(|_| format!("{} now displays '{}'", player, title)),
            );
        }
        Commands::ClearTitle { player } => {
            let service = open_from(&pre_config, &cli.config).await?;
            reply(
                service
                    .clear_active(&player)
                    .await
                    .map(|_| format!("Cleared active title for {}", player)),
            );
        }
        Commands::Tag { command } => {
            let service = open_from(&pre_config, &cli.config).await?;
            match command {
                TagCommands::Set { player, text } => reply(
                    service
                        .set_custom_tag(&player, &text)
                        .await
                        .map(|stored| format!("Tag for {} set to: {}", player, stored)),
                ),
                TagCommands::Color { player, color } => reply(
                    service
                        .set_tag_color(&player, &color)
                        .await
                        .map(|tag| format!("Tag for {} recolored: {}", player, tag)),
                ),
                TagCommands::Clear { player } => reply(service.clear_custom_tag(&player).await.map(
                    |cleared| {
                        if cleared {
                            format!("Tag cleared for {}", player)
                        } else {
                            format!("{} has no custom tag", player)
                        }
                    },
                )),
            }
        }
        Commands::Preview { text } => {
            let service = open_from(&pre_config, &cli.config).await?;
            let runtime = service.runtime_config().await;
            println!(
                "{}",
                gradient::render_markup(&text, &runtime.gradient_palette)
            );
        }
        Commands::Config { command } => {
            let service = open_from(&pre_config, &cli.config).await?;
            match command {
                ConfigCommands::MaxTagLength { max } => reply(
                    service
                        .set_max_tag_length(max)
                        .await
                        .map(|_| format!("Max tag length set to {}", max)),
                ),
                ConfigCommands::AdminLevel { level } => reply(
                    service
                        .set_admin_permission_level(level)
                        .await
                        .map(|_| format!("Admin permission level set to {}", level)),
                ),
                ConfigCommands::Palette { colors } => reply(
                    service
                        .set_gradient_palette(&colors)
                        .await
                        .map(|_| "Gradient palette updated".to_string()),
                ),
                ConfigCommands::AllowColor { name } => {
                    reply(service.allow_color(&name).await.map(|added| {
                        if added {
                            format!("Color '{}' allowed", name)
                        } else {
                            format!("Color '{}' was already allowed", name)
                        }
                    }))
                }
                ConfigCommands::DenyColor { name } => {
                    reply(service.deny_color(&name).await.map(|removed| {
                        if removed {
                            format!("Color '{}' denied", name)
                        } else {
                            format!("Color '{}' was not allowed", name)
                        }
                    }))
                }
            }
        }
    }

    Ok(())
}

async fn require_config(pre: Option<Config>, path: &str) -> Result<Config> {
    match pre {
        Some(c) => Ok(c),
        None => Config::load(path).await,
    }
}

async fn open_from(pre: &Option<Config>, path: &str) -> Result<TitleService> {
    let config = match pre {
        Some(c) => c.clone(),
        None => Config::load(path).await?,
    };
    open_service(&config)
}

fn open_service(config: &Config) -> Result<TitleService> {
    let service = TitleService::open(
        Path::new(&config.storage.data_dir),
        &config.server.default_title,
        Box::new(ConsoleCommandSink),
    )?;
    Ok(service)
}

/// Print a success payload or the user-visible text of a domain failure.
fn reply(result: Result<String, TagError>) {
    match result {
        Ok(msg) => println!("{}", msg),
        Err(e) => println!("Error: {}", e),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(cfg) = config {
        if verbosity == 0 {
            if let Ok(level) = cfg.logging.level.parse() {
                builder.filter_level(level);
            }
        }
    }
    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    let opened = log_file.and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    });
    if let Some(f) = opened {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

        // If stdout is a TTY, mirror log lines to the console as well as the
        // file; when piped into a server console, keep stdout clean for the
        // display sink commands.
        let is_tty = atty::is(atty::Stream::Stdout);

        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());

            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }

            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
