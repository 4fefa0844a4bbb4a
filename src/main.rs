use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod domain;
mod application;
mod infrastructure;
mod plugins;

use application::errors::BotError;
use application::messaging::{CommandParser, Dispatcher, LoadingTracker, Notices};
use application::services::{BotRuntime, Shutdown};
use domain::traits::{Bot, UpdateSource};
use infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use infrastructure::config::Config;
use infrastructure::plugins::{FileWatcher, PluginLoader, PluginRegistry};
use plugins::{HandlerFactory, PluginEnv};

#[derive(Parser)]
#[command(name = "cocoa-bot")]
#[command(about = "Telegram bot with hot-reloadable command plugins", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Bot token (overrides config and BOT_TOKEN)
    #[arg(short, long, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (default)
    Run,
    /// Load the plugin directory once and list what it provides
    Check,
    /// Show version
    Version,
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let code = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Check => check_plugins(&cli.config, cli.token),
        Commands::Version => {
            println!("cocoa-bot v{}", env!("CARGO_PKG_VERSION"));
            0
        }
        Commands::InitConfig { force } => init_config(&cli.config, force),
    };

    std::process::exit(code);
}

fn load_config(config_path: &Path, token_override: Option<String>) -> Option<Config> {
    match Config::resolve(config_path) {
        Ok(mut config) => {
            if let Some(token) = token_override {
                config.telegram.token = Some(token);
            }
            Some(config)
        }
        Err(e) => {
            tracing::error!("Invalid configuration in {}: {}", config_path.display(), e);
            None
        }
    }
}

fn build_registry(config: &Config) -> Arc<PluginRegistry> {
    let env = PluginEnv::new(config.bot.name.clone(), config.plugins.directory.clone())
        .with_owners(config.owners.clone())
        .with_media_error(config.messages.media_error.clone());
    let loader = PluginLoader::new(
        config.plugins.directory.clone(),
        config.plugin_extension(),
        HandlerFactory::new(env),
    );
    Arc::new(PluginRegistry::new(loader))
}

fn run_bot(config_path: &Path, token_override: Option<String>) -> i32 {
    let Some(config) = load_config(config_path, token_override) else {
        return 1;
    };

    tracing::info!("Starting cocoa-bot: {}", config.bot.name);

    let registry = build_registry(&config);
    registry.reload();
    tracing::info!("{} command(s) registered", registry.len());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            return 1;
        }
    };

    match rt.block_on(serve(config, config_path.to_path_buf(), registry)) {
        Ok(Shutdown::CoreFileChanged(path)) => {
            tracing::info!("Exiting for restart after change to {}", path.display());
            0
        }
        Ok(Shutdown::SourceClosed) => {
            tracing::info!("Input closed, bye");
            0
        }
        Ok(Shutdown::Interrupted) => 0,
        Err(e) => {
            tracing::error!("Failed to start bot: {}", e);
            1
        }
    }
}

async fn serve(config: Config, config_path: PathBuf, registry: Arc<PluginRegistry>) -> Result<Shutdown, BotError> {
    let (bot, source): (Arc<dyn Bot>, Arc<dyn UpdateSource>) = match config.token() {
        Some(token) => {
            let mut telegram = TelegramAdapter::new(token).with_poll_timeout(config.telegram.poll_timeout_secs);
            telegram.fetch_bot_info().await?;
            let telegram = Arc::new(telegram);
            (telegram.clone() as Arc<dyn Bot>, telegram as Arc<dyn UpdateSource>)
        }
        None => {
            tracing::info!("No bot token configured, starting console bot (dev mode)");
            let console = Arc::new(ConsoleAdapter::new());
            (console.clone() as Arc<dyn Bot>, console as Arc<dyn UpdateSource>)
        }
    };

    let info = bot.bot_info();
    tracing::info!(id = %info.id, "Bot started: {} (@{})", info.name, info.username);

    let messages = &config.messages;
    let dispatcher = Dispatcher::new(bot, Arc::clone(&registry))
        .with_parser(CommandParser::new(config.prefix()))
        .with_loading(LoadingTracker::new(messages.loading.clone(), messages.loading_done.clone()))
        .with_notices(Notices {
            command_error: messages.command_error.clone(),
            callback_error: messages.callback_error.clone(),
        });
    dispatcher.publish_commands().await;

    let mut runtime = BotRuntime::new(dispatcher, source);

    if config.watcher.enabled {
        let mut watcher = FileWatcher::new(registry.plugin_dir(), config.plugin_extension());
        watcher.watch_core_file(config_path);
        match std::env::current_exe() {
            Ok(exe) => watcher.watch_core_file(exe),
            Err(e) => tracing::warn!("Cannot locate own executable, not watching it: {}", e),
        }
        let interval = Duration::from_millis(config.watcher.poll_interval_ms);
        runtime = runtime.with_watcher(watcher.spawn(interval));
    } else {
        tracing::info!("File watcher disabled, plugins load once");
    }

    Ok(runtime.run().await)
}

fn check_plugins(config_path: &Path, token_override: Option<String>) -> i32 {
    let Some(config) = load_config(config_path, token_override) else {
        return 1;
    };

    let registry = build_registry(&config);
    registry.reload();
    let generation = registry.snapshot();

    println!("Plugin directory: {}", registry.plugin_dir().display());
    if generation.is_empty() {
        println!("  (no plugins loaded)");
    }
    for plugin in generation.plugins() {
        let commands: Vec<String> = plugin
            .handler
            .commands()
            .iter()
            .filter(|c| generation.lookup(c).is_some_and(|h| Arc::ptr_eq(&h, &plugin.handler)))
            .map(|c| format!("{}{}", config.prefix(), c.to_lowercase()))
            .collect();
        let tags = plugin.handler.tags();
        if tags.is_empty() {
            println!("  {}: {}", plugin.file, commands.join(", "));
        } else {
            println!("  {}: {} [{}]", plugin.file, commands.join(", "), tags.join(", "));
        }
    }
    println!("{} command(s) registered", generation.command_count());
    0
}

fn init_config(config_path: &Path, force: bool) -> i32 {
    if config_path.exists() && !force {
        eprintln!("{} already exists, use --force to overwrite", config_path.display());
        return 1;
    }

    let yaml = match Config::default().to_yaml() {
        Ok(yaml) => yaml,
        Err(e) => {
            eprintln!("Failed to render config: {}", e);
            return 1;
        }
    };

    if let Err(e) = std::fs::write(config_path, yaml) {
        eprintln!("Failed to write {}: {}", config_path.display(), e);
        return 1;
    }
    println!("Wrote default config to {}", config_path.display());
    0
}
