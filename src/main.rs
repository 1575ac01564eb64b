use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use mongo_profiles::cli::{Cli, Commands, ConfigCommands};
use mongo_profiles::commands::{
    AddArgs, handle_add, handle_config_generate, handle_config_show, handle_databases, handle_default,
    handle_export, handle_import, handle_list, handle_remove, handle_show, handle_test,
};
use mongo_profiles::utils::format_error;
use mongo_profiles::{Config, ConnectionManager, ProfileStore, Result};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", format_error(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.config.config_dir {
        config.config_dir = dir;
        config.settings = Config::load_settings(&config.settings_path())?;
    }

    let Some(command) = cli.command else {
        // No subcommand: show help
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // Config commands never touch the profiles file
    if let Commands::Config { command } = &command {
        return match command {
            ConfigCommands::Generate { overwrite } => handle_config_generate(&config, *overwrite),
            ConfigCommands::Show => {
                handle_config_show(&config);
                Ok(())
            }
        };
    }

    let store = ProfileStore::open(&config);

    match command {
        Commands::List => handle_list(&store).await,
        Commands::Show { name } => handle_show(&store, &name).await,
        Commands::Add {
            name,
            uri,
            database,
            alias,
            tags,
            env,
            description,
            default,
        } => {
            handle_add(
                &store,
                AddArgs {
                    name,
                    uri,
                    database,
                    alias,
                    tags,
                    env,
                    description,
                    default,
                },
            )
            .await
        }
        Commands::Remove { name } => handle_remove(&store, &name).await,
        Commands::Default { name } => handle_default(&store, name).await,
        Commands::Test { name, all } => {
            let manager = ConnectionManager::with_mongo(config.manager_config());
            let result = handle_test(&store, &manager, name, all).await;
            manager.cleanup().await;
            result
        }
        Commands::Databases { name, collections } => {
            let manager = ConnectionManager::with_mongo(config.manager_config());
            let result = handle_databases(&store, &manager, name, collections).await;
            manager.cleanup().await;
            result.map(|_| ())
        }
        Commands::Export { output } => handle_export(&store, output).await,
        Commands::Import { file } => handle_import(&store, &file).await,
        Commands::Config { .. } => Ok(()),
    }
}
