use panel::commands::display as commands;
use panel::config::{detect_paths, load_dotenv, load_messaging_config};
use panel::error::PanelError;
use panel::logger::initialize as LoggerInitialize;
use panel::services::{DisplayClient, DisplayService, display_contract};
use panel::state::PanelState;

use ipc_core::affinity::{ProcessContext, mark_process};
use ipc_core::{HostEndpoint, MemoryBus};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::sync::Arc;

use log::info;

#[tokio::main]
async fn main() -> Result<(), PanelError> {
    let dotenv_path = load_dotenv();
    let paths = detect_paths()?;

    create_dir_all(&paths.log_dir).map_err(|e| PanelError::Panel {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&paths.log_dir)?;

    info!("Control panel starting");
    if let Some(path) = dotenv_path {
        info!("Loaded .env from: {}", path.display());
    }
    info!(
        "Config directory: {} ({})",
        paths.config_dir.display(),
        paths.source
    );

    let config = load_messaging_config(&paths.config_dir)?;

    // Host and client share this process
    mark_process(ProcessContext::Host);
    mark_process(ProcessContext::Client);

    let contract = display_contract().map_err(|e| PanelError::Messaging {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let bus = MemoryBus::new();
    let host = HostEndpoint::construct(DisplayService::new, &contract, Arc::new(bus.host()))
        .map_err(|e| PanelError::Messaging {
            message: format!("Failed to bind display service: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let client = DisplayClient::connect(&contract, Arc::new(bus.connect()), &config).map_err(
        |e| PanelError::Messaging {
            message: format!("Failed to connect display client: {e}"),
            location: ErrorLocation::from(Location::caller()),
        },
    )?;

    let state = PanelState::new();
    state.connect(client).await;
    let watcher = commands::watch_brightness(&state).await?;

    info!("{}", commands::ping(&state).await?);
    let version = commands::service_version(&state).await?;
    info!(
        "Display service v{}.{}.{}, up {}",
        version.major,
        version.minor,
        version.patch,
        commands::uptime(&state).await?
    );

    info!("Brightness is {}%", commands::get_brightness(&state).await?);
    commands::set_brightness(&state, 80).await?;
    let faded = commands::fade_brightness(&state, vec![60, 40, 20]).await?;
    info!(
        "Faded to {faded}%, host reports {}%, panel mirror {}%",
        host.instance().brightness(),
        state.last_brightness()
    );

    commands::unwatch_brightness(&state, watcher).await?;
    state.disconnect().await;
    host.dispose();

    info!("Control panel stopped");
    Ok(())
}
