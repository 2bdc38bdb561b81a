use crate::error::PanelError;
use crate::services::{DisplayClient, ServiceVersion};
use crate::state::PanelState;

use ipc_core::error::CallError;
use ipc_core::transport::ListenerId;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;

use log::{debug, error, info, warn};

#[track_caller]
fn not_connected() -> PanelError {
    PanelError::NotConnected {
        message: String::from("No display client connected"),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[track_caller]
fn call_failed(operation: &str, e: CallError) -> PanelError {
    error!("{operation} failed: {e}");
    PanelError::Call {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

async fn connected(state: &PanelState) -> Result<Arc<DisplayClient>, PanelError> {
    state.display().await.ok_or_else(|| {
        warn!("Display command without a connected client");
        not_connected()
    })
}

/// Ask the display service whether it is alive.
///
/// # Returns
///
/// * `Ok(String)` - The service's pong
/// * `Err(PanelError)` - Not connected, or the call failed
pub async fn ping(state: &PanelState) -> Result<String, PanelError> {
    let display = connected(state).await?;
    let pong = display
        .ping()
        .await
        .map_err(|e| call_failed("Ping", e))?;
    debug!("Ping answered: {pong}");
    Ok(pong)
}

pub async fn service_version(state: &PanelState) -> Result<ServiceVersion, PanelError> {
    let display = connected(state).await?;
    display.version().map_err(|e| call_failed("Version query", e))
}

pub async fn uptime(state: &PanelState) -> Result<String, PanelError> {
    let display = connected(state).await?;
    display.uptime().map_err(|e| call_failed("Uptime query", e))
}

pub async fn get_brightness(state: &PanelState) -> Result<u8, PanelError> {
    let display = connected(state).await?;
    let level = display
        .brightness()
        .map_err(|e| call_failed("Brightness query", e))?;
    state.record_brightness(level);
    Ok(level)
}

pub async fn set_brightness(state: &PanelState, level: u8) -> Result<u8, PanelError> {
    let display = connected(state).await?;
    info!("Setting brightness to {level}%");
    let level = display
        .set_brightness(level)
        .await
        .map_err(|e| call_failed("Set brightness", e))?;
    state.record_brightness(level);
    Ok(level)
}

/// Step through `levels` in one batch.
///
/// Every step must succeed; the first failed step is reported.
pub async fn fade_brightness(state: &PanelState, levels: Vec<u8>) -> Result<u8, PanelError> {
    let display = connected(state).await?;
    info!("Fading brightness through {levels:?}");

    let mut last = state.last_brightness();
    for result in display.fade(&levels).await? {
        last = result.map_err(|e| call_failed("Fade step", e))?;
    }
    state.record_brightness(last);
    Ok(last)
}

/// Mirror brightness changes pushed by the host into the panel state.
pub async fn watch_brightness(state: &PanelState) -> Result<ListenerId, PanelError> {
    let display = connected(state).await?;
    let mirror = state.clone();
    display
        .on_brightness_changed(move |level| {
            debug!("Host reports brightness {level}%");
            mirror.record_brightness(level);
        })
        .map_err(|e| call_failed("Brightness subscription", e))
}

pub async fn unwatch_brightness(state: &PanelState, id: ListenerId) -> Result<bool, PanelError> {
    let display = connected(state).await?;
    Ok(display.off_brightness_changed(id))
}
