use crate::services::{CHANNEL, ServiceInfo};

use ipc_core::contract::{decode_args, encode_result};
use ipc_core::error::{CallError, ContractError};
use ipc_core::{ClassBindings, Contracted, Declaration, LocalEvent, bindings_for};

use std::sync::{Mutex, PoisonError};

use futures_util::FutureExt;
use log::{debug, info};
use serde_json::{Value, json};

pub const SERVICE_NAME: &str = "display";
pub const MAX_BRIGHTNESS: u8 = 100;
pub const DEFAULT_BRIGHTNESS: u8 = 50;

/// Host-side display control.
///
/// `brightness_changed` fires with the new level whenever the level actually
/// changes; setting the current level again is silent.
pub struct DisplayService {
    info: ServiceInfo,
    brightness: Mutex<u8>,
    pub brightness_changed: LocalEvent,
}

fn service_info(display: &DisplayService) -> &ServiceInfo {
    &display.info
}

impl DisplayService {
    pub fn new() -> Self {
        Self::with_brightness(DEFAULT_BRIGHTNESS)
    }

    pub fn with_brightness(level: u8) -> Self {
        Self {
            info: ServiceInfo::new(SERVICE_NAME, env!("CARGO_PKG_VERSION")),
            brightness: Mutex::new(level.min(MAX_BRIGHTNESS)),
            brightness_changed: LocalEvent::new(),
        }
    }

    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    pub fn brightness(&self) -> u8 {
        *self.brightness.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the brightness level.
    ///
    /// # Errors
    ///
    /// [`CallError::Argument`] for a level above [`MAX_BRIGHTNESS`].
    #[track_caller]
    pub fn set_level(&self, level: u8) -> Result<u8, CallError> {
        if level > MAX_BRIGHTNESS {
            return Err(CallError::argument(format!(
                "brightness {level} is above {MAX_BRIGHTNESS}"
            )));
        }

        let previous = {
            let mut brightness = self.brightness.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *brightness, level)
        };

        if previous == level {
            debug!("Brightness already at {level}%");
        } else {
            info!("Brightness {previous}% -> {level}%");
            self.brightness_changed.fire(vec![json!(level)]);
        }
        Ok(level)
    }

    async fn handle_ping(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        encode_result(format!(
            "pong from {} at {}%",
            self.info.name(),
            self.brightness()
        ))
    }

    async fn handle_set_brightness(&self, args: Vec<Value>) -> Result<Value, CallError> {
        let (level,): (u8,) = decode_args(args)?;
        encode_result(self.set_level(level)?)
    }

    fn handle_get_brightness(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        encode_result(self.brightness())
    }
}

impl Default for DisplayService {
    fn default() -> Self {
        Self::new()
    }
}

impl Contracted for DisplayService {
    fn declare_bindings() -> Result<ClassBindings<Self>, ContractError> {
        let base = bindings_for::<ServiceInfo>()?;

        ClassBindings::extending("DisplayService", &base, service_info)
            .with(Declaration::async_method(
                CHANNEL,
                "ping",
                |display: &DisplayService, args: Vec<Value>| display.handle_ping(args).boxed(),
            ))?
            .with(
                Declaration::async_method(
                    CHANNEL,
                    "set_brightness",
                    |display: &DisplayService, args: Vec<Value>| {
                        display.handle_set_brightness(args).boxed()
                    },
                )
                .named("setBrightness"),
            )?
            .with(
                Declaration::sync_method(
                    CHANNEL,
                    "get_brightness",
                    |display: &DisplayService, args| display.handle_get_brightness(args),
                )
                .named("getBrightness"),
            )?
            .with(
                Declaration::event_source(CHANNEL, "brightness_changed", |display: &DisplayService| {
                    display.brightness_changed.clone()
                })
                .named("brightnessChanged"),
            )
    }
}
