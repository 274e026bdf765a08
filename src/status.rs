//! "Panel readable" status indicators

use std::path::PathBuf;

use thiserror::Error;

use crate::models;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub trait StatusIndicator: Send {
    /// Report whether the panel could be read in the last cycle
    fn set_readable(&mut self, readable: bool) -> Result<(), StatusError>;
}

/// Discards the status
#[derive(Default)]
pub struct Silent;

impl StatusIndicator for Silent {
    fn set_readable(&mut self, _readable: bool) -> Result<(), StatusError> {
        Ok(())
    }
}

/// Logs when the panel comes in and out of view
#[derive(Default)]
pub struct Log {
    readable: Option<bool>,
}

impl StatusIndicator for Log {
    fn set_readable(&mut self, readable: bool) -> Result<(), StatusError> {
        if self.readable != Some(readable) {
            if readable {
                info!("panel in view");
            } else {
                warn!("panel out of view");
            }

            self.readable = Some(readable);
        }

        Ok(())
    }
}

/// Drives an LED through the sysfs GPIO interface
///
/// The pin is expected to be exported and configured as an output already.
pub struct SysfsGpio {
    value_path: PathBuf,
    active_low: bool,
    readable: Option<bool>,
}

impl SysfsGpio {
    pub fn new(config: &models::Gpio) -> Self {
        Self {
            value_path: config
                .sysfs_root
                .join(format!("gpio{}", config.pin))
                .join("value"),
            active_low: config.active_low,
            readable: None,
        }
    }
}

impl StatusIndicator for SysfsGpio {
    fn set_readable(&mut self, readable: bool) -> Result<(), StatusError> {
        if self.readable == Some(readable) {
            return Ok(());
        }

        let level = readable != self.active_low;
        std::fs::write(&self.value_path, if level { "1" } else { "0" }).map_err(|source| {
            StatusError::Io {
                path: self.value_path.clone(),
                source,
            }
        })?;

        self.readable = Some(readable);
        Ok(())
    }
}

pub fn from_config(config: &models::Status) -> Box<dyn StatusIndicator> {
    match config {
        models::Status::None => Box::new(Silent),
        models::Status::Log => Box::new(Log::default()),
        models::Status::Gpio(gpio) => Box::new(SysfsGpio::new(gpio)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpio_dir(name: &str, pin: u32) -> PathBuf {
        let root = std::env::temp_dir().join(format!("panelvis-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(root.join(format!("gpio{}", pin))).unwrap();
        root
    }

    fn read_value(root: &std::path::Path, pin: u32) -> String {
        std::fs::read_to_string(root.join(format!("gpio{}/value", pin))).unwrap()
    }

    #[test]
    fn gpio_follows_readability() {
        let root = gpio_dir("gpio", 17);
        let mut status = SysfsGpio::new(&models::Gpio {
            pin: 17,
            active_low: false,
            sysfs_root: root.clone(),
        });

        status.set_readable(true).unwrap();
        assert_eq!(read_value(&root, 17), "1");
        status.set_readable(false).unwrap();
        assert_eq!(read_value(&root, 17), "0");

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn gpio_active_low() {
        let root = gpio_dir("gpio-low", 4);
        let mut status = SysfsGpio::new(&models::Gpio {
            pin: 4,
            active_low: true,
            sysfs_root: root.clone(),
        });

        status.set_readable(true).unwrap();
        assert_eq!(read_value(&root, 4), "0");

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn missing_gpio_is_an_error() {
        let mut status = SysfsGpio::new(&models::Gpio {
            pin: 3,
            active_low: false,
            sysfs_root: std::env::temp_dir().join("panelvis-no-such-gpio"),
        });

        assert!(matches!(
            status.set_readable(true),
            Err(StatusError::Io { .. })
        ));
        // Retried on the next cycle
        assert!(status.set_readable(true).is_err());
    }

    #[test]
    fn log_and_silent_never_fail() {
        let mut log = from_config(&models::Status::Log);
        let mut silent = from_config(&models::Status::None);

        for &readable in &[true, true, false] {
            log.set_readable(readable).unwrap();
            silent.set_readable(readable).unwrap();
        }
    }
}
