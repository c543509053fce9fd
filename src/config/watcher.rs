//! Hot reload of the configuration file.
//!
//! Only `[rate_limit]` is applied to a running gateway. Edits confined to
//! other sections are logged and otherwise dropped here, so the server only
//! hears about reloads it can act on.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// What a new configuration means for a running gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadAction {
    Unchanged,
    /// Only sections that are fixed until restart differ.
    RestartRequired,
    /// Rate limits changed; `restart_also` marks other pending edits.
    Apply { restart_also: bool },
}

/// Classify the step from `current` to `next`.
pub fn reload_action(current: &GatewayConfig, next: &GatewayConfig) -> ReloadAction {
    let restart = current.listener != next.listener
        || current.handshake != next.handshake
        || current.session != next.session
        || current.security != next.security
        || current.timeouts != next.timeouts
        || current.observability != next.observability
        || current.console != next.console;

    if current.rate_limit != next.rate_limit {
        ReloadAction::Apply {
            restart_also: restart,
        }
    } else if restart {
        ReloadAction::RestartRequired
    } else {
        ReloadAction::Unchanged
    }
}

/// Watches one config file and forwards applicable reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    last: Mutex<GatewayConfig>,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration the gateway started with.
    pub fn new(path: &Path, current: GatewayConfig) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            last: Mutex::new(current),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Re-read the file and forward it if the gateway can apply it.
    pub fn reload(&self) -> ReloadAction {
        let next = match load_config(Some(&self.path)) {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                return ReloadAction::Unchanged;
            }
        };

        let Ok(mut last) = self.last.lock() else {
            return ReloadAction::Unchanged;
        };
        let action = reload_action(&last, &next);
        match action {
            ReloadAction::Unchanged => tracing::debug!("Config file touched without changes"),
            ReloadAction::RestartRequired => {
                tracing::warn!("Config changes outside [rate_limit] take effect after restart")
            }
            ReloadAction::Apply { restart_also } => {
                if restart_also {
                    tracing::warn!("Applying [rate_limit]; other changes take effect after restart");
                }
                if self.update_tx.send(next.clone()).is_err() {
                    tracing::debug!("Gateway no longer listening for config updates");
                }
            }
        }
        *last = next;
        action
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!("Config file change detected, reloading...");
                    self.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_reload_action() {
        let base = GatewayConfig::default();
        assert_eq!(reload_action(&base, &base.clone()), ReloadAction::Unchanged);

        let mut listener = base.clone();
        listener.listener.bind_address = "127.0.0.1:8080".into();
        assert_eq!(reload_action(&base, &listener), ReloadAction::RestartRequired);

        let mut limits = base.clone();
        limits.rate_limit.enabled = true;
        assert_eq!(
            reload_action(&base, &limits),
            ReloadAction::Apply { restart_also: false }
        );

        limits.session.idle_timeout_secs = 60;
        assert_eq!(
            reload_action(&base, &limits),
            ReloadAction::Apply { restart_also: true }
        );
    }

    #[test]
    fn test_reload_forwards_only_rate_limit_changes() {
        let path = std::env::temp_dir().join(format!("token-gateway-watch-{}.toml", std::process::id()));
        fs::write(&path, "").unwrap();
        let (watcher, mut updates) = ConfigWatcher::new(&path, GatewayConfig::default());

        assert_eq!(watcher.reload(), ReloadAction::Unchanged);

        fs::write(&path, "[session]\nidle_timeout_secs = 60\n").unwrap();
        assert_eq!(watcher.reload(), ReloadAction::RestartRequired);
        assert!(updates.try_recv().is_err());

        fs::write(&path, "[session]\nidle_timeout_secs = 60\n[rate_limit]\nenabled = true\n").unwrap();
        assert_eq!(watcher.reload(), ReloadAction::Apply { restart_also: false });
        assert!(updates.try_recv().unwrap().rate_limit.enabled);

        // An invalid file keeps the last good configuration.
        fs::write(&path, "[session]\ntoken_bytes = 1\n").unwrap();
        assert_eq!(watcher.reload(), ReloadAction::Unchanged);
        assert!(updates.try_recv().is_err());

        let _ = fs::remove_file(&path);
    }
}
