//! CLI command implementations

pub mod code;
pub mod create;
pub mod join;

use std::path::Path;

use anyhow::{bail, Context, Result};
use rendezvous_lib::transport::{config_from_env, HttpTransportConfig};
use rendezvous_lib::{
    RendezvousAlgorithm, RendezvousInvite, RendezvousService, RendezvousTransport,
    VerificationCode,
};

use crate::ui;

/// Global flags shared by the session commands.
pub struct SessionOptions {
    pub server: Option<String>,
    pub legacy: bool,
    pub assume_yes: bool,
    pub verbose: bool,
}

impl SessionOptions {
    /// Algorithm to create rendezvous with.
    pub fn algorithm(&self) -> RendezvousAlgorithm {
        if self.legacy {
            RendezvousAlgorithm::V1
        } else {
            RendezvousAlgorithm::V2
        }
    }

    /// Transport configuration from `--server` and the environment.
    ///
    /// `--server` wins over `RENDEZVOUS_SERVER_URL`; timeouts always come from
    /// the environment when set.
    pub fn transport_config(&self) -> Result<HttpTransportConfig> {
        transport_config(self.server.as_deref(), config_from_env())
    }
}

fn transport_config(
    server: Option<&str>,
    env: Option<HttpTransportConfig>,
) -> Result<HttpTransportConfig> {
    match (server, env) {
        (Some(url), Some(config)) => Ok(HttpTransportConfig {
            base_url: url.to_string(),
            ..config
        }),
        (Some(url), None) => Ok(HttpTransportConfig::new(url)),
        (None, Some(config)) => Ok(config),
        (None, None) => bail!(
            "No rendezvous server configured. Pass --server or set RENDEZVOUS_SERVER_URL."
        ),
    }
}

/// Parse an invite given inline as JSON or as a path to a JSON file.
pub fn load_invite(input: &str) -> Result<RendezvousInvite> {
    let trimmed = input.trim();
    let json = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let path = Path::new(trimmed);
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read invite from {}", path.display()))?
    };

    serde_json::from_str(&json).context("Invite is not valid rendezvous JSON")
}

/// Show the check code and ask the user to compare it with the other device.
///
/// Returns `false` if the user says the codes differ.
pub fn confirm_code(code: &VerificationCode, assume_yes: bool) -> Result<bool> {
    ui::header("Check Code");
    ui::check_code(&code.to_string());
    ui::info("The other device must show exactly the same code");

    if assume_yes {
        ui::warning("Accepting the code without confirmation (--yes)");
        return Ok(true);
    }
    if !ui::is_interactive() {
        bail!("Cannot confirm the check code without a terminal. Pass --yes to skip.");
    }

    ui::confirm("Do both devices show the same code?", false)
}

/// Best-effort teardown after a failed or rejected session.
pub async fn abandon<T: RendezvousTransport>(service: &mut RendezvousService<T>) {
    if let Err(e) = service.tear_down().await {
        tracing::warn!(error = %e, "failed to delete rendezvous");
    }
}

/// Print a received payload, as text when it is UTF-8.
pub fn print_payload(label: &str, payload: &[u8]) {
    match std::str::from_utf8(payload) {
        Ok(text) => ui::key_value(label, text),
        Err(_) => ui::key_value(label, &format!("{} bytes: {}", payload.len(), hex::encode(payload))),
    }
}
