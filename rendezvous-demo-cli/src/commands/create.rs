//! Create command - start a rendezvous and wait for the other device

use anyhow::{bail, Context, Result};
use rendezvous_lib::transport::HttpRendezvousTransport;
use rendezvous_lib::{RendezvousInvite, RendezvousService, RendezvousTransport};

use super::SessionOptions;
use crate::ui;

pub async fn run(options: &SessionOptions, user: &str, message: Option<&str>) -> Result<()> {
    ui::header("Create Rendezvous");

    let config = options.transport_config()?;
    let algorithm = options.algorithm();
    ui::key_value("Server", &config.base_url);
    ui::key_value("Algorithm", algorithm.as_str());

    let transport =
        HttpRendezvousTransport::new(config).context("Invalid rendezvous server URL")?;
    let mut service = RendezvousService::new(transport, algorithm);

    let details = service
        .create_rendezvous()
        .await
        .context("Failed to create rendezvous")?;
    tracing::debug!(phase = %service.phase(), "rendezvous created");

    let invite = RendezvousInvite::new(details, user);
    let invite_json = serde_json::to_string(&invite)?;

    ui::separator();
    ui::info("Scan this QR code or paste the invite on the other device:");
    ui::qr_code(&invite_json)?;
    println!("{invite_json}");
    if options.verbose {
        ui::json(&serde_json::to_value(&invite)?);
    }
    ui::separator();

    let spinner = ui::spinner("Waiting for the other device to join...");
    let joined = service.wait_for_interlocutor().await;
    spinner.finish_and_clear();

    let code = match joined {
        Ok(code) => code,
        Err(e) => {
            super::abandon(&mut service).await;
            return Err(e).context("No device joined the rendezvous");
        }
    };

    let confirmed = match super::confirm_code(&code, options.assume_yes) {
        Ok(confirmed) => confirmed,
        Err(e) => {
            super::abandon(&mut service).await;
            return Err(e);
        }
    };
    if !confirmed {
        ui::error("Check codes differ. Somebody may be intercepting the channel.");
        super::abandon(&mut service).await;
        bail!("Check code rejected");
    }
    ui::success("Secure channel established");

    let message = message
        .map(str::to_string)
        .unwrap_or_else(|| format!("Hello from {user}"));
    send_or_abandon(&mut service, &message).await?;
    ui::key_value("Sent", &message);

    let spinner = ui::spinner("Waiting for a reply...");
    let reply = service.receive().await;
    spinner.finish_and_clear();

    match reply {
        Ok(payload) => super::print_payload("Reply", &payload),
        Err(e) => ui::warning(&format!("No reply received: {e}")),
    }

    service
        .tear_down()
        .await
        .context("Failed to delete rendezvous")?;
    ui::success("Rendezvous closed");

    Ok(())
}

/// Send `message`, deleting the rendezvous if that fails.
async fn send_or_abandon<T: RendezvousTransport>(
    service: &mut RendezvousService<T>,
    message: &str,
) -> Result<()> {
    if let Err(e) = service.send(message.as_bytes()).await {
        super::abandon(service).await;
        return Err(e).context("Failed to send message");
    }
    Ok(())
}
