//! Join command - answer an invite from another device

use anyhow::{anyhow, bail, Context, Result};
use rendezvous_lib::transport::{HttpRendezvousTransport, HttpTransportConfig};
use rendezvous_lib::{RendezvousService, HTTP_TRANSPORT_TYPE};

use super::SessionOptions;
use crate::ui;

pub async fn run(options: &SessionOptions, invite: Option<&str>, reply: Option<&str>) -> Result<()> {
    ui::header("Join Rendezvous");

    let input = match invite {
        Some(input) => input.to_string(),
        None => ui::input("Invite JSON or file path")?,
    };
    let invite = super::load_invite(&input)?;
    let details = invite.rendezvous;

    let algorithm = details
        .algorithm()
        .ok_or_else(|| anyhow!("Unsupported algorithm '{}'", details.algorithm))?;
    let transport = details
        .transport
        .as_ref()
        .ok_or_else(|| anyhow!("Invite does not say where the rendezvous is"))?;
    if transport.transport_type != HTTP_TRANSPORT_TYPE {
        bail!("Unsupported transport '{}'", transport.transport_type);
    }
    let key = details
        .key
        .as_deref()
        .ok_or_else(|| anyhow!("Invite does not carry the creator's key"))?;

    ui::key_value("User", &invite.user);
    ui::key_value("Rendezvous", &transport.uri);
    ui::key_value("Algorithm", algorithm.as_str());
    if options.legacy {
        ui::warning("--legacy is ignored when joining; the invite fixes the algorithm");
    }

    // The invite URI is usually absolute, so any base will do
    let config = options
        .transport_config()
        .unwrap_or_else(|_| HttpTransportConfig::new(transport.uri.clone()));
    let transport = HttpRendezvousTransport::with_rendezvous_url(config, &transport.uri)
        .context("Invalid rendezvous URI in invite")?;
    let mut service = RendezvousService::new(transport, algorithm);

    let code = service
        .join_rendezvous(key)
        .await
        .context("Failed to join rendezvous")?;

    if !super::confirm_code(&code, options.assume_yes)? {
        ui::error("Check codes differ. Somebody may be intercepting the channel.");
        super::abandon(&mut service).await;
        bail!("Check code rejected");
    }
    ui::success("Secure channel established");

    let spinner = ui::spinner("Waiting for the creator's message...");
    let received = service.receive().await;
    spinner.finish_and_clear();
    let payload = received.context("Failed to receive message")?;
    super::print_payload("Received", &payload);

    let reply = reply.unwrap_or("Hello back");
    service
        .send(reply.as_bytes())
        .await
        .context("Failed to send reply")?;
    ui::key_value("Sent", reply);

    ui::info("The creator closes the rendezvous");
    Ok(())
}
