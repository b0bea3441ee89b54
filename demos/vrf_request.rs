//! Requests Chainlink VRF randomness on Goerli from Chiado
//!
//! Reads the route from `HASHI_*` variables (or falls back to the published
//! Chiado → Goerli deployments), relays one `requestRandomWords()` call and
//! prints the random words once they arrive.
//!
//! Run with:
//!
//! ```sh
//! HASHI_PRIVATE_KEY=0x... \
//! HASHI_SOURCE_RPC_URL=https://rpc.chiadochain.net \
//! HASHI_DESTINATION_RPC_URL=wss://ethereum-goerli.publicnode.com \
//! RUST_LOG=hashi_vrf_rs=debug \
//! cargo run --example vrf_request
//! ```

use std::sync::Arc;

use alloy_provider::ProviderBuilder;
use alloy_signer_local::PrivateKeySigner;
use hashi_vrf_rs::providers::{AlloyChainClient, AmbHelperAttestor, HttpAttestor};
use hashi_vrf_rs::{
    AttestationProvider, MessageEnvelope, RelayConfig, RelayError, RelayPipeline,
};
use tracing_subscriber::EnvFilter;

fn env(key: &str) -> Result<String, RelayError> {
    std::env::var(key).map_err(|_| RelayError::InvalidConfig(format!("{key} is not set")))
}

async fn relay<A>(
    config: RelayConfig,
    source: Arc<AlloyChainClient<impl alloy_provider::Provider + 'static>>,
    destination: Arc<AlloyChainClient<impl alloy_provider::Provider + 'static>>,
    attestor: Arc<A>,
) -> Result<(), RelayError>
where
    A: AttestationProvider + 'static,
{
    let pipeline = RelayPipeline::builder()
        .config(config.clone())
        .source_client(source)
        .destination_client(destination)
        .attestor(attestor)
        .build()?;

    let envelope = MessageEnvelope::request_random_words(
        config.source.chain_id,
        config.destination.chain_id,
        config.response_contract,
    );

    println!("Relaying requestRandomWords() to {}", config.response_contract);
    let handle = pipeline.spawn(envelope);
    let mut status = handle.status_watch();
    let printer = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let state = *status.borrow_and_update();
            println!("   -> {state}");
            if state.is_terminal() {
                break;
            }
        }
    });

    let cancel = handle.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Cancelling...");
            cancel.cancel();
        }
    });

    let record = handle.join().await?;
    let _ = printer.await;

    if let Some(id) = record.dispatch_id() {
        println!("Dispatch id:  {id}");
    }
    if let Some(id) = record.message_id() {
        println!("Message id:   {id}");
    }
    match record.into_outcome() {
        Ok(response) => {
            let words: Vec<String> = response
                .random_words()
                .iter()
                .map(ToString::to_string)
                .collect();
            println!("Random words: {}", words.join(", "));
            println!("Payment:      {}", response.payment());
            Ok(())
        }
        Err(failure) => {
            println!("Relay failed in {}: {}", failure.stage, failure.error);
            Err(failure.error)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let signer: PrivateKeySigner = env("HASHI_PRIVATE_KEY")?
        .parse()
        .map_err(|e| RelayError::InvalidConfig(format!("HASHI_PRIVATE_KEY is invalid: {e}")))?;

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(_) => RelayConfig::chiado_to_goerli(
            env("HASHI_SOURCE_RPC_URL")?
                .parse()
                .map_err(|e| RelayError::InvalidConfig(format!("source RPC URL: {e}")))?,
            env("HASHI_DESTINATION_RPC_URL")?
                .parse()
                .map_err(|e| RelayError::InvalidConfig(format!("destination RPC URL: {e}")))?,
            signer.address(),
        )?,
    };

    let chiado = ProviderBuilder::new()
        .wallet(signer.clone())
        .connect(config.source.rpc_url.as_str())
        .await?;
    let goerli = ProviderBuilder::new()
        .wallet(signer)
        .connect(config.destination.rpc_url.as_str())
        .await?;

    let source = Arc::new(AlloyChainClient::new(chiado, config.source.chain_id));
    let destination = Arc::new(
        AlloyChainClient::new(goerli, config.destination.chain_id).with_required_confirmations(2),
    );

    match (&config.attestor_url, config.amb_helper) {
        (Some(url), _) => {
            let attestor = Arc::new(HttpAttestor::new(url.clone()));
            relay(config, source, destination, attestor).await
        }
        (None, Some(helper)) => {
            let attestor = Arc::new(AmbHelperAttestor::new(Arc::clone(&destination), helper));
            relay(config, source, destination, attestor).await
        }
        (None, None) => Err(RelayError::InvalidConfig(
            "no attestation source configured".to_string(),
        )),
    }
}
