//! `clientele complex`: let the Clientele API build, sign and broadcast a
//! contract call, then poll it for the transaction hash.

use anyhow::Context;
use clientele_core::abi::FunctionAbi;
use clientele_core::poller::{ConfirmationPoller, PollResult};
use clientele_sdk::client::ClienteleClient;
use clientele_sdk::objects::ComplexTransaction;
use tokio::sync::watch;

use super::{Outcome, cancelled_or, pretty};
use crate::config::runtime::ComplexSettings;

pub async fn run(
    settings: ComplexSettings,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<Outcome> {
    let ComplexSettings {
        credentials,
        wallet,
        contract,
        value,
        gas,
        fund,
        network,
        poll,
    } = settings;

    // Catch ABI and parameter mistakes before the API does.
    FunctionAbi::from_json(&contract.abi)
        .and_then(|abi| abi.encode_call(&contract.parameters))
        .context("contract call does not match its ABI")?;

    let client = ClienteleClient::new(credentials)?;
    let tx = ComplexTransaction::function_call(
        contract.address,
        value,
        gas.gas_limit,
        gas.gas_price,
        contract.abi,
        contract.parameters,
    );

    tracing::info!(wallet_id = %wallet.id, to = %contract.address, fund, "Submitting complex transaction");
    let submitted = client
        .create_complex_transaction(wallet.id, &wallet.password, &tx, fund)
        .await
        .context("failed to create complex transaction")?;
    println!("{}", pretty(&submitted));

    let poller = ConfirmationPoller::new(poll, shutdown_rx)?;
    let client = &client;
    let wallet_id = wallet.id;
    let transaction_id = submitted.id.as_str();
    let result = poller
        .poll_for_hash(move || async move {
            let retrieved = client.retrieve_transaction(wallet_id, transaction_id).await?;
            Ok::<_, anyhow::Error>(retrieved.tx_hash().is_some().then_some(retrieved))
        })
        .await;

    let found = match result {
        Ok(PollResult::Found(tx)) => tx,
        Ok(PollResult::TimedOut) => {
            println!("Timed out waiting for transaction {transaction_id} to be broadcast.");
            return Ok(Outcome::TimedOut);
        }
        Err(e) => return cancelled_or(e).context("failed to retrieve transaction"),
    };

    println!("{}", pretty(&found));
    if let Some(hash) = found.tx_hash() {
        println!("Transaction hash: {hash}");
        if let Some(network) = network {
            println!("{}", network.explorer_tx_url(hash));
        }
    }
    Ok(Outcome::Confirmed)
}
