//! `clientele gpsi`: build a legacy transaction locally, have the wallet
//! sign its hash through the General Purpose Signing Interface, broadcast
//! it ourselves and poll the node for the receipt.

use anyhow::Context;
use clientele_core::abi::FunctionAbi;
use clientele_core::poller::{ConfirmationPoller, PollResult};
use clientele_core::rpc::RpcProvider;
use clientele_core::signing::GpsiSigner;
use clientele_core::transaction::LegacyTransaction;
use clientele_sdk::client::ClienteleClient;
use tokio::sync::watch;

use super::{Outcome, cancelled_or, pretty};
use crate::config::runtime::{GpsiSettings, TransactionPayload};

pub async fn run(settings: GpsiSettings, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<Outcome> {
    let GpsiSettings {
        credentials,
        wallet,
        payload,
        gas,
        network,
        rpc_url,
        poll,
    } = settings;
    let chain_id = network.chain_id();

    let provider = RpcProvider::new(rpc_url, credentials.timeout)?;
    let client = ClienteleClient::new(credentials)?;
    let signer = GpsiSigner::new(client, wallet.id, wallet.password);

    let nonce = provider
        .get_transaction_count(wallet.address)
        .await
        .context("failed to fetch the wallet nonce")?;
    tracing::info!(address = %wallet.address, nonce, %network, "Building transaction");

    let tx = match payload {
        TransactionPayload::Ether(ether) => LegacyTransaction::ether_transfer(
            chain_id,
            nonce,
            ether.recipient,
            ether.value,
            gas.gas_price,
            gas.gas_limit,
        ),
        TransactionPayload::Contract(contract) => {
            let function = FunctionAbi::from_json(&contract.abi)?;
            LegacyTransaction::contract_call(
                chain_id,
                nonce,
                contract.address,
                &function,
                &contract.parameters,
                gas.gas_price,
                gas.gas_limit,
            )?
        }
    };

    let signed = tx
        .sign_with(&signer)
        .await
        .context("failed to sign transaction")?;
    println!("Signed transaction: {}", signed.raw_hex());

    let tx_hash = provider
        .send_raw_transaction(&signed.raw_hex())
        .await
        .context("failed to broadcast transaction")?;
    if tx_hash != signed.hash {
        tracing::warn!(node = %tx_hash, local = %signed.hash, "Node reported a different transaction hash");
    }
    println!("Transaction hash: {tx_hash}");
    println!("{}", network.explorer_tx_url(&tx_hash.to_string()));

    let poller = ConfirmationPoller::new(poll, shutdown_rx)?;
    let result = poller
        .poll_for_hash(|| provider.get_transaction_receipt(tx_hash))
        .await;

    let receipt = match result {
        Ok(PollResult::Found(receipt)) => receipt,
        Ok(PollResult::TimedOut) => {
            println!("Timed out waiting for a receipt of {tx_hash}.");
            return Ok(Outcome::TimedOut);
        }
        Err(e) => {
            return cancelled_or(e).context("failed to fetch transaction receipt");
        }
    };

    match receipt.succeeded() {
        Some(false) => tracing::warn!(%tx_hash, "Transaction reverted"),
        _ => tracing::info!(%tx_hash, block = ?receipt.block_number, "Transaction mined"),
    }
    println!("{}", pretty(&receipt));

    let transaction = provider
        .get_transaction_by_hash(tx_hash)
        .await
        .context("failed to fetch transaction")?;
    println!("{}", pretty(&transaction));

    Ok(Outcome::Confirmed)
}
