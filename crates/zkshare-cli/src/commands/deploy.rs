use std::path::Path;

use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use sha2::{Digest, Sha256};

use zkshare_core::chain::ExplorerItem;
use zkshare_core::deploy::DeploymentOrchestrator;
use zkshare_core::error::ZkShareError;
use zkshare_core::estimator::format_sol;
use zkshare_core::records;
use zkshare_core::signer::TransactionSigner;

use super::Context;
use crate::output;
use crate::signer::KeypairSigner;

/// Deploy a verifier account holding the verification key at `vk_path`.
///
/// Saves the resulting record to `target/deployment.json` so `verify` can
/// find the account later.
pub async fn run(ctx: &Context, vk_path: &Path, keypair: &Path, yes: bool) -> Result<()> {
    output::print_header("zkshare deploy");

    let vk = std::fs::read(vk_path)
        .with_context(|| format!("failed to read verification key {}", vk_path.display()))?;
    let signer = KeypairSigner::from_file(keypair)?;
    let chain = ctx.chain();
    let environment = chain.environment();

    output::print_key_value("Network", environment.as_str());
    output::print_key_value("Payer", &signer.pubkey().to_string());
    output::print_key_value("VK size", &format!("{} bytes", vk.len()));
    output::print_key_value("VK sha256", &hex::encode(Sha256::digest(&vk)));

    if environment.is_production() && !yes {
        let cost = chain.estimate_cost(vk.len() as u64).await?;
        let proceed = Confirm::new()
            .with_prompt(format!("Deploy to mainnet for about {}?", format_sol(cost)))
            .default(false)
            .interact()?;
        if !proceed {
            output::print_warning("Aborted");
            return Ok(());
        }
    }

    let orchestrator = DeploymentOrchestrator::new(chain.clone())?;
    output::print_key_value("Verifier program", &orchestrator.program_id().to_string());
    let bar = output::stage_bar();
    let result = orchestrator
        .deploy(&vk, &signer, &mut output::on_progress(&bar))
        .await;
    bar.finish_and_clear();

    let record = match result {
        Ok(record) => record,
        Err(e) => {
            if let ZkShareError::ConfirmationTimeout { signature, .. } = e.root() {
                output::print_warning(&format!(
                    "Submitted but not confirmed. Check later with `zkshare status --signature {signature}`"
                ));
            }
            output::print_error(&e.to_string());
            return Err(e.into());
        }
    };

    records::save_deployment(&record, &ctx.target_dir())?;

    output::print_success(&format!("Verifier deployed: {}", record.account()));
    output::print_key_value("Signature", record.signature());
    output::print_key_value("Cost", &format_sol(record.cost_lamports()));
    output::print_key_value(
        "Explorer",
        &environment.explorer_url(ExplorerItem::Account(record.account())),
    );
    println!();
    println!("  To verify a proof:");
    println!("    zkshare verify --proof proof.bin --keypair {}", keypair.display());
    println!();

    Ok(())
}
