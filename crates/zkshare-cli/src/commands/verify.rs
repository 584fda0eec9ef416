use std::path::Path;

use anyhow::{Context as _, Result};

use zkshare_core::chain::ExplorerItem;
use zkshare_core::records;
use zkshare_core::verify::VerificationOrchestrator;

use super::Context;
use crate::output;
use crate::signer::KeypairSigner;

/// Verify a proof against a deployed verifier.
///
/// The account defaults to the one in `target/deployment.json`.
pub async fn run(
    ctx: &Context,
    proof_path: &Path,
    public_inputs: Option<&Path>,
    account: Option<String>,
    keypair: &Path,
) -> Result<()> {
    output::print_header("zkshare verify");

    let account = match account {
        Some(account) => account,
        None => records::load_deployment(&ctx.target_dir())
            .map_err(|_| anyhow::anyhow!("no deployment found; run `zkshare deploy` or pass --account"))?
            .account()
            .to_string(),
    };
    let proof = std::fs::read(proof_path)
        .with_context(|| format!("failed to read proof {}", proof_path.display()))?;
    let inputs: Vec<String> = match public_inputs {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("{} must be a JSON array of strings", path.display()))?
        }
        None => Vec::new(),
    };
    let signer = KeypairSigner::from_file(keypair)?;
    let chain = ctx.chain();

    output::print_key_value("Network", chain.environment().as_str());
    output::print_key_value("Verifier", &account);
    output::print_key_value("Proof size", &format!("{} bytes", proof.len()));
    output::print_key_value("Public inputs", &inputs.len().to_string());

    let orchestrator = VerificationOrchestrator::new(chain.clone())?;
    let bar = output::stage_bar();
    let result = orchestrator
        .verify(&account, &proof, &inputs, &signer, &mut output::on_progress(&bar))
        .await;
    bar.finish_and_clear();
    let record = result?;

    if record.is_valid() {
        output::print_success("Proof is valid");
    } else {
        output::print_error("Proof is invalid");
    }
    output::print_key_value("Signature", record.signature());
    output::print_key_value(
        "Explorer",
        &chain.explorer_url(ExplorerItem::Transaction(record.signature())),
    );

    if !record.is_valid() {
        anyhow::bail!("proof rejected by the verifier");
    }
    Ok(())
}
