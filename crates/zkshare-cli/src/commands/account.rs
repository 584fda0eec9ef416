use std::path::Path;

use anyhow::Result;

use zkshare_core::chain::{ExplorerItem, LAMPORTS_PER_SOL};
use zkshare_core::estimator::format_sol;
use zkshare_core::signer::TransactionSigner;

use super::Context;
use crate::output;
use crate::signer::KeypairSigner;

/// An explicit address, or the keypair's.
fn resolve(account: Option<String>, keypair: Option<&Path>) -> Result<String> {
    match (account, keypair) {
        (Some(account), _) => Ok(account),
        (None, Some(path)) => Ok(KeypairSigner::from_file(path)?.pubkey().to_string()),
        (None, None) => anyhow::bail!("pass an account address or --keypair <file>"),
    }
}

pub async fn balance(ctx: &Context, account: Option<String>, keypair: Option<&Path>) -> Result<()> {
    let account = resolve(account, keypair)?;
    let chain = ctx.chain();
    let lamports = chain.get_balance(&account).await?;

    output::print_key_value("Account", &account);
    output::print_key_value("Network", chain.environment().as_str());
    output::print_key_value("Balance", &format!("{} ({lamports} lamports)", format_sol(lamports)));
    Ok(())
}

pub async fn airdrop(
    ctx: &Context,
    account: Option<String>,
    amount: f64,
    keypair: Option<&Path>,
) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        anyhow::bail!("amount must be positive");
    }
    let account = resolve(account, keypair)?;
    let lamports = (amount * LAMPORTS_PER_SOL as f64).round() as u64;
    let chain = ctx.chain();

    let signature = chain.request_airdrop(&account, lamports).await?;
    output::print_success(&format!("Requested {} for {account}", format_sol(lamports)));
    output::print_key_value("Signature", &signature);

    match chain.wait_for_confirmation(&signature).await {
        Ok(_) => output::print_success("Airdrop confirmed"),
        Err(e) => output::print_warning(&format!("Not confirmed yet: {e}")),
    }
    output::print_key_value("Explorer", &chain.explorer_url(ExplorerItem::Transaction(&signature)));
    Ok(())
}
