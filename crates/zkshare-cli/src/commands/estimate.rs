use std::path::Path;

use anyhow::Result;

use zkshare_core::estimator;

use super::Context;
use crate::output;

/// Estimate the cost of deploying a verifier.
///
/// Online estimates ask the node for the rent-exempt minimum; `--offline`
/// uses the default rent rate and needs no network access.
pub async fn run(ctx: &Context, vk: Option<&Path>, size: Option<u64>, offline: bool) -> Result<()> {
    output::print_header("zkshare estimate");

    let payload = match (vk, size) {
        (Some(path), _) => std::fs::metadata(path)?.len(),
        (None, Some(size)) => size,
        (None, None) => anyhow::bail!("pass --vk <file> or --size <bytes>"),
    };
    let chain = &ctx.config.chain;
    let network = chain.environment;

    output::print_key_value("Network", network.as_str());
    output::print_key_value("Payload", &format!("{payload} bytes"));

    let estimate = if offline {
        estimator::offline_estimate(payload, chain.account_overhead_bytes, chain.nominal_fee_lamports)
    } else {
        ctx.chain().estimate(payload).await?
    };

    println!("{}", estimator::format_estimate(&estimate, network.as_str()));
    Ok(())
}
