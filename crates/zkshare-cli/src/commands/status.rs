use anyhow::Result;

use zkshare_core::chain::ExplorerItem;
use zkshare_core::estimator::format_sol;
use zkshare_core::records;

use super::Context;
use crate::output;

/// Show the active network, its health and the last deployment.
///
/// With `--signature`, wait for that transaction to confirm instead; this
/// is how a deployment that timed out is followed up.
pub async fn run(ctx: &Context, signature: Option<&str>) -> Result<()> {
    output::print_header("zkshare status");
    let chain = ctx.chain();
    let environment = chain.environment();

    if let Some(signature) = signature {
        let status = chain.wait_for_confirmation(signature).await?;
        match status.err {
            Some(reason) => output::print_error(&format!("Transaction failed: {reason}")),
            None => output::print_success("Transaction confirmed"),
        }
        output::print_key_value(
            "Explorer",
            &chain.explorer_url(ExplorerItem::Transaction(signature)),
        );
        return Ok(());
    }

    output::print_key_value("Network", environment.as_str());
    output::print_key_value("Endpoint", &ctx.config.chain.endpoint(environment));
    match chain.session().await {
        Ok(_) => output::print_success("Node is healthy"),
        Err(e) => output::print_warning(&e.to_string()),
    }

    match records::load_deployment(&ctx.target_dir()) {
        Ok(record) => {
            println!();
            output::print_key_value("Verifier", record.account());
            output::print_key_value("Deployed on", record.environment().as_str());
            output::print_key_value("Deployed at", &record.deployed_at().to_rfc3339());
            output::print_key_value("Cost", &format_sol(record.cost_lamports()));
            if record.environment() != environment {
                output::print_warning("Last deployment is on a different network");
            }
        }
        Err(_) => output::print_key_value("Verifier", "none deployed"),
    }

    Ok(())
}
