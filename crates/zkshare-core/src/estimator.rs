use crate::chain::transaction::MAX_TRANSACTION_SIZE;
use crate::chain::LAMPORTS_PER_SOL;

/// Per-account storage overhead the network charges rent on.
const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;
/// Default rent rate.
const LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;
/// Years of rent an account must hold to be rent-exempt.
const EXEMPTION_THRESHOLD_YEARS: u64 = 2;
/// Room taken by signatures, keys and the `CreateAccount` instruction in a
/// deploy transaction, leaving the rest of the packet for the payload.
const DEPLOY_TX_OVERHEAD: usize = 2 * 64 + 5 * 32 + 3 + 32 + 60;

/// Cost of deploying a verifier account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostEstimate {
    /// Size of the attached payload (the verification key).
    pub payload_bytes: u64,
    /// Allocated account size: payload plus fixed overhead.
    pub account_bytes: u64,
    /// Rent-exempt minimum balance funding the account.
    pub rent_exempt_lamports: u64,
    /// Nominal transaction fee.
    pub fee_lamports: u64,
    /// Warnings about approaching limits.
    pub warnings: Vec<String>,
}

impl CostEstimate {
    pub fn new(payload_bytes: u64, account_bytes: u64, rent_exempt_lamports: u64, fee_lamports: u64) -> Self {
        let mut warnings = Vec::new();
        let room = (MAX_TRANSACTION_SIZE - DEPLOY_TX_OVERHEAD) as u64;
        if payload_bytes > room {
            warnings.push(format!(
                "payload of {payload_bytes} bytes exceeds the ~{room} bytes that fit in one {MAX_TRANSACTION_SIZE}-byte transaction"
            ));
        } else if payload_bytes > room * 8 / 10 {
            warnings.push(format!(
                "payload uses more than 80% of the {room} bytes available in one transaction"
            ));
        }
        if payload_bytes == 0 {
            warnings.push("empty payload: the verifier account will hold no key".into());
        }

        Self {
            payload_bytes,
            account_bytes,
            rent_exempt_lamports,
            fee_lamports,
            warnings,
        }
    }

    /// Funding plus fee.
    pub fn total_lamports(&self) -> u64 {
        self.rent_exempt_lamports.saturating_add(self.fee_lamports)
    }
}

/// Rent-exempt minimum for an account holding `data_len` bytes at the default
/// rent rate. Matches what a node reports unless its rent parameters differ.
pub fn rent_exempt_minimum(data_len: u64) -> u64 {
    (ACCOUNT_STORAGE_OVERHEAD + data_len) * LAMPORTS_PER_BYTE_YEAR * EXEMPTION_THRESHOLD_YEARS
}

/// Offline estimate (no network access) using the default rent rate.
pub fn offline_estimate(payload_bytes: u64, overhead_bytes: u64, fee_lamports: u64) -> CostEstimate {
    let account_bytes = payload_bytes + overhead_bytes;
    CostEstimate::new(
        payload_bytes,
        account_bytes,
        rent_exempt_minimum(account_bytes),
        fee_lamports,
    )
}

/// Format a cost estimate as a human-readable report.
pub fn format_estimate(estimate: &CostEstimate, network: &str) -> String {
    let tx_pct = estimate.payload_bytes as f64
        / (MAX_TRANSACTION_SIZE - DEPLOY_TX_OVERHEAD) as f64
        * 100.0;
    let tx_status = if tx_pct > 100.0 {
        "FAIL"
    } else if tx_pct > 80.0 {
        "WARN"
    } else {
        "OK"
    };

    let mut report = format!(
        r#"
Cost Estimate: {network}
============================================

Item                    Amount           Note
------------------------------------------------------------
Payload                 {:<16} {:.1}% of tx  [{tx_status}]
Account size            {:<16} payload + overhead
Rent-exempt funding     {:<16} {}
Transaction fee         {:<16} {}

Total: {}
"#,
        format_bytes(estimate.payload_bytes),
        tx_pct,
        format_bytes(estimate.account_bytes),
        format_number(estimate.rent_exempt_lamports),
        format_sol(estimate.rent_exempt_lamports),
        format_number(estimate.fee_lamports),
        format_sol(estimate.fee_lamports),
        format_sol(estimate.total_lamports()),
    );

    if !estimate.warnings.is_empty() {
        report.push_str("\nWarnings:\n");
        for w in &estimate.warnings {
            report.push_str(&format!("  * {w}\n"));
        }
    }

    report
}

/// Lamports as whole units, e.g. `0.0089 SOL`.
pub fn format_sol(lamports: u64) -> String {
    format!("{:.6} SOL", lamports as f64 / LAMPORTS_PER_SOL as f64)
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn format_bytes(n: u64) -> String {
    if n >= 1_048_576 {
        format!("{:.1} MB", n as f64 / 1_048_576.0)
    } else if n >= 1024 {
        format!("{:.1} KB", n as f64 / 1024.0)
    } else {
        format!("{n} B")
    }
}
