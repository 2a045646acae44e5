//! Walkthrough of a vault-governed token ledger.
//!
//! Deploys a 2-of-3 authorization vault and a regulated ledger into a host,
//! hands the ledger's administrator role to the vault through a quorum-gated
//! proposal, and then mints, pauses, and blacklists through the vault.
//!
//! Run with:
//!   cargo run -p custodia-contracts --example governance_demo
//!
//! Set `LOG_FORMAT=json` for machine-readable output and `RUST_LOG` to tune
//! verbosity (the audit stream lives under the `custodia::audit` target).

use anyhow::{anyhow, Context, Result};
use tracing::info;

use custodia_contracts::{
    AuthorizationVault, Host, LedgerCall, LedgerConfig, ProposalId, RegulatedLedger, VaultCall,
    VaultConfig,
};
use custodia_protocol::config::DEFAULT_LOG_LEVEL;
use custodia_protocol::logging::{init_logging, LogFormat};
use custodia_protocol::Address;

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

fn step(n: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}[{n}]{RESET} {BOLD}{title}{RESET}");
}

fn detail(label: &str, value: impl std::fmt::Display) {
    println!("    {DIM}{label:<22}{RESET} {value}");
}

fn ok(message: &str) {
    println!("    {GREEN}ok{RESET}  {message}");
}

fn rejected(message: &str) {
    println!("    {YELLOW}rejected{RESET}  {message}");
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    host: Host,
    vault: Address,
    ledger: Address,
    owners: Vec<Address>,
}

impl Harness {
    fn vault(&self) -> Result<&AuthorizationVault> {
        self.host
            .contract::<AuthorizationVault>(self.vault)
            .ok_or_else(|| anyhow!("no vault at {}", self.vault))
    }

    fn ledger(&self) -> Result<&RegulatedLedger> {
        self.host
            .contract::<RegulatedLedger>(self.ledger)
            .ok_or_else(|| anyhow!("no ledger at {}", self.ledger))
    }

    fn send(&mut self, caller: Address, call: VaultCall) -> Result<()> {
        let payload = call.encode()?;
        self.host.call(caller, self.vault, 0, &payload)?;
        Ok(())
    }

    /// Submits `call` against the ledger and drives it through quorum.
    fn govern(&mut self, call: LedgerCall) -> Result<ProposalId> {
        let index = self.vault()?.proposal_count();
        let threshold = self.vault()?.required_confirmations() as usize;
        let owners = self.owners.clone();

        self.send(
            owners[0],
            VaultCall::Submit {
                target: self.ledger,
                value: 0,
                payload: call.encode()?,
            },
        )?;
        for owner in &owners[..threshold] {
            self.send(*owner, VaultCall::Confirm { index })?;
        }
        self.send(owners[owners.len() - 1], VaultCall::Execute { index })
            .with_context(|| format!("executing proposal {index}"))?;
        Ok(index)
    }
}

fn main() -> Result<()> {
    let format = LogFormat::from_str_lossy(&std::env::var("LOG_FORMAT").unwrap_or_default());
    init_logging(DEFAULT_LOG_LEVEL, format);

    let owners: Vec<Address> = ["alice", "bob", "carol"]
        .iter()
        .map(|name| Address::derive(name))
        .collect();
    let vault_config = VaultConfig {
        owners: owners.clone(),
        threshold: 2,
    };
    vault_config.validate()?;
    let ledger_config = LedgerConfig::default();
    ledger_config.validate()?;

    let vault = Address::derive("demo-vault");
    let ledger = Address::derive("demo-ledger");
    let deployer = Address::derive("deployer");

    // -- 1. vault ------------------------------------------------------------
    step(1, "Deploy the authorization vault");
    let mut host = Host::new();
    host.deploy(vault, AuthorizationVault::from_config(vault, &vault_config)?)?;
    detail("vault", vault);
    for owner in &owners {
        detail("owner", owner);
    }
    detail("threshold", vault_config.threshold);

    // -- 2. ledger -----------------------------------------------------------
    step(2, "Deploy the regulated ledger");
    host.deploy(
        ledger,
        RegulatedLedger::new(ledger, ledger_config.clone(), deployer)?,
    )?;
    detail("ledger", ledger);
    detail("token", format!("{} ({})", ledger_config.name, ledger_config.symbol));
    detail("administrator", deployer);

    // -- 3. role transfer ----------------------------------------------------
    step(3, "Hand the administrator role to the vault");
    let handover = LedgerCall::SetAdministrator {
        new_administrator: vault,
    }
    .encode()?;
    host.call(deployer, ledger, 0, &handover)?;

    let mut harness = Harness {
        host,
        vault,
        ledger,
        owners,
    };
    detail("administrator", harness.ledger()?.administrator());
    ok("the vault now governs the ledger");

    // -- 4. governed operations ---------------------------------------------
    step(4, "Mint through a 2-of-3 proposal");
    let treasury = Address::derive("treasury");
    let index = harness.govern(LedgerCall::Mint {
        to: treasury,
        amount: 1_000_000,
    })?;
    detail("proposal", index);
    detail("treasury balance", harness.ledger()?.balance_of(treasury));
    detail("total supply", harness.ledger()?.total_supply());

    step(5, "An owner acting alone is not the administrator");
    let direct = LedgerCall::Mint {
        to: harness.owners[0],
        amount: 1,
    }
    .encode()?;
    match harness.host.call(harness.owners[0], ledger, 0, &direct) {
        Ok(()) => return Err(anyhow!("single owner minted without quorum")),
        Err(e) => rejected(&e.to_string()),
    }

    step(6, "Freeze a suspicious account and pause transfers");
    let suspect = Address::derive("suspect");
    let payout = LedgerCall::Transfer {
        to: suspect,
        amount: 5_000,
    }
    .encode()?;
    harness.host.call(treasury, ledger, 0, &payout)?;
    harness.govern(LedgerCall::Blacklist { account: suspect })?;
    harness.govern(LedgerCall::Pause)?;
    detail("suspect blacklisted", harness.ledger()?.is_blacklisted(suspect));
    detail("paused", harness.ledger()?.is_paused());

    let attempt = LedgerCall::Transfer {
        to: treasury,
        amount: 1,
    }
    .encode()?;
    match harness.host.call(treasury, ledger, 0, &attempt) {
        Ok(()) => return Err(anyhow!("transfer succeeded while paused")),
        Err(e) => rejected(&e.to_string()),
    }

    step(7, "Audit trail");
    let vault_events = harness.vault()?.events().len();
    let ledger_events = harness.ledger()?.events().len();
    detail("vault events", vault_events);
    detail("ledger events", ledger_events);
    info!(vault_events, ledger_events, "demo complete");

    println!();
    Ok(())
}
