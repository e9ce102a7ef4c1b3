// Example: Connecting to the testament contract and driving a workflow
//
// This example demonstrates how to:
// 1. Load the layered configuration (defaults, testament.toml, TESTAMENT_* env)
// 2. Connect through a JSON-RPC endpoint that manages the accounts
// 3. Print the reconciled snapshot and the derived role
// 4. Optionally run `confirm-death` (notary) or `unlock` (heir)
//
// Usage: cargo run --example inspect_testament -- [confirm-death|unlock]

use std::path::Path;
use testament_sdk::{AlloyLedger, ContractGateway, Coordinator, TestamentConfig, TestamentView};

fn print_view(view: &TestamentView) {
    match &view.account {
        Some(account) => println!("Connected account: {}", account),
        None => println!("Not connected"),
    }
    println!("  State:        {}", view.state);
    println!("  Role:         {}", view.role);
    println!("  Unlock time:  {}", view.snapshot.unlock_timestamp);
    println!("  Deceased:     {}", view.snapshot.deceased);
    println!("  Heir:         {}", view.snapshot.heir);
    println!("  Notary:       {}", view.snapshot.notary);
    println!("  Testator:     {}", view.snapshot.testator);
    for warning in &view.warnings {
        println!("  Warning:      {}", warning);
    }
    if let Some(document) = &view.unlock_result {
        println!("  Testament:    {}", document);
    }
    if let Some(failure) = &view.last_failure {
        println!("  Last failure: {}", failure);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = Path::new("testament.toml");
    let config = TestamentConfig::load(config_path.exists().then_some(config_path))?;

    let mut gateway = ContractGateway::new(AlloyLedger::from_config(&config)?);
    if let Some(timeout) = config.finality_timeout() {
        gateway = gateway.with_finality_timeout(timeout);
    }
    let coordinator = Coordinator::new(gateway);

    coordinator.connect().await?;
    print_view(&coordinator.view().await);

    match std::env::args().nth(1).as_deref() {
        Some("confirm-death") => {
            println!("\nConfirming death...");
            coordinator.confirm_death().await?;
        },
        Some("unlock") => {
            println!("\nUnlocking testament...");
            let document = coordinator.unlock_testament().await?;
            println!("Testament: {}", document);
        },
        Some(other) => println!("\nUnknown action {}", other),
        None => return Ok(()),
    }

    print_view(&coordinator.view().await);
    Ok(())
}
