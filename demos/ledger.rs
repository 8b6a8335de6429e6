//! Walk one item through receipt, sale and an inter-branch transfer.
//!
//! Run with `RUST_LOG=branch_ledger=debug` to see each transaction.

use branch_ledger::{
    auth::Actor,
    config::LedgerConfig,
    service::{InventoryService, StockIn, StockOut},
    store::TransferFilter,
    transfer::TransferStatus,
    types::TimeStamp,
};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("LEDGER_DB_PATH") {
        Ok(_) => LedgerConfig::from_env()?,
        Err(_) => LedgerConfig::temporary(),
    };
    let service = InventoryService::open(&config)?;

    let admin = Actor::admin("admin");
    let north = Actor::manager("mgr_north", "north");

    for (day, quantity, cost) in [(1, 5, Decimal::new(10, 0)), (2, 5, Decimal::new(20, 0))] {
        let acquired = TimeStamp::new_with(2024, 1, day, 9, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("bad date"))?;
        service.receive_stock(
            &north,
            StockIn::new("north", "widget", quantity, cost, "acme")
                .acquired_at(acquired)
                .rack_location("A-3"),
        )?;
    }

    let sale = service.record_outgoing(&north, StockOut::new("north", "widget", 3, "sale"))?;
    println!("sold {} widgets at cost {}", sale.quantity, sale.total_value);

    let request = service.request_transfer(&north, "north", "south", "widget", 4)?;
    let completed = service.approve_transfer(&admin, &request.id)?;
    println!(
        "transfer {} moved {} widgets worth {:?}",
        completed.id, completed.quantity, completed.total_value
    );

    for branch in ["north", "south"] {
        for ledger in service.ledgers_for_branch(branch)? {
            println!(
                "{}/{}: {} units, value {}, average cost {}",
                ledger.branch_id,
                ledger.item_id,
                ledger.total_quantity(),
                ledger.total_value(),
                ledger.average_cost()
            );
            for lot in &ledger.entries {
                println!(
                    "  {} @ {} from {} ({})",
                    lot.quantity,
                    lot.unit_cost,
                    lot.supplier,
                    lot.acquired_at.to_datetime_utc().date_naive()
                );
            }
        }
    }

    let done = service.transfers(&TransferFilter::with_status(TransferStatus::Completed))?;
    println!("{} completed transfer(s)", done.len());

    for movement in service.movements_for("north", "widget")? {
        println!("{:?} {} ({})", movement.kind, movement.quantity, movement.total_value);
    }

    service.store().flush()?;
    Ok(())
}
