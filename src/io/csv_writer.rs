use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::error::IoError;
use crate::domain::{AccountKey, Money};
use crate::engine::Ledger;
use crate::storage::AccountDirectory;

/// One line of the balance snapshot
#[derive(Debug, Serialize)]
struct BalanceRow {
    account: String,
    balance: String,
    currency: String,
}

impl BalanceRow {
    fn new<K: AccountKey>(id: &K, balance: &Money) -> Self {
        Self {
            account: id.to_string(),
            balance: balance.amount().to_string(),
            currency: balance.currency().to_string(),
        }
    }
}

/// Write every account's balance to `writer` as CSV, ordered by account id
pub async fn write_snapshot<K, D, W>(ledger: &Ledger<K, D>, mut writer: W) -> Result<(), IoError>
where
    K: AccountKey,
    D: AccountDirectory<K>,
    W: AsyncWrite + Unpin + Send,
{
    // Rows are encoded synchronously, then written in one go
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    csv_writer.write_record(["account", "balance", "currency"])?;

    for (id, balance) in ledger.balances() {
        csv_writer.serialize(BalanceRow::new(&id, &balance))?;
    }

    let buffer = csv_writer
        .into_inner()
        .map_err(|err| IoError::Io(err.into_error()))?;

    writer.write_all(&buffer).await?;
    writer.flush().await?;
    Ok(())
}
