use serde::Deserialize;

use super::error::IoError;
use crate::domain::{AccountId, DomainError, LedgerCommand, Money};

/// Raw CSV record as read from input
#[derive(Debug, Deserialize)]
pub struct RawCommandRecord {
    #[serde(rename = "type")]
    pub command_type: String,
    pub account: String,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
}

impl RawCommandRecord {
    /// Parse this raw record into a strongly-typed LedgerCommand
    pub fn parse(self) -> Result<LedgerCommand, IoError> {
        let command_type = self.command_type.trim().to_lowercase();

        match command_type.as_str() {
            "open" => {
                let balance = self.money("open")?;
                let account = required(Some(self.account), "account required for open")?;
                Ok(LedgerCommand::Open {
                    account: AccountId::new(account),
                    balance,
                })
            }
            "transfer" => {
                let amount = self.money("transfer")?;
                let origin = required(Some(self.account), "account required for transfer")?;
                let destiny = required(self.counterparty, "counterparty required for transfer")?;
                Ok(LedgerCommand::Transfer {
                    origin: AccountId::new(origin),
                    destiny: AccountId::new(destiny),
                    amount,
                })
            }
            _ => Err(IoError::InvalidCommandType(self.command_type)),
        }
    }

    fn money(&self, command: &str) -> Result<Money, IoError> {
        let amount = required(self.amount.clone(), &format!("amount required for {command}"))?;
        let currency = required(
            self.currency.clone(),
            &format!("currency required for {command}"),
        )?;

        Money::parse(&amount, &currency).map_err(|err| match err {
            DomainError::InvalidAmount(_) => IoError::InvalidAmount(amount),
            other => IoError::Domain(other),
        })
    }
}

// Blank fields count as absent
fn required(field: Option<String>, message: &str) -> Result<String, IoError> {
    field
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| IoError::MissingField(message.to_string()))
}
