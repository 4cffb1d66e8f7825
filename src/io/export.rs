use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::BankService;
use crate::domain::{Transaction, format_cents};

/// Output format for a statement export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    Csv,
    Json,
}

impl StatementFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(StatementFormat::Csv),
            "json" => Some(StatementFormat::Json),
            _ => None,
        }
    }
}

/// Account statement document for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub account_number: String,
    pub generated_at: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
}

/// Writes an account's recent history to CSV or JSON.
pub struct StatementExporter<'a> {
    service: &'a BankService,
}

impl<'a> StatementExporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export up to `limit` transactions, newest first. Returns the row count.
    pub async fn export<W: Write>(
        &self,
        account_number: &str,
        limit: u32,
        format: StatementFormat,
        writer: W,
    ) -> Result<usize> {
        let transactions = self.service.get_transactions(account_number, limit).await?;
        let count = transactions.len();

        match format {
            StatementFormat::Csv => write_csv(&transactions, writer)?,
            StatementFormat::Json => {
                let statement = Statement {
                    account_number: account_number.trim().to_string(),
                    generated_at: Utc::now(),
                    transactions,
                };
                write_json(&statement, writer)?;
            }
        }

        Ok(count)
    }
}

fn write_csv<W: Write>(transactions: &[Transaction], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "transaction_id",
        "date",
        "type",
        "amount",
        "balance_after",
        "description",
        "reference",
    ])?;

    for t in transactions {
        csv_writer.write_record([
            t.id.to_string(),
            t.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            t.transaction_type.to_string(),
            format_cents(t.amount),
            format_cents(t.balance_after),
            t.description.clone().unwrap_or_default(),
            t.reference_account.clone().unwrap_or_default(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(statement: &Statement, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, statement)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::TransactionType;

    #[test]
    fn test_csv_layout() {
        let account = Uuid::new_v4();
        let rows = vec![
            Transaction::new(account, TransactionType::TransferOut, 100_000, 1_200_000)
                .with_description("Transfer to ACC1000000002")
                .with_reference("ACC1000000002"),
            Transaction::new(account, TransactionType::Deposit, 500_000, 1_300_000)
                .with_description("Salary"),
        ];

        let mut out = Vec::new();
        write_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "transaction_id,date,type,amount,balance_after,description,reference"
        );
        assert!(lines[1].ends_with(",Transfer Out,1000.00,12000.00,Transfer to ACC1000000002,ACC1000000002"));
        assert!(lines[2].ends_with(",Deposit,5000.00,13000.00,Salary,"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(StatementFormat::from_str("CSV"), Some(StatementFormat::Csv));
        assert_eq!(StatementFormat::from_str("json"), Some(StatementFormat::Json));
        assert_eq!(StatementFormat::from_str("xml"), None);
    }
}
