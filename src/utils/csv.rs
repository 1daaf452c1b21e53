//! CSV projection of the exportable entities. Fixed column orders, money
//! with two fractional digits, timestamps RFC-3339 UTC, blanks for nulls.

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{Deduction, Stipend, Transaction};

pub const STIPEND_HEADERS: [&str; 8] = [
    "id",
    "student_id",
    "amount",
    "class",
    "payment_status",
    "journal_number",
    "created_at",
    "modified_at",
];

pub const DEDUCTION_HEADERS: [&str; 7] = [
    "id",
    "student_id",
    "type",
    "amount",
    "processing_status",
    "deduction_date",
    "created_at",
];

pub const TRANSACTION_HEADERS: [&str; 11] = [
    "id",
    "student_id",
    "amount",
    "status",
    "type",
    "destination_account",
    "destination_bank",
    "reference_number",
    "initiated_at",
    "processed_at",
    "completed_at",
];

fn money(amount: &BigDecimal) -> String {
    amount.with_scale(2).to_string()
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn opt_timestamp(ts: &Option<DateTime<Utc>>) -> String {
    ts.as_ref().map(timestamp).unwrap_or_default()
}

pub fn stipend_record(s: &Stipend) -> Vec<String> {
    vec![
        s.id.to_string(),
        s.student_id.to_string(),
        money(&s.amount),
        s.stipend_class.as_str().to_string(),
        s.payment_status.as_str().to_string(),
        s.journal_number.clone(),
        timestamp(&s.created_at),
        timestamp(&s.modified_at),
    ]
}

pub fn deduction_record(d: &Deduction) -> Vec<String> {
    vec![
        d.id.to_string(),
        d.student_id.to_string(),
        d.type_tag.clone(),
        money(&d.amount),
        d.processing_status.as_str().to_string(),
        timestamp(&d.deduction_date),
        timestamp(&d.created_at),
    ]
}

pub fn transaction_record(t: &Transaction) -> Vec<String> {
    vec![
        t.id.to_string(),
        t.student_id.to_string(),
        money(&t.amount),
        t.status.as_str().to_string(),
        t.transaction_type.as_str().to_string(),
        t.destination_account.clone(),
        t.destination_bank.clone(),
        t.reference_number.clone().unwrap_or_default(),
        timestamp(&t.initiated_at),
        opt_timestamp(&t.processed_at),
        opt_timestamp(&t.completed_at),
    ]
}

/// Writes headers plus one record per row into an in-memory CSV document.
pub fn to_csv<T>(
    headers: &[&str],
    rows: &[T],
    record: impl Fn(&T) -> Vec<String>,
) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(record(row))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StipendClass, TransactionType};
    use std::str::FromStr;
    use uuid::Uuid;

    #[test]
    fn test_money_rendering() {
        assert_eq!(money(&BigDecimal::from_str("4700").unwrap()), "4700.00");
        assert_eq!(money(&BigDecimal::from_str("8.3").unwrap()), "8.30");
    }

    #[test]
    fn test_stipend_record_shape() {
        let stipend = Stipend::new(
            Uuid::new_v4(),
            StipendClass::SelfFunded,
            BigDecimal::from_str("5000").unwrap(),
            "BANK_TRANSFER".to_string(),
            "JN-001".to_string(),
            None,
        );
        let record = stipend_record(&stipend);

        assert_eq!(record.len(), STIPEND_HEADERS.len());
        assert_eq!(record[2], "5000.00");
        assert_eq!(record[3], "self-funded");
        assert_eq!(record[4], "pending");
    }

    #[test]
    fn test_transaction_blanks_for_nulls() {
        let transaction = Transaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BigDecimal::from_str("4700").unwrap(),
            "UNIV-OPERATING".to_string(),
            "9912345678".to_string(),
            "FNB".to_string(),
            "BANK_TRANSFER".to_string(),
            TransactionType::Stipend,
        );
        let record = transaction_record(&transaction);

        assert_eq!(record.len(), TRANSACTION_HEADERS.len());
        assert_eq!(record[7], "");
        assert_eq!(record[9], "");
        assert_eq!(record[10], "");
    }

    #[test]
    fn test_export_roundtrip() {
        let stipend = Stipend::new(
            Uuid::new_v4(),
            StipendClass::FullScholarship,
            BigDecimal::from_str("1200.50").unwrap(),
            "BANK_TRANSFER".to_string(),
            "JN-002".to_string(),
            Some("term 1".to_string()),
        );
        let csv_text = to_csv(&STIPEND_HEADERS, &[stipend.clone()], stipend_record).unwrap();

        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let parsed: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(&parsed[0][0], stipend.id.to_string().as_str());
        assert_eq!(&parsed[0][2], "1200.50");
    }
}
