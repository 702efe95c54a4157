use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::str::FromStr;

/// One row of a payment request file. The amount is validated later, when
/// the payment is created.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PaymentRequest {
    #[serde(deserialize_with = "decimal_from_text")]
    pub amount: Decimal,
}

// csv infers numeric fields as f64; parse the raw text so precision and
// scale survive.
fn decimal_from_text<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Decimal::from_str(raw.trim()).map_err(serde::de::Error::custom)
}

/// Reads payment requests from a CSV source with an `amount` column.
///
/// Whitespace is trimmed and records may carry extra columns.
pub struct PaymentRequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentRequestReader<R> {
    /// Creates a new `PaymentRequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<PaymentRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "amount\n123.45\n 0.01 ";
        let reader = PaymentRequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().amount, dec!(123.45));
        assert_eq!(results[1].as_ref().unwrap().amount, dec!(0.01));
    }

    #[test]
    fn test_reader_keeps_non_positive_amounts_for_validation() {
        let data = "amount\n-5\n0";
        let reader = PaymentRequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();
        assert_eq!(results[0].as_ref().unwrap().amount, dec!(-5));
        assert_eq!(results[1].as_ref().unwrap().amount, dec!(0));
    }

    #[test]
    fn test_reader_keeps_precision_and_scale() {
        let data = "amount\n12345678901234567.89\n10.00";
        let reader = PaymentRequestReader::new(data.as_bytes());
        let amounts: Vec<String> = reader
            .requests()
            .map(|r| r.unwrap().amount.to_string())
            .collect();

        assert_eq!(amounts, vec!["12345678901234567.89", "10.00"]);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "amount\nnot_a_number\n10";
        let reader = PaymentRequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert!(matches!(results[0], Err(PaymentError::CsvError(_))));
        assert!(results[1].is_ok());
    }
}
