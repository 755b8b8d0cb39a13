use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Seed a project. `id` = project id, `target` = client id, `amount` = total cost.
    Project,
    /// Seed a digital product. `id` = product id, `target` = name, `amount` = price.
    Product,
    /// Seed an affiliate. `id` = affiliate id, `rate` = commission rate.
    Affiliate,
    /// Open an order. `id` = caller alias for the new order, `target` =
    /// project/product id prefixed with `project:` or `product:`.
    Checkout,
    /// Pick an instrument for an open order. `id` = order alias,
    /// `instrument` names the choice (and implies the rail).
    Select,
    /// Deliver a gateway event. `id` = order alias, `status` = canonical status.
    Event,
    /// Administrative confirmation of a manual transfer. `id` = order alias.
    Confirm,
    /// Administrative rejection. `id` = order alias, `target` = reason.
    Reject,
}

/// One line of the operations file. Most columns are optional; which ones an
/// op reads is documented on [`OpKind`].
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OpRecord {
    pub op: OpKind,
    pub id: String,
    pub target: Option<String>,
    pub amount: Option<i64>,
    pub payment_type: Option<String>,
    pub instrument: Option<String>,
    pub status: Option<String>,
    pub affiliate: Option<String>,
    pub rate: Option<Decimal>,
}

/// Reads replay operations from a CSV source.
///
/// Wraps `csv::Reader` and yields an iterator over `Result<OpRecord>`, with
/// whitespace trimming and flexible record lengths so short rows only need
/// the columns their op uses.
pub struct OpReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OpReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes operations, streaming large files
    /// without loading the whole dataset.
    pub fn ops(self) -> impl Iterator<Item = Result<OpRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str =
        "op, id, target, amount, payment_type, instrument, status, affiliate, rate";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\n\
             project, p1, client-9, 100000, , , , ,\n\
             checkout, o1, project:p1, , dp, , , ,\n\
             affiliate, a1, , , , , , , 0.10"
        );
        let reader = OpReader::new(data.as_bytes());
        let results: Vec<Result<OpRecord>> = reader.ops().collect();

        assert_eq!(results.len(), 3);
        let seed = results[0].as_ref().unwrap();
        assert_eq!(seed.op, OpKind::Project);
        assert_eq!(seed.amount, Some(100_000));
        let checkout = results[1].as_ref().unwrap();
        assert_eq!(checkout.payment_type.as_deref(), Some("dp"));
        let affiliate = results[2].as_ref().unwrap();
        assert_eq!(affiliate.rate, Some(dec!(0.10)));
    }

    #[test]
    fn test_reader_short_row_is_padded() {
        let data = format!("{HEADER}\nconfirm, o1");
        let reader = OpReader::new(data.as_bytes());
        let results: Vec<Result<OpRecord>> = reader.ops().collect();
        let record = results[0].as_ref().unwrap();
        assert_eq!(record.op, OpKind::Confirm);
        assert_eq!(record.target, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{HEADER}\nteleport, o1, , , , , , ,");
        let reader = OpReader::new(data.as_bytes());
        let results: Vec<Result<OpRecord>> = reader.ops().collect();
        assert!(results[0].is_err());
    }
}
