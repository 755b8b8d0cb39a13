use crate::domain::money::Amount;
use crate::domain::order::{Order, OrderStatus, PaymentType};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// One output row per order, flattened for the CSV boundary.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OrderRow {
    pub order: String,
    pub target: String,
    pub payment_type: PaymentType,
    pub amount: Amount,
    pub currency: String,
    pub status: OrderStatus,
    pub reference: Option<String>,
    pub credited: bool,
    pub notified: bool,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            order: order.id.clone(),
            target: order.target.id().to_string(),
            payment_type: order.payment_type,
            amount: order.amount,
            currency: order.currency.clone(),
            status: order.status,
            reference: order.external_reference.clone(),
            credited: order.project_credited,
            notified: order.notified,
        }
    }
}

/// Writes the final order report to any `Write` sink (e.g. stdout, File).
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders<'a, I>(&mut self, orders: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Order>,
    {
        for order in orders {
            self.writer.serialize(OrderRow::from(order))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderTarget;

    #[test]
    fn test_report_row_shape() {
        let order = Order::new(
            OrderTarget::Project {
                project_id: "p1".to_string(),
            },
            PaymentType::Dp,
            Amount(500_00),
            "IDR",
        );
        let id = order.id.clone();

        let mut buffer = Vec::new();
        let mut writer = ReportWriter::new(&mut buffer);
        writer.write_orders([&order]).unwrap();
        drop(writer);

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "order,target,payment_type,amount,currency,status,reference,credited,notified"
        );
        assert_eq!(
            lines.next().unwrap(),
            format!("{id},p1,dp,50000,IDR,pending,,false,false")
        );
    }
}
