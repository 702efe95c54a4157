use crate::domain::payment::PixPayment;
use crate::error::Result;
use std::io::Write;

/// Writes payments as `id,amount,status,created_at` CSV.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payments<I>(&mut self, payments: I) -> Result<()>
    where
        I: IntoIterator<Item = PixPayment>,
    {
        for payment in payments {
            self.writer.serialize(&payment)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
