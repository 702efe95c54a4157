pub mod payment_writer;
pub mod request_reader;
