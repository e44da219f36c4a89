pub mod intake_reader;
pub mod report_writer;
