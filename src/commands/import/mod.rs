mod convert;
mod db_setup;
mod gateway;
mod pipeline;
mod reader;
mod run;

pub use db_setup::{CONTENT_ENTRIES_TABLE, open_store_read_only, table_exists};
pub use reader::RecordReader;
pub use run::run;
