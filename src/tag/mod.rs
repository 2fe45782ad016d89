// Tag records and the tag database

mod db;
mod record;

pub use db::TagDb;
pub use record::{Mac, MacParseError, TagRecord, WakeReason, NEVER};

#[cfg(test)]
mod tests;
