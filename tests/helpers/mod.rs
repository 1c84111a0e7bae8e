//! Test helpers module
//!
//! Mock chat platforms, an optional Postgres database and test data for the
//! GatherBuddy integration tests.

#![allow(dead_code)]

pub mod database_helper;
pub mod discord_mock;
pub mod telegram_mock;
pub mod test_data;

pub use database_helper::*;
pub use discord_mock::*;
pub use telegram_mock::*;
pub use test_data::*;
