pub mod ad_account;
pub mod brand;
pub mod company;
pub mod notification_log;
pub mod run_ledger;
pub mod user;
