pub mod accounts;
pub mod booking;
pub mod catalog;
pub mod relations;
pub mod reports;
pub mod seats;
pub mod wallet;

#[cfg(test)]
pub(crate) mod fixtures;

pub use accounts::AccountService;
pub use booking::BookingEngine;
pub use catalog::CatalogService;
pub use relations::RelationMaintainer;
pub use reports::AdminReports;
pub use seats::SeatInventory;
pub use wallet::WalletLedger;
