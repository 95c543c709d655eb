pub mod catalog;
pub mod showing;
pub mod transaction;
pub mod user;
pub mod wallet;

pub use catalog::{Genre, Movie, Theater};
pub use showing::ShowingKey;
pub use transaction::{Transaction, TransactionSeat, TransactionStatus};
pub use user::{Role, User};
pub use wallet::{TopUpStatus, Wallet, WalletTransaction};
