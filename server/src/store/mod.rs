//! Persistence seams.
//!
//! Every concern gets its own trait so services depend only on what they
//! touch. `PgStore` is the production backend and `MemoryStore` backs tests
//! and database-less local runs. Both implement the booking commit as one
//! atomic unit: seat claims, the wallet debit and the transaction row land
//! together or not at all.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Genre, Movie, Role, ShowingKey, Theater, TopUpStatus, Transaction, TransactionSeat, User,
    Wallet, WalletTransaction,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("seat {seat} is already booked for this showing")]
    SeatTaken { seat: String },

    #[error("wallet balance is lower than {required}")]
    InsufficientBalance { required: i64 },

    #[error("illegal status transition for top-up {0}")]
    IllegalTransition(Uuid),

    #[error("wallet balance would overflow")]
    BalanceOverflow,

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_genre(&self, genre: &Genre) -> StoreResult<()>;
    async fn find_genre(&self, id: Uuid) -> StoreResult<Option<Genre>>;
    async fn list_genres(&self) -> StoreResult<Vec<Genre>>;

    async fn insert_theater(&self, theater: &Theater) -> StoreResult<()>;
    async fn find_theater(&self, id: Uuid) -> StoreResult<Option<Theater>>;
    async fn list_theaters(&self) -> StoreResult<Vec<Theater>>;

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()>;
    async fn find_movie(&self, id: Uuid) -> StoreResult<Option<Movie>>;
    async fn list_movies(&self) -> StoreResult<Vec<Movie>>;
    async fn list_movies_by_genre(&self, genre_id: Uuid) -> StoreResult<Vec<Movie>>;
    /// Replaces every mutable field of the stored movie.
    async fn update_movie(&self, movie: &Movie) -> StoreResult<()>;
    async fn delete_movie(&self, id: Uuid) -> StoreResult<()>;

    /// Add-to-set: adding an id that is already listed is a no-op.
    async fn add_genre_movie(&self, genre_id: Uuid, movie_id: Uuid) -> StoreResult<()>;
    async fn remove_genre_movie(&self, genre_id: Uuid, movie_id: Uuid) -> StoreResult<()>;
    async fn add_theater_movie(&self, theater_id: Uuid, movie_id: Uuid) -> StoreResult<()>;
    async fn remove_theater_movie(&self, theater_id: Uuid, movie_id: Uuid) -> StoreResult<()>;
}

/// Outcome of applying a gateway verdict to a top-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The row moved out of `pending`; a success credited the wallet.
    Applied(WalletTransaction),
    /// The row had already been settled with this same verdict.
    AlreadySettled(WalletTransaction),
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn insert_wallet(&self, wallet: &Wallet) -> StoreResult<()>;
    async fn find_wallet(&self, id: Uuid) -> StoreResult<Option<Wallet>>;
    async fn find_wallet_by_user(&self, user_id: Uuid) -> StoreResult<Option<Wallet>>;
    /// Decrements the balance only while it covers `amount`.
    async fn debit_wallet(&self, wallet_id: Uuid, amount: i64) -> StoreResult<Wallet>;

    async fn insert_wallet_transaction(&self, entry: &WalletTransaction) -> StoreResult<()>;
    async fn find_wallet_transaction(&self, id: Uuid) -> StoreResult<Option<WalletTransaction>>;
    async fn set_payment_token(&self, id: Uuid, token: &str) -> StoreResult<()>;
    /// Newest first.
    async fn list_wallet_transactions(&self, wallet_id: Uuid)
        -> StoreResult<Vec<WalletTransaction>>;
    /// Moves a pending top-up to `outcome`, crediting the wallet in the same
    /// unit of work when the outcome is `Success`.
    async fn settle_top_up(&self, id: Uuid, outcome: TopUpStatus) -> StoreResult<Settlement>;
    /// Every top-up across all wallets, newest first.
    async fn list_all_wallet_transactions(&self) -> StoreResult<Vec<WalletTransaction>>;
}

/// Everything the booking commit writes.
#[derive(Debug, Clone)]
pub struct BookingCommit<'a> {
    pub wallet_id: Uuid,
    pub transaction: &'a Transaction,
    pub seats: &'a [TransactionSeat],
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Labels claimed for exactly this movie and showing.
    async fn booked_seats(&self, movie_id: Uuid, showing: &ShowingKey) -> StoreResult<Vec<String>>;
    /// Debits the wallet by the transaction total, stores the transaction and
    /// claims every seat. Returns the wallet after the debit.
    async fn commit_booking(&self, commit: BookingCommit<'_>) -> StoreResult<Wallet>;
    async fn seats_for_transaction(&self, transaction_id: Uuid)
        -> StoreResult<Vec<TransactionSeat>>;
    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>>;
    async fn find_transaction_by_key(
        &self,
        user_id: Uuid,
        idempotency_key: &str,
    ) -> StoreResult<Option<Transaction>>;
    async fn list_user_transactions(&self, user_id: Uuid) -> StoreResult<Vec<Transaction>>;
    /// Every booking, newest first.
    async fn list_transactions(&self) -> StoreResult<Vec<Transaction>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email_and_role(&self, email: &str, role: Role)
        -> StoreResult<Option<User>>;
    /// Oldest registration first.
    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>>;
}

/// The four store seams, usually all backed by one shared value.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub wallets: Arc<dyn WalletStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: CatalogStore + WalletStore + BookingStore + UserStore + 'static,
    {
        Self {
            catalog: store.clone(),
            wallets: store.clone(),
            bookings: store.clone(),
            users: store,
        }
    }
}
