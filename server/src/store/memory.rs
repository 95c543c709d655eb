use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    BookingCommit, BookingStore, CatalogStore, Settlement, StoreError, StoreResult, UserStore,
    WalletStore,
};
use crate::models::{
    Genre, Movie, Role, ShowingKey, Theater, TopUpStatus, Transaction, TransactionSeat, User,
    Wallet, WalletTransaction,
};

#[derive(Default)]
struct State {
    genres: HashMap<Uuid, Genre>,
    theaters: HashMap<Uuid, Theater>,
    movies: HashMap<Uuid, Movie>,
    users: HashMap<Uuid, User>,
    wallets: HashMap<Uuid, Wallet>,
    wallet_transactions: HashMap<Uuid, WalletTransaction>,
    transactions: HashMap<Uuid, Transaction>,
    seats: Vec<TransactionSeat>,
}

impl State {
    fn seat_ids(&self, transaction_id: Uuid) -> Vec<Uuid> {
        self.seats
            .iter()
            .filter(|seat| seat.transaction_id == transaction_id)
            .map(|seat| seat.id)
            .collect()
    }

    fn hydrate(&self, transaction: &Transaction) -> Transaction {
        let mut transaction = transaction.clone();
        transaction.seat_ids = self.seat_ids(transaction.id);
        transaction
    }
}

/// Process-local store. Each call holds a single lock, so every operation,
/// the booking commit included, is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn add_to_set(ids: &mut Vec<Uuid>, id: Uuid) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_genre(&self, genre: &Genre) -> StoreResult<()> {
        self.state.lock().await.genres.insert(genre.id, genre.clone());
        Ok(())
    }

    async fn find_genre(&self, id: Uuid) -> StoreResult<Option<Genre>> {
        Ok(self.state.lock().await.genres.get(&id).cloned())
    }

    async fn list_genres(&self) -> StoreResult<Vec<Genre>> {
        let mut genres: Vec<Genre> = self.state.lock().await.genres.values().cloned().collect();
        genres.sort_by_key(|genre| genre.created_at);
        Ok(genres)
    }

    async fn insert_theater(&self, theater: &Theater) -> StoreResult<()> {
        self.state
            .lock()
            .await
            .theaters
            .insert(theater.id, theater.clone());
        Ok(())
    }

    async fn find_theater(&self, id: Uuid) -> StoreResult<Option<Theater>> {
        Ok(self.state.lock().await.theaters.get(&id).cloned())
    }

    async fn list_theaters(&self) -> StoreResult<Vec<Theater>> {
        let mut theaters: Vec<Theater> =
            self.state.lock().await.theaters.values().cloned().collect();
        theaters.sort_by_key(|theater| theater.created_at);
        Ok(theaters)
    }

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()> {
        self.state.lock().await.movies.insert(movie.id, movie.clone());
        Ok(())
    }

    async fn find_movie(&self, id: Uuid) -> StoreResult<Option<Movie>> {
        Ok(self.state.lock().await.movies.get(&id).cloned())
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let mut movies: Vec<Movie> = self.state.lock().await.movies.values().cloned().collect();
        movies.sort_by_key(|movie| movie.created_at);
        Ok(movies)
    }

    async fn list_movies_by_genre(&self, genre_id: Uuid) -> StoreResult<Vec<Movie>> {
        let mut movies: Vec<Movie> = self
            .state
            .lock()
            .await
            .movies
            .values()
            .filter(|movie| movie.genre_id == genre_id)
            .cloned()
            .collect();
        movies.sort_by_key(|movie| movie.created_at);
        Ok(movies)
    }

    async fn update_movie(&self, movie: &Movie) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .movies
            .get_mut(&movie.id)
            .ok_or(StoreError::NotFound("movie"))?;
        *stored = movie.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_movie(&self, id: Uuid) -> StoreResult<()> {
        self.state
            .lock()
            .await
            .movies
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("movie"))
    }

    async fn add_genre_movie(&self, genre_id: Uuid, movie_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let genre = state
            .genres
            .get_mut(&genre_id)
            .ok_or(StoreError::NotFound("genre"))?;
        add_to_set(&mut genre.movie_ids, movie_id);
        Ok(())
    }

    async fn remove_genre_movie(&self, genre_id: Uuid, movie_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(genre) = state.genres.get_mut(&genre_id) {
            genre.movie_ids.retain(|id| *id != movie_id);
        }
        Ok(())
    }

    async fn add_theater_movie(&self, theater_id: Uuid, movie_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let theater = state
            .theaters
            .get_mut(&theater_id)
            .ok_or(StoreError::NotFound("theater"))?;
        add_to_set(&mut theater.movie_ids, movie_id);
        Ok(())
    }

    async fn remove_theater_movie(&self, theater_id: Uuid, movie_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(theater) = state.theaters.get_mut(&theater_id) {
            theater.movie_ids.retain(|id| *id != movie_id);
        }
        Ok(())
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn insert_wallet(&self, wallet: &Wallet) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.wallets.values().any(|w| w.user_id == wallet.user_id) {
            return Err(StoreError::Conflict(format!(
                "user {} already owns a wallet",
                wallet.user_id
            )));
        }
        state.wallets.insert(wallet.id, wallet.clone());
        Ok(())
    }

    async fn find_wallet(&self, id: Uuid) -> StoreResult<Option<Wallet>> {
        Ok(self.state.lock().await.wallets.get(&id).cloned())
    }

    async fn find_wallet_by_user(&self, user_id: Uuid) -> StoreResult<Option<Wallet>> {
        Ok(self
            .state
            .lock()
            .await
            .wallets
            .values()
            .find(|wallet| wallet.user_id == user_id)
            .cloned())
    }

    async fn debit_wallet(&self, wallet_id: Uuid, amount: i64) -> StoreResult<Wallet> {
        let mut state = self.state.lock().await;
        let wallet = state
            .wallets
            .get_mut(&wallet_id)
            .ok_or(StoreError::NotFound("wallet"))?;
        if wallet.balance < amount {
            return Err(StoreError::InsufficientBalance { required: amount });
        }
        wallet.balance -= amount;
        wallet.updated_at = Utc::now();
        Ok(wallet.clone())
    }

    async fn insert_wallet_transaction(&self, entry: &WalletTransaction) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.wallets.contains_key(&entry.wallet_id) {
            return Err(StoreError::NotFound("wallet"));
        }
        state.wallet_transactions.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn find_wallet_transaction(&self, id: Uuid) -> StoreResult<Option<WalletTransaction>> {
        Ok(self.state.lock().await.wallet_transactions.get(&id).cloned())
    }

    async fn set_payment_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let entry = state
            .wallet_transactions
            .get_mut(&id)
            .ok_or(StoreError::NotFound("wallet transaction"))?;
        entry.payment_token = Some(token.to_string());
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn list_wallet_transactions(
        &self,
        wallet_id: Uuid,
    ) -> StoreResult<Vec<WalletTransaction>> {
        let mut entries: Vec<WalletTransaction> = self
            .state
            .lock()
            .await
            .wallet_transactions
            .values()
            .filter(|entry| entry.wallet_id == wallet_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn list_all_wallet_transactions(&self) -> StoreResult<Vec<WalletTransaction>> {
        let mut entries: Vec<WalletTransaction> = self
            .state
            .lock()
            .await
            .wallet_transactions
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn settle_top_up(&self, id: Uuid, outcome: TopUpStatus) -> StoreResult<Settlement> {
        let mut state = self.state.lock().await;
        let entry = state
            .wallet_transactions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("wallet transaction"))?;

        if !outcome.is_settled() {
            return Err(StoreError::IllegalTransition(id));
        }
        if entry.status == outcome {
            return Ok(Settlement::AlreadySettled(entry));
        }
        if entry.status.is_settled() {
            return Err(StoreError::IllegalTransition(id));
        }

        let now = Utc::now();
        if outcome == TopUpStatus::Success {
            let wallet = state
                .wallets
                .get_mut(&entry.wallet_id)
                .ok_or(StoreError::NotFound("wallet"))?;
            wallet.balance = wallet
                .balance
                .checked_add(entry.amount)
                .ok_or(StoreError::BalanceOverflow)?;
            wallet.updated_at = now;
        }

        let stored = state
            .wallet_transactions
            .get_mut(&id)
            .ok_or(StoreError::NotFound("wallet transaction"))?;
        stored.status = outcome;
        stored.updated_at = now;
        Ok(Settlement::Applied(stored.clone()))
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn booked_seats(&self, movie_id: Uuid, showing: &ShowingKey) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .seats
            .iter()
            .filter(|seat| seat.movie_id == movie_id && &seat.showing == showing)
            .map(|seat| seat.seat.clone())
            .collect())
    }

    async fn commit_booking(&self, commit: BookingCommit<'_>) -> StoreResult<Wallet> {
        let mut state = self.state.lock().await;
        let transaction = commit.transaction;

        // Validate everything before the first write so a failure leaves no trace.
        // The key goes first: a duplicate request is a replay, not a seat clash.
        if let Some(key) = &transaction.idempotency_key {
            let replayed = state.transactions.values().any(|existing| {
                existing.user_id == transaction.user_id
                    && existing.idempotency_key.as_deref() == Some(key.as_str())
            });
            if replayed {
                return Err(StoreError::Conflict(format!(
                    "idempotency key '{key}' already used"
                )));
            }
        }

        let balance = state
            .wallets
            .get(&commit.wallet_id)
            .map(|wallet| wallet.balance)
            .ok_or(StoreError::NotFound("wallet"))?;
        if balance < transaction.total {
            return Err(StoreError::InsufficientBalance {
                required: transaction.total,
            });
        }
        for claim in commit.seats {
            let taken = state.seats.iter().any(|seat| {
                seat.movie_id == claim.movie_id
                    && seat.showing == claim.showing
                    && seat.seat == claim.seat
            });
            if taken {
                return Err(StoreError::SeatTaken {
                    seat: claim.seat.clone(),
                });
            }
        }

        let mut stored = transaction.clone();
        stored.seat_ids.clear();
        state.transactions.insert(stored.id, stored);
        state.seats.extend(commit.seats.iter().cloned());

        let wallet = state
            .wallets
            .get_mut(&commit.wallet_id)
            .ok_or(StoreError::NotFound("wallet"))?;
        wallet.balance -= transaction.total;
        wallet.updated_at = Utc::now();
        Ok(wallet.clone())
    }

    async fn seats_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> StoreResult<Vec<TransactionSeat>> {
        let state = self.state.lock().await;
        Ok(state
            .seats
            .iter()
            .filter(|seat| seat.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state.transactions.get(&id).map(|t| state.hydrate(t)))
    }

    async fn find_transaction_by_key(
        &self,
        user_id: Uuid,
        idempotency_key: &str,
    ) -> StoreResult<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .values()
            .find(|t| t.user_id == user_id && t.idempotency_key.as_deref() == Some(idempotency_key))
            .map(|t| state.hydrate(t)))
    }

    async fn list_user_transactions(&self, user_id: Uuid) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .map(|t| state.hydrate(t))
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn list_transactions(&self) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut transactions: Vec<Transaction> =
            state.transactions.values().map(|t| state.hydrate(t)).collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email_and_role(
        &self,
        email: &str,
        role: Role,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|user| user.email == email && user.role == role)
            .cloned())
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .state
            .lock()
            .await
            .users
            .values()
            .filter(|user| user.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}
