use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    BookingCommit, BookingStore, CatalogStore, Settlement, StoreError, StoreResult, UserStore,
    WalletStore,
};
use crate::models::{
    Genre, Movie, Role, ShowingKey, Theater, TopUpStatus, Transaction, TransactionSeat,
    TransactionStatus, User, Wallet, WalletTransaction,
};

const SEAT_CLAIM_CONSTRAINT: &str = "transaction_seats_claim_key";
const IDEMPOTENCY_CONSTRAINT: &str = "transactions_idempotency_key";

const MOVIE_COLUMNS: &str = "id, title, genre_id, theater_ids, description, price, available, \
     bonus, thumbnail, created_at, updated_at";
const WALLET_COLUMNS: &str = "id, user_id, balance, created_at, updated_at";
const WALLET_TX_COLUMNS: &str = "id, wallet_id, amount, status, payment_token, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "t.id, t.user_id, t.movie_id, t.theater_id, t.showing, \
     t.subtotal, t.tax, t.booking_fee, t.total, t.status, t.idempotency_key, t.created_at, \
     ARRAY(SELECT s.id FROM transaction_seats s WHERE s.transaction_id = t.id \
     ORDER BY s.seat) AS seat_ids";

#[derive(FromRow)]
struct WalletTransactionRow {
    id: Uuid,
    wallet_id: Uuid,
    amount: i64,
    status: String,
    payment_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WalletTransactionRow> for WalletTransaction {
    type Error = StoreError;

    fn try_from(row: WalletTransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            wallet_id: row.wallet_id,
            amount: row.amount,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            payment_token: row.payment_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    movie_id: Uuid,
    theater_id: Uuid,
    showing: String,
    seat_ids: Vec<Uuid>,
    subtotal: i64,
    tax: i64,
    booking_fee: i64,
    total: i64,
    status: String,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id,
            theater_id: row.theater_id,
            showing: ShowingKey::parse(&row.showing)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            seat_ids: row.seat_ids,
            subtotal: row.subtotal,
            tax: row.tax,
            booking_fee: row.booking_fee,
            total: row.total,
            status: row
                .status
                .parse::<TransactionStatus>()
                .map_err(StoreError::Corrupt)?,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SeatRow {
    id: Uuid,
    transaction_id: Uuid,
    movie_id: Uuid,
    showing: String,
    seat: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SeatRow> for TransactionSeat {
    type Error = StoreError;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            transaction_id: row.transaction_id,
            movie_id: row.movie_id,
            showing: ShowingKey::parse(&row.showing)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            seat: row.seat,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    photo: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            photo: row.photo,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn out_of_range(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("22003"))
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Postgres backend. Back-reference lists live in `UUID[]` columns and are
/// updated with guarded `array_append` so they behave as sets.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn wallet_exists(&self, wallet_id: Uuid) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM wallets WHERE id = $1)")
            .bind(wallet_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_genre(&self, genre: &Genre) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO genres (id, name, movie_ids, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(genre.id)
        .bind(&genre.name)
        .bind(&genre.movie_ids)
        .bind(genre.created_at)
        .bind(genre.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_genre(&self, id: Uuid) -> StoreResult<Option<Genre>> {
        let genre = sqlx::query_as::<_, Genre>(
            "SELECT id, name, movie_ids, created_at, updated_at FROM genres WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(genre)
    }

    async fn list_genres(&self) -> StoreResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT id, name, movie_ids, created_at, updated_at FROM genres ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn insert_theater(&self, theater: &Theater) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO theaters (id, name, city, movie_ids, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(theater.id)
        .bind(&theater.name)
        .bind(&theater.city)
        .bind(&theater.movie_ids)
        .bind(theater.created_at)
        .bind(theater.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_theater(&self, id: Uuid) -> StoreResult<Option<Theater>> {
        let theater = sqlx::query_as::<_, Theater>(
            "SELECT id, name, city, movie_ids, created_at, updated_at FROM theaters WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(theater)
    }

    async fn list_theaters(&self) -> StoreResult<Vec<Theater>> {
        let theaters = sqlx::query_as::<_, Theater>(
            "SELECT id, name, city, movie_ids, created_at, updated_at FROM theaters \
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(theaters)
    }

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO movies (id, title, genre_id, theater_ids, description, price, available, \
             bonus, thumbnail, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(movie.id)
        .bind(&movie.title)
        .bind(movie.genre_id)
        .bind(&movie.theater_ids)
        .bind(&movie.description)
        .bind(movie.price)
        .bind(movie.available)
        .bind(&movie.bonus)
        .bind(&movie.thumbnail)
        .bind(movie.created_at)
        .bind(movie.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_movie(&self, id: Uuid) -> StoreResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn list_movies_by_genre(&self, genre_id: Uuid) -> StoreResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE genre_id = $1 ORDER BY created_at"
        ))
        .bind(genre_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn update_movie(&self, movie: &Movie) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE movies SET title = $2, genre_id = $3, theater_ids = $4, description = $5, \
             price = $6, available = $7, bonus = $8, thumbnail = $9, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(movie.id)
        .bind(&movie.title)
        .bind(movie.genre_id)
        .bind(&movie.theater_ids)
        .bind(&movie.description)
        .bind(movie.price)
        .bind(movie.available)
        .bind(&movie.bonus)
        .bind(&movie.thumbnail)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("movie"));
        }
        Ok(())
    }

    async fn delete_movie(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("movie"));
        }
        Ok(())
    }

    async fn add_genre_movie(&self, genre_id: Uuid, movie_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE genres SET movie_ids = CASE WHEN $2 = ANY(movie_ids) THEN movie_ids \
             ELSE array_append(movie_ids, $2) END, updated_at = NOW() WHERE id = $1",
        )
        .bind(genre_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("genre"));
        }
        Ok(())
    }

    async fn remove_genre_movie(&self, genre_id: Uuid, movie_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "UPDATE genres SET movie_ids = array_remove(movie_ids, $2), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(genre_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_theater_movie(&self, theater_id: Uuid, movie_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE theaters SET movie_ids = CASE WHEN $2 = ANY(movie_ids) THEN movie_ids \
             ELSE array_append(movie_ids, $2) END, updated_at = NOW() WHERE id = $1",
        )
        .bind(theater_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("theater"));
        }
        Ok(())
    }

    async fn remove_theater_movie(&self, theater_id: Uuid, movie_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "UPDATE theaters SET movie_ids = array_remove(movie_ids, $2), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(theater_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl WalletStore for PgStore {
    async fn insert_wallet(&self, wallet: &Wallet) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO wallets (id, user_id, balance, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(wallet.id)
        .bind(wallet.user_id)
        .bind(wallet.balance)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some(_) => StoreError::Conflict(format!("user {} already owns a wallet", wallet.user_id)),
            None => StoreError::Database(e),
        })?;
        Ok(())
    }

    async fn find_wallet(&self, id: Uuid) -> StoreResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(wallet)
    }

    async fn find_wallet_by_user(&self, user_id: Uuid) -> StoreResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(wallet)
    }

    async fn debit_wallet(&self, wallet_id: Uuid, amount: i64) -> StoreResult<Wallet> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "UPDATE wallets SET balance = balance - $2, updated_at = NOW() \
             WHERE id = $1 AND balance >= $2 RETURNING {WALLET_COLUMNS}"
        ))
        .bind(wallet_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        match wallet {
            Some(wallet) => Ok(wallet),
            None if self.wallet_exists(wallet_id).await? => {
                Err(StoreError::InsufficientBalance { required: amount })
            }
            None => Err(StoreError::NotFound("wallet")),
        }
    }

    async fn insert_wallet_transaction(&self, entry: &WalletTransaction) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO wallet_transactions \
             (id, wallet_id, amount, status, payment_token, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.wallet_id)
        .bind(entry.amount)
        .bind(entry.status.as_str())
        .bind(&entry.payment_token)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_wallet_transaction(&self, id: Uuid) -> StoreResult<Option<WalletTransaction>> {
        let row = sqlx::query_as::<_, WalletTransactionRow>(&format!(
            "SELECT {WALLET_TX_COLUMNS} FROM wallet_transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(WalletTransaction::try_from).transpose()
    }

    async fn set_payment_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE wallet_transactions SET payment_token = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("wallet transaction"));
        }
        Ok(())
    }

    async fn list_wallet_transactions(
        &self,
        wallet_id: Uuid,
    ) -> StoreResult<Vec<WalletTransaction>> {
        let rows = sqlx::query_as::<_, WalletTransactionRow>(&format!(
            "SELECT {WALLET_TX_COLUMNS} FROM wallet_transactions WHERE wallet_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn settle_top_up(&self, id: Uuid, outcome: TopUpStatus) -> StoreResult<Settlement> {
        if !outcome.is_settled() {
            return Err(StoreError::IllegalTransition(id));
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, WalletTransactionRow>(&format!(
            "SELECT {WALLET_TX_COLUMNS} FROM wallet_transactions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("wallet transaction"))?;
        let entry = WalletTransaction::try_from(row)?;

        if entry.status == outcome {
            return Ok(Settlement::AlreadySettled(entry));
        }
        if entry.status.is_settled() {
            return Err(StoreError::IllegalTransition(id));
        }

        let row = sqlx::query_as::<_, WalletTransactionRow>(&format!(
            "UPDATE wallet_transactions SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {WALLET_TX_COLUMNS}"
        ))
        .bind(id)
        .bind(outcome.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let settled = WalletTransaction::try_from(row)?;

        if outcome == TopUpStatus::Success {
            sqlx::query(
                "UPDATE wallets SET balance = balance + $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(settled.wallet_id)
            .bind(settled.amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if out_of_range(&e) {
                    StoreError::BalanceOverflow
                } else {
                    StoreError::Database(e)
                }
            })?;
        }

        tx.commit().await?;
        Ok(Settlement::Applied(settled))
    }

    async fn list_all_wallet_transactions(&self) -> StoreResult<Vec<WalletTransaction>> {
        let rows = sqlx::query_as::<_, WalletTransactionRow>(&format!(
            "SELECT {WALLET_TX_COLUMNS} FROM wallet_transactions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn booked_seats(&self, movie_id: Uuid, showing: &ShowingKey) -> StoreResult<Vec<String>> {
        let seats: Vec<(String,)> = sqlx::query_as(
            "SELECT s.seat FROM transaction_seats s \
             JOIN transactions t ON t.id = s.transaction_id \
             WHERE t.movie_id = $1 AND t.showing = $2 ORDER BY s.seat",
        )
        .bind(movie_id)
        .bind(showing.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(seats.into_iter().map(|(seat,)| seat).collect())
    }

    async fn commit_booking(&self, commit: BookingCommit<'_>) -> StoreResult<Wallet> {
        let transaction = commit.transaction;
        let mut tx = self.pool.begin().await?;

        // The key is claimed first so a duplicate request surfaces as a replay.
        sqlx::query(
            "INSERT INTO transactions (id, user_id, movie_id, theater_id, showing, subtotal, tax, \
             booking_fee, total, status, idempotency_key, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(transaction.id)
        .bind(transaction.user_id)
        .bind(transaction.movie_id)
        .bind(transaction.theater_id)
        .bind(transaction.showing.as_str())
        .bind(transaction.subtotal)
        .bind(transaction.tax)
        .bind(transaction.booking_fee)
        .bind(transaction.total)
        .bind(transaction.status.as_str())
        .bind(&transaction.idempotency_key)
        .bind(transaction.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match violated_constraint(&e).as_deref() {
            Some(IDEMPOTENCY_CONSTRAINT) => {
                StoreError::Conflict("idempotency key already used".to_string())
            }
            _ => StoreError::Database(e),
        })?;

        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "UPDATE wallets SET balance = balance - $2, updated_at = NOW() \
             WHERE id = $1 AND balance >= $2 RETURNING {WALLET_COLUMNS}"
        ))
        .bind(commit.wallet_id)
        .bind(transaction.total)
        .fetch_optional(&mut *tx)
        .await?;
        let wallet = match wallet {
            Some(wallet) => wallet,
            None if self.wallet_exists(commit.wallet_id).await? => {
                return Err(StoreError::InsufficientBalance {
                    required: transaction.total,
                })
            }
            None => return Err(StoreError::NotFound("wallet")),
        };

        for seat in commit.seats {
            sqlx::query(
                "INSERT INTO transaction_seats (id, transaction_id, movie_id, showing, seat, \
                 created_at) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(seat.id)
            .bind(seat.transaction_id)
            .bind(seat.movie_id)
            .bind(seat.showing.as_str())
            .bind(&seat.seat)
            .bind(seat.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match violated_constraint(&e).as_deref() {
                Some(SEAT_CLAIM_CONSTRAINT) => StoreError::SeatTaken {
                    seat: seat.seat.clone(),
                },
                _ => StoreError::Database(e),
            })?;
        }

        tx.commit().await?;
        Ok(wallet)
    }

    async fn seats_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> StoreResult<Vec<TransactionSeat>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, transaction_id, movie_id, showing, seat, created_at \
             FROM transaction_seats WHERE transaction_id = $1 ORDER BY seat",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn find_transaction_by_key(
        &self,
        user_id: Uuid,
        idempotency_key: &str,
    ) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t \
             WHERE t.user_id = $1 AND t.idempotency_key = $2"
        ))
        .bind(user_id)
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn list_user_transactions(&self, user_id: Uuid) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.user_id = $1 \
             ORDER BY t.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_transactions(&self) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t ORDER BY t.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, photo, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.photo)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some(_) => StoreError::Conflict(format!("email {} is already registered", user.email)),
            None => StoreError::Database(e),
        })?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, photo, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email_and_role(
        &self,
        email: &str,
        role: Role,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, photo, created_at FROM users \
             WHERE email = $1 AND role = $2",
        )
        .bind(email)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, photo, created_at FROM users \
             WHERE role = $1 ORDER BY created_at",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}
