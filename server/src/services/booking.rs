use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::seats::{is_valid_seat, SeatInventory};
use crate::auth::Principal;
use crate::models::{ShowingKey, Transaction, TransactionSeat, TransactionStatus};
use crate::storage::{FileStorage, THUMBNAILS};
use crate::store::{BookingCommit, BookingStore, CatalogStore, WalletStore};
use crate::utils::error::AppError;
use crate::utils::validation::Validator;

/// Body of `POST /api/customer/ticket`. Every field is optional at the wire
/// level so a bad request reports all of its problems at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub movie_id: Option<Uuid>,
    pub theater_id: Option<Uuid>,
    pub date: Option<String>,
    #[serde(default)]
    pub seats: Vec<String>,
    pub subtotal: Option<i64>,
    pub tax: Option<i64>,
    pub booking_fee: Option<i64>,
    pub total: Option<i64>,
}

/// A request that passed shape validation.
#[derive(Debug, Clone)]
struct Order {
    movie_id: Uuid,
    theater_id: Uuid,
    showing: ShowingKey,
    seats: Vec<String>,
    subtotal: i64,
    tax: i64,
    booking_fee: i64,
    total: i64,
}

fn required<T: Copy>(v: &mut Validator, field: &str, value: Option<T>) -> Option<T> {
    v.check(value.is_some(), format!("{field} is required"));
    value
}

impl BookingRequest {
    fn validate(self) -> Result<Order, AppError> {
        let mut v = Validator::new();

        let movie_id = required(&mut v, "movieId", self.movie_id);
        let theater_id = required(&mut v, "theaterId", self.theater_id);

        let showing = match self.date.as_deref() {
            Some(raw) => match ShowingKey::parse(raw) {
                Ok(key) => Some(key),
                Err(e) => {
                    v.check(false, e.to_string());
                    None
                }
            },
            None => {
                v.check(false, "date is required");
                None
            }
        };

        v.check(!self.seats.is_empty(), "seats must not be empty");
        {
            let mut seen = HashSet::new();
            for seat in &self.seats {
                v.check(is_valid_seat(seat), format!("seat '{seat}' does not exist"));
                v.check(seen.insert(seat.as_str()), format!("seat '{seat}' is listed twice"));
            }
        }

        let subtotal = required(&mut v, "subtotal", self.subtotal);
        let tax = required(&mut v, "tax", self.tax);
        let booking_fee = required(&mut v, "bookingFee", self.booking_fee);
        let total = required(&mut v, "total", self.total);
        for (field, value) in [
            ("subtotal", subtotal),
            ("tax", tax),
            ("bookingFee", booking_fee),
            ("total", total),
        ] {
            if let Some(value) = value {
                v.non_negative(field, value);
            }
        }

        if let (Some(subtotal), Some(tax), Some(fee), Some(total)) =
            (subtotal, tax, booking_fee, total)
        {
            match subtotal.checked_add(tax).and_then(|sum| sum.checked_add(fee)) {
                Some(expected) => v.check(
                    expected == total,
                    format!("total must equal subtotal + tax + bookingFee ({expected})"),
                ),
                None => v.check(false, "amounts are too large"),
            };
        }

        v.finish()?;

        match (movie_id, theater_id, showing, subtotal, tax, booking_fee, total) {
            (
                Some(movie_id),
                Some(theater_id),
                Some(showing),
                Some(subtotal),
                Some(tax),
                Some(booking_fee),
                Some(total),
            ) => Ok(Order {
                movie_id,
                theater_id,
                showing,
                seats: self.seats,
                subtotal,
                tax,
                booking_fee,
                total,
            }),
            _ => Err(AppError::UnexpectedError(
                "validated booking is missing a field".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderMovie {
    pub id: Uuid,
    pub title: String,
    pub genre: Option<String>,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderTheater {
    pub id: Uuid,
    pub name: String,
    pub city: String,
}

/// A booking as the customer sees it, with the catalog entries resolved.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub date: ShowingKey,
    pub status: TransactionStatus,
    pub subtotal: i64,
    pub tax: i64,
    pub booking_fee: i64,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    /// `None` once the movie has been deleted from the catalog.
    pub movie: Option<OrderMovie>,
    pub theater: Option<OrderTheater>,
    pub seats: Vec<String>,
}

#[derive(Clone)]
pub struct BookingEngine {
    catalog: Arc<dyn CatalogStore>,
    wallets: Arc<dyn WalletStore>,
    bookings: Arc<dyn BookingStore>,
    seats: SeatInventory,
    files: Arc<dyn FileStorage>,
}

impl BookingEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        wallets: Arc<dyn WalletStore>,
        bookings: Arc<dyn BookingStore>,
        files: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            seats: SeatInventory::new(bookings.clone()),
            catalog,
            wallets,
            bookings,
            files,
        }
    }

    /// Books seats for one showing and pays for them from the wallet.
    ///
    /// A repeated `idempotency_key` from the same customer returns the
    /// transaction the first call created and charges nothing, including
    /// when the two calls race each other.
    #[tracing::instrument(skip(self, principal, request), fields(user_id = %principal.id))]
    pub async fn book(
        &self,
        principal: &Principal,
        request: BookingRequest,
        idempotency_key: Option<String>,
    ) -> Result<Transaction, AppError> {
        let key = idempotency_key.clone();
        if let Some(existing) = self.replay(principal.id, key.as_deref()).await? {
            info!(transaction_id = %existing.id, "Replayed booking for idempotency key");
            return Ok(existing);
        }

        match self.place(principal, request, idempotency_key).await {
            // The winner of a same-key race spent the seats and the balance.
            Err(
                err @ (AppError::SeatUnavailable(_)
                | AppError::InsufficientFunds
                | AppError::Conflict(_)),
            ) => match self.replay(principal.id, key.as_deref()).await? {
                Some(existing) => {
                    info!(transaction_id = %existing.id, "Replayed booking after key race");
                    Ok(existing)
                }
                None => Err(err),
            },
            other => other,
        }
    }

    async fn replay(
        &self,
        user_id: Uuid,
        idempotency_key: Option<&str>,
    ) -> Result<Option<Transaction>, AppError> {
        match idempotency_key {
            Some(key) => Ok(self.bookings.find_transaction_by_key(user_id, key).await?),
            None => Ok(None),
        }
    }

    async fn place(
        &self,
        principal: &Principal,
        request: BookingRequest,
        idempotency_key: Option<String>,
    ) -> Result<Transaction, AppError> {
        let order = request.validate()?;

        let movie = self
            .catalog
            .find_movie(order.movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Movie not found".into()))?;
        if self.catalog.find_theater(order.theater_id).await?.is_none() {
            return Err(AppError::NotFound("Theater not found".into()));
        }
        if !movie.screens_at(order.theater_id) {
            return Err(AppError::validation("movie is not screened at this theater"));
        }
        if !movie.available {
            return Err(AppError::validation("movie is not available for booking"));
        }

        let wallet = match self.wallets.find_wallet_by_user(principal.id).await? {
            Some(wallet) if wallet.balance >= order.total => wallet,
            _ => return Err(AppError::InsufficientFunds),
        };

        // Early, friendlier refusal; the commit enforces the claim regardless.
        let booked = self.seats.booked_seats(order.movie_id, &order.showing).await?;
        if let Some(seat) = order.seats.iter().find(|seat| booked.contains(seat)) {
            return Err(AppError::SeatUnavailable(seat.clone()));
        }

        let mut transaction = Transaction {
            id: Uuid::new_v4(),
            user_id: principal.id,
            movie_id: order.movie_id,
            theater_id: order.theater_id,
            showing: order.showing,
            seat_ids: Vec::new(),
            subtotal: order.subtotal,
            tax: order.tax,
            booking_fee: order.booking_fee,
            total: order.total,
            status: TransactionStatus::Success,
            idempotency_key,
            created_at: Utc::now(),
        };
        let claims: Vec<TransactionSeat> = order
            .seats
            .iter()
            .map(|seat| TransactionSeat::claim(&transaction, seat.as_str()))
            .collect();

        let commit = BookingCommit {
            wallet_id: wallet.id,
            transaction: &transaction,
            seats: &claims,
        };
        let wallet = match self.bookings.commit_booking(commit).await {
            Ok(wallet) => wallet,
            Err(e) => {
                warn!(error = %e, "Booking commit refused");
                return Err(e.into());
            }
        };

        let stored = self.bookings.seats_for_transaction(transaction.id).await?;
        if stored.len() != claims.len() {
            error!(
                transaction_id = %transaction.id,
                expected = claims.len(),
                found = stored.len(),
                "Committed booking is missing seat claims"
            );
            return Err(AppError::UnexpectedError("seat claims incomplete".into()));
        }
        transaction.seat_ids = stored.iter().map(|seat| seat.id).collect();

        info!(
            transaction_id = %transaction.id,
            seats = claims.len(),
            total = transaction.total,
            balance = wallet.balance,
            "Booking committed"
        );
        Ok(transaction)
    }

    pub async fn orders(&self, principal: &Principal) -> Result<Vec<OrderView>, AppError> {
        let transactions = self.bookings.list_user_transactions(principal.id).await?;
        let mut views = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            views.push(self.view(transaction).await?);
        }
        Ok(views)
    }

    /// One of the caller's own orders. Another customer's order is reported
    /// as missing.
    pub async fn order(&self, principal: &Principal, id: Uuid) -> Result<OrderView, AppError> {
        match self.bookings.find_transaction(id).await? {
            Some(transaction) if transaction.user_id == principal.id => self.view(transaction).await,
            _ => Err(AppError::NotFound("Order not found".into())),
        }
    }

    async fn view(&self, transaction: Transaction) -> Result<OrderView, AppError> {
        let mut seats: Vec<String> = self
            .bookings
            .seats_for_transaction(transaction.id)
            .await?
            .into_iter()
            .map(|seat| seat.seat)
            .collect();
        seats.sort();

        let movie = match self.catalog.find_movie(transaction.movie_id).await? {
            Some(movie) => {
                let genre = self.catalog.find_genre(movie.genre_id).await?;
                Some(OrderMovie {
                    id: movie.id,
                    thumbnail_url: self.files.public_url(THUMBNAILS, &movie.thumbnail),
                    title: movie.title,
                    genre: genre.map(|genre| genre.name),
                })
            }
            None => None,
        };
        let theater = self
            .catalog
            .find_theater(transaction.theater_id)
            .await?
            .map(|theater| OrderTheater {
                id: theater.id,
                name: theater.name,
                city: theater.city,
            });

        Ok(OrderView {
            id: transaction.id,
            date: transaction.showing,
            status: transaction.status,
            subtotal: transaction.subtotal,
            tax: transaction.tax,
            booking_fee: transaction.booking_fee,
            total: transaction.total,
            created_at: transaction.created_at,
            movie,
            theater,
            seats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::fixtures::{self, Fixture};
    use crate::storage::LocalFileStorage;

    const SHOWING: &str = "2024-06-28 14:30";

    fn engine(fx: &Fixture) -> BookingEngine {
        BookingEngine::new(
            fx.stores.catalog.clone(),
            fx.stores.wallets.clone(),
            fx.stores.bookings.clone(),
            Arc::new(LocalFileStorage::new("/tmp/cinema-test-uploads", "http://localhost:3001")),
        )
    }

    fn request(fx: &Fixture, seats: &[&str], subtotal: i64, tax: i64, fee: i64) -> BookingRequest {
        BookingRequest {
            movie_id: Some(fx.movie.id),
            theater_id: Some(fx.theater.id),
            date: Some(SHOWING.into()),
            seats: seats.iter().map(|s| s.to_string()).collect(),
            subtotal: Some(subtotal),
            tax: Some(tax),
            booking_fee: Some(fee),
            total: Some(subtotal + tax + fee),
        }
    }

    async fn balance(fx: &Fixture) -> i64 {
        fx.stores
            .wallets
            .find_wallet(fx.wallet.id)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    #[tokio::test]
    async fn test_booking_debits_and_claims_seats() {
        let fx = fixtures::seeded(50_000).await;
        let engine = engine(&fx);

        let transaction = engine
            .book(&fx.customer, request(&fx, &["A1", "A2"], 40_000, 4_000, 1_000), None)
            .await
            .unwrap();

        assert_eq!(transaction.total, 45_000);
        assert_eq!(transaction.seat_ids.len(), 2);
        assert_eq!(balance(&fx).await, 5_000);

        let showing = ShowingKey::parse(SHOWING).unwrap();
        let available = engine.seats.available_seats(fx.movie.id, &showing).await.unwrap();
        assert_eq!(available.len(), 13);
        assert!(!available.contains(&"A1".to_string()));
        assert!(!available.contains(&"A2".to_string()));
        assert_eq!(available.first().map(String::as_str), Some("A3"));
        assert_eq!(available.last().map(String::as_str), Some("C5"));
    }

    #[tokio::test]
    async fn test_insufficient_balance_writes_nothing() {
        let fx = fixtures::seeded(10_000).await;
        let engine = engine(&fx);

        let err = engine
            .book(&fx.customer, request(&fx, &["B1"], 40_000, 4_000, 1_000), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InsufficientFunds));
        assert_eq!(balance(&fx).await, 10_000);
        let showing = ShowingKey::parse(SHOWING).unwrap();
        assert!(engine.seats.booked_seats(fx.movie.id, &showing).await.unwrap().is_empty());
        assert!(fx
            .stores
            .bookings
            .list_user_transactions(fx.customer.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_customer_without_wallet_has_insufficient_funds() {
        let fx = fixtures::seeded(0).await;
        let stranger = fixtures::user(Role::Customer);
        fx.stores.users.insert_user(&stranger).await.unwrap();

        let err = engine(&fx)
            .book(&Principal::from(&stranger), request(&fx, &["A1"], 0, 0, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds));
    }

    #[tokio::test]
    async fn test_taken_seat_is_refused_without_debit() {
        let fx = fixtures::seeded(100_000).await;
        let engine = engine(&fx);
        engine
            .book(&fx.customer, request(&fx, &["C3"], 20_000, 0, 0), None)
            .await
            .unwrap();

        let err = engine
            .book(&fx.customer, request(&fx, &["C2", "C3"], 40_000, 0, 0), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SeatUnavailable(seat) if seat == "C3"));
        assert_eq!(balance(&fx).await, 80_000);
    }

    #[tokio::test]
    async fn test_other_showing_is_independent() {
        let fx = fixtures::seeded(100_000).await;
        let engine = engine(&fx);
        engine
            .book(&fx.customer, request(&fx, &["A1"], 20_000, 0, 0), None)
            .await
            .unwrap();

        let mut later = request(&fx, &["A1"], 20_000, 0, 0);
        later.date = Some("2024-06-28+18:30".into());
        let transaction = engine.book(&fx.customer, later, None).await.unwrap();
        assert_eq!(transaction.showing.as_str(), "2024-06-28 18:30");
    }

    #[tokio::test]
    async fn test_idempotency_key_replays_without_second_debit() {
        let fx = fixtures::seeded(50_000).await;
        let engine = engine(&fx);
        let key = Some("order-7f3a".to_string());

        let first = engine
            .book(&fx.customer, request(&fx, &["B4"], 20_000, 2_000, 1_000), key.clone())
            .await
            .unwrap();
        let second = engine
            .book(&fx.customer, request(&fx, &["B4"], 20_000, 2_000, 1_000), key)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.seat_ids.len(), 1);
        assert_eq!(balance(&fx).await, 27_000);
    }

    async fn second_customer(fx: &Fixture, balance: i64) -> (Principal, Uuid) {
        let user = fixtures::user(Role::Customer);
        fx.stores.users.insert_user(&user).await.unwrap();
        let wallet = crate::models::Wallet::open(user.id);
        fx.stores.wallets.insert_wallet(&wallet).await.unwrap();
        fixtures::fund(&fx.stores, wallet.id, balance).await;
        (Principal::from(&user), wallet.id)
    }

    #[tokio::test]
    async fn test_concurrent_bookings_of_one_seat_charge_one_customer() {
        let fx = fixtures::seeded(30_000).await;
        let (rival, rival_wallet) = second_customer(&fx, 30_000).await;
        let engine = engine(&fx);

        let (mine, theirs) = tokio::join!(
            engine.book(&fx.customer, request(&fx, &["B2"], 20_000, 0, 0), None),
            engine.book(&rival, request(&fx, &["B2"], 20_000, 0, 0), None),
        );

        let outcomes = [&mine, &theirs];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::SeatUnavailable(seat)) if seat == "B2")));

        let rival_balance = fx
            .stores
            .wallets
            .find_wallet(rival_wallet)
            .await
            .unwrap()
            .unwrap()
            .balance;
        let (winner, loser) = if mine.is_ok() {
            (balance(&fx).await, rival_balance)
        } else {
            (rival_balance, balance(&fx).await)
        };
        assert_eq!(winner, 10_000);
        assert_eq!(loser, 30_000);

        let showing = ShowingKey::parse(SHOWING).unwrap();
        let booked = engine.seats.booked_seats(fx.movie.id, &showing).await.unwrap();
        assert_eq!(booked, vec!["B2".to_string()]);
    }

    #[tokio::test]
    async fn test_racing_same_key_returns_one_transaction() {
        let fx = fixtures::seeded(20_000).await;
        let engine = engine(&fx);
        let key = Some("tap-twice".to_string());

        let (first, second) = tokio::join!(
            engine.book(&fx.customer, request(&fx, &["C1"], 20_000, 0, 0), key.clone()),
            engine.book(&fx.customer, request(&fx, &["C1"], 20_000, 0, 0), key.clone()),
        );

        assert_eq!(first.unwrap().id, second.unwrap().id);
        assert_eq!(balance(&fx).await, 0);
    }

    #[tokio::test]
    async fn test_seat_clash_without_key_is_not_replayed() {
        let fx = fixtures::seeded(50_000).await;
        let engine = engine(&fx);
        engine
            .book(&fx.customer, request(&fx, &["A3"], 20_000, 0, 0), None)
            .await
            .unwrap();

        let err = engine
            .book(&fx.customer, request(&fx, &["A3"], 20_000, 0, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SeatUnavailable(_)));
        assert_eq!(balance(&fx).await, 30_000);
    }

    #[tokio::test]
    async fn test_mismatched_total_is_rejected() {
        let fx = fixtures::seeded(50_000).await;
        let mut bad = request(&fx, &["A1"], 20_000, 2_000, 1_000);
        bad.total = Some(1);

        let err = engine(&fx).book(&fx.customer, bad, None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(balance(&fx).await, 50_000);
    }

    #[tokio::test]
    async fn test_reports_every_shape_problem() {
        let fx = fixtures::seeded(50_000).await;
        let bad = BookingRequest {
            seats: vec!["A1".into(), "A1".into(), "Z9".into()],
            ..BookingRequest::default()
        };

        match engine(&fx).book(&fx.customer, bad, None).await.unwrap_err() {
            AppError::ValidationError(errors) => {
                assert!(errors.iter().any(|e| e.contains("movieId")));
                assert!(errors.iter().any(|e| e.contains("date")));
                assert!(errors.iter().any(|e| e.contains("listed twice")));
                assert!(errors.iter().any(|e| e.contains("Z9")));
                assert!(errors.iter().any(|e| e.contains("bookingFee")));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_movie_must_screen_at_theater() {
        let fx = fixtures::seeded(50_000).await;
        let elsewhere = crate::models::Theater::new("CGV Grand Indonesia", "Jakarta");
        fx.stores.catalog.insert_theater(&elsewhere).await.unwrap();

        let mut req = request(&fx, &["A1"], 20_000, 0, 0);
        req.theater_id = Some(elsewhere.id);
        let err = engine(&fx).book(&fx.customer, req, None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_orders_are_private() {
        let fx = fixtures::seeded(50_000).await;
        let engine = engine(&fx);
        let transaction = engine
            .book(&fx.customer, request(&fx, &["A5", "A4"], 20_000, 0, 0), None)
            .await
            .unwrap();

        let view = engine.order(&fx.customer, transaction.id).await.unwrap();
        assert_eq!(view.seats, vec!["A4".to_string(), "A5".to_string()]);
        assert_eq!(view.theater.map(|t| t.name), Some(fx.theater.name.clone()));
        assert_eq!(view.movie.and_then(|m| m.genre), Some("Drama".to_string()));

        let other = Principal::from(&fixtures::user(Role::Customer));
        assert!(matches!(
            engine.order(&other, transaction.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(engine.orders(&fx.customer).await.unwrap().len(), 1);
    }
}
