use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::models::{Genre, Movie, Role, Theater, TopUpStatus, User, Wallet, WalletTransaction};
use crate::store::{MemoryStore, Stores};

pub struct Fixture {
    pub stores: Stores,
    pub genre: Genre,
    pub theater: Theater,
    pub movie: Movie,
    pub customer: Principal,
    pub wallet: Wallet,
}

pub fn movie(genre_id: Uuid, theater_ids: Vec<Uuid>) -> Movie {
    let now = Utc::now();
    Movie {
        id: Uuid::new_v4(),
        title: "Laskar Pelangi".into(),
        genre_id,
        theater_ids,
        description: Some("Ten kids and a school on Belitung".into()),
        price: 20_000,
        available: true,
        bonus: None,
        thumbnail: "thumbnail-1719500000000-42.png".into(),
        created_at: now,
        updated_at: now,
    }
}

pub fn user(role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        name: "Budi Santoso".into(),
        email: format!("{}@example.com", Uuid::new_v4().simple()),
        password_hash: "not-a-real-hash".into(),
        role,
        photo: None,
        created_at: Utc::now(),
    }
}

/// Credits a wallet through a settled top-up so the ledger stays paired.
pub async fn fund(stores: &Stores, wallet_id: Uuid, amount: i64) {
    let entry = WalletTransaction::pending(wallet_id, amount);
    stores.wallets.insert_wallet_transaction(&entry).await.unwrap();
    stores
        .wallets
        .settle_top_up(entry.id, TopUpStatus::Success)
        .await
        .unwrap();
}

/// A genre, a theater, one movie screened there and a customer whose wallet
/// holds `balance`.
pub async fn seeded(balance: i64) -> Fixture {
    let stores = Stores::shared(Arc::new(MemoryStore::new()));

    let genre = Genre::new("Drama");
    let theater = Theater::new("XXI Plaza Senayan", "Jakarta");
    stores.catalog.insert_genre(&genre).await.unwrap();
    stores.catalog.insert_theater(&theater).await.unwrap();

    let movie = movie(genre.id, vec![theater.id]);
    stores.catalog.insert_movie(&movie).await.unwrap();
    stores.catalog.add_genre_movie(genre.id, movie.id).await.unwrap();
    stores
        .catalog
        .add_theater_movie(theater.id, movie.id)
        .await
        .unwrap();

    let customer = user(Role::Customer);
    stores.users.insert_user(&customer).await.unwrap();
    let wallet = Wallet::open(customer.id);
    stores.wallets.insert_wallet(&wallet).await.unwrap();
    if balance > 0 {
        fund(&stores, wallet.id, balance).await;
    }

    let genre = stores.catalog.find_genre(genre.id).await.unwrap().unwrap();
    let theater = stores.catalog.find_theater(theater.id).await.unwrap().unwrap();
    let wallet = stores.wallets.find_wallet(wallet.id).await.unwrap().unwrap();

    Fixture {
        customer: Principal::from(&customer),
        stores,
        genre,
        theater,
        movie,
        wallet,
    }
}
