use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Role, Transaction, WalletTransaction};
use crate::store::{BookingStore, CatalogStore, UserStore, WalletStore};
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletTransactionReport {
    #[serde(flatten)]
    pub entry: WalletTransaction,
    /// Owner of the wallet, when the account still exists.
    pub customer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionReport {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub customer: Option<String>,
    pub movie_title: Option<String>,
    pub theater_name: Option<String>,
}

/// Read-only admin views across every customer.
#[derive(Clone)]
pub struct AdminReports {
    users: Arc<dyn UserStore>,
    wallets: Arc<dyn WalletStore>,
    bookings: Arc<dyn BookingStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl AdminReports {
    pub fn new(
        users: Arc<dyn UserStore>,
        wallets: Arc<dyn WalletStore>,
        bookings: Arc<dyn BookingStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            users,
            wallets,
            bookings,
            catalog,
        }
    }

    async fn customer_names(&self) -> Result<HashMap<Uuid, String>, AppError> {
        Ok(self
            .users
            .list_users_by_role(Role::Customer)
            .await?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect())
    }

    pub async fn customers(&self) -> Result<Vec<CustomerSummary>, AppError> {
        Ok(self
            .users
            .list_users_by_role(Role::Customer)
            .await?
            .into_iter()
            .map(|user| CustomerSummary {
                id: user.id,
                name: user.name,
                email: user.email,
            })
            .collect())
    }

    /// Every top-up, newest first, labelled with the wallet owner's name.
    pub async fn wallet_transactions(&self) -> Result<Vec<WalletTransactionReport>, AppError> {
        let names = self.customer_names().await?;
        let mut owners: HashMap<Uuid, Option<Uuid>> = HashMap::new();
        let entries = self.wallets.list_all_wallet_transactions().await?;

        let mut reports = Vec::with_capacity(entries.len());
        for entry in entries {
            let owner = match owners.get(&entry.wallet_id) {
                Some(owner) => *owner,
                None => {
                    let owner = self
                        .wallets
                        .find_wallet(entry.wallet_id)
                        .await?
                        .map(|wallet| wallet.user_id);
                    owners.insert(entry.wallet_id, owner);
                    owner
                }
            };
            reports.push(WalletTransactionReport {
                customer: owner.and_then(|id| names.get(&id).cloned()),
                entry,
            });
        }
        Ok(reports)
    }

    /// Every booking, newest first. Deleted movies and theaters show as `null`.
    pub async fn transactions(&self) -> Result<Vec<TransactionReport>, AppError> {
        let names = self.customer_names().await?;
        let titles: HashMap<Uuid, String> = self
            .catalog
            .list_movies()
            .await?
            .into_iter()
            .map(|movie| (movie.id, movie.title))
            .collect();
        let theaters: HashMap<Uuid, String> = self
            .catalog
            .list_theaters()
            .await?
            .into_iter()
            .map(|theater| (theater.id, theater.name))
            .collect();

        Ok(self
            .bookings
            .list_transactions()
            .await?
            .into_iter()
            .map(|transaction| TransactionReport {
                customer: names.get(&transaction.user_id).cloned(),
                movie_title: titles.get(&transaction.movie_id).cloned(),
                theater_name: theaters.get(&transaction.theater_id).cloned(),
                transaction,
            })
            .collect())
    }
}
