use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::Config;
use crate::payment::PaymentGateway;
use crate::services::{
    AccountService, AdminReports, BookingEngine, CatalogService, RelationMaintainer, SeatInventory,
    WalletLedger,
};
use crate::storage::FileStorage;
use crate::store::Stores;

/// Shared by every handler. Cloning is cheap; everything inside is behind
/// an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: Stores,
    pub tokens: Arc<TokenIssuer>,
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub seats: SeatInventory,
    pub booking: BookingEngine,
    pub ledger: WalletLedger,
    pub reports: AdminReports,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Stores,
        files: Arc<dyn FileStorage>,
        gateway: Arc<dyn PaymentGateway>,
        hasher: PasswordHasher,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(&config.secret_key));
        let seats = SeatInventory::new(stores.bookings.clone());
        let ledger = WalletLedger::new(
            stores.wallets.clone(),
            gateway,
            config.payment.finish_url.clone(),
        );
        let relations = RelationMaintainer::new(stores.catalog.clone(), files.clone());

        Self {
            accounts: AccountService::new(
                stores.users.clone(),
                files.clone(),
                tokens.clone(),
                hasher,
                ledger.clone(),
            ),
            catalog: CatalogService::new(
                stores.catalog.clone(),
                files.clone(),
                relations,
                seats.clone(),
            ),
            booking: BookingEngine::new(
                stores.catalog.clone(),
                stores.wallets.clone(),
                stores.bookings.clone(),
                files,
            ),
            reports: AdminReports::new(
                stores.users.clone(),
                stores.wallets.clone(),
                stores.bookings.clone(),
                stores.catalog.clone(),
            ),
            seats,
            ledger,
            tokens,
            stores,
            config: Arc::new(config),
        }
    }
}
