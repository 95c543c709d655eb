use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Principal;
use crate::models::{TopUpStatus, Wallet, WalletTransaction};
use crate::payment::{PaymentGateway, PaymentRequest};
use crate::store::{Settlement, StoreError, WalletStore};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct TopUpReceipt {
    pub wallet_transaction_id: Uuid,
    pub token: String,
    pub redirect_url: String,
}

/// Owns every wallet balance mutation. Credits only happen when a pending
/// top-up settles as a success; debits only through a guarded decrement.
#[derive(Clone)]
pub struct WalletLedger {
    wallets: Arc<dyn WalletStore>,
    gateway: Arc<dyn PaymentGateway>,
    finish_url: String,
}

impl WalletLedger {
    pub fn new(
        wallets: Arc<dyn WalletStore>,
        gateway: Arc<dyn PaymentGateway>,
        finish_url: impl Into<String>,
    ) -> Self {
        Self {
            wallets,
            gateway,
            finish_url: finish_url.into(),
        }
    }

    /// Zero when the user has no wallet yet.
    pub async fn get_balance(&self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .wallets
            .find_wallet_by_user(user_id)
            .await?
            .map(|wallet| wallet.balance)
            .unwrap_or(0))
    }

    /// Returns the user's wallet, creating an empty one on first use.
    pub async fn open_wallet(&self, user_id: Uuid) -> Result<Wallet, AppError> {
        if let Some(wallet) = self.wallets.find_wallet_by_user(user_id).await? {
            return Ok(wallet);
        }

        let wallet = Wallet::open(user_id);
        match self.wallets.insert_wallet(&wallet).await {
            Ok(()) => {
                info!(user_id = %user_id, wallet_id = %wallet.id, "Opened wallet");
                Ok(wallet)
            }
            // Lost a race against another first use.
            Err(StoreError::Conflict(_)) => self
                .wallets
                .find_wallet_by_user(user_id)
                .await?
                .ok_or_else(|| AppError::UnexpectedError("wallet vanished after conflict".into())),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn top_up(&self, principal: &Principal, amount: i64) -> Result<TopUpReceipt, AppError> {
        if amount <= 0 {
            return Err(AppError::validation("amount must be greater than 0"));
        }

        let wallet = self.open_wallet(principal.id).await?;
        let entry = WalletTransaction::pending(wallet.id, amount);
        self.wallets.insert_wallet_transaction(&entry).await?;

        let request = PaymentRequest {
            order_id: entry.id,
            amount,
            customer_name: principal.name.clone(),
            customer_email: principal.email.clone(),
            redirect_url: self.finish_url.clone(),
        };
        let session = match self.gateway.create_payment(&request).await {
            Ok(session) => session,
            Err(e) => {
                warn!(wallet_transaction_id = %entry.id, error = %e, "Top-up could not be opened");
                if let Err(settle_err) = self.wallets.settle_top_up(entry.id, TopUpStatus::Failed).await {
                    warn!(error = %settle_err, "Could not mark top-up as failed");
                }
                return Err(e.into());
            }
        };

        self.wallets.set_payment_token(entry.id, &session.token).await?;
        info!(wallet_transaction_id = %entry.id, amount, "Top-up opened");

        Ok(TopUpReceipt {
            wallet_transaction_id: entry.id,
            token: session.token,
            redirect_url: session.redirect_url,
        })
    }

    /// Applies a gateway verdict. `paid_amount`, when the gateway reports one,
    /// must match what was requested.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_top_up(
        &self,
        wallet_transaction_id: Uuid,
        outcome: TopUpStatus,
        paid_amount: Option<i64>,
    ) -> Result<Settlement, AppError> {
        let entry = self
            .wallets
            .find_wallet_transaction(wallet_transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Top-up not found".into()))?;

        if let Some(paid) = paid_amount {
            if paid != entry.amount {
                warn!(requested = entry.amount, paid, "Top-up amount mismatch");
                return Err(AppError::validation(format!(
                    "paid amount {paid} does not match requested amount {}",
                    entry.amount
                )));
            }
        }

        let settlement = self.wallets.settle_top_up(entry.id, outcome).await?;
        match &settlement {
            Settlement::Applied(settled) => {
                info!(status = settled.status.as_str(), amount = settled.amount, "Top-up settled")
            }
            Settlement::AlreadySettled(_) => info!("Duplicate top-up notification ignored"),
        }
        Ok(settlement)
    }

    pub async fn debit(&self, wallet_id: Uuid, amount: i64) -> Result<Wallet, AppError> {
        if amount < 0 {
            return Err(AppError::validation("amount must not be negative"));
        }
        Ok(self.wallets.debit_wallet(wallet_id, amount).await?)
    }

    /// The user's top-ups, newest first.
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>, AppError> {
        match self.wallets.find_wallet_by_user(user_id).await? {
            Some(wallet) => Ok(self.wallets.list_wallet_transactions(wallet.id).await?),
            None => Ok(Vec::new()),
        }
    }
}
