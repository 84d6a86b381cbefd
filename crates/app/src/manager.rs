//! Balance account manager.
//!
//! Derives the caller's balance account, submits create/credit/debit
//! instructions through a [`Cluster`] and reads the account back. Every
//! failure is logged here and then returned to the caller unchanged.

use std::io::Write;

use balance_core::{Pubkey, Signature};
use balance_crypto::{AddressError, SigningKeypair};
use balance_program::{instruction, AccountError, BalanceAccount};
use balance_rpc::{Cluster, ClusterError};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::display::{tx_line, AccountReport};

/// Amount credited by the demo sequence.
pub const DEMO_CREDIT: u32 = 100;
/// Amount debited by the demo sequence.
pub const DEMO_DEBIT: u32 = 50;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Address derivation failed: {0}")]
    Address(#[from] AddressError),
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),
    #[error("Account data error: {0}")]
    Account(#[from] AccountError),
    #[error("Balance account {0} not found")]
    AccountNotFound(Pubkey),
    #[error("Account {address} is owned by {owner}, not the balance program")]
    UnexpectedOwner { address: Pubkey, owner: Pubkey },
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ManagerError>;

/// Drives the balance program for one signer.
pub struct BalanceManager<C> {
    cluster: C,
    program_id: Pubkey,
    payer: SigningKeypair,
}

impl<C: Cluster> BalanceManager<C> {
    pub fn new(cluster: C, program_id: Pubkey, payer: SigningKeypair) -> Self {
        Self {
            cluster,
            program_id,
            payer,
        }
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// The signer's public key.
    pub fn user(&self) -> Pubkey {
        self.payer.pubkey()
    }

    /// Balance account address of the signer.
    pub fn balance_account_address(&self) -> Result<Pubkey> {
        let (address, _) = balance_program::balance_account_pda(&self.program_id, &self.user())
            .inspect_err(|e| error!(user = %self.user(), error = %e, "address derivation failed"))?;
        Ok(address)
    }

    /// Fetch and decode `user`'s balance account, `None` if it was never created.
    pub async fn get_user_balance_account(&self, user: &Pubkey) -> Result<Option<AccountReport>> {
        self.fetch(user)
            .await
            .inspect_err(|e| error!(%user, error = %e, "error fetching user balance account"))
    }

    async fn fetch(&self, user: &Pubkey) -> Result<Option<AccountReport>> {
        let (address, _) = balance_program::balance_account_pda(&self.program_id, user)?;
        let Some(info) = self.cluster.get_account(&address).await? else {
            debug!(%address, "balance account does not exist");
            return Ok(None);
        };
        if info.owner != self.program_id {
            return Err(ManagerError::UnexpectedOwner {
                address,
                owner: info.owner,
            });
        }
        let account = BalanceAccount::from_bytes(&info.data)?;
        Ok(Some(AccountReport::new(address, account)))
    }

    /// Submit the create instruction for the signer's balance account.
    pub async fn create_balance_account(&self) -> Result<Signature> {
        let user = self.user();
        self.submit_with(|| instruction::create_balance_account(&self.program_id, &user))
            .await
            .inspect_err(|e| error!(%user, error = %e, "error creating balance account"))
    }

    /// Credit the signer's balance account.
    pub async fn credit_account(&self, amount: u32) -> Result<Signature> {
        let user = self.user();
        self.submit_with(|| instruction::credit(&self.program_id, &user, amount))
            .await
            .inspect_err(|e| error!(%user, amount, error = %e, "error crediting account"))
    }

    /// Debit the signer's balance account.
    pub async fn debit_account(&self, amount: u32) -> Result<Signature> {
        let user = self.user();
        self.submit_with(|| instruction::debit(&self.program_id, &user, amount))
            .await
            .inspect_err(|e| error!(%user, amount, error = %e, "error debiting account"))
    }

    /// Read the signer's balance account, creating it first if it does not exist.
    ///
    /// Returns the creation signature when a create transaction was sent.
    pub async fn ensure_account(&self) -> Result<(AccountReport, Option<Signature>)> {
        let user = self.user();
        if let Some(report) = self.get_user_balance_account(&user).await? {
            return Ok((report, None));
        }

        info!(%user, "creating balance account");
        let signature = self.create_balance_account().await?;
        match self.get_user_balance_account(&user).await? {
            Some(report) => Ok((report, Some(signature))),
            None => {
                let address = self.balance_account_address()?;
                error!(%address, %signature, "balance account missing after creation");
                Err(ManagerError::AccountNotFound(address))
            }
        }
    }

    /// Show the account, credit 100, show, debit 50, show.
    ///
    /// Progress is written to `out`; the final account state is returned.
    pub async fn run_demo<W: Write + Send>(&self, out: &mut W) -> Result<BalanceAccount> {
        self.show(out).await?;

        writeln!(out, "Credit the account with {DEMO_CREDIT}")?;
        let signature = self.credit_account(DEMO_CREDIT).await?;
        writeln!(out, "{}", tx_line(&signature))?;
        self.show(out).await?;

        writeln!(out, "Debit the account with {DEMO_DEBIT}")?;
        let signature = self.debit_account(DEMO_DEBIT).await?;
        writeln!(out, "{}", tx_line(&signature))?;
        let report = self.show(out).await?;

        Ok(report.account)
    }

    /// Print the account (creating it if needed) the way the demo does.
    pub async fn show<W: Write + Send>(&self, out: &mut W) -> Result<AccountReport> {
        let (report, created) = self.ensure_account().await?;
        if let Some(signature) = created {
            writeln!(out, "{}", tx_line(&signature))?;
        }
        writeln!(out, "{report}")?;
        Ok(report)
    }

    async fn submit_with<F>(&self, build: F) -> Result<Signature>
    where
        F: FnOnce() -> std::result::Result<balance_core::Instruction, AddressError>,
    {
        let ix = build()?;
        let signature = self.cluster.submit(&[ix], &[&self.payer]).await?;
        debug!(%signature, "instruction landed");
        Ok(signature)
    }
}
