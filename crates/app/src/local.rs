//! In-process cluster backed by the balance program processor.
//!
//! Transactions are compiled and signed exactly as for a real cluster, then
//! executed against an account map. A failed transaction still pays its fee
//! but leaves every other account untouched.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use balance_core::{Hash, Instruction, Pubkey, Signature};
use balance_crypto::{sign_data, SigningKeypair};
use balance_program::{AccountState, Processor};
use balance_rpc::{AccountInfo, Cluster, ClusterError, Message, Transaction};
use tracing::{debug, info, warn};

/// Fee charged per required signature.
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

#[derive(Debug, Default)]
struct Ledger {
    accounts: BTreeMap<Pubkey, AccountState>,
    slot: u64,
}

impl Ledger {
    /// Blockhash for the current slot.
    fn blockhash(&self) -> Hash {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&self.slot.to_le_bytes());
        Hash::new_from_array(bytes)
    }
}

/// Cluster that runs the balance program in memory.
pub struct LocalCluster {
    processor: Processor,
    faucet: SigningKeypair,
    ledger: Mutex<Ledger>,
}

impl LocalCluster {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            processor: Processor::new(program_id),
            faucet: SigningKeypair::generate(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        self.processor.program_id()
    }

    /// Add lamports to `address`, creating a wallet account if needed.
    pub fn fund(&self, address: &Pubkey, lamports: u64) {
        let mut ledger = self.lock();
        ledger
            .accounts
            .entry(*address)
            .and_modify(|a| a.lamports = a.lamports.saturating_add(lamports))
            .or_insert_with(|| AccountState::system(lamports));
    }

    /// Snapshot of one account.
    pub fn account(&self, address: &Pubkey) -> Option<AccountState> {
        self.lock().accounts.get(address).cloned()
    }

    /// Number of slots produced so far (one per landed or failed transaction).
    pub fn slot(&self) -> u64 {
        self.lock().slot
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        // A poisoned ledger is still consistent: every write happens after all checks.
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn execute(
        &self,
        accounts: &mut BTreeMap<Pubkey, AccountState>,
        instructions: &[Instruction],
        signers: &[Pubkey],
    ) -> Result<(), ClusterError> {
        for (index, ix) in instructions.iter().enumerate() {
            if ix.program_id != *self.processor.program_id() {
                return Err(ClusterError::Rejected(format!(
                    "instruction {index}: unsupported program {}",
                    ix.program_id
                )));
            }
            self.processor
                .process(accounts, ix, signers)
                .map_err(|e| ClusterError::Rejected(format!("instruction {index}: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Cluster for LocalCluster {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, ClusterError> {
        Ok(self.lock().accounts.get(address).map(|state| AccountInfo {
            lamports: state.lamports,
            owner: state.owner,
            data: state.data.clone(),
            executable: false,
        }))
    }

    async fn submit(
        &self,
        instructions: &[Instruction],
        signers: &[&SigningKeypair],
    ) -> Result<Signature, ClusterError> {
        let payer = signers.first().ok_or(ClusterError::NoSigners)?.pubkey();
        let message = Message::compile(instructions, &payer)?;
        let signer_keys = message.signer_keys().to_vec();

        let mut ledger = self.lock();
        let mut transaction = Transaction::new_unsigned(message);
        transaction.sign(signers, ledger.blockhash())?;
        if !transaction.verify() {
            return Err(ClusterError::Rejected("signature verification failed".to_string()));
        }
        let signature = transaction.signature();

        let fee = LAMPORTS_PER_SIGNATURE * signer_keys.len() as u64;
        match ledger.accounts.get_mut(&payer) {
            Some(account) if account.lamports >= fee => account.lamports -= fee,
            _ => {
                return Err(ClusterError::Rejected(format!(
                    "payer {payer} cannot cover fee of {fee} lamports"
                )))
            }
        }
        ledger.slot += 1;

        let mut working = ledger.accounts.clone();
        match self.execute(&mut working, instructions, &signer_keys) {
            Ok(()) => {
                ledger.accounts = working;
                info!(%signature, slot = ledger.slot, "transaction processed");
                Ok(signature)
            }
            Err(e) => {
                warn!(%signature, slot = ledger.slot, error = %e, "transaction failed");
                Err(e)
            }
        }
    }

    async fn airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature, ClusterError> {
        let slot = {
            let mut ledger = self.lock();
            ledger.slot += 1;
            ledger.slot
        };
        self.fund(address, lamports);

        let mut payload = address.to_bytes().to_vec();
        payload.extend_from_slice(&lamports.to_le_bytes());
        payload.extend_from_slice(&slot.to_le_bytes());
        let signature = sign_data(&self.faucet, &payload);
        debug!(%signature, %address, lamports, "airdrop");
        Ok(signature)
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, ClusterError> {
        Ok(self.lock().accounts.get(address).map_or(0, |a| a.lamports))
    }
}
