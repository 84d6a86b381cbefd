//! In-memory reproduction of the balance program.
//!
//! Executes instructions against a plain account map with the same checks
//! the deployed program performs, so flows can run without a cluster.

use std::collections::BTreeMap;

use balance_core::{AccountMeta, Instruction, Pubkey, SYSTEM_PROGRAM_ID};
use thiserror::Error;
use tracing::debug;

use crate::accounts::{AccountError, BalanceAccount};
use crate::instruction::BalanceInstruction;
use crate::pda;

/// Storage overhead charged per account by the rent calculation.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Default rent rate.
pub const LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;

/// Years of rent an account must hold to be exempt.
pub const EXEMPTION_THRESHOLD_YEARS: u64 = 2;

/// Lamports needed for an account of `space` bytes to be rent exempt.
pub fn rent_exempt_minimum(space: usize) -> u64 {
    (ACCOUNT_STORAGE_OVERHEAD + space as u64) * LAMPORTS_PER_BYTE_YEAR * EXEMPTION_THRESHOLD_YEARS
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("invalid instruction data")]
    InvalidInstructionData,
    #[error("not enough account keys")]
    NotEnoughAccountKeys,
    #[error("missing required signature for {0}")]
    MissingRequiredSignature(Pubkey),
    #[error("account {0} is not writable")]
    ReadonlyAccount(Pubkey),
    #[error("provided seeds do not produce {0}")]
    InvalidSeeds(Pubkey),
    #[error("account {0} already in use")]
    AccountAlreadyInUse(Pubkey),
    #[error("incorrect program id for account {0}")]
    IncorrectProgramId(Pubkey),
    #[error("invalid account data")]
    InvalidAccountData,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}

impl From<AccountError> for ProgramError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InsufficientFunds { .. } => Self::InsufficientFunds,
            AccountError::Overflow => Self::ArithmeticOverflow,
            AccountError::InvalidLength { .. } | AccountError::Decode(_) => Self::InvalidAccountData,
        }
    }
}

/// Ledger state of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

impl AccountState {
    /// A plain wallet account holding only lamports.
    pub fn system(lamports: u64) -> Self {
        Self {
            lamports,
            owner: SYSTEM_PROGRAM_ID,
            data: Vec::new(),
        }
    }
}

/// Executes balance program instructions for one program id.
#[derive(Debug, Clone)]
pub struct Processor {
    program_id: Pubkey,
}

impl Processor {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Run one instruction. `signers` are the keys that signed the enclosing transaction.
    ///
    /// `accounts` is only modified when the instruction succeeds.
    pub fn process(
        &self,
        accounts: &mut BTreeMap<Pubkey, AccountState>,
        instruction: &Instruction,
        signers: &[Pubkey],
    ) -> Result<(), ProgramError> {
        if instruction.program_id != self.program_id {
            return Err(ProgramError::IncorrectProgramId(instruction.program_id));
        }
        let decoded = BalanceInstruction::unpack(&instruction.data)
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        debug!(?decoded, "processing instruction");

        match decoded {
            BalanceInstruction::Create { bump } => {
                self.process_create(accounts, &instruction.accounts, signers, bump)
            }
            BalanceInstruction::Credit { amount } => {
                self.process_mutation(accounts, &instruction.accounts, |a| a.apply_credit(amount))
            }
            BalanceInstruction::Debit { amount } => {
                self.process_mutation(accounts, &instruction.accounts, |a| a.apply_debit(amount))
            }
        }
    }

    fn process_create(
        &self,
        accounts: &mut BTreeMap<Pubkey, AccountState>,
        metas: &[AccountMeta],
        signers: &[Pubkey],
        bump: u8,
    ) -> Result<(), ProgramError> {
        let [user, balance_account, system_program] = match metas {
            [a, b, c, ..] => [a, b, c],
            _ => return Err(ProgramError::NotEnoughAccountKeys),
        };

        if !user.is_signer || !signers.contains(&user.pubkey) {
            return Err(ProgramError::MissingRequiredSignature(user.pubkey));
        }
        for meta in [user, balance_account] {
            if !meta.is_writable {
                return Err(ProgramError::ReadonlyAccount(meta.pubkey));
            }
        }
        if system_program.pubkey != SYSTEM_PROGRAM_ID {
            return Err(ProgramError::IncorrectProgramId(system_program.pubkey));
        }

        let expected = pda::balance_account_address(&self.program_id, &user.pubkey, bump)
            .map_err(|_| ProgramError::InvalidSeeds(balance_account.pubkey))?;
        if expected != balance_account.pubkey {
            return Err(ProgramError::InvalidSeeds(balance_account.pubkey));
        }

        if let Some(existing) = accounts.get(&balance_account.pubkey) {
            if existing.lamports > 0 || !existing.data.is_empty() || existing.owner != SYSTEM_PROGRAM_ID {
                return Err(ProgramError::AccountAlreadyInUse(balance_account.pubkey));
            }
        }

        let rent = rent_exempt_minimum(BalanceAccount::LEN);
        let payer = accounts
            .get_mut(&user.pubkey)
            .filter(|a| a.lamports >= rent)
            .ok_or(ProgramError::InsufficientFunds)?;
        payer.lamports -= rent;

        accounts.insert(
            balance_account.pubkey,
            AccountState {
                lamports: rent,
                owner: self.program_id,
                data: vec![0u8; BalanceAccount::LEN],
            },
        );
        debug!(account = %balance_account.pubkey, rent, "balance account created");
        Ok(())
    }

    fn process_mutation(
        &self,
        accounts: &mut BTreeMap<Pubkey, AccountState>,
        metas: &[AccountMeta],
        apply: impl FnOnce(&mut BalanceAccount) -> Result<(), AccountError>,
    ) -> Result<(), ProgramError> {
        let meta = metas.first().ok_or(ProgramError::NotEnoughAccountKeys)?;
        if !meta.is_writable {
            return Err(ProgramError::ReadonlyAccount(meta.pubkey));
        }

        let state = accounts
            .get_mut(&meta.pubkey)
            .filter(|a| a.owner == self.program_id)
            .ok_or(ProgramError::IncorrectProgramId(meta.pubkey))?;

        let mut balance_account = BalanceAccount::from_bytes(&state.data)?;
        apply(&mut balance_account)?;
        state.data = balance_account
            .to_bytes()
            .map_err(|_| ProgramError::InvalidAccountData)?;

        debug!(
            account = %meta.pubkey,
            balance = balance_account.balance,
            "balance account updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction;
    use crate::pda::PROGRAM_ID;

    const FUNDS: u64 = 1_000_000_000;

    fn setup() -> (Processor, BTreeMap<Pubkey, AccountState>, Pubkey) {
        let user = Pubkey::new_from_array([5u8; 32]);
        let mut accounts = BTreeMap::new();
        accounts.insert(user, AccountState::system(FUNDS));
        (Processor::new(PROGRAM_ID), accounts, user)
    }

    fn read(accounts: &BTreeMap<Pubkey, AccountState>, user: &Pubkey) -> BalanceAccount {
        let (pda, _) = pda::balance_account_pda(&PROGRAM_ID, user).unwrap();
        BalanceAccount::from_bytes(&accounts[&pda].data).unwrap()
    }

    fn create(p: &Processor, accounts: &mut BTreeMap<Pubkey, AccountState>, user: &Pubkey) {
        let ix = instruction::create_balance_account(&PROGRAM_ID, user).unwrap();
        p.process(accounts, &ix, &[*user]).unwrap();
    }

    #[test]
    fn test_rent_exempt_minimum() {
        assert_eq!(rent_exempt_minimum(12), 974_400);
        assert_eq!(rent_exempt_minimum(0), 890_880);
    }

    #[test]
    fn test_create_allocates_zeroed_account() {
        let (p, mut accounts, user) = setup();
        create(&p, &mut accounts, &user);

        let (pda, _) = pda::balance_account_pda(&PROGRAM_ID, &user).unwrap();
        let state = &accounts[&pda];
        assert_eq!(state.owner, PROGRAM_ID);
        assert_eq!(state.data, vec![0u8; 12]);
        assert_eq!(state.lamports, rent_exempt_minimum(12));
        assert_eq!(accounts[&user].lamports, FUNDS - rent_exempt_minimum(12));
    }

    #[test]
    fn test_create_twice_fails() {
        let (p, mut accounts, user) = setup();
        create(&p, &mut accounts, &user);

        let ix = instruction::create_balance_account(&PROGRAM_ID, &user).unwrap();
        assert!(matches!(
            p.process(&mut accounts, &ix, &[user]),
            Err(ProgramError::AccountAlreadyInUse(_))
        ));
    }

    #[test]
    fn test_create_requires_signature() {
        let (p, mut accounts, user) = setup();
        let ix = instruction::create_balance_account(&PROGRAM_ID, &user).unwrap();
        assert_eq!(
            p.process(&mut accounts, &ix, &[]),
            Err(ProgramError::MissingRequiredSignature(user))
        );
    }

    #[test]
    fn test_create_rejects_wrong_bump() {
        let (p, mut accounts, user) = setup();
        let mut ix = instruction::create_balance_account(&PROGRAM_ID, &user).unwrap();
        ix.data[1] = ix.data[1].wrapping_sub(1);
        assert!(matches!(
            p.process(&mut accounts, &ix, &[user]),
            Err(ProgramError::InvalidSeeds(_))
        ));
    }

    #[test]
    fn test_create_without_funds() {
        let (p, mut accounts, user) = setup();
        accounts.insert(user, AccountState::system(10));
        let ix = instruction::create_balance_account(&PROGRAM_ID, &user).unwrap();
        assert_eq!(p.process(&mut accounts, &ix, &[user]), Err(ProgramError::InsufficientFunds));
    }

    #[test]
    fn test_credit_and_debit() {
        let (p, mut accounts, user) = setup();
        create(&p, &mut accounts, &user);

        let ix = instruction::credit(&PROGRAM_ID, &user, 100).unwrap();
        p.process(&mut accounts, &ix, &[user]).unwrap();
        let ix = instruction::debit(&PROGRAM_ID, &user, 50).unwrap();
        p.process(&mut accounts, &ix, &[user]).unwrap();

        assert_eq!(
            read(&accounts, &user),
            BalanceAccount {
                credited_amount: 100,
                debited_amount: 50,
                balance: 50
            }
        );
    }

    #[test]
    fn test_debit_insufficient_funds() {
        let (p, mut accounts, user) = setup();
        create(&p, &mut accounts, &user);

        let ix = instruction::debit(&PROGRAM_ID, &user, 1).unwrap();
        assert_eq!(p.process(&mut accounts, &ix, &[user]), Err(ProgramError::InsufficientFunds));
        assert_eq!(read(&accounts, &user), BalanceAccount::default());
    }

    #[test]
    fn test_credit_missing_account() {
        let (p, mut accounts, user) = setup();
        let ix = instruction::credit(&PROGRAM_ID, &user, 1).unwrap();
        assert!(matches!(
            p.process(&mut accounts, &ix, &[user]),
            Err(ProgramError::IncorrectProgramId(_))
        ));
    }

    #[test]
    fn test_invalid_instruction_data() {
        let (p, mut accounts, user) = setup();
        let ix = Instruction::new(PROGRAM_ID, vec![7], vec![]);
        assert_eq!(
            p.process(&mut accounts, &ix, &[user]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn test_wrong_program_id() {
        let (_, mut accounts, user) = setup();
        let other = Processor::new(Pubkey::new_from_array([8u8; 32]));
        let ix = instruction::credit(&PROGRAM_ID, &user, 1).unwrap();
        assert_eq!(
            other.process(&mut accounts, &ix, &[user]),
            Err(ProgramError::IncorrectProgramId(PROGRAM_ID))
        );
    }

    #[test]
    fn test_not_enough_accounts() {
        let (p, mut accounts, user) = setup();
        let ix = Instruction::new(PROGRAM_ID, vec![2, 1, 0, 0, 0], vec![]);
        assert_eq!(
            p.process(&mut accounts, &ix, &[user]),
            Err(ProgramError::NotEnoughAccountKeys)
        );
    }
}
