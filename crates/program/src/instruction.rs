//! Instruction builders for the balance program.
//!
//! Instruction data is one opcode byte followed by a fixed-width argument:
//!
//! | opcode | instruction | argument            | total |
//! |--------|-------------|---------------------|-------|
//! | 1      | Create      | bump (u8)           | 2     |
//! | 2      | Credit      | amount (u32, LE)    | 5     |
//! | 3      | Debit       | amount (u32, LE)    | 5     |

use balance_core::{AccountMeta, Instruction, Pubkey, SYSTEM_PROGRAM_ID};
use balance_crypto::AddressError;
use thiserror::Error;

use crate::pda;

/// Instruction discriminators (first byte of instruction data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InstructionType {
    Create = 1,
    Credit = 2,
    Debit = 3,
}

impl InstructionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Create),
            2 => Some(Self::Credit),
            3 => Some(Self::Debit),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstructionError {
    #[error("instruction data is empty")]
    Empty,
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),
    #[error("{kind:?} expects {expected} argument bytes, got {actual}")]
    BadArgumentLength {
        kind: InstructionType,
        expected: usize,
        actual: usize,
    },
}

/// Decoded balance program instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceInstruction {
    /// Allocate the caller's balance account at the PDA derived with `bump`.
    Create { bump: u8 },
    /// Add `amount` to credited and balance.
    Credit { amount: u32 },
    /// Add `amount` to debited and subtract it from balance.
    Debit { amount: u32 },
}

impl BalanceInstruction {
    pub fn instruction_type(&self) -> InstructionType {
        match self {
            Self::Create { .. } => InstructionType::Create,
            Self::Credit { .. } => InstructionType::Credit,
            Self::Debit { .. } => InstructionType::Debit,
        }
    }

    /// Serialize to instruction data: `[opcode] ++ argument`.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(5);
        buf.push(self.instruction_type() as u8);
        match self {
            Self::Create { bump } => buf.push(*bump),
            Self::Credit { amount } | Self::Debit { amount } => {
                buf.extend_from_slice(&amount.to_le_bytes())
            }
        }
        buf
    }

    /// Parse instruction data. The argument must have exactly its fixed width.
    pub fn unpack(data: &[u8]) -> Result<Self, InstructionError> {
        let (&opcode, rest) = data.split_first().ok_or(InstructionError::Empty)?;
        let kind = InstructionType::from_u8(opcode).ok_or(InstructionError::UnknownOpcode(opcode))?;

        let bad_len = |expected| InstructionError::BadArgumentLength {
            kind,
            expected,
            actual: rest.len(),
        };

        match kind {
            InstructionType::Create => {
                let [bump]: [u8; 1] = rest.try_into().map_err(|_| bad_len(1))?;
                Ok(Self::Create { bump })
            }
            InstructionType::Credit | InstructionType::Debit => {
                let bytes: [u8; 4] = rest.try_into().map_err(|_| bad_len(4))?;
                let amount = u32::from_le_bytes(bytes);
                Ok(match kind {
                    InstructionType::Credit => Self::Credit { amount },
                    _ => Self::Debit { amount },
                })
            }
        }
    }
}

// -- Instruction builders --

/// Build the `Create` instruction for `user`'s balance account.
pub fn create_balance_account(program_id: &Pubkey, user: &Pubkey) -> Result<Instruction, AddressError> {
    let (balance_account, bump) = pda::balance_account_pda(program_id, user)?;
    Ok(Instruction::new(
        *program_id,
        BalanceInstruction::Create { bump }.pack(),
        create_accounts(user, &balance_account),
    ))
}

/// Build a `Credit` instruction against `user`'s balance account.
pub fn credit(program_id: &Pubkey, user: &Pubkey, amount: u32) -> Result<Instruction, AddressError> {
    let (balance_account, _) = pda::balance_account_pda(program_id, user)?;
    Ok(Instruction::new(
        *program_id,
        BalanceInstruction::Credit { amount }.pack(),
        mutate_accounts(&balance_account),
    ))
}

/// Build a `Debit` instruction against `user`'s balance account.
pub fn debit(program_id: &Pubkey, user: &Pubkey, amount: u32) -> Result<Instruction, AddressError> {
    let (balance_account, _) = pda::balance_account_pda(program_id, user)?;
    Ok(Instruction::new(
        *program_id,
        BalanceInstruction::Debit { amount }.pack(),
        mutate_accounts(&balance_account),
    ))
}

// -- Account list helpers --

/// Accounts for `Create`: payer/owner, the new PDA, the system program.
pub fn create_accounts(user: &Pubkey, balance_account: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(*balance_account, false),
        AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
    ]
}

/// Accounts for `Credit` and `Debit`: the balance account alone.
pub fn mutate_accounts(balance_account: &Pubkey) -> Vec<AccountMeta> {
    vec![AccountMeta::new(*balance_account, false)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pda::PROGRAM_ID;

    fn user() -> Pubkey {
        Pubkey::new_from_array([5u8; 32])
    }

    #[test]
    fn test_instruction_discriminators() {
        assert_eq!(InstructionType::Create as u8, 1);
        assert_eq!(InstructionType::Credit as u8, 2);
        assert_eq!(InstructionType::Debit as u8, 3);
        assert_eq!(InstructionType::from_u8(0), None);
        assert_eq!(InstructionType::from_u8(4), None);
    }

    #[test]
    fn test_create_payload_layout() {
        assert_eq!(BalanceInstruction::Create { bump: 254 }.pack(), vec![1, 254]);
    }

    #[test]
    fn test_credit_payload_layout() {
        assert_eq!(BalanceInstruction::Credit { amount: 100 }.pack(), vec![2, 100, 0, 0, 0]);
        assert_eq!(
            BalanceInstruction::Credit { amount: 0x0102_0304 }.pack(),
            vec![2, 4, 3, 2, 1]
        );
    }

    #[test]
    fn test_debit_payload_layout() {
        assert_eq!(BalanceInstruction::Debit { amount: 50 }.pack(), vec![3, 50, 0, 0, 0]);
        assert_eq!(
            BalanceInstruction::Debit { amount: u32::MAX }.pack(),
            vec![3, 255, 255, 255, 255]
        );
    }

    #[test]
    fn test_unpack_rejects_bad_data() {
        assert_eq!(BalanceInstruction::unpack(&[]), Err(InstructionError::Empty));
        assert_eq!(BalanceInstruction::unpack(&[9, 0]), Err(InstructionError::UnknownOpcode(9)));
        assert_eq!(
            BalanceInstruction::unpack(&[2, 1, 0]),
            Err(InstructionError::BadArgumentLength {
                kind: InstructionType::Credit,
                expected: 4,
                actual: 2
            })
        );
        assert_eq!(
            BalanceInstruction::unpack(&[1]),
            Err(InstructionError::BadArgumentLength {
                kind: InstructionType::Create,
                expected: 1,
                actual: 0
            })
        );
        assert!(BalanceInstruction::unpack(&[3, 1, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_unpack_decodes_packed() {
        assert_eq!(
            BalanceInstruction::unpack(&[3, 50, 0, 0, 0]),
            Ok(BalanceInstruction::Debit { amount: 50 })
        );
        assert_eq!(
            BalanceInstruction::unpack(&[1, 253]),
            Ok(BalanceInstruction::Create { bump: 253 })
        );
    }

    #[test]
    fn test_create_builder() {
        let ix = create_balance_account(&PROGRAM_ID, &user()).unwrap();
        let (pda, bump) = pda::balance_account_pda(&PROGRAM_ID, &user()).unwrap();

        assert_eq!(ix.program_id, PROGRAM_ID);
        assert_eq!(ix.data, vec![InstructionType::Create as u8, bump]);
        assert_eq!(ix.accounts.len(), 3);
        assert_eq!(ix.accounts[0], AccountMeta::new(user(), true));
        assert_eq!(ix.accounts[1], AccountMeta::new(pda, false));
        assert_eq!(ix.accounts[2], AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false));
    }

    #[test]
    fn test_credit_and_debit_builders() {
        let (pda, _) = pda::balance_account_pda(&PROGRAM_ID, &user()).unwrap();

        let ix = credit(&PROGRAM_ID, &user(), 100).unwrap();
        assert_eq!(ix.data, vec![2, 100, 0, 0, 0]);
        assert_eq!(ix.accounts, vec![AccountMeta::new(pda, false)]);

        let ix = debit(&PROGRAM_ID, &user(), 50).unwrap();
        assert_eq!(ix.data, vec![3, 50, 0, 0, 0]);
        assert_eq!(ix.accounts, vec![AccountMeta::new(pda, false)]);
    }
}
