//! Balance Program
//!
//! Client-side types, PDA derivation and instruction builders for the
//! balance program, plus an in-memory processor reproducing the program's
//! behaviour for offline runs.
//!
//! The on-chain binary itself is not part of this crate.

pub mod accounts;
pub mod instruction;
pub mod pda;
pub mod processor;

pub use accounts::*;
pub use instruction::{BalanceInstruction, InstructionError, InstructionType};
pub use pda::*;
pub use processor::{rent_exempt_minimum, AccountState, Processor, ProgramError};
