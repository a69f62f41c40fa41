//! Fungible Token Ledger
//!
//! This crate defines the token collaborator the governance ledger locks,
//! releases and mints through.
//!
//! # Key Types
//!
//! - [`TokenContract`]: token metadata and single-owner authority
//! - [`TokenLedger`]: the collaborator surface (balance, transfer, mint, ownership)
//! - [`TokenRecipient`]: receive hook used by [`send_with_notify`]
//! - [`MemoryTokenLedger`]: in-process implementation
//!
//! # Execution
//!
//! Use [`apply_token_transfer`] and [`apply_token_mint`] to execute balance
//! changes with full validation.

pub mod contract;
pub mod errors;
pub mod ledger;
pub mod transfer;

pub use contract::*;
pub use errors::*;
pub use ledger::{send_with_notify, MemoryTokenLedger, TokenLedger, TokenRecipient};
pub use transfer::{apply_token_mint, apply_token_transfer, TokenStore};
