//! Core business logic - framework-agnostic economy operations.
//!
//! Nothing in here knows about Discord. The bot layer translates events and
//! commands into calls on [`CurrencyService`].

/// Time source abstraction
pub mod clock;
/// The currency service: grants, transfers, adjustments and reads
pub mod currency;
/// Append-only ledger reads and writes
pub mod ledger;
/// Per-wallet async locks
pub mod locks;
/// Pure reward rules
pub mod reward;
/// Guild settings and reward multipliers
pub mod settings;
/// Wallet reads and atomic balance writes
pub mod wallet;

pub use clock::{Clock, SystemClock};
pub use currency::{Activity, CurrencyService, GrantOutcome, TransferReceipt};
pub use reward::Ineligible;
pub use settings::SettingsPatch;
