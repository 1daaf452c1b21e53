pub mod calculator;
pub mod ledger;
pub mod transfer;
pub mod validation;

pub use calculator::{AppliedDeduction, CalcError, CalculationResult};
pub use ledger::{CreatedStipend, Ledger};
pub use transfer::TransferEngine;
pub use validation::ValidationReport;
