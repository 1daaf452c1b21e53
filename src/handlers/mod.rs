pub mod audit;
pub mod calculation;
pub mod export;
pub mod health;
pub mod reports;
pub mod rules;
pub mod stipends;
pub mod transfers;
