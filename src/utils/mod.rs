pub mod csv;
pub mod pagination;
