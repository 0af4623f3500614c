pub mod eth;
pub mod migration;
pub mod position;
pub mod shares;
