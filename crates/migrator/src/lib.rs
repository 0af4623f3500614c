pub mod domain;
pub mod infra;
pub mod run;
pub mod util;

pub use run::start;
