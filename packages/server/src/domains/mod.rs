// Business domains
pub mod verification;
