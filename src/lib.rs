//! A Tak engine built around iterative deepening alpha-beta search.
//!
//! [`position`] holds the rules, [`evaluation`] the static evaluator and
//! [`search`] the engine itself.

pub mod evaluation;
pub mod position;
pub mod ptn;
pub mod search;

#[cfg(test)]
mod tests;
