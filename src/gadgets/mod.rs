//! Helpers for circuit authors, built only on the [`Builder`](crate::Builder)
//! operation set.

pub mod boolean;
pub mod multipack;
pub mod num;
