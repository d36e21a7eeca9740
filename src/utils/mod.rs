//! Numerical helpers shared by the optimizers.

pub mod finite_difference;
