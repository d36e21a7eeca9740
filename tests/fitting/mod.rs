//! Tests that run the library against spectra from the Gaussian line model.

// Seeding from synthetic spectra
mod seeding;

// Fit routine behaviour with and without optimizers
mod fit_routine;

// Optimizers fitting a synthetic spectrum end to end
mod optimizers;
