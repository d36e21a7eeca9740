//! Differential Evolution optimizer.
//!
//! A population-based stochastic minimizer that needs no derivatives. The
//! search runs directly on the bounded parameter values: each varying
//! parameter is sampled from its bounds intersected with a window of
//! `± search_radius` around its seeded value, and the seed itself is always
//! part of the initial population.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::elements::FitElementMap;
use crate::energy::EnergyRange;
use crate::error::Result;
use crate::model::SpectraModel;
use crate::optimizer::{write_bookkeeping, Optimizer};
use crate::parameters::FitParameters;
use crate::problem::SpectrumProblem;
use crate::spectrum::Spectrum;

/// Smallest population the mutation strategies can draw from.
const MIN_POPULATION: usize = 6;

/// Strategies for creating candidate solutions in Differential Evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DEStrategy {
    /// DE/rand/1: x_r1 + F * (x_r2 - x_r3)
    #[default]
    Rand1,

    /// DE/rand/2: x_r1 + F * (x_r2 - x_r3) + F * (x_r4 - x_r5)
    Rand2,

    /// DE/best/1: x_best + F * (x_r1 - x_r2)
    Best1,

    /// DE/best/2: x_best + F * (x_r1 - x_r2) + F * (x_r3 - x_r4)
    Best2,

    /// DE/current-to-best/1: x_i + F * (x_best - x_i) + F * (x_r1 - x_r2)
    CurrentToBest1,
}

/// Differential Evolution optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialEvolution {
    /// Population size multiplier (population size = multiplier * max(parameter count, 4))
    pub pop_size_multiplier: usize,

    /// Differential weight (F) in range [0, 2]
    pub differential_weight: f64,

    /// Crossover probability (CR) in range [0, 1]
    pub crossover_prob: f64,

    pub strategy: DEStrategy,

    /// Seed of the random number generator; equal seeds give equal fits
    pub seed: u64,

    pub max_generations: usize,

    /// Stop after this many generations without a new best cost
    pub max_no_improvement: usize,

    /// Half width of the sampling window around each seeded value
    pub search_radius: f64,
}

impl Default for DifferentialEvolution {
    fn default() -> Self {
        Self {
            pop_size_multiplier: 10,
            differential_weight: 0.8,
            crossover_prob: 0.9,
            strategy: DEStrategy::Rand1,
            seed: 0,
            max_generations: 200,
            max_no_improvement: 30,
            search_radius: 3.0,
        }
    }
}

impl DifferentialEvolution {
    /// Create a new DifferentialEvolution optimizer with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new DifferentialEvolution optimizer with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `pop_size_multiplier` - Population size multiplier
    /// * `differential_weight` - Differential weight (F) in range [0, 2]
    /// * `crossover_prob` - Crossover probability (CR) in range [0, 1]
    /// * `strategy` - Strategy for creating candidate solutions
    pub fn with_params(
        pop_size_multiplier: usize,
        differential_weight: f64,
        crossover_prob: f64,
        strategy: DEStrategy,
    ) -> Self {
        Self {
            pop_size_multiplier,
            differential_weight,
            crossover_prob,
            strategy,
            ..Self::default()
        }
    }

    pub fn with_population_multiplier(mut self, multiplier: usize) -> Self {
        self.pop_size_multiplier = multiplier;
        self
    }

    pub fn with_differential_weight(mut self, weight: f64) -> Self {
        self.differential_weight = weight;
        self
    }

    pub fn with_crossover_probability(mut self, prob: f64) -> Self {
        self.crossover_prob = prob;
        self
    }

    pub fn with_strategy(mut self, strategy: DEStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.max_generations = max_generations;
        self
    }

    pub fn with_max_no_improvement(mut self, max_no_improvement: usize) -> Self {
        self.max_no_improvement = max_no_improvement;
        self
    }

    pub fn with_search_radius(mut self, radius: f64) -> Self {
        self.search_radius = radius;
        self
    }

    /// Number of individuals for `n_params` varying parameters
    pub fn population_size(&self, n_params: usize) -> usize {
        (self.pop_size_multiplier * n_params.max(4)).max(MIN_POPULATION)
    }

    /// Sampling box for each varying parameter
    fn search_bounds(&self, params: &FitParameters) -> Vec<(f64, f64)> {
        let radius = self.search_radius.abs();
        params
            .iter()
            .filter(|(_, p)| p.is_varying())
            .map(|(_, p)| {
                let bounds = p.effective_bounds();
                let center = bounds.clamp(if p.value.is_finite() { p.value } else { 0.0 });
                let min = bounds.min.max(center - radius);
                let max = bounds.max.min(center + radius);
                // Open limits with an infinite radius: sample one unit around the seed
                (
                    if min.is_finite() { min } else { center - 1.0 },
                    if max.is_finite() { max } else { center + 1.0 },
                )
            })
            .collect()
    }

    /// Create a trial vector for `target_idx` using the configured strategy,
    /// followed by binomial crossover with the target.
    fn create_trial_vector(
        &self,
        target_idx: usize,
        best_idx: usize,
        population: &[Array1<f64>],
        bounds: &[(f64, f64)],
        rng: &mut impl Rng,
    ) -> Array1<f64> {
        let n_params = population[target_idx].len();
        let f = self.differential_weight;

        let mut others: Vec<usize> = (0..population.len())
            .filter(|&i| {
                i != target_idx
                    && !(matches!(
                        self.strategy,
                        DEStrategy::Best1 | DEStrategy::Best2 | DEStrategy::CurrentToBest1
                    ) && i == best_idx)
            })
            .collect();
        others.shuffle(rng);
        let r = |k: usize| &population[others[k]];

        let mut trial = match self.strategy {
            DEStrategy::Rand1 => r(0) + &((r(1) - r(2)) * f),
            DEStrategy::Rand2 => r(0) + &((r(1) - r(2)) * f) + &((r(3) - r(4)) * f),
            DEStrategy::Best1 => &population[best_idx] + &((r(0) - r(1)) * f),
            DEStrategy::Best2 => {
                &population[best_idx] + &((r(0) - r(1)) * f) + &((r(2) - r(3)) * f)
            }
            DEStrategy::CurrentToBest1 => {
                let current = &population[target_idx];
                current + &((&population[best_idx] - current) * f) + &((r(0) - r(1)) * f)
            }
        };

        let target = &population[target_idx];
        let j_rand = rng.gen_range(0..n_params);
        for j in 0..n_params {
            if j != j_rand && rng.gen::<f64>() > self.crossover_prob {
                trial[j] = target[j];
            }
        }

        clip_to_bounds(&mut trial, bounds);
        trial
    }
}

impl Optimizer for DifferentialEvolution {
    fn name(&self) -> &str {
        "differential-evolution"
    }

    fn minimize(
        &self,
        params: &mut FitParameters,
        spectrum: &Spectrum,
        elements: &FitElementMap,
        model: &dyn SpectraModel,
        energy_range: EnergyRange,
    ) -> Result<()> {
        let problem = SpectrumProblem::new(params, spectrum, elements, model, energy_range, true)?;
        let n_params = params.varying_count();
        if n_params == 0 {
            let cost = problem.cost(params)?;
            write_bookkeeping(params, 0, cost);
            return Ok(());
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let bounds = self.search_bounds(params);
        let pop_size = self.population_size(n_params);

        let mut seed_vector = params.to_array();
        clip_to_bounds(&mut seed_vector, &bounds);
        let mut population = vec![seed_vector];
        population.extend((1..pop_size).map(|_| random_point(&bounds, &mut rng)));

        let cost_of = |x: &Array1<f64>| problem.cost(&problem.parameters_with_values(x)?);
        let mut costs = population
            .iter()
            .map(|x| cost_of(x))
            .collect::<Result<Vec<_>>>()?;

        let mut best_idx = best_index(&costs);
        let mut generations = 0;
        let mut no_improvement = 0;

        while generations < self.max_generations && no_improvement < self.max_no_improvement {
            let mut improved = false;

            for i in 0..pop_size {
                let trial = self.create_trial_vector(i, best_idx, &population, &bounds, &mut rng);
                let trial_cost = cost_of(&trial)?;

                if select(&mut population, &mut costs, &mut best_idx, i, trial, trial_cost) {
                    improved = true;
                }
            }

            generations += 1;
            if improved {
                no_improvement = 0;
            } else {
                no_improvement += 1;
            }
            trace!(generations, best_cost = costs[best_idx], "generation finished");
        }

        debug!(
            generations,
            population = pop_size,
            cost = costs[best_idx],
            "differential evolution finished"
        );

        params.update_from_array(&population[best_idx])?;
        write_bookkeeping(params, generations, costs[best_idx]);
        Ok(())
    }
}

/// Replace individual `i` when the trial beats it.
///
/// Returns `true` when the trial also lowers the best cost, including when
/// `i` is the current best.
fn select(
    population: &mut [Array1<f64>],
    costs: &mut [f64],
    best_idx: &mut usize,
    i: usize,
    trial: Array1<f64>,
    trial_cost: f64,
) -> bool {
    if trial_cost >= costs[i] {
        return false;
    }
    let best_cost = costs[*best_idx];
    population[i] = trial;
    costs[i] = trial_cost;
    if trial_cost < best_cost {
        *best_idx = i;
        return true;
    }
    false
}

fn best_index(costs: &[f64]) -> usize {
    costs
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map_or(0, |(i, _)| i)
}

fn random_point(bounds: &[(f64, f64)], rng: &mut impl Rng) -> Array1<f64> {
    bounds
        .iter()
        .map(|&(min, max)| if min < max { rng.gen_range(min..max) } else { min })
        .collect()
}

fn clip_to_bounds(point: &mut Array1<f64>, bounds: &[(f64, f64)]) {
    for (x, &(min, max)) in point.iter_mut().zip(bounds) {
        *x = x.clamp(min, max);
    }
}
