//! Time module - dated estimates and discrete distributions over a timeline
//!
//! The common timeline is astronomical years CE: negative values are BCE,
//! larger values are later. Inputs in other units are normalised with
//! [`TimeUnit::to_year`].

use crate::DomainError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Year that "Before Present" counts back from
pub const PRESENT_YEAR: f64 = 1950.0;

/// Unit a raw dating value is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeUnit {
    /// Years before present (1950)
    Bp,
    /// Years before the common era
    Bc,
    /// Years of the common era
    Ad,
    /// Millions of years ago
    Mya,
}

impl TimeUnit {
    /// Convert a value in this unit to a year on the common timeline
    pub fn to_year(&self, value: f64) -> f64 {
        match self {
            TimeUnit::Bp => PRESENT_YEAR - value,
            TimeUnit::Bc => -value,
            TimeUnit::Ad => value,
            TimeUnit::Mya => PRESENT_YEAR - value * 1_000_000.0,
        }
    }

    /// Convert an uncertainty (a duration) in this unit to years
    pub fn to_years_span(&self, span: f64) -> f64 {
        match self {
            TimeUnit::Mya => span * 1_000_000.0,
            _ => span,
        }
    }
}

/// Uncertain point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TimeEstimate {
    /// Uniform over a closed interval
    Interval {
        /// Earliest possible year
        earliest: f64,
        /// Latest possible year
        latest: f64,
    },
    /// Normally distributed around a mean
    Gaussian {
        /// Central estimate (year)
        mean: f64,
        /// One standard deviation (years)
        std_dev: f64,
    },
}

impl TimeEstimate {
    /// Uniform estimate over `[earliest, latest]`
    pub fn interval(earliest: f64, latest: f64) -> Self {
        TimeEstimate::Interval { earliest, latest }
    }

    /// Gaussian estimate
    pub fn gaussian(mean: f64, std_dev: f64) -> Self {
        TimeEstimate::Gaussian { mean, std_dev }
    }

    /// Build an estimate from a raw dating value (e.g. radiocarbon `3200 ± 50 BP`)
    pub fn dated(value: f64, unit: TimeUnit, uncertainty: f64) -> Self {
        TimeEstimate::Gaussian {
            mean: unit.to_year(value),
            std_dev: unit.to_years_span(uncertainty.abs()),
        }
    }

    /// Check that the estimate is finite and well-ordered
    pub fn validate(&self) -> Result<(), DomainError> {
        match *self {
            TimeEstimate::Interval { earliest, latest } => {
                if !earliest.is_finite() || !latest.is_finite() {
                    return Err(DomainError::InvalidTime("interval bounds must be finite".into()));
                }
                if earliest > latest {
                    return Err(DomainError::InvalidTime(format!(
                        "earliest {} is after latest {}",
                        earliest, latest
                    )));
                }
            }
            TimeEstimate::Gaussian { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() {
                    return Err(DomainError::InvalidTime("gaussian parameters must be finite".into()));
                }
                if std_dev < 0.0 {
                    return Err(DomainError::InvalidTime(format!(
                        "standard deviation {} is negative",
                        std_dev
                    )));
                }
            }
        }
        Ok(())
    }

    /// Expected year
    pub fn mean(&self) -> f64 {
        match *self {
            TimeEstimate::Interval { earliest, latest } => (earliest + latest) / 2.0,
            TimeEstimate::Gaussian { mean, .. } => mean,
        }
    }

    /// Standard deviation (uniform intervals use width / sqrt(12))
    pub fn std_dev(&self) -> f64 {
        match *self {
            TimeEstimate::Interval { earliest, latest } => (latest - earliest) / 12f64.sqrt(),
            TimeEstimate::Gaussian { std_dev, .. } => std_dev,
        }
    }

    /// Range holding effectively all of the mass (±3σ for Gaussians)
    pub fn support(&self) -> (f64, f64) {
        match *self {
            TimeEstimate::Interval { earliest, latest } => (earliest, latest),
            TimeEstimate::Gaussian { mean, std_dev } => (mean - 3.0 * std_dev, mean + 3.0 * std_dev),
        }
    }

    /// Plausible range (the interval itself, or ±2σ)
    pub fn plausible_range(&self) -> (f64, f64) {
        match *self {
            TimeEstimate::Interval { earliest, latest } => (earliest, latest),
            TimeEstimate::Gaussian { mean, std_dev } => (mean - 2.0 * std_dev, mean + 2.0 * std_dev),
        }
    }

    /// Whether the plausible ranges of two estimates intersect
    pub fn overlaps(&self, other: &TimeEstimate) -> bool {
        let (a_lo, a_hi) = self.plausible_range();
        let (b_lo, b_hi) = other.plausible_range();
        a_lo <= b_hi && b_lo <= a_hi
    }

    /// Probability that this estimate lies before `other`
    ///
    /// Treats both as independent normals: P(A < B) = Φ((μB − μA) / √(σA² + σB²)).
    pub fn probability_precedes(&self, other: &TimeEstimate) -> f64 {
        let diff = other.mean() - self.mean();
        let sigma = (self.std_dev().powi(2) + other.std_dev().powi(2)).sqrt();
        if sigma == 0.0 {
            return if diff > 0.0 {
                1.0
            } else if diff < 0.0 {
                0.0
            } else {
                0.5
            };
        }
        match Normal::new(0.0, 1.0) {
            Ok(standard) => standard.cdf(diff / sigma),
            Err(_) => 0.5,
        }
    }
}

/// Shared discretisation of the timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    /// Left edge of the first bin (year)
    pub start: f64,
    /// Width of every bin (years)
    pub bin_width: f64,
    /// Number of bins
    pub bins: usize,
}

impl TimeGrid {
    /// Create a grid spanning `[start, end]` with `bins` bins
    pub fn new(start: f64, end: f64, bins: usize) -> Result<Self, DomainError> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(DomainError::InvalidTime(format!("grid [{}, {}] is empty", start, end)));
        }
        if bins == 0 {
            return Err(DomainError::InvalidTime("grid needs at least one bin".into()));
        }
        Ok(Self {
            start,
            bin_width: (end - start) / bins as f64,
            bins,
        })
    }

    /// Smallest padded grid covering the support of every estimate
    ///
    /// Returns `None` when there are no estimates.
    pub fn covering<'a, I>(estimates: I, bins: usize, padding_fraction: f64) -> Option<Self>
    where
        I: IntoIterator<Item = &'a TimeEstimate>,
    {
        let (lo, hi) = estimates
            .into_iter()
            .map(|e| e.support())
            .fold(None, |acc: Option<(f64, f64)>, (lo, hi)| match acc {
                None => Some((lo, hi)),
                Some((a, b)) => Some((a.min(lo), b.max(hi))),
            })?;
        let span = hi - lo;
        let pad = if span > 0.0 { span * padding_fraction.max(0.0) } else { 1.0 };
        Self::new(lo - pad, hi + pad, bins.max(1)).ok()
    }

    /// Right edge of the last bin
    pub fn end(&self) -> f64 {
        self.start + self.bin_width * self.bins as f64
    }

    /// Midpoint of bin `i`
    pub fn center(&self, i: usize) -> f64 {
        self.start + (i as f64 + 0.5) * self.bin_width
    }

    /// Bin containing `year`, clamped to the grid
    pub fn bin_of(&self, year: f64) -> usize {
        if year <= self.start {
            return 0;
        }
        let idx = ((year - self.start) / self.bin_width).floor() as usize;
        idx.min(self.bins - 1)
    }

    /// Whether every estimate's support lies inside the grid
    pub fn contains_all<'a, I>(&self, estimates: I) -> bool
    where
        I: IntoIterator<Item = &'a TimeEstimate>,
    {
        estimates.into_iter().all(|e| {
            let (lo, hi) = e.support();
            lo >= self.start && hi <= self.end()
        })
    }
}

/// Normalised probability mass over the bins of a [`TimeGrid`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDistribution {
    grid: TimeGrid,
    mass: Vec<f64>,
}

impl TimeDistribution {
    /// Build from raw (unnormalised) mass; `None` when the mass is empty or not finite
    pub fn from_mass(grid: TimeGrid, mass: Vec<f64>) -> Option<Self> {
        if mass.len() != grid.bins {
            return None;
        }
        let total: f64 = mass.iter().sum();
        if !total.is_finite() || total <= 0.0 || mass.iter().any(|m| *m < 0.0) {
            return None;
        }
        let mass = mass.into_iter().map(|m| m / total).collect();
        Some(Self { grid, mass })
    }

    /// Uniform mass over the grid
    pub fn uniform(grid: TimeGrid) -> Self {
        let p = 1.0 / grid.bins as f64;
        Self {
            grid,
            mass: vec![p; grid.bins],
        }
    }

    /// All mass in the bin containing `year`
    pub fn point(grid: TimeGrid, year: f64) -> Self {
        let mut mass = vec![0.0; grid.bins];
        mass[grid.bin_of(year)] = 1.0;
        Self { grid, mass }
    }

    /// Discretise an estimate onto a grid
    pub fn from_estimate(estimate: &TimeEstimate, grid: TimeGrid) -> Self {
        let mass: Vec<f64> = match *estimate {
            TimeEstimate::Interval { earliest, latest } => {
                if latest <= earliest {
                    return Self::point(grid, earliest);
                }
                (0..grid.bins)
                    .map(|i| {
                        let lo = grid.start + i as f64 * grid.bin_width;
                        let hi = lo + grid.bin_width;
                        (hi.min(latest) - lo.max(earliest)).max(0.0)
                    })
                    .collect()
            }
            TimeEstimate::Gaussian { mean, std_dev } => {
                let Ok(normal) = Normal::new(mean, std_dev) else {
                    return Self::point(grid, mean);
                };
                if std_dev == 0.0 {
                    return Self::point(grid, mean);
                }
                (0..grid.bins)
                    .map(|i| {
                        let lo = grid.start + i as f64 * grid.bin_width;
                        let hi = lo + grid.bin_width;
                        (normal.cdf(hi) - normal.cdf(lo)).max(0.0)
                    })
                    .collect()
            }
        };
        Self::from_mass(grid, mass).unwrap_or_else(|| Self::point(grid, estimate.mean()))
    }

    /// Grid this distribution lives on
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Per-bin probability mass (sums to 1)
    pub fn mass(&self) -> &[f64] {
        &self.mass
    }

    /// Pointwise product with another distribution on the same grid
    ///
    /// `None` when the grids differ or the supports are disjoint.
    pub fn product(&self, other: &TimeDistribution) -> Option<Self> {
        if self.grid != other.grid {
            return None;
        }
        let mass = self.mass.iter().zip(&other.mass).map(|(a, b)| a * b).collect();
        Self::from_mass(self.grid, mass)
    }

    /// Equal-weight mixture of distributions sharing a grid
    pub fn mixture(parts: &[TimeDistribution]) -> Option<Self> {
        let first = parts.first()?;
        if parts.iter().any(|p| p.grid != first.grid) {
            return None;
        }
        let mut mass = vec![0.0; first.grid.bins];
        for part in parts {
            for (acc, m) in mass.iter_mut().zip(&part.mass) {
                *acc += m;
            }
        }
        Self::from_mass(first.grid, mass)
    }

    /// Expected year
    pub fn mean(&self) -> f64 {
        self.mass
            .iter()
            .enumerate()
            .map(|(i, m)| m * self.grid.center(i))
            .sum()
    }

    /// Standard deviation in years
    pub fn std_dev(&self) -> f64 {
        let mean = self.mean();
        self.mass
            .iter()
            .enumerate()
            .map(|(i, m)| m * (self.grid.center(i) - mean).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Year below which a fraction `p` of the mass lies (linear within a bin)
    pub fn quantile(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        let mut cumulative = 0.0;
        for (i, m) in self.mass.iter().enumerate() {
            if *m > 0.0 && cumulative + m >= p {
                let frac = ((p - cumulative) / m).clamp(0.0, 1.0);
                return self.grid.start + (i as f64 + frac) * self.grid.bin_width;
            }
            cumulative += m;
        }
        self.grid.end()
    }

    /// Bin center and mass of the most probable bin
    pub fn most_likely(&self) -> (f64, f64) {
        let (idx, mass) = self
            .mass
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, m)| if *m > best.1 { (i, *m) } else { best });
        (self.grid.center(idx), mass)
    }

    /// P(T < center of bin i) for every bin; ties within a bin count half
    pub fn precedence_profile(&self) -> Vec<f64> {
        let mut before = 0.0;
        self.mass
            .iter()
            .map(|m| {
                let p = before + 0.5 * m;
                before += m;
                p.clamp(0.0, 1.0)
            })
            .collect()
    }

    /// P(T > center of bin i) for every bin; ties within a bin count half
    pub fn exceedance_profile(&self) -> Vec<f64> {
        self.precedence_profile().into_iter().map(|p| 1.0 - p).collect()
    }

    /// Probability that this event happened before `other`
    pub fn probability_precedes(&self, other: &TimeDistribution) -> f64 {
        if self.grid != other.grid {
            return TimeEstimate::gaussian(self.mean(), self.std_dev())
                .probability_precedes(&TimeEstimate::gaussian(other.mean(), other.std_dev()));
        }
        self.mass
            .iter()
            .zip(other.exceedance_profile())
            .map(|(a, b_after)| a * b_after)
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    /// Shannon entropy in bits
    pub fn entropy(&self) -> f64 {
        self.mass
            .iter()
            .filter(|p| **p > 0.0)
            .map(|p| -p * p.log2())
            .sum()
    }

    /// Entropy divided by its maximum for this grid, in [0, 1]
    pub fn normalized_entropy(&self) -> f64 {
        if self.grid.bins < 2 {
            return 0.0;
        }
        (self.entropy() / (self.grid.bins as f64).log2()).clamp(0.0, 1.0)
    }

    /// Total-variation distance to another distribution on the same grid
    pub fn total_variation(&self, other: &TimeDistribution) -> f64 {
        if self.grid != other.grid {
            return 1.0;
        }
        0.5 * self
            .mass
            .iter()
            .zip(&other.mass)
            .map(|(a, b)| (a - b).abs())
            .sum::<f64>()
    }

    /// Convex blend `(1 - keep) * self + keep * previous`
    pub fn blend(&self, previous: &TimeDistribution, keep: f64) -> Self {
        if self.grid != previous.grid {
            return self.clone();
        }
        let keep = keep.clamp(0.0, 1.0);
        let mass = self
            .mass
            .iter()
            .zip(&previous.mass)
            .map(|(new, old)| (1.0 - keep) * new + keep * old)
            .collect();
        Self::from_mass(self.grid, mass).unwrap_or_else(|| self.clone())
    }
}
