//! Objective declarations and the per-individual fitness record.

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Where an objective value comes from in the simulator's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Measurement {
    /// Last row minus first row of a time-series column.
    SeriesDelta { column: String },
    /// Last row of a time-series column.
    SeriesFinal { column: String },
    /// First row of a score-table column, optionally minus a baseline column.
    Score {
        column: String,
        #[serde(default)]
        baseline: Option<String>,
    },
}

impl Measurement {
    /// How replicate values of this measurement are combined.
    pub fn aggregation(&self) -> Aggregation {
        match self {
            Measurement::Score { .. } => Aggregation::Product,
            Measurement::SeriesDelta { .. } | Measurement::SeriesFinal { .. } => Aggregation::Mean,
        }
    }
}

/// Replicate aggregation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Raw measurements are averaged.
    Mean,
    /// Bounded scores are multiplied.
    Product,
}

/// A named objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    pub measurement: Measurement,
}

impl Objective {
    pub fn new(name: &str, measurement: Measurement) -> Self {
        Self {
            name: name.to_string(),
            measurement,
        }
    }
}

/// Objectives measured when no list is configured.
pub fn default_objectives() -> Vec<Objective> {
    let series_delta = |column: &str| Measurement::SeriesDelta {
        column: column.to_string(),
    };
    let score = |column: &str| Measurement::Score {
        column: column.to_string(),
        baseline: None,
    };

    vec![
        Objective::new("Biomass", series_delta("mean_Biomass")),
        Objective::new("Growth_Rate", series_delta("mean_Growth_Rate")),
        Objective::new(
            "Heredity",
            Measurement::SeriesFinal {
                column: "mean_Heredity".to_string(),
            },
        ),
        Objective::new("Biomass_Score", score("Biomass_Score")),
        Objective::new("Growth_Rate_Score", score("Growth_Rate_Score")),
        Objective::new("Heredity_Score", score("Heredity_Score")),
        Objective::new("Invasion_Ability_Score", score("Invasion_Ability_Score")),
        Objective::new("Resiliance_Score", score("Resiliance_Score")),
    ]
}

/// The fixed key set of every fitness record in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessSchema {
    names: Arc<[String]>,
    aggregations: Vec<Aggregation>,
}

impl FitnessSchema {
    pub fn new(objectives: &[Objective]) -> Self {
        Self {
            names: objectives.iter().map(|o| o.name.clone()).collect(),
            aggregations: objectives
                .iter()
                .map(|o| o.measurement.aggregation())
                .collect(),
        }
    }

    /// Schema of raw (mean-aggregated) objectives with the given names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            aggregations: vec![Aggregation::Mean; names.len()],
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Indices of every objective, in declaration order.
    pub fn objective_indices(&self) -> Vec<usize> {
        (0..self.names.len()).collect()
    }

    /// Wrap values (in declaration order) into a record.
    pub fn record(&self, values: Vec<f64>) -> FitnessRecord {
        debug_assert_eq!(values.len(), self.names.len());
        FitnessRecord {
            names: Arc::clone(&self.names),
            values,
        }
    }

    /// Record assigned to failed or dead genomes.
    pub fn sentinel(&self) -> FitnessRecord {
        self.record(vec![0.0; self.names.len()])
    }

    /// Whether a record carries exactly this schema's key set.
    pub fn matches(&self, record: &FitnessRecord) -> bool {
        Arc::ptr_eq(&self.names, &record.names) || self.names == record.names
    }

    /// Combine replicate records: mean for raw measurements, product for scores.
    pub fn aggregate(&self, replicates: &[FitnessRecord]) -> FitnessRecord {
        if replicates.is_empty() {
            return self.sentinel();
        }
        let n = replicates.len() as f64;
        let values = self
            .aggregations
            .iter()
            .enumerate()
            .map(|(i, aggregation)| {
                let column = replicates.iter().map(|r| r.values[i]);
                match aggregation {
                    Aggregation::Mean => column.sum::<f64>() / n,
                    Aggregation::Product => column.product(),
                }
            })
            .collect();
        self.record(values)
    }
}

/// Objective name → score for one individual.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessRecord {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl FitnessRecord {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Apply a function to every value, keeping the key set.
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            names: Arc::clone(&self.names),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Formats as a map literal: `{'Biomass': 1.5, 'Heredity': 0.0}`.
impl fmt::Display for FitnessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{}': {}", name, format_float(value))?;
        }
        write!(f, "}}")
    }
}

impl Serialize for FitnessRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Shortest round-trip float text with a signed two-digit exponent
/// (`1e-05`, `2.5e+16`) and lowercase `nan`/`inf`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let text = format!("{value:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text,
    }
}
