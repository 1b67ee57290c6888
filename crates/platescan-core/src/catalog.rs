//! Reference food catalog: the fixed archetypes the classifier compares against.
//!
//! A catalog is built once at startup and never mutated afterwards. Entry
//! order is significant: it decides which entry wins a similarity tie.

use serde::{Deserialize, Serialize};

/// Macronutrient estimate for one serving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Macros {
    pub const fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }

    fn is_valid(&self) -> bool {
        [self.calories, self.protein, self.carbs, self.fat]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodProfile {
    pub label: String,
    /// Canonical average colour, RGB order.
    pub signature: [f32; 3],
    pub macros: Macros,
}

impl FoodProfile {
    pub fn new(label: impl Into<String>, signature: [f32; 3], macros: Macros) -> Self {
        Self {
            label: label.into(),
            signature,
            macros,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog must contain at least one profile")]
    Empty,
    #[error("profile {0:?} has negative or non-finite macros")]
    InvalidMacros(String),
    #[error("profile {0:?} has a zero or non-finite signature")]
    InvalidSignature(String),
}

/// Immutable, ordered set of food profiles with their unit-length signatures.
#[derive(Debug, Clone)]
pub struct Catalog {
    profiles: Vec<FoodProfile>,
    normalized: Vec<[f32; 3]>,
}

impl Catalog {
    /// The five hand-authored archetypes shipped with the service.
    pub fn reference() -> Self {
        Self::build(vec![
            FoodProfile::new(
                "grilled chicken breast",
                [184.0, 146.0, 108.0],
                Macros::new(220.0, 40.0, 0.0, 5.0),
            ),
            FoodProfile::new(
                "mixed salad",
                [92.0, 138.0, 71.0],
                Macros::new(120.0, 3.0, 12.0, 7.0),
            ),
            FoodProfile::new(
                "white rice bowl",
                [216.0, 208.0, 196.0],
                Macros::new(205.0, 4.0, 45.0, 0.4),
            ),
            FoodProfile::new(
                "oatmeal with berries",
                [186.0, 140.0, 124.0],
                Macros::new(260.0, 9.0, 46.0, 6.0),
            ),
            FoodProfile::new(
                "salmon fillet",
                [208.0, 132.0, 108.0],
                Macros::new(233.0, 25.0, 0.0, 14.0),
            ),
        ])
    }

    /// Build a custom catalog, validating every profile.
    pub fn new(profiles: Vec<FoodProfile>) -> Result<Self, CatalogError> {
        if profiles.is_empty() {
            return Err(CatalogError::Empty);
        }
        for p in &profiles {
            if !p.macros.is_valid() {
                return Err(CatalogError::InvalidMacros(p.label.clone()));
            }
            let finite = p.signature.iter().all(|v| v.is_finite());
            let nonzero = p.signature.iter().any(|v| *v != 0.0);
            if !finite || !nonzero {
                return Err(CatalogError::InvalidSignature(p.label.clone()));
            }
        }
        Ok(Self::build(profiles))
    }

    fn build(profiles: Vec<FoodProfile>) -> Self {
        let normalized = profiles
            .iter()
            .map(|p| crate::classifier::l2_normalize(p.signature))
            .collect();
        Self {
            profiles,
            normalized,
        }
    }

    pub fn profiles(&self) -> &[FoodProfile] {
        &self.profiles
    }

    /// Unit-length signatures, in catalog order.
    pub fn normalized_signatures(&self) -> &[[f32; 3]] {
        &self.normalized
    }

    pub fn labels(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
