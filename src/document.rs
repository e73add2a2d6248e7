//! Read-only access to EnzymeML experiment documents.
//!
//! An [`EnzymeMlDocument`] is a snapshot of the JSON rendition of an EnzymeML
//! document: title, proteins, reactants, and reactions whose participating
//! species carry replicate measurements. It is built once when loaded and
//! never mutated afterwards. [`DocumentAccessor::time_series`] turns one
//! (reaction, species) pair into a validated [`TimeCourse`].
//!
//! ```
//! use kinfit_rs::document::{DocumentAccessor, EnzymeMlDocument};
//!
//! let json = r#"{
//!     "name": "assay",
//!     "reactant": [{ "id": "s0", "name": "NADH" }],
//!     "reaction": [{
//!         "id": "r0",
//!         "name": "reduction",
//!         "educts": [{
//!             "species": "s0",
//!             "replicates": [{ "time": [0.0, 1.0], "data": [1.0, 0.5] }]
//!         }]
//!     }]
//! }"#;
//!
//! let doc = EnzymeMlDocument::from_json(json)?;
//! let course = doc.time_series("r0", "s0")?;
//! assert_eq!(course.n_points(), 2);
//! # Ok::<(), kinfit_rs::KinFitError>(())
//! ```

use crate::data::TimeCourse;
use crate::error::{KinFitError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

/// A protein or small-molecule reactant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: String,
    pub name: String,
}

/// One replicate run: measured values at the given time points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replicate {
    pub time: Vec<f64>,
    pub data: Vec<f64>,
}

/// A species taking part in a reaction, with its measurements if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesReference {
    pub species: String,
    #[serde(default)]
    pub replicates: Vec<Replicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeciesRole {
    Educt,
    Product,
    Modifier,
}

impl fmt::Display for SpeciesRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpeciesRole::Educt => "educt",
            SpeciesRole::Product => "product",
            SpeciesRole::Modifier => "modifier",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub educts: Vec<SpeciesReference>,
    #[serde(default)]
    pub products: Vec<SpeciesReference>,
    #[serde(default)]
    pub modifiers: Vec<SpeciesReference>,
}

impl Reaction {
    /// The participants playing `role`.
    pub fn participants(&self, role: SpeciesRole) -> &[SpeciesReference] {
        match role {
            SpeciesRole::Educt => &self.educts,
            SpeciesRole::Product => &self.products,
            SpeciesRole::Modifier => &self.modifiers,
        }
    }

    /// Role of `species` in this reaction, `None` if it does not take part.
    ///
    /// A species listed under several roles reports the first of educt,
    /// product, modifier.
    pub fn role_of(&self, species: &str) -> Option<SpeciesRole> {
        self.find(species).map(|(role, _)| role)
    }

    fn find(&self, species: &str) -> Option<(SpeciesRole, &SpeciesReference)> {
        [
            SpeciesRole::Educt,
            SpeciesRole::Product,
            SpeciesRole::Modifier,
        ]
        .into_iter()
        .find_map(|role| {
            self.participants(role)
                .iter()
                .find(|r| r.species == species)
                .map(|r| (role, r))
        })
    }
}

/// Immutable snapshot of one experiment document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnzymeMlDocument {
    name: String,
    #[serde(rename = "protein", default)]
    proteins: Vec<Species>,
    #[serde(rename = "reactant", default)]
    reactants: Vec<Species>,
    #[serde(rename = "reaction", default)]
    reactions: Vec<Reaction>,
}

impl EnzymeMlDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(json)?;
        info!(
            "loaded document '{}': {} proteins, {} reactants, {} reactions",
            doc.name,
            doc.proteins.len(),
            doc.reactants.len(),
            doc.reactions.len()
        );
        Ok(doc)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        debug!("reading document from {}", path.as_ref().display());
        Self::from_json(&json)
    }

    pub fn title(&self) -> &str {
        &self.name
    }

    pub fn proteins(&self) -> &[Species] {
        &self.proteins
    }

    pub fn reactants(&self) -> &[Species] {
        &self.reactants
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.id == id)
    }

    /// Display name of a reactant or protein.
    pub fn species_name(&self, id: &str) -> Option<&str> {
        self.reactants
            .iter()
            .chain(self.proteins.iter())
            .find(|s| s.id == id)
            .map(|s| s.name.as_str())
    }

    /// Role of `species` in reaction `reaction`; `None` if either is unknown.
    pub fn role_of(&self, reaction: &str, species: &str) -> Option<SpeciesRole> {
        self.reaction(reaction)?.role_of(species)
    }
}

/// Source of replicate time courses keyed by (reaction, species).
pub trait DocumentAccessor {
    /// Time vector and replicate matrix of `species` in `reaction`.
    ///
    /// Fails with [`KinFitError::NotFound`] for an unknown pair and
    /// [`KinFitError::MalformedData`] when the species has no replicates,
    /// a replicate's time and data differ in length, or replicates were
    /// sampled at different times.
    fn time_series(&self, reaction: &str, species: &str) -> Result<TimeCourse>;
}

impl DocumentAccessor for EnzymeMlDocument {
    fn time_series(&self, reaction: &str, species: &str) -> Result<TimeCourse> {
        let rxn = self
            .reaction(reaction)
            .ok_or_else(|| KinFitError::NotFound(format!("reaction '{}'", reaction)))?;
        let (_, reference) = rxn.find(species).ok_or_else(|| {
            KinFitError::NotFound(format!(
                "species '{}' in reaction '{}'",
                species, reaction
            ))
        })?;

        let first = reference.replicates.first().ok_or_else(|| {
            KinFitError::MalformedData(format!(
                "species '{}' in reaction '{}' has no replicates",
                species, reaction
            ))
        })?;

        for (i, replicate) in reference.replicates.iter().enumerate() {
            if replicate.time.len() != replicate.data.len() {
                return Err(KinFitError::MalformedData(format!(
                    "replicate {} of '{}' has {} time points but {} values",
                    i,
                    species,
                    replicate.time.len(),
                    replicate.data.len()
                )));
            }
            if replicate.time != first.time {
                return Err(KinFitError::MalformedData(format!(
                    "replicate {} of '{}' was sampled at different times than replicate 0",
                    i, species
                )));
            }
        }

        let rows = reference
            .replicates
            .iter()
            .map(|r| r.data.clone())
            .collect();
        TimeCourse::from_rows(first.time.clone(), rows)
    }
}

fn species_table(species: &[Species]) -> String {
    let mut builder = Builder::default();
    builder.push_record(vec!["ID", "Name"]);
    for s in species {
        builder.push_record(vec![s.id.as_str(), s.name.as_str()]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

impl EnzymeMlDocument {
    fn participant_list(&self, refs: &[SpeciesReference]) -> String {
        refs.iter()
            .map(|r| match self.species_name(&r.species) {
                Some(name) => format!("{} ({})", name, r.species),
                None => r.species.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn reaction_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(vec!["ID", "Name", "Educts", "Products", "Modifiers"]);
        for rxn in &self.reactions {
            builder.push_record(vec![
                rxn.id.clone(),
                rxn.name.clone(),
                self.participant_list(&rxn.educts),
                self.participant_list(&rxn.products),
                self.participant_list(&rxn.modifiers),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        table.to_string()
    }
}

impl fmt::Display for EnzymeMlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::default();
        builder.push_record(vec![self.name.clone()]);

        if !self.proteins.is_empty() {
            builder.push_record(vec!["Proteins".to_string()]);
            builder.push_record(vec![species_table(&self.proteins)]);
        }

        if !self.reactants.is_empty() {
            builder.push_record(vec!["Reactants".to_string()]);
            builder.push_record(vec![species_table(&self.reactants)]);
        }

        if !self.reactions.is_empty() {
            builder.push_record(vec!["Reactions".to_string()]);
            builder.push_record(vec![self.reaction_table()]);
        }

        let mut table = builder.build();
        table.with(Style::sharp());
        write!(f, "{}", table)
    }
}
