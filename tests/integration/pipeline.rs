//! Document to parameter table for two synthetic NADH depletion assays.

use approx::assert_relative_eq;
use kinfit_rs::document::{DocumentAccessor, EnzymeMlDocument};
use kinfit_rs::modeler::{fit_many, FitConfig, FitJob, InitialGuess};
use kinfit_rs::models::MichaelisMenten;
use kinfit_rs::report::{build_table, TableCell};
use kinfit_rs::units::absorbance_to_concentration;
use ndarray::Array1;
use serde_json::json;

use crate::test_helpers::{mm_params, noisy_course};

/// Absorbance traces with a constant background, as a plate reader reports them.
fn replicates_json(s0: f64, background: f64, seed: u64) -> serde_json::Value {
    let t = Array1::linspace(0.0, 30.0, 31);
    let course = noisy_course(
        &MichaelisMenten,
        &mm_params(s0, 0.08, 0.15),
        &[s0],
        t.clone(),
        3,
        0.002,
        seed,
    );
    let replicates: Vec<_> = course
        .replicates()
        .rows()
        .into_iter()
        .map(|row| {
            json!({
                "time": t.to_vec(),
                "data": row.iter().map(|v| v + background).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!(replicates)
}

fn document() -> EnzymeMlDocument {
    let doc = json!({
        "name": "NADH depletion at two pyruvate levels",
        "protein": [{ "id": "p0", "name": "LDH" }],
        "reactant": [
            { "id": "s0", "name": "NADH" },
            { "id": "s1", "name": "Pyruvate" }
        ],
        "reaction": [
            {
                "id": "r0",
                "name": "low pyruvate",
                "educts": [
                    { "species": "s0", "replicates": replicates_json(0.9, 0.05, 1) },
                    { "species": "s1" }
                ],
                "modifiers": [{ "species": "p0" }]
            },
            {
                "id": "r1",
                "name": "high pyruvate",
                "educts": [
                    { "species": "s0", "replicates": replicates_json(0.6, 0.05, 2) },
                    { "species": "s1" }
                ],
                "modifiers": [{ "species": "p0" }]
            }
        ]
    });
    EnzymeMlDocument::from_json(&doc.to_string()).unwrap()
}

#[test]
fn test_document_to_table() {
    let doc = document();
    assert!(doc.to_string().contains("NADH (s0)"));

    let jobs: Vec<FitJob> = ["r0", "r1"]
        .iter()
        .map(|reaction| {
            let course = doc.time_series(reaction, "s0").unwrap();
            let start = InitialGuess::from_time_course(&course)
                .unwrap()
                .to_parameters(true)
                .unwrap();
            FitJob::new(format!("{}/s0", reaction), course, start)
        })
        .collect();

    let results = fit_many(&jobs, &MichaelisMenten, &FitConfig::default());
    let fits: Vec<_> = results
        .iter()
        .map(|(name, result)| (name.clone(), result.as_ref().unwrap()))
        .collect();
    for (name, fit) in &fits {
        assert!(fit.success, "{}: {}", name, fit);
        assert_relative_eq!(fit.value("bias").unwrap(), 0.05, epsilon = 0.02);
    }
    assert_relative_eq!(fits[0].1.value("S0").unwrap(), 0.9, epsilon = 0.02);
    assert_relative_eq!(fits[1].1.value("S0").unwrap(), 0.6, epsilon = 0.02);

    let table = build_table(fits.iter().map(|(name, fit)| (name.as_str(), *fit)));
    assert_eq!(table.columns, vec!["r0/s0", "r1/s0"]);

    // S0 row is reported in mmol/L, vmax untouched, a absent
    let s0_low = absorbance_to_concentration(fits[0].1.value("S0").unwrap());
    match table.matrix[0][0] {
        TableCell::Value(v) => assert!((v - s0_low).abs() <= 5e-4),
        TableCell::Absent => panic!("S0 missing from table"),
    }
    assert!(matches!(table.matrix[2][1], TableCell::Value(_)));
    assert_eq!(table.matrix[4], vec![TableCell::Absent; 2]);
}
