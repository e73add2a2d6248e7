//! Integration tests for unit conversion and parameter tables.

use approx::assert_relative_eq;
use kinfit_rs::parameters::Parameters;
use kinfit_rs::report::{build_table, TableCell, ROW_LABELS};
use kinfit_rs::units::{absorbance_to_concentration, concentration_to_absorbance};

#[test]
fn test_conversion_round_trip() {
    for c in [1e-3, 0.5, 12.0, 40.323, 1e4] {
        assert_relative_eq!(
            absorbance_to_concentration(concentration_to_absorbance(c)),
            c,
            max_relative = 1e-12
        );
    }
}

#[test]
fn test_single_result_column() {
    let mut params = Parameters::new();
    params.add_param("S0", 1.0);
    params.add_param("vmax", 5.0);

    let table = build_table(vec![("fit", params)]);
    assert_eq!(table.rows, ROW_LABELS.to_vec());
    assert_eq!(
        table.column("fit").unwrap(),
        vec![
            TableCell::Value(40.323),
            TableCell::Absent,
            TableCell::Value(5.0),
            TableCell::Absent,
            TableCell::Absent,
        ]
    );
    let text = table.to_string();
    assert!(text.contains("40.323"));
    assert!(text.contains("vmax [M/min]"));
}

#[test]
fn test_mixed_mechanisms_side_by_side() {
    let mut plain = Parameters::new();
    plain.add_param("S0", 0.248);
    plain.add_param("vmax", 0.01234);
    plain.add_param("Km", 0.0248);

    let mut inactivation = plain.clone();
    inactivation.add_param("bias", 0.0);
    inactivation.add_param("a", 0.5);

    let table = build_table([("plain", &plain), ("inactivation", &inactivation)]);
    assert_eq!(table.columns, vec!["plain", "inactivation"]);
    assert_eq!(table.matrix[0], vec![TableCell::Value(10.0); 2]);
    assert_eq!(table.matrix[1], vec![TableCell::Absent, TableCell::Value(0.0)]);
    assert_eq!(table.matrix[2], vec![TableCell::Value(0.012); 2]);
    assert_eq!(table.matrix[3], vec![TableCell::Value(1.0); 2]);
    assert_eq!(table.matrix[4], vec![TableCell::Absent, TableCell::Value(0.5)]);
}
