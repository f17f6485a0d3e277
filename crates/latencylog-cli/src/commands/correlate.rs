//! `latencylog correlate`: Pearson matrix over numeric fields.

use std::path::Path;

use latencylog_core::aggregate::{CorrelationMatrix, NumericField, correlation_matrix};

use super::FilterArgs;

pub fn run(csv: &Path, fields: &[String], filters: &FilterArgs, json: bool) {
    let fields: Vec<NumericField> = fields
        .iter()
        .map(|f| f.parse::<NumericField>().unwrap_or_else(|e| super::fail(e)))
        .collect();
    let records = super::load(csv, filters);
    let matrix = correlation_matrix(&records, &fields);

    if json {
        super::print_json(&matrix);
    } else {
        print_matrix(&matrix);
    }
}

pub fn print_matrix(matrix: &CorrelationMatrix) {
    println!("Correlation over {} complete rows", matrix.rows_used);
    print!("{:<20}", "");
    for f in &matrix.fields {
        print!(" {:>20}", f.as_str());
    }
    println!();
    for (field, row) in matrix.fields.iter().zip(&matrix.coefficients) {
        print!("{:<20}", field.as_str());
        for r in row {
            print!(" {:>20}", super::num(*r, 3));
        }
        println!();
    }
}
