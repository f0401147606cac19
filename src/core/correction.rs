use crate::domain::model::{Table, Value, HUMIDITY, PM25_ATM, PM25_CORR};
use crate::domain::settings::CorrectionCoefficients;
use crate::utils::error::Result;

impl CorrectionCoefficients {
    pub fn apply(&self, pm25_atm: f64, humidity: f64) -> f64 {
        self.pm25 * pm25_atm - self.humidity * humidity + self.intercept
    }
}

/// Returns a copy of `table` with `pm2.5_corr` added (or overwritten).
///
/// Rows missing either input get a null correction. Only a table lacking the
/// `pm2.5_atm` or `humidity` column altogether is rejected.
pub fn correct(table: &Table, coefficients: &CorrectionCoefficients) -> Result<Table> {
    let mut out = table.clone();
    correct_in_place(&mut out, coefficients)?;
    Ok(out)
}

pub(crate) fn correct_in_place(
    table: &mut Table,
    coefficients: &CorrectionCoefficients,
) -> Result<()> {
    let pm_idx = table.require_column(PM25_ATM)?;
    let hum_idx = table.require_column(HUMIDITY)?;
    let corr_idx = table.ensure_column(PM25_CORR);

    let mut missing = 0usize;
    for row in &mut table.rows {
        row[corr_idx] = match (row[pm_idx].as_f64(), row[hum_idx].as_f64()) {
            (Some(pm), Some(hum)) => Value::Number(coefficients.apply(pm, hum)),
            _ => {
                missing += 1;
                Value::Null
            }
        };
    }

    if missing > 0 {
        tracing::debug!("{} rows lack pm2.5_atm or humidity, pm2.5_corr left empty", missing);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;

    fn text(s: &str) -> Value {
        if s.is_empty() {
            Value::Null
        } else {
            Value::Text(s.to_string())
        }
    }

    fn table(rows: &[(&str, &str)]) -> Table {
        Table::with_rows(
            vec![PM25_ATM.to_string(), HUMIDITY.to_string()],
            rows.iter().map(|(pm, h)| vec![text(pm), text(h)]).collect(),
        )
    }

    #[test]
    fn test_formula_exactness() {
        let out = correct(&table(&[("10", "50")]), &CorrectionCoefficients::default()).unwrap();
        let corr = out.get(0, PM25_CORR).and_then(Value::as_f64).unwrap();
        assert!((corr - 6.68).abs() < 1e-9);
    }

    #[test]
    fn test_null_humidity_gives_null_correction() {
        let out = correct(
            &table(&[("10", ""), ("", "40"), ("abc", "40")]),
            &CorrectionCoefficients::default(),
        )
        .unwrap();
        assert!(out.rows.iter().all(|r| r[2].is_null()));
    }

    #[test]
    fn test_existing_column_is_overwritten() {
        let mut input = table(&[("10", "50")]);
        input.columns.push(PM25_CORR.to_string());
        input.rows[0].push(Value::Text("999".to_string()));

        let out = correct(&input, &CorrectionCoefficients::default()).unwrap();
        assert_eq!(out.columns.len(), 3);
        assert!((out.rows[0][2].as_f64().unwrap() - 6.68).abs() < 1e-9);
    }

    #[test]
    fn test_missing_humidity_column_is_schema_error() {
        let input = Table::new(vec![PM25_ATM.to_string()]);
        match correct(&input, &CorrectionCoefficients::default()) {
            Err(EtlError::SchemaError { column }) => assert_eq!(column, HUMIDITY),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_coefficients() {
        let coefficients = CorrectionCoefficients {
            pm25: 1.0,
            humidity: 0.0,
            intercept: 0.0,
        };
        assert_eq!(coefficients.apply(12.5, 80.0), 12.5);
    }
}
