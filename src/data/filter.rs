use super::model::{Column, ObservationTable};
use crate::error::{StatsError, StatsResult};

// ---------------------------------------------------------------------------
// Missing-value removal
// ---------------------------------------------------------------------------

/// Return indices of rows where every column in `columns` is present.
///
/// An empty `columns` slice selects every row.
pub fn complete_indices(table: &ObservationTable, columns: &[Column]) -> Vec<usize> {
    (0..table.len())
        .filter(|&i| columns.iter().all(|&col| table.column(col)[i].is_some()))
        .collect()
}

/// Values of one column with missing entries removed, in table order.
///
/// Computed on demand; fails with `NoValidData` when nothing is left.
pub fn cleaned_series(table: &ObservationTable, column: Column) -> StatsResult<Vec<f64>> {
    let series: Vec<f64> = table.column(column).iter().flatten().copied().collect();
    if series.is_empty() {
        return Err(StatsError::no_valid_data(format!(
            "column {column} has no non-missing values"
        )));
    }
    Ok(series)
}

/// Jointly non-missing `(x, y)` pairs, aligned row by row.
pub fn paired_series(
    table: &ObservationTable,
    x: Column,
    y: Column,
) -> StatsResult<(Vec<f64>, Vec<f64>)> {
    let xs = table.column(x);
    let ys = table.column(y);
    let (px, py): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();

    if px.is_empty() {
        return Err(StatsError::no_valid_data(format!(
            "columns {x} and {y} share no complete rows"
        )));
    }
    Ok((px, py))
}

/// Column-wise values restricted to rows complete across all `columns`.
pub fn complete_frame(
    table: &ObservationTable,
    columns: &[Column],
) -> StatsResult<Vec<(Column, Vec<f64>)>> {
    let rows = complete_indices(table, columns);
    if rows.is_empty() {
        return Err(StatsError::no_valid_data(
            "no row has every requested column present",
        ));
    }
    Ok(columns
        .iter()
        .map(|&col| {
            let raw = table.column(col);
            let values = rows.iter().filter_map(|&i| raw[i]).collect();
            (col, values)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;

    fn table() -> ObservationTable {
        ObservationTable::from_observations(vec![
            Observation::new(Some(21.0), Some(170.0), None),
            Observation::new(None, Some(182.0), Some(80.0)),
            Observation::new(Some(30.0), None, Some(64.0)),
            Observation::new(Some(25.0), Some(175.0), Some(70.0)),
        ])
    }

    #[test]
    fn test_cleaned_series_drops_missing() {
        let t = table();
        assert_eq!(cleaned_series(&t, Column::Age).unwrap(), vec![21.0, 30.0, 25.0]);
        assert_eq!(
            cleaned_series(&t, Column::Height).unwrap(),
            vec![170.0, 182.0, 175.0]
        );
    }

    #[test]
    fn test_cleaned_series_empty_is_error() {
        let t = ObservationTable::from_observations(vec![Observation::new(None, Some(1.0), None)]);
        let err = cleaned_series(&t, Column::Age).unwrap_err();
        assert_eq!(err.kind(), "no_valid_data");
    }

    #[test]
    fn test_paired_series_requires_both() {
        let t = table();
        let (x, y) = paired_series(&t, Column::Height, Column::Weight).unwrap();
        assert_eq!(x, vec![182.0, 175.0]);
        assert_eq!(y, vec![80.0, 70.0]);
    }

    #[test]
    fn test_complete_frame() {
        let t = table();
        assert_eq!(complete_indices(&t, &Column::ALL), vec![3]);

        let frame = complete_frame(&t, &Column::ALL).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame[0], (Column::Age, vec![25.0]));
        assert_eq!(frame[2], (Column::Weight, vec![70.0]));
    }
}
