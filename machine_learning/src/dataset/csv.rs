use log::debug;

use super::Dataset;
use crate::{MlErr, Result};

/// Parses comma separated numeric rows into a dataset.
///
/// Blank lines and lines starting with `#` are skipped. A first line none of whose fields is
/// a number is taken as a header and skipped as well.
///
/// # Arguments
/// * `text` - The whole file contents.
/// * `x_size` - The amount of leading columns holding input features.
/// * `y_size` - The amount of trailing columns holding targets.
///
/// # Returns
/// The dataset or an error naming the first malformed line.
pub fn parse_csv(text: &str, x_size: usize, y_size: usize) -> Result<Dataset> {
    let row_len = x_size + y_size;
    let mut data = Vec::new();

    let lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    for (pos, (lineno, line)) in lines.enumerate() {
        if pos == 0 && is_header(line) {
            debug!(line = lineno; "skipping csv header");
            continue;
        }

        let row: std::result::Result<Vec<f32>, _> =
            line.split(',').map(|field| field.trim().parse()).collect();

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                return Err(MlErr::InvalidConfig(format!("csv line {lineno}: {e}")));
            }
        };

        if row.len() != row_len {
            return Err(MlErr::InvalidConfig(format!(
                "csv line {lineno}: expected {row_len} columns, got {}",
                row.len()
            )));
        }

        data.extend(row);
    }

    Dataset::new(data, x_size, y_size)
}

fn is_header(line: &str) -> bool {
    line.split(',')
        .all(|field| field.trim().parse::<f32>().is_err())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn parses_rows_and_skips_header() {
        let text = "x0,x1,y\n1,2,0\n\n# comment\n3.5, 4 ,1\n";
        let dataset = parse_csv(text, 2, 1).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.xy().0, array![[1., 2.], [3.5, 4.]]);
        assert_eq!(dataset.xy().1, array![[0.], [1.]]);
    }

    #[test]
    fn reports_malformed_lines() {
        assert!(parse_csv("1,2,0\n1,x,0\n", 2, 1).is_err());
        assert!(parse_csv("1,2,0\n1,2\n", 2, 1).is_err());
        assert!(matches!(parse_csv("a,b,c\n", 2, 1), Err(MlErr::EmptyDataset)));
    }

    #[test]
    fn malformed_first_row_is_not_a_header() {
        assert!(matches!(
            parse_csv("1,x,0\n3,4,1\n", 2, 1),
            Err(MlErr::InvalidConfig(msg)) if msg.starts_with("csv line 1")
        ));
        assert_eq!(parse_csv("# data\nx,y,label\n3,4,1\n", 2, 1).unwrap().len(), 1);
    }
}
