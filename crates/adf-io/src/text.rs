use crate::IOError;

/// Parsed row-column text data.
#[derive(Debug, Clone, PartialEq)]
pub struct TextArrayData {
    /// Row-major values.
    pub values: Vec<f64>,
    pub nrows: usize,
    pub ncols: usize,
}

/// Load a numeric table from text (np.loadtxt equivalent).
///
/// Each non-blank line not starting with `comments` is a row. Columns are
/// separated by `delimiter`, or by any run of whitespace when it is `None`.
/// Every row must have the same number of columns.
pub fn loadtxt(
    text: &str,
    delimiter: Option<char>,
    comments: char,
) -> Result<TextArrayData, IOError> {
    let mut values = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0usize;

    for (line_idx, line) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(comments) {
            continue;
        }

        let fields: Vec<&str> = match delimiter {
            Some(delim) => trimmed.split(delim).map(str::trim).collect(),
            None => trimmed.split_whitespace().collect(),
        };
        let row = fields
            .iter()
            .map(|field| field.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| IOError::TextParseFailed {
                line: line_no,
                detail: "field is not a number",
            })?;

        match ncols {
            None => ncols = Some(row.len()),
            Some(expected) if row.len() != expected => {
                return Err(IOError::TextParseFailed {
                    line: line_no,
                    detail: "inconsistent number of columns",
                });
            }
            Some(_) => {}
        }
        values.extend(row);
        nrows += 1;
    }

    Ok(TextArrayData {
        values,
        nrows,
        ncols: ncols.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::loadtxt;

    #[test]
    fn loadtxt_skips_comments_and_blank_lines() {
        let data = loadtxt("# header\n1 2 3\n\n4\t5 6\n", None, '#').expect("parse");
        assert_eq!(data.nrows, 2);
        assert_eq!(data.ncols, 3);
        assert_eq!(data.values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn loadtxt_reads_comma_separated_values_with_special_floats() {
        let data = loadtxt("1.5, -2e-3\ninf, nan\n", Some(','), '#').expect("parse");
        assert_eq!(data.ncols, 2);
        assert_eq!(data.values[1], -2e-3);
        assert!(data.values[2].is_infinite());
        assert!(data.values[3].is_nan());
    }

    #[test]
    fn loadtxt_reports_offending_line() {
        let err = loadtxt("1,2\n3\n", Some(','), '#').expect_err("ragged rows");
        assert_eq!(err.reason_code(), "io_text_parse_failed");
        assert!(err.to_string().starts_with("text line 2"));

        let err = loadtxt("1 x\n", None, '#').expect_err("not a number");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn loadtxt_empty_input_has_no_rows() {
        let data = loadtxt("# nothing\n", None, '#').expect("parse");
        assert_eq!((data.nrows, data.ncols), (0, 0));
    }
}
