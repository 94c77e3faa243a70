//! Brace-literal serialization of row-major N-dimensional tables.

/// Write `values` (row-major, last dimension fastest) as a nested brace
/// literal: one `{...}` per dimension, elements separated by `", "`, and a
/// line break after every element that is itself a nested literal.
///
/// `values` is expected to hold exactly `dims.iter().product()` elements;
/// surplus values are ignored and missing ones leave the literal short.
pub fn write_nested<T>(
    out: &mut String,
    values: &[T],
    dims: &[usize],
    fmt: &dyn Fn(&T) -> String,
) {
    match dims.split_first() {
        None => {
            if let Some(v) = values.first() {
                out.push_str(&fmt(v));
            }
        }
        Some((&n, rest)) => {
            let stride: usize = rest.iter().product();
            out.push('{');
            for (i, chunk) in values.chunks(stride.max(1)).take(n).enumerate() {
                write_nested(out, chunk, rest, fmt);
                if i + 1 < n {
                    out.push_str(", ");
                }
                if !rest.is_empty() {
                    out.push('\n');
                }
            }
            out.push('}');
        }
    }
}

pub fn nested_string<T>(values: &[T], dims: &[usize], fmt: &dyn Fn(&T) -> String) -> String {
    let mut out = String::new();
    write_nested(&mut out, values, dims, fmt);
    out
}

/// Two-dimensional layout with one indented row per line.
pub fn write_rows<T>(out: &mut String, values: &[T], columns: usize, fmt: &dyn Fn(&T) -> String) {
    out.push_str("{\n");
    let rows: Vec<&[T]> = values.chunks(columns.max(1)).collect();
    for (r, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(fmt).collect();
        out.push_str(&format!("\t\t{{{}}}", cells.join(", ")));
        if r + 1 < rows.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push('}');
}
