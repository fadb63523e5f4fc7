//! Column-aligned tables for diagnostics.

/// Rendering options for [`generate_pretty_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    /// Stop adding columns once the table is at least this wide.
    pub fill_to_width: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self { fill_to_width: 120 }
    }
}

/// One table row, produced a cell at a time.
pub type Row<'a> = Box<dyn Iterator<Item = String> + 'a>;

/// Lays rows out column by column.
///
/// Each column is as wide as its widest cell plus one space, cells are
/// right-aligned, and rows may have different lengths. Cells are pulled only
/// until the total width reaches `fill_to_width`; every row that still has
/// cells left then gets a trailing ` ...`.
pub fn generate_pretty_table(options: &TableOptions, rows: Vec<Row<'_>>) -> String {
    let mut rows: Vec<_> = rows.into_iter().map(Iterator::peekable).collect();
    let mut lines = vec![String::new(); rows.len()];
    let mut total_width = 0;
    loop {
        let cells: Vec<Option<String>> = rows.iter_mut().map(Iterator::next).collect();
        if cells.iter().all(Option::is_none) {
            break;
        }

        let width = cells
            .iter()
            .map(|cell| cell.as_ref().map_or(0, |c| c.chars().count()))
            .max()
            .unwrap_or(0)
            + 1;
        for (line, cell) in lines.iter_mut().zip(&cells) {
            if let Some(cell) = cell {
                line.push_str(&format!("{:>width$}", cell, width = width));
            }
        }

        total_width += width;
        if total_width >= options.fill_to_width {
            for (line, row) in lines.iter_mut().zip(rows.iter_mut()) {
                if row.peek().is_some() {
                    line.push_str(" ...");
                }
            }
            break;
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&'static str]) -> Row<'static> {
        Box::new(cells.to_vec().into_iter().map(str::to_string))
    }

    #[test]
    fn aligns_columns_right() {
        let table = generate_pretty_table(
            &TableOptions::default(),
            vec![row(&["at", "1", "22"]), row(&["value", "333", "4"])],
        );
        assert_eq!(table, "    at   1 22\n value 333  4");
    }

    #[test]
    fn truncates_at_width() {
        let cells: Row<'_> = Box::new((0..100).map(|i| i.to_string()));
        let table = generate_pretty_table(&TableOptions { fill_to_width: 10 }, vec![cells]);
        assert_eq!(table, " 0 1 2 3 4 ...");
    }

    #[test]
    fn no_ellipsis_when_the_last_column_fits_exactly() {
        let table = generate_pretty_table(
            &TableOptions { fill_to_width: 10 },
            vec![row(&["0", "1", "2", "3", "4"]), row(&["a", "b"])],
        );
        assert_eq!(table, " 0 1 2 3 4\n a b");
    }

    #[test]
    fn only_unfinished_rows_are_marked() {
        let table = generate_pretty_table(
            &TableOptions { fill_to_width: 4 },
            vec![row(&["0", "1", "2"]), row(&["a", "b"])],
        );
        assert_eq!(table, " 0 1 ...\n a b");
    }

    #[test]
    fn stops_pulling_cells_at_the_width_cap() {
        let pulled = std::cell::Cell::new(0usize);
        let cells: Row<'_> = Box::new((0..usize::MAX).map(|i| {
            pulled.set(pulled.get() + 1);
            i.to_string()
        }));
        let table = generate_pretty_table(&TableOptions { fill_to_width: 10 }, vec![cells]);
        assert!(table.ends_with(" ..."));
        assert!(pulled.get() < 10, "pulled {} cells", pulled.get());
    }
}
