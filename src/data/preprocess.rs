//! Turn dataset rows into documents.

use super::{Document, MovieMetadata, Table};
use crate::error::{PlotlineError, Result};

const PLOT: &str = "Plot";
const TITLE: &str = "Title";
const GENRE: &str = "Genre";
const ORIGIN: &str = "Origin/Ethnicity";
const RELEASE_YEAR: &str = "Release Year";
const WIKI_PAGE: &str = "Wiki Page";

/// Columns the movie plots CSV must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [PLOT, TITLE, GENRE, ORIGIN, RELEASE_YEAR, WIKI_PAGE];

struct Columns {
    plot: usize,
    title: usize,
    genre: usize,
    origin: usize,
    year: usize,
    url: usize,
}

impl Columns {
    fn locate(table: &Table) -> Result<Self> {
        let find = |name: &str| {
            table.column_index(name).ok_or_else(|| {
                PlotlineError::Data(format!(
                    "Dataset is missing required column '{}' (found: {})",
                    name,
                    table.headers().collect::<Vec<_>>().join(", ")
                ))
            })
        };

        Ok(Self {
            plot: find(PLOT)?,
            title: find(TITLE)?,
            genre: find(GENRE)?,
            origin: find(ORIGIN)?,
            year: find(RELEASE_YEAR)?,
            url: find(WIKI_PAGE)?,
        })
    }
}

/// Build one document per row, in row order.
///
/// Fails if a required column is absent or a row has an empty plot.
pub fn create_documents(table: &Table) -> Result<Vec<Document>> {
    let columns = Columns::locate(table)?;

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let field = |idx: usize| {
                row.get(idx)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };

            let metadata = MovieMetadata {
                title: field(columns.title),
                genre: field(columns.genre),
                origin: field(columns.origin),
                year: field(columns.year).and_then(|y| y.parse().ok()),
                url: field(columns.url),
            };

            let plot = row.get(columns.plot).unwrap_or_default();
            Document::new(plot, metadata)
                .map_err(|e| PlotlineError::Data(format!("Row {}: {}", i + 1, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movies_table() -> Table {
        Table::new(
            ["Release Year", "Title", "Origin/Ethnicity", "Director", "Genre", "Wiki Page", "Plot"],
            vec![
                vec!["1979", "Alien", "American", "Ridley Scott", "sci-fi", "https://en.wikipedia.org/wiki/Alien_(film)", "A crew meets a creature."],
                vec!["n/a", "", "", "", "", "", "Someone does something."],
                vec!["1995", "Heat", "American", "Michael Mann", "crime", "https://en.wikipedia.org/wiki/Heat_(1995_film)", "A thief and a detective."],
            ],
        )
    }

    #[test]
    fn test_one_document_per_row_in_order() {
        let docs = create_documents(&movies_table()).unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].metadata().title.as_deref(), Some("Alien"));
        assert_eq!(docs[0].metadata().year, Some(1979));
        assert_eq!(docs[0].text(), "A crew meets a creature.");
        assert_eq!(docs[2].metadata().genre.as_deref(), Some("crime"));
    }

    #[test]
    fn test_metadata_keys_fixed_regardless_of_input() {
        let docs = create_documents(&movies_table()).unwrap();

        for doc in &docs {
            let value = serde_json::to_value(doc.metadata()).unwrap();
            let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            assert_eq!(keys, vec!["genre", "origin", "title", "url", "year"]);
        }

        // Blank cells and unparsable years become null.
        let sparse = docs[1].metadata();
        assert!(sparse.title.is_none());
        assert!(sparse.year.is_none());
    }

    #[test]
    fn test_missing_column_fails() {
        let table = Table::new(["Title", "Plot"], vec![["Alien", "A crew meets a creature."]]);
        let err = create_documents(&table).unwrap_err();
        assert!(err.to_string().contains("Genre"));
    }

    #[test]
    fn test_empty_plot_fails() {
        let table = Table::new(
            REQUIRED_COLUMNS,
            vec![["", "Blank", "drama", "American", "2000", "https://example.org"]],
        );
        assert!(matches!(create_documents(&table), Err(PlotlineError::Data(_))));
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(REQUIRED_COLUMNS, Vec::<Vec<String>>::new());
        assert!(create_documents(&table).unwrap().is_empty());
    }
}
