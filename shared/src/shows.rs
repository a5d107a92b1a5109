//! Row-to-Record Mapper.
//!
//! Converts the raw sheet grid into show records, derives the display
//! ordering (date, then city, then artist under pt-BR collation) and
//! filters the public view down to upcoming shows. Dates live as
//! `DD/MM/YYYY` in the sheet and `YYYY-MM-DD` in the edit form; the two
//! conversions are exact inverses for valid calendar dates.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::collate::Collation;

/// Sheet/display date format.
pub const BR_DATE_FORMAT: &str = "%d/%m/%Y";
/// Editable form date format.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// One show record, keyed off the sheet's header row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Show {
    /// 1-indexed sheet row (the header is row 1); the record's only identity.
    pub linha: usize,
    pub artista: String,
    pub data_inicio: String,
    pub data_fim: String,
    pub local: String,
    pub cidade: String,
    pub flyer: String,
    pub file_id: String,
}

/// Header cell text to record key: lower-cased, whitespace runs to `_`.
pub fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Map the raw grid (header row first) to records.
///
/// Rows with a blank artist are skipped; cells missing from short rows
/// read as empty strings.
pub fn map_rows(grid: &[Vec<String>]) -> Vec<Show> {
    let Some((headers, data)) = grid.split_first() else {
        return Vec::new();
    };

    let keys: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let mut shows = Vec::new();
    for (index, row) in data.iter().enumerate() {
        let mut show = Show {
            linha: index + 2,
            ..Default::default()
        };

        for (column, key) in keys.iter().enumerate() {
            let value = row.get(column).cloned().unwrap_or_default();
            match key.as_str() {
                "artista" => show.artista = value,
                // The sheet header carries the accent ("Data Início").
                "data_inicio" | "data_início" => show.data_inicio = value,
                "data_fim" => show.data_fim = value,
                "local" => show.local = value,
                "cidade" => show.cidade = value,
                "flyer" => show.flyer = value,
                "file_id" => show.file_id = value,
                _ => {}
            }
        }

        if !show.artista.trim().is_empty() {
            shows.push(show);
        }
    }

    shows
}

pub fn parse_date_br(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), BR_DATE_FORMAT).ok()
}

/// `DD/MM/YYYY` to `YYYY-MM-DD`; `None` when the input is not a valid date.
pub fn br_to_iso(date: &str) -> Option<String> {
    parse_date_br(date).map(|parsed| parsed.format(ISO_DATE_FORMAT).to_string())
}

/// `YYYY-MM-DD` to `DD/MM/YYYY`; `None` when the input is not a valid date.
pub fn iso_to_br(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date.trim(), ISO_DATE_FORMAT)
        .ok()
        .map(|parsed| parsed.format(BR_DATE_FORMAT).to_string())
}

/// Format a date in the sheet's `DD/MM/YYYY` format.
pub fn format_date_br(date: NaiveDate) -> String {
    date.format(BR_DATE_FORMAT).to_string()
}

/// Three-key display ordering: start date ascending (unparsable dates
/// after parsable ones), then city, then artist, locale-collated.
///
/// Two unparsable dates fall through to the city/artist keys so the
/// ordering stays a strict weak order.
pub fn compare_shows(a: &Show, b: &Show) -> Ordering {
    let date_a = parse_date_br(&a.data_inicio);
    let date_b = parse_date_br(&b.data_inicio);

    let by_date = match (date_a, date_b) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_date
        .then_with(|| Collation::pt_br().compare(&a.cidade, &b.cidade))
        .then_with(|| Collation::pt_br().compare(&a.artista, &b.artista))
}

pub fn sort_shows(shows: &mut [Show]) {
    shows.sort_by(compare_shows);
}

/// Effective end date: `data_fim`, falling back to `data_inicio` when blank.
pub fn effective_end(show: &Show) -> Option<NaiveDate> {
    if show.data_fim.trim().is_empty() {
        parse_date_br(&show.data_inicio)
    } else {
        parse_date_br(&show.data_fim)
    }
}

/// Public view filter: keep shows whose effective end date is on or
/// after `today`. Blank end dates are materialized from the start date
/// so the display never renders an empty range.
pub fn upcoming(shows: Vec<Show>, today: NaiveDate) -> Vec<Show> {
    shows
        .into_iter()
        .filter(|show| matches!(effective_end(show), Some(end) if end >= today))
        .map(|mut show| {
            if show.data_fim.trim().is_empty() {
                show.data_fim = show.data_inicio.clone();
            }
            show
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<Vec<String>> {
        vec![
            vec![
                "Artista".to_string(),
                "Data Início".to_string(),
                "Data Fim".to_string(),
                "Local".to_string(),
                "Cidade".to_string(),
                "Flyer".to_string(),
                "File Id".to_string(),
            ],
            vec![
                "Q".to_string(),
                "01/03/2030".to_string(),
                "01/03/2030".to_string(),
                "Venue".to_string(),
                "City".to_string(),
                "http://x/img.jpg".to_string(),
                "abc123".to_string(),
            ],
        ]
    }

    fn show(artista: &str, data_inicio: &str, cidade: &str) -> Show {
        Show {
            artista: artista.to_string(),
            data_inicio: data_inicio.to_string(),
            cidade: cidade.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Artista"), "artista");
        assert_eq!(normalize_header("Data Início"), "data_início");
        assert_eq!(normalize_header("  File   Id "), "file_id");
    }

    #[test]
    fn test_date_round_trip() {
        for date in ["01/03/2030", "29/02/2024", "31/12/1999", "09/10/2025"] {
            let iso = br_to_iso(date).unwrap();
            assert_eq!(iso_to_br(&iso).unwrap(), date);
        }
        assert_eq!(br_to_iso("01/03/2030").unwrap(), "2030-03-01");
        assert!(br_to_iso("31/02/2030").is_none());
        assert!(iso_to_br("2030-02-31").is_none());
    }

    #[test]
    fn test_map_rows_scenario() {
        let shows = map_rows(&grid());
        assert_eq!(shows.len(), 1);

        let show = &shows[0];
        assert_eq!(show.linha, 2);
        assert_eq!(show.artista, "Q");
        assert_eq!(show.data_inicio, "01/03/2030");
        assert_eq!(show.cidade, "City");
        assert_eq!(show.file_id, "abc123");
    }

    #[test]
    fn test_map_rows_skips_blank_artist() {
        let mut grid = grid();
        grid.push(vec!["   ".to_string(), "02/03/2030".to_string()]);
        grid.push(vec![]);
        assert_eq!(map_rows(&grid).len(), 1);
    }

    #[test]
    fn test_map_rows_empty_grid() {
        assert!(map_rows(&[]).is_empty());
        assert!(map_rows(&grid()[..1]).is_empty());
    }

    #[test]
    fn test_map_rows_short_row_reads_empty() {
        let mut grid = grid();
        grid.push(vec!["Solo".to_string()]);
        let shows = map_rows(&grid);
        assert_eq!(shows[1].artista, "Solo");
        assert_eq!(shows[1].data_inicio, "");
        assert_eq!(shows[1].linha, 3);
    }

    #[test]
    fn test_ordering_by_date_then_city_then_artist() {
        let mut shows = vec![
            show("Zeca", "02/03/2030", "Recife"),
            show("Ana", "01/03/2030", "São Paulo"),
            show("Beto", "01/03/2030", "Recife"),
            show("Ana", "01/03/2030", "Recife"),
        ];
        sort_shows(&mut shows);

        let order: Vec<(&str, &str)> = shows
            .iter()
            .map(|s| (s.artista.as_str(), s.cidade.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Ana", "Recife"),
                ("Beto", "Recife"),
                ("Ana", "São Paulo"),
                ("Zeca", "Recife"),
            ]
        );
    }

    #[test]
    fn test_unparsable_dates_sort_last_consistently() {
        let bad_a = show("Ana", "not a date", "Recife");
        let bad_b = show("Beto", "", "Recife");
        let good = show("Caio", "01/01/2030", "Recife");

        assert_eq!(compare_shows(&good, &bad_a), Ordering::Less);
        assert_eq!(compare_shows(&bad_a, &good), Ordering::Greater);
        // Both unparsable: falls through to the artist key, stays antisymmetric.
        assert_eq!(compare_shows(&bad_a, &bad_b), Ordering::Less);
        assert_eq!(compare_shows(&bad_b, &bad_a), Ordering::Greater);
        assert_eq!(compare_shows(&bad_a, &bad_a), Ordering::Equal);
    }

    #[test]
    fn test_comparator_is_transitive_on_sample() {
        let shows = vec![
            show("Ana", "01/03/2030", "Recife"),
            show("Beto", "01/03/2030", "São Paulo"),
            show("Caio", "02/03/2030", "Aracaju"),
            show("Dora", "bad date", "Belém"),
        ];

        for a in &shows {
            for b in &shows {
                // Antisymmetry
                assert_eq!(compare_shows(a, b), compare_shows(b, a).reverse());
                for c in &shows {
                    // Transitivity
                    if compare_shows(a, b) == Ordering::Less
                        && compare_shows(b, c) == Ordering::Less
                    {
                        assert_eq!(compare_shows(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn test_upcoming_filter() {
        let shows = map_rows(&grid());
        let today = NaiveDate::from_ymd_opt(2030, 2, 1).unwrap();
        assert_eq!(upcoming(shows.clone(), today).len(), 1);

        let later = NaiveDate::from_ymd_opt(2030, 3, 2).unwrap();
        assert!(upcoming(shows, later).is_empty());
    }

    #[test]
    fn test_upcoming_fills_blank_end_date() {
        let mut record = show("Ana", "05/06/2030", "Recife");
        record.data_fim = String::new();

        let today = NaiveDate::from_ymd_opt(2030, 6, 5).unwrap();
        let kept = upcoming(vec![record], today);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].data_fim, "05/06/2030");
    }

    #[test]
    fn test_upcoming_drops_unparsable_dates() {
        let record = show("Ana", "not a date", "Recife");
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(upcoming(vec![record], today).is_empty());
    }
}
