use crate::sheet::CellValue;

/// Lowercase, trim, and collapse every whitespace run to a single space.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `clean_text` with everything but letters and digits removed.
///
/// Header comparison runs on this form so `"1. PR"`, `"1.pr"` and `"1 pr"`
/// all collapse to `"1pr"`. Non-ASCII letters (æ, ø, å) are kept.
pub fn normalize_key(raw: &str) -> String {
    clean_text(raw)
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .collect()
}

pub fn clean_cell(cell: &CellValue) -> String {
    clean_text(&cell.as_text())
}

pub fn normalize_cell(cell: &CellValue) -> String {
    normalize_key(&cell.as_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Navn   (Fulde\tNavn) "), "navn (fulde navn)");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn normalize_key_strips_punctuation() {
        assert_eq!(normalize_key("1. PR"), "1pr");
        assert_eq!(normalize_key("#Total afslutninger"), "totalafslutninger");
        assert_eq!(normalize_key("Røde kort"), "rødekort");
        assert_eq!(normalize_key("Hvad vil du gøre bedre i næste kamp ?"), "hvadvildugørebedreinæstekamp");
    }

    #[test]
    fn numbers_are_stringified() {
        assert_eq!(normalize_cell(&CellValue::Number(44927.0)), "44927");
        assert_eq!(clean_cell(&CellValue::Empty), "");
    }
}
