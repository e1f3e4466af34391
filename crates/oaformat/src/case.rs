//! Identifier case conversion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target style for [`change_case`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStyle {
    #[serde(rename = "camelCase")]
    Camel,
    #[serde(rename = "PascalCase")]
    Pascal,
    #[serde(rename = "kebab-case")]
    Kebab,
    #[serde(rename = "Train-Case")]
    Train,
    #[serde(rename = "snake_case")]
    Snake,
    #[serde(rename = "Ada_Case")]
    Ada,
    #[serde(rename = "CONSTANT_CASE")]
    Constant,
    #[serde(rename = "COBOL-CASE")]
    Cobol,
    #[serde(rename = "dot.notation")]
    Dot,
    #[serde(rename = "space case")]
    Space,
    #[serde(rename = "Capital Case")]
    Capital,
    #[serde(rename = "lower case")]
    Lower,
    #[serde(rename = "UPPER CASE")]
    Upper,
}

impl fmt::Display for CaseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaseStyle::Camel => "camelCase",
            CaseStyle::Pascal => "PascalCase",
            CaseStyle::Kebab => "kebab-case",
            CaseStyle::Train => "Train-Case",
            CaseStyle::Snake => "snake_case",
            CaseStyle::Ada => "Ada_Case",
            CaseStyle::Constant => "CONSTANT_CASE",
            CaseStyle::Cobol => "COBOL-CASE",
            CaseStyle::Dot => "dot.notation",
            CaseStyle::Space => "space case",
            CaseStyle::Capital => "Capital Case",
            CaseStyle::Lower => "lower case",
            CaseStyle::Upper => "UPPER CASE",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy)]
enum WordCase {
    Lower,
    Upper,
    Capital,
    Keep,
}

/// Split `text` into words: on any non-alphanumeric character, on a
/// lowercase-or-digit to uppercase transition, and before the last capital of
/// an acronym that is followed by a lowercase letter (`HTTPServer` →
/// `HTTP`, `Server`).
pub fn words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn apply(word: &str, case: WordCase) -> String {
    match case {
        WordCase::Lower => word.to_lowercase(),
        WordCase::Upper => word.to_uppercase(),
        WordCase::Keep => word.to_string(),
        WordCase::Capital => {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        }
    }
}

fn join(words: &[String], case: WordCase, separator: &str) -> String {
    words
        .iter()
        .map(|w| apply(w, case))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Convert `text` to `style`.
///
/// ```
/// use oaformat::case::{change_case, CaseStyle};
///
/// assert_eq!(change_case("MySchema", CaseStyle::Snake), "my_schema");
/// assert_eq!(change_case("pet-store_id", CaseStyle::Camel), "petStoreId");
/// assert_eq!(change_case("HTTPServer", CaseStyle::Kebab), "http-server");
/// ```
pub fn change_case(text: &str, style: CaseStyle) -> String {
    let words = words(text);
    match style {
        CaseStyle::Camel => {
            let mut out = String::new();
            for (i, word) in words.iter().enumerate() {
                let case = if i == 0 { WordCase::Lower } else { WordCase::Capital };
                out.push_str(&apply(word, case));
            }
            out
        }
        CaseStyle::Pascal => join(&words, WordCase::Capital, ""),
        CaseStyle::Kebab => join(&words, WordCase::Lower, "-"),
        CaseStyle::Train => join(&words, WordCase::Capital, "-"),
        CaseStyle::Snake => join(&words, WordCase::Lower, "_"),
        CaseStyle::Ada => join(&words, WordCase::Capital, "_"),
        CaseStyle::Constant => join(&words, WordCase::Upper, "_"),
        CaseStyle::Cobol => join(&words, WordCase::Upper, "-"),
        CaseStyle::Dot => join(&words, WordCase::Lower, "."),
        CaseStyle::Space => join(&words, WordCase::Keep, " "),
        CaseStyle::Capital => join(&words, WordCase::Capital, " "),
        CaseStyle::Lower => join(&words, WordCase::Lower, " "),
        CaseStyle::Upper => join(&words, WordCase::Upper, " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words() {
        assert_eq!(words("MySchema"), vec!["My", "Schema"]);
        assert_eq!(words("getHTTPResponse2xx"), vec!["get", "HTTP", "Response2xx"]);
        assert_eq!(words("snake_case-and.dots here"), vec!["snake", "case", "and", "dots", "here"]);
        assert_eq!(words("v2Api"), vec!["v2", "Api"]);
        assert!(words("--").is_empty());
    }

    #[test]
    fn test_all_styles() {
        let input = "listPetsByOwner";
        let cases = [
            (CaseStyle::Camel, "listPetsByOwner"),
            (CaseStyle::Pascal, "ListPetsByOwner"),
            (CaseStyle::Kebab, "list-pets-by-owner"),
            (CaseStyle::Train, "List-Pets-By-Owner"),
            (CaseStyle::Snake, "list_pets_by_owner"),
            (CaseStyle::Ada, "List_Pets_By_Owner"),
            (CaseStyle::Constant, "LIST_PETS_BY_OWNER"),
            (CaseStyle::Cobol, "LIST-PETS-BY-OWNER"),
            (CaseStyle::Dot, "list.pets.by.owner"),
            (CaseStyle::Space, "list Pets By Owner"),
            (CaseStyle::Capital, "List Pets By Owner"),
            (CaseStyle::Lower, "list pets by owner"),
            (CaseStyle::Upper, "LIST PETS BY OWNER"),
        ];
        for (style, expected) in cases {
            assert_eq!(change_case(input, style), expected, "{}", style);
        }
    }

    #[test]
    fn test_style_names_round_trip_through_serde() {
        let style: CaseStyle = serde_json::from_str("\"snake_case\"").unwrap();
        assert_eq!(style, CaseStyle::Snake);
        assert_eq!(serde_json::to_string(&CaseStyle::Cobol).unwrap(), "\"COBOL-CASE\"");
        assert!(serde_json::from_str::<CaseStyle>("\"shouty\"").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(change_case("", CaseStyle::Pascal), "");
    }
}
