//! Transport category classification and badge metadata for line names.

use serde::Serialize;

/// Transport category of a line, in display-rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCategory {
    Metro,
    Bus,
    Tram,
    Other,
}

impl LineCategory {
    /// Sort rank for group ordering: metro first, then bus, tram, other.
    pub fn rank(self) -> u8 {
        match self {
            LineCategory::Metro => 0,
            LineCategory::Bus => 1,
            LineCategory::Tram => 2,
            LineCategory::Other => 3,
        }
    }

    /// Symbol used by the text renderer.
    pub fn icon(self) -> &'static str {
        match self {
            LineCategory::Metro => "U",
            LineCategory::Tram => "T",
            LineCategory::Bus | LineCategory::Other => "B",
        }
    }
}

/// Classifies a line by its name, falling back to the API type code.
///
/// The rule order is a deliberate heuristic and must not be rearranged:
/// name-letter checks run before the digit check and before any type-code
/// match, so "13A" is a bus (contains 'A') even though it starts with
/// digits, and a line literally named "A" is a bus, never a tram.
pub fn classify_line(name: &str, api_type: &str) -> LineCategory {
    let name = name.to_uppercase();

    if is_metro_name(&name) {
        return LineCategory::Metro;
    }
    if name.contains('D') || name.contains('O') || is_all_digits(&name) {
        return LineCategory::Tram;
    }
    if name.contains('A') || name.contains('B') || name.contains('N') {
        return LineCategory::Bus;
    }

    let api_type = api_type.to_lowercase();
    if api_type.contains("metro") || api_type == "ptmetro" {
        return LineCategory::Metro;
    }
    if api_type.contains("tram") || api_type == "pttramwayline" {
        return LineCategory::Tram;
    }
    if api_type.contains("bus") || api_type == "ptbusline" {
        return LineCategory::Bus;
    }

    LineCategory::Bus
}

/// `U1` through `U6`, nothing else.
fn is_metro_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some('U'), Some('1'..='6'), None)
    )
}

fn is_all_digits(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

/// CSS-style badge class for a line: the category name, with a `u1`..`u6`
/// modifier for metro lines.
pub fn badge_class(name: &str, category: LineCategory) -> String {
    let base = match category {
        LineCategory::Metro => "metro",
        LineCategory::Tram => "tram",
        LineCategory::Bus => "bus",
        LineCategory::Other => "other",
    };
    if category == LineCategory::Metro {
        let upper = name.to_uppercase();
        if let Some(pos) = upper.find('U') {
            if let Some(digit) = upper[pos + 1..].chars().next().filter(|c| ('1'..='6').contains(c)) {
                return format!("{base} u{digit}");
            }
        }
    }
    base.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metro_names() {
        for name in ["U1", "U2", "U3", "U4", "U5", "U6", "u3"] {
            assert_eq!(classify_line(name, ""), LineCategory::Metro, "{name}");
        }
    }

    #[test]
    fn test_metro_name_bounds() {
        assert_ne!(classify_line("U7", ""), LineCategory::Metro);
        assert_ne!(classify_line("U11", ""), LineCategory::Metro);
        assert_ne!(classify_line("U", ""), LineCategory::Metro);
    }

    #[test]
    fn test_tram_names() {
        assert_eq!(classify_line("D", "ptTramwayLine"), LineCategory::Tram);
        assert_eq!(classify_line("O", ""), LineCategory::Tram);
        assert_eq!(classify_line("71", ""), LineCategory::Tram);
        assert_eq!(classify_line("1", ""), LineCategory::Tram);
    }

    #[test]
    fn test_bus_names() {
        // 'A' wins before the digit rule can see "13A"
        assert_eq!(classify_line("13A", "ptTramwayLine"), LineCategory::Bus);
        assert_eq!(classify_line("N25", ""), LineCategory::Bus);
        assert_eq!(classify_line("7B", ""), LineCategory::Bus);
        // a line literally named "A" is a bus via the letter rule
        assert_eq!(classify_line("A", ""), LineCategory::Bus);
    }

    #[test]
    fn test_type_code_fallback() {
        assert_eq!(classify_line("X", "ptMetro"), LineCategory::Metro);
        assert_eq!(classify_line("X", "ptTramwayLine"), LineCategory::Tram);
        assert_eq!(classify_line("X", "ptBusLine"), LineCategory::Bus);
        assert_eq!(classify_line("X", "something-metro-ish"), LineCategory::Metro);
    }

    #[test]
    fn test_default_is_bus() {
        assert_eq!(classify_line("X", ""), LineCategory::Bus);
        assert_eq!(classify_line("X", "ptTrainS"), LineCategory::Bus);
    }

    #[test]
    fn test_classification_is_pure() {
        assert_eq!(classify_line("U3", "ptMetro"), classify_line("U3", "ptMetro"));
        assert_eq!(classify_line("U3", "ptMetro"), LineCategory::Metro);
    }

    #[test]
    fn test_badge_class() {
        assert_eq!(badge_class("U4", LineCategory::Metro), "metro u4");
        assert_eq!(badge_class("D", LineCategory::Tram), "tram");
        assert_eq!(badge_class("13A", LineCategory::Bus), "bus");
    }

    #[test]
    fn test_rank_order_is_total() {
        assert!(LineCategory::Metro.rank() < LineCategory::Bus.rank());
        assert!(LineCategory::Bus.rank() < LineCategory::Tram.rank());
        assert!(LineCategory::Tram.rank() < LineCategory::Other.rank());
    }
}
