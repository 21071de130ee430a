//! Record ordering for list pages.
//!
//! Nulls (and values that cannot be read as the field's kind) sort last in
//! both directions. Values of the same type are compared ascending and the
//! direction is applied as a single reversal at the end; values of different
//! types keep their type order (number, date, text) in both directions.

use polisa_core::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// How a field's values are read for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Use the stored value's own type.
    #[default]
    Auto,
    Number,
    /// Text values are parsed; unparsable dates count as null.
    Date,
    Text,
}

impl FieldKind {
    /// Concrete kind for an `Auto` column: the most common stored type among
    /// its non-null values, numbers before dates before text on a tie. Values
    /// of another type are then read as that kind, and count as null when
    /// they cannot be.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a FieldValue>) -> Self {
        let (mut numbers, mut dates, mut texts) = (0usize, 0usize, 0usize);
        for value in values {
            match value {
                FieldValue::Null => {}
                FieldValue::Number(_) => numbers += 1,
                FieldValue::Date(_) => dates += 1,
                FieldValue::Text(_) => texts += 1,
            }
        }
        if numbers == 0 && dates == 0 && texts == 0 {
            Self::Auto
        } else if numbers >= dates && numbers >= texts {
            Self::Number
        } else if dates >= texts {
            Self::Date
        } else {
            Self::Text
        }
    }
}

/// Comparable projection of a field value.
#[derive(Debug, Clone, PartialEq)]
enum SortKey<'a> {
    Number(f64),
    Date(i64),
    Text(Cow<'a, str>),
}

impl SortKey<'_> {
    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Date(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

fn sort_key(value: &FieldValue, kind: FieldKind) -> Option<SortKey<'_>> {
    match kind {
        FieldKind::Auto => match value {
            FieldValue::Null => None,
            FieldValue::Number(_) => value.as_number().map(SortKey::Number),
            FieldValue::Date(d) => Some(SortKey::Date(d.timestamp_millis())),
            FieldValue::Text(s) => Some(SortKey::Text(Cow::Borrowed(s))),
        },
        FieldKind::Number => match value {
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            other => other.as_number(),
        }
        .map(SortKey::Number),
        FieldKind::Date => value
            .as_date()
            .map(|d| SortKey::Date(d.timestamp_millis())),
        FieldKind::Text => match value {
            FieldValue::Text(s) => Some(SortKey::Text(Cow::Borrowed(s))),
            other => other.display_text().map(|s| SortKey::Text(Cow::Owned(s))),
        },
    }
}

fn compare_keys(a: &SortKey<'_>, b: &SortKey<'_>, direction: SortDirection) -> Ordering {
    let ordering = match (a, b) {
        (SortKey::Number(x), SortKey::Number(y)) => {
            (x - y).partial_cmp(&0.0).unwrap_or(Ordering::Equal)
        }
        (SortKey::Date(x), SortKey::Date(y)) => x.cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => natural_cmp(x, y),
        _ => return a.rank().cmp(&b.rank()),
    };
    direction.apply(ordering)
}

/// Compare two field values: nulls last, then `direction` applied.
///
/// Under [`FieldKind::Auto`] each value keeps its stored type; list sorting
/// resolves `Auto` per column with [`FieldKind::infer`] first.
pub fn compare_values(
    a: &FieldValue,
    b: &FieldValue,
    kind: FieldKind,
    direction: SortDirection,
) -> Ordering {
    match (sort_key(a, kind), sort_key(b, kind)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_keys(&x, &y, direction),
    }
}

/// Compare two records on `field`.
pub fn compare_records(
    a: &Record,
    b: &Record,
    field: &str,
    kind: FieldKind,
    direction: SortDirection,
) -> Ordering {
    compare_values(a.get(field), b.get(field), kind, direction)
}

/// Lowercase with Turkish dotted capital I folded to plain `i`.
pub(crate) fn fold_case(input: &str) -> String {
    input
        .chars()
        .flat_map(|c| match c {
            'İ' => 'i'.to_lowercase(),
            other => other.to_lowercase(),
        })
        .filter(|c| *c != '\u{0307}')
        .collect()
}

/// Primary collation weight of a lowercased character. Turkish letters sit
/// right after their Latin base (c < ç < d), dotless ı right before i.
fn collation_weight(c: char) -> u32 {
    let (base, offset) = match c {
        'ç' => ('c', 1),
        'ğ' => ('g', 1),
        'ö' => ('o', 1),
        'ş' => ('s', 1),
        'ü' => ('u', 1),
        'ı' => ('h', 1),
        'â' => ('a', 0),
        'î' => ('i', 0),
        'û' => ('u', 0),
        other => (other, 0),
    };
    (base as u32) * 2 + offset
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(input: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;
    for (idx, c) in input.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(make_chunk(&input[start..idx], prev));
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        out.push(make_chunk(&input[start..], prev));
    }
    out
}

fn make_chunk(slice: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(slice)
    } else {
        Chunk::Text(slice)
    }
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_text_runs(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(collation_weight)
        .cmp(b.chars().map(collation_weight))
}

/// Case-insensitive, numeric-aware string comparison: `"Item 2" < "Item 10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = fold_case(a);
    let b = fold_case(b);
    let left = chunks(&a);
    let right = chunks(&b);
    for (x, y) in left.iter().zip(right.iter()) {
        let ordering = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => compare_digit_runs(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => compare_text_runs(x, y),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn numeric_aware_text() {
        assert_eq!(natural_cmp("Item 2", "Item 10"), Ordering::Less);
        assert_eq!(natural_cmp("item 10", "Item 9"), Ordering::Greater);
        assert_eq!(natural_cmp("POL-007", "pol-7"), Ordering::Equal);
    }

    #[test]
    fn case_insensitive_text() {
        assert_eq!(natural_cmp("kasko", "KASKO"), Ordering::Equal);
        assert_eq!(natural_cmp("İzmir", "izmir"), Ordering::Equal);
    }

    #[test]
    fn turkish_letters_follow_their_base() {
        assert_eq!(natural_cmp("cz", "çay"), Ordering::Less);
        assert_eq!(natural_cmp("çay", "dal"), Ordering::Less);
        assert_eq!(natural_cmp("sz", "şeker"), Ordering::Less);
        assert_eq!(natural_cmp("ılık", "iç"), Ordering::Less);
    }

    #[test]
    fn nulls_last_in_both_directions() {
        let null = FieldValue::Null;
        let one = FieldValue::Number(1.0);
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            assert_eq!(compare_values(&null, &one, FieldKind::Auto, direction), Ordering::Greater);
            assert_eq!(compare_values(&one, &null, FieldKind::Auto, direction), Ordering::Less);
        }
    }

    #[test]
    fn desc_is_exact_reverse_of_asc_for_present_values() {
        let a = FieldValue::Number(1.5);
        let b = FieldValue::Number(7.0);
        let asc = compare_values(&a, &b, FieldKind::Auto, SortDirection::Asc);
        let desc = compare_values(&a, &b, FieldKind::Auto, SortDirection::Desc);
        assert_eq!(asc, desc.reverse());
    }

    #[test]
    fn unparsable_dates_count_as_null() {
        let garbage = FieldValue::Text("sometime".to_string());
        let real = FieldValue::Text("2024-05-01".to_string());
        assert_eq!(
            compare_values(&garbage, &real, FieldKind::Date, SortDirection::Desc),
            Ordering::Greater
        );
    }

    #[test]
    fn dates_compare_by_instant() {
        let early = FieldValue::Date(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let late = FieldValue::Text("02.01.2024".to_string());
        assert_eq!(
            compare_values(&early, &late, FieldKind::Date, SortDirection::Asc),
            Ordering::Less
        );
    }

    #[test]
    fn mixed_types_keep_type_order_in_both_directions() {
        let date = FieldValue::Date(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        let text = FieldValue::Text("yarın".to_string());
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            assert_eq!(compare_values(&date, &text, FieldKind::Auto, direction), Ordering::Less);
        }
    }

    #[test]
    fn infer_picks_the_majority_type() {
        let date = FieldValue::Date(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        let text = FieldValue::Text("yarın".to_string());
        let null = FieldValue::Null;
        assert_eq!(FieldKind::infer([&date, &text, &date, &null]), FieldKind::Date);
        assert_eq!(FieldKind::infer([&text, &text, &date]), FieldKind::Text);
        assert_eq!(FieldKind::infer([&date, &text]), FieldKind::Date);
        assert_eq!(FieldKind::infer([&null]), FieldKind::Auto);
    }

    #[test]
    fn number_kind_parses_text() {
        let a = FieldValue::Text("100".to_string());
        let b = FieldValue::Number(20.0);
        assert_eq!(
            compare_values(&a, &b, FieldKind::Number, SortDirection::Asc),
            Ordering::Greater
        );
    }
}
