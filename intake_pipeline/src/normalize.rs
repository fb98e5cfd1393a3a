//! Per-record cleanup of the canonical table: "Other" folding, gender and race
//! relabeling, employment status and age derivation.
//!
//! Running the normalizer on its own output does not change it. For the "Other"
//! folding this relies on the free-text detail answers never containing "Outro" or
//! "Outra" themselves; the folding logs a warning when it meets one that does.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::config::NormalizeOptions;
use crate::registry::{Field, OTHER_PAIRS};
use crate::table::{Cell, Table};

pub const BRACKET_UNDER_18: &str = "Menor que 18 anos";
pub const BRACKET_18_TO_30: &str = "18 a 30 anos";
pub const BRACKET_OVER_30: &str = "30 anos ou mais";
pub const NOT_INFORMED: &str = "Não informado";

pub const PRETOS: &str = "Pretos/as/es";
pub const PARDOS: &str = "Pardos/as/es";
pub const BRANCOS: &str = "Brancos/as/es";
/// The aggregate of the two non-white groups, used by the headline metrics.
pub const NEGROS: &str = "Negros/as/es";

pub const EMPLOYED: &str = "Empregado";
pub const OUT_OF_WORKFORCE: &str = "Fora da força de trabalho";

pub const FEMININE: &str = "Feminina";
pub const MASCULINE: &str = "Masculina";

/// The placeholder for the analytic columns the form does not collect yet.
pub const NO_DATA: &str = "Sem dados";

lazy_static! {
    static ref FIRST_INTEGER: Regex = Regex::new(r"\d+").unwrap();
}

static RACE_SYNONYMS: &[(&str, &str)] = &[
    ("preto/a/e", PRETOS),
    ("preto", PRETOS),
    ("preta", PRETOS),
    ("prete", PRETOS),
    ("preto(a)", PRETOS),
    ("pretos(as)", PRETOS),
    ("pretos/as/es", PRETOS),
    ("pardo/a/e", PARDOS),
    ("pardo", PARDOS),
    ("parda", PARDOS),
    ("parde", PARDOS),
    ("pardo(a)", PARDOS),
    ("pardos(as)", PARDOS),
    ("pardos/as/es", PARDOS),
    ("branco/a/e", BRANCOS),
    ("branco", BRANCOS),
    ("branca", BRANCOS),
    ("branque", BRANCOS),
    ("branco(a)", BRANCOS),
    ("brancos(as)", BRANCOS),
    ("brancos/as/es", BRANCOS),
];

/// Runs all the per-record derivations, in order.
///
/// The "Other" folding runs first: the later steps, and every consumer that groups
/// by category, must see the folded values.
pub fn normalize(table: &Table, options: &NormalizeOptions) -> Table {
    let t = fold_other_answers(table);
    let t = normalize_gender_column(&t);
    let t = derive_race_groups(&t);
    let t = derive_employment_status(&t);
    let t = derive_age(&t, options.reference_year);
    let res = init_placeholders(&t);
    info!(
        "normalize: {} records, {} columns",
        res.len(),
        res.columns().len()
    );
    res
}

/// Replaces the "Other" answers of the category columns with their free-text detail.
///
/// Only applies when the detail is present and not blank.
pub fn fold_other_answers(table: &Table) -> Table {
    let mut res = table.clone();
    for (cat, detail) in OTHER_PAIRS.iter() {
        let (cats, details) = match (
            res.column_values(cat.name()),
            res.column_values(detail.name()),
        ) {
            (Some(c), Some(d)) => (c, d),
            _ => continue,
        };
        let mut folded = 0;
        let values: Vec<Cell> = cats
            .into_iter()
            .zip(details)
            .map(|(c, d)| match (c, d) {
                (Some(c), Some(d)) if is_other(&c) && !d.trim().is_empty() => {
                    if is_other(&d) {
                        warn!(
                            "fold_other_answers: detail {:?} of {:?} itself reads as \"Other\"",
                            d,
                            detail.name()
                        );
                    }
                    folded += 1;
                    Some(d.trim().to_string())
                }
                (c, _) => c,
            })
            .collect();
        debug!(
            "fold_other_answers: {:?}: folded {} answers",
            cat.name(),
            folded
        );
        res = res.with_column(cat.name(), values);
    }
    res
}

fn is_other(s: &str) -> bool {
    let l = s.to_lowercase();
    l.contains("outro") || l.contains("outra")
}

/// Collapses the common self-descriptions onto two values. Everything else is kept.
pub fn normalize_gender(raw: &str) -> String {
    let g = raw.trim();
    let l = g.to_lowercase();
    if l.contains("mulher cis") || l == "feminino" || l == "feminina" || l == "mulher" {
        FEMININE.to_string()
    } else if l.contains("homem cis") || l == "masculino" || l == "masculina" || l == "homem" {
        MASCULINE.to_string()
    } else {
        g.to_string()
    }
}

fn normalize_gender_column(table: &Table) -> Table {
    map_column(table, Field::Gender.name(), Field::Gender.name(), normalize_gender)
}

/// The canonical race group of a raw race/color answer. Unknown answers are kept.
pub fn race_group(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    RACE_SYNONYMS
        .iter()
        .find(|(k, _)| *k == key)
        .map_or_else(|| raw.to_string(), |(_, v)| v.to_string())
}

/// Collapses the two non-white groups into one.
pub fn race_supergroup(group: &str) -> String {
    match race_group(group).as_str() {
        PRETOS | PARDOS | NEGROS => NEGROS.to_string(),
        _ => group.to_string(),
    }
}

fn derive_race_groups(table: &Table) -> Table {
    let t = map_column(table, Field::Race.name(), Field::RaceGroup.name(), race_group);
    map_column(
        &t,
        Field::RaceGroup.name(),
        Field::RaceSupergroup.name(),
        race_supergroup,
    )
}

/// Maps the answer to "worked in the last week". Other answers are kept.
pub fn employment_status(raw: &str) -> String {
    match raw.trim() {
        "Sim" => EMPLOYED.to_string(),
        "Não" => OUT_OF_WORKFORCE.to_string(),
        _ => raw.to_string(),
    }
}

fn derive_employment_status(table: &Table) -> Table {
    map_column(
        table,
        Field::WorkedLastWeek.name(),
        Field::EmploymentStatus.name(),
        employment_status,
    )
}

/// The age bracket used by the charts. The 18 and 30 boundaries are in the middle
/// bracket.
pub fn age_bracket(age: Option<i64>) -> &'static str {
    match age {
        None => NOT_INFORMED,
        Some(a) if a < 18 => BRACKET_UNDER_18,
        Some(a) if a <= 30 => BRACKET_18_TO_30,
        Some(_) => BRACKET_OVER_30,
    }
}

/// The year of a birth date, if it can be understood.
pub fn parse_birth_year(raw: &str) -> Option<i32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.year());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(d) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(d.year());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|d| d.year())
}

/// The first integer found in a free-text answer, such as "19 anos".
pub fn first_integer(raw: &str) -> Option<i64> {
    FIRST_INTEGER
        .find(raw)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Computes the age from the birth year, falling back on the raw age answer.
///
/// The age is the difference of the years, so it is one year too high for the people
/// whose birthday has not come yet in the reference year.
fn derive_age(table: &Table, reference_year: i32) -> Table {
    let birth_col = Field::BirthDate.name();
    let age_col = Field::Age.name();
    let mut unparsed = 0;
    let ages: Vec<Option<i64>> = table
        .iter_rows()
        .map(|r| {
            let from_birth = r.get(birth_col).and_then(|b| {
                let y = parse_birth_year(b);
                if y.is_none() && !b.trim().is_empty() {
                    unparsed += 1;
                }
                y
            });
            match from_birth {
                Some(y) => Some((reference_year - y) as i64),
                None => r.get(age_col).and_then(first_integer),
            }
        })
        .collect();
    if unparsed > 0 {
        warn!("derive_age: {} birth dates could not be parsed", unparsed);
    }
    let brackets: Vec<Cell> = ages
        .iter()
        .map(|a| Some(age_bracket(*a).to_string()))
        .collect();
    table
        .with_column(age_col, ages.iter().map(|a| a.map(|x| x.to_string())).collect())
        .with_column(Field::AgeBracket.name(), brackets)
}

fn init_placeholders(table: &Table) -> Table {
    let mut res = table.clone();
    for f in [Field::Attendance, Field::ActiveSearch] {
        let values: Vec<Cell> = match res.column_values(f.name()) {
            Some(vs) => vs
                .into_iter()
                .map(|v| v.or_else(|| Some(NO_DATA.to_string())))
                .collect(),
            None => vec![Some(NO_DATA.to_string()); res.len()],
        };
        res = res.with_column(f.name(), values);
    }
    res
}

/// Writes `f(source)` into `target` for every non-null source cell. Null cells stay null.
/// Nothing happens when the source column is missing.
fn map_column<F>(table: &Table, source: &str, target: &str, f: F) -> Table
where
    F: Fn(&str) -> String,
{
    match table.column_values(source) {
        Some(values) => table.with_column(
            target,
            values.into_iter().map(|v| v.map(|s| f(&s))).collect(),
        ),
        None => {
            debug!("map_column: missing column {:?}, skipping", source);
            table.clone()
        }
    }
}
