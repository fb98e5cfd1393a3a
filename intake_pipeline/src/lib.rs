mod config;
mod table;

pub mod consolidate;
pub mod filter;
pub mod mapper;
pub mod merge;
pub mod normalize;
pub mod privacy;
pub mod registry;
pub mod summary;

use log::{debug, info};

pub use crate::config::*;
pub use crate::table::{cell, Cell, Row, Table};

/// Turns a raw export of the intake form into the canonical table.
///
/// The stages run in a fixed order: (optional) removal of the identifying columns,
/// completion filter, schema mapping, normalization and column ordering. The input is
/// never modified.
///
/// The normalization does not reject values: the ones it cannot understand are either
/// kept as they are or become nulls. Only a failure of the data frame is reported.
pub fn run_pipeline(raw: &Table, options: &PipelineOptions) -> Result<PipelineOutput, PipelineError> {
    info!(
        "run_pipeline: {} records, {} columns",
        raw.len(),
        raw.columns().len()
    );
    debug!("run_pipeline: options: {:?}", options);

    let input = if options.privacy {
        privacy::drop_identifying(raw)
    } else {
        raw.clone()
    };

    let completed = filter::keep_completed(&input)?;
    let dropped_incomplete = input.len() - completed.len();

    let (mapped, generation) = mapper::map_schema(&completed)?;
    let normalized = normalize::normalize(&mapped, &options.normalize);
    let table = mapper::order_columns(&normalized)?;
    info!(
        "run_pipeline: {} records kept ({} incomplete dropped), generation {:?}",
        table.len(),
        dropped_incomplete,
        generation
    );

    Ok(PipelineOutput {
        table,
        generation,
        dropped_incomplete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{BRACKET_18_TO_30, BRACKET_OVER_30, FEMININE, NEGROS, NO_DATA};
    use crate::registry::{Field, SchemaGeneration};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn options(privacy: bool) -> PipelineOptions {
        PipelineOptions {
            normalize: NormalizeOptions {
                reference_year: 2026,
            },
            privacy,
        }
    }

    fn canonical_export() -> Table {
        let columns: Vec<String> = [
            "id",
            "status_formulario",
            "cidade",
            "genero",
            "genero_outro",
            "raca_cor",
            "data_nascimento",
            "nome_completo",
            "telefone",
            "form_uuid",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for i in 0..13 {
            let status = if i % 4 == 3 { "incompleto" } else { "completo" };
            let (genero, detail) = match i % 3 {
                0 => ("Mulher Cis", None),
                1 => ("Outro", cell("Não-binárie")),
                _ => ("Homem Cis", None),
            };
            let race = if i % 2 == 0 { "Preto/a/e" } else { "Branco/a/e" };
            let birth = if i < 6 { "2000-05-10" } else { "1980-01-02" };
            rows.push(vec![
                cell(&(1001 + i).to_string()),
                cell(status),
                cell("Santos"),
                cell(genero),
                detail,
                cell(race),
                cell(birth),
                cell(&format!("Pessoa {}", i)),
                cell("13 99999-0000"),
                cell(&format!("uuid-{}", i)),
            ]);
        }
        Table::from_rows(columns, rows)
    }

    #[test]
    fn ten_complete_records_survive() {
        init();
        let raw = canonical_export();
        let res = run_pipeline(&raw, &options(false)).unwrap();
        assert_eq!(res.generation, SchemaGeneration::Canonical);
        assert_eq!(res.dropped_incomplete, 3);
        let t = res.table;
        assert_eq!(t.len(), 10);

        // Canonical names, priority columns first, metadata last.
        assert_eq!(t.columns()[0], Field::FullName.name());
        assert_eq!(t.columns()[1], Field::Age.name());
        assert_eq!(t.columns()[2], Field::AgeBracket.name());
        assert_eq!(t.columns().last().map(|s| s.as_str()), Some("form_uuid"));
        assert!(!t.has_column("genero"));

        assert_eq!(t.get(0, Field::Gender.name()), Some(FEMININE));
        assert_eq!(t.get(1, Field::Gender.name()), Some("Não-binárie"));
        assert_eq!(t.get(0, Field::RaceSupergroup.name()), Some(NEGROS));
        assert_eq!(t.get(0, Field::Age.name()), Some("26"));
        assert_eq!(t.get(0, Field::AgeBracket.name()), Some(BRACKET_18_TO_30));
        assert_eq!(t.get(9, Field::AgeBracket.name()), Some(BRACKET_OVER_30));
        assert_eq!(t.get(9, Field::Attendance.name()), Some(NO_DATA));
        // The raw input is untouched.
        assert_eq!(raw, canonical_export());
    }

    #[test]
    fn pipeline_is_idempotent() {
        init();
        let once = run_pipeline(&canonical_export(), &options(false)).unwrap().table;
        let twice = run_pipeline(&once, &options(false)).unwrap().table;
        assert_eq!(once, twice);
    }

    #[test]
    fn privacy_mode_drops_identifying_columns() {
        init();
        let t = run_pipeline(&canonical_export(), &options(true)).unwrap().table;
        assert_eq!(t.len(), 10);
        for name in ["Nome Completo", "Telefone", "form_uuid", "nome_completo"] {
            assert!(!t.has_column(name), "{} should be dropped", name);
        }
        assert!(t.has_column(Field::City.name()));
    }

    #[test]
    fn empty_export() {
        init();
        let raw = Table::new(vec!["id".to_string(), "status_formulario".to_string()]);
        let res = run_pipeline(&raw, &options(false)).unwrap();
        assert!(res.table.is_empty());
        assert_eq!(res.dropped_incomplete, 0);
    }
}
