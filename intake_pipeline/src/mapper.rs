use log::{debug, info};

use crate::config::PipelineError;
use crate::registry::{SchemaGeneration, METADATA_TAIL, PRIORITY_COLUMNS};
use crate::table::{Cell, Table};

/// Renames the columns of a table onto the canonical vocabulary, then orders them.
///
/// Returns the generation that was detected for the input.
pub fn map_schema(table: &Table) -> Result<(Table, SchemaGeneration), PipelineError> {
    let generation = SchemaGeneration::detect(table);
    info!("map_schema: detected generation {:?}", generation);
    let renamed = rename_columns(table, &generation.aliases())?;
    Ok((order_columns(&renamed)?, generation))
}

/// Applies a list of (source, target) renames.
///
/// Names are compared after trimming the surrounding whitespace. Sources that are
/// absent are skipped. When the target already exists, its nulls are filled from the
/// source and the source column is dropped, so that each target appears exactly once.
pub fn rename_columns(table: &Table, aliases: &[(&str, &str)]) -> Result<Table, PipelineError> {
    let mut res = table.clone();
    for (from, to) in aliases.iter() {
        let source = match res.columns().into_iter().find(|c| c.trim() == from.trim()) {
            Some(c) => c,
            None => continue,
        };
        if source == *to {
            continue;
        }
        match res.column_values(to) {
            Some(existing) => {
                debug!("rename_columns: merging {:?} into {:?}", source, to);
                let from_values = res.column_values(&source).unwrap_or_default();
                let merged: Vec<Cell> = existing
                    .into_iter()
                    .zip(from_values)
                    .map(|(cur, other)| cur.or(other))
                    .collect();
                res = res.with_column(to, merged).without_columns(&[&source]);
            }
            None => {
                debug!("rename_columns: {:?} -> {:?}", source, to);
                res = res.renamed(&source, to)?;
            }
        }
    }
    Ok(res)
}

/// Orders the columns: the priority columns first, in their fixed order, then all the
/// other columns in their original relative order, then the metadata columns.
///
/// Applying it twice gives the same result.
pub fn order_columns(table: &Table) -> Result<Table, PipelineError> {
    let head: Vec<String> = PRIORITY_COLUMNS
        .iter()
        .map(|f| f.name().to_string())
        .filter(|n| table.has_column(n))
        .collect();
    let tail: Vec<String> = METADATA_TAIL
        .iter()
        .map(|f| f.name().to_string())
        .filter(|n| table.has_column(n))
        .collect();
    let middle = table
        .columns()
        .into_iter()
        .filter(|c| !head.contains(c) && !tail.contains(c));
    let order: Vec<String> = head.iter().cloned().chain(middle).chain(tail.iter().cloned()).collect();
    table.select(&order).map_err(PipelineError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineError;
use crate::registry::Field;
    use crate::table::cell;

    fn names(t: &Table) -> Vec<String> {
        t.columns()
    }

    #[test]
    fn snake_case_export_is_renamed_and_ordered() {
        let t = Table::from_rows(
            vec![
                "id".to_string(),
                "form_uuid".to_string(),
                "genero".to_string(),
                "profissao_mae".to_string(),
                "status_formulario".to_string(),
                "nome_completo".to_string(),
                "cidade".to_string(),
            ],
            vec![vec![
                cell("1001"),
                cell("u-1"),
                cell("Feminina"),
                cell("Costureira"),
                cell("completo"),
                cell("Ana"),
                cell("Santos"),
            ]],
        );
        let (res, generation) = map_schema(&t).unwrap();
        assert_eq!(generation, SchemaGeneration::Canonical);
        assert_eq!(
            names(&res),
            vec![
                "Nome Completo",
                "Identidade de Gênero",
                "Cidade",
                "profissao_mae",
                "id",
                "status_formulario",
                "form_uuid"
            ]
        );
        assert_eq!(res.get(0, "Identidade de Gênero"), Some("Feminina"));
        assert_eq!(res.get(0, "profissao_mae"), Some("Costureira"));
    }

    #[test]
    fn every_mapped_column_appears_exactly_once() {
        let aliases = SchemaGeneration::Canonical.aliases();
        let columns: Vec<String> = aliases.iter().map(|(from, _)| from.to_string()).collect();
        let t = Table::from_rows(columns.clone(), vec![vec![cell("x"); columns.len()]]);
        let (res, _) = map_schema(&t).unwrap();
        assert_eq!(res.columns().len(), columns.len());
        for (_, to) in aliases.iter() {
            assert_eq!(res.columns().iter().filter(|c| c == to).count(), 1);
        }
    }

    #[test]
    fn alias_and_canonical_are_merged() {
        let t = Table::from_rows(
            vec!["Nome Completo".to_string(), "nome_completo".to_string()],
            vec![vec![None, cell("Bia")], vec![cell("Caio"), cell("ignored")]],
        );
        let res = rename_columns(&t, &SchemaGeneration::Canonical.aliases()).unwrap();
        assert_eq!(names(&res), vec!["Nome Completo"]);
        assert_eq!(res.get(0, "Nome Completo"), Some("Bia"));
        assert_eq!(res.get(1, "Nome Completo"), Some("Caio"));
    }

    #[test]
    fn legacy_long_names() {
        let t = Table::new(vec![
            "Status".to_string(),
            "Qual é a sua orientação sexual? (Você pode selecionar mais de uma opção, se desejar.)"
                .to_string(),
            "Recebe algum Benefício Social?".to_string(),
            "Nome completo".to_string(),
        ]);
        let (res, generation) = map_schema(&t).unwrap();
        assert_eq!(generation, SchemaGeneration::Legacy);
        assert_eq!(
            names(&res),
            vec![
                Field::FullName.name(),
                Field::SexualOrientation.name(),
                Field::ReceivesBenefits.name(),
                Field::FormStatus.name()
            ]
        );
    }

    #[test]
    fn ordering_is_idempotent() {
        let t = Table::new(vec![
            "x".to_string(),
            "updated_at".to_string(),
            "Race_Group".to_string(),
            "y".to_string(),
            "id".to_string(),
            "Faixa Etária".to_string(),
        ]);
        let once = order_columns(&t).unwrap();
        assert_eq!(
            names(&once),
            vec!["Faixa Etária", "Race_Group", "x", "y", "id", "updated_at"]
        );
        assert_eq!(order_columns(&once).unwrap(), once);
    }
}
