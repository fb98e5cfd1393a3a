use log::info;

use crate::registry::Field;
use crate::table::Table;

/// The personally identifying columns, by their short export name. A table without
/// them can be shared.
pub static PII_COLUMNS: &[&str] = &[
    "telefone",
    "email",
    "cpf",
    "rg",
    "endereco",
    "bairro",
    "nome_mae",
    "nome_pai",
    "nome_familiar",
    "nome_completo",
    "nome_civil_documento",
    "form_uuid",
    "entrevistador_outro",
];

/// Drops the identifying columns, under their short name as well as their canonical
/// name. Columns that are absent are ignored.
pub fn drop_identifying(table: &Table) -> Table {
    let mut names: Vec<&str> = PII_COLUMNS.to_vec();
    names.extend(
        PII_COLUMNS
            .iter()
            .filter_map(|s| Field::from_snake(s))
            .map(|f| f.name()),
    );
    let res = table.without_columns(&names);
    info!(
        "drop_identifying: removed {} columns",
        table.columns().len() - res.columns().len()
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::cell;

    #[test]
    fn both_vocabularies_are_dropped() {
        let t = Table::from_rows(
            vec![
                "Nome Completo".to_string(),
                "cpf".to_string(),
                "cidade".to_string(),
                "form_uuid".to_string(),
                "Telefone".to_string(),
            ],
            vec![vec![
                cell("Ana"),
                cell("000"),
                cell("Santos"),
                cell("u"),
                cell("13 9999"),
            ]],
        );
        let res = drop_identifying(&t);
        assert_eq!(res.columns(), vec!["cidade"]);
        assert_eq!(res.get(0, "cidade"), Some("Santos"));
    }

    #[test]
    fn absent_columns_are_tolerated() {
        let t = Table::new(vec!["x".to_string()]);
        assert_eq!(drop_identifying(&t), t);
    }

    #[test]
    fn every_identifying_column_is_registered() {
        for c in PII_COLUMNS {
            assert!(Field::from_snake(c).is_some(), "{} is not registered", c);
        }
    }
}
