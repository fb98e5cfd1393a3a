//! The field registry: every column the pipeline knows about, under all the names it
//! has carried across the revisions of the intake form.
//!
//! Downstream consumers (charts, statistics) index columns strictly by their canonical
//! name, so this file is the single place where those names are written down.

use log::debug;

use crate::table::Table;

/// A canonical field of the intake survey.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Field {
    // Record metadata
    Id,
    CreatedAt,
    UpdatedAt,
    FormStatus,
    FormUuid,
    // Identity and contact
    FullName,
    Interviewer,
    InterviewerOther,
    InterviewDate,
    Phone,
    Email,
    BirthDate,
    Rg,
    Cpf,
    City,
    Birthplace,
    Address,
    Neighborhood,
    MotherName,
    FatherName,
    RelativeName,
    CivilName,
    // Demographics
    MaritalStatus,
    Race,
    Pronouns,
    Gender,
    GenderOther,
    TransIdentity,
    SexualOrientation,
    SexualOrientationOther,
    Schooling,
    SchoolType,
    MotherSchooling,
    FatherSchooling,
    // Household
    HousingCondition,
    HousingType,
    HousingTypeOther,
    HasInternet,
    InternetType,
    InternetSignal,
    HasChildren,
    // Work and income
    WorkedLastWeek,
    WorkTie,
    WorkTieOther,
    WorkMoneyUse,
    FamilySupport,
    FamilyIncome,
    ReceivesBenefits,
    BenefitTypes,
    CadUnico,
    // Mobility and health
    TransportMode,
    TransportModeOther,
    HealthPlan,
    Psychotherapy,
    BloodType,
    Substances,
    Disability,
    DisabilityDetail,
    FamilyDisability,
    FamilyDisabilityDetail,
    // Goals
    DesiredCourse,
    Topics,
    // Derived by the normalizer
    Age,
    AgeBracket,
    RaceGroup,
    RaceSupergroup,
    EmploymentStatus,
    Attendance,
    ActiveSearch,
}

/// The names of a field across the form revisions.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    /// The name consumers depend on.
    pub canonical: &'static str,
    /// The short name used by the second revision of the form, if any.
    pub snake: Option<&'static str>,
    /// Names only found in the first revision of the form.
    pub legacy: &'static [&'static str],
}

const fn spec(
    field: Field,
    canonical: &'static str,
    snake: Option<&'static str>,
    legacy: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        field,
        canonical,
        snake,
        legacy,
    }
}

pub static FIELDS: &[FieldSpec] = &[
    spec(Field::Id, "id", Some("id"), &[]),
    spec(Field::CreatedAt, "created_at", Some("created_at"), &[]),
    spec(Field::UpdatedAt, "updated_at", Some("updated_at"), &[]),
    spec(
        Field::FormStatus,
        "status_formulario",
        Some("status_formulario"),
        &["Status"],
    ),
    spec(Field::FormUuid, "form_uuid", Some("form_uuid"), &[]),
    spec(
        Field::FullName,
        "Nome Completo",
        Some("nome_completo"),
        &["Nome completo", "Nome"],
    ),
    spec(Field::Interviewer, "Entrevistador", Some("entrevistador"), &[]),
    spec(
        Field::InterviewerOther,
        "Entrevistador (Outro)",
        Some("entrevistador_outro"),
        &[],
    ),
    spec(
        Field::InterviewDate,
        "Data da Entrevista",
        Some("data_entrevista"),
        &[],
    ),
    spec(Field::Phone, "Telefone", Some("telefone"), &[]),
    spec(Field::Email, "E-mail", Some("email"), &[]),
    spec(
        Field::BirthDate,
        "Data de Nascimento",
        Some("data_nascimento"),
        &[],
    ),
    spec(Field::Rg, "RG", Some("rg"), &[]),
    spec(Field::Cpf, "CPF", Some("cpf"), &[]),
    spec(Field::City, "Cidade", Some("cidade"), &[]),
    spec(Field::Birthplace, "Naturalidade", Some("naturalidade"), &[]),
    spec(Field::Address, "Endereço", Some("endereco"), &[]),
    spec(Field::Neighborhood, "Bairro", Some("bairro"), &[]),
    spec(Field::MotherName, "Nome da Mãe", Some("nome_mae"), &[]),
    spec(Field::FatherName, "Nome do Pai", Some("nome_pai"), &[]),
    spec(
        Field::RelativeName,
        "Nome do Familiar",
        Some("nome_familiar"),
        &[],
    ),
    spec(
        Field::CivilName,
        "Nome Civil (Documento)",
        Some("nome_civil_documento"),
        &[],
    ),
    spec(Field::MaritalStatus, "Estado Civil", Some("estado_civil"), &[]),
    spec(Field::Race, "Raça/Cor", Some("raca_cor"), &[]),
    spec(Field::Pronouns, "Pronomes", Some("pronomes"), &[]),
    spec(
        Field::Gender,
        "Identidade de Gênero",
        Some("genero"),
        &["Qual é a sua identidade de gênero?"],
    ),
    spec(
        Field::GenderOther,
        "Identidade de Gênero (Outro)",
        Some("genero_outro"),
        &[],
    ),
    spec(
        Field::TransIdentity,
        "Identidade Trans/Travesti",
        Some("trans_travesti"),
        &["Você se identifica como pessoa trans ou travesti?"],
    ),
    spec(
        Field::SexualOrientation,
        "Orientação Sexual",
        Some("orientacao_sexual"),
        &[],
    ),
    spec(
        Field::SexualOrientationOther,
        "Orientação Sexual (Outro)",
        Some("orientacao_sexual_outro"),
        &[],
    ),
    spec(Field::Schooling, "Escolaridade", Some("escolaridade"), &[]),
    spec(
        Field::SchoolType,
        "Tipo de Escola",
        Some("escola_publica_privada"),
        &["Estudou em escola pública ou privada?"],
    ),
    spec(
        Field::MotherSchooling,
        "Escolaridade da Mãe",
        Some("escolaridade_mae"),
        &[],
    ),
    spec(
        Field::FatherSchooling,
        "Escolaridade do Pai",
        Some("escolaridade_pai"),
        &[],
    ),
    spec(
        Field::HousingCondition,
        "Condição de Moradia",
        Some("moradia_condicao"),
        &[],
    ),
    spec(Field::HousingType, "Tipo de Moradia", Some("moradia_tipo"), &[]),
    spec(
        Field::HousingTypeOther,
        "Tipo de Moradia (Outro)",
        Some("moradia_tipo_outro"),
        &[],
    ),
    spec(Field::HasInternet, "Possui Internet?", Some("internet_tem"), &[]),
    spec(Field::InternetType, "Tipo de Internet", Some("internet_tipo"), &[]),
    spec(
        Field::InternetSignal,
        "Sinal de Internet",
        Some("internet_sinal"),
        &[],
    ),
    spec(Field::HasChildren, "Tem Filhos?", Some("filhos_tem"), &[]),
    spec(
        Field::WorkedLastWeek,
        "Trabalhou na última semana?",
        Some("trabalho_renda_semana"),
        &[],
    ),
    spec(
        Field::WorkTie,
        "Vínculo de Trabalho",
        Some("trabalho_vinculo"),
        &[],
    ),
    spec(
        Field::WorkTieOther,
        "Vínculo de Trabalho (Outro)",
        Some("trabalho_vinculo_outro"),
        &[],
    ),
    spec(
        Field::WorkMoneyUse,
        "Uso do Dinheiro (Trabalho)",
        Some("trabalho_uso_dinheiro"),
        &["O que você faz com o dinheiro do seu trabalho?"],
    ),
    spec(
        Field::FamilySupport,
        "Ajuda no Sustento Familiar?",
        Some("trabalho_ajuda_familiar"),
        &["Você ajuda no sustento da sua família?"],
    ),
    spec(Field::FamilyIncome, "Renda Familiar", Some("renda_familiar"), &[]),
    spec(
        Field::ReceivesBenefits,
        "Recebe Benefícios",
        Some("beneficios_recebe"),
        &[],
    ),
    spec(
        Field::BenefitTypes,
        "Tipos de Benefício",
        Some("beneficios_tipo"),
        &[],
    ),
    spec(Field::CadUnico, "CadÚnico", Some("beneficios_cadunico"), &[]),
    spec(
        Field::TransportMode,
        "Meio de Transporte",
        Some("transporte_meio"),
        &[],
    ),
    spec(
        Field::TransportModeOther,
        "Meio de Transporte (Outro)",
        Some("transporte_meio_outro"),
        &[],
    ),
    spec(Field::HealthPlan, "Plano de Saúde", Some("saude_plano"), &[]),
    spec(
        Field::Psychotherapy,
        "Psicoterapia",
        Some("saude_psicoterapia"),
        &[],
    ),
    spec(
        Field::BloodType,
        "Tipo Sanguíneo",
        Some("saude_tipo_sanguineo"),
        &[],
    ),
    spec(
        Field::Substances,
        "Uso de Substâncias",
        Some("saude_substancias"),
        &[],
    ),
    spec(
        Field::Disability,
        "Possui Deficiência?",
        Some("saude_deficiencia"),
        &[],
    ),
    spec(
        Field::DisabilityDetail,
        "Detalhe Deficiência",
        Some("saude_deficiencia_qual"),
        &["Se sim, qual deficiência?"],
    ),
    spec(
        Field::FamilyDisability,
        "Familiar com Deficiência?",
        Some("saude_familiar_deficiencia"),
        &[],
    ),
    spec(
        Field::FamilyDisabilityDetail,
        "Detalhe Deficiência Familiar",
        Some("saude_familiar_deficiencia_qual"),
        &[],
    ),
    spec(
        Field::DesiredCourse,
        "Qual curso pretende?",
        Some("objetivo_curso"),
        &[],
    ),
    spec(Field::Topics, "Temas de interesse", Some("objetivo_temas"), &[]),
    spec(Field::Age, "Idade", None, &[]),
    spec(Field::AgeBracket, "Faixa Etária", None, &[]),
    spec(Field::RaceGroup, "Race_Group", None, &[]),
    spec(Field::RaceSupergroup, "Race_Supergroup", None, &[]),
    spec(Field::EmploymentStatus, "Employment_Status", None, &[]),
    spec(Field::Attendance, "Frequência", None, &[]),
    spec(Field::ActiveSearch, "Busca_Ativa_Result", None, &[]),
];

impl Field {
    pub fn spec(self) -> &'static FieldSpec {
        FIELDS
            .iter()
            .find(|s| s.field == self)
            .unwrap_or_else(|| panic!("field {:?} is missing from the registry", self))
    }

    pub fn name(self) -> &'static str {
        self.spec().canonical
    }

    /// The name under which the second revision of the form exports this field.
    /// Derived fields fall back to their canonical name.
    pub fn snake_name(self) -> &'static str {
        let s = self.spec();
        s.snake.unwrap_or(s.canonical)
    }

    pub fn from_canonical(name: &str) -> Option<Field> {
        FIELDS.iter().find(|s| s.canonical == name).map(|s| s.field)
    }

    pub fn from_snake(name: &str) -> Option<Field> {
        FIELDS
            .iter()
            .find(|s| s.snake == Some(name))
            .map(|s| s.field)
    }
}

/// The mapping from the spreadsheet-tool export of the interview form onto the short
/// names of the main export. Used by the cross-export merger.
///
/// Columns that are not listed here are not carried over.
pub static EXPORT_VARIANT_ALIASES: &[(&str, &str)] = &[
    ("NOME DA(O) ASSISTENTE SOCIAL ENTREVISTADOR(A)", "entrevistador"),
    ("Data  Entrevista Social *", "data_entrevista"),
    ("Nome da aluna Completo(o)", "nome_completo"),
    ("Telefone para contato (WhatsApp, se possível)", "telefone"),
    ("E-mail*", "email"),
    ("Data Nascimento", "data_nascimento"),
    ("R.G", "rg"),
    ("C.P.F", "cpf"),
    ("Cidade*", "cidade"),
    ("Naturalidade - Cidade/Estado*", "naturalidade"),
    ("Endereço (Rua, Número)*", "endereco"),
    ("Bairro*", "bairro"),
    ("Estado Civil*", "estado_civil"),
    ("Sua cor ou raça é", "raca_cor"),
    ("Qual pronome você quer ser tratado?*", "pronomes"),
    ("Identidade de Gênero*", "genero"),
    (
        "Qual é a sua orientação sexual? (Você pode selecionar mais de uma opção, se desejar.)",
        "orientacao_sexual",
    ),
    ("Escolaridade*", "escolaridade"),
    ("Nome da mãe", "nome_mae"),
    ("Profissão da Mãe", "profissao_mae"),
    ("Escolaridade da Mãe", "escolaridade_mae"),
    ("Nome do Pai", "nome_pai"),
    ("Profissão do Pai", "profissao_pai"),
    ("Escolaridade do Pai", "escolaridade_pai"),
    (
        "Possui algum familiar estudando atualmente no núcleo?",
        "familiar_nucleo",
    ),
    (
        "Se sim, para resposta anterior. Qual o vínculo familiar? ",
        "vinculo_familiar",
    ),
    (
        "Nome completo do familiar que está matriculado no núcleo?",
        "nome_familiar",
    ),
    ("Condição*", "moradia_condicao"),
    ("Tipo*", "moradia_tipo"),
    ("Possui internet?*", "internet_tem"),
    ("Qual tipo?*", "internet_tipo"),
    ("A Internet possui um sinal estável?*", "internet_sinal"),
    ("Tem alguma atividade remunerada?*\nSim", "trabalho_renda_semana"),
    ("Se sim, qual tipo de vínculo?*", "trabalho_vinculo"),
    ("Onde trabalha e qual a função?", "trabalho_vinculo_outro"),
    (
        "Qual a renda familiar?\nObs:  Valor aproximado da soma de todos os rendimentos mensais das pessoas que moram na mesma casa.",
        "renda_familiar",
    ),
    ("Recebe algum Benefício Social?\n", "beneficios_recebe"),
    ("Qual/Quais tipo de benefício?", "beneficios_tipo"),
    ("Se sim, você tem CadÚnico*", "beneficios_cadunico"),
    ("Precisa de Cesta Básica?*\n", "cesta_basica"),
    ("Filhos*", "filhos_tem"),
    (
        "Você paga pensão alimentícia a filhos ou para ex-cônjuge?",
        "pensao_paga",
    ),
    (
        "Você recebe pensão alimentícia para seus filhos?",
        "pensao_recebe",
    ),
    (
        "Vc e sua família possui veículo próprio? Se sim. Qual tipo?",
        "transporte_veiculo",
    ),
    (
        "Qual tipo de transporte você utilizará para se deslocar até a Educafro?*",
        "transporte_meio",
    ),
    ("Precisa de auxílio transporte?  *\n", "transporte_auxilio"),
    (
        "Você utiliza os serviços do SUS, ou possui plano de saúde?*",
        "saude_plano",
    ),
    ("Utiliza alguns desses serviços do SUS?", "saude_servicos"),
    (
        "Sabe qual o seu tipo sanguíneo? Se sim, qual?",
        "saude_tipo_sanguineo",
    ),
    ("Já fez algum tipo de psicoterapia?*", "saude_psicoterapia"),
    ("Faz algum tipo de psicoterapia?*", "saude_psicoterapia_atual"),
    (
        "Se sim, por quanto tempo? Há quanto tempo terminou?\n",
        "saude_psicoterapia_tempo",
    ),
    (
        "Tem algum problema de saúde? Se sim, qual?\n",
        "saude_problemas_qual",
    ),
    ("Possui alguma alergia?\n", "saude_alergias_qual"),
    ("Faz uso de medicamento contínuo? ", "saude_medicamentos"),
    (
        "Já fez algum uso de alguma substância psicoativa? Obs: álcool e cigarro são também ",
        "saude_substancias",
    ),
    ("Se sim, qual?", "saude_substancias_qual"),
    ("Mora sozinho?", "cotidiano_mora_com"),
    ("Com quem mora?", "cotidiano_mora_com_quem"),
    ("Como é a relação com a sua família?", "cotidiano_relacao"),
    (
        "Histórico pessoal e/ou familiar (Informações relevantes da história de vida da pessoa)",
        "cotidiano_historico",
    ),
    (
        "Já sabe que curso(s) quer fazer na graduação?",
        "objetivo_curso",
    ),
    (
        "Qual o seu objetivo em estudar na Educafro?",
        "objetivo_educafro",
    ),
    (
        "Que temas você gostaria que fossem trabalhados coletivamente aqui na Educafro?",
        "objetivo_temas",
    ),
    (
        "Como será a frequência na Educafro, em quais dias pretende/poderá comparecer?",
        "objetivo_frequencia",
    ),
    (
        "Possui alguma deficiência com ou sem laudo médico ?*",
        "saude_deficiencia",
    ),
    (
        "Possui algum familiar com deficiência? Se sim, Qual?",
        "saude_familiar_deficiencia",
    ),
    ("Idade", "Idade"),
];

/// Columns only found in the spreadsheet-tool export.
const EXPORT_VARIANT_MARKERS: &[&str] = &[
    "NOME DA(O) ASSISTENTE SOCIAL ENTREVISTADOR(A)",
    "Nome da aluna Completo(o)",
    "Data  Entrevista Social *",
];

/// Pairs of (category, free-text detail) columns, by canonical name. When the category
/// holds an "Other" answer, the detail replaces it.
pub static OTHER_PAIRS: &[(Field, Field)] = &[
    (Field::WorkTie, Field::WorkTieOther),
    (Field::Gender, Field::GenderOther),
    (Field::SexualOrientation, Field::SexualOrientationOther),
    (Field::TransportMode, Field::TransportModeOther),
    (Field::HousingType, Field::HousingTypeOther),
    (Field::Interviewer, Field::InterviewerOther),
];

/// Columns shown first, in this order.
pub static PRIORITY_COLUMNS: &[Field] = &[
    Field::FullName,
    Field::Age,
    Field::AgeBracket,
    Field::Gender,
    Field::RaceGroup,
    Field::RaceSupergroup,
    Field::Race,
    Field::SexualOrientation,
    Field::City,
    Field::EmploymentStatus,
    Field::WorkTie,
    Field::FamilyIncome,
    Field::ReceivesBenefits,
    Field::HasInternet,
    Field::HousingCondition,
];

/// Columns always shown last, in this order.
pub static METADATA_TAIL: &[Field] = &[
    Field::Id,
    Field::CreatedAt,
    Field::UpdatedAt,
    Field::FormStatus,
    Field::FormUuid,
];

/// The generation of the form that produced an export.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SchemaGeneration {
    /// The first revision, with long form-literal column names.
    Legacy,
    /// The second revision, with snake_case column names.
    Canonical,
    /// The spreadsheet-tool export, with its own vocabulary.
    ExportVariant,
}

impl SchemaGeneration {
    /// Probes the header of a table to find out which revision produced it.
    pub fn detect(table: &Table) -> SchemaGeneration {
        let has = |name: &str| table.columns().iter().any(|c| c.trim() == name.trim());
        let res = if has(Field::FormStatus.snake_name())
            || has(Field::FormUuid.snake_name())
            || FIELDS
                .iter()
                .filter(|s| s.snake.map_or(false, |n| n != s.canonical))
                .any(|s| has(s.snake.unwrap_or_default()))
        {
            SchemaGeneration::Canonical
        } else if !has("Status") && EXPORT_VARIANT_MARKERS.iter().any(|m| has(m)) {
            SchemaGeneration::ExportVariant
        } else {
            SchemaGeneration::Legacy
        };
        debug!("detect: columns: {:?} -> {:?}", table.columns(), res);
        res
    }

    /// The (source name, canonical name) pairs that apply to this generation.
    pub fn aliases(self) -> Vec<(&'static str, &'static str)> {
        match self {
            SchemaGeneration::Canonical => FIELDS
                .iter()
                .filter_map(|s| s.snake.map(|n| (n, s.canonical)))
                .filter(|(from, to)| from != to)
                .collect(),
            SchemaGeneration::Legacy => {
                let mut res: Vec<(&'static str, &'static str)> = FIELDS
                    .iter()
                    .flat_map(|s| s.legacy.iter().map(move |l| (*l, s.canonical)))
                    .collect();
                // The long question names are shared with the spreadsheet export.
                res.extend(
                    EXPORT_VARIANT_ALIASES
                        .iter()
                        .filter_map(|(from, snake)| {
                            Field::from_snake(snake).map(|f| (*from, f.name()))
                        })
                        .filter(|(from, to)| from != to),
                );
                res
            }
            SchemaGeneration::ExportVariant => EXPORT_VARIANT_ALIASES
                .iter()
                .map(|(from, snake)| {
                    let to = Field::from_snake(snake).map_or(*snake, |f| f.name());
                    (*from, to)
                })
                .filter(|(from, to)| from != to)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn header(names: &[&str]) -> Table {
        Table::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn names_are_unique() {
        let canon: HashSet<&str> = FIELDS.iter().map(|s| s.canonical).collect();
        assert_eq!(canon.len(), FIELDS.len());
        let snakes: Vec<&str> = FIELDS.iter().filter_map(|s| s.snake).collect();
        let snake_set: HashSet<&str> = snakes.iter().copied().collect();
        assert_eq!(snake_set.len(), snakes.len());
    }

    #[test]
    fn every_field_is_registered() {
        for (cat, detail) in OTHER_PAIRS {
            assert!(!cat.name().is_empty());
            assert!(!detail.name().is_empty());
        }
        for f in PRIORITY_COLUMNS.iter().chain(METADATA_TAIL.iter()) {
            assert_eq!(Field::from_canonical(f.name()), Some(*f));
        }
    }

    #[test]
    fn detect_generations() {
        assert_eq!(
            SchemaGeneration::detect(&header(&["id", "status_formulario", "genero"])),
            SchemaGeneration::Canonical
        );
        assert_eq!(
            SchemaGeneration::detect(&header(&["Status", "Raça/Cor", "Data de Nascimento"])),
            SchemaGeneration::Legacy
        );
        assert_eq!(
            SchemaGeneration::detect(&header(&[
                "Nome da aluna Completo(o)",
                "Identidade de Gênero*"
            ])),
            SchemaGeneration::ExportVariant
        );
    }

    #[test]
    fn export_aliases_resolve_to_canonical_names() {
        let aliases = SchemaGeneration::ExportVariant.aliases();
        assert!(aliases.contains(&("Identidade de Gênero*", "Identidade de Gênero")));
        // Not part of the registry: kept under the short name.
        assert!(aliases.contains(&("Profissão da Mãe", "profissao_mae")));
        assert!(!aliases.iter().any(|(from, to)| from == to));
    }
}
