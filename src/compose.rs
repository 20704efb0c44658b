//! Text composition for embedding inputs and profile digests.
//!
//! Every function here is pure: the same record always yields the same
//! bytes. Only present, non-empty fields produce a line, each line carries
//! a fixed label, and the field order never changes.

use crate::model::{JobRecord, ProfileDraft, ProfileRecord};
use crate::taxonomy::Seniority;

/// Character budget for a job's requirements.
pub const REQUIREMENTS_BUDGET: usize = 500;
/// Character budget for a job's description.
pub const DESCRIPTION_BUDGET: usize = 600;
/// Skills shown in a profile summary.
pub const SUMMARY_SKILLS: usize = 8;
/// Experience snippets shown in a profile summary.
pub const SUMMARY_EXPERIENCES: usize = 3;
/// Languages shown in a profile summary.
pub const SUMMARY_LANGUAGES: usize = 3;
/// Summary used when a profile has nothing to show.
pub const GENERIC_SUMMARY: &str = "Perfil genérico";

mod label {
    pub const TITLE: &str = "Cargo";
    pub const AREA: &str = "Área";
    pub const LEVEL: &str = "Nível";
    pub const SKILLS: &str = "Habilidades";
    pub const REQUIREMENTS: &str = "Requisitos";
    pub const DESCRIPTION: &str = "Descrição";
    pub const EXPERIENCES: &str = "Experiências";
    pub const EDUCATION: &str = "Formação";
    pub const LANGUAGES: &str = "Idiomas";
    pub const DESIRED_AREA: &str = "Área desejada";
}

/// Collects `Label: value` parts, skipping empty values.
#[derive(Default)]
struct Lines {
    parts: Vec<String>,
}

impl Lines {
    fn push(&mut self, label: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.parts.push(format!("{}: {}", label, value));
        }
    }

    fn push_opt(&mut self, label: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(label, value);
        }
    }

    fn push_joined<'a, I>(&mut self, label: &str, values: I, separator: &str)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let joined = values
            .into_iter()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(separator);
        self.push(label, &joined);
    }

    fn join(self, separator: &str) -> String {
        self.parts.join(separator)
    }

    fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Keep at most `budget` characters of `text`.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Embedding input for a job posting.
pub fn job_text(job: &JobRecord) -> String {
    let mut lines = Lines::default();
    lines.push(label::TITLE, &job.title);
    lines.push(label::AREA, job.area.as_str());
    if job.seniority.is_known() {
        lines.push(label::LEVEL, job.seniority.as_str());
    }
    lines.push_joined(label::SKILLS, job.skills.iter().map(String::as_str), ", ");
    lines.push_opt(
        label::REQUIREMENTS,
        job.requirements
            .as_deref()
            .map(|text| truncate_chars(text, REQUIREMENTS_BUDGET)),
    );
    lines.push(
        label::DESCRIPTION,
        truncate_chars(&job.description, DESCRIPTION_BUDGET),
    );
    lines.join("\n")
}

/// Full query text for a profile; no per-field caps.
pub fn profile_query_text(profile: &ProfileDraft) -> String {
    let mut lines = Lines::default();
    lines.push_joined(
        label::SKILLS,
        profile.skills.iter().map(String::as_str),
        ", ",
    );
    lines.push_joined(
        label::EXPERIENCES,
        profile.experiences.iter().map(|exp| exp.snippet.as_str()),
        " | ",
    );
    let education: Vec<String> = profile
        .education
        .iter()
        .map(|edu| match (edu.degree.trim(), edu.field.trim()) {
            (degree, "") => degree.to_string(),
            ("", field) => field.to_string(),
            (degree, field) => format!("{} em {}", degree, field),
        })
        .collect();
    lines.push_joined(label::EDUCATION, education.iter().map(String::as_str), ", ");
    lines.push_joined(
        label::LANGUAGES,
        profile.languages.iter().map(String::as_str),
        ", ",
    );
    lines.push_opt(
        label::DESIRED_AREA,
        profile.desired_area.map(|area| area.as_str()),
    );
    lines.push_opt(
        label::LEVEL,
        profile
            .desired_seniority
            .filter(Seniority::is_known)
            .map(|level| level.as_str()),
    );
    lines.join("\n")
}

/// Short human-readable digest of a stored profile.
pub fn profile_summary(profile: &ProfileRecord) -> String {
    let mut lines = Lines::default();
    lines.push_joined(
        label::SKILLS,
        profile
            .skills
            .iter()
            .take(SUMMARY_SKILLS)
            .map(String::as_str),
        ", ",
    );
    lines.push_joined(
        label::EXPERIENCES,
        profile
            .experiences
            .iter()
            .take(SUMMARY_EXPERIENCES)
            .map(|exp| exp.snippet.as_str()),
        " | ",
    );
    lines.push_opt(
        label::AREA,
        profile.desired_area.map(|area| area.as_str()),
    );
    lines.push_opt(
        label::LEVEL,
        profile
            .desired_seniority
            .filter(Seniority::is_known)
            .map(|level| level.as_str()),
    );
    lines.push_joined(
        label::LANGUAGES,
        profile
            .languages
            .iter()
            .take(SUMMARY_LANGUAGES)
            .map(String::as_str),
        ", ",
    );
    if lines.is_empty() {
        return GENERIC_SUMMARY.to_string();
    }
    lines.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Education, Experience};
    use crate::taxonomy::Area;

    fn job() -> JobRecord {
        JobRecord {
            id: 1,
            external_id: None,
            title: "Engenheiro de Dados".into(),
            company: "Acme".into(),
            location: Some("São Paulo".into()),
            description: "Pipelines em Spark".into(),
            requirements: Some("SQL avançado".into()),
            seniority: Seniority::Senior,
            area: Area::Dados,
            skills: vec!["Spark".into(), "SQL".into()],
            salary_min: None,
            salary_max: None,
            url: None,
            embedding_id: None,
            created_at_ms: 0,
        }
    }

    fn profile() -> ProfileRecord {
        ProfileRecord {
            id: 1,
            session_id: "abc".into(),
            raw_text: None,
            skills: (1..=10).map(|i| format!("skill{}", i)).collect(),
            experiences: vec![],
            education: vec![],
            languages: vec![
                "Inglês Fluente".into(),
                "Espanhol".into(),
                "Francês".into(),
                "Alemão".into(),
            ],
            desired_area: Some(Area::Dados),
            desired_seniority: Some(Seniority::Mid),
            query_text: None,
            created_at_ms: 0,
        }
    }

    #[test]
    fn test_job_text_field_order_and_labels() {
        assert_eq!(
            job_text(&job()),
            "Cargo: Engenheiro de Dados\n\
             Área: dados\n\
             Nível: senior\n\
             Habilidades: Spark, SQL\n\
             Requisitos: SQL avançado\n\
             Descrição: Pipelines em Spark"
        );
    }

    #[test]
    fn test_job_text_is_deterministic() {
        let job = job();
        assert_eq!(job_text(&job), job_text(&job));
    }

    #[test]
    fn test_job_text_omits_missing_fields() {
        let mut job = job();
        job.skills.clear();
        job.requirements = None;
        job.seniority = Seniority::Unknown;
        let text = job_text(&job);
        assert!(!text.contains("Habilidades"));
        assert!(!text.contains("Requisitos"));
        assert!(!text.contains("Nível"));
        assert!(!text.lines().any(|line| line.trim_end().ends_with(':')));
    }

    #[test]
    fn test_job_text_truncates_long_fields() {
        let mut job = job();
        job.description = "é".repeat(700);
        job.requirements = Some("r".repeat(900));
        let text = job_text(&job);
        let description = text
            .lines()
            .find_map(|line| line.strip_prefix("Descrição: "))
            .unwrap();
        assert_eq!(description.chars().count(), DESCRIPTION_BUDGET);
        let requirements = text
            .lines()
            .find_map(|line| line.strip_prefix("Requisitos: "))
            .unwrap();
        assert_eq!(requirements.len(), REQUIREMENTS_BUDGET);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("ação", 2), "aç");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_profile_query_text_has_no_caps() {
        let mut draft = profile().draft();
        draft.experiences = (1..=5)
            .map(|i| Experience {
                period: format!("201{} - 202{}", i, i),
                snippet: format!("exp{}", i),
                nearby_organizations: vec![],
            })
            .collect();
        draft.education = vec![Education {
            degree: "Bacharelado".into(),
            field: "Computação".into(),
        }];
        let text = profile_query_text(&draft);
        assert!(text.starts_with("Habilidades: skill1, skill2"));
        assert!(text.contains("skill10"));
        assert!(text.contains("Experiências: exp1 | exp2 | exp3 | exp4 | exp5"));
        assert!(text.contains("Formação: Bacharelado em Computação"));
        assert!(text.contains("Alemão"));
        assert!(text.ends_with("Área desejada: dados\nNível: mid"));
    }

    #[test]
    fn test_profile_query_text_empty_draft() {
        assert_eq!(profile_query_text(&ProfileDraft::default()), "");
    }

    #[test]
    fn test_profile_summary_caps_skills_experiences_and_languages() {
        let mut profile = profile();
        profile.experiences = (1..=5)
            .map(|i| Experience {
                period: format!("201{}", i),
                snippet: format!("exp{}", i),
                nearby_organizations: vec![],
            })
            .collect();
        let summary = profile_summary(&profile);
        assert_eq!(
            summary,
            "Habilidades: skill1, skill2, skill3, skill4, skill5, skill6, skill7, skill8 | \
             Experiências: exp1 | exp2 | exp3 | \
             Área: dados | Nível: mid | Idiomas: Inglês Fluente, Espanhol, Francês"
        );
    }

    #[test]
    fn test_profile_summary_skips_blank_experiences() {
        let mut profile = profile();
        profile.experiences = vec![Experience {
            period: "2020".into(),
            snippet: "  ".into(),
            nearby_organizations: vec![],
        }];
        assert!(!profile_summary(&profile).contains("Experiências"));
    }

    #[test]
    fn test_profile_summary_generic_when_empty() {
        let mut profile = profile();
        profile.skills.clear();
        profile.languages.clear();
        profile.desired_area = None;
        profile.desired_seniority = None;
        assert_eq!(profile_summary(&profile), GENERIC_SUMMARY);
    }
}
