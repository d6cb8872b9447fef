//! Prompt construction for the bulk analysis kinds.
//!
//! Each kind renders a system persona plus a user prompt containing the
//! serialized employee profile and an inline example of the JSON shape
//! the model must return. Output shape is enforced by post-hoc parsing
//! (see `xlsmart_inference::repair`), not by a schema validator.

use xlsmart_core::{AnalysisKind, Employee, StandardRole};

/// A rendered system/user prompt pair.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// System persona for the given analysis kind.
pub fn system_prompt(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::RoleAssignment | AnalysisKind::RoleStandardization => {
            "You are an HR role-classification expert for a telecommunications company. \
             You match employees to standardized roles from a fixed catalog. \
             Respond with JSON only, no commentary."
        }
        AnalysisKind::CareerPath => {
            "You are a career development advisor for a telecommunications company. \
             You project realistic career paths from an employee's current profile. \
             Respond with JSON only, no commentary."
        }
        AnalysisKind::MobilityPlan => {
            "You are a workforce mobility planner for a telecommunications company. \
             You recommend rotation and relocation options for employees. \
             Respond with JSON only, no commentary."
        }
        AnalysisKind::DevelopmentPathway => {
            "You are a talent development specialist for a telecommunications company. \
             You design development pathways toward an employee's next role. \
             Respond with JSON only, no commentary."
        }
        AnalysisKind::TrainingAnalysis => {
            "You are a corporate training analyst for a telecommunications company. \
             You identify skill gaps and recommend training programs. \
             Respond with JSON only, no commentary."
        }
        AnalysisKind::RetentionPlan => {
            "You are an employee retention specialist for a telecommunications company. \
             You assess attrition risk and propose retention actions. \
             Respond with JSON only, no commentary."
        }
    }
}

/// Serialize an employee profile as prompt text.
fn employee_block(employee: &Employee) -> String {
    format!(
        "Employee profile:\n\
         - Name: {}\n\
         - Employee number: {}\n\
         - Current position: {}\n\
         - Department: {}\n\
         - Experience: {} years\n\
         - Skills: {}\n\
         - Certifications: {}",
        employee.name,
        employee.employee_number,
        employee.position,
        employee.department,
        employee.experience_years,
        join_or_none(&employee.skills),
        join_or_none(&employee.certifications),
    )
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none listed".to_string()
    } else {
        items.join(", ")
    }
}

/// Serialize the candidate role catalog for assignment prompts.
fn catalog_block(roles: &[StandardRole]) -> String {
    let mut out = String::from("Candidate standard roles:\n");
    for role in roles {
        out.push_str(&format!(
            "- id: {} | title: {} | family: {} | required skills: {}\n",
            role.id,
            role.role_title,
            role.job_family,
            join_or_none(&role.required_skills),
        ));
    }
    out
}

/// Build the role-assignment prompt for one employee against the catalog.
pub fn role_assignment_prompt(employee: &Employee, roles: &[StandardRole]) -> Prompt {
    let user = format!(
        "{}\n\n{}\n\
         Pick the single best matching role id from the candidate list above.\n\
         Return exactly this JSON shape:\n\
         {{\"role_id\": \"<uuid from the list>\", \"confidence\": 87.5, \"reasoning\": \"one sentence\"}}\n\
         Confidence is 0-100. If no candidate is a reasonable match, return:\n\
         {{\"role_id\": \"NO_MATCH\", \"confidence\": 0, \"reasoning\": \"one sentence\"}}",
        employee_block(employee),
        catalog_block(roles),
    );
    Prompt {
        system: system_prompt(AnalysisKind::RoleAssignment).to_string(),
        user,
    }
}

/// Build the standardization prompt for one raw role title against the catalog.
pub fn role_standardization_prompt(original_title: &str, roles: &[StandardRole]) -> Prompt {
    let user = format!(
        "Original role title: \"{}\"\n\n{}\n\
         Map the original title onto the closest catalog role.\n\
         Return exactly this JSON shape:\n\
         {{\"role_id\": \"<uuid from the list>\", \"standardized_title\": \"<catalog title>\", \"confidence\": 92.0}}\n\
         Confidence is 0-100. If nothing in the catalog fits, return:\n\
         {{\"role_id\": \"NO_MATCH\", \"standardized_title\": \"\", \"confidence\": 0}}",
        original_title,
        catalog_block(roles),
    );
    Prompt {
        system: system_prompt(AnalysisKind::RoleStandardization).to_string(),
        user,
    }
}

/// Build the free-text analysis prompt for one employee.
///
/// Covers the five per-employee analysis kinds; the example JSON varies
/// per kind but the envelope is the same.
pub fn analysis_prompt(kind: AnalysisKind, employee: &Employee) -> Prompt {
    let example = match kind {
        AnalysisKind::CareerPath => {
            r#"{"current_role": "...", "recommended_path": ["role after 1-2 years", "role after 3-5 years"], "key_strengths": ["..."], "summary": "..."}"#
        }
        AnalysisKind::MobilityPlan => {
            r#"{"mobility_readiness": "high|medium|low", "recommended_moves": [{"target_department": "...", "rationale": "..."}], "summary": "..."}"#
        }
        AnalysisKind::DevelopmentPathway => {
            r#"{"target_role": "...", "skill_gaps": ["..."], "development_steps": [{"step": "...", "timeline_months": 6}], "summary": "..."}"#
        }
        AnalysisKind::TrainingAnalysis => {
            r#"{"skill_gaps": ["..."], "recommended_trainings": [{"title": "...", "priority": "high|medium|low"}], "summary": "..."}"#
        }
        AnalysisKind::RetentionPlan => {
            r#"{"attrition_risk": "high|medium|low", "risk_factors": ["..."], "retention_actions": ["..."], "summary": "..."}"#
        }
        // Assignment kinds have dedicated builders above.
        AnalysisKind::RoleAssignment | AnalysisKind::RoleStandardization => {
            r#"{"summary": "..."}"#
        }
    };

    let user = format!(
        "{}\n\nReturn exactly this JSON shape:\n{}",
        employee_block(employee),
        example,
    );
    Prompt {
        system: system_prompt(kind).to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use xlsmart_core::AssignmentStatus;

    fn test_employee() -> Employee {
        Employee {
            id: Uuid::now_v7(),
            employee_number: "EMP-0042".to_string(),
            name: "Siti Rahma".to_string(),
            position: "Network Ops Staff".to_string(),
            department: "Network".to_string(),
            skills: vec!["BGP".to_string(), "MPLS".to_string()],
            experience_years: 6,
            certifications: vec![],
            assigned_role_id: None,
            assignment_status: AssignmentStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_role(title: &str) -> StandardRole {
        StandardRole {
            id: Uuid::now_v7(),
            role_title: title.to_string(),
            department: "Network".to_string(),
            job_family: "Engineering".to_string(),
            required_skills: vec!["BGP".to_string()],
            experience_range: "5-8".to_string(),
            description: String::new(),
            active: true,
        }
    }

    #[test]
    fn assignment_prompt_includes_profile_and_catalog() {
        let employee = test_employee();
        let roles = vec![test_role("Network Engineer"), test_role("NOC Analyst")];
        let prompt = role_assignment_prompt(&employee, &roles);

        assert!(prompt.user.contains("EMP-0042"));
        assert!(prompt.user.contains("BGP, MPLS"));
        assert!(prompt.user.contains("Network Engineer"));
        assert!(prompt.user.contains(&roles[0].id.to_string()));
        assert!(prompt.user.contains("NO_MATCH"));
        assert!(prompt.system.contains("role-classification"));
    }

    #[test]
    fn empty_lists_render_as_none_listed() {
        let mut employee = test_employee();
        employee.skills.clear();
        let prompt = analysis_prompt(AnalysisKind::CareerPath, &employee);
        assert!(prompt.user.contains("Skills: none listed"));
    }

    #[test]
    fn analysis_prompts_differ_per_kind() {
        let employee = test_employee();
        let career = analysis_prompt(AnalysisKind::CareerPath, &employee);
        let retention = analysis_prompt(AnalysisKind::RetentionPlan, &employee);
        assert_ne!(career.system, retention.system);
        assert!(career.user.contains("recommended_path"));
        assert!(retention.user.contains("attrition_risk"));
    }

    #[test]
    fn standardization_prompt_carries_original_title() {
        let roles = vec![test_role("Network Engineer")];
        let prompt = role_standardization_prompt("Sr. Ntwk Eng", &roles);
        assert!(prompt.user.contains("Sr. Ntwk Eng"));
        assert!(prompt.user.contains("standardized_title"));
    }
}
