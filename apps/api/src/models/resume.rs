use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserSession;

/// Common surface of the three ordered résumé lists.
pub trait ResumeEntry {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn description_mut(&mut self) -> Option<&mut String>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeExperience {
    pub id: String,
    pub role: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeEducation {
    pub id: String,
    pub degree: String,
    pub school: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeProject {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tech_stack: String,
}

impl ResumeEntry for ResumeExperience {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn description_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.description)
    }
}

impl ResumeEntry for ResumeEducation {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn description_mut(&mut self) -> Option<&mut String> {
        None
    }
}

impl ResumeEntry for ResumeProject {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn description_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.description)
    }
}

/// Which ordered list of the résumé an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeSection {
    Experience,
    Education,
    Projects,
}

/// The single structured profile a user renders and exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resume {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub website: String,
    pub summary: String,
    /// Comma-separated free text.
    pub skills: String,
    /// `data:` URL holding a base64 image. An empty string means no avatar
    /// and is normalized to `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub experience: Vec<ResumeExperience>,
    pub education: Vec<ResumeEducation>,
    pub projects: Vec<ResumeProject>,
}

/// Résumé fields pulled out of an uploaded document. Every field is optional
/// and list entries may arrive without identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedResume {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
    pub summary: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<Vec<ResumeExperience>>,
    pub education: Option<Vec<ResumeEducation>>,
    pub projects: Option<Vec<ResumeProject>>,
}

impl Resume {
    /// Empty résumé carrying what the auth collaborator knows about the user.
    pub fn seeded_for(session: &UserSession) -> Self {
        Resume {
            full_name: session.name.clone(),
            email: session.email.clone(),
            ..Resume::default()
        }
    }

    /// Sample profile used when demo seeding is enabled.
    pub fn demo_for(session: &UserSession) -> Self {
        let mut resume = Resume {
            full_name: "Alex Developer".to_string(),
            email: "alex.dev@example.com".to_string(),
            phone: "(555) 123-4567".to_string(),
            location: "San Francisco, CA".to_string(),
            linkedin: "linkedin.com/in/alexdev".to_string(),
            website: "alexdev.io".to_string(),
            summary: "Senior Frontend Engineer with 5+ years of experience building scalable web \
                applications using React and TypeScript. Proven track record of improving site \
                performance and user engagement."
                .to_string(),
            skills: "React, TypeScript, Tailwind CSS, Node.js, UI/UX Design, Next.js, GraphQL"
                .to_string(),
            avatar: None,
            experience: vec![
                ResumeExperience {
                    id: new_entry_id(),
                    role: "Senior Frontend Engineer".to_string(),
                    company: "TechCorp Inc.".to_string(),
                    location: "Remote".to_string(),
                    start_date: "2022-03".to_string(),
                    end_date: String::new(),
                    current: true,
                    description: "• Led the migration of legacy code to React 19, improving load \
                        times by 40%.\n• Mentored junior developers and established code review \
                        practices."
                        .to_string(),
                },
                ResumeExperience {
                    id: new_entry_id(),
                    role: "Frontend Developer".to_string(),
                    company: "WebSolutions LLC".to_string(),
                    location: "Austin, TX".to_string(),
                    start_date: "2019-06".to_string(),
                    end_date: "2022-02".to_string(),
                    current: false,
                    description: "• Developed responsive websites for over 20 clients using \
                        React and Redux.\n• Integrated RESTful APIs and optimized frontend \
                        performance."
                        .to_string(),
                },
            ],
            education: vec![ResumeEducation {
                id: new_entry_id(),
                degree: "B.S. Computer Science".to_string(),
                school: "University of Texas at Austin".to_string(),
                location: "Austin, TX".to_string(),
                start_date: "2015-08".to_string(),
                end_date: "2019-05".to_string(),
            }],
            projects: vec![],
        };
        if !session.name.is_empty() {
            resume.full_name = session.name.clone();
        }
        if !session.email.is_empty() {
            resume.email = session.email.clone();
        }
        resume
    }

    /// Overlays an extraction onto this résumé. Lists present in the
    /// extraction replace the current ones; every entry ends up with an id.
    pub fn merge_extracted(&mut self, extracted: ExtractedResume) {
        let ExtractedResume {
            full_name,
            email,
            phone,
            location,
            linkedin,
            website,
            summary,
            skills,
            experience,
            education,
            projects,
        } = extracted;

        let scalars = [
            (&mut self.full_name, full_name),
            (&mut self.email, email),
            (&mut self.phone, phone),
            (&mut self.location, location),
            (&mut self.linkedin, linkedin),
            (&mut self.website, website),
            (&mut self.summary, summary),
            (&mut self.skills, skills),
        ];
        for (field, value) in scalars {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(list) = experience {
            self.experience = list;
        }
        if let Some(list) = education {
            self.education = list;
        }
        if let Some(list) = projects {
            self.projects = list;
        }
        self.ensure_entry_ids();
    }

    /// Applies the invariants every stored résumé holds: unique entry ids and
    /// no empty avatar string.
    pub fn normalize(&mut self) {
        self.ensure_entry_ids();
        if self.avatar.as_deref().is_some_and(|a| a.trim().is_empty()) {
            self.avatar = None;
        }
    }

    pub fn ensure_entry_ids(&mut self) {
        ensure_ids(&mut self.experience);
        ensure_ids(&mut self.education);
        ensure_ids(&mut self.projects);
    }

    /// Narrative fed to summary generation: one line per experience entry.
    pub fn experience_narrative(&self) -> String {
        self.experience
            .iter()
            .map(|e| format!("{} at {}: {}", e.role, e.company, e.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Most recent role, used as the target role for summary generation.
    pub fn current_role(&self) -> &str {
        self.experience
            .first()
            .map(|e| e.role.as_str())
            .filter(|r| !r.is_empty())
            .unwrap_or("Professional")
    }

    pub fn entry_description_mut(&mut self, section: ResumeSection, id: &str) -> Option<&mut String> {
        match section {
            ResumeSection::Experience => find_mut(&mut self.experience, id)?.description_mut(),
            ResumeSection::Education => find_mut(&mut self.education, id)?.description_mut(),
            ResumeSection::Projects => find_mut(&mut self.projects, id)?.description_mut(),
        }
    }

    /// Removes an entry; returns whether one was found.
    pub fn remove_entry(&mut self, section: ResumeSection, id: &str) -> bool {
        match section {
            ResumeSection::Experience => remove_by_id(&mut self.experience, id),
            ResumeSection::Education => remove_by_id(&mut self.education, id),
            ResumeSection::Projects => remove_by_id(&mut self.projects, id),
        }
    }

    /// Moves an entry to `to_index` (clamped to the list bounds).
    pub fn move_entry(&mut self, section: ResumeSection, id: &str, to_index: usize) -> bool {
        match section {
            ResumeSection::Experience => move_by_id(&mut self.experience, id, to_index),
            ResumeSection::Education => move_by_id(&mut self.education, id, to_index),
            ResumeSection::Projects => move_by_id(&mut self.projects, id, to_index),
        }
    }
}

pub fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}

/// Gives a fresh id to every entry whose id is blank or already taken
/// earlier in the same list.
fn ensure_ids<T: ResumeEntry>(entries: &mut [T]) {
    let mut seen = HashSet::new();
    for entry in entries.iter_mut() {
        if entry.id().trim().is_empty() || seen.contains(entry.id()) {
            entry.set_id(new_entry_id());
        }
        seen.insert(entry.id().to_string());
    }
}

fn find_mut<'a, T: ResumeEntry>(entries: &'a mut [T], id: &str) -> Option<&'a mut T> {
    entries.iter_mut().find(|e| e.id() == id)
}

fn remove_by_id<T: ResumeEntry>(entries: &mut Vec<T>, id: &str) -> bool {
    let before = entries.len();
    entries.retain(|e| e.id() != id);
    entries.len() != before
}

fn move_by_id<T: ResumeEntry>(entries: &mut Vec<T>, id: &str, to_index: usize) -> bool {
    let Some(from) = entries.iter().position(|e| e.id() == id) else {
        return false;
    };
    let entry = entries.remove(from);
    let to = to_index.min(entries.len());
    entries.insert(to, entry);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> UserSession {
        UserSession {
            user_id: "u1".to_string(),
            name: "Sam Rivera".to_string(),
            email: "sam@example.com".to_string(),
        }
    }

    fn experience(id: &str, role: &str) -> ResumeExperience {
        ResumeExperience {
            id: id.to_string(),
            role: role.to_string(),
            company: "Acme".to_string(),
            ..ResumeExperience::default()
        }
    }

    #[test]
    fn test_duplicate_entry_ids_are_reassigned() {
        let mut resume = Resume::seeded_for(&session());
        let extracted: ExtractedResume = serde_json::from_value(serde_json::json!({
            "experience": [
                {"id": "1", "role": "A"},
                {"id": "1", "role": "B"},
                {"id": "", "role": "C"}
            ]
        }))
        .unwrap();
        resume.merge_extracted(extracted);

        let ids: Vec<&str> = resume.experience.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids[0], "1");
        assert_ne!(ids[1], "1");
        assert!(!ids[2].is_empty());
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 3);

        assert!(resume.remove_entry(ResumeSection::Experience, "1"));
        assert_eq!(resume.experience.len(), 2);
        assert_eq!(resume.experience[0].role, "B");
    }

    #[test]
    fn test_normalize_drops_empty_avatar() {
        let mut resume = Resume {
            avatar: Some(String::new()),
            experience: vec![experience("", "Engineer")],
            ..Resume::default()
        };
        resume.normalize();
        assert_eq!(resume.avatar, None);
        assert!(!resume.experience[0].id.is_empty());

        resume.avatar = Some("data:image/png;base64,AAAA".to_string());
        resume.normalize();
        assert!(resume.avatar.is_some());
    }

    #[test]
    fn test_seeded_resume_carries_identity() {
        let resume = Resume::seeded_for(&session());
        assert_eq!(resume.full_name, "Sam Rivera");
        assert_eq!(resume.email, "sam@example.com");
        assert!(resume.experience.is_empty());
    }

    #[test]
    fn test_demo_resume_prefers_session_identity() {
        let resume = Resume::demo_for(&session());
        assert_eq!(resume.full_name, "Sam Rivera");
        assert_eq!(resume.experience.len(), 2);
        assert!(resume.experience.iter().all(|e| !e.id.is_empty()));
    }

    #[test]
    fn test_merge_extracted_assigns_unique_ids() {
        let mut resume = Resume::seeded_for(&session());
        let extracted = ExtractedResume {
            summary: Some("Builder of things".to_string()),
            experience: Some(vec![experience("", "Engineer"), experience("", "Lead")]),
            projects: Some(vec![ResumeProject {
                name: "Radar".to_string(),
                ..ResumeProject::default()
            }]),
            ..ExtractedResume::default()
        };
        resume.merge_extracted(extracted);

        assert_eq!(resume.summary, "Builder of things");
        assert_eq!(resume.full_name, "Sam Rivera");
        assert_eq!(resume.experience.len(), 2);
        assert!(!resume.experience[0].id.is_empty());
        assert_ne!(resume.experience[0].id, resume.experience[1].id);
        assert!(!resume.projects[0].id.is_empty());
    }

    #[test]
    fn test_merge_extracted_keeps_existing_ids_and_absent_lists() {
        let mut resume = Resume::seeded_for(&session());
        resume.education.push(ResumeEducation {
            id: "edu-1".to_string(),
            ..ResumeEducation::default()
        });
        resume.merge_extracted(ExtractedResume {
            experience: Some(vec![experience("keep-me", "Engineer")]),
            ..ExtractedResume::default()
        });
        assert_eq!(resume.experience[0].id, "keep-me");
        assert_eq!(resume.education[0].id, "edu-1");
    }

    #[test]
    fn test_move_entry_reorders() {
        let mut resume = Resume::default();
        resume.experience = vec![
            experience("a", "A"),
            experience("b", "B"),
            experience("c", "C"),
        ];
        assert!(resume.move_entry(ResumeSection::Experience, "c", 0));
        let order: Vec<_> = resume.experience.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert!(resume.move_entry(ResumeSection::Experience, "c", 99));
        assert_eq!(resume.experience[2].id, "c");
        assert!(!resume.move_entry(ResumeSection::Experience, "zzz", 0));
    }

    #[test]
    fn test_remove_entry_targets_id() {
        let mut resume = Resume::default();
        resume.experience = vec![experience("a", "A"), experience("b", "B")];
        assert!(resume.remove_entry(ResumeSection::Experience, "a"));
        assert!(!resume.remove_entry(ResumeSection::Experience, "a"));
        assert_eq!(resume.experience.len(), 1);
    }

    #[test]
    fn test_education_has_no_description() {
        let mut resume = Resume::default();
        resume.education.push(ResumeEducation {
            id: "e".to_string(),
            ..ResumeEducation::default()
        });
        assert!(resume
            .entry_description_mut(ResumeSection::Education, "e")
            .is_none());
    }

    #[test]
    fn test_current_role_falls_back() {
        let mut resume = Resume::default();
        assert_eq!(resume.current_role(), "Professional");
        resume.experience.push(experience("a", "Staff Engineer"));
        assert_eq!(resume.current_role(), "Staff Engineer");
    }
}
