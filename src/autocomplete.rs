//! # Autocomplete
//!
//! Builds the tree the frontend walks for incremental search suggestions.
//!
//! ```text
//! subject_prefix
//! └── course_number
//!     └── academic_session
//!         └── section_number
//!             └── [professor, ...]
//! ```
//!
//! ## Join
//!
//! The store runs [`join_pipeline`] against `courses`: sections are looked up by
//! id membership, then professors by id membership, unwinding each lookup while
//! keeping parents that have no children. The result is one flat [`JoinRow`]
//! per (course, section, professor) combination.
//!
//! - A course with no sections still yields one row, with the section and
//!   professor fields empty.
//! - A section with no professors still yields one row, with the professor
//!   fields empty.
//!
//! ## Grouping
//!
//! [`build_tree`] regroups the rows in four passes: section, session, course,
//! subject. Each pass is a single scan keyed on the exact field tuple for its
//! level, so equal keys always merge and unequal keys never do.
//!
//! - Groups come out in the order their key was first seen.
//! - Professors are kept in row order, duplicates included.
//! - Empty input gives an empty tree.
use std::{
    collections::{HashMap, hash_map::Entry},
    hash::Hash,
};

use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AcademicSession {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfessorRef {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JoinRow {
    pub subject_prefix: String,
    pub course_number: String,
    #[serde(default)]
    pub academic_session: Option<AcademicSession>,
    #[serde(default)]
    pub section_number: Option<String>,
    #[serde(default)]
    pub professor: Option<ProfessorRef>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SectionGroup {
    pub section_number: Option<String>,
    pub professors: Vec<ProfessorRef>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionGroup {
    pub academic_session: AcademicSession,
    pub sections: Vec<SectionGroup>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CourseGroup {
    pub course_number: String,
    pub academic_sessions: Vec<SessionGroup>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroup {
    pub subject_prefix: String,
    pub course_numbers: Vec<CourseGroup>,
}

type SectionKey = (String, String, AcademicSession, Option<String>);
type SessionKey = (String, String, AcademicSession);
type CourseKey = (String, String);

/// Flattens `courses` into one document per (course, section, professor).
pub fn join_pipeline() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": "sections",
                "localField": "sections",
                "foreignField": "_id",
                "as": "section",
            }
        },
        doc! {
            "$unwind": {
                "path": "$section",
                "preserveNullAndEmptyArrays": true,
            }
        },
        doc! {
            "$lookup": {
                "from": "professors",
                "localField": "section.professors",
                "foreignField": "_id",
                "as": "professor",
            }
        },
        doc! {
            "$unwind": {
                "path": "$professor",
                "preserveNullAndEmptyArrays": true,
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "subject_prefix": "$subject_prefix",
                "course_number": "$course_number",
                "academic_session.name": "$section.academic_session.name",
                "section_number": "$section.section_number",
                "professor": {
                    "first_name": "$professor.first_name",
                    "last_name": "$professor.last_name",
                },
            }
        },
    ]
}

/// Groups rows into the autocomplete tree, keeping first-seen order at every
/// level and every professor a row carries, duplicates included.
pub fn build_tree<I>(rows: I) -> Vec<SubjectGroup>
where
    I: IntoIterator<Item = JoinRow>,
{
    let sections = group(rows.into_iter().map(|row| {
        let key: SectionKey = (
            row.subject_prefix,
            row.course_number,
            row.academic_session.unwrap_or_default(),
            row.section_number,
        );

        (key, row.professor.unwrap_or_default())
    }));

    let sessions = group(sections.into_iter().map(
        |((subject_prefix, course_number, academic_session, section_number), professors)| {
            let key: SessionKey = (subject_prefix, course_number, academic_session);

            (
                key,
                SectionGroup {
                    section_number,
                    professors,
                },
            )
        },
    ));

    let courses = group(sessions.into_iter().map(
        |((subject_prefix, course_number, academic_session), sections)| {
            let key: CourseKey = (subject_prefix, course_number);

            (
                key,
                SessionGroup {
                    academic_session,
                    sections,
                },
            )
        },
    ));

    let subjects = group(courses.into_iter().map(
        |((subject_prefix, course_number), academic_sessions)| {
            (
                subject_prefix,
                CourseGroup {
                    course_number,
                    academic_sessions,
                },
            )
        },
    ));

    subjects
        .into_iter()
        .map(|(subject_prefix, course_numbers)| SubjectGroup {
            subject_prefix,
            course_numbers,
        })
        .collect()
}

/// Single-pass grouping that keeps keys in first-seen order.
fn group<K, V, I>(items: I) -> Vec<(K, Vec<V>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = (K, V)>,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<V>)> = Vec::new();

    for (key, value) in items {
        match positions.entry(key) {
            Entry::Occupied(entry) => groups[*entry.get()].1.push(value),
            Entry::Vacant(entry) => {
                groups.push((entry.key().clone(), vec![value]));
                entry.insert(groups.len() - 1);
            }
        }
    }

    groups
}
