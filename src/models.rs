//! # Records
//!
//! Catalog documents as served by the record endpoints.
//!
//! Decoding is lenient: unknown fields are ignored, and anything missing or
//! `null` comes back as `null` or an empty list. Only `_id` is required.
//!
//! Object ids always leave the API as 24 character hex strings, including ids
//! nested inside free-form fields. Dates leave as RFC 3339 strings.
use mongodb::bson::{Bson, Document, oid::ObjectId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Query parameters a search endpoint turns into store predicates.
pub struct FilterFields {
    pub text: &'static [&'static str],
    pub ids: &'static [&'static str],
}

pub const COURSE_FILTER: FilterFields = FilterFields {
    text: &[
        "course_number",
        "subject_prefix",
        "title",
        "description",
        "school",
        "credit_hours",
        "class_level",
        "activity_type",
        "grading",
        "internal_course_number",
        "lecture_contact_hours",
        "laboratory_contact_hours",
        "offering_frequency",
        "catalog_year",
    ],
    ids: &["sections"],
};

pub const SECTION_FILTER: FilterFields = FilterFields {
    text: &[
        "section_number",
        "academic_session.name",
        "instruction_mode",
        "syllabus_uri",
    ],
    ids: &["course_reference", "professors", "teaching_assistants"],
};

pub const PROFESSOR_FILTER: FilterFields = FilterFields {
    text: &[
        "first_name",
        "last_name",
        "titles",
        "email",
        "phone_number",
        "office.building",
        "office.room",
        "profile_uri",
        "image_uri",
    ],
    ids: &["sections"],
};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Course {
    #[serde(rename = "_id", serialize_with = "hex")]
    pub id: ObjectId,
    #[serde(default)]
    pub subject_prefix: Option<String>,
    #[serde(default)]
    pub course_number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub credit_hours: Option<String>,
    #[serde(default)]
    pub class_level: Option<String>,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub grading: Option<String>,
    #[serde(default)]
    pub internal_course_number: Option<String>,
    #[serde(default)]
    pub catalog_year: Option<String>,
    #[serde(default, serialize_with = "json_option")]
    pub prerequisites: Option<Bson>,
    #[serde(default, serialize_with = "json_option")]
    pub corequisites: Option<Bson>,
    #[serde(default, deserialize_with = "nullable", serialize_with = "hex_list")]
    pub sections: Vec<ObjectId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Session {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, serialize_with = "json_option")]
    pub start_date: Option<Bson>,
    #[serde(default, serialize_with = "json_option")]
    pub end_date: Option<Bson>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Section {
    #[serde(rename = "_id", serialize_with = "hex")]
    pub id: ObjectId,
    #[serde(default)]
    pub section_number: Option<String>,
    #[serde(default, serialize_with = "hex_option")]
    pub course_reference: Option<ObjectId>,
    #[serde(default, deserialize_with = "nullable")]
    pub academic_session: Session,
    #[serde(default, deserialize_with = "nullable", serialize_with = "hex_list")]
    pub professors: Vec<ObjectId>,
    #[serde(default, deserialize_with = "nullable", serialize_with = "json_list")]
    pub teaching_assistants: Vec<Document>,
    #[serde(default)]
    pub instruction_mode: Option<String>,
    #[serde(default, deserialize_with = "nullable", serialize_with = "json_list")]
    pub meetings: Vec<Document>,
    #[serde(default, deserialize_with = "nullable")]
    pub core_flags: Vec<String>,
    #[serde(default)]
    pub syllabus_uri: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub grade_distribution: Vec<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Professor {
    #[serde(rename = "_id", serialize_with = "hex")]
    pub id: ObjectId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub titles: Vec<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default, serialize_with = "json_document")]
    pub office: Option<Document>,
    #[serde(default)]
    pub profile_uri: Option<String>,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default, deserialize_with = "nullable", serialize_with = "json_list")]
    pub office_hours: Vec<Document>,
    #[serde(default, deserialize_with = "nullable", serialize_with = "hex_list")]
    pub sections: Vec<ObjectId>,
}

/// Evaluation documents vary by term, so everything past the ids is passed
/// through as JSON.
#[derive(Serialize, Debug, Clone)]
pub struct Evaluation {
    #[serde(rename = "_id", serialize_with = "hex")]
    pub id: ObjectId,
    #[serde(serialize_with = "hex")]
    pub section: ObjectId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TryFrom<Document> for Evaluation {
    type Error = AppError;

    fn try_from(mut document: Document) -> Result<Self, Self::Error> {
        let id = take_object_id(&mut document, "_id")?;
        let section = take_object_id(&mut document, "section")?;

        let fields = document
            .iter()
            .map(|(key, value)| (key.clone(), to_json(value)))
            .collect();

        Ok(Self {
            id,
            section,
            fields,
        })
    }
}

fn take_object_id(document: &mut Document, key: &str) -> Result<ObjectId, AppError> {
    match document.remove(key) {
        Some(Bson::ObjectId(id)) => Ok(id),
        Some(other) => Err(AppError::MalformedRow(format!(
            "field {key} is not an object id: {other}"
        ))),
        None => Err(AppError::MalformedRow(format!("missing field {key}"))),
    }
}

/// Relaxed extended JSON, except object ids become hex strings and dates
/// become RFC 3339 strings.
fn to_json(value: &Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(date) => match date.try_to_rfc3339_string() {
            Ok(date) => Value::String(date),
            Err(_) => value.clone().into_relaxed_extjson(),
        },
        Bson::Document(document) => Value::Object(
            document
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect(),
        ),
        Bson::Array(values) => Value::Array(values.iter().map(to_json).collect()),
        other => other.clone().into_relaxed_extjson(),
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn json_option<S: Serializer>(value: &Option<Bson>, serializer: S) -> Result<S::Ok, S::Error> {
    value.as_ref().map(to_json).serialize(serializer)
}

fn json_document<S: Serializer>(
    document: &Option<Document>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    document
        .as_ref()
        .map(|document| to_json(&Bson::Document(document.clone())))
        .serialize(serializer)
}

fn json_list<S: Serializer>(documents: &[Document], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(
        documents
            .iter()
            .map(|document| to_json(&Bson::Document(document.clone()))),
    )
}

fn hex<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_hex())
}

fn hex_option<S: Serializer>(id: &Option<ObjectId>, serializer: S) -> Result<S::Ok, S::Error> {
    match id {
        Some(id) => serializer.serialize_str(&id.to_hex()),
        None => serializer.serialize_none(),
    }
}

fn hex_list<S: Serializer>(ids: &[ObjectId], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(ids.iter().map(|id| id.to_hex()))
}
