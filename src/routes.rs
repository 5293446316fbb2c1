use std::sync::Arc;

use axum::{
    Json,
    extract::{self, Path, Query},
};
use mongodb::bson::{Document, doc};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    autocomplete::{JoinRow, SubjectGroup, build_tree, join_pipeline},
    database::{COURSES, EVALUATIONS, PROFESSORS, SECTIONS},
    error::AppError,
    models::{
        COURSE_FILTER, Course, Evaluation, FilterFields, PROFESSOR_FILTER, Professor,
        SECTION_FILTER, Section,
    },
    responses::Envelope,
    state::State,
    utils::{decode, decode_all, filter_query, pagination, parse_object_id},
};

type AppState = extract::State<Arc<State>>;
type Params = Query<Vec<(String, String)>>;
type Reply<T> = Result<Json<Envelope<T>>, AppError>;

pub async fn course_search(
    extract::State(state): AppState,
    Query(params): Params,
) -> Reply<Vec<Course>> {
    search(&state, COURSES, &params, &COURSE_FILTER).await
}

pub async fn course_all(extract::State(state): AppState) -> Reply<Vec<Course>> {
    all(&state, COURSES).await
}

pub async fn course_by_id(
    extract::State(state): AppState,
    Path(id): Path<String>,
) -> Reply<Course> {
    by_id(&state, COURSES, &id, "course").await
}

pub async fn section_search(
    extract::State(state): AppState,
    Query(params): Params,
) -> Reply<Vec<Section>> {
    search(&state, SECTIONS, &params, &SECTION_FILTER).await
}

pub async fn section_by_id(
    extract::State(state): AppState,
    Path(id): Path<String>,
) -> Reply<Section> {
    by_id(&state, SECTIONS, &id, "section").await
}

pub async fn section_evaluation(
    extract::State(state): AppState,
    Path(id): Path<String>,
) -> Reply<Evaluation> {
    let section = parse_object_id(&id)?;

    let document = state
        .find_one(EVALUATIONS, doc! { "section": section })
        .await?
        .ok_or(AppError::NotFound("evaluation"))?;

    Ok(Json(Envelope::success(Evaluation::try_from(document)?)))
}

pub async fn professor_search(
    extract::State(state): AppState,
    Query(params): Params,
) -> Reply<Vec<Professor>> {
    search(&state, PROFESSORS, &params, &PROFESSOR_FILTER).await
}

pub async fn professor_all(extract::State(state): AppState) -> Reply<Vec<Professor>> {
    all(&state, PROFESSORS).await
}

pub async fn professor_by_id(
    extract::State(state): AppState,
    Path(id): Path<String>,
) -> Reply<Professor> {
    by_id(&state, PROFESSORS, &id, "professor").await
}

pub async fn autocomplete_dag(extract::State(state): AppState) -> Reply<Vec<SubjectGroup>> {
    let documents = state.aggregate(COURSES, join_pipeline()).await?;
    let rows: Vec<JoinRow> = decode_all(documents)?;

    debug!("Building autocomplete tree from {} rows", rows.len());

    Ok(Json(Envelope::success(build_tree(rows))))
}

async fn search<T: DeserializeOwned>(
    state: &State,
    collection: &str,
    params: &[(String, String)],
    fields: &FilterFields,
) -> Reply<Vec<T>> {
    let filter = filter_query(params, fields);
    let page = pagination(params, state.config.limit)?;

    debug!(
        "Searching {collection} with {filter} (skip {}, limit {})",
        page.skip, page.limit
    );

    let documents = state.find(collection, filter, Some(page)).await?;

    Ok(Json(Envelope::success(decode_all(documents)?)))
}

async fn all<T: DeserializeOwned>(state: &State, collection: &str) -> Reply<Vec<T>> {
    let documents = state.find(collection, Document::new(), None).await?;

    Ok(Json(Envelope::success(decode_all(documents)?)))
}

async fn by_id<T: DeserializeOwned>(
    state: &State,
    collection: &str,
    id: &str,
    entity: &'static str,
) -> Reply<T> {
    let id = parse_object_id(id)?;

    let document = state
        .find_one(collection, doc! { "_id": id })
        .await?
        .ok_or(AppError::NotFound(entity))?;

    Ok(Json(Envelope::success(decode(document)?)))
}
