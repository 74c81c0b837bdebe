use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AdminUser, OptionalAuth},
    state::AppState,
};
use crate::error::{AppError, Result};
use crate::models::{
    course::{Course, CourseFilter, CreateCourseData, CurriculumModule, UpdateCourseData},
    pagination::Page,
};
use crate::validation::{slugify, Validator};

const LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Deserialize)]
pub struct ListCoursesQuery {
    pub category: Option<String>,
    pub level: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
    pub instructor: String,
    pub price: i64,
    pub level: String,
    pub category: String,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub curriculum: Vec<CurriculumModule>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub price: Option<i64>,
    pub level: Option<String>,
    pub category: Option<String>,
    pub thumbnail_url: Option<String>,
    pub curriculum: Option<Vec<CurriculumModule>>,
    pub is_published: Option<bool>,
}

fn validate_curriculum(v: &mut Validator, curriculum: &[CurriculumModule]) {
    for (i, module) in curriculum.iter().enumerate() {
        if module.title.trim().is_empty() {
            v.add(&format!("curriculum[{}].title", i), "is required");
        }
        for (j, lesson) in module.lessons.iter().enumerate() {
            if lesson.title.trim().is_empty() {
                v.add(&format!("curriculum[{}].lessons[{}].title", i, j), "is required");
            }
            if lesson.duration_minutes < 0 {
                v.add(
                    &format!("curriculum[{}].lessons[{}].duration_minutes", i, j),
                    "must not be negative",
                );
            }
        }
    }
}

fn validate_level(v: &mut Validator, level: &str) {
    if !LEVELS.contains(&level) {
        v.add("level", "must be one of beginner, intermediate, advanced");
    }
}

/// Explicit slug if given, otherwise derived from the title
fn resolve_slug(slug: Option<&str>, title: &str) -> String {
    match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => slugify(s),
        None => slugify(title),
    }
}

/// Public callers only see published courses; admins see everything.
async fn list_courses(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(query): Query<ListCoursesQuery>,
) -> Result<Json<Vec<Course>>> {
    let filter = CourseFilter {
        category: query.category,
        level: query.level,
        published_only: !auth.is_admin(),
    };
    let courses = Course::list(&state.pool, &filter, Page::new(query.page, query.limit)).await?;

    Ok(Json(courses))
}

async fn get_course(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Course>> {
    let course = Course::find_by_id(&state.pool, id)
        .await?
        .filter(|c| c.is_published || auth.is_admin())
        .ok_or_else(|| AppError::not_found("Course"))?;

    Ok(Json(course))
}

async fn create_course(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(req): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Course>)> {
    let slug = resolve_slug(req.slug.as_deref(), &req.title);

    let mut v = Validator::new();
    v.required("title", &req.title)
        .max_len("title", &req.title, 200)
        .required("description", &req.description)
        .required("instructor", &req.instructor)
        .required("category", &req.category)
        .non_negative("price", req.price);
    if slug.is_empty() {
        v.add("slug", "must contain at least one letter or digit");
    }
    validate_level(&mut v, &req.level);
    validate_curriculum(&mut v, &req.curriculum);
    v.finish()?;

    let course = Course::create(
        &state.pool,
        CreateCourseData {
            title: req.title.trim().to_string(),
            slug,
            description: req.description,
            instructor: req.instructor.trim().to_string(),
            price: req.price,
            level: req.level,
            category: req.category.trim().to_string(),
            thumbnail_url: req.thumbnail_url,
            curriculum: req.curriculum,
            is_published: req.is_published,
        },
    )
    .await?;

    tracing::info!(course_id = %course.id, admin_id = %admin.id, slug = %course.slug, "Course created");

    Ok((StatusCode::CREATED, Json(course)))
}

async fn update_course(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>> {
    let mut v = Validator::new();
    v.not_blank("title", req.title.as_deref())
        .not_blank("description", req.description.as_deref())
        .not_blank("instructor", req.instructor.as_deref())
        .not_blank("category", req.category.as_deref());
    if let Some(price) = req.price {
        v.non_negative("price", price);
    }
    if let Some(level) = &req.level {
        validate_level(&mut v, level);
    }
    if let Some(curriculum) = &req.curriculum {
        validate_curriculum(&mut v, curriculum);
    }
    let slug = req.slug.as_deref().map(slugify);
    if matches!(&slug, Some(s) if s.is_empty()) {
        v.add("slug", "must contain at least one letter or digit");
    }
    v.finish()?;

    let course = Course::update(
        &state.pool,
        id,
        UpdateCourseData {
            title: req.title.map(|t| t.trim().to_string()),
            slug,
            description: req.description,
            instructor: req.instructor,
            price: req.price,
            level: req.level,
            category: req.category,
            thumbnail_url: req.thumbnail_url,
            curriculum: req.curriculum,
            is_published: req.is_published,
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Course"))?;

    tracing::info!(course_id = %course.id, "Course updated");

    Ok(Json(course))
}

async fn toggle_publish(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Course>> {
    let course = Course::toggle_published(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Course"))?;

    tracing::info!(course_id = %course.id, published = course.is_published, "Course publish toggled");

    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !Course::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Course"));
    }

    tracing::info!(course_id = %id, "Course deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/courses", get(list_courses).post(create_course))
        .route(
            "/api/v1/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/api/v1/courses/:id/publish", patch(toggle_publish))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::Lesson;

    #[test]
    fn test_resolve_slug() {
        assert_eq!(resolve_slug(None, "Portrait Lighting 101"), "portrait-lighting-101");
        assert_eq!(resolve_slug(Some("  "), "Night Sky"), "night-sky");
        assert_eq!(resolve_slug(Some("My Custom Slug"), "ignored"), "my-custom-slug");
    }

    #[test]
    fn test_curriculum_validation() {
        let curriculum = vec![CurriculumModule {
            title: " ".to_string(),
            lessons: vec![Lesson {
                title: "".to_string(),
                duration_minutes: -1,
                video_url: None,
            }],
        }];

        let mut v = Validator::new();
        validate_curriculum(&mut v, &curriculum);
        match v.finish() {
            Err(AppError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(
                    names,
                    vec![
                        "curriculum[0].title",
                        "curriculum[0].lessons[0].title",
                        "curriculum[0].lessons[0].duration_minutes",
                    ]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
