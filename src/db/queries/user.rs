use axum::{
    extract::{Extension, Multipart, Path as AxumPath, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::api::auth::Claims;
use crate::config::Config;
use crate::db::models::user::{UpdateUserRequest, UserPage, UserProfile};
use crate::utils::api_response::ApiResponse;
use crate::utils::pagination::Pagination;
use crate::utils::policy::can_access;

const PROFILE_COLUMNS: &str =
    "id, name, email, role, image, department, phone, google_linked, created_at";

/// Content type for a stored image, from its filename extension. The
/// upload path keeps the original filename, so the extension is the
/// only format hint on disk.
fn image_content_type(path: &str) -> &'static str {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Own profile, credentials excluded.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = UserProfile),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<UserProfile>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Database query failed", e))?
    .ok_or_else(|| ApiResponse::not_found("User not found"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Profile retrieved successfully",
        profile,
    ))
}

/// Partial profile update for the user themselves or an admin. A
/// password change on the self path must carry the current password;
/// admins may set one without it.
#[utoipa::path(
    put,
    path = "/users/{user_id}",
    tag = "Users",
    params(
        ("user_id" = i32, Path, description = "ID of the user to update"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = UserProfile),
        (status = 401, description = "Current password incorrect"),
        (status = 403, description = "Not the user or an admin"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(user_id): AxumPath<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<ApiResponse<UserProfile>, ApiResponse<()>> {
    if !can_access(&claims, user_id) {
        return Err(ApiResponse::forbidden(
            "You may only update your own profile",
        ));
    }

    let mut new_password_hash: Option<String> = None;
    if let Some(new_password) = payload.new_password.as_deref() {
        if new_password.is_empty() {
            return Err(ApiResponse::error(
                StatusCode::BAD_REQUEST,
                "New password must not be empty",
                None,
            ));
        }

        if !claims.is_admin() {
            let stored: Option<String> =
                sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                    .bind(user_id)
                    .fetch_optional(&pool)
                    .await
                    .map_err(|e| ApiResponse::db_error("Database query failed", e))?;

            let Some(stored) = stored else {
                return Err(ApiResponse::not_found("User not found"));
            };

            let current = payload.current_password.as_deref().unwrap_or("");
            if !verify(current, &stored).unwrap_or(false) {
                return Err(ApiResponse::error(
                    StatusCode::UNAUTHORIZED,
                    "Current password is incorrect",
                    None,
                ));
            }
        }

        new_password_hash = Some(hash(new_password, DEFAULT_COST).map_err(|e| {
            ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password hashing failed",
                Some(json!({ "error": e.to_string() })),
            )
        })?);
    }

    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "UPDATE users SET name = COALESCE($1, name), \
         department = COALESCE($2, department), \
         phone = COALESCE($3, phone), \
         password_hash = COALESCE($4, password_hash), \
         updated_at = NOW() \
         WHERE id = $5 RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(&payload.name)
    .bind(&payload.department)
    .bind(&payload.phone)
    .bind(&new_password_hash)
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to update profile", e))?
    .ok_or_else(|| ApiResponse::not_found("User not found"))?;

    info!(user = user_id, "profile updated");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Profile updated successfully",
        profile,
    ))
}

/// Multipart profile-image upload, stored on local disk under the
/// configured upload directory. The stored relative path lands on the
/// user row.
#[utoipa::path(
    post,
    path = "/users/{user_id}/image",
    tag = "Users",
    params(
        ("user_id" = i32, Path, description = "ID of the user"),
    ),
    responses(
        (status = 200, description = "Image uploaded successfully", body = String),
        (status = 400, description = "No image file uploaded"),
        (status = 403, description = "Not the user or an admin"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn upload_profile_image(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(user_id): AxumPath<i32>,
    mut multipart: Multipart,
) -> Result<ApiResponse<String>, ApiResponse<()>> {
    if !can_access(&claims, user_id) {
        return Err(ApiResponse::forbidden(
            "You may only update your own profile image",
        ));
    }

    let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Database query failed", e))?;
    if exists.is_none() {
        return Err(ApiResponse::not_found("User not found"));
    }

    let images_dir = Config::get().upload_storage_path.join(user_id.to_string());
    fs::create_dir_all(&images_dir).await.map_err(|e| {
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create upload directory",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    let mut stored_path: Option<String> = None;
    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Failed to process multipart data",
            Some(json!({ "error": e.to_string() })),
        )
    })? {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let file_path = images_dir.join(format!("{}_{}", Uuid::new_v4(), filename));
        let mut file = fs::File::create(&file_path).await.map_err(|e| {
            ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create image file",
                Some(json!({ "error": e.to_string() })),
            )
        })?;

        while let Some(chunk) = field.chunk().await.map_err(|e| {
            ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read image data",
                Some(json!({ "error": e.to_string() })),
            )
        })? {
            file.write_all(&chunk).await.map_err(|e| {
                ApiResponse::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to write image file",
                    Some(json!({ "error": e.to_string() })),
                )
            })?;
        }

        stored_path = Some(file_path.to_string_lossy().into_owned());
        break; // one profile image per upload
    }

    let Some(stored_path) = stored_path else {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "No image file uploaded",
            None,
        ));
    };

    sqlx::query("UPDATE users SET image = $1, updated_at = NOW() WHERE id = $2")
        .bind(&stored_path)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to store image path", e))?;

    info!(user = user_id, "profile image uploaded");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Image uploaded successfully",
        stored_path,
    ))
}

/// Streams a user's profile image from disk.
#[utoipa::path(
    get,
    path = "/users/{user_id}/image",
    tag = "Users",
    params(
        ("user_id" = i32, Path, description = "ID of the user"),
    ),
    responses(
        (status = 200, description = "Image retrieved successfully"),
        (status = 404, description = "Image not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_profile_image(
    State(pool): State<PgPool>,
    Extension(_claims): Extension<Claims>,
    AxumPath(user_id): AxumPath<i32>,
) -> Result<impl IntoResponse, StatusCode> {
    let image: Option<Option<String>> =
        sqlx::query_scalar("SELECT image FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&pool)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let Some(Some(path)) = image else {
        return Err(StatusCode::NOT_FOUND);
    };

    if fs::metadata(&path).await.is_err() {
        return Err(StatusCode::NOT_FOUND);
    }

    let file = fs::File::open(&path)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let stream = ReaderStream::new(file);

    axum::response::Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", image_content_type(&path))
        .body(axum::body::Body::from_stream(stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Admin listing of all users, paginated.
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Users",
    params(UserListParams),
    responses(
        (status = 200, description = "Users retrieved successfully", body = UserPage),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(pool): State<PgPool>,
    Extension(_claims): Extension<Claims>,
    Query(params): Query<UserListParams>,
) -> Result<ApiResponse<UserPage>, ApiResponse<()>> {
    let pg = Pagination::clamp(params.page, params.limit);

    let users = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
    ))
    .bind(pg.limit)
    .bind(pg.offset())
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to list users", e))?;

    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to count users", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Users retrieved successfully",
        UserPage {
            users,
            total_count,
            total_pages: pg.total_pages(total_count),
            page: pg.page,
            limit: pg.limit,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::image_content_type;

    #[test]
    fn content_type_follows_the_stored_extension() {
        assert_eq!(image_content_type("uploads/7/abc_avatar.png"), "image/png");
        assert_eq!(
            image_content_type("uploads/7/abc_photo.JPG"),
            "image/jpeg"
        );
        assert_eq!(
            image_content_type("uploads/7/abc_photo.jpeg"),
            "image/jpeg"
        );
        assert_eq!(image_content_type("uploads/7/abc_anim.gif"), "image/gif");
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(
            image_content_type("uploads/7/mystery"),
            "application/octet-stream"
        );
        assert_eq!(
            image_content_type("uploads/7/file.bin"),
            "application/octet-stream"
        );
    }
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(get_me, update_user, upload_profile_image, get_profile_image, list_users),
    components(
        schemas(UserProfile, UpdateUserRequest, UserPage)
    ),
    tags(
        (name = "Users", description = "User Profile Endpoints")
    )
)]
pub struct UserDoc;
