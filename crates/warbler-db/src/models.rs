/// Database row types — these map directly to SQLite rows.
/// Distinct from the warbler-types view models so the DB layer stays
/// independent; the password hash only ever appears on `UserRow`.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub created_at: String,
    pub like_count: i64,
}
