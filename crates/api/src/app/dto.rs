use serde::{Deserialize, Serialize};

use shopkeeper_core::{CompanyId, UserId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockLevelsQuery {
    pub location: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub company_id: CompanyId,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}
