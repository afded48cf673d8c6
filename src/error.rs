//! Error types shared by the entry and lobby surfaces.
//!
//! `Display` on [`LobbyError`] is the localized message shown to the user.
//! Store failure details are logged, never displayed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::types::{ItemIndex, LobbyCode, LobbyStatus, Score};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the external store itself
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("no document at lobbies/{0}")]
    Missing(LobbyCode),

    #[error("a document already exists at lobbies/{0}")]
    Exists(LobbyCode),

    #[error("value of kind {value} cannot be written to {path}")]
    TypeMismatch { path: String, value: &'static str },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The user action a store failure interrupted; selects the message shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Join,
    Load,
    StartVoting,
    Vote,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Action::Create => "Lobi oluşturulurken bir hata oluştu",
            Action::Join => "Lobiye katılırken bir hata oluştu",
            Action::Load => "Lobi yüklenirken bir hata oluştu",
            Action::StartVoting => "Oylama başlatılırken bir hata oluştu",
            Action::Vote => "Oy verilirken bir hata oluştu",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum LobbyError {
    // Validation
    #[error("Lütfen bir kullanıcı adı girin")]
    EmptyName,

    #[error("Lütfen bir lobi ID girin")]
    EmptyCode,

    #[error("Lobi ID 6 karakterli olmalı (A-Z, 0-9)")]
    MalformedCode,

    #[error("Kullanıcı adı geçersiz")]
    InvalidName,

    #[error("Puan 1 ile 5 arasında olmalı")]
    InvalidScore(Score),

    #[error("Geçersiz çikolata numarası")]
    InvalidItem(ItemIndex),

    // Not found
    #[error("Lobi bulunamadı")]
    NotFound,

    // Preconditions
    #[error("Bu lobiye artık katılamazsınız")]
    CannotJoin,

    #[error("Bu kullanıcı adı bu lobide zaten kullanılıyor")]
    NameTaken,

    #[error("Sadece lobi sahibi oylama başlatabilir")]
    NotOwner,

    #[error("Bu lobinin katılımcısı değilsiniz")]
    NotParticipant,

    #[error("Oylama bu aşamada başlatılamaz")]
    InvalidTransition { from: LobbyStatus, to: LobbyStatus },

    // External store
    #[error("{action}")]
    Store { action: Action, source: StoreError },
}

impl LobbyError {
    pub fn store(action: Action, source: StoreError) -> Self {
        tracing::error!(?action, error = %source, "Store call failed");
        LobbyError::Store { action, source }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            LobbyError::EmptyName
            | LobbyError::EmptyCode
            | LobbyError::MalformedCode
            | LobbyError::InvalidName
            | LobbyError::InvalidScore(_)
            | LobbyError::InvalidItem(_) => "INVALID_INPUT",
            LobbyError::NotFound => "NOT_FOUND",
            LobbyError::CannotJoin => "CANNOT_JOIN",
            LobbyError::NameTaken => "NAME_TAKEN",
            LobbyError::NotOwner => "UNAUTHORIZED",
            LobbyError::NotParticipant => "NOT_PARTICIPANT",
            LobbyError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LobbyError::Store { .. } => "STORE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            "INVALID_INPUT" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "UNAUTHORIZED" | "NOT_PARTICIPANT" => StatusCode::FORBIDDEN,
            "STORE_ERROR" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub msg: String,
}

impl IntoResponse for LobbyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code(),
            msg: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
