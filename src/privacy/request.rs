//! Privacy request records
//!
//! リクエストストアから受け取るリクエストの型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// データ主体リクエストの種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// アクセス権・ポータビリティ権（エクスポート）
    Export,
    /// 削除権（仮名化）
    Remove,
}

/// リクエスト処理ステータス
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// 本人確認待ち
    Pending,
    /// 確認済み
    Confirmed,
    /// 完了
    Completed,
    /// 無効
    Invalid,
}

/// A request record as supplied by the request store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyRequest {
    pub id: String,
    /// Address the request was filed from
    pub email: String,
    /// Linked account; `None` or `Some(0)` when the requester has no account
    pub subject_id: Option<u64>,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
}

impl PrivacyRequest {
    /// 新しいリクエストを作成
    pub fn new(email: impl Into<String>, subject_id: Option<u64>, request_type: RequestType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            subject_id,
            request_type,
            status: RequestStatus::Pending,
            requested_at: Utc::now(),
        }
    }

    /// Account the request targets, with id 0 treated as "no account"
    pub fn subject(&self) -> Option<u64> {
        self.subject_id.filter(|id| *id != 0)
    }
}
