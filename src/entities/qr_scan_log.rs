use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
#[serde(rename_all = "snake_case")]
pub enum ScanResult {
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "already_checked_in")]
    AlreadyCheckedIn,
    #[sea_orm(string_value = "not_found")]
    NotFound,
    #[sea_orm(string_value = "wrong_cafe")]
    WrongCafe,
    #[sea_orm(string_value = "invalid_status")]
    InvalidStatus,
}

/// Write-once; rows are never updated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "qr_scan_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub cafe_id: Uuid,
    pub scanned_by: Uuid,
    #[sea_orm(column_type = "Text")]
    pub scanned_code: String,
    pub result: ScanResult,
    pub processing_ms: i64,
    pub error_message: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
