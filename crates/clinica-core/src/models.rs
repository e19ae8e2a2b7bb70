//! 核心数据模型定义
//!
//! JSON 字段名沿用客户端既有的西班牙语键（`nombre`、`edad` 等）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClinicaError, Result};

/// 实体主键
pub type EntityId = i64;

/// 医生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: EntityId,
    pub dni: Option<String>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "especialidad")]
    pub specialty: Option<String>,
}

/// 患者，始终归属于一名医生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: EntityId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "edad")]
    pub age: i32,
    #[serde(rename = "especialidad")]
    pub specialty: Option<String>,
    pub dni: Option<String>,
    #[serde(rename = "medico")]
    pub doctor: Doctor,
}

/// 影像元数据（不含二进制内容）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: EntityId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "fecha")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(rename = "paciente")]
    pub patient: Patient,
    /// 最近一次预测结果
    #[serde(rename = "prediccion", default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
}

/// 影像二进制内容
#[derive(Debug, Clone)]
pub struct ImageContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 诊断报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: EntityId,
    #[serde(rename = "prediccion")]
    pub prediction: String,
    #[serde(rename = "contenido")]
    pub content: Option<String>,
    #[serde(rename = "imagen")]
    pub image: Image,
}

/// 分类器输出
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: u8,
    pub score: f64,
}

impl Classification {
    pub const NOT_CANCER: u8 = 0;
    pub const CANCER: u8 = 1;

    pub fn new(label: u8, score: f64) -> Self {
        Self { label, score }
    }

    /// 生成返回给客户端的预测文本。
    ///
    /// 阴性结果中的双空格是既有客户端依赖的线上格式，保持不变。
    /// 分数按最短往返形式输出，整数值保留 `.0`（`1.0` 而不是 `1`）。
    pub fn prediction_text(&self) -> Result<String> {
        if !self.score.is_finite() {
            return Err(ClinicaError::Classifier(format!(
                "non-finite score: {}",
                self.score
            )));
        }

        match self.label {
            Self::NOT_CANCER => Ok(format!("Not cancer (label 0),  score: {:?}", self.score)),
            Self::CANCER => Ok(format!("Cancer (label 1), score: {:?}", self.score)),
            other => Err(ClinicaError::Classifier(format!("unknown label: {}", other))),
        }
    }
}
