//! 请求载荷与校验
//!
//! PUT 采用整体替换语义：载荷必须携带 `id` 以及全部字段（可以显式为 `null`），
//! 缺少任何键即拒绝，避免部分载荷把未提供的字段清空。

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ClinicaError, Result};
use crate::models::EntityId;
use crate::utils::{optional_text, required_text, validate_age};

/// 嵌入的实体引用，写入时只关心 `id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default)]
    pub id: Option<EntityId>,
}

impl EntityRef {
    fn require(reference: Option<&EntityRef>, field: &str) -> Result<EntityId> {
        reference
            .and_then(|r| r.id)
            .ok_or_else(|| ClinicaError::Validation(format!("{}.id is required", field)))
    }
}

/// 区分键缺失与显式 `null`：缺失为 `None`，`null` 为 `Some(None)`
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn require_key<T>(field: &str, value: &Option<T>) -> Result<()> {
    match value {
        Some(_) => Ok(()),
        None => Err(ClinicaError::Validation(format!(
            "{} is required for a full update",
            field
        ))),
    }
}

fn require_id(id: Option<EntityId>) -> Result<EntityId> {
    match id {
        Some(id) if id > 0 => Ok(id),
        Some(id) => Err(ClinicaError::Validation(format!("invalid id: {}", id))),
        None => Err(ClinicaError::Validation(
            "id is required for a full update".to_string(),
        )),
    }
}

/// 医生写入载荷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorPayload {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default, deserialize_with = "present")]
    pub dni: Option<Option<String>>,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "especialidad", default, deserialize_with = "present")]
    pub specialty: Option<Option<String>>,
}

/// 校验后的医生字段
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorRecord {
    pub dni: Option<String>,
    pub name: String,
    pub specialty: Option<String>,
}

impl DoctorPayload {
    pub fn into_record(self) -> Result<DoctorRecord> {
        Ok(DoctorRecord {
            dni: optional_text(self.dni.flatten()),
            name: required_text("nombre", self.name)?,
            specialty: optional_text(self.specialty.flatten()),
        })
    }

    /// 整体替换时使用：返回 `(id, record)`
    pub fn into_replacement(self) -> Result<(EntityId, DoctorRecord)> {
        let id = require_id(self.id)?;
        require_key("dni", &self.dni)?;
        require_key("especialidad", &self.specialty)?;
        Ok((id, self.into_record()?))
    }
}

/// 患者写入载荷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientPayload {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    /// `null` 与缺省都按 0 处理
    #[serde(rename = "edad", default, deserialize_with = "present")]
    pub age: Option<Option<i32>>,
    #[serde(rename = "especialidad", default, deserialize_with = "present")]
    pub specialty: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub dni: Option<Option<String>>,
    #[serde(rename = "medico", default)]
    pub doctor: Option<EntityRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub name: String,
    pub age: i32,
    pub specialty: Option<String>,
    pub dni: Option<String>,
    pub doctor_id: EntityId,
}

impl PatientPayload {
    pub fn into_record(self) -> Result<PatientRecord> {
        let doctor_id = EntityRef::require(self.doctor.as_ref(), "medico")?;
        Ok(PatientRecord {
            name: required_text("nombre", self.name)?,
            age: validate_age(self.age.flatten().unwrap_or(0))?,
            specialty: optional_text(self.specialty.flatten()),
            dni: optional_text(self.dni.flatten()),
            doctor_id,
        })
    }

    pub fn into_replacement(self) -> Result<(EntityId, PatientRecord)> {
        let id = require_id(self.id)?;
        require_key("edad", &self.age)?;
        require_key("especialidad", &self.specialty)?;
        require_key("dni", &self.dni)?;
        Ok((id, self.into_record()?))
    }
}

/// 报告写入载荷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPayload {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(rename = "prediccion", default)]
    pub prediction: Option<String>,
    #[serde(rename = "contenido", default, deserialize_with = "present")]
    pub content: Option<Option<String>>,
    #[serde(rename = "imagen", default)]
    pub image: Option<EntityRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub prediction: String,
    pub content: Option<String>,
    pub image_id: EntityId,
}

impl ReportPayload {
    pub fn into_record(self) -> Result<ReportRecord> {
        let image_id = EntityRef::require(self.image.as_ref(), "imagen")?;
        // 预测文本原样保存，只检查非空
        let prediction = match self.prediction {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                return Err(ClinicaError::Validation(
                    "prediccion is required".to_string(),
                ))
            }
        };

        Ok(ReportRecord {
            prediction,
            content: self.content.flatten(),
            image_id,
        })
    }

    pub fn into_replacement(self) -> Result<(EntityId, ReportRecord)> {
        let id = require_id(self.id)?;
        require_key("contenido", &self.content)?;
        Ok((id, self.into_record()?))
    }
}
