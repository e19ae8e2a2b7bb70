//! 数据库模型

use chrono::{DateTime, Utc};
use clinica_core::models::*;
use sqlx::FromRow;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库医生表
#[derive(Debug, FromRow)]
pub struct DbDoctor {
    pub id: EntityId,
    pub dni: Option<String>,
    pub name: String,
    pub specialty: Option<String>,
}

impl From<DbDoctor> for Doctor {
    fn from(db_doctor: DbDoctor) -> Self {
        Doctor {
            id: db_doctor.id,
            dni: db_doctor.dni,
            name: db_doctor.name,
            specialty: db_doctor.specialty,
        }
    }
}

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: EntityId,
    pub name: String,
    pub age: i32,
    pub specialty: Option<String>,
    pub dni: Option<String>,
    pub doctor_id: EntityId,
}

impl DbPatient {
    pub fn into_patient(self, doctor: Doctor) -> Patient {
        Patient {
            id: self.id,
            name: self.name,
            age: self.age,
            specialty: self.specialty,
            dni: self.dni,
            doctor,
        }
    }
}

/// 数据库影像表（不含二进制列）
#[derive(Debug, FromRow)]
pub struct DbImage {
    pub id: EntityId,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub content_type: String,
    pub patient_id: EntityId,
    pub prediction: Option<String>,
}

impl DbImage {
    pub fn into_image(self, patient: Patient) -> Image {
        Image {
            id: self.id,
            name: self.name,
            uploaded_at: self.uploaded_at,
            patient,
            prediction: self.prediction,
        }
    }
}

/// 影像二进制列
#[derive(Debug, FromRow)]
pub struct DbImageContent {
    pub content_type: String,
    pub content: Option<Vec<u8>>,
}

/// 数据库报告表
#[derive(Debug, FromRow)]
pub struct DbReport {
    pub id: EntityId,
    pub prediction: String,
    pub content: Option<String>,
    pub image_id: EntityId,
}

impl DbReport {
    pub fn into_report(self, image: Image) -> Report {
        Report {
            id: self.id,
            prediction: self.prediction,
            content: self.content,
            image,
        }
    }
}

// 插入模型 - 用于创建新记录

/// 新影像插入模型
#[derive(Debug)]
pub struct NewImage {
    pub name: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
    pub patient_id: EntityId,
}
