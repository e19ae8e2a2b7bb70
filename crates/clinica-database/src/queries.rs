//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use clinica_core::{
    ClinicaError, Doctor, DoctorRecord, EntityId, Image, ImageContent, Patient, PatientRecord,
    Report, ReportRecord, Result,
};
use sqlx::Row;
use tracing::debug;

/// 外键失败时换成更具体的说明
fn with_reference_message(e: sqlx::Error, message: impl FnOnce() -> String) -> ClinicaError {
    match ClinicaError::from(e) {
        ClinicaError::ForeignKey(_) => ClinicaError::ForeignKey(message()),
        other => other,
    }
}

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 医生表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS doctors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dni TEXT,
                name TEXT NOT NULL,
                specialty TEXT
            )
        "#,
        )
        .execute(pool)
        .await?;

        // 患者表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age INTEGER NOT NULL DEFAULT 0,
                specialty TEXT,
                dni TEXT,
                doctor_id INTEGER NOT NULL REFERENCES doctors(id)
            )
        "#,
        )
        .execute(pool)
        .await?;

        // 影像表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                content_type TEXT NOT NULL DEFAULT 'application/octet-stream',
                content BLOB,
                prediction TEXT,
                patient_id INTEGER NOT NULL REFERENCES patients(id)
            )
        "#,
        )
        .execute(pool)
        .await?;

        // 报告表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prediction TEXT NOT NULL,
                content TEXT,
                image_id INTEGER NOT NULL REFERENCES images(id)
            )
        "#,
        )
        .execute(pool)
        .await?;

        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_doctors_dni ON doctors(dni)",
            "CREATE INDEX IF NOT EXISTS idx_patients_doctor_id ON patients(doctor_id)",
            "CREATE INDEX IF NOT EXISTS idx_images_patient_id ON images(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_reports_image_id ON reports(image_id)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        Ok(())
    }

    // ========== 医生相关操作 ==========

    /// 创建新医生，ID由数据库分配
    pub async fn create_doctor(&self, doctor: &DoctorRecord) -> Result<Doctor> {
        let id: EntityId = sqlx::query(
            r#"
            INSERT INTO doctors (dni, name, specialty)
            VALUES (?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(&doctor.dni)
        .bind(&doctor.name)
        .bind(&doctor.specialty)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| row.get("id"))?;

        debug!("Created doctor {}", id);
        Ok(Doctor {
            id,
            dni: doctor.dni.clone(),
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
        })
    }

    /// 根据ID查找医生
    pub async fn get_doctor_by_id(&self, id: EntityId) -> Result<Option<Doctor>> {
        let result = sqlx::query_as::<_, DbDoctor>("SELECT * FROM doctors WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(result.map(Doctor::from))
    }

    /// 根据证件号查找医生
    pub async fn get_doctor_by_dni(&self, dni: &str) -> Result<Option<Doctor>> {
        let result =
            sqlx::query_as::<_, DbDoctor>("SELECT * FROM doctors WHERE dni = ? ORDER BY id LIMIT 1")
                .bind(dni)
                .fetch_optional(self.pool.pool())
                .await?;

        Ok(result.map(Doctor::from))
    }

    /// 整体替换医生记录，不存在时按给定ID插入
    pub async fn replace_doctor(&self, id: EntityId, doctor: &DoctorRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO doctors (id, dni, name, specialty)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                dni = excluded.dni,
                name = excluded.name,
                specialty = excluded.specialty
        "#,
        )
        .bind(id)
        .bind(&doctor.dni)
        .bind(&doctor.name)
        .bind(&doctor.specialty)
        .execute(self.pool.pool())
        .await?;

        debug!("Replaced doctor {}", id);
        Ok(())
    }

    /// 删除医生，返回删除行数
    pub async fn delete_doctor(&self, id: EntityId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM doctors WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                with_reference_message(e, || format!("medico {} still has pacientes", id))
            })?;

        Ok(result.rows_affected())
    }

    // ========== 患者相关操作 ==========

    async fn require_doctor(&self, doctor_id: EntityId) -> Result<Doctor> {
        self.get_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| ClinicaError::ForeignKey(format!("medico {} does not exist", doctor_id)))
    }

    /// 创建新患者，所属医生必须已存在
    pub async fn create_patient(&self, patient: &PatientRecord) -> Result<Patient> {
        let doctor = self.require_doctor(patient.doctor_id).await?;

        let id: EntityId = sqlx::query(
            r#"
            INSERT INTO patients (name, age, specialty, dni, doctor_id)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(&patient.name)
        .bind(patient.age)
        .bind(&patient.specialty)
        .bind(&patient.dni)
        .bind(patient.doctor_id)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| row.get("id"))?;

        debug!("Created patient {} for doctor {}", id, doctor.id);
        Ok(Patient {
            id,
            name: patient.name.clone(),
            age: patient.age,
            specialty: patient.specialty.clone(),
            dni: patient.dni.clone(),
            doctor,
        })
    }

    /// 根据ID查找患者（含所属医生）
    pub async fn get_patient_by_id(&self, id: EntityId) -> Result<Option<Patient>> {
        let result = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        let Some(db_patient) = result else {
            return Ok(None);
        };

        let doctor = self.require_doctor(db_patient.doctor_id).await?;
        Ok(Some(db_patient.into_patient(doctor)))
    }

    /// 获取某医生的全部患者
    pub async fn get_patients_by_doctor_id(&self, doctor_id: EntityId) -> Result<Vec<Patient>> {
        let Some(doctor) = self.get_doctor_by_id(doctor_id).await? else {
            return Err(ClinicaError::not_found("medico", doctor_id));
        };

        let results =
            sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE doctor_id = ? ORDER BY id")
                .bind(doctor_id)
                .fetch_all(self.pool.pool())
                .await?;

        Ok(results
            .into_iter()
            .map(|p| p.into_patient(doctor.clone()))
            .collect())
    }

    /// 整体替换患者记录，不存在时按给定ID插入；新医生必须已存在
    pub async fn replace_patient(&self, id: EntityId, patient: &PatientRecord) -> Result<()> {
        self.require_doctor(patient.doctor_id).await?;

        sqlx::query(
            r#"
            INSERT INTO patients (id, name, age, specialty, dni, doctor_id)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                specialty = excluded.specialty,
                dni = excluded.dni,
                doctor_id = excluded.doctor_id
        "#,
        )
        .bind(id)
        .bind(&patient.name)
        .bind(patient.age)
        .bind(&patient.specialty)
        .bind(&patient.dni)
        .bind(patient.doctor_id)
        .execute(self.pool.pool())
        .await?;

        debug!("Replaced patient {}", id);
        Ok(())
    }

    pub async fn delete_patient(&self, id: EntityId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM patients WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                with_reference_message(e, || format!("paciente {} still has imagenes", id))
            })?;

        Ok(result.rows_affected())
    }

    // ========== 影像相关操作 ==========

    /// 保存上传的影像，所属患者必须已存在
    pub async fn create_image(&self, image: &NewImage) -> Result<Image> {
        let Some(patient) = self.get_patient_by_id(image.patient_id).await? else {
            return Err(ClinicaError::ForeignKey(format!(
                "paciente {} does not exist",
                image.patient_id
            )));
        };

        let id: EntityId = sqlx::query(
            r#"
            INSERT INTO images (name, uploaded_at, content_type, content, patient_id)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(&image.name)
        .bind(image.uploaded_at)
        .bind(&image.content_type)
        .bind(&image.content)
        .bind(image.patient_id)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| row.get("id"))?;

        debug!(
            "Stored image {} ({} bytes) for patient {}",
            id,
            image.content.len(),
            image.patient_id
        );

        Ok(Image {
            id,
            name: image.name.clone(),
            uploaded_at: image.uploaded_at,
            patient,
            prediction: None,
        })
    }

    /// 根据ID获取影像元数据
    pub async fn get_image_by_id(&self, id: EntityId) -> Result<Option<Image>> {
        let result = sqlx::query_as::<_, DbImage>(
            "SELECT id, name, uploaded_at, content_type, patient_id, prediction FROM images WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        let Some(db_image) = result else {
            return Ok(None);
        };

        let patient = self
            .get_patient_by_id(db_image.patient_id)
            .await?
            .ok_or_else(|| ClinicaError::not_found("paciente", db_image.patient_id))?;
        Ok(Some(db_image.into_image(patient)))
    }

    /// 获取影像二进制内容
    pub async fn get_image_content(&self, id: EntityId) -> Result<ImageContent> {
        let row = sqlx::query_as::<_, DbImageContent>(
            "SELECT content_type, content FROM images WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or_else(|| ClinicaError::not_found("imagen", id))?;

        match row.content {
            Some(bytes) if !bytes.is_empty() => Ok(ImageContent {
                content_type: row.content_type,
                bytes,
            }),
            _ => Err(ClinicaError::Validation(format!(
                "imagen {} has no content",
                id
            ))),
        }
    }

    /// 获取某患者的全部影像
    pub async fn get_images_by_patient_id(&self, patient_id: EntityId) -> Result<Vec<Image>> {
        let Some(patient) = self.get_patient_by_id(patient_id).await? else {
            return Err(ClinicaError::not_found("paciente", patient_id));
        };

        let results = sqlx::query_as::<_, DbImage>(
            "SELECT id, name, uploaded_at, content_type, patient_id, prediction FROM images WHERE patient_id = ? ORDER BY id",
        )
        .bind(patient_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(results
            .into_iter()
            .map(|i| i.into_image(patient.clone()))
            .collect())
    }

    /// 记录影像最近一次预测结果
    pub async fn update_image_prediction(&self, id: EntityId, prediction: &str) -> Result<()> {
        let result = sqlx::query("UPDATE images SET prediction = ? WHERE id = ?")
            .bind(prediction)
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicaError::not_found("imagen", id));
        }
        Ok(())
    }

    pub async fn delete_image(&self, id: EntityId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                with_reference_message(e, || format!("imagen {} still has informes", id))
            })?;

        Ok(result.rows_affected())
    }

    // ========== 报告相关操作 ==========

    /// 报告只能针对已存在且已做过预测的影像
    async fn require_predicted_image(&self, image_id: EntityId) -> Result<Image> {
        let image = self.get_image_by_id(image_id).await?.ok_or_else(|| {
            ClinicaError::ForeignKey(format!("imagen {} does not exist", image_id))
        })?;

        if image.prediction.is_none() {
            return Err(ClinicaError::Validation(format!(
                "imagen {} has no prediction yet",
                image_id
            )));
        }
        Ok(image)
    }

    pub async fn create_report(&self, report: &ReportRecord) -> Result<Report> {
        let image = self.require_predicted_image(report.image_id).await?;

        let id: EntityId = sqlx::query(
            r#"
            INSERT INTO reports (prediction, content, image_id)
            VALUES (?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(&report.prediction)
        .bind(&report.content)
        .bind(report.image_id)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| row.get("id"))?;

        debug!("Created report {} for image {}", id, report.image_id);
        Ok(Report {
            id,
            prediction: report.prediction.clone(),
            content: report.content.clone(),
            image,
        })
    }

    pub async fn get_report_by_id(&self, id: EntityId) -> Result<Option<Report>> {
        let result = sqlx::query_as::<_, DbReport>("SELECT * FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        let Some(db_report) = result else {
            return Ok(None);
        };

        let image = self
            .get_image_by_id(db_report.image_id)
            .await?
            .ok_or_else(|| ClinicaError::not_found("imagen", db_report.image_id))?;
        Ok(Some(db_report.into_report(image)))
    }

    pub async fn get_reports_by_image_id(&self, image_id: EntityId) -> Result<Vec<Report>> {
        let Some(image) = self.get_image_by_id(image_id).await? else {
            return Err(ClinicaError::not_found("imagen", image_id));
        };

        let results =
            sqlx::query_as::<_, DbReport>("SELECT * FROM reports WHERE image_id = ? ORDER BY id")
                .bind(image_id)
                .fetch_all(self.pool.pool())
                .await?;

        Ok(results
            .into_iter()
            .map(|r| r.into_report(image.clone()))
            .collect())
    }

    pub async fn replace_report(&self, id: EntityId, report: &ReportRecord) -> Result<()> {
        self.require_predicted_image(report.image_id).await?;

        sqlx::query(
            r#"
            INSERT INTO reports (id, prediction, content, image_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                prediction = excluded.prediction,
                content = excluded.content,
                image_id = excluded.image_id
        "#,
        )
        .bind(id)
        .bind(&report.prediction)
        .bind(&report.content)
        .bind(report.image_id)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    pub async fn delete_report(&self, id: EntityId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_rows(&self, table: &'static str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(self.pool.pool()).await?;
        Ok(n)
    }

    /// 各表记录数，用于健康检查
    pub async fn table_counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            doctors: self.count_rows("doctors").await?,
            patients: self.count_rows("patients").await?,
            images: self.count_rows("images").await?,
            reports: self.count_rows("reports").await?,
        })
    }
}

/// 各表记录数
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TableCounts {
    pub doctors: i64,
    pub patients: i64,
    pub images: i64,
    pub reports: i64,
}
