//! 外部分类服务连接器
//!
//! 以 multipart 方式把影像发给分类服务：
//! - 请求：`POST <endpoint>`，文件部分名为 `image`
//! - 响应：`{"label": <int>, "score": <float>}`

use async_trait::async_trait;
use clinica_core::{Classification, ClinicaError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;

/// 认证配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthenticationConfig {
    #[default]
    None,
    BasicAuth { username: String, password: String },
    ApiKey { key: String, header: Option<String> },
    BearerToken { token: String },
}

/// 分类服务返回体
#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    label: i64,
    score: f64,
}

impl ClassifierResponse {
    fn into_classification(self) -> Result<Classification> {
        let label = u8::try_from(self.label)
            .map_err(|_| ClinicaError::Classifier(format!("label out of range: {}", self.label)))?;
        let classification = Classification::new(label, self.score);
        // 提前校验，避免把无法展示的结果写进数据库
        classification.prediction_text()?;
        Ok(classification)
    }
}

/// 基于HTTP的分类器
pub struct HttpClassifier {
    endpoint: String,
    authentication: AuthenticationConfig,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        authentication: AuthenticationConfig,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClinicaError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Initializing HTTP classifier: {} (timeout {:?})",
            endpoint, timeout
        );

        Ok(Self {
            endpoint,
            authentication,
            client,
        })
    }

    /// 添加认证头
    fn add_auth_headers(
        request: reqwest::RequestBuilder,
        auth: &AuthenticationConfig,
    ) -> reqwest::RequestBuilder {
        match auth {
            AuthenticationConfig::None => request,
            AuthenticationConfig::BasicAuth { username, password } => {
                request.basic_auth(username, Some(password))
            }
            AuthenticationConfig::ApiKey { key, header } => {
                let header_name = header.as_deref().unwrap_or("X-API-Key");
                request.header(header_name, key)
            }
            AuthenticationConfig::BearerToken { token } => request.bearer_auth(token),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    /// 地址可能带有凭据，只在启动日志中出现
    fn name(&self) -> &str {
        "http"
    }

    async fn classify(&self, image: &[u8]) -> Result<Classification> {
        let part = reqwest::multipart::Part::bytes(image.to_vec()).file_name("image");
        let form = reqwest::multipart::Form::new().part("image", part);

        let request = self.client.post(&self.endpoint).multipart(form);
        let request = Self::add_auth_headers(request, &self.authentication);

        let response = request.send().await.map_err(|e| {
            warn!("Classifier request to {} failed: {}", self.endpoint, e);
            ClinicaError::Classifier(format!("request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Classifier {} answered {}", self.endpoint, status);
            return Err(ClinicaError::Classifier(format!(
                "classifier returned {}",
                status
            )));
        }

        let body: ClassifierResponse = response
            .json()
            .await
            .map_err(|e| ClinicaError::Classifier(format!("malformed response: {}", e)))?;

        debug!("Classifier answered label {} score {}", body.label, body.score);
        body.into_classification()
    }
}
