//! 共享应用状态

use clinica_database::DatabasePool;
use clinica_integration::Classifier;
use std::sync::Arc;

/// 每个请求共享的状态：连接池与注入的分类器
#[derive(Clone)]
pub struct AppState {
    pub db: DatabasePool,
    pub classifier: Arc<dyn Classifier>,
}

impl AppState {
    pub fn new(db: DatabasePool, classifier: Arc<dyn Classifier>) -> Self {
        Self { db, classifier }
    }
}
