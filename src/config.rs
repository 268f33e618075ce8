// src/config.rs

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use crate::{
    db::{ActivityRepository, AnalyticsRepository, BatchRepository, DepartmentRepository, ReceiptRepository},
    services::{
        activity_service::ActivityService,
        analytics_service::AnalyticsService,
        batch_service::BatchService,
        department_service::DepartmentService,
        extraction_service::{DisabledExtractor, OpenAiExtractor, ReceiptExtractor},
        receipt_service::ReceiptService,
        storage_service::build_object_store,
    },
};

#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub enum StorageSettings {
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    S3 {
        bucket: String,
        endpoint: String,
        region: String,
        access_key: String,
        secret_key: String,
    },
}

impl StorageSettings {
    /// Rota e diretório que o próprio servidor publica no backend local.
    /// `None` para S3, ou quando a URL pública aponta para outro caminho-raiz.
    pub fn local_mount(&self) -> Option<(String, &Path)> {
        match self {
            StorageSettings::Local { root, public_base_url } => {
                mount_path(public_base_url).map(|path| (path, root.as_path()))
            }
            StorageSettings::S3 { .. } => None,
        }
    }
}

// "http://localhost:3000/files/" -> "/files". Raiz vazia não é montada
// para não sombrear as rotas da API.
fn mount_path(public_base_url: &str) -> Option<String> {
    let without_scheme = match public_base_url.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..])?,
        None => public_base_url,
    };
    let path = without_scheme.split(['?', '#']).next()?.trim_end_matches('/');
    (path.starts_with('/') && path.len() > 1).then(|| path.to_string())
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub default_float_amount: Decimal,
    pub extraction: ExtractionSettings,
    pub storage: StorageSettings,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{} deve ser definida", name))
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = match var_or("STORAGE_BACKEND", "local").to_ascii_lowercase().as_str() {
            "s3" => StorageSettings::S3 {
                bucket: required("S3_BUCKET")?,
                endpoint: required("S3_ENDPOINT")?,
                region: var_or("S3_REGION", "auto"),
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
            },
            "local" => StorageSettings::Local {
                root: PathBuf::from(var_or("STORAGE_LOCAL_DIR", "./uploads")),
                public_base_url: var_or("STORAGE_PUBLIC_BASE_URL", "http://localhost:3000/files"),
            },
            other => anyhow::bail!("STORAGE_BACKEND inválido: {}", other),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
            db_max_connections: var_or("DB_MAX_CONNECTIONS", "5")
                .parse()
                .context("DB_MAX_CONNECTIONS deve ser um número")?,
            default_float_amount: Decimal::from_str(&var_or("DEFAULT_FLOAT_AMOUNT", "3500.00"))
                .context("DEFAULT_FLOAT_AMOUNT deve ser decimal")?,
            extraction: ExtractionSettings {
                api_url: var_or("AI_API_URL", "https://api.openai.com/v1/chat/completions"),
                api_key: env::var("AI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
                model: var_or("AI_MODEL", "gpt-4o-mini"),
                timeout_seconds: var_or("AI_TIMEOUT_SECONDS", "30")
                    .parse()
                    .context("AI_TIMEOUT_SECONDS deve ser um número")?,
            },
            storage,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub department_service: DepartmentService,
    pub receipt_service: ReceiptService,
    pub batch_service: BatchService,
    pub activity_service: ActivityService,
    pub analytics_service: AnalyticsService,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let extractor: Arc<dyn ReceiptExtractor> = match &settings.extraction.api_key {
            Some(key) => Arc::new(OpenAiExtractor::new(&settings.extraction, key.clone())?),
            None => {
                tracing::warn!("AI_API_KEY ausente: recibos entram para preenchimento manual");
                Arc::new(DisabledExtractor)
            }
        };
        let object_store = build_object_store(&settings.storage).await?;

        // --- Monta o gráfico de dependências ---
        let activity_service = ActivityService::new(db_pool.clone(), ActivityRepository::new());
        let department_service = DepartmentService::new(
            db_pool.clone(),
            DepartmentRepository::new(),
            activity_service.clone(),
            settings.default_float_amount,
        );
        let receipt_service = ReceiptService::new(
            db_pool.clone(),
            ReceiptRepository::new(),
            BatchRepository::new(),
            department_service.clone(),
            activity_service.clone(),
            extractor,
            object_store,
        );
        let batch_service = BatchService::new(
            db_pool.clone(),
            BatchRepository::new(),
            ReceiptRepository::new(),
            department_service.clone(),
            activity_service.clone(),
        );
        let analytics_service = AnalyticsService::new(db_pool.clone(), AnalyticsRepository::new());

        Ok(Self {
            db_pool,
            settings: Arc::new(settings),
            department_service,
            receipt_service,
            batch_service,
            activity_service,
            analytics_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(url: &str) -> StorageSettings {
        StorageSettings::Local {
            root: PathBuf::from("./uploads"),
            public_base_url: url.to_string(),
        }
    }

    #[test]
    fn default_local_url_is_served_under_files() {
        let settings = local("http://localhost:3000/files");
        let (path, root) = settings.local_mount().unwrap();
        assert_eq!(path, "/files");
        assert_eq!(root, Path::new("./uploads"));
    }

    #[test]
    fn mount_path_ignores_host_and_trailing_slash() {
        assert_eq!(mount_path("https://cdn.example.com/static/receipts/").as_deref(), Some("/static/receipts"));
        assert_eq!(mount_path("/files").as_deref(), Some("/files"));
        assert_eq!(mount_path("http://localhost:3000"), None);
        assert_eq!(mount_path("http://localhost:3000/"), None);
    }

    #[test]
    fn s3_has_nothing_to_mount() {
        let settings = StorageSettings::S3 {
            bucket: "b".into(),
            endpoint: "https://r2.example.com".into(),
            region: "auto".into(),
            access_key: "k".into(),
            secret_key: "s".into(),
        };
        assert!(settings.local_mount().is_none());
    }
}
