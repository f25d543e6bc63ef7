//! Service wiring for CLI commands.

use std::sync::Arc;

use tracing::debug;

use nasbox_auth::PasswordHasher;
use nasbox_core::config::AppConfig;
use nasbox_core::result::AppResult;
use nasbox_database::DatabasePool;
use nasbox_database::repositories::{
    ActivityRepository, MetadataRepository, NasShareRepository, ShareRepository, UserRepository,
};
use nasbox_service::{
    ActivityRecorder, FileOperationsService, NasShareService, SearchService, ShareManager,
    StorageService, UserService,
};
use nasbox_storage::{DiskUsageCalculator, LocalFilesystem, PathLocks, PathResolver};

/// Every service a command may need, built over one database pool.
#[derive(Debug, Clone)]
pub struct App {
    pub pool: DatabasePool,
    pub files: FileOperationsService,
    pub search: SearchService,
    pub shares: ShareManager,
    pub storage: StorageService,
    pub activity: Arc<ActivityRecorder>,
    pub nas: NasShareService,
    pub users: UserService,
}

impl App {
    /// Connect to the database and wire the services.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let pool = DatabasePool::connect(&config.database).await?;
        let pg = pool.pool().clone();

        let resolver = Arc::new(PathResolver::new(config.storage.root()));
        let fs = Arc::new(LocalFilesystem::new(config.storage.temp_dir()).await?);
        let hasher = Arc::new(PasswordHasher::new());

        let metadata = Arc::new(MetadataRepository::new(pg.clone()));
        let activity = Arc::new(ActivityRecorder::new(
            Arc::new(ActivityRepository::new(pg.clone())),
            config.query.activity_limit,
        ));

        let files = FileOperationsService::new(
            resolver.clone(),
            fs.clone(),
            metadata.clone(),
            activity.clone(),
            PathLocks::new(),
            &config.storage,
        );
        let search = SearchService::new(metadata.clone(), config.query.search_limit);
        let shares = ShareManager::new(
            Arc::new(ShareRepository::new(pg.clone())),
            metadata.clone(),
            resolver.clone(),
            fs.clone(),
            hasher.clone(),
            activity.clone(),
            config.share.token_bytes,
        );
        let storage = StorageService::new(resolver.clone(), DiskUsageCalculator::new(), metadata);
        let nas = NasShareService::new(
            Arc::new(NasShareRepository::new(pg.clone())),
            resolver.clone(),
            fs.clone(),
            activity.clone(),
        );
        let users = UserService::new(Arc::new(UserRepository::new(pg)), hasher, resolver, fs);

        debug!(root = %config.storage.root_path, "Services initialized");

        Ok(Self {
            pool,
            files,
            search,
            shares,
            storage,
            activity,
            nas,
            users,
        })
    }
}
