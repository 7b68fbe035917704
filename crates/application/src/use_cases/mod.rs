pub mod cleanup_query_logs;

pub use cleanup_query_logs::CleanupOldQueryLogsUseCase;
