//! Application-wide constants

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

pub const LIST_CACHE_TTL_SECS: u64 = 300;
pub const DETAIL_CACHE_TTL_SECS: u64 = 300;
pub const STATS_CACHE_TTL_SECS: u64 = 3600;

pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 604800;
pub const VERIFICATION_TOKEN_EXPIRY: i64 = 86400;
pub const RESET_TOKEN_EXPIRY: i64 = 3600;

pub const MIN_PASSWORD_LENGTH: u64 = 6;
pub const MAX_PASSWORD_LENGTH: u64 = 128;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 800;

pub const DEFAULT_CURRENCY: &str = "IDR";

pub const DEFAULT_TENANT_CODE: &str = "DEFAULT";
pub const DEFAULT_TENANT_NAME: &str = "Default";
