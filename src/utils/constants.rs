//! Shared constants and invariants

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

// osu! API v2
pub const DEFAULT_TOKEN_URL: &str = "https://osu.ppy.sh/oauth/token";
pub const DEFAULT_API_BASE_URL: &str = "https://osu.ppy.sh/api/v2";
pub const DEFAULT_SCOPE: &str = "public";
pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

// Credential store
pub const DEFAULT_TOKEN_KEY: &str = "ACCESS_TOKEN";

// Inbound surface
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173/";
pub const NOT_FOUND_PATH: &str = "/404";

// Retry defaults
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 1000;
