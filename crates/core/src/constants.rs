/// Constants used throughout the keeper codebase
use std::time::Duration;

// Session persistence
pub const SESSION_FILE_NAME: &str = "session.enc";
pub const SESSION_KDF_SALT: &[u8] = b"keeper-session-salt-v2";

// Cache key prefixes
pub const SESSION_KEY_PREFIX: &str = "session:";
pub const USER_KEY_PREFIX: &str = "user:";
pub const API_KEY_PREFIX: &str = "api:";
pub const TRANSCRIPTION_KEY_PREFIX: &str = "transcription:";

// Default TTLs per cached value kind
pub const VALID_SESSION_TTL: Duration = Duration::from_secs(10 * 60);
pub const OFFLINE_SESSION_TTL: Duration = Duration::from_secs(2 * 60);
pub const USER_TTL: Duration = Duration::from_secs(5 * 60);
pub const API_RESPONSE_TTL: Duration = Duration::from_secs(60);
pub const TRANSCRIPTION_TTL: Duration = Duration::from_secs(10 * 60);

// Validation outcome reasons
pub const REASON_THROTTLED: &str = "rate limit exceeded";
pub const REASON_CANNOT_VALIDATE: &str = "cannot validate session";
pub const REASON_USER_NOT_FOUND: &str = "user not found";

// Paths exempt from general rate limiting
pub const HEALTH_CHECK_PATH: &str = "/health";

// Environment variable names
pub const KEEPER_CONFIG_VAR: &str = "KEEPER_CONFIG";
pub const KEEPER_LOG_VAR: &str = "KEEPER_LOG";
