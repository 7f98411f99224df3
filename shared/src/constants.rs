// Wheel geometry
pub const POINTER_ANGLE: f64 = 270.0;  // Pointer sits at the top of the wheel
pub const EXTRA_ROTATIONS: u32 = 4;    // Full turns added to every spin

// Animation timing (milliseconds)
pub const SPIN_DURATION_MS: f64 = 4000.0;
pub const WALK_BASE_MS: f64 = 1000.0;
pub const WALK_STEP_MS: f64 = 200.0;

// Timer display
pub const RENDER_TICK_MS: u32 = 1000;
pub const SNAPSHOT_POLL_MS: u32 = 3000;
pub const DEFAULT_MAX_TIME: u32 = 300;
pub const WARNING_THRESHOLD_SECS: u32 = 120;
pub const CRITICAL_THRESHOLD_SECS: u32 = 60;

// Participants
pub const PARTICIPANTS: [u8; 2] = [1, 2];

// Client-local persistence
pub const ROTATION_STORAGE_KEY: &str = "wheel_rotation";
pub const ROTATION_MAX_AGE_SECS: u64 = 31_536_000;

// Request limits
pub const MAX_SECRET_LENGTH: usize = 256;

pub const EMPTY_SECRET_ERROR: &str = "Please enter a secret";
pub const SECRET_TOO_LONG_ERROR: &str = "Secret is too long";
pub const INVALID_PLAYER_ERROR: &str = "Unknown player";
pub const INVALID_SECONDS_ERROR: &str = "Time to add must be between 1 and 3600 seconds";
pub const INVALID_REQUEST_ERROR: &str = "Invalid request";
pub const SPIN_FAILED_ERROR: &str = "Failed to spin wheel";
pub const TIME_EXPIRED_NOTICE: &str = "Time expired! Input disabled";
