// Constants module - centralized default values for configuration
//
// Defaults for the server, the outbound fetcher and the request pipeline
// live here so config structs and request parsing agree on them.

// =============================================================================
// Server defaults
// =============================================================================

/// Default bind address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

// =============================================================================
// Fetch defaults
// =============================================================================

/// Default timeout for source and overlay image fetches in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the comma-separated host allow-list
pub const ALLOW_LIST_ENV: &str = "WHITE_LIST";

/// Hop-by-hop headers, never relayed in either direction
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

// =============================================================================
// Request defaults
// =============================================================================

/// Where requests without a `url` parameter are redirected
pub const DEFAULT_REDIRECT_URL: &str = "https://github.com/ccbikai/vercel-edge-image";

/// Output format used when `format` is absent or unrecognized
pub const DEFAULT_OUTPUT_FORMAT: &str = "webp";

/// Output quality used when `quality` is absent or unparsable
pub const DEFAULT_QUALITY: u8 = 99;

/// Cache lifetime for transformed images (180 days, edge and browser)
pub const CACHE_CONTROL: &str = "public,max-age=15552000,s-maxage=15552000";

// =============================================================================
// Image limits
// =============================================================================

/// Largest accepted source or resize target width
pub const DEFAULT_MAX_WIDTH: u32 = 10_000;

/// Largest accepted source or resize target height
pub const DEFAULT_MAX_HEIGHT: u32 = 10_000;

/// Largest accepted pixel count (100 megapixels)
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// Encoder defaults
// =============================================================================

/// AVIF encoder speed (1 = slowest/best, 10 = fastest)
pub const DEFAULT_AVIF_SPEED: u8 = 6;

// =============================================================================
// Service endpoints
// =============================================================================

/// Health check path
pub const HEALTH_PATH: &str = "/health";

/// Prometheus metrics path
pub const METRICS_PATH: &str = "/metrics";
