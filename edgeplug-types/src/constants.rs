pub const SPBV10: &str = "spBv1.0";

pub const NODE_CONTROL_REBIRTH: &str = "Node Control/Rebirth";
pub const BDSEQ: &str = "bdSeq";

pub const NBIRTH: &str = "NBIRTH";
pub const NDEATH: &str = "NDEATH";
pub const NDATA: &str = "NDATA";
pub const NCMD: &str = "NCMD";

pub const DBIRTH: &str = "DBIRTH";
pub const DDEATH: &str = "DDEATH";
pub const DDATA: &str = "DDATA";
pub const DCMD: &str = "DCMD";

pub const STATE: &str = "STATE";

/// Matches exactly one topic level in a subscription filter.
pub const SINGLE_LEVEL_WILDCARD: &str = "+";
/// Matches any number of trailing topic levels in a subscription filter.
pub const MULTI_LEVEL_WILDCARD: &str = "#";

pub const DEFAULT_CLIENT_PORT: u16 = 1883;
pub const DEFAULT_CLIENT_KEEPALIVE_SECS: u64 = 60;

/// Library version, baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
