/// Prefix of generated permit numbers, `BHS-<DDMMYYYY>-<HHMMSS>-<NNN>`.
pub const PERMIT_NUMBER_PREFIX: &str = "BHS";

/// Maximum number of files accepted with a permit submission.
pub const MAX_ATTACHMENTS: usize = 5;

/// Session key under which the authenticated account reference is stored.
pub const SESSION_ACCOUNT_KEY: &str = "account";
