pub mod authority;
pub mod claims;
pub mod errors;

pub use authority::TokenAuthority;
pub use claims::Claims;
pub use claims::TOKEN_TTL_HOURS;
pub use errors::KeyLoadError;
pub use errors::TokenError;
