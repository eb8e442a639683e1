pub mod envelope;
pub mod profile;
pub mod role;
pub mod session;

pub use envelope::ProxyEnvelope;
pub use profile::Profile;
pub use role::RoleKey;
pub use session::Session;
