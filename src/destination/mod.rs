// Storage targets for downloaded photos. The pipeline only sees the
// `Destination` trait; the concrete target is picked once at startup from
// `TargetEndpoint`.

pub mod google;
pub mod local;

pub use google::GoogleDrive;
pub use local::LocalFolder;

use crate::error::Result;

/// Where transferred photos end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TargetEndpoint {
    Local,
    Google,
}

/// A place photo bytes can be written to.
pub trait Destination {
    /// Persist `content` under `file_name`.
    fn store(&mut self, file_name: &str, content: &[u8]) -> Result<()>;

    /// Called once after the last transfer attempt.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}
