// Library root
// -----------
// Backs up the most recent photos of a VK user to a local directory or a
// Google Drive folder. The binary (`main.rs`) parses the command line and
// wires these modules together.
//
// Module responsibilities:
// - `vk`: blocking client for the VK API and the response record types.
// - `selection`: picks one size per photo and ranks photos by recency.
// - `destination`: local and Google Drive storage behind one trait.
// - `oauth`: Google OAuth installed-app flow and token persistence.
// - `pipeline`: runs fetch, selection, transfer and reporting in order.
// - `report`: the `result.json` transfer report.
// - `ui`: progress bar and user-facing listings.
pub mod cli;
pub mod config;
pub mod destination;
pub mod error;
pub mod oauth;
pub mod pipeline;
pub mod report;
pub mod selection;
pub mod ui;
pub mod vk;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod test_server;
