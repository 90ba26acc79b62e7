use reqwest::blocking::{multipart, Response};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use super::Destination;
use crate::error::{Error, Result};
use crate::oauth::GoogleSession;
use crate::ui;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Local directory photos are written to before they are uploaded.
pub const STAGING_DIR: &str = "tmp";

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

fn parents_query(folder_id: &str) -> String {
    format!("'{}' in parents", folder_id)
}

fn check_status(res: Response) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().unwrap_or_default();
    Err(Error::Drive { status, body })
}

/// Google Drive folder named after the run, created on first upload.
pub struct GoogleDrive {
    session: GoogleSession,
    api_base: String,
    folder_name: String,
    folder_id: Option<String>,
    staging_dir: PathBuf,
}

impl GoogleDrive {
    pub fn new(session: GoogleSession, base: &Path, folder_name: &str) -> Self {
        GoogleDrive {
            session,
            api_base: DEFAULT_API_BASE.to_string(),
            folder_name: folder_name.to_string(),
            folder_id: None,
            staging_dir: base.join(STAGING_DIR),
        }
    }

    /// Point the Drive calls at another host, e.g. a proxy.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/drive/v3/files", self.api_base)
    }

    /// Create the run folder once; later calls reuse its id.
    fn ensure_folder(&mut self) -> Result<String> {
        if let Some(id) = &self.folder_id {
            return Ok(id.clone());
        }

        let token = self.session.access_token()?;
        let metadata = json!({
            "name": self.folder_name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        let res = self
            .session
            .http()
            .post(self.files_url())
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()?;
        let created: CreatedFile = check_status(res)?.json()?;

        tracing::info!(
            "Created Google Drive folder {} ({})",
            self.folder_name,
            created.id
        );
        self.folder_id = Some(created.id.clone());
        Ok(created.id)
    }

    fn upload(&mut self, path: &Path, file_name: &str, folder_id: &str) -> Result<String> {
        let token = self.session.access_token()?;
        let metadata = json!({
            "name": file_name,
            "parents": [folder_id],
        });

        let meta_part = multipart::Part::text(metadata.to_string())
            .mime_str("application/json; charset=UTF-8")?;
        let media_part = multipart::Part::file(path)?
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new()
            .part("metadata", meta_part)
            .part("file", media_part);

        let res = self
            .session
            .http()
            .post(self.upload_url())
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .multipart(form)
            .send()?;
        let created: CreatedFile = check_status(res)?.json()?;
        Ok(created.id)
    }

    /// Every file in the run folder, following pagination.
    pub fn list_folder(&mut self) -> Result<Vec<DriveFile>> {
        let Some(folder_id) = self.folder_id.clone() else {
            return Ok(Vec::new());
        };
        let query = parents_query(&folder_id);
        let files_url = self.files_url();

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let token = self.session.access_token()?;
            let mut req = self
                .session
                .http()
                .get(&files_url)
                .bearer_auth(token)
                .query(&[
                    ("q", query.as_str()),
                    ("spaces", "drive"),
                    ("fields", "nextPageToken, files(id, name)"),
                ]);
            if let Some(page) = &page_token {
                req = req.query(&[("pageToken", page.as_str())]);
            }

            let list: FileList = check_status(req.send()?)?.json()?;
            files.extend(list.files);
            match list.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(files)
    }
}

impl Destination for GoogleDrive {
    fn store(&mut self, file_name: &str, content: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.staging_dir)?;
        let staged = self.staging_dir.join(file_name);
        fs::write(&staged, content)?;

        let folder_id = self.ensure_folder()?;
        let file_id = self.upload(&staged, file_name, &folder_id)?;
        tracing::debug!("Uploaded {} as {}", file_name, file_id);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let files = self.list_folder()?;
        ui::print_drive_files(&files);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Google Drive folder {}", self.folder_name)
    }
}
