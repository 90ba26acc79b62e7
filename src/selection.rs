// Size selection and recency ranking.

use crate::vk::{PhotoRecord, Size};

/// Size code tried first.
pub const PREFERRED_SIZE: &str = "z";
/// Size code used when the preferred one is missing.
pub const FALLBACK_SIZE: &str = "y";

/// A photo chosen for transfer, reduced to what the transport step needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPhoto {
    pub url: String,
    pub date: i64,
    pub likes: u64,
    pub size_type: String,
}

impl SelectedPhoto {
    pub fn file_name(&self) -> String {
        format!("{}_{}.jpg", self.date, self.likes)
    }
}

/// Pick the preferred size variant, falling back to the second choice.
///
/// When a code appears more than once the first occurrence wins.
pub fn select_size(sizes: &[Size]) -> Option<&Size> {
    [PREFERRED_SIZE, FALLBACK_SIZE]
        .iter()
        .find_map(|code| sizes.iter().find(|s| s.type_ == *code))
}

pub fn select(record: &PhotoRecord) -> Option<SelectedPhoto> {
    select_size(&record.sizes).map(|size| SelectedPhoto {
        url: size.url.clone(),
        date: record.date,
        likes: record.likes.count,
        size_type: size.type_.clone(),
    })
}

/// Select a size for every record, dropping the ones without a usable size.
pub fn select_all(records: &[PhotoRecord]) -> Vec<SelectedPhoto> {
    records
        .iter()
        .filter_map(|record| {
            let selected = select(record);
            if selected.is_none() {
                let available: Vec<&str> = record.sizes.iter().map(|s| s.type_.as_str()).collect();
                tracing::warn!(
                    "Photo {} has no supported size (available: [{}]), skipping",
                    record.id,
                    available.join(", ")
                );
            }
            selected
        })
        .collect()
}

/// Newest first, keeping fetch order for equal dates, cut to `deep` entries.
pub fn rank(mut photos: Vec<SelectedPhoto>, deep: usize) -> Vec<SelectedPhoto> {
    // sort_by is stable
    photos.sort_by(|a, b| b.date.cmp(&a.date));
    photos.truncate(deep);
    photos
}
