//! grammers media → core media kinds, and chunked downloads of attached media and link-preview photos.

use std::path::Path;

use grammers_client::{client::files::MAX_CHUNK_SIZE, grammers_tl_types as tl, types::Media, Client};
use tokio::io::AsyncWriteExt;

use tgcopy_core::{domain::MediaKind, errors::Error, Result};

use crate::map_invocation;


pub fn media_kind(media: &Media) -> MediaKind {
    match media {
        Media::Photo(_) => MediaKind::Photo,
        Media::Document(doc) => MediaKind::Document {
            mime_type: doc.mime_type().map(str::to_string),
        },
        // Stickers are documents on the wire.
        Media::Sticker(sticker) => MediaKind::Document {
            mime_type: sticker.document.mime_type().map(str::to_string),
        },
        Media::WebPage(page) => MediaKind::WebPage {
            page_type: match &page.raw.webpage {
                tl::enums::WebPage::Page(p) => p.r#type.clone(),
                _ => None,
            },
        },
        Media::Poll(_) => MediaKind::Poll,
        Media::Dice(_) => MediaKind::Dice,
        Media::Contact(_) => MediaKind::Other("contact".to_string()),
        Media::Geo(_) => MediaKind::Other("geo".to_string()),
        Media::GeoLive(_) => MediaKind::Other("geo_live".to_string()),
        Media::Venue(_) => MediaKind::Other("venue".to_string()),
        _ => MediaKind::Unsupported,
    }
}

/// The photo embedded in a link preview, if any.
pub fn webpage_photo(media: &Media) -> Option<tl::types::Photo> {
    let Media::WebPage(page) = media else {
        return None;
    };
    let tl::enums::WebPage::Page(page) = &page.raw.webpage else {
        return None;
    };
    match &page.photo {
        Some(tl::enums::Photo::Photo(photo)) => Some(photo.clone()),
        _ => None,
    }
}

/// Type tag of the largest stored size of a photo.
fn largest_size(photo: &tl::types::Photo) -> Option<String> {
    photo
        .sizes
        .iter()
        .filter_map(|size| match size {
            tl::enums::PhotoSize::Size(s) => Some((s.size as i64, s.r#type.clone())),
            tl::enums::PhotoSize::Progressive(p) => p
                .sizes
                .iter()
                .max()
                .map(|max| (*max as i64, p.r#type.clone())),
            _ => None,
        })
        .max_by_key(|(bytes, _)| *bytes)
        .map(|(_, kind)| kind)
}

/// Download `photo` to `dest` with raw upload.getFile calls.
///
/// Returns `Ok(false)` when the photo cannot be fetched (no stored size, CDN redirect, or a
/// non-flood RPC failure); flood-waits propagate so the caller's retry policy applies.
pub async fn download_photo(client: &Client, photo: &tl::types::Photo, dest: &Path) -> Result<bool> {
    let Some(thumb_size) = largest_size(photo) else {
        tracing::warn!("embedded photo {} has no downloadable size", photo.id);
        return Ok(false);
    };

    let location: tl::enums::InputFileLocation = tl::types::InputPhotoFileLocation {
        id: photo.id,
        access_hash: photo.access_hash,
        file_reference: photo.file_reference.clone(),
        thumb_size,
    }
    .into();

    let mut file = tokio::fs::File::create(dest).await?;
    let mut offset = 0i64;
    loop {
        let request = tl::functions::upload::GetFile {
            precise: false,
            cdn_supported: false,
            location: location.clone(),
            offset,
            limit: MAX_CHUNK_SIZE,
        };
        let part = match client.invoke(&request).await {
            Ok(tl::enums::upload::File::File(part)) => part,
            Ok(tl::enums::upload::File::CdnRedirect(_)) => {
                tracing::warn!("embedded photo {} is served from a CDN; skipping", photo.id);
                drop(file);
                let _ = tokio::fs::remove_file(dest).await;
                return Ok(false);
            }
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(dest).await;
                return failed_download(dest, map_invocation(e));
            }
        };

        file.write_all(&part.bytes).await?;
        if part.bytes.len() < MAX_CHUNK_SIZE as usize {
            break;
        }
        offset += part.bytes.len() as i64;
    }
    file.flush().await?;
    Ok(true)
}

/// Stream attached media (photo, document, sticker) to `dest`.
///
/// Same contract as [`download_photo`]: `Ok(false)` for a failed fetch, flood-waits propagate.
pub async fn download_attached(client: &Client, media: &Media, dest: &Path) -> Result<bool> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut download = client.iter_download(media).chunk_size(MAX_CHUNK_SIZE);
    loop {
        match download.next().await {
            Ok(Some(chunk)) => file.write_all(&chunk).await?,
            Ok(None) => break,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(dest).await;
                return failed_download(dest, map_invocation(e));
            }
        }
    }
    file.flush().await?;
    Ok(true)
}

/// A flood-wait goes back to the caller's retry policy; anything else means "no artifact".
fn failed_download(dest: &Path, err: Error) -> Result<bool> {
    if err.retry_after().is_some() {
        return Err(err);
    }
    tracing::warn!("download to {} failed: {err}", dest.display());
    Ok(false)
}
