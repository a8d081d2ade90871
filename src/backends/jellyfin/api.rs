use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::backends::traits::{CatalogService, DeliveryError, TrackingService};
use crate::constants::{CLIENT_NAME, CLIENT_VERSION};
use crate::models::{
    ChapterInfo, ItemId, ItemKind, MediaDescriptor, MediaItemInfo, MediaStream, PlayMethod,
    PlaySessionId, PlaybackInfoResponse, SeriesId, UserId, UserItemData,
};
use crate::reporting::ProgressReport;

/// HTTP client for a Jellyfin-compatible server, covering the two concerns
/// this crate needs: playback-info/neighbor lookups and playstate reports.
#[derive(Clone)]
pub struct JellyfinClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    user_id: UserId,
    device_id: String,
}

impl JellyfinClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, user_id: UserId) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let base_url: String = base_url.into();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            user_id,
            device_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn auth_header(&self) -> String {
        format!(
            r#"MediaBrowser Client="{}", Device="Linux", DeviceId="{}", Version="{}", Token="{}""#,
            CLIENT_NAME, self.device_id, CLIENT_VERSION, self.api_key
        )
    }

    async fn get_item(&self, item_id: &ItemId) -> Result<ItemDto> {
        let url = format!(
            "{}/Users/{}/Items/{}",
            self.base_url, self.user_id, item_id
        );

        let response = self
            .client
            .get(&url)
            .header("X-Emby-Authorization", self.auth_header())
            .query(&[("Fields", "Chapters,Path")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch item {}: {}", item_id, response.status()));
        }

        Ok(response.json().await?)
    }

    async fn get_playback_info(&self, item_id: &ItemId) -> Result<PlaybackInfoDto> {
        let url = format!("{}/Items/{}/PlaybackInfo", self.base_url, item_id);

        let response = self
            .client
            .post(&url)
            .header("X-Emby-Authorization", self.auth_header())
            .query(&[("UserId", self.user_id.as_str())])
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to fetch playback info for {}: {}",
                item_id,
                response.status()
            ));
        }

        Ok(response.json().await?)
    }

    fn direct_stream_url(&self, item_id: &ItemId, container: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/Videos/{}/stream.{}",
            self.base_url, item_id, container
        ))?;
        url.query_pairs_mut()
            .append_pair("Static", "true")
            .append_pair("MediaSourceId", item_id.as_str())
            .append_pair("DeviceId", &self.device_id)
            .append_pair("api_key", &self.api_key);
        Ok(url)
    }

    async fn post_playstate(
        &self,
        path: &str,
        report: &ProgressReport,
    ) -> Result<(), DeliveryError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("X-Emby-Authorization", self.auth_header())
            .json(report)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Rejected(response.status().as_u16()));
        }

        debug!("Playstate report posted to {}", path);
        Ok(())
    }
}

#[async_trait]
impl CatalogService for JellyfinClient {
    async fn resolve_stream_info(&self, item_id: &ItemId) -> Result<MediaDescriptor> {
        let item = self.get_item(item_id).await?;
        let info = self.get_playback_info(item_id).await?;

        let source = info
            .media_sources
            .first()
            .ok_or_else(|| anyhow!("No media sources for item {}", item_id))?;

        let play_session_id = info
            .play_session_id
            .ok_or_else(|| anyhow!("No play session id for item {}", item_id))?;

        let audio_streams = source.streams_of_type("Audio");
        let subtitle_streams = source.streams_of_type("Subtitle");

        let container = source.container.clone().unwrap_or_default();
        let direct_url = self.direct_stream_url(item_id, &container)?;

        let transcoded_url = source
            .transcoding_url
            .as_deref()
            .map(|path| Url::parse(&format!("{}{}", self.base_url, path)))
            .transpose()?;

        let play_method = if transcoded_url.is_some() {
            PlayMethod::Transcode
        } else {
            PlayMethod::DirectPlay
        };

        let filename = item
            .path
            .as_deref()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string);

        let chapters = item
            .chapters
            .iter()
            .map(|chapter| ChapterInfo {
                start_position_ticks: chapter.start_position_ticks.unwrap_or(0),
                name: chapter.name.clone(),
            })
            .collect();

        Ok(MediaDescriptor {
            item: item.into_item_info(),
            direct_url,
            transcoded_url,
            audio_streams,
            subtitle_streams,
            chapters,
            response: PlaybackInfoResponse {
                play_session_id: PlaySessionId::new(play_session_id),
            },
            play_method,
            container,
            filename,
        })
    }

    async fn fetch_neighbors(
        &self,
        series_id: &SeriesId,
        adjacent_to: &ItemId,
        window: usize,
    ) -> Result<Vec<MediaItemInfo>> {
        let url = format!("{}/Shows/{}/Episodes", self.base_url, series_id);
        let limit = window.to_string();

        let response = self
            .client
            .get(&url)
            .header("X-Emby-Authorization", self.auth_header())
            .query(&[
                ("UserId", self.user_id.as_str()),
                ("AdjacentTo", adjacent_to.as_str()),
                ("Limit", limit.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to fetch episodes adjacent to {}: {}",
                adjacent_to,
                response.status()
            ));
        }

        let items: ItemsResponse = response.json().await?;
        Ok(items
            .items
            .into_iter()
            .map(ItemDto::into_item_info)
            .collect())
    }
}

#[async_trait]
impl TrackingService for JellyfinClient {
    async fn report_start(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        self.post_playstate("Sessions/Playing", report).await
    }

    // Pause state rides on the start endpoint with IsPaused set.
    async fn report_pause(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        self.post_playstate("Sessions/Playing", report).await
    }

    async fn report_progress(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        self.post_playstate("Sessions/Playing/Progress", report).await
    }

    async fn report_stop(&self, report: &ProgressReport) -> Result<(), DeliveryError> {
        self.post_playstate("Sessions/Playing/Stopped", report).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<ItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemDto {
    id: String,
    name: Option<String>,
    #[serde(rename = "Type")]
    item_type: Option<String>,
    series_id: Option<String>,
    run_time_ticks: Option<i64>,
    user_data: Option<UserDataDto>,
    #[serde(default)]
    chapters: Vec<ChapterDto>,
    path: Option<String>,
}

impl ItemDto {
    fn into_item_info(self) -> MediaItemInfo {
        let kind = match self.item_type.as_deref() {
            Some("Movie") => ItemKind::Movie,
            Some("Episode") => ItemKind::Episode,
            _ => ItemKind::Other,
        };

        MediaItemInfo {
            id: ItemId::new(self.id),
            kind,
            title: self.name.unwrap_or_default(),
            series_id: self.series_id.map(SeriesId::new),
            run_time_ticks: self.run_time_ticks,
            user_data: self.user_data.map(|data| UserItemData {
                played_percentage: data.played_percentage,
                playback_position_ticks: data.playback_position_ticks,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserDataDto {
    played_percentage: Option<f64>,
    playback_position_ticks: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChapterDto {
    start_position_ticks: Option<i64>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlaybackInfoDto {
    #[serde(default)]
    media_sources: Vec<MediaSourceDto>,
    play_session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MediaSourceDto {
    container: Option<String>,
    #[serde(default)]
    media_streams: Vec<MediaStreamDto>,
    transcoding_url: Option<String>,
}

impl MediaSourceDto {
    fn streams_of_type(&self, stream_type: &str) -> Vec<MediaStream> {
        self.media_streams
            .iter()
            .filter(|stream| stream.stream_type.as_deref() == Some(stream_type))
            .map(|stream| MediaStream {
                index: stream.index.unwrap_or(-1),
                display_title: stream.display_title.clone(),
                language: stream.language.clone(),
                codec: stream.codec.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MediaStreamDto {
    index: Option<i32>,
    #[serde(rename = "Type")]
    stream_type: Option<String>,
    display_title: Option<String>,
    language: Option<String>,
    codec: Option<String>,
}
