use mockito::{Matcher, Server};
use serde_json::json;

use super::api::JellyfinClient;
use crate::backends::traits::{CatalogService, DeliveryError, TrackingService};
use crate::constants::PLAYLIST_ITEM_ID;
use crate::models::{
    ItemId, ItemKind, PlayMethod, PlaySessionId, RepeatMode, SeriesId, UserId,
};
use crate::reporting::{ProgressReport, ReportKind};

fn create_test_client(server: &Server) -> JellyfinClient {
    JellyfinClient::new(server.url(), "test_token", UserId::new("user-1"))
}

fn create_report(kind: ReportKind, is_paused: bool) -> ProgressReport {
    ProgressReport {
        kind,
        item_id: ItemId::new("item-1"),
        media_source_id: ItemId::new("item-1"),
        play_session_id: PlaySessionId::new("session-1"),
        can_seek: true,
        is_paused,
        is_muted: false,
        audio_stream_index: 1,
        subtitle_stream_index: Some(10),
        position_ticks: 1_800_000_000,
        playback_start_time_ticks: 16_000_000_000_000_000,
        volume_level: Some(100),
        brightness: Some(100),
        play_method: PlayMethod::DirectPlay,
        repeat_mode: RepeatMode::RepeatNone,
        playlist_item_id: PLAYLIST_ITEM_ID.to_string(),
    }
}

fn create_episodes_response() -> serde_json::Value {
    json!({
        "Items": [
            {
                "Id": "a",
                "Name": "Episode 1",
                "Type": "Episode",
                "SeriesId": "series-1",
                "RunTimeTicks": 3_600_000_000i64,
                "UserData": {
                    "PlaybackPositionTicks": 0,
                    "PlayedPercentage": 100.0
                }
            },
            {
                "Id": "b",
                "Name": "Episode 2",
                "Type": "Episode",
                "SeriesId": "series-1",
                "RunTimeTicks": 3_600_000_000i64
            },
            {
                "Id": "c",
                "Name": "Episode 3",
                "Type": "Episode",
                "SeriesId": "series-1",
                "RunTimeTicks": 3_600_000_000i64
            }
        ]
    })
}

fn create_item_response() -> serde_json::Value {
    json!({
        "Id": "item-1",
        "Name": "Episode 2",
        "Type": "Episode",
        "SeriesId": "series-1",
        "RunTimeTicks": 3_600_000_000i64,
        "Path": "/media/shows/series-1/episode-2.mkv",
        "Chapters": [
            { "StartPositionTicks": 0, "Name": "Opening" },
            { "StartPositionTicks": 1_200_000_000i64, "Name": "Middle" }
        ],
        "UserData": {
            "PlaybackPositionTicks": 1_800_000_000i64,
            "PlayedPercentage": 50.0
        }
    })
}

fn create_playback_info_response(transcoding: bool) -> serde_json::Value {
    let mut source = json!({
        "Id": "item-1",
        "Container": "mkv",
        "MediaStreams": [
            {
                "Index": 0,
                "Type": "Video",
                "DisplayTitle": "1080p H264",
                "Codec": "h264"
            },
            {
                "Index": 1,
                "Type": "Audio",
                "DisplayTitle": "English (Stereo)",
                "Language": "eng",
                "Codec": "aac"
            },
            {
                "Index": 10,
                "Type": "Subtitle",
                "DisplayTitle": "English",
                "Language": "eng",
                "Codec": "srt"
            }
        ]
    });
    if transcoding {
        source["TranscodingUrl"] = json!("/Videos/item-1/master.m3u8?DeviceId=abc");
    }
    json!({
        "MediaSources": [source],
        "PlaySessionId": "session-1"
    })
}

#[tokio::test]
async fn test_start_report_posts_playstate() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/Sessions/Playing")
        .match_header("x-emby-authorization", Matcher::Regex("MediaBrowser".to_string()))
        .match_body(Matcher::PartialJson(json!({
            "ItemId": "item-1",
            "MediaSourceId": "item-1",
            "PlaySessionId": "session-1",
            "IsPaused": false,
            "PositionTicks": 1_800_000_000i64,
            "VolumeLevel": 100,
            "PlayMethod": "DirectPlay",
            "RepeatMode": "RepeatNone",
            "PlaylistItemId": "playlistItem0"
        })))
        .with_status(204)
        .create_async()
        .await;

    let client = create_test_client(&server);
    client
        .report_start(&create_report(ReportKind::Start, false))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_pause_report_rides_on_the_start_endpoint() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/Sessions/Playing")
        .match_body(Matcher::PartialJson(json!({ "IsPaused": true })))
        .with_status(204)
        .create_async()
        .await;

    let client = create_test_client(&server);
    client
        .report_pause(&create_report(ReportKind::Pause, true))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_progress_and_stop_use_their_own_endpoints() {
    let mut server = Server::new_async().await;
    let progress = server
        .mock("POST", "/Sessions/Playing/Progress")
        .match_body(Matcher::PartialJson(json!({ "PositionTicks": 1_800_000_000i64 })))
        .with_status(204)
        .create_async()
        .await;
    let stopped = server
        .mock("POST", "/Sessions/Playing/Stopped")
        .match_body(Matcher::PartialJson(json!({ "PositionTicks": 1_800_000_000i64 })))
        .with_status(204)
        .create_async()
        .await;

    let client = create_test_client(&server);
    client
        .report_progress(&create_report(ReportKind::Progress, false))
        .await
        .unwrap();
    client
        .report_stop(&create_report(ReportKind::Stop, false))
        .await
        .unwrap();

    progress.assert_async().await;
    stopped.assert_async().await;
}

#[tokio::test]
async fn test_rejected_report_surfaces_the_status() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/Sessions/Playing/Progress")
        .with_status(500)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let result = client
        .report_progress(&create_report(ReportKind::Progress, false))
        .await;

    match result {
        Err(DeliveryError::Rejected(status)) => assert_eq!(status, 500),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_neighbors_queries_the_adjacent_window() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/Shows/series-1/Episodes")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("UserId".to_string(), "user-1".to_string()),
            Matcher::UrlEncoded("AdjacentTo".to_string(), "b".to_string()),
            Matcher::UrlEncoded("Limit".to_string(), "3".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(create_episodes_response().to_string())
        .create_async()
        .await;

    let client = create_test_client(&server);
    let items = client
        .fetch_neighbors(&SeriesId::new("series-1"), &ItemId::new("b"), 3)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].id.as_str(), "a");
    assert_eq!(items[2].id.as_str(), "c");
    assert!(items.iter().all(|item| item.kind == ItemKind::Episode));
    assert_eq!(
        items[0].series_id.as_ref().map(|id| id.as_str()),
        Some("series-1")
    );
}

#[tokio::test]
async fn test_resolve_stream_info_builds_a_descriptor() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/Users/user-1/Items/item-1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(create_item_response().to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/Items/item-1/PlaybackInfo")
        .match_query(Matcher::UrlEncoded("UserId".to_string(), "user-1".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(create_playback_info_response(false).to_string())
        .create_async()
        .await;

    let client = create_test_client(&server);
    let descriptor = client
        .resolve_stream_info(&ItemId::new("item-1"))
        .await
        .unwrap();

    assert_eq!(descriptor.item.id.as_str(), "item-1");
    assert_eq!(descriptor.item.kind, ItemKind::Episode);
    assert_eq!(descriptor.response.play_session_id.as_str(), "session-1");
    assert_eq!(descriptor.play_method, PlayMethod::DirectPlay);
    assert_eq!(descriptor.container, "mkv");
    assert_eq!(descriptor.filename.as_deref(), Some("episode-2.mkv"));

    // streams are split by type; the video stream is not carried
    assert_eq!(descriptor.audio_streams.len(), 1);
    assert_eq!(descriptor.audio_streams[0].index, 1);
    assert_eq!(descriptor.subtitle_streams.len(), 1);
    assert_eq!(descriptor.subtitle_streams[0].index, 10);

    assert_eq!(descriptor.chapters.len(), 2);
    assert_eq!(descriptor.chapters[1].start_position_ticks, 1_200_000_000);

    assert!(
        descriptor
            .direct_url
            .path()
            .starts_with("/Videos/item-1/stream.mkv")
    );
    assert!(descriptor.transcoded_url.is_none());
}

#[tokio::test]
async fn test_transcoding_source_switches_the_play_method() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/Users/user-1/Items/item-1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(create_item_response().to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/Items/item-1/PlaybackInfo")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(create_playback_info_response(true).to_string())
        .create_async()
        .await;

    let client = create_test_client(&server);
    let descriptor = client
        .resolve_stream_info(&ItemId::new("item-1"))
        .await
        .unwrap();

    assert_eq!(descriptor.play_method, PlayMethod::Transcode);
    let transcoded = descriptor.transcoded_url.unwrap();
    assert!(transcoded.path().ends_with("/Videos/item-1/master.m3u8"));
}
