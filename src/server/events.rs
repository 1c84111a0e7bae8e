//! Event endpoints

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use crate::database::service::EventSnapshot;
use crate::models::{
    CreateEventRequest, EventStatus, FinalizeRequest, ParticipantStatus, ReminderSchedule, VotePreference,
    VoteRequest, VoteResponse,
};
use crate::server::auth::credential_from_headers;
use crate::server::AppState;
use crate::services::CreatedEvent;
use crate::utils::errors::{GatherBuddyError, Result};

/// POST /api/events
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreatedEvent>)> {
    let created = state.services.scheduling_service.create_event(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub yes: usize,
    pub maybe: usize,
    pub viable: bool,
    pub perfect: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotView {
    pub slot_id: i64,
    pub preference: VotePreference,
    pub can_host: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: i64,
    pub name: String,
    pub status: ParticipantStatus,
    pub votes: Vec<BallotView>,
}

/// What the voting page may see; no credentials or chat ids
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub slug: String,
    pub title: String,
    pub status: EventStatus,
    pub min_players: i32,
    pub max_players: Option<i32>,
    pub finalized_slot_id: Option<i64>,
    pub finalized_host_id: Option<i64>,
    pub location: Option<String>,
    pub slots: Vec<SlotView>,
    pub participants: Vec<ParticipantView>,
}

impl From<&EventSnapshot> for EventView {
    fn from(snapshot: &EventSnapshot) -> Self {
        let quorum = snapshot.quorum();
        let event = &snapshot.event;

        let slots = snapshot
            .slots
            .iter()
            .map(|slot| {
                let tally = quorum.slot(slot.id);
                SlotView {
                    id: slot.id,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    yes: tally.map_or(0, |t| t.yes),
                    maybe: tally.map_or(0, |t| t.maybe),
                    viable: tally.is_some_and(|t| t.viable),
                    perfect: tally.is_some_and(|t| t.perfect),
                }
            })
            .collect();

        let participants = snapshot
            .participants
            .iter()
            .map(|participant| ParticipantView {
                id: participant.id,
                name: participant.name.clone(),
                status: participant.status,
                votes: snapshot
                    .votes
                    .iter()
                    .filter(|vote| vote.participant_id == participant.id)
                    .map(|vote| BallotView {
                        slot_id: vote.slot_id,
                        preference: vote.preference,
                        can_host: vote.can_host,
                    })
                    .collect(),
            })
            .collect();

        Self {
            slug: event.slug.clone(),
            title: event.title.clone(),
            status: event.status,
            min_players: event.min_players,
            max_players: event.max_players,
            finalized_slot_id: event.finalized_slot_id,
            finalized_host_id: event.finalized_host_id,
            location: event.location.clone(),
            slots,
            participants,
        }
    }
}

/// GET /api/events/:slug
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<EventView>> {
    let event = state.services.database.require_event(&slug).await?;
    let snapshot = state
        .services
        .database
        .load_snapshot(event.id)
        .await?
        .ok_or(GatherBuddyError::EventNotFound { slug })?;
    Ok(Json(EventView::from(&snapshot)))
}

/// POST /api/events/:slug/votes
pub async fn vote(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    let response = state.services.scheduling_service.vote(&slug, request).await?;
    Ok(Json(response))
}

/// POST /api/events/:slug/finalize
pub async fn finalize(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(request): Json<FinalizeRequest>,
) -> Result<StatusCode> {
    let credential = credential_from_headers(&headers);
    state
        .services
        .scheduling_service
        .finalize(&slug, credential.as_ref(), request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/events/:slug/cancel
pub async fn cancel(State(state): State<AppState>, Path(slug): Path<String>, headers: HeaderMap) -> Result<StatusCode> {
    let credential = credential_from_headers(&headers);
    state
        .services
        .scheduling_service
        .cancel(&slug, credential.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub location: Option<String>,
}

/// PATCH /api/events/:slug/location
pub async fn update_location(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(request): Json<LocationRequest>,
) -> Result<StatusCode> {
    let credential = credential_from_headers(&headers);
    state
        .services
        .scheduling_service
        .update_location(&slug, credential.as_ref(), request.location)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderView {
    pub enabled: bool,
    pub time: Option<NaiveTime>,
    pub days: Vec<i32>,
}

/// PUT /api/events/:slug/reminders
pub async fn update_reminders(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(schedule): Json<ReminderSchedule>,
) -> Result<Json<ReminderView>> {
    let credential = credential_from_headers(&headers);
    let event = state
        .services
        .scheduling_service
        .update_reminder_schedule(&slug, credential.as_ref(), schedule)
        .await?;
    Ok(Json(ReminderView {
        enabled: event.reminder_enabled,
        time: event.reminder_time,
        days: event.reminder_days,
    }))
}

/// DELETE /api/events/:slug
pub async fn delete(State(state): State<AppState>, Path(slug): Path<String>, headers: HeaderMap) -> Result<StatusCode> {
    let credential = credential_from_headers(&headers);
    state
        .services
        .scheduling_service
        .delete(&slug, credential.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/events/:slug/participants/:id
pub async fn remove_participant(
    State(state): State<AppState>,
    Path((slug, participant_id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let credential = credential_from_headers(&headers);
    state
        .services
        .scheduling_service
        .remove_participant(&slug, credential.as_ref(), participant_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
