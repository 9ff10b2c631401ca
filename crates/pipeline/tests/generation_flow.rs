//! Job lifecycle against a scripted backend: completion, failures,
//! retries, cancellation, detach and resume.

mod common;

use std::time::Duration;

use common::*;
use crush_core::job::{PROGRESS_CANCELLED, PROGRESS_SUBMITTING, PROGRESS_UPLOADING};
use crush_core::{JobStatus, UploadMode};
use crush_events::bus::EVENT_JOB_COMPLETED;
use crush_events::Permission;
use crush_fal::ProgressEvent;
use crush_pipeline::{GenerationError, Resumed};

#[tokio::test]
async fn solo_job_completes_with_video_and_notifies_once() {
    let h = harness(ScriptedBackend::completing(), Permission::Granted);
    h.generator.notifier().request_permission();
    let mut events = h.generator.bus().subscribe();

    let job = solo_job();
    let composite_bytes = job.source_images.composite.as_ref().unwrap().bytes.clone();
    let mut handle = h.generator.submit(job);
    let done = handle.wait().await;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.video_url.as_deref(), Some(VIDEO_URL));
    assert_eq!(done.image_url.as_deref(), Some(UPLOADED_URL));
    assert_eq!(done.request_id.as_deref(), Some("req-1"));

    // The composite is what gets uploaded, and its URL is what gets submitted.
    let uploads = h.backend.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].bytes, composite_bytes);
    assert_eq!(uploads[0].content_type, "image/jpeg");
    assert_eq!(
        h.backend.submissions.lock().unwrap()[0].image_url,
        UPLOADED_URL
    );

    let mut progress = Vec::new();
    loop {
        let event = events.recv().await.unwrap();
        if event.is_terminal() {
            assert_eq!(event.event_type, EVENT_JOB_COMPLETED);
            // Persisted before published.
            assert_eq!(h.store.load().unwrap().status, JobStatus::Completed);
            break;
        }
        progress.push(event.progress);
    }
    assert!(progress.contains(&PROGRESS_UPLOADING.to_string()));
    assert!(progress.contains(&PROGRESS_SUBMITTING.to_string()));
    assert!(progress.contains(&"In queue (position 1)".to_string()));
    assert!(progress.contains(&"Rendering frames".to_string()));

    handle.join().await;
    assert_eq!(h.notifications.shown(), 1);
}

#[tokio::test]
async fn denied_permission_means_no_notification() {
    let h = harness(ScriptedBackend::completing(), Permission::Denied);
    h.generator.notifier().request_permission();

    let done = h.generator.submit(couple_job()).join().await;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(h.notifications.shown(), 0);
}

#[tokio::test]
async fn couple_job_uploads_the_couple_photo() {
    let h = harness(ScriptedBackend::completing(), Permission::Granted);
    let job = couple_job();
    let photo = job.source_images.slots[0].bytes.clone();

    h.generator.submit(job).join().await;

    let uploads = h.backend.uploads.lock().unwrap().clone();
    assert_eq!(uploads[0].bytes, photo);
    assert_eq!(uploads[0].content_type, "image/png");
    assert_eq!(uploads[0].file_name, "us.png");
}

#[tokio::test]
async fn failed_event_fails_the_job_without_notifying() {
    let backend = ScriptedBackend::new(vec![
        ProgressEvent::Queued { position: None },
        ProgressEvent::Failed {
            message: "NSFW content detected".into(),
        },
    ]);
    let h = harness(backend, Permission::Granted);
    h.generator.notifier().request_permission();

    let done = h.generator.submit(solo_job()).join().await;

    assert_eq!(done.status, JobStatus::Error);
    assert_eq!(
        done.progress,
        GenerationError::Generation("NSFW content detected".into()).to_string()
    );
    assert_eq!(h.store.load().unwrap().status, JobStatus::Error);
    assert_eq!(h.notifications.shown(), 0);
}

#[tokio::test]
async fn stream_without_terminal_event_is_a_generation_error() {
    let backend = ScriptedBackend::new(vec![ProgressEvent::InProgress { message: None }]);
    let h = harness(backend, Permission::Granted);

    let done = h.generator.submit(solo_job()).join().await;

    assert_eq!(done.status, JobStatus::Error);
    assert!(done.progress.starts_with("Generation failed"));
}

#[tokio::test]
async fn transient_upload_failure_is_retried() {
    let backend = ScriptedBackend::completing().fail_uploads(vec![api_error(503, "busy")]);
    let h = harness(backend, Permission::Granted);

    let done = h.generator.submit(solo_job()).join().await;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(h.backend.upload_count(), 1);
}

#[tokio::test]
async fn permanent_upload_failure_stops_before_submission() {
    let backend =
        ScriptedBackend::completing().fail_uploads(vec![api_error(413, "File too large")]);
    let h = harness(backend, Permission::Granted);

    let done = h.generator.submit(solo_job()).join().await;

    assert_eq!(done.status, JobStatus::Error);
    assert_eq!(done.progress, "Upload failed: File too large");
    assert_eq!(h.backend.submission_count(), 0);
}

#[tokio::test]
async fn submission_failure_after_retries_is_reported() {
    let backend = ScriptedBackend::completing().fail_submissions(vec![
        api_error(500, "down"),
        api_error(502, "down"),
        api_error(503, "still down"),
    ]);
    let h = harness(backend, Permission::Granted);

    let done = h.generator.submit(solo_job()).join().await;

    assert_eq!(done.status, JobStatus::Error);
    assert_eq!(done.progress, "Submission failed: still down");
    // Image URL survives so a resume does not upload again.
    assert_eq!(h.store.load().unwrap().image_url.as_deref(), Some(UPLOADED_URL));
}

#[tokio::test]
async fn cancel_stops_job_and_clears_snapshot() {
    let h = harness(ScriptedBackend::hanging(), Permission::Granted);
    h.generator.notifier().request_permission();

    let handle = h.generator.submit(solo_job());
    let mut state = handle.subscribe();
    state
        .wait_for(|job| job.progress.starts_with("In queue"))
        .await
        .unwrap();

    handle.cancel();
    let done = handle.join().await;

    assert_eq!(done.status, JobStatus::Error);
    assert_eq!(done.progress, PROGRESS_CANCELLED);
    assert_eq!(h.backend.cancels.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(h.store.load().is_none());
    assert_eq!(h.notifications.shown(), 0);
}

#[tokio::test]
async fn detach_keeps_pending_snapshot() {
    let h = harness(ScriptedBackend::hanging(), Permission::Granted);

    let handle = h.generator.submit(solo_job());
    let mut state = handle.subscribe();
    state
        .wait_for(|job| job.request_id.is_some())
        .await
        .unwrap();

    handle.detach();
    let done = handle.join().await;

    assert_eq!(done.status, JobStatus::Pending);
    let stored = h.store.load().unwrap();
    assert_eq!(stored.status, JobStatus::Pending);
    assert_eq!(stored.image_url.as_deref(), Some(UPLOADED_URL));
    assert_eq!(h.backend.cancels.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resume_replays_submission_with_persisted_image_url() {
    let h = harness(ScriptedBackend::completing(), Permission::Granted);
    let mut job = solo_job();
    job.set_image_url("https://cdn.example/uploads/earlier.jpg");
    job.set_request_id("req-old");
    h.store.save(&job).unwrap();

    let resumed = h.generator.resume();
    let Some(Resumed::Running(handle)) = resumed else {
        panic!("pending job should resume");
    };
    assert_eq!(handle.job_id(), job.id);
    let done = handle.join().await;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.video_url.as_deref(), Some(VIDEO_URL));
    assert_eq!(h.backend.upload_count(), 0);
    assert_eq!(
        h.backend.submissions.lock().unwrap()[0].image_url,
        "https://cdn.example/uploads/earlier.jpg"
    );
    assert_eq!(h.generator.notifier().permission(), Permission::Granted);
    assert_eq!(h.notifications.shown(), 1);
}

#[tokio::test]
async fn resume_without_image_url_uploads_persisted_photos() {
    let h = harness(ScriptedBackend::completing(), Permission::Granted);
    h.store.save(&couple_job()).unwrap();

    let Some(Resumed::Running(handle)) = h.generator.resume() else {
        panic!("pending job should resume");
    };
    let done = handle.join().await;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.mode, UploadMode::Couple);
    assert_eq!(h.backend.upload_count(), 1);
}

#[tokio::test]
async fn resume_after_detach_in_a_new_generator() {
    let first = harness(ScriptedBackend::hanging(), Permission::Granted);
    let handle = first.generator.submit(solo_job());
    let mut state = handle.subscribe();
    state.wait_for(|job| job.request_id.is_some()).await.unwrap();
    handle.detach();
    let detached = handle.join().await;

    // Same storage, fresh process.
    let backend = std::sync::Arc::new(ScriptedBackend::completing());
    let notifications = CountingNotifications::new(Permission::Granted);
    let generator = generator_over(backend.clone(), notifications.clone(), first.store.clone());

    let Some(Resumed::Running(handle)) = generator.resume() else {
        panic!("pending job should resume");
    };
    let done = handle.join().await;

    assert_eq!(done.id, detached.id);
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(backend.upload_count(), 0);
    assert_eq!(notifications.shown(), 1);
}

#[tokio::test]
async fn resumed_job_with_denied_permission_stays_silent() {
    let h = harness(ScriptedBackend::completing(), Permission::Denied);
    h.store.save(&couple_job()).unwrap();

    let Some(Resumed::Running(handle)) = h.generator.resume() else {
        panic!("pending job should resume");
    };
    let done = handle.join().await;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(h.notifications.shown(), 0);
}

#[tokio::test]
async fn late_cancel_of_replaced_job_keeps_newer_snapshot() {
    let h = harness(
        ScriptedBackend::hanging().with_cancel_delay(Duration::from_millis(50)),
        Permission::Granted,
    );

    let old = h.generator.submit(solo_job());
    let mut old_state = old.subscribe();
    old_state
        .wait_for(|job| job.request_id.is_some())
        .await
        .unwrap();

    old.cancel();
    let new = h.generator.submit(couple_job());
    let new_id = new.job_id();
    let mut new_state = new.subscribe();
    new_state
        .wait_for(|job| job.progress.starts_with("In queue"))
        .await
        .unwrap();

    let cancelled = old.join().await;
    assert_eq!(cancelled.progress, PROGRESS_CANCELLED);
    assert_eq!(h.backend.cancels.load(std::sync::atomic::Ordering::SeqCst), 1);

    let stored = h.store.load().expect("newer job keeps its snapshot");
    assert_eq!(stored.id, new_id);
    assert_eq!(stored.status, JobStatus::Pending);
    assert_eq!(stored.mode, UploadMode::Couple);

    new.cancel();
    new.join().await;
    assert!(h.store.load().is_none());
}

#[tokio::test]
async fn replaced_job_progress_does_not_overwrite_newer_snapshot() {
    let h = harness(ScriptedBackend::hanging(), Permission::Granted);

    let old = h.generator.submit(solo_job());
    let new = h.generator.submit(couple_job());
    let mut new_state = new.subscribe();
    new_state
        .wait_for(|job| job.progress.starts_with("In queue"))
        .await
        .unwrap();
    let mut old_state = old.subscribe();
    old_state
        .wait_for(|job| job.progress.starts_with("In queue"))
        .await
        .unwrap();

    let stored = h.store.load().unwrap();
    assert_eq!(stored.id, new.job_id());
    assert_eq!(stored.mode, UploadMode::Couple);

    old.detach();
    new.detach();
    old.join().await;
    new.join().await;
}

#[tokio::test]
async fn finished_job_is_shown_not_resumed() {
    let h = harness(ScriptedBackend::completing(), Permission::Granted);
    let mut job = couple_job();
    job.complete(VIDEO_URL);
    h.store.save(&job).unwrap();

    match h.generator.resume() {
        Some(Resumed::Finished(stored)) => assert_eq!(stored.id, job.id),
        _ => panic!("finished job should not resume"),
    }
    assert_eq!(h.backend.submission_count(), 0);
}

#[tokio::test]
async fn nothing_to_resume_on_empty_store() {
    let h = harness(ScriptedBackend::completing(), Permission::Granted);
    assert!(h.generator.resume().is_none());
}

#[tokio::test]
async fn discarding_pending_job_marks_it_cancelled() {
    let h = harness(ScriptedBackend::completing(), Permission::Granted);
    let job = solo_job();
    h.store.save(&job).unwrap();

    let dropped = h.generator.discard_stored().unwrap();

    assert_eq!(dropped.id, job.id);
    assert_eq!(dropped.status, JobStatus::Error);
    assert_eq!(dropped.progress, PROGRESS_CANCELLED);
    assert!(h.store.load().is_none());
    assert!(h.generator.resume().is_none());
    assert_eq!(h.backend.submission_count(), 0);
}
