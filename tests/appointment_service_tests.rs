mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};

use common::*;
use healthcare_plus_backend::model::appointment::{
    reference_code, AppointmentFilter, AppointmentPatch, AppointmentStatus, BookingRequest,
    Department, PageRequest,
};
use healthcare_plus_backend::model::principal::Principal;
use healthcare_plus_backend::repository::appointment_repo::APPOINTMENTS_COLLECTION;
use healthcare_plus_backend::repository::file_store::{record_id, Record};
use healthcare_plus_backend::service::appointment_service::{AppointmentService, AppointmentServiceImpl};
use healthcare_plus_backend::util::error::{ErrorKind, ServiceError};
use healthcare_plus_backend::util::notifier::NotificationDispatcher;

#[tokio::test]
async fn test_book_creates_pending_appointment_with_stable_reference() {
    let ctx = setup().await;
    let receipt = ctx
        .appointments
        .book(booking("Jane Doe", "jane@x.com", "general"), &Principal::Anonymous)
        .await
        .unwrap();

    let appointment = &receipt.appointment;
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert!(!appointment.id.is_empty());
    assert!(appointment.user_id.is_none());
    assert_eq!(receipt.reference, reference_code(&appointment.id));

    let stored = ctx.appointments.get(&appointment.id, &admin_principal()).await.unwrap();
    assert_eq!(stored.reference_code(), receipt.reference);
    assert!(receipt.reference.starts_with("APPT"));
}

#[tokio::test]
async fn test_book_records_user_id_of_signed_in_patient() {
    let ctx = setup().await;
    let patient = patient_principal("user-7", "someone@x.com");
    let receipt = ctx
        .appointments
        .book(booking("Sam", "sam@x.com", "cardiology"), &patient)
        .await
        .unwrap();
    assert_eq!(receipt.appointment.user_id.as_deref(), Some("user-7"));
}

#[tokio::test]
async fn test_book_rejects_unknown_department() {
    let ctx = setup().await;
    let err = ctx
        .appointments
        .book(booking("Jane", "jane@x.com", "dentistry"), &Principal::Anonymous)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // department names are matched exactly
    let err = ctx
        .appointments
        .book(booking("Jane", "jane@x.com", "Cardiology"), &Principal::Anonymous)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_book_rejects_long_message_and_missing_fields() {
    let ctx = setup().await;
    let mut request = booking("Jane", "jane@x.com", "general");
    request.message = Some("x".repeat(501));
    let err = ctx.appointments.book(request, &Principal::Anonymous).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut request = booking("Jane", "jane@x.com", "general");
    request.message = Some("x".repeat(500));
    assert!(ctx.appointments.book(request, &Principal::Anonymous).await.is_ok());

    // the bound applies before trimming
    let mut request = booking("Jane", "jane@x.com", "general");
    request.message = Some(format!("{}   ", "x".repeat(500)));
    let err = ctx.appointments.book(request, &Principal::Anonymous).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let request = BookingRequest { patient_phone: "  ".to_string(), ..booking("Jane", "jane@x.com", "general") };
    let err = ctx.appointments.book(request, &Principal::Anonymous).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_book_dispatches_pending_notification() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;
    ctx.dispatcher.flush().await;

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event.as_str(), "pending_received");
    assert_eq!(sent[0].reference, appointment.reference_code());
}

#[tokio::test]
async fn test_failed_notification_does_not_fail_booking() {
    let ctx = setup().await;
    let dispatcher = Arc::new(NotificationDispatcher::new(Arc::new(FailingNotifier)));
    dispatcher.init();
    let service = AppointmentServiceImpl::new(ctx.appointment_repo.clone(), dispatcher.clone());

    let receipt = service
        .book(booking("Jane", "jane@x.com", "general"), &Principal::Anonymous)
        .await;
    dispatcher.shutdown().await;
    assert!(receipt.is_ok());
}

#[tokio::test]
async fn test_book_confirm_cancel_then_recancel_scenario() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;
    assert_eq!(appointment.status, AppointmentStatus::Pending);

    let confirmed = ctx
        .appointments
        .set_status(&appointment.id, "confirmed", None, &admin_principal())
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert_eq!(confirmed.updated_by.as_deref(), Some("admin-1"));

    let jane = patient_principal("someone-else", "JANE@x.com");
    let cancelled = ctx.appointments.cancel(&appointment.id, None, &jane).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Cancelled by patient"));

    let err = ctx
        .appointments
        .cancel(&appointment.id, None, &admin_principal())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyCancelled));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let current = ctx.appointments.get(&appointment.id, &admin_principal()).await.unwrap();
    assert_eq!(current.status, AppointmentStatus::Cancelled);

    ctx.dispatcher.flush().await;
    assert_eq!(ctx.notifier.events(), vec!["pending_received", "confirmed", "cancelled"]);
}

#[tokio::test]
async fn test_cancel_already_cancelled_conflicts_for_authorized_callers() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;
    ctx.appointments
        .cancel(&appointment.id, Some("changed plans".to_string()), &admin_principal())
        .await
        .unwrap();

    for principal in [admin_principal(), patient_principal("p", "jane@x.com")] {
        let err = ctx.appointments.cancel(&appointment.id, None, &principal).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    // outsiders learn nothing about the status
    for principal in [patient_principal("q", "stranger@x.com"), Principal::Anonymous] {
        let err = ctx.appointments.cancel(&appointment.id, None, &principal).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}

#[tokio::test]
async fn test_admin_cancel_uses_given_reason() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;
    let cancelled = ctx
        .appointments
        .cancel(&appointment.id, Some("Doctor unavailable".to_string()), &admin_principal())
        .await
        .unwrap();
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Doctor unavailable"));
    assert_eq!(cancelled.cancelled_by.as_deref(), Some("admin-1"));

    ctx.dispatcher.flush().await;
    let sent = ctx.notifier.sent();
    let last = sent.last().unwrap();
    assert_eq!(
        last.event,
        healthcare_plus_backend::util::notifier::NotificationEvent::Cancelled {
            reason: "Doctor unavailable".to_string()
        }
    );
}

#[tokio::test]
async fn test_set_status_is_admin_only_and_leaves_record_untouched() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;

    for principal in [Principal::Anonymous, patient_principal("p", "jane@x.com")] {
        let err = ctx
            .appointments
            .set_status(&appointment.id, "confirmed", None, &principal)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    let current = ctx.appointments.get(&appointment.id, &admin_principal()).await.unwrap();
    assert_eq!(current.status, AppointmentStatus::Pending);
    assert_eq!(current.updated_at, appointment.updated_at);
}

#[tokio::test]
async fn test_set_status_rejects_unknown_status_and_missing_appointment() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;

    let err = ctx
        .appointments
        .set_status(&appointment.id, "done", None, &admin_principal())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = ctx
        .appointments
        .set_status("missing", "confirmed", None, &admin_principal())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_set_status_cancelled_records_reason_and_notifies() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;
    let cancelled = ctx
        .appointments
        .set_status(&appointment.id, "cancelled", None, &admin_principal())
        .await
        .unwrap();
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Cancelled by administrator"));

    let completed = ctx
        .appointments
        .set_status(&appointment.id, "completed", Some("seen".to_string()), &admin_principal())
        .await
        .unwrap();
    assert_eq!(completed.notes.as_deref(), Some("seen"));

    ctx.dispatcher.flush().await;
    assert_eq!(ctx.notifier.events(), vec!["pending_received", "cancelled"]);
}

#[tokio::test]
async fn test_reconfirming_does_not_notify_again() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;
    for _ in 0..2 {
        ctx.appointments
            .set_status(&appointment.id, "confirmed", None, &admin_principal())
            .await
            .unwrap();
    }
    ctx.dispatcher.flush().await;
    assert_eq!(ctx.notifier.events(), vec!["pending_received", "confirmed"]);
}

#[tokio::test]
async fn test_ownership_by_user_id_or_email() {
    let ctx = setup().await;
    let owner = patient_principal("user-1", "owner@x.com");
    let appointment = ctx
        .appointments
        .book(booking("Owner", "different@x.com", "general"), &owner)
        .await
        .unwrap()
        .appointment;

    // by user id
    assert!(ctx.appointments.get(&appointment.id, &owner).await.is_ok());
    // by patient email, case-insensitive
    let by_email = patient_principal("user-2", "DIFFERENT@X.COM");
    assert!(ctx.appointments.get(&appointment.id, &by_email).await.is_ok());

    let stranger = patient_principal("user-3", "stranger@x.com");
    let err = ctx.appointments.get(&appointment.id, &stranger).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = ctx.appointments.cancel(&appointment.id, None, &stranger).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = ctx.appointments.get(&appointment.id, &Principal::Anonymous).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    assert!(ctx.appointments.cancel(&appointment.id, None, &by_email).await.is_ok());
}

#[tokio::test]
async fn test_get_missing_appointment_is_not_found() {
    let ctx = setup().await;
    let err = ctx.appointments.get("nope", &admin_principal()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_list_mine_requires_login_and_filters_by_owner() {
    let ctx = setup().await;
    book(&ctx, "mine@x.com").await;
    book(&ctx, "other@x.com").await;
    book(&ctx, "Mine@X.com").await;

    let err = ctx.appointments.list_mine(&Principal::Anonymous).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let mine = ctx
        .appointments
        .list_mine(&patient_principal("u", "mine@x.com"))
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine[0].created_at >= mine[1].created_at);
}

/// Store 25 appointments with strictly increasing creation times, returning
/// their ids oldest first.
async fn seed_dated(ctx: &TestContext, count: usize) -> Vec<String> {
    let base = Utc::now() - Duration::days(1);
    let records: Vec<Record> = (0..count)
        .map(|i| {
            let at = (base + Duration::minutes(i as i64)).to_rfc3339();
            let value = serde_json::json!({
                "id": format!("appt{:02}", i),
                "patientName": format!("Patient {}", i),
                "patientEmail": format!("p{}@x.com", i),
                "patientPhone": "555",
                "department": if i % 2 == 0 { "general" } else { "cardiology" },
                "message": "",
                "status": "pending",
                "createdAt": at,
                "updatedAt": at,
            });
            match value {
                serde_json::Value::Object(map) => map,
                _ => unreachable!(),
            }
        })
        .collect();
    let ids = records.iter().map(|r| record_id(r).unwrap().to_string()).collect();
    ctx.store.bulk_persist(APPOINTMENTS_COLLECTION, records).await.unwrap();
    ids
}

#[tokio::test]
async fn test_list_all_paginates_newest_first() {
    let ctx = setup().await;
    let ids = seed_dated(&ctx, 25).await;
    let newest_first: Vec<String> = ids.iter().rev().cloned().collect();

    let page = |n| PageRequest { page: n, limit: 10 };
    let admin = admin_principal();

    let second = ctx.appointments.list_all(&admin, AppointmentFilter::default(), page(2)).await.unwrap();
    let got: Vec<String> = second.items.iter().map(|a| a.id.clone()).collect();
    assert_eq!(got, newest_first[10..20].to_vec());
    assert_eq!(second.total, 25);
    assert_eq!(second.pages, 3);

    let third = ctx.appointments.list_all(&admin, AppointmentFilter::default(), page(3)).await.unwrap();
    let got: Vec<String> = third.items.iter().map(|a| a.id.clone()).collect();
    assert_eq!(got, newest_first[20..25].to_vec());
    assert_eq!(third.count, 5);

    let fourth = ctx.appointments.list_all(&admin, AppointmentFilter::default(), page(4)).await.unwrap();
    assert!(fourth.items.is_empty());
}

#[tokio::test]
async fn test_list_all_filters_and_requires_admin() {
    let ctx = setup().await;
    seed_dated(&ctx, 6).await;

    let filter = AppointmentFilter { status: None, department: Some(Department::Cardiology) };
    let page = ctx
        .appointments
        .list_all(&admin_principal(), filter, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert!(page.items.iter().all(|a| a.department == Department::Cardiology));

    let err = ctx
        .appointments
        .list_all(&patient_principal("p", "p0@x.com"), AppointmentFilter::default(), PageRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_delete_requires_admin_and_existing_record() {
    let ctx = setup().await;
    let appointment = book(&ctx, "jane@x.com").await;

    let err = ctx
        .appointments
        .delete(&appointment.id, &patient_principal("p", "jane@x.com"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    assert!(ctx.appointments.delete(&appointment.id, &admin_principal()).await.unwrap());
    let err = ctx.appointments.delete(&appointment.id, &admin_principal()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_search_matches_case_insensitive_substrings() {
    let ctx = setup().await;
    seed_dated(&ctx, 4).await;

    let found = ctx.appointments.search("PATIENT 3").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "appt03");

    assert_eq!(ctx.appointments.search("cardio").await.unwrap().len(), 2);
    assert!(ctx.appointments.search("zzz").await.unwrap().is_empty());
    assert_eq!(ctx.appointments.search("  ").await.unwrap_err().kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_bulk_update_applies_patch_to_listed_ids() {
    let ctx = setup().await;
    seed_dated(&ctx, 4).await;

    let patch = AppointmentPatch { status: Some(AppointmentStatus::Completed), ..Default::default() };
    let updated = ctx
        .appointments
        .bulk_update(vec!["appt00".into(), "appt02".into(), "missing".into()], patch)
        .await
        .unwrap();
    assert_eq!(updated, 2);

    let admin = admin_principal();
    assert_eq!(ctx.appointments.get("appt00", &admin).await.unwrap().status, AppointmentStatus::Completed);
    assert_eq!(ctx.appointments.get("appt01", &admin).await.unwrap().status, AppointmentStatus::Pending);

    let err = ctx
        .appointments
        .bulk_update(vec!["appt01".into()], AppointmentPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_prune_removes_only_old_appointments() {
    let ctx = setup().await;
    seed_dated(&ctx, 3).await;
    let old = (Utc::now() - Duration::days(120)).to_rfc3339();
    ctx.store
        .create(
            APPOINTMENTS_COLLECTION,
            match serde_json::json!({
                "patientName": "Old", "patientEmail": "old@x.com", "patientPhone": "1",
                "department": "general", "status": "completed", "createdAt": old, "updatedAt": old,
            }) {
                serde_json::Value::Object(map) => map,
                _ => unreachable!(),
            },
        )
        .await
        .unwrap();

    assert_eq!(ctx.appointments.prune_older_than(90).await.unwrap(), 1);
    assert_eq!(ctx.appointments.search("x.com").await.unwrap().len(), 3);
}
