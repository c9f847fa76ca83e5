mod common;

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::Utc;
use notification::{
    preference::PreferencesUpdate,
    provider::{MockProvider, ProviderError},
    retry::{ErrorClass, RetryOptions},
    Channel, ChannelSet, Delivery, Flow, NotificationRequest, NotificationService,
};

use self::common::{booking_variables, recipient, vars, Behavior, Spies, Spy};

fn mock_service() -> NotificationService {
    let mock = Arc::new(MockProvider::default());
    NotificationService::builder()
        .email_provider(mock.clone())
        .sms_provider(mock.clone())
        .whatsapp_provider(mock)
        .retry(RetryOptions::no_retry())
        .build()
}

#[tokio::test]
async fn test_opted_out_customer_touches_no_provider() {
    let spies = Spies::succeeding();
    let service = spies.service();
    let _stored = service.opt_out_customer("CUST-1").await.unwrap();

    let result =
        service.send_booking_confirmation("CUST-1", "RES-1", recipient(), booking_variables()).await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.channels.is_empty());
    assert_eq!(spies.total_calls(), 0);
}

#[tokio::test]
async fn test_booking_confirmation_with_mock_providers() {
    let service = mock_service();

    let result =
        service.send_booking_confirmation("CUST-1", "RES-1", recipient(), booking_variables()).await;

    assert!(result.success, "{:?}", result.errors);
    assert!(result.errors.is_empty());
    let whatsapp = result.get(Channel::WhatsApp).unwrap();
    let email = result.get(Channel::Email).unwrap();
    assert!(whatsapp.message_id.as_deref().unwrap().starts_with("mock_whatsapp_"));
    assert!(email.message_id.as_deref().unwrap().starts_with("mock_email_"));
    assert_ne!(whatsapp.message_id, email.message_id);
    // WhatsApp delivered, so SMS is not attempted.
    assert!(result.get(Channel::Sms).is_none());
}

#[tokio::test]
async fn test_booking_confirmation_without_whatsapp_yields_distinct_ids() {
    let service = mock_service();
    let _stored = service
        .set_customer_preferences(
            "CUST-1",
            &PreferencesUpdate {
                channels: Some(ChannelSet { email: true, sms: true, whatsapp: false }),
                ..PreferencesUpdate::default()
            },
        )
        .await
        .unwrap();

    let result =
        service.send_booking_confirmation("CUST-1", "RES-1", recipient(), booking_variables()).await;

    assert!(result.success);
    let ids: HashSet<String> =
        result.channels.values().filter_map(|send| send.message_id.clone()).collect();
    assert_eq!(ids.len(), 2);
    assert!(result.get(Channel::Sms).is_some_and(|send| send.success));
    assert!(result.get(Channel::Email).is_some_and(|send| send.success));
}

#[tokio::test]
async fn test_otp_attempts_only_sms() {
    let spies = Spies::succeeding();
    let service = spies.service();
    let _stored = service
        .set_customer_preferences(
            "CUST-1",
            &PreferencesUpdate {
                channels: Some(ChannelSet::only(Channel::Email)),
                ..PreferencesUpdate::default()
            },
        )
        .await
        .unwrap();

    let result = service.send_otp("CUST-1", "+905551234567", "123456").await;

    assert!(result.success);
    assert_eq!(result.channels.keys().copied().collect::<Vec<_>>(), vec![Channel::Sms]);
    assert_eq!(spies.sms.calls(), 1);
    assert_eq!(spies.email.calls() + spies.whatsapp.calls(), 0);
    assert!(spies.sms.bodies()[0].contains("123456"));
}

#[tokio::test]
async fn test_whatsapp_failure_falls_back_to_sms() {
    let spies = Spies {
        email: Spy::succeeding("email-spy"),
        sms: Spy::succeeding("sms-spy"),
        whatsapp: Spy::failing("whatsapp-spy"),
    };
    let service = spies.service();

    let result = service
        .send_qr_code(
            "CUST-1",
            "RES-1",
            recipient(),
            vars(&[("customerName", "Ahmet"), ("qrCodeUrl", "https://qr.example.com/RES-1.png")]),
        )
        .await;

    assert!(result.success);
    assert_eq!(spies.whatsapp.calls(), 1);
    assert_eq!(spies.sms.calls(), 1);
    assert_eq!(spies.email.calls(), 0);
    let whatsapp = result.get(Channel::WhatsApp).unwrap();
    assert!(!whatsapp.success);
    assert_eq!(whatsapp.error_class, Some(ErrorClass::Unavailable));
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("whatsapp: "));
}

#[tokio::test]
async fn test_driver_assignment_uses_whatsapp_only() {
    let spies = Spies::succeeding();
    let service = spies.service();

    let result = service
        .send_driver_assignment(
            "CUST-1",
            "RES-1",
            recipient(),
            vars(&[
                ("customerName", "Ahmet"),
                ("driverName", "Mehmet"),
                ("driverPhone", "+905559876543"),
                ("vehiclePlate", "34 ABC 123"),
            ]),
        )
        .await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(spies.whatsapp.calls(), 1);
    assert_eq!(spies.sms.calls() + spies.email.calls(), 0);
    assert!(spies.whatsapp.bodies()[0].contains("34 ABC 123"));
}

#[tokio::test]
async fn test_missing_variable_skips_only_its_channel() {
    let spies = Spies::succeeding();
    let mut variables = booking_variables();
    drop(variables.remove("pickupTime"));
    let service = NotificationService::builder()
        .email_provider(spies.email.clone())
        .sms_provider(spies.sms.clone())
        .whatsapp_provider(spies.whatsapp.clone())
        .register_template(notification::template::Template {
            id: "booking_confirmation_tr".to_string(),
            locale: "tr".to_string(),
            category: notification::template::TemplateCategory::Booking,
            required_variables: vec!["customerName".to_string()],
            content: notification::template::TemplateContent::WhatsApp {
                body: "Merhaba {customerName}, rezervasyonunuz {reservationId} onaylandı.".to_string(),
                media_url: None,
            },
        })
        .retry(RetryOptions::no_retry())
        .build();

    let result = service.send_booking_confirmation("CUST-1", "RES-1", recipient(), variables).await;

    // The relaxed WhatsApp template renders, SMS and email lack `pickupTime`.
    assert!(result.success);
    assert_eq!(spies.whatsapp.calls(), 1);
    assert_eq!(spies.sms.calls() + spies.email.calls(), 0);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|error| error.contains("pickupTime")));
    assert_eq!(result.get(Channel::Email).unwrap().error_class, Some(ErrorClass::InvalidArgument));
}

#[tokio::test]
async fn test_whatsapp_template_error_still_sends_sms() {
    let spies = Spies::succeeding();
    let service = NotificationService::builder()
        .email_provider(spies.email.clone())
        .sms_provider(spies.sms.clone())
        .whatsapp_provider(spies.whatsapp.clone())
        .register_template(notification::template::Template {
            id: "qr_code_tr".to_string(),
            locale: "tr".to_string(),
            category: notification::template::TemplateCategory::Access,
            required_variables: vec!["boardingGate".to_string()],
            content: notification::template::TemplateContent::WhatsApp {
                body: "Kapı {boardingGate}".to_string(),
                media_url: Some("{qrCodeUrl}".to_string()),
            },
        })
        .retry(RetryOptions::no_retry())
        .build();

    let result = service
        .send_qr_code(
            "CUST-1",
            "RES-1",
            recipient(),
            vars(&[("customerName", "Ahmet"), ("qrCodeUrl", "https://qr.example.com/RES-1.png")]),
        )
        .await;

    assert!(result.success);
    assert_eq!(spies.whatsapp.calls(), 0);
    assert_eq!(spies.sms.calls(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("boardingGate"));
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let whatsapp = Spy::failing("whatsapp-spy");
    let service = NotificationService::builder()
        .whatsapp_provider(whatsapp.clone())
        .retry(RetryOptions {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryOptions::default()
        })
        .build();

    let result = service
        .send_driver_assignment(
            "CUST-1",
            "RES-1",
            recipient(),
            vars(&[
                ("customerName", "Ahmet"),
                ("driverName", "Mehmet"),
                ("driverPhone", "+905559876543"),
                ("vehiclePlate", "34 ABC 123"),
            ]),
        )
        .await;

    assert!(!result.success);
    assert_eq!(whatsapp.calls(), 3);
    assert!(result.errors[0].contains("3 attempt(s)"));
}

#[tokio::test]
async fn test_rejections_are_not_retried() {
    let sms = Spy::new(
        "sms-spy",
        Behavior::Fail(ProviderError::Rejected {
            provider: "sms-spy".to_string(),
            reason: "blacklisted number".to_string(),
        }),
    );
    let service = NotificationService::builder()
        .sms_provider(sms.clone())
        .retry(RetryOptions { base_delay: Duration::from_millis(1), ..RetryOptions::default() })
        .build();

    let result = service.send_otp("CUST-1", "+905551234567", "123456").await;

    assert!(!result.success);
    assert_eq!(sms.calls(), 1);
    assert_eq!(result.get(Channel::Sms).unwrap().error_class, Some(ErrorClass::PermissionDenied));
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_delivery_waits() {
    let spies = Spies::succeeding();
    let service = spies.service();
    let request = NotificationRequest {
        delivery: Delivery::Scheduled { at: Utc::now() + chrono::Duration::seconds(60) },
        ..Flow::Otp.request("CUST-1", None, recipient(), vars(&[("otp", "123456")]))
    };

    let started = tokio::time::Instant::now();
    let result = service.send_notification(request).await;

    assert!(result.success);
    assert!(started.elapsed() >= Duration::from_secs(59));
    assert_eq!(spies.sms.calls(), 1);
}

#[tokio::test]
async fn test_panicking_sms_is_channel_scoped() {
    let spies = Spies {
        email: Spy::succeeding("email-spy"),
        sms: Spy::new("sms-spy", Behavior::Panic),
        whatsapp: Spy::succeeding("whatsapp-spy"),
    };
    let service = spies.service();

    let result = service.send_otp("CUST-1", "+905551234567", "123456").await;

    assert!(!result.success);
    assert_eq!(result.errors, vec!["sms: Internal error while dispatching notification".to_string()]);
    let sms = result.get(Channel::Sms).unwrap();
    assert!(!sms.success);
    assert_eq!(sms.error_class, Some(ErrorClass::Unknown));
    assert_eq!(spies.sms.calls(), 1);
}

#[tokio::test]
async fn test_panicking_email_keeps_whatsapp_delivery() {
    let spies = Spies {
        email: Spy::new("email-spy", Behavior::Panic),
        sms: Spy::succeeding("sms-spy"),
        whatsapp: Spy::succeeding("whatsapp-spy"),
    };
    let service = spies.service();

    let result =
        service.send_booking_confirmation("CUST-1", "RES-1", recipient(), booking_variables()).await;

    assert!(result.success);
    let whatsapp = result.get(Channel::WhatsApp).unwrap();
    assert!(whatsapp.success);
    assert!(whatsapp.message_id.as_deref().unwrap().starts_with("whatsapp-spy_"));
    let email = result.get(Channel::Email).unwrap();
    assert!(!email.success);
    assert_eq!(email.error.as_deref(), Some("Internal error while dispatching notification"));
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("email: "));
    assert_eq!(spies.email.calls(), 1);
}

#[tokio::test]
async fn test_failed_channel_carries_localized_user_message() {
    let spies = Spies {
        email: Spy::succeeding("email-spy"),
        sms: Spy::succeeding("sms-spy"),
        whatsapp: Spy::failing("whatsapp-spy"),
    };
    let service = spies.service();
    let _stored = service
        .set_customer_preferences(
            "CUST-1",
            &PreferencesUpdate { language: Some("en".to_string()), ..PreferencesUpdate::default() },
        )
        .await
        .unwrap();

    let result = service
        .send_driver_assignment(
            "CUST-1",
            "RES-1",
            recipient(),
            vars(&[
                ("customerName", "Jane"),
                ("driverName", "Mehmet"),
                ("driverPhone", "+905559876543"),
                ("vehiclePlate", "34 ABC 123"),
            ]),
        )
        .await;

    assert!(!result.success);
    let whatsapp = result.get(Channel::WhatsApp).unwrap();
    assert_eq!(whatsapp.user_message.as_deref(), Some(ErrorClass::Unavailable.user_message("en")));
    assert_ne!(whatsapp.user_message.as_deref(), Some(ErrorClass::Unavailable.user_message("tr")));
}

#[tokio::test]
async fn test_disabled_channels_report_one_error() {
    let spies = Spies::succeeding();
    let service = spies.service();
    let request = NotificationRequest {
        channels: Some(ChannelSet::NONE),
        ..Flow::BookingConfirmation.request(
            "CUST-1",
            Some("RES-1".to_string()),
            recipient(),
            booking_variables(),
        )
    };

    let result = service.send_notification(request).await;

    assert!(!result.success);
    assert!(result.channels.is_empty());
    assert_eq!(result.errors, vec!["No channel enabled for customer `CUST-1`".to_string()]);
    assert_eq!(spies.total_calls(), 0);
}

#[tokio::test]
async fn test_dispatch_log_and_status() {
    let service = mock_service();

    let _result = service.send_otp("CUST-1", "+905551234567", "123456").await;

    let records = service.recent_dispatches(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, Channel::Sms);
    assert_eq!(records[0].destination, "+9*********67");
    assert_eq!(service.service_status().dispatches, 1);
    assert!(service.verify_all_services().await.all_channels_verified);
}
